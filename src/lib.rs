//! # frontpaneld
//!
//! A Linux daemon driving the front panel of a small server appliance: a
//! two-line serial character display with two buttons, two temperature
//! sensors and two thermostatically switched cooling fans.
//!
//! ## Features
//!
//! - **Fan Control**: Hysteresis on/off thermostat per fan
//! - **Menu**: Two-button cyclic screens (clock, temperatures, fans, disks,
//!   network addresses, uptime, firewall and wireless toggles)
//! - **Power Sequencing**: Shutdown/reboot from the panel with a delayed
//!   power-off warning sent to the display on SIGTERM
//! - **Night Mode**: Backlight dims automatically inside a configured window
//!
//! ## Architecture
//!
//! Everything runs in one thread:
//! - [`Coordinator`](coordinator::Coordinator) - the polling loop
//! - [`MenuStateMachine`](menu::MenuStateMachine) - screen and power logic
//! - [`AppContext`](app_context::AppContext) - the context object every
//!   component operation receives
//! - [`ShutdownSignalHandler`](shutdown::ShutdownSignalHandler) - the only
//!   state shared with signal context
//!
//! ## Example
//!
//! ```no_run
//! use frontpaneld::{application::Application, config::Config};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     Application::builder()
//!         .with_config(config)
//!         .build()?
//!         .run()
//! }
//! ```

pub mod app_context;
pub mod application;
pub mod cli;
pub mod config;
pub mod coordinator;
pub mod display;
pub mod drivers;
pub mod event;
pub mod fan_controller;
pub mod menu;
pub mod screens;
pub mod sensors;
pub mod shutdown;
pub mod system;
pub mod temperature_sensors;
