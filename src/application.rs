//! Application entry point and builder pattern implementation.

use anyhow::{Context, Result};
use log::{info, warn};

use crate::{
    app_context::{AppContext, SystemClock},
    config::Config,
    coordinator::Coordinator,
    display::Display,
    drivers::{fan_port::PortRegister, sg30_panel::SerialPanel},
    fan_controller::{ControlRegister, FanThermostat},
    menu::MenuStateMachine,
    screens::TempUnit,
    sensors::SensorReader,
    shutdown::ShutdownSignalHandler,
    system::CommandSystem,
    temperature_sensors::sysfs::SysfsSensorSource,
};

/// The panel server: hardware opened, signal handlers installed.
///
/// # Example
///
/// ```no_run
/// use frontpaneld::{application::Application, config::Config};
///
/// let mut app = Application::builder()
///     .with_config(Config::default())
///     .build()?;
/// app.run()?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub struct Application {
    pub coordinator: Coordinator,
}

impl Application {
    /// Creates a new ApplicationBuilder for constructing Application instances.
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::new()
    }

    /// Runs the panel loop until a termination signal arrives.
    pub fn run(&mut self) -> Result<()> {
        self.coordinator.run()
    }
}

/// Opens the fan register, or `None` when fan control is unavailable.
pub fn open_fan_register(config: &Config) -> Option<Box<dyn ControlRegister>> {
    match PortRegister::open(&config.fans.register_device, config.fans.port) {
        Ok(register) => Some(Box::new(register)),
        Err(e) => {
            warn!("{e:#}");
            None
        }
    }
}

/// Builds the sensor reader over the configured sysfs directory.
pub fn sensor_reader(config: &Config) -> SensorReader {
    SensorReader::new(
        Box::new(SysfsSensorSource::new(config.sensors.base.clone())),
        config.sensors.clone(),
    )
}

/// Opens the serial panel as a [`Display`].
pub fn open_display(config: &Config) -> Result<Display> {
    let panel = SerialPanel::open(&config.display.device, config.display.baud)?;
    Ok(Display::new(Box::new(panel), config.display.line_width))
}

/// Builder pattern for creating Application instances.
///
/// Provides a fluent interface for configuring the application before startup.
pub struct ApplicationBuilder {
    config: Option<Config>,
}

impl ApplicationBuilder {
    fn new() -> Self {
        Self { config: None }
    }

    /// Sets the configuration for the application.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Opens the panel and fan register and installs the signal handlers.
    ///
    /// Failing to open the panel or to install the handlers is fatal; a
    /// missing fan register only disables fan control.
    pub fn build(self) -> Result<Application> {
        let config = self.config.unwrap_or_default();

        let display = open_display(&config).context("Panel is required")?;
        let shutdown = ShutdownSignalHandler::install(config.display.power_down_wait_secs)
            .context("Failed to install signal handlers")?;

        let sensors = sensor_reader(&config);
        let thermostat = FanThermostat::init(&sensors, open_fan_register(&config), &config.fans.fans);
        let system = CommandSystem::new(config.commands.clone(), config.dry_run);
        let menu = MenuStateMachine::new(TempUnit::from_fahrenheit_flag(config.fahrenheit));

        info!(
            "Panel server ready, fan control {:?}, temperatures in {:?}",
            thermostat.mode(),
            TempUnit::from_fahrenheit_flag(config.fahrenheit)
        );

        let ctx = AppContext {
            config,
            sensors,
            thermostat,
            display,
            system: Box::new(system),
            clock: Box::new(SystemClock),
            shutdown,
        };

        Ok(Application {
            coordinator: Coordinator::new(ctx, menu),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn build_without_panel_fails() {
        let mut config = Config::default();
        config.display.device = PathBuf::from("/nonexistent/ttyS0");

        let err = Application::builder()
            .with_config(config)
            .build()
            .err()
            .unwrap();

        assert!(err.to_string().contains("Panel is required"));
    }

    #[test]
    fn missing_register_disables_fan_control() {
        let mut config = Config::default();
        config.fans.register_device = PathBuf::from("/nonexistent/port");

        assert!(open_fan_register(&config).is_none());
    }

    #[test]
    fn register_opens_on_writable_device() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.fans.register_device = file.path().to_path_buf();

        assert!(open_fan_register(&config).is_some());
    }
}
