//! Application context handed to every component operation.

use chrono::{Local, NaiveDateTime};

use crate::{
    config::Config, display::Display, fan_controller::FanThermostat, sensors::SensorReader,
    shutdown::ShutdownSignalHandler, system::SystemActions,
};

/// Source of local wall-clock time.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// The system's local time zone.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Everything the polling loop works with.
///
/// Owned by the coordinator and lent to the menu each iteration. The
/// shutdown handler's flag and armed descriptor are the only state shared
/// with signal context.
pub struct AppContext {
    /// Loaded configuration
    pub config: Config,
    /// Temperature and fan speed readings
    pub sensors: SensorReader,
    /// Fan on/off control
    pub thermostat: FanThermostat,
    /// Panel output and button input
    pub display: Display,
    /// Shutdown, reboot, firewall, wireless and status queries
    pub system: Box<dyn SystemActions>,
    pub clock: Box<dyn Clock>,
    pub shutdown: ShutdownSignalHandler,
}

impl AppContext {
    /// Runs one thermostat evaluation against the current readings.
    pub fn evaluate_fans(&mut self) {
        self.thermostat.evaluate(&self.sensors);
    }

    /// Arms the SIGTERM power-off warning on the panel channel.
    ///
    /// Returns false when the channel has no descriptor to write to.
    pub fn arm_power_off_warning(&self) -> bool {
        match self.display.raw_fd() {
            Some(fd) => {
                self.shutdown.arm(fd);
                true
            }
            None => false,
        }
    }
}
