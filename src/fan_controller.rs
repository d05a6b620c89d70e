//! Hysteresis on/off fan thermostat and the control register abstraction.

use std::fmt;

use anyhow::Result;
use log::{debug, info, warn};

use crate::{
    config::FanCfg,
    sensors::{Sensor, SensorReader},
};

/// Hardware register holding one on/off bit per fan.
///
/// # Example
///
/// ```
/// use frontpaneld::fan_controller::ControlRegister;
/// use anyhow::Result;
///
/// struct Latch(u32);
///
/// impl ControlRegister for Latch {
///     fn read(&mut self) -> Result<u32> { Ok(self.0) }
///     fn write(&mut self, value: u32) -> Result<()> { self.0 = value; Ok(()) }
/// }
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ControlRegister {
    /// Reads the current register value.
    fn read(&mut self) -> Result<u32>;

    /// Writes a new register value.
    fn write(&mut self, value: u32) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanMode {
    On,
    Off,
}

/// Process-wide fan control policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanControlMode {
    /// Register access was denied at startup. Terminal.
    Unavailable,
    /// Both fans forced on, no thermostat evaluation.
    AlwaysOn,
    /// Per-fan hysteresis control.
    Controlled,
}

/// A thermostatically switched fan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fan {
    pub name: String,
    pub mode: FanMode,
    pub input: Sensor,
    pub temp: i32,
    temp_on: i32,
    temp_off: i32,
    pub bit: u8,
}

impl Fan {
    /// Creates a fan that switches on above `temp_on` and off at or below
    /// `temp_on - hysteresis`.
    ///
    /// The hysteresis is at least one degree so the off-threshold always
    /// stays below the on-threshold.
    pub fn new(
        name: impl Into<String>,
        input: Sensor,
        bit: u8,
        temp: i32,
        temp_on: i32,
        hysteresis: u8,
    ) -> Self {
        let hysteresis = i32::from(hysteresis.max(1));
        Self {
            name: name.into(),
            mode: FanMode::On,
            input,
            temp,
            temp_on,
            temp_off: temp_on - hysteresis,
            bit,
        }
    }

    pub fn temp_on(&self) -> i32 {
        self.temp_on
    }

    pub fn temp_off(&self) -> i32 {
        self.temp_off
    }

    /// Mode the fan should be in at `temp`, or `None` inside the dead zone.
    pub fn wanted_mode(&self, temp: i32) -> Option<FanMode> {
        match self.mode {
            FanMode::On if temp <= self.temp_off => Some(FanMode::Off),
            FanMode::Off if temp > self.temp_on => Some(FanMode::On),
            _ => None,
        }
    }
}

/// Per-fan hysteresis controller.
pub struct FanThermostat {
    fans: Vec<Fan>,
    mode: FanControlMode,
    register: Option<Box<dyn ControlRegister>>,
}

impl fmt::Debug for FanThermostat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FanThermostat")
            .field("fans", &self.fans)
            .field("mode", &self.mode)
            .finish()
    }
}

impl FanThermostat {
    /// Builds the thermostat from sensor-reported maxima.
    ///
    /// Without a register the controller is [`FanControlMode::Unavailable`]
    /// for the rest of the process lifetime.
    pub fn init(
        reader: &SensorReader,
        register: Option<Box<dyn ControlRegister>>,
        fans: &[FanCfg],
    ) -> Self {
        let mode = if register.is_some() {
            FanControlMode::Controlled
        } else {
            warn!("Fan control unavailable");
            FanControlMode::Unavailable
        };

        let fans: Vec<Fan> = fans
            .iter()
            .map(|cfg| {
                Fan::new(
                    cfg.name.clone(),
                    cfg.input,
                    cfg.bit,
                    reader.temperature(cfg.input),
                    reader.temperature(cfg.max),
                    cfg.hysteresis,
                )
            })
            .collect();

        for fan in &fans {
            debug!(
                "{} temp {}°, fan on at {}°, fan off at {}°",
                fan.name, fan.temp, fan.temp_on, fan.temp_off
            );
        }

        Self {
            fans,
            mode,
            register,
        }
    }

    pub fn mode(&self) -> FanControlMode {
        self.mode
    }

    pub fn fans(&self) -> &[Fan] {
        &self.fans
    }

    /// Re-reads every fan's temperature and switches fans leaving the
    /// hysteresis band. Only acts in [`FanControlMode::Controlled`].
    pub fn evaluate(&mut self, reader: &SensorReader) {
        if self.mode != FanControlMode::Controlled {
            return;
        }

        for idx in 0..self.fans.len() {
            let fan = &mut self.fans[idx];
            fan.temp = reader.temperature(fan.input);
            if let Some(mode) = fan.wanted_mode(fan.temp) {
                self.toggle(idx, mode);
            }
        }
    }

    /// Forces every fan into `mode` unless fan control is unavailable.
    pub fn force_all(&mut self, mode: FanMode) {
        if self.mode == FanControlMode::Unavailable {
            return;
        }
        for idx in 0..self.fans.len() {
            self.toggle(idx, mode);
        }
    }

    /// Switches between thermostat control and permanently running fans.
    pub fn toggle_control(&mut self) -> FanControlMode {
        self.mode = match self.mode {
            FanControlMode::AlwaysOn => FanControlMode::Controlled,
            FanControlMode::Controlled => {
                self.force_all(FanMode::On);
                FanControlMode::AlwaysOn
            }
            FanControlMode::Unavailable => FanControlMode::Unavailable,
        };
        info!("Fan control mode is now {:?}", self.mode);
        self.mode
    }

    fn toggle(&mut self, idx: usize, mode: FanMode) {
        let Some(register) = self.register.as_mut() else {
            return;
        };
        let fan = &mut self.fans[idx];
        let mask = 1u32 << fan.bit;

        let result = register.read().and_then(|value| {
            register.write(match mode {
                FanMode::On => value | mask,
                FanMode::Off => value & !mask,
            })
        });

        match result {
            Ok(()) => {
                fan.mode = mode;
                info!("Turning {} fan {:?} at {}°", fan.name, mode, fan.temp);
            }
            Err(e) => warn!("Failed to switch {} fan {:?}: {e}", fan.name, mode),
        }
    }
}
