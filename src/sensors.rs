//! Sensor readings normalized to whole degrees and raw RPM.
//!
//! Sources hand out the raw text of a reading; this module applies the
//! `atoi` style parsing the kernel's hwmon text values need. An unreadable
//! or empty reading is a valid "unknown" and maps to zero.

use serde::{Deserialize, Serialize};

use crate::config::SensorsCfg;

/// The readings the panel knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Sensor {
    CpuTemp,
    CpuTempMax,
    SysTemp,
    SysTempMax,
    CpuFan,
    SysFan,
}

/// Source of raw textual sensor values, keyed by a stable path-like name.
#[cfg_attr(test, mockall::automock)]
pub trait SensorSource {
    /// Returns the raw reading without its trailing newline, or `None` when
    /// the value cannot be read.
    fn read_raw(&self, key: &str) -> Option<String>;
}

/// Parses a leading decimal integer the way C's `atoi` does.
///
/// Leading whitespace and one sign are accepted; parsing stops at the first
/// non-digit. Text without digits yields 0.
pub fn parse_leading_int(text: &str) -> i64 {
    let text = text.trim_start();
    let (negative, digits) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let value = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, d| {
            acc.saturating_mul(10).saturating_add(i64::from(d - b'0'))
        });

    if negative { -value } else { value }
}

/// Converts a reading in thousandths of a degree to whole degrees, rounding
/// half up for positive values. Out of range readings clamp to the `i32`
/// bounds.
pub fn millidegrees_to_whole(text: &str) -> i32 {
    let whole = parse_leading_int(text).saturating_add(500) / 1000;
    i32::try_from(whole).unwrap_or(if whole < 0 { i32::MIN } else { i32::MAX })
}

/// Reads configured sensors from a [`SensorSource`].
pub struct SensorReader {
    source: Box<dyn SensorSource>,
    cfg: SensorsCfg,
}

impl SensorReader {
    pub fn new(source: Box<dyn SensorSource>, cfg: SensorsCfg) -> Self {
        Self { source, cfg }
    }

    /// Key under which the source stores the given sensor.
    pub fn key(&self, sensor: Sensor) -> &str {
        match sensor {
            Sensor::CpuTemp => &self.cfg.cpu_temp,
            Sensor::CpuTempMax => &self.cfg.cpu_temp_max,
            Sensor::SysTemp => &self.cfg.sys_temp,
            Sensor::SysTempMax => &self.cfg.sys_temp_max,
            Sensor::CpuFan => &self.cfg.cpu_fan,
            Sensor::SysFan => &self.cfg.sys_fan,
        }
    }

    /// Raw reading; empty when unreadable.
    pub fn raw(&self, sensor: Sensor) -> String {
        self.source
            .read_raw(self.key(sensor))
            .unwrap_or_default()
    }

    /// Temperature in whole degrees Celsius.
    pub fn temperature(&self, sensor: Sensor) -> i32 {
        millidegrees_to_whole(&self.raw(sensor))
    }

    /// Fan speed in RPM.
    pub fn rpm(&self, sensor: Sensor) -> i64 {
        parse_leading_int(&self.raw(sensor))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_leading_int_follows_atoi() {
        assert_eq!(parse_leading_int("42000"), 42000);
        assert_eq!(parse_leading_int("  -1500\n"), -1500);
        assert_eq!(parse_leading_int("+7"), 7);
        assert_eq!(parse_leading_int("3200 RPM"), 3200);
        assert_eq!(parse_leading_int(""), 0);
        assert_eq!(parse_leading_int("abc"), 0);
        assert_eq!(parse_leading_int("-"), 0);
    }

    #[test]
    fn millidegrees_round_to_nearest_degree() {
        assert_eq!(millidegrees_to_whole("42000"), 42);
        assert_eq!(millidegrees_to_whole("42499"), 42);
        assert_eq!(millidegrees_to_whole("42500"), 43);
        assert_eq!(millidegrees_to_whole(""), 0);
    }

    #[test]
    fn oversized_readings_clamp() {
        assert_eq!(millidegrees_to_whole("99999999999999999999"), i32::MAX);
        assert_eq!(millidegrees_to_whole("5000000000000"), i32::MAX);
        assert_eq!(millidegrees_to_whole("-99999999999999999999"), i32::MIN);
    }

    #[test]
    fn reader_maps_sensors_to_configured_keys() {
        let mut source = MockSensorSource::new();
        source
            .expect_read_raw()
            .with(eq("temp2_input"))
            .returning(|_| Some("55400".into()));
        source
            .expect_read_raw()
            .with(eq("fan1_input"))
            .returning(|_| Some("2812".into()));

        let reader = SensorReader::new(Box::new(source), SensorsCfg::default());

        assert_eq!(reader.temperature(Sensor::CpuTemp), 55);
        assert_eq!(reader.rpm(Sensor::CpuFan), 2812);
    }

    #[test]
    fn unreadable_sensor_reads_as_zero() {
        let mut source = MockSensorSource::new();
        source.expect_read_raw().returning(|_| None);

        let reader = SensorReader::new(Box::new(source), SensorsCfg::default());

        assert_eq!(reader.temperature(Sensor::SysTemp), 0);
        assert_eq!(reader.rpm(Sensor::SysFan), 0);
        assert_eq!(reader.raw(Sensor::SysTempMax), "");
    }
}
