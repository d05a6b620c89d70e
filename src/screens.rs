//! Text formatting for the individual menu screens.
//!
//! Everything here is pure: the menu gathers readings and collaborator
//! output, these helpers turn them into the two display lines.

use std::{fmt::Write, time::Duration};

use chrono::NaiveDateTime;

/// Temperature unit used on the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TempUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TempUnit {
    pub fn from_fahrenheit_flag(fahrenheit: bool) -> Self {
        if fahrenheit {
            TempUnit::Fahrenheit
        } else {
            TempUnit::Celsius
        }
    }

    /// Converts whole degrees Celsius into this unit.
    ///
    /// ```
    /// use frontpaneld::screens::TempUnit;
    ///
    /// assert_eq!(TempUnit::Fahrenheit.convert(37), 98);
    /// assert_eq!(TempUnit::Celsius.convert(37), 37);
    /// ```
    pub fn convert(self, celsius: i32) -> i32 {
        match self {
            TempUnit::Celsius => celsius,
            TempUnit::Fahrenheit => (f64::from(celsius) * 1.8 + 32.0).floor() as i32,
        }
    }
}

/// Formats `now` with a strftime pattern, `None` for an invalid pattern.
pub fn format_time(now: &NaiveDateTime, pattern: &str) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", now.format(pattern)).ok()?;
    Some(out)
}

/// `CPU 41°, Sys 35°`
pub fn temperatures_line(cpu: i32, sys: i32, unit: TempUnit) -> String {
    format!("CPU {}°, Sys {}°", unit.convert(cpu), unit.convert(sys))
}

pub fn fan_lines(cpu_rpm: i64, sys_rpm: i64) -> (String, String) {
    (format!("CPU fan {cpu_rpm:4}"), format!("Sys fan {sys_rpm:4}"))
}

/// Extracts the drive temperature from `smartctl -A` output.
///
/// Uses the raw value column of attribute 194. Output that is a bare number
/// (a pre-filtered query) is accepted as is.
pub fn parse_smart_temperature(report: &str) -> Option<i32> {
    let trimmed = report.trim();
    if let Ok(value) = trimmed.parse() {
        return Some(value);
    }
    report
        .lines()
        .map(str::split_whitespace)
        .find_map(|mut fields| {
            (fields.next() == Some("194")).then(|| fields.nth(8)).flatten()
        })
        .and_then(|raw| raw.parse().ok())
}

/// `sda 37°, sdb 40°`
pub fn disk_temps_line(readings: &[(String, i32)], unit: TempUnit) -> String {
    readings
        .iter()
        .map(|(disk, temp)| format!("{disk} {}°", unit.convert(*temp)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Seconds of uptime from the first field of `/proc/uptime`.
pub fn parse_proc_uptime(text: &str) -> Option<Duration> {
    let secs: f64 = text.split_whitespace().next()?.parse().ok()?;
    (secs.is_finite() && secs >= 0.0).then(|| Duration::from_secs(secs as u64))
}

/// `1 day, 03:04` / `2 days, 00:15`
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let days = secs / 86_400;
    let minutes = secs / 60;
    let hours = (minutes / 60) % 24;
    let plural = if days != 1 { "s" } else { "" };
    format!("{days} day{plural}, {hours:02}:{:02}", minutes % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    const SMART_REPORT: &str = "\
smartctl 7.2 2020-12-30 r5155 [x86_64-linux-5.10.0] (local build)
=== START OF READ SMART DATA SECTION ===
ID# ATTRIBUTE_NAME          FLAG     VALUE WORST THRESH TYPE      UPDATED  WHEN_FAILED RAW_VALUE
  9 Power_On_Hours          0x0032   091   091   000    Old_age   Always       -       1940
194 Temperature_Celsius     0x0022   063   050   000    Old_age   Always       -       37 (Min/Max 18/50)
199 UDMA_CRC_Error_Count    0x003e   200   200   000    Old_age   Always       -       0
";

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn fahrenheit_conversion_floors() {
        assert_eq!(TempUnit::Fahrenheit.convert(37), 98);
        assert_eq!(TempUnit::Fahrenheit.convert(0), 32);
        assert_eq!(TempUnit::Fahrenheit.convert(-1), 30);
        assert_eq!(TempUnit::Fahrenheit.convert(100), 212);
    }

    #[test]
    fn unit_from_flag() {
        assert_eq!(TempUnit::from_fahrenheit_flag(true), TempUnit::Fahrenheit);
        assert_eq!(TempUnit::from_fahrenheit_flag(false), TempUnit::Celsius);
    }

    #[test]
    fn temperature_line_converts_both_sensors() {
        assert_eq!(temperatures_line(41, 35, TempUnit::Celsius), "CPU 41°, Sys 35°");
        assert_eq!(temperatures_line(41, 35, TempUnit::Fahrenheit), "CPU 105°, Sys 95°");
    }

    #[test]
    fn fan_lines_pad_to_four_digits() {
        assert_eq!(
            fan_lines(812, 3200),
            ("CPU fan  812".to_string(), "Sys fan 3200".to_string())
        );
        assert_eq!(fan_lines(0, 0).0, "CPU fan    0");
    }

    #[test]
    fn smart_report_yields_attribute_194() {
        assert_eq!(parse_smart_temperature(SMART_REPORT), Some(37));
    }

    #[test]
    fn smart_bare_number_is_accepted() {
        assert_eq!(parse_smart_temperature("40\n"), Some(40));
    }

    #[test]
    fn smart_without_temperature_is_none() {
        assert_eq!(parse_smart_temperature(""), None);
        assert_eq!(parse_smart_temperature("Smartctl open device: /dev/sdb failed"), None);
    }

    #[test]
    fn disk_line_joins_readings() {
        let readings = vec![("sda".to_string(), 37), ("sdb".to_string(), 40)];
        assert_eq!(disk_temps_line(&readings, TempUnit::Celsius), "sda 37°, sdb 40°");
        assert_eq!(disk_temps_line(&readings[..1], TempUnit::Fahrenheit), "sda 98°");
    }

    #[test]
    fn uptime_formats_days_and_clock() {
        assert_eq!(format_uptime(Duration::from_secs(0)), "0 days, 00:00");
        assert_eq!(format_uptime(Duration::from_secs(86_400 + 3 * 3600 + 4 * 60)), "1 day, 03:04");
        assert_eq!(format_uptime(Duration::from_secs(2 * 86_400 + 15 * 60 + 59)), "2 days, 00:15");
    }

    #[test]
    fn proc_uptime_first_field() {
        assert_eq!(parse_proc_uptime("3754.17 7102.33\n"), Some(Duration::from_secs(3754)));
        assert_eq!(parse_proc_uptime(""), None);
        assert_eq!(parse_proc_uptime("garbage"), None);
    }

    #[test]
    fn clock_uses_configured_patterns() {
        let now = at(14, 7);
        assert_eq!(format_time(&now, "%a %d-%b-%Y ").unwrap(), "Tue 05-Mar-2024 ");
        assert_eq!(format_time(&now, "%I:%M %p").unwrap(), "02:07 PM");
        assert_eq!(format_time(&now, "%H:%M").unwrap(), "14:07");
    }

    #[test]
    fn invalid_pattern_is_none() {
        assert_eq!(format_time(&at(0, 0), "%Q"), None);
    }
}
