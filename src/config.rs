//! Configuration management for the frontpaneld daemon.
//!
//! Handles loading, parsing, and validation of the YAML configuration file
//! that names the panel device, sensor files, fan register, night window and
//! the external commands the menu may invoke. Every field has a default, so
//! an appliance without a configuration file runs with the stock SG30 setup.

use crate::sensors::Sensor;
use anyhow::{Context, Result};
use chrono::{
    NaiveTime, Timelike,
    format::{Item, StrftimeItems},
};
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    env, fs,
    path::{Path, PathBuf},
};

/// Main configuration structure for the frontpaneld daemon.
///
/// # Example
///
/// ```yaml
/// version: 1
/// fahrenheit: false
///
/// display:
///   device: /dev/ttyS0
///   baud: 9600
///
/// night:
///   from_hour: 0
///   until_hour: 7
///
/// disks: [sda, sdb]
/// interfaces: [enp0s8, enp0s9]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Configuration version for compatibility checking.
    #[serde(default = "defaults::version")]
    pub version: u8,

    /// Panel device and rendering settings.
    #[serde(default)]
    pub display: DisplayCfg,

    /// Hours during which the backlight is switched off.
    #[serde(default)]
    pub night: NightWindow,

    /// Where to find the sensor readings.
    #[serde(default)]
    pub sensors: SensorsCfg,

    /// Fan control register and per-fan thresholds.
    #[serde(default)]
    pub fans: FansCfg,

    /// External commands invoked by the menu.
    #[serde(default)]
    pub commands: CommandsCfg,

    /// Disks shown on the disk temperature screen, in order.
    #[serde(default = "defaults::disks")]
    pub disks: Vec<String>,

    /// Network interfaces shown on the LAN address screen.
    #[serde(default = "defaults::interfaces")]
    pub interfaces: Vec<String>,

    /// Show temperatures in Fahrenheit.
    #[serde(default)]
    pub fahrenheit: bool,

    /// Log OS shutdown and reboot requests instead of executing them.
    #[serde(default)]
    pub dry_run: bool,
}

/// Serial panel settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayCfg {
    /// Serial device the panel is attached to.
    #[serde(default = "defaults::device")]
    pub device: PathBuf,

    /// Line speed in baud.
    #[serde(default = "defaults::baud")]
    pub baud: u32,

    /// Characters per display line.
    #[serde(default = "defaults::line_width")]
    pub line_width: usize,

    /// Seconds the panel waits before cutting power after the warning.
    #[serde(default = "defaults::power_down_wait_secs")]
    pub power_down_wait_secs: u32,

    /// Delay before the backlight goes off again after a wake-up at night.
    #[serde(default = "defaults::dim_delay_secs")]
    pub dim_delay_secs: u64,

    /// `strftime` format of the date line.
    #[serde(default = "defaults::date_format")]
    pub date_format: String,

    /// `strftime` format of the time line.
    #[serde(default = "defaults::time_format")]
    pub time_format: String,
}

/// Local-time window `[from_hour, until_hour)` during which the panel is dark.
///
/// The window may wrap midnight; equal hours disable night mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightWindow {
    #[serde(default = "defaults::night_from")]
    pub from_hour: u8,

    #[serde(default = "defaults::night_until")]
    pub until_hour: u8,
}

/// Sensor file names below a common sysfs directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorsCfg {
    #[serde(default = "defaults::sensor_base")]
    pub base: PathBuf,

    #[serde(default = "defaults::cpu_temp")]
    pub cpu_temp: String,

    #[serde(default = "defaults::cpu_temp_max")]
    pub cpu_temp_max: String,

    #[serde(default = "defaults::sys_temp")]
    pub sys_temp: String,

    #[serde(default = "defaults::sys_temp_max")]
    pub sys_temp_max: String,

    #[serde(default = "defaults::cpu_fan")]
    pub cpu_fan: String,

    #[serde(default = "defaults::sys_fan")]
    pub sys_fan: String,
}

/// Fan control register settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FansCfg {
    /// Device giving access to I/O ports.
    #[serde(default = "defaults::register_device")]
    pub register_device: PathBuf,

    /// I/O port of the 32-bit fan control register.
    #[serde(default = "defaults::port")]
    pub port: u64,

    /// Controlled fans.
    #[serde(default = "defaults::fans")]
    pub fans: Vec<FanCfg>,
}

/// Individual fan configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanCfg {
    /// Short label, e.g. "CPU".
    pub name: String,

    /// Sensor with the current temperature.
    pub input: Sensor,

    /// Sensor reporting the temperature at which the fan switches on.
    pub max: Sensor,

    /// Degrees below the on-threshold at which the fan switches off.
    pub hysteresis: u8,

    /// Bit in the control register; set means the fan runs.
    pub bit: u8,
}

/// External commands, as argument vectors.
///
/// `{disk}` and `{iface}` are replaced by the disk or interface name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandsCfg {
    #[serde(default = "defaults::shutdown")]
    pub shutdown: Vec<String>,

    #[serde(default = "defaults::reboot")]
    pub reboot: Vec<String>,

    #[serde(default = "defaults::firewall_on")]
    pub firewall_on: Vec<String>,

    #[serde(default = "defaults::firewall_off")]
    pub firewall_off: Vec<String>,

    /// The firewall is considered enabled while this file exists.
    #[serde(default = "defaults::firewall_status_file")]
    pub firewall_status_file: PathBuf,

    #[serde(default = "defaults::wlan_disable")]
    pub wlan_disable: Vec<String>,

    #[serde(default = "defaults::wlan_enable")]
    pub wlan_enable: Vec<String>,

    #[serde(default = "defaults::disk_temperature")]
    pub disk_temperature: Vec<String>,

    #[serde(default = "defaults::external_address")]
    pub external_address: Vec<String>,

    #[serde(default = "defaults::interface_address")]
    pub interface_address: Vec<String>,

    #[serde(default = "defaults::uptime_path")]
    pub uptime_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: defaults::version(),
            display: DisplayCfg::default(),
            night: NightWindow::default(),
            sensors: SensorsCfg::default(),
            fans: FansCfg::default(),
            commands: CommandsCfg::default(),
            disks: defaults::disks(),
            interfaces: defaults::interfaces(),
            fahrenheit: false,
            dry_run: false,
        }
    }
}

impl Default for DisplayCfg {
    fn default() -> Self {
        Self {
            device: defaults::device(),
            baud: defaults::baud(),
            line_width: defaults::line_width(),
            power_down_wait_secs: defaults::power_down_wait_secs(),
            dim_delay_secs: defaults::dim_delay_secs(),
            date_format: defaults::date_format(),
            time_format: defaults::time_format(),
        }
    }
}

impl Default for NightWindow {
    fn default() -> Self {
        Self {
            from_hour: defaults::night_from(),
            until_hour: defaults::night_until(),
        }
    }
}

impl Default for SensorsCfg {
    fn default() -> Self {
        Self {
            base: defaults::sensor_base(),
            cpu_temp: defaults::cpu_temp(),
            cpu_temp_max: defaults::cpu_temp_max(),
            sys_temp: defaults::sys_temp(),
            sys_temp_max: defaults::sys_temp_max(),
            cpu_fan: defaults::cpu_fan(),
            sys_fan: defaults::sys_fan(),
        }
    }
}

impl Default for FansCfg {
    fn default() -> Self {
        Self {
            register_device: defaults::register_device(),
            port: defaults::port(),
            fans: defaults::fans(),
        }
    }
}

impl Default for CommandsCfg {
    fn default() -> Self {
        Self {
            shutdown: defaults::shutdown(),
            reboot: defaults::reboot(),
            firewall_on: defaults::firewall_on(),
            firewall_off: defaults::firewall_off(),
            firewall_status_file: defaults::firewall_status_file(),
            wlan_disable: defaults::wlan_disable(),
            wlan_enable: defaults::wlan_enable(),
            disk_temperature: defaults::disk_temperature(),
            external_address: defaults::external_address(),
            interface_address: defaults::interface_address(),
            uptime_path: defaults::uptime_path(),
        }
    }
}

impl NightWindow {
    /// Creates a window from `from_hour` (inclusive) to `until_hour` (exclusive).
    pub fn new(from_hour: u8, until_hour: u8) -> Self {
        Self {
            from_hour,
            until_hour,
        }
    }

    /// Whether the given local hour lies inside the window.
    pub fn contains(&self, hour: u32) -> bool {
        let (from, until) = (u32::from(self.from_hour), u32::from(self.until_hour));
        if from == until {
            false
        } else if from < until {
            (from..until).contains(&hour)
        } else {
            hour >= from || hour < until
        }
    }

    /// Seconds from `now` until the window next ends.
    pub fn seconds_until_end(&self, now: NaiveTime) -> u64 {
        const DAY: u64 = 24 * 3600;
        let now = u64::from(now.num_seconds_from_midnight());
        let end = u64::from(self.until_hour) * 3600;
        if end > now { end - now } else { end + DAY - now }
    }
}

impl Config {
    /// Loads the configuration.
    ///
    /// Searches in the following order:
    /// 1. Provided path parameter (must exist)
    /// 2. FRONTPANELD_CONFIG environment variable
    /// 3. XDG_CONFIG_HOME/frontpaneld/config.yml or ~/.config/frontpaneld/config.yml
    /// 4. /etc/frontpaneld/config.yml
    ///
    /// Falls back to the built-in defaults when no file is found.
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let Some(config_path) = path.or_else(locate_config) else {
            info!("No configuration file found, using built-in defaults");
            return Ok(Self::default());
        };

        info!("Loading config from: {}", config_path.display());
        Self::load_from_path(&config_path)
    }

    /// Loads and validates configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML in: {}", path.display()))?;

        if config.version != 1 {
            anyhow::bail!(
                "Unsupported config version {} in file: {}",
                config.version,
                path.display()
            );
        }

        config
            .validate()
            .with_context(|| format!("Configuration validation failed for: {}", path.display()))?;

        Ok(config)
    }

    /// Validates the configuration for consistency.
    ///
    /// # Example
    ///
    /// ```
    /// use frontpaneld::config::Config;
    ///
    /// let config = Config::default();
    /// config.validate()?;
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn validate(&self) -> Result<()> {
        if self.display.line_width == 0 {
            anyhow::bail!("Display line width must be positive");
        }
        if self.display.dim_delay_secs == 0 {
            anyhow::bail!("Dim delay must be positive");
        }
        if self.night.from_hour > 23 || self.night.until_hour > 23 {
            anyhow::bail!(
                "Night window hours must be within 0..=23, got {}..{}",
                self.night.from_hour,
                self.night.until_hour
            );
        }

        for (name, pattern) in [
            ("date_format", &self.display.date_format),
            ("time_format", &self.display.time_format),
        ] {
            if StrftimeItems::new(pattern).any(|item| item == Item::Error) {
                anyhow::bail!("Invalid {} pattern '{}'", name, pattern);
            }
        }

        let mut bits = HashSet::new();
        for fan in &self.fans.fans {
            if fan.hysteresis == 0 {
                anyhow::bail!("Fan '{}' needs a hysteresis of at least one degree", fan.name);
            }
            if fan.bit >= 32 {
                anyhow::bail!("Fan '{}' uses bit {} outside the register", fan.name, fan.bit);
            }
            if !bits.insert(fan.bit) {
                anyhow::bail!("Fan '{}' shares control bit {}", fan.name, fan.bit);
            }
        }

        let commands = [
            ("shutdown", &self.commands.shutdown),
            ("reboot", &self.commands.reboot),
            ("firewall_on", &self.commands.firewall_on),
            ("firewall_off", &self.commands.firewall_off),
            ("wlan_disable", &self.commands.wlan_disable),
            ("wlan_enable", &self.commands.wlan_enable),
            ("disk_temperature", &self.commands.disk_temperature),
            ("external_address", &self.commands.external_address),
            ("interface_address", &self.commands.interface_address),
        ];
        for (name, argv) in commands {
            if argv.first().is_none_or(|prog| prog.is_empty()) {
                anyhow::bail!("Command '{}' cannot be empty", name);
            }
        }

        Ok(())
    }
}

fn locate_config() -> Option<PathBuf> {
    if let Ok(env_path) = env::var("FRONTPANELD_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    if let Some(mut cfg_dir) = env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("HOME").map(|h| Path::new(&h).join(".config")))
    {
        cfg_dir.push("frontpaneld/config.yml");
        if cfg_dir.exists() {
            return Some(cfg_dir);
        }
    }

    let etc = Path::new("/etc/frontpaneld/config.yml");
    etc.exists().then(|| etc.to_path_buf())
}

mod defaults {
    use super::FanCfg;
    use crate::sensors::Sensor;
    use std::path::PathBuf;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    pub fn version() -> u8 {
        1
    }

    pub fn device() -> PathBuf {
        PathBuf::from("/dev/ttyS0")
    }

    pub fn baud() -> u32 {
        9600
    }

    pub fn line_width() -> usize {
        16
    }

    /// About this many seconds a powerdown takes.
    pub fn power_down_wait_secs() -> u32 {
        25
    }

    pub fn dim_delay_secs() -> u64 {
        10
    }

    pub fn date_format() -> String {
        "%a %d-%b-%Y ".into()
    }

    /// 12 hour clock; use "%H:%M" for 24 hours.
    pub fn time_format() -> String {
        "%I:%M %p".into()
    }

    pub fn night_from() -> u8 {
        0
    }

    pub fn night_until() -> u8 {
        7
    }

    pub fn sensor_base() -> PathBuf {
        PathBuf::from("/sys/devices/platform/via686a.24576/")
    }

    pub fn cpu_temp() -> String {
        "temp2_input".into()
    }

    pub fn cpu_temp_max() -> String {
        "temp2_max".into()
    }

    pub fn sys_temp() -> String {
        "temp1_input".into()
    }

    pub fn sys_temp_max() -> String {
        "temp1_max".into()
    }

    pub fn cpu_fan() -> String {
        "fan1_input".into()
    }

    pub fn sys_fan() -> String {
        "fan2_input".into()
    }

    pub fn register_device() -> PathBuf {
        PathBuf::from("/dev/port")
    }

    pub fn port() -> u64 {
        0x404C
    }

    pub fn fans() -> Vec<FanCfg> {
        vec![
            FanCfg {
                name: "CPU".into(),
                input: Sensor::CpuTemp,
                max: Sensor::CpuTempMax,
                hysteresis: 8,
                bit: 12,
            },
            FanCfg {
                name: "SYS".into(),
                input: Sensor::SysTemp,
                max: Sensor::SysTempMax,
                hysteresis: 8,
                bit: 13,
            },
        ]
    }

    pub fn shutdown() -> Vec<String> {
        argv(&["shutdown", "-h", "now"])
    }

    pub fn reboot() -> Vec<String> {
        argv(&["shutdown", "-r", "now"])
    }

    pub fn firewall_on() -> Vec<String> {
        argv(&["/usr/local/sbin/firewall.sh"])
    }

    pub fn firewall_off() -> Vec<String> {
        argv(&["/usr/local/sbin/firewall-off.sh"])
    }

    pub fn firewall_status_file() -> PathBuf {
        PathBuf::from("/var/tmp/firewall_is_on")
    }

    pub fn wlan_disable() -> Vec<String> {
        argv(&["cardctl", "eject", "2"])
    }

    pub fn wlan_enable() -> Vec<String> {
        argv(&["cardctl", "insert", "2"])
    }

    pub fn disk_temperature() -> Vec<String> {
        argv(&["smartctl", "-A", "/dev/{disk}"])
    }

    pub fn external_address() -> Vec<String> {
        argv(&["curl", "-s", "-m", "10", "http://whatismyip.org/"])
    }

    pub fn interface_address() -> Vec<String> {
        argv(&["/usr/local/sbin/ipaddr", "{iface}"])
    }

    pub fn uptime_path() -> PathBuf {
        PathBuf::from("/proc/uptime")
    }

    pub fn disks() -> Vec<String> {
        argv(&["sda", "sdb"])
    }

    pub fn interfaces() -> Vec<String> {
        argv(&["enp0s8", "enp0s9"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    // Helper function to create temporary config file
    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.display.line_width, 16);
        assert_eq!(config.fans.port, 0x404C);
        assert_eq!(config.fans.fans.len(), 2);
        assert_eq!(config.night, NightWindow::new(0, 7));
    }

    #[test]
    fn config_load_partial_yaml_fills_defaults() {
        let yaml_content = r#"
version: 1
fahrenheit: true
display:
  device: /dev/ttyS1
night:
  from_hour: 22
  until_hour: 6
disks: [sda]
fans:
  fans:
    - name: CPU
      input: cpu-temp
      max: cpu-temp-max
      hysteresis: 5
      bit: 12
"#;

        let temp_file = create_temp_config(yaml_content);
        let config = Config::load(Some(temp_file.path().to_path_buf())).unwrap();

        assert!(config.fahrenheit);
        assert_eq!(config.display.device, PathBuf::from("/dev/ttyS1"));
        assert_eq!(config.display.baud, 9600);
        assert_eq!(config.night, NightWindow::new(22, 6));
        assert_eq!(config.disks, vec!["sda".to_string()]);
        assert_eq!(config.interfaces.len(), 2);
        assert_eq!(config.fans.fans.len(), 1);
        assert_eq!(config.fans.fans[0].hysteresis, 5);
        assert_eq!(config.commands, CommandsCfg::default());
    }

    #[test]
    fn config_load_rejects_unknown_version() {
        let temp_file = create_temp_config("version: 2\n");
        let err = Config::load(Some(temp_file.path().to_path_buf())).unwrap_err();
        assert!(err.to_string().contains("Unsupported config version 2"));
    }

    #[test]
    fn config_load_missing_explicit_path_fails() {
        let result = Config::load(Some(PathBuf::from("/nonexistent/frontpaneld.yml")));
        assert!(result.is_err());
    }

    #[test]
    fn config_load_reports_yaml_errors() {
        let temp_file = create_temp_config("version: [unclosed\n");
        let err = Config::load_from_path(temp_file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse YAML"));
    }

    #[test]
    #[serial]
    fn config_load_uses_env_variable() {
        let temp_file = create_temp_config("version: 1\ndry_run: true\n");
        // SAFETY: serialized with the other environment tests.
        unsafe { env::set_var("FRONTPANELD_CONFIG", temp_file.path()) };
        let config = Config::load(None);
        unsafe { env::remove_var("FRONTPANELD_CONFIG") };

        assert!(config.unwrap().dry_run);
    }

    #[test]
    fn validate_rejects_zero_hysteresis() {
        let mut config = Config::default();
        config.fans.fans[1].hysteresis = 0;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("SYS"));
    }

    #[test]
    fn validate_rejects_shared_bits() {
        let mut config = Config::default();
        config.fans.fans[1].bit = 12;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("shares control bit 12"));
    }

    #[test]
    fn validate_rejects_empty_command() {
        let mut config = Config::default();
        config.commands.reboot.clear();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("reboot"));
    }

    #[test]
    fn validate_rejects_out_of_range_hours() {
        let mut config = Config::default();
        config.night.until_hour = 24;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_time_pattern() {
        let mut config = Config::default();
        config.display.time_format = "%Q".into();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("time_format"));
    }

    #[test]
    fn validate_rejects_zero_line_width() {
        let mut config = Config::default();
        config.display.line_width = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn serialized_config_loads_back() {
        let mut config = Config::default();
        config.fahrenheit = true;
        config.interfaces = vec!["eth0".into()];

        let file = create_temp_config(&serde_yaml::to_string(&config).unwrap());
        let loaded = Config::load_from_path(file.path()).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn night_window_contains_plain_range() {
        let window = NightWindow::new(0, 7);
        assert!(window.contains(0));
        assert!(window.contains(6));
        assert!(!window.contains(7));
        assert!(!window.contains(23));
    }

    #[test]
    fn night_window_wraps_midnight() {
        let window = NightWindow::new(22, 6);
        assert!(window.contains(22));
        assert!(window.contains(23));
        assert!(window.contains(0));
        assert!(window.contains(5));
        assert!(!window.contains(6));
        assert!(!window.contains(21));
    }

    #[test]
    fn night_window_empty_when_hours_equal() {
        let window = NightWindow::new(5, 5);
        assert!((0..24).all(|h| !window.contains(h)));
    }

    #[test]
    fn seconds_until_end_of_window() {
        let window = NightWindow::new(0, 7);
        let now = NaiveTime::from_hms_opt(5, 30, 15).unwrap();
        assert_eq!(window.seconds_until_end(now), 3600 + 29 * 60 + 45);

        let wrapping = NightWindow::new(22, 6);
        let late = NaiveTime::from_hms_opt(23, 0, 0).unwrap();
        assert_eq!(wrapping.seconds_until_end(late), 7 * 3600);
    }
}
