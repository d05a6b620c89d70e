use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::{
    path::{self, PathBuf},
    time::Duration,
};

use crate::{config::Config, fan_controller::FanMode};

/// frontpaneld - front panel, button and fan controller for SG30 appliances
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Show temperatures in Fahrenheit
    #[arg(short = 'f', long = "fahrenheit")]
    pub fahrenheit: bool,

    /// YAML config file path (default: search XDG and /etc)
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Log shutdown and reboot requests instead of executing them
    #[arg(long = "dry-run")]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Take over display, buttons and fans
    Server {
        /// Detach and log to syslog
        #[arg(short = 'd', long = "daemonize")]
        daemonize: bool,
    },
    /// Write two lines to the display
    Write {
        line1: String,
        #[arg(default_value = "")]
        line2: String,
    },
    /// Wait for a button; a negative or missing timeout waits forever
    Read {
        #[arg(allow_negative_numbers = true)]
        timeout_seconds: Option<i64>,
    },
    /// Turn both fans on or off
    Fans { state: FanSwitch },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FanSwitch {
    On,
    Off,
}

impl From<FanSwitch> for FanMode {
    fn from(value: FanSwitch) -> Self {
        match value {
            FanSwitch::On => FanMode::On,
            FanSwitch::Off => FanMode::Off,
        }
    }
}

impl Cli {
    /// Whether the process should detach.
    pub fn daemonize(&self) -> bool {
        matches!(self.command, Command::Server { daemonize: true })
    }

    /// Anchors a relative `--config` path to the current directory, which
    /// daemonizing changes to `/`.
    pub fn resolve_config_path(&mut self) -> Result<()> {
        if let Some(config) = self.config.take() {
            let absolute = path::absolute(&config)
                .with_context(|| format!("Invalid config path {}", config.display()))?;
            self.config = Some(absolute);
        }
        Ok(())
    }

    /// Command line flags override the configuration file.
    pub fn apply(&self, config: &mut Config) {
        config.fahrenheit |= self.fahrenheit;
        config.dry_run |= self.dry_run;
    }
}

/// Button read timeout for the `read` command.
pub fn read_timeout(seconds: Option<i64>) -> Option<Duration> {
    seconds
        .and_then(|s| u64::try_from(s).ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_server_with_global_flags() {
        let cli = Cli::try_parse_from(["frontpaneld", "-f", "--dry-run", "server", "-d"]).unwrap();

        assert!(cli.fahrenheit);
        assert!(cli.dry_run);
        assert!(cli.daemonize());
        assert_eq!(cli.command, Command::Server { daemonize: true });
    }

    #[test]
    fn write_second_line_is_optional() {
        let cli = Cli::try_parse_from(["frontpaneld", "write", "Hello"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Write {
                line1: "Hello".into(),
                line2: String::new()
            }
        );
        assert!(!cli.daemonize());
    }

    #[test]
    fn read_accepts_negative_timeout() {
        let cli = Cli::try_parse_from(["frontpaneld", "read", "-1"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Read {
                timeout_seconds: Some(-1)
            }
        );
    }

    #[test]
    fn read_timeouts() {
        assert_eq!(read_timeout(None), None);
        assert_eq!(read_timeout(Some(-1)), None);
        assert_eq!(read_timeout(Some(0)), Some(Duration::ZERO));
        assert_eq!(read_timeout(Some(5)), Some(Duration::from_secs(5)));
    }

    #[test]
    fn fans_take_on_or_off() {
        let cli = Cli::try_parse_from(["frontpaneld", "fans", "off"]).unwrap();
        assert_eq!(cli.command, Command::Fans { state: FanSwitch::Off });
        assert_eq!(FanMode::from(FanSwitch::Off), FanMode::Off);
        assert!(Cli::try_parse_from(["frontpaneld", "fans", "half"]).is_err());
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from(["frontpaneld", "-f", "server"]).unwrap();
        let mut config = Config::default();
        cli.apply(&mut config);

        assert!(config.fahrenheit);
        assert!(!config.dry_run);
    }

    #[test]
    fn relative_config_path_is_anchored_to_cwd() {
        let mut cli =
            Cli::try_parse_from(["frontpaneld", "-c", "conf.yml", "server", "-d"]).unwrap();
        cli.resolve_config_path().unwrap();

        let expected = std::env::current_dir().unwrap().join("conf.yml");
        assert_eq!(cli.config, Some(expected));
    }

    #[test]
    fn absolute_config_path_is_kept() {
        let mut cli =
            Cli::try_parse_from(["frontpaneld", "-c", "/etc/frontpaneld/config.yml", "server"])
                .unwrap();
        cli.resolve_config_path().unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/frontpaneld/config.yml")));

        let mut cli = Cli::try_parse_from(["frontpaneld", "server"]).unwrap();
        cli.resolve_config_path().unwrap();
        assert_eq!(cli.config, None);
    }

    #[test]
    fn command_is_required() {
        assert!(Cli::try_parse_from(["frontpaneld"]).is_err());
    }
}
