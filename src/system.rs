//! Operating system collaborators the menu invokes.
//!
//! Actions (power, firewall, wireless) succeed on a zero exit status.
//! Queries (disk report, addresses) succeed when the command printed
//! something; their exit status is ignored because `smartctl` reports
//! drive health in it.

use std::{fs, process::Command, time::Duration};

use anyhow::{Context, Result, bail};
#[cfg(debug_assertions)]
use log::debug;
use log::{info, warn};

use crate::{config::CommandsCfg, screens::parse_proc_uptime};

/// Everything the menu asks of the host system.
#[cfg_attr(test, mockall::automock)]
pub trait SystemActions {
    /// Requests an OS shutdown; the process expects SIGTERM afterwards.
    fn shutdown(&self) -> Result<()>;

    fn reboot(&self) -> Result<()>;

    fn firewall_enabled(&self) -> bool;

    fn set_firewall(&self, enabled: bool) -> Result<()>;

    fn set_wlan(&self, enabled: bool) -> Result<()>;

    /// Raw SMART attribute report of `disk`.
    fn disk_report(&self, disk: &str) -> Option<String>;

    fn external_address(&self) -> Option<String>;

    fn interface_address(&self, iface: &str) -> Option<String>;

    fn uptime(&self) -> Option<Duration>;
}

/// Runs the configured commands.
pub struct CommandSystem {
    commands: CommandsCfg,
    dry_run: bool,
}

/// Replaces `{key}` in every argument.
fn substitute(argv: &[String], key: &str, value: &str) -> Vec<String> {
    let placeholder = format!("{{{key}}}");
    argv.iter().map(|arg| arg.replace(&placeholder, value)).collect()
}

impl CommandSystem {
    pub fn new(commands: CommandsCfg, dry_run: bool) -> Self {
        Self { commands, dry_run }
    }

    fn run(argv: &[String]) -> Result<()> {
        let (program, args) = argv.split_first().context("Empty command")?;
        let status = Command::new(program)
            .args(args)
            .status()
            .with_context(|| format!("Failed to run {program}"))?;
        if !status.success() {
            bail!("{} exited with {status}", argv.join(" "));
        }
        Ok(())
    }

    fn query(argv: &[String]) -> Option<String> {
        let (program, args) = argv.split_first()?;
        let output = match Command::new(program).args(args).output() {
            Ok(output) => output,
            Err(e) => {
                warn!("Failed to run {program}: {e}");
                return None;
            }
        };
        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        #[cfg(debug_assertions)]
        {
            debug!("{} -> {text:?}", argv.join(" "));
        }
        (!text.is_empty()).then_some(text)
    }

    fn power(&self, argv: &[String], what: &str) -> Result<()> {
        if self.dry_run {
            info!("Dry run: would {what} with `{}`", argv.join(" "));
            return Ok(());
        }
        info!("Requesting system {what}");
        Self::run(argv)
    }
}

impl SystemActions for CommandSystem {
    fn shutdown(&self) -> Result<()> {
        self.power(&self.commands.shutdown, "shutdown")
    }

    fn reboot(&self) -> Result<()> {
        self.power(&self.commands.reboot, "reboot")
    }

    fn firewall_enabled(&self) -> bool {
        self.commands.firewall_status_file.exists()
    }

    fn set_firewall(&self, enabled: bool) -> Result<()> {
        let argv = if enabled {
            &self.commands.firewall_on
        } else {
            &self.commands.firewall_off
        };
        Self::run(argv)
    }

    fn set_wlan(&self, enabled: bool) -> Result<()> {
        let argv = if enabled {
            &self.commands.wlan_enable
        } else {
            &self.commands.wlan_disable
        };
        Self::run(argv)
    }

    fn disk_report(&self, disk: &str) -> Option<String> {
        Self::query(&substitute(&self.commands.disk_temperature, "disk", disk))
    }

    fn external_address(&self) -> Option<String> {
        Self::query(&self.commands.external_address)
    }

    fn interface_address(&self, iface: &str) -> Option<String> {
        Self::query(&substitute(&self.commands.interface_address, "iface", iface))
    }

    fn uptime(&self) -> Option<Duration> {
        let text = fs::read_to_string(&self.commands.uptime_path).ok()?;
        parse_proc_uptime(&text)
    }
}
