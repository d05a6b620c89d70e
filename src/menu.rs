//! Two-button menu: screen cycling, backlight policy and power sequencing.
//!
//! One call to [`MenuStateMachine::step`] handles one button read. The power
//! button acts on whatever the previous step armed; select advances to the
//! next screen; a timeout re-renders the current screen. Each step ends with
//! the wait the next button read should use.

use std::time::Duration;

use chrono::{NaiveDateTime, Timelike};
use log::{debug, info, warn};

use crate::{
    app_context::AppContext,
    display::Display,
    event::Event,
    fan_controller::FanControlMode,
    screens::{
        TempUnit, disk_temps_line, fan_lines, format_time, format_uptime, parse_smart_temperature,
        temperatures_line,
    },
    sensors::Sensor,
};

/// Status views shown before a control screen moves on by itself.
const AUTO_ADVANCE_AFTER: u32 = 10;

/// Screens in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    DateTime,
    Temperatures,
    Fans,
    FanControl,
    DiskTemps,
    ExternalAddr,
    LanAddr,
    Uptime,
    FirewallControl,
    WlanControl,
}

impl Screen {
    pub const ALL: [Screen; 10] = [
        Screen::DateTime,
        Screen::Temperatures,
        Screen::Fans,
        Screen::FanControl,
        Screen::DiskTemps,
        Screen::ExternalAddr,
        Screen::LanAddr,
        Screen::Uptime,
        Screen::FirewallControl,
        Screen::WlanControl,
    ];

    /// The following screen, wrapping to [`Screen::DateTime`].
    pub fn next(self) -> Self {
        Self::ALL[(self as usize + 1) % Self::ALL.len()]
    }
}

/// Backlight lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Darkness {
    Light,
    /// Goes dark on the next timeout.
    WantsDark,
    Dark,
}

/// Meaning of the next power button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerButtonMode {
    None,
    PowerOff,
    FanOff,
    WlanOff,
    Firewall,
}

/// What the loop does after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    /// An OS shutdown or reboot was requested; wait for SIGTERM.
    AwaitTermination,
}

#[derive(Debug)]
pub struct MenuStateMachine {
    screen: Screen,
    subcounter: u32,
    darkness: Darkness,
    power_mode: PowerButtonMode,
    wait_secs: u64,
    wlan_enabled: bool,
    unit: TempUnit,
}

fn show(display: &mut Display, line1: &str, line2: &str) {
    if let Err(e) = display.render(line1, line2) {
        warn!("Display write failed: {e:#}");
    }
}

fn backlight(display: &mut Display, on: bool) {
    if let Err(e) = display.set_backlight(on) {
        warn!("Backlight switch failed: {e:#}");
    }
}

impl MenuStateMachine {
    pub fn new(unit: TempUnit) -> Self {
        Self {
            screen: Screen::DateTime,
            subcounter: 0,
            darkness: Darkness::Light,
            power_mode: PowerButtonMode::None,
            wait_secs: 0,
            wlan_enabled: true,
            unit,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn darkness(&self) -> Darkness {
        self.darkness
    }

    pub fn power_mode(&self) -> PowerButtonMode {
        self.power_mode
    }

    pub fn wlan_enabled(&self) -> bool {
        self.wlan_enabled
    }

    /// Timeout for the next button read.
    pub fn wait(&self) -> Duration {
        Duration::from_secs(self.wait_secs)
    }

    /// Handles one button read.
    pub fn step(&mut self, ctx: &mut AppContext, event: Event) -> Step {
        ctx.evaluate_fans();
        let now = ctx.clock.now();
        self.update_darkness(ctx, event, now.hour());
        debug!("event={event:?}, darkness={:?}", self.darkness);

        let step = match event {
            Event::Power => self.on_power(ctx),
            Event::Select => self.on_select(ctx, &now),
            Event::Timeout => {
                self.on_timeout(ctx, &now);
                Step::Continue
            }
            Event::Unknown(byte) => {
                debug!("Ignoring panel byte {byte:#04x}");
                Step::Continue
            }
        };

        if self.darkness == Darkness::WantsDark {
            self.wait_secs = ctx.config.display.dim_delay_secs;
        }
        debug!("darkness={:?}, wait={}", self.darkness, self.wait_secs);
        step
    }

    fn update_darkness(&mut self, ctx: &mut AppContext, event: Event, hour: u32) {
        if self.darkness == Darkness::WantsDark && event == Event::Timeout {
            backlight(&mut ctx.display, false);
            self.darkness = Darkness::Dark;
            self.screen = Screen::DateTime;
        } else {
            backlight(&mut ctx.display, true);
            if self.darkness == Darkness::Dark {
                self.darkness = Darkness::WantsDark;
            }
        }

        if ctx.config.night.contains(hour) {
            if self.darkness == Darkness::Light {
                self.darkness = Darkness::WantsDark;
            }
        } else {
            self.darkness = Darkness::Light;
        }
    }

    /// Disarms after a toggle; the immediate re-render shows the new state
    /// once and then moves on.
    fn acted(&mut self) {
        self.power_mode = PowerButtonMode::None;
        self.wait_secs = 0;
        self.subcounter = AUTO_ADVANCE_AFTER;
    }

    fn on_power(&mut self, ctx: &mut AppContext) -> Step {
        match self.power_mode {
            PowerButtonMode::FanOff => {
                ctx.thermostat.toggle_control();
                self.acted();
            }
            PowerButtonMode::Firewall => {
                let enable = !ctx.system.firewall_enabled();
                match ctx.system.set_firewall(enable) {
                    Ok(()) => info!("Firewall {}", if enable { "enabled" } else { "disabled" }),
                    Err(e) => warn!("Firewall toggle failed: {e:#}"),
                }
                self.acted();
            }
            PowerButtonMode::WlanOff => {
                let enable = !self.wlan_enabled;
                match ctx.system.set_wlan(enable) {
                    Ok(()) => {
                        self.wlan_enabled = enable;
                        info!("Wireless LAN {}", if enable { "enabled" } else { "disabled" });
                    }
                    Err(e) => warn!("Wireless LAN toggle failed: {e:#}"),
                }
                self.acted();
            }
            PowerButtonMode::PowerOff => return self.request_shutdown(ctx),
            PowerButtonMode::None => {
                show(&mut ctx.display, "Power: Off", "Display: Restart");
                self.power_mode = PowerButtonMode::PowerOff;
                self.wait_secs = 3;
            }
        }
        Step::Continue
    }

    fn request_shutdown(&mut self, ctx: &mut AppContext) -> Step {
        show(&mut ctx.display, "Shutting", "down system");
        self.power_mode = PowerButtonMode::None;
        self.wait_secs = 0;

        // Armed before asking, SIGTERM may arrive before the command returns.
        if !ctx.arm_power_off_warning() {
            warn!("Panel channel cannot carry the power-off warning");
        }
        match ctx.system.shutdown() {
            Ok(()) => Step::AwaitTermination,
            Err(e) => {
                warn!("Shutdown request failed: {e:#}");
                ctx.shutdown.disarm();
                Step::Continue
            }
        }
    }

    fn on_select(&mut self, ctx: &mut AppContext, now: &NaiveDateTime) -> Step {
        if self.power_mode == PowerButtonMode::PowerOff {
            show(&mut ctx.display, "Restarting", "system");
            self.power_mode = PowerButtonMode::None;
            self.wait_secs = 0;
            return match ctx.system.reboot() {
                Ok(()) => Step::AwaitTermination,
                Err(e) => {
                    warn!("Reboot request failed: {e:#}");
                    Step::Continue
                }
            };
        }

        // Selecting a screen behaves like a timeout on it.
        self.screen = self.screen.next();
        self.subcounter = 0;
        self.on_timeout(ctx, now);
        Step::Continue
    }

    fn on_timeout(&mut self, ctx: &mut AppContext, now: &NaiveDateTime) {
        self.power_mode = PowerButtonMode::None;
        self.render_screen(ctx, now);
    }

    fn render_screen(&mut self, ctx: &mut AppContext, now: &NaiveDateTime) {
        let fan_mode = ctx.thermostat.mode();
        match self.screen {
            Screen::DateTime => self.show_clock(ctx, now),
            Screen::Temperatures => {
                let line = temperatures_line(
                    ctx.sensors.temperature(Sensor::CpuTemp),
                    ctx.sensors.temperature(Sensor::SysTemp),
                    self.unit,
                );
                show(&mut ctx.display, "Temperature", &line);
                self.wait_secs = if fan_mode == FanControlMode::AlwaysOn { 60 } else { 10 };
            }
            Screen::Fans => {
                let (cpu, sys) = fan_lines(
                    ctx.sensors.rpm(Sensor::CpuFan),
                    ctx.sensors.rpm(Sensor::SysFan),
                );
                show(&mut ctx.display, &cpu, &sys);
                self.wait_secs = if fan_mode == FanControlMode::AlwaysOn { 120 } else { 10 };
            }
            Screen::FanControl if fan_mode == FanControlMode::Unavailable => {
                self.screen = Screen::DiskTemps;
                self.show_disk_temps(ctx);
            }
            Screen::FanControl => {
                let status = if fan_mode == FanControlMode::Controlled {
                    "controlled"
                } else {
                    "always on"
                };
                self.alternate(
                    ctx,
                    PowerButtonMode::FanOff,
                    Screen::Fans,
                    ("Fans are", status),
                    ("Power button", "to toggle"),
                );
            }
            Screen::DiskTemps => self.show_disk_temps(ctx),
            Screen::ExternalAddr => {
                show(&mut ctx.display, "External IP Addr", "waiting ...");
                match ctx.system.external_address() {
                    Some(addr) => {
                        show(&mut ctx.display, "External IP Addr", &addr);
                        self.wait_secs = 300;
                    }
                    None => {
                        show(&mut ctx.display, "External IP Addr", "None");
                        self.wait_secs = 10;
                    }
                }
            }
            Screen::LanAddr => {
                self.wait_secs = 300;
                let mut lines = Vec::with_capacity(2);
                for iface in ctx.config.interfaces.iter().take(2) {
                    lines.push(ctx.system.interface_address(iface).unwrap_or_else(|| {
                        self.wait_secs = 10;
                        format!("{iface} ???")
                    }));
                }
                let line = |idx: usize| lines.get(idx).map_or("", String::as_str);
                show(&mut ctx.display, line(0), line(1));
            }
            Screen::Uptime => {
                let uptime = ctx
                    .system
                    .uptime()
                    .map_or_else(|| "unknown".to_string(), format_uptime);
                show(&mut ctx.display, "Uptime", &uptime);
                self.wait_secs = 300;
            }
            Screen::FirewallControl => {
                let enabled = ctx.system.firewall_enabled();
                self.alternate(
                    ctx,
                    PowerButtonMode::Firewall,
                    Screen::DateTime,
                    ("Firewall is", if enabled { "enabled" } else { "disabled" }),
                    ("Power button to", if enabled { "turn OFF" } else { "turn ON" }),
                );
            }
            Screen::WlanControl => {
                let enabled = self.wlan_enabled;
                self.alternate(
                    ctx,
                    PowerButtonMode::WlanOff,
                    Screen::DateTime,
                    ("Wireless LAN is", if enabled { "enabled" } else { "disabled" }),
                    ("Power button to", if enabled { "disable WLAN" } else { "enable WLAN" }),
                );
            }
        }
    }

    fn show_clock(&mut self, ctx: &mut AppContext, now: &NaiveDateTime) {
        let display_cfg = &ctx.config.display;
        let date = format_time(now, &display_cfg.date_format).unwrap_or_default();
        let time = format_time(now, &display_cfg.time_format).unwrap_or_default();
        show(&mut ctx.display, &date, &time);

        self.wait_secs = if self.darkness == Darkness::Dark {
            ctx.config.night.seconds_until_end(now.time())
        } else {
            60
        };
        self.screen = Screen::DateTime;
    }

    fn show_disk_temps(&mut self, ctx: &mut AppContext) {
        show(&mut ctx.display, "Disk temperature", "waiting ...");

        let mut readings = Vec::new();
        for disk in &ctx.config.disks {
            let report = ctx.system.disk_report(disk);
            match report.as_deref().and_then(parse_smart_temperature) {
                Some(temp) => readings.push((disk.clone(), temp)),
                None => break,
            }
        }

        let line = if readings.is_empty() {
            "unknown".to_string()
        } else {
            disk_temps_line(&readings, self.unit)
        };
        show(&mut ctx.display, "Disk temperature", &line);
        self.wait_secs = 300;
    }

    /// Alternates a status view with an instruction view every two seconds,
    /// arming `mode` meanwhile, and moves to `advance_to` after the status
    /// was shown often enough.
    fn alternate(
        &mut self,
        ctx: &mut AppContext,
        mode: PowerButtonMode,
        advance_to: Screen,
        status: (&str, &str),
        instruction: (&str, &str),
    ) {
        self.power_mode = mode;
        self.wait_secs = 2;

        let count = self.subcounter;
        self.subcounter += 1;
        if count % 2 == 0 {
            show(&mut ctx.display, status.0, status.1);
            if self.subcounter > AUTO_ADVANCE_AFTER {
                self.subcounter = 0;
                self.screen = advance_to;
                self.wait_secs = 5;
            }
        } else {
            show(&mut ctx.display, instruction.0, instruction.1);
        }
    }
}
