use std::fs::File;

use anyhow::{Result, anyhow, bail};
use clap::Parser;
use daemonize::Daemonize;
use log::{LevelFilter, info};
use syslog::{BasicLogger, Facility, Formatter3164};

use frontpaneld::{
    application::{Application, open_display, open_fan_register, sensor_reader},
    cli::{Cli, Command, read_timeout},
    config::Config,
    event::Event,
    fan_controller::{FanControlMode, FanThermostat},
};

fn init_syslog() -> Result<()> {
    syslog::unix(Formatter3164 {
        facility: Facility::LOG_DAEMON,
        hostname: None,
        process: "frontpaneld".into(),
        pid: std::process::id(),
    })
    .map_err(|e| anyhow!("{e}"))
    .and_then(|logger| {
        log::set_boxed_logger(Box::new(BasicLogger::new(logger)))
            .map(|_| log::set_max_level(LevelFilter::Info))
            .map_err(|e| anyhow!("{e}"))
    })
}

fn into_daemon() -> Result<()> {
    File::create("/var/tmp/frontpaneld.log")
        .and_then(|out| Ok((out.try_clone()?, out)))
        .map_err(|e| anyhow!("{e}"))
        .and_then(|(stderr, stdout)| {
            Daemonize::new()
                .stdout(stdout)
                .stderr(stderr)
                .start()
                .map_err(|e| anyhow!("{e}"))
        })
}

fn switch_fans(config: &Config, state: frontpaneld::cli::FanSwitch) -> Result<()> {
    let sensors = sensor_reader(config);
    let mut thermostat = FanThermostat::init(&sensors, open_fan_register(config), &config.fans.fans);
    if thermostat.mode() == FanControlMode::Unavailable {
        bail!("Fan control register is not accessible");
    }
    thermostat.force_all(state.into());
    Ok(())
}

fn main() -> Result<()> {
    let mut cli = Cli::parse();
    cli.resolve_config_path()?;

    if cli.daemonize() {
        into_daemon().and(init_syslog())?;
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let mut config = Config::load(cli.config.clone())?;
    cli.apply(&mut config);

    match cli.command {
        Command::Server { .. } => {
            info!("Starting frontpaneld {}", env!("CARGO_PKG_VERSION"));
            Application::builder().with_config(config).build()?.run()
        }
        Command::Write { line1, line2 } => open_display(&config)?.render(&line1, &line2),
        Command::Read { timeout_seconds } => {
            let byte = open_display(&config)?.read_button(read_timeout(timeout_seconds))?;
            println!("{}", Event::from_byte(byte).name());
            Ok(())
        }
        Command::Fans { state } => switch_fans(&config, state),
    }
}
