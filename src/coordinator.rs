//! The single-threaded polling loop driving the panel.

use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::{
    app_context::AppContext,
    event::Event,
    fan_controller::FanMode,
    menu::{MenuStateMachine, Step},
};

/// How long to wait for SIGTERM after asking the OS to shut down or reboot.
pub const TERMINATION_WAIT: Duration = Duration::from_secs(120);

/// Owns the context and menu for the lifetime of the server.
///
/// Each iteration reads one button with the wait the previous step asked
/// for, then hands the event to the menu. The terminating flag is checked
/// before every read.
pub struct Coordinator {
    ctx: AppContext,
    menu: MenuStateMachine,
}

impl Coordinator {
    pub fn new(ctx: AppContext, menu: MenuStateMachine) -> Self {
        Self { ctx, menu }
    }

    #[cfg(test)]
    pub(crate) fn context(&self) -> &AppContext {
        &self.ctx
    }

    /// Runs until a termination signal arrives.
    ///
    /// On exit the fans are forced on and the panel says so. A failed button
    /// read ends the loop the same way and is returned.
    pub fn run(&mut self) -> Result<()> {
        info!("Panel loop started");
        let result = self.poll_until_terminated();
        self.finish();
        result
    }

    fn poll_until_terminated(&mut self) -> Result<()> {
        while !self.ctx.shutdown.is_terminating() {
            let byte = self
                .ctx
                .display
                .read_button(Some(self.menu.wait()))
                .context("Failed to read panel buttons")?;

            if self.menu.step(&mut self.ctx, Event::from_byte(byte)) == Step::AwaitTermination
                && !self.ctx.shutdown.wait_for_termination(TERMINATION_WAIT)
            {
                warn!(
                    "No termination signal within {}s, resuming",
                    TERMINATION_WAIT.as_secs()
                );
                self.ctx.shutdown.disarm();
            }
        }
        Ok(())
    }

    fn finish(&mut self) {
        info!("Terminating, switching fans on");
        self.ctx.thermostat.force_all(FanMode::On);
        if let Err(e) = self.ctx.display.render("LCD process", "terminated") {
            warn!("Display write failed: {e:#}");
        }
    }
}
