//! Termination signal handling and the delayed power-off warning.
//!
//! The handler installed for SIGTERM runs in signal context: it only sets the
//! terminating flag and, when an OS shutdown was requested from the panel,
//! writes the power-off warning formatted at installation time. SIGHUP,
//! SIGINT and SIGQUIT only set the flag. Fault signals are left alone.

use std::{
    os::fd::RawFd,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicI32, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use log::info;
use signal_hook::{
    SigId,
    consts::{SIGHUP, SIGINT, SIGQUIT, SIGTERM},
};

use crate::display::power_off_warning;

const NOT_ARMED: RawFd = -1;
const POLL_SLICE: Duration = Duration::from_millis(250);

/// Terminating flag plus the descriptor armed for the power-off warning.
pub struct ShutdownSignalHandler {
    terminating: Arc<AtomicBool>,
    armed_fd: Arc<AtomicI32>,
    ids: Vec<SigId>,
}

impl Default for ShutdownSignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownSignalHandler {
    /// Creates the state without registering any signal handler.
    pub fn new() -> Self {
        Self {
            terminating: Arc::new(AtomicBool::new(false)),
            armed_fd: Arc::new(AtomicI32::new(NOT_ARMED)),
            ids: Vec::new(),
        }
    }

    /// Registers the process signal handlers.
    ///
    /// `power_down_secs` is baked into the warning written on SIGTERM.
    pub fn install(power_down_secs: u32) -> Result<Self> {
        let mut handler = Self::new();
        let warning = power_off_warning(power_down_secs);

        let flag = handler.terminating.clone();
        let armed = handler.armed_fd.clone();
        let on_term = move || {
            flag.store(true, Ordering::SeqCst);
            let fd = armed.load(Ordering::SeqCst);
            if fd != NOT_ARMED {
                // SAFETY: write(2) is async-signal-safe; `warning` lives as
                // long as the registered closure.
                unsafe { libc::write(fd, warning.as_ptr().cast(), warning.len()) };
            }
        };
        // SAFETY: the action only touches atomics and calls write(2).
        let id = unsafe { signal_hook::low_level::register(SIGTERM, on_term) }
            .context("Failed to register SIGTERM handler")?;
        handler.ids.push(id);

        for (signal, name) in [(SIGHUP, "SIGHUP"), (SIGINT, "SIGINT"), (SIGQUIT, "SIGQUIT")] {
            let id = signal_hook::flag::register(signal, handler.terminating.clone())
                .with_context(|| format!("Failed to register {name} handler"))?;
            handler.ids.push(id);
        }

        info!("Shutdown handlers registered");
        Ok(handler)
    }

    /// Arms the power-off warning for the next SIGTERM.
    ///
    /// Only done after the panel requested an OS shutdown; a reboot keeps the
    /// panel powered.
    pub fn arm(&self, fd: RawFd) {
        self.armed_fd.store(fd, Ordering::SeqCst);
    }

    /// Withdraws the warning, e.g. when the shutdown request failed.
    pub fn disarm(&self) {
        self.armed_fd.store(NOT_ARMED, Ordering::SeqCst);
    }

    pub fn is_armed(&self) -> bool {
        self.armed_fd.load(Ordering::SeqCst) != NOT_ARMED
    }

    pub fn is_terminating(&self) -> bool {
        self.terminating.load(Ordering::SeqCst)
    }

    /// Shared handle on the flag the signal handlers set.
    pub fn terminating_flag(&self) -> Arc<AtomicBool> {
        self.terminating.clone()
    }

    /// Sets the flag as a signal would.
    pub fn request_termination(&self) {
        self.terminating.store(true, Ordering::SeqCst);
    }

    /// Sleeps until a termination signal arrives or `limit` elapses.
    ///
    /// Returns whether termination was requested.
    pub fn wait_for_termination(&self, limit: Duration) -> bool {
        let start = Instant::now();
        loop {
            if self.is_terminating() {
                return true;
            }
            let elapsed = start.elapsed();
            if elapsed >= limit {
                return false;
            }
            thread::sleep(POLL_SLICE.min(limit - elapsed));
        }
    }
}

impl Drop for ShutdownSignalHandler {
    fn drop(&mut self) {
        for id in self.ids.drain(..) {
            signal_hook::low_level::unregister(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use std::os::fd::AsRawFd;

    #[test]
    fn new_handler_is_idle() {
        let handler = ShutdownSignalHandler::new();
        assert!(!handler.is_terminating());
        assert!(!handler.is_armed());

        handler.arm(7);
        assert!(handler.is_armed());
        handler.disarm();
        assert!(!handler.is_armed());
    }

    #[test]
    fn wait_returns_early_when_terminating() {
        let handler = ShutdownSignalHandler::new();
        handler.request_termination();

        let start = Instant::now();
        assert!(handler.wait_for_termination(Duration::from_secs(120)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn wait_gives_up_after_limit() {
        let handler = ShutdownSignalHandler::new();
        assert!(!handler.wait_for_termination(Duration::from_millis(50)));
    }

    #[test]
    #[serial]
    fn sigterm_writes_warning_when_armed() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let handler = ShutdownSignalHandler::install(25).unwrap();
        handler.arm(file.as_file().as_raw_fd());

        signal_hook::low_level::raise(SIGTERM).unwrap();

        assert!(handler.is_terminating());
        assert_eq!(std::fs::read(file.path()).unwrap(), b"\x1b25q".to_vec());
    }

    #[test]
    #[serial]
    fn sigterm_without_arming_only_sets_flag() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let handler = ShutdownSignalHandler::install(25).unwrap();

        signal_hook::low_level::raise(SIGTERM).unwrap();

        assert!(handler.is_terminating());
        assert!(std::fs::read(file.path()).unwrap().is_empty());
    }

    #[test]
    #[serial]
    fn sighup_sets_flag_without_warning() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let handler = ShutdownSignalHandler::install(25).unwrap();
        handler.arm(file.as_file().as_raw_fd());

        signal_hook::low_level::raise(SIGHUP).unwrap();

        assert!(handler.is_terminating());
        assert!(std::fs::read(file.path()).unwrap().is_empty());
    }
}
