use std::{os::fd::RawFd, time::Duration};

use anyhow::Result;

/// Byte channel to the front panel.
pub trait PanelIO {
    /// Writes the whole buffer.
    fn write(&mut self, buf: &[u8]) -> Result<()>;

    /// Waits up to `timeout` (forever with `None`) for a button byte.
    ///
    /// Returns `None` on timeout or when the wait was interrupted.
    fn read_byte(&mut self, timeout: Option<Duration>) -> Result<Option<u8>>;

    /// Descriptor the signal handler may write the power-off warning to.
    fn raw_fd(&self) -> Option<RawFd> {
        None
    }
}
