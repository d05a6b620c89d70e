//! Two-line text rendering and control sequences for the front panel.

use std::{os::fd::RawFd, time::Duration};

use anyhow::Result;
#[cfg(debug_assertions)]
use log::debug;

use crate::drivers::sg30_panel::{
    device_io::PanelIO,
    protocol::{Command, encode_text},
};

/// Centers `text` within `width` characters, truncating longer text.
///
/// # Example
///
/// ```
/// use frontpaneld::display::center_line;
///
/// assert_eq!(center_line("Uptime", 16), "     Uptime");
/// ```
pub fn center_line(text: &str, width: usize) -> String {
    let len = text.chars().count();
    let pad = (width - len.min(width)) / 2;
    let mut line = " ".repeat(pad);
    line.extend(text.chars().take(width));
    line
}

/// Bytes that clear the panel and show both lines centered.
pub fn compose_frame(line1: &str, line2: &str, width: usize) -> Vec<u8> {
    let mut frame = Command::Clear.to_bytes();
    if !line1.is_empty() {
        frame.extend(encode_text(&center_line(line1, width)));
    }
    frame.push(b'\n');
    if !line2.is_empty() {
        frame.extend(encode_text(&center_line(line2, width)));
    }
    frame
}

/// Bytes telling the panel to expect power loss in `seconds`.
///
/// Formatted ahead of time because the SIGTERM handler may not allocate.
pub fn power_off_warning(seconds: u32) -> Vec<u8> {
    Command::PowerDown { seconds }.to_bytes()
}

/// Renders onto the panel channel; holds no state besides the channel.
pub struct Display {
    io: Box<dyn PanelIO>,
    line_width: usize,
}

impl Display {
    pub fn new(io: Box<dyn PanelIO>, line_width: usize) -> Self {
        Self { io, line_width }
    }

    /// Clears the panel and writes two centered lines.
    pub fn render(&mut self, line1: &str, line2: &str) -> Result<()> {
        #[cfg(debug_assertions)]
        {
            debug!("{line1} {line2}");
        }
        let frame = compose_frame(line1, line2, self.line_width);
        self.io.write(&frame)
    }

    pub fn set_backlight(&mut self, on: bool) -> Result<()> {
        let cmd = if on { Command::Light } else { Command::Dark };
        self.io.write(&cmd.to_bytes())
    }

    /// Waits for a button byte; see [`PanelIO::read_byte`].
    pub fn read_button(&mut self, timeout: Option<Duration>) -> Result<Option<u8>> {
        self.io.read_byte(timeout)
    }

    pub fn raw_fd(&self) -> Option<RawFd> {
        self.io.raw_fd()
    }
}
