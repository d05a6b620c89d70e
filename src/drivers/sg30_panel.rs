//! Serial line driver for the SG30 front panel.
//!
//! The panel talks 8 data bits, 2 stop bits, even parity. Button presses
//! arrive as single bytes; everything written is either text or one of the
//! escape sequences in [`protocol`].

pub mod device_io;
pub mod protocol;

use std::{
    fs::{File, OpenOptions},
    io::{self, Read, Write},
    os::{
        fd::{AsRawFd, RawFd},
        unix::fs::OpenOptionsExt,
    },
    path::Path,
    time::Duration,
};

use anyhow::{Context, Result, anyhow};
use log::{info, warn};

use self::device_io::PanelIO;

/// Open serial line to the panel; restores the previous line settings on drop.
pub struct SerialPanel {
    file: File,
    saved: libc::termios,
}

fn speed_for(baud: u32) -> Result<libc::speed_t> {
    Ok(match baud {
        1200 => libc::B1200,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        other => return Err(anyhow!("Unsupported baud rate {other}")),
    })
}

impl SerialPanel {
    /// Opens and configures the serial device.
    pub fn open(device: &Path, baud: u32) -> Result<Self> {
        let speed = speed_for(baud)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_NOCTTY)
            .open(device)
            .with_context(|| format!("Failed to open panel device {}", device.display()))?;
        let fd = file.as_raw_fd();

        // SAFETY: termios is a plain C struct; tcgetattr fills it completely.
        let mut saved: libc::termios = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(fd, &mut saved) } != 0 {
            return Err(io::Error::last_os_error())
                .with_context(|| format!("{} is not a terminal", device.display()));
        }

        // SAFETY: an all-zero termios is a valid starting point for raw mode.
        let mut tio: libc::termios = unsafe { std::mem::zeroed() };
        tio.c_cflag = libc::CS8 | libc::CSTOPB | libc::PARENB | libc::CREAD;
        tio.c_iflag = libc::IGNPAR;
        tio.c_cc[libc::VTIME] = 1;
        tio.c_cc[libc::VMIN] = 0;

        // SAFETY: fd stays open for the lifetime of `file`.
        let rc = unsafe {
            libc::cfsetispeed(&mut tio, speed);
            libc::cfsetospeed(&mut tio, speed);
            libc::tcflush(fd, libc::TCIFLUSH);
            libc::tcsetattr(fd, libc::TCSANOW, &tio)
        };
        if rc != 0 {
            return Err(io::Error::last_os_error()).context("Failed to configure panel line");
        }

        info!("Opened panel on {} at {baud} baud", device.display());
        Ok(Self { file, saved })
    }
}

impl Drop for SerialPanel {
    fn drop(&mut self) {
        // SAFETY: restores the settings read in `open` on a still open fd.
        if unsafe { libc::tcsetattr(self.file.as_raw_fd(), libc::TCSANOW, &self.saved) } != 0 {
            warn!(
                "Failed to restore panel line settings: {}",
                io::Error::last_os_error()
            );
        }
    }
}

impl PanelIO for SerialPanel {
    fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.file.write_all(buf).context("Panel write failed")
    }

    fn read_byte(&mut self, timeout: Option<Duration>) -> Result<Option<u8>> {
        let mut pfd = libc::pollfd {
            fd: self.file.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let millis = timeout.map_or(-1, |t| t.as_millis().min(i32::MAX as u128) as i32);

        // SAFETY: pfd points to exactly one valid pollfd.
        if unsafe { libc::poll(&mut pfd, 1, millis) } <= 0 {
            return Ok(None);
        }

        let mut buf = [0u8; 20];
        match self.file.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buf[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(None),
            Err(e) => Err(e).context("Panel read failed"),
        }
    }

    fn raw_fd(&self) -> Option<RawFd> {
        Some(self.file.as_raw_fd())
    }
}
