//! Fan control register reached through the kernel's I/O port device.

use std::{
    fs::{File, OpenOptions},
    os::unix::fs::FileExt,
    path::Path,
};

use anyhow::{Context, Result};
use log::info;

use crate::fan_controller::ControlRegister;

/// 32-bit little-endian register at a fixed I/O port.
pub struct PortRegister {
    file: File,
    port: u64,
}

impl PortRegister {
    /// Opens the port device read-write.
    ///
    /// Fails without root privileges, which leaves fan control unavailable.
    pub fn open(device: &Path, port: u64) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(device)
            .with_context(|| format!("No access to {}", device.display()))?;
        info!("Fan control register at port {port:#06x}");
        Ok(Self { file, port })
    }
}

impl ControlRegister for PortRegister {
    fn read(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.file
            .read_exact_at(&mut buf, self.port)
            .with_context(|| format!("Failed to read port {:#06x}", self.port))?;
        Ok(u32::from_le_bytes(buf))
    }

    fn write(&mut self, value: u32) -> Result<()> {
        self.file
            .write_all_at(&value.to_le_bytes(), self.port)
            .with_context(|| format!("Failed to write port {:#06x}", self.port))
    }
}
