use std::{fs, path::PathBuf};

#[cfg(debug_assertions)]
use log::debug;

use crate::sensors::SensorSource;

/// Reads hwmon values from files below one sysfs directory.
pub struct SysfsSensorSource {
    base: PathBuf,
}

impl SysfsSensorSource {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }
}

impl SensorSource for SysfsSensorSource {
    fn read_raw(&self, key: &str) -> Option<String> {
        let path = self.base.join(key);
        match fs::read_to_string(&path) {
            Ok(mut text) => {
                if text.ends_with('\n') {
                    text.pop();
                }
                Some(text)
            }
            Err(_e) => {
                #[cfg(debug_assertions)]
                {
                    debug!("Sensor {} unreadable: {_e}", path.display());
                }
                None
            }
        }
    }
}
