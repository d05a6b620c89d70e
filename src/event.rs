//! Button events produced by one timed read of the panel.

use crate::drivers::sg30_panel::protocol::{POWER_BUTTON, SELECT_BUTTON};

/// Outcome of a timed button read.
///
/// # Example
///
/// ```
/// use frontpaneld::event::Event;
///
/// assert_eq!(Event::from_byte(Some(b'A')), Event::Power);
/// assert_eq!(Event::from_byte(None), Event::Timeout);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Power,
    Select,
    /// No button within the wait interval.
    Timeout,
    /// A byte the panel should never send.
    Unknown(u8),
}

impl Event {
    /// Decodes the byte read from the panel. A NUL byte counts as no input.
    pub fn from_byte(byte: Option<u8>) -> Self {
        match byte {
            None | Some(0) => Event::Timeout,
            Some(POWER_BUTTON) => Event::Power,
            Some(SELECT_BUTTON) => Event::Select,
            Some(other) => Event::Unknown(other),
        }
    }

    /// Word printed by the `read` command.
    pub fn name(&self) -> &'static str {
        match self {
            Event::Power => "power",
            Event::Select => "display",
            Event::Timeout | Event::Unknown(_) => "Timeout",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_button_bytes() {
        assert_eq!(Event::from_byte(Some(b'A')), Event::Power);
        assert_eq!(Event::from_byte(Some(b'S')), Event::Select);
        assert_eq!(Event::from_byte(Some(0)), Event::Timeout);
        assert_eq!(Event::from_byte(None), Event::Timeout);
        assert_eq!(Event::from_byte(Some(b'x')), Event::Unknown(b'x'));
    }

    #[test]
    fn names_for_read_command() {
        assert_eq!(Event::Power.name(), "power");
        assert_eq!(Event::Select.name(), "display");
        assert_eq!(Event::Timeout.name(), "Timeout");
        assert_eq!(Event::Unknown(b'?').name(), "Timeout");
    }
}
