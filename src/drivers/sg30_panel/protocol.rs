/// Escape byte introducing every panel control sequence.
pub const ESC: u8 = 0x1B;

/// Byte sent by the power button.
pub const POWER_BUTTON: u8 = b'A';

/// Byte sent by the select (display) button.
pub const SELECT_BUTTON: u8 = b'S';

/// Control sequences understood by the SG30 panel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Clear,
    Dark,
    Light,
    /// Expect power loss in this many seconds and blank gracefully.
    PowerDown { seconds: u32 },
}

impl Command {
    pub fn to_bytes(&self) -> Vec<u8> {
        match *self {
            Command::Clear => vec![ESC, b'X'],
            Command::Dark => vec![ESC, b'F'],
            Command::Light => vec![ESC, b'b'],
            Command::PowerDown { seconds } => {
                let mut buf = vec![ESC];
                buf.extend_from_slice(seconds.to_string().as_bytes());
                buf.push(b'q');
                buf
            }
        }
    }
}

/// Encodes text in the panel's Latin-1 character set.
///
/// Characters outside Latin-1 are shown as `?`.
pub fn encode_text(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn control_sequences() {
        assert_eq!(Command::Clear.to_bytes(), b"\x1bX".to_vec());
        assert_eq!(Command::Dark.to_bytes(), b"\x1bF".to_vec());
        assert_eq!(Command::Light.to_bytes(), b"\x1bb".to_vec());
    }

    #[test]
    fn power_down_carries_decimal_seconds() {
        let cmd = Command::PowerDown { seconds: 25 };
        assert_eq!(cmd.to_bytes(), b"\x1b25q".to_vec());
    }

    #[test]
    fn text_is_latin1() {
        assert_eq!(encode_text("CPU 41°"), b"CPU 41\xb0".to_vec());
        assert_eq!(encode_text("→ok"), b"?ok".to_vec());
    }
}
