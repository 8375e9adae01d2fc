//! Terminal resize message

use serde::{Deserialize, Serialize};

/// Terminal dimensions sent on the resize stream
///
/// Encoded as one JSON object per event, newline terminated, so consecutive
/// messages on the stream are self-delimiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TerminalSize {
    #[serde(rename = "Width")]
    pub columns: u16,
    #[serde(rename = "Height")]
    pub rows: u16,
}

impl TerminalSize {
    pub fn new(columns: u16, rows: u16) -> Self {
        Self { columns, rows }
    }

    /// Encode as a single wire message
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut buf = serde_json::to_vec(self)?;
        buf.push(b'\n');
        Ok(buf)
    }

    /// Decode a single wire message (trailing newline optional)
    pub fn decode(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_wire_format() {
        let encoded = TerminalSize::new(80, 24).encode().unwrap();
        assert_eq!(encoded, b"{\"Width\":80,\"Height\":24}\n");
    }

    #[test]
    fn test_decode_accepts_trailing_newline() {
        let size = TerminalSize::decode(b"{\"Width\":100,\"Height\":40}\n").unwrap();
        assert_eq!(size, TerminalSize::new(100, 40));
    }

    #[test]
    fn test_decode_rejects_out_of_range() {
        assert!(TerminalSize::decode(b"{\"Width\":70000,\"Height\":40}").is_err());
    }
}
