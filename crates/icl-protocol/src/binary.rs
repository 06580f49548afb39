use std::fmt;

/// Length of the fixed binary-frame header, in bytes.
pub const BINARY_HEADER_LEN: usize = 18;

/// A parsed telemetry-plane binary frame.
///
/// The first 18 bytes are a little-endian header; everything after is
/// payload. Frames shorter than [`BINARY_HEADER_LEN`] are malformed — callers
/// should log and discard them rather than constructing a `BinaryFrame`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryFrame {
    magic: u16,
    message_type: u16,
    element_type: u16,
    element_count: u32,
    tags: [u16; 4],
    payload: Vec<u8>,
}

/// A frame shorter than [`BINARY_HEADER_LEN`] was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinaryFrameError {
    pub len: usize,
}

impl fmt::Display for BinaryFrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "malformed binary frame: {} bytes, need at least {}",
            self.len, BINARY_HEADER_LEN
        )
    }
}

impl std::error::Error for BinaryFrameError {}

impl BinaryFrame {
    /// Parses a raw WebSocket binary message into a header + payload.
    ///
    /// The magic number is not validated against any known constant — its
    /// value is nowhere asserted upstream, so it is surfaced as an opaque
    /// field for callers (typically a diagnostic logger) to inspect.
    pub fn parse(raw: &[u8]) -> Result<Self, BinaryFrameError> {
        if raw.len() < BINARY_HEADER_LEN {
            return Err(BinaryFrameError { len: raw.len() });
        }

        let magic = u16::from_le_bytes([raw[0], raw[1]]);
        let message_type = u16::from_le_bytes([raw[2], raw[3]]);
        let element_type = u16::from_le_bytes([raw[4], raw[5]]);
        let element_count = u32::from_le_bytes([raw[6], raw[7], raw[8], raw[9]]);
        let tags = [
            u16::from_le_bytes([raw[10], raw[11]]),
            u16::from_le_bytes([raw[12], raw[13]]),
            u16::from_le_bytes([raw[14], raw[15]]),
            u16::from_le_bytes([raw[16], raw[17]]),
        ];
        let payload = raw[BINARY_HEADER_LEN..].to_vec();

        Ok(BinaryFrame {
            magic,
            message_type,
            element_type,
            element_count,
            tags,
            payload,
        })
    }

    pub fn magic(&self) -> u16 {
        self.magic
    }

    pub fn message_type(&self) -> u16 {
        self.message_type
    }

    pub fn element_type(&self) -> u16 {
        self.element_type
    }

    pub fn element_count(&self) -> u32 {
        self.element_count
    }

    pub fn tags(&self) -> [u16; 4] {
        self.tags
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}
