/// Errors that can occur while decoding a verified frame into packets.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The frame data is shorter than the fields its type requires.
    #[error("truncated 0x{frame_type:02X} frame ({len} bytes, need {needed})")]
    Truncated {
        frame_type: u8,
        needed: usize,
        len: usize,
    },
}

/// A textual address could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid address {input:?}: expected 1-4 hex digits, 16 hex digits, or HIGH:LOW halves")]
pub struct ParseAddressError {
    pub input: String,
}

pub type Result<T> = std::result::Result<T, DecodeError>;
