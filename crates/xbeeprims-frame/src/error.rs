/// Errors that can occur during frame encoding/decoding.
///
/// Only these reach callers. Malformed frames on the wire are recovered
/// inside the decoder and reported as [`FramingError`] diagnostics instead.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the protocol maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream reached end-of-file.
    #[error("connection closed")]
    ConnectionClosed,
}

/// A malformed frame that the decoder discarded before resynchronizing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FramingError {
    /// Bytes seen while hunting for a frame delimiter.
    #[error("skipped {skipped} bytes before frame delimiter")]
    Noise { skipped: usize },

    /// The length field was zero.
    #[error("zero length frame")]
    ZeroLength,

    /// The length field exceeds the accepted maximum.
    #[error("oversized frame (length {length}, max {max})")]
    Oversized { length: usize, max: usize },

    /// The trailing checksum does not match the frame contents.
    #[error("checksum mismatch (expected 0x{expected:02X}, received 0x{received:02X})")]
    ChecksumMismatch { expected: u8, received: u8 },

    /// A new delimiter arrived before the current frame was complete.
    #[error("frame interrupted by delimiter after {consumed} bytes")]
    Interrupted { consumed: usize },
}

pub type Result<T> = std::result::Result<T, FrameError>;
