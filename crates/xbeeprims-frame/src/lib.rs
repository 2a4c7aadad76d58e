//! API-mode framing for XBee radios.
//!
//! Every frame on the serial line looks like:
//! - a `0x7E` delimiter
//! - a 2-byte big-endian length covering the API identifier and frame data
//! - the API identifier and frame data
//! - a checksum: `0xFF` minus the low byte of their sum
//!
//! Everything after the delimiter is escaped (`0x7D`, `byte ^ 0x20`) when it
//! collides with `0x7E`, `0x7D`, XON or XOFF. Malformed input is dropped
//! and the decoder resynchronizes on the next delimiter.

pub mod api;
#[cfg(feature = "async")]
pub mod async_codec;
pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::ApiCodec;
pub use codec::{
    checksum, decode_frame, encode_frame, encode_frame_limited, needs_escape, Decoded, Frame,
    FrameConfig, DELIMITER, ESCAPE, MAX_FRAME_LENGTH, MAX_PAYLOAD, MAX_REQUEST_DATA,
    MAX_REQUEST_HEADER,
};
pub use error::{FrameError, FramingError, Result};
pub use reader::{is_timeout, FrameReader, FrameStats};
pub use writer::FrameWriter;
