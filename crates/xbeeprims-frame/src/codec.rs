use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, FramingError, Result};

/// Frame start delimiter.
pub const DELIMITER: u8 = 0x7E;

/// Escape marker; the following byte is XORed with [`ESCAPE_XOR`].
pub const ESCAPE: u8 = 0x7D;

/// Software flow control: resume.
pub const XON: u8 = 0x11;

/// Software flow control: pause.
pub const XOFF: u8 = 0x13;

/// Value XORed into an escaped byte.
pub const ESCAPE_XOR: u8 = 0x20;

/// Maximum payload (frame data after the type byte) accepted for encoding.
pub const MAX_PAYLOAD: usize = 100;

/// Maximum length field (type byte + payload) accepted when decoding.
pub const MAX_FRAME_LENGTH: usize = 100;

/// Longest header a request puts in front of the caller's payload:
/// frame id, 64-bit and 16-bit address, options.
pub const MAX_REQUEST_HEADER: usize = 12;

/// Frame data ceiling for outgoing requests: a full payload plus header.
pub const MAX_REQUEST_DATA: usize = MAX_PAYLOAD + MAX_REQUEST_HEADER;

/// `sum(type, payload, checksum) mod 256` of every valid frame.
const CHECKSUM_TARGET: u8 = 0xFF;

/// A verified API frame: identifier plus frame data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// API identifier (see [`crate::api`]).
    pub frame_type: u8,
    /// Frame data following the identifier.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(frame_type: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            frame_type,
            payload: payload.into(),
        }
    }

    /// Value of the length field for this frame.
    pub fn length(&self) -> usize {
        1 + self.payload.len()
    }
}

/// Outcome of one decoding step over a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A complete frame with a valid checksum.
    Frame(Frame),
    /// Bytes were consumed and thrown away.
    Discarded(FramingError),
}

/// Returns true if `byte` must be escaped on the wire.
pub fn needs_escape(byte: u8) -> bool {
    matches!(byte, DELIMITER | ESCAPE | XON | XOFF)
}

/// Checksum byte for a frame: `0xFF - (sum(type, payload) mod 256)`.
pub fn checksum(frame_type: u8, payload: &[u8]) -> u8 {
    let sum = payload
        .iter()
        .fold(frame_type, |acc, byte| acc.wrapping_add(*byte));
    CHECKSUM_TARGET.wrapping_sub(sum)
}

fn put_escaped(dst: &mut BytesMut, byte: u8) {
    if needs_escape(byte) {
        dst.put_u8(ESCAPE);
        dst.put_u8(byte ^ ESCAPE_XOR);
    } else {
        dst.put_u8(byte);
    }
}

/// Encode a frame into the wire format.
///
/// Wire format (everything after the delimiter is escaped):
/// ```text
/// ┌───────────┬──────────────┬──────────┬────────────────┬──────────┐
/// │ 0x7E      │ Length (2B)  │ Type     │ Payload        │ Checksum │
/// │ delimiter │ big-endian   │ (1B)     │ (Length - 1 B) │ (1B)     │
/// └───────────┴──────────────┴──────────┴────────────────┴──────────┘
/// ```
///
/// Fails with `PayloadTooLarge` over [`MAX_PAYLOAD`] bytes.
pub fn encode_frame(frame_type: u8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    encode_frame_limited(frame_type, payload, MAX_PAYLOAD, dst)
}

/// [`encode_frame`] with an explicit ceiling on the frame data.
///
/// Nothing is written to `dst` when the ceiling is exceeded.
pub fn encode_frame_limited(
    frame_type: u8,
    payload: &[u8],
    max_payload: usize,
    dst: &mut BytesMut,
) -> Result<()> {
    if payload.len() > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: max_payload,
        });
    }

    let length = (1 + payload.len()) as u16;
    // Worst case every byte after the delimiter is escaped.
    dst.reserve(1 + 2 * (payload.len() + 4));
    dst.put_u8(DELIMITER);
    for byte in length.to_be_bytes() {
        put_escaped(dst, byte);
    }
    put_escaped(dst, frame_type);
    for byte in payload {
        put_escaped(dst, *byte);
    }
    put_escaped(dst, checksum(frame_type, payload));
    Ok(())
}

/// Decode the next frame from a buffer.
///
/// Returns `None` when the buffer holds no complete frame yet; the partial
/// frame stays in `src` for the next call. Otherwise consumes bytes and
/// returns either a verified frame or the reason bytes were discarded.
/// Callers loop until `None`, then read more input.
///
/// A raw delimiter never appears inside a correctly escaped frame, so one
/// met mid-frame aborts the current frame and starts the next.
pub fn decode_frame(src: &mut BytesMut, max_length: usize) -> Option<Decoded> {
    match src.iter().position(|byte| *byte == DELIMITER) {
        None if src.is_empty() => return None,
        None => {
            let skipped = src.len();
            src.clear();
            return Some(Decoded::Discarded(FramingError::Noise { skipped }));
        }
        Some(0) => {}
        Some(skipped) => {
            src.advance(skipped);
            return Some(Decoded::Discarded(FramingError::Noise { skipped }));
        }
    }

    let (consumed, outcome) = match scan_frame(&src[1..], max_length) {
        Scan::Incomplete => return None,
        Scan::Done { consumed, outcome } => (consumed, outcome),
    };
    src.advance(1 + consumed);
    Some(outcome)
}

enum Scan {
    Incomplete,
    Done { consumed: usize, outcome: Decoded },
}

enum Step {
    Byte(u8),
    Delimiter,
    Incomplete,
}

/// Reads unescaped bytes from the raw bytes following a delimiter.
struct Unescaper<'a> {
    raw: &'a [u8],
    pos: usize,
}

impl Unescaper<'_> {
    fn next(&mut self) -> Step {
        let Some(&byte) = self.raw.get(self.pos) else {
            return Step::Incomplete;
        };
        if byte == DELIMITER {
            return Step::Delimiter;
        }
        self.pos += 1;
        if byte != ESCAPE {
            return Step::Byte(byte);
        }
        match self.raw.get(self.pos) {
            None => Step::Incomplete,
            Some(&DELIMITER) => Step::Delimiter,
            Some(&escaped) => {
                self.pos += 1;
                Step::Byte(escaped ^ ESCAPE_XOR)
            }
        }
    }
}

fn scan_frame(raw: &[u8], max_length: usize) -> Scan {
    let mut input = Unescaper { raw, pos: 0 };

    macro_rules! next_byte {
        () => {
            match input.next() {
                Step::Byte(byte) => byte,
                Step::Incomplete => return Scan::Incomplete,
                Step::Delimiter => {
                    return Scan::Done {
                        consumed: input.pos,
                        outcome: Decoded::Discarded(FramingError::Interrupted {
                            consumed: input.pos,
                        }),
                    }
                }
            }
        };
    }

    let length = u16::from_be_bytes([next_byte!(), next_byte!()]) as usize;
    if length == 0 {
        return Scan::Done {
            consumed: input.pos,
            outcome: Decoded::Discarded(FramingError::ZeroLength),
        };
    }
    if length > max_length {
        return Scan::Done {
            consumed: input.pos,
            outcome: Decoded::Discarded(FramingError::Oversized {
                length,
                max: max_length,
            }),
        };
    }

    let frame_type = next_byte!();
    let mut sum = frame_type;
    let mut payload = BytesMut::with_capacity(length - 1);
    for _ in 1..length {
        let byte = next_byte!();
        sum = sum.wrapping_add(byte);
        payload.put_u8(byte);
    }

    let received = next_byte!();
    let outcome = if sum.wrapping_add(received) == CHECKSUM_TARGET {
        Decoded::Frame(Frame {
            frame_type,
            payload: payload.freeze(),
        })
    } else {
        Decoded::Discarded(FramingError::ChecksumMismatch {
            expected: CHECKSUM_TARGET.wrapping_sub(sum),
            received,
        })
    };
    Scan::Done {
        consumed: input.pos,
        outcome,
    }
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Largest length field accepted when decoding. Default: 100.
    pub max_frame_length: usize,
    /// Largest frame data accepted when encoding. Default: 100.
    pub max_payload: usize,
    /// Read timeout for blocking operations.
    pub read_timeout: Option<std::time::Duration>,
    /// Write timeout for blocking operations.
    pub write_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_length: MAX_FRAME_LENGTH,
            max_payload: MAX_PAYLOAD,
            read_timeout: None,
            write_timeout: None,
        }
    }
}
