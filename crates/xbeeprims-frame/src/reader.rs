use std::io::{ErrorKind, Read};
use std::time::Duration;

use bytes::BytesMut;
use tracing::{debug, trace};
use xbeeprims_transport::Transport;

use crate::codec::{decode_frame, Decoded, Frame, FrameConfig};
use crate::error::{FrameError, FramingError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 512;
const READ_CHUNK_SIZE: usize = 256;

/// Spurious zero-byte reads tolerated before the stream counts as closed.
const MAX_EMPTY_READS: usize = 3;
const EMPTY_READ_BACKOFF: Duration = Duration::from_micros(10);

/// Counters for frames decoded and discarded by a [`FrameReader`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Frames that passed the checksum.
    pub frames: u64,
    /// Bytes skipped while hunting for a delimiter.
    pub noise_bytes: u64,
    /// Frames with a zero length field.
    pub zero_length: u64,
    /// Frames whose length field exceeded the maximum.
    pub oversized: u64,
    /// Frames with a bad checksum.
    pub checksum_mismatch: u64,
    /// Frames cut short by a new delimiter.
    pub interrupted: u64,
}

impl FrameStats {
    /// Account for one discarded run of bytes.
    pub fn record(&mut self, error: &FramingError) {
        match error {
            FramingError::Noise { skipped } => self.noise_bytes += *skipped as u64,
            FramingError::ZeroLength => self.zero_length += 1,
            FramingError::Oversized { .. } => self.oversized += 1,
            FramingError::ChecksumMismatch { .. } => self.checksum_mismatch += 1,
            FramingError::Interrupted { .. } => self.interrupted += 1,
        }
    }

    /// Total number of discarded frames (noise excluded).
    pub fn discarded(&self) -> u64 {
        self.zero_length + self.oversized + self.checksum_mismatch + self.interrupted
    }
}

/// Reads verified frames from any `Read` stream.
///
/// Handles partial reads, escaping and resynchronization internally:
/// callers only ever see frames with a valid checksum.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
    stats: FrameStats,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
            stats: FrameStats::default(),
        }
    }

    /// Read the next verified frame (blocking).
    ///
    /// Malformed frames are discarded and counted in [`FrameReader::stats`].
    /// A read timeout on the underlying stream surfaces as
    /// `FrameError::Io` with the partial frame kept for the next call.
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            while let Some(decoded) = decode_frame(&mut self.buf, self.config.max_frame_length) {
                match decoded {
                    Decoded::Frame(frame) => {
                        self.stats.frames += 1;
                        trace!(
                            frame_type = frame.frame_type,
                            len = frame.payload.len(),
                            "frame received"
                        );
                        return Ok(frame);
                    }
                    Decoded::Discarded(error) => {
                        self.stats.record(&error);
                        debug!(%error, "discarding frame");
                    }
                }
            }

            self.fill()?;
        }
    }

    fn fill(&mut self) -> Result<()> {
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        let mut empty_reads = 0usize;
        loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => {
                    empty_reads += 1;
                    if empty_reads > MAX_EMPTY_READS {
                        return Err(FrameError::ConnectionClosed);
                    }
                    std::thread::sleep(EMPTY_READ_BACKOFF);
                }
                Ok(read) => {
                    self.buf.extend_from_slice(&chunk[..read]);
                    return Ok(());
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Decode counters accumulated so far.
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl<T: Transport> FrameReader<T> {
    /// Create a frame reader for a transport and apply the read timeout from config.
    pub fn with_config_transport(inner: T, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_frame_error(err: xbeeprims_transport::TransportError) -> FrameError {
    match err {
        xbeeprims_transport::TransportError::Io(io) => FrameError::Io(io),
        xbeeprims_transport::TransportError::Open { source, .. }
        | xbeeprims_transport::TransportError::Configure { source, .. }
        | xbeeprims_transport::TransportError::Locked { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}

/// Returns true for the errors a read timeout produces.
pub fn is_timeout(err: &FrameError) -> bool {
    matches!(
        err,
        FrameError::Io(io) if matches!(io.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut)
    )
}
