use std::io::{ErrorKind, Write};

use bytes::BytesMut;
use tracing::trace;
use xbeeprims_transport::Transport;

use crate::codec::{encode_frame_limited, Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::reader::transport_to_frame_error;

// Worst case: every byte after the delimiter escaped.
fn wire_capacity(max_payload: usize) -> usize {
    1 + 2 * (2 + 1 + max_payload + 1)
}

/// Writes complete API frames to any `Write` stream.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(wire_capacity(config.max_payload)),
            config,
        }
    }

    /// Write a complete frame (blocking).
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send(frame.frame_type, frame.payload.as_ref())
    }

    /// Encode and send one frame.
    ///
    /// Nothing is written when the payload is over `config.max_payload`. A write
    /// timeout surfaces as `FrameError::Io` and may leave a partial frame on
    /// the line; the radio discards it when the next delimiter arrives.
    pub fn send(&mut self, frame_type: u8, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_frame_limited(frame_type, payload, self.config.max_payload, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        trace!(frame_type, wire_len = self.buf.len(), "frame sent");
        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl<T: Transport> FrameWriter<T> {
    /// Create a frame writer for a transport and apply the write timeout from config.
    pub fn with_config_transport(inner: T, config: FrameConfig) -> Result<Self> {
        inner
            .set_write_timeout(config.write_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}
