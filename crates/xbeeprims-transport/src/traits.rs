use std::io::{Read, Write};
use std::time::Duration;

use crate::error::Result;

/// A duplex byte stream the radio is reachable through.
///
/// The session clones the transport once: the clone feeds the receiver
/// thread, the first handle is written to under the send lock.
pub trait Transport: Read + Write + Send + Sized + 'static {
    /// Create a second handle to the same underlying stream.
    fn try_clone(&self) -> Result<Self>;

    /// Bound how long a single `read` may block.
    ///
    /// Reads that hit the timeout fail with `WouldBlock` or `TimedOut`.
    fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()>;

    /// Bound how long a single `write` may block.
    fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()>;

    /// Transport name for diagnostics.
    fn transport_name(&self) -> &'static str;
}

#[cfg(unix)]
impl Transport for std::os::unix::net::UnixStream {
    fn try_clone(&self) -> Result<Self> {
        Ok(std::os::unix::net::UnixStream::try_clone(self)?)
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        std::os::unix::net::UnixStream::set_read_timeout(self, timeout).map_err(Into::into)
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        std::os::unix::net::UnixStream::set_write_timeout(self, timeout).map_err(Into::into)
    }

    fn transport_name(&self) -> &'static str {
        "unix-stream"
    }
}

impl Transport for std::net::TcpStream {
    fn try_clone(&self) -> Result<Self> {
        Ok(std::net::TcpStream::try_clone(self)?)
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        std::net::TcpStream::set_read_timeout(self, timeout).map_err(Into::into)
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        std::net::TcpStream::set_write_timeout(self, timeout).map_err(Into::into)
    }

    fn transport_name(&self) -> &'static str {
        "tcp-stream"
    }
}
