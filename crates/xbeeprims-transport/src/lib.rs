//! Duplex byte-stream transports for XBee API mode.
//!
//! The radio speaks over a serial line, but nothing above this crate cares:
//! every layer builds on the [`Transport`] trait, which only asks for
//! `Read + Write`, a way to split off a second handle for the receiver
//! thread, and a read timeout so that thread can notice shutdown.
//!
//! - [`SerialPort`]: a tty in 8N1 mode via `serialport` (Unix)
//! - `UnixStream`: a socket bridge (e.g. `socat`/`ser2net`) or a test pair

pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod serial;

pub use error::{Result, TransportError};
pub use traits::Transport;

#[cfg(unix)]
pub use serial::{SerialConfig, SerialPort, SUPPORTED_BAUD_RATES};
