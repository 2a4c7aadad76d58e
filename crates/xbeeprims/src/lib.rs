//! Host-side driver for XBee radio modules in API mode.
//!
//! xbeeprims turns a serial line into typed, addressed packets and turns
//! application payloads into framed, escaped, checksummed wire bytes.
//!
//! # Crate Structure
//!
//! - [`transport`]: Duplex byte streams (serial ports and sockets)
//! - [`frame`]: API frame codec, reader and writer
//! - [`packet`]: Typed packets decoded from frames
//! - [`session`]: Connections, packet queue and background receiver
//!
//! ```no_run
//! use std::time::Duration;
//! use xbeeprims::{Address, ConnectionType, SerialPort, Session};
//!
//! let port = SerialPort::open("/dev/ttyUSB0", 9600)?;
//! let session = Session::setup(port)?;
//! let at = session.new_connection(1, ConnectionType::LocalAt, Address::None)?;
//! session.send(at, b"NI")?;
//! if let Some(reply) = session.get_packet_wait(at, Duration::from_secs(1))? {
//!     println!("{}", String::from_utf8_lossy(reply.data()));
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Re-export transport types.
pub mod transport {
    pub use xbeeprims_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use xbeeprims_frame::*;
}

/// Re-export packet types.
pub mod packet {
    pub use xbeeprims_packet::*;
}

/// Re-export session types.
pub mod session {
    pub use xbeeprims_session::*;
}

pub use xbeeprims_packet::{Address, Packet, PacketType};
pub use xbeeprims_session::{
    Connection, ConnectionFlags, ConnectionHandle, ConnectionType, Session, SessionConfig,
    SessionError,
};
#[cfg(unix)]
pub use xbeeprims_transport::SerialPort;
pub use xbeeprims_transport::Transport;
