//! Sessions over an XBee module in API mode.
//!
//! A [`Session`] owns a background receiver that turns incoming frames into
//! packets and queues the ones some live [`Connection`] wants. Callers
//! create connections, send through them, and pick up their packets with
//! [`Session::get_packet`] or [`Session::get_packet_wait`].
//!
//! Locks are taken per operation and always in the order registry, then
//! queue; the send path has its own lock.

pub mod connection;
pub mod error;
pub mod queue;
mod receiver;
pub mod registry;
pub mod request;
pub mod session;

pub use connection::{Connection, ConnectionFlags, ConnectionHandle, ConnectionType};
pub use error::{Result, SessionError};
pub use queue::PacketQueue;
pub use receiver::SessionStats;
pub use registry::Registry;
pub use request::build_request;
pub use session::{Session, SessionConfig, DEFAULT_WAIT};
