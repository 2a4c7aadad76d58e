use xbeeprims_packet::Address;

use crate::connection::{ConnectionHandle, ConnectionType};

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] xbeeprims_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] xbeeprims_frame::FrameError),

    /// The handle does not name a live connection.
    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionHandle),

    /// The address is missing or has the wrong width for the connection type.
    #[error("address {address} does not fit a {connection_type} connection")]
    InvalidAddress {
        connection_type: ConnectionType,
        address: Address,
    },

    /// The payload exceeds the protocol maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An AT payload must start with a two-character command.
    #[error("AT command needs at least 2 bytes, got {0}")]
    CommandTooShort(usize),

    /// The connection type only receives.
    #[error("cannot send on a {0} connection")]
    UnsupportedSend(ConnectionType),

    /// Memory for a new connection or packet could not be reserved.
    #[error("out of memory: {0}")]
    ResourceExhausted(#[from] std::collections::TryReserveError),

    /// The receiver thread could not be started.
    #[error("failed to start receiver: {0}")]
    Spawn(#[source] std::io::Error),

    /// The receiver thread panicked.
    #[error("receiver thread panicked")]
    ReceiverPanicked,
}

pub type Result<T> = std::result::Result<T, SessionError>;
