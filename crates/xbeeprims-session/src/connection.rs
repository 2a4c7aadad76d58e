use std::fmt;

use serde::Serialize;
use xbeeprims_packet::{Address, Packet};

use crate::error::{Result, SessionError};

/// Kinds of logical endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    /// AT commands to the local module.
    LocalAt,
    /// Remote AT without a width; normalized to [`ConnectionType::RemoteAt64`].
    RemoteAt,
    RemoteAt16,
    RemoteAt64,
    Data16,
    Data64,
    Io16,
    Io64,
    TxStatus,
    ModemStatus,
    /// Normalized to [`ConnectionType::LocalAt`].
    Unknown,
}

impl ConnectionType {
    /// Resolve the request-only types to concrete ones.
    pub fn normalize(self) -> Self {
        match self {
            ConnectionType::Unknown => ConnectionType::LocalAt,
            ConnectionType::RemoteAt => ConnectionType::RemoteAt64,
            other => other,
        }
    }

    /// Address width in bytes: 0, 2 or 8.
    pub fn address_width(&self) -> usize {
        match self.normalize() {
            ConnectionType::RemoteAt16 | ConnectionType::Data16 | ConnectionType::Io16 => 2,
            ConnectionType::RemoteAt64 | ConnectionType::Data64 | ConnectionType::Io64 => 8,
            _ => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionType::LocalAt => "local_at",
            ConnectionType::RemoteAt => "remote_at",
            ConnectionType::RemoteAt16 => "remote_at_16",
            ConnectionType::RemoteAt64 => "remote_at_64",
            ConnectionType::Data16 => "data_16",
            ConnectionType::Data64 => "data_64",
            ConnectionType::Io16 => "io_16",
            ConnectionType::Io64 => "io_64",
            ConnectionType::TxStatus => "tx_status",
            ConnectionType::ModemStatus => "modem_status",
            ConnectionType::Unknown => "unknown",
        }
    }

    /// Check `address` against this type's width.
    ///
    /// Width-less types ignore whatever address they are given.
    pub fn resolve_address(&self, address: Address) -> Result<Address> {
        let resolved = match (self.address_width(), address) {
            (0, _) => Address::None,
            (2, Address::Short(_)) | (8, Address::Long(_)) => address,
            _ => {
                return Err(SessionError::InvalidAddress {
                    connection_type: self.normalize(),
                    address,
                })
            }
        };
        Ok(resolved)
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options applied when sending; not part of a connection's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ConnectionFlags {
    /// Queue AT parameter changes until `AC` or a non-queued command.
    pub queue_at: bool,
    /// Ask the module not to wait for an acknowledgement.
    pub disable_ack: bool,
    /// Send to the PAN broadcast address.
    pub broadcast: bool,
}

/// Opaque handle to a registered connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ConnectionHandle(pub(crate) u64);

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A logical endpoint: what a caller sends through and receives on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Connection {
    pub handle: ConnectionHandle,
    pub connection_type: ConnectionType,
    pub frame_id: u8,
    pub address: Address,
    pub flags: ConnectionFlags,
}

impl Connection {
    /// Routing predicate: should `packet` be delivered to this connection.
    pub fn matches(&self, packet: &Packet) -> bool {
        use ConnectionType as C;

        match packet {
            Packet::ModemStatus { .. } => self.connection_type == C::ModemStatus,
            Packet::TxStatus { frame_id, .. } => {
                self.connection_type == C::TxStatus && self.frame_id == *frame_id
            }
            Packet::LocalAtResponse { frame_id, .. } => {
                self.connection_type == C::LocalAt && self.frame_id == *frame_id
            }
            Packet::RemoteAtResponse { frame_id, .. } => {
                matches!(self.connection_type, C::RemoteAt16 | C::RemoteAt64)
                    && self.frame_id == *frame_id
            }
            Packet::Data { source, .. } => {
                let wanted = match source {
                    Address::Long(_) => C::Data64,
                    _ => C::Data16,
                };
                self.connection_type == wanted && self.address == *source
            }
            Packet::Io { source, .. } => {
                let wanted = match source {
                    Address::Long(_) => C::Io64,
                    _ => C::Io16,
                };
                self.connection_type == wanted && self.address == *source
            }
            Packet::Unknown { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use xbeeprims_packet::{AtStatus, IoSample, ModemStatus, RxOptions, TxStatus};

    use super::*;

    fn conn(connection_type: ConnectionType, frame_id: u8, address: Address) -> Connection {
        Connection {
            handle: ConnectionHandle(1),
            connection_type,
            frame_id,
            address,
            flags: ConnectionFlags::default(),
        }
    }

    fn data(source: Address) -> Packet {
        Packet::Data {
            source,
            rssi: 40,
            options: RxOptions(0),
            data: b"x".to_vec(),
        }
    }

    fn remote_response(frame_id: u8) -> Packet {
        Packet::RemoteAtResponse {
            frame_id,
            address64: 1,
            address16: 2,
            command: *b"D0",
            status: AtStatus(0),
            data: vec![],
        }
    }

    #[test]
    fn normalizes_request_only_types() {
        assert_eq!(ConnectionType::Unknown.normalize(), ConnectionType::LocalAt);
        assert_eq!(ConnectionType::RemoteAt.normalize(), ConnectionType::RemoteAt64);
        assert_eq!(ConnectionType::Io16.normalize(), ConnectionType::Io16);
    }

    #[test]
    fn address_widths() {
        assert_eq!(ConnectionType::RemoteAt.address_width(), 8);
        assert_eq!(ConnectionType::Data16.address_width(), 2);
        assert_eq!(ConnectionType::TxStatus.address_width(), 0);
    }

    #[test]
    fn resolve_address_checks_width() {
        assert_eq!(
            ConnectionType::Data16
                .resolve_address(Address::Short(5))
                .unwrap(),
            Address::Short(5)
        );
        assert_eq!(
            ConnectionType::LocalAt
                .resolve_address(Address::Long(5))
                .unwrap(),
            Address::None
        );
        assert!(matches!(
            ConnectionType::Io64.resolve_address(Address::Short(5)),
            Err(SessionError::InvalidAddress { .. })
        ));
        assert!(ConnectionType::RemoteAt.resolve_address(Address::None).is_err());
    }

    #[test]
    fn modem_status_always_matches() {
        let c = conn(ConnectionType::ModemStatus, 9, Address::None);
        assert!(c.matches(&Packet::ModemStatus {
            status: ModemStatus(2)
        }));
        assert!(!c.matches(&Packet::TxStatus {
            frame_id: 9,
            status: TxStatus(0)
        }));
    }

    #[test]
    fn status_and_at_responses_match_on_frame_id() {
        let tx = conn(ConnectionType::TxStatus, 3, Address::None);
        assert!(tx.matches(&Packet::TxStatus {
            frame_id: 3,
            status: TxStatus(1)
        }));
        assert!(!tx.matches(&Packet::TxStatus {
            frame_id: 4,
            status: TxStatus(1)
        }));

        let at = conn(ConnectionType::LocalAt, 1, Address::None);
        let response = Packet::LocalAtResponse {
            frame_id: 1,
            command: *b"NI",
            status: AtStatus(0),
            data: vec![],
        };
        assert!(at.matches(&response));
        assert!(!tx.matches(&response));
    }

    #[test]
    fn remote_responses_match_either_width() {
        let r16 = conn(ConnectionType::RemoteAt16, 5, Address::Short(1));
        let r64 = conn(ConnectionType::RemoteAt64, 5, Address::Long(1));
        let local = conn(ConnectionType::LocalAt, 5, Address::None);

        assert!(r16.matches(&remote_response(5)));
        assert!(r64.matches(&remote_response(5)));
        assert!(!r64.matches(&remote_response(6)));
        assert!(!local.matches(&remote_response(5)));
    }

    #[test]
    fn data_matches_on_address_and_width() {
        let c16 = conn(ConnectionType::Data16, 0, Address::Short(0x1234));
        let c64 = conn(ConnectionType::Data64, 0, Address::Long(0x1234));

        assert!(c16.matches(&data(Address::Short(0x1234))));
        assert!(!c16.matches(&data(Address::Short(0x1235))));
        assert!(!c16.matches(&data(Address::Long(0x1234))));
        assert!(c64.matches(&data(Address::Long(0x1234))));
    }

    #[test]
    fn io_does_not_match_data_connections() {
        let c = conn(ConnectionType::Data16, 0, Address::Short(7));
        let io = Packet::Io {
            source: Address::Short(7),
            rssi: 0,
            options: RxOptions(0),
            sample: IoSample::default(),
        };
        assert!(!c.matches(&io));
        assert!(conn(ConnectionType::Io16, 0, Address::Short(7)).matches(&io));
    }

    #[test]
    fn unknown_packets_never_match() {
        let c = conn(ConnectionType::LocalAt, 0, Address::None);
        assert!(!c.matches(&Packet::Unknown {
            frame_type: 0x95,
            payload: vec![]
        }));
    }
}
