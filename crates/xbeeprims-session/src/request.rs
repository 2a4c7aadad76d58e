//! Outgoing API frames built from a connection and a caller payload.

use xbeeprims_frame::{api, Frame, MAX_PAYLOAD};
use xbeeprims_packet::address::USE_64BIT_ADDRESS;
use xbeeprims_packet::Address;

use crate::connection::{Connection, ConnectionType};
use crate::error::{Result, SessionError};

/// Remote AT option: apply the change immediately.
pub const REMOTE_APPLY_CHANGES: u8 = 0x02;
/// Transmit option: do not request an acknowledgement.
pub const TX_DISABLE_ACK: u8 = 0x01;
/// Transmit option: send with the broadcast PAN id.
pub const TX_BROADCAST_PAN: u8 = 0x04;

/// Build the frame that sends `payload` through `connection`.
///
/// For AT connections the payload is the two-character command followed
/// by an optional parameter value.
pub fn build_request(connection: &Connection, payload: &[u8]) -> Result<Frame> {
    if payload.len() > MAX_PAYLOAD {
        return Err(SessionError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }

    let flags = connection.flags;
    let mut data = Vec::with_capacity(payload.len() + 14);
    data.push(connection.frame_id);

    let frame_type = match connection.connection_type {
        ConnectionType::LocalAt | ConnectionType::Unknown => {
            at_command(payload)?;
            data.extend_from_slice(payload);
            if flags.queue_at {
                api::AT_COMMAND_QUEUED
            } else {
                api::AT_COMMAND
            }
        }
        ConnectionType::RemoteAt
        | ConnectionType::RemoteAt16
        | ConnectionType::RemoteAt64 => {
            at_command(payload)?;
            match connection.address {
                Address::Short(addr16) => {
                    data.extend_from_slice(&[0u8; 8]);
                    data.extend_from_slice(&addr16.to_be_bytes());
                }
                other => {
                    other.write_to(&mut data);
                    data.extend_from_slice(&USE_64BIT_ADDRESS.to_be_bytes());
                }
            }
            data.push(if flags.queue_at { 0x00 } else { REMOTE_APPLY_CHANGES });
            data.extend_from_slice(payload);
            api::REMOTE_AT_COMMAND
        }
        ConnectionType::Data16 | ConnectionType::Data64 => {
            connection.address.write_to(&mut data);
            let mut options = 0u8;
            if flags.disable_ack {
                options |= TX_DISABLE_ACK;
            }
            if flags.broadcast {
                options |= TX_BROADCAST_PAN;
            }
            data.push(options);
            data.extend_from_slice(payload);
            if connection.connection_type == ConnectionType::Data64 {
                api::TX_REQUEST_64
            } else {
                api::TX_REQUEST_16
            }
        }
        other @ (ConnectionType::Io16
        | ConnectionType::Io64
        | ConnectionType::TxStatus
        | ConnectionType::ModemStatus) => return Err(SessionError::UnsupportedSend(other)),
    };

    Ok(Frame::new(frame_type, data))
}

fn at_command(payload: &[u8]) -> Result<()> {
    if payload.len() < 2 {
        return Err(SessionError::CommandTooShort(payload.len()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;
    use xbeeprims_frame::{encode_frame, encode_frame_limited, MAX_REQUEST_DATA};

    use super::*;
    use crate::connection::{ConnectionFlags, ConnectionHandle};

    fn conn(connection_type: ConnectionType, frame_id: u8, address: Address) -> Connection {
        Connection {
            handle: ConnectionHandle(1),
            connection_type,
            frame_id,
            address,
            flags: ConnectionFlags::default(),
        }
    }

    #[test]
    fn largest_header_on_full_payload_fits_request_ceiling() {
        let remote = conn(
            ConnectionType::RemoteAt64,
            1,
            Address::Long(0x0013_A200_4000_0001),
        );
        let frame = build_request(&remote, &[b'N'; MAX_PAYLOAD]).unwrap();
        assert_eq!(frame.payload.len(), MAX_REQUEST_DATA);

        let mut wire = BytesMut::new();
        assert!(encode_frame(frame.frame_type, &frame.payload, &mut wire).is_err());
        encode_frame_limited(frame.frame_type, &frame.payload, MAX_REQUEST_DATA, &mut wire)
            .unwrap();
        assert_eq!(wire[0], 0x7E);
    }

    #[test]
    fn local_at_node_identifier_query() {
        let frame = build_request(&conn(ConnectionType::LocalAt, 1, Address::None), b"NI").unwrap();
        assert_eq!(frame.frame_type, 0x08);
        assert_eq!(frame.payload.as_ref(), &[0x01, b'N', b'I']);

        let mut wire = BytesMut::new();
        encode_frame(frame.frame_type, &frame.payload, &mut wire).unwrap();
        assert_eq!(
            wire.as_ref(),
            &[0x7E, 0x00, 0x04, 0x08, 0x01, 0x4E, 0x49, 0x5F]
        );
    }

    #[test]
    fn queued_local_at_uses_queue_frame_type() {
        let mut c = conn(ConnectionType::LocalAt, 2, Address::None);
        c.flags.queue_at = true;

        let frame = build_request(&c, b"D0\x05").unwrap();
        assert_eq!(frame.frame_type, 0x09);
        assert_eq!(frame.payload.as_ref(), &[0x02, b'D', b'0', 0x05]);
    }

    #[test]
    fn remote_at_64_layout() {
        let c = conn(
            ConnectionType::RemoteAt64,
            3,
            Address::Long(0x0013_A200_40A1_B2C3),
        );

        let frame = build_request(&c, b"D1\x04").unwrap();
        assert_eq!(frame.frame_type, 0x17);
        assert_eq!(
            frame.payload.as_ref(),
            &[
                0x03, 0x00, 0x13, 0xA2, 0x00, 0x40, 0xA1, 0xB2, 0xC3, 0xFF, 0xFE, 0x02, b'D',
                b'1', 0x04
            ]
        );
    }

    #[test]
    fn remote_at_16_layout_and_queued_option() {
        let mut c = conn(ConnectionType::RemoteAt16, 4, Address::Short(0x1234));
        c.flags.queue_at = true;

        let frame = build_request(&c, b"NI").unwrap();
        assert_eq!(
            frame.payload.as_ref(),
            &[0x04, 0, 0, 0, 0, 0, 0, 0, 0, 0x12, 0x34, 0x00, b'N', b'I']
        );
    }

    #[test]
    fn data_requests_carry_options() {
        let mut c16 = conn(ConnectionType::Data16, 5, Address::Short(0xBEEF));
        c16.flags.disable_ack = true;
        c16.flags.broadcast = true;

        let frame = build_request(&c16, b"hi").unwrap();
        assert_eq!(frame.frame_type, 0x01);
        assert_eq!(frame.payload.as_ref(), &[0x05, 0xBE, 0xEF, 0x05, b'h', b'i']);

        let c64 = conn(ConnectionType::Data64, 0, Address::Long(0xFFFF));
        let frame = build_request(&c64, b"").unwrap();
        assert_eq!(frame.frame_type, 0x00);
        assert_eq!(
            frame.payload.as_ref(),
            &[0x00, 0, 0, 0, 0, 0, 0, 0xFF, 0xFF, 0x00]
        );
    }

    #[test]
    fn payload_over_limit_rejected() {
        let c = conn(ConnectionType::Data16, 0, Address::Short(1));
        let err = build_request(&c, &[0u8; 101]).unwrap_err();
        assert!(matches!(
            err,
            SessionError::PayloadTooLarge { size: 101, max: 100 }
        ));
    }

    #[test]
    fn short_at_command_rejected() {
        let c = conn(ConnectionType::LocalAt, 1, Address::None);
        assert!(matches!(
            build_request(&c, b"N"),
            Err(SessionError::CommandTooShort(1))
        ));
    }

    #[test]
    fn receive_only_connections_reject_sends() {
        for kind in [
            ConnectionType::Io16,
            ConnectionType::Io64,
            ConnectionType::TxStatus,
            ConnectionType::ModemStatus,
        ] {
            let c = conn(kind, 0, Address::None);
            assert!(matches!(
                build_request(&c, b"NI"),
                Err(SessionError::UnsupportedSend(k)) if k == kind
            ));
        }
    }
}
