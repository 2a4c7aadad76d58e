//! API frame identifiers.
//!
//! Requests (host to radio) use identifiers below 0x80; every response and
//! unsolicited notification has the high bit set.

/// 64-bit addressed transmit request.
pub const TX_REQUEST_64: u8 = 0x00;

/// 16-bit addressed transmit request.
pub const TX_REQUEST_16: u8 = 0x01;

/// Local AT command, applied immediately.
pub const AT_COMMAND: u8 = 0x08;

/// Local AT command, queued until `AC` or a non-queued command.
pub const AT_COMMAND_QUEUED: u8 = 0x09;

/// Remote AT command request.
pub const REMOTE_AT_COMMAND: u8 = 0x17;

/// Received data from a 64-bit source address.
pub const RX_PACKET_64: u8 = 0x80;

/// Received data from a 16-bit source address.
pub const RX_PACKET_16: u8 = 0x81;

/// Received IO samples from a 64-bit source address.
pub const RX_IO_64: u8 = 0x82;

/// Received IO samples from a 16-bit source address.
pub const RX_IO_16: u8 = 0x83;

/// Local AT command response.
pub const AT_RESPONSE: u8 = 0x88;

/// Transmit status report.
pub const TX_STATUS: u8 = 0x89;

/// Modem status notification.
pub const MODEM_STATUS: u8 = 0x8A;

/// Remote AT command response.
pub const REMOTE_AT_RESPONSE: u8 = 0x97;

/// Returns a human-readable name for an API frame identifier.
pub fn frame_type_name(id: u8) -> &'static str {
    match id {
        TX_REQUEST_64 => "TX_REQUEST_64",
        TX_REQUEST_16 => "TX_REQUEST_16",
        AT_COMMAND => "AT_COMMAND",
        AT_COMMAND_QUEUED => "AT_COMMAND_QUEUED",
        REMOTE_AT_COMMAND => "REMOTE_AT_COMMAND",
        RX_PACKET_64 => "RX_PACKET_64",
        RX_PACKET_16 => "RX_PACKET_16",
        RX_IO_64 => "RX_IO_64",
        RX_IO_16 => "RX_IO_16",
        AT_RESPONSE => "AT_RESPONSE",
        TX_STATUS => "TX_STATUS",
        MODEM_STATUS => "MODEM_STATUS",
        REMOTE_AT_RESPONSE => "REMOTE_AT_RESPONSE",
        _ => "UNKNOWN",
    }
}

/// Returns true if the identifier is sent from host to radio.
pub fn is_request(id: u8) -> bool {
    id & 0x80 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_known_identifiers() {
        assert_eq!(frame_type_name(AT_RESPONSE), "AT_RESPONSE");
        assert_eq!(frame_type_name(REMOTE_AT_COMMAND), "REMOTE_AT_COMMAND");
        assert_eq!(frame_type_name(0x42), "UNKNOWN");
    }

    #[test]
    fn direction_follows_high_bit() {
        assert!(is_request(AT_COMMAND));
        assert!(is_request(TX_REQUEST_64));
        assert!(!is_request(MODEM_STATUS));
        assert!(!is_request(RX_IO_16));
    }
}
