use tracing::debug;
use xbeeprims_packet::{Address, Packet};
use xbeeprims_session::{ConnectionFlags, ConnectionType};

use crate::cmd::{close_session, parse_duration, parse_hex, AtArgs};
use crate::exit::{session_error, CliError, CliResult, REMOTE_FAILURE, SUCCESS, TIMEOUT, USAGE};
use crate::output::{print_packet, OutputFormat};

pub fn run(args: AtArgs, format: OutputFormat) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let payload = build_payload(&args)?;
    let (connection_type, address) = target(args.remote);

    let session = args.device.open_session()?;
    let handle = session
        .new_connection(args.frame_id, connection_type, address)
        .map_err(|err| session_error("connection failed", err))?;
    if args.queue {
        session
            .set_flags(
                handle,
                ConnectionFlags {
                    queue_at: true,
                    ..ConnectionFlags::default()
                },
            )
            .map_err(|err| session_error("connection failed", err))?;
    }

    session
        .send(handle, &payload)
        .map_err(|err| session_error("send failed", err))?;
    debug!(command = %args.command, %connection_type, "AT command sent");

    let reply = session
        .get_packet_wait(handle, timeout)
        .map_err(|err| session_error("receive failed", err))?;
    close_session(session);

    let Some(packet) = reply else {
        return Err(CliError::new(
            TIMEOUT,
            format!("no response to {} within {}", args.command, args.timeout),
        ));
    };
    print_packet(&packet, format);
    Ok(exit_code(&packet))
}

fn target(remote: Option<Address>) -> (ConnectionType, Address) {
    match remote {
        Some(address @ Address::Short(_)) => (ConnectionType::RemoteAt16, address),
        Some(address @ Address::Long(_)) => (ConnectionType::RemoteAt64, address),
        _ => (ConnectionType::LocalAt, Address::None),
    }
}

fn build_payload(args: &AtArgs) -> CliResult<Vec<u8>> {
    let command = args.command.as_bytes();
    if command.len() != 2 || !command.iter().all(u8::is_ascii_alphanumeric) {
        return Err(CliError::new(
            USAGE,
            format!("AT command must be two letters or digits, got {:?}", args.command),
        ));
    }

    let mut payload = command.to_ascii_uppercase();
    if let Some(hex) = &args.hex {
        payload.extend(parse_hex(hex)?);
    } else if let Some(value) = &args.value {
        payload.extend_from_slice(value.as_bytes());
    }
    Ok(payload)
}

fn exit_code(packet: &Packet) -> i32 {
    match packet {
        Packet::LocalAtResponse { status, .. } | Packet::RemoteAtResponse { status, .. }
            if !status.is_ok() =>
        {
            REMOTE_FAILURE
        }
        _ => SUCCESS,
    }
}

#[cfg(test)]
mod tests {
    use xbeeprims_packet::AtStatus;

    use super::*;
    use crate::cmd::DeviceArgs;

    fn args(command: &str, value: Option<&str>, hex: Option<&str>) -> AtArgs {
        AtArgs {
            device: DeviceArgs {
                device: "/dev/null".to_string(),
                baud: 9600,
            },
            command: command.to_string(),
            value: value.map(str::to_string),
            hex: hex.map(str::to_string),
            remote: None,
            queue: false,
            frame_id: 1,
            timeout: "1s".to_string(),
        }
    }

    #[test]
    fn query_payload_is_just_the_command() {
        assert_eq!(build_payload(&args("ni", None, None)).unwrap(), b"NI");
    }

    #[test]
    fn set_payload_appends_value() {
        assert_eq!(
            build_payload(&args("NI", Some("ROUTER"), None)).unwrap(),
            b"NIROUTER"
        );
        assert_eq!(
            build_payload(&args("D0", None, Some("0x04"))).unwrap(),
            vec![b'D', b'0', 0x04]
        );
    }

    #[test]
    fn rejects_bad_command_names() {
        assert_eq!(build_payload(&args("N", None, None)).unwrap_err().code, USAGE);
        assert_eq!(build_payload(&args("NID", None, None)).unwrap_err().code, USAGE);
        assert_eq!(build_payload(&args("N?", None, None)).unwrap_err().code, USAGE);
    }

    #[test]
    fn remote_width_follows_address() {
        assert_eq!(target(None).0, ConnectionType::LocalAt);
        assert_eq!(
            target(Some(Address::Short(0x1234))).0,
            ConnectionType::RemoteAt16
        );
        assert_eq!(
            target(Some(Address::Long(0x0013_A200_4000_0001))).0,
            ConnectionType::RemoteAt64
        );
    }

    #[test]
    fn error_status_maps_to_remote_failure() {
        let ok = Packet::LocalAtResponse {
            frame_id: 1,
            command: *b"NI",
            status: AtStatus(0),
            data: vec![],
        };
        let failed = Packet::LocalAtResponse {
            frame_id: 1,
            command: *b"ZZ",
            status: AtStatus(2),
            data: vec![],
        };
        assert_eq!(exit_code(&ok), SUCCESS);
        assert_eq!(exit_code(&failed), REMOTE_FAILURE);
    }
}
