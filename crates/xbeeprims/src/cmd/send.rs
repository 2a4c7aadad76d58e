use std::fs;

use tracing::debug;
use xbeeprims_packet::{Address, Packet, BROADCAST_16};
use xbeeprims_session::{ConnectionFlags, ConnectionType, DEFAULT_WAIT};

use crate::cmd::{close_session, parse_duration, parse_hex, SendArgs};
use crate::exit::{
    io_error, session_error, CliError, CliResult, REMOTE_FAILURE, SUCCESS, TIMEOUT, USAGE,
};
use crate::output::{print_packet, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = if args.wait {
        parse_duration(&args.wait_timeout)?
    } else {
        DEFAULT_WAIT
    };
    let payload = resolve_payload(&args)?;
    let to = destination(&args);
    let connection_type = data_type(to)?;

    let session = args.device.open_session()?;
    let data = session
        .new_connection(args.frame_id, connection_type, to)
        .map_err(|err| session_error("connection failed", err))?;
    session
        .set_flags(
            data,
            ConnectionFlags {
                disable_ack: args.no_ack,
                broadcast: args.broadcast,
                ..ConnectionFlags::default()
            },
        )
        .map_err(|err| session_error("connection failed", err))?;

    // Register for the report before sending so it cannot arrive unrouted.
    let report = if args.wait {
        Some(
            session
                .new_connection(args.frame_id, ConnectionType::TxStatus, Address::None)
                .map_err(|err| session_error("connection failed", err))?,
        )
    } else {
        None
    };

    session
        .send(data, &payload)
        .map_err(|err| session_error("send failed", err))?;
    debug!(%to, broadcast = to.is_broadcast(), len = payload.len(), "data sent");

    let mut code = SUCCESS;
    if let Some(report) = report {
        let status = session
            .get_packet_wait(report, wait_timeout)
            .map_err(|err| session_error("receive failed", err))?;
        let Some(packet) = status else {
            close_session(session);
            return Err(CliError::new(
                TIMEOUT,
                format!("no TX status within {}", args.wait_timeout),
            ));
        };
        print_packet(&packet, format);
        code = exit_code(&packet);
    }

    session
        .shutdown()
        .map_err(|err| session_error("receiver failed", err))?;
    Ok(code)
}

/// `--to`, or the 16-bit broadcast address when only `--broadcast` is given.
fn destination(args: &SendArgs) -> Address {
    args.to.unwrap_or(Address::Short(BROADCAST_16))
}

fn data_type(to: Address) -> CliResult<ConnectionType> {
    match to {
        Address::Short(_) => Ok(ConnectionType::Data16),
        Address::Long(_) => Ok(ConnectionType::Data64),
        Address::None => Err(CliError::new(USAGE, "--to needs a 16- or 64-bit address")),
    }
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(hex) = &args.hex {
        return parse_hex(hex);
    }
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(Vec::new())
}

fn exit_code(packet: &Packet) -> i32 {
    match packet {
        Packet::TxStatus { status, .. } if !status.is_success() => REMOTE_FAILURE,
        _ => SUCCESS,
    }
}

#[cfg(test)]
mod tests {
    use xbeeprims_packet::TxStatus;

    use super::*;
    use crate::cmd::DeviceArgs;

    #[test]
    fn address_width_picks_connection_type() {
        assert_eq!(
            data_type(Address::Short(0x0001)).unwrap(),
            ConnectionType::Data16
        );
        assert_eq!(
            data_type(Address::Long(0x0013_A200_4000_0001)).unwrap(),
            ConnectionType::Data64
        );
        assert_eq!(data_type(Address::None).unwrap_err().code, USAGE);
    }

    fn send_args(to: Option<Address>, broadcast: bool) -> SendArgs {
        SendArgs {
            device: DeviceArgs {
                device: "/dev/null".to_string(),
                baud: 9600,
            },
            to,
            data: None,
            hex: None,
            file: None,
            frame_id: 1,
            no_ack: false,
            broadcast,
            wait: false,
            wait_timeout: "1s".to_string(),
        }
    }

    #[test]
    fn broadcast_without_target_uses_broadcast_address() {
        let to = destination(&send_args(None, true));
        assert_eq!(to, Address::Short(0xFFFF));
        assert!(to.is_broadcast());
        assert_eq!(data_type(to).unwrap(), ConnectionType::Data16);
    }

    #[test]
    fn explicit_target_wins_over_broadcast_default() {
        let to = Address::Long(0x0013_A200_4000_0001);
        assert_eq!(destination(&send_args(Some(to), true)), to);
    }

    #[test]
    fn failed_delivery_maps_to_remote_failure() {
        let delivered = Packet::TxStatus {
            frame_id: 1,
            status: TxStatus(0),
        };
        let no_ack = Packet::TxStatus {
            frame_id: 1,
            status: TxStatus(1),
        };
        assert_eq!(exit_code(&delivered), SUCCESS);
        assert_eq!(exit_code(&no_ack), REMOTE_FAILURE);
    }
}
