use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use xbeeprims_packet::Address;
use xbeeprims_session::ConnectionType;

use crate::cmd::ListenArgs;
use crate::exit::{session_error, CliError, CliResult, FAILURE, INTERNAL, SUCCESS};
use crate::output::{print_packet, OutputFormat};

const WAIT_SLICE: Duration = Duration::from_millis(200);

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let connection_type = listen_type(args.from, args.io);
    let address = args.from.unwrap_or(Address::None);

    let session = args.device.open_session()?;
    let handle = session
        .new_connection(0, connection_type, address)
        .map_err(|err| session_error("connection failed", err))?;
    info!(%connection_type, %address, "listening");

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;
    while running.load(Ordering::SeqCst) {
        let packet = session
            .get_packet_wait(handle, WAIT_SLICE)
            .map_err(|err| session_error("receive failed", err))?;

        let Some(packet) = packet else {
            if !session.is_receiving() {
                return match session.shutdown() {
                    Ok(()) => Err(CliError::new(FAILURE, "device closed")),
                    Err(err) => Err(session_error("receiver failed", err)),
                };
            }
            continue;
        };

        print_packet(&packet, format);
        printed = printed.saturating_add(1);

        if let Some(count) = args.count {
            if printed >= count {
                break;
            }
        }
    }

    let stats = session.stats();
    info!(
        frames = stats.frames.frames,
        discarded = stats.frames.discarded(),
        dropped = stats.packets_dropped,
        "listen finished"
    );
    session
        .shutdown()
        .map_err(|err| session_error("receiver failed", err))?;
    Ok(SUCCESS)
}

fn listen_type(from: Option<Address>, io: bool) -> ConnectionType {
    match (from, io) {
        (Some(Address::Short(_)), false) => ConnectionType::Data16,
        (Some(Address::Long(_)), false) => ConnectionType::Data64,
        (Some(Address::Short(_)), true) => ConnectionType::Io16,
        (Some(Address::Long(_)), true) => ConnectionType::Io64,
        _ => ConnectionType::ModemStatus,
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listen_type_follows_flags() {
        assert_eq!(listen_type(None, false), ConnectionType::ModemStatus);
        assert_eq!(
            listen_type(Some(Address::Short(1)), false),
            ConnectionType::Data16
        );
        assert_eq!(
            listen_type(Some(Address::Long(1)), true),
            ConnectionType::Io64
        );
    }
}
