use std::time::Duration;

use clap::{Args, Subcommand};
use tracing::debug;
use xbeeprims_packet::Address;
use xbeeprims_session::{Session, SessionConfig};
use xbeeprims_transport::Transport;

use crate::device::Device;
use crate::exit::{session_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod at;
pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Query or set an AT register on the local or a remote module.
    At(AtArgs),
    /// Transmit data to a 16- or 64-bit address.
    Send(SendArgs),
    /// Print received data, IO samples or modem status.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::At(args) => at::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Stop the receiver once the outcome is already decided.
///
/// A receiver error here is logged at debug and reported as `false`.
pub fn close_session<T: Transport>(session: Session<T>) -> bool {
    match session.shutdown() {
        Ok(()) => true,
        Err(err) => {
            debug!(%err, "receiver stopped with error");
            false
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct DeviceArgs {
    /// Serial device (e.g. /dev/ttyUSB0) or unix:PATH for a socket bridge.
    #[arg(env = "XBEEPRIMS_DEVICE")]
    pub device: String,
    /// Serial line speed.
    #[arg(long, short = 'b', default_value = "9600", env = "XBEEPRIMS_BAUD")]
    pub baud: u32,
}

impl DeviceArgs {
    pub fn open_session(&self) -> CliResult<Session<Device>> {
        let device = Device::open(&self.device, self.baud)?;
        Session::setup_with_config(device, SessionConfig::default())
            .map_err(|err| session_error("session setup failed", err))
    }
}

#[derive(Args, Debug)]
pub struct AtArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Two-character AT command (e.g. NI, MY, D0).
    pub command: String,
    /// Parameter value as text. Omit to query.
    #[arg(conflicts_with = "hex")]
    pub value: Option<String>,
    /// Parameter value as hex bytes (e.g. 0x04 or 13A2).
    #[arg(long)]
    pub hex: Option<String>,
    /// Send to a remote module instead of the local one.
    #[arg(long, value_name = "ADDR")]
    pub remote: Option<Address>,
    /// Queue the change instead of applying it.
    #[arg(long)]
    pub queue: bool,
    /// Frame id used to match the response (1-255).
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u8).range(1..))]
    pub frame_id: u8,
    /// How long to wait for the response (e.g. 2s, 500ms).
    #[arg(long, default_value = "1s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Destination: 1-4 hex digits for 16-bit, 16 digits or HIGH:LOW for 64-bit.
    /// Defaults to the 16-bit broadcast address with --broadcast.
    #[arg(long, value_name = "ADDR", required_unless_present = "broadcast")]
    pub to: Option<Address>,
    /// Text payload.
    #[arg(long, conflicts_with_all = ["hex", "file"])]
    pub data: Option<String>,
    /// Hex payload.
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub hex: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["data", "hex"])]
    pub file: Option<std::path::PathBuf>,
    /// Frame id for the TX status report; 0 asks for none.
    #[arg(long, default_value = "1")]
    pub frame_id: u8,
    /// Do not request an acknowledgement.
    #[arg(long)]
    pub no_ack: bool,
    /// Send with the broadcast PAN id.
    #[arg(long)]
    pub broadcast: bool,
    /// Wait for and print the TX status report.
    #[arg(long)]
    pub wait: bool,
    /// How long to wait for the TX status when --wait is set.
    #[arg(long, default_value = "1s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Only packets from this address. Without it, modem status is printed.
    #[arg(long, value_name = "ADDR")]
    pub from: Option<Address>,
    /// Listen for IO samples instead of data.
    #[arg(long, requires = "from")]
    pub io: bool,
    /// Exit after printing N packets.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

/// Parse `0x0A0B`, `0a0b` or `0A 0B` into bytes.
pub fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let trimmed = input.trim();
    let digits: String = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    if digits.is_empty() || digits.len() % 2 != 0 || !digits.chars().all(|c| c.is_ascii_hexdigit())
    {
        return Err(CliError::new(
            USAGE,
            format!("invalid hex value: {input:?} (need an even number of hex digits)"),
        ));
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| CliError::new(USAGE, format!("invalid hex value: {input:?}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::os::unix::net::UnixStream;
    use std::time::Instant;

    use super::*;

    #[test]
    fn closing_after_line_loss_reports_without_failing() {
        let (host, module) = UnixStream::pair().unwrap();
        let session = Session::setup(host).unwrap();
        drop(module);

        let deadline = Instant::now() + Duration::from_secs(2);
        while session.is_receiving() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }

        assert!(!close_session(session));
    }

    #[test]
    fn closing_a_healthy_session_is_clean() {
        let (host, _module) = UnixStream::pair().unwrap();
        let session = Session::setup(host).unwrap();
        assert!(close_session(session));
    }

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn parse_hex_forms() {
        assert_eq!(parse_hex("0x04").unwrap(), vec![0x04]);
        assert_eq!(parse_hex("13a2").unwrap(), vec![0x13, 0xA2]);
        assert_eq!(parse_hex("7E 7D").unwrap(), vec![0x7E, 0x7D]);
    }

    #[test]
    fn parse_hex_rejects_odd_or_bad_digits() {
        assert!(parse_hex("123").is_err());
        assert!(parse_hex("zz").is_err());
        assert!(parse_hex("").is_err());
    }
}
