use std::cell::Cell;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serialport::{ClearBuffer, DataBits, FlowControl, Parity, StopBits, TTYPort};
use serialport::SerialPort as _;
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Baud rates the radio can be configured for (`ATBD` 0..=7).
pub const SUPPORTED_BAUD_RATES: [u32; 8] = [1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200];

/// How long a single blocking read or write waits before retrying.
const IDLE_WAIT: Duration = Duration::from_secs(1);

/// Serial line settings.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Line speed. Must be one of [`SUPPORTED_BAUD_RATES`].
    pub baud_rate: u32,
    /// Refuse further opens of the tty while this handle holds it.
    pub exclusive: bool,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            exclusive: true,
        }
    }
}

/// A serial tty in raw 8N1 mode with no flow control.
pub struct SerialPort {
    port: TTYPort,
    path: PathBuf,
    read_timeout: Cell<Option<Duration>>,
    write_timeout: Cell<Option<Duration>>,
}

impl SerialPort {
    /// Open `path` with default settings at the given baud rate.
    pub fn open(path: impl AsRef<Path>, baud_rate: u32) -> Result<Self> {
        Self::open_with_config(
            path,
            &SerialConfig {
                baud_rate,
                ..SerialConfig::default()
            },
        )
    }

    /// Open and configure a serial device.
    ///
    /// The line is set to 8N1 without flow control, exclusive access is
    /// applied as configured, and both directions are flushed.
    pub fn open_with_config(path: impl AsRef<Path>, config: &SerialConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !is_supported_baud(config.baud_rate) {
            return Err(TransportError::UnsupportedBaudRate(config.baud_rate));
        }

        let mut port = serialport::new(path.to_string_lossy(), config.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(IDLE_WAIT)
            .open_native()
            .map_err(|err| open_failure(&path, err))?;

        port.set_exclusive(config.exclusive)
            .map_err(|err| TransportError::Locked {
                path: path.clone(),
                source: err.into(),
            })?;

        port.clear(ClearBuffer::All)
            .map_err(|err| TransportError::Configure {
                path: path.clone(),
                source: err.into(),
            })?;

        info!(?path, baud = config.baud_rate, "opened serial device");

        Ok(Self {
            port,
            path,
            read_timeout: Cell::new(None),
            write_timeout: Cell::new(None),
        })
    }

    /// The device path this port was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Read for SerialPort {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let timeout = self.read_timeout.get();
        self.port.set_timeout(timeout.unwrap_or(IDLE_WAIT))?;
        loop {
            match self.port.read(buf) {
                Err(err) if err.kind() == ErrorKind::TimedOut && timeout.is_none() => continue,
                other => return other,
            }
        }
    }
}

impl Write for SerialPort {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let timeout = self.write_timeout.get();
        self.port.set_timeout(timeout.unwrap_or(IDLE_WAIT))?;
        loop {
            match self.port.write(buf) {
                Err(err) if err.kind() == ErrorKind::TimedOut && timeout.is_none() => continue,
                other => return other,
            }
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.port.flush()
    }
}

impl Transport for SerialPort {
    fn try_clone(&self) -> Result<Self> {
        let port = self
            .port
            .try_clone_native()
            .map_err(|err| TransportError::Io(err.into()))?;
        debug!(path = ?self.path, "cloned serial handle");
        Ok(Self {
            port,
            path: self.path.clone(),
            read_timeout: Cell::new(self.read_timeout.get()),
            write_timeout: Cell::new(self.write_timeout.get()),
        })
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        reject_zero(timeout)?;
        self.read_timeout.set(timeout);
        Ok(())
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        reject_zero(timeout)?;
        self.write_timeout.set(timeout);
        Ok(())
    }

    fn transport_name(&self) -> &'static str {
        "serial"
    }
}

impl std::fmt::Debug for SerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialPort")
            .field("path", &self.path)
            .field("read_timeout", &self.read_timeout.get())
            .finish()
    }
}

fn reject_zero(timeout: Option<Duration>) -> Result<()> {
    if timeout == Some(Duration::ZERO) {
        return Err(TransportError::Io(std::io::Error::new(
            ErrorKind::InvalidInput,
            "cannot set a zero duration timeout",
        )));
    }
    Ok(())
}

pub(crate) fn is_supported_baud(baud_rate: u32) -> bool {
    SUPPORTED_BAUD_RATES.contains(&baud_rate)
}

/// A missing or forbidden device failed to open; anything else opened
/// but would not take the line settings (e.g. not a tty).
fn open_failure(path: &Path, err: serialport::Error) -> TransportError {
    let source = std::io::Error::from(err);
    match source.kind() {
        ErrorKind::NotFound | ErrorKind::PermissionDenied => TransportError::Open {
            path: path.to_path_buf(),
            source,
        },
        _ => TransportError::Configure {
            path: path.to_path_buf(),
            source,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_rates_follow_atbd_table() {
        for rate in SUPPORTED_BAUD_RATES {
            assert!(is_supported_baud(rate), "{rate} should be supported");
        }
        assert!(!is_supported_baud(230400));
        assert!(!is_supported_baud(0));
    }

    #[test]
    fn rejects_unsupported_baud_rate() {
        let result = SerialPort::open("/dev/null", 31250);
        assert!(matches!(
            result,
            Err(TransportError::UnsupportedBaudRate(31250))
        ));
    }

    #[test]
    fn missing_device_reports_open_error() {
        let path = format!("/tmp/xbeeprims-no-such-tty-{}", std::process::id());
        let result = SerialPort::open(&path, 9600);
        match result {
            Err(TransportError::Open { source, .. }) => {
                assert_eq!(source.kind(), ErrorKind::NotFound);
            }
            other => panic!("expected open error, got {other:?}"),
        }
    }

    #[test]
    fn non_tty_reports_configure_error() {
        let dir = std::env::temp_dir().join(format!("xbeeprims-serial-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("not-a-tty");
        std::fs::write(&path, b"").unwrap();

        let result = SerialPort::open(&path, 9600);
        assert!(matches!(result, Err(TransportError::Configure { .. })));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn default_config_is_9600_exclusive() {
        let config = SerialConfig::default();
        assert_eq!(config.baud_rate, 9600);
        assert!(config.exclusive);
    }

    #[test]
    fn open_failure_splits_missing_from_misconfigured() {
        let path = Path::new("/dev/ttyXB0");

        let missing = serialport::Error::new(serialport::ErrorKind::NoDevice, "gone");
        assert!(matches!(
            open_failure(path, missing),
            TransportError::Open { .. }
        ));

        let not_tty = serialport::Error::new(
            serialport::ErrorKind::Io(ErrorKind::Other),
            "Inappropriate ioctl for device",
        );
        assert!(matches!(
            open_failure(path, not_tty),
            TransportError::Configure { .. }
        ));
    }
}
