use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::time::Duration;

use xbeeprims_transport::{SerialConfig, SerialPort, Transport, TransportError};

use crate::exit::{transport_error, CliResult};

const SOCKET_PREFIX: &str = "unix:";

/// Where the module is reachable: a tty, or a `unix:` socket bridge.
#[derive(Debug)]
pub enum Device {
    Serial(SerialPort),
    Socket(UnixStream),
}

impl Device {
    pub fn open(device: &str, baud_rate: u32) -> CliResult<Self> {
        if let Some(path) = device.strip_prefix(SOCKET_PREFIX) {
            let stream = UnixStream::connect(path)
                .map_err(|err| transport_error(&format!("connect {path}"), err.into()))?;
            return Ok(Device::Socket(stream));
        }

        let config = SerialConfig {
            baud_rate,
            ..SerialConfig::default()
        };
        let port = SerialPort::open_with_config(device, &config)
            .map_err(|err| transport_error(&format!("open {device}"), err))?;
        Ok(Device::Serial(port))
    }
}

impl Read for Device {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Device::Serial(port) => port.read(buf),
            Device::Socket(stream) => stream.read(buf),
        }
    }
}

impl Write for Device {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Device::Serial(port) => port.write(buf),
            Device::Socket(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Device::Serial(port) => port.flush(),
            Device::Socket(stream) => stream.flush(),
        }
    }
}

impl Transport for Device {
    fn try_clone(&self) -> Result<Self, TransportError> {
        Ok(match self {
            Device::Serial(port) => Device::Serial(port.try_clone()?),
            Device::Socket(stream) => Device::Socket(Transport::try_clone(stream)?),
        })
    }

    fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<(), TransportError> {
        match self {
            Device::Serial(port) => port.set_read_timeout(timeout),
            Device::Socket(stream) => Transport::set_read_timeout(stream, timeout),
        }
    }

    fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<(), TransportError> {
        match self {
            Device::Serial(port) => port.set_write_timeout(timeout),
            Device::Socket(stream) => Transport::set_write_timeout(stream, timeout),
        }
    }

    fn transport_name(&self) -> &'static str {
        match self {
            Device::Serial(port) => port.transport_name(),
            Device::Socket(stream) => stream.transport_name(),
        }
    }
}
