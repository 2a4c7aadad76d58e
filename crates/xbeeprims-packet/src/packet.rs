use serde::Serialize;

use crate::address::Address;
use crate::status::{AtStatus, ModemStatus, TxStatus};

/// Mask bits for digital channels 0..=8.
pub const DIGITAL_MASK: u16 = 0x01FF;
/// Mask bits for analog channels 0..=5.
pub const ANALOG_MASK: u16 = 0x7E00;
/// Significant bits of the channel mask.
pub const CHANNEL_MASK: u16 = DIGITAL_MASK | ANALOG_MASK;
/// Significant bits of an analog sample.
pub const ANALOG_RESOLUTION_MASK: u16 = 0x03FF;

const ANALOG_SHIFT: u32 = 9;

/// Option bits on received data and IO frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct RxOptions(pub u8);

impl RxOptions {
    pub const ADDRESS_BROADCAST: u8 = 0x02;
    pub const PAN_BROADCAST: u8 = 0x04;

    /// Sent to the broadcast address.
    pub fn address_broadcast(&self) -> bool {
        self.0 & Self::ADDRESS_BROADCAST != 0
    }

    /// Sent to the broadcast PAN.
    pub fn pan_broadcast(&self) -> bool {
        self.0 & Self::PAN_BROADCAST != 0
    }
}

/// One snapshot of a remote module's inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct IoSample {
    /// Enabled channels: bits 0..=8 digital, bits 9..=14 analog.
    pub channel_mask: u16,
    /// Digital levels, one bit per channel.
    pub digital: u16,
    /// Raw 10-bit analog readings, indexed by analog channel.
    pub analog: [u16; 6],
}

impl IoSample {
    /// True if digital channel `channel` (0..=7) is enabled.
    pub fn has_digital(&self, channel: u8) -> bool {
        channel <= 7 && self.channel_mask & (1 << channel) != 0
    }

    /// Level of digital channel `channel`, or false when not enabled.
    pub fn get_digital(&self, channel: u8) -> bool {
        self.has_digital(channel) && self.digital & (1 << channel) != 0
    }

    /// True if analog channel `channel` (0..=5) is enabled.
    pub fn has_analog(&self, channel: u8) -> bool {
        channel <= 5 && self.channel_mask & (1 << (ANALOG_SHIFT + u32::from(channel))) != 0
    }

    /// Reading of analog channel `channel`.
    ///
    /// With `reference_voltage` zero this is the raw sample. Otherwise it is
    /// `reference / 1024 * raw` computed from analog channel 0's sample, for
    /// every channel; callers that need per-channel voltages convert
    /// [`IoSample::analog`] themselves. Returns 0 when the channel is not enabled.
    pub fn get_analog(&self, channel: u8, reference_voltage: f64) -> f64 {
        if !self.has_analog(channel) {
            return 0.0;
        }
        if reference_voltage != 0.0 {
            return reference_voltage / 1024.0 * f64::from(self.analog[0]);
        }
        f64::from(self.analog[usize::from(channel)])
    }

    /// True if any digital channel is enabled.
    pub fn any_digital(&self) -> bool {
        self.channel_mask & DIGITAL_MASK != 0
    }
}

/// Packet kinds, mirroring connection kinds plus the response-only ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketType {
    ModemStatus,
    LocalAtResponse,
    RemoteAtResponse,
    TxStatus,
    Data16,
    Data64,
    Io16,
    Io64,
    Unknown,
}

impl PacketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PacketType::ModemStatus => "modem_status",
            PacketType::LocalAtResponse => "local_at_response",
            PacketType::RemoteAtResponse => "remote_at_response",
            PacketType::TxStatus => "tx_status",
            PacketType::Data16 => "data_16",
            PacketType::Data64 => "data_64",
            PacketType::Io16 => "io_16",
            PacketType::Io64 => "io_64",
            PacketType::Unknown => "unknown",
        }
    }
}

/// A decoded unit of incoming data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Packet {
    ModemStatus {
        status: ModemStatus,
    },
    LocalAtResponse {
        frame_id: u8,
        #[serde(serialize_with = "command_as_str")]
        command: [u8; 2],
        status: AtStatus,
        data: Vec<u8>,
    },
    RemoteAtResponse {
        frame_id: u8,
        address64: u64,
        address16: u16,
        #[serde(serialize_with = "command_as_str")]
        command: [u8; 2],
        status: AtStatus,
        data: Vec<u8>,
    },
    TxStatus {
        frame_id: u8,
        status: TxStatus,
    },
    /// Received data; `source` is 16- or 64-bit.
    Data {
        source: Address,
        /// Signal strength as a magnitude: `-rssi` dBm.
        rssi: u8,
        options: RxOptions,
        data: Vec<u8>,
    },
    /// One IO sample; a multi-sample frame produces one of these per sample.
    Io {
        source: Address,
        rssi: u8,
        options: RxOptions,
        sample: IoSample,
    },
    Unknown {
        frame_type: u8,
        payload: Vec<u8>,
    },
}

impl Packet {
    pub fn packet_type(&self) -> PacketType {
        match self {
            Packet::ModemStatus { .. } => PacketType::ModemStatus,
            Packet::LocalAtResponse { .. } => PacketType::LocalAtResponse,
            Packet::RemoteAtResponse { .. } => PacketType::RemoteAtResponse,
            Packet::TxStatus { .. } => PacketType::TxStatus,
            Packet::Data {
                source: Address::Long(_),
                ..
            } => PacketType::Data64,
            Packet::Data { .. } => PacketType::Data16,
            Packet::Io {
                source: Address::Long(_),
                ..
            } => PacketType::Io64,
            Packet::Io { .. } => PacketType::Io16,
            Packet::Unknown { .. } => PacketType::Unknown,
        }
    }

    /// Correlation byte, for the packet kinds that carry one.
    pub fn frame_id(&self) -> Option<u8> {
        match self {
            Packet::LocalAtResponse { frame_id, .. }
            | Packet::RemoteAtResponse { frame_id, .. }
            | Packet::TxStatus { frame_id, .. } => Some(*frame_id),
            _ => None,
        }
    }

    /// Source address of data and IO packets.
    pub fn source(&self) -> Option<Address> {
        match self {
            Packet::Data { source, .. } | Packet::Io { source, .. } => Some(*source),
            _ => None,
        }
    }

    /// Trailing data of AT responses and received data.
    pub fn data(&self) -> &[u8] {
        match self {
            Packet::LocalAtResponse { data, .. }
            | Packet::RemoteAtResponse { data, .. }
            | Packet::Data { data, .. } => data,
            _ => &[],
        }
    }

    pub fn io_sample(&self) -> Option<&IoSample> {
        match self {
            Packet::Io { sample, .. } => Some(sample),
            _ => None,
        }
    }

    /// See [`IoSample::has_digital`]; false for non-IO packets.
    pub fn has_digital(&self, channel: u8) -> bool {
        self.io_sample().is_some_and(|s| s.has_digital(channel))
    }

    /// See [`IoSample::get_digital`]; false for non-IO packets.
    pub fn get_digital(&self, channel: u8) -> bool {
        self.io_sample().is_some_and(|s| s.get_digital(channel))
    }

    /// See [`IoSample::has_analog`]; false for non-IO packets.
    pub fn has_analog(&self, channel: u8) -> bool {
        self.io_sample().is_some_and(|s| s.has_analog(channel))
    }

    /// See [`IoSample::get_analog`]; 0 for non-IO packets.
    pub fn get_analog(&self, channel: u8, reference_voltage: f64) -> f64 {
        self.io_sample()
            .map_or(0.0, |s| s.get_analog(channel, reference_voltage))
    }
}

fn command_as_str<S: serde::Serializer>(command: &[u8; 2], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&String::from_utf8_lossy(command))
}
