use tracing::trace;
use xbeeprims_frame::api;
use xbeeprims_frame::Frame;

use crate::address::Address;
use crate::error::{DecodeError, Result};
use crate::packet::{
    IoSample, Packet, RxOptions, ANALOG_RESOLUTION_MASK, CHANNEL_MASK, DIGITAL_MASK,
};
use crate::status::{AtStatus, ModemStatus, TxStatus};

const ANALOG_CHANNELS: usize = 6;

/// Decode a verified frame into packets.
///
/// Most frame types produce exactly one packet. IO frames produce one per
/// sample, in sample order, and none when the sample count is zero.
/// Unrecognized frame types become [`Packet::Unknown`].
pub fn decode(frame: &Frame) -> Result<Vec<Packet>> {
    decode_parts(frame.frame_type, &frame.payload)
}

/// Decode a frame given as its API identifier and frame data.
pub fn decode_parts(frame_type: u8, payload: &[u8]) -> Result<Vec<Packet>> {
    let mut cur = Cursor::new(frame_type, payload);

    let packet = match frame_type {
        api::MODEM_STATUS => Packet::ModemStatus {
            status: ModemStatus(cur.u8()?),
        },
        api::AT_RESPONSE => Packet::LocalAtResponse {
            frame_id: cur.u8()?,
            command: cur.command()?,
            status: AtStatus(cur.u8()?),
            data: cur.rest(),
        },
        api::REMOTE_AT_RESPONSE => Packet::RemoteAtResponse {
            frame_id: cur.u8()?,
            address64: cur.u64()?,
            address16: cur.u16()?,
            command: cur.command()?,
            status: AtStatus(cur.u8()?),
            data: cur.rest(),
        },
        api::TX_STATUS => Packet::TxStatus {
            frame_id: cur.u8()?,
            status: TxStatus(cur.u8()?),
        },
        api::RX_PACKET_64 | api::RX_PACKET_16 => Packet::Data {
            source: cur.address(frame_type == api::RX_PACKET_64)?,
            rssi: cur.u8()?,
            options: RxOptions(cur.u8()?),
            data: cur.rest(),
        },
        api::RX_IO_64 | api::RX_IO_16 => {
            return decode_io(&mut cur, frame_type == api::RX_IO_64);
        }
        _ => {
            trace!(
                frame_type,
                request = api::is_request(frame_type),
                "unrecognized frame type"
            );
            Packet::Unknown {
                frame_type,
                payload: payload.to_vec(),
            }
        }
    };

    Ok(vec![packet])
}

fn decode_io(cur: &mut Cursor<'_>, long: bool) -> Result<Vec<Packet>> {
    let source = cur.address(long)?;
    let rssi = cur.u8()?;
    let options = RxOptions(cur.u8()?);
    let count = usize::from(cur.u8()?);
    let channel_mask = cur.u16()? & CHANNEL_MASK;

    let mut packets = Vec::with_capacity(count);
    for _ in 0..count {
        let mut sample = IoSample {
            channel_mask,
            ..IoSample::default()
        };
        if channel_mask & DIGITAL_MASK != 0 {
            sample.digital = cur.u16()? & DIGITAL_MASK;
        }
        for channel in 0..ANALOG_CHANNELS {
            if sample.has_analog(channel as u8) {
                sample.analog[channel] = cur.u16()? & ANALOG_RESOLUTION_MASK;
            }
        }
        packets.push(Packet::Io {
            source,
            rssi,
            options,
            sample,
        });
    }

    trace!(samples = count, %source, "decoded IO frame");
    Ok(packets)
}

/// Bounds-checked big-endian reads over frame data.
struct Cursor<'a> {
    frame_type: u8,
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(frame_type: u8, data: &'a [u8]) -> Self {
        Self {
            frame_type,
            data,
            pos: 0,
        }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.pos + N;
        let bytes = self
            .data
            .get(self.pos..end)
            .ok_or(DecodeError::Truncated {
                frame_type: self.frame_type,
                needed: end,
                len: self.data.len(),
            })?;
        self.pos = end;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.take()?))
    }

    fn u64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.take()?))
    }

    fn command(&mut self) -> Result<[u8; 2]> {
        self.take()
    }

    fn address(&mut self, long: bool) -> Result<Address> {
        if long {
            Ok(Address::Long(self.u64()?))
        } else {
            Ok(Address::Short(self.u16()?))
        }
    }

    fn rest(&mut self) -> Vec<u8> {
        let rest = self.data[self.pos.min(self.data.len())..].to_vec();
        self.pos = self.data.len();
        rest
    }
}
