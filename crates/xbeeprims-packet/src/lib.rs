//! Typed packets decoded from verified XBee API frames.
//!
//! [`decode`] turns one frame into zero or more [`Packet`]s. Each packet
//! kind is its own variant carrying only its own fields; IO frames with
//! several samples are split into one packet per sample.

pub mod address;
pub mod decode;
pub mod error;
pub mod packet;
pub mod status;

pub use address::{Address, BROADCAST_16, BROADCAST_64};
pub use decode::{decode, decode_parts};
pub use error::{DecodeError, ParseAddressError, Result};
pub use packet::{IoSample, Packet, PacketType, RxOptions};
pub use status::{AtStatus, ModemStatus, TxStatus};
