use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ParseAddressError;

/// 16-bit address that makes a module use its 64-bit address instead.
pub const USE_64BIT_ADDRESS: u16 = 0xFFFE;

/// 16-bit broadcast address.
pub const BROADCAST_16: u16 = 0xFFFF;

/// 64-bit broadcast address.
pub const BROADCAST_64: u64 = 0x0000_0000_0000_FFFF;

/// A radio address of either width, or none at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(tag = "width", content = "value", rename_all = "snake_case")]
pub enum Address {
    /// No address: status and local connections.
    #[default]
    None,
    /// A 16-bit network address (`MY`).
    Short(u16),
    /// A 64-bit serial number (`SH` + `SL`).
    Long(u64),
}

impl Address {
    /// Build a 64-bit address from its high (`SH`) and low (`SL`) halves.
    pub fn from_halves(high: u32, low: u32) -> Self {
        Address::Long((u64::from(high) << 32) | u64::from(low))
    }

    /// Width on the wire in bytes: 0, 2 or 8.
    pub fn width(&self) -> usize {
        match self {
            Address::None => 0,
            Address::Short(_) => 2,
            Address::Long(_) => 8,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Address::None)
    }

    /// Every module in range and on the PAN receives this address.
    pub fn is_broadcast(&self) -> bool {
        matches!(
            self,
            Address::Short(BROADCAST_16) | Address::Long(BROADCAST_64)
        )
    }

    /// Append the big-endian wire form of this address.
    pub fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            Address::None => {}
            Address::Short(addr) => out.extend_from_slice(&addr.to_be_bytes()),
            Address::Long(addr) => out.extend_from_slice(&addr.to_be_bytes()),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::None => f.write_str("-"),
            Address::Short(addr) => write!(f, "{addr:04X}"),
            Address::Long(addr) => write!(f, "{:08X}:{:08X}", addr >> 32, addr & 0xFFFF_FFFF),
        }
    }
}

/// Parses `1234` / `0x1234` as 16-bit and `0013A20040A1B2C3` or
/// `0013A200:40A1B2C3` as 64-bit.
impl FromStr for Address {
    type Err = ParseAddressError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let err = || ParseAddressError {
            input: input.to_string(),
        };
        let trimmed = input.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if let Some((high, low)) = digits.split_once(':') {
            let high = parse_hex_u32(high).ok_or_else(err)?;
            let low = parse_hex_u32(low).ok_or_else(err)?;
            return Ok(Address::from_halves(high, low));
        }

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(err());
        }
        match digits.len() {
            1..=4 => u16::from_str_radix(digits, 16)
                .map(Address::Short)
                .map_err(|_| err()),
            16 => u64::from_str_radix(digits, 16)
                .map(Address::Long)
                .map_err(|_| err()),
            _ => Err(err()),
        }
    }
}

fn parse_hex_u32(digits: &str) -> Option<u32> {
    if digits.is_empty() || digits.len() > 8 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halves_combine_high_first() {
        assert_eq!(
            Address::from_halves(0x0013_A200, 0x40A1_B2C3),
            Address::Long(0x0013_A200_40A1_B2C3)
        );
    }

    #[test]
    fn widths() {
        assert_eq!(Address::None.width(), 0);
        assert_eq!(Address::Short(1).width(), 2);
        assert_eq!(Address::Long(1).width(), 8);
    }

    #[test]
    fn broadcast_in_either_width() {
        assert!("FFFF".parse::<Address>().unwrap().is_broadcast());
        assert!("00000000:0000FFFF".parse::<Address>().unwrap().is_broadcast());
        assert!(!Address::Short(USE_64BIT_ADDRESS).is_broadcast());
        assert!(!Address::Long(0xFFFF_0000_0000_0000).is_broadcast());
        assert!(!Address::None.is_broadcast());
    }

    #[test]
    fn wire_form_is_big_endian() {
        let mut out = Vec::new();
        Address::Short(0x1234).write_to(&mut out);
        Address::Long(0x0013_A200_40A1_B2C3).write_to(&mut out);
        Address::None.write_to(&mut out);
        assert_eq!(
            out,
            [0x12, 0x34, 0x00, 0x13, 0xA2, 0x00, 0x40, 0xA1, 0xB2, 0xC3]
        );
    }

    #[test]
    fn parses_short_and_long_forms() {
        assert_eq!("1234".parse::<Address>().unwrap(), Address::Short(0x1234));
        assert_eq!("0x7".parse::<Address>().unwrap(), Address::Short(7));
        assert_eq!(
            "0013A20040A1B2C3".parse::<Address>().unwrap(),
            Address::Long(0x0013_A200_40A1_B2C3)
        );
        assert_eq!(
            "13A200:40A1B2C3".parse::<Address>().unwrap(),
            Address::Long(0x0013_A200_40A1_B2C3)
        );
    }

    #[test]
    fn rejects_malformed_addresses() {
        for input in ["", "12345", "xyz", "0013A20040A1B2C", "1:", ":1", "123456789:0"] {
            assert!(input.parse::<Address>().is_err(), "{input:?} should fail");
        }
    }

    #[test]
    fn display_round_trips_through_parse() {
        for addr in [Address::Short(0xBEEF), Address::Long(0x0013_A200_40A1_B2C3)] {
            assert_eq!(addr.to_string().parse::<Address>().unwrap(), addr);
        }
        assert_eq!(Address::None.to_string(), "-");
    }
}
