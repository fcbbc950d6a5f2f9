//! Bluetooth-flavoured value types: device addresses and raw byte payloads.

use core::fmt;
use core::ops::Deref;

use super::{Decode, DecodeError, Encode};

/// A 48-bit Bluetooth device address.
///
/// Bytes are stored least significant first, the order the controller uses
/// on the wire; the token form prints the most significant byte first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Address(pub [u8; 6]);

impl Address {
    /// Build an address from its bytes in display order (MSB first).
    pub const fn from_display_order(bytes: [u8; 6]) -> Self {
        Self([bytes[5], bytes[4], bytes[3], bytes[2], bytes[1], bytes[0]])
    }

    /// Raw bytes, least significant first.
    pub const fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl Decode for Address {
    const TYPE_NAME: &'static str = "MacAddress_t";

    fn decode(token: &str) -> Result<Self, DecodeError> {
        let mut display = [0u8; 6];
        let mut octets = token.split(':');
        for slot in display.iter_mut() {
            let octet = octets.next().ok_or(DecodeError::Malformed)?;
            *slot = parse_octet(octet)?;
        }
        if octets.next().is_some() {
            return Err(DecodeError::Malformed);
        }
        Ok(Self::from_display_order(display))
    }
}

impl Encode for Address {
    fn encode<W: fmt::Write + ?Sized>(&self, out: &mut W) -> fmt::Result {
        for (position, byte) in self.0.iter().rev().enumerate() {
            if position > 0 {
                out.write_char(':')?;
            }
            write!(out, "{:02X}", byte)?;
        }
        Ok(())
    }
}

/// Up to `N` bytes given on the command line as hex digits.
///
/// The token must contain an even number of hex digits (either case) and no
/// prefix or separators.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HexBlob<const N: usize>(pub heapless::Vec<u8, N>);

impl<const N: usize> Deref for HexBlob<N> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl<const N: usize> Decode for HexBlob<N> {
    const TYPE_NAME: &'static str = "RawData_t";

    fn decode(token: &str) -> Result<Self, DecodeError> {
        if token.len() % 2 != 0 {
            return Err(DecodeError::Malformed);
        }
        let mut bytes = heapless::Vec::new();
        for pair in token.as_bytes().chunks(2) {
            let pair = core::str::from_utf8(pair).map_err(|_| DecodeError::Malformed)?;
            let byte = parse_octet(pair)?;
            bytes.push(byte).map_err(|_| DecodeError::TooLong)?;
        }
        Ok(Self(bytes))
    }
}

impl<const N: usize> Encode for HexBlob<N> {
    fn encode<W: fmt::Write + ?Sized>(&self, out: &mut W) -> fmt::Result {
        for byte in self.iter() {
            write!(out, "{:02X}", byte)?;
        }
        Ok(())
    }
}

fn parse_octet(digits: &str) -> Result<u8, DecodeError> {
    if digits.len() != 2 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(DecodeError::Malformed);
    }
    u8::from_str_radix(digits, 16).map_err(|_| DecodeError::Malformed)
}
