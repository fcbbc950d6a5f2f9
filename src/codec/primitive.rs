//! Integers, booleans and strings.

use core::fmt;

use alloc::string::String;

use super::{Decode, DecodeError, Encode};

/// Parse an integer token into the widest supported type.
///
/// Accepts an optional `+`/`-` sign followed by either a decimal number or a
/// `0x`, `0b` or `0o` prefixed number (prefixes are case-insensitive). A
/// leading zero does not switch to octal.
pub(crate) fn parse_integer(token: &str) -> Result<i128, DecodeError> {
    let (negative, unsigned) = match token.as_bytes().first() {
        Some(b'-') => (true, &token[1..]),
        Some(b'+') => (false, &token[1..]),
        _ => (false, token),
    };

    let (radix, digits) = match unsigned.get(..2) {
        Some("0x") | Some("0X") => (16, &unsigned[2..]),
        Some("0b") | Some("0B") => (2, &unsigned[2..]),
        Some("0o") | Some("0O") => (8, &unsigned[2..]),
        _ => (10, unsigned),
    };

    // from_str_radix would accept a second sign after the prefix
    if digits.is_empty() || !digits.bytes().all(|b| (b as char).is_digit(radix)) {
        return Err(DecodeError::Malformed);
    }

    let magnitude = i128::from_str_radix(digits, radix).map_err(|_| DecodeError::OutOfRange)?;
    Ok(if negative { -magnitude } else { magnitude })
}

macro_rules! integer_codec {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl Decode for $ty {
                const TYPE_NAME: &'static str = $name;

                fn decode(token: &str) -> Result<Self, DecodeError> {
                    let wide = parse_integer(token)?;
                    <$ty>::try_from(wide).map_err(|_| DecodeError::OutOfRange)
                }
            }

            impl Encode for $ty {
                fn encode<W: fmt::Write + ?Sized>(&self, out: &mut W) -> fmt::Result {
                    write!(out, "{}", self)
                }
            }
        )*
    };
}

integer_codec! {
    i8 => "int8_t",
    i16 => "int16_t",
    i32 => "int32_t",
    i64 => "int64_t",
    u8 => "uint8_t",
    u16 => "uint16_t",
    u32 => "uint32_t",
    u64 => "uint64_t",
    usize => "size_t",
}

impl Decode for bool {
    const TYPE_NAME: &'static str = "bool";

    fn decode(token: &str) -> Result<Self, DecodeError> {
        match token {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(DecodeError::Malformed),
        }
    }
}

impl Encode for bool {
    fn encode<W: fmt::Write + ?Sized>(&self, out: &mut W) -> fmt::Result {
        out.write_str(if *self { "true" } else { "false" })
    }
}

impl Decode for String {
    const TYPE_NAME: &'static str = "string";

    fn decode(token: &str) -> Result<Self, DecodeError> {
        Ok(String::from(token))
    }
}

impl<const N: usize> Decode for heapless::String<N> {
    const TYPE_NAME: &'static str = "string";

    fn decode(token: &str) -> Result<Self, DecodeError> {
        heapless::String::try_from(token).map_err(|_| DecodeError::TooLong)
    }
}

impl Encode for str {
    fn encode<W: fmt::Write + ?Sized>(&self, out: &mut W) -> fmt::Result {
        out.write_str(self)
    }
}

impl Encode for String {
    fn encode<W: fmt::Write + ?Sized>(&self, out: &mut W) -> fmt::Result {
        out.write_str(self)
    }
}

impl<const N: usize> Encode for heapless::String<N> {
    fn encode<W: fmt::Write + ?Sized>(&self, out: &mut W) -> fmt::Result {
        out.write_str(self)
    }
}
