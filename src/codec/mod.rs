//! String ↔ typed value conversion for command arguments.
//!
//! Every argument of a command arrives as a string token. The codec turns a
//! token into a concrete value ([`Decode`]) and a value back into its token
//! ([`Encode`]). Conversions are strict: no type is ever coerced into another,
//! integers are range checked against their target width, and enumerated
//! types accept only the exact labels listed in their
//! [`ValueToStringMapping`].
//!
//! # Supported types
//!
//! | Type | Accepted tokens |
//! |------|-----------------|
//! | `i8`..`i64`, `u8`..`u64`, `usize` | decimal, `0x`/`0b`/`0o` prefixed, optional sign |
//! | `bool` | `true`, `false` |
//! | `String`, `heapless::String<N>` | any token |
//! | [`Address`] | `AA:BB:CC:DD:EE:FF` |
//! | [`HexBlob<N>`] | even number of hex digits, at most `N` bytes |
//! | table-backed enums | labels of their mapping, see [`mapped_value!`](crate::mapped_value) |
//!
//! # Enumerations
//!
//! ```rust
//! use ble_cliapp::codec::{Decode, Encode, ValueToStringMapping};
//! use ble_cliapp::mapped_value;
//!
//! #[derive(Debug, Clone, Copy, PartialEq)]
//! enum Role {
//!     Central,
//!     Peripheral,
//! }
//!
//! static ROLE: ValueToStringMapping<Role> = ValueToStringMapping::new(&[
//!     (Role::Central, "CENTRAL"),
//!     (Role::Peripheral, "PERIPHERAL"),
//! ]);
//!
//! mapped_value!(Role, "Role", ROLE);
//!
//! assert_eq!(Role::decode("PERIPHERAL").ok(), Some(Role::Peripheral));
//! assert!(Role::decode("peripheral").is_err());
//!
//! let mut token = String::new();
//! Role::Central.encode(&mut token).unwrap();
//! assert_eq!(token, "CENTRAL");
//! ```

#![deny(unsafe_code)]

use core::fmt;

mod mapping;
mod primitive;
mod types;


pub use mapping::{Labels, ValueToStringMapping};
pub use types::{Address, HexBlob};

/// A value that can be parsed from a command-line token.
pub trait Decode: Sized {
    /// Human-readable type name reported when decoding fails.
    const TYPE_NAME: &'static str;

    /// Parse `token` into a value.
    fn decode(token: &str) -> Result<Self, DecodeError>;
}

/// A value that can be rendered back into its command-line token.
pub trait Encode {
    /// Write the token for `self` into `out`.
    fn encode<W: fmt::Write + ?Sized>(&self, out: &mut W) -> fmt::Result;
}

/// Reasons a token failed to decode.
#[derive(Clone, Copy)]
pub enum DecodeError {
    /// No token was supplied at the position the handler expects.
    Missing,
    /// The token is not in the syntax of the target type.
    Malformed,
    /// The token is a well-formed number that does not fit the target width.
    OutOfRange,
    /// The token is longer than the target's fixed capacity.
    TooLong,
    /// The token is not one of the labels of the target's mapping.
    UnknownLabel(&'static dyn Labels),
}

impl DecodeError {
    /// Short, stable description used in JSON error objects.
    pub fn reason(&self) -> &'static str {
        match self {
            DecodeError::Missing => "missing",
            DecodeError::Malformed => "malformed",
            DecodeError::OutOfRange => "out of range",
            DecodeError::TooLong => "too long",
            DecodeError::UnknownLabel(_) => "unknown label",
        }
    }

    /// The valid labels when the failure came from a mapping table.
    pub fn expected(&self) -> Option<&'static dyn Labels> {
        match self {
            DecodeError::UnknownLabel(labels) => Some(*labels),
            _ => None,
        }
    }
}

impl PartialEq for DecodeError {
    fn eq(&self, other: &Self) -> bool {
        core::mem::discriminant(self) == core::mem::discriminant(other)
    }
}

impl fmt::Debug for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::UnknownLabel(labels) => {
                f.write_str("UnknownLabel(")?;
                let mut list = f.debug_list();
                labels.for_each_label(&mut |label| {
                    list.entry(&label);
                });
                list.finish()?;
                f.write_str(")")
            }
            other => f.write_str(other.reason()),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DecodeError {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=str}", self.reason())
    }
}

/// Implement [`Decode`] and [`Encode`] for a type through a static
/// [`ValueToStringMapping`].
///
/// The type must be `Copy + PartialEq`; the mapping must be a `static` so the
/// decode error can point back at it.
#[macro_export]
macro_rules! mapped_value {
    ($ty:ty, $name:expr, $mapping:path) => {
        impl $crate::codec::Decode for $ty {
            const TYPE_NAME: &'static str = $name;

            fn decode(token: &str) -> Result<Self, $crate::codec::DecodeError> {
                $mapping.decode(token)
            }
        }

        impl $crate::codec::Encode for $ty {
            fn encode<W: core::fmt::Write + ?Sized>(&self, out: &mut W) -> core::fmt::Result {
                out.write_str($mapping.label_of(self).unwrap_or("unknown"))
            }
        }
    };
}
