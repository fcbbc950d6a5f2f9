//! Incremental JSON writer for low-memory consoles.
//!
//! [`JsonWriter`] emits JSON tokens straight onto a character [`Sink`] as they
//! are produced; nothing is buffered beyond what the sink itself holds. The
//! writer keeps exactly one bit of state: whether a value was just committed,
//! in which case the next value (or key) owes a separating comma.
//!
//! Bracket balance is the caller's responsibility. The writer never validates
//! nesting; it only guarantees that commas land between sibling values.
//!
//! # Raw writes
//!
//! [`write`](JsonWriter::write) and [`format`](JsonWriter::format) append text
//! without marking a value complete, and [`commit_value`](JsonWriter::commit_value)
//! marks it. Composite scalars can therefore be streamed piece by piece:
//!
//! ```rust
//! use ble_cliapp::json::JsonWriter;
//!
//! let mut writer = JsonWriter::new(String::new());
//! writer.start_array();
//! writer.write("\"");
//! for byte in [0xCAu8, 0xFE] {
//!     writer.format(format_args!("{:02X}", byte));
//! }
//! writer.write("\"");
//! writer.commit_value();
//! writer.uint(7u8);
//! writer.end_array();
//!
//! assert_eq!(writer.sink(), "[\"CAFE\",7]");
//! ```

#![deny(unsafe_code)]

use core::fmt::{self, Write};

use serde::Serialize;

use crate::codec::Encode;


/// Capacity of the scratch buffer used by [`JsonWriter::serialize`].
///
/// Values whose JSON form is longer than this are rejected rather than
/// truncated.
pub const MAX_SERIALIZED_LEN: usize = 256;

/// Character sink consumed by the JSON writer.
///
/// Anything that implements [`core::fmt::Write`] can be a sink; `flush` is a
/// hook for sinks that buffer (a UART FIFO, a host stdout handle).
pub trait Sink: Write {
    /// Push buffered characters to the device. The default does nothing.
    fn flush(&mut self) {}
}

impl Sink for alloc::string::String {}

impl<const N: usize> Sink for heapless::String<N> {}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn flush(&mut self) {
        (**self).flush();
    }
}

/// Error returned by [`JsonWriter::serialize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializeError {
    /// The serialized form did not fit in [`MAX_SERIALIZED_LEN`] bytes.
    TooLarge,
}

#[cfg(feature = "defmt")]
impl defmt::Format for SerializeError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            SerializeError::TooLarge => defmt::write!(f, "TooLarge"),
        }
    }
}

/// Streaming JSON writer over a [`Sink`].
#[derive(Debug)]
pub struct JsonWriter<S: Sink> {
    sink: S,
    value_committed: bool,
    overflowed: bool,
}

impl<S: Sink> JsonWriter<S> {
    /// Create a writer that appends to `sink`.
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            value_committed: false,
            overflowed: false,
        }
    }

    /// Borrow the underlying sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consume the writer and return the sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// True if the sink ever refused characters (a full fixed-size buffer).
    pub fn has_overflowed(&self) -> bool {
        self.overflowed
    }

    /// Open an object: `{`.
    pub fn start_object(&mut self) -> &mut Self {
        self.separate();
        self.write("{");
        self
    }

    /// Close an object: `}`. The object counts as a committed value.
    pub fn end_object(&mut self) -> &mut Self {
        self.write("}");
        self.commit_value()
    }

    /// Open an array: `[`.
    pub fn start_array(&mut self) -> &mut Self {
        self.separate();
        self.write("[");
        self
    }

    /// Close an array: `]`. The array counts as a committed value.
    pub fn end_array(&mut self) -> &mut Self {
        self.write("]");
        self.commit_value()
    }

    /// Write an object key followed by `:`.
    ///
    /// The value that follows must not be preceded by a comma, so a key
    /// leaves the writer in the "nothing committed" state.
    pub fn key(&mut self, name: &str) -> &mut Self {
        self.separate();
        self.quoted(format_args!("{}", name));
        self.write(":");
        self
    }

    /// Write `true` or `false`.
    pub fn bool(&mut self, value: bool) -> &mut Self {
        self.separate();
        self.write(if value { "true" } else { "false" });
        self.commit_value()
    }

    /// Write any signed integer.
    pub fn int(&mut self, value: impl Into<i64>) -> &mut Self {
        self.separate();
        self.format(format_args!("{}", value.into()));
        self.commit_value()
    }

    /// Write any unsigned integer.
    pub fn uint(&mut self, value: impl Into<u64>) -> &mut Self {
        self.separate();
        self.format(format_args!("{}", value.into()));
        self.commit_value()
    }

    /// Write `null`.
    pub fn null(&mut self) -> &mut Self {
        self.separate();
        self.write("null");
        self.commit_value()
    }

    /// Write an escaped JSON string.
    pub fn string(&mut self, value: &str) -> &mut Self {
        self.separate();
        self.quoted(format_args!("{}", value));
        self.commit_value()
    }

    /// Write anything displayable as an escaped JSON string.
    pub fn string_fmt(&mut self, value: fmt::Arguments<'_>) -> &mut Self {
        self.separate();
        self.quoted(value);
        self.commit_value()
    }

    /// Write the codec token of `value` as a JSON string.
    pub fn encoded<T: Encode + ?Sized>(&mut self, value: &T) -> &mut Self {
        self.separate();
        self.write("\"");
        let mut escaped = Escaped(&mut self.sink);
        let result = value.encode(&mut escaped);
        self.record(result);
        self.write("\"");
        self.commit_value()
    }

    /// Stream `bytes` as an uppercase hex string.
    pub fn hex(&mut self, bytes: &[u8]) -> &mut Self {
        self.separate();
        self.write("\"");
        for byte in bytes {
            self.format(format_args!("{:02X}", byte));
        }
        self.write("\"");
        self.commit_value()
    }

    /// Serialize `value` with `serde-json-core` and write it as one value.
    ///
    /// Nothing is written if the value does not fit in
    /// [`MAX_SERIALIZED_LEN`] bytes.
    pub fn serialize<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<&mut Self, SerializeError> {
        let rendered: heapless::String<MAX_SERIALIZED_LEN> =
            serde_json_core::to_string(value).map_err(|_| SerializeError::TooLarge)?;
        self.separate();
        self.write(&rendered);
        Ok(self.commit_value())
    }

    /// Append raw text without marking a value complete.
    pub fn write(&mut self, text: &str) -> &mut Self {
        let result = self.sink.write_str(text);
        self.record(result);
        self
    }

    /// Append formatted raw text without marking a value complete.
    pub fn format(&mut self, args: fmt::Arguments<'_>) -> &mut Self {
        let result = self.sink.write_fmt(args);
        self.record(result);
        self
    }

    /// Mark the current value complete; the next value owes a comma.
    pub fn commit_value(&mut self) -> &mut Self {
        self.value_committed = true;
        self
    }

    /// Flush the sink.
    pub fn flush(&mut self) -> &mut Self {
        self.sink.flush();
        self
    }

    fn separate(&mut self) {
        if self.value_committed {
            self.write(",");
            self.value_committed = false;
        }
    }

    fn quoted(&mut self, value: fmt::Arguments<'_>) {
        self.write("\"");
        let result = Escaped(&mut self.sink).write_fmt(value);
        self.record(result);
        self.write("\"");
    }

    fn record(&mut self, result: fmt::Result) {
        if result.is_err() {
            self.overflowed = true;
        }
    }
}

/// Adapter escaping everything written through it for a JSON string body.
struct Escaped<'a, W: Write + ?Sized>(&'a mut W);

impl<W: Write + ?Sized> Write for Escaped<'_, W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let mut plain_start = 0;
        for (index, ch) in s.char_indices() {
            let escape = match ch {
                '"' => Some("\\\""),
                '\\' => Some("\\\\"),
                '\n' => Some("\\n"),
                '\r' => Some("\\r"),
                '\t' => Some("\\t"),
                '\u{08}' => Some("\\b"),
                '\u{0C}' => Some("\\f"),
                c if (c as u32) < 0x20 => None,
                _ => continue,
            };
            self.0.write_str(&s[plain_start..index])?;
            match escape {
                Some(sequence) => self.0.write_str(sequence)?,
                None => write!(self.0, "\\u{:04x}", ch as u32)?,
            }
            plain_start = index + ch.len_utf8();
        }
        self.0.write_str(&s[plain_start..])
    }
}
