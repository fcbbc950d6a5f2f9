//! Command registry, typed dispatch and response correlation.
//!
//! A command line such as `gap connect C0:FF:EE:00:00:01 5` names a *suite*
//! (`gap`), a *command* inside it (`connect`) and positional arguments. This
//! module turns that line into a call of a strongly typed handler and turns
//! the handler's outcome into exactly one JSON document:
//!
//! ```text
//! {"name":"gap connect","arguments":["C0:FF:EE:00:00:01","5"],"status":0,"result":...}
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │  Suite          │───▶│  Handler        │───▶│  Handler body   │
//! │  (builtins,     │    │  adapter        │    │  (typed args)   │
//! │   arity)        │    │  (codec)        │    │                 │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//!          │                                             │
//!          ▼                                             ▼
//! ┌─────────────────┐                           ┌─────────────────┐
//! │  Response       │◀──────────────────────────│  Async          │
//! │  (one-shot      │        completes later    │  procedure      │
//! │   JSON object)  │                           │  (timeout)      │
//! └─────────────────┘                           └─────────────────┘
//! ```
//!
//! # Defining a suite
//!
//! ```rust
//! use ble_cliapp::command::{Command, CommandArgDescriptor, Response, Suite};
//! use ble_cliapp::system::console::Console;
//! use core::cell::RefCell;
//! use std::rc::Rc;
//!
//! struct Counter {
//!     total: u32,
//! }
//!
//! fn add(counter: &mut Counter, amount: u16, response: &mut Response) {
//!     counter.total += u32::from(amount);
//!     response.success_with(&counter.total);
//! }
//!
//! static ADD_ARGS: &[CommandArgDescriptor] =
//!     &[CommandArgDescriptor::of::<u16>("amount", "value added to the total")];
//!
//! let mut suite = Suite::new("counter", Counter { total: 40 })
//!     .with_command(Command::new("add", "Add to the running total", ADD_ARGS, add));
//!
//! let output = Rc::new(RefCell::new(String::new()));
//! let console = Console::shared(output.clone());
//! let completion = suite.dispatch(&["counter", "add", "2"], &console, None);
//!
//! assert_eq!(completion.code().as_i32(), 0);
//! assert_eq!(
//!     output.borrow().trim_end(),
//!     r#"{"name":"counter add","arguments":["2"],"status":0,"result":42}"#
//! );
//! ```

#![deny(unsafe_code)]

use alloc::boxed::Box;
use core::fmt;

use crate::codec::Decode;

pub mod handler;
pub mod procedure;
pub mod response;
pub mod suite;

#[cfg(test)]
mod tests;

pub use handler::{Handler, IntoHandler};
pub use procedure::{start_procedure, Procedure, ProcedureHandle, DEFAULT_PROCEDURE_TIMEOUT};
pub use response::Response;
pub use suite::{Completion, CommandSuite, CompletionFn, Suite};

/// Outcome code of a command, returned to the transport and written as the
/// `"status"` field of the response.
///
/// Negative codes are errors, zero is success and positive codes mean the
/// command is still running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum StatusCode {
    /// The command completed successfully.
    Success = 0,
    /// Generic failure, described by the error value.
    Fail = -1,
    /// Wrong number of arguments or an argument that did not decode.
    InvalidParameters = -2,
    /// The command exists but has no implementation on this target.
    NotImplemented = -3,
    /// A callback the command relies on was never registered.
    CallbackMissing = -4,
    /// No such command (or suite).
    NotFound = -5,
    /// The command continues asynchronously; its response comes later.
    ExecutingContinue = 1,
    /// The target is busy with another operation.
    Busy = 2,
}

impl StatusCode {
    /// The integer written to the console and returned to the transport.
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// True for negative codes.
    pub const fn is_error(self) -> bool {
        self.as_i32() < 0
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i32())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for StatusCode {
    fn format(&self, f: defmt::Formatter) {
        match self {
            StatusCode::Success => defmt::write!(f, "Success"),
            StatusCode::Fail => defmt::write!(f, "Fail"),
            StatusCode::InvalidParameters => defmt::write!(f, "InvalidParameters"),
            StatusCode::NotImplemented => defmt::write!(f, "NotImplemented"),
            StatusCode::CallbackMissing => defmt::write!(f, "CallbackMissing"),
            StatusCode::NotFound => defmt::write!(f, "NotFound"),
            StatusCode::ExecutingContinue => defmt::write!(f, "ExecutingContinue"),
            StatusCode::Busy => defmt::write!(f, "Busy"),
        }
    }
}

/// Borrowed, immutable view of a command's argument tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandArgs<'a> {
    tokens: &'a [&'a str],
}

impl<'a> CommandArgs<'a> {
    /// View over `tokens`.
    pub const fn new(tokens: &'a [&'a str]) -> Self {
        Self { tokens }
    }

    /// Number of tokens.
    pub const fn len(&self) -> usize {
        self.tokens.len()
    }

    /// True if there are no tokens.
    pub const fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Token at `index`.
    pub fn get(&self, index: usize) -> Option<&'a str> {
        self.tokens.get(index).copied()
    }

    /// The view without its first `count` tokens (empty if `count` exceeds
    /// the length).
    pub fn drop(&self, count: usize) -> Self {
        Self {
            tokens: self.tokens.get(count..).unwrap_or(&[]),
        }
    }

    /// Iterate over the tokens.
    pub fn iter(&self) -> impl Iterator<Item = &'a str> + 'a {
        self.tokens.iter().copied()
    }

    /// The underlying slice.
    pub const fn as_slice(&self) -> &'a [&'a str] {
        self.tokens
    }
}

/// Documentation of one positional argument.
///
/// Descriptors drive `help`/`args` introspection and name the argument in
/// decode errors; they are never used to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandArgDescriptor {
    /// Human-readable type tag, e.g. `uint16_t`.
    pub type_name: &'static str,
    /// Argument name.
    pub name: &'static str,
    /// What the argument means.
    pub description: &'static str,
}

impl CommandArgDescriptor {
    /// Descriptor with an explicit type tag.
    pub const fn new(type_name: &'static str, name: &'static str, description: &'static str) -> Self {
        Self {
            type_name,
            name,
            description,
        }
    }

    /// Descriptor whose type tag is the codec name of `T`.
    pub const fn of<T: Decode>(name: &'static str, description: &'static str) -> Self {
        Self::new(T::TYPE_NAME, name, description)
    }
}

/// Upper bound on the number of arguments a command accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxArgs {
    /// At most this many.
    Bounded(usize),
    /// Any number; used by commands accumulating multi-token payloads.
    Unbounded,
}

impl MaxArgs {
    /// True if `count` arguments do not exceed the bound.
    pub const fn admits(self, count: usize) -> bool {
        match self {
            MaxArgs::Bounded(max) => count <= max,
            MaxArgs::Unbounded => true,
        }
    }
}

/// One entry of a suite's command table.
///
/// `C` is the suite's context type, handed to every handler as `&mut C`.
pub struct Command<C> {
    /// Name typed after the suite name. Unique within a suite.
    pub name: &'static str,
    /// Text returned by the `help` builtin.
    pub help: &'static str,
    /// Positional arguments; their count is the minimum arity.
    pub args: &'static [CommandArgDescriptor],
    /// Maximum arity, `Bounded(args.len())` unless made variadic.
    pub max_args: MaxArgs,
    handler: Box<dyn Handler<C>>,
}

impl<C: 'static> Command<C> {
    /// Command backed by a typed handler
    /// `Fn(&mut C, T0, …, Tn, &mut Response)`; each `Ti` is decoded from the
    /// token at position `i`.
    pub fn new<H, Args>(
        name: &'static str,
        help: &'static str,
        args: &'static [CommandArgDescriptor],
        handler: H,
    ) -> Self
    where
        H: IntoHandler<C, Args>,
    {
        Self {
            name,
            help,
            args,
            max_args: MaxArgs::Bounded(args.len()),
            handler: handler.into_handler(),
        }
    }

    /// Command receiving its tokens undecoded.
    pub fn raw<F>(
        name: &'static str,
        help: &'static str,
        args: &'static [CommandArgDescriptor],
        handler: F,
    ) -> Self
    where
        F: Fn(&mut C, CommandArgs<'_>, &mut Response) + 'static,
    {
        Self {
            name,
            help,
            args,
            max_args: MaxArgs::Bounded(args.len()),
            handler: Box::new(handler::Raw(handler)),
        }
    }

    /// Accept any number of arguments beyond the declared ones.
    pub fn variadic(mut self) -> Self {
        self.max_args = MaxArgs::Unbounded;
        self
    }
}

impl<C> Command<C> {
    /// Minimum arity.
    pub fn min_args(&self) -> usize {
        self.args.len()
    }

    pub(crate) fn invoke(&self, context: &mut C, args: CommandArgs<'_>, response: &mut Response) {
        self.handler.call(context, self.args, args, response);
    }
}

impl<C> fmt::Debug for Command<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("args", &self.args)
            .field("max_args", &self.max_args)
            .finish_non_exhaustive()
    }
}
