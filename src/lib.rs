//! # ble-cliapp - serial command framework for BLE test harnesses
//!
//! A test harness talks to a device under test over a serial console, one
//! line per command, and gets one JSON document back per line:
//!
//! ```text
//! > ble getVersion
//! {"name":"ble getVersion","arguments":[],"status":0,"result":"6.2.0"}
//! ```
//!
//! The crate supplies the plumbing between the line and the Bluetooth Low
//! Energy stack; the stack itself stays behind a trait.
//!
//! ## Features
//!
//! ### Command framework
//! - **Suites**: named command tables with built-in `help`, `list` and `args`
//! - **Typed handlers**: ordinary functions whose parameters are decoded from
//!   the command's tokens, with precise errors for the first bad argument
//! - **Responses**: a one-shot JSON object per command, closed exactly once
//! - **Asynchronous procedures**: commands completed later by a stack event,
//!   guarded by a timeout
//!
//! ### Value codec and JSON
//! - Integers with `0x`/`0b`/`0o` prefixes and range checks, enums through
//!   label tables, device addresses, hex blobs
//! - An incremental JSON writer over any character sink, plus `serde` values
//!   through `serde-json-core`
//!
//! ### System
//! - A line-assembling shell routing lines to suites, queueing input while a
//!   command is pending
//! - A single-threaded event queue with a virtual clock
//!
//! ## Usage
//!
//! ```rust
//! use ble_cliapp::command::{Command, CommandArgDescriptor, Response, Suite};
//! use ble_cliapp::system::console::Console;
//! use ble_cliapp::system::event_queue::EventQueue;
//! use ble_cliapp::system::shell::Shell;
//! use core::cell::RefCell;
//! use std::rc::Rc;
//!
//! fn add(_: &mut (), a: i32, b: i32, response: &mut Response) {
//!     response.success_with(&(a + b));
//! }
//!
//! static ADD_ARGS: &[CommandArgDescriptor] = &[
//!     CommandArgDescriptor::of::<i32>("a", "first term"),
//!     CommandArgDescriptor::of::<i32>("b", "second term"),
//! ];
//!
//! let output = Rc::new(RefCell::new(String::new()));
//! let mut shell = Shell::new(Console::shared(output.clone()), EventQueue::new());
//! shell.set_echo(false);
//! shell.register_suite(Suite::new("math", ()).with_command(Command::new("add", "Add two integers", ADD_ARGS, add)));
//!
//! shell.input(b"math add 0x10 -1\r");
//! assert_eq!(
//!     output.borrow().as_str(),
//!     "{\"name\":\"math add\",\"arguments\":[\"0x10\",\"-1\"],\"status\":0,\"result\":15}\r\n"
//! );
//! ```
//!
//! ## Platform Support
//!
//! The crate is `no_std` and needs a global allocator (`alloc`). It runs on
//! microcontrollers as well as on a host, where the `std` feature adds a
//! stdout console.
//!
//! ## Optional Features
//!
//! - `std`: Enable standard library support (default: disabled)
//! - `defmt`: Enable defmt logging support for embedded debugging

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

extern crate alloc;

#[macro_use]
mod fmt;

/// String to typed value conversion for command arguments.
///
/// Every argument type implements [`codec::Decode`]; enums are decoded through
/// label tables.
pub mod codec;

/// Incremental JSON output over a character sink.
pub mod json;

/// Command registry, typed dispatch, responses and asynchronous procedures.
pub mod command;

/// Console, event queue and the command shell.
pub mod system;

/// Demonstration suite driving a BLE stack's lifecycle.
pub mod ble;
