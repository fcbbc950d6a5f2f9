//! System plumbing around the command framework.
//!
//! # Available Utilities
//!
//! - **[`console`]**: shared character output every response is written to
//! - **[`event_queue`]**: single-threaded scheduler with a virtual clock,
//!   driving timeouts and deferred callbacks
//! - **[`shell`]**: line assembler routing `<suite> <command> [args…]` lines
//!   to registered suites
//!
//! # Usage
//!
//! A firmware main loop feeds received bytes to the shell, then lets the
//! event queue catch up with the tick counter:
//!
//! ```rust,no_run
//! use ble_cliapp::system::console::Console;
//! use ble_cliapp::system::event_queue::EventQueue;
//! use ble_cliapp::system::shell::Shell;
//! use core::time::Duration;
//!
//! let events = EventQueue::new();
//! let mut shell = Shell::new(Console::from_fn(|text| print!("{}", text)), events.clone());
//!
//! loop {
//!     # let received: &[u8] = b"";
//!     shell.input(received);
//!     events.advance(Duration::from_millis(1));
//!     shell.poll();
//! }
//! ```

/// Shared console output.
pub mod console;

/// Event queue with a virtual clock.
pub mod event_queue;

/// Command shell routing lines to suites.
pub mod shell;
