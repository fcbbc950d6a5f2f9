//! Serial command shell routing lines to command suites.
//!
//! The shell assembles input bytes into lines (echo, backspace, quoted
//! arguments with escapes) and hands each complete line
//! `<suite> <command> [args…]` to the [`CommandSuite`] registered under the
//! first word. Every line produces exactly one JSON document on the console.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐    ┌─────────────────┐
//! │   Input Layer   │───▶│  Argument       │───▶│   Suite         │
//! │   (Character    │    │  Parser         │    │   Routing       │
//! │   Processing)   │    │                 │    │                 │
//! └─────────────────┘    └─────────────────┘    └─────────────────┘
//!          │                                             │
//!          ▼                                             ▼
//! ┌─────────────────┐                           ┌─────────────────┐
//! │   Line Buffer   │◀──── resumed via ─────────│   Pending       │
//! │   + queued      │      event queue          │   command       │
//! │   lines         │                           │                 │
//! └─────────────────┘                           └─────────────────┘
//! ```
//!
//! # Asynchronous commands
//!
//! While a command is pending (its response was handed to an asynchronous
//! procedure) further lines are queued rather than run, up to
//! [`MAX_QUEUED_LINES`]. When the pending response closes, a resume event is
//! posted to the [`EventQueue`]; once it has run, [`Shell::poll`] (also called
//! at the start of every [`Shell::input`]) executes the queued lines in order.
//!
//! # Usage Examples
//!
//! ```rust
//! use ble_cliapp::command::{Command, Response, Suite};
//! use ble_cliapp::system::console::Console;
//! use ble_cliapp::system::event_queue::EventQueue;
//! use ble_cliapp::system::shell::{Shell, ShellResult};
//! use core::cell::RefCell;
//! use std::rc::Rc;
//!
//! fn ping(_: &mut (), response: &mut Response) {
//!     response.success_with("pong");
//! }
//!
//! let output = Rc::new(RefCell::new(String::new()));
//! let mut shell = Shell::new(Console::shared(output.clone()), EventQueue::new());
//! shell.set_echo(false);
//! shell.register_suite(Suite::new("demo", ()).with_command(Command::new("ping", "Reply pong", &[], ping)));
//!
//! assert_eq!(shell.input(b"demo ping\r"), ShellResult::Ok);
//! assert!(output.borrow().contains(r#""result":"pong""#));
//! ```
//!
//! ## Argument Parsing
//!
//! ```text
//! > gap setDeviceName "my device"        # quoted argument with spaces
//! > demo echo "Line 1\nLine 2"           # escape sequences within quotes
//! > demo path "C:\\Program Files"        # escaped backslashes
//! ```

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::Cell;
use core::fmt;
use core::ops::Range;
use core::str;

use heapless::Deque;

use super::console::Console;
use super::event_queue::EventQueue;
use crate::command::{CommandArgs, CommandSuite, Completion, CompletionFn, Response, StatusCode};

/// Maximum buffer size for input command lines.
///
/// Characters typed past this length are rejected with
/// [`ShellResult::BufferOverflow`].
pub const MAX_BUFFER_SIZE: usize = 256;

/// Maximum number of arguments per line, suite name included. Extra words
/// are ignored.
pub const MAX_ARGS: usize = 16;

/// Lines kept while an asynchronous command is pending.
pub const MAX_QUEUED_LINES: usize = 4;

// ASCII control character constants for input processing
/// ASCII backspace character (0x08).
pub const ASCII_BACKSPACE: u8 = 0x08;
/// ASCII line feed character (0x0A).
pub const ASCII_LF: u8 = 0x0A;
/// ASCII carriage return character (0x0D).
pub const ASCII_CR: u8 = 0x0D;
/// ASCII delete character (0x7F).
pub const ASCII_DEL: u8 = 0x7F;
/// ASCII space character (0x20).
pub const ASCII_SPACE: u8 = 0x20;

/// Error text of the response written for an unregistered suite.
pub const SUITE_NOT_FOUND_MESSAGE: &str = "suite not found";

type Line = heapless::Vec<u8, MAX_BUFFER_SIZE>;

/// Result type for shell operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellResult {
    /// Operation completed successfully.
    Ok,
    /// Invalid parameter, e.g. registering a suite under a taken name.
    InvalidParameter,
    /// A line arrived while a command was pending and the queue of waiting
    /// lines is full; the line was dropped.
    OutOfMemory,
    /// Input buffer overflow occurred.
    BufferOverflow,
}

#[cfg(feature = "defmt")]
impl defmt::Format for ShellResult {
    fn format(&self, f: defmt::Formatter) {
        match self {
            ShellResult::Ok => defmt::write!(f, "Ok"),
            ShellResult::InvalidParameter => defmt::write!(f, "InvalidParameter"),
            ShellResult::OutOfMemory => defmt::write!(f, "OutOfMemory"),
            ShellResult::BufferOverflow => defmt::write!(f, "BufferOverflow"),
        }
    }
}

/// Line assembler and suite router.
pub struct Shell {
    buffer: Line,
    queued: Deque<Line, MAX_QUEUED_LINES>,
    suites: Vec<Box<dyn CommandSuite>>,
    console: Console,
    events: EventQueue,
    pending: Rc<Cell<bool>>,
    last_status: Rc<Cell<Option<StatusCode>>>,
    echo_enabled: bool,
}

impl Shell {
    /// Create a shell writing to `console` and resuming through `events`.
    ///
    /// Echo is enabled and no suite is registered.
    pub fn new(console: Console, events: EventQueue) -> Self {
        Self {
            buffer: Line::new(),
            queued: Deque::new(),
            suites: Vec::new(),
            console,
            events,
            pending: Rc::new(Cell::new(false)),
            last_status: Rc::new(Cell::new(None)),
            echo_enabled: true,
        }
    }

    /// Enable or disable echoing typed characters back to the console.
    ///
    /// Interactive terminals want echo; test harnesses usually turn it off
    /// so the console carries JSON documents only.
    pub fn set_echo(&mut self, enabled: bool) {
        self.echo_enabled = enabled;
    }

    /// Register `suite` under its [`name`](CommandSuite::name).
    ///
    /// # Returns
    ///
    /// * [`ShellResult::Ok`] - Suite registered
    /// * [`ShellResult::InvalidParameter`] - Empty name, or a suite with that
    ///   name already exists
    pub fn register_suite(&mut self, suite: impl CommandSuite + 'static) -> ShellResult {
        let name = suite.name();
        if name.is_empty() || self.suites.iter().any(|existing| existing.name() == name) {
            warn!("cannot register suite {=str}", name);
            return ShellResult::InvalidParameter;
        }
        self.suites.push(Box::new(suite));
        ShellResult::Ok
    }

    /// Names of the registered suites, in registration order.
    pub fn suite_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.suites.iter().map(|suite| suite.name())
    }

    /// True while an asynchronous command holds the shell.
    pub fn is_busy(&self) -> bool {
        self.pending.get()
    }

    /// Number of complete lines waiting for the pending command.
    pub fn queued_lines(&self) -> usize {
        self.queued.len()
    }

    /// Status of the most recently finished line, or
    /// [`StatusCode::ExecutingContinue`] while it is pending.
    pub fn last_status(&self) -> Option<StatusCode> {
        self.last_status.get()
    }

    /// Process input data character by character.
    ///
    /// # Character Handling
    ///
    /// - **CR/LF**: Ends the line; it runs now or is queued behind a pending
    ///   command
    /// - **Backspace/Delete**: Removes the last character with visual feedback
    /// - **Printable ASCII**: Added to the line buffer with optional echo
    /// - **Other control characters**: Ignored
    ///
    /// # Returns
    ///
    /// Nothing is echoed while a command is pending, since its response is
    /// still being written to the console.
    ///
    /// # Returns
    ///
    /// * [`ShellResult::Ok`] - Input processed
    /// * [`ShellResult::BufferOverflow`] - Line too long; the rest of `data`
    ///   is discarded
    /// * [`ShellResult::OutOfMemory`] - At least one line dropped, queue full;
    ///   the bytes after it are still processed
    pub fn input(&mut self, data: &[u8]) -> ShellResult {
        self.poll();

        let mut result = ShellResult::Ok;
        for &byte in data {
            match byte {
                ASCII_CR | ASCII_LF => {
                    self.echo(if byte == ASCII_CR { "\r" } else { "\n" });
                    let line = core::mem::take(&mut self.buffer);
                    if line.is_empty() {
                        continue;
                    }
                    if self.submit(line) == ShellResult::OutOfMemory {
                        result = ShellResult::OutOfMemory;
                    }
                }
                ASCII_BACKSPACE | ASCII_DEL => {
                    if self.buffer.pop().is_some() {
                        self.echo("\x08 \x08");
                    }
                }
                0x20..=0x7E => {
                    if self.buffer.push(byte).is_err() {
                        warn!("line longer than {=usize} bytes", MAX_BUFFER_SIZE);
                        return ShellResult::BufferOverflow;
                    }
                    let ch = [byte];
                    if let Ok(s) = str::from_utf8(&ch) {
                        self.echo(s);
                    }
                }
                _ => {}
            }
        }

        result
    }

    /// Run queued lines for as long as no command is pending.
    ///
    /// Call after running the event queue. Returns the number of lines
    /// executed.
    pub fn poll(&mut self) -> usize {
        let mut executed = 0;
        while !self.pending.get() {
            let Some(line) = self.queued.pop_front() else {
                break;
            };
            self.execute(line);
            executed += 1;
        }
        executed
    }

    fn echo(&self, text: &str) {
        if self.echo_enabled && !self.pending.get() {
            self.console.print(text);
        }
    }

    fn submit(&mut self, line: Line) -> ShellResult {
        if !self.pending.get() && self.queued.is_empty() {
            self.execute(line);
            return ShellResult::Ok;
        }
        match self.queued.push_back(line) {
            Ok(()) => {
                debug!("line queued behind pending command");
                ShellResult::Ok
            }
            Err(_) => {
                warn!("command pending and {=usize} lines queued, dropping line", MAX_QUEUED_LINES);
                ShellResult::OutOfMemory
            }
        }
    }

    fn execute(&mut self, mut line: Line) {
        let spans = parse_arguments(&mut line);
        let mut argv: heapless::Vec<&str, MAX_ARGS> = heapless::Vec::new();
        for span in spans {
            let Ok(arg) = str::from_utf8(&line[span]) else {
                warn!("argument is not valid text");
                return;
            };
            // spans never exceed MAX_ARGS
            let _ = argv.push(arg);
        }
        let Some(&suite_name) = argv.first() else {
            return;
        };

        let Some(suite) = self.suites.iter_mut().find(|suite| suite.name() == suite_name) else {
            debug!("unknown suite {=str}", suite_name);
            self.last_status.set(Some(report_unknown_suite(&argv, &self.console)));
            return;
        };

        let pending = self.pending.clone();
        let last_status = self.last_status.clone();
        let events = self.events.clone();
        let on_complete: CompletionFn = Box::new(move |status| {
            last_status.set(Some(status));
            events.post(move || pending.set(false));
        });

        // a detached response may close before dispatch returns; its callback
        // then already holds the final status and the resume is posted
        self.pending.set(true);
        self.last_status.set(Some(StatusCode::ExecutingContinue));
        if let Completion::Done(status) = suite.dispatch(&argv, &self.console, Some(on_complete)) {
            self.pending.set(false);
            self.last_status.set(Some(status));
        }
    }
}

impl fmt::Debug for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shell")
            .field("buffered", &self.buffer.len())
            .field("queued", &self.queued.len())
            .field("suites", &self.suites.len())
            .field("pending", &self.pending.get())
            .field("echo_enabled", &self.echo_enabled)
            .finish()
    }
}

fn report_unknown_suite(argv: &[&str], console: &Console) -> StatusCode {
    let mut response = Response::new(console.clone());
    match argv {
        [suite, command, ..] => response.set_command_name(format_args!("{} {}", suite, command)),
        [suite] => response.set_command_name(suite),
        [] => false,
    };
    response.set_arguments(CommandArgs::new(argv.get(2..).unwrap_or(&[])));
    response.complete_with(StatusCode::NotFound, SUITE_NOT_FOUND_MESSAGE);
    response.close();
    StatusCode::NotFound
}

/// Split `line` into arguments in place.
///
/// Handles space-separated words, quoted arguments with spaces and the escape
/// sequences `\"`, `\\`, `\n`, `\t` and `\r` inside quotes. Escapes are
/// resolved by compacting the quoted text towards its start, so the returned
/// ranges index into the rewritten buffer.
///
/// ```text
/// gap connect AA:BB:CC:DD:EE:FF     # 3 args
/// demo echo "device name" value     # 4 args: [..., "device name", "value"]
/// demo echo "Line 1\nLine 2"        # 3 args: [..., "Line 1<LF>Line 2"]
/// ```
fn parse_arguments(line: &mut [u8]) -> heapless::Vec<Range<usize>, MAX_ARGS> {
    let mut spans = heapless::Vec::new();
    let len = line.len();
    let mut i = 0;

    while i < len && !spans.is_full() {
        while i < len && line[i] == ASCII_SPACE {
            i += 1;
        }
        if i >= len {
            break;
        }

        if line[i] == b'"' {
            i += 1;
            let start = i;
            let mut write_pos = i;
            while i < len {
                match line[i] {
                    b'\\' if i + 1 < len => {
                        line[write_pos] = match line[i + 1] {
                            b'n' => b'\n',
                            b't' => b'\t',
                            b'r' => b'\r',
                            other => other,
                        };
                        write_pos += 1;
                        i += 2;
                    }
                    b'"' => {
                        i += 1;
                        break;
                    }
                    byte => {
                        line[write_pos] = byte;
                        write_pos += 1;
                        i += 1;
                    }
                }
            }
            // an unclosed quote still yields its argument
            let _ = spans.push(start..write_pos);
        } else {
            let start = i;
            // a quote in the middle of a word ends it
            while i < len && line[i] != ASCII_SPACE && line[i] != b'"' {
                i += 1;
            }
            let _ = spans.push(start..i);
        }
    }

    if i < len && spans.is_full() {
        warn!("more than {=usize} arguments, ignoring the rest", MAX_ARGS);
    }
    spans
}
