//! Shared character output for the shell and every command response.
//!
//! A [`Console`] is a cheap, cloneable handle on one [`Sink`]. The shell echoes
//! through it and each [`Response`](crate::command::Response) streams its JSON
//! document through its own clone, so output from a command that completes
//! long after it was dispatched still reaches the same device.
//!
//! # Examples
//!
//! ```rust
//! use ble_cliapp::system::console::Console;
//! use core::cell::RefCell;
//! use std::rc::Rc;
//!
//! let captured = Rc::new(RefCell::new(String::new()));
//! let console = Console::shared(captured.clone());
//!
//! console.print("ready\r\n");
//! assert_eq!(captured.borrow().as_str(), "ready\r\n");
//! ```

use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt::{self, Write};

use crate::json::Sink;

/// Function signature for raw output handlers.
///
/// Output handlers receive text and push it to the device (UART, USB CDC,
/// RTT…). Wrap one in a [`Console`] with [`Console::from_fn`].
pub type OutputFn = fn(&str);

/// [`Sink`] forwarding every write to an [`OutputFn`].
#[derive(Debug, Clone, Copy)]
pub struct FnSink(pub OutputFn);

impl fmt::Write for FnSink {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        (self.0)(s);
        Ok(())
    }
}

impl Sink for FnSink {}

/// [`Sink`] writing to the process's standard output.
#[cfg(feature = "std")]
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

#[cfg(feature = "std")]
impl fmt::Write for StdoutSink {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        use std::io::Write;
        std::io::stdout().write_all(s.as_bytes()).map_err(|_| fmt::Error)
    }
}

#[cfg(feature = "std")]
impl Sink for StdoutSink {
    fn flush(&mut self) {
        use std::io::Write;
        // nothing useful to do with a failed stdout flush on a console
        let _ = std::io::stdout().flush();
    }
}

/// Cloneable handle on the console sink.
#[derive(Clone)]
pub struct Console {
    sink: Rc<RefCell<dyn Sink>>,
}

impl Console {
    /// Take ownership of `sink`.
    pub fn new<S: Sink + 'static>(sink: S) -> Self {
        Self {
            sink: Rc::new(RefCell::new(sink)),
        }
    }

    /// Share a sink the caller keeps a handle on (test capture buffers).
    pub fn shared<S: Sink + 'static>(sink: Rc<RefCell<S>>) -> Self {
        Self { sink }
    }

    /// Console printing through a plain output function.
    pub fn from_fn(output: OutputFn) -> Self {
        Self::new(FnSink(output))
    }

    /// Write raw text.
    pub fn print(&self, text: &str) {
        // sinks that can fail are fixed-size buffers; dropping the overflow is all we can do
        let _ = self.sink.borrow_mut().write_str(text);
    }
}

impl fmt::Write for Console {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.sink.borrow_mut().write_str(s)
    }
}

impl Sink for Console {
    fn flush(&mut self) {
        self.sink.borrow_mut().flush();
    }
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}
