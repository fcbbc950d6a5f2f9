//! The one-shot JSON response of a single command invocation.
//!
//! A [`Response`] streams its document to the console as it goes. Each field
//! can be written once, in order:
//!
//! ```text
//! Fresh ─▶ name ─▶ arguments ─▶ status ─▶ result | error ─▶ Closed
//! ```
//!
//! Whether the payload lands under `"result"` or `"error"` follows the sign
//! of the status: non-negative codes produce `"result"`, negative ones
//! `"error"`. [`close`](Response::close) finishes the object exactly once and
//! fires the `on_close` callback; dropping an unclosed response closes it, so
//! every invocation ends in a well-formed document.
//!
//! A response can change owner with [`detach`](Response::detach), which moves
//! the live document out and leaves an inert placeholder behind. That is how a
//! handler hands its response to an asynchronous procedure.

use alloc::boxed::Box;
use core::fmt;

use serde::Serialize;

use super::{CommandArgs, StatusCode};
use crate::json::{JsonWriter, MAX_SERIALIZED_LEN};
use crate::system::console::Console;

/// Error text used when a response is closed before any status was set.
pub const NO_RESULT_MESSAGE: &str = "command completed without a result";

/// Error text used when a result value does not fit the serialization buffer.
pub const RESULT_TOO_LARGE_MESSAGE: &str = "result too large";

type OnClose = Box<dyn FnOnce(&Response)>;

struct ResponseState {
    name_set: bool,
    arguments_set: bool,
    status: Option<StatusCode>,
    result_opened: bool,
    closed: bool,
    writer: JsonWriter<Console>,
    on_close: Option<OnClose>,
}

/// One command's response document.
#[derive(Default)]
pub struct Response {
    state: Option<ResponseState>,
}

impl Response {
    /// Start a new document on `console`; the opening brace is written
    /// immediately.
    pub fn new(console: Console) -> Self {
        let mut writer = JsonWriter::new(console);
        writer.start_object();
        Self {
            state: Some(ResponseState {
                name_set: false,
                arguments_set: false,
                status: None,
                result_opened: false,
                closed: false,
                writer,
                on_close: None,
            }),
        }
    }

    /// Move the live document out of `self`, leaving a detached placeholder
    /// that ignores every write.
    pub fn detach(&mut self) -> Response {
        Response {
            state: self.state.take(),
        }
    }

    /// True if this value no longer owns a document.
    pub fn is_detached(&self) -> bool {
        self.state.is_none()
    }

    /// True once the document has been closed.
    pub fn is_closed(&self) -> bool {
        self.state.as_ref().is_some_and(|state| state.closed)
    }

    /// The status code, once set.
    pub fn status_code(&self) -> Option<StatusCode> {
        self.state.as_ref().and_then(|state| state.status)
    }

    /// Register the callback fired by [`close`](Self::close). Replaces any
    /// previous one; returns `false` on a detached or closed response.
    pub fn set_on_close(&mut self, callback: impl FnOnce(&Response) + 'static) -> bool {
        match self.open_state() {
            Some(state) => {
                state.on_close = Some(Box::new(callback));
                true
            }
            None => false,
        }
    }

    /// Remove the close callback without firing it.
    pub fn clear_on_close(&mut self) {
        if let Some(state) = self.state.as_mut() {
            state.on_close = None;
        }
    }

    /// Write `"name"`. Fails if already written or if a later field was.
    pub fn set_command_name(&mut self, name: impl fmt::Display) -> bool {
        let Some(state) = self.open_state() else {
            return false;
        };
        if state.name_set || state.arguments_set || state.status.is_some() {
            return false;
        }
        state.name_set = true;
        state.writer.key("name").string_fmt(format_args!("{}", name));
        true
    }

    /// Write `"arguments"` as an array of the raw tokens.
    pub fn set_arguments(&mut self, args: CommandArgs<'_>) -> bool {
        let Some(state) = self.open_state() else {
            return false;
        };
        if state.arguments_set || state.status.is_some() {
            return false;
        }
        state.arguments_set = true;
        state.writer.key("arguments").start_array();
        for token in args.iter() {
            state.writer.string(token);
        }
        state.writer.end_array();
        true
    }

    /// Write `"status"`. Succeeds once; a second call changes nothing.
    pub fn set_status_code(&mut self, code: StatusCode) -> bool {
        let Some(state) = self.open_state() else {
            return false;
        };
        if state.status.is_some() {
            return false;
        }
        state.status = Some(code);
        state.writer.key("status").int(code.as_i32());
        true
    }

    /// Writer positioned at the result value.
    ///
    /// The first call writes the `"result"` or `"error"` key; later calls
    /// return the same stream. `None` until a status is set, after close, and
    /// on a detached response.
    pub fn result_stream(&mut self) -> Option<&mut JsonWriter<Console>> {
        let state = self.open_state()?;
        let status = state.status?;
        if !state.result_opened {
            state.result_opened = true;
            state
                .writer
                .key(if status.is_error() { "error" } else { "result" });
        }
        Some(&mut state.writer)
    }

    /// Set status `Success` with no value.
    pub fn success(&mut self) -> bool {
        self.set_status_code(StatusCode::Success)
    }

    /// Set status `Success` and write `value` as the result.
    pub fn success_with<T: Serialize + ?Sized>(&mut self, value: &T) -> bool {
        self.complete_with(StatusCode::Success, value)
    }

    /// Set status `Fail` with no value.
    pub fn failure(&mut self) -> bool {
        self.set_status_code(StatusCode::Fail)
    }

    /// Set status `Fail` and write `value` as the error.
    pub fn failure_with<T: Serialize + ?Sized>(&mut self, value: &T) -> bool {
        self.complete_with(StatusCode::Fail, value)
    }

    /// Set status `InvalidParameters` with no value.
    pub fn invalid_parameters(&mut self) -> bool {
        self.set_status_code(StatusCode::InvalidParameters)
    }

    /// Set status `InvalidParameters` and write `value` as the error.
    pub fn invalid_parameters_with<T: Serialize + ?Sized>(&mut self, value: &T) -> bool {
        self.complete_with(StatusCode::InvalidParameters, value)
    }

    /// Set status `NotImplemented` with no value.
    pub fn not_implemented(&mut self) -> bool {
        self.set_status_code(StatusCode::NotImplemented)
    }

    /// Set status `NotImplemented` and write `value` as the error.
    pub fn not_implemented_with<T: Serialize + ?Sized>(&mut self, value: &T) -> bool {
        self.complete_with(StatusCode::NotImplemented, value)
    }

    /// Set status `code` and write `value` under the key its sign selects.
    ///
    /// If `value` serializes to more than
    /// [`MAX_SERIALIZED_LEN`](crate::json::MAX_SERIALIZED_LEN) bytes the
    /// response fails with [`RESULT_TOO_LARGE_MESSAGE`] instead. Returns
    /// `false`, writing nothing, if a status was already set.
    pub fn complete_with<T: Serialize + ?Sized>(&mut self, code: StatusCode, value: &T) -> bool {
        if self.open_state().is_none_or(|state| state.status.is_some()) {
            return false;
        }

        let rendered: Result<heapless::String<MAX_SERIALIZED_LEN>, _> =
            serde_json_core::to_string(value);
        let Ok(rendered) = rendered else {
            warn!("result does not fit in {=usize} bytes", MAX_SERIALIZED_LEN);
            self.set_status_code(StatusCode::Fail);
            if let Some(writer) = self.result_stream() {
                writer.string(RESULT_TOO_LARGE_MESSAGE);
            }
            return false;
        };

        self.set_status_code(code);
        if let Some(writer) = self.result_stream() {
            writer.write(&rendered).commit_value();
        }
        true
    }

    /// Finish the document and fire `on_close`. Only the first call has an
    /// effect.
    ///
    /// A response closed without a status gets status `Fail` and
    /// [`NO_RESULT_MESSAGE`]; one with a status but no value gets `null`.
    pub fn close(&mut self) {
        if self.open_state().is_none() {
            return;
        }

        if self.status_code().is_none() {
            self.set_status_code(StatusCode::Fail);
            if let Some(writer) = self.result_stream() {
                writer.string(NO_RESULT_MESSAGE);
            }
        }
        let opened = self.state.as_ref().is_some_and(|state| state.result_opened);
        if !opened {
            if let Some(writer) = self.result_stream() {
                writer.null();
            }
        }

        let on_close = match self.state.as_mut() {
            Some(state) => {
                state.writer.end_object();
                state.writer.write("\r\n");
                state.writer.flush();
                state.closed = true;
                state.on_close.take()
            }
            None => None,
        };

        if let Some(callback) = on_close {
            callback(self);
        }
    }

    fn open_state(&mut self) -> Option<&mut ResponseState> {
        self.state.as_mut().filter(|state| !state.closed)
    }
}

impl Drop for Response {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            Some(state) => f
                .debug_struct("Response")
                .field("name_set", &state.name_set)
                .field("arguments_set", &state.arguments_set)
                .field("status", &state.status)
                .field("result_opened", &state.result_opened)
                .field("closed", &state.closed)
                .finish_non_exhaustive(),
            None => f.write_str("Response(detached)"),
        }
    }
}
