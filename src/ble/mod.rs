//! Lifecycle commands of the BLE stack (`ble …`).
//!
//! The stack is reached through [`BleStack`]; this suite defines no BLE
//! semantics of its own and only maps stack calls to responses.
//!
//! | Command          | Result                                   |
//! |------------------|------------------------------------------|
//! | `getVersion`     | stack version string                     |
//! | `init`           | completes asynchronously, `null`          |
//! | `shutdown`       | `null`                                   |
//! | `reset`          | `null`                                   |
//! | `hasInitialized` | `true` / `false`                         |
//!
//! `init` continues asynchronously: the dispatcher reports
//! [`StatusCode::ExecutingContinue`](crate::command::StatusCode) and the
//! response is closed when the stack signals the end of initialization, or
//! with `"timeout"` if it never does.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt;
use core::time::Duration;

use serde::{Serialize, Serializer};

use crate::command::{
    Command, Procedure, ProcedureHandle, Response, Suite, DEFAULT_PROCEDURE_TIMEOUT,
    start_procedure,
};
use crate::system::event_queue::EventQueue;

#[cfg(test)]
mod tests;

/// Name of the suite built by [`ble_suite`].
pub const SUITE_NAME: &str = "ble";

/// Callback a stack invokes once initialization has finished.
pub type InitCallback = Box<dyn FnOnce(Result<(), BleError>)>;

/// Errors reported by a [`BleStack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleError {
    /// `init` was called on a running stack.
    AlreadyInitialized,
    /// The operation needs an initialized stack.
    NotInitialized,
    /// Initialization was started and has not finished yet.
    InitializationIncomplete,
    /// The stack rejected the operation in its current state.
    InvalidState,
    /// Failure inside the stack or the controller.
    Internal,
}

impl BleError {
    /// Text written as the response error value.
    pub const fn as_str(self) -> &'static str {
        match self {
            BleError::AlreadyInitialized => "already initialized",
            BleError::NotInitialized => "not initialized",
            BleError::InitializationIncomplete => "initialization incomplete",
            BleError::InvalidState => "invalid state",
            BleError::Internal => "internal stack error",
        }
    }
}

impl fmt::Display for BleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for BleError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for BleError {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=str}", self.as_str())
    }
}

/// The part of a BLE stack the `ble` suite drives.
pub trait BleStack {
    /// Version string of the stack.
    fn version(&self) -> &str;

    /// Start initialization; `on_complete` is called once it has finished.
    ///
    /// The callback may be invoked before `init` returns.
    fn init(&mut self, on_complete: InitCallback) -> Result<(), BleError>;

    /// Forget a callback registered by [`init`](Self::init) that has not
    /// fired yet.
    fn cancel_init(&mut self) {}

    /// True once initialization completed successfully.
    fn has_initialized(&self) -> bool;

    /// Stop the stack.
    fn shutdown(&mut self) -> Result<(), BleError>;

    /// Bring the stack back to its power-on state. Defaults to
    /// [`shutdown`](Self::shutdown) when initialized.
    fn reset(&mut self) -> Result<(), BleError> {
        if self.has_initialized() {
            self.shutdown()
        } else {
            Ok(())
        }
    }
}

/// Context shared by the `ble` commands.
pub struct BleContext<S> {
    stack: Rc<RefCell<S>>,
    events: EventQueue,
    init_timeout: Duration,
}

impl<S: BleStack + 'static> BleContext<S> {
    /// Context over `stack`, scheduling through `events`.
    pub fn new(stack: Rc<RefCell<S>>, events: EventQueue) -> Self {
        Self {
            stack,
            events,
            init_timeout: DEFAULT_PROCEDURE_TIMEOUT,
        }
    }

    /// Replace the time `init` may take before it fails with `"timeout"`.
    pub fn with_init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = timeout;
        self
    }

    /// The stack driven by this context.
    pub fn stack(&self) -> &Rc<RefCell<S>> {
        &self.stack
    }
}

impl<S> fmt::Debug for BleContext<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BleContext")
            .field("events", &self.events)
            .field("init_timeout", &self.init_timeout)
            .finish_non_exhaustive()
    }
}

/// Build the `ble` suite over `context`.
pub fn ble_suite<S: BleStack + 'static>(context: BleContext<S>) -> Suite<BleContext<S>> {
    Suite::new(SUITE_NAME, context)
        .with_command(Command::new(
            "getVersion",
            "Return the version of the BLE stack",
            &[],
            get_version::<S>,
        ))
        .with_command(Command::new(
            "init",
            "Initialize the BLE stack; completes when the stack reports it is ready",
            &[],
            init::<S>,
        ))
        .with_command(Command::new(
            "shutdown",
            "Shut the BLE stack down",
            &[],
            shutdown::<S>,
        ))
        .with_command(Command::new(
            "reset",
            "Reset the BLE stack to its power-on state",
            &[],
            reset::<S>,
        ))
        .with_command(Command::new(
            "hasInitialized",
            "Report whether the BLE stack has been initialized",
            &[],
            has_initialized::<S>,
        ))
}

fn get_version<S: BleStack>(ble: &mut BleContext<S>, response: &mut Response) {
    let stack = ble.stack.borrow();
    response.success_with(stack.version());
}

fn has_initialized<S: BleStack>(ble: &mut BleContext<S>, response: &mut Response) {
    let initialized = ble.stack.borrow().has_initialized();
    response.success_with(&initialized);
}

fn shutdown<S: BleStack>(ble: &mut BleContext<S>, response: &mut Response) {
    report(ble.stack.borrow_mut().shutdown(), response);
}

fn reset<S: BleStack>(ble: &mut BleContext<S>, response: &mut Response) {
    report(ble.stack.borrow_mut().reset(), response);
}

fn init<S: BleStack + 'static>(ble: &mut BleContext<S>, response: &mut Response) {
    if ble.stack.borrow().has_initialized() {
        response.failure_with(&BleError::AlreadyInitialized);
        return;
    }

    let procedure = InitProcedure {
        stack: ble.stack.clone(),
        events: ble.events.clone(),
    };
    start_procedure(procedure, response.detach(), &ble.events, ble.init_timeout);
}

fn report(result: Result<(), BleError>, response: &mut Response) {
    match result {
        Ok(()) => {
            response.success();
        }
        Err(error) => {
            warn!("stack call failed: {}", error);
            response.failure_with(&error);
        }
    }
}

/// Waits for the stack's initialization callback.
struct InitProcedure<S> {
    stack: Rc<RefCell<S>>,
    events: EventQueue,
}

impl<S: BleStack + 'static> Procedure for InitProcedure<S> {
    fn on_start(&mut self, handle: &ProcedureHandle<Self>, _response: &mut Response) -> Result<(), &'static str> {
        let handle = handle.clone();
        let events = self.events.clone();
        // stacks may call back from inside init(); deliver through the queue
        let on_complete: InitCallback = Box::new(move |result| {
            events.post(move || {
                handle.complete(|_, response| report(result, response));
            });
        });
        self.stack.borrow_mut().init(on_complete).map_err(BleError::as_str)
    }

    fn on_terminate(&mut self) {
        match self.stack.try_borrow_mut() {
            Ok(mut stack) => stack.cancel_init(),
            Err(_) => warn!("stack busy, init callback left registered"),
        }
    }
}
