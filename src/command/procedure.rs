//! Commands whose result arrives after the invoking call returned.
//!
//! A [`Procedure`] bridges a callback-based completion (a stack event) back
//! into the [`Response`] of the command that started it, guarded by a
//! timeout. Lifecycle:
//!
//! ```text
//! Created ─▶ Started ─┬─▶ Completed ─┐
//!    │                └─▶ TimedOut ──┼─▶ Destroyed
//!    └── on_start failed ────────────┘
//! ```
//!
//! # Ownership
//!
//! [`start_procedure`] moves the procedure and its response into a shared
//! slot whose only strong owner is the pending timeout callback in the
//! [`EventQueue`]. Event subscriptions get a [`ProcedureHandle`], a weak
//! reference: once the procedure has terminated every handle operation is a
//! no-op, so a late callback can never reach a destroyed procedure.
//!
//! Termination happens once, driven by whichever of (completion, timeout)
//! comes first. It calls [`Procedure::on_terminate`] so subscriptions can be
//! retracted, cancels the timeout (dropping the last strong owner), and closes
//! the response.
//!
//! Handle operations must not be nested inside each other or inside
//! [`Procedure::on_start`]; stack events are expected to be delivered through
//! the event queue, after `start_procedure` has returned.

use alloc::rc::{Rc, Weak};
use core::cell::RefCell;
use core::fmt;
use core::time::Duration;

use super::Response;
use crate::system::event_queue::{EventId, EventQueue};

/// Timeout used by procedures that have no reason to pick another.
pub const DEFAULT_PROCEDURE_TIMEOUT: Duration = Duration::from_secs(10);

/// Error value written by the default [`Procedure::on_timeout`].
pub const TIMEOUT_MESSAGE: &str = "timeout";

/// Behaviour of an asynchronous command.
pub trait Procedure: Sized + 'static {
    /// Start the operation and register the callbacks that will complete it.
    ///
    /// Called once, after the timeout is armed. Returning `Err(message)`
    /// terminates the procedure immediately; if nothing was written to the
    /// response yet it fails with `message`.
    fn on_start(&mut self, handle: &ProcedureHandle<Self>, response: &mut Response) -> Result<(), &'static str>;

    /// The timeout fired before completion. Defaults to
    /// `failure("timeout")`; override to report partial results.
    fn on_timeout(&mut self, response: &mut Response) {
        response.failure_with(TIMEOUT_MESSAGE);
    }

    /// The procedure is terminating; retract every callback registered in
    /// [`on_start`](Self::on_start).
    fn on_terminate(&mut self) {}
}

struct Slot<P> {
    procedure: P,
    response: Option<Response>,
    timeout: Option<EventId>,
    terminated: bool,
    queue: EventQueue,
}

/// Weak, cloneable reference to a running procedure.
pub struct ProcedureHandle<P> {
    slot: Weak<RefCell<Slot<P>>>,
}

impl<P> Clone for ProcedureHandle<P> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<P> fmt::Debug for ProcedureHandle<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcedureHandle")
            .field("alive", &(self.slot.strong_count() > 0))
            .finish()
    }
}

impl<P: Procedure> ProcedureHandle<P> {
    /// True while the procedure exists and has not terminated.
    pub fn is_active(&self) -> bool {
        self.slot
            .upgrade()
            .is_some_and(|slot| slot.try_borrow().is_ok_and(|slot| !slot.terminated))
    }

    /// Run `f` against the procedure and its response.
    ///
    /// Returns `None` without calling `f` once the procedure has terminated.
    pub fn with<R>(&self, f: impl FnOnce(&mut P, &mut Response) -> R) -> Option<R> {
        let slot = self.slot.upgrade()?;
        let Ok(mut guard) = slot.try_borrow_mut() else {
            warn!("procedure handle used re-entrantly");
            return None;
        };
        if guard.terminated {
            return None;
        }
        let Slot {
            procedure, response, ..
        } = &mut *guard;
        let response = response.as_mut()?;
        Some(f(procedure, response))
    }

    /// Run `f` to write the final result, then terminate.
    ///
    /// Returns `false` if the procedure had already terminated, in which case
    /// `f` is not called.
    pub fn complete(&self, f: impl FnOnce(&mut P, &mut Response)) -> bool {
        self.with(f).is_some() && self.terminate()
    }

    /// Terminate now. Returns `false` if already terminated.
    pub fn terminate(&self) -> bool {
        match self.slot.upgrade() {
            Some(slot) => terminate(&slot),
            None => false,
        }
    }
}

/// Start `procedure` with ownership of `response`, timing out after
/// `timeout`.
///
/// `response` is normally obtained with [`Response::detach`] inside a command
/// handler, which tells the dispatcher that the command continues
/// asynchronously.
pub fn start_procedure<P: Procedure>(
    procedure: P,
    response: Response,
    queue: &EventQueue,
    timeout: Duration,
) -> ProcedureHandle<P> {
    let slot = Rc::new(RefCell::new(Slot {
        procedure,
        response: Some(response),
        timeout: None,
        terminated: false,
        queue: queue.clone(),
    }));
    let handle = ProcedureHandle {
        slot: Rc::downgrade(&slot),
    };

    let owner = slot.clone();
    let timer = queue.post_after(timeout, move || fire_timeout(owner));
    slot.borrow_mut().timeout = Some(timer);
    debug!("procedure started, timeout in {=u64} ms", timeout.as_millis() as u64);

    let started = {
        let mut guard = slot.borrow_mut();
        let Slot {
            procedure, response, ..
        } = &mut *guard;
        match response.as_mut() {
            Some(response) => procedure.on_start(&handle, response),
            None => Err("response unavailable"),
        }
    };

    if let Err(message) = started {
        warn!("procedure failed to start: {=str}", message);
        {
            let mut guard = slot.borrow_mut();
            if let Some(response) = guard.response.as_mut() {
                if response.status_code().is_none() {
                    response.failure_with(message);
                }
            }
        }
        terminate(&slot);
    }

    handle
}

fn fire_timeout<P: Procedure>(slot: Rc<RefCell<Slot<P>>>) {
    {
        let Ok(mut guard) = slot.try_borrow_mut() else {
            warn!("procedure busy when its timeout fired");
            return;
        };
        if guard.terminated {
            return;
        }
        guard.timeout = None;
        debug!("procedure timed out");
        let Slot {
            procedure, response, ..
        } = &mut *guard;
        if let Some(response) = response.as_mut() {
            procedure.on_timeout(response);
        }
    }
    terminate(&slot);
}

/// Terminate the procedure in `slot`; the caller holds a strong reference so
/// the slot outlives the call even when the timeout owner is dropped here.
fn terminate<P: Procedure>(slot: &Rc<RefCell<Slot<P>>>) -> bool {
    let (timer, queue, response) = {
        let Ok(mut guard) = slot.try_borrow_mut() else {
            warn!("procedure terminated re-entrantly");
            return false;
        };
        if guard.terminated {
            return false;
        }
        guard.terminated = true;
        guard.procedure.on_terminate();
        (guard.timeout.take(), guard.queue.clone(), guard.response.take())
    };

    if let Some(timer) = timer {
        queue.cancel(timer);
    }
    if let Some(mut response) = response {
        response.close();
    }
    trace!("procedure terminated");
    true
}
