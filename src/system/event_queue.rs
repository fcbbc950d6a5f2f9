//! Single-threaded event queue with a virtual clock.
//!
//! Commands that finish later than the call that started them, timeouts, and
//! the shell's "resume reading input" notification all run as callbacks posted
//! to an [`EventQueue`]. The queue never reads a hardware clock: time moves
//! only when the owner calls [`advance`](EventQueue::advance), which makes the
//! same queue usable from a firmware tick interrupt's bottom half, from a host
//! harness loop, and from deterministic tests.
//!
//! Callbacks are invoked with no internal borrow held, so a callback may post
//! new events or cancel pending ones.
//!
//! # Examples
//!
//! ```rust
//! use ble_cliapp::system::event_queue::EventQueue;
//! use core::cell::Cell;
//! use core::time::Duration;
//! use std::rc::Rc;
//!
//! let queue = EventQueue::new();
//! let fired = Rc::new(Cell::new(false));
//!
//! let flag = fired.clone();
//! queue.post_after(Duration::from_millis(10), move || flag.set(true));
//!
//! queue.advance(Duration::from_millis(9));
//! assert!(!fired.get());
//! queue.advance(Duration::from_millis(1));
//! assert!(fired.get());
//! ```

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;
use core::time::Duration;

/// Handle identifying a posted event, used to cancel it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId(u32);

#[cfg(feature = "defmt")]
impl defmt::Format for EventId {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "EventId({=u32})", self.0)
    }
}

struct Pending {
    id: EventId,
    due: Duration,
    sequence: u64,
    callback: Box<dyn FnOnce()>,
}

#[derive(Default)]
struct Inner {
    now: Duration,
    next_id: u32,
    next_sequence: u64,
    pending: Vec<Pending>,
}

impl Inner {
    /// Index of the earliest event due at or before `deadline`; ties run in
    /// posting order.
    fn next_due(&self, deadline: Duration) -> Option<usize> {
        self.pending
            .iter()
            .enumerate()
            .filter(|(_, event)| event.due <= deadline)
            .min_by_key(|(_, event)| (event.due, event.sequence))
            .map(|(index, _)| index)
    }
}

/// Cloneable handle on a shared single-threaded event queue.
#[derive(Clone, Default)]
pub struct EventQueue {
    inner: Rc<RefCell<Inner>>,
}

impl EventQueue {
    /// Create an empty queue with its clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        self.inner.borrow().now
    }

    /// Number of events waiting to run.
    pub fn pending(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    /// Run `callback` on the next [`dispatch`](Self::dispatch).
    pub fn post(&self, callback: impl FnOnce() + 'static) -> EventId {
        self.post_after(Duration::ZERO, callback)
    }

    /// Run `callback` once `delay` has elapsed.
    pub fn post_after(&self, delay: Duration, callback: impl FnOnce() + 'static) -> EventId {
        let mut inner = self.inner.borrow_mut();
        let id = EventId(inner.next_id);
        inner.next_id = inner.next_id.wrapping_add(1);
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;
        let due = inner.now + delay;
        inner.pending.push(Pending {
            id,
            due,
            sequence,
            callback: Box::new(callback),
        });
        id
    }

    /// Cancel a pending event. Returns `false` if it already ran or was
    /// cancelled.
    ///
    /// The cancelled callback is dropped after the queue is released, so its
    /// captured state may itself touch the queue when dropped.
    pub fn cancel(&self, id: EventId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let Some(index) = inner.pending.iter().position(|event| event.id == id) else {
            return false;
        };
        let removed = inner.pending.swap_remove(index);
        drop(inner);
        drop(removed);
        true
    }

    /// Run every event that is already due, including ones posted with no
    /// delay by the callbacks themselves.
    pub fn dispatch(&self) -> usize {
        self.advance(Duration::ZERO)
    }

    /// Move the clock forward by `elapsed`, running events in due order.
    ///
    /// While an event runs, [`now`](Self::now) reports its due time, so
    /// follow-up events it posts are scheduled relative to it.
    pub fn advance(&self, elapsed: Duration) -> usize {
        let deadline = self.now() + elapsed;
        let mut executed = 0;
        loop {
            let event = {
                let mut inner = self.inner.borrow_mut();
                match inner.next_due(deadline) {
                    Some(index) => {
                        let event = inner.pending.swap_remove(index);
                        if event.due > inner.now {
                            inner.now = event.due;
                        }
                        event
                    }
                    None => break,
                }
            };
            (event.callback)();
            executed += 1;
        }
        self.inner.borrow_mut().now = deadline;
        executed
    }

    /// Advance through every pending event, however far in the future.
    pub fn run_until_idle(&self) -> usize {
        let mut executed = 0;
        loop {
            let next = self
                .inner
                .borrow()
                .pending
                .iter()
                .map(|event| event.due)
                .min();
            match next {
                Some(due) => {
                    let now = self.now();
                    executed += self.advance(due.saturating_sub(now));
                }
                None => return executed,
            }
        }
    }
}

impl fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("EventQueue")
            .field("now", &inner.now)
            .field("pending", &inner.pending.len())
            .finish()
    }
}
