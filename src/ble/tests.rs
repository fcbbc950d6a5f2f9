use super::*;
use crate::command::{Completion, StatusCode};
use crate::system::console::Console;
use alloc::string::String;
use core::cell::Cell;

#[derive(Default)]
struct MockStack {
    initialized: bool,
    callback: Option<InitCallback>,
    reject_init: Option<BleError>,
    complete_inside_init: bool,
    cancelled: usize,
}

impl MockStack {
    fn finish_init(stack: &Rc<RefCell<MockStack>>, result: Result<(), BleError>) {
        let callback = {
            let mut stack = stack.borrow_mut();
            stack.initialized = result.is_ok();
            stack.callback.take()
        };
        if let Some(callback) = callback {
            callback(result);
        }
    }
}

impl BleStack for MockStack {
    fn version(&self) -> &str {
        "6.2.0"
    }

    fn init(&mut self, on_complete: InitCallback) -> Result<(), BleError> {
        if let Some(error) = self.reject_init {
            return Err(error);
        }
        if self.complete_inside_init {
            self.initialized = true;
            on_complete(Ok(()));
        } else {
            self.callback = Some(on_complete);
        }
        Ok(())
    }

    fn cancel_init(&mut self) {
        if self.callback.take().is_some() {
            self.cancelled += 1;
        }
    }

    fn has_initialized(&self) -> bool {
        self.initialized
    }

    fn shutdown(&mut self) -> Result<(), BleError> {
        if !self.initialized {
            return Err(BleError::NotInitialized);
        }
        self.initialized = false;
        Ok(())
    }
}

struct Harness {
    stack: Rc<RefCell<MockStack>>,
    events: EventQueue,
    suite: Suite<BleContext<MockStack>>,
    console: Console,
    output: Rc<RefCell<String>>,
}

impl Harness {
    fn new(stack: MockStack) -> Self {
        let stack = Rc::new(RefCell::new(stack));
        let events = EventQueue::new();
        let output = Rc::new(RefCell::new(String::new()));
        let context = BleContext::new(stack.clone(), events.clone()).with_init_timeout(Duration::from_millis(500));
        Self {
            suite: ble_suite(context),
            stack,
            events,
            console: Console::shared(output.clone()),
            output,
        }
    }

    fn run(&mut self, command: &str) -> Completion {
        self.suite.dispatch(&[SUITE_NAME, command], &self.console, None)
    }

    fn run_tracked(&mut self, command: &str) -> (Completion, Rc<Cell<Option<StatusCode>>>) {
        let seen = Rc::new(Cell::new(None));
        let sink = seen.clone();
        let completion = self.suite.dispatch(
            &[SUITE_NAME, command],
            &self.console,
            Some(Box::new(move |status| sink.set(Some(status)))),
        );
        (completion, seen)
    }

    fn take_output(&self) -> String {
        core::mem::take(&mut *self.output.borrow_mut())
    }
}

#[test]
fn test_get_version() {
    let mut harness = Harness::new(MockStack::default());

    assert_eq!(harness.run("getVersion"), Completion::Done(StatusCode::Success));
    assert_eq!(
        harness.take_output(),
        "{\"name\":\"ble getVersion\",\"arguments\":[],\"status\":0,\"result\":\"6.2.0\"}\r\n"
    );
}

#[test]
fn test_init_completes_from_stack_callback() {
    let mut harness = Harness::new(MockStack::default());

    let (completion, seen) = harness.run_tracked("init");
    assert_eq!(completion, Completion::Pending);
    assert_eq!(completion.code(), StatusCode::ExecutingContinue);
    assert_eq!(harness.output.borrow().as_str(), "{\"name\":\"ble init\",\"arguments\":[]");

    MockStack::finish_init(&harness.stack, Ok(()));
    assert_eq!(seen.get(), None);
    harness.events.dispatch();

    assert_eq!(seen.get(), Some(StatusCode::Success));
    assert_eq!(
        harness.take_output(),
        "{\"name\":\"ble init\",\"arguments\":[],\"status\":0,\"result\":null}\r\n"
    );
    assert_eq!(harness.events.pending(), 0);
    assert!(harness.stack.borrow().has_initialized());
}

#[test]
fn test_init_reports_stack_failure() {
    let mut harness = Harness::new(MockStack::default());

    let (_, seen) = harness.run_tracked("init");
    MockStack::finish_init(&harness.stack, Err(BleError::Internal));
    harness.events.dispatch();

    assert_eq!(seen.get(), Some(StatusCode::Fail));
    assert!(harness.take_output().ends_with("\"status\":-1,\"error\":\"internal stack error\"}\r\n"));
}

#[test]
fn test_init_times_out_and_retracts_callback() {
    let mut harness = Harness::new(MockStack::default());

    let (_, seen) = harness.run_tracked("init");
    harness.events.advance(Duration::from_millis(499));
    assert_eq!(seen.get(), None);
    harness.events.advance(Duration::from_millis(1));

    assert_eq!(seen.get(), Some(StatusCode::Fail));
    assert_eq!(
        harness.take_output(),
        "{\"name\":\"ble init\",\"arguments\":[],\"status\":-1,\"error\":\"timeout\"}\r\n"
    );
    assert_eq!(harness.stack.borrow().cancelled, 1);
    assert_eq!(harness.events.pending(), 0);
}

#[test]
fn test_init_callback_inside_stack_call_is_deferred() {
    let mut harness = Harness::new(MockStack {
        complete_inside_init: true,
        ..MockStack::default()
    });

    let (completion, seen) = harness.run_tracked("init");
    assert_eq!(completion, Completion::Pending);
    assert_eq!(seen.get(), None);

    harness.events.dispatch();
    assert_eq!(seen.get(), Some(StatusCode::Success));
    assert!(harness.take_output().contains("\"status\":0,\"result\":null"));
}

#[test]
fn test_init_rejected_by_stack_fails_immediately() {
    let mut harness = Harness::new(MockStack {
        reject_init: Some(BleError::InvalidState),
        ..MockStack::default()
    });

    let (_, seen) = harness.run_tracked("init");

    assert_eq!(seen.get(), Some(StatusCode::Fail));
    assert_eq!(
        harness.take_output(),
        "{\"name\":\"ble init\",\"arguments\":[],\"status\":-1,\"error\":\"invalid state\"}\r\n"
    );
    assert_eq!(harness.events.pending(), 0);
}

#[test]
fn test_init_twice_fails_synchronously() {
    let mut harness = Harness::new(MockStack {
        initialized: true,
        ..MockStack::default()
    });

    assert_eq!(harness.run("init"), Completion::Done(StatusCode::Fail));
    assert!(harness.take_output().ends_with("\"error\":\"already initialized\"}\r\n"));
}

#[test]
fn test_shutdown_and_has_initialized() {
    let mut harness = Harness::new(MockStack {
        initialized: true,
        ..MockStack::default()
    });

    harness.run("hasInitialized");
    assert!(harness.take_output().ends_with("\"result\":true}\r\n"));

    assert_eq!(harness.run("shutdown"), Completion::Done(StatusCode::Success));
    harness.take_output();

    assert_eq!(harness.run("shutdown"), Completion::Done(StatusCode::Fail));
    assert!(harness.take_output().ends_with("\"error\":\"not initialized\"}\r\n"));

    harness.run("hasInitialized");
    assert!(harness.take_output().ends_with("\"result\":false}\r\n"));
}

#[test]
fn test_reset_on_stopped_stack_succeeds() {
    let mut harness = Harness::new(MockStack::default());

    assert_eq!(harness.run("reset"), Completion::Done(StatusCode::Success));
}
