mod common;

use ble_cliapp::ble::{BleContext, BleError, BleStack, InitCallback, ble_suite};
use ble_cliapp::command::StatusCode;
use ble_cliapp::system::event_queue::EventQueue;
use ble_cliapp::system::shell::{Shell, ShellResult};
use common::Capture;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Stack whose initialization takes `init_delay` of virtual time.
struct SimulatedStack {
    events: EventQueue,
    init_delay: Duration,
    initialized: Rc<RefCell<bool>>,
}

impl BleStack for SimulatedStack {
    fn version(&self) -> &str {
        "6.2.0"
    }

    fn init(&mut self, on_complete: InitCallback) -> Result<(), BleError> {
        let initialized = self.initialized.clone();
        self.events.post_after(self.init_delay, move || {
            *initialized.borrow_mut() = true;
            on_complete(Ok(()));
        });
        Ok(())
    }

    fn has_initialized(&self) -> bool {
        *self.initialized.borrow()
    }

    fn shutdown(&mut self) -> Result<(), BleError> {
        if !self.has_initialized() {
            return Err(BleError::NotInitialized);
        }
        *self.initialized.borrow_mut() = false;
        Ok(())
    }
}

fn setup(init_delay: Duration) -> (Shell, Capture, EventQueue) {
    let capture = Capture::new();
    let events = EventQueue::new();
    let stack = SimulatedStack {
        events: events.clone(),
        init_delay,
        initialized: Rc::new(RefCell::new(false)),
    };
    let context = BleContext::new(Rc::new(RefCell::new(stack)), events.clone())
        .with_init_timeout(Duration::from_secs(1));

    let mut shell = Shell::new(capture.console.clone(), events.clone());
    shell.set_echo(false);
    assert_eq!(shell.register_suite(ble_suite(context)), ShellResult::Ok);
    (shell, capture, events)
}

#[test]
fn test_get_version() {
    let (mut shell, capture, _) = setup(Duration::ZERO);

    shell.input(b"ble getVersion\r");

    assert_eq!(
        capture.document(),
        json!({"name": "ble getVersion", "arguments": [], "status": 0, "result": "6.2.0"})
    );
}

#[test]
fn test_init_continues_then_succeeds() {
    let (mut shell, capture, events) = setup(Duration::from_millis(30));

    shell.input(b"ble init\r");
    assert_eq!(shell.last_status().map(StatusCode::as_i32), Some(1));
    assert!(capture.documents().is_empty());

    events.advance(Duration::from_millis(30));
    shell.poll();

    assert_eq!(
        capture.document(),
        json!({"name": "ble init", "arguments": [], "status": 0, "result": null})
    );
    assert_eq!(shell.last_status(), Some(StatusCode::Success));

    shell.input(b"ble hasInitialized\r");
    assert_eq!(capture.document()["result"], json!(true));
}

#[test]
fn test_init_times_out() {
    let (mut shell, capture, events) = setup(Duration::from_secs(5));

    shell.input(b"ble init\r");
    shell.input(b"ble getVersion\r");
    events.advance(Duration::from_secs(1));
    shell.poll();

    let documents = capture.documents();
    assert_eq!(documents.len(), 2);
    assert_eq!(documents[0]["status"], json!(-1));
    assert_eq!(documents[0]["error"], json!("timeout"));
    assert_eq!(documents[1]["result"], json!("6.2.0"));

    // the stack finishing later must not produce a second document
    events.run_until_idle();
    shell.poll();
    assert!(capture.documents().is_empty());
}

#[test]
fn test_builtins_of_ble_suite() {
    let (mut shell, capture, _) = setup(Duration::ZERO);

    shell.input(b"ble list\r");
    assert_eq!(
        capture.document()["result"],
        json!(["help", "list", "args", "getVersion", "init", "shutdown", "reset", "hasInitialized"])
    );

    shell.input(b"ble shutdown\r");
    let document = capture.document();
    assert_eq!(document["status"], json!(-1));
    assert_eq!(document["error"], json!("not initialized"));
}
