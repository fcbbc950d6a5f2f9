use super::*;
use crate::system::console::Console;
use crate::system::event_queue::EventQueue;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::time::Duration;

fn capture() -> (Console, Rc<RefCell<String>>) {
    let output = Rc::new(RefCell::new(String::new()));
    (Console::shared(output.clone()), output)
}

#[test]
fn test_status_codes() {
    assert_eq!(StatusCode::Success.as_i32(), 0);
    assert_eq!(StatusCode::NotFound.as_i32(), -5);
    assert_eq!(StatusCode::Busy.as_i32(), 2);
    assert!(StatusCode::CallbackMissing.is_error());
    assert!(!StatusCode::ExecutingContinue.is_error());
    assert_eq!(alloc::format!("{}", StatusCode::InvalidParameters), "-2");
}

#[test]
fn test_command_args_view() {
    let tokens = ["a", "b", "c"];
    let args = CommandArgs::new(&tokens);

    assert_eq!(args.len(), 3);
    assert_eq!(args.get(1), Some("b"));
    assert_eq!(args.get(3), None);
    assert_eq!(args.drop(1).as_slice(), &["b", "c"]);
    assert!(args.drop(5).is_empty());
    assert_eq!(args.iter().collect::<Vec<_>>(), ["a", "b", "c"]);
}

#[test]
fn test_max_args() {
    assert!(MaxArgs::Bounded(2).admits(2));
    assert!(!MaxArgs::Bounded(2).admits(3));
    assert!(MaxArgs::Unbounded.admits(usize::MAX));
}

#[test]
fn test_command_arity_defaults() {
    static ARGS: &[CommandArgDescriptor] = &[
        CommandArgDescriptor::of::<u8>("a", ""),
        CommandArgDescriptor::of::<bool>("b", ""),
    ];
    let command: Command<()> = Command::raw("raw", "", ARGS, |_, _, response| {
        response.success();
    });

    assert_eq!(command.min_args(), 2);
    assert_eq!(command.max_args, MaxArgs::Bounded(2));
    assert_eq!(command.variadic().max_args, MaxArgs::Unbounded);
    assert_eq!(ARGS[0].type_name, "uint8_t");
    assert_eq!(ARGS[1].type_name, "bool");
}

#[test]
fn test_response_fields_are_written_once() {
    let (console, output) = capture();
    let mut response = Response::new(console);

    assert!(response.set_command_name("suite cmd"));
    assert!(!response.set_command_name("again"));
    assert!(response.set_arguments(CommandArgs::new(&["x"])));
    assert!(!response.set_arguments(CommandArgs::new(&["y"])));
    assert!(response.set_status_code(StatusCode::Success));
    assert!(!response.set_status_code(StatusCode::Fail));
    assert_eq!(response.status_code(), Some(StatusCode::Success));
    response.close();

    assert_eq!(
        output.borrow().as_str(),
        "{\"name\":\"suite cmd\",\"arguments\":[\"x\"],\"status\":0,\"result\":null}\r\n"
    );
}

#[test]
fn test_response_rejects_out_of_order_fields() {
    let (console, _output) = capture();
    let mut response = Response::new(console);

    assert!(response.result_stream().is_none());
    assert!(response.set_status_code(StatusCode::Fail));
    assert!(!response.set_command_name("late"));
    assert!(!response.set_arguments(CommandArgs::new(&[])));
}

#[test]
fn test_negative_status_writes_error_key() {
    let (console, output) = capture();
    let mut response = Response::new(console);

    response.set_status_code(StatusCode::NotImplemented);
    if let Some(writer) = response.result_stream() {
        writer.start_array().uint(1u8).uint(2u8).end_array();
    }
    response.close();

    assert_eq!(output.borrow().as_str(), "{\"status\":-3,\"error\":[1,2]}\r\n");
}

#[test]
fn test_close_is_idempotent_and_fires_callback_once() {
    let (console, output) = capture();
    let fired = Rc::new(Cell::new(0));
    let mut response = Response::new(console);

    let counter = fired.clone();
    response.set_on_close(move |closed| {
        assert!(closed.is_closed());
        counter.set(counter.get() + 1);
    });
    response.close();
    response.close();
    drop(response);

    assert_eq!(fired.get(), 1);
    assert_eq!(
        output.borrow().as_str(),
        "{\"status\":-1,\"error\":\"command completed without a result\"}\r\n"
    );
}

#[test]
fn test_detached_placeholder_is_inert() {
    let (console, output) = capture();
    let mut response = Response::new(console);
    response.set_command_name("x");

    let mut moved = response.detach();
    assert!(response.is_detached());
    assert!(!response.success());
    drop(response);
    assert_eq!(output.borrow().as_str(), "{\"name\":\"x\"");

    moved.success_with("ok");
    drop(moved);
    assert_eq!(output.borrow().as_str(), "{\"name\":\"x\",\"status\":0,\"result\":\"ok\"}\r\n");
}

#[test]
fn test_result_too_large_fails_the_response() {
    let (console, output) = capture();
    let mut response = Response::new(console);
    let big = "x".repeat(crate::json::MAX_SERIALIZED_LEN);

    assert!(!response.success_with(big.as_str()));
    assert_eq!(response.status_code(), Some(StatusCode::Fail));
    response.close();

    assert_eq!(output.borrow().as_str(), "{\"status\":-1,\"error\":\"result too large\"}\r\n");
}

struct Echo {
    delay: Duration,
    value: u32,
    terminated: Rc<Cell<bool>>,
}

impl Procedure for Echo {
    fn on_start(&mut self, _handle: &ProcedureHandle<Self>, _response: &mut Response) -> Result<(), &'static str> {
        if self.delay.is_zero() {
            return Err("nothing to wait for");
        }
        Ok(())
    }

    fn on_terminate(&mut self) {
        self.terminated.set(true);
    }
}

#[test]
fn test_procedure_completes_once() {
    let (console, output) = capture();
    let queue = EventQueue::new();
    let terminated = Rc::new(Cell::new(false));
    let procedure = Echo {
        delay: Duration::from_millis(5),
        value: 7,
        terminated: terminated.clone(),
    };

    let handle = start_procedure(procedure, Response::new(console), &queue, DEFAULT_PROCEDURE_TIMEOUT);
    assert!(handle.is_active());
    assert_eq!(queue.pending(), 1);

    assert!(handle.complete(|echo, response| {
        response.success_with(&echo.value);
    }));
    assert!(!handle.complete(|_, _| unreachable!()));
    assert!(!handle.terminate());
    assert!(!handle.is_active());
    assert!(terminated.get());
    assert_eq!(queue.pending(), 0);
    assert_eq!(output.borrow().as_str(), "{\"status\":0,\"result\":7}\r\n");
}

#[test]
fn test_procedure_start_failure_terminates_immediately() {
    let (console, output) = capture();
    let queue = EventQueue::new();
    let terminated = Rc::new(Cell::new(false));
    let procedure = Echo {
        delay: Duration::ZERO,
        value: 0,
        terminated: terminated.clone(),
    };

    let handle = start_procedure(procedure, Response::new(console), &queue, DEFAULT_PROCEDURE_TIMEOUT);

    assert!(!handle.is_active());
    assert!(terminated.get());
    assert_eq!(queue.pending(), 0);
    assert_eq!(output.borrow().as_str(), "{\"status\":-1,\"error\":\"nothing to wait for\"}\r\n");
}
