use ble_cliapp::codec::Address;
use ble_cliapp::command::{Command, CommandArgDescriptor, Response, Suite};
use ble_cliapp::json::Sink;
use ble_cliapp::system::console::Console;
use ble_cliapp::system::event_queue::EventQueue;
use ble_cliapp::system::shell::Shell;
use criterion::{Criterion, Throughput};
use std::fmt;
use std::hint::black_box;

/// Sink that counts characters and keeps nothing.
#[derive(Default)]
struct Discard(usize);

impl fmt::Write for Discard {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0 += s.len();
        Ok(())
    }
}

impl Sink for Discard {}

static CONNECT_ARGS: &[CommandArgDescriptor] = &[
    CommandArgDescriptor::of::<Address>("peer", "address of the peer"),
    CommandArgDescriptor::of::<u16>("interval", "connection interval"),
    CommandArgDescriptor::of::<u16>("latency", "slave latency"),
];

fn connect(count: &mut u32, peer: Address, interval: u16, latency: u16, response: &mut Response) {
    *count += 1;
    response.success();
    if let Some(writer) = response.result_stream() {
        writer.start_object();
        writer.key("peer").encoded(&peer);
        writer.key("interval").uint(interval);
        writer.key("latency").uint(latency);
        writer.end_object();
    }
}

fn gap_suite() -> Suite<u32> {
    Suite::new("gap", 0).with_command(Command::new("connect", "Connect to a peer", CONNECT_ARGS, connect))
}

pub fn bench_dispatch_typed(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    let argv = ["gap", "connect", "C0:FF:EE:00:00:01", "0x18", "4"];
    let console = Console::new(Discard::default());
    let mut suite = gap_suite();

    group.throughput(Throughput::Elements(1));
    group.bench_function("typed_three_args", |b| {
        b.iter(|| suite.dispatch(black_box(&argv), &console, None))
    });
    group.finish();
}

pub fn bench_dispatch_decode_failure(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    let argv = ["gap", "connect", "C0:FF:EE:00:00:01", "0x18", "70000"];
    let console = Console::new(Discard::default());
    let mut suite = gap_suite();

    group.bench_function("decode_failure", |b| {
        b.iter(|| suite.dispatch(black_box(&argv), &console, None))
    });
    group.finish();
}

pub fn bench_shell_input(c: &mut Criterion) {
    let mut group = c.benchmark_group("shell");
    let line = b"gap connect C0:FF:EE:00:00:01 0x18 4\r";
    let mut shell = Shell::new(Console::new(Discard::default()), EventQueue::new());
    shell.set_echo(false);
    shell.register_suite(gap_suite());

    group.throughput(Throughput::Bytes(line.len() as u64));
    group.bench_function("input_line", |b| b.iter(|| shell.input(black_box(line))));
    group.finish();
}
