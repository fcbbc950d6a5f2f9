use criterion::{criterion_group, criterion_main};

mod command;
mod json;

criterion_group!(
    benches,
    command::suite::bench_dispatch_typed,
    command::suite::bench_dispatch_decode_failure,
    command::suite::bench_shell_input,
    json::writer::bench_write_object,
    json::writer::bench_serialize_value
);
criterion_main!(benches);
