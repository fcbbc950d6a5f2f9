use ble_cliapp::json::JsonWriter;
use criterion::{BatchSize, Criterion, Throughput};
use serde::Serialize;
use std::hint::black_box;

#[derive(Serialize)]
struct Characteristic<'a> {
    handle: u16,
    uuid: &'a str,
    properties: [&'a str; 3],
}

pub fn bench_write_object(c: &mut Criterion) {
    let mut group = c.benchmark_group("json_writer");
    let payload = [0xA5u8; 32];

    group.throughput(Throughput::Bytes(payload.len() as u64));
    group.bench_function("object_with_hex", |b| {
        b.iter_batched_ref(
            || JsonWriter::new(heapless::String::<512>::new()),
            |writer| {
                writer.start_object();
                writer.key("name").string("gattClient read");
                writer.key("handle").uint(0x002Au16);
                writer.key("offset").int(-1i32);
                writer.key("value").hex(black_box(&payload));
                writer.end_object();
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

pub fn bench_serialize_value(c: &mut Criterion) {
    let mut group = c.benchmark_group("json_writer");
    let value = Characteristic {
        handle: 0x0010,
        uuid: "00002A37-0000-1000-8000-00805F9B34FB",
        properties: ["read", "notify", "indicate"],
    };

    group.bench_function("serde_struct", |b| {
        b.iter_batched_ref(
            || JsonWriter::new(heapless::String::<512>::new()),
            |writer| writer.serialize(black_box(&value)).map(|_| ()),
            BatchSize::SmallInput,
        )
    });
    group.finish();
}
