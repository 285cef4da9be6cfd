// Criterion benchmarks for the tagwire-common codec and framing layers
//
// Run benchmarks with:
//   cargo bench -p tagwire-common

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tagwire_common::element::{codec, Element};
use tagwire_common::transport::frame::split_frames;

fn small_call() -> Element {
    Element::Tuple(vec![
        Element::Str("echo".into()),
        Element::Tuple(vec![Element::Str("hello".into())]),
    ])
}

fn nested_map() -> Element {
    Element::map_from_pairs((0..32).map(|i| {
        (
            Element::Str(format!("key-{i}")),
            Element::Tuple(vec![Element::U32(i), Element::U32(i * i)]),
        )
    }))
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    let call = small_call();
    group.bench_function("small_call", |b| {
        b.iter(|| codec::encode(black_box(&call)));
    });

    let map = nested_map();
    group.bench_function("nested_map", |b| {
        b.iter(|| codec::encode(black_box(&map)));
    });

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    let call = codec::encode(&small_call());
    group.bench_function("small_call", |b| {
        b.iter(|| codec::decode(black_box(call.as_bytes())));
    });

    let map = codec::encode(&nested_map());
    group.bench_function("nested_map", |b| {
        b.iter(|| codec::decode(black_box(map.as_bytes())));
    });

    group.finish();
}

fn bench_framing(c: &mut Criterion) {
    let mut group = c.benchmark_group("framing");

    let payload: Vec<u8> = (0..7000).map(|i| (i % 251) as u8).collect();
    group.bench_function("split_5_frames", |b| {
        b.iter(|| split_frames(black_box(&payload), 1400));
    });

    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_framing);
criterion_main!(benches);
