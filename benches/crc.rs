//! Compares the four reference algorithms against each other

use criterion::criterion_group;
use criterion::criterion_main;
use criterion::BatchSize;
use criterion::Criterion;
use criterion::Throughput;
use std::iter;

use crcforge::kernel::{bit_by_bit, bit_by_bit_fast, table_driven};
use crcforge::bitwise::crc_via_bitwise_expression;
use crcforge::Model;

fn crc32() -> Model {
    Model::new(32, 0x04c11db7, true, 0xffffffff, true, 0xffffffff).unwrap()
}

fn bench_crc(c: &mut Criterion) {
    let mut group = c.benchmark_group("crc");

    // xorshift64 for deterministic random numbers
    fn xorshift64(seed: u64) -> impl Iterator<Item = u64> {
        let mut x = seed;
        iter::repeat_with(move || {
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            x
        })
    }

    const SIZE: usize = 1024 * 1024;
    group.throughput(Throughput::Bytes(SIZE as u64));

    let m = crc32();

    let mut xs = xorshift64(42).map(|x| x as u8);
    group.bench_function("bit_by_bit", |b| {
        b.iter_batched_ref(
            || (&mut xs).take(SIZE).collect::<Vec<u8>>(),
            |data| bit_by_bit(&m, data),
            BatchSize::SmallInput,
        )
    });

    let mut xs = xorshift64(42).map(|x| x as u8);
    group.bench_function("bit_by_bit_fast", |b| {
        b.iter_batched_ref(
            || (&mut xs).take(SIZE).collect::<Vec<u8>>(),
            |data| bit_by_bit_fast(&m, data),
            BatchSize::SmallInput,
        )
    });

    let mut xs = xorshift64(42).map(|x| x as u8);
    group.bench_function("table_driven", |b| {
        b.iter_batched_ref(
            || (&mut xs).take(SIZE).collect::<Vec<u8>>(),
            |data| table_driven(&m, data),
            BatchSize::SmallInput,
        )
    });

    group.finish();

    // bitwise-expression recomputes the minimised boolean form on every
    // call, so only bench it over a much smaller buffer
    const SMALL_SIZE: usize = 4 * 1024;
    let mut small_group = c.benchmark_group("crc_bitwise_expression");
    small_group.throughput(Throughput::Bytes(SMALL_SIZE as u64));
    let mut xs = xorshift64(42).map(|x| x as u8);
    small_group.bench_function("bitwise_expression", |b| {
        b.iter_batched_ref(
            || (&mut xs).take(SMALL_SIZE).collect::<Vec<u8>>(),
            |data| crc_via_bitwise_expression(&m, data),
            BatchSize::SmallInput,
        )
    });
    small_group.finish();
}

criterion_group!(benches, bench_crc);
criterion_main!(benches);
