use core::{convert::Infallible, hint::black_box};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use fibstream::{DigitString, Engine, Limits, NeverCancel, add_digits, generate, stream_chunks};

/// Benchmarks the digit adder on operands of increasing width.
fn bench_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("add_digits");

    for digits in [16, 256, 4096] {
        let a = DigitString::parse("9".repeat(digits)).unwrap();
        let b = DigitString::parse("8".repeat(digits)).unwrap();
        group.throughput(Throughput::Bytes(digits as u64));
        group.bench_with_input(BenchmarkId::new("digits", digits), &digits, |bench, _| {
            bench.iter(|| black_box(add_digits(black_box(&a), black_box(&b))));
        });
    }

    group.finish();
}

/// Full materialization versus chunked streaming of the same prefix.
fn bench_generate_vs_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequence");

    for n in [100_usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(n as u64));

        group.bench_with_input(BenchmarkId::new("generate", n), &n, |b, &n| {
            b.iter(|| black_box(generate(n, &NeverCancel).unwrap()));
        });

        for chunk_size in [10_usize, 100] {
            group.bench_with_input(
                BenchmarkId::new(format!("stream/chunk/{chunk_size}"), n),
                &n,
                |b, &n| {
                    b.iter(|| {
                        stream_chunks(n, chunk_size, &NeverCancel, |chunk, start| {
                            black_box((chunk, start));
                            Ok::<_, Infallible>(())
                        })
                        .unwrap();
                    });
                },
            );
        }
    }

    group.finish();
}

/// The engine path including validation and metrics dispatch.
fn bench_engine(c: &mut Criterion) {
    let engine = Engine::new(Limits::default()).unwrap();
    let mut group = c.benchmark_group("engine");
    group.throughput(Throughput::Elements(1000));

    group.bench_function("compute_stream/1000/chunk/100", |b| {
        b.iter(|| {
            engine
                .compute_stream(1000, 100, &NeverCancel, |chunk, _| {
                    black_box(chunk);
                    Ok::<_, Infallible>(())
                })
                .unwrap();
        });
    });

    group.finish();
}

criterion_group!(benches, bench_add, bench_generate_vs_stream, bench_engine);
criterion_main!(benches);
