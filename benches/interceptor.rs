//! Benchmarks for allochook.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use allochook::{
    AllocatorHooks, Caller, CountingSink, Interceptor, Next, NoopSink, RawAllocator,
    SystemAllocator,
};

fn malloc_free<H: AllocatorHooks>(hooks: &H, size: usize) {
    let ptr = hooks.malloc(size, Caller::UNKNOWN);
    black_box(ptr);
    unsafe { hooks.free(ptr, Caller::UNKNOWN) };
}

fn bench_malloc_free(c: &mut Criterion) {
    let one = Interceptor::new(NoopSink, Next::terminal(SystemAllocator));
    let two = Interceptor::new(
        NoopSink,
        Next::hook(Interceptor::new(NoopSink, Next::terminal(SystemAllocator))),
    );
    let counting = Interceptor::new(CountingSink::new(), Next::terminal(SystemAllocator));

    let mut group = c.benchmark_group("malloc_free");

    for size in [16usize, 256, 4096] {
        group.bench_with_input(BenchmarkId::new("raw", size), &size, |b, &size| {
            b.iter(|| {
                let ptr = SystemAllocator.malloc(size);
                black_box(ptr);
                unsafe { SystemAllocator.free(ptr) };
            })
        });

        group.bench_with_input(BenchmarkId::new("one_link", size), &size, |b, &size| {
            b.iter(|| malloc_free(&one, size))
        });

        group.bench_with_input(BenchmarkId::new("two_links", size), &size, |b, &size| {
            b.iter(|| malloc_free(&two, size))
        });

        group.bench_with_input(BenchmarkId::new("counting", size), &size, |b, &size| {
            b.iter(|| malloc_free(&counting, size))
        });
    }

    group.finish();
}

fn bench_realloc(c: &mut Criterion) {
    let one = Interceptor::new(NoopSink, Next::terminal(SystemAllocator));
    let two = Interceptor::new(
        NoopSink,
        Next::hook(Interceptor::new(NoopSink, Next::terminal(SystemAllocator))),
    );

    let mut group = c.benchmark_group("realloc_grow");

    group.bench_function("raw", |b| {
        b.iter(|| unsafe {
            let mut ptr = SystemAllocator.malloc(16);
            for size in [64, 256, 1024, 4096] {
                ptr = SystemAllocator.realloc(ptr, size);
            }
            SystemAllocator.free(black_box(ptr));
        })
    });

    group.bench_function("one_link", |b| {
        b.iter(|| unsafe {
            let mut ptr = one.malloc(16, Caller::UNKNOWN);
            for size in [64, 256, 1024, 4096] {
                ptr = one.realloc(ptr, size, Caller::UNKNOWN);
            }
            one.free(black_box(ptr), Caller::UNKNOWN);
        })
    });

    group.bench_function("two_links", |b| {
        b.iter(|| unsafe {
            let mut ptr = two.malloc(16, Caller::UNKNOWN);
            for size in [64, 256, 1024, 4096] {
                ptr = two.realloc(ptr, size, Caller::UNKNOWN);
            }
            two.free(black_box(ptr), Caller::UNKNOWN);
        })
    });

    group.finish();
}

criterion_group!(benches, bench_malloc_free, bench_realloc);
criterion_main!(benches);
