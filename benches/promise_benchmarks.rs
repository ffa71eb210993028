use criterion::{Criterion, criterion_group, criterion_main};
use curler::{Promise, PromiseError, Response, Value};
use std::hint::black_box;

// cargo bench --profile dev

// Initialize logger for benchmark so `RUST_LOG` is honored.
#[ctor::ctor]
fn __init_bench_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).try_init();
}

fn benchmark_promise_operations(c: &mut Criterion) {
    // Benchmark basic promise creation and resolution
    c.bench_function("promise_basic_resolution", |b| {
        b.iter(|| {
            let p = Promise::new(|resolve, _| resolve.call(42));
            p.then(|v: Value| Value::from(v.as_number().unwrap_or_default() * 2.0));
            black_box(p.value())
        })
    });

    // Benchmark promise chaining
    c.bench_function("promise_chaining", |b| {
        b.iter(|| {
            let p = Promise::resolved(1);
            p.then(|x: Value| x.as_number().unwrap_or_default() + 1.0)
                .then(|x: Value| x.as_number().unwrap_or_default() * 2.0)
                .then(|x: Value| x.as_number().unwrap_or_default() - 3.0)
                .then(|x: Value| x.as_number().unwrap_or_default() / 2.0);
            black_box(p.value())
        })
    });

    // Benchmark handlers queued before a late settlement
    c.bench_function("promise_queued_drain", |b| {
        b.iter(|| {
            let slot = std::cell::RefCell::new(None);
            let p = Promise::new(|resolve, _| {
                *slot.borrow_mut() = Some(resolve);
            });
            for _ in 0..32 {
                p.then(|x: Value| x);
            }
            if let Some(resolve) = slot.borrow_mut().take() {
                resolve.call("go");
            }
            black_box(p.value())
        })
    });

    // Benchmark rejection and recovery chaining
    c.bench_function("promise_rejection_fails", |b| {
        b.iter(|| {
            let p = Promise::rejected(PromiseError::message("error"));
            p.fails(|err: Value| format!("caught: {err}")).fails(|_: Value| ());
            black_box(p.is_absorbed())
        })
    });

    // Benchmark status dispatch falling through to a generic handler
    c.bench_function("promise_status_dispatch", |b| {
        b.iter(|| {
            let p = Promise::rejected(Response::new(500));
            p.forbidden(|_: Value| ())
                .not_found(|_: Value| ())
                .conflict(|_: Value| ())
                .internal_error(|_: Value| ())
                .fails(|_: Value| ());
            black_box(p.is_absorbed())
        })
    });
}

criterion_group!(benches, benchmark_promise_operations);
criterion_main!(benches);
