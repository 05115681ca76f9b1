use std::hint::black_box;

use calltree_recorder::{CallTreeTracer, FunctionIdentity, SourceLocation, Tracer};
use criterion::{criterion_group, criterion_main, Criterion};

fn deep_call_chain(depth: usize) -> CallTreeTracer {
    let mut tracer = CallTreeTracer::new(0.0);
    for level in 0..depth {
        tracer.on_call(
            FunctionIdentity::new("level"),
            Some(SourceLocation::new("bench.rs", level as u32)),
            level as f64,
        );
    }
    for level in 0..depth {
        tracer.on_return((depth + level) as f64);
    }
    tracer
}

fn wide_call_fanout(calls: usize) -> CallTreeTracer {
    let mut tracer = CallTreeTracer::new(0.0);
    for index in 0..calls {
        let at = index as f64;
        tracer.on_call(FunctionIdentity::new("leaf"), None, at);
        tracer.on_return(at + 0.5);
    }
    tracer
}

fn bench_tree_construction(c: &mut Criterion) {
    c.bench_function("deep_call_chain_1000", |b| {
        b.iter(|| deep_call_chain(black_box(1000)))
    });
    c.bench_function("wide_call_fanout_10000", |b| {
        b.iter(|| wide_call_fanout(black_box(10_000)))
    });
}

criterion_group!(benches, bench_tree_construction);
criterion_main!(benches);
