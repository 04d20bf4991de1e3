//! Benchmarks for the interpreter.
//!
//! Run with: `cargo bench` in the core/ directory.
//!
//! Benchmark groups:
//! 1. arithmetic: a chain of `Int` additions, with and without a memory gauge
//! 2. calls: recursive function calls
//! 3. resources: creating, moving and destroying resources in a loop

use bumpalo::Bump;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use ingot_core::{
    ast::{AstBuilder, Expr},
    interpreter::Interpreter,
    memory::CountingGauge,
    types::{CompositeKind, NumberKind, StaticType},
};
use std::rc::Rc;

const INT: StaticType<'static> = StaticType::Number(NumberKind::Int);

/// Build `1 + 1 + ... + 1` with `n` additions.
fn arithmetic_chain<'a>(b: &AstBuilder<'a>, n: usize) -> &'a Expr<'a> {
    (0..n).fold(b.int(1), |expr, _| b.add(expr, b.int(1)))
}

fn bench_arithmetic(c: &mut Criterion) {
    let mut group = c.benchmark_group("arithmetic");

    for size in [100, 200, 400, 800] {
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("unmetered", size), &size, |bench, &size| {
            let arena = Bump::new();
            let b = AstBuilder::new(&arena);
            let main = b.fun("main", &[], INT, &[b.ret(arithmetic_chain(&b, size))]);
            let program = b.program(&[main]).expect("Program failed");

            bench.iter(|| {
                let mut interpreter = Interpreter::builder(black_box(program))
                    .build()
                    .expect("Declarations failed");
                black_box(interpreter.invoke("main", vec![]).expect("Execution failed"))
            });
        });

        group.bench_with_input(BenchmarkId::new("metered", size), &size, |bench, &size| {
            let arena = Bump::new();
            let b = AstBuilder::new(&arena);
            let main = b.fun("main", &[], INT, &[b.ret(arithmetic_chain(&b, size))]);
            let program = b.program(&[main]).expect("Program failed");

            bench.iter(|| {
                let gauge = Rc::new(CountingGauge::new());
                let mut interpreter = Interpreter::builder(black_box(program))
                    .memory_gauge(gauge.clone())
                    .build()
                    .expect("Declarations failed");
                black_box(interpreter.invoke("main", vec![]).expect("Execution failed"));
                black_box(gauge.total())
            });
        });
    }

    group.finish();
}

fn bench_calls(c: &mut Criterion) {
    let mut group = c.benchmark_group("calls");

    for n in [10, 15, 20] {
        group.bench_with_input(BenchmarkId::new("fib", n), &n, |bench, &n| {
            let arena = Bump::new();
            let b = AstBuilder::new(&arena);
            let fib = b.fun(
                "fib",
                &[b.unlabeled_param("n", INT)],
                INT,
                &[
                    b.if_(b.lt(b.ident("n"), b.int(2)), &[b.ret(b.ident("n"))], None),
                    b.ret(b.add(
                        b.call(b.ident("fib"), &[b.sub(b.ident("n"), b.int(1))]),
                        b.call(b.ident("fib"), &[b.sub(b.ident("n"), b.int(2))]),
                    )),
                ],
            );
            let main = b.fun(
                "main",
                &[],
                INT,
                &[b.ret(b.call(b.ident("fib"), &[b.int(n)]))],
            );
            let program = b.program(&[fib, main]).expect("Program failed");

            bench.iter(|| {
                let mut interpreter = Interpreter::builder(black_box(program))
                    .build()
                    .expect("Declarations failed");
                black_box(interpreter.invoke("main", vec![]).expect("Execution failed"))
            });
        });
    }

    group.finish();
}

fn bench_resources(c: &mut Criterion) {
    let mut group = c.benchmark_group("resources");

    for size in [100, 1000] {
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("create_move_destroy", size), &size, |bench, &size| {
            let arena = Bump::new();
            let b = AstBuilder::new(&arena);
            let token = b
                .composite("Token", CompositeKind::Resource)
                .field("id", INT)
                .build();
            let main = b.fun(
                "main",
                &[],
                StaticType::Void,
                &[
                    b.var("i", b.int(0)),
                    b.while_(
                        b.lt(b.ident("i"), b.int(size as i128)),
                        &[
                            b.let_move("a", b.create("Token", &[b.ident("i")])),
                            b.let_move("b", b.mv(b.ident("a"))),
                            b.expr_stmt(b.destroy(b.ident("b"))),
                            b.assign(b.ident("i"), INT, b.add(b.ident("i"), b.int(1))),
                        ],
                    ),
                    b.ret_void(),
                ],
            );
            let program = b.program(&[token, main]).expect("Program failed");

            bench.iter(|| {
                let mut interpreter = Interpreter::builder(black_box(program))
                    .build()
                    .expect("Declarations failed");
                black_box(interpreter.invoke("main", vec![]).expect("Execution failed"))
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_arithmetic, bench_calls, bench_resources);
criterion_main!(benches);
