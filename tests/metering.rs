//! Memory metering as observed through the gauge.

use bumpalo::Bump;
use ingot::ast::{Declaration, Statement};
use ingot::{
    AstBuilder, BinaryOp, CompositeKind, CountingGauge, ExecutionError, Interpreter, LimitedGauge,
    MemoryGauge, MemoryKind, NumberKind, StaticType, Value,
};
use pretty_assertions::assert_eq;
use std::rc::Rc;

const INT: StaticType<'static> = StaticType::Number(NumberKind::Int);

fn run_metered<'a>(
    b: &AstBuilder<'a>,
    declarations: &[Declaration<'a>],
    gauge: Rc<dyn MemoryGauge + 'a>,
) -> Result<Value<'a>, ExecutionError> {
    let program = b.program(declarations).expect("builder is unmetered");
    Interpreter::builder(program)
        .memory_gauge(gauge)
        .build()?
        .invoke("main", vec![])
}

/// Run `main` returning `return_type` and report the gauge.
fn meter_main(
    return_type: StaticType<'static>,
    body: impl for<'a> FnOnce(&AstBuilder<'a>) -> Vec<Statement<'a>>,
) -> Rc<CountingGauge> {
    let gauge = Rc::new(CountingGauge::new());
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let body = body(&b);
    let main = b.fun("main", &[], return_type, &body);
    if let Err(err) = run_metered(&b, &[main], gauge.clone()) {
        panic!("execution failed: {}", err);
    }
    gauge
}

#[test]
fn test_int_addition_reports_big_int_bytes() {
    let gauge = meter_main(INT, |b| {
        vec![b.let_("x", b.add(b.int(1), b.int(2))), b.ret(b.ident("x"))]
    });
    // 8 + 8 for the operands, 16 for the widened result
    assert_eq!(gauge.get(MemoryKind::BigInt), 32);
    assert_eq!(gauge.get(MemoryKind::Number), 0);
}

#[test]
fn test_int_subtraction_does_not_widen() {
    let gauge = meter_main(INT, |b| vec![b.ret(b.sub(b.int(5), b.int(2)))]);
    assert_eq!(gauge.get(MemoryKind::BigInt), 24);
}

#[test]
fn test_int_negation() {
    let gauge = meter_main(INT, |b| vec![b.ret(b.neg(b.int(5)))]);
    assert_eq!(gauge.get(MemoryKind::BigInt), 16);
}

#[test]
fn test_int128_addition_uses_fixed_width() {
    let gauge = meter_main(StaticType::Number(NumberKind::Int128), |b| {
        vec![b.ret(b.add(
            b.number(1, NumberKind::Int128),
            b.number(2, NumberKind::Int128),
        ))]
    });
    assert_eq!(gauge.get(MemoryKind::BigInt), 48);
}

#[test]
fn test_fixed_width_literals_and_addition() {
    for (kind, creation, addition) in [
        (NumberKind::UInt8, 1, 3),
        (NumberKind::Int16, 2, 6),
        (NumberKind::UInt32, 4, 12),
        (NumberKind::UInt64, 8, 24),
        (NumberKind::Word64, 8, 24),
    ] {
        let gauge = meter_main(StaticType::Number(kind), |b| vec![b.ret(b.number(1, kind))]);
        assert_eq!(gauge.get(MemoryKind::Number), creation, "{} literal", kind);

        let gauge = meter_main(StaticType::Number(kind), |b| {
            vec![b.ret(b.add(b.number(1, kind), b.number(2, kind)))]
        });
        assert_eq!(gauge.get(MemoryKind::Number), addition, "{} addition", kind);
    }
}

#[test]
fn test_copying_scalars_is_not_metered() {
    let gauge = meter_main(StaticType::Number(NumberKind::UInt64), |b| {
        vec![
            b.let_("a", b.number(7, NumberKind::UInt64)),
            b.let_("b", b.ident("a")),
            b.let_("c", b.ident("b")),
            b.ret(b.ident("c")),
        ]
    });
    assert_eq!(gauge.get(MemoryKind::Number), 8);
    // `main` and the three locals
    assert_eq!(gauge.get(MemoryKind::Variable), 4);
}

#[test]
fn test_comparison_and_literals() {
    let gauge = meter_main(StaticType::Bool, |b| {
        vec![
            b.let_("flag", b.bool(true)),
            b.ret(b.binary(
                BinaryOp::And,
                b.ident("flag"),
                b.lt(b.number(1, NumberKind::UInt8), b.number(2, NumberKind::UInt8)),
            )),
        ]
    });
    // literal, comparison, conjunction
    assert_eq!(gauge.get(MemoryKind::Bool), 3);
}

#[test]
fn test_optional_boxing_and_force() {
    let gauge = meter_main(INT, |b| {
        let optional = b.optional_type(INT);
        vec![
            b.let_typed("x", optional, b.int(4)),
            b.ret(b.force(b.ident("x"))),
        ]
    });
    assert_eq!(gauge.get(MemoryKind::Optional), 1);
}

#[test]
fn test_string_literal_reports_length() {
    let gauge = meter_main(StaticType::String, |b| vec![b.ret(b.string("hello"))]);
    assert_eq!(gauge.get(MemoryKind::String), 5);

    let gauge = meter_main(StaticType::String, |b| vec![b.ret(b.string(""))]);
    assert_eq!(gauge.get(MemoryKind::String), 1);
}

#[test]
fn test_bound_function_per_access() {
    fn declarations<'a>(b: &AstBuilder<'a>, calls: usize) -> (Declaration<'a>, Vec<Statement<'a>>) {
        let foo = b
            .composite("Foo", CompositeKind::Structure)
            .function("bar", &[], INT, &[b.ret(b.int(1))])
            .build();
        let mut body = vec![b.let_("foo", b.call(b.ident("Foo"), &[]))];
        for _ in 0..calls {
            body.push(b.expr_stmt(b.method(b.ident("foo"), "bar", &[])));
        }
        body.push(b.ret_void());
        (foo, body)
    }

    let gauge = Rc::new(CountingGauge::new());
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let (foo, body) = declarations(&b, 3);
    let main = b.fun("main", &[], StaticType::Void, &body);
    run_metered(&b, &[foo, main], gauge.clone()).expect("three calls");
    assert_eq!(gauge.get(MemoryKind::BoundFunction), 3);
    // `bar` and `main`
    assert_eq!(gauge.get(MemoryKind::InterpretedFunction), 2);
    assert_eq!(gauge.get(MemoryKind::HostFunction), 1);

    let gauge = Rc::new(CountingGauge::new());
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let (foo, body) = declarations(&b, 0);
    let main = b.fun("main", &[], StaticType::Void, &body);
    run_metered(&b, &[foo, main], gauge.clone()).expect("no calls");
    assert_eq!(gauge.get(MemoryKind::BoundFunction), 0);
}

/// Run a program of `declarations` plus `main` and report the gauge.
fn meter_program(
    build: impl for<'a> FnOnce(&AstBuilder<'a>) -> Vec<Declaration<'a>>,
) -> Rc<CountingGauge> {
    let gauge = Rc::new(CountingGauge::new());
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let declarations = build(&b);
    if let Err(err) = run_metered(&b, &declarations, gauge.clone()) {
        panic!("execution failed: {}", err);
    }
    gauge
}

#[test]
fn test_array_creation() {
    let gauge = meter_main(StaticType::Void, |b| {
        let int8 = b.array_type(StaticType::Number(NumberKind::Int8));
        let strings = b.array_type(StaticType::String);
        let nested_strings = b.array_type(strings);
        let bools = b.array_type(StaticType::Bool);
        let bools2 = b.array_type(bools);
        let bools3 = b.array_type(bools2);
        vec![
            b.let_typed("x", int8, b.array(int8, &[])),
            b.let_typed(
                "y",
                nested_strings,
                b.array(nested_strings, &[b.array(strings, &[])]),
            ),
            b.let_typed(
                "z",
                bools3,
                b.array(bools3, &[b.array(bools2, &[b.array(bools, &[])])]),
            ),
        ]
    });
    // x: the literal and its copy. y: 4 for the literal, 3 for the copy, 1
    // for reading the element while walking its dynamic type. z: 12, 5 and 2.
    assert_eq!(gauge.get(MemoryKind::Array), 29);
    assert_eq!(gauge.get(MemoryKind::Variable), 4);
}

#[test]
fn test_array_iteration() {
    let gauge = meter_main(StaticType::Void, |b| {
        let inner = b.array_type(StaticType::Number(NumberKind::Int8));
        let outer = b.array_type(inner);
        let empty = || b.array(inner, &[]);
        vec![
            b.let_typed("values", outer, b.array(outer, &[empty(), empty(), empty()])),
            b.for_in("value", b.ident("values"), &[b.let_("a", b.ident("value"))]),
        ]
    });
    assert_eq!(gauge.get(MemoryKind::Array), 33);
    // main, values, value, and `a` once per iteration
    assert_eq!(gauge.get(MemoryKind::Variable), 6);
}

#[test]
fn test_dictionary_creation() {
    let gauge = meter_main(StaticType::Void, |b| {
        let inner = b.dictionary_type(StaticType::Number(NumberKind::Int8), StaticType::String);
        let outer = b.dictionary_type(StaticType::String, inner);
        vec![
            b.let_typed("x", inner, b.dictionary(inner, &[])),
            b.let_typed(
                "y",
                outer,
                b.dictionary(outer, &[(b.string("a"), b.dictionary(inner, &[]))]),
            ),
        ]
    });
    assert_eq!(gauge.get(MemoryKind::Dictionary), 10);
    assert_eq!(gauge.get(MemoryKind::Variable), 3);
}

#[test]
fn test_dictionary_iteration() {
    let gauge = meter_main(StaticType::Void, |b| {
        let inner = b.dictionary_type(StaticType::Number(NumberKind::Int8), StaticType::String);
        let outer = b.array_type(inner);
        let empty = || b.dictionary(inner, &[]);
        vec![
            b.let_typed("values", outer, b.array(outer, &[empty(), empty(), empty()])),
            b.for_in("value", b.ident("values"), &[b.let_("a", b.ident("value"))]),
        ]
    });
    assert_eq!(gauge.get(MemoryKind::Dictionary), 30);
    assert_eq!(gauge.get(MemoryKind::Variable), 6);
}

#[test]
fn test_composite_creation() {
    let gauge = meter_program(|b| {
        let s = b.composite("S", CompositeKind::Structure).build();
        let r = b
            .composite("R", CompositeKind::Resource)
            .field("a", StaticType::String)
            .field("b", StaticType::String)
            .init(
                &[
                    b.param("a", StaticType::String),
                    b.param("b", StaticType::String),
                ],
                &[
                    b.assign(b.member(b.ident("self"), "a"), StaticType::String, b.ident("a")),
                    b.assign(b.member(b.ident("self"), "b"), StaticType::String, b.ident("b")),
                ],
            )
            .build();
        let main = b.fun(
            "main",
            &[],
            StaticType::Void,
            &[
                b.let_("s", b.call(b.ident("S"), &[])),
                b.let_move("r", b.create("R", &[b.string("a"), b.string("b")])),
                b.expr_stmt(b.destroy(b.ident("r"))),
            ],
        );
        vec![s, r, main]
    });
    // Creating and copying `s`, creating and moving `r`.
    assert_eq!(gauge.get(MemoryKind::Composite), 4);
    // S, R, main, s, r, and self, a, b in the initializer
    assert_eq!(gauge.get(MemoryKind::Variable), 8);
}

#[test]
fn test_composite_iteration() {
    let gauge = meter_program(|b| {
        let s = b.composite("S", CompositeKind::Structure).build();
        let ty = b.composite_type("S", CompositeKind::Structure);
        let values = b.array_type(ty);
        let new_s = || b.call(b.ident("S"), &[]);
        let main = b.fun(
            "main",
            &[],
            StaticType::Void,
            &[
                b.let_("values", b.array(values, &[new_s(), new_s(), new_s()])),
                b.for_in("value", b.ident("values"), &[b.let_("a", b.ident("value"))]),
            ],
        );
        vec![s, main]
    });
    assert_eq!(gauge.get(MemoryKind::Composite), 30);
    assert_eq!(gauge.get(MemoryKind::Variable), 7);
}

#[test]
fn test_ephemeral_reference_per_expression() {
    let gauge = meter_main(StaticType::Void, |b| {
        let ints = b.array_type(INT);
        let reference = b.reference_type(ints);
        vec![
            b.let_("xs", b.array(ints, &[b.int(1)])),
            b.let_("r", b.reference(b.ident("xs"), reference)),
            b.let_("s", b.reference(b.ident("xs"), reference)),
        ]
    });
    assert_eq!(gauge.get(MemoryKind::EphemeralReference), 2);
}

#[test]
fn test_void_when_body_runs_off_its_end() {
    let gauge = meter_program(|b| {
        let noop = b.fun("noop", &[], StaticType::Void, &[]);
        let main = b.fun(
            "main",
            &[],
            INT,
            &[
                b.expr_stmt(b.call(b.ident("noop"), &[])),
                b.expr_stmt(b.call(b.ident("noop"), &[])),
                b.ret(b.int(1)),
            ],
        );
        vec![noop, main]
    });
    assert_eq!(gauge.get(MemoryKind::Void), 2);
}

#[test]
fn test_fix64_modulo() {
    let gauge = meter_main(StaticType::Number(NumberKind::Fix64), |b| {
        vec![b.ret(b.binary(
            BinaryOp::Modulo,
            b.fixed("5.5", NumberKind::Fix64),
            b.fixed("2.0", NumberKind::Fix64),
        ))]
    });
    // 8 + 8 for the operands, then 8 each for the quotient, its truncation,
    // the product and the difference
    assert_eq!(gauge.get(MemoryKind::Number), 48);
}

#[test]
fn test_limited_gauge_aborts_execution() {
    let gauge = Rc::new(LimitedGauge::new(64));
    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let main = b.fun(
        "main",
        &[],
        StaticType::Void,
        &[
            b.var("i", b.int(0)),
            b.while_(
                b.lt(b.ident("i"), b.int(1000)),
                &[b.assign(b.ident("i"), INT, b.add(b.ident("i"), b.int(1)))],
            ),
            b.ret_void(),
        ],
    );
    let err = run_metered(&b, &[main], gauge.clone()).unwrap_err();
    assert!(err.is_resource_exceeded(), "unexpected error: {}", err);
    assert!(gauge.used() <= 64);
}

#[test]
fn test_metered_builder_reports_program_nodes() {
    let gauge = Rc::new(CountingGauge::new());
    let arena = Bump::new();
    let b = AstBuilder::with_meter(&arena, ingot::Meter::new(gauge.clone()));
    let main = b.fun("main", &[], INT, &[b.ret(b.add(b.int(1), b.int(2)))]);
    b.program(&[main]).expect("counting gauge never rejects");
    assert_eq!(gauge.get(MemoryKind::Program), 1);
    assert_eq!(gauge.get(MemoryKind::Statement), 1);
    assert_eq!(gauge.get(MemoryKind::Expression), 3);
}

#[test]
fn test_metered_builder_limit() {
    let gauge = Rc::new(LimitedGauge::new(2));
    let arena = Bump::new();
    let b = AstBuilder::with_meter(&arena, ingot::Meter::new(gauge.clone()));
    let main = b.fun("main", &[], INT, &[b.ret(b.add(b.int(1), b.int(2)))]);
    let err = b.program(&[main]).unwrap_err();
    assert_eq!(err.limit, 2);
}
