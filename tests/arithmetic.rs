//! Binary arithmetic across number kinds, run through the public API.

mod cases;

use bumpalo::Bump;
use cases::ARITHMETIC_CASES;
use ingot::{AstBuilder, Interpreter, StaticType};

#[test]
fn test_arithmetic_cases() {
    let mut failures = Vec::new();
    for case in ARITHMETIC_CASES.iter() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let expr = b.binary(
            case.op,
            b.integer(case.left, case.kind),
            b.integer(case.right, case.kind),
        );
        let main = b.fun("main", &[], StaticType::Number(case.kind), &[b.ret(expr)]);
        let program = b.program(&[main]).expect("builder is unmetered");
        let result = Interpreter::builder(program)
            .build()
            .and_then(|mut interpreter| interpreter.invoke("main", vec![]));

        let actual = match result {
            Ok(value) => Ok(value.to_string()),
            Err(err) => Err(err.to_string()),
        };
        let matches = match (&case.expected, &actual) {
            (Ok(expected), Ok(actual)) => expected == actual,
            (Err(fragment), Err(message)) => message.contains(fragment),
            _ => false,
        };
        if !matches {
            failures.push(format!(
                "{}: {} {} {} as {}: expected {:?}, got {:?}",
                case.name,
                case.left,
                case.op.symbol(),
                case.right,
                case.kind,
                case.expected,
                actual
            ));
        }
    }
    assert!(failures.is_empty(), "failed cases:\n{}", failures.join("\n"));
}
