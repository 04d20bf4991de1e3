use ingot::{BinaryOp, NumberKind};
use once_cell::sync::Lazy;

pub struct ArithmeticCase {
    pub name: &'static str,
    pub kind: NumberKind,
    pub op: BinaryOp,
    pub left: &'static str,
    pub right: &'static str,
    /// Rendered result, or a fragment of the error message.
    pub expected: Result<&'static str, &'static str>,
}

const fn case(
    name: &'static str,
    kind: NumberKind,
    op: BinaryOp,
    left: &'static str,
    right: &'static str,
    expected: Result<&'static str, &'static str>,
) -> ArithmeticCase {
    ArithmeticCase {
        name,
        kind,
        op,
        left,
        right,
        expected,
    }
}

pub static ARITHMETIC_CASES: Lazy<Vec<ArithmeticCase>> = Lazy::new(|| {
    use BinaryOp::*;
    use NumberKind::*;
    vec![
        case("int_add", Int, Add, "1", "2", Ok("3")),
        case("int_truncating_division", Int, Divide, "-7", "2", Ok("-3")),
        case("int_modulo_sign", Int, Modulo, "-7", "2", Ok("-1")),
        case("int_division_by_zero", Int, Divide, "1", "0", Err("division by zero")),
        case(
            "int_shift_grows",
            Int,
            ShiftLeft,
            "1",
            "100",
            Ok("1267650600228229401496703205376"),
        ),
        case("uint_underflow", UInt, Subtract, "1", "2", Err("UInt underflow")),
        case("int8_overflow", Int8, Add, "127", "1", Err("Int8 overflow")),
        case("int8_underflow", Int8, Subtract, "-128", "1", Err("Int8 underflow")),
        case("int8_arithmetic_shift", Int8, ShiftRight, "-8", "1", Ok("-4")),
        case("uint8_underflow", UInt8, Subtract, "0", "1", Err("UInt8 underflow")),
        case("uint8_division", UInt8, Divide, "7", "2", Ok("3")),
        case("uint8_and", UInt8, BitwiseAnd, "12", "10", Ok("8")),
        case("uint8_or", UInt8, BitwiseOr, "12", "10", Ok("14")),
        case("uint8_xor", UInt8, BitwiseXor, "12", "10", Ok("6")),
        case("uint8_shift_wraps", UInt8, ShiftLeft, "255", "1", Ok("254")),
        case("uint8_shift_past_width", UInt8, ShiftLeft, "1", "8", Ok("0")),
        case(
            "uint64_high_bit",
            UInt64,
            ShiftLeft,
            "1",
            "63",
            Ok("9223372036854775808"),
        ),
        case(
            "uint128_overflow",
            UInt128,
            Add,
            "340282366920938463463374607431768211455",
            "1",
            Err("UInt128 overflow"),
        ),
        case("word8_wraps_up", Word8, Add, "255", "1", Ok("0")),
        case("word8_wraps_down", Word8, Subtract, "0", "1", Ok("255")),
        case("word16_multiply_wraps", Word16, Multiply, "256", "256", Ok("0")),
        case("ufix64_division", UFix64, Divide, "3", "2", Ok("1.50000000")),
        case("fix64_negative", Fix64, Subtract, "1", "3", Ok("-2.00000000")),
        case("fix64_multiply", Fix64, Multiply, "-2", "3", Ok("-6.00000000")),
        case("ufix64_underflow", UFix64, Subtract, "1", "2", Err("UFix64 underflow")),
    ]
});
