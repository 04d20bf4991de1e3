//! Numeric engine.
//!
//! Every arithmetic operation goes through a single pipeline: meter the
//! result, compute on an arbitrary-precision intermediate, then narrow back to
//! the operand kind. Narrowing either fails (checked), clamps (saturating) or
//! wraps (`Word` kinds and bounded left shifts).
//!
//! Fixed-point kinds store their value scaled by [`FIX64_FACTOR`]; the raw
//! scaled integer is what flows through the pipeline.
//!
//! ## Metering
//!
//! Bounded kinds report their byte width for every value produced. `Int` and
//! `UInt` report a size derived from the operands: the sum of both operand
//! sizes for operations that can widen (add, multiply, left shift) and the
//! larger operand size for the rest. A left shift is charged at least the size
//! of its result before the shift runs.

use crate::interpreter::{ArithmeticError, ExecutionError, InternalError};
use crate::memory::{MemoryLimitExceeded, Meter};
use crate::types::{FIX64_FACTOR, FIX64_SCALE, NumberKind};
use core::cmp::Ordering;
use core::fmt;
use num_bigint::BigInt;
use num_traits::{One, Signed, ToPrimitive, Zero};

/// Size of one machine word, the allocation granularity of unbounded integers.
const WORD_SIZE: u64 = 8;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NumberValue {
    Int(BigInt),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Int128(i128),
    Int256(BigInt),
    UInt(BigInt),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    UInt128(u128),
    UInt256(BigInt),
    Word8(u8),
    Word16(u16),
    Word32(u32),
    Word64(u64),
    /// Scaled by 10^8.
    Fix64(i64),
    /// Scaled by 10^8.
    UFix64(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    BitwiseOr,
    BitwiseXor,
    BitwiseAnd,
    ShiftLeft,
    ShiftRight,
}

impl Operation {
    fn name(self) -> &'static str {
        match self {
            Operation::Add => "+",
            Operation::Subtract => "-",
            Operation::Multiply => "*",
            Operation::Divide => "/",
            Operation::Modulo => "%",
            Operation::BitwiseOr => "|",
            Operation::BitwiseXor => "^",
            Operation::BitwiseAnd => "&",
            Operation::ShiftLeft => "<<",
            Operation::ShiftRight => ">>",
        }
    }

    fn widens(self) -> bool {
        matches!(
            self,
            Operation::Add | Operation::Multiply | Operation::ShiftLeft
        )
    }

    fn is_bitwise(self) -> bool {
        matches!(
            self,
            Operation::BitwiseOr
                | Operation::BitwiseXor
                | Operation::BitwiseAnd
                | Operation::ShiftLeft
                | Operation::ShiftRight
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Checked,
    Saturating,
}

// ============================================================================
// Construction
// ============================================================================

impl NumberValue {
    /// Parse an integer literal of `kind` and meter its creation.
    pub fn from_literal(
        literal: &str,
        kind: NumberKind,
        meter: &Meter<'_>,
    ) -> Result<NumberValue, ExecutionError> {
        let invalid = || InternalError::InvalidLiteral {
            literal: literal.to_string(),
            kind,
        };
        let mut raw: BigInt = literal.parse().map_err(|_| invalid())?;
        if kind.is_fixed_point() {
            raw *= FIX64_FACTOR;
        }
        let value = in_range(kind, raw)?;
        Ok(value.metered(meter)?)
    }

    /// Parse a fixed-point literal such as `-1.5` and meter its creation.
    pub fn from_fixed_literal(
        literal: &str,
        kind: NumberKind,
        meter: &Meter<'_>,
    ) -> Result<NumberValue, ExecutionError> {
        let invalid = || InternalError::InvalidLiteral {
            literal: literal.to_string(),
            kind,
        };
        if !kind.is_fixed_point() {
            return Err(invalid().into());
        }
        let (negative, digits) = match literal.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, literal),
        };
        let (integer, fraction) = digits.split_once('.').unwrap_or((digits, ""));
        if integer.is_empty()
            || fraction.len() > FIX64_SCALE as usize
            || !integer.bytes().all(|b| b.is_ascii_digit())
            || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid().into());
        }
        let padded = format!("{}{:0<width$}", integer, fraction, width = FIX64_SCALE as usize);
        let mut raw: BigInt = padded.parse().map_err(|_| invalid())?;
        if negative {
            raw = -raw;
        }
        let value = in_range(kind, raw)?;
        Ok(value.metered(meter)?)
    }

    /// Report the creation of an already constructed value.
    pub fn metered(self, meter: &Meter<'_>) -> Result<NumberValue, MemoryLimitExceeded> {
        meter.report(self.kind().memory_kind(), self.metered_size())?;
        Ok(self)
    }

    /// An `Int` holding a length or index.
    pub fn from_index(index: usize, meter: &Meter<'_>) -> Result<NumberValue, MemoryLimitExceeded> {
        NumberValue::Int(BigInt::from(index)).metered(meter)
    }

    pub fn kind(&self) -> NumberKind {
        match self {
            NumberValue::Int(_) => NumberKind::Int,
            NumberValue::Int8(_) => NumberKind::Int8,
            NumberValue::Int16(_) => NumberKind::Int16,
            NumberValue::Int32(_) => NumberKind::Int32,
            NumberValue::Int64(_) => NumberKind::Int64,
            NumberValue::Int128(_) => NumberKind::Int128,
            NumberValue::Int256(_) => NumberKind::Int256,
            NumberValue::UInt(_) => NumberKind::UInt,
            NumberValue::UInt8(_) => NumberKind::UInt8,
            NumberValue::UInt16(_) => NumberKind::UInt16,
            NumberValue::UInt32(_) => NumberKind::UInt32,
            NumberValue::UInt64(_) => NumberKind::UInt64,
            NumberValue::UInt128(_) => NumberKind::UInt128,
            NumberValue::UInt256(_) => NumberKind::UInt256,
            NumberValue::Word8(_) => NumberKind::Word8,
            NumberValue::Word16(_) => NumberKind::Word16,
            NumberValue::Word32(_) => NumberKind::Word32,
            NumberValue::Word64(_) => NumberKind::Word64,
            NumberValue::Fix64(_) => NumberKind::Fix64,
            NumberValue::UFix64(_) => NumberKind::UFix64,
        }
    }

    /// The value as an integer; the scaled integer for fixed-point kinds.
    pub fn to_bigint(&self) -> BigInt {
        match self {
            NumberValue::Int(v)
            | NumberValue::Int256(v)
            | NumberValue::UInt(v)
            | NumberValue::UInt256(v) => v.clone(),
            NumberValue::Int8(v) => BigInt::from(*v),
            NumberValue::Int16(v) => BigInt::from(*v),
            NumberValue::Int32(v) => BigInt::from(*v),
            NumberValue::Int64(v) | NumberValue::Fix64(v) => BigInt::from(*v),
            NumberValue::Int128(v) => BigInt::from(*v),
            NumberValue::UInt8(v) | NumberValue::Word8(v) => BigInt::from(*v),
            NumberValue::UInt16(v) | NumberValue::Word16(v) => BigInt::from(*v),
            NumberValue::UInt32(v) | NumberValue::Word32(v) => BigInt::from(*v),
            NumberValue::UInt64(v) | NumberValue::Word64(v) | NumberValue::UFix64(v) => {
                BigInt::from(*v)
            }
            NumberValue::UInt128(v) => BigInt::from(*v),
        }
    }

    /// Bytes reported when this value is allocated.
    pub fn metered_size(&self) -> u64 {
        match self {
            NumberValue::Int(v) | NumberValue::UInt(v) => big_int_size(v),
            _ => self.kind().byte_size().unwrap_or(WORD_SIZE),
        }
    }

    /// Integer value usable as an index, if non-negative and small enough.
    pub fn to_index(&self) -> Option<usize> {
        if self.kind().is_fixed_point() {
            return None;
        }
        self.to_bigint().to_usize()
    }

    pub fn is_zero(&self) -> bool {
        self.to_bigint().is_zero()
    }
}

fn big_int_size(value: &BigInt) -> u64 {
    let words = value.bits().div_ceil(64).max(1);
    words * WORD_SIZE
}

/// Word-rounded size of `value << amount`, known before the shift runs.
fn shifted_size(value: &BigInt, amount: usize) -> u64 {
    if value.is_zero() {
        return WORD_SIZE;
    }
    let bits = value.bits().saturating_add(amount as u64);
    bits.div_ceil(64).max(1).saturating_mul(WORD_SIZE)
}

fn min_raw(kind: NumberKind) -> Option<BigInt> {
    let bits = kind.bits()?;
    if kind.is_signed() {
        Some(-(BigInt::one() << (bits - 1)))
    } else {
        Some(BigInt::zero())
    }
}

fn max_raw(kind: NumberKind) -> Option<BigInt> {
    let bits = kind.bits()?;
    if kind.is_signed() {
        Some((BigInt::one() << (bits - 1)) - 1)
    } else {
        Some((BigInt::one() << bits) - 1)
    }
}

/// Narrow `raw` to `kind`, failing when it is outside the representable range.
fn in_range(kind: NumberKind, raw: BigInt) -> Result<NumberValue, ArithmeticError> {
    if kind == NumberKind::UInt && raw.is_negative() {
        return Err(ArithmeticError::Underflow { kind });
    }
    if min_raw(kind).is_some_and(|min| raw < min) {
        return Err(ArithmeticError::Underflow { kind });
    }
    if max_raw(kind).is_some_and(|max| raw > max) {
        return Err(ArithmeticError::Overflow { kind });
    }
    narrow(kind, raw).ok_or(ArithmeticError::Overflow { kind })
}

/// Clamp `raw` into the representable range of `kind`.
fn saturate(kind: NumberKind, raw: BigInt) -> Result<NumberValue, ArithmeticError> {
    let mut raw = raw;
    if kind == NumberKind::UInt && raw.is_negative() {
        raw = BigInt::zero();
    }
    if let Some(min) = min_raw(kind).filter(|min| raw < *min) {
        raw = min;
    }
    if let Some(max) = max_raw(kind).filter(|max| raw > *max) {
        raw = max;
    }
    narrow(kind, raw).ok_or(ArithmeticError::Overflow { kind })
}

/// Two's complement truncation of `raw` to the width of `kind`.
fn wrap(kind: NumberKind, raw: BigInt) -> Result<NumberValue, ArithmeticError> {
    let Some(bits) = kind.bits() else {
        return in_range(kind, raw);
    };
    let modulus = BigInt::one() << bits;
    let mut raw = ((raw % &modulus) + &modulus) % &modulus;
    if kind.is_signed() && raw >= (BigInt::one() << (bits - 1)) {
        raw -= modulus;
    }
    narrow(kind, raw).ok_or(ArithmeticError::Overflow { kind })
}

fn narrow(kind: NumberKind, raw: BigInt) -> Option<NumberValue> {
    Some(match kind {
        NumberKind::Int => NumberValue::Int(raw),
        NumberKind::UInt => NumberValue::UInt(raw),
        NumberKind::Int256 => NumberValue::Int256(raw),
        NumberKind::UInt256 => NumberValue::UInt256(raw),
        NumberKind::Int8 => NumberValue::Int8(raw.to_i8()?),
        NumberKind::Int16 => NumberValue::Int16(raw.to_i16()?),
        NumberKind::Int32 => NumberValue::Int32(raw.to_i32()?),
        NumberKind::Int64 => NumberValue::Int64(raw.to_i64()?),
        NumberKind::Int128 => NumberValue::Int128(raw.to_i128()?),
        NumberKind::UInt8 => NumberValue::UInt8(raw.to_u8()?),
        NumberKind::UInt16 => NumberValue::UInt16(raw.to_u16()?),
        NumberKind::UInt32 => NumberValue::UInt32(raw.to_u32()?),
        NumberKind::UInt64 => NumberValue::UInt64(raw.to_u64()?),
        NumberKind::UInt128 => NumberValue::UInt128(raw.to_u128()?),
        NumberKind::Word8 => NumberValue::Word8(raw.to_u8()?),
        NumberKind::Word16 => NumberValue::Word16(raw.to_u16()?),
        NumberKind::Word32 => NumberValue::Word32(raw.to_u32()?),
        NumberKind::Word64 => NumberValue::Word64(raw.to_u64()?),
        NumberKind::Fix64 => NumberValue::Fix64(raw.to_i64()?),
        NumberKind::UFix64 => NumberValue::UFix64(raw.to_u64()?),
    })
}

// ============================================================================
// Arithmetic
// ============================================================================

impl NumberValue {
    pub fn add(&self, other: &NumberValue, meter: &Meter<'_>) -> Result<NumberValue, ExecutionError> {
        self.binary(other, Operation::Add, Mode::Checked, meter)
    }

    pub fn subtract(
        &self,
        other: &NumberValue,
        meter: &Meter<'_>,
    ) -> Result<NumberValue, ExecutionError> {
        self.binary(other, Operation::Subtract, Mode::Checked, meter)
    }

    pub fn multiply(
        &self,
        other: &NumberValue,
        meter: &Meter<'_>,
    ) -> Result<NumberValue, ExecutionError> {
        self.binary(other, Operation::Multiply, Mode::Checked, meter)
    }

    pub fn divide(
        &self,
        other: &NumberValue,
        meter: &Meter<'_>,
    ) -> Result<NumberValue, ExecutionError> {
        self.binary(other, Operation::Divide, Mode::Checked, meter)
    }

    /// Truncated remainder; the sign follows the dividend.
    ///
    /// For fixed-point kinds this is `a - trunc(a / b) * b`, evaluated as four
    /// separately allocated steps.
    pub fn modulo(
        &self,
        other: &NumberValue,
        meter: &Meter<'_>,
    ) -> Result<NumberValue, ExecutionError> {
        if self.kind().is_fixed_point() {
            return self.fixed_point_modulo(other, meter);
        }
        self.binary(other, Operation::Modulo, Mode::Checked, meter)
    }

    pub fn bitwise_or(
        &self,
        other: &NumberValue,
        meter: &Meter<'_>,
    ) -> Result<NumberValue, ExecutionError> {
        self.binary(other, Operation::BitwiseOr, Mode::Checked, meter)
    }

    pub fn bitwise_xor(
        &self,
        other: &NumberValue,
        meter: &Meter<'_>,
    ) -> Result<NumberValue, ExecutionError> {
        self.binary(other, Operation::BitwiseXor, Mode::Checked, meter)
    }

    pub fn bitwise_and(
        &self,
        other: &NumberValue,
        meter: &Meter<'_>,
    ) -> Result<NumberValue, ExecutionError> {
        self.binary(other, Operation::BitwiseAnd, Mode::Checked, meter)
    }

    pub fn shift_left(
        &self,
        other: &NumberValue,
        meter: &Meter<'_>,
    ) -> Result<NumberValue, ExecutionError> {
        self.binary(other, Operation::ShiftLeft, Mode::Checked, meter)
    }

    pub fn shift_right(
        &self,
        other: &NumberValue,
        meter: &Meter<'_>,
    ) -> Result<NumberValue, ExecutionError> {
        self.binary(other, Operation::ShiftRight, Mode::Checked, meter)
    }

    pub fn saturating_add(
        &self,
        other: &NumberValue,
        meter: &Meter<'_>,
    ) -> Result<NumberValue, ExecutionError> {
        self.binary(other, Operation::Add, Mode::Saturating, meter)
    }

    pub fn saturating_subtract(
        &self,
        other: &NumberValue,
        meter: &Meter<'_>,
    ) -> Result<NumberValue, ExecutionError> {
        self.binary(other, Operation::Subtract, Mode::Saturating, meter)
    }

    pub fn saturating_multiply(
        &self,
        other: &NumberValue,
        meter: &Meter<'_>,
    ) -> Result<NumberValue, ExecutionError> {
        self.binary(other, Operation::Multiply, Mode::Saturating, meter)
    }

    /// Division that clamps the single overflowing case, `MIN / -1`.
    /// Only signed kinds have it.
    pub fn saturating_divide(
        &self,
        other: &NumberValue,
        meter: &Meter<'_>,
    ) -> Result<NumberValue, ExecutionError> {
        let kind = self.kind();
        if !kind.is_signed() {
            return Err(InternalError::UnsupportedOperation {
                operation: "saturating division",
                kind: kind.to_string(),
            }
            .into());
        }
        self.binary(other, Operation::Divide, Mode::Saturating, meter)
    }

    pub fn negate(&self, meter: &Meter<'_>) -> Result<NumberValue, ExecutionError> {
        let kind = self.kind();
        if !kind.is_signed() {
            return Err(InternalError::UnsupportedOperation {
                operation: "negation",
                kind: kind.to_string(),
            }
            .into());
        }
        meter.report(kind.memory_kind(), self.metered_size())?;
        Ok(in_range(kind, -self.to_bigint())?)
    }

    pub fn compare(&self, other: &NumberValue) -> Ordering {
        match (self, other) {
            (NumberValue::Int8(a), NumberValue::Int8(b)) => a.cmp(b),
            (NumberValue::Int64(a), NumberValue::Int64(b)) => a.cmp(b),
            (NumberValue::UInt64(a), NumberValue::UInt64(b)) => a.cmp(b),
            (NumberValue::Fix64(a), NumberValue::Fix64(b)) => a.cmp(b),
            (NumberValue::UFix64(a), NumberValue::UFix64(b)) => a.cmp(b),
            _ => self.to_bigint().cmp(&other.to_bigint()),
        }
    }

    /// Convert to `target`, failing when the value is out of its range.
    /// Fixed-point to integer conversion truncates the fraction.
    pub fn convert(
        &self,
        target: NumberKind,
        meter: &Meter<'_>,
    ) -> Result<NumberValue, ExecutionError> {
        let raw = self.to_bigint();
        let raw = match (self.kind().is_fixed_point(), target.is_fixed_point()) {
            (false, true) => raw * FIX64_FACTOR,
            (true, false) => raw / FIX64_FACTOR,
            _ => raw,
        };
        let value = in_range(target, raw)?;
        Ok(value.metered(meter)?)
    }

    fn result_size(&self, other: &NumberValue, operation: Operation) -> u64 {
        match self.kind().byte_size() {
            Some(size) => size,
            None if operation.widens() => self.metered_size() + other.metered_size(),
            None => self.metered_size().max(other.metered_size()),
        }
    }

    fn binary(
        &self,
        other: &NumberValue,
        operation: Operation,
        mode: Mode,
        meter: &Meter<'_>,
    ) -> Result<NumberValue, ExecutionError> {
        let kind = self.kind();
        if other.kind() != kind {
            return Err(InternalError::UnexpectedValue {
                expected: kind.to_string(),
                found: other.kind().to_string(),
            }
            .into());
        }
        let unsupported = (kind.is_fixed_point() && operation.is_bitwise())
            || (kind.is_word() && mode == Mode::Saturating);
        if unsupported {
            return Err(InternalError::UnsupportedOperation {
                operation: operation.name(),
                kind: kind.to_string(),
            }
            .into());
        }

        let size = match operation {
            Operation::ShiftLeft if kind.bits().is_none() => {
                let amount = shift_amount(kind, &other.to_bigint())?;
                self.result_size(other, operation)
                    .max(shifted_size(&self.to_bigint(), amount))
            }
            _ => self.result_size(other, operation),
        };
        meter.report(kind.memory_kind(), size)?;

        let a = self.to_bigint();
        let b = other.to_bigint();
        let raw = match operation {
            Operation::Add => a + b,
            Operation::Subtract => a - b,
            Operation::Multiply if kind.is_fixed_point() => (a * b) / FIX64_FACTOR,
            Operation::Multiply => a * b,
            Operation::Divide | Operation::Modulo if b.is_zero() => {
                return Err(ArithmeticError::DivisionByZero.into());
            }
            Operation::Divide if kind.is_fixed_point() => (a * FIX64_FACTOR) / b,
            Operation::Divide => a / b,
            Operation::Modulo => a % b,
            Operation::BitwiseOr => a | b,
            Operation::BitwiseXor => a ^ b,
            Operation::BitwiseAnd => a & b,
            Operation::ShiftLeft => {
                let amount = shift_amount(kind, &b)?;
                match kind.bits() {
                    Some(bits) if amount >= bits as usize => BigInt::zero(),
                    _ => a << amount,
                }
            }
            Operation::ShiftRight => a >> shift_amount(kind, &b)?,
        };

        let bounded_shift = operation == Operation::ShiftLeft && kind.bits().is_some();
        let result = if kind.is_word() || bounded_shift {
            wrap(kind, raw)
        } else {
            match mode {
                Mode::Checked => in_range(kind, raw),
                Mode::Saturating => saturate(kind, raw),
            }
        };
        Ok(result?)
    }

    fn fixed_point_modulo(
        &self,
        other: &NumberValue,
        meter: &Meter<'_>,
    ) -> Result<NumberValue, ExecutionError> {
        let quotient = self.divide(other, meter)?;
        let truncated = quotient.truncate(meter)?;
        let product = truncated.multiply(other, meter)?;
        self.subtract(&product, meter)
    }

    /// Drop the fractional part of a fixed-point value.
    fn truncate(&self, meter: &Meter<'_>) -> Result<NumberValue, ExecutionError> {
        let kind = self.kind();
        meter.report(kind.memory_kind(), self.metered_size())?;
        let raw = (self.to_bigint() / FIX64_FACTOR) * FIX64_FACTOR;
        Ok(in_range(kind, raw)?)
    }
}

fn shift_amount(kind: NumberKind, amount: &BigInt) -> Result<usize, ArithmeticError> {
    if amount.is_negative() {
        return Err(ArithmeticError::NegativeShift);
    }
    amount.to_usize().ok_or(ArithmeticError::Overflow { kind })
}

impl fmt::Display for NumberValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberValue::Fix64(_) | NumberValue::UFix64(_) => {
                let raw = self.to_bigint();
                let sign = if raw.is_negative() { "-" } else { "" };
                let magnitude = raw.abs();
                let integer = &magnitude / FIX64_FACTOR;
                let fraction = &magnitude % FIX64_FACTOR;
                write!(
                    f,
                    "{}{}.{:0>width$}",
                    sign,
                    integer,
                    fraction.to_string(),
                    width = FIX64_SCALE as usize
                )
            }
            _ => write!(f, "{}", self.to_bigint()),
        }
    }
}

#[cfg(test)]
#[path = "number_test.rs"]
mod number_test;
