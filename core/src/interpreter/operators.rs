//! Unary and binary operators.

use super::invocation::unexpected;
use super::{ExecutionError, InternalError, Interpreter};
use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::memory::Meter;
use crate::scope_stack::Scope;
use crate::values::{NumberValue, Value};
use core::cmp::Ordering;

pub(super) type NumberOperation =
    fn(&NumberValue, &NumberValue, &Meter<'_>) -> Result<NumberValue, ExecutionError>;

impl<'a> Interpreter<'a> {
    pub(super) fn eval_unary(
        &mut self,
        op: UnaryOp,
        operand: Value<'a>,
    ) -> Result<Value<'a>, ExecutionError> {
        match (op, operand) {
            (UnaryOp::Negate, Value::Number(n)) => Ok(Value::Number(n.negate(&self.meter)?)),
            (UnaryOp::Not, Value::Bool(b)) => Ok(Value::new_bool(&self.meter, !b)?),
            (UnaryOp::Negate, other) => Err(unexpected("number", &other)),
            (UnaryOp::Not, other) => Err(unexpected("Bool", &other)),
        }
    }

    pub(super) fn eval_binary(
        &mut self,
        op: BinaryOp,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
        scope: &Scope<'a>,
    ) -> Result<Value<'a>, ExecutionError> {
        // Short-circuiting operators evaluate the right side on demand.
        match op {
            BinaryOp::And => {
                if !self.eval_bool(left, scope)? {
                    return Ok(Value::new_bool(&self.meter, false)?);
                }
                let right = self.eval_bool(right, scope)?;
                return Ok(Value::new_bool(&self.meter, right)?);
            }
            BinaryOp::Or => {
                if self.eval_bool(left, scope)? {
                    return Ok(Value::new_bool(&self.meter, true)?);
                }
                let right = self.eval_bool(right, scope)?;
                return Ok(Value::new_bool(&self.meter, right)?);
            }
            BinaryOp::NilCoalesce => {
                return match self.eval_expr(left, scope)? {
                    Value::Nil => self.eval_expr(right, scope),
                    Value::Some(value) => Ok(*value),
                    other => Ok(other),
                };
            }
            _ => {}
        }

        let left = self.eval_expr(left, scope)?;
        let right = self.eval_expr(right, scope)?;
        match op {
            BinaryOp::Equal => Ok(Value::new_bool(&self.meter, left.equals(&right))?),
            BinaryOp::NotEqual => Ok(Value::new_bool(&self.meter, !left.equals(&right))?),
            BinaryOp::Less => self.compare(op, &left, &right, |o| o == Ordering::Less),
            BinaryOp::LessEqual => self.compare(op, &left, &right, |o| o != Ordering::Greater),
            BinaryOp::Greater => self.compare(op, &left, &right, |o| o == Ordering::Greater),
            BinaryOp::GreaterEqual => self.compare(op, &left, &right, |o| o != Ordering::Less),
            _ => {
                let operation: NumberOperation = match op {
                    BinaryOp::Add => NumberValue::add,
                    BinaryOp::Subtract => NumberValue::subtract,
                    BinaryOp::Multiply => NumberValue::multiply,
                    BinaryOp::Divide => NumberValue::divide,
                    BinaryOp::Modulo => NumberValue::modulo,
                    BinaryOp::BitwiseOr => NumberValue::bitwise_or,
                    BinaryOp::BitwiseXor => NumberValue::bitwise_xor,
                    BinaryOp::BitwiseAnd => NumberValue::bitwise_and,
                    BinaryOp::ShiftLeft => NumberValue::shift_left,
                    BinaryOp::ShiftRight => NumberValue::shift_right,
                    _ => return Err(unsupported(op, &left)),
                };
                match (&left, &right) {
                    (Value::Number(a), Value::Number(b)) => {
                        Ok(Value::Number(operation(a, b, &self.meter)?))
                    }
                    _ => Err(unsupported(op, &left)),
                }
            }
        }
    }

    fn compare(
        &self,
        op: BinaryOp,
        left: &Value<'a>,
        right: &Value<'a>,
        test: impl FnOnce(Ordering) -> bool,
    ) -> Result<Value<'a>, ExecutionError> {
        let ordering = match (left, right) {
            (Value::Number(a), Value::Number(b)) => a.compare(b),
            (Value::String(a), Value::String(b)) | (Value::Character(a), Value::Character(b)) => {
                a.cmp(b)
            }
            _ => return Err(unsupported(op, left)),
        };
        Ok(Value::new_bool(&self.meter, test(ordering))?)
    }
}

fn unsupported(op: BinaryOp, operand: &Value<'_>) -> ExecutionError {
    InternalError::UnsupportedOperation {
        operation: op.symbol(),
        kind: operand.type_name(),
    }
    .into()
}
