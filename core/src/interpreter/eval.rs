//! Expression evaluation.

use super::invocation::unexpected;
use super::{ExecutionError, InternalError, Interpreter, OwnershipError, RuntimeError};
use crate::ast::{CastKind, Expr};
use crate::scope_stack::{Liveness, Scope, Slot};
use crate::types::StaticType;
use crate::values::{
    Address, ArrayValue, DictionaryKey, DictionaryValue, EphemeralReference, FunctionValue,
    InterpretedFunction, NumberValue, ReferenceValue, ResourceState, Value,
};
use indexmap::IndexMap;

/// Target used to box the result of optional chaining once.
const OPTIONAL: StaticType<'static> = StaticType::Optional(&StaticType::AnyStruct);

impl<'a> Interpreter<'a> {
    pub(super) fn eval_expr(
        &mut self,
        expr: &'a Expr<'a>,
        scope: &Scope<'a>,
    ) -> Result<Value<'a>, ExecutionError> {
        match *expr {
            Expr::Bool(value) => Ok(Value::new_bool(&self.meter, value)?),
            Expr::Nil => Ok(Value::new_nil(&self.meter)?),
            Expr::Integer { literal, kind } => Ok(Value::Number(NumberValue::from_literal(
                literal,
                kind,
                &self.meter,
            )?)),
            Expr::FixedPoint { literal, kind } => Ok(Value::Number(
                NumberValue::from_fixed_literal(literal, kind, &self.meter)?,
            )),
            Expr::String(text) => Ok(Value::new_string(&self.meter, text)?),
            // Metered with the literal text when the program was built.
            Expr::Character(text) => Ok(Value::Character(text.into())),
            Expr::Address(address) => {
                Ok(Value::new_address(&self.meter, Address::from_u64(address))?)
            }
            Expr::Path { domain, identifier } => {
                Ok(Value::new_path(&self.meter, domain, identifier)?)
            }
            Expr::Array { elements, ty } => self.eval_array(elements, ty, scope),
            Expr::Dictionary { entries, ty } => self.eval_dictionary(entries, ty, scope),

            Expr::Identifier(name) => match self.lookup(scope, name)?.slot() {
                Slot::Value(value) => {
                    self.check_live(&value)?;
                    Ok(value)
                }
                Slot::Moved => Err(OwnershipError::UseAfterMove {
                    name: name.to_string(),
                }
                .into()),
            },
            Expr::Move(inner) => self.eval_move(inner, scope),

            Expr::Member {
                target,
                name,
                optional,
            } => {
                if let Expr::Identifier(type_name) = *target {
                    if let Some(case) = self.enum_case(type_name, name, scope) {
                        return Ok(case);
                    }
                }
                let value = self.eval_expr(target, scope)?;
                if !optional {
                    return self.get_member(value, name);
                }
                match value {
                    Value::Nil => Ok(Value::Nil),
                    Value::Some(inner) => {
                        let member = self.get_member(*inner, name)?;
                        Ok(member.into_optional(&OPTIONAL, &self.meter)?)
                    }
                    other => self.get_member(other, name),
                }
            }

            Expr::Index { target, index } => {
                let container = self.eval_expr(target, scope)?;
                let index = self.eval_expr(index, scope)?;
                self.get_index(container, index)
            }

            Expr::Invocation {
                callee,
                type_arguments,
                arguments,
            } => {
                let function = match self.eval_expr(callee, scope)? {
                    Value::Function(function) => function,
                    other => return Err(unexpected("function", &other)),
                };
                // Host functions decide themselves which arguments to copy.
                let transfers = !matches!(function, FunctionValue::Host(_));
                let mut values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    let value = self.eval_expr(argument.value, scope)?;
                    values.push(if transfers {
                        value.transfer(&self.meter)?
                    } else {
                        value
                    });
                }
                self.invoke_function(&function, values, type_arguments)
            }

            Expr::Unary { op, operand } => {
                let operand = self.eval_expr(operand, scope)?;
                self.eval_unary(op, operand)
            }
            Expr::Binary { op, left, right } => self.eval_binary(op, left, right, scope),

            Expr::Conditional {
                test,
                then,
                otherwise,
            } => {
                if self.eval_bool(test, scope)? {
                    self.eval_expr(then, scope)
                } else {
                    self.eval_expr(otherwise, scope)
                }
            }

            Expr::Function(function) => {
                let function = InterpretedFunction::new(&self.meter, None, function, scope.clone())?;
                Ok(Value::Function(FunctionValue::Interpreted(function)))
            }

            Expr::Cast { expr, kind, ty } => {
                let value = self.eval_expr(expr, scope)?;
                match kind {
                    CastKind::Static => Ok(value.into_optional(&ty, &self.meter)?),
                    CastKind::Failable if value.conforms_to(&ty) => {
                        Ok(Value::new_some(&self.meter, value)?)
                    }
                    CastKind::Failable => Ok(Value::Nil),
                    CastKind::Force if value.conforms_to(&ty) => Ok(value),
                    CastKind::Force => Err(RuntimeError::ForceCastFailed {
                        expected: ty.to_string(),
                        actual: value.type_name(),
                    }
                    .into()),
                }
            }

            Expr::Force(inner) => match self.eval_expr(inner, scope)? {
                Value::Some(value) => Ok(*value),
                Value::Nil => Err(RuntimeError::ForceNil.into()),
                other => Ok(other),
            },

            Expr::Create(invocation) => self.eval_expr(invocation, scope),

            Expr::Destroy(inner) => {
                let value = match *inner {
                    // Destroying leaves the dead value in place for later checks.
                    Expr::Identifier(name) => match self.lookup(scope, name)?.slot() {
                        Slot::Value(value) => value,
                        Slot::Moved => {
                            return Err(OwnershipError::UseAfterMove {
                                name: name.to_string(),
                            }
                            .into());
                        }
                    },
                    _ => self.eval_expr(inner, scope)?,
                };
                self.destroy(value)?;
                Ok(Value::Void)
            }

            Expr::Reference { expr, ty } => self.eval_reference(expr, ty, scope),
        }
    }

    /// Evaluate an expression whose value is moved out of its slot.
    pub(super) fn eval_move(
        &mut self,
        expr: &'a Expr<'a>,
        scope: &Scope<'a>,
    ) -> Result<Value<'a>, ExecutionError> {
        match *expr {
            Expr::Move(inner) => self.eval_move(inner, scope),
            Expr::Identifier(name) => {
                let variable = self.lookup(scope, name)?;
                match variable.take() {
                    Slot::Value(value) => {
                        if let Err(error) = self.check_live(&value) {
                            variable.set(value);
                            return Err(error);
                        }
                        value.set_resource_state(ResourceState::InTransit);
                        Ok(value)
                    }
                    Slot::Moved => Err(OwnershipError::UseAfterMove {
                        name: name.to_string(),
                    }
                    .into()),
                }
            }
            Expr::Member {
                target,
                name,
                optional: false,
            } => {
                let container = self.eval_expr(target, scope)?;
                match self.deref_value(container)? {
                    Value::Composite(composite) => {
                        self.check_live(&Value::Composite(composite.clone()))?;
                        let value = composite.set_field(name, Value::Nil).unwrap_or(Value::Nil);
                        value.set_resource_state(ResourceState::InTransit);
                        Ok(value)
                    }
                    other => Err(unexpected("composite", &other)),
                }
            }
            _ => self.eval_expr(expr, scope),
        }
    }

    pub(super) fn eval_bool(
        &mut self,
        expr: &'a Expr<'a>,
        scope: &Scope<'a>,
    ) -> Result<bool, ExecutionError> {
        match self.eval_expr(expr, scope)? {
            Value::Bool(value) => Ok(value),
            other => Err(unexpected("Bool", &other)),
        }
    }

    fn eval_array(
        &mut self,
        elements: &'a [&'a Expr<'a>],
        ty: StaticType<'a>,
        scope: &Scope<'a>,
    ) -> Result<Value<'a>, ExecutionError> {
        let element_type = ty.element_type().copied().unwrap_or(StaticType::AnyStruct);
        let mut values = Vec::with_capacity(elements.len());
        for element in elements {
            let value = self
                .eval_expr(element, scope)?
                .transfer(&self.meter)?
                .into_optional(&element_type, &self.meter)?;
            value.meter_dynamic_type(&self.meter)?;
            self.claim(&value)?;
            // The new array stores its own transfer of each element.
            values.push(value.transfer(&self.meter)?);
        }
        Ok(Value::Array(ArrayValue::new(&self.meter, ty, values)?))
    }

    fn eval_dictionary(
        &mut self,
        entries: &'a [(&'a Expr<'a>, &'a Expr<'a>)],
        ty: StaticType<'a>,
        scope: &Scope<'a>,
    ) -> Result<Value<'a>, ExecutionError> {
        let value_type = match ty {
            StaticType::Dictionary { value, .. } => *value,
            _ => StaticType::AnyStruct,
        };
        let mut map = IndexMap::with_capacity(entries.len());
        for (key, value) in entries {
            let key = self.eval_expr(key, scope)?;
            let value = self
                .eval_expr(value, scope)?
                .transfer(&self.meter)?
                .into_optional(&value_type, &self.meter)?;
            value.meter_dynamic_type(&self.meter)?;
            self.claim(&value)?;
            let value = value.transfer(&self.meter)?;
            if let Some(previous) = map.insert(DictionaryKey(key), value) {
                self.release(Some(previous))?;
            }
        }
        Ok(Value::Dictionary(DictionaryValue::new(&self.meter, ty, map)?))
    }

    fn eval_reference(
        &mut self,
        expr: &'a Expr<'a>,
        ty: StaticType<'a>,
        scope: &Scope<'a>,
    ) -> Result<Value<'a>, ExecutionError> {
        let (optional, reference_type) = match ty {
            StaticType::Optional(inner) => (true, *inner),
            other => (false, other),
        };
        let StaticType::Reference {
            authorized,
            referenced,
        } = reference_type
        else {
            return Err(InternalError::UnexpectedValue {
                expected: "reference type".to_string(),
                found: ty.to_string(),
            }
            .into());
        };

        let value = match self.eval_expr(expr, scope)? {
            Value::Nil if optional => return Ok(Value::Nil),
            Value::Some(inner) if optional => *inner,
            value => value,
        };
        let origin = reference_origin(expr, scope);
        let reference = EphemeralReference::new(&self.meter, value, authorized, *referenced, origin)?;
        let reference = Value::Reference(ReferenceValue::Ephemeral(reference));
        if optional {
            Ok(Value::new_some(&self.meter, reference)?)
        } else {
            Ok(reference)
        }
    }

    /// `E.case` where `E` names a declared enum.
    fn enum_case(&self, type_name: &str, case: &str, scope: &Scope<'a>) -> Option<Value<'a>> {
        let is_constructor = match scope.lookup(type_name)?.slot() {
            Slot::Value(Value::Function(FunctionValue::Host(host))) => host.name == type_name,
            _ => false,
        };
        if !is_constructor {
            return None;
        }
        self.composite_type(type_name)?.cases.get(case).cloned()
    }
}

/// Liveness of the variable at the root of a reference expression.
fn reference_origin<'a>(expr: &'a Expr<'a>, scope: &Scope<'a>) -> Option<(Liveness, &'a str)> {
    match *expr {
        Expr::Identifier(name) => {
            let variable = scope.lookup(name)?;
            Some((variable.liveness().clone(), name))
        }
        Expr::Member { target, .. } | Expr::Index { target, .. } => reference_origin(target, scope),
        Expr::Force(inner) => reference_origin(inner, scope),
        _ => None,
    }
}
