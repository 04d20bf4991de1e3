//! Function invocation.

use super::{
    CompositeType, ControlFlow, ExecutionError, HostError, InternalError, Interpreter,
    ResourceExceededError,
};
use crate::ast::{FunctionExpr, Span};
use crate::memory::{MemoryKind, Meter};
use crate::scope_stack::{Binding, Scope};
use crate::types::StaticType;
use crate::values::{
    CompositeValue, FunctionValue, InterpretedFunction, NumberValue, PathValue, ResourceState,
    Value,
};
use indexmap::IndexMap;
use std::rc::Rc;
use tracing::debug;

/// Context passed to a host function.
pub struct Invocation<'i, 'a> {
    pub interpreter: &'i mut Interpreter<'a>,
    pub function: &'a str,
    pub arguments: Vec<Value<'a>>,
    pub type_arguments: &'a [StaticType<'a>],
    /// The value the function was accessed on, for member functions.
    pub receiver: Option<Value<'a>>,
    pub span: Span,
}

impl<'i, 'a> Invocation<'i, 'a> {
    pub fn meter(&self) -> &Meter<'a> {
        &self.interpreter.meter
    }

    pub fn argument(&self, index: usize) -> Result<&Value<'a>, ExecutionError> {
        self.arguments.get(index).ok_or_else(|| {
            InternalError::ArgumentCount {
                expected: index + 1,
                actual: self.arguments.len(),
            }
            .into()
        })
    }

    /// Take ownership of an argument, leaving `Void` in its place.
    pub fn take_argument(&mut self, index: usize) -> Result<Value<'a>, ExecutionError> {
        self.argument(index)?;
        Ok(core::mem::replace(&mut self.arguments[index], Value::Void))
    }

    pub fn bool_argument(&self, index: usize) -> Result<bool, ExecutionError> {
        match self.argument(index)? {
            Value::Bool(b) => Ok(*b),
            other => Err(unexpected("Bool", other)),
        }
    }

    pub fn number_argument(&self, index: usize) -> Result<&NumberValue, ExecutionError> {
        match self.argument(index)? {
            Value::Number(n) => Ok(n),
            other => Err(unexpected("number", other)),
        }
    }

    pub fn string_argument(&self, index: usize) -> Result<Rc<str>, ExecutionError> {
        match self.argument(index)? {
            Value::String(s) => Ok(s.clone()),
            other => Err(unexpected("String", other)),
        }
    }

    pub fn path_argument(&self, index: usize) -> Result<PathValue, ExecutionError> {
        match self.argument(index)? {
            Value::Path(p) => Ok(p.clone()),
            other => Err(unexpected("path", other)),
        }
    }

    pub fn index_argument(&self, index: usize) -> Result<usize, ExecutionError> {
        let number = self.number_argument(index)?;
        number.to_index().ok_or_else(|| {
            InternalError::UnexpectedValue {
                expected: "index".to_string(),
                found: number.to_string(),
            }
            .into()
        })
    }

    pub fn type_argument(&self, index: usize) -> Result<StaticType<'a>, ExecutionError> {
        self.type_arguments.get(index).copied().ok_or_else(|| {
            InternalError::ArgumentCount {
                expected: index + 1,
                actual: self.type_arguments.len(),
            }
            .into()
        })
    }

    pub fn receiver(&self) -> Result<Value<'a>, ExecutionError> {
        self.receiver.clone().ok_or_else(|| {
            InternalError::UnexpectedValue {
                expected: "receiver".to_string(),
                found: "none".to_string(),
            }
            .into()
        })
    }

    /// A host error attributed to this function.
    pub fn error(&self, message: impl Into<String>) -> ExecutionError {
        HostError {
            function: self.function.to_string(),
            message: message.into(),
        }
        .into()
    }
}

pub(super) fn unexpected(expected: &str, found: &Value<'_>) -> ExecutionError {
    InternalError::UnexpectedValue {
        expected: expected.to_string(),
        found: found.type_name(),
    }
    .into()
}

impl<'a> Interpreter<'a> {
    fn enter(&mut self) -> Result<(), ExecutionError> {
        if self.depth >= self.options.max_depth {
            return Err(ResourceExceededError::StackOverflow {
                depth: self.depth + 1,
                max_depth: self.options.max_depth,
            }
            .into());
        }
        self.depth += 1;
        Ok(())
    }

    /// Invoke any function value with already evaluated arguments.
    pub(crate) fn invoke_function(
        &mut self,
        function: &FunctionValue<'a>,
        arguments: Vec<Value<'a>>,
        type_arguments: &'a [StaticType<'a>],
    ) -> Result<Value<'a>, ExecutionError> {
        self.enter()?;
        let result = match function {
            FunctionValue::Interpreted(function) => self.call_interpreted(function, None, arguments),
            FunctionValue::Bound(bound) => {
                if bound.receiver.state() == ResourceState::Destroyed {
                    Err(self.destroyed_error(&Value::Composite(bound.receiver.clone())))
                } else {
                    self.call_interpreted(&bound.method, Some(bound.receiver.clone()), arguments)
                }
            }
            FunctionValue::Host(host) => {
                let host = host.clone();
                let span = self.span;
                let mut invocation = Invocation {
                    interpreter: self,
                    function: host.name,
                    arguments,
                    type_arguments,
                    receiver: host.receiver.clone(),
                    span,
                };
                (host.function)(&mut invocation)
            }
        };
        self.depth -= 1;
        result
    }

    /// Run an interpreted function, binding `receiver` as `self`.
    pub(crate) fn call_interpreted(
        &mut self,
        function: &Rc<InterpretedFunction<'a>>,
        receiver: Option<Rc<CompositeValue<'a>>>,
        arguments: Vec<Value<'a>>,
    ) -> Result<Value<'a>, ExecutionError> {
        let expr = function.function;
        if expr.parameters.len() != arguments.len() {
            return Err(InternalError::ArgumentCount {
                expected: expr.parameters.len(),
                actual: arguments.len(),
            }
            .into());
        }
        debug!(function = function.name.unwrap_or("<closure>"), "call");

        let scope = function.scope.push();
        let body = self
            .bind_arguments(&scope, expr, receiver, arguments)
            .and_then(|()| self.execute_statements(expr.body.statements, &scope));

        let flow = match body {
            Ok(flow) => flow,
            Err(error) => {
                scope.exit();
                return Err(error);
            }
        };
        let value = match flow {
            ControlFlow::Return(value) => value,
            ControlFlow::Normal => Value::new_void(&self.meter)?,
            ControlFlow::Break | ControlFlow::Continue => {
                scope.exit();
                return Err(flow.misplaced("function body").into());
            }
        };
        self.exit_scope(&scope)?;
        Ok(value.into_optional(&expr.return_type, &self.meter)?)
    }

    fn bind_arguments(
        &mut self,
        scope: &Scope<'a>,
        function: &'a FunctionExpr<'a>,
        receiver: Option<Rc<CompositeValue<'a>>>,
        arguments: Vec<Value<'a>>,
    ) -> Result<(), ExecutionError> {
        if let Some(receiver) = receiver {
            let binding = Binding {
                owns_value: false,
                ..Binding::default()
            };
            self.bind(scope, "self", Value::Composite(receiver), binding)?;
        }
        for (parameter, argument) in function.parameters.iter().zip(arguments) {
            let value = argument.into_optional(&parameter.ty, &self.meter)?;
            let binding = Binding {
                ty: Some(parameter.ty),
                ..Binding::default()
            };
            self.bind(scope, parameter.name, value, binding)?;
        }
        Ok(())
    }

    /// Create an instance of a declared composite and run its initializer.
    pub(crate) fn construct(
        &mut self,
        ty: &CompositeType<'a>,
        arguments: Vec<Value<'a>>,
    ) -> Result<Value<'a>, ExecutionError> {
        let declaration = ty.declaration;
        let arguments = arguments
            .into_iter()
            .map(|argument| argument.transfer(&self.meter))
            .collect::<Result<Vec<_>, _>>()?;
        let composite =
            CompositeValue::new(&self.meter, declaration.name, declaration.kind, IndexMap::new())?;
        match &ty.initializer {
            Some(initializer) => {
                let result = self.call_interpreted(initializer, Some(composite.clone()), arguments)?;
                if !matches!(result, Value::Void) {
                    return Err(unexpected("Void", &result));
                }
            }
            None => {
                if arguments.len() > declaration.fields.len() {
                    return Err(InternalError::ArgumentCount {
                        expected: declaration.fields.len(),
                        actual: arguments.len(),
                    }
                    .into());
                }
                for (field, argument) in declaration.fields.iter().zip(arguments) {
                    let value = argument.into_optional(&field.ty, &self.meter)?;
                    self.claim(&value)?;
                    composite.set_field(field.name, value);
                }
            }
        }
        Ok(Value::Composite(composite))
    }

    /// The meter, for reporting a bare allocation.
    pub(crate) fn report(&self, kind: MemoryKind, amount: u64) -> Result<(), ExecutionError> {
        Ok(self.meter.report(kind, amount)?)
    }
}
