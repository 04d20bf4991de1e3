use super::{CompositeValue, Value};
use crate::ast::FunctionExpr;
use crate::interpreter::{ExecutionError, Invocation};
use crate::memory::{MemoryKind, MemoryLimitExceeded, Meter};
use crate::scope_stack::Scope;
use core::fmt;
use std::rc::Rc;

/// Native implementation of a host function.
pub type HostFn<'a> =
    Rc<dyn Fn(&mut Invocation<'_, 'a>) -> Result<Value<'a>, ExecutionError> + 'a>;

/// Box a closure as a [`HostFn`], fixing its signature for inference.
pub fn host_fn<'a, F>(function: F) -> HostFn<'a>
where
    F: Fn(&mut Invocation<'_, 'a>) -> Result<Value<'a>, ExecutionError> + 'a,
{
    Rc::new(function)
}

/// A function value. The three shapes are metered and invoked differently.
#[derive(Clone)]
pub enum FunctionValue<'a> {
    Interpreted(Rc<InterpretedFunction<'a>>),
    Host(Rc<HostFunction<'a>>),
    Bound(Rc<BoundFunction<'a>>),
}

impl<'a> FunctionValue<'a> {
    pub fn name(&self) -> &str {
        match self {
            FunctionValue::Interpreted(f) => f.name.unwrap_or("<closure>"),
            FunctionValue::Host(f) => f.name,
            FunctionValue::Bound(f) => f.method.name.unwrap_or("<method>"),
        }
    }
}

/// A declared function or closure, closing over its defining scope.
pub struct InterpretedFunction<'a> {
    pub name: Option<&'a str>,
    pub function: &'a FunctionExpr<'a>,
    pub scope: Scope<'a>,
}

impl<'a> InterpretedFunction<'a> {
    pub fn new(
        meter: &Meter<'_>,
        name: Option<&'a str>,
        function: &'a FunctionExpr<'a>,
        scope: Scope<'a>,
    ) -> Result<Rc<Self>, MemoryLimitExceeded> {
        meter.report(MemoryKind::InterpretedFunction, 1)?;
        Ok(Rc::new(Self {
            name,
            function,
            scope,
        }))
    }
}

/// A native function, optionally carrying the value it was accessed on.
pub struct HostFunction<'a> {
    pub name: &'a str,
    pub function: HostFn<'a>,
    pub receiver: Option<Value<'a>>,
}

impl<'a> HostFunction<'a> {
    /// Stdlib functions are not metered; callers meter member functions.
    pub fn new(name: &'a str, function: HostFn<'a>) -> Rc<Self> {
        Rc::new(Self {
            name,
            function,
            receiver: None,
        })
    }

    pub fn with_receiver(name: &'a str, function: HostFn<'a>, receiver: Value<'a>) -> Rc<Self> {
        Rc::new(Self {
            name,
            function,
            receiver: Some(receiver),
        })
    }
}

/// A composite method bound to its receiver at member access.
pub struct BoundFunction<'a> {
    pub method: Rc<InterpretedFunction<'a>>,
    pub receiver: Rc<CompositeValue<'a>>,
}

impl<'a> BoundFunction<'a> {
    pub fn new(
        meter: &Meter<'_>,
        method: Rc<InterpretedFunction<'a>>,
        receiver: Rc<CompositeValue<'a>>,
    ) -> Result<Rc<Self>, MemoryLimitExceeded> {
        meter.report(MemoryKind::BoundFunction, 1)?;
        Ok(Rc::new(Self { method, receiver }))
    }
}

impl fmt::Debug for FunctionValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionValue::Interpreted(_) => write!(f, "Interpreted({})", self.name()),
            FunctionValue::Host(_) => write!(f, "Host({})", self.name()),
            FunctionValue::Bound(b) => write!(f, "Bound({}.{})", b.receiver.name, self.name()),
        }
    }
}

impl fmt::Display for FunctionValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionValue::Interpreted(function) => {
                f.write_str("fun(")?;
                for (i, parameter) in function.function.parameters.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", parameter.ty)?;
                }
                write!(f, "): {}", function.function.return_type)
            }
            FunctionValue::Host(function) => write!(f, "fun {}", function.name),
            FunctionValue::Bound(function) => {
                write!(f, "fun {}.{}", function.receiver.name, self.name())
            }
        }
    }
}
