//! Tree-walking interpreter for checked programs.
//!
//! The interpreter evaluates the declarations of a [`Program`] once, at
//! construction, and then runs global functions on request through
//! [`Interpreter::invoke`].
//!
//! ## Design Principles
//!
//! - **Never panic**: every failure is an [`ExecutionError`] that aborts the
//!   current execution.
//! - **Metered**: every value the program allocates is reported to the memory
//!   gauge injected through the builder.
//! - **Resource safe**: resource values carry a runtime ownership state that is
//!   checked on every binding, move, destruction and scope exit.
//! - **Stack-safe**: invocation depth is bounded by [`ExecutionOptions`].
//!
//! ## Example
//!
//! ```ignore
//! let arena = Bump::new();
//! let ast = AstBuilder::new(&arena);
//! let program = ast.program(&[ast.fun("main", &[], StaticType::Bool, &[ast.ret(ast.bool(true))])])?;
//!
//! let mut interpreter = Interpreter::builder(program).build()?;
//! let result = interpreter.invoke("main", vec![])?;
//! ```

mod error;
mod eval;
mod invocation;
mod members;
mod operators;
mod options;
mod ownership;
mod statements;


pub use error::{
    ArithmeticError, ErrorKind, ExecutionError, HostError, InternalError, OwnershipError,
    ResourceExceededError, RuntimeError,
};
pub use invocation::Invocation;
pub use options::ExecutionOptions;
pub use statements::ControlFlow;

use crate::ast::{CompositeDeclaration, Declaration, Program, Span};
use crate::memory::{MemoryGauge, MemoryKind, MemoryLimitExceeded, Meter};
use crate::scope_stack::{Binding, Scope, Slot};
use crate::stdlib::{self, TestFramework};
use crate::storage::{InMemoryStorage, Storage};
use crate::types::CompositeKind;
use crate::values::{
    CompositeValue, FunctionValue, HostFn, HostFunction, InterpretedFunction, NumberValue, Value,
    host_fn,
};
use hashbrown::HashMap;
use indexmap::IndexMap;
use std::rc::Rc;
use tracing::debug;

/// Runtime information about a declared composite type.
pub(crate) struct CompositeType<'a> {
    pub declaration: &'a CompositeDeclaration<'a>,
    pub initializer: Option<Rc<InterpretedFunction<'a>>>,
    pub methods: IndexMap<&'a str, Rc<InterpretedFunction<'a>>>,
    /// Case values of an enum, in declaration order.
    pub cases: IndexMap<&'a str, Value<'a>>,
}

/// Interpreter for one checked program.
///
/// Instances are single-threaded: the memory gauge, storage and values are
/// shared through `Rc` and must not cross threads.
pub struct Interpreter<'a> {
    meter: Meter<'a>,
    storage: Box<dyn Storage<'a> + 'a>,
    test_framework: Option<Rc<dyn TestFramework<'a> + 'a>>,
    options: ExecutionOptions,
    globals: Scope<'a>,
    composites: HashMap<&'a str, Rc<CompositeType<'a>>>,
    events: Vec<Value<'a>>,
    depth: usize,
    /// Span of the statement being executed.
    span: Span,
}

static_assertions::assert_not_impl_any!(Interpreter<'static>: Send, Sync);

/// Configures and builds an [`Interpreter`].
pub struct InterpreterBuilder<'a> {
    program: &'a Program<'a>,
    meter: Meter<'a>,
    storage: Option<Box<dyn Storage<'a> + 'a>>,
    test_framework: Option<Rc<dyn TestFramework<'a> + 'a>>,
    options: ExecutionOptions,
    host_functions: Vec<(&'a str, HostFn<'a>)>,
}

impl<'a> InterpreterBuilder<'a> {
    /// Report every allocation to `gauge`.
    pub fn memory_gauge(mut self, gauge: Rc<dyn MemoryGauge + 'a>) -> Self {
        self.meter = Meter::new(gauge);
        self
    }

    /// Account storage. Defaults to an empty [`InMemoryStorage`].
    pub fn storage(mut self, storage: impl Storage<'a> + 'a) -> Self {
        self.storage = Some(Box::new(storage));
        self
    }

    /// Framework backing `executeScript`.
    pub fn test_framework(mut self, framework: Rc<dyn TestFramework<'a> + 'a>) -> Self {
        self.test_framework = Some(framework);
        self
    }

    pub fn options(mut self, options: ExecutionOptions) -> Self {
        self.options = options;
        self
    }

    /// Register a host function under `name`, shadowing the standard library.
    pub fn host_function<F>(mut self, name: &'a str, function: F) -> Self
    where
        F: Fn(&mut Invocation<'_, 'a>) -> Result<Value<'a>, ExecutionError> + 'a,
    {
        self.host_functions.push((name, host_fn(function)));
        self
    }

    /// Build the interpreter and evaluate the program's declarations.
    pub fn build(self) -> Result<Interpreter<'a>, ExecutionError> {
        let globals = Scope::root();
        let host_functions = stdlib::functions().into_iter().chain(self.host_functions);
        for (name, function) in host_functions {
            let function = Value::Function(FunctionValue::Host(HostFunction::new(name, function)));
            globals.bind(name, function, Binding::default());
        }

        let mut interpreter = Interpreter {
            meter: self.meter,
            storage: self
                .storage
                .unwrap_or_else(|| Box::new(InMemoryStorage::new())),
            test_framework: self.test_framework,
            options: self.options,
            globals,
            composites: HashMap::new(),
            events: Vec::new(),
            depth: 0,
            span: Span::default(),
        };

        for declaration in self.program.declarations {
            interpreter.declare(declaration)?;
        }
        Ok(interpreter)
    }
}

impl<'a> Interpreter<'a> {
    pub fn builder(program: &'a Program<'a>) -> InterpreterBuilder<'a> {
        InterpreterBuilder {
            program,
            meter: Meter::none(),
            storage: None,
            test_framework: None,
            options: ExecutionOptions::default(),
            host_functions: Vec::new(),
        }
    }

    /// Invoke the global function `name`.
    pub fn invoke(
        &mut self,
        name: &str,
        arguments: Vec<Value<'a>>,
    ) -> Result<Value<'a>, ExecutionError> {
        debug!(name, "invoke");
        let function = match self.global(name) {
            Some(Value::Function(function)) => function,
            Some(other) => {
                return Err(InternalError::UnexpectedValue {
                    expected: "function".to_string(),
                    found: other.type_name(),
                }
                .into());
            }
            None => {
                return Err(InternalError::UndefinedVariable {
                    name: name.to_string(),
                }
                .into());
            }
        };
        self.invoke_function(&function, arguments, &[])
    }

    /// Current value of a global binding.
    pub fn global(&self, name: &str) -> Option<Value<'a>> {
        match self.globals.lookup(name)?.slot() {
            Slot::Value(value) => Some(value),
            Slot::Moved => None,
        }
    }

    /// Events emitted so far, in order.
    pub fn events(&self) -> &[Value<'a>] {
        &self.events
    }

    pub fn storage(&self) -> &dyn Storage<'a> {
        self.storage.as_ref()
    }

    pub fn storage_mut(&mut self) -> &mut dyn Storage<'a> {
        self.storage.as_mut()
    }

    pub fn meter(&self) -> &Meter<'a> {
        &self.meter
    }

    pub fn options(&self) -> &ExecutionOptions {
        &self.options
    }

    pub(crate) fn test_framework(&self) -> Option<Rc<dyn TestFramework<'a> + 'a>> {
        self.test_framework.clone()
    }

    fn declare(&mut self, declaration: &'a Declaration<'a>) -> Result<(), ExecutionError> {
        match declaration {
            Declaration::Variable(variable) => {
                let globals = self.globals.clone();
                self.declare_variable(variable, &globals)
                    .map_err(|e| e.with_span(variable.span))
            }
            Declaration::Function(function) => {
                let value = InterpretedFunction::new(
                    &self.meter,
                    Some(function.name),
                    function.function,
                    self.globals.clone(),
                )?;
                let globals = self.globals.clone();
                self.bind(
                    &globals,
                    function.name,
                    Value::Function(FunctionValue::Interpreted(value)),
                    Binding::default(),
                )?;
                Ok(())
            }
            Declaration::Composite(composite) => self
                .declare_composite(composite)
                .map_err(|e| e.with_span(composite.span)),
        }
    }

    fn declare_composite(
        &mut self,
        declaration: &'a CompositeDeclaration<'a>,
    ) -> Result<(), ExecutionError> {
        debug!(name = declaration.name, kind = declaration.kind.keyword(), "declare composite");
        let initializer = declaration
            .initializer
            .map(|function| {
                InterpretedFunction::new(&self.meter, Some("init"), function, self.globals.clone())
            })
            .transpose()?;
        let methods = declaration
            .functions
            .iter()
            .map(|function| {
                let method = InterpretedFunction::new(
                    &self.meter,
                    Some(function.name),
                    function.function,
                    self.globals.clone(),
                )?;
                Ok((function.name, method))
            })
            .collect::<Result<IndexMap<_, _>, MemoryLimitExceeded>>()?;

        let mut cases = IndexMap::new();
        if let Some(raw_type) = declaration.enum_raw_type {
            for (index, case) in declaration.enum_cases.iter().enumerate() {
                let raw = NumberValue::from_literal(&index.to_string(), raw_type, &self.meter)?;
                let mut fields = IndexMap::new();
                fields.insert("rawValue", Value::Number(raw));
                let value =
                    CompositeValue::new(&self.meter, declaration.name, CompositeKind::Enum, fields)?;
                cases.insert(*case, Value::Composite(value));
            }
        }

        let ty = Rc::new(CompositeType {
            declaration,
            initializer,
            methods,
            cases,
        });
        self.composites.insert(declaration.name, ty.clone());

        let globals = self.globals.clone();
        let value = match declaration.kind {
            CompositeKind::Contract => self.construct(&ty, Vec::new())?,
            CompositeKind::Enum => {
                self.meter.report(MemoryKind::HostFunction, 1)?;
                let constructor = host_fn(move |invocation: &mut Invocation<'_, 'a>| {
                    let raw = invocation.argument(0)?.clone();
                    let case = ty.cases.values().find(|case| match case {
                        Value::Composite(c) => c.field("rawValue").is_some_and(|v| v.equals(&raw)),
                        _ => false,
                    });
                    match case {
                        Some(case) => Ok(Value::new_some(invocation.meter(), case.clone())?),
                        None => Ok(Value::Nil),
                    }
                });
                Value::Function(FunctionValue::Host(HostFunction::new(
                    declaration.name,
                    constructor,
                )))
            }
            _ => {
                self.meter.report(MemoryKind::HostFunction, 1)?;
                let constructor = host_fn(move |invocation: &mut Invocation<'_, 'a>| {
                    let arguments = core::mem::take(&mut invocation.arguments);
                    invocation.interpreter.construct(&ty, arguments)
                });
                Value::Function(FunctionValue::Host(HostFunction::new(
                    declaration.name,
                    constructor,
                )))
            }
        };
        self.bind(&globals, declaration.name, value, Binding::default())?;
        Ok(())
    }

    pub(crate) fn composite_type(&self, name: &str) -> Option<Rc<CompositeType<'a>>> {
        self.composites.get(name).cloned()
    }
}
