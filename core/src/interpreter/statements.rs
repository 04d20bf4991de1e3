//! Statement execution and structured control flow.

use super::{ExecutionError, InternalError, Interpreter, OwnershipError, ResourceExceededError};
use super::{RuntimeError, invocation::unexpected};
use crate::ast::{
    Block, Expr, IfTest, Span, Statement, StatementKind, SwitchCase, Transfer, VariableDeclaration,
};
use crate::memory::MemoryKind;
use crate::scope_stack::{Binding, Scope, Slot};
use crate::types::{CompositeKind, StaticType};
use crate::values::{FunctionValue, InterpretedFunction, ResourceState, Value, string};
use std::rc::Rc;
use tracing::debug;

/// Outcome of executing a statement.
#[derive(Debug, Clone)]
pub enum ControlFlow<'a> {
    Normal,
    Break,
    Continue,
    Return(Value<'a>),
}

impl ControlFlow<'_> {
    pub(super) fn misplaced(&self, construct: &'static str) -> InternalError {
        let statement = match self {
            ControlFlow::Normal => "statement",
            ControlFlow::Break => "break",
            ControlFlow::Continue => "continue",
            ControlFlow::Return(_) => "return",
        };
        InternalError::MisplacedControlFlow {
            statement,
            construct,
        }
    }
}

impl<'a> Interpreter<'a> {
    /// Execute statements in `scope` until one completes abnormally.
    pub(super) fn execute_statements(
        &mut self,
        statements: &'a [Statement<'a>],
        scope: &Scope<'a>,
    ) -> Result<ControlFlow<'a>, ExecutionError> {
        for statement in statements {
            let flow = self.execute(statement, scope)?;
            if !matches!(flow, ControlFlow::Normal) {
                return Ok(flow);
            }
        }
        Ok(ControlFlow::Normal)
    }

    /// Execute a block in a new child scope of `parent`.
    pub(super) fn execute_block(
        &mut self,
        block: &Block<'a>,
        parent: &Scope<'a>,
    ) -> Result<ControlFlow<'a>, ExecutionError> {
        let scope = parent.push();
        self.run_in_scope(&scope, |this| this.execute_statements(block.statements, &scope))
    }

    /// Run `body`, then exit `scope`, checking for lost resources only when
    /// the body completed.
    pub(super) fn run_in_scope<T>(
        &mut self,
        scope: &Scope<'a>,
        body: impl FnOnce(&mut Self) -> Result<T, ExecutionError>,
    ) -> Result<T, ExecutionError> {
        match body(self) {
            Ok(result) => {
                self.exit_scope(scope)?;
                Ok(result)
            }
            Err(error) => {
                scope.exit();
                Err(error)
            }
        }
    }

    fn execute(
        &mut self,
        statement: &'a Statement<'a>,
        scope: &Scope<'a>,
    ) -> Result<ControlFlow<'a>, ExecutionError> {
        let previous = core::mem::replace(&mut self.span, statement.span);
        let result = self.execute_inner(statement, scope);
        self.span = previous;
        match result {
            Err(error) if statement.span != Span::default() => Err(error.with_span(statement.span)),
            result => result,
        }
    }

    fn execute_inner(
        &mut self,
        statement: &'a Statement<'a>,
        scope: &Scope<'a>,
    ) -> Result<ControlFlow<'a>, ExecutionError> {
        match statement.kind {
            StatementKind::Expression(expr) => {
                let value = self.eval_expr(expr, scope)?;
                if value.resource_state() == Some(ResourceState::InTransit) {
                    return Err(OwnershipError::ResourceLoss {
                        type_name: value.type_name(),
                    }
                    .into());
                }
                Ok(ControlFlow::Normal)
            }

            StatementKind::Variable(declaration) => {
                self.declare_variable(declaration, scope)?;
                Ok(ControlFlow::Normal)
            }

            StatementKind::Function(declaration) => {
                let function = InterpretedFunction::new(
                    &self.meter,
                    Some(declaration.name),
                    declaration.function,
                    scope.clone(),
                )?;
                self.bind(
                    scope,
                    declaration.name,
                    Value::Function(FunctionValue::Interpreted(function)),
                    Binding::default(),
                )?;
                Ok(ControlFlow::Normal)
            }

            StatementKind::Assignment {
                target,
                transfer,
                value,
                target_type,
            } => {
                let value = self.eval_transfer(value, transfer, scope)?;
                let value = value.into_optional(&target_type, &self.meter)?;
                self.assign(target, value, scope)?;
                Ok(ControlFlow::Normal)
            }

            StatementKind::Swap { left, right } => {
                let left_value = self.read_target(left, scope)?;
                let right_value = self.read_target(right, scope)?;
                self.write_target(left, right_value, scope)?;
                self.write_target(right, left_value, scope)?;
                Ok(ControlFlow::Normal)
            }

            StatementKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval_expr(expr, scope)?,
                    None => Value::new_void(&self.meter)?,
                };
                Ok(ControlFlow::Return(value))
            }

            StatementKind::Break => Ok(ControlFlow::Break),
            StatementKind::Continue => Ok(ControlFlow::Continue),

            StatementKind::If {
                test,
                then,
                otherwise,
            } => self.execute_if(test, &then, otherwise.as_ref(), scope),

            StatementKind::While { test, body } => {
                let mut iterations = 0;
                loop {
                    if !self.eval_bool(test, scope)? {
                        return Ok(ControlFlow::Normal);
                    }
                    self.count_iteration(&mut iterations)?;
                    match self.execute_block(&body, scope)? {
                        ControlFlow::Break => return Ok(ControlFlow::Normal),
                        ControlFlow::Normal | ControlFlow::Continue => {}
                        flow @ ControlFlow::Return(_) => return Ok(flow),
                    }
                }
            }

            StatementKind::ForIn {
                variable,
                iterable,
                body,
            } => self.execute_for_in(variable, iterable, &body, scope),

            StatementKind::For {
                init,
                test,
                update,
                body,
            } => {
                let scope = scope.push();
                self.run_in_scope(&scope, |this| {
                    if let Some(init) = init {
                        this.execute(init, &scope)?;
                    }
                    let mut iterations = 0;
                    loop {
                        if let Some(test) = test {
                            if !this.eval_bool(test, &scope)? {
                                return Ok(ControlFlow::Normal);
                            }
                        }
                        this.count_iteration(&mut iterations)?;
                        match this.execute_block(&body, &scope)? {
                            ControlFlow::Break => return Ok(ControlFlow::Normal),
                            ControlFlow::Normal | ControlFlow::Continue => {}
                            flow @ ControlFlow::Return(_) => return Ok(flow),
                        }
                        if let Some(update) = update {
                            this.execute(update, &scope)?;
                        }
                    }
                })
            }

            StatementKind::Switch { subject, cases } => self.execute_switch(subject, cases, scope),

            StatementKind::Emit(expr) => {
                let event = self.eval_expr(expr, scope)?;
                match &event {
                    Value::Composite(composite) if composite.kind == CompositeKind::Event => {
                        debug!(event = %composite, "emit");
                        self.events.push(event);
                        Ok(ControlFlow::Normal)
                    }
                    other => Err(unexpected("event", other)),
                }
            }
        }
    }

    pub(super) fn declare_variable(
        &mut self,
        declaration: &'a VariableDeclaration<'a>,
        scope: &Scope<'a>,
    ) -> Result<(), ExecutionError> {
        let value = self.eval_transfer(declaration.value, declaration.transfer, scope)?;
        let value = match &declaration.type_annotation {
            Some(ty) => {
                let value = value.into_optional(ty, &self.meter)?;
                self.check_type(&value, ty)?;
                value
            }
            None => value,
        };
        let binding = Binding {
            is_constant: declaration.is_constant,
            ty: declaration.type_annotation,
            owns_value: true,
        };
        self.bind(scope, declaration.name, value, binding)?;
        Ok(())
    }

    /// Evaluate the right-hand side of a transfer: moves take the value out of
    /// its slot, copies are deep-copied. The transferred value then has its
    /// dynamic type walked for the target check.
    pub(super) fn eval_transfer(
        &mut self,
        expr: &'a Expr<'a>,
        transfer: Transfer,
        scope: &Scope<'a>,
    ) -> Result<Value<'a>, ExecutionError> {
        let value = match transfer {
            Transfer::Move => self.eval_move(expr, scope)?,
            Transfer::Copy => self.eval_expr(expr, scope)?,
        };
        let value = value.transfer(&self.meter)?;
        value.meter_dynamic_type(&self.meter)?;
        Ok(value)
    }

    /// Dynamic check of a value against the declared type of its binding.
    fn check_type(&self, value: &Value<'a>, ty: &StaticType<'a>) -> Result<(), ExecutionError> {
        if !value.conforms_to(ty) {
            return Err(RuntimeError::TypeMismatch {
                expected: ty.to_string(),
                actual: value.type_name(),
            }
            .into());
        }
        Ok(())
    }

    fn count_iteration(&self, iterations: &mut usize) -> Result<(), ExecutionError> {
        *iterations += 1;
        match self.options.max_iterations {
            Some(max_iterations) if *iterations > max_iterations => {
                Err(ResourceExceededError::IterationLimit { max_iterations }.into())
            }
            _ => Ok(()),
        }
    }

    fn execute_if(
        &mut self,
        test: IfTest<'a>,
        then: &Block<'a>,
        otherwise: Option<&Block<'a>>,
        scope: &Scope<'a>,
    ) -> Result<ControlFlow<'a>, ExecutionError> {
        let branch = match test {
            IfTest::Condition(condition) => self.eval_bool(condition, scope)?,
            IfTest::Binding(declaration) => {
                let value = self.eval_transfer(declaration.value, declaration.transfer, scope)?;
                let value = match value {
                    Value::Nil => None,
                    Value::Some(inner) => Some(*inner),
                    other => Some(other),
                };
                if let Some(value) = value {
                    let scope = scope.push();
                    return self.run_in_scope(&scope, |this| {
                        let binding = Binding {
                            is_constant: declaration.is_constant,
                            ..Binding::default()
                        };
                        this.bind(&scope, declaration.name, value, binding)?;
                        this.execute_statements(then.statements, &scope)
                    });
                }
                false
            }
        };
        if branch {
            self.execute_block(then, scope)
        } else if let Some(otherwise) = otherwise {
            self.execute_block(otherwise, scope)
        } else {
            Ok(ControlFlow::Normal)
        }
    }

    fn execute_for_in(
        &mut self,
        variable: &'a str,
        iterable: &'a Expr<'a>,
        body: &Block<'a>,
        scope: &Scope<'a>,
    ) -> Result<ControlFlow<'a>, ExecutionError> {
        let iterable = self.eval_expr(iterable, scope)?;
        let elements = match self.deref_value(iterable)? {
            Value::Array(array) if array.is_resource() => array.elements().clone(),
            Value::Array(array) => match Value::Array(array).transfer(&self.meter)? {
                Value::Array(copy) => copy.elements().clone(),
                other => return Err(unexpected("array", &other)),
            },
            Value::String(text) => {
                let mut characters = Vec::new();
                for grapheme in string::graphemes(&text) {
                    characters.push(Value::new_character(&self.meter, grapheme)?);
                }
                characters
            }
            other => return Err(unexpected("array or string", &other)),
        };

        let scope = scope.push();
        self.run_in_scope(&scope, |this| {
            let mut slot = None;
            let mut iterations = 0;
            for element in elements {
                this.count_iteration(&mut iterations)?;
                element.meter_read(&this.meter)?;
                match &slot {
                    None => {
                        let binding = Binding {
                            owns_value: false,
                            ..Binding::default()
                        };
                        slot = Some(this.bind(&scope, variable, element, binding)?);
                    }
                    Some(slot) => {
                        slot.set(element);
                    }
                }
                match this.execute_block(body, &scope)? {
                    ControlFlow::Break => break,
                    ControlFlow::Normal | ControlFlow::Continue => {}
                    flow @ ControlFlow::Return(_) => return Ok(flow),
                }
            }
            Ok(ControlFlow::Normal)
        })
    }

    /// Run the first case equal to the subject, or the default case when none
    /// matches. `break` leaves the switch.
    fn execute_switch(
        &mut self,
        subject: &'a Expr<'a>,
        cases: &'a [SwitchCase<'a>],
        scope: &Scope<'a>,
    ) -> Result<ControlFlow<'a>, ExecutionError> {
        let subject = self.eval_expr(subject, scope)?;
        let mut selected = None;
        for case in cases {
            let Some(expr) = case.value else {
                continue;
            };
            let value = self.eval_expr(expr, scope)?;
            self.report(MemoryKind::Bool, 1)?;
            if subject.equals(&value) {
                selected = Some(case);
                break;
            }
        }
        let selected = selected.or_else(|| cases.iter().find(|case| case.value.is_none()));
        let Some(case) = selected else {
            return Ok(ControlFlow::Normal);
        };
        match self.execute_block(&case.body, scope)? {
            ControlFlow::Break => Ok(ControlFlow::Normal),
            flow => Ok(flow),
        }
    }

    /// Store `value` into an assignable expression, taking ownership of it.
    fn assign(
        &mut self,
        target: &'a Expr<'a>,
        value: Value<'a>,
        scope: &Scope<'a>,
    ) -> Result<(), ExecutionError> {
        match target {
            Expr::Identifier(name) => {
                let variable = self.lookup(scope, name)?;
                let value = match &variable.ty {
                    Some(ty) => value.into_optional(ty, &self.meter)?,
                    None => value,
                };
                if variable.owns_value {
                    self.claim(&value)?;
                }
                match variable.set(value) {
                    Slot::Value(previous) => self.release(Some(previous)),
                    Slot::Moved => Ok(()),
                }
            }
            Expr::Member { target, name, .. } => {
                let container = self.eval_expr(target, scope)?;
                let container = self.deref_value(container)?;
                self.claim(&value)?;
                let previous = self.set_member(container, name, value)?;
                self.release(previous)
            }
            Expr::Index { target, index } => {
                let container = self.eval_expr(target, scope)?;
                let container = self.deref_value(container)?;
                let index = self.eval_expr(index, scope)?;
                self.claim(&value)?;
                let previous = self.set_index(container, index, value)?;
                self.release(previous)
            }
            _ => Err(InternalError::InvalidAssignmentTarget.into()),
        }
    }

    /// Current value of an assignable expression, without ownership changes.
    fn read_target(
        &mut self,
        target: &'a Expr<'a>,
        scope: &Scope<'a>,
    ) -> Result<Value<'a>, ExecutionError> {
        match target {
            Expr::Identifier(name) => match self.lookup(scope, name)?.slot() {
                Slot::Value(value) => Ok(value),
                Slot::Moved => Err(OwnershipError::UseAfterMove {
                    name: name.to_string(),
                }
                .into()),
            },
            Expr::Member { target, name, .. } => {
                let container = self.eval_expr(target, scope)?;
                match self.deref_value(container)? {
                    Value::Composite(composite) => {
                        self.check_live(&Value::Composite(composite.clone()))?;
                        Ok(composite.field(name).unwrap_or(Value::Nil))
                    }
                    other => Err(unexpected("composite", &other)),
                }
            }
            Expr::Index { target, index } => {
                let container = self.eval_expr(target, scope)?;
                let container = self.deref_value(container)?;
                let index = self.eval_expr(index, scope)?;
                match &container {
                    Value::Dictionary(dictionary) => Ok(dictionary
                        .get(&index)
                        .map(|value| Value::Some(Box::new(value)))
                        .unwrap_or(Value::Nil)),
                    _ => self.get_index(container, index),
                }
            }
            _ => Err(InternalError::InvalidAssignmentTarget.into()),
        }
    }

    /// Store into an assignable expression, without ownership changes.
    fn write_target(
        &mut self,
        target: &'a Expr<'a>,
        value: Value<'a>,
        scope: &Scope<'a>,
    ) -> Result<(), ExecutionError> {
        match target {
            Expr::Identifier(name) => {
                self.lookup(scope, name)?.set(value);
                Ok(())
            }
            Expr::Member { target, name, .. } => {
                let container = self.eval_expr(target, scope)?;
                let container = self.deref_value(container)?;
                self.set_member(container, name, value)?;
                Ok(())
            }
            Expr::Index { target, index } => {
                let container = self.eval_expr(target, scope)?;
                let container = self.deref_value(container)?;
                let index = self.eval_expr(index, scope)?;
                self.set_index(container, index, value)?;
                Ok(())
            }
            _ => Err(InternalError::InvalidAssignmentTarget.into()),
        }
    }

    pub(super) fn lookup(
        &self,
        scope: &Scope<'a>,
        name: &str,
    ) -> Result<Rc<crate::scope_stack::Variable<'a>>, ExecutionError> {
        scope.lookup(name).ok_or_else(|| {
            InternalError::UndefinedVariable {
                name: name.to_string(),
            }
            .into()
        })
    }
}
