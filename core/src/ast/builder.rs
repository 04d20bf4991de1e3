//! Arena builder for checked programs.
//!
//! Stands in for the parser front end: every node it allocates is reported to
//! the meter, one event per node. The first metering failure is remembered and
//! returned from [`AstBuilder::program`].
//!
//! # Example
//!
//! ```ignore
//! let arena = Bump::new();
//! let b = AstBuilder::new(&arena);
//! let program = b.program(&[b.fun(
//!     "main",
//!     &[],
//!     StaticType::Number(NumberKind::Int),
//!     &[b.ret(b.add(b.int(1), b.int(2)))],
//! )])?;
//! ```

use super::*;
use crate::memory::{MemoryKind, MemoryLimitExceeded, Meter};
use bumpalo::Bump;
use core::cell::RefCell;

pub struct AstBuilder<'a> {
    arena: &'a Bump,
    meter: Meter<'a>,
    error: RefCell<Option<MemoryLimitExceeded>>,
}

impl<'a> AstBuilder<'a> {
    pub fn new(arena: &'a Bump) -> Self {
        Self::with_meter(arena, Meter::none())
    }

    pub fn with_meter(arena: &'a Bump, meter: Meter<'a>) -> Self {
        Self {
            arena,
            meter,
            error: RefCell::new(None),
        }
    }

    pub fn arena(&self) -> &'a Bump {
        self.arena
    }

    fn meter(&self, kind: MemoryKind, amount: u64) {
        if let Err(err) = self.meter.report(kind, amount) {
            self.error.borrow_mut().get_or_insert(err);
        }
    }

    fn str(&self, s: &str) -> &'a str {
        self.arena.alloc_str(s)
    }

    fn expr(&self, expr: Expr<'a>) -> &'a Expr<'a> {
        self.meter(MemoryKind::Expression, 1);
        self.arena.alloc(expr)
    }

    fn stmt(&self, kind: StatementKind<'a>) -> Statement<'a> {
        self.meter(MemoryKind::Statement, 1);
        Statement {
            kind,
            span: Span::default(),
        }
    }

    fn literal_text(&self, text: &str) {
        self.meter(MemoryKind::String, text.len().max(1) as u64);
    }

    /// Finish the program. Fails if any node could not be metered.
    pub fn program(
        &self,
        declarations: &[Declaration<'a>],
    ) -> Result<&'a Program<'a>, MemoryLimitExceeded> {
        self.meter(MemoryKind::Program, 1);
        if let Some(err) = self.error.borrow_mut().take() {
            return Err(err);
        }
        Ok(self.arena.alloc(Program {
            declarations: self.arena.alloc_slice_copy(declarations),
        }))
    }

    // ========================================================================
    // Types
    // ========================================================================

    fn ty(&self, ty: StaticType<'a>) -> &'a StaticType<'a> {
        self.meter(MemoryKind::Type, 1);
        self.arena.alloc(ty)
    }

    pub fn optional_type(&self, inner: StaticType<'a>) -> StaticType<'a> {
        StaticType::Optional(self.ty(inner))
    }

    pub fn array_type(&self, element: StaticType<'a>) -> StaticType<'a> {
        StaticType::VariableArray(self.ty(element))
    }

    pub fn dictionary_type(&self, key: StaticType<'a>, value: StaticType<'a>) -> StaticType<'a> {
        StaticType::Dictionary {
            key: self.ty(key),
            value: self.ty(value),
        }
    }

    pub fn composite_type(&self, name: &str, kind: CompositeKind) -> StaticType<'a> {
        self.meter(MemoryKind::Type, 1);
        StaticType::Composite {
            name: self.str(name),
            kind,
        }
    }

    pub fn reference_type(&self, referenced: StaticType<'a>) -> StaticType<'a> {
        StaticType::Reference {
            authorized: false,
            referenced: self.ty(referenced),
        }
    }

    pub fn auth_reference_type(&self, referenced: StaticType<'a>) -> StaticType<'a> {
        StaticType::Reference {
            authorized: true,
            referenced: self.ty(referenced),
        }
    }

    pub fn capability_type(&self, borrow: StaticType<'a>) -> StaticType<'a> {
        StaticType::Capability(Some(self.ty(borrow)))
    }

    pub fn function_type(
        &self,
        parameters: &[StaticType<'a>],
        return_type: StaticType<'a>,
    ) -> StaticType<'a> {
        StaticType::Function {
            parameters: self.arena.alloc_slice_copy(parameters),
            return_type: self.ty(return_type),
        }
    }

    // ========================================================================
    // Literals
    // ========================================================================

    pub fn bool(&self, value: bool) -> &'a Expr<'a> {
        self.expr(Expr::Bool(value))
    }

    pub fn nil(&self) -> &'a Expr<'a> {
        self.expr(Expr::Nil)
    }

    /// Integer literal of the unbounded `Int` kind.
    pub fn int(&self, value: i128) -> &'a Expr<'a> {
        self.number(value, NumberKind::Int)
    }

    pub fn number(&self, value: i128, kind: NumberKind) -> &'a Expr<'a> {
        self.integer(&value.to_string(), kind)
    }

    /// Integer literal from decimal text, for values past `i128`.
    pub fn integer(&self, literal: &str, kind: NumberKind) -> &'a Expr<'a> {
        let literal = self.str(literal);
        self.expr(Expr::Integer { literal, kind })
    }

    pub fn fixed(&self, literal: &str, kind: NumberKind) -> &'a Expr<'a> {
        let literal = self.str(literal);
        self.expr(Expr::FixedPoint { literal, kind })
    }

    pub fn string(&self, value: &str) -> &'a Expr<'a> {
        self.literal_text(value);
        let value = self.str(value);
        self.expr(Expr::String(value))
    }

    pub fn character(&self, value: &str) -> &'a Expr<'a> {
        self.literal_text(value);
        let value = self.str(value);
        self.expr(Expr::Character(value))
    }

    pub fn address(&self, value: u64) -> &'a Expr<'a> {
        self.expr(Expr::Address(value))
    }

    pub fn path(&self, domain: PathDomain, identifier: &str) -> &'a Expr<'a> {
        let identifier = self.str(identifier);
        self.expr(Expr::Path { domain, identifier })
    }

    pub fn storage_path(&self, identifier: &str) -> &'a Expr<'a> {
        self.path(PathDomain::Storage, identifier)
    }

    pub fn public_path(&self, identifier: &str) -> &'a Expr<'a> {
        self.path(PathDomain::Public, identifier)
    }

    pub fn private_path(&self, identifier: &str) -> &'a Expr<'a> {
        self.path(PathDomain::Private, identifier)
    }

    /// Array literal of type `ty` (the array type, not the element type).
    pub fn array(&self, ty: StaticType<'a>, elements: &[&'a Expr<'a>]) -> &'a Expr<'a> {
        let elements = self.arena.alloc_slice_copy(elements);
        self.expr(Expr::Array { elements, ty })
    }

    pub fn dictionary(
        &self,
        ty: StaticType<'a>,
        entries: &[(&'a Expr<'a>, &'a Expr<'a>)],
    ) -> &'a Expr<'a> {
        let entries = self.arena.alloc_slice_copy(entries);
        self.expr(Expr::Dictionary { entries, ty })
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    pub fn ident(&self, name: &str) -> &'a Expr<'a> {
        let name = self.str(name);
        self.expr(Expr::Identifier(name))
    }

    /// `<-expr`
    pub fn mv(&self, expr: &'a Expr<'a>) -> &'a Expr<'a> {
        self.expr(Expr::Move(expr))
    }

    pub fn member(&self, target: &'a Expr<'a>, name: &str) -> &'a Expr<'a> {
        let name = self.str(name);
        self.expr(Expr::Member {
            target,
            name,
            optional: false,
        })
    }

    /// `target?.name`
    pub fn optional_member(&self, target: &'a Expr<'a>, name: &str) -> &'a Expr<'a> {
        let name = self.str(name);
        self.expr(Expr::Member {
            target,
            name,
            optional: true,
        })
    }

    pub fn index(&self, target: &'a Expr<'a>, index: &'a Expr<'a>) -> &'a Expr<'a> {
        self.expr(Expr::Index { target, index })
    }

    pub fn argument(&self, label: Option<&str>, value: &'a Expr<'a>) -> Argument<'a> {
        self.meter(MemoryKind::Argument, 1);
        Argument {
            label: label.map(|label| self.str(label)),
            value,
        }
    }

    /// Invocation with unlabeled arguments.
    pub fn call(&self, callee: &'a Expr<'a>, arguments: &[&'a Expr<'a>]) -> &'a Expr<'a> {
        self.call_generic(callee, &[], arguments)
    }

    pub fn call_generic(
        &self,
        callee: &'a Expr<'a>,
        type_arguments: &[StaticType<'a>],
        arguments: &[&'a Expr<'a>],
    ) -> &'a Expr<'a> {
        let arguments: Vec<Argument<'a>> = arguments
            .iter()
            .map(|value| self.argument(None, value))
            .collect();
        self.invoke(callee, type_arguments, &arguments)
    }

    /// Invocation with labeled arguments: `callee(label: value, ...)`.
    pub fn call_labeled(
        &self,
        callee: &'a Expr<'a>,
        type_arguments: &[StaticType<'a>],
        arguments: &[(Option<&str>, &'a Expr<'a>)],
    ) -> &'a Expr<'a> {
        let arguments: Vec<Argument<'a>> = arguments
            .iter()
            .map(|(label, value)| self.argument(*label, value))
            .collect();
        self.invoke(callee, type_arguments, &arguments)
    }

    fn invoke(
        &self,
        callee: &'a Expr<'a>,
        type_arguments: &[StaticType<'a>],
        arguments: &[Argument<'a>],
    ) -> &'a Expr<'a> {
        self.expr(Expr::Invocation {
            callee,
            type_arguments: self.arena.alloc_slice_copy(type_arguments),
            arguments: self.arena.alloc_slice_copy(arguments),
        })
    }

    /// `target.name(arguments)`
    pub fn method(
        &self,
        target: &'a Expr<'a>,
        name: &str,
        arguments: &[&'a Expr<'a>],
    ) -> &'a Expr<'a> {
        let callee = self.member(target, name);
        self.call(callee, arguments)
    }

    pub fn unary(&self, op: UnaryOp, operand: &'a Expr<'a>) -> &'a Expr<'a> {
        self.expr(Expr::Unary { op, operand })
    }

    pub fn neg(&self, operand: &'a Expr<'a>) -> &'a Expr<'a> {
        self.unary(UnaryOp::Negate, operand)
    }

    pub fn not(&self, operand: &'a Expr<'a>) -> &'a Expr<'a> {
        self.unary(UnaryOp::Not, operand)
    }

    pub fn binary(&self, op: BinaryOp, left: &'a Expr<'a>, right: &'a Expr<'a>) -> &'a Expr<'a> {
        self.expr(Expr::Binary { op, left, right })
    }

    pub fn add(&self, left: &'a Expr<'a>, right: &'a Expr<'a>) -> &'a Expr<'a> {
        self.binary(BinaryOp::Add, left, right)
    }

    pub fn sub(&self, left: &'a Expr<'a>, right: &'a Expr<'a>) -> &'a Expr<'a> {
        self.binary(BinaryOp::Subtract, left, right)
    }

    pub fn eq(&self, left: &'a Expr<'a>, right: &'a Expr<'a>) -> &'a Expr<'a> {
        self.binary(BinaryOp::Equal, left, right)
    }

    pub fn lt(&self, left: &'a Expr<'a>, right: &'a Expr<'a>) -> &'a Expr<'a> {
        self.binary(BinaryOp::Less, left, right)
    }

    pub fn conditional(
        &self,
        test: &'a Expr<'a>,
        then: &'a Expr<'a>,
        otherwise: &'a Expr<'a>,
    ) -> &'a Expr<'a> {
        self.expr(Expr::Conditional {
            test,
            then,
            otherwise,
        })
    }

    pub fn param(&self, name: &str, ty: StaticType<'a>) -> Parameter<'a> {
        self.meter(MemoryKind::Parameter, 1);
        let name = self.str(name);
        Parameter {
            label: Some(name),
            name,
            ty,
        }
    }

    /// Parameter called without an argument label (`_ name: T`).
    pub fn unlabeled_param(&self, name: &str, ty: StaticType<'a>) -> Parameter<'a> {
        Parameter {
            label: None,
            ..self.param(name, ty)
        }
    }

    pub fn function_expr(
        &self,
        parameters: &[Parameter<'a>],
        return_type: StaticType<'a>,
        body: &[Statement<'a>],
    ) -> &'a FunctionExpr<'a> {
        self.arena.alloc(FunctionExpr {
            parameters: self.arena.alloc_slice_copy(parameters),
            return_type,
            body: self.block(body),
        })
    }

    /// Anonymous function expression.
    pub fn closure(
        &self,
        parameters: &[Parameter<'a>],
        return_type: StaticType<'a>,
        body: &[Statement<'a>],
    ) -> &'a Expr<'a> {
        let function = self.function_expr(parameters, return_type, body);
        self.expr(Expr::Function(function))
    }

    pub fn cast(&self, expr: &'a Expr<'a>, kind: CastKind, ty: StaticType<'a>) -> &'a Expr<'a> {
        self.expr(Expr::Cast { expr, kind, ty })
    }

    pub fn force(&self, expr: &'a Expr<'a>) -> &'a Expr<'a> {
        self.expr(Expr::Force(expr))
    }

    /// `create Name(arguments)`
    pub fn create(&self, name: &str, arguments: &[&'a Expr<'a>]) -> &'a Expr<'a> {
        let callee = self.ident(name);
        let invocation = self.call(callee, arguments);
        self.expr(Expr::Create(invocation))
    }

    pub fn destroy(&self, expr: &'a Expr<'a>) -> &'a Expr<'a> {
        self.expr(Expr::Destroy(expr))
    }

    /// `&expr as ty`
    pub fn reference(&self, expr: &'a Expr<'a>, ty: StaticType<'a>) -> &'a Expr<'a> {
        self.expr(Expr::Reference { expr, ty })
    }

    // ========================================================================
    // Statements
    // ========================================================================

    pub fn block(&self, statements: &[Statement<'a>]) -> Block<'a> {
        self.meter(MemoryKind::Block, 1);
        Block {
            statements: self.arena.alloc_slice_copy(statements),
        }
    }

    pub fn expr_stmt(&self, expr: &'a Expr<'a>) -> Statement<'a> {
        self.stmt(StatementKind::Expression(expr))
    }

    pub fn variable_declaration(
        &self,
        name: &str,
        is_constant: bool,
        transfer: Transfer,
        type_annotation: Option<StaticType<'a>>,
        value: &'a Expr<'a>,
    ) -> &'a VariableDeclaration<'a> {
        self.meter(MemoryKind::Declaration, 1);
        self.arena.alloc(VariableDeclaration {
            name: self.str(name),
            is_constant,
            transfer,
            type_annotation,
            value,
            span: Span::default(),
        })
    }

    fn declare(
        &self,
        name: &str,
        is_constant: bool,
        transfer: Transfer,
        type_annotation: Option<StaticType<'a>>,
        value: &'a Expr<'a>,
    ) -> Statement<'a> {
        let declaration =
            self.variable_declaration(name, is_constant, transfer, type_annotation, value);
        self.stmt(StatementKind::Variable(declaration))
    }

    /// `let name = value`
    pub fn let_(&self, name: &str, value: &'a Expr<'a>) -> Statement<'a> {
        self.declare(name, true, Transfer::Copy, None, value)
    }

    /// `let name: ty = value`
    pub fn let_typed(&self, name: &str, ty: StaticType<'a>, value: &'a Expr<'a>) -> Statement<'a> {
        self.declare(name, true, Transfer::Copy, Some(ty), value)
    }

    /// `let name <- value`
    pub fn let_move(&self, name: &str, value: &'a Expr<'a>) -> Statement<'a> {
        self.declare(name, true, Transfer::Move, None, value)
    }

    /// `let name: ty <- value`
    pub fn let_move_typed(
        &self,
        name: &str,
        ty: StaticType<'a>,
        value: &'a Expr<'a>,
    ) -> Statement<'a> {
        self.declare(name, true, Transfer::Move, Some(ty), value)
    }

    /// `var name = value`
    pub fn var(&self, name: &str, value: &'a Expr<'a>) -> Statement<'a> {
        self.declare(name, false, Transfer::Copy, None, value)
    }

    /// `var name: ty = value`
    pub fn var_typed(&self, name: &str, ty: StaticType<'a>, value: &'a Expr<'a>) -> Statement<'a> {
        self.declare(name, false, Transfer::Copy, Some(ty), value)
    }

    /// `var name <- value`
    pub fn var_move(&self, name: &str, value: &'a Expr<'a>) -> Statement<'a> {
        self.declare(name, false, Transfer::Move, None, value)
    }

    /// Nested function declaration statement.
    pub fn fun_stmt(
        &self,
        name: &str,
        parameters: &[Parameter<'a>],
        return_type: StaticType<'a>,
        body: &[Statement<'a>],
    ) -> Statement<'a> {
        let declaration = self.function_declaration(name, parameters, return_type, body);
        self.stmt(StatementKind::Function(declaration))
    }

    /// `target = value` where the target is declared with `target_type`.
    pub fn assign(
        &self,
        target: &'a Expr<'a>,
        target_type: StaticType<'a>,
        value: &'a Expr<'a>,
    ) -> Statement<'a> {
        self.stmt(StatementKind::Assignment {
            target,
            transfer: Transfer::Copy,
            value,
            target_type,
        })
    }

    /// `target <- value`
    pub fn assign_move(
        &self,
        target: &'a Expr<'a>,
        target_type: StaticType<'a>,
        value: &'a Expr<'a>,
    ) -> Statement<'a> {
        self.stmt(StatementKind::Assignment {
            target,
            transfer: Transfer::Move,
            value,
            target_type,
        })
    }

    /// `left <-> right`
    pub fn swap(&self, left: &'a Expr<'a>, right: &'a Expr<'a>) -> Statement<'a> {
        self.stmt(StatementKind::Swap { left, right })
    }

    pub fn ret(&self, value: &'a Expr<'a>) -> Statement<'a> {
        self.stmt(StatementKind::Return(Some(value)))
    }

    pub fn ret_void(&self) -> Statement<'a> {
        self.stmt(StatementKind::Return(None))
    }

    pub fn brk(&self) -> Statement<'a> {
        self.stmt(StatementKind::Break)
    }

    pub fn cont(&self) -> Statement<'a> {
        self.stmt(StatementKind::Continue)
    }

    pub fn if_(
        &self,
        test: &'a Expr<'a>,
        then: &[Statement<'a>],
        otherwise: Option<&[Statement<'a>]>,
    ) -> Statement<'a> {
        self.stmt(StatementKind::If {
            test: IfTest::Condition(test),
            then: self.block(then),
            otherwise: otherwise.map(|statements| self.block(statements)),
        })
    }

    /// `if let name = value { then } else { otherwise }`
    pub fn if_let(
        &self,
        name: &str,
        value: &'a Expr<'a>,
        then: &[Statement<'a>],
        otherwise: Option<&[Statement<'a>]>,
    ) -> Statement<'a> {
        let binding = self.variable_declaration(name, true, Transfer::Copy, None, value);
        self.stmt(StatementKind::If {
            test: IfTest::Binding(binding),
            then: self.block(then),
            otherwise: otherwise.map(|statements| self.block(statements)),
        })
    }

    pub fn while_(&self, test: &'a Expr<'a>, body: &[Statement<'a>]) -> Statement<'a> {
        self.stmt(StatementKind::While {
            test,
            body: self.block(body),
        })
    }

    pub fn for_in(
        &self,
        variable: &str,
        iterable: &'a Expr<'a>,
        body: &[Statement<'a>],
    ) -> Statement<'a> {
        self.stmt(StatementKind::ForIn {
            variable: self.str(variable),
            iterable,
            body: self.block(body),
        })
    }

    pub fn for_(
        &self,
        init: Option<Statement<'a>>,
        test: Option<&'a Expr<'a>>,
        update: Option<Statement<'a>>,
        body: &[Statement<'a>],
    ) -> Statement<'a> {
        self.stmt(StatementKind::For {
            init: init.map(|statement| -> &'a Statement<'a> { self.arena.alloc(statement) }),
            test,
            update: update.map(|statement| -> &'a Statement<'a> { self.arena.alloc(statement) }),
            body: self.block(body),
        })
    }

    pub fn case(&self, value: &'a Expr<'a>, body: &[Statement<'a>]) -> SwitchCase<'a> {
        SwitchCase {
            value: Some(value),
            body: self.block(body),
        }
    }

    pub fn default_case(&self, body: &[Statement<'a>]) -> SwitchCase<'a> {
        SwitchCase {
            value: None,
            body: self.block(body),
        }
    }

    pub fn switch(&self, subject: &'a Expr<'a>, cases: &[SwitchCase<'a>]) -> Statement<'a> {
        self.stmt(StatementKind::Switch {
            subject,
            cases: self.arena.alloc_slice_copy(cases),
        })
    }

    /// `emit Event(arguments)`
    pub fn emit(&self, event: &str, arguments: &[&'a Expr<'a>]) -> Statement<'a> {
        let callee = self.ident(event);
        let invocation = self.call(callee, arguments);
        self.stmt(StatementKind::Emit(invocation))
    }

    /// Attach a source span to a statement.
    pub fn at(&self, statement: Statement<'a>, span: Span) -> Statement<'a> {
        Statement { span, ..statement }
    }

    // ========================================================================
    // Declarations
    // ========================================================================

    fn function_declaration(
        &self,
        name: &str,
        parameters: &[Parameter<'a>],
        return_type: StaticType<'a>,
        body: &[Statement<'a>],
    ) -> &'a FunctionDeclaration<'a> {
        self.meter(MemoryKind::Declaration, 1);
        self.arena.alloc(FunctionDeclaration {
            name: self.str(name),
            function: self.function_expr(parameters, return_type, body),
            span: Span::default(),
        })
    }

    /// Global function declaration.
    pub fn fun(
        &self,
        name: &str,
        parameters: &[Parameter<'a>],
        return_type: StaticType<'a>,
        body: &[Statement<'a>],
    ) -> Declaration<'a> {
        Declaration::Function(self.function_declaration(name, parameters, return_type, body))
    }

    /// Global `let name = value`.
    pub fn global_let(&self, name: &str, value: &'a Expr<'a>) -> Declaration<'a> {
        Declaration::Variable(self.variable_declaration(name, true, Transfer::Copy, None, value))
    }

    /// Global `var name = value`.
    pub fn global_var(&self, name: &str, value: &'a Expr<'a>) -> Declaration<'a> {
        Declaration::Variable(self.variable_declaration(name, false, Transfer::Copy, None, value))
    }

    /// Global declaration with an explicit annotation and transfer.
    pub fn global_declaration(
        &self,
        name: &str,
        is_constant: bool,
        transfer: Transfer,
        type_annotation: Option<StaticType<'a>>,
        value: &'a Expr<'a>,
    ) -> Declaration<'a> {
        Declaration::Variable(self.variable_declaration(
            name,
            is_constant,
            transfer,
            type_annotation,
            value,
        ))
    }

    pub fn composite(&self, name: &str, kind: CompositeKind) -> CompositeDeclarationBuilder<'_, 'a> {
        CompositeDeclarationBuilder {
            builder: self,
            name: self.str(name),
            kind,
            fields: Vec::new(),
            initializer: None,
            destructor: None,
            functions: Vec::new(),
            enum_raw_type: None,
            enum_cases: Vec::new(),
        }
    }

    /// Enum with the given raw type and cases.
    pub fn enum_(&self, name: &str, raw_type: NumberKind, cases: &[&str]) -> Declaration<'a> {
        let mut composite = self.composite(name, CompositeKind::Enum);
        composite.enum_raw_type = Some(raw_type);
        composite.enum_cases = cases.iter().map(|case| self.str(case)).collect();
        composite.build()
    }
}

/// Incremental builder for composite declarations.
pub struct CompositeDeclarationBuilder<'b, 'a> {
    builder: &'b AstBuilder<'a>,
    name: &'a str,
    kind: CompositeKind,
    fields: Vec<FieldDeclaration<'a>>,
    initializer: Option<&'a FunctionExpr<'a>>,
    destructor: Option<Block<'a>>,
    functions: Vec<FunctionDeclaration<'a>>,
    enum_raw_type: Option<NumberKind>,
    enum_cases: Vec<&'a str>,
}

impl<'b, 'a> CompositeDeclarationBuilder<'b, 'a> {
    pub fn field(mut self, name: &str, ty: StaticType<'a>) -> Self {
        self.builder.meter(MemoryKind::Declaration, 1);
        self.fields.push(FieldDeclaration {
            name: self.builder.str(name),
            ty,
        });
        self
    }

    pub fn init(mut self, parameters: &[Parameter<'a>], body: &[Statement<'a>]) -> Self {
        self.builder.meter(MemoryKind::Declaration, 1);
        self.initializer = Some(
            self.builder
                .function_expr(parameters, StaticType::Void, body),
        );
        self
    }

    pub fn destructor(mut self, body: &[Statement<'a>]) -> Self {
        self.builder.meter(MemoryKind::Declaration, 1);
        self.destructor = Some(self.builder.block(body));
        self
    }

    pub fn function(
        mut self,
        name: &str,
        parameters: &[Parameter<'a>],
        return_type: StaticType<'a>,
        body: &[Statement<'a>],
    ) -> Self {
        let declaration = self
            .builder
            .function_declaration(name, parameters, return_type, body);
        self.functions.push(*declaration);
        self
    }

    pub fn build(self) -> Declaration<'a> {
        let arena = self.builder.arena;
        self.builder.meter(MemoryKind::Declaration, 1);
        Declaration::Composite(arena.alloc(CompositeDeclaration {
            name: self.name,
            kind: self.kind,
            fields: arena.alloc_slice_copy(&self.fields),
            initializer: self.initializer,
            destructor: self.destructor,
            functions: arena.alloc_slice_copy(&self.functions),
            enum_raw_type: self.enum_raw_type,
            enum_cases: arena.alloc_slice_copy(&self.enum_cases),
            span: Span::default(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{CountingGauge, LimitedGauge};
    use std::rc::Rc;

    #[test]
    fn test_builder_meters_each_node() {
        let arena = Bump::new();
        let gauge = Rc::new(CountingGauge::new());
        let b = AstBuilder::with_meter(&arena, Meter::new(gauge.clone()));

        let main = b.fun(
            "main",
            &[],
            StaticType::Number(NumberKind::Int),
            &[b.ret(b.add(b.int(1), b.int(2)))],
        );
        b.program(&[main]).unwrap();

        assert_eq!(gauge.get(MemoryKind::Program), 1);
        assert_eq!(gauge.get(MemoryKind::Declaration), 1);
        assert_eq!(gauge.get(MemoryKind::Statement), 1);
        assert_eq!(gauge.get(MemoryKind::Expression), 3);
        assert_eq!(gauge.get(MemoryKind::Block), 1);
    }

    #[test]
    fn test_literal_text_is_metered_as_string() {
        let arena = Bump::new();
        let gauge = Rc::new(CountingGauge::new());
        let b = AstBuilder::with_meter(&arena, Meter::new(gauge.clone()));

        b.string("hello");
        b.character("a");
        b.string("");

        assert_eq!(gauge.get(MemoryKind::String), 5 + 1 + 1);
    }

    #[test]
    fn test_builder_reports_first_metering_failure() {
        let arena = Bump::new();
        let gauge = Rc::new(LimitedGauge::new(2));
        let b = AstBuilder::with_meter(&arena, Meter::new(gauge));

        b.bool(true);
        b.bool(false);
        b.bool(true);

        let err = b.program(&[]).unwrap_err();
        assert_eq!(err.limit, 2);
        assert_eq!(err.usage.kind, MemoryKind::Expression);
    }

    #[test]
    fn test_composite_builder() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let int = StaticType::Number(NumberKind::Int);

        let declaration = b
            .composite("S", CompositeKind::Structure)
            .field("x", int)
            .init(
                &[b.param("x", int)],
                &[b.assign(b.member(b.ident("self"), "x"), int, b.ident("x"))],
            )
            .function("get", &[], int, &[b.ret(b.member(b.ident("self"), "x"))])
            .build();

        let Declaration::Composite(composite) = declaration else {
            panic!("expected composite");
        };
        assert_eq!(composite.name, "S");
        assert_eq!(composite.fields.len(), 1);
        assert!(composite.initializer.is_some());
        assert_eq!(composite.functions[0].name, "get");
        assert!(composite.field("x").is_some());
        assert!(composite.field("y").is_none());
    }
}
