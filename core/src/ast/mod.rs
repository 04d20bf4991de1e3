//! Checked program representation.
//!
//! Programs arrive from the type checker already validated: every literal has
//! its numeric kind decided, every annotation is resolved to a [`StaticType`],
//! and every resource transfer is spelled out as an explicit move. Nodes are
//! arena-allocated and referenced by `&'a`, so the whole tree is `Copy`.
//!
//! Use [`AstBuilder`] to construct programs.

mod builder;

pub use builder::{AstBuilder, CompositeDeclarationBuilder};

use crate::types::{CompositeKind, NumberKind, PathDomain, StaticType};
use core::fmt;

/// Byte range of a node in the source the program was checked from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Program<'a> {
    pub declarations: &'a [Declaration<'a>],
}

#[derive(Debug, Clone, Copy)]
pub enum Declaration<'a> {
    Variable(&'a VariableDeclaration<'a>),
    Function(&'a FunctionDeclaration<'a>),
    Composite(&'a CompositeDeclaration<'a>),
}

/// How a value travels from the right-hand side into its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    /// `=`
    Copy,
    /// `<-`
    Move,
}

#[derive(Debug, Clone, Copy)]
pub struct VariableDeclaration<'a> {
    pub name: &'a str,
    pub is_constant: bool,
    pub transfer: Transfer,
    pub type_annotation: Option<StaticType<'a>>,
    pub value: &'a Expr<'a>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy)]
pub struct FunctionDeclaration<'a> {
    pub name: &'a str,
    pub function: &'a FunctionExpr<'a>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy)]
pub struct FunctionExpr<'a> {
    pub parameters: &'a [Parameter<'a>],
    pub return_type: StaticType<'a>,
    pub body: Block<'a>,
}

#[derive(Debug, Clone, Copy)]
pub struct Parameter<'a> {
    pub label: Option<&'a str>,
    pub name: &'a str,
    pub ty: StaticType<'a>,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldDeclaration<'a> {
    pub name: &'a str,
    pub ty: StaticType<'a>,
}

#[derive(Debug, Clone, Copy)]
pub struct CompositeDeclaration<'a> {
    pub name: &'a str,
    pub kind: CompositeKind,
    pub fields: &'a [FieldDeclaration<'a>],
    pub initializer: Option<&'a FunctionExpr<'a>>,
    /// Body run by `destroy` before owned resources are destroyed.
    pub destructor: Option<Block<'a>>,
    pub functions: &'a [FunctionDeclaration<'a>],
    /// Raw type and case names of an enum.
    pub enum_raw_type: Option<NumberKind>,
    pub enum_cases: &'a [&'a str],
    pub span: Span,
}

impl<'a> CompositeDeclaration<'a> {
    pub fn static_type(&self) -> StaticType<'a> {
        StaticType::Composite {
            name: self.name,
            kind: self.kind,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDeclaration<'a>> {
        self.fields.iter().find(|field| field.name == name)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Block<'a> {
    pub statements: &'a [Statement<'a>],
}

#[derive(Debug, Clone, Copy)]
pub struct Statement<'a> {
    pub kind: StatementKind<'a>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy)]
pub enum StatementKind<'a> {
    Expression(&'a Expr<'a>),
    Variable(&'a VariableDeclaration<'a>),
    Function(&'a FunctionDeclaration<'a>),
    Assignment {
        target: &'a Expr<'a>,
        transfer: Transfer,
        value: &'a Expr<'a>,
        /// Declared type of the target; optional targets box the value.
        target_type: StaticType<'a>,
    },
    Swap {
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    },
    Return(Option<&'a Expr<'a>>),
    Break,
    Continue,
    If {
        test: IfTest<'a>,
        then: Block<'a>,
        otherwise: Option<Block<'a>>,
    },
    While {
        test: &'a Expr<'a>,
        body: Block<'a>,
    },
    ForIn {
        variable: &'a str,
        iterable: &'a Expr<'a>,
        body: Block<'a>,
    },
    /// C-like `for init; test; update { body }`.
    For {
        init: Option<&'a Statement<'a>>,
        test: Option<&'a Expr<'a>>,
        update: Option<&'a Statement<'a>>,
        body: Block<'a>,
    },
    Switch {
        subject: &'a Expr<'a>,
        cases: &'a [SwitchCase<'a>],
    },
    Emit(&'a Expr<'a>),
}

#[derive(Debug, Clone, Copy)]
pub enum IfTest<'a> {
    Condition(&'a Expr<'a>),
    /// `if let name = optional`
    Binding(&'a VariableDeclaration<'a>),
}

#[derive(Debug, Clone, Copy)]
pub struct SwitchCase<'a> {
    /// `None` for `default`.
    pub value: Option<&'a Expr<'a>>,
    pub body: Block<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
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
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    And,
    Or,
    NilCoalesce,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Modulo => "%",
            BinaryOp::BitwiseOr => "|",
            BinaryOp::BitwiseXor => "^",
            BinaryOp::BitwiseAnd => "&",
            BinaryOp::ShiftLeft => "<<",
            BinaryOp::ShiftRight => ">>",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::NilCoalesce => "??",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    /// `as`
    Static,
    /// `as?`
    Failable,
    /// `as!`
    Force,
}

#[derive(Debug, Clone, Copy)]
pub struct Argument<'a> {
    pub label: Option<&'a str>,
    pub value: &'a Expr<'a>,
}

#[derive(Debug, Clone, Copy)]
pub enum Expr<'a> {
    Bool(bool),
    Nil,
    /// Integer literal in decimal, optionally negative.
    Integer {
        literal: &'a str,
        kind: NumberKind,
    },
    /// Fixed-point literal such as `1.5` or `-0.00000001`.
    FixedPoint {
        literal: &'a str,
        kind: NumberKind,
    },
    String(&'a str),
    Character(&'a str),
    Address(u64),
    Path {
        domain: PathDomain,
        identifier: &'a str,
    },
    Array {
        elements: &'a [&'a Expr<'a>],
        ty: StaticType<'a>,
    },
    Dictionary {
        entries: &'a [(&'a Expr<'a>, &'a Expr<'a>)],
        ty: StaticType<'a>,
    },
    Identifier(&'a str),
    /// `<-expr`
    Move(&'a Expr<'a>),
    Member {
        target: &'a Expr<'a>,
        name: &'a str,
        optional: bool,
    },
    Index {
        target: &'a Expr<'a>,
        index: &'a Expr<'a>,
    },
    Invocation {
        callee: &'a Expr<'a>,
        type_arguments: &'a [StaticType<'a>],
        arguments: &'a [Argument<'a>],
    },
    Unary {
        op: UnaryOp,
        operand: &'a Expr<'a>,
    },
    Binary {
        op: BinaryOp,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    },
    Conditional {
        test: &'a Expr<'a>,
        then: &'a Expr<'a>,
        otherwise: &'a Expr<'a>,
    },
    Function(&'a FunctionExpr<'a>),
    Cast {
        expr: &'a Expr<'a>,
        kind: CastKind,
        ty: StaticType<'a>,
    },
    Force(&'a Expr<'a>),
    Create(&'a Expr<'a>),
    Destroy(&'a Expr<'a>),
    /// `&expr as &T`; `ty` is the reference type, possibly optional.
    Reference {
        expr: &'a Expr<'a>,
        ty: StaticType<'a>,
    },
}
