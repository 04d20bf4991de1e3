//! Execution errors.
//!
//! Every error aborts the current execution; nothing is recovered locally.
//!
//! # Error Categories
//!
//! - **Resource exceeded**: the gauge rejected an allocation, or invocations
//!   nested past the configured depth.
//! - **Ownership**: a resource was used after being moved or destroyed, lost
//!   without being destroyed, or reached through a dead reference.
//! - **Arithmetic**: overflow, underflow, division by zero and negative shifts
//!   in non-saturating operations.
//! - **Runtime**: other program-level failures such as out-of-bounds indexing,
//!   failed force-unwraps and casts, `panic` and failed assertions.
//! - **Host**: failures raised by host functions.
//! - **Internal**: broken invariants that indicate a bug in the embedding or
//!   the checker, never a program error.

use crate::ast::Span;
use crate::memory::MemoryLimitExceeded;
use crate::types::NumberKind;
use core::fmt;
use thiserror::Error;

/// Error that terminated an execution, with the span of the innermost
/// statement being executed when it was raised.
#[derive(Debug)]
pub struct ExecutionError {
    pub kind: ErrorKind,
    pub span: Option<Span>,
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error(transparent)]
    ResourceExceeded(#[from] ResourceExceededError),
    #[error(transparent)]
    Ownership(#[from] OwnershipError),
    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Host(#[from] HostError),
    #[error(transparent)]
    Internal(#[from] InternalError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceExceededError {
    #[error(transparent)]
    Memory(#[from] MemoryLimitExceeded),

    #[error("call stack overflow: depth {depth} exceeds maximum of {max_depth}")]
    StackOverflow { depth: usize, max_depth: usize },

    #[error("loop exceeded the maximum of {max_iterations} iterations")]
    IterationLimit { max_iterations: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OwnershipError {
    #[error("use of moved value `{name}`")]
    UseAfterMove { name: String },

    #[error("use of destroyed resource of type {type_name}")]
    UseOfDestroyedResource { type_name: String },

    #[error("resource of type {type_name} is already destroyed")]
    DoubleDestroy { type_name: String },

    #[error("loss of resource of type {type_name}")]
    ResourceLoss { type_name: String },

    #[error("resource of type {type_name} is still owned elsewhere")]
    DuplicateResource { type_name: String },

    #[error("reference to `{name}` outlived its scope")]
    InvalidatedReference { name: String },

    #[error("failed to dereference storage reference to {path} in account {address}")]
    DereferenceFailed { address: String, path: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    #[error("{kind} overflow")]
    Overflow { kind: NumberKind },

    #[error("{kind} underflow")]
    Underflow { kind: NumberKind },

    #[error("division by zero")]
    DivisionByZero,

    #[error("negative shift amount")]
    NegativeShift,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("index {index} out of bounds (length: {len})")]
    IndexOutOfBounds { index: String, len: usize },

    #[error("unexpectedly found nil while forcing an optional")]
    ForceNil,

    #[error("failed to force-cast value: expected {expected}, got {actual}")]
    ForceCastFailed { expected: String, actual: String },

    #[error("panic: {message}")]
    Panic { message: String },

    #[error("assertion failed: {message}")]
    AssertionFailed { message: String },

    #[error("failed to save object: path {path} in account {address} already stores an object")]
    StorageOverwrite { address: String, path: String },

    #[error("value does not conform to {expected}: got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("invalid hex string")]
    InvalidHexString,
}

/// Failure raised by a host function.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{function}: {message}")]
pub struct HostError {
    pub function: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalError {
    #[error("test framework not provided")]
    TestFrameworkNotProvided,

    #[error("undefined variable `{name}`")]
    UndefinedVariable { name: String },

    #[error("undefined composite type `{name}`")]
    UndefinedType { name: String },

    #[error("no member `{name}` on {type_name}")]
    UnknownMember { name: String, type_name: String },

    #[error("expected {expected}, found {found}")]
    UnexpectedValue { expected: String, found: String },

    #[error("operation `{operation}` is not supported by {kind}")]
    UnsupportedOperation {
        operation: &'static str,
        kind: String,
    },

    #[error("invalid literal `{literal}` for {kind}")]
    InvalidLiteral { literal: String, kind: NumberKind },

    #[error("expected {expected} arguments, got {actual}")]
    ArgumentCount { expected: usize, actual: usize },

    #[error("{statement} outside of {construct}")]
    MisplacedControlFlow {
        statement: &'static str,
        construct: &'static str,
    },

    #[error("invalid assignment target")]
    InvalidAssignmentTarget,
}

impl ExecutionError {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, span: None }
    }

    /// Attach `span` unless a more specific one is already present.
    pub fn with_span(mut self, span: Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span);
        }
        self
    }

    pub fn is_resource_exceeded(&self) -> bool {
        matches!(self.kind, ErrorKind::ResourceExceeded(_))
    }

    pub fn is_internal(&self) -> bool {
        matches!(self.kind, ErrorKind::Internal(_))
    }

    pub fn ownership(&self) -> Option<&OwnershipError> {
        match &self.kind {
            ErrorKind::Ownership(e) => Some(e),
            _ => None,
        }
    }

    pub fn arithmetic(&self) -> Option<&ArithmeticError> {
        match &self.kind {
            ErrorKind::Arithmetic(e) => Some(e),
            _ => None,
        }
    }

    pub fn runtime(&self) -> Option<&RuntimeError> {
        match &self.kind {
            ErrorKind::Runtime(e) => Some(e),
            _ => None,
        }
    }

    pub fn internal(&self) -> Option<&InternalError> {
        match &self.kind {
            ErrorKind::Internal(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(span) = self.span {
            write!(f, " at {}", span)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExecutionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

impl From<ErrorKind> for ExecutionError {
    fn from(kind: ErrorKind) -> Self {
        ExecutionError::new(kind)
    }
}

// Convenient conversions for error construction
macro_rules! impl_from_error {
    ($($error:ty),* $(,)?) => {
        $(
            impl From<$error> for ExecutionError {
                fn from(e: $error) -> Self {
                    ExecutionError::new(ErrorKind::from(e))
                }
            }
        )*
    };
}

impl_from_error!(
    ResourceExceededError,
    OwnershipError,
    ArithmeticError,
    RuntimeError,
    HostError,
    InternalError,
);

impl From<MemoryLimitExceeded> for ExecutionError {
    fn from(e: MemoryLimitExceeded) -> Self {
        ExecutionError::new(ErrorKind::ResourceExceeded(e.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryKind, MemoryUsage};

    #[test]
    fn test_display_includes_span() {
        let err = ExecutionError::from(ArithmeticError::Overflow {
            kind: NumberKind::Int8,
        })
        .with_span(Span::new(3, 9));
        assert_eq!(err.to_string(), "Int8 overflow at 3..9");
    }

    #[test]
    fn test_innermost_span_wins() {
        let err = ExecutionError::from(RuntimeError::ForceNil)
            .with_span(Span::new(1, 2))
            .with_span(Span::new(0, 10));
        assert_eq!(err.span, Some(Span::new(1, 2)));
    }

    #[test]
    fn test_memory_limit_is_resource_exceeded() {
        let err = ExecutionError::from(MemoryLimitExceeded {
            usage: MemoryUsage::new(MemoryKind::Array, 1),
            limit: 0,
            used: 0,
        });
        assert!(err.is_resource_exceeded());
        assert!(!err.is_internal());
    }

    #[test]
    fn test_test_framework_message() {
        let err = ExecutionError::from(InternalError::TestFrameworkNotProvided);
        assert!(err.is_internal());
        assert_eq!(err.to_string(), "test framework not provided");
    }
}
