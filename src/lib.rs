//! Ingot - an interpreter for a resource-oriented smart contract language
//!
//! # Overview
//!
//! Ingot evaluates already type-checked programs whose values may be
//! *resources*: linear values that must be moved or destroyed explicitly and
//! can never be copied or silently dropped. The interpreter enforces those
//! rules at runtime and reports every allocation to an injected memory gauge,
//! so a host can bound the memory a script or transaction may use.
//!
//! # Quick Start
//!
//! ```
//! use bumpalo::Bump;
//! use ingot::{AstBuilder, CountingGauge, Interpreter, MemoryKind, NumberKind, StaticType};
//! use std::rc::Rc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let arena = Bump::new();
//! let b = AstBuilder::new(&arena);
//! let program = b.program(&[b.fun(
//!     "main",
//!     &[],
//!     StaticType::Number(NumberKind::Int),
//!     &[b.ret(b.add(b.int(1), b.int(2)))],
//! )])?;
//!
//! let gauge = Rc::new(CountingGauge::new());
//! let mut interpreter = Interpreter::builder(program)
//!     .memory_gauge(gauge.clone())
//!     .build()?;
//! assert_eq!(interpreter.invoke("main", vec![])?.to_string(), "3");
//! assert_eq!(gauge.get(MemoryKind::BigInt), 32);
//! # Ok(())
//! # }
//! ```
//!
//! # Collaborators
//!
//! The interpreter does not parse or type-check. Programs are built through
//! [`AstBuilder`], which stands in for a front end. Account storage is
//! accessed through the [`Storage`] trait and `executeScript` through an
//! optional [`TestFramework`]; both are injected through the builder.

pub use ingot_core::ast::{self, AstBuilder, BinaryOp, CastKind, Program, Span, Transfer};
pub use ingot_core::interpreter::{
    self, ExecutionError, ExecutionOptions, Interpreter, InterpreterBuilder, Invocation,
};
pub use ingot_core::memory::{
    CountingGauge, LimitedGauge, MemoryGauge, MemoryKind, MemoryLimitExceeded, MemoryUsage, Meter,
};
pub use ingot_core::stdlib::{ScriptResult, TestFramework};
pub use ingot_core::storage::{InMemoryStorage, Storage};
pub use ingot_core::types::{self, CompositeKind, NumberKind, PathDomain, StaticType};
pub use ingot_core::values::{self, Address, Value};
