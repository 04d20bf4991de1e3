//! Value model and evaluation engine for a resource-oriented language.
//!
//! Programs arrive as an already-checked [`ast::Program`] allocated in a
//! `bumpalo` arena. The [`interpreter::Interpreter`] evaluates them against an
//! injected memory gauge, account storage and optional test framework.
//!
//! Every allocation is reported through a [`memory::Meter`]:
//!
//! ```
//! use ingot_core::memory::{CountingGauge, MemoryKind, Meter};
//! use ingot_core::types::NumberKind;
//! use ingot_core::values::NumberValue;
//! use std::rc::Rc;
//!
//! let gauge = Rc::new(CountingGauge::new());
//! let meter = Meter::new(gauge.clone());
//! let a = NumberValue::from_literal("250", NumberKind::UInt8, &meter).unwrap();
//! let b = NumberValue::from_literal("10", NumberKind::UInt8, &meter).unwrap();
//!
//! assert!(a.add(&b, &meter).is_err());
//! assert_eq!(a.saturating_add(&b, &meter).unwrap().to_string(), "255");
//! // two literals, then one result each for the failed and the saturating add
//! assert_eq!(gauge.get(MemoryKind::Number), 4);
//! ```

pub mod ast;
pub mod interpreter;
pub mod memory;
pub mod scope_stack;
pub mod stdlib;
pub mod storage;
pub mod types;
pub mod values;

/// Test utilities for enabling logging in tests
#[cfg(test)]
pub mod test_utils {
    /// Initialize tracing subscriber for tests with DEBUG level
    /// Call this at the start of tests where you want to see logging output
    ///
    /// # Example
    /// ```ignore
    /// #[test]
    /// fn test_resource_loss() {
    ///     test_utils::init_test_logging();
    ///     // ... your test code
    /// }
    /// ```
    pub fn init_test_logging() {
        use tracing_subscriber::{EnvFilter, fmt};

        // Try to initialize, ignore error if already initialized
        let _ = fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    }
}
