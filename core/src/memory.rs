//! Memory metering.
//!
//! Every allocation the interpreter performs on behalf of a program is reported
//! to a [`MemoryGauge`] as a `(kind, amount)` pair. Hosts use this to bound the
//! resources a single execution may consume.
//!
//! The gauge is injected once, at construction time, and threaded through every
//! value constructor as a [`Meter`]. When no gauge is attached, reporting is a
//! no-op.
//!
//! # Example
//!
//! ```ignore
//! let gauge = Rc::new(CountingGauge::new());
//! let meter = Meter::new(gauge.clone());
//! meter.report(MemoryKind::Bool, 1)?;
//! assert_eq!(gauge.get(MemoryKind::Bool), 1);
//! ```

use core::cell::{Cell, RefCell};
use core::fmt;
use hashbrown::HashMap;
use std::rc::Rc;
use thiserror::Error;
use tracing::trace;

/// Category of a metered allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryKind {
    // Values
    Bool,
    Nil,
    Void,
    Address,
    Number,
    BigInt,
    String,
    Character,
    Optional,
    Array,
    Dictionary,
    Composite,
    InterpretedFunction,
    HostFunction,
    BoundFunction,
    StorageReference,
    EphemeralReference,
    Path,
    Capability,
    Link,
    Variable,

    // Program representation
    Program,
    Declaration,
    Statement,
    Expression,
    Type,
    Parameter,
    Argument,
    Block,
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A single usage report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryUsage {
    pub kind: MemoryKind,
    pub amount: u64,
}

impl MemoryUsage {
    pub fn new(kind: MemoryKind, amount: u64) -> Self {
        Self { kind, amount }
    }
}

/// Raised by a gauge that refuses an allocation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "memory limit exceeded: {} units of {} requested with {used} of {limit} used",
    .usage.amount,
    .usage.kind
)]
pub struct MemoryLimitExceeded {
    pub usage: MemoryUsage,
    pub limit: u64,
    pub used: u64,
}

/// Sink for allocation reports.
///
/// Implementations record usage and may reject it. A rejection aborts the
/// running execution with a resource-limit error.
pub trait MemoryGauge {
    fn meter_memory(&self, usage: MemoryUsage) -> Result<(), MemoryLimitExceeded>;
}

/// Handle through which value constructors report their cost.
///
/// Cloning a meter shares the underlying gauge.
#[derive(Clone, Default)]
pub struct Meter<'a> {
    gauge: Option<Rc<dyn MemoryGauge + 'a>>,
}

impl<'a> Meter<'a> {
    pub fn new(gauge: Rc<dyn MemoryGauge + 'a>) -> Self {
        Self { gauge: Some(gauge) }
    }

    /// A meter that discards every report.
    pub fn none() -> Self {
        Self { gauge: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.gauge.is_some()
    }

    /// Report `amount` units of `kind`.
    pub fn report(&self, kind: MemoryKind, amount: u64) -> Result<(), MemoryLimitExceeded> {
        let Some(gauge) = &self.gauge else {
            return Ok(());
        };
        trace!(%kind, amount, "meter");
        gauge.meter_memory(MemoryUsage::new(kind, amount))
    }
}

impl fmt::Debug for Meter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Meter")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

// ============================================================================
// Gauges
// ============================================================================

/// Gauge that accumulates totals per kind and never rejects.
#[derive(Debug, Default)]
pub struct CountingGauge {
    totals: RefCell<HashMap<MemoryKind, u64>>,
}

impl CountingGauge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cumulative amount reported for `kind`.
    pub fn get(&self, kind: MemoryKind) -> u64 {
        self.totals.borrow().get(&kind).copied().unwrap_or(0)
    }

    /// Cumulative amount across all kinds.
    pub fn total(&self) -> u64 {
        self.totals.borrow().values().sum()
    }

    pub fn reset(&self) {
        self.totals.borrow_mut().clear();
    }
}

impl MemoryGauge for CountingGauge {
    fn meter_memory(&self, usage: MemoryUsage) -> Result<(), MemoryLimitExceeded> {
        *self.totals.borrow_mut().entry(usage.kind).or_insert(0) += usage.amount;
        Ok(())
    }
}

/// Gauge with a hard limit on the total amount reported.
#[derive(Debug)]
pub struct LimitedGauge {
    counts: CountingGauge,
    limit: u64,
    used: Cell<u64>,
}

impl LimitedGauge {
    pub fn new(limit: u64) -> Self {
        Self {
            counts: CountingGauge::new(),
            limit,
            used: Cell::new(0),
        }
    }

    pub fn get(&self, kind: MemoryKind) -> u64 {
        self.counts.get(kind)
    }

    pub fn used(&self) -> u64 {
        self.used.get()
    }
}

impl MemoryGauge for LimitedGauge {
    fn meter_memory(&self, usage: MemoryUsage) -> Result<(), MemoryLimitExceeded> {
        let used = self.used.get();
        let next = used.saturating_add(usage.amount);
        if next > self.limit {
            return Err(MemoryLimitExceeded {
                usage,
                limit: self.limit,
                used,
            });
        }
        self.used.set(next);
        self.counts.meter_memory(usage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_counting_gauge_accumulates_per_kind() {
        let gauge = Rc::new(CountingGauge::new());
        let meter = Meter::new(gauge.clone());

        meter.report(MemoryKind::Bool, 1).unwrap();
        meter.report(MemoryKind::Bool, 1).unwrap();
        meter.report(MemoryKind::Number, 8).unwrap();

        assert_eq!(gauge.get(MemoryKind::Bool), 2);
        assert_eq!(gauge.get(MemoryKind::Number), 8);
        assert_eq!(gauge.get(MemoryKind::Array), 0);
        assert_eq!(gauge.total(), 10);

        gauge.reset();
        assert_eq!(gauge.total(), 0);
    }

    #[test]
    fn test_meter_without_gauge_is_noop() {
        let meter = Meter::none();
        assert!(!meter.is_enabled());
        assert!(meter.report(MemoryKind::Composite, u64::MAX).is_ok());
    }

    #[test]
    fn test_cloned_meter_shares_gauge() {
        let gauge = Rc::new(CountingGauge::new());
        let meter = Meter::new(gauge.clone());
        let other = meter.clone();

        meter.report(MemoryKind::Variable, 1).unwrap();
        other.report(MemoryKind::Variable, 1).unwrap();

        assert_eq!(gauge.get(MemoryKind::Variable), 2);
    }

    #[test]
    fn test_limited_gauge_rejects_past_limit() {
        let gauge = Rc::new(LimitedGauge::new(10));
        let meter = Meter::new(gauge.clone());

        meter.report(MemoryKind::Number, 8).unwrap();
        let err = meter.report(MemoryKind::Number, 8).unwrap_err();

        assert_eq!(err.limit, 10);
        assert_eq!(err.used, 8);
        assert_eq!(err.usage, MemoryUsage::new(MemoryKind::Number, 8));
        // The rejected report is not recorded.
        assert_eq!(gauge.used(), 8);
        assert_eq!(gauge.get(MemoryKind::Number), 8);

        meter.report(MemoryKind::Bool, 2).unwrap();
        assert_eq!(gauge.used(), 10);
    }
}
