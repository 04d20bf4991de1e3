use super::{Address, PathValue, Value};
use crate::memory::{MemoryKind, MemoryLimitExceeded, Meter};
use crate::scope_stack::Liveness;
use crate::types::StaticType;
use core::fmt;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub enum ReferenceValue<'a> {
    Ephemeral(Rc<EphemeralReference<'a>>),
    Storage(Rc<StorageReference<'a>>),
}

impl<'a> ReferenceValue<'a> {
    pub fn authorized(&self) -> bool {
        match self {
            ReferenceValue::Ephemeral(r) => r.authorized,
            ReferenceValue::Storage(r) => r.authorized,
        }
    }

    pub fn borrowed_type(&self) -> StaticType<'a> {
        match self {
            ReferenceValue::Ephemeral(r) => r.borrowed_type,
            ReferenceValue::Storage(r) => r.borrowed_type,
        }
    }
}

/// Direct alias to a value, valid while the scope of its root variable lives.
#[derive(Debug)]
pub struct EphemeralReference<'a> {
    pub value: Value<'a>,
    pub authorized: bool,
    pub borrowed_type: StaticType<'a>,
    /// Liveness of the variable the reference was taken from, with its name.
    pub origin: Option<(Liveness, &'a str)>,
}

impl<'a> EphemeralReference<'a> {
    pub fn new(
        meter: &Meter<'_>,
        value: Value<'a>,
        authorized: bool,
        borrowed_type: StaticType<'a>,
        origin: Option<(Liveness, &'a str)>,
    ) -> Result<Rc<Self>, MemoryLimitExceeded> {
        meter.report(MemoryKind::EphemeralReference, 1)?;
        Ok(Rc::new(Self {
            value,
            authorized,
            borrowed_type,
            origin,
        }))
    }
}

/// Reference into account storage, resolved on every dereference.
#[derive(Debug)]
pub struct StorageReference<'a> {
    pub address: Address,
    pub path: PathValue,
    pub authorized: bool,
    pub borrowed_type: StaticType<'a>,
}

impl<'a> StorageReference<'a> {
    pub fn new(
        meter: &Meter<'_>,
        address: Address,
        path: PathValue,
        authorized: bool,
        borrowed_type: StaticType<'a>,
    ) -> Result<Rc<Self>, MemoryLimitExceeded> {
        meter.report(MemoryKind::StorageReference, 1)?;
        Ok(Rc::new(Self {
            address,
            path,
            authorized,
            borrowed_type,
        }))
    }
}

impl fmt::Display for ReferenceValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceValue::Ephemeral(r) => write!(f, "{}", r.value),
            ReferenceValue::Storage(r) => {
                write!(f, "StorageReference({}, {})", r.address, r.path)
            }
        }
    }
}
