use super::{Address, HostFn, Value};
use crate::memory::{MemoryKind, MemoryLimitExceeded, Meter};
use crate::types::{CompositeKind, StaticType};
use core::cell::{Cell, Ref, RefCell};
use core::fmt;
use indexmap::IndexMap;
use std::rc::Rc;

/// Ownership state of a resource-kinded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    /// Bound to exactly one slot.
    Live,
    /// Created, moved out of a slot, or passed as an argument; not yet rebound.
    InTransit,
    Destroyed,
}

/// An instance of a structure, resource, contract, enum or event.
pub struct CompositeValue<'a> {
    pub name: &'a str,
    pub kind: CompositeKind,
    fields: RefCell<IndexMap<&'a str, Value<'a>>>,
    /// Native members of host-provided composites such as accounts.
    functions: IndexMap<&'a str, HostFn<'a>>,
    state: Cell<ResourceState>,
    owner: Cell<Option<Address>>,
}

impl<'a> CompositeValue<'a> {
    pub fn new(
        meter: &Meter<'_>,
        name: &'a str,
        kind: CompositeKind,
        fields: IndexMap<&'a str, Value<'a>>,
    ) -> Result<Rc<Self>, MemoryLimitExceeded> {
        Self::with_functions(meter, name, kind, fields, IndexMap::new())
    }

    pub fn with_functions(
        meter: &Meter<'_>,
        name: &'a str,
        kind: CompositeKind,
        fields: IndexMap<&'a str, Value<'a>>,
        functions: IndexMap<&'a str, HostFn<'a>>,
    ) -> Result<Rc<Self>, MemoryLimitExceeded> {
        meter.report(MemoryKind::Composite, 1)?;
        Ok(Rc::new(Self {
            name,
            kind,
            fields: RefCell::new(fields),
            functions,
            state: Cell::new(ResourceState::InTransit),
            owner: Cell::new(None),
        }))
    }

    pub fn static_type(&self) -> StaticType<'a> {
        if self.is_account() {
            return StaticType::AuthAccount;
        }
        StaticType::Composite {
            name: self.name,
            kind: self.kind,
        }
    }

    pub fn is_resource(&self) -> bool {
        self.kind == CompositeKind::Resource
    }

    /// Host handles carry native functions and are shared rather than copied.
    pub fn is_handle(&self) -> bool {
        !self.functions.is_empty()
    }

    fn is_account(&self) -> bool {
        self.is_handle() && self.name == "AuthAccount"
    }

    pub fn field(&self, name: &str) -> Option<Value<'a>> {
        self.fields.borrow().get(name).cloned()
    }

    /// Replace a field, returning the previous value.
    pub fn set_field(&self, name: &'a str, value: Value<'a>) -> Option<Value<'a>> {
        self.fields.borrow_mut().insert(name, value)
    }

    pub fn fields(&self) -> Ref<'_, IndexMap<&'a str, Value<'a>>> {
        self.fields.borrow()
    }

    pub fn function(&self, name: &str) -> Option<HostFn<'a>> {
        self.functions.get(name).cloned()
    }

    pub fn state(&self) -> ResourceState {
        self.state.get()
    }

    pub fn set_state(&self, state: ResourceState) {
        self.state.set(state);
    }

    pub fn owner(&self) -> Option<Address> {
        self.owner.get()
    }

    /// Set the owning account of this value and every nested resource.
    pub fn set_owner(&self, owner: Option<Address>) {
        self.owner.set(owner);
        for value in self.fields.borrow().values() {
            value.set_owner(owner);
        }
    }

    /// Deep copy of a copyable composite.
    pub(super) fn copy(&self, meter: &Meter<'_>) -> Result<Rc<Self>, MemoryLimitExceeded> {
        let fields = self
            .fields
            .borrow()
            .iter()
            .map(|(name, value)| {
                value.meter_read(meter)?;
                Ok((*name, value.transfer(meter)?))
            })
            .collect::<Result<IndexMap<_, _>, MemoryLimitExceeded>>()?;
        Self::with_functions(meter, self.name, self.kind, fields, self.functions.clone())
    }
}

impl fmt::Debug for CompositeValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeValue")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("fields", &self.fields.borrow())
            .field("state", &self.state.get())
            .field("owner", &self.owner.get())
            .finish()
    }
}

impl fmt::Display for CompositeValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == CompositeKind::Enum {
            if let Some(raw) = self.field("rawValue") {
                return write!(f, "{}({})", self.name, raw);
            }
        }
        write!(f, "{}(", self.name)?;
        for (i, (name, value)) in self.fields.borrow().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", name, value)?;
        }
        f.write_str(")")
    }
}
