use super::{ResourceState, Value};
use crate::memory::{MemoryKind, MemoryLimitExceeded, Meter};
use crate::types::StaticType;
use core::cell::{Cell, Ref, RefCell, RefMut};
use core::fmt;
use core::hash::{Hash, Hasher};
use indexmap::IndexMap;
use std::rc::Rc;

/// A variable-sized array. `ty` is the array type, not the element type.
pub struct ArrayValue<'a> {
    pub ty: StaticType<'a>,
    elements: RefCell<Vec<Value<'a>>>,
    state: Cell<ResourceState>,
}

impl<'a> ArrayValue<'a> {
    pub fn new(
        meter: &Meter<'_>,
        ty: StaticType<'a>,
        elements: Vec<Value<'a>>,
    ) -> Result<Rc<Self>, MemoryLimitExceeded> {
        meter.report(MemoryKind::Array, 1)?;
        Ok(Rc::new(Self {
            ty,
            elements: RefCell::new(elements),
            state: Cell::new(ResourceState::InTransit),
        }))
    }

    pub fn element_type(&self) -> StaticType<'a> {
        self.ty.element_type().copied().unwrap_or(StaticType::AnyStruct)
    }

    pub fn is_resource(&self) -> bool {
        self.ty.is_resource()
    }

    pub fn len(&self) -> usize {
        self.elements.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.borrow().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Value<'a>> {
        self.elements.borrow().get(index).cloned()
    }

    pub fn elements(&self) -> Ref<'_, Vec<Value<'a>>> {
        self.elements.borrow()
    }

    pub fn elements_mut(&self) -> RefMut<'_, Vec<Value<'a>>> {
        self.elements.borrow_mut()
    }

    pub fn state(&self) -> ResourceState {
        self.state.get()
    }

    pub fn set_state(&self, state: ResourceState) {
        self.state.set(state);
    }

    pub(super) fn copy(&self, meter: &Meter<'_>) -> Result<Rc<Self>, MemoryLimitExceeded> {
        let elements = self
            .elements
            .borrow()
            .iter()
            .map(|element| {
                element.meter_read(meter)?;
                element.transfer(meter)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(meter, self.ty, elements)
    }
}

impl fmt::Debug for ArrayValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayValue")
            .field("ty", &self.ty)
            .field("elements", &self.elements.borrow())
            .finish()
    }
}

impl fmt::Display for ArrayValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, element) in self.elements.borrow().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", element)?;
        }
        f.write_str("]")
    }
}

/// Dictionary key, hashed and compared by value.
///
/// Only hashable values (booleans, characters, strings, numbers, addresses,
/// paths and enum cases) are used as keys.
#[derive(Clone, Debug)]
pub struct DictionaryKey<'a>(pub Value<'a>);

impl PartialEq for DictionaryKey<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.0.equals(&other.0)
    }
}

impl Eq for DictionaryKey<'_> {}

impl Hash for DictionaryKey<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_value(&self.0, state);
    }
}

fn hash_value<H: Hasher>(value: &Value<'_>, state: &mut H) {
    core::mem::discriminant(value).hash(state);
    match value {
        Value::Bool(b) => b.hash(state),
        Value::Character(s) | Value::String(s) => s.hash(state),
        Value::Number(n) => n.hash(state),
        Value::Address(a) => a.hash(state),
        Value::Path(p) => p.hash(state),
        Value::Some(inner) => hash_value(inner, state),
        Value::Composite(c) => {
            c.name.hash(state);
            if let Some(raw) = c.field("rawValue") {
                hash_value(&raw, state);
            }
        }
        _ => {}
    }
}

/// A dictionary preserving insertion order.
pub struct DictionaryValue<'a> {
    pub ty: StaticType<'a>,
    entries: RefCell<IndexMap<DictionaryKey<'a>, Value<'a>>>,
    state: Cell<ResourceState>,
}

impl<'a> DictionaryValue<'a> {
    pub fn new(
        meter: &Meter<'_>,
        ty: StaticType<'a>,
        entries: IndexMap<DictionaryKey<'a>, Value<'a>>,
    ) -> Result<Rc<Self>, MemoryLimitExceeded> {
        meter.report(MemoryKind::Dictionary, 1)?;
        Ok(Rc::new(Self {
            ty,
            entries: RefCell::new(entries),
            state: Cell::new(ResourceState::InTransit),
        }))
    }

    pub fn key_type(&self) -> StaticType<'a> {
        match self.ty {
            StaticType::Dictionary { key, .. } => *key,
            _ => StaticType::AnyStruct,
        }
    }

    pub fn value_type(&self) -> StaticType<'a> {
        match self.ty {
            StaticType::Dictionary { value, .. } => *value,
            _ => StaticType::AnyStruct,
        }
    }

    pub fn is_resource(&self) -> bool {
        self.ty.is_resource()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn get(&self, key: &Value<'a>) -> Option<Value<'a>> {
        self.entries
            .borrow()
            .get(&DictionaryKey(key.clone()))
            .cloned()
    }

    pub fn contains_key(&self, key: &Value<'a>) -> bool {
        self.entries
            .borrow()
            .contains_key(&DictionaryKey(key.clone()))
    }

    /// Insert, returning the previous value for the key.
    pub fn insert(&self, key: Value<'a>, value: Value<'a>) -> Option<Value<'a>> {
        self.entries.borrow_mut().insert(DictionaryKey(key), value)
    }

    /// Remove a key, keeping the order of the remaining entries.
    pub fn remove(&self, key: &Value<'a>) -> Option<Value<'a>> {
        self.entries
            .borrow_mut()
            .shift_remove(&DictionaryKey(key.clone()))
    }

    pub fn entries(&self) -> Ref<'_, IndexMap<DictionaryKey<'a>, Value<'a>>> {
        self.entries.borrow()
    }

    pub fn state(&self) -> ResourceState {
        self.state.get()
    }

    pub fn set_state(&self, state: ResourceState) {
        self.state.set(state);
    }

    pub(super) fn copy(&self, meter: &Meter<'_>) -> Result<Rc<Self>, MemoryLimitExceeded> {
        let entries = self
            .entries
            .borrow()
            .iter()
            .map(|(key, value)| {
                value.meter_read(meter)?;
                Ok((DictionaryKey(key.0.transfer(meter)?), value.transfer(meter)?))
            })
            .collect::<Result<IndexMap<_, _>, MemoryLimitExceeded>>()?;
        Self::new(meter, self.ty, entries)
    }
}

impl fmt::Debug for DictionaryValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DictionaryValue")
            .field("ty", &self.ty)
            .field("entries", &self.entries.borrow())
            .finish()
    }
}

impl fmt::Display for DictionaryValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.entries.borrow().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", key.0, value)?;
        }
        f.write_str("}")
    }
}
