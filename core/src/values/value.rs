use super::{
    Address, ArrayValue, CapabilityValue, CompositeValue, DictionaryValue, FunctionValue,
    LinkValue, NumberValue, PathValue, ReferenceValue, ResourceState, string,
};
use crate::memory::{MemoryKind, MemoryLimitExceeded, Meter};
use crate::types::{CompositeKind, PathDomain, PathType, StaticType};
use core::cmp::Ordering;
use core::fmt;
use std::rc::Rc;

/// A runtime value.
///
/// Scalars are stored inline and copied freely. Arrays, dictionaries and
/// composites are shared through `Rc`; copying one of them into a new slot goes
/// through [`Value::transfer`], which deep-copies non-resource values and
/// passes resources through unchanged so they keep a single identity.
#[derive(Debug, Clone)]
pub enum Value<'a> {
    Void,
    /// The absent optional.
    Nil,
    Bool(bool),
    Character(Rc<str>),
    String(Rc<str>),
    Address(Address),
    Number(NumberValue),
    /// The present optional.
    Some(Box<Value<'a>>),
    Array(Rc<ArrayValue<'a>>),
    Dictionary(Rc<DictionaryValue<'a>>),
    Composite(Rc<CompositeValue<'a>>),
    Function(FunctionValue<'a>),
    Reference(ReferenceValue<'a>),
    Path(PathValue),
    Capability(Rc<CapabilityValue<'a>>),
    Link(Rc<LinkValue<'a>>),
}

// ============================================================================
// Metered constructors
// ============================================================================

impl<'a> Value<'a> {
    pub fn new_bool(meter: &Meter<'_>, value: bool) -> Result<Self, MemoryLimitExceeded> {
        meter.report(MemoryKind::Bool, 1)?;
        Ok(Value::Bool(value))
    }

    pub fn new_nil(meter: &Meter<'_>) -> Result<Self, MemoryLimitExceeded> {
        meter.report(MemoryKind::Nil, 1)?;
        Ok(Value::Nil)
    }

    pub fn new_void(meter: &Meter<'_>) -> Result<Self, MemoryLimitExceeded> {
        meter.report(MemoryKind::Void, 1)?;
        Ok(Value::Void)
    }

    pub fn new_string(meter: &Meter<'_>, text: &str) -> Result<Self, MemoryLimitExceeded> {
        meter.report(MemoryKind::String, (text.len() as u64).max(1))?;
        Ok(Value::String(Rc::from(text)))
    }

    pub fn new_character(meter: &Meter<'_>, text: &str) -> Result<Self, MemoryLimitExceeded> {
        meter.report(MemoryKind::Character, 1)?;
        Ok(Value::Character(Rc::from(text)))
    }

    pub fn new_address(meter: &Meter<'_>, address: Address) -> Result<Self, MemoryLimitExceeded> {
        meter.report(MemoryKind::Address, 1)?;
        Ok(Value::Address(address))
    }

    pub fn new_path(
        meter: &Meter<'_>,
        domain: PathDomain,
        identifier: &str,
    ) -> Result<Self, MemoryLimitExceeded> {
        meter.report(MemoryKind::Path, 1)?;
        Ok(Value::Path(PathValue::new(domain, identifier)))
    }

    pub fn new_some(meter: &Meter<'_>, value: Value<'a>) -> Result<Self, MemoryLimitExceeded> {
        meter.report(MemoryKind::Optional, 1)?;
        Ok(Value::Some(Box::new(value)))
    }

    pub fn new_capability(
        meter: &Meter<'_>,
        capability: CapabilityValue<'a>,
    ) -> Result<Self, MemoryLimitExceeded> {
        meter.report(MemoryKind::Capability, 1)?;
        Ok(Value::Capability(Rc::new(capability)))
    }

    pub fn new_link(meter: &Meter<'_>, link: LinkValue<'a>) -> Result<Self, MemoryLimitExceeded> {
        meter.report(MemoryKind::Link, 1)?;
        Ok(Value::Link(Rc::new(link)))
    }

    /// Wrap `value` in as many optional layers as `target` declares beyond
    /// those it already has. `nil` is never wrapped.
    pub fn into_optional(
        self,
        target: &StaticType<'_>,
        meter: &Meter<'_>,
    ) -> Result<Self, MemoryLimitExceeded> {
        if matches!(self, Value::Nil) {
            return Ok(self);
        }
        let mut value = self;
        let missing = target.optional_depth().saturating_sub(value.optional_depth());
        for _ in 0..missing {
            value = Value::new_some(meter, value)?;
        }
        Ok(value)
    }
}

// ============================================================================
// Queries
// ============================================================================

impl<'a> Value<'a> {
    fn optional_depth(&self) -> usize {
        match self {
            Value::Some(inner) => 1 + inner.optional_depth(),
            _ => 0,
        }
    }

    pub fn is_resource(&self) -> bool {
        match self {
            Value::Composite(c) => c.is_resource(),
            Value::Array(a) => a.is_resource(),
            Value::Dictionary(d) => d.is_resource(),
            Value::Some(inner) => inner.is_resource(),
            _ => false,
        }
    }

    /// Ownership state of a resource value.
    pub fn resource_state(&self) -> Option<ResourceState> {
        match self {
            Value::Composite(c) if c.is_resource() => Some(c.state()),
            Value::Array(a) if a.is_resource() => Some(a.state()),
            Value::Dictionary(d) if d.is_resource() => Some(d.state()),
            Value::Some(inner) => inner.resource_state(),
            _ => None,
        }
    }

    pub fn set_resource_state(&self, state: ResourceState) {
        match self {
            Value::Composite(c) if c.is_resource() => c.set_state(state),
            Value::Array(a) if a.is_resource() => a.set_state(state),
            Value::Dictionary(d) if d.is_resource() => d.set_state(state),
            Value::Some(inner) => inner.set_resource_state(state),
            _ => {}
        }
    }

    /// Record the account holding this value and every resource inside it.
    pub fn set_owner(&self, owner: Option<Address>) {
        match self {
            Value::Composite(c) if c.is_resource() => c.set_owner(owner),
            Value::Array(a) => a.elements().iter().for_each(|e| e.set_owner(owner)),
            Value::Dictionary(d) => d.entries().values().for_each(|v| v.set_owner(owner)),
            Value::Some(inner) => inner.set_owner(owner),
            _ => {}
        }
    }

    /// Human readable name of the value's dynamic type.
    pub fn type_name(&self) -> String {
        match self {
            Value::Void => "Void".to_string(),
            Value::Nil => "Never?".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::Character(_) => "Character".to_string(),
            Value::String(_) => "String".to_string(),
            Value::Address(_) => "Address".to_string(),
            Value::Number(n) => n.kind().to_string(),
            Value::Some(inner) => format!("{}?", inner.type_name()),
            Value::Array(a) => a.ty.to_string(),
            Value::Dictionary(d) => d.ty.to_string(),
            Value::Composite(c) => c.static_type().to_string(),
            Value::Function(_) => "Function".to_string(),
            Value::Reference(r) => {
                let auth = if r.authorized() { "auth " } else { "" };
                format!("{}&{}", auth, r.borrowed_type())
            }
            Value::Path(p) => p.domain.type_name().to_string(),
            Value::Capability(_) => "Capability".to_string(),
            Value::Link(_) => "Link".to_string(),
        }
    }

    /// Whether the value inhabits `ty` at runtime.
    pub fn conforms_to(&self, ty: &StaticType<'_>) -> bool {
        match (self, ty) {
            (_, StaticType::Never) => false,
            (Value::Nil, StaticType::Optional(_)) => true,
            (Value::Some(inner), StaticType::Optional(ty)) => inner.conforms_to(ty),
            (_, StaticType::Optional(ty)) => self.conforms_to(ty),
            (Value::Some(_) | Value::Nil, _) => match ty {
                StaticType::AnyStruct => !self.is_resource(),
                StaticType::AnyResource => self.is_resource(),
                _ => false,
            },
            (_, StaticType::AnyStruct) => !self.is_resource(),
            (_, StaticType::AnyResource) => self.is_resource(),
            (Value::Void, StaticType::Void)
            | (Value::Bool(_), StaticType::Bool)
            | (Value::Character(_), StaticType::Character)
            | (Value::String(_), StaticType::String)
            | (Value::Address(_), StaticType::Address)
            | (Value::Function(_), StaticType::Function { .. }) => true,
            (Value::Number(n), StaticType::Number(kind)) => n.kind() == *kind,
            (Value::Number(n), StaticType::NumberSupertype(supertype)) => {
                n.kind().is_subtype_of(*supertype)
            }
            (Value::Path(p), StaticType::Path(path_type)) => match path_type {
                PathType::Path => true,
                PathType::Capability => p.domain != PathDomain::Storage,
                PathType::Domain(domain) => p.domain == *domain,
            },
            (Value::Array(a), StaticType::VariableArray(_)) => a.ty.is_subtype_of(ty),
            (Value::Dictionary(d), StaticType::Dictionary { .. }) => d.ty.is_subtype_of(ty),
            (Value::Composite(c), StaticType::Composite { .. } | StaticType::AuthAccount) => {
                c.static_type().equals(ty)
            }
            (
                Value::Reference(r),
                StaticType::Reference {
                    authorized,
                    referenced,
                },
            ) => (r.authorized() || !authorized) && r.borrowed_type().is_subtype_of(referenced),
            (Value::Capability(c), StaticType::Capability(borrow)) => match (c.borrow_type, borrow) {
                (_, None) | (None, _) => true,
                (Some(actual), Some(expected)) => actual.is_subtype_of(expected),
            },
            _ => false,
        }
    }

    /// Value equality as used by `==`, `switch` and dictionary keys.
    pub fn equals(&self, other: &Value<'_>) -> bool {
        match (self, other) {
            (Value::Void, Value::Void) | (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Character(a), Value::Character(b)) | (Value::String(a), Value::String(b)) => {
                a == b
            }
            (Value::Address(a), Value::Address(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => {
                a.kind() == b.kind() && a.compare(b) == Ordering::Equal
            }
            (Value::Some(a), Value::Some(b)) => a.equals(b),
            (Value::Path(a), Value::Path(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                let (a, b) = (a.elements(), b.elements());
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(a, b)| a.equals(b))
            }
            (Value::Dictionary(a), Value::Dictionary(b)) => {
                a.len() == b.len()
                    && a.entries().iter().all(|(key, value)| {
                        b.entries()
                            .iter()
                            .any(|(other_key, other_value)| {
                                key.0.equals(&other_key.0) && value.equals(other_value)
                            })
                    })
            }
            (Value::Composite(a), Value::Composite(b)) => {
                if a.kind == CompositeKind::Enum && b.kind == CompositeKind::Enum {
                    return a.name == b.name
                        && match (a.field("rawValue"), b.field("rawValue")) {
                            (Some(x), Some(y)) => x.equals(&y),
                            _ => false,
                        };
                }
                core::ptr::eq(Rc::as_ptr(a).cast::<()>(), Rc::as_ptr(b).cast::<()>())
            }
            (Value::Capability(a), Value::Capability(b)) => {
                a.address == b.address && a.path == b.path
            }
            _ => false,
        }
    }
}

// ============================================================================
// Transfer
// ============================================================================

impl<'a> Value<'a> {
    /// The value as stored into a new slot.
    ///
    /// Structures, events, arrays and dictionaries without resources are
    /// deep-copied, metering one unit per copied node and one per nested node
    /// read out of its parent. Moving a resource keeps its identity and meters
    /// one unit for the handle the new owner receives. Contracts, enum cases
    /// and host handles are shared.
    pub fn transfer(&self, meter: &Meter<'_>) -> Result<Value<'a>, MemoryLimitExceeded> {
        Ok(match self {
            Value::Array(a) if a.is_resource() => {
                meter.report(MemoryKind::Array, 1)?;
                self.clone()
            }
            Value::Array(a) => Value::Array(a.copy(meter)?),
            Value::Dictionary(d) if d.is_resource() => {
                meter.report(MemoryKind::Dictionary, 1)?;
                self.clone()
            }
            Value::Dictionary(d) => Value::Dictionary(d.copy(meter)?),
            Value::Composite(c) if c.is_resource() && !c.is_handle() => {
                meter.report(MemoryKind::Composite, 1)?;
                self.clone()
            }
            Value::Composite(c)
                if matches!(c.kind, CompositeKind::Structure | CompositeKind::Event)
                    && !c.is_handle() =>
            {
                Value::Composite(c.copy(meter)?)
            }
            Value::Some(inner) => Value::Some(Box::new(inner.transfer(meter)?)),
            other => other.clone(),
        })
    }

    /// Meter reading this value out of an array, dictionary or composite:
    /// nested containers and composites get a fresh handle.
    pub fn meter_read(&self, meter: &Meter<'_>) -> Result<(), MemoryLimitExceeded> {
        match self {
            Value::Array(_) => meter.report(MemoryKind::Array, 1),
            Value::Dictionary(_) => meter.report(MemoryKind::Dictionary, 1),
            Value::Composite(c) if !c.is_handle() => meter.report(MemoryKind::Composite, 1),
            Value::Some(inner) => inner.meter_read(meter),
            _ => Ok(()),
        }
    }

    /// Meter the walk that computes the dynamic type of this value before it
    /// is checked against its target: every nested element of an array or
    /// dictionary is read once. Composites are typed by name alone.
    pub fn meter_dynamic_type(&self, meter: &Meter<'_>) -> Result<(), MemoryLimitExceeded> {
        match self {
            Value::Array(a) => {
                for element in a.elements().iter() {
                    element.meter_read(meter)?;
                    element.meter_dynamic_type(meter)?;
                }
                Ok(())
            }
            Value::Dictionary(d) => {
                for value in d.entries().values() {
                    value.meter_read(meter)?;
                    value.meter_dynamic_type(meter)?;
                }
                Ok(())
            }
            Value::Some(inner) => inner.meter_dynamic_type(meter),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void => f.write_str("()"),
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Character(c) => f.write_str(&string::quote(c)),
            Value::String(s) => f.write_str(&string::quote(s)),
            Value::Address(a) => write!(f, "{}", a),
            Value::Number(n) => write!(f, "{}", n),
            Value::Some(inner) => write!(f, "{}", inner),
            Value::Array(a) => write!(f, "{}", a),
            Value::Dictionary(d) => write!(f, "{}", d),
            Value::Composite(c) => write!(f, "{}", c),
            Value::Function(function) => write!(f, "{}", function),
            Value::Reference(r) => write!(f, "{}", r),
            Value::Path(p) => write!(f, "{}", p),
            Value::Capability(c) => write!(f, "{}", c),
            Value::Link(l) => write!(f, "{}", l),
        }
    }
}

#[cfg(test)]
#[path = "value_test.rs"]
mod value_test;
