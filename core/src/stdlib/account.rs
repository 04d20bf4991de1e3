//! Accounts and capabilities.
//!
//! `getAuthAccount(address)` returns a host handle whose functions read and
//! write the injected [`Storage`](crate::storage::Storage) under that address.
//! Links stored at public or private paths let capabilities reach objects
//! saved under storage paths.

use crate::interpreter::{ExecutionError, Invocation, RuntimeError};
use crate::types::{CompositeKind, PathDomain, StaticType};
use crate::values::{
    Address, CapabilityValue, CompositeValue, HostFn, LinkValue, PathValue, ReferenceValue,
    ResourceState, StorageReference, Value, host_fn,
};
use indexmap::IndexMap;
use std::rc::Rc;
use tracing::debug;

/// Links followed before giving up on a capability.
const MAX_LINK_HOPS: usize = 8;

pub(crate) fn get_auth_account<'a>(
    invocation: &mut Invocation<'_, 'a>,
) -> Result<Value<'a>, ExecutionError> {
    let address = match invocation.argument(0)? {
        Value::Address(address) => *address,
        other => return Err(invocation.error(format!("expected Address, got {}", other.type_name()))),
    };
    let meter = invocation.meter();

    let mut fields = IndexMap::new();
    fields.insert("address", Value::new_address(meter, address)?);

    let functions: IndexMap<&'a str, HostFn<'a>> = IndexMap::from([
        ("save", host_fn(save)),
        ("load", host_fn(load)),
        ("copy", host_fn(copy)),
        ("borrow", host_fn(borrow)),
        ("link", host_fn(link)),
        ("unlink", host_fn(unlink)),
        ("getCapability", host_fn(get_capability)),
    ]);
    let account = CompositeValue::with_functions(
        meter,
        "AuthAccount",
        CompositeKind::Structure,
        fields,
        functions,
    )?;
    Ok(Value::Composite(account))
}

/// Functions of a capability value.
pub(crate) fn capability_function<'a>(name: &str) -> Option<HostFn<'a>> {
    match name {
        "borrow" => Some(host_fn(capability_borrow)),
        "check" => Some(host_fn(capability_check)),
        _ => None,
    }
}

// ============================================================================
// AuthAccount functions
// ============================================================================

/// `save(<-value, to: path)`
fn save<'a>(invocation: &mut Invocation<'_, 'a>) -> Result<Value<'a>, ExecutionError> {
    let address = account_address(invocation)?;
    let path = invocation.path_argument(1)?;
    if path.domain != PathDomain::Storage {
        return Err(invocation.error(format!("cannot save to {}", path)));
    }
    if invocation.interpreter.storage().get(address, &path).is_some() {
        return Err(RuntimeError::StorageOverwrite {
            address: address.to_string(),
            path: path.to_string(),
        }
        .into());
    }

    let value = invocation.take_argument(0)?.transfer(invocation.meter())?;
    invocation.interpreter.claim(&value)?;
    value.set_owner(Some(address));
    invocation.interpreter.storage_mut().set(address, path, value);
    Ok(Value::Void)
}

/// `load<T>(from: path)`: moves the object out of storage.
fn load<'a>(invocation: &mut Invocation<'_, 'a>) -> Result<Value<'a>, ExecutionError> {
    let address = account_address(invocation)?;
    let path = invocation.path_argument(0)?;
    let ty = invocation.type_argument(0)?;
    let conforms = invocation
        .interpreter
        .storage()
        .get(address, &path)
        .is_some_and(|value| value.conforms_to(&ty));
    if !conforms {
        return Ok(Value::Nil);
    }
    let Some(value) = invocation.interpreter.storage_mut().remove(address, &path) else {
        return Ok(Value::Nil);
    };
    value.set_owner(None);
    value.set_resource_state(ResourceState::InTransit);
    Ok(Value::new_some(invocation.meter(), value)?)
}

/// `copy<T>(from: path)`: copies a stored structure.
fn copy<'a>(invocation: &mut Invocation<'_, 'a>) -> Result<Value<'a>, ExecutionError> {
    let address = account_address(invocation)?;
    let path = invocation.path_argument(0)?;
    let ty = invocation.type_argument(0)?;
    match invocation.interpreter.storage().get(address, &path) {
        Some(value) if !value.is_resource() && value.conforms_to(&ty) => {
            let meter = invocation.meter();
            let copied = value.transfer(meter)?;
            Ok(Value::new_some(meter, copied)?)
        }
        _ => Ok(Value::Nil),
    }
}

/// `borrow<&T>(from: path)`
fn borrow<'a>(invocation: &mut Invocation<'_, 'a>) -> Result<Value<'a>, ExecutionError> {
    let address = account_address(invocation)?;
    let path = invocation.path_argument(0)?;
    let (authorized, referenced) = reference_type_argument(invocation)?;
    storage_reference(invocation, address, path, authorized, referenced)
}

/// `link<&T>(path, target: path)`
fn link<'a>(invocation: &mut Invocation<'_, 'a>) -> Result<Value<'a>, ExecutionError> {
    let address = account_address(invocation)?;
    let path = invocation.path_argument(0)?;
    let target = invocation.path_argument(1)?;
    let borrow_type = invocation.type_argument(0)?;
    if path.domain == PathDomain::Storage {
        return Err(invocation.error(format!("cannot link at {}", path)));
    }
    if invocation.interpreter.storage().get(address, &path).is_some() {
        return Ok(Value::Nil);
    }

    let meter = invocation.meter();
    let link = Value::new_link(
        meter,
        LinkValue {
            target,
            borrow_type,
        },
    )?;
    let capability = Value::new_capability(
        meter,
        CapabilityValue {
            address,
            path: path.clone(),
            borrow_type: Some(borrow_type),
        },
    )?;
    let capability = Value::new_some(meter, capability)?;
    debug!(%address, %path, "link");
    invocation.interpreter.storage_mut().set(address, path, link);
    Ok(capability)
}

/// `unlink(path)`
fn unlink<'a>(invocation: &mut Invocation<'_, 'a>) -> Result<Value<'a>, ExecutionError> {
    let address = account_address(invocation)?;
    let path = invocation.path_argument(0)?;
    let storage = invocation.interpreter.storage_mut();
    if matches!(storage.get(address, &path), Some(Value::Link(_))) {
        storage.remove(address, &path);
    }
    Ok(Value::Void)
}

/// `getCapability<&T>(path)`; the type argument is optional.
fn get_capability<'a>(invocation: &mut Invocation<'_, 'a>) -> Result<Value<'a>, ExecutionError> {
    let address = account_address(invocation)?;
    let path = invocation.path_argument(0)?;
    let capability = CapabilityValue {
        address,
        path,
        borrow_type: invocation.type_arguments.first().copied(),
    };
    Ok(Value::new_capability(invocation.meter(), capability)?)
}

// ============================================================================
// Capability functions
// ============================================================================

/// `capability.borrow<&T>()`
fn capability_borrow<'a>(invocation: &mut Invocation<'_, 'a>) -> Result<Value<'a>, ExecutionError> {
    let capability = receiver_capability(invocation)?;
    let Some((authorized, referenced)) = capability_type(invocation, &capability)? else {
        return Ok(Value::Nil);
    };
    match resolve_link(invocation, &capability, referenced)? {
        Some(target) => {
            storage_reference(invocation, capability.address, target, authorized, referenced)
        }
        None => Ok(Value::Nil),
    }
}

/// `capability.check<&T>()`
fn capability_check<'a>(invocation: &mut Invocation<'_, 'a>) -> Result<Value<'a>, ExecutionError> {
    let capability = receiver_capability(invocation)?;
    let found = match capability_type(invocation, &capability)? {
        Some((_, referenced)) => match resolve_link(invocation, &capability, referenced)? {
            Some(target) => invocation
                .interpreter
                .storage()
                .get(capability.address, &target)
                .is_some_and(|value| value.conforms_to(&referenced)),
            None => false,
        },
        None => false,
    };
    Ok(Value::new_bool(invocation.meter(), found)?)
}

// ============================================================================
// Helpers
// ============================================================================

fn account_address(invocation: &Invocation<'_, '_>) -> Result<Address, ExecutionError> {
    match invocation.receiver()? {
        Value::Composite(account) => match account.field("address") {
            Some(Value::Address(address)) => Ok(address),
            _ => Err(invocation.error("account handle without address")),
        },
        other => Err(invocation.error(format!("expected AuthAccount, got {}", other.type_name()))),
    }
}

fn receiver_capability<'a>(
    invocation: &Invocation<'_, 'a>,
) -> Result<Rc<CapabilityValue<'a>>, ExecutionError> {
    match invocation.receiver()? {
        Value::Capability(capability) => Ok(capability),
        other => Err(invocation.error(format!("expected Capability, got {}", other.type_name()))),
    }
}

/// Split a `&T` type argument into its authorization and referenced type.
fn reference_type_argument<'a>(
    invocation: &Invocation<'_, 'a>,
) -> Result<(bool, StaticType<'a>), ExecutionError> {
    match invocation.type_argument(0)? {
        StaticType::Reference {
            authorized,
            referenced,
        } => Ok((authorized, *referenced)),
        other => Err(invocation.error(format!("expected reference type, got {}", other))),
    }
}

/// The type a capability borrows as: the explicit type argument, else the
/// capability's own borrow type.
fn capability_type<'a>(
    invocation: &Invocation<'_, 'a>,
    capability: &CapabilityValue<'a>,
) -> Result<Option<(bool, StaticType<'a>)>, ExecutionError> {
    if !invocation.type_arguments.is_empty() {
        return reference_type_argument(invocation).map(Some);
    }
    Ok(match capability.borrow_type {
        Some(StaticType::Reference {
            authorized,
            referenced,
        }) => Some((authorized, *referenced)),
        _ => None,
    })
}

/// Follow links from the capability's path to a storage path. Each link must
/// allow borrowing as `referenced`. Chains longer than [`MAX_LINK_HOPS`]
/// resolve to nothing.
fn resolve_link<'a>(
    invocation: &Invocation<'_, 'a>,
    capability: &CapabilityValue<'a>,
    referenced: StaticType<'a>,
) -> Result<Option<PathValue>, ExecutionError> {
    let mut path = capability.path.clone();
    let mut hops = 0;
    while path.domain != PathDomain::Storage {
        if hops == MAX_LINK_HOPS {
            debug!(from = %capability.path, "link chain too long");
            return Ok(None);
        }
        match invocation.interpreter.storage().get(capability.address, &path) {
            Some(Value::Link(link)) => {
                let allowed = match link.borrow_type {
                    StaticType::Reference {
                        referenced: linked, ..
                    } => referenced.is_subtype_of(linked),
                    _ => false,
                };
                if !allowed {
                    return Ok(None);
                }
                path = link.target.clone();
            }
            _ => return Ok(None),
        }
        hops += 1;
    }
    Ok(Some(path))
}

/// Metered reference into storage, wrapped in an optional when the stored
/// object conforms and `nil` otherwise.
fn storage_reference<'a>(
    invocation: &mut Invocation<'_, 'a>,
    address: Address,
    path: PathValue,
    authorized: bool,
    referenced: StaticType<'a>,
) -> Result<Value<'a>, ExecutionError> {
    let meter = invocation.meter();
    let reference = StorageReference::new(meter, address, path, authorized, referenced)?;
    let conforms = invocation
        .interpreter
        .storage()
        .get(address, &reference.path)
        .is_some_and(|value| value.conforms_to(&referenced));
    if !conforms {
        return Ok(Value::Nil);
    }
    let reference = Value::Reference(ReferenceValue::Storage(reference));
    Ok(Value::new_some(invocation.meter(), reference)?)
}
