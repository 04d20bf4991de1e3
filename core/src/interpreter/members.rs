//! Member access, indexing and the built-in members of strings, arrays,
//! dictionaries and numbers.

use super::invocation::unexpected;
use super::operators::NumberOperation;
use super::{ExecutionError, InternalError, Interpreter, Invocation, RuntimeError};
use crate::memory::MemoryKind;
use crate::stdlib::account;
use crate::types::{NumberKind, StaticType};
use crate::values::{
    ArrayValue, BoundFunction, DictionaryValue, FunctionValue, HostFn, HostFunction, NumberValue,
    ResourceState, Value, host_fn, string,
};
use std::rc::Rc;

const BYTES: StaticType<'static> = StaticType::VariableArray(&StaticType::Number(NumberKind::UInt8));

impl<'a> Interpreter<'a> {
    pub(super) fn get_member(
        &mut self,
        value: Value<'a>,
        name: &'a str,
    ) -> Result<Value<'a>, ExecutionError> {
        let value = self.deref_value(value)?;
        let builtin = match &value {
            Value::Composite(composite) => {
                self.check_live(&value)?;
                if let Some(field) = composite.field(name) {
                    return Ok(field);
                }
                if name == "owner" && composite.is_resource() {
                    return match composite.owner() {
                        Some(owner) => {
                            let address = Value::new_address(&self.meter, owner)?;
                            Ok(Value::new_some(&self.meter, address)?)
                        }
                        None => Ok(Value::Nil),
                    };
                }
                let method = self
                    .composite_type(composite.name)
                    .and_then(|ty| ty.methods.get(name).cloned());
                if let Some(method) = method {
                    let bound = BoundFunction::new(&self.meter, method, composite.clone())?;
                    return Ok(Value::Function(FunctionValue::Bound(bound)));
                }
                // Account handles: not metered.
                if let Some(function) = composite.function(name) {
                    return Ok(host_member(name, function, value.clone()));
                }
                None
            }
            Value::Capability(capability) => {
                if name == "address" {
                    return Ok(Value::new_address(&self.meter, capability.address)?);
                }
                if let Some(function) = account::capability_function(name) {
                    return Ok(host_member(name, function, value.clone()));
                }
                None
            }
            Value::String(text) => match name {
                "length" => {
                    let length = string::grapheme_count(text);
                    return Ok(Value::Number(NumberValue::from_index(length, &self.meter)?));
                }
                "concat" => Some(host_fn(string_concat)),
                "decodeHex" => Some(host_fn(string_decode_hex)),
                _ => None,
            },
            Value::Array(array) => match name {
                "length" => {
                    return Ok(Value::Number(NumberValue::from_index(array.len(), &self.meter)?));
                }
                "append" => Some(host_fn(array_append)),
                "appendAll" => Some(host_fn(array_append_all)),
                "concat" => Some(host_fn(array_concat)),
                "contains" => Some(host_fn(array_contains)),
                "insert" => Some(host_fn(array_insert)),
                "remove" => Some(host_fn(array_remove)),
                "removeFirst" => Some(host_fn(array_remove_first)),
                "removeLast" => Some(host_fn(array_remove_last)),
                "firstIndex" => Some(host_fn(array_first_index)),
                _ => None,
            },
            Value::Dictionary(dictionary) => match name {
                "length" => {
                    let length = dictionary.len();
                    return Ok(Value::Number(NumberValue::from_index(length, &self.meter)?));
                }
                "keys" => {
                    let keys = dictionary
                        .entries()
                        .keys()
                        .map(|key| key.0.transfer(&self.meter))
                        .collect::<Result<Vec<_>, _>>()?;
                    let ty = entry_array_type(dictionary.ty, true);
                    return Ok(Value::Array(ArrayValue::new(&self.meter, ty, keys)?));
                }
                "values" => {
                    let values = dictionary
                        .entries()
                        .values()
                        .map(|value| value.transfer(&self.meter))
                        .collect::<Result<Vec<_>, _>>()?;
                    let ty = entry_array_type(dictionary.ty, false);
                    return Ok(Value::Array(ArrayValue::new(&self.meter, ty, values)?));
                }
                "containsKey" => Some(host_fn(dictionary_contains_key)),
                "insert" => Some(host_fn(dictionary_insert)),
                "remove" => Some(host_fn(dictionary_remove)),
                _ => None,
            },
            Value::Number(_) => match name {
                "saturatingAdd" => Some(host_fn(number_saturating_add)),
                "saturatingSubtract" => Some(host_fn(number_saturating_subtract)),
                "saturatingMultiply" => Some(host_fn(number_saturating_multiply)),
                "saturatingDivide" => Some(host_fn(number_saturating_divide)),
                _ => None,
            },
            _ => None,
        };

        match builtin {
            Some(function) => {
                self.report(MemoryKind::HostFunction, 1)?;
                Ok(host_member(name, function, value))
            }
            None => Err(InternalError::UnknownMember {
                name: name.to_string(),
                type_name: value.type_name(),
            }
            .into()),
        }
    }

    /// Store a field, returning the value it replaced.
    pub(super) fn set_member(
        &mut self,
        container: Value<'a>,
        name: &'a str,
        value: Value<'a>,
    ) -> Result<Option<Value<'a>>, ExecutionError> {
        match &container {
            Value::Composite(composite) => {
                self.check_live(&container)?;
                Ok(composite.set_field(name, value))
            }
            _ => Err(InternalError::InvalidAssignmentTarget.into()),
        }
    }

    pub(super) fn get_index(
        &mut self,
        container: Value<'a>,
        index: Value<'a>,
    ) -> Result<Value<'a>, ExecutionError> {
        match self.deref_value(container)? {
            Value::Array(array) => {
                let position = array_index(&index, array.len())?;
                array.get(position).ok_or_else(|| out_of_bounds(&index, array.len()))
            }
            Value::Dictionary(dictionary) => match dictionary.get(&index) {
                Some(value) => Ok(Value::new_some(&self.meter, value)?),
                None => Ok(Value::Nil),
            },
            Value::String(text) => {
                let position = array_index(&index, string::grapheme_count(&text))?;
                match string::grapheme_at(&text, position) {
                    Some(grapheme) => Ok(Value::new_character(&self.meter, grapheme)?),
                    None => Err(out_of_bounds(&index, string::grapheme_count(&text))),
                }
            }
            other => Err(unexpected("indexable value", &other)),
        }
    }

    /// Store an element, returning the value it replaced. Storing `nil` into a
    /// dictionary removes the key.
    pub(super) fn set_index(
        &mut self,
        container: Value<'a>,
        index: Value<'a>,
        value: Value<'a>,
    ) -> Result<Option<Value<'a>>, ExecutionError> {
        match self.deref_value(container)? {
            Value::Array(array) => {
                let len = array.len();
                let position = array_index(&index, len)?;
                let mut elements = array.elements_mut();
                match elements.get_mut(position) {
                    Some(slot) => Ok(Some(core::mem::replace(slot, value))),
                    None => Err(out_of_bounds(&index, len)),
                }
            }
            Value::Dictionary(dictionary) => Ok(match value {
                Value::Nil => dictionary.remove(&index),
                Value::Some(value) => dictionary.insert(index, *value),
                value => dictionary.insert(index, value),
            }),
            other => Err(unexpected("indexable value", &other)),
        }
    }
}

/// `[K]` or `[V]` for a dictionary of type `{K: V}`.
fn entry_array_type(ty: StaticType<'_>, keys: bool) -> StaticType<'_> {
    match ty {
        StaticType::Dictionary { key, .. } if keys => StaticType::VariableArray(key),
        StaticType::Dictionary { value, .. } => StaticType::VariableArray(value),
        _ => StaticType::VariableArray(&StaticType::AnyStruct),
    }
}

fn host_member<'a>(name: &'a str, function: HostFn<'a>, receiver: Value<'a>) -> Value<'a> {
    Value::Function(FunctionValue::Host(HostFunction::with_receiver(
        name, function, receiver,
    )))
}

fn array_index(index: &Value<'_>, len: usize) -> Result<usize, ExecutionError> {
    match index {
        Value::Number(number) => number.to_index().ok_or_else(|| out_of_bounds(index, len)),
        other => Err(unexpected("index", other)),
    }
}

fn out_of_bounds(index: &Value<'_>, len: usize) -> ExecutionError {
    RuntimeError::IndexOutOfBounds {
        index: index.to_string(),
        len,
    }
    .into()
}

/// Mark an element taken out of a container as in transit.
fn taken(value: Value<'_>) -> Value<'_> {
    value.set_resource_state(ResourceState::InTransit);
    value
}

// ============================================================================
// String members
// ============================================================================

fn string_concat<'a>(invocation: &mut Invocation<'_, 'a>) -> Result<Value<'a>, ExecutionError> {
    let Value::String(text) = invocation.receiver()? else {
        return Err(invocation.error("receiver is not a string"));
    };
    let other = invocation.string_argument(0)?;
    let joined = format!("{}{}", text, other);
    Ok(Value::new_string(invocation.meter(), &joined)?)
}

fn string_decode_hex<'a>(invocation: &mut Invocation<'_, 'a>) -> Result<Value<'a>, ExecutionError> {
    let Value::String(text) = invocation.receiver()? else {
        return Err(invocation.error("receiver is not a string"));
    };
    let bytes = string::decode_hex(&text).ok_or(RuntimeError::InvalidHexString)?;
    let meter = invocation.meter();
    let elements = bytes
        .into_iter()
        .map(|byte| Ok(Value::Number(NumberValue::UInt8(byte).metered(meter)?)))
        .collect::<Result<Vec<_>, ExecutionError>>()?;
    Ok(Value::Array(ArrayValue::new(meter, BYTES, elements)?))
}

// ============================================================================
// Array members
// ============================================================================

fn receiver_array<'a>(
    invocation: &Invocation<'_, 'a>,
) -> Result<Rc<ArrayValue<'a>>, ExecutionError> {
    match invocation.receiver()? {
        Value::Array(array) => Ok(array),
        other => Err(unexpected("array", &other)),
    }
}

/// Copy an argument into an array slot and take ownership of it.
fn element_argument<'a>(
    invocation: &mut Invocation<'_, 'a>,
    index: usize,
    array: &ArrayValue<'a>,
) -> Result<Value<'a>, ExecutionError> {
    let element = invocation
        .take_argument(index)?
        .transfer(invocation.meter())?
        .into_optional(&array.element_type(), invocation.meter())?;
    invocation.interpreter.claim(&element)?;
    Ok(element)
}

fn array_append<'a>(invocation: &mut Invocation<'_, 'a>) -> Result<Value<'a>, ExecutionError> {
    let array = receiver_array(invocation)?;
    let element = element_argument(invocation, 0, &array)?;
    array.elements_mut().push(element);
    Ok(Value::Void)
}

fn array_append_all<'a>(invocation: &mut Invocation<'_, 'a>) -> Result<Value<'a>, ExecutionError> {
    let array = receiver_array(invocation)?;
    let Value::Array(other) = invocation.argument(0)? else {
        return Err(invocation.error("argument is not an array"));
    };
    let copies = other
        .elements()
        .iter()
        .map(|element| element.transfer(invocation.meter()))
        .collect::<Result<Vec<_>, _>>()?;
    array.elements_mut().extend(copies);
    Ok(Value::Void)
}

fn array_concat<'a>(invocation: &mut Invocation<'_, 'a>) -> Result<Value<'a>, ExecutionError> {
    let array = receiver_array(invocation)?;
    let Value::Array(other) = invocation.argument(0)? else {
        return Err(invocation.error("argument is not an array"));
    };
    let meter = invocation.meter();
    let elements = array
        .elements()
        .iter()
        .chain(other.elements().iter())
        .map(|element| element.transfer(meter))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Value::Array(ArrayValue::new(meter, array.ty, elements)?))
}

fn array_contains<'a>(invocation: &mut Invocation<'_, 'a>) -> Result<Value<'a>, ExecutionError> {
    let array = receiver_array(invocation)?;
    let needle = invocation.argument(0)?;
    let found = array.elements().iter().any(|element| element.equals(needle));
    Ok(Value::new_bool(invocation.meter(), found)?)
}

fn array_insert<'a>(invocation: &mut Invocation<'_, 'a>) -> Result<Value<'a>, ExecutionError> {
    let array = receiver_array(invocation)?;
    let position = invocation.index_argument(0)?;
    if position > array.len() {
        return Err(out_of_bounds(invocation.argument(0)?, array.len()));
    }
    let element = element_argument(invocation, 1, &array)?;
    array.elements_mut().insert(position, element);
    Ok(Value::Void)
}

fn array_remove<'a>(invocation: &mut Invocation<'_, 'a>) -> Result<Value<'a>, ExecutionError> {
    let array = receiver_array(invocation)?;
    let position = invocation.index_argument(0)?;
    if position >= array.len() {
        return Err(out_of_bounds(invocation.argument(0)?, array.len()));
    }
    let element = array.elements_mut().remove(position);
    Ok(taken(element))
}

fn array_remove_first<'a>(
    invocation: &mut Invocation<'_, 'a>,
) -> Result<Value<'a>, ExecutionError> {
    let array = receiver_array(invocation)?;
    if array.is_empty() {
        return Err(empty_array());
    }
    let element = array.elements_mut().remove(0);
    Ok(taken(element))
}

fn array_remove_last<'a>(
    invocation: &mut Invocation<'_, 'a>,
) -> Result<Value<'a>, ExecutionError> {
    let array = receiver_array(invocation)?;
    let element = array.elements_mut().pop().ok_or_else(empty_array)?;
    Ok(taken(element))
}

fn empty_array() -> ExecutionError {
    RuntimeError::IndexOutOfBounds {
        index: "0".to_string(),
        len: 0,
    }
    .into()
}

fn array_first_index<'a>(
    invocation: &mut Invocation<'_, 'a>,
) -> Result<Value<'a>, ExecutionError> {
    let array = receiver_array(invocation)?;
    let needle = invocation.argument(0)?;
    let position = array.elements().iter().position(|element| element.equals(needle));
    let meter = invocation.meter();
    match position {
        Some(position) => {
            let index = Value::Number(NumberValue::from_index(position, meter)?);
            Ok(Value::new_some(meter, index)?)
        }
        None => Ok(Value::Nil),
    }
}

// ============================================================================
// Dictionary members
// ============================================================================

fn receiver_dictionary<'a>(
    invocation: &Invocation<'_, 'a>,
) -> Result<Rc<DictionaryValue<'a>>, ExecutionError> {
    match invocation.receiver()? {
        Value::Dictionary(dictionary) => Ok(dictionary),
        other => Err(unexpected("dictionary", &other)),
    }
}

/// Box a removed or replaced entry as `V?`, handing ownership to the caller.
fn previous_entry<'a>(
    invocation: &Invocation<'_, 'a>,
    previous: Option<Value<'a>>,
) -> Result<Value<'a>, ExecutionError> {
    match previous {
        Some(value) => Ok(Value::new_some(invocation.meter(), taken(value))?),
        None => Ok(Value::Nil),
    }
}

fn dictionary_contains_key<'a>(
    invocation: &mut Invocation<'_, 'a>,
) -> Result<Value<'a>, ExecutionError> {
    let dictionary = receiver_dictionary(invocation)?;
    let found = dictionary.contains_key(invocation.argument(0)?);
    Ok(Value::new_bool(invocation.meter(), found)?)
}

fn dictionary_insert<'a>(invocation: &mut Invocation<'_, 'a>) -> Result<Value<'a>, ExecutionError> {
    let dictionary = receiver_dictionary(invocation)?;
    let key = invocation.take_argument(0)?.transfer(invocation.meter())?;
    let value = invocation
        .take_argument(1)?
        .transfer(invocation.meter())?
        .into_optional(&dictionary.value_type(), invocation.meter())?;
    invocation.interpreter.claim(&value)?;
    let previous = dictionary.insert(key, value);
    previous_entry(invocation, previous)
}

fn dictionary_remove<'a>(invocation: &mut Invocation<'_, 'a>) -> Result<Value<'a>, ExecutionError> {
    let dictionary = receiver_dictionary(invocation)?;
    let previous = dictionary.remove(invocation.argument(0)?);
    previous_entry(invocation, previous)
}

// ============================================================================
// Number members
// ============================================================================

fn saturating<'a>(
    invocation: &mut Invocation<'_, 'a>,
    operation: NumberOperation,
) -> Result<Value<'a>, ExecutionError> {
    let Value::Number(receiver) = invocation.receiver()? else {
        return Err(invocation.error("receiver is not a number"));
    };
    let other = invocation.number_argument(0)?;
    Ok(Value::Number(operation(&receiver, other, invocation.meter())?))
}

fn number_saturating_add<'a>(
    invocation: &mut Invocation<'_, 'a>,
) -> Result<Value<'a>, ExecutionError> {
    saturating(invocation, NumberValue::saturating_add)
}

fn number_saturating_subtract<'a>(
    invocation: &mut Invocation<'_, 'a>,
) -> Result<Value<'a>, ExecutionError> {
    saturating(invocation, NumberValue::saturating_subtract)
}

fn number_saturating_multiply<'a>(
    invocation: &mut Invocation<'_, 'a>,
) -> Result<Value<'a>, ExecutionError> {
    saturating(invocation, NumberValue::saturating_multiply)
}

fn number_saturating_divide<'a>(
    invocation: &mut Invocation<'_, 'a>,
) -> Result<Value<'a>, ExecutionError> {
    saturating(invocation, NumberValue::saturating_divide)
}
