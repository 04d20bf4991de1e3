use super::*;
use crate::memory::{CountingGauge, MemoryKind, Meter};
use crate::types::{CompositeKind, NumberKind, StaticType};
use crate::values::{ArrayValue, CompositeValue, DictionaryKey, DictionaryValue, NumberValue};
use indexmap::IndexMap;
use pretty_assertions::assert_eq;
use std::rc::Rc;

fn counting() -> (Rc<CountingGauge>, Meter<'static>) {
    let gauge = Rc::new(CountingGauge::new());
    let meter = Meter::new(gauge.clone());
    (gauge, meter)
}

fn int8(value: i8) -> Value<'static> {
    Value::Number(NumberValue::Int8(value))
}

const BOOL_ARRAY: StaticType<'static> = StaticType::VariableArray(&StaticType::Bool);
const NESTED_BOOL_ARRAY: StaticType<'static> = StaticType::VariableArray(&BOOL_ARRAY);
const R: StaticType<'static> = StaticType::Composite {
    name: "R",
    kind: CompositeKind::Resource,
};
const RESOURCE_ARRAY: StaticType<'static> = StaticType::VariableArray(&R);

#[test]
fn test_scalar_constructors_meter_one_unit() {
    let (gauge, meter) = counting();
    Value::new_bool(&meter, true).unwrap();
    Value::new_nil(&meter).unwrap();
    Value::new_void(&meter).unwrap();
    Value::new_character(&meter, "a").unwrap();
    Value::new_some(&meter, Value::Bool(true)).unwrap();

    assert_eq!(gauge.get(MemoryKind::Bool), 1);
    assert_eq!(gauge.get(MemoryKind::Nil), 1);
    assert_eq!(gauge.get(MemoryKind::Void), 1);
    assert_eq!(gauge.get(MemoryKind::Character), 1);
    assert_eq!(gauge.get(MemoryKind::Optional), 1);
}

#[test]
fn test_string_meters_byte_length_with_minimum() {
    let (gauge, meter) = counting();
    Value::new_string(&meter, "hello").unwrap();
    Value::new_string(&meter, "").unwrap();
    assert_eq!(gauge.get(MemoryKind::String), 6);
}

#[test]
fn test_into_optional_boxes_missing_layers_only() {
    let (gauge, meter) = counting();
    let double = StaticType::Optional(&StaticType::Optional(&StaticType::Bool));

    let boxed = Value::Bool(true).into_optional(&double, &meter).unwrap();
    assert_eq!(boxed.to_string(), "true");
    assert!(matches!(&boxed, Value::Some(inner) if matches!(**inner, Value::Some(_))));
    assert_eq!(gauge.get(MemoryKind::Optional), 2);

    let already = Value::Some(Box::new(Value::Bool(true)));
    already.into_optional(&double, &meter).unwrap();
    assert_eq!(gauge.get(MemoryKind::Optional), 3);

    Value::Nil.into_optional(&double, &meter).unwrap();
    assert_eq!(gauge.get(MemoryKind::Optional), 3);
}

#[test]
fn test_transfer_copies_nested_arrays_per_node() {
    let (gauge, meter) = counting();
    let inner = ArrayValue::new(&meter, BOOL_ARRAY, vec![]).unwrap();
    let outer = ArrayValue::new(&meter, NESTED_BOOL_ARRAY, vec![Value::Array(inner)]).unwrap();
    assert_eq!(gauge.get(MemoryKind::Array), 2);

    let original = Value::Array(outer);
    let copy = original.transfer(&meter).unwrap();
    // new outer, the read of the inner array, new inner
    assert_eq!(gauge.get(MemoryKind::Array), 5);

    let (Value::Array(a), Value::Array(b)) = (&original, &copy) else {
        panic!("expected arrays");
    };
    assert!(!Rc::ptr_eq(a, b));
    a.elements_mut().clear();
    assert_eq!(b.len(), 1);
}

#[test]
fn test_transfer_keeps_resource_identity() {
    let (gauge, meter) = counting();
    let resource = CompositeValue::new(&meter, "R", CompositeKind::Resource, IndexMap::new()).unwrap();
    let array = ArrayValue::new(&meter, RESOURCE_ARRAY, vec![Value::Composite(resource)]).unwrap();
    let value = Value::Array(array.clone());

    let moved = value.transfer(&meter).unwrap();
    let Value::Array(moved) = moved else {
        panic!("expected an array");
    };
    assert!(Rc::ptr_eq(&array, &moved));
    // The move meters a handle for the array but leaves its elements alone.
    assert_eq!(gauge.get(MemoryKind::Array), 2);
    assert_eq!(gauge.get(MemoryKind::Composite), 1);
}

#[test]
fn test_dynamic_type_walk_reads_nested_elements() {
    let (gauge, meter) = counting();
    let inner = ArrayValue::new(&meter, BOOL_ARRAY, vec![Value::Bool(true)]).unwrap();
    let outer = ArrayValue::new(
        &meter,
        NESTED_BOOL_ARRAY,
        vec![Value::Array(inner.clone()), Value::Array(inner)],
    )
    .unwrap();
    assert_eq!(gauge.get(MemoryKind::Array), 2);

    Value::Array(outer).meter_dynamic_type(&meter).unwrap();
    assert_eq!(gauge.get(MemoryKind::Array), 4);

    let s = CompositeValue::new(&meter, "S", CompositeKind::Structure, IndexMap::new()).unwrap();
    Value::Composite(s).meter_dynamic_type(&meter).unwrap();
    assert_eq!(gauge.get(MemoryKind::Composite), 1);
}

#[test]
fn test_struct_transfer_copies_fields() {
    let (gauge, meter) = counting();
    let mut fields = IndexMap::new();
    fields.insert("x", int8(1));
    let s = CompositeValue::new(&meter, "S", CompositeKind::Structure, fields).unwrap();
    let copy = Value::Composite(s.clone()).transfer(&meter).unwrap();

    s.set_field("x", int8(2));
    assert_eq!(copy.to_string(), "S(x: 1)");
    assert_eq!(gauge.get(MemoryKind::Composite), 2);
}

#[test]
fn test_conforms_to() {
    let meter = Meter::none();
    assert!(int8(1).conforms_to(&StaticType::Number(NumberKind::Int8)));
    assert!(!int8(1).conforms_to(&StaticType::Number(NumberKind::Int16)));
    assert!(int8(1).conforms_to(&StaticType::Optional(&StaticType::Number(NumberKind::Int8))));
    assert!(Value::Nil.conforms_to(&StaticType::Optional(&StaticType::Bool)));
    assert!(!Value::Nil.conforms_to(&StaticType::Bool));

    let array = ArrayValue::new(&meter, BOOL_ARRAY, vec![]).unwrap();
    assert!(Value::Array(array.clone()).conforms_to(&BOOL_ARRAY));
    assert!(Value::Array(array).conforms_to(&StaticType::AnyStruct));

    let resource = CompositeValue::new(&meter, "R", CompositeKind::Resource, IndexMap::new()).unwrap();
    let resource = Value::Composite(resource);
    assert!(resource.conforms_to(&R));
    assert!(resource.conforms_to(&StaticType::AnyResource));
    assert!(!resource.conforms_to(&StaticType::AnyStruct));
}

#[test]
fn test_equality() {
    assert!(int8(3).equals(&int8(3)));
    assert!(!int8(3).equals(&Value::Number(NumberValue::Int16(3))));
    assert!(Value::String(Rc::from("a")).equals(&Value::String(Rc::from("a"))));
    assert!(Value::Nil.equals(&Value::Nil));
    assert!(!Value::Nil.equals(&Value::Some(Box::new(Value::Nil))));
}

#[test]
fn test_dictionary_keys_hash_by_value() {
    let meter = Meter::none();
    let ty = StaticType::Dictionary {
        key: &StaticType::String,
        value: &StaticType::Number(NumberKind::Int8),
    };
    let mut entries = IndexMap::new();
    entries.insert(DictionaryKey(Value::String(Rc::from("b"))), int8(2));
    entries.insert(DictionaryKey(Value::String(Rc::from("a"))), int8(1));
    let dictionary = DictionaryValue::new(&meter, ty, entries).unwrap();

    let key = Value::String(Rc::from("a"));
    assert!(dictionary.contains_key(&key));
    assert_eq!(dictionary.get(&key).map(|v| v.to_string()), Some("1".to_string()));
    assert_eq!(dictionary.insert(key.clone(), int8(5)).map(|v| v.to_string()), Some("1".to_string()));
    assert_eq!(dictionary.len(), 2);
    assert_eq!(Value::Dictionary(dictionary.clone()).to_string(), "{\"b\": 2, \"a\": 5}");
    dictionary.remove(&Value::String(Rc::from("b")));
    assert_eq!(Value::Dictionary(dictionary).to_string(), "{\"a\": 5}");
}

#[test]
fn test_display() {
    let meter = Meter::none();
    let array = ArrayValue::new(&meter, BOOL_ARRAY, vec![Value::Bool(true), Value::Bool(false)]).unwrap();
    assert_eq!(Value::Array(array).to_string(), "[true, false]");
    assert_eq!(Value::String(Rc::from("a\"b")).to_string(), "\"a\\\"b\"");
    assert_eq!(Value::Void.to_string(), "()");
    assert_eq!(Value::Nil.to_string(), "nil");
}
