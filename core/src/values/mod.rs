//! Runtime values.
//!
//! [`Value`] is a closed sum over every value the interpreter can produce.
//! Every constructor takes a [`Meter`](crate::memory::Meter) and reports its
//! allocation before the value exists.

mod composite;
mod container;
mod function;
mod number;
mod path;
mod reference;
pub mod string;
mod value;

pub use composite::{CompositeValue, ResourceState};
pub use container::{ArrayValue, DictionaryKey, DictionaryValue};
pub use function::{
    BoundFunction, FunctionValue, HostFn, HostFunction, InterpretedFunction, host_fn,
};
pub use number::NumberValue;
pub use path::{Address, CapabilityValue, LinkValue, PathValue};
pub use reference::{EphemeralReference, ReferenceValue, StorageReference};
pub use value::Value;
