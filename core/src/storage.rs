//! Account storage collaborator.
//!
//! The interpreter reads and writes account storage only through [`Storage`].
//! Writes are visible to later reads within the same execution; how they are
//! committed is up to the host.

use crate::values::{Address, PathValue, Value};
use hashbrown::HashMap;
use tracing::debug;

pub trait Storage<'a> {
    /// The value stored at `path` in `address`, if any.
    fn get(&self, address: Address, path: &PathValue) -> Option<Value<'a>>;

    fn set(&mut self, address: Address, path: PathValue, value: Value<'a>);

    fn remove(&mut self, address: Address, path: &PathValue) -> Option<Value<'a>>;
}

/// Storage kept in memory for the lifetime of the interpreter.
#[derive(Debug, Default)]
pub struct InMemoryStorage<'a> {
    values: HashMap<(Address, PathValue), Value<'a>>,
}

impl<'a> InMemoryStorage<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<'a> Storage<'a> for InMemoryStorage<'a> {
    fn get(&self, address: Address, path: &PathValue) -> Option<Value<'a>> {
        self.values.get(&(address, path.clone())).cloned()
    }

    fn set(&mut self, address: Address, path: PathValue, value: Value<'a>) {
        debug!(%address, %path, "storage write");
        self.values.insert((address, path), value);
    }

    fn remove(&mut self, address: Address, path: &PathValue) -> Option<Value<'a>> {
        debug!(%address, %path, "storage remove");
        self.values.remove(&(address, path.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PathDomain;

    #[test]
    fn test_set_get_remove() {
        let mut storage = InMemoryStorage::new();
        let address = Address::from_u64(1);
        let path = PathValue::new(PathDomain::Storage, "flag");

        assert!(storage.get(address, &path).is_none());
        storage.set(address, path.clone(), Value::Bool(true));
        assert!(matches!(storage.get(address, &path), Some(Value::Bool(true))));
        assert!(storage.get(Address::from_u64(2), &path).is_none());

        assert!(storage.remove(address, &path).is_some());
        assert!(storage.is_empty());
    }
}
