//! Runtime resource ownership: binding, moving, losing and destroying.
//!
//! Every resource value carries a [`ResourceState`]. Values leave a slot as
//! `InTransit` and become `Live` again when something claims them. A `Live`
//! resource still held by an owning variable at scope exit has been lost.

use super::{ExecutionError, Interpreter, OwnershipError};
use crate::memory::MemoryKind;
use crate::scope_stack::{Binding, Scope, Slot, Variable};
use crate::values::{ReferenceValue, ResourceState, Value};
use std::rc::Rc;
use tracing::debug;

impl<'a> Interpreter<'a> {
    /// Bind `name` in `scope`, claiming the value if the binding owns it.
    pub(crate) fn bind(
        &mut self,
        scope: &Scope<'a>,
        name: &'a str,
        value: Value<'a>,
        binding: Binding<'a>,
    ) -> Result<Rc<Variable<'a>>, ExecutionError> {
        self.report(MemoryKind::Variable, 1)?;
        if binding.owns_value {
            self.claim(&value)?;
        }
        Ok(scope.bind(name, value, binding))
    }

    /// Take ownership of a value headed for a slot.
    pub(crate) fn claim(&self, value: &Value<'a>) -> Result<(), ExecutionError> {
        match value.resource_state() {
            None => Ok(()),
            Some(ResourceState::Destroyed) => Err(self.destroyed_error(value)),
            Some(ResourceState::Live) => Err(OwnershipError::DuplicateResource {
                type_name: value.type_name(),
            }
            .into()),
            Some(ResourceState::InTransit) => {
                value.set_resource_state(ResourceState::Live);
                Ok(())
            }
        }
    }

    /// Drop a value overwritten in a slot. Live resources may not be dropped.
    pub(super) fn release(&self, previous: Option<Value<'a>>) -> Result<(), ExecutionError> {
        match previous {
            Some(value) if value.resource_state() == Some(ResourceState::Live) => {
                Err(OwnershipError::ResourceLoss {
                    type_name: value.type_name(),
                }
                .into())
            }
            _ => Ok(()),
        }
    }

    /// Close `scope`, failing if an owned resource was neither moved nor
    /// destroyed.
    pub(super) fn exit_scope(&self, scope: &Scope<'a>) -> Result<(), ExecutionError> {
        let lost = scope.variables().into_iter().find_map(|variable| {
            if !variable.owns_value {
                return None;
            }
            match variable.slot() {
                Slot::Value(value) if value.resource_state() == Some(ResourceState::Live) => {
                    Some(value.type_name())
                }
                _ => None,
            }
        });
        scope.exit();
        match lost {
            Some(type_name) => Err(OwnershipError::ResourceLoss { type_name }.into()),
            None => Ok(()),
        }
    }

    pub(crate) fn destroyed_error(&self, value: &Value<'a>) -> ExecutionError {
        OwnershipError::UseOfDestroyedResource {
            type_name: value.type_name(),
        }
        .into()
    }

    pub(crate) fn check_live(&self, value: &Value<'a>) -> Result<(), ExecutionError> {
        if value.resource_state() == Some(ResourceState::Destroyed) {
            return Err(self.destroyed_error(value));
        }
        Ok(())
    }

    /// Destroy a resource: run its destructor, then destroy the resources it
    /// still owns.
    pub(crate) fn destroy(&mut self, value: Value<'a>) -> Result<(), ExecutionError> {
        if value.resource_state() == Some(ResourceState::Destroyed) {
            return Err(OwnershipError::DoubleDestroy {
                type_name: value.type_name(),
            }
            .into());
        }
        match value {
            Value::Some(inner) => self.destroy(*inner),
            Value::Composite(composite) if composite.is_resource() => {
                let destructor = self
                    .composite_type(composite.name)
                    .and_then(|ty| ty.declaration.destructor);
                if let Some(destructor) = destructor {
                    let scope = self.globals.push();
                    self.run_in_scope(&scope, |this| {
                        let binding = Binding {
                            owns_value: false,
                            ..Binding::default()
                        };
                        this.bind(&scope, "self", Value::Composite(composite.clone()), binding)?;
                        this.execute_statements(destructor.statements, &scope)
                    })?;
                }
                let fields: Vec<Value<'a>> = composite.fields().values().cloned().collect();
                self.destroy_owned(fields)?;
                composite.set_state(ResourceState::Destroyed);
                debug!(resource = composite.name, "destroyed");
                Ok(())
            }
            Value::Array(array) if array.is_resource() => {
                let elements = array.elements().clone();
                self.destroy_owned(elements)?;
                array.set_state(ResourceState::Destroyed);
                Ok(())
            }
            Value::Dictionary(dictionary) if dictionary.is_resource() => {
                let values: Vec<Value<'a>> = dictionary.entries().values().cloned().collect();
                self.destroy_owned(values)?;
                dictionary.set_state(ResourceState::Destroyed);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Destroy nested resources, skipping those a destructor already destroyed.
    fn destroy_owned(&mut self, values: Vec<Value<'a>>) -> Result<(), ExecutionError> {
        for value in values {
            match value.resource_state() {
                None | Some(ResourceState::Destroyed) => {}
                Some(_) => self.destroy(value)?,
            }
        }
        Ok(())
    }

    /// The value a reference points to.
    pub(crate) fn deref(&mut self, reference: &ReferenceValue<'a>) -> Result<Value<'a>, ExecutionError> {
        match reference {
            ReferenceValue::Ephemeral(reference) => {
                if let Some((liveness, name)) = &reference.origin {
                    if !liveness.is_alive() {
                        return Err(OwnershipError::InvalidatedReference {
                            name: name.to_string(),
                        }
                        .into());
                    }
                }
                self.check_live(&reference.value)?;
                Ok(reference.value.clone())
            }
            ReferenceValue::Storage(reference) => self
                .storage
                .get(reference.address, &reference.path)
                .filter(|value| value.conforms_to(&reference.borrowed_type))
                .ok_or_else(|| {
                    OwnershipError::DereferenceFailed {
                        address: reference.address.to_string(),
                        path: reference.path.to_string(),
                    }
                    .into()
                }),
        }
    }

    /// Dereference `value` if it is a reference.
    pub(super) fn deref_value(&mut self, value: Value<'a>) -> Result<Value<'a>, ExecutionError> {
        match value {
            Value::Reference(reference) => self.deref(&reference),
            other => Ok(other),
        }
    }
}
