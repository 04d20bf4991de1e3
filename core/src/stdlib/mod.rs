//! Standard library.
//!
//! Host functions bound in the global scope of every interpreter before the
//! program's declarations are evaluated:
//! - Conversions: one function per number kind (`Int8(x)`, `UFix64(x)`, ...),
//!   `Address`, and the path constructors.
//! - Failure: `panic` and `assert`.
//! - Accounts: `getAuthAccount`, see [`account`].
//! - Testing: `executeScript`, see [`test_framework`].
//!
//! Calling these functions is never metered as a host-function allocation;
//! the values they produce are.

pub mod account;
pub mod test_framework;

pub use test_framework::{ScriptResult, TestFramework};

use crate::interpreter::{ExecutionError, Invocation, RuntimeError};
use crate::types::{NumberKind, PathDomain};
use crate::values::{Address, HostFn, Value, host_fn};
use num_traits::ToPrimitive;

/// Every standard library function with the name it is bound under.
pub fn functions<'a>() -> Vec<(&'a str, HostFn<'a>)> {
    let mut functions: Vec<(&'a str, HostFn<'a>)> = NumberKind::ALL
        .into_iter()
        .map(|kind| -> (&'a str, HostFn<'a>) {
            (
                kind.name(),
                host_fn(move |invocation: &mut Invocation<'_, 'a>| convert(invocation, kind)),
            )
        })
        .collect();

    for domain in [PathDomain::Storage, PathDomain::Private, PathDomain::Public] {
        functions.push((
            domain.type_name(),
            host_fn(move |invocation: &mut Invocation<'_, 'a>| path(invocation, domain)),
        ));
    }

    functions.extend([
        ("Address", host_fn(address)),
        ("panic", host_fn(panic)),
        ("assert", host_fn(assert)),
        ("getAuthAccount", host_fn(account::get_auth_account)),
        ("executeScript", host_fn(test_framework::execute_script)),
    ]);
    functions
}

// ============================================================================
// Conversions
// ============================================================================

fn convert<'a>(
    invocation: &mut Invocation<'_, 'a>,
    kind: NumberKind,
) -> Result<Value<'a>, ExecutionError> {
    let number = invocation.number_argument(0)?;
    Ok(Value::Number(number.convert(kind, invocation.meter())?))
}

/// `Address(x)` from an integer, failing when it does not fit eight bytes.
fn address<'a>(invocation: &mut Invocation<'_, 'a>) -> Result<Value<'a>, ExecutionError> {
    let number = invocation.number_argument(0)?;
    let value = number
        .to_bigint()
        .to_u64()
        .ok_or_else(|| invocation.error(format!("{} does not fit an address", number)))?;
    Ok(Value::new_address(invocation.meter(), Address::from_u64(value))?)
}

/// `StoragePath(identifier:)` and friends.
fn path<'a>(
    invocation: &mut Invocation<'_, 'a>,
    domain: PathDomain,
) -> Result<Value<'a>, ExecutionError> {
    let identifier = invocation.string_argument(0)?;
    Ok(Value::new_path(invocation.meter(), domain, &identifier)?)
}

// ============================================================================
// Failure
// ============================================================================

fn panic<'a>(invocation: &mut Invocation<'_, 'a>) -> Result<Value<'a>, ExecutionError> {
    let message = invocation.string_argument(0)?;
    Err(RuntimeError::Panic {
        message: message.to_string(),
    }
    .into())
}

/// `assert(condition, message: "...")`; the message is optional.
fn assert<'a>(invocation: &mut Invocation<'_, 'a>) -> Result<Value<'a>, ExecutionError> {
    if invocation.bool_argument(0)? {
        return Ok(Value::Void);
    }
    let message = match invocation.arguments.get(1) {
        Some(Value::String(message)) => message.to_string(),
        Some(Value::Some(inner)) => match inner.as_ref() {
            Value::String(message) => message.to_string(),
            _ => String::new(),
        },
        _ => String::new(),
    };
    Err(RuntimeError::AssertionFailed { message }.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_function_names() {
        let names: Vec<&str> = functions().into_iter().map(|(name, _)| name).collect();
        assert_eq!(names.len(), NumberKind::ALL.len() + 3 + 5);
        for name in ["Int", "UFix64", "StoragePath", "Address", "getAuthAccount"] {
            assert!(names.contains(&name), "missing {}", name);
        }
    }
}
