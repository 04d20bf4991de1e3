//! Hook for running scripts from test code.

use crate::interpreter::{ExecutionError, InternalError, Invocation};
use crate::types::{CompositeKind, StaticType};
use crate::values::{CompositeValue, Value};
use indexmap::IndexMap;

/// Outcome of a script run by a [`TestFramework`].
#[derive(Debug, Clone, Default)]
pub struct ScriptResult<'a> {
    pub value: Option<Value<'a>>,
    pub error: Option<String>,
}

/// Runs scripts on behalf of `executeScript`. Supplied through
/// [`InterpreterBuilder::test_framework`](crate::interpreter::InterpreterBuilder::test_framework).
pub trait TestFramework<'a> {
    fn run_script(&self, code: &str) -> ScriptResult<'a>;
}

const ANY: StaticType<'static> = StaticType::Optional(&StaticType::AnyStruct);

/// `executeScript(code)`, returning a `ScriptResult` structure.
pub(crate) fn execute_script<'a>(
    invocation: &mut Invocation<'_, 'a>,
) -> Result<Value<'a>, ExecutionError> {
    let framework = invocation
        .interpreter
        .test_framework()
        .ok_or(InternalError::TestFrameworkNotProvided)?;
    let code = invocation.string_argument(0)?;
    let result = framework.run_script(&code);

    let meter = invocation.meter();
    let value = match result.value {
        Some(value) => value.into_optional(&ANY, meter)?,
        None => Value::Nil,
    };
    let error = match result.error {
        Some(message) => Value::new_some(meter, Value::new_string(meter, &message)?)?,
        None => Value::Nil,
    };

    let mut fields = IndexMap::new();
    fields.insert("returnValue", value);
    fields.insert("error", error);
    let result = CompositeValue::new(meter, "ScriptResult", CompositeKind::Structure, fields)?;
    Ok(Value::Composite(result))
}
