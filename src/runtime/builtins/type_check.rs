use crate::runtime::{RuntimeContext, error::RuntimeError, value::Value};

use super::helpers::check_arity;

pub(super) fn builtin_type_of(
    _ctx: &mut dyn RuntimeContext,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    check_arity(&args, 1, "type_of")?;
    Ok(Value::text(args[0].type_name()))
}
