use crate::runtime::{RuntimeContext, error::RuntimeError, value::Value};

use super::helpers::{arg_list, check_arity};

/// list(a, b, ...) - Builds a new list from its arguments.
pub(super) fn builtin_list(
    ctx: &mut dyn RuntimeContext,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    Ok(Value::List(ctx.gc_heap_mut().alloc_list(args)?))
}

/// push(list, item) - Appends in place.
///
/// Pushing a list into itself is allowed and forms a cycle that only the
/// collector can reclaim.
pub(super) fn builtin_push(
    _ctx: &mut dyn RuntimeContext,
    mut args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    check_arity(&args, 2, "push")?;
    let item = args.swap_remove(1);
    let list = arg_list(&args, 0, "push", "list")?;
    list.borrow_mut()?.push(item);
    Ok(Value::Nothing)
}

/// pop(list) - Removes and returns the last item.
pub(super) fn builtin_pop(
    _ctx: &mut dyn RuntimeContext,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    check_arity(&args, 1, "pop")?;
    let list = arg_list(&args, 0, "pop", "list")?;
    let popped = list.borrow_mut()?.pop();
    popped.ok_or_else(|| RuntimeError::Native("cannot pop from an empty list".to_string()))
}
