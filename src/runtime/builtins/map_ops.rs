use std::rc::Rc;

use crate::runtime::{
    RuntimeContext,
    error::RuntimeError,
    value::{Map, Value},
};

use super::helpers::{arg_map, check_arity};

/// map(key, value, ...) - Builds a new map from alternating keys and values.
pub(super) fn builtin_map(
    ctx: &mut dyn RuntimeContext,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    if args.len() % 2 != 0 {
        return Err(RuntimeError::Native(format!(
            "map expects key/value pairs, got {} argument(s)",
            args.len()
        )));
    }

    let mut entries = Map::with_capacity(args.len() / 2);
    let mut args = args.into_iter();
    while let (Some(key), Some(value)) = (args.next(), args.next()) {
        let key = match key {
            Value::Text(text) => text,
            other => {
                return Err(RuntimeError::type_mismatch(
                    "map key",
                    "Text",
                    other.type_name(),
                ));
            }
        };
        entries.insert(key, value);
    }
    Ok(Value::Map(ctx.gc_heap_mut().alloc_map(entries)?))
}

/// keys(map) - Returns the keys as a new list, sorted.
pub(super) fn builtin_keys(
    ctx: &mut dyn RuntimeContext,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    check_arity(&args, 1, "keys")?;
    let map = arg_map(&args, 0, "keys", "argument")?;
    let mut keys: Vec<Rc<str>> = map.borrow()?.keys().cloned().collect();
    keys.sort();
    let items = keys.into_iter().map(Value::Text).collect();
    Ok(Value::List(ctx.gc_heap_mut().alloc_list(items)?))
}
