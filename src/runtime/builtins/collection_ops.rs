use std::rc::Rc;

use crate::runtime::{RuntimeContext, error::RuntimeError, value::Value};

use super::helpers::{arg_index, arg_text, check_arity, type_error};

/// length(value) - Item count of a list or map, character count of text.
pub(super) fn builtin_length(
    _ctx: &mut dyn RuntimeContext,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    check_arity(&args, 1, "length")?;
    let len = match &args[0] {
        Value::List(list) => list.borrow()?.len(),
        Value::Map(map) => map.borrow()?.len(),
        Value::Text(text) => text.chars().count(),
        other => return Err(type_error("length", "argument", "List, Map or Text", other)),
    };
    Ok(Value::Number(len as f64))
}

/// get(collection, key) - Reads a list position or map key.
///
/// Missing positions and keys yield `nothing`.
pub(super) fn builtin_get(
    _ctx: &mut dyn RuntimeContext,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    check_arity(&args, 2, "get")?;
    match &args[0] {
        Value::List(list) => {
            let index = arg_index(&args, 1, "get", "index")?;
            Ok(list.borrow()?.get(index).cloned().unwrap_or(Value::Nothing))
        }
        Value::Map(map) => {
            let key = arg_text(&args, 1, "get", "key")?;
            Ok(map.borrow()?.get(key).cloned().unwrap_or(Value::Nothing))
        }
        other => Err(type_error("get", "collection", "List or Map", other)),
    }
}

/// set(collection, key, value) - Replaces a list item or inserts a map entry.
pub(super) fn builtin_set(
    _ctx: &mut dyn RuntimeContext,
    mut args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    check_arity(&args, 3, "set")?;
    let value = args.swap_remove(2);
    let previous = match &args[0] {
        Value::List(list) => {
            let index = arg_index(&args, 1, "set", "index")?;
            let mut items = list.borrow_mut()?;
            let len = items.len();
            let slot = items.get_mut(index).ok_or_else(|| {
                RuntimeError::Native(format!(
                    "set index {} is out of range for a list of length {}",
                    index, len
                ))
            })?;
            std::mem::replace(slot, value)
        }
        Value::Map(map) => {
            let key = Rc::from(arg_text(&args, 1, "set", "key")?);
            map.borrow_mut()?.insert(key, value).unwrap_or(Value::Nothing)
        }
        other => return Err(type_error("set", "collection", "List or Map", other)),
    };
    // Released after the token so that dropping it never runs inside a mutation.
    drop(previous);
    Ok(Value::Nothing)
}

/// contains(collection, needle) - List membership, map key, or substring.
pub(super) fn builtin_contains(
    _ctx: &mut dyn RuntimeContext,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    check_arity(&args, 2, "contains")?;
    let found = match &args[0] {
        Value::List(list) => list.borrow()?.iter().any(|item| *item == args[1]),
        Value::Map(map) => {
            let key = arg_text(&args, 1, "contains", "key")?;
            map.borrow()?.contains_key(key)
        }
        Value::Text(text) => text.contains(arg_text(&args, 1, "contains", "needle")?),
        other => {
            return Err(type_error(
                "contains",
                "collection",
                "List, Map or Text",
                other,
            ));
        }
    };
    Ok(Value::Boolean(found))
}

/// clear(collection) - Removes every item from a list or map.
pub(super) fn builtin_clear(
    _ctx: &mut dyn RuntimeContext,
    args: Vec<Value>,
) -> Result<Value, RuntimeError> {
    check_arity(&args, 1, "clear")?;
    match &args[0] {
        Value::List(list) => {
            let items = std::mem::take(&mut *list.borrow_mut()?);
            drop(items);
        }
        Value::Map(map) => {
            let entries = std::mem::take(&mut *map.borrow_mut()?);
            drop(entries);
        }
        other => return Err(type_error("clear", "argument", "List or Map", other)),
    }
    Ok(Value::Nothing)
}
