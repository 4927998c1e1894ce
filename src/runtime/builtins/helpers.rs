use crate::runtime::{
    error::RuntimeError,
    handle::Handle,
    value::{List, Map, Value},
};

pub(super) fn type_error(name: &str, label: &str, expected: &'static str, got: &Value) -> RuntimeError {
    RuntimeError::type_mismatch(format!("{} {}", name, label), expected, got.type_name())
}

pub(super) fn check_arity(args: &[Value], expected: usize, name: &str) -> Result<(), RuntimeError> {
    if args.len() != expected {
        return Err(RuntimeError::arity(name, expected, args.len()));
    }
    Ok(())
}

pub(super) fn arg_list<'a>(
    args: &'a [Value],
    index: usize,
    name: &str,
    label: &str,
) -> Result<&'a Handle<List>, RuntimeError> {
    match &args[index] {
        Value::List(list) => Ok(list),
        other => Err(type_error(name, label, "List", other)),
    }
}

pub(super) fn arg_map<'a>(
    args: &'a [Value],
    index: usize,
    name: &str,
    label: &str,
) -> Result<&'a Handle<Map>, RuntimeError> {
    match &args[index] {
        Value::Map(map) => Ok(map),
        other => Err(type_error(name, label, "Map", other)),
    }
}

pub(super) fn arg_text<'a>(
    args: &'a [Value],
    index: usize,
    name: &str,
    label: &str,
) -> Result<&'a str, RuntimeError> {
    match &args[index] {
        Value::Text(text) => Ok(&text[..]),
        other => Err(type_error(name, label, "Text", other)),
    }
}

/// Reads a non-negative whole number usable as a list position.
pub(super) fn arg_index(
    args: &[Value],
    index: usize,
    name: &str,
    label: &str,
) -> Result<usize, RuntimeError> {
    match &args[index] {
        Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 => Ok(*n as usize),
        Value::Number(n) => Err(RuntimeError::Native(format!(
            "{} {} must be a whole number, got {}",
            name, label, n
        ))),
        other => Err(type_error(name, label, "Number", other)),
    }
}
