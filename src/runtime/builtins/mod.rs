//! Native intrinsics over lists and maps.
//!
//! Every intrinsic that mutates its target holds that target's access token
//! only for its own mutation and never while calling out, so a nested call
//! that touches the same value fails with `ReentrantAccess` instead of
//! aliasing it.
use crate::runtime::builtin_function::BuiltinFunction;

mod collection_ops;
mod helpers;
mod list_ops;
mod map_ops;
mod type_check;

use collection_ops::{builtin_clear, builtin_contains, builtin_get, builtin_length, builtin_set};
use list_ops::{builtin_list, builtin_pop, builtin_push};
use map_ops::{builtin_keys, builtin_map};
use type_check::builtin_type_of;

/// All built-in functions, bound into the global environment in this order.
pub static BUILTINS: &[BuiltinFunction] = &[
    BuiltinFunction {
        name: "length",
        func: builtin_length,
    },
    BuiltinFunction {
        name: "push",
        func: builtin_push,
    },
    BuiltinFunction {
        name: "pop",
        func: builtin_pop,
    },
    BuiltinFunction {
        name: "get",
        func: builtin_get,
    },
    BuiltinFunction {
        name: "set",
        func: builtin_set,
    },
    BuiltinFunction {
        name: "keys",
        func: builtin_keys,
    },
    BuiltinFunction {
        name: "contains",
        func: builtin_contains,
    },
    BuiltinFunction {
        name: "clear",
        func: builtin_clear,
    },
    BuiltinFunction {
        name: "list",
        func: builtin_list,
    },
    BuiltinFunction {
        name: "map",
        func: builtin_map,
    },
    BuiltinFunction {
        name: "type_of",
        func: builtin_type_of,
    },
];

pub fn get_builtin(name: &str) -> Option<&'static BuiltinFunction> {
    BUILTINS.iter().find(|b| b.name == name)
}

pub fn get_builtin_by_index(index: usize) -> Option<&'static BuiltinFunction> {
    BUILTINS.get(index)
}
