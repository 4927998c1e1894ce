use std::fmt;

use crate::runtime::{BuiltinFn, RuntimeContext, error::RuntimeError, value::Value};

/// Native callable registered by the host.
///
/// Arguments and results cross this boundary as owning values only.
#[derive(Clone, Copy)]
pub struct BuiltinFunction {
    pub name: &'static str,
    pub func: BuiltinFn,
}

impl BuiltinFunction {
    pub fn call(
        &self,
        ctx: &mut dyn RuntimeContext,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        (self.func)(ctx, args)
    }
}

impl fmt::Debug for BuiltinFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BuiltinFunction({})", self.name)
    }
}

impl PartialEq for BuiltinFunction {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
