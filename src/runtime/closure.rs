use std::rc::Rc;

use log::trace;

use crate::runtime::{
    compiled_function::CompiledFunction,
    environment::Environment,
    error::RuntimeError,
    gc::GcHeap,
    handle::Handle,
    value::Value,
};

/// A function's code paired with the environment active at its definition.
///
/// The closure owns that environment; it is the single owning edge that keeps
/// a lexical scope alive after the frame that created it returns.
#[derive(Debug)]
pub struct Closure {
    pub function: Rc<CompiledFunction>,
    pub env: Handle<Environment>,
}

impl Closure {
    pub fn new(function: Rc<CompiledFunction>, env: Handle<Environment>) -> Self {
        Self { function, env }
    }
}

/// Defines a named function that can call itself through `env`.
///
/// The name is reserved first, the closure is built owning `env`, and the name
/// is then rebound to a weak reference to the closure. `env` therefore never
/// owns the closure it defines: once every owning handle returned from here is
/// dropped, the closure is destroyed and releases `env`.
pub fn define_recursive(
    heap: &mut GcHeap,
    env: &Handle<Environment>,
    name: &str,
    function: Rc<CompiledFunction>,
) -> Result<Handle<Closure>, RuntimeError> {
    env.define(name, Value::Nothing)?;
    let closure = heap.alloc_closure(Closure::new(function, env.clone()))?;
    env.borrow_mut()?
        .bind_weak_function(name, closure.downgrade());
    trace!("bound '{}' weakly in {} to {}", name, env.id(), closure.id());
    Ok(closure)
}
