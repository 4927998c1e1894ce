use std::rc::Rc;

use log::trace;

use crate::runtime::{
    builtin_function::BuiltinFunction,
    closure::{self, Closure},
    compiled_function::CompiledFunction,
    environment::Environment,
    error::RuntimeError,
    frame::Frame,
    handle::Handle,
    value::Value,
};

use super::Vm;

impl Vm {
    /// Defines a named, self-recursive function in `env`.
    ///
    /// The environment only holds the function weakly. Inside a call the
    /// active frame keeps an owning handle until it returns; at top level the
    /// returned value is the only owner, and dropping it reclaims the closure.
    pub fn define_function(
        &mut self,
        env: &Handle<Environment>,
        name: &str,
        function: Rc<CompiledFunction>,
    ) -> Result<Value, RuntimeError> {
        let closure = closure::define_recursive(&mut self.gc_heap, env, name, function)?;
        if let Some(frame) = self.frames.last_mut() {
            frame.retain(closure.clone());
        }
        Ok(Value::Function(closure))
    }

    /// Builds an anonymous closure over `env` without binding it anywhere.
    pub fn make_closure(
        &mut self,
        env: &Handle<Environment>,
        function: Rc<CompiledFunction>,
    ) -> Result<Value, RuntimeError> {
        let closure = self
            .gc_heap
            .alloc_closure(Closure::new(function, env.clone()))?;
        Ok(Value::Function(closure))
    }

    /// Calls `closure` with `args`, running `body` inside a fresh frame.
    ///
    /// Parameters are bound into a new call environment whose parent is the
    /// closure's captured environment. The frame is popped whether or not
    /// `body` succeeds.
    pub fn call_function<F>(
        &mut self,
        closure: &Handle<Closure>,
        args: Vec<Value>,
        body: F,
    ) -> Result<Value, RuntimeError>
    where
        F: FnOnce(&mut Vm, &CompiledFunction, &Handle<Environment>) -> Result<Value, RuntimeError>,
    {
        let function = Rc::clone(&closure.borrow()?.function);
        if args.len() != function.num_parameters() {
            return Err(RuntimeError::arity(
                function.display_name(),
                function.num_parameters(),
                args.len(),
            ));
        }
        if self.frames.len() >= self.max_call_depth {
            return Err(RuntimeError::StackOverflow {
                depth: self.max_call_depth,
            });
        }

        let env = self.new_call_environment(closure)?;
        for (param, arg) in function.parameters.iter().zip(args) {
            env.define(param, arg)?;
        }

        self.frames.push(Frame::new(closure.clone(), env.clone()));
        trace!(
            "enter {} (depth {})",
            function.display_name(),
            self.frames.len()
        );
        let result = body(self, &function, &env);
        let frame = self.frames.pop();
        trace!(
            "leave {} (depth {}, {} retained)",
            function.display_name(),
            self.frames.len(),
            frame.as_ref().map_or(0, |frame| frame.retained.len())
        );
        result
    }

    /// Calls any callable value, natives included.
    ///
    /// User functions run through the installed executor.
    pub fn call_value(&mut self, callee: Value, args: Vec<Value>) -> Result<Value, RuntimeError> {
        match callee {
            Value::NativeFunction(native) => self.call_native(native, args),
            Value::Function(closure) => {
                let executor = self.executor.clone().ok_or_else(|| {
                    RuntimeError::Native("no function executor installed".to_string())
                })?;
                self.call_function(&closure, args, |vm, function, env| {
                    executor(vm, function, env)
                })
            }
            other => Err(RuntimeError::type_mismatch(
                "call",
                "Function",
                other.type_name(),
            )),
        }
    }

    /// Calls a native with `args` rooted on the temporaries stack, so a
    /// collection reached through a callback cannot empty them.
    pub fn call_native(
        &mut self,
        native: BuiltinFunction,
        args: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        trace!("native {} ({} args)", native.name, args.len());
        let base = self.stack.len();
        self.stack.extend(args.iter().cloned());
        let result = native.call(self, args);
        self.stack.truncate(base);
        result
    }
}
