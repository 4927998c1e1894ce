use std::rc::Rc;

use crate::runtime::{
    RuntimeContext,
    builtins::BUILTINS,
    closure::Closure,
    compiled_function::CompiledFunction,
    config::GcConfig,
    environment::{Environment, ParentLink},
    error::RuntimeError,
    frame::Frame,
    gc::GcHeap,
    handle::Handle,
    leak_detector::LeakStats,
    task::{TaskId, TaskTable},
    value::{List, Map, Value},
};

mod collection;
mod function_call;

/// Runs a user function's body once its call frame is in place.
///
/// Installed by the dispatcher so that natives can call back into user code
/// through [`RuntimeContext::invoke_value`].
pub type Executor =
    Rc<dyn Fn(&mut Vm, &CompiledFunction, &Handle<Environment>) -> Result<Value, RuntimeError>>;

/// Runtime state driven by an external dispatcher.
///
/// Everything reachable from here is a collection root: the global
/// environment, every active frame, the temporaries stack (including the
/// arguments of running natives), and task results that have not been taken.
pub struct Vm {
    gc_heap: GcHeap,
    globals: Handle<Environment>,
    frames: Vec<Frame>,
    stack: Vec<Value>,
    tasks: TaskTable,
    executor: Option<Executor>,
    max_call_depth: usize,
}

impl Vm {
    pub fn new() -> Result<Self, RuntimeError> {
        Self::with_config(GcConfig::default())
    }

    /// Creates a VM whose global environment already binds every builtin.
    pub fn with_config(config: GcConfig) -> Result<Self, RuntimeError> {
        let mut gc_heap = GcHeap::with_config(config);
        let max_call_depth = gc_heap.config().max_call_depth;
        let globals = gc_heap.alloc_environment(Environment::new(None))?;
        for builtin in BUILTINS {
            globals.define(builtin.name, Value::NativeFunction(*builtin))?;
        }

        Ok(Self {
            gc_heap,
            globals,
            frames: Vec::new(),
            stack: Vec::new(),
            tasks: TaskTable::new(),
            executor: None,
            max_call_depth,
        })
    }

    pub fn set_executor(&mut self, executor: Executor) {
        self.executor = Some(executor);
    }

    pub fn set_gc_enabled(&mut self, enabled: bool) {
        self.gc_heap.set_enabled(enabled);
    }

    pub fn set_gc_threshold(&mut self, threshold: usize) {
        self.gc_heap.set_threshold(threshold);
    }

    pub fn gc_telemetry_report(&self) -> String {
        self.gc_heap.telemetry_report()
    }

    // -----------------------------------------------------------------------
    // Allocation
    // -----------------------------------------------------------------------

    pub fn alloc_list(&mut self, items: List) -> Result<Value, RuntimeError> {
        Ok(Value::List(self.gc_heap.alloc_list(items)?))
    }

    pub fn alloc_map(&mut self, entries: Map) -> Result<Value, RuntimeError> {
        Ok(Value::Map(self.gc_heap.alloc_map(entries)?))
    }

    pub fn new_environment(
        &mut self,
        parent: Option<ParentLink>,
    ) -> Result<Handle<Environment>, RuntimeError> {
        self.gc_heap.alloc_environment(Environment::new(parent))
    }

    /// Creates the environment for one call of `closure`.
    ///
    /// Its parent is the closure's captured environment, linked weakly: the
    /// frame running the call owns the closure, which owns that environment.
    pub fn new_call_environment(
        &mut self,
        closure: &Handle<Closure>,
    ) -> Result<Handle<Environment>, RuntimeError> {
        let captured = closure.borrow()?.env.downgrade();
        self.new_environment(Some(ParentLink::Weak(captured)))
    }

    // -----------------------------------------------------------------------
    // Names
    // -----------------------------------------------------------------------

    pub fn define_global(&mut self, name: &str, value: Value) -> Result<(), RuntimeError> {
        self.globals.define(name, value)
    }

    /// Environment of the innermost active call, or the globals at top level.
    pub fn current_env(&self) -> Handle<Environment> {
        match self.frames.last() {
            Some(frame) => frame.env.clone(),
            None => self.globals.clone(),
        }
    }

    /// Resolves `name` from the current environment outward.
    pub fn lookup(&self, name: &str) -> Result<Value, RuntimeError> {
        self.current_env()
            .get(name)?
            .ok_or_else(|| RuntimeError::NameNotFound(Rc::from(name)))
    }

    pub fn assign(&self, name: &str, value: Value) -> Result<(), RuntimeError> {
        self.current_env().assign(name, value)
    }

    // -----------------------------------------------------------------------
    // Temporaries
    // -----------------------------------------------------------------------

    /// Roots a value that is held by the dispatcher but not yet bound.
    pub fn push(&mut self, value: Value) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Option<Value> {
        self.stack.pop()
    }

    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    // -----------------------------------------------------------------------
    // Tasks
    // -----------------------------------------------------------------------

    pub fn spawn_task(&mut self) -> Value {
        Value::Task(self.tasks.spawn())
    }

    pub fn complete_task(&mut self, id: TaskId, result: Value) -> Result<(), RuntimeError> {
        self.tasks.complete(id, result)
    }

    /// Returns `Ok(None)` while the task is still pending.
    pub fn take_task_result(&mut self, id: TaskId) -> Result<Option<Value>, RuntimeError> {
        self.tasks.take_result(id)
    }

    pub fn cancel_task(&mut self, id: TaskId) -> Result<(), RuntimeError> {
        self.tasks.cancel_root(id)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn globals(&self) -> &Handle<Environment> {
        &self.globals
    }

    pub fn heap(&self) -> &GcHeap {
        &self.gc_heap
    }

    pub fn heap_mut(&mut self) -> &mut GcHeap {
        &mut self.gc_heap
    }

    pub fn tasks(&self) -> &TaskTable {
        &self.tasks
    }

    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// Frame names from outermost to innermost.
    pub fn call_stack(&self) -> Vec<Rc<str>> {
        self.frames.iter().map(Frame::name).collect()
    }

    pub fn registry_size(&self) -> usize {
        self.gc_heap.registry_size()
    }

    pub fn leak_stats(&self) -> LeakStats {
        self.gc_heap.leak_stats()
    }
}

impl RuntimeContext for Vm {
    fn invoke_value(&mut self, callee: Value, args: Vec<Value>) -> Result<Value, RuntimeError> {
        self.call_value(callee, args)
    }

    fn gc_heap(&self) -> &GcHeap {
        &self.gc_heap
    }

    fn gc_heap_mut(&mut self) -> &mut GcHeap {
        &mut self.gc_heap
    }
}
