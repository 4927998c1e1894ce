//! Runtime value graph and memory management.
//!
//! # Ownership Invariant
//! Runtime values are reference counted. Lists, maps and environments are
//! mutable, so the graph may contain cycles, and reference counting alone
//! cannot reclaim them. The rules that keep the common cases acyclic are:
//! - A closure owns its captured environment.
//! - An environment never owns a closure defined in it. Named functions are
//!   bound into their defining environment through a weak handle.
//! - A call environment refers to its lexical parent weakly. The active frame
//!   owns the closure, and the closure owns that parent.
//! - Every other edge (list items, map entries, value bindings) is owning.
//!
//! Cycles that user code builds through those owning edges, such as a list
//! pushed into itself, are left to the mark-and-sweep collector in [`gc`].
//!
//! # Exclusive Access
//! Mutation of a shared value goes through [`handle::Handle::borrow_mut`],
//! which hands out a scoped token. Asking for a second token on the same value
//! while the first is held fails with
//! [`error::RuntimeError::ReentrantAccess`] instead of aliasing.
use crate::runtime::{error::RuntimeError, gc::GcHeap, value::Value};

pub mod builtin_function;
pub mod builtins;
pub mod closure;
pub mod compiled_function;
pub mod config;
pub mod environment;
pub mod error;
pub mod frame;
pub mod gc;
pub mod handle;
pub mod leak_detector;
pub mod task;
pub mod value;
pub mod vm;

/// Signature of every native function.
///
/// Arguments arrive as owning values and the result leaves as one.
pub type BuiltinFn = fn(&mut dyn RuntimeContext, Vec<Value>) -> Result<Value, RuntimeError>;

/// What a native function may ask of the interpreter.
pub trait RuntimeContext {
    /// Calls a function value. Natives reach user code only through here.
    fn invoke_value(&mut self, callee: Value, args: Vec<Value>) -> Result<Value, RuntimeError>;

    fn gc_heap(&self) -> &GcHeap;

    fn gc_heap_mut(&mut self) -> &mut GcHeap;
}
