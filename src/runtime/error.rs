use std::rc::Rc;

use thiserror::Error;

use crate::runtime::{gc::ObjectId, gc::telemetry::ObjectKind, task::TaskId};

/// Faults raised by the memory core and surfaced to the interpreter.
///
/// Everything except [`RuntimeError::RegistryExhausted`] is recoverable and can
/// be caught by the language's own error handling.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// An exclusive-access token was requested on a value whose token is
    /// already held further up the call stack.
    #[error("{kind} {id} is already being accessed; nested mutation is not allowed")]
    ReentrantAccess { kind: ObjectKind, id: ObjectId },

    #[error("undefined variable '{0}'")]
    NameNotFound(Rc<str>),

    #[error("{context} expected {expected}, got {got}")]
    TypeMismatch {
        context: String,
        expected: &'static str,
        got: &'static str,
    },

    #[error("{name} expects {expected} argument(s), got {got}")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("stack overflow: call depth exceeded {depth}")]
    StackOverflow { depth: usize },

    #[error("out of memory: {used} bytes in use, limit is {limit} bytes")]
    OutOfMemory { used: usize, limit: usize },

    /// The collector ran out of object identities. Not recoverable.
    #[error("object registry exhausted: all {capacity} identities are in use")]
    RegistryExhausted { capacity: u64 },

    #[error("unknown task {0}")]
    UnknownTask(TaskId),

    /// A collection started while a value was exclusively held.
    #[error("collection deferred: {id} is held by an active access")]
    CollectorBusy { id: ObjectId },

    /// Failure reported by a native function.
    #[error("{0}")]
    Native(String),
}

impl RuntimeError {
    pub fn type_mismatch(context: impl Into<String>, expected: &'static str, got: &'static str) -> Self {
        RuntimeError::TypeMismatch {
            context: context.into(),
            expected,
            got,
        }
    }

    pub fn arity(name: impl Into<String>, expected: usize, got: usize) -> Self {
        RuntimeError::ArityMismatch {
            name: name.into(),
            expected,
            got,
        }
    }

    /// Returns `false` for faults that must abort the interpreter.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, RuntimeError::RegistryExhausted { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_registry_exhaustion_is_fatal() {
        assert!(!RuntimeError::RegistryExhausted { capacity: 8 }.is_recoverable());
        assert!(RuntimeError::NameNotFound("x".into()).is_recoverable());
        assert!(
            RuntimeError::ReentrantAccess {
                kind: ObjectKind::List,
                id: ObjectId::new(3, 1),
            }
            .is_recoverable()
        );
    }

    #[test]
    fn messages_name_the_offending_value() {
        let err = RuntimeError::ReentrantAccess {
            kind: ObjectKind::Map,
            id: ObjectId::new(7, 0),
        };
        assert_eq!(
            err.to_string(),
            "Map #7.0 is already being accessed; nested mutation is not allowed"
        );
        assert_eq!(
            RuntimeError::arity("push", 2, 1).to_string(),
            "push expects 2 argument(s), got 1"
        );
    }
}
