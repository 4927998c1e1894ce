use std::{collections::BTreeMap, fmt};

use log::trace;

use crate::runtime::{error::RuntimeError, value::Value};

/// Identity of an asynchronous task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub enum TaskState {
    Pending,
    /// Completed; the result stays a collection root until taken.
    Ready(Value),
}

/// Tasks that have been spawned and not yet consumed.
#[derive(Debug, Default)]
pub struct TaskTable {
    tasks: BTreeMap<TaskId, TaskState>,
    next_id: u64,
}

impl TaskTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn(&mut self) -> TaskId {
        self.next_id += 1;
        let id = TaskId(self.next_id);
        self.tasks.insert(id, TaskState::Pending);
        trace!("spawned task {}", id);
        id
    }

    pub fn complete(&mut self, id: TaskId, result: Value) -> Result<(), RuntimeError> {
        let state = self
            .tasks
            .get_mut(&id)
            .ok_or(RuntimeError::UnknownTask(id))?;
        *state = TaskState::Ready(result);
        trace!("task {} completed", id);
        Ok(())
    }

    /// Delivers a completed task's result and forgets the task.
    ///
    /// Returns `Ok(None)` while the task is still pending.
    pub fn take_result(&mut self, id: TaskId) -> Result<Option<Value>, RuntimeError> {
        match self.tasks.get(&id) {
            None => Err(RuntimeError::UnknownTask(id)),
            Some(TaskState::Pending) => Ok(None),
            Some(TaskState::Ready(_)) => match self.tasks.remove(&id) {
                Some(TaskState::Ready(value)) => Ok(Some(value)),
                _ => Ok(None),
            },
        }
    }

    /// Drops a task whether pending or ready, releasing any stored result.
    pub fn cancel_root(&mut self, id: TaskId) -> Result<(), RuntimeError> {
        self.tasks
            .remove(&id)
            .map(|_| ())
            .ok_or(RuntimeError::UnknownTask(id))
    }

    pub fn state(&self, id: TaskId) -> Option<&TaskState> {
        self.tasks.get(&id)
    }

    /// Results that have been delivered to the table but not yet taken.
    pub fn roots(&self) -> impl Iterator<Item = &Value> {
        self.tasks.values().filter_map(|state| match state {
            TaskState::Ready(value) => Some(value),
            TaskState::Pending => None,
        })
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
