use crate::runtime::gc::heap_object::TrackedObject;

/// One registry slot. `object` is `None` while the slot sits on the free list
/// or has been retired.
pub(crate) struct HeapEntry {
    pub(crate) object: Option<TrackedObject>,
    pub(crate) generation: u32,
}

impl HeapEntry {
    pub(crate) fn vacant() -> Self {
        Self {
            object: None,
            generation: 0,
        }
    }

    pub(crate) fn is_live(&self) -> bool {
        self.object.as_ref().is_some_and(TrackedObject::is_alive)
    }

    /// Occupied by an object that has already been destroyed.
    pub(crate) fn is_dead(&self) -> bool {
        self.object.as_ref().is_some_and(|object| !object.is_alive())
    }
}
