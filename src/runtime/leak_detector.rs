//! Allocation ledger and the leak-verification helpers built on it.
//!
//! Every heap slot carries a shared [`Ledger`] and reports itself released
//! when its last owning handle goes away, so live counts are exact without
//! walking the registry.

use std::cell::Cell;

use crate::runtime::{gc::telemetry::ObjectKind, handle::Handle, handle::WeakHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeakStats {
    pub lists: usize,
    pub maps: usize,
    pub closures: usize,
    pub environments: usize,
    pub live_bytes: usize,
    pub total_allocated: usize,
    pub total_released: usize,
}

impl LeakStats {
    pub fn live_objects(&self) -> usize {
        self.lists + self.maps + self.closures + self.environments
    }
}

#[derive(Debug, Default)]
pub struct Ledger {
    live_bytes: Cell<usize>,
    allocated: [Cell<usize>; 4],
    released: [Cell<usize>; 4],
}

impl Ledger {
    pub(crate) fn record_alloc(&self, kind: ObjectKind, size: usize) {
        let slot = &self.allocated[kind as usize];
        slot.set(slot.get() + 1);
        self.live_bytes.set(self.live_bytes.get() + size);
    }

    pub(crate) fn record_release(&self, kind: ObjectKind, size: usize) {
        let slot = &self.released[kind as usize];
        slot.set(slot.get() + 1);
        self.live_bytes.set(self.live_bytes.get().saturating_sub(size));
    }

    pub fn live(&self, kind: ObjectKind) -> usize {
        let idx = kind as usize;
        self.allocated[idx].get() - self.released[idx].get()
    }

    pub fn live_objects(&self) -> usize {
        ObjectKind::ALL.iter().map(|kind| self.live(*kind)).sum()
    }

    pub fn live_bytes(&self) -> usize {
        self.live_bytes.get()
    }

    pub fn snapshot(&self) -> LeakStats {
        LeakStats {
            lists: self.live(ObjectKind::List),
            maps: self.live(ObjectKind::Map),
            closures: self.live(ObjectKind::Closure),
            environments: self.live(ObjectKind::Environment),
            live_bytes: self.live_bytes(),
            total_allocated: self.allocated.iter().map(Cell::get).sum(),
            total_released: self.released.iter().map(Cell::get).sum(),
        }
    }
}

/// Number of owning handles currently keeping `handle`'s referent alive,
/// including `handle` itself.
pub fn live_count<T>(handle: &Handle<T>) -> usize {
    handle.live_count()
}

/// Owning handles still alive for a weakly observed value; zero once reclaimed.
pub fn observed_live_count<T>(weak: &WeakHandle<T>) -> usize {
    weak.live_count()
}

/// Returns `true` when every observed value has been destroyed.
pub fn all_reclaimed<T>(observed: &[WeakHandle<T>]) -> bool {
    observed.iter().all(WeakHandle::is_dangling)
}
