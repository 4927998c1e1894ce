//! Owning and weak handles to composite runtime values.
//!
//! A [`Handle`] keeps its referent alive; a [`WeakHandle`] does not and must be
//! upgraded before use. Interior state is reached through a scoped access
//! token: [`Handle::borrow_mut`] grants one active writer and refuses a second
//! one with [`RuntimeError::ReentrantAccess`] instead of panicking.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::rc::{Rc, Weak};

use crate::runtime::{
    error::RuntimeError,
    gc::{ObjectId, telemetry::ObjectKind},
    leak_detector::Ledger,
};

pub(crate) struct Slot<T> {
    id: ObjectId,
    kind: ObjectKind,
    size: usize,
    ledger: Rc<Ledger>,
    state: RefCell<T>,
}

impl<T> Drop for Slot<T> {
    fn drop(&mut self) {
        self.ledger.record_release(self.kind, self.size);
    }
}

/// Estimated bytes for a slot wrapping `T`, excluding owned heap buffers.
pub(crate) fn slot_size<T>() -> usize {
    // strong + weak counters precede the slot in the Rc allocation
    std::mem::size_of::<Slot<T>>() + 2 * std::mem::size_of::<usize>()
}

/// Owning handle. Cloning increments the live count; dropping the last clone
/// destroys the referent and releases every handle it held.
pub struct Handle<T> {
    slot: Rc<Slot<T>>,
}

impl<T> Handle<T> {
    pub(crate) fn new(
        id: ObjectId,
        kind: ObjectKind,
        size: usize,
        ledger: Rc<Ledger>,
        state: T,
    ) -> Self {
        Self {
            slot: Rc::new(Slot {
                id,
                kind,
                size,
                ledger,
                state: RefCell::new(state),
            }),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.slot.id
    }

    pub fn kind(&self) -> ObjectKind {
        self.slot.kind
    }

    pub(crate) fn size(&self) -> usize {
        self.slot.size
    }

    /// Number of outstanding owning handles, this one included.
    pub fn live_count(&self) -> usize {
        Rc::strong_count(&self.slot)
    }

    pub fn downgrade(&self) -> WeakHandle<T> {
        WeakHandle {
            slot: Rc::downgrade(&self.slot),
            id: self.slot.id,
            kind: self.slot.kind,
        }
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.slot, &other.slot)
    }

    /// Shared read access. Fails while an exclusive token is held.
    pub fn borrow(&self) -> Result<Ref<'_, T>, RuntimeError> {
        self.slot
            .state
            .try_borrow()
            .map_err(|_| self.reentrant())
    }

    /// Acquires the exclusive-access token for this value.
    ///
    /// The token must be released before any call that can reach this value
    /// again; a nested request fails with `ReentrantAccess`.
    pub fn borrow_mut(&self) -> Result<AccessGuard<'_, T>, RuntimeError> {
        self.slot
            .state
            .try_borrow_mut()
            .map(|inner| AccessGuard { inner })
            .map_err(|_| self.reentrant())
    }

    /// Returns `true` while any access (shared or exclusive) is outstanding.
    pub fn is_held(&self) -> bool {
        self.slot.state.try_borrow_mut().is_err()
    }

    fn reentrant(&self) -> RuntimeError {
        RuntimeError::ReentrantAccess {
            kind: self.slot.kind,
            id: self.slot.id,
        }
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({} {})", self.slot.kind, self.slot.id)
    }
}

/// Exclusive-access token. Released when dropped.
pub struct AccessGuard<'a, T> {
    inner: RefMut<'a, T>,
}

impl<T> Deref for AccessGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T> DerefMut for AccessGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner
    }
}

/// Non-owning handle. Contributes nothing to the live count.
pub struct WeakHandle<T> {
    slot: Weak<Slot<T>>,
    id: ObjectId,
    kind: ObjectKind,
}

impl<T> WeakHandle<T> {
    /// Resolves to a temporary owning handle, or `None` once the referent is gone.
    pub fn upgrade(&self) -> Option<Handle<T>> {
        self.slot.upgrade().map(|slot| Handle { slot })
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn live_count(&self) -> usize {
        self.slot.strong_count()
    }

    pub fn is_dangling(&self) -> bool {
        self.slot.strong_count() == 0
    }

    pub fn points_to(&self, handle: &Handle<T>) -> bool {
        std::ptr::eq(self.slot.as_ptr(), Rc::as_ptr(&handle.slot))
    }
}

impl<T> Clone for WeakHandle<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Weak::clone(&self.slot),
            id: self.id,
            kind: self.kind,
        }
    }
}

impl<T> fmt::Debug for WeakHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakHandle({} {})", self.kind, self.id)
    }
}
