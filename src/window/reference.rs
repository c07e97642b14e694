//! # Shared Window State and Reference Counting
//!
//! Every [`RowWindow`](super::RowWindow) handle points at one `WindowShared`,
//! which owns the storage and an atomic reference count. The storage is taken
//! out and dropped exactly once, by whichever release brings the count to
//! zero, no matter which holder or thread performs it.
//!
//! ## Protocol
//!
//! 1. Building a window sets the count to 1 (the creating holder's reference).
//! 2. `acquire` increments; it panics if the count is already zero, since the
//!    storage is gone and the caller has a lifecycle bug.
//! 3. `release` decrements; the transition 1 -> 0 frees the storage, returns
//!    the capacity to the budget, informs the registry and runs the release
//!    callbacks. Releasing at zero panics for the same reason as above.
//!
//! [`ReferenceGuard`] wraps steps 2 and 3 so that every window operation holds
//! a reference for exactly its own duration, including early returns and `?`.
//!
//! ## Locking
//!
//! The storage sits behind a `parking_lot::RwLock`: reads share it, the
//! allocate/put/clear operations take it exclusively. The count itself is
//! lock-free.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;

use super::registry::WindowRegistry;
use super::storage::WindowStorage;
use super::WindowId;
use crate::memory::WindowBudget;

pub(crate) type ReleaseCallback = Box<dyn FnOnce(WindowId) + Send>;

pub(crate) struct WindowShared {
    pub(crate) id: WindowId,
    pub(crate) name: String,
    pub(crate) capacity: usize,
    refs: AtomicUsize,
    pub(crate) storage: RwLock<Option<WindowStorage>>,
    callbacks: Mutex<SmallVec<[ReleaseCallback; 2]>>,
    budget: Arc<WindowBudget>,
    registry: Arc<dyn WindowRegistry>,
}

impl std::fmt::Debug for WindowShared {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowShared")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("capacity", &self.capacity)
            .field("refs", &self.refs.load(Ordering::Acquire))
            .finish()
    }
}

impl WindowShared {
    pub(crate) fn new(
        id: WindowId,
        name: String,
        storage: WindowStorage,
        budget: Arc<WindowBudget>,
        registry: Arc<dyn WindowRegistry>,
    ) -> Self {
        Self {
            id,
            name,
            capacity: storage.capacity(),
            refs: AtomicUsize::new(1),
            storage: RwLock::new(Some(storage)),
            callbacks: Mutex::new(SmallVec::new()),
            budget,
            registry,
        }
    }

    pub(crate) fn reference_count(&self) -> usize {
        self.refs.load(Ordering::Acquire)
    }

    pub(crate) fn is_released(&self) -> bool {
        self.reference_count() == 0
    }

    /// Increments the count unless it is already zero.
    pub(crate) fn try_acquire(&self) -> bool {
        self.refs
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                if n == 0 {
                    None
                } else {
                    Some(n + 1)
                }
            })
            .is_ok()
    }

    pub(crate) fn acquire(&self) {
        if !self.try_acquire() {
            panic!(
                "attempt to acquire a reference to window '{}' ({}) after its storage was released",
                self.name, self.id
            );
        }
    }

    /// Returns `true` if this call released the storage.
    pub(crate) fn try_release(&self) -> bool {
        let prev = match self
            .refs
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        {
            Ok(prev) => prev,
            Err(_) => return false,
        };
        if prev == 1 {
            self.on_all_references_released();
            return true;
        }
        false
    }

    pub(crate) fn release(&self) {
        let prev = self
            .refs
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        match prev {
            Ok(1) => self.on_all_references_released(),
            Ok(_) => {}
            Err(_) => panic!(
                "release of window '{}' ({}) which holds no references",
                self.name, self.id
            ),
        }
    }

    pub(crate) fn guard(&self) -> ReferenceGuard<'_> {
        self.acquire();
        ReferenceGuard { shared: self }
    }

    pub(crate) fn on_released(&self, callback: ReleaseCallback) {
        let mut callbacks = self.callbacks.lock();
        if self.is_released() {
            drop(callbacks);
            callback(self.id);
            return;
        }
        callbacks.push(callback);
    }

    fn on_all_references_released(&self) {
        let storage = self.storage.write().take();
        drop(storage);

        self.budget.release(self.capacity);
        self.registry.window_released(self.id);
        log::debug!("released window '{}' ({})", self.name, self.id);

        let callbacks: SmallVec<[ReleaseCallback; 2]> =
            std::mem::take(&mut *self.callbacks.lock());
        for callback in callbacks {
            callback(self.id);
        }
    }
}

/// Holds one reference for its lifetime.
#[must_use = "the reference is released as soon as the guard is dropped"]
pub struct ReferenceGuard<'a> {
    shared: &'a WindowShared,
}

impl std::fmt::Debug for ReferenceGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReferenceGuard")
            .field("window", &self.shared.id)
            .finish()
    }
}

impl Drop for ReferenceGuard<'_> {
    fn drop(&mut self) {
        self.shared.release();
    }
}
