//! A map keyed by object identity that does not keep its keys alive.

use crate::util::ObjectReference;
use crate::vm::{IsMarkedVisitor, SystemWeakHolder};
use std::collections::hash_map::Iter;
use std::collections::HashMap;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// A weak map from objects to values.
///
/// The table does not keep its keys alive. It is registered with the runtime as a system weak
/// holder (see [`crate::vm::ReferenceGlue::add_system_weak_holder`]), and each sweep keeps the
/// entries of unmoved objects, re-keys the entries of moved objects and drops the entries of dead
/// objects.
///
/// A concurrent collector may disallow weak access while it is processing references. Readers and
/// writers then block until the collector allows weak access again. Sweeping never blocks.
pub struct WeakTable<T> {
    state: Mutex<WeakTableState<T>>,
    allow_cond: Condvar,
}

struct WeakTableState<T> {
    map: HashMap<ObjectReference, T>,
    allow_weak_access: bool,
}

impl<T: Copy> Default for WeakTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy> WeakTable<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(WeakTableState {
                map: HashMap::new(),
                allow_weak_access: true,
            }),
            allow_cond: Condvar::new(),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, WeakTableState<T>> {
        // The table is consistent after every single map operation, so a poisoned lock can be used.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the table for a sequence of operations. Blocks while weak access is disallowed.
    pub fn lock(&self) -> WeakTableGuard<'_, T> {
        let mut state = self.lock_state();
        while !state.allow_weak_access {
            state = self
                .allow_cond
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        WeakTableGuard { state }
    }

    pub fn get(&self, object: ObjectReference) -> Option<T> {
        self.lock().get(object)
    }

    /// Insert or update the entry for `object`. Returns true if an entry was updated.
    pub fn set(&self, object: ObjectReference, value: T) -> bool {
        self.lock().set(object, value)
    }

    pub fn remove(&self, object: ObjectReference) -> Option<T> {
        self.lock().remove(object)
    }

    pub fn len(&self) -> usize {
        self.lock_state().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sweep the table: keep entries of unmoved objects, re-key entries of moved objects, and remove
    /// entries of dead objects. Returns the removed entries.
    pub fn sweep_entries(&self, visitor: &mut dyn IsMarkedVisitor) -> Vec<(ObjectReference, T)> {
        let mut state = self.lock_state();
        let mut dead = vec![];
        let mut moved = vec![];
        state.map.retain(|&object, value| match visitor.is_marked(object) {
            None => {
                dead.push((object, *value));
                false
            }
            Some(new_object) if new_object != object => {
                moved.push((new_object, *value));
                false
            }
            Some(_) => true,
        });
        for (new_object, value) in moved {
            state.map.insert(new_object, value);
        }
        if !dead.is_empty() {
            trace!("Swept {} dead entries from a weak table", dead.len());
        }
        dead
    }

    pub fn allow_weak_access(&self) {
        let mut state = self.lock_state();
        state.allow_weak_access = true;
        self.allow_cond.notify_all();
    }

    pub fn disallow_weak_access(&self) {
        self.lock_state().allow_weak_access = false;
    }

    pub fn broadcast_weak_access(&self) {
        let _state = self.lock_state();
        self.allow_cond.notify_all();
    }
}

impl<T: Copy + Send> SystemWeakHolder for WeakTable<T> {
    fn sweep(&self, visitor: &mut dyn IsMarkedVisitor) {
        self.sweep_entries(visitor);
    }

    fn allow(&self) {
        self.allow_weak_access();
    }

    fn disallow(&self) {
        self.disallow_weak_access();
    }

    fn broadcast(&self) {
        self.broadcast_weak_access();
    }
}

/// A locked [`WeakTable`]. The table stays locked until the guard is dropped.
pub struct WeakTableGuard<'a, T> {
    state: MutexGuard<'a, WeakTableState<T>>,
}

impl<T: Copy> WeakTableGuard<'_, T> {
    pub fn get(&self, object: ObjectReference) -> Option<T> {
        self.state.map.get(&object).copied()
    }

    pub fn set(&mut self, object: ObjectReference, value: T) -> bool {
        self.state.map.insert(object, value).is_some()
    }

    pub fn remove(&mut self, object: ObjectReference) -> Option<T> {
        self.state.map.remove(&object)
    }

    pub fn iter(&self) -> Iter<'_, ObjectReference, T> {
        self.state.map.iter()
    }

    /// Find any object whose value satisfies `pred`.
    pub fn find<P: FnMut(&T) -> bool>(&self, mut pred: P) -> Option<ObjectReference> {
        self.state
            .map
            .iter()
            .find(|(_, value)| pred(value))
            .map(|(object, _)| *object)
    }
}
