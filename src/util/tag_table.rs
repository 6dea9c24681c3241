use crate::util::memory::try_with_capacity;
use crate::util::weak_table::{WeakTable, WeakTableGuard};
use crate::util::ObjectReference;
use crate::vm::{IsMarkedVisitor, SystemWeakHolder};
use std::sync::Arc;

/// A tag is an opaque value a tool attaches to an object. Zero means "no tag".
pub type Tag = i64;

/// Called with the tag of a tagged object that has been collected.
pub type ObjectFreeHook = Arc<dyn Fn(Tag) + Send + Sync>;

/// The tags of one environment.
///
/// An object has an entry iff a non-zero tag was set for it, it was not untagged since, and it has
/// not been collected. The table is swept by the collector like any other system weak: tags follow
/// their objects when the objects move, and the tags of dead objects are dropped. If an object-free
/// hook is installed, it is invoked with the tag of every dropped entry after the sweep has released
/// the table.
///
/// All operations on the table are serialized by one lock. The lock is a leaf lock: no other lock
/// is acquired and no tool code is run while it is held.
pub struct ObjectTagTable {
    table: WeakTable<Tag>,
    object_free_hook: spin::RwLock<Option<ObjectFreeHook>>,
}

impl Default for ObjectTagTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectTagTable {
    pub fn new() -> Self {
        Self {
            table: WeakTable::new(),
            object_free_hook: spin::RwLock::new(None),
        }
    }

    /// Get the tag of an object, or `None` if it is untagged.
    pub fn get_tag(&self, object: ObjectReference) -> Option<Tag> {
        self.table.get(object)
    }

    /// Get the tag of an object, or 0 if it is untagged.
    pub fn get_tag_or_zero(&self, object: ObjectReference) -> Tag {
        self.get_tag(object).unwrap_or(0)
    }

    /// Tag an object. A zero tag removes the entry. Returns true if an existing entry was updated or
    /// removed.
    pub fn set(&self, object: ObjectReference, tag: Tag) -> bool {
        self.lock().set(object, tag)
    }

    pub fn remove(&self, object: ObjectReference) -> Option<Tag> {
        self.table.remove(object)
    }

    /// Find an object with the given tag. If several objects carry the tag, any of them may be
    /// returned.
    pub fn find(&self, tag: Tag) -> Option<ObjectReference> {
        if tag == 0 {
            return None;
        }
        self.lock().find(tag)
    }

    /// Get all objects whose tag is in `tags`, or all tagged objects if `tags` is empty. Returns
    /// `None` if the result cannot be allocated.
    pub fn get_tagged_objects(&self, tags: &[Tag]) -> Option<Vec<(ObjectReference, Tag)>> {
        let guard = self.lock();
        let selected = |tag: &Tag| tags.is_empty() || tags.contains(tag);
        let count = guard.inner.iter().filter(|(_, tag)| selected(tag)).count();
        let mut objects = try_with_capacity(count)?;
        objects.extend(
            guard
                .inner
                .iter()
                .filter(|(_, tag)| selected(tag))
                .map(|(object, tag)| (*object, *tag)),
        );
        Some(objects)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Lock the table for a sequence of operations.
    pub fn lock(&self) -> TagTableGuard<'_> {
        TagTableGuard {
            inner: self.table.lock(),
        }
    }

    pub fn set_object_free_hook(&self, hook: Option<ObjectFreeHook>) {
        *self.object_free_hook.write() = hook;
    }
}

impl SystemWeakHolder for ObjectTagTable {
    fn sweep(&self, visitor: &mut dyn IsMarkedVisitor) {
        let dead = self.table.sweep_entries(visitor);
        if dead.is_empty() {
            return;
        }
        let hook = self.object_free_hook.read().clone();
        if let Some(hook) = hook {
            for (_, tag) in dead {
                hook(tag);
            }
        }
    }

    fn allow(&self) {
        self.table.allow_weak_access();
    }

    fn disallow(&self) {
        self.table.disallow_weak_access();
    }

    fn broadcast(&self) {
        self.table.broadcast_weak_access();
    }
}

/// A locked [`ObjectTagTable`].
pub struct TagTableGuard<'a> {
    inner: WeakTableGuard<'a, Tag>,
}

impl TagTableGuard<'_> {
    pub fn get_tag(&self, object: ObjectReference) -> Option<Tag> {
        self.inner.get(object)
    }

    /// See [`ObjectTagTable::set`].
    pub fn set(&mut self, object: ObjectReference, tag: Tag) -> bool {
        if tag == 0 {
            self.inner.remove(object).is_some()
        } else {
            self.inner.set(object, tag)
        }
    }

    pub fn remove(&mut self, object: ObjectReference) -> Option<Tag> {
        self.inner.remove(object)
    }

    pub fn find(&self, tag: Tag) -> Option<ObjectReference> {
        self.inner.find(|t| *t == tag)
    }
}
