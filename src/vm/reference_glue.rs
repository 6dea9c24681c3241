use crate::util::ObjectReference;
use crate::vm::VMBinding;
use std::sync::Arc;

/// Answers whether an object survived (a collection, or a replacement), and where it is now.
pub trait IsMarkedVisitor {
    /// Return the current reference of `object` if it is alive, or `None` if it is dead.
    fn is_marked(&mut self, object: ObjectReference) -> Option<ObjectReference>;
}

/// This lets us use closures as IsMarkedVisitor.
impl<F: FnMut(ObjectReference) -> Option<ObjectReference>> IsMarkedVisitor for F {
    fn is_marked(&mut self, object: ObjectReference) -> Option<ObjectReference> {
        self(object)
    }
}

/// A table that holds objects weakly and needs to be swept by the runtime.
///
/// heapti's weak tables implement this trait and register themselves with
/// [`ReferenceGlue::add_system_weak_holder`].
pub trait SystemWeakHolder: Send + Sync {
    /// Update the table after objects may have moved or died.
    fn sweep(&self, visitor: &mut dyn IsMarkedVisitor);

    /// Allow readers to access the table.
    fn allow(&self);

    /// Make readers block until [`SystemWeakHolder::allow`] is called.
    fn disallow(&self);

    /// Wake up blocked readers so that they re-check whether access is allowed.
    fn broadcast(&self);
}

/// Callbacks for the runtime's weak roots.
pub trait ReferenceGlue<VM: VMBinding> {
    /// Register a system weak holder. The runtime sweeps it with every collection, and calls
    /// `allow`/`disallow`/`broadcast` when it allows or disallows access to weak references.
    fn add_system_weak_holder(holder: Arc<dyn SystemWeakHolder>);

    /// Unregister a system weak holder registered by [`ReferenceGlue::add_system_weak_holder`].
    /// Holders are compared by identity.
    fn remove_system_weak_holder(holder: &Arc<dyn SystemWeakHolder>);

    /// Sweep every system weak: the runtime's own weak roots (e.g. weak globals and interned
    /// strings) and every registered holder.
    ///
    /// Arguments:
    /// * `visitor`: Decides for each weakly held object whether it is kept, and its new reference.
    fn sweep_system_weaks(visitor: &mut dyn IsMarkedVisitor);
}
