use crate::util::opaque_pointer::{MethodId, ThreadId};
use crate::util::ObjectReference;
use crate::vm::VMBinding;

/// Callbacks to query the runtime's threads.
pub trait ActivePlan<VM: VMBinding> {
    /// Return the peer object of a thread (the language-level thread object), or `None` if the
    /// thread does not exist or is still starting and has no peer yet.
    fn get_thread_peer(thread_id: ThreadId) -> Option<ObjectReference>;

    /// Return the method the thread is currently executing, if it is known.
    fn get_current_method(thread_id: ThreadId) -> Option<MethodId>;
}
