use crate::util::opaque_pointer::{ThreadId, VMThread};
use crate::util::ObjectReference;
use crate::vm::VMBinding;

/// Callbacks to control the runtime's threads and its collector.
///
/// heapti never calls these methods in an unbalanced way: every `stop`/`acquire`/`enter`/
/// `increment`/`suspend` call is matched by the opposite call on the same thread, in reverse order,
/// on every exit path. See [`crate::util::scoped`] for the guards that pair them.
pub trait Collection<VM: VMBinding> {
    /// Stop all mutator threads other than the current one. This method blocks until all of them
    /// are stopped at a point where their roots can be enumerated and rewritten.
    ///
    /// Arguments:
    /// * `tls`: The thread pointer of the calling thread.
    fn stop_all_mutators(tls: VMThread);

    /// Resume the mutators stopped by [`Collection::stop_all_mutators`].
    ///
    /// Arguments:
    /// * `tls`: The thread pointer of the calling thread.
    fn resume_mutators(tls: VMThread);

    /// Acquire shared access to the heap. While any thread holds shared access, objects are neither
    /// moved nor freed, but mutators keep running.
    ///
    /// Arguments:
    /// * `tls`: The thread pointer of the calling thread.
    fn acquire_heap_shared(tls: VMThread);

    /// Release shared access acquired by [`Collection::acquire_heap_shared`].
    fn release_heap_shared(tls: VMThread);

    /// Is the current collector concurrent and moving? If so, heapti disables moving collection
    /// around operations that stop the world, so that no object is in the middle of being moved.
    fn is_gc_concurrent_and_moving() -> bool {
        false
    }

    /// Increment the counter of reasons why the collector must not move objects. Blocks until any
    /// collection in progress finishes.
    fn increment_disable_moving_gc(_tls: VMThread) {}

    /// Decrement the counter incremented by [`Collection::increment_disable_moving_gc`].
    fn decrement_disable_moving_gc(_tls: VMThread) {}

    /// Enter a section in which no collection may start.
    ///
    /// Arguments:
    /// * `tls`: The thread pointer of the calling thread.
    /// * `cause`: What the section is for, for logging.
    fn enter_gc_critical_section(tls: VMThread, cause: &'static str);

    /// Leave the section entered by [`Collection::enter_gc_critical_section`].
    fn exit_gc_critical_section(tls: VMThread);

    /// Suspend every thread that may be running user code on behalf of a tool (e.g. event
    /// callbacks), except the current one.
    fn suspend_user_code(tls: VMThread);

    /// Resume the threads suspended by [`Collection::suspend_user_code`].
    fn resume_user_code(tls: VMThread);

    /// The write barrier the runtime requires after a reference slot of `object` was written to
    /// outside of compiled code.
    fn write_barrier(object: ObjectReference);

    /// Make a thread discard any optimized frames that may hold stale copies of rewritten roots.
    /// The thread is stopped.
    fn instrument_thread_stack(thread_id: ThreadId);

    /// Perform a collection.
    ///
    /// Arguments:
    /// * `tls`: The thread pointer of the calling thread.
    /// * `clear_soft_references`: Whether softly reachable objects may be collected.
    fn collect_garbage(tls: VMThread, clear_soft_references: bool);
}
