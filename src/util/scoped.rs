//! Guards that pair the runtime's suspend/resume style calls in [`crate::vm::Collection`].
//!
//! Each guard calls the "enter" half when it is created and the "exit" half when it is dropped, so
//! that the runtime is restored on every exit path, including early returns with `?`.

use crate::util::opaque_pointer::VMThread;
use crate::vm::{Collection, VMBinding};
use std::marker::PhantomData;

/// Shared access to the heap: objects are neither moved nor freed, mutators keep running.
pub struct ScopedHeapAccess<VM: VMBinding> {
    tls: VMThread,
    phantom: PhantomData<VM>,
}

impl<VM: VMBinding> ScopedHeapAccess<VM> {
    pub fn new(tls: VMThread) -> Self {
        VM::VMCollection::acquire_heap_shared(tls);
        Self {
            tls,
            phantom: PhantomData,
        }
    }
}

impl<VM: VMBinding> Drop for ScopedHeapAccess<VM> {
    fn drop(&mut self) {
        VM::VMCollection::release_heap_shared(self.tls);
    }
}

/// All mutators other than the current thread are stopped.
pub struct ScopedSuspendAll<VM: VMBinding> {
    tls: VMThread,
    phantom: PhantomData<VM>,
}

impl<VM: VMBinding> ScopedSuspendAll<VM> {
    pub fn new(tls: VMThread) -> Self {
        trace!("Stopping all mutators");
        VM::VMCollection::stop_all_mutators(tls);
        Self {
            tls,
            phantom: PhantomData,
        }
    }
}

impl<VM: VMBinding> Drop for ScopedSuspendAll<VM> {
    fn drop(&mut self) {
        VM::VMCollection::resume_mutators(self.tls);
        trace!("Resumed all mutators");
    }
}

/// No collection may start.
pub struct ScopedGcCriticalSection<VM: VMBinding> {
    tls: VMThread,
    phantom: PhantomData<VM>,
}

impl<VM: VMBinding> ScopedGcCriticalSection<VM> {
    pub fn new(tls: VMThread, cause: &'static str) -> Self {
        VM::VMCollection::enter_gc_critical_section(tls, cause);
        Self {
            tls,
            phantom: PhantomData,
        }
    }
}

impl<VM: VMBinding> Drop for ScopedGcCriticalSection<VM> {
    fn drop(&mut self) {
        VM::VMCollection::exit_gc_critical_section(self.tls);
    }
}

/// The collector does not move objects. Only takes effect if the collector is concurrent and
/// moving; otherwise the guard does nothing.
pub struct ScopedDisableMovingGc<VM: VMBinding> {
    tls: VMThread,
    active: bool,
    phantom: PhantomData<VM>,
}

impl<VM: VMBinding> ScopedDisableMovingGc<VM> {
    pub fn new_if_concurrent_moving(tls: VMThread) -> Self {
        let active = VM::VMCollection::is_gc_concurrent_and_moving();
        if active {
            VM::VMCollection::increment_disable_moving_gc(tls);
        }
        Self {
            tls,
            active,
            phantom: PhantomData,
        }
    }
}

impl<VM: VMBinding> Drop for ScopedDisableMovingGc<VM> {
    fn drop(&mut self) {
        if self.active {
            VM::VMCollection::decrement_disable_moving_gc(self.tls);
        }
    }
}

/// No thread other than the current one runs user code.
pub struct ScopedNoUserCodeSuspension<VM: VMBinding> {
    tls: VMThread,
    phantom: PhantomData<VM>,
}

impl<VM: VMBinding> ScopedNoUserCodeSuspension<VM> {
    pub fn new(tls: VMThread) -> Self {
        VM::VMCollection::suspend_user_code(tls);
        Self {
            tls,
            phantom: PhantomData,
        }
    }
}

impl<VM: VMBinding> Drop for ScopedNoUserCodeSuspension<VM> {
    fn drop(&mut self) {
        VM::VMCollection::resume_user_code(self.tls);
    }
}
