use crate::util::opaque_pointer::VMThread;
use crate::util::ObjectReference;
use crate::vm::VMBinding;

/// Callbacks to allocate replacement arrays.
///
/// Allocation may trigger a collection, so heapti never calls these methods while mutators are
/// stopped or while it holds one of its own locks.
pub trait Allocation<VM: VMBinding> {
    /// Allocate an array of references of the given array class, with every element empty.
    /// Returns `None` if the runtime is out of memory.
    ///
    /// Arguments:
    /// * `tls`: The thread pointer of the calling thread.
    /// * `array_class`: The class of the new array.
    /// * `length`: The number of elements.
    fn alloc_object_array(
        tls: VMThread,
        array_class: ObjectReference,
        length: usize,
    ) -> Option<ObjectReference>;

    /// Allocate a primitive array of the same class as `array` with `length` elements, and copy the
    /// first `min(length, old length)` elements of `array` into it. Any remaining elements are
    /// zero. Returns `None` if the runtime is out of memory.
    fn copy_of_array(
        tls: VMThread,
        array: ObjectReference,
        length: usize,
    ) -> Option<ObjectReference>;
}
