use libc::c_void;

/// OpaquePointer represents pointers that heapti needs to know about but will not deferefence it.
/// For example, a pointer to the thread or the thread local storage is an opaque pointer for heapti.
/// The type does not provide any method for dereferencing.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct OpaquePointer(*mut c_void);

// We never really dereference an opaque pointer in heapti.
unsafe impl Sync for OpaquePointer {}
unsafe impl Send for OpaquePointer {}

impl Default for OpaquePointer {
    fn default() -> Self {
        Self::UNINITIALIZED
    }
}

impl OpaquePointer {
    /// Represents an uninitialized value for [`OpaquePointer`].
    pub const UNINITIALIZED: Self = Self(std::ptr::null_mut());
}

/// A VMThread is an opaque pointer that can uniquely identify a thread in the runtime.
/// It is the thread that calls into heapti. heapti passes it back through the
/// runtime traits whenever the runtime needs to know which thread is asking,
/// for example to suspend every thread but the caller.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub struct VMThread(pub OpaquePointer);

impl VMThread {
    /// Represents an uninitialized value for [`VMThread`].
    pub const UNINITIALIZED: Self = Self(OpaquePointer::UNINITIALIZED);
}

/// The runtime's identifier for a thread, as reported in root information and
/// used to look up thread peers. This is not a [`VMThread`]: root information
/// refers to threads that are not calling into heapti.
pub type ThreadId = u32;

/// The runtime's identifier for a method (for example, a method pointer or a method id).
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct MethodId(pub usize);
