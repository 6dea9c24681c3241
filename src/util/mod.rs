//! Utilities used by other modules, including helpers for the runtime binding.

/// Raw addresses and object references.
pub mod address;
/// Logger initialization.
pub mod logger;
/// Fallible scratch buffers.
pub mod memory;
/// Pointers and identifiers heapti passes back to the runtime without interpreting them.
pub mod opaque_pointer;
/// heapti options.
pub mod options;
/// Java primitive types and values.
pub mod primitive;
/// Guards that pair the runtime's suspend/resume calls.
pub mod scoped;
/// Per-environment object tags.
pub mod tag_table;
/// Weak maps keyed by objects.
pub mod weak_table;

/// Test utilities. The mock runtime is also used by benchmarks.
#[cfg(any(test, feature = "mock_test"))]
pub mod test_util;

pub use self::address::Address;
pub use self::address::ObjectReference;
pub use self::opaque_pointer::*;
