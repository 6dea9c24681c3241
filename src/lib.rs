//! heapti is a heap traversal and object tagging engine for the tooling interfaces of managed
//! runtimes.
//!
//! A runtime implements the traits in [`vm`] for a binding type, creates one [`HeapTi`] instance
//! with [`ti_api::heapti_init`], and exposes the functions in [`ti_api`] to tools. Tools attach
//! by creating environments ([`ti::TiEnv`]), tag objects, iterate over the heap, follow references
//! from the roots, and replace objects.
//!
//! heapti does not know the layout of objects. Every question about the heap is answered by the
//! runtime through the [`vm`] traits.

#[macro_use]
extern crate log;
#[cfg(any(test, feature = "mock_test"))]
#[macro_use]
extern crate lazy_static;

mod heapti;
pub use heapti::HeapTi;
pub use heapti::HeapTiBuilder;

pub mod ti;
pub mod ti_api;
pub mod util;
pub mod vm;
