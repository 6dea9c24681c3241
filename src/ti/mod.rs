//! The tooling interface: environments, callbacks and the engines that walk the heap for tools.

pub mod callbacks;
pub mod env;
pub mod error;
pub mod events;
pub mod field_visitor;
pub mod follow_references;
pub mod heap_filter;
pub mod heap_id;
pub mod iterate;
pub mod replace;
pub mod reporters;

pub use self::callbacks::*;
pub use self::env::{Capabilities, TiEnv, TiEvent};
pub use self::error::{TiError, TiResult};
pub use self::heap_filter::{
    HEAP_FILTER_CLASS_TAGGED, HEAP_FILTER_CLASS_UNTAGGED, HEAP_FILTER_TAGGED,
    HEAP_FILTER_UNTAGGED,
};
pub use self::heap_id::HeapId;
pub use self::replace::ObjectMap;
