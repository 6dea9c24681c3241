//! heapti-to-runtime interface: the traits a runtime implements so that heapti can inspect its heap.
//!
//! A runtime defines one type (usually a zero-sized struct) that implements [`VMBinding`], and uses
//! the associated types of [`VMBinding`] to point at its implementation of each trait. heapti never
//! dereferences objects itself: every question about an object, a class or a root is answered by
//! the runtime through these traits.
//!
//! heapti calls into the runtime with locks released, except where a trait method says otherwise,
//! so the runtime may call back into heapti (for example, to sweep a weak table) from any method.

mod active_plan;
mod allocation;
mod collection;
mod object_model;
mod reference_glue;
mod scanning;
pub use self::active_plan::ActivePlan;
pub use self::allocation::Allocation;
pub use self::collection::Collection;
pub use self::object_model::ObjectModel;
pub use self::object_model::SpaceKind;
pub use self::reference_glue::IsMarkedVisitor;
pub use self::reference_glue::ReferenceGlue;
pub use self::reference_glue::SystemWeakHolder;
pub use self::scanning::JavaFrameInfo;
pub use self::scanning::RootInfo;
pub use self::scanning::RootTracer;
pub use self::scanning::RootType;
pub use self::scanning::Scanning;
pub use self::scanning::SlotKind;
pub use self::scanning::SlotTracer;
pub use self::scanning::VRegSlot;

use std::fmt::Debug;
use std::hash::Hash;


/// The `VMBinding` trait associates with each trait, and provides runtime-specific types.
pub trait VMBinding
where
    Self: Sized + 'static + Send + Sync + Default,
{
    type VMObjectModel: ObjectModel<Self>;
    type VMScanning: Scanning<Self>;
    type VMCollection: Collection<Self>;
    type VMActivePlan: ActivePlan<Self>;
    type VMReferenceGlue: ReferenceGlue<Self>;
    type VMAllocation: Allocation<Self>;

    /// The runtime's handle of a field. A field handle identifies one declared field of one class,
    /// static or not. heapti only compares, hashes and passes field handles back to the runtime.
    type VMField: Copy + Eq + Hash + Debug + Send + Sync;
}
