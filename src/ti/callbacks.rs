//! The callback contract between heap walks and tools.

use crate::ti::heap_id::HeapId;
use crate::util::opaque_pointer::{MethodId, ThreadId};
use crate::util::primitive::{JValue, PrimitiveType};
use crate::util::tag_table::Tag;
use std::ops::BitOr;

/// Control bits returned by heap callbacks.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct VisitControl(u32);

impl VisitControl {
    /// Neither expand nor abort.
    pub const NONE: VisitControl = VisitControl(0);
    /// Expand the referree: report the references it holds. Only meaningful for reference
    /// callbacks of a reference walk.
    pub const VISIT_OBJECTS: VisitControl = VisitControl(0x100);
    /// Abort the walk.
    pub const ABORT: VisitControl = VisitControl(0x8000);

    pub const fn from_bits(bits: u32) -> Self {
        VisitControl(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: VisitControl) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn should_abort(self) -> bool {
        self.contains(Self::ABORT)
    }

    pub const fn should_visit_objects(self) -> bool {
        self.contains(Self::VISIT_OBJECTS)
    }

    /// These bits with the bits of `other` cleared.
    pub const fn without(self, other: VisitControl) -> Self {
        VisitControl(self.0 & !other.0)
    }
}

impl BitOr for VisitControl {
    type Output = VisitControl;

    fn bitor(self, rhs: Self) -> Self::Output {
        VisitControl(self.0 | rhs.0)
    }
}

/// Returned by the callback of [`crate::ti_api::iterate_over_instances_of_class`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IterationControl {
    Continue,
    Abort,
}

/// Which objects [`crate::ti_api::iterate_over_instances_of_class`] reports.
#[repr(i32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HeapObjectFilter {
    Tagged = 1,
    Untagged = 2,
    Either = 3,
}

impl HeapObjectFilter {
    pub fn accepts(self, tag: Tag) -> bool {
        match self {
            HeapObjectFilter::Tagged => tag != 0,
            HeapObjectFilter::Untagged => tag == 0,
            HeapObjectFilter::Either => true,
        }
    }
}

/// Extra information of a [`HeapReferenceKind::StackLocal`] reference.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct StackLocalInfo {
    /// The tag of the thread's peer object, or 0.
    pub thread_tag: Tag,
    pub thread_id: ThreadId,
    pub depth: u32,
    pub method: Option<MethodId>,
    /// The bytecode location in `method`, if known.
    pub location: Option<u32>,
    /// The virtual register holding the reference, if known.
    pub slot: Option<u32>,
}

/// Extra information of a [`HeapReferenceKind::JniLocal`] reference.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct JniLocalInfo {
    /// The tag of the thread's peer object, or 0.
    pub thread_tag: Tag,
    pub thread_id: ThreadId,
    pub depth: u32,
    pub method: Option<MethodId>,
}

/// The kind of a reference, with the information that comes with it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HeapReferenceKind {
    /// From an object to its class.
    Class,
    /// From an object to the value of one of its instance fields.
    Field { index: usize },
    /// From an array to one of its elements.
    ArrayElement { index: usize },
    /// From a class to its class loader.
    ClassLoader,
    /// From a class to one of its directly implemented interfaces.
    Interface,
    /// From a class to the value of one of its static fields.
    StaticField { index: usize },
    /// From a class to its superclass.
    Superclass,
    JniGlobal,
    SystemClass,
    Monitor,
    StackLocal(StackLocalInfo),
    JniLocal(JniLocalInfo),
    Thread,
    Other,
}

impl HeapReferenceKind {
    /// The numeric JVMTI reference kind.
    pub fn code(&self) -> u32 {
        match self {
            HeapReferenceKind::Class => 1,
            HeapReferenceKind::Field { .. } => 2,
            HeapReferenceKind::ArrayElement { .. } => 3,
            HeapReferenceKind::ClassLoader => 4,
            HeapReferenceKind::Interface => 7,
            HeapReferenceKind::StaticField { .. } => 8,
            HeapReferenceKind::Superclass => 10,
            HeapReferenceKind::JniGlobal => 21,
            HeapReferenceKind::SystemClass => 22,
            HeapReferenceKind::Monitor => 23,
            HeapReferenceKind::StackLocal(_) => 24,
            HeapReferenceKind::JniLocal(_) => 25,
            HeapReferenceKind::Thread => 26,
            HeapReferenceKind::Other => 27,
        }
    }

    /// Is this a reference from a root rather than from an object?
    pub fn is_root(&self) -> bool {
        self.code() > 20
    }
}

/// A reference reported to a [`HeapReferenceCallback`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct HeapReference {
    pub kind: HeapReferenceKind,
    /// The tag of the referree's class.
    pub class_tag: Tag,
    /// The tag of the referrer's class, or 0 for roots.
    pub referrer_class_tag: Tag,
    /// The size of the referree in bytes.
    pub size: usize,
    /// The number of elements if the referree is an array.
    pub length: Option<usize>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ReferrerTag {
    /// The reference is from a root.
    None,
    /// The referrer is the referree.
    Referree,
    Object(Tag),
}

/// The tags of the two ends of a reported reference. The callback may change them; the changes
/// are written back to the tag table after the callback returns.
///
/// If the referrer and the referree are the same object, both tags are the same tag: setting one
/// sets the other.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ReferenceTags {
    tag: Tag,
    referrer: ReferrerTag,
}

impl ReferenceTags {
    pub(crate) fn for_root(tag: Tag) -> Self {
        ReferenceTags {
            tag,
            referrer: ReferrerTag::None,
        }
    }

    pub(crate) fn for_self_reference(tag: Tag) -> Self {
        ReferenceTags {
            tag,
            referrer: ReferrerTag::Referree,
        }
    }

    pub(crate) fn for_object(tag: Tag, referrer_tag: Tag) -> Self {
        ReferenceTags {
            tag,
            referrer: ReferrerTag::Object(referrer_tag),
        }
    }

    /// The tag of the referree.
    pub fn tag(&self) -> Tag {
        self.tag
    }

    pub fn set_tag(&mut self, tag: Tag) {
        self.tag = tag;
    }

    /// The tag of the referrer, or `None` for roots.
    pub fn referrer_tag(&self) -> Option<Tag> {
        match self.referrer {
            ReferrerTag::None => None,
            ReferrerTag::Referree => Some(self.tag),
            ReferrerTag::Object(tag) => Some(tag),
        }
    }

    /// Set the tag of the referrer. Does nothing for roots.
    pub fn set_referrer_tag(&mut self, tag: Tag) {
        match self.referrer {
            ReferrerTag::None => {}
            ReferrerTag::Referree => self.tag = tag,
            ReferrerTag::Object(_) => self.referrer = ReferrerTag::Object(tag),
        }
    }

    pub fn is_self_reference(&self) -> bool {
        self.referrer == ReferrerTag::Referree
    }
}

/// Called for each object of a heap iteration with (class tag, size, tag, array length).
pub type HeapIterationCallback<'a> =
    Box<dyn FnMut(Tag, usize, &mut Tag, Option<usize>) -> VisitControl + 'a>;
/// Like [`HeapIterationCallback`], with the heap the object lives in.
pub type HeapIterationExtCallback<'a> =
    Box<dyn FnMut(Tag, usize, &mut Tag, Option<usize>, HeapId) -> VisitControl + 'a>;
/// Called for each reference of a reference walk.
pub type HeapReferenceCallback<'a> =
    Box<dyn FnMut(&HeapReference, &mut ReferenceTags) -> VisitControl + 'a>;
/// Called for each primitive field with (kind, class tag, tag, value, value type). The kind is
/// [`HeapReferenceKind::Field`] or [`HeapReferenceKind::StaticField`].
pub type PrimitiveFieldCallback<'a> =
    Box<dyn FnMut(HeapReferenceKind, Tag, &mut Tag, JValue, PrimitiveType) -> VisitControl + 'a>;
/// Called for each primitive array with (class tag, size, tag, element count, element type, raw
/// elements). Empty arrays have no elements.
pub type ArrayPrimitiveValueCallback<'a> = Box<
    dyn FnMut(Tag, usize, &mut Tag, usize, PrimitiveType, Option<&[u8]>) -> VisitControl + 'a,
>;
/// Called for each string with (class tag, size, tag, UTF-16 contents). Empty strings have no
/// contents.
pub type StringPrimitiveValueCallback<'a> =
    Box<dyn FnMut(Tag, usize, &mut Tag, Option<&[u16]>) -> VisitControl + 'a>;

/// The callbacks of a heap walk. Absent callbacks are not called, and the values they would
/// report are not computed.
#[derive(Default)]
pub struct HeapCallbacks<'a> {
    pub(crate) heap_iteration: Option<HeapIterationCallback<'a>>,
    pub(crate) heap_iteration_ext: Option<HeapIterationExtCallback<'a>>,
    pub(crate) heap_reference: Option<HeapReferenceCallback<'a>>,
    pub(crate) primitive_field: Option<PrimitiveFieldCallback<'a>>,
    pub(crate) array_primitive_value: Option<ArrayPrimitiveValueCallback<'a>>,
    pub(crate) string_primitive_value: Option<StringPrimitiveValueCallback<'a>>,
}

impl<'a> HeapCallbacks<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn heap_iteration<F>(mut self, f: F) -> Self
    where
        F: FnMut(Tag, usize, &mut Tag, Option<usize>) -> VisitControl + 'a,
    {
        self.heap_iteration = Some(Box::new(f));
        self
    }

    pub fn heap_iteration_ext<F>(mut self, f: F) -> Self
    where
        F: FnMut(Tag, usize, &mut Tag, Option<usize>, HeapId) -> VisitControl + 'a,
    {
        self.heap_iteration_ext = Some(Box::new(f));
        self
    }

    pub fn heap_reference<F>(mut self, f: F) -> Self
    where
        F: FnMut(&HeapReference, &mut ReferenceTags) -> VisitControl + 'a,
    {
        self.heap_reference = Some(Box::new(f));
        self
    }

    pub fn primitive_field<F>(mut self, f: F) -> Self
    where
        F: FnMut(HeapReferenceKind, Tag, &mut Tag, JValue, PrimitiveType) -> VisitControl + 'a,
    {
        self.primitive_field = Some(Box::new(f));
        self
    }

    pub fn array_primitive_value<F>(mut self, f: F) -> Self
    where
        F: FnMut(Tag, usize, &mut Tag, usize, PrimitiveType, Option<&[u8]>) -> VisitControl + 'a,
    {
        self.array_primitive_value = Some(Box::new(f));
        self
    }

    pub fn string_primitive_value<F>(mut self, f: F) -> Self
    where
        F: FnMut(Tag, usize, &mut Tag, Option<&[u16]>) -> VisitControl + 'a,
    {
        self.string_primitive_value = Some(Box::new(f));
        self
    }
}
