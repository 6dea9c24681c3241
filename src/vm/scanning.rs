use crate::util::opaque_pointer::{MethodId, ThreadId};
use crate::util::ObjectReference;
use crate::vm::VMBinding;
use enum_map::Enum;
use strum_macros::{Display, EnumIter};

/// The kind of a root, as the runtime classifies it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Enum, Display, EnumIter)]
pub enum RootType {
    JniGlobal,
    JniLocal,
    JavaFrame,
    NativeStack,
    StickyClass,
    ThreadBlock,
    MonitorUsed,
    ThreadObject,
    InternedString,
    Finalizing,
    Debugger,
    ReferenceCleanup,
    VMInternal,
    JniMonitor,
    Unknown,
}

/// The virtual register a java frame root is held in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum VRegSlot {
    /// A virtual register of the frame.
    Register(u32),
    /// The declaring class of the frame's method, kept alive by the frame.
    MethodDeclaringClass,
    /// The root is held by the frame, but not in any particular register.
    Unknown,
}

/// Where in a java frame a root was found.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct JavaFrameInfo {
    pub vreg: VRegSlot,
    /// The bytecode location in the frame's method, if known.
    pub dex_pc: Option<u32>,
    /// The depth of the frame on its thread's stack. 0 is the top frame.
    pub depth: u32,
    pub method: Option<MethodId>,
}

/// Information about a root, passed along with the root to a [`RootTracer`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct RootInfo {
    pub root_type: RootType,
    /// The thread that holds the root, for thread-local roots.
    pub thread_id: Option<ThreadId>,
    /// Present iff `root_type` is [`RootType::JavaFrame`].
    pub frame: Option<JavaFrameInfo>,
}

impl RootInfo {
    pub fn new(root_type: RootType) -> Self {
        RootInfo {
            root_type,
            thread_id: None,
            frame: None,
        }
    }

    pub fn with_thread(root_type: RootType, thread_id: ThreadId) -> Self {
        RootInfo {
            root_type,
            thread_id: Some(thread_id),
            frame: None,
        }
    }

    pub fn java_frame(thread_id: ThreadId, frame: JavaFrameInfo) -> Self {
        RootInfo {
            root_type: RootType::JavaFrame,
            thread_id: Some(thread_id),
            frame: Some(frame),
        }
    }
}

/// Callback trait of root enumeration.
pub trait RootTracer {
    /// Call this function for each root, and assign the returned value back to the root.
    fn trace_root(&mut self, root: ObjectReference, info: &RootInfo) -> ObjectReference;
}

/// This lets us use closures as RootTracer.
impl<F: FnMut(ObjectReference, &RootInfo) -> ObjectReference> RootTracer for F {
    fn trace_root(&mut self, root: ObjectReference, info: &RootInfo) -> ObjectReference {
        self(root, info)
    }
}

/// A reference slot of an object.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SlotKind<F> {
    /// The class pointer in the object header.
    ClassPointer,
    /// The superclass slot of a class object.
    SuperClass,
    /// An instance field of an object.
    InstanceField(F),
    /// A static field of a class object.
    StaticField(F),
    /// An element of a reference array.
    ArrayElement(usize),
    /// A reference held by the runtime's native data attached to a class object (e.g. the
    /// class loader or the dex cache).
    NativeRoot,
}

/// Callback trait of scanning functions that directly trace through the reference slots of an
/// object.
pub trait SlotTracer<VM: VMBinding> {
    /// Call this function for each non-empty reference slot of `holder`, and assign the returned
    /// value back to the slot.
    fn trace_slot(
        &mut self,
        holder: ObjectReference,
        slot: SlotKind<VM::VMField>,
        target: ObjectReference,
    ) -> ObjectReference;
}

/// This lets us use closures as SlotTracer.
impl<VM, F> SlotTracer<VM> for F
where
    VM: VMBinding,
    F: FnMut(ObjectReference, SlotKind<VM::VMField>, ObjectReference) -> ObjectReference,
{
    fn trace_slot(
        &mut self,
        holder: ObjectReference,
        slot: SlotKind<VM::VMField>,
        target: ObjectReference,
    ) -> ObjectReference {
        self(holder, slot, target)
    }
}

/// Callbacks to enumerate heap objects, roots and reference slots.
pub trait Scanning<VM: VMBinding> {
    /// Visit every object in the heap once. The caller holds shared access to the heap
    /// (see [`crate::vm::Collection::acquire_heap_shared`]), so no object is moved or freed during
    /// the visit. Objects allocated during the visit may or may not be visited.
    ///
    /// Arguments:
    /// * `visitor`: Called back for each object.
    fn visit_objects<F: FnMut(ObjectReference)>(visitor: F);

    /// Visit every object in the heap once, while all mutators are stopped.
    ///
    /// Arguments:
    /// * `visitor`: Called back for each object.
    fn visit_objects_paused<F: FnMut(ObjectReference)>(visitor: F) {
        Self::visit_objects(visitor)
    }

    /// Visit every root: thread roots, global roots and roots held by image spaces. All mutators
    /// are stopped.
    ///
    /// Arguments:
    /// * `tracer`: Called back for each root. The returned value is written back to the root.
    fn visit_roots<RT: RootTracer>(tracer: &mut RT);

    /// Visit every class known to the runtime's class linker.
    ///
    /// Arguments:
    /// * `visitor`: Called back for each class.
    fn visit_classes<F: FnMut(ObjectReference)>(visitor: F);

    /// Visit every non-empty reference slot of an object. All mutators are stopped.
    ///
    /// Arguments:
    /// * `object`: The object to be scanned.
    /// * `visit_native_roots`: Whether references held by the runtime's native data of a class
    ///   object are visited as [`SlotKind::NativeRoot`].
    /// * `tracer`: Called back for each slot. The returned value is written back to the slot.
    fn scan_object_and_trace_slots<ST: SlotTracer<VM>>(
        object: ObjectReference,
        visit_native_roots: bool,
        tracer: &mut ST,
    );
}
