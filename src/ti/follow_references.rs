//! The reference walker: a breadth-first walk of the object graph from the roots (or from one
//! object), reporting every reference it crosses.
//!
//! Each object is expanded at most once per walk. The references of an object are reported in a
//! fixed order:
//! * a class reports its superclass, its direct interfaces, its class loader, its reference
//!   statics and then its primitive statics;
//! * an array reports its class, and then either its non-null elements or its primitive contents;
//! * any other object reports its reference instance fields (the class pointer field as a class
//!   reference), then its string contents and its primitive instance fields.
//!
//! The walk runs with every mutator stopped.

use crate::heapti::HeapTi;
use crate::ti::callbacks::{
    HeapCallbacks, HeapReference, HeapReferenceKind, JniLocalInfo, ReferenceTags, StackLocalInfo,
    VisitControl,
};
use crate::ti::env::TiEnv;
use crate::ti::error::{TiError, TiResult};
use crate::ti::field_visitor::{report_fields, FieldVisit, FieldVisitor, IndexCachingTable};
use crate::ti::heap_filter::HeapFilter;
use crate::ti::reporters::{report_primitive_array, report_primitive_fields, report_string};
use crate::util::opaque_pointer::VMThread;
use crate::util::scoped::{ScopedDisableMovingGc, ScopedSuspendAll};
use crate::util::tag_table::{ObjectTagTable, Tag};
use crate::util::ObjectReference;
use crate::vm::{ActivePlan, ObjectModel, RootInfo, RootType, Scanning, VMBinding, VRegSlot};
use std::collections::HashSet;
use std::marker::PhantomData;

/// Walk the object graph and report references to `callbacks`.
///
/// Arguments:
/// * `heap_filter`: A combination of the `HEAP_FILTER_*` bits. References to filtered objects are
///   not reported, but the objects are still expanded.
/// * `class`: If given, only objects of exactly this class are expanded.
/// * `initial_object`: If given, the walk starts from this object instead of from the roots, and
///   no root is reported.
pub fn follow_references<VM: VMBinding>(
    heapti: &HeapTi<VM>,
    env: &TiEnv,
    tls: VMThread,
    heap_filter: i32,
    class: Option<ObjectReference>,
    initial_object: Option<ObjectReference>,
    callbacks: &mut HeapCallbacks,
) -> TiResult<()> {
    if let Some(class) = class {
        if !VM::VMObjectModel::is_class(class) {
            return Err(TiError::InvalidClass);
        }
    }

    let _exclusive = heapti.lock_exclusive();
    let _no_moving = ScopedDisableMovingGc::<VM>::new_if_concurrent_moving(tls);
    let _suspend_all = ScopedSuspendAll::<VM>::new(tls);

    let mut helper = FollowReferencesHelper::<VM>::new(
        env.tag_table(),
        &heapti.index_cache,
        callbacks,
        HeapFilter::new(heap_filter),
        class,
        heapti.options.report_buffer_limit,
        heapti.options.worklist_compaction_threshold,
    );
    helper.init(initial_object);
    helper.work();
    debug!(
        "Followed references: {} objects expanded{}",
        helper.visited.len(),
        if helper.stop_reports { ", aborted" } else { "" }
    );
    Ok(())
}

pub(crate) struct FollowReferencesHelper<'a, 'cb, VM: VMBinding> {
    tag_table: &'a ObjectTagTable,
    index_cache: &'a IndexCachingTable,
    callbacks: &'a mut HeapCallbacks<'cb>,
    heap_filter: HeapFilter,
    class_filter: Option<ObjectReference>,
    buffer_limit: usize,
    compaction_threshold: usize,

    /// Objects waiting to be expanded. Entries before `start` are consumed.
    worklist: Vec<ObjectReference>,
    start: usize,
    /// Objects ever added to the worklist.
    visited: HashSet<ObjectReference>,
    stop_reports: bool,
    phantom: PhantomData<VM>,
}

impl<'a, 'cb, VM: VMBinding> FollowReferencesHelper<'a, 'cb, VM> {
    pub(crate) fn new(
        tag_table: &'a ObjectTagTable,
        index_cache: &'a IndexCachingTable,
        callbacks: &'a mut HeapCallbacks<'cb>,
        heap_filter: HeapFilter,
        class_filter: Option<ObjectReference>,
        buffer_limit: usize,
        compaction_threshold: usize,
    ) -> Self {
        FollowReferencesHelper {
            tag_table,
            index_cache,
            callbacks,
            heap_filter,
            class_filter,
            buffer_limit,
            compaction_threshold,
            worklist: vec![],
            start: 0,
            visited: HashSet::new(),
            stop_reports: false,
            phantom: PhantomData,
        }
    }

    pub(crate) fn init(&mut self, initial_object: Option<ObjectReference>) {
        match initial_object {
            None => {
                let mut tracer = |root: ObjectReference, info: &RootInfo| {
                    if !self.stop_reports {
                        let kind = self.root_reference_kind(info);
                        self.stop_reports =
                            !self.report_reference_maybe_enqueue(kind, None, Some(root));
                    }
                    root
                };
                VM::VMScanning::visit_roots(&mut tracer);
            }
            Some(object) => {
                self.visited.insert(object);
                self.worklist.push(object);
            }
        }
    }

    pub(crate) fn work(&mut self) {
        while self.start < self.worklist.len() && !self.stop_reports {
            let object = self.worklist[self.start];
            self.start += 1;
            if self.start >= self.compaction_threshold {
                self.worklist.drain(..self.start);
                self.start = 0;
            }
            self.visit_object(object);
        }
    }

    fn visit_object(&mut self, object: ObjectReference) {
        if VM::VMObjectModel::is_class(object) {
            self.visit_class(object);
        } else if VM::VMObjectModel::is_array(object) {
            self.visit_array(object);
        } else {
            self.visit_instance(object);
        }
    }

    fn visit_class(&mut self, class: ObjectReference) {
        if !VM::VMObjectModel::is_resolved(class) {
            return;
        }

        if !self.report_reference_maybe_enqueue(
            HeapReferenceKind::Superclass,
            Some(class),
            VM::VMObjectModel::get_super_class(class),
        ) {
            self.stop_reports = true;
            return;
        }

        for i in 0..VM::VMObjectModel::num_direct_interfaces(class) {
            let interface = VM::VMObjectModel::get_direct_interface(class, i);
            let kind = HeapReferenceKind::Interface;
            if !self.report_reference_maybe_enqueue(kind, Some(class), interface) {
                self.stop_reports = true;
                return;
            }
        }

        if !self.report_reference_maybe_enqueue(
            HeapReferenceKind::ClassLoader,
            Some(class),
            VM::VMObjectModel::get_class_loader(class),
        ) {
            self.stop_reports = true;
            return;
        }

        if self.report_reference_fields(class) {
            self.stop_reports = true;
            return;
        }

        self.stop_reports =
            report_primitive_fields::<VM>(class, self.tag_table, self.index_cache, self.callbacks);
    }

    fn visit_array(&mut self, array: ObjectReference) {
        if !self.report_reference_maybe_enqueue(
            HeapReferenceKind::Class,
            Some(array),
            Some(VM::VMObjectModel::get_class(array)),
        ) {
            self.stop_reports = true;
            return;
        }

        let array_class = VM::VMObjectModel::get_class(array);
        if VM::VMObjectModel::get_component_type(array_class).is_some_and(|t| t.is_primitive()) {
            let result = report_primitive_array::<VM>(
                array,
                self.tag_table,
                self.callbacks,
                self.buffer_limit,
            );
            self.stop_reports = result.should_abort();
            return;
        }

        for index in 0..VM::VMObjectModel::get_array_length(array) {
            let element = VM::VMObjectModel::get_array_element(array, index);
            if !self.report_reference_maybe_enqueue(
                HeapReferenceKind::ArrayElement { index },
                Some(array),
                element,
            ) {
                self.stop_reports = true;
                return;
            }
        }
    }

    fn visit_instance(&mut self, object: ObjectReference) {
        if self.report_reference_fields(object) {
            self.stop_reports = true;
            return;
        }

        let result = report_string::<VM>(object, self.tag_table, self.callbacks, self.buffer_limit);
        if result.should_abort() {
            self.stop_reports = true;
            return;
        }

        self.stop_reports =
            report_primitive_fields::<VM>(object, self.tag_table, self.index_cache, self.callbacks);
    }

    /// Report the reference statics of a class object, or the reference instance fields of any
    /// other object. Returns true if the walk was aborted.
    fn report_reference_fields(&mut self, object: ObjectReference) -> bool {
        let index_cache = self.index_cache;
        let mut reporter = ReferenceFieldReporter {
            helper: self,
            reported_class: false,
        };
        if report_fields::<VM>(index_cache, object, &mut reporter) {
            return true;
        }
        // Runtimes that do not expose the class pointer as a field still report the class.
        if !reporter.reported_class && !VM::VMObjectModel::is_class(object) {
            let class = VM::VMObjectModel::get_class(object);
            return !self.report_reference_maybe_enqueue(
                HeapReferenceKind::Class,
                Some(object),
                Some(class),
            );
        }
        false
    }

    fn root_reference_kind(&self, info: &RootInfo) -> HeapReferenceKind {
        let thread_id = info.thread_id.unwrap_or(0);
        match info.root_type {
            RootType::JniGlobal => HeapReferenceKind::JniGlobal,
            RootType::JniLocal => HeapReferenceKind::JniLocal(JniLocalInfo {
                thread_tag: self.thread_tag(info),
                thread_id,
                depth: 0,
                method: info
                    .thread_id
                    .and_then(VM::VMActivePlan::get_current_method),
            }),
            RootType::JavaFrame => {
                let frame = info.frame;
                HeapReferenceKind::StackLocal(StackLocalInfo {
                    thread_tag: self.thread_tag(info),
                    thread_id,
                    depth: frame.map_or(0, |f| f.depth),
                    method: frame.and_then(|f| f.method),
                    location: frame.and_then(|f| f.dex_pc),
                    slot: match frame.map(|f| f.vreg) {
                        Some(VRegSlot::Register(vreg)) => Some(vreg),
                        _ => None,
                    },
                })
            }
            RootType::NativeStack | RootType::ThreadBlock | RootType::ThreadObject => {
                HeapReferenceKind::Thread
            }
            RootType::StickyClass | RootType::InternedString => HeapReferenceKind::SystemClass,
            RootType::MonitorUsed | RootType::JniMonitor => HeapReferenceKind::Monitor,
            RootType::Finalizing
            | RootType::Debugger
            | RootType::ReferenceCleanup
            | RootType::VMInternal
            | RootType::Unknown => HeapReferenceKind::Other,
        }
    }

    /// The tag of the peer object of the thread holding a root. 0 if the thread has no peer yet.
    fn thread_tag(&self, info: &RootInfo) -> Tag {
        info.thread_id
            .and_then(VM::VMActivePlan::get_thread_peer)
            .map_or(0, |peer| self.tag_table.get_tag_or_zero(peer))
    }

    /// Report a reference and enqueue the referree if asked to. Null referrees are skipped. Returns
    /// false if the walk is to be aborted.
    fn report_reference_maybe_enqueue(
        &mut self,
        kind: HeapReferenceKind,
        referrer: Option<ObjectReference>,
        referree: Option<ObjectReference>,
    ) -> bool {
        let Some(referree) = referree else {
            return true;
        };
        let result = self.report_reference(kind, referrer, referree);
        if result.should_abort() {
            return false;
        }
        if result.should_visit_objects() && self.passes_class_filter(referree) {
            self.maybe_enqueue(referree);
        }
        true
    }

    /// Only objects of exactly the filter class are expanded, whether or not their reference was
    /// reported.
    fn passes_class_filter(&self, object: ObjectReference) -> bool {
        self.class_filter
            .map_or(true, |class| class == VM::VMObjectModel::get_class(object))
    }

    fn maybe_enqueue(&mut self, object: ObjectReference) {
        if self.visited.insert(object) {
            self.worklist.push(object);
        }
    }

    fn report_reference(
        &mut self,
        kind: HeapReferenceKind,
        referrer: Option<ObjectReference>,
        referree: ObjectReference,
    ) -> VisitControl {
        if self.stop_reports {
            return VisitControl::NONE;
        }

        let referree_class = VM::VMObjectModel::get_class(referree);
        let class_tag = self.tag_table.get_tag_or_zero(referree_class);
        let saved_tag = self.tag_table.get_tag_or_zero(referree);
        if !self.heap_filter.should_report_by_heap_filter(saved_tag, class_tag) {
            return VisitControl::VISIT_OBJECTS;
        }
        let Some(callback) = self.callbacks.heap_reference.as_mut() else {
            return VisitControl::VISIT_OBJECTS;
        };

        let reference = HeapReference {
            kind,
            class_tag,
            referrer_class_tag: referrer.map_or(0, |referrer| {
                self.tag_table
                    .get_tag_or_zero(VM::VMObjectModel::get_class(referrer))
            }),
            size: VM::VMObjectModel::get_current_size(referree),
            length: if VM::VMObjectModel::is_array(referree) {
                Some(VM::VMObjectModel::get_array_length(referree))
            } else {
                None
            },
        };
        let mut tags = match referrer {
            None => ReferenceTags::for_root(saved_tag),
            Some(referrer) if referrer == referree => ReferenceTags::for_self_reference(saved_tag),
            Some(referrer) => {
                ReferenceTags::for_object(saved_tag, self.tag_table.get_tag_or_zero(referrer))
            }
        };
        let saved_referrer_tag = tags.referrer_tag();

        let result = callback(&reference, &mut tags);

        if tags.tag() != saved_tag {
            self.tag_table.set(referree, tags.tag());
        }
        if let Some(referrer) = referrer {
            if !tags.is_self_reference() && tags.referrer_tag() != saved_referrer_tag {
                self.tag_table.set(referrer, tags.referrer_tag().unwrap_or(0));
            }
        }

        result
    }
}

/// Reports reference fields for [`FollowReferencesHelper::report_reference_fields`].
struct ReferenceFieldReporter<'h, 'a, 'cb, VM: VMBinding> {
    helper: &'h mut FollowReferencesHelper<'a, 'cb, VM>,
    reported_class: bool,
}

impl<VM: VMBinding> FieldVisitor<VM::VMField> for ReferenceFieldReporter<'_, '_, '_, VM> {
    fn visit_static_reference(&mut self, visit: &FieldVisit<VM::VMField>) -> bool {
        if visit.object.is_some() {
            return false;
        }
        let value = VM::VMObjectModel::get_reference_field(visit.class, visit.field);
        !self.helper.report_reference_maybe_enqueue(
            HeapReferenceKind::StaticField { index: visit.index },
            Some(visit.class),
            value,
        )
    }

    fn visit_instance_reference(&mut self, visit: &FieldVisit<VM::VMField>) -> bool {
        let Some(object) = visit.object else {
            return false;
        };
        let value = VM::VMObjectModel::get_reference_field(object, visit.field);
        let kind = if VM::VMObjectModel::is_class_pointer_field(visit.field) {
            self.reported_class = true;
            HeapReferenceKind::Class
        } else {
            HeapReferenceKind::Field { index: visit.index }
        };
        !self
            .helper
            .report_reference_maybe_enqueue(kind, Some(object), value)
    }
}
