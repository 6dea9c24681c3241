//! Iteration over every object in the heap, in no particular order.
//!
//! Iteration runs with shared access to the heap: objects neither move nor die, but mutators keep
//! running, and objects allocated during the iteration may or may not be reported.

use crate::ti::callbacks::{HeapCallbacks, HeapObjectFilter, IterationControl};
use crate::ti::env::TiEnv;
use crate::ti::error::{TiError, TiResult};
use crate::ti::field_visitor::IndexCachingTable;
use crate::ti::heap_filter::HeapFilter;
use crate::ti::heap_id::get_heap_id;
use crate::ti::reporters::{report_primitive_array, report_primitive_fields, report_string};
use crate::util::opaque_pointer::VMThread;
use crate::util::scoped::ScopedHeapAccess;
use crate::util::tag_table::Tag;
use crate::util::ObjectReference;
use crate::vm::{ObjectModel, Scanning, VMBinding};

/// Report every object whose class is `class` or a subclass (or implementation) of it, and whose
/// tag passes `object_filter`. The callback receives (class tag, size, tag).
pub fn iterate_over_instances_of_class<VM: VMBinding>(
    env: &TiEnv,
    tls: VMThread,
    class: Option<ObjectReference>,
    object_filter: HeapObjectFilter,
    callback: &mut dyn FnMut(Tag, usize, &mut Tag) -> IterationControl,
) -> TiResult<()> {
    let class = class.ok_or(TiError::NullPointer)?;
    if !VM::VMObjectModel::is_class(class) {
        return Err(TiError::InvalidClass);
    }

    let _heap_access = ScopedHeapAccess::<VM>::new(tls);
    let tag_table = env.tag_table();
    let mut aborted = false;
    VM::VMScanning::visit_objects(|object| {
        if aborted {
            return;
        }
        let object_class = VM::VMObjectModel::get_class(object);
        if !VM::VMObjectModel::is_assignable_from(class, object_class) {
            return;
        }
        let saved_tag = tag_table.get_tag_or_zero(object);
        if !object_filter.accepts(saved_tag) {
            return;
        }

        let class_tag = tag_table.get_tag_or_zero(object_class);
        let mut tag = saved_tag;
        let control = callback(class_tag, VM::VMObjectModel::get_current_size(object), &mut tag);
        if tag != saved_tag {
            tag_table.set(object, tag);
        }
        aborted = control == IterationControl::Abort;
    });
    Ok(())
}

/// Report every object that passes `heap_filter` and, if `class` is given, whose class is exactly
/// `class`.
///
/// For each object, the heap iteration callback is called first, then the string, primitive array
/// and primitive field reporters. An abort from any of them ends the iteration.
pub fn iterate_through_heap<VM: VMBinding>(
    env: &TiEnv,
    index_cache: &IndexCachingTable,
    tls: VMThread,
    heap_filter: i32,
    class: Option<ObjectReference>,
    callbacks: &mut HeapCallbacks,
    buffer_limit: usize,
) -> TiResult<()> {
    do_iterate_through_heap::<VM>(
        env,
        index_cache,
        tls,
        heap_filter,
        class,
        callbacks,
        buffer_limit,
        false,
    )
}

/// Like [`iterate_through_heap`], but calls the extended heap iteration callback, which also
/// receives the heap each object lives in. Requires `can_tag_objects`.
pub fn iterate_through_heap_ext<VM: VMBinding>(
    env: &TiEnv,
    index_cache: &IndexCachingTable,
    tls: VMThread,
    heap_filter: i32,
    class: Option<ObjectReference>,
    callbacks: &mut HeapCallbacks,
    buffer_limit: usize,
) -> TiResult<()> {
    env.require_can_tag_objects()?;
    do_iterate_through_heap::<VM>(
        env,
        index_cache,
        tls,
        heap_filter,
        class,
        callbacks,
        buffer_limit,
        true,
    )
}

#[allow(clippy::too_many_arguments)]
fn do_iterate_through_heap<VM: VMBinding>(
    env: &TiEnv,
    index_cache: &IndexCachingTable,
    tls: VMThread,
    heap_filter: i32,
    class: Option<ObjectReference>,
    callbacks: &mut HeapCallbacks,
    buffer_limit: usize,
    ext: bool,
) -> TiResult<()> {
    if let Some(class) = class {
        if !VM::VMObjectModel::is_class(class) {
            return Err(TiError::InvalidClass);
        }
    }
    let heap_filter = HeapFilter::new(heap_filter);

    let _heap_access = ScopedHeapAccess::<VM>::new(tls);
    let tag_table = env.tag_table();
    let mut stop_reports = false;
    VM::VMScanning::visit_objects(|object| {
        if stop_reports {
            return;
        }

        let object_class = VM::VMObjectModel::get_class(object);
        let saved_tag = tag_table.get_tag_or_zero(object);
        let class_tag = tag_table.get_tag_or_zero(object_class);
        if !heap_filter.should_report_by_heap_filter(saved_tag, class_tag) {
            return;
        }
        if class.is_some_and(|class| class != object_class) {
            return;
        }

        let size = VM::VMObjectModel::get_current_size(object);
        let length = if VM::VMObjectModel::is_array(object) {
            Some(VM::VMObjectModel::get_array_length(object))
        } else {
            None
        };

        let mut tag = saved_tag;
        let control = if ext {
            let heap_id = get_heap_id::<VM>(object);
            callbacks
                .heap_iteration_ext
                .as_mut()
                .map(|callback| callback(class_tag, size, &mut tag, length, heap_id))
        } else {
            callbacks
                .heap_iteration
                .as_mut()
                .map(|callback| callback(class_tag, size, &mut tag, length))
        };
        if let Some(control) = control {
            if tag != saved_tag {
                tag_table.set(object, tag);
            }
            stop_reports = control.should_abort();
        }

        if !stop_reports {
            stop_reports =
                report_string::<VM>(object, tag_table, callbacks, buffer_limit).should_abort();
        }
        if !stop_reports {
            stop_reports = report_primitive_array::<VM>(object, tag_table, callbacks, buffer_limit)
                .should_abort();
        }
        if !stop_reports {
            stop_reports = report_primitive_fields::<VM>(object, tag_table, index_cache, callbacks);
        }
    });
    Ok(())
}

