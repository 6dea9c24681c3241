//! Replacement of objects: every reference to an old object, strong or weak, is redirected to its
//! replacement. Array resizing is built on it.

use crate::heapti::HeapTi;
use crate::ti::env::TiEnv;
use crate::ti::error::{TiError, TiResult};
use crate::ti::events::EventHandler;
use crate::util::opaque_pointer::{ThreadId, VMThread};
use crate::util::primitive::FieldType;
use crate::util::scoped::{ScopedGcCriticalSection, ScopedNoUserCodeSuspension, ScopedSuspendAll};
use crate::util::tag_table::Tag;
use crate::util::ObjectReference;
use crate::vm::{
    Allocation, Collection, ObjectModel, ReferenceGlue, RootInfo, RootType, Scanning, SlotKind,
    VMBinding, VRegSlot,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Old objects mapped to their replacements.
pub type ObjectMap = HashMap<ObjectReference, ObjectReference>;

/// Replace every reference to a key of `map` with the corresponding value, and move the tags of the
/// old objects to the new ones (see [`crate::ti::env::TiEnv::set_obsolete_object_created_callback`]).
///
/// Stops every mutator for the duration of the replacement.
pub fn replace_references<VM: VMBinding>(heapti: &HeapTi<VM>, tls: VMThread, map: &ObjectMap) {
    if map.is_empty() {
        return;
    }
    let _exclusive = heapti.lock_exclusive();
    let _critical = ScopedGcCriticalSection::<VM>::new(tls, "replace references");
    let _suspend_all = ScopedSuspendAll::<VM>::new(tls);
    replace_references_paused::<VM>(&heapti.event_handler, map);
}

/// Replace references with every mutator stopped. Replacement happens in three phases: references
/// held by objects, strong roots, and weak references including tags.
pub(crate) fn replace_references_paused<VM: VMBinding>(
    event_handler: &EventHandler,
    map: &ObjectMap,
) {
    let rewritten_slots = replace_object_references::<VM>(map);
    let instrumented_threads = replace_strong_roots::<VM>(map);
    replace_weak_roots::<VM>(event_handler, map);
    debug!(
        "Replaced {} objects: {} slots rewritten, {} thread stacks instrumented",
        map.len(),
        rewritten_slots,
        instrumented_threads
    );
}

fn replace_object_references<VM: VMBinding>(map: &ObjectMap) -> usize {
    let mut rewritten = 0;
    VM::VMScanning::visit_objects_paused(|object| {
        let is_class = VM::VMObjectModel::is_class(object);
        let mut tracer = |holder: ObjectReference,
                          slot: SlotKind<VM::VMField>,
                          target: ObjectReference|
         -> ObjectReference {
            match slot {
                // Objects keep their class, which knows their size.
                SlotKind::ClassPointer => return target,
                // The class hierarchy is left alone.
                SlotKind::SuperClass if is_class => return target,
                _ => {}
            }
            match map.get(&target) {
                Some(&replacement) => {
                    trace!("Rewrite {:?} of {}: {} -> {}", slot, holder, target, replacement);
                    VM::VMCollection::write_barrier(holder);
                    rewritten += 1;
                    replacement
                }
                None => target,
            }
        };
        // The native roots of classes belong to their fields and methods, and stay as they are.
        VM::VMScanning::scan_object_and_trace_slots(object, !is_class, &mut tracer);
    });
    rewritten
}

fn replace_strong_roots<VM: VMBinding>(map: &ObjectMap) -> usize {
    let mut threads_with_java_frame_roots: BTreeSet<ThreadId> = BTreeSet::new();
    let mut tracer = |root: ObjectReference, info: &RootInfo| -> ObjectReference {
        let Some(&replacement) = map.get(&root) else {
            return root;
        };
        if info.root_type == RootType::JavaFrame {
            if info
                .frame
                .is_some_and(|frame| frame.vreg == VRegSlot::MethodDeclaringClass)
            {
                debug!("Not changing declaring class of frame {:?}: {}", info, root);
                return root;
            }
            if let Some(thread_id) = info.thread_id {
                threads_with_java_frame_roots.insert(thread_id);
            }
        }
        replacement
    };
    VM::VMScanning::visit_roots(&mut tracer);

    // Frames may hold copies of the rewritten roots that the root visit cannot reach.
    for &thread_id in threads_with_java_frame_roots.iter() {
        trace!("Instrumenting stack of thread {}", thread_id);
        VM::VMCollection::instrument_thread_stack(thread_id);
    }
    threads_with_java_frame_roots.len()
}

struct NewTagValue {
    obsolete_object: ObjectReference,
    obsolete_tag: Tag,
    new_object: ObjectReference,
    new_tag: Tag,
}

fn replace_weak_roots<VM: VMBinding>(event_handler: &EventHandler, map: &ObjectMap) {
    // Tags of both the old and the new objects are taken out of the tables before the other weak
    // references are swept, and put back afterwards, so that the sweep cannot overwrite them.
    let mut changed_tags: Vec<(Arc<TiEnv>, Vec<NewTagValue>)> = vec![];
    for env in event_handler.envs() {
        let removed: Vec<(ObjectReference, Option<Tag>, ObjectReference, Option<Tag>)> = {
            let mut table = env.tag_table().lock();
            map.iter()
                .map(|(&old, &new)| (old, table.remove(old), new, table.remove(new)))
                .collect()
        };

        let mut values = vec![];
        for (obsolete_object, obsolete_tag, new_object, new_tag) in removed {
            if obsolete_tag.is_none() && new_tag.is_none() {
                continue;
            }
            let mut obsolete_tag = obsolete_tag.unwrap_or(0);
            let mut new_tag = new_tag.unwrap_or(0);
            event_handler.dispatch_obsolete_object_created(&env, &mut obsolete_tag, &mut new_tag);
            values.push(NewTagValue {
                obsolete_object,
                obsolete_tag,
                new_object,
                new_tag,
            });
        }
        if !values.is_empty() {
            changed_tags.push((env, values));
        }
    }

    let mut is_marked = |object: ObjectReference| -> Option<ObjectReference> {
        Some(map.get(&object).copied().unwrap_or(object))
    };
    VM::VMReferenceGlue::sweep_system_weaks(&mut is_marked);

    for (env, values) in changed_tags {
        let mut table = env.tag_table().lock();
        for value in values {
            table.set(value.obsolete_object, value.obsolete_tag);
            table.set(value.new_object, value.new_tag);
        }
    }
}

/// Replace an array with a copy of `new_size` elements. The first `min(old length, new_size)`
/// elements are copied, and the remaining elements are zero or null. Every reference to the old
/// array, and its tags and lock word, move to the new array.
pub fn change_array_size<VM: VMBinding>(
    heapti: &HeapTi<VM>,
    env: &TiEnv,
    tls: VMThread,
    array: Option<ObjectReference>,
    new_size: i32,
) -> TiResult<()> {
    env.require_can_tag_objects()?;
    let _no_user_code = ScopedNoUserCodeSuspension::<VM>::new(tls);

    let Some(old_array) = array else {
        info!("Cannot resize a null object");
        return Err(TiError::NullPointer);
    };
    let array_class = VM::VMObjectModel::get_class(old_array);
    let Some(component_type) = VM::VMObjectModel::get_component_type(array_class) else {
        info!(
            "{} is not an array class!",
            VM::VMObjectModel::get_class_name(array_class)
        );
        return Err(TiError::IllegalArgument);
    };
    let Ok(new_length) = usize::try_from(new_size) else {
        info!("Cannot resize an array to a negative size");
        return Err(TiError::IllegalArgument);
    };

    // The allocation may collect, so it happens before anything is suspended.
    let new_array = match component_type {
        FieldType::Reference => VM::VMAllocation::alloc_object_array(tls, array_class, new_length),
        FieldType::Primitive(_) => VM::VMAllocation::copy_of_array(tls, old_array, new_length),
    };
    let Some(new_array) = new_array else {
        info!(
            "Unable to allocate {} (length: {})",
            VM::VMObjectModel::get_class_name(array_class),
            new_length
        );
        return Err(TiError::OutOfMemory);
    };

    let _exclusive = heapti.lock_exclusive();
    let _critical = ScopedGcCriticalSection::<VM>::new(tls, "resize array");
    let _suspend_all = ScopedSuspendAll::<VM>::new(tls);

    VM::VMObjectModel::set_lock_word(new_array, VM::VMObjectModel::get_lock_word(old_array));
    VM::VMObjectModel::set_lock_word(old_array, VM::VMObjectModel::DEFAULT_LOCK_WORD);

    // Copy again, now that nothing can change the old array any more.
    let copied = VM::VMObjectModel::get_array_length(old_array).min(new_length);
    match component_type {
        FieldType::Reference => {
            for i in 0..copied {
                let element = VM::VMObjectModel::get_array_element(old_array, i);
                VM::VMObjectModel::set_array_element(new_array, i, element);
            }
            if copied > 0 {
                VM::VMCollection::write_barrier(new_array);
            }
        }
        FieldType::Primitive(_) => {
            for i in 0..copied {
                let value = VM::VMObjectModel::get_primitive_array_element(old_array, i);
                VM::VMObjectModel::set_primitive_array_element(new_array, i, value);
            }
        }
    }

    let mut map = ObjectMap::new();
    map.insert(old_array, new_array);
    replace_references_paused::<VM>(&heapti.event_handler, &map);
    Ok(())
}
