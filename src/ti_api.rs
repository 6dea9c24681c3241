//! Runtime-to-heapti interface: one function per tool-facing operation.
//!
//! A runtime exposes these functions to tools through its own tooling interface, and is
//! responsible for turning its handles (e.g. JNI references) into [`ObjectReference`]s before
//! calling them. `tls` is always the thread that calls into heapti.
//!
//! Every function returns its errors as a [`TiError`]. Errors are returned before the heap is
//! touched, so a failed call has no effect.

use crate::heapti::{HeapTi, HeapTiBuilder};
use crate::ti::callbacks::{HeapCallbacks, HeapObjectFilter, IterationControl};
use crate::ti::env::TiEnv;
use crate::ti::error::{TiError, TiResult};
use crate::ti::heap_id::HeapId;
use crate::ti::replace::ObjectMap;
use crate::ti::{field_visitor, follow_references, heap_id, iterate, replace};
use crate::util::opaque_pointer::VMThread;
use crate::util::scoped::ScopedHeapAccess;
use crate::util::tag_table::Tag;
use crate::util::ObjectReference;
use crate::vm::{Collection, ObjectModel, Scanning, VMBinding};

/// Initialize a heapti instance.
///
/// Note that this method will attempt to initialize a logger. If the runtime would like to use its
/// own logger, it should initialize the logger before calling this method.
///
/// Arguments:
/// * `builder`: The builder holding the options of the instance.
pub fn heapti_init<VM: VMBinding>(builder: &HeapTiBuilder) -> Box<HeapTi<VM>> {
    match crate::util::logger::try_init() {
        Ok(_) => debug!("heapti initialized the logger."),
        Err(_) => debug!(
            "heapti failed to initialize the logger. Possibly a logger has been initialized by user."
        ),
    }
    let heapti = Box::new(builder.build::<VM>());
    info!("Initialized heapti with {:?}", heapti.options());
    heapti
}

/// Get the tag of an object. Untagged objects have tag 0. Requires `can_tag_objects`.
pub fn get_tag(env: &TiEnv, object: Option<ObjectReference>) -> TiResult<Tag> {
    env.require_can_tag_objects()?;
    let object = object.ok_or(TiError::InvalidObject)?;
    Ok(env.tag_table().get_tag_or_zero(object))
}

/// Set the tag of an object. Tag 0 untags the object. Requires `can_tag_objects`.
pub fn set_tag(env: &TiEnv, object: Option<ObjectReference>, tag: Tag) -> TiResult<()> {
    env.require_can_tag_objects()?;
    let object = object.ok_or(TiError::InvalidObject)?;
    env.tag_table().set(object, tag);
    Ok(())
}

/// Get the objects carrying any of `tags`, with their tags. An empty `tags` selects every tagged
/// object. Requires `can_tag_objects`. Fails with [`TiError::OutOfMemory`] if the result cannot be
/// allocated.
pub fn get_objects_with_tags(env: &TiEnv, tags: &[Tag]) -> TiResult<Vec<(ObjectReference, Tag)>> {
    env.require_can_tag_objects()?;
    if tags.contains(&0) {
        return Err(TiError::IllegalArgument);
    }
    env.tag_table()
        .get_tagged_objects(tags)
        .ok_or(TiError::OutOfMemory)
}

/// Report every instance of `class` (including instances of its subclasses and implementations)
/// whose tag passes `object_filter`.
///
/// Arguments:
/// * `class`: The class. `None` is an error.
/// * `object_filter`: Whether tagged objects, untagged objects or both are reported.
/// * `callback`: Called with (class tag, size, tag) for each object. Changes to the tag are
///   written back.
pub fn iterate_over_instances_of_class<VM: VMBinding>(
    env: &TiEnv,
    tls: VMThread,
    class: Option<ObjectReference>,
    object_filter: HeapObjectFilter,
    callback: &mut dyn FnMut(Tag, usize, &mut Tag) -> IterationControl,
) -> TiResult<()> {
    iterate::iterate_over_instances_of_class::<VM>(env, tls, class, object_filter, callback)
}

/// Report every object in the heap. See [`iterate::iterate_through_heap`].
///
/// Arguments:
/// * `heap_filter`: A combination of the `HEAP_FILTER_*` bits.
/// * `class`: If given, only instances of exactly this class are reported.
/// * `callbacks`: The callbacks. Absent callbacks are skipped.
pub fn iterate_through_heap<VM: VMBinding>(
    heapti: &HeapTi<VM>,
    env: &TiEnv,
    tls: VMThread,
    heap_filter: i32,
    class: Option<ObjectReference>,
    callbacks: &mut HeapCallbacks,
) -> TiResult<()> {
    iterate::iterate_through_heap::<VM>(
        env,
        &heapti.index_cache,
        tls,
        heap_filter,
        class,
        callbacks,
        heapti.options.report_buffer_limit,
    )
}

/// Like [`iterate_through_heap`], with the heap of each object passed to the extended heap
/// iteration callback. Requires `can_tag_objects`.
pub fn iterate_through_heap_ext<VM: VMBinding>(
    heapti: &HeapTi<VM>,
    env: &TiEnv,
    tls: VMThread,
    heap_filter: i32,
    class: Option<ObjectReference>,
    callbacks: &mut HeapCallbacks,
) -> TiResult<()> {
    iterate::iterate_through_heap_ext::<VM>(
        env,
        &heapti.index_cache,
        tls,
        heap_filter,
        class,
        callbacks,
        heapti.options.report_buffer_limit,
    )
}

/// Walk the object graph from the roots, or from `initial_object`, and report every reference
/// crossed. See [`follow_references::follow_references`].
pub fn follow_references<VM: VMBinding>(
    heapti: &HeapTi<VM>,
    env: &TiEnv,
    tls: VMThread,
    heap_filter: i32,
    class: Option<ObjectReference>,
    initial_object: Option<ObjectReference>,
    callbacks: &mut HeapCallbacks,
) -> TiResult<()> {
    follow_references::follow_references::<VM>(
        heapti,
        env,
        tls,
        heap_filter,
        class,
        initial_object,
        callbacks,
    )
}

/// Get every class that is loaded (or failed after loading).
pub fn get_loaded_classes<VM: VMBinding>(tls: VMThread) -> Vec<ObjectReference> {
    let _heap_access = ScopedHeapAccess::<VM>::new(tls);
    let mut classes = vec![];
    VM::VMScanning::visit_classes(|class| {
        if VM::VMObjectModel::is_loaded(class) {
            classes.push(class);
        }
    });
    classes
}

/// Ask the runtime to collect garbage. Soft references are not cleared.
pub fn force_garbage_collection<VM: VMBinding>(tls: VMThread) {
    VM::VMCollection::collect_garbage(tls, false);
}

/// Get the heap of the object carrying `tag`. If several objects carry the tag, any of them is
/// used. Returns [`TiError::NotFound`] if no object carries the tag.
pub fn get_object_heap_id<VM: VMBinding>(env: &TiEnv, tls: VMThread, tag: Tag) -> TiResult<HeapId> {
    let _heap_access = ScopedHeapAccess::<VM>::new(tls);
    let object = env.tag_table().find(tag).ok_or(TiError::NotFound)?;
    Ok(heap_id::get_heap_id::<VM>(object))
}

/// Get the name of a heap.
pub fn get_heap_name(heap_id: i32) -> TiResult<&'static str> {
    heap_id::get_heap_name(heap_id)
}

/// Replace an array with a resized copy. See [`replace::change_array_size`].
///
/// Arguments:
/// * `array`: The array. `None` is an error.
/// * `new_size`: The new number of elements. Negative sizes are an error.
pub fn change_array_size<VM: VMBinding>(
    heapti: &HeapTi<VM>,
    env: &TiEnv,
    tls: VMThread,
    array: Option<ObjectReference>,
    new_size: i32,
) -> TiResult<()> {
    replace::change_array_size::<VM>(heapti, env, tls, array, new_size)
}

/// Redirect every reference to a key of `map` to its value, and move tags along. See
/// [`replace::replace_references`].
pub fn replace_references<VM: VMBinding>(heapti: &HeapTi<VM>, tls: VMThread, map: &ObjectMap) {
    replace::replace_references::<VM>(heapti, tls, map)
}

/// Debug helper: log the fields of an object with the indices tools see for them. Returns the
/// logged lines.
pub fn dump_object_fields<VM: VMBinding>(
    heapti: &HeapTi<VM>,
    tls: VMThread,
    object: ObjectReference,
) -> Vec<String> {
    let _heap_access = ScopedHeapAccess::<VM>::new(tls);
    field_visitor::dump_object_fields::<VM>(&heapti.index_cache, object)
}
