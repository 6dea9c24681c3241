//! Reporters of primitive values: strings, primitive arrays and primitive fields.
//!
//! Each reporter does nothing if its callback is absent. The contents handed to a callback are a
//! fresh copy, so the callback may keep changing the heap. The tag the callback leaves behind is
//! written back to the tag table if it changed.

use crate::ti::callbacks::{
    HeapCallbacks, HeapReferenceKind, PrimitiveFieldCallback, VisitControl,
};
use crate::ti::field_visitor::{report_fields, FieldVisit, FieldVisitor, IndexCachingTable};
use crate::util::memory::try_alloc_buffer;
use crate::util::primitive::FieldType;
use crate::util::tag_table::{ObjectTagTable, Tag};
use crate::util::ObjectReference;
use crate::vm::{ObjectModel, VMBinding};
use std::marker::PhantomData;

/// Report the contents of a string. Does nothing for other objects.
pub fn report_string<VM: VMBinding>(
    object: ObjectReference,
    tag_table: &ObjectTagTable,
    callbacks: &mut HeapCallbacks,
    buffer_limit: usize,
) -> VisitControl {
    let Some(callback) = callbacks.string_primitive_value.as_mut() else {
        return VisitControl::NONE;
    };
    if !VM::VMObjectModel::is_string(object) {
        return VisitControl::NONE;
    }

    let length = VM::VMObjectModel::get_string_length(object);
    let data = if length > 0 {
        let Some(data) = copy_string::<VM>(object, length, buffer_limit) else {
            warn!(
                "Unable to allocate buffer for string reporting! Silently dropping value of {} ({} chars).",
                object, length
            );
            return VisitControl::NONE;
        };
        Some(data)
    } else {
        None
    };

    let class_tag = tag_table.get_tag_or_zero(VM::VMObjectModel::get_class(object));
    let mut tag = tag_table.get_tag_or_zero(object);
    let saved_tag = tag;

    let result = callback(
        class_tag,
        VM::VMObjectModel::get_current_size(object),
        &mut tag,
        data.as_deref(),
    );
    if tag != saved_tag {
        tag_table.set(object, tag);
    }
    result
}

fn copy_string<VM: VMBinding>(
    string: ObjectReference,
    length: usize,
    buffer_limit: usize,
) -> Option<Vec<u16>> {
    let mut data = try_alloc_buffer::<u16>(length, buffer_limit)?;
    if VM::VMObjectModel::is_compressed_string(string) {
        let mut compressed = try_alloc_buffer::<u8>(length, buffer_limit)?;
        VM::VMObjectModel::read_compressed_string(string, &mut compressed);
        for (wide, narrow) in data.iter_mut().zip(compressed) {
            *wide = narrow as u16;
        }
    } else {
        VM::VMObjectModel::read_utf16_string(string, &mut data);
    }
    Some(data)
}

/// Report the raw contents of a primitive array. Does nothing for other objects, including
/// reference arrays.
pub fn report_primitive_array<VM: VMBinding>(
    object: ObjectReference,
    tag_table: &ObjectTagTable,
    callbacks: &mut HeapCallbacks,
    buffer_limit: usize,
) -> VisitControl {
    let Some(callback) = callbacks.array_primitive_value.as_mut() else {
        return VisitControl::NONE;
    };
    if !VM::VMObjectModel::is_array(object) {
        return VisitControl::NONE;
    }
    let class = VM::VMObjectModel::get_class(object);
    let Some(FieldType::Primitive(element_type)) = VM::VMObjectModel::get_component_type(class)
    else {
        return VisitControl::NONE;
    };

    let length = VM::VMObjectModel::get_array_length(object);
    let data = if length > 0 {
        let Some(mut data) = length
            .checked_mul(element_type.size())
            .and_then(|bytes| try_alloc_buffer::<u8>(bytes, buffer_limit))
        else {
            warn!(
                "Unable to allocate buffer for array reporting! Silently dropping value of {}.",
                object
            );
            return VisitControl::NONE;
        };
        VM::VMObjectModel::read_primitive_array(object, &mut data);
        Some(data)
    } else {
        None
    };

    let class_tag = tag_table.get_tag_or_zero(class);
    let mut tag = tag_table.get_tag_or_zero(object);
    let saved_tag = tag;

    let result = callback(
        class_tag,
        VM::VMObjectModel::get_current_size(object),
        &mut tag,
        length,
        element_type,
        data.as_deref(),
    );
    if tag != saved_tag {
        tag_table.set(object, tag);
    }
    result
}

struct PrimitiveFieldReporter<'a, 'cb, VM: VMBinding> {
    tag_table: &'a ObjectTagTable,
    class_tag: Tag,
    callback: &'a mut PrimitiveFieldCallback<'cb>,
    phantom: PhantomData<VM>,
}

impl<VM: VMBinding> PrimitiveFieldReporter<'_, '_, VM> {
    fn report(
        &mut self,
        source: ObjectReference,
        visit: &FieldVisit<VM::VMField>,
        kind: HeapReferenceKind,
    ) -> bool {
        let value = VM::VMObjectModel::get_primitive_field(source, visit.field);
        let mut tag = self.tag_table.get_tag_or_zero(source);
        let saved_tag = tag;

        let result = (self.callback)(kind, self.class_tag, &mut tag, value, value.primitive_type());

        if tag != saved_tag {
            self.tag_table.set(source, tag);
        }
        result.should_abort()
    }
}

impl<VM: VMBinding> FieldVisitor<VM::VMField> for PrimitiveFieldReporter<'_, '_, VM> {
    fn visit_static_primitive(&mut self, visit: &FieldVisit<VM::VMField>) -> bool {
        // Statics are reported for class receivers only.
        if visit.object.is_some() {
            return false;
        }
        self.report(visit.class, visit, HeapReferenceKind::StaticField { index: visit.index })
    }

    fn visit_instance_primitive(&mut self, visit: &FieldVisit<VM::VMField>) -> bool {
        let Some(object) = visit.object else {
            return false;
        };
        self.report(object, visit, HeapReferenceKind::Field { index: visit.index })
    }
}

/// Report the primitive fields of an object: the primitive statics of a class object itself, or
/// the primitive instance fields of any other object. Returns true if the callback aborted.
pub fn report_primitive_fields<VM: VMBinding>(
    object: ObjectReference,
    tag_table: &ObjectTagTable,
    index_cache: &IndexCachingTable,
    callbacks: &mut HeapCallbacks,
) -> bool {
    let Some(callback) = callbacks.primitive_field.as_mut() else {
        return false;
    };
    let class_tag = tag_table.get_tag_or_zero(VM::VMObjectModel::get_class(object));
    let mut reporter = PrimitiveFieldReporter::<VM> {
        tag_table,
        class_tag,
        callback,
        phantom: PhantomData,
    };
    report_fields::<VM>(index_cache, object, &mut reporter)
}
