//! Enumeration of the fields of an object, with the field indices tools see.
//!
//! Field indices count every field an object has, in this order:
//! 1. the static fields of every interface the class implements, directly or through its
//!    superclasses and superinterfaces (each interface once);
//! 2. for each class from the root class down to the object's class, the class's own static
//!    fields followed by its own instance fields.
//!
//! The number of interface fields of a class is cached in an [`IndexCachingTable`].

use crate::util::weak_table::WeakTable;
use crate::util::ObjectReference;
use crate::vm::{IsMarkedVisitor, ObjectModel, SystemWeakHolder, VMBinding};
use std::collections::HashSet;

/// A field being visited.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FieldVisit<F> {
    /// The object whose field is visited, or `None` if the receiver is a class object and the
    /// field is one of its static fields.
    pub object: Option<ObjectReference>,
    /// The class declaring the field.
    pub class: ObjectReference,
    pub field: F,
    pub index: usize,
}

/// Visitor of the fields of an object. Each method returns true to abort the visit.
pub trait FieldVisitor<F> {
    fn visit_static_primitive(&mut self, _visit: &FieldVisit<F>) -> bool {
        false
    }
    fn visit_static_reference(&mut self, _visit: &FieldVisit<F>) -> bool {
        false
    }
    fn visit_instance_primitive(&mut self, _visit: &FieldVisit<F>) -> bool {
        false
    }
    fn visit_instance_reference(&mut self, _visit: &FieldVisit<F>) -> bool {
        false
    }
}

/// Visit the fields of `object`. Returns true if a visitor aborted the visit.
///
/// If `object` is a class object, only the static fields declared by the class itself are
/// visited, and the fields of its superclasses only advance the index. Unresolved classes are
/// skipped. Otherwise the fields of every class from the root class down to the object's class
/// are visited.
pub fn report_fields<VM: VMBinding>(
    index_cache: &IndexCachingTable,
    object: ObjectReference,
    visitor: &mut dyn FieldVisitor<VM::VMField>,
) -> bool {
    if VM::VMObjectModel::is_class(object) {
        let class = object;
        if !VM::VMObjectModel::is_resolved(class) {
            return false;
        }
        let interface_fields = index_cache.interface_field_count::<VM>(class);
        let skip_root_class = VM::VMObjectModel::is_interface(class);
        report_fields_recursive::<VM>(
            &FieldWalk {
                receiver: None,
                skip_root_class,
                interface_fields,
            },
            class,
            true,
            visitor,
        )
        .is_none()
    } else {
        let class = VM::VMObjectModel::get_class(object);
        let interface_fields = index_cache.interface_field_count::<VM>(class);
        report_fields_recursive::<VM>(
            &FieldWalk {
                receiver: Some(object),
                skip_root_class: false,
                interface_fields,
            },
            class,
            true,
            visitor,
        )
        .is_none()
    }
}

struct FieldWalk {
    receiver: Option<ObjectReference>,
    skip_root_class: bool,
    interface_fields: usize,
}

/// Visit the fields of `class` after those of its superclasses. Returns the next field index, or
/// `None` if the visit was aborted. If `call_visitor` is false, the visitor is not called for
/// anything.
fn report_fields_recursive<VM: VMBinding>(
    walk: &FieldWalk,
    class: ObjectReference,
    call_visitor: bool,
    visitor: &mut dyn FieldVisitor<VM::VMField>,
) -> Option<usize> {
    let mut field_index = match VM::VMObjectModel::get_super_class(class) {
        None => {
            if walk.skip_root_class {
                return Some(walk.interface_fields);
            }
            walk.interface_fields
        }
        Some(super_class) => {
            // A class receiver only has its own statics visited, but the superclasses still count.
            let call_on_super = call_visitor && walk.receiver.is_some();
            report_fields_recursive::<VM>(walk, super_class, call_on_super, visitor)?
        }
    };

    for field in VM::VMObjectModel::get_static_fields(class) {
        if call_visitor {
            let visit = FieldVisit {
                object: walk.receiver,
                class,
                field,
                index: field_index,
            };
            let aborted = if VM::VMObjectModel::get_field_type(field).is_primitive() {
                visitor.visit_static_primitive(&visit)
            } else {
                visitor.visit_static_reference(&visit)
            };
            if aborted {
                return None;
            }
        }
        field_index += 1;
    }

    for field in VM::VMObjectModel::get_instance_fields(class) {
        // Instance fields of a class receiver have no holder and are only counted.
        if call_visitor && walk.receiver.is_some() {
            let visit = FieldVisit {
                object: walk.receiver,
                class,
                field,
                index: field_index,
            };
            let aborted = if VM::VMObjectModel::get_field_type(field).is_primitive() {
                visitor.visit_instance_primitive(&visit)
            } else {
                visitor.visit_instance_reference(&visit)
            };
            if aborted {
                return None;
            }
        }
        field_index += 1;
    }

    Some(field_index)
}

/// Count the static fields of every interface `class` implements. Interfaces are visited after
/// those of the superclass, depth first, each one once.
pub fn count_interface_fields<VM: VMBinding>(class: ObjectReference) -> usize {
    let mut visited = HashSet::new();
    let mut count = 0;
    visit_interfaces::<VM>(class, &mut visited, &mut |interface| {
        count += VM::VMObjectModel::num_static_fields(interface);
    });
    count
}

fn visit_interfaces<VM: VMBinding>(
    class: ObjectReference,
    visited: &mut HashSet<ObjectReference>,
    visitor: &mut dyn FnMut(ObjectReference),
) {
    if let Some(super_class) = VM::VMObjectModel::get_super_class(class) {
        visit_interfaces::<VM>(super_class, visited, visitor);
    }
    for i in 0..VM::VMObjectModel::num_direct_interfaces(class) {
        if let Some(interface) = VM::VMObjectModel::get_direct_interface(class, i) {
            visit_interface::<VM>(interface, visited, visitor);
        }
    }
}

fn visit_interface<VM: VMBinding>(
    interface: ObjectReference,
    visited: &mut HashSet<ObjectReference>,
    visitor: &mut dyn FnMut(ObjectReference),
) {
    if !visited.insert(interface) {
        return;
    }
    visitor(interface);
    for i in 0..VM::VMObjectModel::num_direct_interfaces(interface) {
        if let Some(super_interface) = VM::VMObjectModel::get_direct_interface(interface, i) {
            visit_interface::<VM>(super_interface, visited, visitor);
        }
    }
}

#[derive(Copy, Clone, Debug)]
struct IndexCache {
    interface_fields: usize,
}

/// Weak cache of the number of interface fields per class.
pub struct IndexCachingTable {
    table: WeakTable<IndexCache>,
    enabled: bool,
}

impl IndexCachingTable {
    pub fn new(enabled: bool) -> Self {
        Self {
            table: WeakTable::new(),
            enabled,
        }
    }

    /// See [`count_interface_fields`].
    pub fn interface_field_count<VM: VMBinding>(&self, class: ObjectReference) -> usize {
        if !self.enabled {
            return count_interface_fields::<VM>(class);
        }
        if let Some(cached) = self.table.get(class) {
            return cached.interface_fields;
        }
        let interface_fields = count_interface_fields::<VM>(class);
        self.table.set(class, IndexCache { interface_fields });
        interface_fields
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl SystemWeakHolder for IndexCachingTable {
    fn sweep(&self, visitor: &mut dyn IsMarkedVisitor) {
        self.table.sweep_entries(visitor);
    }

    fn allow(&self) {
        self.table.allow_weak_access();
    }

    fn disallow(&self) {
        self.table.disallow_weak_access();
    }

    fn broadcast(&self) {
        self.table.broadcast_weak_access();
    }
}

struct DumpVisitor<'a, VM: VMBinding> {
    lines: &'a mut Vec<String>,
    phantom: std::marker::PhantomData<VM>,
}

impl<VM: VMBinding> DumpVisitor<'_, VM> {
    fn dump(&mut self, kind: &str, visit: &FieldVisit<VM::VMField>) -> bool {
        self.lines.push(format!(
            "{} {} @ {}",
            kind,
            VM::VMObjectModel::get_field_name(visit.field),
            visit.index
        ));
        false
    }
}

impl<VM: VMBinding> FieldVisitor<VM::VMField> for DumpVisitor<'_, VM> {
    fn visit_static_primitive(&mut self, visit: &FieldVisit<VM::VMField>) -> bool {
        self.dump("static primitive", visit)
    }
    fn visit_static_reference(&mut self, visit: &FieldVisit<VM::VMField>) -> bool {
        self.dump("static ref", visit)
    }
    fn visit_instance_primitive(&mut self, visit: &FieldVisit<VM::VMField>) -> bool {
        self.dump("instance primitive", visit)
    }
    fn visit_instance_reference(&mut self, visit: &FieldVisit<VM::VMField>) -> bool {
        self.dump("instance ref", visit)
    }
}

/// Debug helper. Logs the fields of an object with their indices, and returns the logged lines.
pub fn dump_object_fields<VM: VMBinding>(
    index_cache: &IndexCachingTable,
    object: ObjectReference,
) -> Vec<String> {
    let mut lines = vec![];
    report_fields::<VM>(
        index_cache,
        object,
        &mut DumpVisitor::<VM> {
            lines: &mut lines,
            phantom: std::marker::PhantomData,
        },
    );
    for line in lines.iter() {
        debug!("{}: {}", object, line);
    }
    lines
}
