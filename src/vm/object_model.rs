use crate::util::primitive::{FieldType, JValue};
use crate::util::ObjectReference;
use crate::vm::VMBinding;

/// The heap partition an object lives in, as far as tools can tell partitions apart.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SpaceKind {
    /// The regular application heap.
    Default,
    /// The zygote space, inherited from the process this process was forked from.
    Zygote,
    /// The boot image space. Only objects that belong to the boot image proper are reported as
    /// image objects.
    BootImage,
    /// A non-boot image space (e.g. an app image).
    AppImage,
    /// The large object space. `zygote` is true for large objects allocated before the fork.
    LargeObject { zygote: bool },
}

/// Callbacks to query the runtime's object model: the shape of objects, classes and their fields.
///
/// Unless stated otherwise, every method may assume that its `object` argument is a live object,
/// and every `class` argument is a live class object. Methods are only called while the caller has
/// shared access to the heap (see [`crate::vm::Collection::acquire_heap_shared`]) or while all
/// mutators are stopped.
pub trait ObjectModel<VM: VMBinding> {
    // --- Objects ---

    /// Return the class of an object. The class of a class object is the class of classes.
    fn get_class(object: ObjectReference) -> ObjectReference;

    /// Return the size of an object in bytes.
    fn get_current_size(object: ObjectReference) -> usize;

    /// Is the object a class object?
    fn is_class(object: ObjectReference) -> bool;

    /// Is the object an array?
    fn is_array(object: ObjectReference) -> bool;

    /// Is the object a string?
    fn is_string(object: ObjectReference) -> bool;

    /// Return the lock word (monitor state, identity hash) of an object.
    fn get_lock_word(object: ObjectReference) -> usize;

    /// Replace the lock word of an object.
    fn set_lock_word(object: ObjectReference, lock_word: usize);

    /// The lock word of an object that has never been locked or hashed.
    const DEFAULT_LOCK_WORD: usize = 0;

    /// Return the heap partition the object belongs to.
    fn get_space_kind(object: ObjectReference) -> SpaceKind;

    // --- Classes ---

    /// Is the class resolved? Unresolved classes have no usable field layout.
    fn is_resolved(class: ObjectReference) -> bool;

    /// Is the class loaded, or in an erroneous state after loading?
    fn is_loaded(class: ObjectReference) -> bool;

    /// Is the class an interface?
    fn is_interface(class: ObjectReference) -> bool;

    /// Can an object of class `other` be assigned to a variable of class `class`?
    fn is_assignable_from(class: ObjectReference, other: ObjectReference) -> bool;

    /// Return the superclass, or `None` for the root class and for primitive classes.
    fn get_super_class(class: ObjectReference) -> Option<ObjectReference>;

    /// Return the number of interfaces the class directly implements (or an interface directly
    /// extends).
    fn num_direct_interfaces(class: ObjectReference) -> usize;

    /// Return a directly implemented interface, or `None` if it cannot be resolved.
    fn get_direct_interface(class: ObjectReference, index: usize) -> Option<ObjectReference>;

    /// Return the class loader, or `None` for the bootstrap loader.
    fn get_class_loader(class: ObjectReference) -> Option<ObjectReference>;

    /// Return the element type if the class is an array class, or `None` otherwise.
    fn get_component_type(class: ObjectReference) -> Option<FieldType>;

    /// Return a human readable name of the class, for logging.
    fn get_class_name(class: ObjectReference) -> String;

    // --- Fields ---

    /// Return the static fields declared by the class itself, in declaration order.
    fn get_static_fields(class: ObjectReference) -> Vec<VM::VMField>;

    /// Return the instance fields declared by the class itself, in declaration order.
    fn get_instance_fields(class: ObjectReference) -> Vec<VM::VMField>;

    /// Return the number of static fields declared by the class itself.
    fn num_static_fields(class: ObjectReference) -> usize {
        Self::get_static_fields(class).len()
    }

    /// Return the type of a field.
    fn get_field_type(field: VM::VMField) -> FieldType;

    /// Return a human readable name of the field, for logging.
    fn get_field_name(field: VM::VMField) -> String;

    /// Is the field the one that holds the class pointer of every object? Such a field exists
    /// in runtimes that expose the object header's class pointer as a field of the root class.
    fn is_class_pointer_field(field: VM::VMField) -> bool;

    /// Read a primitive field. `holder` is the class for static fields and the object for instance
    /// fields.
    fn get_primitive_field(holder: ObjectReference, field: VM::VMField) -> JValue;

    /// Read a reference field. `holder` is the class for static fields and the object for instance
    /// fields.
    fn get_reference_field(holder: ObjectReference, field: VM::VMField) -> Option<ObjectReference>;

    // --- Arrays ---

    /// Return the number of elements of an array.
    fn get_array_length(array: ObjectReference) -> usize;

    /// Read an element of a reference array.
    fn get_array_element(array: ObjectReference, index: usize) -> Option<ObjectReference>;

    /// Write an element of a reference array.
    fn set_array_element(array: ObjectReference, index: usize, value: Option<ObjectReference>);

    /// Read an element of a primitive array.
    fn get_primitive_array_element(array: ObjectReference, index: usize) -> JValue;

    /// Write an element of a primitive array.
    fn set_primitive_array_element(array: ObjectReference, index: usize, value: JValue);

    /// Copy the raw elements of a primitive array into `dest`, in native byte order.
    /// `dest` is exactly as long as the array's element count times the element size.
    fn read_primitive_array(array: ObjectReference, dest: &mut [u8]) {
        let length = Self::get_array_length(array);
        if length == 0 {
            return;
        }
        let element_size = dest.len() / length;
        for (index, chunk) in dest.chunks_exact_mut(element_size).enumerate() {
            Self::get_primitive_array_element(array, index).write_ne_bytes(chunk);
        }
    }

    // --- Strings ---

    /// Return the number of UTF-16 code units of a string.
    fn get_string_length(string: ObjectReference) -> usize;

    /// Is the string stored compressed, with one byte per character?
    fn is_compressed_string(string: ObjectReference) -> bool;

    /// Copy the characters of a compressed string into `dest`, one byte per character.
    fn read_compressed_string(string: ObjectReference, dest: &mut [u8]);

    /// Copy the characters of an uncompressed string into `dest`.
    fn read_utf16_string(string: ObjectReference, dest: &mut [u16]);
}
