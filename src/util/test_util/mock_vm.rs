//! A mock runtime for tests and benchmarks.
//!
//! [`MockVM`] keeps an in-memory object graph (classes, instances, arrays and strings), a set of
//! roots, threads and system weak holders, and a simple collector that can optionally move
//! objects. The runtime hooks heapti calls to suspend threads or to report writes are
//! [`MockMethod`]s, so tests can count and script them.
//!
//! There is one global mock runtime. Tests build their heap with [`write_mockvm`] and must not call
//! into heapti while holding it. Use [`with_mockvm`] to run a test with a fresh mock runtime.

use super::mock_method::*;
use crate::util::opaque_pointer::{MethodId, ThreadId, VMThread};
use crate::util::primitive::{FieldType, JValue, PrimitiveType};
use crate::util::{Address, ObjectReference};
use crate::vm::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

lazy_static! {
    // The mutex may get poisoned any time. Accessing this mutex needs to deal with the poisoned case.
    // One can use read/write_mockvm to access mock vm.
    static ref MOCK_VM_INSTANCE: Mutex<MockVM> = Mutex::new(MockVM::default());
}

macro_rules! mock {
    ($fn: ident($($arg:expr),*)) => {
        write_mockvm(|mock| mock.$fn.call(($($arg),*)))
    };
}

pub fn read_mockvm<F, R>(func: F) -> R
where
    F: FnOnce(&MockVM) -> R,
{
    let lock = MOCK_VM_INSTANCE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    func(&lock)
}

pub fn write_mockvm<F, R>(func: F) -> R
where
    F: FnOnce(&mut MockVM) -> R,
{
    let mut lock = MOCK_VM_INSTANCE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    func(&mut lock)
}

pub fn with_mockvm<S, T, C>(setup: S, test: T, cleanup: C)
where
    S: FnOnce() -> MockVM,
    T: FnOnce() + std::panic::UnwindSafe,
    C: FnOnce(),
{
    super::serial_test(|| {
        // Setup
        {
            write_mockvm(|mock| *mock = setup());
        }
        super::with_cleanup(test, cleanup);
    })
}

pub fn default_setup() -> MockVM {
    MockVM::default()
}

pub fn no_cleanup() {}

const MOCK_HEAP_START: usize = 0x2000_0000;
const MOCK_OBJECT_ALIGNMENT: usize = 0x40;

/// The field handle of the mock runtime: an index into [`MockVM::fields`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MockFieldId(pub usize);

pub struct MockField {
    pub name: String,
    pub field_type: FieldType,
    pub is_static: bool,
    pub is_class_pointer: bool,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum MockValue {
    Primitive(JValue),
    Reference(Option<ObjectReference>),
}

impl MockValue {
    pub fn zero(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Primitive(ty) => MockValue::Primitive(JValue::zero(ty)),
            FieldType::Reference => MockValue::Reference(None),
        }
    }
}

pub struct MockClass {
    pub name: String,
    pub super_class: Option<ObjectReference>,
    pub interfaces: Vec<ObjectReference>,
    pub is_interface: bool,
    pub static_fields: Vec<MockFieldId>,
    pub instance_fields: Vec<MockFieldId>,
    pub component_type: Option<FieldType>,
    pub class_loader: Option<ObjectReference>,
    pub resolved: bool,
    pub loaded: bool,
}

impl MockClass {
    fn new(name: &str, super_class: Option<ObjectReference>) -> Self {
        MockClass {
            name: name.to_string(),
            super_class,
            interfaces: vec![],
            is_interface: false,
            static_fields: vec![],
            instance_fields: vec![],
            component_type: None,
            class_loader: None,
            resolved: true,
            loaded: true,
        }
    }
}

pub enum MockBody {
    Instance,
    Class(MockClass),
    ObjectArray(Vec<Option<ObjectReference>>),
    PrimitiveArray {
        element_type: PrimitiveType,
        elements: Vec<JValue>,
    },
    String {
        chars: Vec<u16>,
        compressed: bool,
    },
}

pub struct MockObject {
    pub class: ObjectReference,
    pub lock_word: usize,
    pub space: SpaceKind,
    /// Instance field values, or static field values for class objects.
    pub fields: HashMap<MockFieldId, MockValue>,
    pub body: MockBody,
}

#[derive(Copy, Clone, Debug, Default)]
pub struct MockThread {
    pub peer: Option<ObjectReference>,
    pub current_method: Option<MethodId>,
}

pub struct MockVM {
    // heap
    pub objects: BTreeMap<ObjectReference, MockObject>,
    pub fields: Vec<MockField>,
    pub roots: Vec<(ObjectReference, RootInfo)>,
    pub weak_globals: Vec<ObjectReference>,
    pub threads: HashMap<ThreadId, MockThread>,
    pub system_weak_holders: Vec<Arc<dyn SystemWeakHolder>>,
    pub object_class: ObjectReference,
    pub class_class: ObjectReference,
    pub string_class: ObjectReference,
    pub class_pointer_field: Option<MockFieldId>,
    array_classes: HashMap<FieldType, ObjectReference>,
    next_object: usize,
    /// Mock collections move every surviving non-class object.
    pub moving_gc: bool,
    pub concurrent_moving_gc: bool,
    /// Allocation of replacement arrays fails.
    pub fail_allocation: bool,
    // collection
    pub stop_all_mutators: MockMethod<VMThread, ()>,
    pub resume_mutators: MockMethod<VMThread, ()>,
    pub acquire_heap_shared: MockMethod<VMThread, ()>,
    pub release_heap_shared: MockMethod<VMThread, ()>,
    pub increment_disable_moving_gc: MockMethod<VMThread, ()>,
    pub decrement_disable_moving_gc: MockMethod<VMThread, ()>,
    pub enter_gc_critical_section: MockMethod<(VMThread, &'static str), ()>,
    pub exit_gc_critical_section: MockMethod<VMThread, ()>,
    pub suspend_user_code: MockMethod<VMThread, ()>,
    pub resume_user_code: MockMethod<VMThread, ()>,
    pub write_barrier: MockMethod<ObjectReference, ()>,
    pub instrument_thread_stack: MockMethod<ThreadId, ()>,
    pub collect_garbage: MockMethod<(VMThread, bool), ()>,
}

fn mock_reference(index: usize) -> ObjectReference {
    ObjectReference::from_raw_address(Address::from_usize(
        MOCK_HEAP_START + index * MOCK_OBJECT_ALIGNMENT,
    ))
    .unwrap()
}

impl Default for MockVM {
    fn default() -> Self {
        let object_class = mock_reference(0);
        let class_class = mock_reference(1);
        let string_class = mock_reference(2);
        let mut vm = MockVM {
            objects: BTreeMap::new(),
            fields: vec![],
            roots: vec![],
            weak_globals: vec![],
            threads: HashMap::new(),
            system_weak_holders: vec![],
            object_class,
            class_class,
            string_class,
            class_pointer_field: None,
            array_classes: HashMap::new(),
            next_object: 3,
            moving_gc: false,
            concurrent_moving_gc: false,
            fail_allocation: false,
            stop_all_mutators: MockMethod::new_default(),
            resume_mutators: MockMethod::new_default(),
            acquire_heap_shared: MockMethod::new_default(),
            release_heap_shared: MockMethod::new_default(),
            increment_disable_moving_gc: MockMethod::new_default(),
            decrement_disable_moving_gc: MockMethod::new_default(),
            enter_gc_critical_section: MockMethod::new_default(),
            exit_gc_critical_section: MockMethod::new_default(),
            suspend_user_code: MockMethod::new_default(),
            resume_user_code: MockMethod::new_default(),
            write_barrier: MockMethod::new_default(),
            instrument_thread_stack: MockMethod::new_default(),
            collect_garbage: MockMethod::new_default(),
        };
        vm.insert_class(object_class, MockClass::new("java.lang.Object", None));
        vm.insert_class(
            class_class,
            MockClass::new("java.lang.Class", Some(object_class)),
        );
        vm.insert_class(
            string_class,
            MockClass::new("java.lang.String", Some(object_class)),
        );
        vm
    }
}

impl VMBinding for MockVM {
    type VMObjectModel = MockVM;
    type VMScanning = MockVM;
    type VMCollection = MockVM;
    type VMActivePlan = MockVM;
    type VMReferenceGlue = MockVM;
    type VMAllocation = MockVM;

    type VMField = MockFieldId;
}

// Building the heap
impl MockVM {
    fn new_reference(&mut self) -> ObjectReference {
        let object = mock_reference(self.next_object);
        self.next_object += 1;
        object
    }

    fn insert_class(&mut self, reference: ObjectReference, class: MockClass) {
        self.objects.insert(
            reference,
            MockObject {
                class: self.class_class,
                lock_word: 0,
                space: SpaceKind::Default,
                fields: HashMap::new(),
                body: MockBody::Class(class),
            },
        );
    }

    fn insert_object(&mut self, class: ObjectReference, body: MockBody) -> ObjectReference {
        let object = self.new_reference();
        self.objects.insert(
            object,
            MockObject {
                class,
                lock_word: 0,
                space: SpaceKind::Default,
                fields: HashMap::new(),
                body,
            },
        );
        object
    }

    /// Define a class. Its superclass is `java.lang.Object` unless given.
    pub fn define_class(
        &mut self,
        name: &str,
        super_class: Option<ObjectReference>,
    ) -> ObjectReference {
        let class = self.new_reference();
        let super_class = super_class.unwrap_or(self.object_class);
        self.insert_class(class, MockClass::new(name, Some(super_class)));
        class
    }

    pub fn define_interface(&mut self, name: &str) -> ObjectReference {
        let interface = self.define_class(name, None);
        self.class_mut(interface).is_interface = true;
        interface
    }

    pub fn add_interface(&mut self, class: ObjectReference, interface: ObjectReference) {
        self.class_mut(class).interfaces.push(interface);
    }

    fn add_field(&mut self, name: &str, field_type: FieldType, is_static: bool) -> MockFieldId {
        let id = MockFieldId(self.fields.len());
        self.fields.push(MockField {
            name: name.to_string(),
            field_type,
            is_static,
            is_class_pointer: false,
        });
        id
    }

    pub fn add_static_field(
        &mut self,
        class: ObjectReference,
        name: &str,
        field_type: FieldType,
    ) -> MockFieldId {
        let field = self.add_field(name, field_type, true);
        self.class_mut(class).static_fields.push(field);
        self.object_mut(class)
            .fields
            .insert(field, MockValue::zero(field_type));
        field
    }

    /// Add an instance field. Objects allocated before do not have it.
    pub fn add_instance_field(
        &mut self,
        class: ObjectReference,
        name: &str,
        field_type: FieldType,
    ) -> MockFieldId {
        let field = self.add_field(name, field_type, false);
        self.class_mut(class).instance_fields.push(field);
        field
    }

    /// Expose the class pointer as the first instance field of `java.lang.Object`.
    pub fn enable_class_pointer_field(&mut self) -> MockFieldId {
        let field = self.add_field("shadow$_klass_", FieldType::Reference, false);
        self.fields[field.0].is_class_pointer = true;
        let object_class = self.object_class;
        self.class_mut(object_class).instance_fields.insert(0, field);
        self.class_pointer_field = Some(field);
        field
    }

    pub fn alloc_instance(&mut self, class: ObjectReference) -> ObjectReference {
        let mut fields = HashMap::new();
        let mut cursor = Some(class);
        while let Some(c) = cursor {
            for &field in self.class(c).instance_fields.iter() {
                if !self.fields[field.0].is_class_pointer {
                    fields.insert(field, MockValue::zero(self.fields[field.0].field_type));
                }
            }
            cursor = self.class(c).super_class;
        }
        let object = self.insert_object(class, MockBody::Instance);
        self.object_mut(object).fields = fields;
        object
    }

    /// The array class with the given element type.
    pub fn array_class(&mut self, component_type: FieldType) -> ObjectReference {
        if let Some(&class) = self.array_classes.get(&component_type) {
            return class;
        }
        let name = match component_type {
            FieldType::Primitive(ty) => format!("[{}", ty.descriptor()),
            FieldType::Reference => "[Ljava/lang/Object;".to_string(),
        };
        let class = self.define_class(&name, None);
        self.class_mut(class).component_type = Some(component_type);
        self.array_classes.insert(component_type, class);
        class
    }

    pub fn alloc_object_array(
        &mut self,
        elements: Vec<Option<ObjectReference>>,
    ) -> ObjectReference {
        let class = self.array_class(FieldType::Reference);
        self.insert_object(class, MockBody::ObjectArray(elements))
    }

    pub fn alloc_primitive_array(
        &mut self,
        element_type: PrimitiveType,
        elements: Vec<JValue>,
    ) -> ObjectReference {
        assert!(elements.iter().all(|e| e.primitive_type() == element_type));
        let class = self.array_class(FieldType::Primitive(element_type));
        self.insert_object(
            class,
            MockBody::PrimitiveArray {
                element_type,
                elements,
            },
        )
    }

    /// Allocate a string. ASCII strings are stored compressed.
    pub fn alloc_string(&mut self, s: &str) -> ObjectReference {
        let class = self.string_class;
        self.insert_object(
            class,
            MockBody::String {
                chars: s.encode_utf16().collect(),
                compressed: s.is_ascii(),
            },
        )
    }

    pub fn set_reference(
        &mut self,
        holder: ObjectReference,
        field: MockFieldId,
        value: Option<ObjectReference>,
    ) {
        self.object_mut(holder)
            .fields
            .insert(field, MockValue::Reference(value));
    }

    pub fn set_primitive(&mut self, holder: ObjectReference, field: MockFieldId, value: JValue) {
        self.object_mut(holder)
            .fields
            .insert(field, MockValue::Primitive(value));
    }

    pub fn get_reference(
        &self,
        holder: ObjectReference,
        field: MockFieldId,
    ) -> Option<ObjectReference> {
        match self.object(holder).fields.get(&field) {
            Some(MockValue::Reference(value)) => *value,
            other => panic!("{:?} of {} is not a reference: {:?}", field, holder, other),
        }
    }

    pub fn elements(&self, array: ObjectReference) -> &[Option<ObjectReference>] {
        match &self.object(array).body {
            MockBody::ObjectArray(elements) => elements,
            _ => panic!("{} is not a reference array", array),
        }
    }

    pub fn primitive_elements(&self, array: ObjectReference) -> &[JValue] {
        match &self.object(array).body {
            MockBody::PrimitiveArray { elements, .. } => elements,
            _ => panic!("{} is not a primitive array", array),
        }
    }

    pub fn set_element(
        &mut self,
        array: ObjectReference,
        index: usize,
        value: Option<ObjectReference>,
    ) {
        match &mut self.object_mut(array).body {
            MockBody::ObjectArray(elements) => elements[index] = value,
            _ => panic!("{} is not a reference array", array),
        }
    }

    pub fn add_root(&mut self, object: ObjectReference, info: RootInfo) {
        self.roots.push((object, info));
    }

    pub fn add_thread(
        &mut self,
        thread_id: ThreadId,
        peer: Option<ObjectReference>,
        current_method: Option<MethodId>,
    ) {
        self.threads.insert(thread_id, MockThread { peer, current_method });
    }

    pub fn add_weak_global(&mut self, object: ObjectReference) {
        self.weak_globals.push(object);
    }

    pub fn is_live(&self, object: ObjectReference) -> bool {
        self.objects.contains_key(&object)
    }

    pub fn object(&self, object: ObjectReference) -> &MockObject {
        self.objects
            .get(&object)
            .unwrap_or_else(|| panic!("{} is not a live object", object))
    }

    pub fn object_mut(&mut self, object: ObjectReference) -> &mut MockObject {
        self.objects
            .get_mut(&object)
            .unwrap_or_else(|| panic!("{} is not a live object", object))
    }

    pub fn class(&self, class: ObjectReference) -> &MockClass {
        match &self.object(class).body {
            MockBody::Class(c) => c,
            _ => panic!("{} is not a class", class),
        }
    }

    pub fn class_mut(&mut self, class: ObjectReference) -> &mut MockClass {
        match &mut self.object_mut(class).body {
            MockBody::Class(c) => c,
            _ => panic!("{} is not a class", class),
        }
    }

    fn is_subtype(&self, sub: ObjectReference, sup: ObjectReference) -> bool {
        if sub == sup {
            return true;
        }
        let class = self.class(sub);
        if class.super_class.is_some_and(|s| self.is_subtype(s, sup)) {
            return true;
        }
        class.interfaces.iter().any(|&i| self.is_subtype(i, sup))
    }

    fn size_of(&self, object: ObjectReference) -> usize {
        let o = self.object(object);
        match &o.body {
            MockBody::Instance => 16 + 8 * o.fields.len(),
            MockBody::Class(c) => 128 + 8 * c.static_fields.len(),
            MockBody::ObjectArray(elements) => 16 + 4 * elements.len(),
            MockBody::PrimitiveArray {
                element_type,
                elements,
            } => 16 + element_type.size() * elements.len(),
            MockBody::String { chars, compressed } => {
                24 + chars.len() * if *compressed { 1 } else { 2 }
            }
        }
    }

    /// The non-empty reference slots of an object, in a fixed order.
    pub fn slots_of(
        &self,
        object: ObjectReference,
        visit_native_roots: bool,
    ) -> Vec<(SlotKind<MockFieldId>, ObjectReference)> {
        let o = self.object(object);
        let mut slots = vec![(SlotKind::ClassPointer, o.class)];
        if let MockBody::Class(class) = &o.body {
            if let Some(super_class) = class.super_class {
                slots.push((SlotKind::SuperClass, super_class));
            }
            if visit_native_roots {
                if let Some(loader) = class.class_loader {
                    slots.push((SlotKind::NativeRoot, loader));
                }
            }
        }
        let mut fields: Vec<_> = o.fields.iter().collect();
        fields.sort_by_key(|(field, _)| **field);
        for (&field, value) in fields {
            if let MockValue::Reference(Some(target)) = value {
                let slot = if self.fields[field.0].is_static {
                    SlotKind::StaticField(field)
                } else {
                    SlotKind::InstanceField(field)
                };
                slots.push((slot, *target));
            }
        }
        if let MockBody::ObjectArray(elements) = &o.body {
            for (i, element) in elements.iter().enumerate() {
                if let Some(element) = element {
                    slots.push((SlotKind::ArrayElement(i), *element));
                }
            }
        }
        slots
    }

    fn write_slot(
        &mut self,
        object: ObjectReference,
        slot: SlotKind<MockFieldId>,
        target: ObjectReference,
    ) {
        let o = self.object_mut(object);
        match slot {
            SlotKind::ClassPointer => o.class = target,
            SlotKind::InstanceField(field) | SlotKind::StaticField(field) => {
                o.fields.insert(field, MockValue::Reference(Some(target)));
            }
            SlotKind::ArrayElement(i) => match &mut o.body {
                MockBody::ObjectArray(elements) => elements[i] = Some(target),
                _ => unreachable!(),
            },
            SlotKind::SuperClass | SlotKind::NativeRoot => match &mut o.body {
                MockBody::Class(class) if slot == SlotKind::SuperClass => {
                    class.super_class = Some(target)
                }
                MockBody::Class(class) => class.class_loader = Some(target),
                _ => unreachable!(),
            },
        }
    }

    /// Mark from the roots, drop dead objects and, if the collector is moving, move survivors.
    /// Classes never die or move. Returns the new reference of every survivor.
    fn collect(&mut self) -> HashMap<ObjectReference, ObjectReference> {
        let mut marked = HashSet::new();
        let mut stack: Vec<ObjectReference> = self.roots.iter().map(|(root, _)| *root).collect();
        stack.extend(self.threads.values().filter_map(|t| t.peer));
        stack.extend(
            self.objects
                .iter()
                .filter(|(_, o)| matches!(o.body, MockBody::Class(_)))
                .map(|(class, _)| *class),
        );
        while let Some(object) = stack.pop() {
            if !marked.insert(object) {
                continue;
            }
            stack.extend(self.slots_of(object, true).into_iter().map(|(_, t)| t));
            if let MockBody::Class(class) = &self.object(object).body {
                stack.extend(class.interfaces.iter().copied());
            }
        }

        self.objects.retain(|object, _| marked.contains(object));
        self.weak_globals.retain(|object| marked.contains(object));

        let mut forwarding: HashMap<ObjectReference, ObjectReference> =
            marked.iter().map(|&object| (object, object)).collect();
        if !self.moving_gc {
            return forwarding;
        }

        let movable: Vec<ObjectReference> = self
            .objects
            .iter()
            .filter(|(_, o)| !matches!(o.body, MockBody::Class(_)))
            .map(|(object, _)| *object)
            .collect();
        for object in movable {
            let new = self.new_reference();
            forwarding.insert(object, new);
            let moved = self.objects.remove(&object).unwrap();
            self.objects.insert(new, moved);
        }

        let forward = |object: ObjectReference| forwarding.get(&object).copied().unwrap_or(object);
        for o in self.objects.values_mut() {
            for value in o.fields.values_mut() {
                if let MockValue::Reference(Some(target)) = value {
                    *target = forward(*target);
                }
            }
            match &mut o.body {
                MockBody::ObjectArray(elements) => {
                    for element in elements.iter_mut().flatten() {
                        *element = forward(*element);
                    }
                }
                MockBody::Class(class) => {
                    class.class_loader = class.class_loader.map(forward);
                }
                _ => {}
            }
        }
        for (root, _) in self.roots.iter_mut() {
            *root = forward(*root);
        }
        for thread in self.threads.values_mut() {
            thread.peer = thread.peer.map(forward);
        }
        for object in self.weak_globals.iter_mut() {
            *object = forward(*object);
        }
        forwarding
    }
}

/// Run a mock collection and sweep every system weak holder.
pub fn run_mock_gc() {
    let (forwarding, holders) = write_mockvm(|vm| (vm.collect(), vm.system_weak_holders.clone()));
    let mut is_marked = |object: ObjectReference| forwarding.get(&object).copied();
    for holder in holders.iter() {
        holder.sweep(&mut is_marked);
    }
}

impl ObjectModel<MockVM> for MockVM {
    fn get_class(object: ObjectReference) -> ObjectReference {
        read_mockvm(|vm| vm.object(object).class)
    }

    fn get_current_size(object: ObjectReference) -> usize {
        read_mockvm(|vm| vm.size_of(object))
    }

    fn is_class(object: ObjectReference) -> bool {
        read_mockvm(|vm| matches!(vm.object(object).body, MockBody::Class(_)))
    }

    fn is_array(object: ObjectReference) -> bool {
        read_mockvm(|vm| {
            matches!(
                vm.object(object).body,
                MockBody::ObjectArray(_) | MockBody::PrimitiveArray { .. }
            )
        })
    }

    fn is_string(object: ObjectReference) -> bool {
        read_mockvm(|vm| matches!(vm.object(object).body, MockBody::String { .. }))
    }

    fn get_lock_word(object: ObjectReference) -> usize {
        read_mockvm(|vm| vm.object(object).lock_word)
    }

    fn set_lock_word(object: ObjectReference, lock_word: usize) {
        write_mockvm(|vm| vm.object_mut(object).lock_word = lock_word)
    }

    fn get_space_kind(object: ObjectReference) -> SpaceKind {
        read_mockvm(|vm| vm.object(object).space)
    }

    fn is_resolved(class: ObjectReference) -> bool {
        read_mockvm(|vm| vm.class(class).resolved)
    }

    fn is_loaded(class: ObjectReference) -> bool {
        read_mockvm(|vm| vm.class(class).loaded)
    }

    fn is_interface(class: ObjectReference) -> bool {
        read_mockvm(|vm| vm.class(class).is_interface)
    }

    fn is_assignable_from(class: ObjectReference, other: ObjectReference) -> bool {
        read_mockvm(|vm| vm.is_subtype(other, class))
    }

    fn get_super_class(class: ObjectReference) -> Option<ObjectReference> {
        read_mockvm(|vm| vm.class(class).super_class)
    }

    fn num_direct_interfaces(class: ObjectReference) -> usize {
        read_mockvm(|vm| vm.class(class).interfaces.len())
    }

    fn get_direct_interface(class: ObjectReference, index: usize) -> Option<ObjectReference> {
        read_mockvm(|vm| vm.class(class).interfaces.get(index).copied())
    }

    fn get_class_loader(class: ObjectReference) -> Option<ObjectReference> {
        read_mockvm(|vm| vm.class(class).class_loader)
    }

    fn get_component_type(class: ObjectReference) -> Option<FieldType> {
        read_mockvm(|vm| vm.class(class).component_type)
    }

    fn get_class_name(class: ObjectReference) -> String {
        read_mockvm(|vm| vm.class(class).name.clone())
    }

    fn get_static_fields(class: ObjectReference) -> Vec<MockFieldId> {
        read_mockvm(|vm| vm.class(class).static_fields.clone())
    }

    fn get_instance_fields(class: ObjectReference) -> Vec<MockFieldId> {
        read_mockvm(|vm| vm.class(class).instance_fields.clone())
    }

    fn get_field_type(field: MockFieldId) -> FieldType {
        read_mockvm(|vm| vm.fields[field.0].field_type)
    }

    fn get_field_name(field: MockFieldId) -> String {
        read_mockvm(|vm| vm.fields[field.0].name.clone())
    }

    fn is_class_pointer_field(field: MockFieldId) -> bool {
        read_mockvm(|vm| vm.fields[field.0].is_class_pointer)
    }

    fn get_primitive_field(holder: ObjectReference, field: MockFieldId) -> JValue {
        read_mockvm(|vm| match vm.object(holder).fields.get(&field) {
            Some(MockValue::Primitive(value)) => *value,
            other => panic!("{:?} of {} is not a primitive: {:?}", field, holder, other),
        })
    }

    fn get_reference_field(
        holder: ObjectReference,
        field: MockFieldId,
    ) -> Option<ObjectReference> {
        read_mockvm(|vm| {
            if vm.fields[field.0].is_class_pointer {
                Some(vm.object(holder).class)
            } else {
                vm.get_reference(holder, field)
            }
        })
    }

    fn get_array_length(array: ObjectReference) -> usize {
        read_mockvm(|vm| match &vm.object(array).body {
            MockBody::ObjectArray(elements) => elements.len(),
            MockBody::PrimitiveArray { elements, .. } => elements.len(),
            _ => panic!("{} is not an array", array),
        })
    }

    fn get_array_element(array: ObjectReference, index: usize) -> Option<ObjectReference> {
        read_mockvm(|vm| vm.elements(array)[index])
    }

    fn set_array_element(array: ObjectReference, index: usize, value: Option<ObjectReference>) {
        write_mockvm(|vm| vm.set_element(array, index, value))
    }

    fn get_primitive_array_element(array: ObjectReference, index: usize) -> JValue {
        read_mockvm(|vm| vm.primitive_elements(array)[index])
    }

    fn set_primitive_array_element(array: ObjectReference, index: usize, value: JValue) {
        write_mockvm(|vm| match &mut vm.object_mut(array).body {
            MockBody::PrimitiveArray { elements, .. } => elements[index] = value,
            _ => panic!("{} is not a primitive array", array),
        })
    }

    fn get_string_length(string: ObjectReference) -> usize {
        read_mockvm(|vm| match &vm.object(string).body {
            MockBody::String { chars, .. } => chars.len(),
            _ => panic!("{} is not a string", string),
        })
    }

    fn is_compressed_string(string: ObjectReference) -> bool {
        read_mockvm(|vm| {
            matches!(
                vm.object(string).body,
                MockBody::String {
                    compressed: true,
                    ..
                }
            )
        })
    }

    fn read_compressed_string(string: ObjectReference, dest: &mut [u8]) {
        read_mockvm(|vm| match &vm.object(string).body {
            MockBody::String { chars, .. } => {
                for (d, c) in dest.iter_mut().zip(chars.iter()) {
                    *d = *c as u8;
                }
            }
            _ => panic!("{} is not a string", string),
        })
    }

    fn read_utf16_string(string: ObjectReference, dest: &mut [u16]) {
        read_mockvm(|vm| match &vm.object(string).body {
            MockBody::String { chars, .. } => dest.copy_from_slice(chars),
            _ => panic!("{} is not a string", string),
        })
    }
}

// Visitors are called with the mock runtime unlocked, so they may query it.
impl Scanning<MockVM> for MockVM {
    fn visit_objects<F: FnMut(ObjectReference)>(mut visitor: F) {
        let objects: Vec<ObjectReference> = read_mockvm(|vm| vm.objects.keys().copied().collect());
        for object in objects {
            visitor(object);
        }
    }

    fn visit_roots<RT: RootTracer>(tracer: &mut RT) {
        let roots = read_mockvm(|vm| vm.roots.clone());
        for (i, (root, info)) in roots.into_iter().enumerate() {
            let new_root = tracer.trace_root(root, &info);
            if new_root != root {
                write_mockvm(|vm| vm.roots[i].0 = new_root);
            }
        }
    }

    fn visit_classes<F: FnMut(ObjectReference)>(mut visitor: F) {
        let classes: Vec<ObjectReference> = read_mockvm(|vm| {
            vm.objects
                .iter()
                .filter(|(_, o)| matches!(o.body, MockBody::Class(_)))
                .map(|(class, _)| *class)
                .collect()
        });
        for class in classes {
            visitor(class);
        }
    }

    fn scan_object_and_trace_slots<ST: SlotTracer<MockVM>>(
        object: ObjectReference,
        visit_native_roots: bool,
        tracer: &mut ST,
    ) {
        let slots = read_mockvm(|vm| vm.slots_of(object, visit_native_roots));
        for (slot, target) in slots {
            let new_target = tracer.trace_slot(object, slot, target);
            if new_target != target {
                write_mockvm(|vm| vm.write_slot(object, slot, new_target));
            }
        }
    }
}

impl Collection<MockVM> for MockVM {
    fn stop_all_mutators(tls: VMThread) {
        mock!(stop_all_mutators(tls))
    }

    fn resume_mutators(tls: VMThread) {
        mock!(resume_mutators(tls))
    }

    fn acquire_heap_shared(tls: VMThread) {
        mock!(acquire_heap_shared(tls))
    }

    fn release_heap_shared(tls: VMThread) {
        mock!(release_heap_shared(tls))
    }

    fn is_gc_concurrent_and_moving() -> bool {
        read_mockvm(|vm| vm.concurrent_moving_gc)
    }

    fn increment_disable_moving_gc(tls: VMThread) {
        mock!(increment_disable_moving_gc(tls))
    }

    fn decrement_disable_moving_gc(tls: VMThread) {
        mock!(decrement_disable_moving_gc(tls))
    }

    fn enter_gc_critical_section(tls: VMThread, cause: &'static str) {
        mock!(enter_gc_critical_section(tls, cause))
    }

    fn exit_gc_critical_section(tls: VMThread) {
        mock!(exit_gc_critical_section(tls))
    }

    fn suspend_user_code(tls: VMThread) {
        mock!(suspend_user_code(tls))
    }

    fn resume_user_code(tls: VMThread) {
        mock!(resume_user_code(tls))
    }

    fn write_barrier(object: ObjectReference) {
        mock!(write_barrier(object))
    }

    fn instrument_thread_stack(thread_id: ThreadId) {
        mock!(instrument_thread_stack(thread_id))
    }

    fn collect_garbage(tls: VMThread, clear_soft_references: bool) {
        mock!(collect_garbage(tls, clear_soft_references));
        run_mock_gc();
    }
}

impl ActivePlan<MockVM> for MockVM {
    fn get_thread_peer(thread_id: ThreadId) -> Option<ObjectReference> {
        read_mockvm(|vm| vm.threads.get(&thread_id).and_then(|t| t.peer))
    }

    fn get_current_method(thread_id: ThreadId) -> Option<MethodId> {
        read_mockvm(|vm| vm.threads.get(&thread_id).and_then(|t| t.current_method))
    }
}

fn same_holder(a: &Arc<dyn SystemWeakHolder>, b: &Arc<dyn SystemWeakHolder>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

impl ReferenceGlue<MockVM> for MockVM {
    fn add_system_weak_holder(holder: Arc<dyn SystemWeakHolder>) {
        write_mockvm(|vm| vm.system_weak_holders.push(holder))
    }

    fn remove_system_weak_holder(holder: &Arc<dyn SystemWeakHolder>) {
        write_mockvm(|vm| vm.system_weak_holders.retain(|h| !same_holder(h, holder)))
    }

    fn sweep_system_weaks(visitor: &mut dyn IsMarkedVisitor) {
        let weak_globals = read_mockvm(|vm| vm.weak_globals.clone());
        let swept: Vec<ObjectReference> = weak_globals
            .into_iter()
            .filter_map(|object| visitor.is_marked(object))
            .collect();
        let holders = write_mockvm(|vm| {
            vm.weak_globals = swept;
            vm.system_weak_holders.clone()
        });
        for holder in holders.iter() {
            holder.sweep(visitor);
        }
    }
}

impl Allocation<MockVM> for MockVM {
    fn alloc_object_array(
        _tls: VMThread,
        array_class: ObjectReference,
        length: usize,
    ) -> Option<ObjectReference> {
        write_mockvm(|vm| {
            if vm.fail_allocation {
                return None;
            }
            Some(vm.insert_object(array_class, MockBody::ObjectArray(vec![None; length])))
        })
    }

    fn copy_of_array(
        _tls: VMThread,
        array: ObjectReference,
        length: usize,
    ) -> Option<ObjectReference> {
        write_mockvm(|vm| {
            if vm.fail_allocation {
                return None;
            }
            let class = vm.object(array).class;
            let body = match &vm.object(array).body {
                MockBody::PrimitiveArray {
                    element_type,
                    elements,
                } => {
                    let mut copy: Vec<JValue> = elements.iter().copied().take(length).collect();
                    copy.resize(length, JValue::zero(*element_type));
                    MockBody::PrimitiveArray {
                        element_type: *element_type,
                        elements: copy,
                    }
                }
                MockBody::ObjectArray(elements) => {
                    let mut copy: Vec<Option<ObjectReference>> =
                        elements.iter().copied().take(length).collect();
                    copy.resize(length, None);
                    MockBody::ObjectArray(copy)
                }
                _ => panic!("{} is not an array", array),
            };
            Some(vm.insert_object(class, body))
        })
    }
}
