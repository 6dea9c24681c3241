use super::mock_test_prelude::*;
use std::sync::Arc;

struct Heap {
    old: ObjectReference,
    new: ObjectReference,
    holder_class: ObjectReference,
    shared: MockFieldId,
    next: MockFieldId,
    a: ObjectReference,
    array: ObjectReference,
}

// `old` is held by an instance field, an array element, a static field, roots and a weak global.
fn build_heap() -> Heap {
    write_mockvm(|vm| {
        let node = vm.define_class("Node", None);
        let next = vm.add_instance_field(node, "next", FieldType::Reference);
        let holder_class = vm.define_class("Holder", None);
        let shared = vm.add_static_field(holder_class, "shared", FieldType::Reference);

        let old = vm.alloc_instance(node);
        let new = vm.alloc_instance(node);
        let a = vm.alloc_instance(node);
        vm.set_reference(a, next, Some(old));
        let array = vm.alloc_object_array(vec![None, Some(old)]);
        vm.set_reference(holder_class, shared, Some(old));
        // The class loader is native data of the class, and is left alone.
        vm.class_mut(holder_class).class_loader = Some(old);

        vm.add_root(old, RootInfo::new(RootType::JniGlobal));
        vm.add_root(a, RootInfo::new(RootType::JniGlobal));
        vm.add_root(array, RootInfo::new(RootType::JniGlobal));
        let frame = |vreg, depth| JavaFrameInfo {
            vreg,
            dex_pc: None,
            depth,
            method: None,
        };
        vm.add_root(old, RootInfo::java_frame(3, frame(VRegSlot::Register(0), 0)));
        vm.add_root(old, RootInfo::java_frame(3, frame(VRegSlot::Register(1), 1)));
        vm.add_root(old, RootInfo::java_frame(4, frame(VRegSlot::MethodDeclaringClass, 0)));
        vm.add_weak_global(old);
        Heap {
            old,
            new,
            holder_class,
            shared,
            next,
            a,
            array,
        }
    })
}

fn replace(heapti: &HeapTi<MockVM>, old: ObjectReference, new: ObjectReference) {
    let mut map = ObjectMap::new();
    map.insert(old, new);
    ti_api::replace_references(heapti, TLS, &map);
}

#[test]
pub fn references_are_redirected() {
    with_mockvm(
        default_setup,
        || {
            let heapti = heapti_for_test();
            let heap = build_heap();
            replace(&heapti, heap.old, heap.new);

            read_mockvm(|vm| {
                assert_eq!(vm.get_reference(heap.a, heap.next), Some(heap.new));
                assert_eq!(vm.elements(heap.array), &[None, Some(heap.new)]);
                assert_eq!(vm.get_reference(heap.holder_class, heap.shared), Some(heap.new));
                assert_eq!(vm.class(heap.holder_class).class_loader, Some(heap.old));
                assert_eq!(vm.weak_globals, vec![heap.new]);

                let roots: Vec<ObjectReference> = vm.roots.iter().map(|(root, _)| *root).collect();
                assert_eq!(
                    roots,
                    vec![heap.new, heap.a, heap.array, heap.new, heap.new, heap.old]
                );

                // One barrier per rewritten slot.
                assert_eq!(vm.write_barrier.call_count(), 3);
                // Thread 3 once, and not thread 4.
                assert_eq!(vm.instrument_thread_stack.call_count(), 1);

                assert_eq!(vm.enter_gc_critical_section.call_count(), 1);
                assert_eq!(vm.exit_gc_critical_section.call_count(), 1);
                assert_eq!(vm.stop_all_mutators.call_count(), 1);
                assert_eq!(vm.resume_mutators.call_count(), 1);
            });
        },
        no_cleanup,
    )
}

#[test]
pub fn thread_stacks_are_instrumented_per_thread() {
    with_mockvm(
        || {
            let mut vm = MockVM::default();
            vm.instrument_thread_stack = MockMethod::new_fixed(Box::new(|thread_id: ThreadId| {
                assert_eq!(thread_id, 3);
            }));
            vm
        },
        || {
            let heapti = heapti_for_test();
            let heap = build_heap();
            replace(&heapti, heap.old, heap.new);
            assert_eq!(read_mockvm(|vm| vm.instrument_thread_stack.call_count()), 1);
        },
        no_cleanup,
    )
}

#[test]
pub fn classes_keep_their_hierarchy() {
    with_mockvm(
        default_setup,
        || {
            let heapti = heapti_for_test();
            let (base, replacement, sub, instance, holder, field) = write_mockvm(|vm| {
                let base = vm.define_class("Base", None);
                let replacement = vm.define_class("Base$Redefined", None);
                let sub = vm.define_class("Sub", Some(base));
                let instance = vm.alloc_instance(base);
                let holder = vm.define_class("Holder", None);
                let field = vm.add_static_field(holder, "klass", FieldType::Reference);
                vm.set_reference(holder, field, Some(base));
                (base, replacement, sub, instance, holder, field)
            });
            replace(&heapti, base, replacement);

            read_mockvm(|vm| {
                assert_eq!(vm.object(instance).class, base);
                assert_eq!(vm.class(sub).super_class, Some(base));
                assert_eq!(vm.get_reference(holder, field), Some(replacement));
            });
        },
        no_cleanup,
    )
}

#[test]
pub fn tags_are_swapped_by_default() {
    with_mockvm(
        default_setup,
        || {
            let heapti = heapti_for_test();
            let env1 = heapti.create_env(Capabilities::all());
            let env2 = heapti.create_env(Capabilities::all());
            let heap = build_heap();
            ti_api::set_tag(&env1, Some(heap.old), 5).unwrap();
            ti_api::set_tag(&env1, Some(heap.new), 6).unwrap();
            ti_api::set_tag(&env2, Some(heap.old), 7).unwrap();

            replace(&heapti, heap.old, heap.new);

            assert_eq!(ti_api::get_tag(&env1, Some(heap.old)), Ok(6));
            assert_eq!(ti_api::get_tag(&env1, Some(heap.new)), Ok(5));
            assert_eq!(ti_api::get_tag(&env2, Some(heap.old)), Ok(0));
            assert_eq!(ti_api::get_tag(&env2, Some(heap.new)), Ok(7));
            assert_eq!(env2.tag_table().len(), 1);
        },
        no_cleanup,
    )
}

#[test]
pub fn obsolete_object_callback_decides_tags() {
    with_mockvm(
        default_setup,
        || {
            let heapti = heapti_for_test();
            let env = heapti.create_env(Capabilities::all());
            let heap = build_heap();
            ti_api::set_tag(&env, Some(heap.old), 5).unwrap();

            env.set_obsolete_object_created_callback(Some(Arc::new(
                |old_tag: &mut Tag, new_tag: &mut Tag| {
                    assert_eq!(*old_tag, 5);
                    assert_eq!(*new_tag, 0);
                    *old_tag = 100;
                    *new_tag = 200;
                },
            )));
            // Without the event, the callback is not used.
            replace(&heapti, heap.old, heap.new);
            assert_eq!(ti_api::get_tag(&env, Some(heap.new)), Ok(5));
            assert_eq!(ti_api::get_tag(&env, Some(heap.old)), Ok(0));

            ti_api::set_tag(&env, Some(heap.new), 0).unwrap();
            ti_api::set_tag(&env, Some(heap.old), 5).unwrap();
            env.set_event_enabled(TiEvent::ObsoleteObjectCreated, true)
                .unwrap();
            replace(&heapti, heap.old, heap.new);
            assert_eq!(ti_api::get_tag(&env, Some(heap.old)), Ok(100));
            assert_eq!(ti_api::get_tag(&env, Some(heap.new)), Ok(200));
        },
        no_cleanup,
    )
}

#[test]
pub fn empty_map_does_nothing() {
    with_mockvm(
        default_setup,
        || {
            let heapti = heapti_for_test();
            build_heap();
            ti_api::replace_references(&heapti, TLS, &ObjectMap::new());
            read_mockvm(|vm| {
                assert!(!vm.stop_all_mutators.is_called());
                assert!(!vm.write_barrier.is_called());
            });
        },
        no_cleanup,
    )
}
