use super::mock_test_prelude::*;

fn ints(values: &[i32]) -> Vec<JValue> {
    values.iter().map(|v| JValue::Int(*v)).collect()
}

struct Heap {
    array: ObjectReference,
    holder: ObjectReference,
    field: MockFieldId,
}

// An int array held by a root and by a field, with a lock word.
fn build_heap(values: &[i32]) -> Heap {
    write_mockvm(|vm| {
        let array = vm.alloc_primitive_array(PrimitiveType::Int, ints(values));
        vm.object_mut(array).lock_word = 0xabc;
        let class = vm.define_class("Holder", None);
        let field = vm.add_instance_field(class, "array", FieldType::Reference);
        let holder = vm.alloc_instance(class);
        vm.set_reference(holder, field, Some(array));
        vm.add_root(array, RootInfo::new(RootType::JniGlobal));
        Heap {
            array,
            holder,
            field,
        }
    })
}

fn resized(heap: &Heap) -> ObjectReference {
    read_mockvm(|vm| vm.get_reference(heap.holder, heap.field)).unwrap()
}

#[test]
pub fn grow() {
    with_mockvm(
        default_setup,
        || {
            let heapti = heapti_for_test();
            let env = heapti.create_env(Capabilities::all());
            let heap = build_heap(&[1, 2, 3]);
            ti_api::set_tag(&env, Some(heap.array), 7).unwrap();

            assert_eq!(
                ti_api::change_array_size(&heapti, &env, TLS, Some(heap.array), 5),
                Ok(())
            );

            let new_array = resized(&heap);
            assert_ne!(new_array, heap.array);
            read_mockvm(|vm| {
                assert_eq!(vm.primitive_elements(new_array), ints(&[1, 2, 3, 0, 0]).as_slice());
                assert_eq!(vm.object(new_array).class, vm.object(heap.array).class);
                assert_eq!(vm.roots[0].0, new_array);
                assert_eq!(vm.object(new_array).lock_word, 0xabc);
                assert_eq!(vm.object(heap.array).lock_word, 0);

                assert_eq!(vm.suspend_user_code.call_count(), 1);
                assert_eq!(vm.resume_user_code.call_count(), 1);
                assert_eq!(vm.enter_gc_critical_section.call_count(), 1);
                assert_eq!(vm.exit_gc_critical_section.call_count(), 1);
                assert_eq!(vm.stop_all_mutators.call_count(), 1);
                assert_eq!(vm.resume_mutators.call_count(), 1);
            });
            // The tag moves to the new array.
            assert_eq!(ti_api::get_tag(&env, Some(new_array)), Ok(7));
            assert_eq!(ti_api::get_tag(&env, Some(heap.array)), Ok(0));
        },
        no_cleanup,
    )
}

#[test]
pub fn shrink() {
    with_mockvm(
        default_setup,
        || {
            let heapti = heapti_for_test();
            let env = heapti.create_env(Capabilities::all());
            let heap = build_heap(&[1, 2, 3]);
            ti_api::change_array_size(&heapti, &env, TLS, Some(heap.array), 2).unwrap();
            let new_array = resized(&heap);
            assert_eq!(
                read_mockvm(|vm| vm.primitive_elements(new_array).to_vec()),
                ints(&[1, 2])
            );

            ti_api::change_array_size(&heapti, &env, TLS, Some(new_array), 0).unwrap();
            let empty = resized(&heap);
            assert!(read_mockvm(|vm| vm.primitive_elements(empty).is_empty()));
        },
        no_cleanup,
    )
}

#[test]
pub fn reference_arrays() {
    with_mockvm(
        default_setup,
        || {
            let heapti = heapti_for_test();
            let env = heapti.create_env(Capabilities::all());
            let (array, a, b) = write_mockvm(|vm| {
                let class = vm.define_class("Element", None);
                let a = vm.alloc_instance(class);
                let b = vm.alloc_instance(class);
                let array = vm.alloc_object_array(vec![Some(a), None, Some(b)]);
                vm.add_root(array, RootInfo::new(RootType::JniGlobal));
                (array, a, b)
            });

            ti_api::change_array_size(&heapti, &env, TLS, Some(array), 4).unwrap();
            let grown = read_mockvm(|vm| vm.roots[0].0);
            assert_eq!(
                read_mockvm(|vm| vm.elements(grown).to_vec()),
                vec![Some(a), None, Some(b), None]
            );

            ti_api::change_array_size(&heapti, &env, TLS, Some(grown), 1).unwrap();
            let shrunk = read_mockvm(|vm| vm.roots[0].0);
            assert_eq!(read_mockvm(|vm| vm.elements(shrunk).to_vec()), vec![Some(a)]);
        },
        no_cleanup,
    )
}

#[test]
pub fn errors() {
    with_mockvm(
        default_setup,
        || {
            let heapti = heapti_for_test();
            let env = heapti.create_env(Capabilities::all());
            let heap = build_heap(&[1, 2, 3]);

            assert_eq!(
                ti_api::change_array_size(&heapti, &env, TLS, None, 1),
                Err(TiError::NullPointer)
            );
            assert_eq!(
                ti_api::change_array_size(&heapti, &env, TLS, Some(heap.holder), 1),
                Err(TiError::IllegalArgument)
            );
            assert_eq!(
                ti_api::change_array_size(&heapti, &env, TLS, Some(heap.array), -1),
                Err(TiError::IllegalArgument)
            );
            write_mockvm(|vm| vm.fail_allocation = true);
            assert_eq!(
                ti_api::change_array_size(&heapti, &env, TLS, Some(heap.array), 10),
                Err(TiError::OutOfMemory)
            );

            read_mockvm(|vm| {
                // Every attempt suspended user code, and nothing else.
                assert_eq!(vm.suspend_user_code.call_count(), 4);
                assert_eq!(vm.resume_user_code.call_count(), 4);
                assert!(!vm.stop_all_mutators.is_called());
                assert!(!vm.enter_gc_critical_section.is_called());
                assert_eq!(vm.roots[0].0, heap.array);
            });
        },
        no_cleanup,
    )
}
