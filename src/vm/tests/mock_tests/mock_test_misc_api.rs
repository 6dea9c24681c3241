use super::mock_test_prelude::*;

#[test]
pub fn loaded_classes() {
    with_mockvm(
        default_setup,
        || {
            let (loaded, pending) = write_mockvm(|vm| {
                let loaded = vm.define_class("Loaded", None);
                let pending = vm.define_class("Pending", None);
                vm.class_mut(pending).loaded = false;
                (loaded, pending)
            });

            let classes = ti_api::get_loaded_classes::<MockVM>(TLS);
            assert!(classes.contains(&loaded));
            assert!(!classes.contains(&pending));
            read_mockvm(|vm| {
                assert!(classes.contains(&vm.object_class));
                assert!(classes.contains(&vm.string_class));
                assert_eq!(vm.acquire_heap_shared.call_count(), 1);
                assert_eq!(vm.release_heap_shared.call_count(), 1);
            });
        },
        no_cleanup,
    )
}

#[test]
pub fn force_garbage_collection() {
    with_mockvm(
        || {
            let mut vm = MockVM::default();
            vm.collect_garbage =
                MockMethod::new_fixed(Box::new(|(_, clear_soft): (VMThread, bool)| {
                    assert!(!clear_soft);
                }));
            vm
        },
        || {
            ti_api::force_garbage_collection::<MockVM>(TLS);
            assert_eq!(read_mockvm(|vm| vm.collect_garbage.call_count()), 1);
        },
        no_cleanup,
    )
}

#[test]
pub fn init_applies_options() {
    with_mockvm(
        default_setup,
        || {
            let mut builder = HeapTiBuilder::new_no_env_vars();
            assert!(builder.set_option("report_buffer_limit", "64"));
            let heapti = ti_api::heapti_init::<MockVM>(&builder);
            assert_eq!(heapti.options().report_buffer_limit, 64);

            let env = heapti.create_env(Capabilities::all());
            assert!(env.capabilities().can_tag_objects);
            heapti.dispose_env(&env);
        },
        no_cleanup,
    )
}

#[test]
pub fn dump_fields_of_plain_objects() {
    with_mockvm(
        default_setup,
        || {
            let heapti = heapti_for_test();
            let (empty, holder) = write_mockvm(|vm| {
                let empty_class = vm.define_class("Empty", None);
                let holder_class = vm.define_class("Holder", None);
                let field = vm.add_instance_field(holder_class, "value", FieldType::Reference);
                let empty = vm.alloc_instance(empty_class);
                let holder = vm.alloc_instance(holder_class);
                vm.set_reference(holder, field, Some(empty));
                (empty, holder)
            });
            assert!(ti_api::dump_object_fields(&heapti, TLS, empty).is_empty());
            assert_eq!(
                ti_api::dump_object_fields(&heapti, TLS, holder),
                vec!["instance ref value @ 0"]
            );
        },
        no_cleanup,
    )
}
