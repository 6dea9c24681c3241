use super::mock_test_prelude::*;

struct Classes {
    i: ObjectReference,
    k: ObjectReference,
    k_instance: ObjectReference,
}

// interface I { static int a; static int b; }
// class K implements I { static int ks; int kf; }
fn setup_classes() -> Classes {
    write_mockvm(|vm| {
        let int = FieldType::Primitive(PrimitiveType::Int);
        let i = vm.define_interface("I");
        let a = vm.add_static_field(i, "a", int);
        let b = vm.add_static_field(i, "b", int);
        vm.set_primitive(i, a, JValue::Int(1));
        vm.set_primitive(i, b, JValue::Int(2));

        let k = vm.define_class("K", None);
        vm.add_interface(k, i);
        let ks = vm.add_static_field(k, "ks", int);
        vm.set_primitive(k, ks, JValue::Int(3));
        let kf = vm.add_instance_field(k, "kf", int);
        let k_instance = vm.alloc_instance(k);
        vm.set_primitive(k_instance, kf, JValue::Int(4));
        Classes { i, k, k_instance }
    })
}

fn check_indices(heapti: &HeapTi<MockVM>, classes: &Classes) {
    assert_eq!(
        ti_api::dump_object_fields(heapti, TLS, classes.i),
        vec!["static primitive a @ 0", "static primitive b @ 1"]
    );
    // Interface statics come first.
    assert_eq!(
        ti_api::dump_object_fields(heapti, TLS, classes.k),
        vec!["static primitive ks @ 2"]
    );
    assert_eq!(
        ti_api::dump_object_fields(heapti, TLS, classes.k_instance),
        vec!["static primitive ks @ 2", "instance primitive kf @ 3"]
    );
}

#[test]
pub fn interface_statics_shift_indices() {
    with_mockvm(
        default_setup,
        || {
            let heapti = heapti_for_test();
            let classes = setup_classes();
            check_indices(&heapti, &classes);
            // Twice, to read the cached counts.
            check_indices(&heapti, &classes);
            assert!(!heapti.index_cache().is_empty());
        },
        no_cleanup,
    )
}

#[test]
pub fn indices_without_cache() {
    with_mockvm(
        default_setup,
        || {
            let mut builder = HeapTiBuilder::new_no_env_vars();
            assert!(builder.set_option("cache_interface_field_counts", "false"));
            let heapti = builder.build::<MockVM>();
            let classes = setup_classes();
            check_indices(&heapti, &classes);
            assert!(heapti.index_cache().is_empty());
        },
        no_cleanup,
    )
}

#[test]
pub fn primitive_field_reports_use_indices() {
    with_mockvm(
        default_setup,
        || {
            let heapti = heapti_for_test();
            let env = heapti.create_env(Capabilities::all());
            let classes = setup_classes();
            ti_api::set_tag(&env, Some(classes.k), 100).unwrap();

            let mut reports = vec![];
            let mut callbacks = HeapCallbacks::new().primitive_field(
                |kind, class_tag, tag: &mut Tag, value, value_type| {
                    reports.push((kind, class_tag, *tag, value, value_type));
                    *tag = 5;
                    VisitControl::NONE
                },
            );
            ti_api::iterate_through_heap(&heapti, &env, TLS, 0, Some(classes.k), &mut callbacks)
                .unwrap();
            drop(callbacks);

            // Only the instance field of the instance. The statics belong to the class object.
            assert_eq!(
                reports,
                vec![(
                    HeapReferenceKind::Field { index: 3 },
                    100,
                    0,
                    JValue::Int(4),
                    PrimitiveType::Int
                )]
            );
            assert_eq!(ti_api::get_tag(&env, Some(classes.k_instance)), Ok(5));
        },
        no_cleanup,
    )
}

#[test]
pub fn unresolved_classes_have_no_fields() {
    with_mockvm(
        default_setup,
        || {
            let heapti = heapti_for_test();
            let classes = setup_classes();
            write_mockvm(|vm| vm.class_mut(classes.k).resolved = false);
            assert!(ti_api::dump_object_fields(&heapti, TLS, classes.k).is_empty());
        },
        no_cleanup,
    )
}
