use super::mock_test_prelude::*;

struct Heap {
    point: ObjectReference,
    p: ObjectReference,
    q: ObjectReference,
    sub: ObjectReference,
    ascii: ObjectReference,
    wide: ObjectReference,
    empty_string: ObjectReference,
    ints: ObjectReference,
    empty_bytes: ObjectReference,
}

fn build_heap() -> Heap {
    write_mockvm(|vm| {
        let point = vm.define_class("Point", None);
        let x = vm.add_instance_field(point, "x", FieldType::Primitive(PrimitiveType::Int));
        vm.add_instance_field(point, "y", FieldType::Primitive(PrimitiveType::Long));
        let sub_point = vm.define_class("SubPoint", Some(point));
        let p = vm.alloc_instance(point);
        let q = vm.alloc_instance(point);
        vm.set_primitive(q, x, JValue::Int(7));
        let sub = vm.alloc_instance(sub_point);
        Heap {
            point,
            p,
            q,
            sub,
            ascii: vm.alloc_string("abc"),
            wide: vm.alloc_string("h\u{e9}llo\u{4e16}"),
            empty_string: vm.alloc_string(""),
            ints: vm.alloc_primitive_array(
                PrimitiveType::Int,
                vec![JValue::Int(1), JValue::Int(2), JValue::Int(3)],
            ),
            empty_bytes: vm.alloc_primitive_array(PrimitiveType::Byte, vec![]),
        }
    })
}

#[test]
pub fn every_object_is_reported() {
    with_mockvm(
        default_setup,
        || {
            let heapti = heapti_for_test();
            let env = heapti.create_env(Capabilities::all());
            let heap = build_heap();
            ti_api::set_tag(&env, Some(heap.point), 1).unwrap();
            ti_api::set_tag(&env, Some(heap.ints), 2).unwrap();

            let mut reports = vec![];
            let mut callbacks = HeapCallbacks::new().heap_iteration(
                |class_tag, size, tag: &mut Tag, length| {
                    reports.push((class_tag, size, *tag, length));
                    VisitControl::NONE
                },
            );
            ti_api::iterate_through_heap(&heapti, &env, TLS, 0, None, &mut callbacks).unwrap();
            drop(callbacks);

            assert_eq!(reports.len(), read_mockvm(|vm| vm.objects.len()));
            // Instances of Point: two fields each.
            assert_eq!(reports.iter().filter(|r| r.0 == 1).count(), 2);
            assert!(reports.contains(&(1, 32, 0, None)));
            assert!(reports.contains(&(0, 16 + 4 * 3, 2, Some(3))));
            read_mockvm(|vm| {
                assert_eq!(vm.acquire_heap_shared.call_count(), 1);
                assert_eq!(vm.release_heap_shared.call_count(), 1);
                assert!(!vm.stop_all_mutators.is_called());
            });
        },
        no_cleanup,
    )
}

#[test]
pub fn class_filter_is_exact() {
    with_mockvm(
        default_setup,
        || {
            let heapti = heapti_for_test();
            let env = heapti.create_env(Capabilities::all());
            let heap = build_heap();
            ti_api::set_tag(&env, Some(heap.p), 10).unwrap();
            ti_api::set_tag(&env, Some(heap.q), 20).unwrap();
            ti_api::set_tag(&env, Some(heap.sub), 30).unwrap();

            let mut tags = vec![];
            let mut callbacks = HeapCallbacks::new().heap_iteration(
                |_class_tag, _size, tag: &mut Tag, _length| {
                    tags.push(*tag);
                    VisitControl::NONE
                },
            );
            ti_api::iterate_through_heap(&heapti, &env, TLS, 0, Some(heap.point), &mut callbacks)
                .unwrap();
            drop(callbacks);
            tags.sort();
            assert_eq!(tags, vec![10, 20]);

            assert_eq!(
                ti_api::iterate_through_heap(
                    &heapti,
                    &env,
                    TLS,
                    0,
                    Some(heap.p),
                    &mut HeapCallbacks::new()
                ),
                Err(TiError::InvalidClass)
            );
        },
        no_cleanup,
    )
}

#[test]
pub fn retag_during_iteration() {
    with_mockvm(
        default_setup,
        || {
            let heapti = heapti_for_test();
            let env = heapti.create_env(Capabilities::all());
            let heap = build_heap();
            ti_api::set_tag(&env, Some(heap.q), 42).unwrap();

            let mut callbacks = HeapCallbacks::new().heap_iteration(
                |_class_tag, _size, tag: &mut Tag, _length| {
                    if *tag == 42 {
                        *tag = 99;
                    }
                    VisitControl::NONE
                },
            );
            ti_api::iterate_through_heap(&heapti, &env, TLS, 0, None, &mut callbacks).unwrap();
            drop(callbacks);

            assert_eq!(ti_api::get_tag(&env, Some(heap.q)), Ok(99));
            assert_eq!(ti_api::get_objects_with_tags(&env, &[42]), Ok(vec![]));
            assert_eq!(ti_api::get_objects_with_tags(&env, &[99]), Ok(vec![(heap.q, 99)]));
        },
        no_cleanup,
    )
}

#[test]
pub fn heap_filter() {
    with_mockvm(
        default_setup,
        || {
            let heapti = heapti_for_test();
            let env = heapti.create_env(Capabilities::all());
            let heap = build_heap();
            ti_api::set_tag(&env, Some(heap.point), 1).unwrap();
            ti_api::set_tag(&env, Some(heap.p), 10).unwrap();

            let count_reports = |heap_filter: i32| {
                let mut reports = vec![];
                let mut callbacks = HeapCallbacks::new().heap_iteration(
                    |class_tag, _size, tag: &mut Tag, _length| {
                        reports.push((class_tag, *tag));
                        VisitControl::NONE
                    },
                );
                ti_api::iterate_through_heap(&heapti, &env, TLS, heap_filter, None, &mut callbacks)
                    .unwrap();
                drop(callbacks);
                reports
            };

            assert_eq!(count_reports(HEAP_FILTER_UNTAGGED), vec![(0, 1), (1, 10)]);
            assert_eq!(
                count_reports(HEAP_FILTER_CLASS_UNTAGGED),
                vec![(1, 10), (1, 0)]
            );
            assert_eq!(
                count_reports(HEAP_FILTER_UNTAGGED | HEAP_FILTER_CLASS_UNTAGGED),
                vec![(1, 10)]
            );
            let total = read_mockvm(|vm| vm.objects.len());
            assert_eq!(count_reports(HEAP_FILTER_TAGGED).len(), total - 2);
        },
        no_cleanup,
    )
}

#[test]
pub fn string_and_array_contents() {
    with_mockvm(
        default_setup,
        || {
            let heapti = heapti_for_test();
            let env = heapti.create_env(Capabilities::all());
            let heap = build_heap();
            ti_api::set_tag(&env, Some(heap.ascii), 1).unwrap();
            ti_api::set_tag(&env, Some(heap.wide), 2).unwrap();
            ti_api::set_tag(&env, Some(heap.empty_string), 3).unwrap();
            ti_api::set_tag(&env, Some(heap.ints), 4).unwrap();
            ti_api::set_tag(&env, Some(heap.empty_bytes), 5).unwrap();

            let mut strings = vec![];
            let mut arrays = vec![];
            let mut callbacks = HeapCallbacks::new()
                .string_primitive_value(|_class_tag, _size, tag: &mut Tag, value: Option<&[u16]>| {
                    strings.push((*tag, value.map(String::from_utf16_lossy)));
                    VisitControl::NONE
                })
                .array_primitive_value(
                    |_class_tag, _size, tag: &mut Tag, length, element_type, data: Option<&[u8]>| {
                        arrays.push((*tag, length, element_type, data.map(|d| d.to_vec())));
                        *tag += 100;
                        VisitControl::NONE
                    },
                );
            ti_api::iterate_through_heap(&heapti, &env, TLS, HEAP_FILTER_UNTAGGED, None, &mut callbacks)
                .unwrap();
            drop(callbacks);

            assert_eq!(
                strings,
                vec![
                    (1, Some("abc".to_string())),
                    (2, Some("h\u{e9}llo\u{4e16}".to_string())),
                    (3, None),
                ]
            );
            let mut ints = vec![];
            for i in 1..=3i32 {
                ints.extend_from_slice(&i.to_ne_bytes());
            }
            assert_eq!(
                arrays,
                vec![
                    (4, 3, PrimitiveType::Int, Some(ints)),
                    (5, 0, PrimitiveType::Byte, None),
                ]
            );
            assert_eq!(ti_api::get_tag(&env, Some(heap.ints)), Ok(104));
        },
        no_cleanup,
    )
}

#[test]
pub fn large_values_are_dropped() {
    with_mockvm(
        default_setup,
        || {
            let mut builder = HeapTiBuilder::new_no_env_vars();
            assert!(builder.set_option("report_buffer_limit", "8"));
            let heapti = builder.build::<MockVM>();
            let env = heapti.create_env(Capabilities::all());
            let heap = build_heap();
            ti_api::set_tag(&env, Some(heap.ascii), 1).unwrap();
            ti_api::set_tag(&env, Some(heap.ints), 4).unwrap();

            let mut strings = vec![];
            let mut arrays = vec![];
            let mut callbacks = HeapCallbacks::new()
                .string_primitive_value(|_class_tag, _size, tag: &mut Tag, _value: Option<&[u16]>| {
                    strings.push(*tag);
                    VisitControl::NONE
                })
                .array_primitive_value(
                    |_class_tag, _size, tag: &mut Tag, _length, _element_type, _data: Option<&[u8]>| {
                        arrays.push(*tag);
                        VisitControl::NONE
                    },
                );
            ti_api::iterate_through_heap(&heapti, &env, TLS, HEAP_FILTER_UNTAGGED, None, &mut callbacks)
                .unwrap();
            drop(callbacks);

            // 3 chars fit in 8 bytes, 3 ints do not.
            assert_eq!(strings, vec![1]);
            assert!(arrays.is_empty());
        },
        no_cleanup,
    )
}

#[test]
pub fn abort_ends_iteration() {
    with_mockvm(
        default_setup,
        || {
            let heapti = heapti_for_test();
            let env = heapti.create_env(Capabilities::all());
            let heap = build_heap();
            ti_api::set_tag(&env, Some(heap.ascii), 1).unwrap();
            ti_api::set_tag(&env, Some(heap.wide), 2).unwrap();

            let mut iterations = 0;
            let mut callbacks = HeapCallbacks::new().heap_iteration(
                |_class_tag, _size, _tag: &mut Tag, _length| {
                    iterations += 1;
                    VisitControl::ABORT
                },
            );
            ti_api::iterate_through_heap(&heapti, &env, TLS, 0, None, &mut callbacks).unwrap();
            drop(callbacks);
            assert_eq!(iterations, 1);

            // An abort from a value callback ends the iteration too.
            let mut strings = vec![];
            let mut callbacks = HeapCallbacks::new().string_primitive_value(
                |_class_tag, _size, tag: &mut Tag, _value: Option<&[u16]>| {
                    strings.push(*tag);
                    VisitControl::ABORT
                },
            );
            ti_api::iterate_through_heap(&heapti, &env, TLS, 0, None, &mut callbacks).unwrap();
            drop(callbacks);
            assert_eq!(strings, vec![1]);
        },
        no_cleanup,
    )
}

#[test]
pub fn ext_reports_heaps() {
    with_mockvm(
        default_setup,
        || {
            let heapti = heapti_for_test();
            let env = heapti.create_env(Capabilities::all());
            let heap = build_heap();
            write_mockvm(|vm| {
                vm.object_mut(heap.p).space = SpaceKind::Zygote;
                vm.object_mut(heap.q).space = SpaceKind::BootImage;
                vm.object_mut(heap.sub).space = SpaceKind::LargeObject { zygote: false };
            });
            ti_api::set_tag(&env, Some(heap.p), 1).unwrap();
            ti_api::set_tag(&env, Some(heap.q), 2).unwrap();
            ti_api::set_tag(&env, Some(heap.sub), 3).unwrap();

            let mut heaps = vec![];
            let mut callbacks = HeapCallbacks::new().heap_iteration_ext(
                |_class_tag, _size, tag: &mut Tag, _length, heap_id| {
                    heaps.push((*tag, heap_id));
                    VisitControl::NONE
                },
            );
            ti_api::iterate_through_heap_ext(&heapti, &env, TLS, HEAP_FILTER_UNTAGGED, None, &mut callbacks)
                .unwrap();
            drop(callbacks);

            assert_eq!(
                heaps,
                vec![(1, HeapId::Zygote), (2, HeapId::Image), (3, HeapId::App)]
            );
        },
        no_cleanup,
    )
}
