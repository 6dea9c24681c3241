use super::mock_test_prelude::*;

#[test]
pub fn objects_are_classified_by_space() {
    with_mockvm(
        default_setup,
        || {
            let heapti = heapti_for_test();
            let env = heapti.create_env(Capabilities::all());
            let spaces = [
                (SpaceKind::Default, HeapId::App),
                (SpaceKind::Zygote, HeapId::Zygote),
                (SpaceKind::BootImage, HeapId::Image),
                (SpaceKind::AppImage, HeapId::App),
                (SpaceKind::LargeObject { zygote: true }, HeapId::Zygote),
                (SpaceKind::LargeObject { zygote: false }, HeapId::App),
            ];
            let objects: Vec<ObjectReference> = write_mockvm(|vm| {
                let class = vm.define_class("Thing", None);
                spaces
                    .iter()
                    .map(|(space, _)| {
                        let object = vm.alloc_instance(class);
                        vm.object_mut(object).space = *space;
                        object
                    })
                    .collect()
            });
            for (i, object) in objects.iter().enumerate() {
                ti_api::set_tag(&env, Some(*object), i as Tag + 1).unwrap();
            }

            for (i, (_, heap)) in spaces.iter().enumerate() {
                assert_eq!(
                    ti_api::get_object_heap_id::<MockVM>(&env, TLS, i as Tag + 1),
                    Ok(*heap)
                );
            }
            read_mockvm(|vm| {
                assert_eq!(vm.acquire_heap_shared.call_count(), spaces.len());
                assert_eq!(vm.release_heap_shared.call_count(), spaces.len());
            });
        },
        no_cleanup,
    )
}

#[test]
pub fn unknown_tag_is_not_found() {
    with_mockvm(
        default_setup,
        || {
            let heapti = heapti_for_test();
            let env = heapti.create_env(Capabilities::all());
            assert_eq!(
                ti_api::get_object_heap_id::<MockVM>(&env, TLS, 1234),
                Err(TiError::NotFound)
            );
        },
        no_cleanup,
    )
}

#[test]
pub fn heap_names_match_ids() {
    for heap in [HeapId::Default, HeapId::Image, HeapId::Zygote, HeapId::App] {
        assert_eq!(ti_api::get_heap_name(heap as i32), Ok(heap.name()));
    }
    assert_eq!(ti_api::get_heap_name(7), Err(TiError::IllegalArgument));
}
