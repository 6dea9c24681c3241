use super::mock_test_prelude::*;
use std::sync::{Arc, Mutex};

// `live` is rooted, `dead` is not.
fn build_heap() -> (ObjectReference, ObjectReference) {
    write_mockvm(|vm| {
        let class = vm.define_class("Thing", None);
        let live = vm.alloc_instance(class);
        let dead = vm.alloc_instance(class);
        vm.add_root(live, RootInfo::new(RootType::JniGlobal));
        vm.add_weak_global(dead);
        (live, dead)
    })
}

#[test]
pub fn dead_objects_lose_their_tags() {
    with_mockvm(
        default_setup,
        || {
            let heapti = heapti_for_test();
            let env = heapti.create_env(Capabilities::all());
            let (live, dead) = build_heap();
            ti_api::set_tag(&env, Some(live), 1).unwrap();
            ti_api::set_tag(&env, Some(dead), 2).unwrap();

            ti_api::force_garbage_collection::<MockVM>(TLS);

            read_mockvm(|vm| {
                assert_eq!(vm.collect_garbage.call_count(), 1);
                assert!(vm.is_live(live));
                assert!(!vm.is_live(dead));
                assert!(vm.weak_globals.is_empty());
            });
            assert_eq!(ti_api::get_objects_with_tags(&env, &[]), Ok(vec![(live, 1)]));
        },
        no_cleanup,
    )
}

#[test]
pub fn object_free_events() {
    with_mockvm(
        default_setup,
        || {
            let heapti = heapti_for_test();
            let env = heapti.create_env(Capabilities::all());
            let freed: Arc<Mutex<Vec<Tag>>> = Arc::new(Mutex::new(vec![]));
            let freed_clone = freed.clone();
            env.set_object_free_callback(Some(Arc::new(move |tag: Tag| {
                freed_clone.lock().unwrap().push(tag);
            })))
            .unwrap();

            // Not enabled yet.
            let (_, dead) = build_heap();
            ti_api::set_tag(&env, Some(dead), 2).unwrap();
            ti_api::force_garbage_collection::<MockVM>(TLS);
            assert!(freed.lock().unwrap().is_empty());

            env.set_event_enabled(TiEvent::ObjectFree, true).unwrap();
            let (live, dead) = build_heap();
            ti_api::set_tag(&env, Some(live), 3).unwrap();
            ti_api::set_tag(&env, Some(dead), 4).unwrap();
            ti_api::force_garbage_collection::<MockVM>(TLS);
            assert_eq!(*freed.lock().unwrap(), vec![4]);

            env.set_event_enabled(TiEvent::ObjectFree, false).unwrap();
            write_mockvm(|vm| vm.roots.clear());
            ti_api::force_garbage_collection::<MockVM>(TLS);
            assert_eq!(*freed.lock().unwrap(), vec![4]);
            assert!(env.tag_table().is_empty());
        },
        no_cleanup,
    )
}

#[test]
pub fn object_free_needs_capability() {
    with_mockvm(
        default_setup,
        || {
            let heapti = heapti_for_test();
            let env = heapti.create_env(Capabilities {
                can_tag_objects: true,
                can_generate_object_free_events: false,
            });
            assert_eq!(
                env.set_object_free_callback(Some(Arc::new(|_tag: Tag| {}))),
                Err(TiError::MustPossessCapability)
            );
            assert_eq!(
                env.set_event_enabled(TiEvent::ObjectFree, true),
                Err(TiError::MustPossessCapability)
            );
            assert!(!env.is_event_enabled(TiEvent::ObjectFree));
        },
        no_cleanup,
    )
}

#[test]
pub fn tags_follow_moved_objects() {
    with_mockvm(
        || {
            let mut vm = MockVM::default();
            vm.moving_gc = true;
            vm
        },
        || {
            let heapti = heapti_for_test();
            let env = heapti.create_env(Capabilities::all());
            let (live, dead) = build_heap();
            ti_api::set_tag(&env, Some(live), 1).unwrap();
            ti_api::set_tag(&env, Some(dead), 2).unwrap();

            ti_api::force_garbage_collection::<MockVM>(TLS);

            let moved = read_mockvm(|vm| vm.roots[0].0);
            assert_ne!(moved, live);
            assert!(read_mockvm(|vm| !vm.is_live(live)));
            assert_eq!(ti_api::get_tag(&env, Some(moved)), Ok(1));
            assert_eq!(ti_api::get_objects_with_tags(&env, &[]), Ok(vec![(moved, 1)]));
            assert_eq!(ti_api::get_object_heap_id::<MockVM>(&env, TLS, 1), Ok(HeapId::App));
        },
        no_cleanup,
    )
}
