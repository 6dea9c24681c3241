use super::mock_test_prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{HashMap, HashSet, VecDeque};

const NODES: usize = 300;
const FIELDS: usize = 3;
const ROOTS: usize = 4;

struct RandomGraph {
    nodes: Vec<ObjectReference>,
    edges: Vec<Vec<Option<usize>>>,
    roots: Vec<usize>,
}

fn build_random_graph(seed: u64) -> RandomGraph {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let edges: Vec<Vec<Option<usize>>> = (0..NODES)
        .map(|_| {
            (0..FIELDS)
                .map(|_| {
                    if rng.random_bool(0.3) {
                        None
                    } else {
                        Some(rng.random_range(0..NODES))
                    }
                })
                .collect()
        })
        .collect();
    let roots: Vec<usize> = (0..ROOTS).map(|_| rng.random_range(0..NODES)).collect();

    let nodes = write_mockvm(|vm| {
        let class = vm.define_class("Node", None);
        let fields: Vec<MockFieldId> = (0..FIELDS)
            .map(|i| vm.add_instance_field(class, &format!("f{}", i), FieldType::Reference))
            .collect();
        let nodes: Vec<ObjectReference> = (0..NODES).map(|_| vm.alloc_instance(class)).collect();
        for (from, targets) in edges.iter().enumerate() {
            for (field, target) in fields.iter().zip(targets) {
                vm.set_reference(nodes[from], *field, target.map(|t| nodes[t]));
            }
        }
        for root in roots.iter() {
            vm.add_root(nodes[*root], RootInfo::new(RootType::JniGlobal));
        }
        nodes
    });
    RandomGraph {
        nodes,
        edges,
        roots,
    }
}

fn reachable(graph: &RandomGraph) -> HashSet<usize> {
    let mut seen: HashSet<usize> = graph.roots.iter().copied().collect();
    let mut queue: VecDeque<usize> = seen.iter().copied().collect();
    while let Some(node) = queue.pop_front() {
        for target in graph.edges[node].iter().flatten() {
            if seen.insert(*target) {
                queue.push_back(*target);
            }
        }
    }
    seen
}

/// Walk the graph, and count for each tag how many times an object with that tag reported its
/// class, i.e. how many times it was expanded.
fn count_expansions(heapti: &HeapTi<MockVM>, env: &TiEnv) -> HashMap<Tag, usize> {
    let mut expansions: HashMap<Tag, usize> = HashMap::new();
    let mut callbacks = HeapCallbacks::new().heap_reference(
        |reference: &HeapReference, tags: &mut ReferenceTags| {
            if reference.kind == HeapReferenceKind::Class {
                *expansions.entry(tags.referrer_tag().unwrap()).or_default() += 1;
            }
            VisitControl::VISIT_OBJECTS
        },
    );
    ti_api::follow_references(heapti, env, TLS, 0, None, None, &mut callbacks).unwrap();
    drop(callbacks);
    expansions
}

fn check_visits_once(heapti: HeapTi<MockVM>) {
    let env = heapti.create_env(Capabilities::all());
    let graph = build_random_graph(42);
    for (i, node) in graph.nodes.iter().enumerate() {
        ti_api::set_tag(&env, Some(*node), i as Tag + 1).unwrap();
    }

    let expansions = count_expansions(&heapti, &env);
    let expected: HashMap<Tag, usize> = reachable(&graph)
        .into_iter()
        .map(|node| (node as Tag + 1, 1))
        .collect();
    assert_eq!(expansions, expected);
}

#[test]
pub fn each_object_is_expanded_once() {
    with_mockvm(
        default_setup,
        || check_visits_once(heapti_for_test()),
        no_cleanup,
    )
}

#[test]
pub fn each_object_is_expanded_once_with_compaction() {
    with_mockvm(
        default_setup,
        || {
            let mut builder = HeapTiBuilder::new_no_env_vars();
            assert!(builder.set_option("worklist_compaction_threshold", "3"));
            check_visits_once(builder.build::<MockVM>());
        },
        no_cleanup,
    )
}
