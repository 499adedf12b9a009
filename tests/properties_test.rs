//! Whole-tree properties that must hold after any accepted operation

use serde_json::json;

use indtree::domain::{
    normalize_str, DataIndicator, Direction, IndicatorPatch, IndicatorTree, LeafDefaults,
    NewIndicator, SequentialIdGenerator, SupportingMaterial, MAX_LEVEL,
};
use indtree::util::testing::{init_test_setup, sample_tree, tree_from_json};

#[derive(Debug, Clone, Copy)]
enum Op {
    Up,
    Down,
    Promote,
    Demote,
    Delete,
    AddChild,
    AddChildWithRecords,
    AddDataIndicator,
    AddMaterial,
    ReplaceRecords,
    UpdateRecord,
}

const OPS: [Op; 11] = [
    Op::Up,
    Op::Down,
    Op::Promote,
    Op::Demote,
    Op::Delete,
    Op::AddChild,
    Op::AddChildWithRecords,
    Op::AddDataIndicator,
    Op::AddMaterial,
    Op::ReplaceRecords,
    Op::UpdateRecord,
];

/// Apply `op` to `id`. Each call starts a new id generator, the way every
/// command-line invocation does, so generated ids repeat across calls.
fn apply(tree: &IndicatorTree, id: &str, op: Op) -> Option<IndicatorTree> {
    let ids = &mut SequentialIdGenerator::new();
    let defaults = &LeafDefaults::default();
    match op {
        Op::Up => tree.move_node(id, Direction::Up).ok(),
        Op::Down => tree.move_node(id, Direction::Down).ok(),
        Op::Promote => tree.promote(id).ok(),
        Op::Demote => tree.demote(id).ok(),
        Op::Delete => Some(tree.delete(id)),
        Op::AddChild => {
            let level = tree.find(id)?.level + 1;
            tree.add(Some(id), level, NewIndicator::leaf("Added"), ids, defaults)
                .ok()
                .map(|(next, _)| next)
        }
        Op::AddChildWithRecords => {
            let level = tree.find(id)?.level + 1;
            let mut fields = NewIndicator::leaf("Added with records");
            fields.data_indicators =
                vec![DataIndicator::named("Count"), DataIndicator::named(" ")];
            fields.supporting_materials = vec![SupportingMaterial::default()];
            tree.add(Some(id), level, fields, ids, defaults)
                .ok()
                .map(|(next, _)| next)
        }
        Op::AddDataIndicator => tree
            .add_data_indicator(id, DataIndicator::named("Extra"), ids, defaults)
            .ok()
            .map(|(next, _)| next),
        Op::AddMaterial => tree
            .add_supporting_material(id, SupportingMaterial::default(), ids, defaults)
            .ok()
            .map(|(next, _)| next),
        Op::ReplaceRecords => {
            let patch = IndicatorPatch {
                data_indicators: Some(vec![
                    DataIndicator::named("Replaced"),
                    DataIndicator::named(""),
                ]),
                supporting_materials: Some(vec![SupportingMaterial::named("Evidence")]),
                ..IndicatorPatch::default()
            };
            tree.edit(id, patch, ids, defaults).ok()
        }
        Op::UpdateRecord => {
            let record = tree.find(id)?.content()?.data_indicators.first()?.id.clone();
            tree.update_data_indicator(id, &record, defaults, |di| {
                di.threshold_type = None;
                di.precision = None;
            })
            .ok()
        }
    }
}

fn node_ids(tree: &IndicatorTree) -> Vec<String> {
    tree.iter().map(|(_, node)| node.id.clone()).collect()
}

fn assert_well_formed(tree: &IndicatorTree, context: &str) {
    if let Err(violations) = tree.check_invariants() {
        panic!("{}: {:?}", context, violations);
    }
    assert!(tree.depth() <= MAX_LEVEL, "{}: depth {}", context, tree.depth());
    for (idx, node) in tree.iter() {
        let has_children = !tree.children(idx).is_empty();
        assert_eq!(node.is_leaf(), !has_children, "{}: {}", context, node.id);
        assert_eq!(node.is_leaf(), node.content().is_some(), "{}: {}", context, node.id);
    }
}

/// Every tree reachable in two steps from the sample satisfies the invariants.
#[test]
fn given_any_two_operations_when_applied_then_invariants_hold() {
    init_test_setup();
    let mut frontier = vec![sample_tree()];

    for round in 0..2 {
        let mut next_frontier = Vec::new();
        for tree in &frontier {
            for id in node_ids(tree) {
                for op in OPS {
                    if let Some(next) = apply(tree, &id, op) {
                        assert_well_formed(&next, &format!("round {} {:?} {}", round, op, id));
                        next_frontier.push(next);
                    }
                }
            }
        }
        assert!(!next_frontier.is_empty());
        frontier = next_frontier;
    }
}

#[test]
fn given_rejected_operation_when_applied_then_snapshot_is_unchanged() {
    let tree = sample_tree();
    let before = tree.to_document();

    assert!(tree.promote("t").is_err());
    assert!(tree.demote("t2").is_err());
    assert!(tree.move_node("missing", Direction::Up).is_err());

    assert_eq!(tree.to_document(), before);
}

#[test]
fn given_any_reachable_tree_when_recoding_then_nothing_changes() {
    let tree = sample_tree();

    for id in node_ids(&tree) {
        for op in OPS {
            if let Some(next) = apply(&tree, &id, op) {
                let mut again = next.clone();
                again.assign_codes();
                assert_eq!(again.to_document(), next.to_document(), "{:?} {}", op, id);
            }
        }
    }
}

fn assert_round_trips(tree: &IndicatorTree, context: &str) {
    let exported = tree.to_json().unwrap();
    let imported = normalize_str(
        &exported,
        &mut SequentialIdGenerator::new(),
        &LeafDefaults::default(),
    )
    .unwrap_or_else(|err| panic!("{}: {}", context, err));
    assert_eq!(&imported, tree, "{}", context);
}

#[test]
fn given_any_reachable_tree_when_exported_and_imported_then_equal() {
    let mut frontier = vec![sample_tree()];

    for round in 0..2 {
        let mut next_frontier = Vec::new();
        for tree in &frontier {
            for id in node_ids(tree) {
                for op in OPS {
                    if let Some(next) = apply(tree, &id, op) {
                        assert_round_trips(&next, &format!("round {} {:?} {}", round, op, id));
                        next_frontier.push(next);
                    }
                }
            }
        }
        frontier = next_frontier;
    }
}

/// Records added to different leaves by separate sessions never share an id.
#[test]
fn given_records_added_to_two_leaves_by_fresh_sessions_then_ids_stay_unique() {
    let tree = tree_from_json(json!([
        { "id": "a", "name": "A", "dataIndicators": [{ "id": "di-1", "name": "Existing" }] },
        { "id": "b", "name": "B" }
    ]));

    let next = apply(&tree, "b", Op::AddDataIndicator).unwrap();

    let added = &next.find("b").unwrap().content().unwrap().data_indicators[0];
    assert_eq!(added.id, "di-2");
    assert_eq!(next.check_invariants(), Ok(()));
    assert_round_trips(&next, "add to b");
}

#[test]
fn given_demotable_node_when_demoted_then_promoted_then_original_shape() {
    let tree = tree_from_json(json!([
        { "id": "a", "name": "A", "children": [{ "id": "a1", "name": "A1" }] },
        { "id": "b", "name": "B", "children": [{ "id": "b1", "name": "B1" }] },
        { "id": "c", "name": "C" }
    ]));

    for id in ["b", "c"] {
        let demoted = tree.demote(id).unwrap();
        let restored = demoted.promote(id).unwrap();
        assert_eq!(restored, tree, "{}", id);
    }
}

#[test]
fn given_any_tree_when_moving_up_then_down_then_original_order() {
    let tree = sample_tree();
    for id in ["r", "t2"] {
        let moved = tree.move_node(id, Direction::Up).unwrap();
        assert_ne!(moved, tree);
        assert_eq!(moved.move_node(id, Direction::Down).unwrap(), tree, "{}", id);
    }
}

#[test]
fn given_repeated_operations_when_counting_then_stats_stay_consistent() {
    let mut ids = SequentialIdGenerator::new();
    let defaults = LeafDefaults::default();
    let mut tree = sample_tree();
    let mut added = 0;

    for _ in 0..5 {
        let (next, _) = tree
            .add(Some("t2"), 3, NewIndicator::leaf("More"), &mut ids, &defaults)
            .unwrap();
        tree = next;
        added += 1;
    }

    let stats = tree.stats();
    assert_eq!(stats.indicators, 5 + added);
    assert_eq!(stats.containers + stats.leaves, stats.indicators);
    assert_eq!(tree.find("t2").unwrap().code, "1.2");
    assert_eq!(tree.find_by_code("1.2.6").map(|n| n.name.as_str()), Some("More"));
}
