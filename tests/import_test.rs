//! Tests for the import normalizer

use rstest::rstest;
use serde_json::{json, Value};

use indtree::domain::{
    normalize, normalize_str, ImportError, ImportIssueKind, IndicatorTree, LeafDefaults,
    SequentialIdGenerator, ThresholdType,
};
use indtree::util::testing::init_test_setup;

fn import(raw: Value) -> Result<IndicatorTree, ImportError> {
    init_test_setup();
    normalize(&raw, &mut SequentialIdGenerator::new(), &LeafDefaults::default())
}

// ============================================================
// document shape
// ============================================================

#[rstest]
#[case(json!({ "nodes": [] }))]
#[case(json!({ "tree": "not an array" }))]
#[case(json!("just text"))]
#[case(json!(42))]
#[case(json!(null))]
fn given_no_array_and_no_tree_array_when_importing_then_format_error(#[case] raw: Value) {
    let err = import(raw).unwrap_err();
    assert_eq!(err.issues.len(), 1);
    assert_eq!(err.issues[0].kind, ImportIssueKind::Format);
}

#[test]
fn given_tree_envelope_when_importing_then_uses_tree_array() {
    let tree = import(json!({ "systemId": "s1", "tree": [{ "name": "A" }] })).unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree.find_by_code("1").unwrap().name, "A");
}

#[test]
fn given_broken_json_when_importing_text_then_syntax_error() {
    let err = normalize_str(
        "[{ \"name\": ",
        &mut SequentialIdGenerator::new(),
        &LeafDefaults::default(),
    )
    .unwrap_err();
    assert!(err.has(|kind| matches!(kind, ImportIssueKind::Syntax(_))));
}

#[test]
fn given_empty_array_when_importing_then_empty_tree() {
    assert!(import(json!([])).unwrap().is_empty());
}

// ============================================================
// node shape
// ============================================================

#[rstest]
#[case(json!([{ "description": "no name" }]), "$[0]")]
#[case(json!([{ "name": "   " }]), "$[0]")]
#[case(json!([{ "name": { "zh": "x" } }]), "$[0]")]
#[case(json!([{ "name": "A", "children": [{ "name": null }] }]), "$[0].children[0]")]
fn given_missing_or_unusable_name_when_importing_then_shape_error_with_path(
    #[case] raw: Value,
    #[case] path: &str,
) {
    let err = import(raw).unwrap_err();
    assert_eq!(err.issues.len(), 1);
    assert_eq!(err.issues[0].path, path);
    assert_eq!(err.issues[0].kind, ImportIssueKind::MissingName);
}

#[test]
fn given_non_object_child_when_importing_then_not_an_object() {
    let err = import(json!([{ "name": "A", "children": [1] }])).unwrap_err();
    assert_eq!(err.issues[0].path, "$[0].children[0]");
    assert_eq!(err.issues[0].kind, ImportIssueKind::NotAnObject);
}

#[test]
fn given_wrongly_typed_fields_when_importing_then_reports_each_field() {
    let err = import(json!([{
        "name": "A",
        "isLeaf": "yes",
        "dataIndicators": [{ "name": "d", "thresholdType": "between", "precision": -1 }],
        "supportingMaterials": [{ "name": "m", "required": "no", "maxSize": [] }]
    }]))
    .unwrap_err();

    let fields: Vec<&str> = err
        .issues
        .iter()
        .filter_map(|issue| match issue.kind {
            ImportIssueKind::InvalidField { field, .. } => Some(field),
            _ => None,
        })
        .collect();
    assert_eq!(
        fields,
        vec!["isLeaf", "thresholdType", "precision", "maxSize", "required"]
    );
    assert_eq!(err.issues[1].path, "$[0].dataIndicators[0]");
}

#[test]
fn given_duplicate_ids_when_importing_then_reports_duplicate() {
    let err = import(json!([
        { "id": "same", "name": "A" },
        { "id": "same", "name": "B" }
    ]))
    .unwrap_err();
    assert_eq!(err.issues.len(), 1);
    assert_eq!(err.issues[0].path, "$[1]");
    assert_eq!(err.issues[0].kind, ImportIssueKind::DuplicateId("same".into()));
}

// ============================================================
// depth
// ============================================================

/// Scenario: declared level 3 with children is a depth error naming the node.
#[test]
fn given_level_three_node_with_children_when_importing_then_depth_error_names_node() {
    let err = import(json!([{ "name": "X", "level": 3, "children": [{ "name": "Y" }] }])).unwrap_err();

    assert_eq!(err.issues.len(), 1);
    assert_eq!(
        err.issues[0].kind,
        ImportIssueKind::DepthExceeded {
            name: "X".into(),
            max: 3
        }
    );
    assert!(err.to_string().contains("X"));
}

#[test]
fn given_nesting_four_deep_when_importing_then_depth_error_at_third_level() {
    let err = import(json!([{ "name": "A", "children": [
        { "name": "B", "children": [
            { "name": "C", "children": [{ "name": "D" }] }
        ]}
    ]}]))
    .unwrap_err();

    assert_eq!(err.issues.len(), 1);
    assert_eq!(err.issues[0].path, "$[0].children[0].children[0]");
    assert!(matches!(
        &err.issues[0].kind,
        ImportIssueKind::DepthExceeded { name, .. } if name == "C"
    ));
}

#[test]
fn given_declared_level_four_when_importing_then_depth_error() {
    let err = import(json!([{ "name": "Deep", "level": 4 }])).unwrap_err();
    assert!(err.has(|kind| matches!(kind, ImportIssueKind::DepthExceeded { .. })));
}

#[test]
fn given_several_bad_nodes_when_importing_then_collects_all_issues() {
    let err = import(json!([
        { "name": "X", "level": 3, "children": [{ "name": "Y" }] },
        {},
        "text"
    ]))
    .unwrap_err();
    assert_eq!(err.issues.len(), 3);
}

// ============================================================
// leaf inference
// ============================================================

/// Scenario: a level-2 non-leaf without children becomes an empty leaf.
#[test]
fn given_container_without_children_when_importing_then_downgrades_to_leaf() {
    let tree = import(json!([{ "id": "a", "name": "A", "children": [
        { "id": "b", "name": "B", "isLeaf": false }
    ]}]))
    .unwrap();

    let node = tree.find("b").unwrap();
    assert_eq!(node.level, 2);
    assert!(node.is_leaf());
    let content = node.content().unwrap();
    assert!(content.data_indicators.is_empty());
    assert!(content.supporting_materials.is_empty());
}

#[rstest]
#[case(json!({ "name": "A" }), true)]
#[case(json!({ "name": "A", "isLeaf": true }), true)]
#[case(json!({ "name": "A", "isLeaf": false, "children": [] }), true)]
#[case(json!({ "name": "A", "isLeaf": true, "children": [{ "name": "B" }] }), false)]
fn given_leaf_hints_when_importing_then_infers_leaf_status(
    #[case] node: Value,
    #[case] leaf: bool,
) {
    let tree = import(json!([node])).unwrap();
    assert_eq!(tree.find_by_code("1").unwrap().is_leaf(), leaf);
}

#[test]
fn given_container_with_leaf_content_when_importing_then_content_is_dropped() {
    let tree = import(json!([{ "id": "a", "name": "A",
        "children": [{ "name": "B" }],
        "dataIndicators": [{ "name": "ignored" }]
    }]))
    .unwrap();
    assert!(tree.find("a").unwrap().content().is_none());
}

// ============================================================
// defaults and codes
// ============================================================

#[test]
fn given_sparse_records_when_importing_then_fills_defaults() {
    let tree = import(json!([{ "id": "a", "name": "A",
        "dataIndicators": [{ "name": "Ratio" }],
        "supportingMaterials": [{ "name": "Roster" }, { "name": "Plan", "fileTypes": ["PDF", "Zip"], "maxSize": 20 }]
    }]))
    .unwrap();

    let content = tree.find("a").unwrap().content().unwrap();
    let di = &content.data_indicators[0];
    assert_eq!(di.threshold_type, Some(ThresholdType::Single));
    assert_eq!(di.precision, Some(2));
    assert_eq!(di.threshold, "");
    let roster = &content.supporting_materials[0];
    assert_eq!(roster.file_types, "PDF,Word,Excel");
    assert_eq!(roster.max_size, "10MB");
    assert!(!roster.required);
    let plan = &content.supporting_materials[1];
    assert_eq!(plan.file_types, "PDF,Zip");
    assert_eq!(plan.max_size, "20MB");
    assert_eq!(plan.max_size_bytes(), Some(20 * 1024 * 1024));
}

#[test]
fn given_supplied_codes_when_importing_then_codes_are_regenerated() {
    let tree = import(json!([
        { "id": "a", "code": "9.9", "name": "A", "dataIndicators": [{ "code": "x", "name": "d" }] },
        { "id": "b", "code": "1", "name": "B" }
    ]))
    .unwrap();

    let a = tree.find("a").unwrap();
    assert_eq!(a.code, "1");
    assert_eq!(a.content().unwrap().data_indicators[0].code, "1-D1");
    assert_eq!(tree.find("b").unwrap().code, "2");
}

#[test]
fn given_missing_ids_when_importing_then_generates_them() {
    let tree = import(json!([{ "name": "A", "dataIndicators": [{ "name": "d" }], "supportingMaterials": [{ "name": "m" }] }]))
        .unwrap();

    let node = tree.find("ind-1").unwrap();
    let content = node.content().unwrap();
    assert_eq!(content.data_indicators[0].id, "di-1");
    assert_eq!(content.supporting_materials[0].id, "sm-1");
}

#[test]
fn given_imported_tree_when_checking_then_satisfies_invariants() {
    let tree = import(json!([
        { "name": "A", "level": 1, "children": [
            { "name": "B", "children": [{ "name": "C", "isLeaf": false }] },
            { "name": "D", "isLeaf": false, "children": [] }
        ]}
    ]))
    .unwrap();
    assert_eq!(tree.check_invariants(), Ok(()));
    assert_eq!(tree.depth(), 3);
}
