//! Tests for leaf content: data indicators and supporting materials

use rstest::rstest;

use indtree::domain::{
    DataIndicator, DomainError, LeafDefaults, SequentialIdGenerator, SupportingMaterial,
    ThresholdType,
};
use indtree::util::testing::{data_indicator, init_test_setup, material, sample_tree};

fn di_codes(tree: &indtree::IndicatorTree, id: &str) -> Vec<(String, String)> {
    tree.find(id)
        .unwrap()
        .content()
        .unwrap()
        .data_indicators
        .iter()
        .map(|di| (di.id.clone(), di.code.clone()))
        .collect()
}

#[test]
fn given_leaf_when_adding_data_indicator_then_appends_with_next_code() {
    init_test_setup();
    let tree = sample_tree();
    let mut ids = SequentialIdGenerator::new();

    let (next, record) = tree
        .add_data_indicator("t1", data_indicator("Load", "<= 12"), &mut ids, &LeafDefaults::default())
        .unwrap();

    assert_eq!(record, "di-1");
    assert_eq!(
        di_codes(&next, "t1"),
        vec![
            ("d1".to_string(), "1.1-D1".to_string()),
            ("di-1".to_string(), "1.1-D2".to_string())
        ]
    );
    // node codes untouched, original snapshot unchanged
    assert_eq!(next.find("t1").unwrap().code, "1.1");
    assert_eq!(di_codes(&tree, "t1").len(), 1);
}

#[test]
fn given_blank_record_when_adding_then_defaults_are_filled() {
    let tree = sample_tree();
    let mut ids = SequentialIdGenerator::new();
    let defaults = LeafDefaults {
        precision: 1,
        file_types: vec!["PDF".into()],
        max_size: "5MB".into(),
        ..LeafDefaults::default()
    };

    let (tree, di) = tree
        .add_data_indicator("r", DataIndicator::default(), &mut ids, &defaults)
        .unwrap();
    let (tree, sm) = tree
        .add_supporting_material("r", SupportingMaterial::default(), &mut ids, &defaults)
        .unwrap();

    let content = tree.find("r").unwrap().content().unwrap();
    let record = &content.data_indicators[0];
    assert_eq!(record.id, di);
    assert_eq!(record.name, "New data indicator");
    assert_eq!(record.threshold_type, Some(ThresholdType::Single));
    assert_eq!(record.precision, Some(1));
    assert_eq!(record.code, "2-D1");
    let record = &content.supporting_materials[0];
    assert_eq!(record.id, sm);
    assert_eq!(record.file_types, "PDF");
    assert_eq!(record.max_size, "5MB");
    assert_eq!(record.code, "2-M1");
}

#[test]
fn given_taken_record_id_when_adding_then_generates_fresh_one() {
    let tree = sample_tree();
    let mut ids = SequentialIdGenerator::new();
    let duplicate = DataIndicator {
        id: "d1".into(),
        ..data_indicator("Again", "")
    };

    let (next, record) = tree
        .add_data_indicator("t1", duplicate, &mut ids, &LeafDefaults::default())
        .unwrap();

    assert_ne!(record, "d1");
    assert_eq!(di_codes(&next, "t1").len(), 2);
}

#[rstest]
#[case::record_on_another_leaf("d1")]
#[case::material_on_another_leaf("m1")]
#[case::node_id("t2")]
fn given_id_used_elsewhere_in_tree_when_adding_then_generates_fresh_one(#[case] supplied: &str) {
    let tree = sample_tree();
    let mut ids = SequentialIdGenerator::new();
    let record = DataIndicator {
        id: supplied.into(),
        ..data_indicator("Grants", "")
    };

    let (next, record) = tree
        .add_data_indicator("r", record, &mut ids, &LeafDefaults::default())
        .unwrap();

    assert_eq!(record, "di-1");
    assert_eq!(next.check_invariants(), Ok(()));
}

#[test]
fn given_restarted_generator_when_adding_to_second_leaf_then_skips_ids_of_first() {
    let tree = sample_tree();
    let defaults = LeafDefaults::default();
    let (tree, first) = tree
        .add_data_indicator("t1", data_indicator("A", ""), &mut SequentialIdGenerator::new(), &defaults)
        .unwrap();

    let (tree, second) = tree
        .add_data_indicator("r", data_indicator("B", ""), &mut SequentialIdGenerator::new(), &defaults)
        .unwrap();

    assert_eq!(first, "di-1");
    assert_eq!(second, "di-2");
    assert_eq!(tree.check_invariants(), Ok(()));
}

#[test]
fn given_cleared_options_when_updating_record_then_defaults_apply() {
    let tree = sample_tree();
    let defaults = LeafDefaults::default();

    let next = tree
        .update_data_indicator("t1", "d1", &defaults, |di| {
            di.threshold_type = None;
            di.precision = None;
            di.name = "  Ratio  ".into();
        })
        .unwrap();

    let record = &next.find("t1").unwrap().content().unwrap().data_indicators[0];
    assert_eq!(record.threshold_type, Some(ThresholdType::Single));
    assert_eq!(record.precision, Some(2));
    assert_eq!(record.name, "Ratio");
}

#[test]
fn given_container_when_adding_content_then_not_a_leaf() {
    let tree = sample_tree();
    let mut ids = SequentialIdGenerator::new();

    let result = tree.add_supporting_material("t", material("Plan"), &mut ids, &LeafDefaults::default());
    assert_eq!(result.unwrap_err(), DomainError::NotALeaf("t".into()));
}

#[test]
fn given_unknown_node_when_adding_content_then_node_not_found() {
    let tree = sample_tree();
    let mut ids = SequentialIdGenerator::new();

    let result = tree.add_data_indicator("nope", data_indicator("x", ""), &mut ids, &LeafDefaults::default());
    assert_eq!(result.unwrap_err(), DomainError::NodeNotFound("nope".into()));
}

#[test]
fn given_record_when_updating_then_keeps_id_and_code() {
    let tree = sample_tree();

    let next = tree
        .update_data_indicator("t1", "d1", &LeafDefaults::default(), |di| {
            di.name = "Student ratio".into();
            di.threshold = "0.6-0.9".into();
            di.threshold_type = Some(ThresholdType::Range);
            di.id = "hijack".into();
            di.code = "9-D9".into();
        })
        .unwrap();

    let record = &next.find("t1").unwrap().content().unwrap().data_indicators[0];
    assert_eq!(record.id, "d1");
    assert_eq!(record.code, "1.1-D1");
    assert_eq!(record.name, "Student ratio");
    assert_eq!(record.threshold_type, Some(ThresholdType::Range));
}

#[test]
fn given_blank_name_when_updating_record_then_rejected() {
    let tree = sample_tree();
    let result =
        tree.update_supporting_material("t1", "m1", &LeafDefaults::default(), |sm| sm.name = " ".into());
    assert_eq!(result.unwrap_err(), DomainError::EmptyName);
}

#[test]
fn given_unknown_record_when_updating_then_content_not_found() {
    let tree = sample_tree();
    let result = tree.update_data_indicator("t1", "m1", &LeafDefaults::default(), |_| {});
    assert_eq!(
        result.unwrap_err(),
        DomainError::ContentNotFound {
            id: "t1".into(),
            record: "m1".into(),
            kind: "data indicator",
        }
    );
}

#[test]
fn given_several_records_when_removing_first_then_rest_are_recoded() {
    let tree = sample_tree();
    let mut ids = SequentialIdGenerator::new();
    let defaults = LeafDefaults::default();
    let (tree, second) = tree
        .add_supporting_material("t1", material("Budget"), &mut ids, &defaults)
        .unwrap();

    let next = tree.remove_supporting_material("t1", "m1").unwrap();

    let materials = &next.find("t1").unwrap().content().unwrap().supporting_materials;
    assert_eq!(materials.len(), 1);
    assert_eq!(materials[0].id, second);
    assert_eq!(materials[0].code, "1.1-M1");
}

#[test]
fn given_removed_record_when_removing_again_then_content_not_found() {
    let tree = sample_tree().remove_data_indicator("t1", "d1").unwrap();
    assert!(matches!(
        tree.remove_data_indicator("t1", "d1"),
        Err(DomainError::ContentNotFound { .. })
    ));
}

#[test]
fn given_leaf_moved_when_recoding_then_content_codes_follow_node() {
    let tree = sample_tree();

    // Staff moves behind Courses and becomes 1.2
    let next = tree.move_node("t1", indtree::Direction::Down).unwrap();

    let content = next.find("t1").unwrap().content().unwrap();
    assert_eq!(content.data_indicators[0].code, "1.2-D1");
    assert_eq!(content.supporting_materials[0].code, "1.2-M1");
}

#[test]
fn given_material_sizes_when_parsing_then_reads_units() {
    let mut sm = material("Scan");
    for (size, bytes) in [
        ("10MB", Some(10 * 1024 * 1024)),
        ("512kb", Some(512 * 1024)),
        ("1.5 GB", Some(1_610_612_736)),
        ("12", Some(12 * 1024 * 1024)),
        ("huge", None),
    ] {
        sm.max_size = size.into();
        assert_eq!(sm.max_size_bytes(), bytes, "max size {}", size);
    }
}
