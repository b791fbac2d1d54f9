//! Tests for HierarchyTreeNode: building from nested input and queries.

use std::collections::BTreeMap;
use std::fs;

use rstest::{fixture, rstest};
use serde_json::{json, Value};

use orgtree::domain::{BuildOptions, DomainError, HierarchyTreeNode, UnitSnapshot, UnitType};
use orgtree::util::testing::init_test_setup;

fn load_fixture(name: &str) -> Value {
    let path = format!("tests/resources/hierarchies/{name}");
    let content = fs::read_to_string(&path).expect("read fixture");
    serde_json::from_str(&content).expect("parse fixture")
}

fn node(id: i64, name: &str, unit_type: &str, children: Vec<Value>) -> Value {
    json!({"unit": {"id": id, "name": name, "type": unit_type}, "children": children})
}

#[fixture]
fn engineering() -> HierarchyTreeNode {
    init_test_setup();
    HierarchyTreeNode::build(&load_fixture("engineering.json")).expect("build engineering")
}

/// University with an inactive office and a three-level academic branch.
#[fixture]
fn university() -> HierarchyTreeNode {
    init_test_setup();
    let raw = json!({
        "unit": {"id": 1, "name": "State University", "type": "UNIVERSITY"},
        "children": [
            node(10, "Engineering", "FACULTY", vec![
                node(11, "Computer Science", "DEPARTMENT", vec![
                    node(110, "Robotics Lab", "LABORATORY", vec![]),
                ]),
                node(12, "Electrical Engineering", "DEPARTMENT", vec![]),
            ]),
            {"unit": {"id": 20, "name": "Registrar", "type": "OFFICE", "is_active": false}}
        ]
    });
    HierarchyTreeNode::build(&raw).expect("build university")
}

// ============================================================
// Scenarios
// ============================================================

#[rstest]
fn given_engineering_faculty_when_computing_statistics_then_counts_match(
    engineering: HierarchyTreeNode,
) {
    let stats = engineering.statistics();

    assert_eq!(stats.total_units, 3);
    assert_eq!(stats.active_units, 3);
    assert_eq!(stats.max_depth, 2);
    assert_eq!(
        stats.by_type,
        BTreeMap::from([(UnitType::Faculty, 1), (UnitType::Department, 2)])
    );
}

#[rstest]
fn given_engineering_faculty_when_filtering_departments_then_root_kept_with_two_children(
    engineering: HierarchyTreeNode,
) {
    let filtered = engineering
        .filter_by_type(UnitType::Department)
        .expect("departments present");

    assert_eq!(filtered.unit().name, "Engineering");
    assert_eq!(filtered.children().len(), 2);
    assert!(filtered
        .children()
        .iter()
        .all(|c| c.unit().unit_type == UnitType::Department));
}

#[rstest]
fn given_no_matching_type_when_filtering_then_none(engineering: HierarchyTreeNode) {
    assert!(engineering.filter_by_type(UnitType::Laboratory).is_none());
}

#[rstest]
fn given_deep_match_when_filtering_then_only_ancestor_chain_survives(university: HierarchyTreeNode) {
    let filtered = university
        .filter_by_type(UnitType::Laboratory)
        .expect("lab present");

    let ids: Vec<i64> = filtered.flatten().iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![1, 10, 11, 110]);
}

// ============================================================
// Properties
// ============================================================

#[rstest]
fn given_built_tree_when_round_tripping_nested_then_equal(university: HierarchyTreeNode) {
    let rebuilt = HierarchyTreeNode::build(&university.to_nested()).expect("rebuild");
    assert_eq!(rebuilt, university);
}

#[rstest]
fn given_tree_when_flattening_then_preorder_and_len_matches_total(university: HierarchyTreeNode) {
    let flat = university.flatten();

    let ids: Vec<i64> = flat.iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![1, 10, 11, 110, 12, 20]);
    assert_eq!(flat.len(), university.statistics().total_units);
    assert_eq!(flat.len(), university.len());
}

#[rstest]
fn given_tree_when_computing_statistics_then_invariants_hold(university: HierarchyTreeNode) {
    let stats = university.statistics();

    assert!(stats.active_units <= stats.total_units);
    assert_eq!(stats.active_units, 5);
    assert_eq!(stats.inactive_units(), 1);
    assert_eq!(stats.by_type.values().sum::<usize>(), stats.total_units);
    assert_eq!(stats.max_depth, 4);
    assert_eq!(stats.max_depth, university.depth());
}

#[rstest]
#[case(1)]
#[case(11)]
#[case(110)]
#[case(20)]
fn given_unit_in_tree_when_finding_then_found_and_path_ends_there(
    university: HierarchyTreeNode,
    #[case] id: i64,
) {
    let unit = university.find_by_id(id).expect("present");
    assert_eq!(unit.id, id);

    let path = university.path_to(id).expect("path");
    assert_eq!(path.first().map(|u| u.id), Some(1));
    assert_eq!(path.last().map(|u| u.id), Some(id));
}

#[rstest]
fn given_unknown_id_when_querying_then_absent(university: HierarchyTreeNode) {
    assert!(university.find_by_id(999).is_none());
    assert!(university.path_to(999).is_none());
    assert!(university.subtree(999).is_none());
}

#[rstest]
fn given_nested_unit_when_tracing_path_then_lists_every_ancestor(university: HierarchyTreeNode) {
    let path: Vec<i64> = university
        .path_to(110)
        .expect("path")
        .iter()
        .map(|u| u.id)
        .collect();
    assert_eq!(path, vec![1, 10, 11, 110]);
}

#[rstest]
fn given_tree_when_listing_leaves_then_preorder(university: HierarchyTreeNode) {
    assert_eq!(university.leaf_ids(), vec![110, 12, 20]);
}

#[rstest]
fn given_tree_when_adding_child_then_queries_see_it(mut engineering: HierarchyTreeNode) {
    let lab = UnitSnapshot::new(4, "Power Lab", UnitType::Laboratory);
    engineering.add_child(HierarchyTreeNode::new(lab));

    assert_eq!(engineering.len(), 4);
    assert_eq!(engineering.leaf_ids(), vec![2, 3, 4]);
    assert_eq!(engineering.statistics().count_of(UnitType::Laboratory), 1);
}

#[rstest]
fn given_tree_when_rendering_then_one_line_per_unit(engineering: HierarchyTreeNode) {
    let rendered = engineering.render().to_string();

    assert_eq!(rendered.lines().count(), 3);
    assert!(rendered.starts_with("Engineering [FACULTY] #1"));
    assert!(rendered.contains("EE [DEPARTMENT] #3"));
}

// ============================================================
// Malformed input
// ============================================================

#[test]
fn given_children_object_when_building_then_malformed_with_location() {
    let result = HierarchyTreeNode::build(&load_fixture("malformed.json"));

    match result {
        Err(DomainError::MalformedInput { location, .. }) => {
            assert_eq!(location, "/children/0/children")
        }
        other => panic!("expected malformed input, got {other:?}"),
    }
}

#[rstest]
#[case::not_an_object(json!([1, 2]), "/")]
#[case::missing_unit(json!({"children": []}), "/")]
#[case::bad_unit_type(json!({"unit": {"id": 1, "name": "X", "type": "GUILD"}}), "/unit")]
#[case::missing_name(json!({"unit": {"id": 1, "type": "OFFICE"}}), "/unit")]
fn given_bad_shape_when_building_then_malformed(#[case] raw: Value, #[case] expected: &str) {
    match HierarchyTreeNode::build(&raw) {
        Err(DomainError::MalformedInput { location, .. }) => assert_eq!(location, expected),
        other => panic!("expected malformed input, got {other:?}"),
    }
}

#[test]
fn given_repeated_id_when_building_then_duplicate_rejected() {
    let raw = node(1, "Engineering", "FACULTY", vec![
        node(2, "CS", "DEPARTMENT", vec![]),
        node(2, "CS again", "DEPARTMENT", vec![]),
    ]);

    assert_eq!(
        HierarchyTreeNode::build(&raw),
        Err(DomainError::DuplicateUnit(2))
    );

    let lenient = BuildOptions {
        reject_duplicate_ids: false,
        ..BuildOptions::default()
    };
    let tree = HierarchyTreeNode::build_with(&raw, &lenient).expect("lenient build");
    assert_eq!(tree.len(), 3);
    assert_eq!(tree.find_by_id(2).map(|u| u.name.as_str()), Some("CS"));
}

#[test]
fn given_chain_deeper_than_limit_when_building_then_depth_exceeded() {
    let mut raw = node(20, "Leaf", "OFFICE", vec![]);
    for id in (1..20).rev() {
        raw = node(id, "Layer", "DIVISION", vec![raw]);
    }
    let options = BuildOptions {
        max_depth: 10,
        ..BuildOptions::default()
    };

    assert_eq!(
        HierarchyTreeNode::build_with(&raw, &options),
        Err(DomainError::DepthExceeded { max: 10 })
    );
    assert_eq!(HierarchyTreeNode::build(&raw).expect("within default").depth(), 20);
}
