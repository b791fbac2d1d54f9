//! Tests for HierarchyService: cache-first reads and event invalidation.

use std::sync::Arc;

use rstest::{fixture, rstest};
use serde_json::json;

use orgtree::application::services::{HierarchyCache, HierarchyService};
use orgtree::application::ApplicationError;
use orgtree::config::CacheSettings;
use orgtree::domain::{
    BuildOptions, DomainError, HierarchyEvent, UnitSnapshot, UnitType,
};
use orgtree::infrastructure::traits::InMemoryUnitSource;
use orgtree::util::testing::{init_test_setup, ManualClock};

struct Fixture {
    source: Arc<InMemoryUnitSource>,
    cache: Arc<HierarchyCache>,
    clock: Arc<ManualClock>,
    service: HierarchyService,
}

fn units() -> Vec<UnitSnapshot> {
    let university = UnitSnapshot::new(1, "State University", UnitType::University);
    let engineering = UnitSnapshot::new(10, "Engineering", UnitType::Faculty).with_parent(&university);
    let cs = UnitSnapshot::new(11, "Computer Science", UnitType::Department).with_parent(&engineering);
    let ee = UnitSnapshot::new(12, "Electrical Engineering", UnitType::Department)
        .with_parent(&engineering);
    let registrar = UnitSnapshot::new(20, "Registrar", UnitType::Office)
        .with_parent(&university)
        .with_active(false);
    let program = UnitSnapshot::new(30, "Continuing Education", UnitType::Program);
    vec![university, engineering, cs, ee, registrar, program]
}

#[fixture]
fn fx() -> Fixture {
    init_test_setup();
    let source = Arc::new(InMemoryUnitSource::new(units()));
    let clock = Arc::new(ManualClock::default());
    let cache = Arc::new(HierarchyCache::new(CacheSettings::default(), clock.clone()));
    let service = HierarchyService::new(source.clone(), cache.clone(), BuildOptions::default());
    Fixture {
        source,
        cache,
        clock,
        service,
    }
}

/// Replace the source data so that only cached results still show the old name.
fn rename_engineering(fx: &Fixture) {
    let mut changed = units();
    changed[1].name = "School of Engineering".into();
    fx.source.replace(changed);
}

// ============================================================
// Reads
// ============================================================

#[rstest]
fn given_source_when_reading_forest_then_all_roots_and_cached(fx: Fixture) {
    let forest = fx.service.forest(None).expect("forest");

    let roots: Vec<i64> = forest.iter().map(|t| t.unit().id).collect();
    assert_eq!(roots, vec![1, 30]);
    assert!(fx.cache.get_hierarchy_tree(None).is_some());
}

#[rstest]
fn given_root_id_when_reading_forest_then_only_that_subtree(fx: Fixture) {
    let forest = fx.service.forest(Some(10)).expect("forest");

    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].unit().id, 10);
    assert_eq!(forest[0].leaf_ids(), vec![11, 12]);
    assert!(fx.service.forest(Some(999)).expect("forest").is_empty());
}

#[rstest]
fn given_cached_forest_when_source_changes_then_cached_result_served(fx: Fixture) {
    fx.service.forest(None).expect("warm");
    rename_engineering(&fx);

    let forest = fx.service.forest(None).expect("forest");
    assert_eq!(
        forest[0].find_by_id(10).map(|u| u.name.as_str()),
        Some("Engineering")
    );

    fx.clock.advance_secs(3600);
    let forest = fx.service.forest(None).expect("forest");
    assert_eq!(
        forest[0].find_by_id(10).map(|u| u.name.as_str()),
        Some("School of Engineering")
    );
}

#[rstest]
fn given_forest_when_reading_statistics_then_merged_over_roots(fx: Fixture) {
    let stats = fx.service.statistics(None).expect("stats");

    assert_eq!(stats.total_units, 6);
    assert_eq!(stats.active_units, 5);
    assert_eq!(stats.max_depth, 3);
    assert_eq!(stats.count_of(UnitType::Program), 1);

    let scoped = fx.service.statistics(Some(10)).expect("stats");
    assert_eq!(scoped.total_units, 3);
    assert_eq!(fx.cache.get_statistics(Some(10)), Some(scoped));
}

#[rstest]
fn given_unit_when_reading_context_then_ancestry_and_counts(fx: Fixture) {
    let ctx = fx.service.unit_context(11).expect("context").expect("known unit");

    assert_eq!(ctx["ancestor_ids"], json!([1, 10]));
    assert_eq!(
        ctx["breadcrumb"],
        json!("State University / Engineering / Computer Science")
    );
    assert_eq!(ctx["depth"], json!(2));
    assert_eq!(ctx["descendant_count"], json!(0));
    assert_eq!(ctx["unit"]["parent_name"], json!("Engineering"));
    assert_eq!(ctx["statistics"]["total_units"], json!(1));
    assert!(fx.cache.get_unit_context(11).is_some());
}

#[rstest]
fn given_unknown_unit_when_reading_context_then_none_and_not_cached(fx: Fixture) {
    assert!(fx.service.unit_context(999).expect("context").is_none());
    assert!(fx.cache.get_unit_context(999).is_none());
}

#[rstest]
fn given_cyclic_source_when_reading_forest_then_domain_error(fx: Fixture) {
    let mut looped = UnitSnapshot::new(40, "Loop", UnitType::Office);
    looped.parent_id = Some(40);
    fx.source.replace(vec![looped]);

    let result = fx.service.forest(None);

    assert!(matches!(
        result,
        Err(ApplicationError::Domain(DomainError::CycleDetected(40)))
    ));
    assert!(fx.cache.is_empty());
}

// ============================================================
// Events
// ============================================================

fn warm(fx: &Fixture) {
    fx.service.forest(None).expect("forest");
    fx.service.statistics(None).expect("stats");
    for id in [1, 10, 11, 12, 20] {
        fx.service.unit_context(id).expect("context");
    }
}

#[rstest]
fn given_warm_cache_when_unit_updated_then_group_and_ancestor_contexts_dropped(fx: Fixture) {
    warm(&fx);

    let removed = fx.service.handle(&HierarchyEvent::UnitUpdated { unit_id: 11 });

    assert_eq!(removed, 5);
    assert!(fx.cache.get_hierarchy_tree(None).is_none());
    assert_eq!(
        fx.cache.info().keys,
        vec!["unit_context_12".to_string(), "unit_context_20".to_string()]
    );
}

#[rstest]
fn given_renamed_faculty_when_event_handled_then_descendant_breadcrumb_refreshed(fx: Fixture) {
    for id in [1, 10, 11] {
        fx.service.unit_context(id).expect("context");
    }
    rename_engineering(&fx);

    fx.service.handle(&HierarchyEvent::UnitUpdated { unit_id: 10 });

    let ctx = fx.service.unit_context(11).expect("context").expect("known");
    assert_eq!(
        ctx["breadcrumb"],
        json!("State University / School of Engineering / Computer Science")
    );
}

#[rstest]
fn given_new_grandchild_when_created_then_root_descendant_count_refreshed(fx: Fixture) {
    warm(&fx);
    let before = fx.service.unit_context(1).expect("context").expect("known");
    assert_eq!(before["descendant_count"], json!(4));

    let mut changed = units();
    let lab = UnitSnapshot::new(111, "Robotics Lab", UnitType::Laboratory).with_parent(&changed[2]);
    changed.push(lab);
    fx.source.replace(changed);

    fx.service.handle(&HierarchyEvent::UnitCreated {
        unit_id: 111,
        parent_id: Some(11),
    });

    let root = fx.service.unit_context(1).expect("context").expect("known");
    assert_eq!(root["descendant_count"], json!(5));
    let faculty = fx.service.unit_context(10).expect("context").expect("known");
    assert_eq!(faculty["statistics"]["total_units"], json!(4));
    assert!(fx.cache.get_unit_context(20).is_some());
}

#[rstest]
fn given_moved_faculty_when_event_handled_then_descendant_ancestry_refreshed(fx: Fixture) {
    warm(&fx);
    let mut changed = units();
    changed[1].parent_id = Some(30);
    changed[1].parent_name = Some("Continuing Education".into());
    fx.source.replace(changed);

    fx.service.handle(&HierarchyEvent::UnitMoved {
        unit_id: 10,
        old_parent_id: Some(1),
        new_parent_id: Some(30),
    });

    let cs = fx.service.unit_context(11).expect("context").expect("known");
    assert_eq!(cs["ancestor_ids"], json!([30, 10]));
    let root = fx.service.unit_context(1).expect("context").expect("known");
    assert_eq!(root["descendant_count"], json!(1));
}

#[rstest]
fn given_contexts_without_cached_forest_when_unit_updated_then_all_contexts_dropped(fx: Fixture) {
    warm(&fx);
    fx.cache.remove("hierarchy_tree");

    let removed = fx.service.handle(&HierarchyEvent::UnitUpdated { unit_id: 20 });

    assert_eq!(removed, 6);
    assert!(fx.cache.is_empty());
}

#[rstest]
fn given_warm_cache_when_unit_moved_then_both_parents_dropped(fx: Fixture) {
    warm(&fx);

    fx.service.handle(&HierarchyEvent::UnitMoved {
        unit_id: 12,
        old_parent_id: Some(10),
        new_parent_id: Some(1),
    });

    let keys = fx.cache.info().keys;
    assert_eq!(
        keys,
        vec!["unit_context_11".to_string(), "unit_context_20".to_string()]
    );
}

#[rstest]
fn given_warm_cache_when_hierarchy_changed_then_everything_dropped(fx: Fixture) {
    warm(&fx);

    assert_eq!(fx.service.handle(&HierarchyEvent::HierarchyChanged), 7);
    assert!(fx.cache.is_empty());
}

#[rstest]
fn given_updated_source_when_event_handled_then_next_read_rebuilds(fx: Fixture) {
    warm(&fx);
    rename_engineering(&fx);

    fx.service.handle(&HierarchyEvent::UnitUpdated { unit_id: 10 });

    let ctx = fx.service.unit_context(10).expect("context").expect("known");
    assert_eq!(ctx["unit"]["name"], json!("School of Engineering"));
}

#[rstest]
fn given_expired_entries_when_sweeping_then_removed(fx: Fixture) {
    warm(&fx);
    fx.clock.advance_secs(3600);

    assert_eq!(fx.service.sweep(), 7);
    assert!(fx.service.cache().is_empty());
}
