//! Hierarchy read service
//!
//! Cache-first access to hierarchy trees, statistics and unit contexts.
//! Misses rebuild from the unit source; hierarchy events invalidate.

use std::sync::Arc;

use itertools::Itertools;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::application::services::cache::{HierarchyCache, HierarchyForest, UNIT_CONTEXT_PREFIX};
use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{
    BuildOptions, HierarchyEvent, HierarchyIndex, HierarchyStatistics, TreeBuilder, UnitContext,
};
use crate::infrastructure::traits::UnitSource;

/// Service for reading the unit hierarchy through the cache.
pub struct HierarchyService {
    source: Arc<dyn UnitSource>,
    cache: Arc<HierarchyCache>,
    options: BuildOptions,
}

impl HierarchyService {
    pub fn new(source: Arc<dyn UnitSource>, cache: Arc<HierarchyCache>, options: BuildOptions) -> Self {
        Self {
            source,
            cache,
            options,
        }
    }

    pub fn cache(&self) -> &HierarchyCache {
        &self.cache
    }

    /// Trees of the whole hierarchy (`None`) or the subtree at `root_id`.
    ///
    /// An unknown `root_id` yields an empty forest.
    pub fn forest(&self, root_id: Option<i64>) -> ApplicationResult<HierarchyForest> {
        if let Some(forest) = self.cache.get_hierarchy_tree(root_id) {
            debug!("forest: cache hit for root={root_id:?}");
            return Ok(forest);
        }

        let forest: HierarchyForest = match root_id {
            None => {
                let units = self.source.load_units()?;
                Arc::new(TreeBuilder::with_options(self.options).build(units)?)
            }
            Some(id) => {
                let full = self.forest(None)?;
                Arc::new(full.iter().find_map(|tree| tree.subtree(id)).cloned().into_iter().collect())
            }
        };

        debug!(
            "forest: rebuilt root={root_id:?} with {} trees",
            forest.len()
        );
        self.cache.set_hierarchy_tree(forest.clone(), root_id, None);
        Ok(forest)
    }

    /// Statistics merged over the forest returned by [`forest`](Self::forest).
    pub fn statistics(&self, root_id: Option<i64>) -> ApplicationResult<HierarchyStatistics> {
        if let Some(stats) = self.cache.get_statistics(root_id) {
            debug!("statistics: cache hit for root={root_id:?}");
            return Ok(stats);
        }

        let mut stats = HierarchyStatistics::default();
        for tree in self.forest(root_id)?.iter() {
            stats.merge(&tree.statistics());
        }

        self.cache.set_statistics(stats.clone(), root_id, None);
        Ok(stats)
    }

    /// Context blob for one unit: its fields, ancestry and subtree figures.
    ///
    /// Returns `None` for unknown units; misses are not cached.
    pub fn unit_context(&self, unit_id: i64) -> ApplicationResult<Option<Arc<UnitContext>>> {
        if let Some(context) = self.cache.get_unit_context(unit_id) {
            debug!("unit_context: cache hit for unit={unit_id}");
            return Ok(Some(context));
        }

        let forest = self.forest(None)?;
        let Some(tree) = forest.iter().find(|tree| tree.find_by_id(unit_id).is_some()) else {
            debug!("unit_context: unit={unit_id} not in hierarchy");
            return Ok(None);
        };

        let index = HierarchyIndex::from_tree(tree);
        let (Some(unit), Some(ancestors), Some(descendants)) = (
            index.lookup(unit_id),
            index.ancestors(unit_id),
            index.descendants(unit_id),
        ) else {
            return Ok(None);
        };
        let subtree_stats = tree
            .subtree(unit_id)
            .map(|node| node.statistics())
            .unwrap_or_default();

        let breadcrumb = ancestors
            .iter()
            .map(|u| u.name.as_str())
            .chain(std::iter::once(unit.name.as_str()))
            .collect::<Vec<_>>()
            .join(" / ");

        let mut context = UnitContext::new();
        context.insert("unit".into(), Value::Object(unit.to_fields()));
        context.insert(
            "ancestor_ids".into(),
            json!(ancestors.iter().map(|u| u.id).collect::<Vec<_>>()),
        );
        context.insert("breadcrumb".into(), json!(breadcrumb));
        context.insert("depth".into(), json!(ancestors.len()));
        context.insert("descendant_count".into(), json!(descendants.len()));
        context.insert(
            "statistics".into(),
            serde_json::to_value(&subtree_stats).map_err(|e| ApplicationError::OperationFailed {
                context: format!("encode statistics for unit {unit_id}"),
                source: Box::new(e),
            })?,
        );

        let context = Arc::new(context);
        self.cache.set_unit_context(context.clone(), unit_id, None);
        Ok(Some(context))
    }

    /// Apply the invalidation policy for `event`. Returns removed entry count.
    ///
    /// Structural events drop the `hierarchy_` group plus the contexts of
    /// the event's unit, its subtree and every ancestor of the unit and of
    /// the parents it names. The affected set is read from the cached forest
    /// before the group goes; without one all unit contexts are dropped.
    /// `HierarchyChanged` clears everything.
    pub fn handle(&self, event: &HierarchyEvent) -> usize {
        let removed = match event {
            HierarchyEvent::HierarchyChanged => self.cache.invalidate_all(),
            _ => {
                let stale = self.stale_contexts(event);
                let mut removed = self.cache.invalidate_group();
                match stale {
                    Some(unit_ids) => {
                        for unit_id in unit_ids {
                            removed += self.cache.invalidate_unit(unit_id);
                        }
                    }
                    None => removed += self.cache.invalidate_prefix(UNIT_CONTEXT_PREFIX),
                }
                removed
            }
        };
        info!("{event}: invalidated {removed} cache entries");
        removed
    }

    /// Units whose context embeds data touched by `event`, resolved against
    /// the cached forest. `None` when no forest is cached.
    fn stale_contexts(&self, event: &HierarchyEvent) -> Option<Vec<i64>> {
        let forest = self.cache.get_hierarchy_tree(None)?;
        let mut unit_ids = Vec::new();

        for id in event.unit_id().into_iter().chain(event.parent_ids()) {
            match forest.iter().find_map(|tree| tree.path_to(id)) {
                Some(path) => unit_ids.extend(path.iter().map(|u| u.id)),
                None => unit_ids.push(id),
            }
        }
        if let Some(node) = event
            .unit_id()
            .and_then(|id| forest.iter().find_map(|tree| tree.subtree(id)))
        {
            unit_ids.extend(node.flatten().iter().map(|u| u.id));
        }

        let unit_ids: Vec<i64> = unit_ids.into_iter().unique().collect();
        debug!("{event}: stale unit contexts {unit_ids:?}");
        Some(unit_ids)
    }

    /// Drop expired entries.
    pub fn sweep(&self) -> usize {
        let removed = self.cache.sweep_expired();
        debug!("sweep: removed {removed} expired entries");
        removed
    }
}
