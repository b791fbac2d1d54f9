//! Tree builder for assembling unit hierarchies from flat unit lists.

use std::collections::{HashMap, HashSet};

use tracing::{debug, instrument, warn};

use crate::domain::entities::UnitSnapshot;
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::tree::{BuildOptions, HierarchyTreeNode};

/// Constructs hierarchy forests from units linked by `parent_id`.
///
/// Roots are units without a parent or whose parent is not part of the
/// input. Children keep input order.
pub struct TreeBuilder {
    options: BuildOptions,
    units: HashMap<i64, UnitSnapshot>,
    input_order: Vec<i64>,
    relationship_cache: HashMap<i64, Vec<i64>>,
    placed: HashSet<i64>,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::with_options(BuildOptions::default())
    }

    pub fn with_options(options: BuildOptions) -> Self {
        Self {
            options,
            units: HashMap::new(),
            input_order: Vec::new(),
            relationship_cache: HashMap::new(),
            placed: HashSet::new(),
        }
    }

    /// Build all trees contained in `units`.
    ///
    /// A repeated id fails with `DuplicateUnit` unless
    /// `reject_duplicate_ids` is off; then the first occurrence is kept and
    /// later ones are skipped, so children link to the first.
    #[instrument(level = "debug", skip(self, units), fields(units = units.len()))]
    pub fn build(&mut self, units: Vec<UnitSnapshot>) -> DomainResult<Vec<HierarchyTreeNode>> {
        // Reset state for a fresh build
        self.units.clear();
        self.input_order.clear();
        self.relationship_cache.clear();
        self.placed.clear();

        for unit in units {
            if self.units.contains_key(&unit.id) {
                if self.options.reject_duplicate_ids {
                    return Err(DomainError::DuplicateUnit(unit.id));
                }
                warn!("skipping duplicate unit {}", unit.id);
                continue;
            }
            self.input_order.push(unit.id);
            self.units.insert(unit.id, unit);
        }

        for id in &self.input_order {
            if let Some(parent_id) = self.units[id].parent_id {
                if self.units.contains_key(&parent_id) {
                    self.relationship_cache
                        .entry(parent_id)
                        .or_default()
                        .push(*id);
                }
            }
        }

        let roots = self.find_root_nodes();
        let mut trees = Vec::with_capacity(roots.len());
        for root in roots {
            trees.push(self.assemble(root, 1)?);
        }

        // Anything not reachable from a root hangs off a parent cycle
        if let Some(orphan) = self
            .input_order
            .iter()
            .find(|id| !self.placed.contains(*id))
        {
            return Err(DomainError::CycleDetected(*orphan));
        }

        debug!("built {} trees from {} units", trees.len(), self.units.len());
        Ok(trees)
    }

    fn find_root_nodes(&self) -> Vec<i64> {
        self.input_order
            .iter()
            .copied()
            .filter(|id| match self.units[id].parent_id {
                None => true,
                Some(parent_id) => !self.units.contains_key(&parent_id),
            })
            .collect()
    }

    fn assemble(&mut self, id: i64, depth: usize) -> DomainResult<HierarchyTreeNode> {
        if depth > self.options.max_depth {
            return Err(DomainError::DepthExceeded {
                max: self.options.max_depth,
            });
        }
        if !self.placed.insert(id) {
            return Err(DomainError::CycleDetected(id));
        }

        let child_ids = self.relationship_cache.get(&id).cloned().unwrap_or_default();
        let mut children = Vec::with_capacity(child_ids.len());
        for child_id in child_ids {
            children.push(self.assemble(child_id, depth + 1)?);
        }

        let mut unit = self.units[&id].clone();
        unit.children_count = children.len();
        if unit.parent_name.is_none() {
            unit.parent_name = unit
                .parent_id
                .and_then(|parent_id| self.units.get(&parent_id))
                .map(|parent| parent.name.clone());
        }

        Ok(HierarchyTreeNode::with_children(unit, children))
    }
}
