//! Aggregate statistics over a hierarchy

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::entities::UnitType;

/// Aggregate counts for a subtree or a forest.
///
/// `max_depth` is subtree height: 1 for a leaf, counted from the node the
/// statistics were computed at (not from the absolute root).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HierarchyStatistics {
    pub total_units: usize,
    pub active_units: usize,
    pub max_depth: usize,
    pub by_type: BTreeMap<UnitType, usize>,
}

impl HierarchyStatistics {
    /// Combine statistics of sibling subtrees (or forest roots).
    ///
    /// Counts add up, depth is the maximum of both.
    pub fn merge(&mut self, other: &HierarchyStatistics) {
        self.total_units += other.total_units;
        self.active_units += other.active_units;
        self.max_depth = self.max_depth.max(other.max_depth);
        for (unit_type, count) in &other.by_type {
            *self.by_type.entry(*unit_type).or_insert(0) += count;
        }
    }

    pub fn count_of(&self, unit_type: UnitType) -> usize {
        self.by_type.get(&unit_type).copied().unwrap_or(0)
    }

    pub fn inactive_units(&self) -> usize {
        self.total_units - self.active_units
    }
}
