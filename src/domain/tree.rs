//! In-memory hierarchy tree of organizational units.
//!
//! Nodes own their children; there are no back references, so a built tree
//! cannot contain a cycle. Sibling order is insertion order and is the
//! traversal order of every query below.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use termtree::Tree;
use tracing::{debug, instrument};

use crate::domain::entities::{UnitSnapshot, UnitType};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::stats::HierarchyStatistics;

/// Default bound on nesting when building from raw input.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Limits applied while building a tree from untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Maximum nesting, root counts as 1
    pub max_depth: usize,
    /// Fail when a unit id occurs twice in one build
    pub reject_duplicate_ids: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            reject_duplicate_ids: true,
        }
    }
}

/// One unit plus its already-resolved children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HierarchyTreeNode {
    unit: UnitSnapshot,
    children: Vec<HierarchyTreeNode>,
}

impl HierarchyTreeNode {
    pub fn new(unit: UnitSnapshot) -> Self {
        Self {
            unit,
            children: Vec::new(),
        }
    }

    pub fn with_children(unit: UnitSnapshot, children: Vec<HierarchyTreeNode>) -> Self {
        Self { unit, children }
    }

    pub fn unit(&self) -> &UnitSnapshot {
        &self.unit
    }

    pub fn children(&self) -> &[HierarchyTreeNode] {
        &self.children
    }

    /// Append a child. Parent linkage, duplicates and cycles are not checked here.
    pub fn add_child(&mut self, child: HierarchyTreeNode) {
        self.children.push(child);
    }

    /// Build from a nested `{unit, children: [...]}` structure with default limits.
    pub fn build(raw: &Value) -> DomainResult<Self> {
        Self::build_with(raw, &BuildOptions::default())
    }

    /// Build from a nested `{unit, children: [...]}` structure.
    ///
    /// `children` may be absent or `null` for a leaf. Any other shape
    /// violation aborts the whole build.
    #[instrument(level = "debug", skip(raw))]
    pub fn build_with(raw: &Value, options: &BuildOptions) -> DomainResult<Self> {
        let mut seen = HashSet::new();
        let tree = Self::build_node(raw, "", 1, options, &mut seen)?;
        debug!("built hierarchy rooted at {} ({} units)", tree.unit.id, tree.len());
        Ok(tree)
    }

    fn build_node(
        raw: &Value,
        location: &str,
        depth: usize,
        options: &BuildOptions,
        seen: &mut HashSet<i64>,
    ) -> DomainResult<Self> {
        if depth > options.max_depth {
            return Err(DomainError::DepthExceeded {
                max: options.max_depth,
            });
        }

        let object = raw.as_object().ok_or_else(|| {
            DomainError::malformed(location, "expected an object with `unit` and `children`")
        })?;

        let unit_value = object
            .get("unit")
            .ok_or_else(|| DomainError::malformed(location, "missing `unit`"))?;
        let unit = UnitSnapshot::deserialize(unit_value)
            .map_err(|e| DomainError::malformed(&format!("{location}/unit"), e.to_string()))?;

        if options.reject_duplicate_ids && !seen.insert(unit.id) {
            return Err(DomainError::DuplicateUnit(unit.id));
        }

        let children = match object.get("children") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| {
                    let child_location = format!("{location}/children/{i}");
                    Self::build_node(item, &child_location, depth + 1, options, seen)
                })
                .collect::<DomainResult<Vec<_>>>()?,
            Some(_) => {
                return Err(DomainError::malformed(
                    &format!("{location}/children"),
                    "expected an array",
                ))
            }
        };

        Ok(Self { unit, children })
    }

    /// Inverse of [`build`](Self::build).
    pub fn to_nested(&self) -> Value {
        let mut node = Map::new();
        node.insert("unit".into(), Value::Object(self.unit.to_fields()));
        node.insert(
            "children".into(),
            Value::Array(self.children.iter().map(Self::to_nested).collect()),
        );
        Value::Object(node)
    }

    /// Pre-order list of all units: self, then each child's subtree in order.
    pub fn flatten(&self) -> Vec<&UnitSnapshot> {
        let mut units = Vec::new();
        self.collect_units(&mut units);
        units
    }

    fn collect_units<'a>(&'a self, units: &mut Vec<&'a UnitSnapshot>) {
        units.push(&self.unit);
        for child in &self.children {
            child.collect_units(units);
        }
    }

    /// Pre-order clones with `parent_id`, `parent_name` and `children_count`
    /// taken from the tree structure, ready for [`TreeBuilder`](crate::domain::TreeBuilder).
    pub fn to_linked_units(&self) -> Vec<UnitSnapshot> {
        let mut units = Vec::with_capacity(self.len());
        self.link_units(None, &mut units);
        units
    }

    fn link_units(&self, parent: Option<&UnitSnapshot>, units: &mut Vec<UnitSnapshot>) {
        let mut unit = self.unit.clone();
        if let Some(parent) = parent {
            unit.parent_id = Some(parent.id);
            unit.parent_name = Some(parent.name.clone());
        }
        unit.children_count = self.children.len();
        units.push(unit);
        for child in &self.children {
            child.link_units(Some(&self.unit), units);
        }
    }

    /// Number of nodes including self.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(HierarchyTreeNode::len).sum::<usize>()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// First unit with `id` in pre-order.
    pub fn find_by_id(&self, id: i64) -> Option<&UnitSnapshot> {
        self.subtree(id).map(HierarchyTreeNode::unit)
    }

    /// First node with `id` in pre-order, together with its subtree.
    pub fn subtree(&self, id: i64) -> Option<&HierarchyTreeNode> {
        if self.unit.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.subtree(id))
    }

    /// Units from this root down to `id`, both ends included.
    pub fn path_to(&self, id: i64) -> Option<Vec<&UnitSnapshot>> {
        let mut path = Vec::new();
        self.trace_path(id, &mut path).then_some(path)
    }

    fn trace_path<'a>(&'a self, id: i64, path: &mut Vec<&'a UnitSnapshot>) -> bool {
        path.push(&self.unit);
        if self.unit.id == id {
            return true;
        }
        for child in &self.children {
            if child.trace_path(id, path) {
                return true;
            }
        }
        path.pop();
        false
    }

    /// Structural copy keeping nodes of `unit_type` and their ancestors.
    ///
    /// Returns `None` when neither this node nor any descendant matches.
    pub fn filter_by_type(&self, unit_type: UnitType) -> Option<HierarchyTreeNode> {
        let children: Vec<_> = self
            .children
            .iter()
            .filter_map(|child| child.filter_by_type(unit_type))
            .collect();

        if self.unit.unit_type == unit_type || !children.is_empty() {
            Some(Self {
                unit: self.unit.clone(),
                children,
            })
        } else {
            None
        }
    }

    /// Aggregate counts for this subtree, computed bottom-up.
    pub fn statistics(&self) -> HierarchyStatistics {
        let mut stats = HierarchyStatistics::default();
        for child in &self.children {
            stats.merge(&child.statistics());
        }

        stats.total_units += 1;
        stats.active_units += usize::from(self.unit.is_active);
        stats.max_depth += 1;
        *stats.by_type.entry(self.unit.unit_type).or_insert(0) += 1;
        stats
    }

    /// Height of this subtree; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(HierarchyTreeNode::depth)
            .max()
            .unwrap_or(0)
    }

    /// Ids of all nodes without children, in pre-order.
    pub fn leaf_ids(&self) -> Vec<i64> {
        if self.children.is_empty() {
            vec![self.unit.id]
        } else {
            self.children
                .iter()
                .flat_map(HierarchyTreeNode::leaf_ids)
                .collect()
        }
    }

    /// Terminal rendering, one line per unit.
    pub fn render(&self) -> Tree<String> {
        let leaves: Vec<_> = self.children.iter().map(|c| c.render()).collect();
        Tree::new(self.unit.to_string()).with_leaves(leaves)
    }
}
