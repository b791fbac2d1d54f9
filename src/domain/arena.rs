use std::collections::HashMap;

use generational_arena::{Arena, Index};
use tracing::instrument;

use crate::domain::entities::UnitSnapshot;
use crate::domain::tree::HierarchyTreeNode;

/// Node in the arena-based hierarchy index.
#[derive(Debug)]
pub struct IndexNode {
    /// Unit snapshot for this node
    pub unit: UnitSnapshot,
    /// Index of parent node in the arena, None for the root
    pub parent: Option<Index>,
    /// Indices of child nodes in the arena
    pub children: Vec<Index>,
}

/// Flat, parent-linked view over a built hierarchy tree.
///
/// Uses a generational arena for O(1) lookups by id and cheap upward walks,
/// which the owned tree cannot do without back references.
#[derive(Debug)]
pub struct HierarchyIndex {
    arena: Arena<IndexNode>,
    root: Option<Index>,
    by_id: HashMap<i64, Index>,
}

impl Default for HierarchyIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl HierarchyIndex {
    pub fn new() -> Self {
        Self {
            arena: Arena::new(),
            root: None,
            by_id: HashMap::new(),
        }
    }

    /// Index every node of `tree`. On duplicate ids the first occurrence in
    /// pre-order wins for lookups.
    #[instrument(level = "debug", skip(tree), fields(root = tree.unit().id))]
    pub fn from_tree(tree: &HierarchyTreeNode) -> Self {
        let mut index = Self::new();
        let mut stack = vec![(tree, None)];

        while let Some((node, parent_idx)) = stack.pop() {
            let idx = index.insert_node(node.unit().clone(), parent_idx);
            // Push children in reverse order so they are inserted left-to-right
            for child in node.children().iter().rev() {
                stack.push((child, Some(idx)));
            }
        }
        index
    }

    #[instrument(level = "trace", skip(self, unit), fields(id = unit.id))]
    pub fn insert_node(&mut self, unit: UnitSnapshot, parent: Option<Index>) -> Index {
        let id = unit.id;
        let node = IndexNode {
            unit,
            parent,
            children: Vec::new(),
        };
        let node_idx = self.arena.insert(node);
        self.by_id.entry(id).or_insert(node_idx);

        if let Some(parent_idx) = parent {
            if let Some(parent) = self.arena.get_mut(parent_idx) {
                parent.children.push(node_idx);
            }
        } else {
            self.root = Some(node_idx);
        }

        node_idx
    }

    pub fn get_node(&self, idx: Index) -> Option<&IndexNode> {
        self.arena.get(idx)
    }

    pub fn root(&self) -> Option<Index> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn lookup(&self, id: i64) -> Option<&UnitSnapshot> {
        self.by_id
            .get(&id)
            .and_then(|&idx| self.get_node(idx))
            .map(|node| &node.unit)
    }

    /// Ancestors of `id`, root first, excluding the unit itself.
    ///
    /// Returns `None` when the id is not indexed.
    pub fn ancestors(&self, id: i64) -> Option<Vec<&UnitSnapshot>> {
        let start = *self.by_id.get(&id)?;
        let mut chain = Vec::new();
        let mut current = self.get_node(start)?.parent;
        while let Some(idx) = current {
            let node = self.get_node(idx)?;
            chain.push(&node.unit);
            current = node.parent;
        }
        chain.reverse();
        Some(chain)
    }

    /// All units below `id` in pre-order, excluding the unit itself.
    pub fn descendants(&self, id: i64) -> Option<Vec<&UnitSnapshot>> {
        let start = *self.by_id.get(&id)?;
        Some(
            TreeIterator::from_index(self, start)
                .skip(1)
                .map(|(_, node)| &node.unit)
                .collect(),
        )
    }

    pub fn iter(&self) -> TreeIterator<'_> {
        TreeIterator::new(self)
    }

    pub fn iter_postorder(&self) -> PostOrderIterator<'_> {
        PostOrderIterator::new(self)
    }

    pub fn depth(&self) -> usize {
        if let Some(root) = self.root {
            self.calculate_depth(root)
        } else {
            0
        }
    }

    fn calculate_depth(&self, node_idx: Index) -> usize {
        if let Some(node) = self.get_node(node_idx) {
            1 + node
                .children
                .iter()
                .map(|&child| self.calculate_depth(child))
                .max()
                .unwrap_or(0)
        } else {
            0
        }
    }

    /// Ids of all leaf units, in pre-order.
    pub fn leaf_ids(&self) -> Vec<i64> {
        self.iter()
            .filter(|(_, node)| node.children.is_empty())
            .map(|(_, node)| node.unit.id)
            .collect()
    }
}

pub struct TreeIterator<'a> {
    index: &'a HierarchyIndex,
    stack: Vec<Index>,
}

impl<'a> TreeIterator<'a> {
    fn new(index: &'a HierarchyIndex) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = index.root() {
            stack.push(root);
        }
        Self { index, stack }
    }

    fn from_index(index: &'a HierarchyIndex, start: Index) -> Self {
        Self {
            index,
            stack: vec![start],
        }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, &'a IndexNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.index.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}

pub struct PostOrderIterator<'a> {
    index: &'a HierarchyIndex,
    stack: Vec<(Index, bool)>,
}

impl<'a> PostOrderIterator<'a> {
    fn new(index: &'a HierarchyIndex) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = index.root() {
            stack.push((root, false));
        }
        Self { index, stack }
    }
}

impl<'a> Iterator for PostOrderIterator<'a> {
    type Item = (Index, &'a IndexNode);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((current_idx, visited)) = self.stack.pop() {
            if let Some(node) = self.index.get_node(current_idx) {
                if !visited {
                    self.stack.push((current_idx, true));
                    for &child in node.children.iter().rev() {
                        self.stack.push((child, false));
                    }
                } else {
                    return Some((current_idx, node));
                }
            }
        }
        None
    }
}
