//! Hierarchy change notifications raised by whoever mutates units.

use std::fmt;

use itertools::Itertools;

/// A change to the unit hierarchy that may stale cached results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HierarchyEvent {
    UnitCreated {
        unit_id: i64,
        parent_id: Option<i64>,
    },
    UnitUpdated {
        unit_id: i64,
    },
    UnitMoved {
        unit_id: i64,
        old_parent_id: Option<i64>,
        new_parent_id: Option<i64>,
    },
    UnitDeleted {
        unit_id: i64,
        parent_id: Option<i64>,
    },
    /// Bulk or unknown change
    HierarchyChanged,
}

impl HierarchyEvent {
    /// The unit the event is about; `None` for `HierarchyChanged`.
    pub fn unit_id(&self) -> Option<i64> {
        match *self {
            HierarchyEvent::UnitCreated { unit_id, .. }
            | HierarchyEvent::UnitUpdated { unit_id }
            | HierarchyEvent::UnitMoved { unit_id, .. }
            | HierarchyEvent::UnitDeleted { unit_id, .. } => Some(unit_id),
            HierarchyEvent::HierarchyChanged => None,
        }
    }

    /// Parents gaining or losing a child through this event.
    pub fn parent_ids(&self) -> Vec<i64> {
        let ids = match *self {
            HierarchyEvent::UnitCreated { parent_id, .. }
            | HierarchyEvent::UnitDeleted { parent_id, .. } => vec![parent_id],
            HierarchyEvent::UnitMoved {
                old_parent_id,
                new_parent_id,
                ..
            } => vec![old_parent_id, new_parent_id],
            HierarchyEvent::UnitUpdated { .. } | HierarchyEvent::HierarchyChanged => Vec::new(),
        };
        ids.into_iter().flatten().unique().collect()
    }
}

impl fmt::Display for HierarchyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HierarchyEvent::UnitCreated { unit_id, .. } => write!(f, "unit {unit_id} created"),
            HierarchyEvent::UnitUpdated { unit_id } => write!(f, "unit {unit_id} updated"),
            HierarchyEvent::UnitMoved { unit_id, .. } => write!(f, "unit {unit_id} moved"),
            HierarchyEvent::UnitDeleted { unit_id, .. } => write!(f, "unit {unit_id} deleted"),
            HierarchyEvent::HierarchyChanged => f.write_str("hierarchy changed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_move_when_listing_parents_then_includes_old_and_new() {
        let event = HierarchyEvent::UnitMoved {
            unit_id: 5,
            old_parent_id: Some(2),
            new_parent_id: Some(3),
        };
        assert_eq!(event.unit_id(), Some(5));
        assert_eq!(event.parent_ids(), vec![2, 3]);
    }

    #[test]
    fn given_move_within_same_parent_when_listing_parents_then_listed_once() {
        let event = HierarchyEvent::UnitMoved {
            unit_id: 5,
            old_parent_id: Some(2),
            new_parent_id: Some(2),
        };
        assert_eq!(event.parent_ids(), vec![2]);
    }

    #[test]
    fn given_root_creation_when_listing_parents_then_none() {
        let event = HierarchyEvent::UnitCreated {
            unit_id: 9,
            parent_id: None,
        };
        assert_eq!(event.unit_id(), Some(9));
        assert!(event.parent_ids().is_empty());
        assert_eq!(HierarchyEvent::HierarchyChanged.unit_id(), None);
    }
}
