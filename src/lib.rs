//! orgtree: organizational unit hierarchies with a TTL result cache
//!
//! Layers follow the dependency direction
//! `cli → infrastructure → application → domain`.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;

pub use application::services::{HierarchyCache, HierarchyService};
pub use domain::{HierarchyStatistics, HierarchyTreeNode, UnitSnapshot, UnitType};
