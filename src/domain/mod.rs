//! Domain layer: unit snapshots and hierarchy trees
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod builder;
pub mod entities;
pub mod error;
pub mod events;
pub mod stats;
pub mod tree;

pub use arena::{HierarchyIndex, IndexNode};
pub use builder::TreeBuilder;
pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use events::HierarchyEvent;
pub use stats::HierarchyStatistics;
pub use tree::{BuildOptions, HierarchyTreeNode, DEFAULT_MAX_DEPTH};
