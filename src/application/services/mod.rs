//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on I/O boundary traits (Clock, UnitSource, ...)
//! but are themselves concrete structs, not traits.

mod cache;
mod hierarchy;

pub use cache::{
    cache_key, CacheEntry, CacheInfo, CachedValue, HierarchyCache, HierarchyForest, UnitKeyMatch,
    HIERARCHY_GROUP_PREFIX, HIERARCHY_STATS_PREFIX, HIERARCHY_TREE_PREFIX, UNIT_CONTEXT_PREFIX,
};
pub use hierarchy::HierarchyService;
