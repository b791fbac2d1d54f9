//! Hierarchy result cache
//!
//! Process-local key/value store with per-entry expiry. Keys are
//! `"{prefix}_{id}"` for scoped entries and the bare prefix for global ones.
//! Expired entries read as misses but stay in the table until swept,
//! invalidated, or overwritten.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace};

use crate::config::CacheSettings;
use crate::domain::{HierarchyStatistics, HierarchyTreeNode, UnitContext};
use crate::infrastructure::traits::{Clock, SystemClock};

pub const HIERARCHY_TREE_PREFIX: &str = "hierarchy_tree";
pub const HIERARCHY_STATS_PREFIX: &str = "hierarchy_stats";
pub const UNIT_CONTEXT_PREFIX: &str = "unit_context";

/// Boundary removed by [`HierarchyCache::invalidate_group`].
pub const HIERARCHY_GROUP_PREFIX: &str = "hierarchy_";

/// Shared, read-only forest of hierarchy trees.
pub type HierarchyForest = Arc<Vec<HierarchyTreeNode>>;

/// Build a cache key from a prefix and an optional scope id.
pub fn cache_key(prefix: &str, id: Option<i64>) -> String {
    match id {
        Some(id) => format!("{prefix}_{id}"),
        None => prefix.to_string(),
    }
}

/// How [`HierarchyCache::invalidate_unit`] decides a key belongs to a unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKeyMatch {
    /// An `_`-separated segment after the prefix equals the id exactly
    #[default]
    Segment,
    /// The key contains `_{id}` anywhere; id 1 also hits `_12`
    Substring,
}

impl UnitKeyMatch {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitKeyMatch::Segment => "segment",
            UnitKeyMatch::Substring => "substring",
        }
    }

    pub fn matches(&self, key: &str, unit_id: i64) -> bool {
        let id = unit_id.to_string();
        match self {
            UnitKeyMatch::Substring => key.contains(&format!("_{id}")),
            UnitKeyMatch::Segment => key.split('_').skip(1).any(|segment| segment == id),
        }
    }
}

/// Value stored under a cache key.
#[derive(Debug, Clone)]
pub enum CachedValue {
    Tree(HierarchyForest),
    Statistics(HierarchyStatistics),
    Context(Arc<UnitContext>),
}

impl CachedValue {
    /// Serialized JSON size, used for the diagnostic memory estimate.
    fn estimated_size(&self) -> usize {
        let encoded = match self {
            CachedValue::Tree(forest) => serde_json::to_vec(forest.as_slice()),
            CachedValue::Statistics(stats) => serde_json::to_vec(stats),
            CachedValue::Context(context) => serde_json::to_vec(context.as_ref()),
        };
        encoded.map(|bytes| bytes.len()).unwrap_or(0)
    }
}

/// A value with its absolute expiry instant.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: CachedValue,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Diagnostic snapshot of the cache table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheInfo {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    /// Approximate bytes held, as serialized JSON
    pub memory_estimate: usize,
    /// Sorted
    pub keys: Vec<String>,
}

/// TTL cache for computed hierarchy results.
///
/// Every operation takes the single table lock for its whole
/// read-modify-write sequence; none of them can fail.
pub struct HierarchyCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
    settings: CacheSettings,
}

impl Default for HierarchyCache {
    fn default() -> Self {
        Self::new(CacheSettings::default(), Arc::new(SystemClock))
    }
}

impl HierarchyCache {
    pub fn new(settings: CacheSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        // A panic while holding the lock cannot leave a half-written entry
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn expiry(&self, now: DateTime<Utc>, ttl_secs: Option<u64>) -> DateTime<Utc> {
        let ttl_secs = ttl_secs.unwrap_or(self.settings.default_ttl_secs);
        i64::try_from(ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Valid value under `key`, or `None` when absent or expired.
    pub fn get(&self, key: &str) -> Option<CachedValue> {
        let now = self.clock.now();
        let entries = self.entries();
        match entries.get(key) {
            Some(entry) if entry.is_valid(now) => {
                trace!("cache hit: {key}");
                Some(entry.value.clone())
            }
            Some(_) => {
                trace!("cache expired: {key}");
                None
            }
            None => {
                trace!("cache miss: {key}");
                None
            }
        }
    }

    /// Store `value` under `key`, replacing any previous entry.
    pub fn set(&self, key: impl Into<String>, value: CachedValue, ttl_secs: Option<u64>) {
        let key = key.into();
        let expires_at = self.expiry(self.clock.now(), ttl_secs);
        trace!("cache set: {key} until {expires_at}");
        self.entries()
            .insert(key, CacheEntry { value, expires_at });
    }

    /// Remove a single key. Returns whether it was present.
    pub fn remove(&self, key: &str) -> bool {
        self.entries().remove(key).is_some()
    }

    pub fn get_hierarchy_tree(&self, root_id: Option<i64>) -> Option<HierarchyForest> {
        match self.get(&cache_key(HIERARCHY_TREE_PREFIX, root_id))? {
            CachedValue::Tree(forest) => Some(forest),
            _ => None,
        }
    }

    pub fn set_hierarchy_tree(
        &self,
        forest: impl Into<HierarchyForest>,
        root_id: Option<i64>,
        ttl_secs: Option<u64>,
    ) {
        self.set(
            cache_key(HIERARCHY_TREE_PREFIX, root_id),
            CachedValue::Tree(forest.into()),
            ttl_secs,
        );
    }

    pub fn get_statistics(&self, root_id: Option<i64>) -> Option<HierarchyStatistics> {
        match self.get(&cache_key(HIERARCHY_STATS_PREFIX, root_id))? {
            CachedValue::Statistics(stats) => Some(stats),
            _ => None,
        }
    }

    pub fn set_statistics(
        &self,
        stats: HierarchyStatistics,
        root_id: Option<i64>,
        ttl_secs: Option<u64>,
    ) {
        self.set(
            cache_key(HIERARCHY_STATS_PREFIX, root_id),
            CachedValue::Statistics(stats),
            ttl_secs,
        );
    }

    pub fn get_unit_context(&self, unit_id: i64) -> Option<Arc<UnitContext>> {
        match self.get(&cache_key(UNIT_CONTEXT_PREFIX, Some(unit_id)))? {
            CachedValue::Context(context) => Some(context),
            _ => None,
        }
    }

    pub fn set_unit_context(
        &self,
        context: impl Into<Arc<UnitContext>>,
        unit_id: i64,
        ttl_secs: Option<u64>,
    ) {
        self.set(
            cache_key(UNIT_CONTEXT_PREFIX, Some(unit_id)),
            CachedValue::Context(context.into()),
            ttl_secs,
        );
    }

    /// Remove every key starting with `hierarchy_` (trees and statistics).
    ///
    /// Unit contexts are not part of the group.
    #[instrument(level = "debug", skip(self))]
    pub fn invalidate_group(&self) -> usize {
        self.invalidate_prefix(HIERARCHY_GROUP_PREFIX)
    }

    /// Remove every key starting with `prefix`.
    #[instrument(level = "debug", skip(self))]
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        self.remove_where(|key, _| key.starts_with(prefix))
    }

    /// Remove every key belonging to `unit_id` under the configured match mode.
    #[instrument(level = "debug", skip(self))]
    pub fn invalidate_unit(&self, unit_id: i64) -> usize {
        let mode = self.settings.unit_match;
        self.remove_where(|key, _| mode.matches(key, unit_id))
    }

    /// Remove everything.
    #[instrument(level = "debug", skip(self))]
    pub fn invalidate_all(&self) -> usize {
        let mut entries = self.entries();
        let removed = entries.len();
        entries.clear();
        debug!("invalidated {removed} entries");
        removed
    }

    /// Remove every expired entry regardless of key.
    #[instrument(level = "debug", skip(self))]
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        self.remove_where(|_, entry| !entry.is_valid(now))
    }

    fn remove_where(&self, predicate: impl Fn(&str, &CacheEntry) -> bool) -> usize {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|key, entry| !predicate(key, entry));
        let removed = before - entries.len();
        debug!("removed {removed} entries");
        removed
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Diagnostic snapshot; `valid + expired == total` always.
    pub fn info(&self) -> CacheInfo {
        let now = self.clock.now();
        let entries = self.entries();

        let valid_entries = entries.values().filter(|e| e.is_valid(now)).count();
        let memory_estimate = entries
            .iter()
            .map(|(key, entry)| key.len() + entry.value.estimated_size())
            .sum();

        CacheInfo {
            total_entries: entries.len(),
            valid_entries,
            expired_entries: entries.len() - valid_entries,
            memory_estimate,
            keys: entries.keys().sorted().cloned().collect(),
        }
    }
}
