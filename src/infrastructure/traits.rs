//! I/O boundary traits for testability
//!
//! These traits abstract time, file access and the unit data source,
//! allowing services to be tested with deterministic implementations.

use std::io;
use std::path::Path;
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::application::ApplicationResult;
use crate::domain::UnitSnapshot;

/// Wall-clock abstraction used for cache expiry.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;
}

/// Supplier of organizational unit snapshots, e.g. the persistence layer.
pub trait UnitSource: Send + Sync {
    /// Load every unit known to the source, in a stable order.
    fn load_units(&self) -> ApplicationResult<Vec<UnitSnapshot>>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// System clock.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// Unit source backed by a vector, replaceable at runtime.
#[derive(Debug, Default)]
pub struct InMemoryUnitSource {
    units: RwLock<Vec<UnitSnapshot>>,
}

impl InMemoryUnitSource {
    pub fn new(units: Vec<UnitSnapshot>) -> Self {
        Self {
            units: RwLock::new(units),
        }
    }

    /// Swap the backing data, e.g. after a unit was moved.
    pub fn replace(&self, units: Vec<UnitSnapshot>) {
        let mut guard = self.units.write().unwrap_or_else(|e| e.into_inner());
        *guard = units;
    }
}

impl UnitSource for InMemoryUnitSource {
    fn load_units(&self) -> ApplicationResult<Vec<UnitSnapshot>> {
        let guard = self.units.read().unwrap_or_else(|e| e.into_inner());
        Ok(guard.clone())
    }
}
