//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::path::PathBuf;
use std::sync::Arc;

use crate::application::services::{HierarchyCache, HierarchyService};
use crate::config::Settings;
use crate::infrastructure::source::JsonFileUnitSource;
use crate::infrastructure::traits::{
    Clock, FileSystem, InMemoryUnitSource, RealFileSystem, SystemClock, UnitSource,
};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Time source for cache expiry
    pub clock: Arc<dyn Clock>,

    /// Shared hierarchy cache
    pub cache: Arc<HierarchyCache>,

    pub hierarchy: HierarchyService,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    ///
    /// `units_file` overrides `settings.units_file`; with neither set the
    /// hierarchy is empty.
    pub fn new(settings: Settings, units_file: Option<PathBuf>) -> Self {
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        let source: Arc<dyn UnitSource> = match units_file.or_else(|| settings.units_file.clone()) {
            Some(path) => Arc::new(JsonFileUnitSource::new(
                fs.clone(),
                path,
                settings.tree.build_options(),
            )),
            None => Arc::new(InMemoryUnitSource::default()),
        };
        Self::with_deps(settings, fs, Arc::new(SystemClock), source)
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        clock: Arc<dyn Clock>,
        source: Arc<dyn UnitSource>,
    ) -> Self {
        let settings = Arc::new(settings);
        let cache = Arc::new(HierarchyCache::new(settings.cache.clone(), clock.clone()));
        let hierarchy =
            HierarchyService::new(source, cache.clone(), settings.tree.build_options());

        Self {
            settings,
            fs,
            clock,
            cache,
            hierarchy,
        }
    }
}
