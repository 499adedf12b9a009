//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::IndicatorSystemService;
use crate::config::Settings;
use crate::domain::IdGenerator;
use crate::infrastructure::store::JsonFileStore;
use crate::infrastructure::traits::{FileSystem, RealFileSystem, TreeStore};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Persistence hand-off
    pub store: Arc<dyn TreeStore>,

    pub system_service: IndicatorSystemService,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    ///
    /// Systems are stored as JSON files under `settings.store_dir`.
    pub fn new(settings: Settings) -> Self {
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        let store = Arc::new(JsonFileStore::new(fs.clone(), settings.store_dir.clone()));
        Self::with_deps(settings, fs, store)
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>, store: Arc<dyn TreeStore>) -> Self {
        let ids = settings.id_strategy.generator();
        Self::with_ids(settings, fs, store, ids)
    }

    /// Like `with_deps` with an explicit id generator.
    pub fn with_ids(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        store: Arc<dyn TreeStore>,
        ids: Box<dyn IdGenerator>,
    ) -> Self {
        let settings = Arc::new(settings);
        let system_service =
            IndicatorSystemService::with_ids(fs.clone(), store.clone(), settings.clone(), ids);

        Self {
            settings,
            fs,
            store,
            system_service,
        }
    }
}
