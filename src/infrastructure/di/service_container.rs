//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::{CatalogService, PlannerService};
use crate::application::ApplicationResult;
use crate::config::Settings;
use crate::infrastructure::traits::{FileSystem, RealFileSystem};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    pub catalog: CatalogService,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(settings, Arc::new(RealFileSystem))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>) -> Self {
        let settings = Arc::new(settings);
        let catalog = CatalogService::new(Arc::clone(&fs), settings.rules());

        Self {
            settings,
            fs,
            catalog,
        }
    }

    /// Planner over a fresh build from the configured (or bundled) catalog.
    pub fn planner(&self) -> ApplicationResult<PlannerService> {
        let build = self
            .catalog
            .load_or_bundled(self.settings.catalog.as_deref())?;
        Ok(PlannerService::new(build))
    }
}
