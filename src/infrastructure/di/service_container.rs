//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;

use crate::application::services::SessionService;
use crate::application::ApplicationResult;
use crate::config::Settings;
use crate::domain::Normalizer;
use crate::infrastructure::traits::{FileSystem, RealFileSystem};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Allocation session lifecycle
    pub session: SessionService,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> ApplicationResult<Self> {
        Self::with_deps(settings, Arc::new(RealFileSystem))
    }

    /// Create a service container with custom dependencies (for testing).
    ///
    /// Fails when the configured share bounds are unusable.
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>) -> ApplicationResult<Self> {
        let normalizer = Normalizer::new(settings.bounds)?;
        let session = SessionService::new(Arc::clone(&fs), normalizer, &settings.data_dir);
        let settings = Arc::new(settings);

        Ok(Self {
            settings,
            fs,
            session,
        })
    }
}
