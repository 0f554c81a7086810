//! Application State
//!
//! Shared state handed to every HTTP handler, containing all services.

use std::sync::Arc;

use crate::models::settings::AppConfig;
use crate::services::report::{GenerationRegistry, ProviderFactory, ReportService};
use crate::storage::Database;

/// Application state shared by the router
#[derive(Clone)]
pub struct AppState {
    /// SQLite database with connection pool
    database: Database,
    /// Server configuration, fixed at startup
    config: Arc<AppConfig>,
    /// Running generations, keyed by thread id
    registry: GenerationRegistry,
    /// Report generation service
    reports: ReportService,
}

impl AppState {
    /// Create the state from an opened database and loaded configuration
    pub fn new(database: Database, config: AppConfig) -> Self {
        let config = Arc::new(config);
        let registry = GenerationRegistry::new();
        let reports = ReportService::new(database.clone(), config.clone(), registry.clone());
        Self {
            database,
            config,
            registry,
            reports,
        }
    }

    /// Replace how LLM providers are built
    pub fn with_provider_factory(mut self, factory: ProviderFactory) -> Self {
        self.reports = self.reports.with_provider_factory(factory);
        self
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn registry(&self) -> &GenerationRegistry {
        &self.registry
    }

    pub fn reports(&self) -> &ReportService {
        &self.reports
    }
}
