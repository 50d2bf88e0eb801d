//! PostgreSQL storage adapter.
//!
//! This module implements the repository traits defined in `vigil-core`
//! using PostgreSQL as the backing store.
//!
//! # Architecture
//!
//! - [`Database`] - Connection pool and migrations
//! - [`PgRepositories`] - Composite repository implementing `Repositories` trait
//! - Individual repos: `PgIssueRepository`, `PgServiceRepository`, etc.
//!
//! # Usage
//!
//! ```ignore
//! let config = DatabaseConfig::for_api(&database_url);
//! let db = Database::connect(&config).await?;
//! db.migrate().await?;
//!
//! let repositories = PgRepositories::new(Arc::new(db));
//! ```

mod component_instance_repo;
mod component_version_repo;
mod database;
mod helpers;
mod issue_repo;
mod service_repo;

pub use component_instance_repo::PgComponentInstanceRepository;
pub use component_version_repo::PgComponentVersionRepository;
pub use database::{Database, DatabaseConfig};
pub use issue_repo::PgIssueRepository;
pub use service_repo::PgServiceRepository;

use std::sync::Arc;

use vigil_core::ports::{
    ComponentInstanceRepository, ComponentVersionRepository, IssueRepository, Repositories,
    ServiceRepository,
};

// =============================================================================
// Composite Repository
// =============================================================================

/// Aggregated PostgreSQL repositories implementing the `Repositories` trait.
///
/// This provides a single entry point for all storage operations.
pub struct PgRepositories {
    issues: PgIssueRepository,
    services: PgServiceRepository,
    component_instances: PgComponentInstanceRepository,
    component_versions: PgComponentVersionRepository,
}

impl PgRepositories {
    /// Create a new repository aggregate from a database connection.
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            issues: PgIssueRepository::new(&db),
            services: PgServiceRepository::new(&db),
            component_instances: PgComponentInstanceRepository::new(&db),
            component_versions: PgComponentVersionRepository::new(&db),
        }
    }
}

impl Repositories for PgRepositories {
    fn issues(&self) -> &dyn IssueRepository {
        &self.issues
    }

    fn services(&self) -> &dyn ServiceRepository {
        &self.services
    }

    fn component_instances(&self) -> &dyn ComponentInstanceRepository {
        &self.component_instances
    }

    fn component_versions(&self) -> &dyn ComponentVersionRepository {
        &self.component_versions
    }
}
