//! PostgreSQL storage adapter.
//!
//! This module implements the repository traits defined in `tracker-core`
//! using PostgreSQL as the backing store.
//!
//! # Architecture
//!
//! - [`Database`] - Connection pool and migrations
//! - [`PgRepositories`] - Composite repository implementing `Repositories`
//! - Individual repos: `PgOrganizationRepository`, `PgDomainRepository`, etc.
//!
//! Each repository also implements `KeyFetcher`, so it doubles as the
//! batched backend of the per-request key loaders.
//!
//! # Usage
//!
//! ```ignore
//! let config = DatabaseConfig::for_api(&database_url);
//! let db = Database::connect(&config).await?;
//! db.migrate().await?;
//!
//! let repositories = PgRepositories::new(&db);
//! ```

mod database;
mod domain_repo;
mod helpers;
mod organization_repo;
mod scan_repo;
mod slice;
mod summary_repo;

pub use database::{Database, DatabaseConfig};
pub use domain_repo::PgDomainRepository;
pub use organization_repo::PgOrganizationRepository;
pub use scan_repo::PgScanRepository;
pub use summary_repo::PgDmarcSummaryRepository;

use std::sync::Arc;

use tracker_core::models::{Domain, Organization, Scan};
use tracker_core::ports::{
    DmarcSummaryRepository, DomainRepository, KeyFetcher, OrganizationRepository, Repositories,
    ScanRepository,
};

// =============================================================================
// Composite Repository
// =============================================================================

/// Aggregated PostgreSQL repositories implementing the `Repositories` trait.
///
/// This provides a single entry point for all storage operations. The
/// per-entity repositories are held behind `Arc` so they can be handed out
/// as batched key fetchers to request-scoped loaders.
pub struct PgRepositories {
    organizations: Arc<PgOrganizationRepository>,
    domains: Arc<PgDomainRepository>,
    scans: Arc<PgScanRepository>,
    summaries: Arc<PgDmarcSummaryRepository>,
}

impl PgRepositories {
    /// Create a new repository aggregate from a database connection.
    pub fn new(db: &Database) -> Self {
        Self {
            organizations: Arc::new(PgOrganizationRepository::new(db)),
            domains: Arc::new(PgDomainRepository::new(db)),
            scans: Arc::new(PgScanRepository::new(db)),
            summaries: Arc::new(PgDmarcSummaryRepository::new(db)),
        }
    }
}

impl Repositories for PgRepositories {
    fn organizations(&self) -> &dyn OrganizationRepository {
        self.organizations.as_ref()
    }

    fn domains(&self) -> &dyn DomainRepository {
        self.domains.as_ref()
    }

    fn scans(&self) -> &dyn ScanRepository {
        self.scans.as_ref()
    }

    fn summaries(&self) -> &dyn DmarcSummaryRepository {
        self.summaries.as_ref()
    }

    fn organization_fetcher(&self) -> Arc<dyn KeyFetcher<Value = Organization>> {
        self.organizations.clone()
    }

    fn domain_fetcher(&self) -> Arc<dyn KeyFetcher<Value = Domain>> {
        self.domains.clone()
    }

    fn scan_fetcher(&self) -> Arc<dyn KeyFetcher<Value = Scan>> {
        self.scans.clone()
    }
}
