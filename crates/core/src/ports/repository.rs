//! Port traits for data repositories.
//!
//! These traits define the storage interface used by the domain layer.
//! Implementations live in the infrastructure layer (e.g., `tracker-storage`).
//!
//! Every list operation returns a Relay [`Connection`] computed by the
//! pagination core; the acting [`Viewer`] is threaded through for
//! diagnostics only.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{ConnectionResult, StorageResult};
use crate::models::{DmarcSummary, Domain, Organization, Scan, ScanKind, Viewer};

use super::loader::KeyFetcher;
use super::page_args::PageArgs;
use super::pagination::{Connection, OrderSpec};

// =============================================================================
// Order Fields
// =============================================================================

/// Orderable fields of the organizations connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrganizationOrderField {
    Name,
    Acronym,
    Slug,
    Sector,
    DomainCount,
}

/// Orderable fields of the domains connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainOrderField {
    Domain,
    LastRan,
    HttpsStatus,
    SslStatus,
    SpfStatus,
    DkimStatus,
    DmarcStatus,
}

/// Orderable fields of the scans connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOrderField {
    ScannedAt,
}

/// Orderable fields of the DMARC summaries connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryOrderField {
    Period,
}

// =============================================================================
// Repository Traits
// =============================================================================

/// Repository for organization data.
#[async_trait]
pub trait OrganizationRepository: Send + Sync {
    /// Insert or update a batch of organizations.
    async fn upsert_organizations(&self, orgs: &[Organization]) -> StorageResult<()>;

    /// Get an organization by key.
    async fn get_organization(&self, key: &str) -> StorageResult<Option<Organization>>;

    /// Find an organization by slug.
    async fn find_organization_by_slug(&self, slug: &str) -> StorageResult<Option<Organization>>;

    /// Count all registered organizations.
    async fn count_organizations(&self) -> StorageResult<u64>;

    /// List organizations as a paginated connection.
    async fn list_organizations(
        &self,
        order: OrderSpec<OrganizationOrderField>,
        args: &PageArgs,
        viewer: &Viewer,
    ) -> ConnectionResult<Connection<Organization>>;
}

/// Repository for domain data and organization claims.
#[async_trait]
pub trait DomainRepository: Send + Sync {
    /// Insert or update a batch of domains.
    async fn upsert_domains(&self, domains: &[Domain]) -> StorageResult<()>;

    /// Get a domain by key.
    async fn get_domain(&self, key: &str) -> StorageResult<Option<Domain>>;

    /// Find a domain by fully-qualified name.
    async fn find_domain(&self, fqdn: &str) -> StorageResult<Option<Domain>>;

    /// Count all registered domains.
    async fn count_domains(&self) -> StorageResult<u64>;

    /// Record that an organization claims a domain.
    async fn claim_domain(&self, organization_key: &str, domain_key: &str) -> StorageResult<()>;

    /// List all domains as a paginated connection.
    async fn list_domains(
        &self,
        order: OrderSpec<DomainOrderField>,
        args: &PageArgs,
        viewer: &Viewer,
    ) -> ConnectionResult<Connection<Domain>>;

    /// List the domains claimed by one organization as a paginated
    /// connection; each node carries the claiming organization's key.
    async fn list_claimed_domains(
        &self,
        organization_key: &str,
        order: OrderSpec<DomainOrderField>,
        args: &PageArgs,
        viewer: &Viewer,
    ) -> ConnectionResult<Connection<Domain>>;
}

/// Repository for scan results.
#[async_trait]
pub trait ScanRepository: Send + Sync {
    /// Insert a batch of scan results.
    async fn insert_scans(&self, scans: &[Scan]) -> StorageResult<()>;

    /// List one domain's scans as a paginated connection, optionally
    /// filtered to one scan kind.
    async fn list_scans(
        &self,
        domain_key: &str,
        kind: Option<ScanKind>,
        order: OrderSpec<ScanOrderField>,
        args: &PageArgs,
        viewer: &Viewer,
    ) -> ConnectionResult<Connection<Scan>>;
}

/// Repository for monthly DMARC aggregate summaries.
#[async_trait]
pub trait DmarcSummaryRepository: Send + Sync {
    /// Insert or update a batch of summaries.
    async fn upsert_summaries(&self, summaries: &[DmarcSummary]) -> StorageResult<()>;

    /// List one domain's summaries as a paginated connection.
    async fn list_summaries(
        &self,
        domain_key: &str,
        order: OrderSpec<SummaryOrderField>,
        args: &PageArgs,
        viewer: &Viewer,
    ) -> ConnectionResult<Connection<DmarcSummary>>;
}

// =============================================================================
// Composite Repository
// =============================================================================

/// Combined repository access for the API layer.
///
/// The `*_fetcher` accessors hand out the batched key-lookup backends used
/// to build one [`super::BatchKeyLoader`] per collection per request.
pub trait Repositories: Send + Sync {
    /// Access the organization repository.
    fn organizations(&self) -> &dyn OrganizationRepository;

    /// Access the domain repository.
    fn domains(&self) -> &dyn DomainRepository;

    /// Access the scan repository.
    fn scans(&self) -> &dyn ScanRepository;

    /// Access the DMARC summary repository.
    fn summaries(&self) -> &dyn DmarcSummaryRepository;

    /// Batched key lookup for organizations.
    fn organization_fetcher(&self) -> Arc<dyn KeyFetcher<Value = Organization>>;

    /// Batched key lookup for domains.
    fn domain_fetcher(&self) -> Arc<dyn KeyFetcher<Value = Domain>>;

    /// Batched key lookup for scans.
    fn scan_fetcher(&self) -> Arc<dyn KeyFetcher<Value = Scan>>;
}
