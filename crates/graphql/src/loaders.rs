//! Per-request batched key loaders.
//!
//! One [`RequestLoaders`] is constructed for every inbound GraphQL request
//! and inserted into that request's context, so by-key lookups within one
//! request batch and deduplicate against a cache that dies with the request.

use tracker_core::models::{Domain, Organization, Scan, Viewer};
use tracker_core::ports::{BatchKeyLoader, Repositories};

/// The batched key loaders of one inbound request.
pub struct RequestLoaders {
    pub organizations: BatchKeyLoader<Organization>,
    pub domains: BatchKeyLoader<Domain>,
    pub scans: BatchKeyLoader<Scan>,
}

impl RequestLoaders {
    /// Build fresh loaders over the repositories' key fetchers.
    pub fn new(repositories: &dyn Repositories, viewer: &Viewer) -> Self {
        Self {
            organizations: BatchKeyLoader::new(
                "organization",
                "organization",
                repositories.organization_fetcher(),
            )
            .for_viewer(viewer),
            domains: BatchKeyLoader::new("domain", "domain", repositories.domain_fetcher())
                .for_viewer(viewer),
            scans: BatchKeyLoader::new("scan", "scan", repositories.scan_fetcher())
                .for_viewer(viewer),
        }
    }
}
