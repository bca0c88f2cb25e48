//! GraphQL schema definition.
//!
//! This module provides the GraphQL schema for the tracker, exposing
//! organizations, domains, scan results, and DMARC summaries as Relay
//! cursor-paginated connections.

use std::sync::Arc;

use async_graphql::{Context, EmptyMutation, EmptySubscription, Object, Result, Schema};
use chrono::{DateTime, NaiveDate, Utc};

use tracker_core::models::Viewer;
use tracker_core::ports::{
    DomainOrderField, OrderDirection, OrderSpec, OrganizationOrderField, PageArgs, Repositories,
    ScanOrderField, SummaryOrderField,
};

use crate::loaders::RequestLoaders;
use crate::types::TrackerSchema;

// -----------------------------------------------------------------------------
// Schema Configuration
// -----------------------------------------------------------------------------

/// Maximum query depth to prevent deeply nested queries (DoS protection).
/// Note: GraphQL introspection requires depth ~13, so we use 15 to allow it.
pub const MAX_QUERY_DEPTH: usize = 15;

/// Maximum query complexity score (DoS protection).
/// Each field has a default complexity of 1, nested objects multiply.
pub const MAX_QUERY_COMPLEXITY: usize = 500;

// -----------------------------------------------------------------------------
// Schema Builder
// -----------------------------------------------------------------------------

/// Build the GraphQL schema over the given repositories.
///
/// Includes query depth and complexity limits for DoS protection. The
/// per-request data (viewer, loaders) is injected by the server handler,
/// not here.
pub fn build_schema(repositories: Arc<dyn Repositories>) -> TrackerSchema {
    Schema::build(CoreQuery, EmptyMutation, EmptySubscription)
        .data(repositories)
        .limit_depth(MAX_QUERY_DEPTH)
        .limit_complexity(MAX_QUERY_COMPLEXITY)
        .finish()
}

// -----------------------------------------------------------------------------
// Core Query
// -----------------------------------------------------------------------------

/// Query root for the tracker API.
#[derive(Default)]
pub struct CoreQuery;

#[Object]
impl CoreQuery {
    /// Get service status and record counts.
    async fn status<'ctx>(&self, ctx: &Context<'ctx>) -> Result<TrackerStatus> {
        let repos = ctx.data::<Arc<dyn Repositories>>()?;

        let organization_count = repos.organizations().count_organizations().await?;
        let domain_count = repos.domains().count_domains().await?;

        Ok(TrackerStatus {
            organization_count: organization_count as i64,
            domain_count: domain_count as i64,
        })
    }

    /// Get an organization by slug.
    async fn organization<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        slug: String,
    ) -> Result<Option<Organization>> {
        validate_filter_string(&slug, "slug")?;
        let repos = ctx.data::<Arc<dyn Repositories>>()?;

        let org = repos
            .organizations()
            .find_organization_by_slug(&slug)
            .await?;
        Ok(org.map(Organization::from))
    }

    /// Get an organization by key.
    async fn organization_by_key<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        key: String,
    ) -> Result<Option<Organization>> {
        let loaders = ctx.data::<RequestLoaders>()?;

        let org = loaders.organizations.load(&key).await?;
        Ok(org.map(Organization::from))
    }

    /// List organizations with pagination.
    async fn organizations<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        first: Option<i32>,
        last: Option<i32>,
        after: Option<String>,
        before: Option<String>,
        order_by: Option<OrganizationOrder>,
    ) -> Result<OrganizationConnection> {
        let repos = ctx.data::<Arc<dyn Repositories>>()?;
        let viewer = viewer_of(ctx);

        let connection = repos
            .organizations()
            .list_organizations(
                order_by.unwrap_or_default().into(),
                &page_args(first, last, after, before),
                &viewer,
            )
            .await?;

        Ok(OrganizationConnection::from(connection))
    }

    /// Get a domain by fully-qualified name.
    async fn domain<'ctx>(&self, ctx: &Context<'ctx>, domain: String) -> Result<Option<Domain>> {
        validate_filter_string(&domain, "domain")?;
        let repos = ctx.data::<Arc<dyn Repositories>>()?;

        let found = repos.domains().find_domain(&domain).await?;
        Ok(found.map(Domain::from))
    }

    /// Get a domain by key.
    async fn domain_by_key<'ctx>(&self, ctx: &Context<'ctx>, key: String) -> Result<Option<Domain>> {
        let loaders = ctx.data::<RequestLoaders>()?;

        let domain = loaders.domains.load(&key).await?;
        Ok(domain.map(Domain::from))
    }

    /// List domains with pagination, optionally only those claimed by one
    /// organization (each node then carries the claiming organization key).
    #[allow(clippy::too_many_arguments)]
    async fn domains<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        organization: Option<String>,
        first: Option<i32>,
        last: Option<i32>,
        after: Option<String>,
        before: Option<String>,
        order_by: Option<DomainOrder>,
    ) -> Result<DomainConnection> {
        let repos = ctx.data::<Arc<dyn Repositories>>()?;
        let viewer = viewer_of(ctx);
        let order = order_by.unwrap_or_default().into();
        let args = page_args(first, last, after, before);

        let connection = match organization {
            Some(slug) => {
                validate_filter_string(&slug, "organization")?;
                let Some(org) = repos
                    .organizations()
                    .find_organization_by_slug(&slug)
                    .await?
                else {
                    return Err(async_graphql::Error::new(format!(
                        "Unable to find organization with slug `{}`.",
                        slug
                    )));
                };
                repos
                    .domains()
                    .list_claimed_domains(&org.key, order, &args, &viewer)
                    .await?
            }
            None => repos.domains().list_domains(order, &args, &viewer).await?,
        };

        Ok(DomainConnection::from(connection))
    }

    /// Get a scan result by key.
    async fn scan<'ctx>(&self, ctx: &Context<'ctx>, key: String) -> Result<Option<Scan>> {
        let loaders = ctx.data::<RequestLoaders>()?;

        let scan = loaders.scans.load(&key).await?;
        Ok(scan.map(Scan::from))
    }

    /// List one domain's scan results with pagination, optionally filtered
    /// to one scan type.
    #[allow(clippy::too_many_arguments)]
    async fn scans<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        domain: String,
        scan_type: Option<ScanType>,
        first: Option<i32>,
        last: Option<i32>,
        after: Option<String>,
        before: Option<String>,
        order_by: Option<ScanOrder>,
    ) -> Result<ScanConnection> {
        validate_filter_string(&domain, "domain")?;
        let repos = ctx.data::<Arc<dyn Repositories>>()?;
        let viewer = viewer_of(ctx);

        let Some(found) = repos.domains().find_domain(&domain).await? else {
            return Err(async_graphql::Error::new(format!(
                "Unable to find domain `{}`.",
                domain
            )));
        };

        let connection = repos
            .scans()
            .list_scans(
                &found.key,
                scan_type.map(Into::into),
                order_by.unwrap_or_default().into(),
                &page_args(first, last, after, before),
                &viewer,
            )
            .await?;

        Ok(ScanConnection::from(connection))
    }

    /// List one domain's monthly DMARC summaries with pagination.
    #[allow(clippy::too_many_arguments)]
    async fn dmarc_summaries<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        domain: String,
        first: Option<i32>,
        last: Option<i32>,
        after: Option<String>,
        before: Option<String>,
        order_by: Option<SummaryOrder>,
    ) -> Result<DmarcSummaryConnection> {
        validate_filter_string(&domain, "domain")?;
        let repos = ctx.data::<Arc<dyn Repositories>>()?;
        let viewer = viewer_of(ctx);

        let Some(found) = repos.domains().find_domain(&domain).await? else {
            return Err(async_graphql::Error::new(format!(
                "Unable to find domain `{}`.",
                domain
            )));
        };

        let connection = repos
            .summaries()
            .list_summaries(
                &found.key,
                order_by.unwrap_or_default().into(),
                &page_args(first, last, after, before),
                &viewer,
            )
            .await?;

        Ok(DmarcSummaryConnection::from(connection))
    }
}

// -----------------------------------------------------------------------------
// Ordering Inputs
// -----------------------------------------------------------------------------

/// Ordering direction.
#[derive(async_graphql::Enum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl From<Order> for OrderDirection {
    fn from(order: Order) -> Self {
        match order {
            Order::Asc => OrderDirection::Asc,
            Order::Desc => OrderDirection::Desc,
        }
    }
}

/// Generate an ordering input object and its conversion to the core `OrderSpec`.
macro_rules! define_order_input {
    ($(#[$meta:meta])* $input:ident, $field_input:ident, $gql_name:literal, $core_field:ty,
     { $($variant:ident => $core_variant:ident),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(async_graphql::Enum, Clone, Copy, Debug, Default, PartialEq, Eq)]
        #[graphql(name = $gql_name)]
        pub enum $field_input {
            #[default]
            $($variant),+
        }

        impl From<$field_input> for $core_field {
            fn from(field: $field_input) -> Self {
                match field {
                    $($field_input::$variant => <$core_field>::$core_variant),+
                }
            }
        }

        #[derive(async_graphql::InputObject, Clone, Copy, Debug, Default)]
        pub struct $input {
            pub field: $field_input,
            pub direction: Order,
        }

        impl From<$input> for OrderSpec<$core_field> {
            fn from(order: $input) -> Self {
                OrderSpec {
                    field: order.field.into(),
                    direction: order.direction.into(),
                }
            }
        }
    };
}

define_order_input!(
    /// Ordering of the organizations connection.
    OrganizationOrder, OrganizationOrderFieldGql, "OrganizationOrderField", OrganizationOrderField,
    { Name => Name, Acronym => Acronym, Slug => Slug, Sector => Sector, DomainCount => DomainCount }
);

define_order_input!(
    /// Ordering of the domains connection.
    DomainOrder, DomainOrderFieldGql, "DomainOrderField", DomainOrderField,
    { Domain => Domain, LastRan => LastRan, HttpsStatus => HttpsStatus, SslStatus => SslStatus,
      SpfStatus => SpfStatus, DkimStatus => DkimStatus, DmarcStatus => DmarcStatus }
);

define_order_input!(
    /// Ordering of the scans connection.
    ScanOrder, ScanOrderFieldGql, "ScanOrderField", ScanOrderField,
    { ScannedAt => ScannedAt }
);

define_order_input!(
    /// Ordering of the DMARC summaries connection.
    SummaryOrder, SummaryOrderFieldGql, "SummaryOrderField", SummaryOrderField,
    { Period => Period }
);

// -----------------------------------------------------------------------------
// GraphQL Types
// -----------------------------------------------------------------------------

/// Service status.
#[derive(async_graphql::SimpleObject)]
pub struct TrackerStatus {
    pub organization_count: i64,
    pub domain_count: i64,
}

/// Rolled-up compliance status of a protocol check.
#[derive(async_graphql::Enum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compliance {
    Pass,
    Fail,
    Info,
}

impl From<tracker_core::models::ComplianceStatus> for Compliance {
    fn from(status: tracker_core::models::ComplianceStatus) -> Self {
        use tracker_core::models::ComplianceStatus as S;
        match status {
            S::Pass => Compliance::Pass,
            S::Fail => Compliance::Fail,
            S::Info => Compliance::Info,
        }
    }
}

/// DMARC deployment phase.
#[derive(async_graphql::Enum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DmarcPhase {
    Assess,
    Deploy,
    Enforce,
    Maintain,
    NotImplemented,
}

impl From<tracker_core::models::DmarcPhase> for DmarcPhase {
    fn from(phase: tracker_core::models::DmarcPhase) -> Self {
        use tracker_core::models::DmarcPhase as P;
        match phase {
            P::Assess => DmarcPhase::Assess,
            P::Deploy => DmarcPhase::Deploy,
            P::Enforce => DmarcPhase::Enforce,
            P::Maintain => DmarcPhase::Maintain,
            P::NotImplemented => DmarcPhase::NotImplemented,
        }
    }
}

/// The protocol a scan result covers.
#[derive(async_graphql::Enum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanType {
    Https,
    Ssl,
    Dkim,
    Spf,
    Dmarc,
}

impl From<ScanType> for tracker_core::models::ScanKind {
    fn from(kind: ScanType) -> Self {
        use tracker_core::models::ScanKind as K;
        match kind {
            ScanType::Https => K::Https,
            ScanType::Ssl => K::Ssl,
            ScanType::Dkim => K::Dkim,
            ScanType::Spf => K::Spf,
            ScanType::Dmarc => K::Dmarc,
        }
    }
}

impl From<tracker_core::models::ScanKind> for ScanType {
    fn from(kind: tracker_core::models::ScanKind) -> Self {
        use tracker_core::models::ScanKind as K;
        match kind {
            K::Https => ScanType::Https,
            K::Ssl => ScanType::Ssl,
            K::Dkim => ScanType::Dkim,
            K::Spf => ScanType::Spf,
            K::Dmarc => ScanType::Dmarc,
        }
    }
}

/// Organization type.
#[derive(async_graphql::SimpleObject)]
pub struct Organization {
    pub key: String,
    pub slug: String,
    pub name: String,
    pub acronym: String,
    pub sector: String,
    pub verified: bool,
    pub domain_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<tracker_core::models::Organization> for Organization {
    fn from(org: tracker_core::models::Organization) -> Self {
        Self {
            key: org.key,
            slug: org.slug,
            name: org.name,
            acronym: org.acronym,
            sector: org.sector,
            verified: org.verified,
            domain_count: org.domain_count as i64,
            created_at: org.created_at,
        }
    }
}

/// Domain type.
#[derive(async_graphql::SimpleObject)]
pub struct Domain {
    pub key: String,
    pub domain: String,
    pub last_ran: DateTime<Utc>,
    pub selectors: Vec<String>,
    pub https_status: Compliance,
    pub ssl_status: Compliance,
    pub spf_status: Compliance,
    pub dkim_status: Compliance,
    pub dmarc_status: Compliance,
    pub dmarc_phase: DmarcPhase,
    /// Key of the organization this domain was listed through, when reached
    /// via an organization's claimed-domains connection.
    pub claimed_by: Option<String>,
}

impl From<tracker_core::models::Domain> for Domain {
    fn from(domain: tracker_core::models::Domain) -> Self {
        Self {
            key: domain.key,
            domain: domain.domain,
            last_ran: domain.last_ran,
            selectors: domain.selectors,
            https_status: domain.https_status.into(),
            ssl_status: domain.ssl_status.into(),
            spf_status: domain.spf_status.into(),
            dkim_status: domain.dkim_status.into(),
            dmarc_status: domain.dmarc_status.into(),
            dmarc_phase: domain.dmarc_phase.into(),
            claimed_by: domain.claimed_by,
        }
    }
}

/// Scan result type.
#[derive(async_graphql::SimpleObject)]
pub struct Scan {
    pub key: String,
    pub domain_key: String,
    pub scan_type: ScanType,
    pub scanned_at: DateTime<Utc>,
    pub status: Compliance,
    pub data: serde_json::Value,
}

impl From<tracker_core::models::Scan> for Scan {
    fn from(scan: tracker_core::models::Scan) -> Self {
        Self {
            key: scan.key,
            domain_key: scan.domain_key,
            scan_type: scan.kind.into(),
            scanned_at: scan.scanned_at,
            status: scan.status.into(),
            data: scan.data,
        }
    }
}

/// Message counts by DMARC disposition category.
#[derive(async_graphql::SimpleObject)]
pub struct CategoryTotals {
    pub full_pass: i64,
    pub pass_dkim_only: i64,
    pub pass_spf_only: i64,
    pub fail: i64,
}

/// Monthly DMARC aggregate summary.
#[derive(async_graphql::SimpleObject)]
pub struct DmarcSummary {
    pub key: String,
    pub domain_key: String,
    pub period: NaiveDate,
    pub total_messages: i64,
    pub categories: CategoryTotals,
}

impl From<tracker_core::models::DmarcSummary> for DmarcSummary {
    fn from(summary: tracker_core::models::DmarcSummary) -> Self {
        Self {
            key: summary.key,
            domain_key: summary.domain_key,
            period: summary.period,
            total_messages: summary.total_messages as i64,
            categories: CategoryTotals {
                full_pass: summary.categories.full_pass as i64,
                pass_dkim_only: summary.categories.pass_dkim_only as i64,
                pass_spf_only: summary.categories.pass_spf_only as i64,
                fail: summary.categories.fail as i64,
            },
        }
    }
}

// -----------------------------------------------------------------------------
// Connection Types (Relay-style pagination)
// -----------------------------------------------------------------------------

/// Page information; cursors are empty strings when the page has no edges.
#[derive(async_graphql::SimpleObject)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: String,
    pub end_cursor: String,
}

/// Generate Relay-style connection types (Edge + Connection) with From impl.
macro_rules! define_connection {
    ($node:ty, $core_model:ty, $edge:ident, $connection:ident) => {
        #[derive(async_graphql::SimpleObject)]
        pub struct $edge {
            pub node: $node,
            pub cursor: String,
        }

        #[derive(async_graphql::SimpleObject)]
        pub struct $connection {
            pub edges: Vec<$edge>,
            pub page_info: PageInfo,
            pub total_count: i64,
        }

        impl From<tracker_core::ports::Connection<$core_model>> for $connection {
            fn from(conn: tracker_core::ports::Connection<$core_model>) -> Self {
                Self {
                    edges: conn
                        .edges
                        .into_iter()
                        .map(|e| $edge {
                            node: <$node>::from(e.node),
                            cursor: e.cursor,
                        })
                        .collect(),
                    page_info: PageInfo {
                        has_next_page: conn.page_info.has_next_page,
                        has_previous_page: conn.page_info.has_previous_page,
                        start_cursor: conn.page_info.start_cursor,
                        end_cursor: conn.page_info.end_cursor,
                    },
                    total_count: conn.total_count as i64,
                }
            }
        }
    };
}

define_connection!(
    Organization,
    tracker_core::models::Organization,
    OrganizationEdge,
    OrganizationConnection
);
define_connection!(Domain, tracker_core::models::Domain, DomainEdge, DomainConnection);
define_connection!(Scan, tracker_core::models::Scan, ScanEdge, ScanConnection);
define_connection!(
    DmarcSummary,
    tracker_core::models::DmarcSummary,
    DmarcSummaryEdge,
    DmarcSummaryConnection
);

// -----------------------------------------------------------------------------
// Helpers & Validation
// -----------------------------------------------------------------------------

/// Maximum length for string filter parameters (longest valid FQDN).
const MAX_FILTER_STRING_LENGTH: usize = 253;

/// Assemble raw pagination arguments from transport-level values.
///
/// Limits stay unvalidated here; the pagination core owns the rules and the
/// error messages.
fn page_args(
    first: Option<i32>,
    last: Option<i32>,
    after: Option<String>,
    before: Option<String>,
) -> PageArgs {
    PageArgs {
        first: first.map(serde_json::Value::from),
        last: last.map(serde_json::Value::from),
        after,
        before,
    }
}

/// The acting viewer of the current request, if the server attached one.
fn viewer_of(ctx: &Context<'_>) -> Viewer {
    ctx.data_opt::<Viewer>().cloned().unwrap_or_default()
}

/// Validate a filter string parameter.
fn validate_filter_string(value: &str, field_name: &str) -> Result<()> {
    if value.is_empty() {
        return Err(async_graphql::Error::new(format!(
            "{} cannot be empty",
            field_name
        )));
    }
    if value.len() > MAX_FILTER_STRING_LENGTH {
        return Err(async_graphql::Error::new(format!(
            "{} too long: maximum {} characters allowed",
            field_name, MAX_FILTER_STRING_LENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracker_core::models::ComplianceStatus;
    use tracker_core::ports::{Connection, Edge, PageInfo as CorePageInfo};

    #[test]
    fn test_page_args_keep_limits_as_numbers() {
        let args = page_args(Some(20), None, Some("abc".into()), None);
        assert_eq!(args.first, Some(serde_json::Value::from(20)));
        assert!(args.last.is_none());
        assert_eq!(args.after.as_deref(), Some("abc"));
    }

    #[test]
    fn test_default_orders() {
        let spec: OrderSpec<OrganizationOrderField> = OrganizationOrder::default().into();
        assert_eq!(spec.field, OrganizationOrderField::Name);
        assert_eq!(spec.direction, OrderDirection::Asc);

        let spec: OrderSpec<DomainOrderField> = DomainOrder {
            field: DomainOrderFieldGql::LastRan,
            direction: Order::Desc,
        }
        .into();
        assert_eq!(spec.field, DomainOrderField::LastRan);
        assert_eq!(spec.direction, OrderDirection::Desc);
    }

    #[test]
    fn test_scan_type_roundtrip() {
        use tracker_core::models::ScanKind;
        for kind in [
            ScanKind::Https,
            ScanKind::Ssl,
            ScanKind::Dkim,
            ScanKind::Spf,
            ScanKind::Dmarc,
        ] {
            assert_eq!(ScanKind::from(ScanType::from(kind)), kind);
        }
    }

    // Test critique: la forme du connection est un contrat avec le frontend
    #[test]
    fn test_connection_conversion_preserves_the_contract() {
        let conn = Connection {
            edges: vec![Edge {
                node: tracker_core::models::Domain {
                    key: "domains/1".into(),
                    domain: "example.gc.ca".into(),
                    last_ran: Utc::now(),
                    selectors: vec!["selector1".into()],
                    https_status: ComplianceStatus::Pass,
                    ssl_status: ComplianceStatus::Fail,
                    spf_status: ComplianceStatus::Info,
                    dkim_status: ComplianceStatus::Pass,
                    dmarc_status: ComplianceStatus::Pass,
                    dmarc_phase: tracker_core::models::DmarcPhase::Enforce,
                    claimed_by: Some("organizations/9".into()),
                },
                cursor: "Y3Vyc29y".into(),
            }],
            page_info: CorePageInfo {
                has_next_page: true,
                has_previous_page: false,
                start_cursor: "Y3Vyc29y".into(),
                end_cursor: "Y3Vyc29y".into(),
            },
            total_count: 12,
        };

        let gql = DomainConnection::from(conn);
        assert_eq!(gql.edges.len(), 1);
        assert_eq!(gql.edges[0].cursor, "Y3Vyc29y");
        assert_eq!(gql.edges[0].node.claimed_by.as_deref(), Some("organizations/9"));
        assert_eq!(gql.total_count, 12);
        assert!(gql.page_info.has_next_page);
    }

    #[test]
    fn test_empty_connection_has_empty_string_cursors() {
        let gql = DomainConnection::from(Connection::<tracker_core::models::Domain>::empty());
        assert!(gql.edges.is_empty());
        assert_eq!(gql.page_info.start_cursor, "");
        assert_eq!(gql.page_info.end_cursor, "");
        assert_eq!(gql.total_count, 0);
    }

    #[test]
    fn test_validate_filter_string_boundaries() {
        // Vide = erreur (évite les requêtes inutiles)
        assert!(validate_filter_string("", "domain").is_err());
        // Trop long = erreur (DoS prevention)
        assert!(validate_filter_string(&"x".repeat(300), "domain").is_err());
        assert!(validate_filter_string("example.gc.ca", "domain").is_ok());
    }
}
