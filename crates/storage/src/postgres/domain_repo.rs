//! Domain repository implementation for PostgreSQL.
//!
//! Besides plain CRUD, this module provides the two domain connection
//! sources: all registered domains, and the domains claimed by one
//! organization. The claimed-domains source joins through the `claims`
//! table and injects the claiming organization's key onto each node in its
//! decorate step.

use async_trait::async_trait;
use sqlx::PgPool;

use tracker_core::error::{ConnectionResult, FetchError, FetchResult, StorageError, StorageResult};
use tracker_core::models::{Domain, Viewer};
use tracker_core::ports::{
    Connection, ConnectionSource, DomainOrderField, DomainRepository, KeyFetcher, OrderSpec,
    PageArgs, Paginator, Slice,
};

use super::database::Database;
use super::helpers::{decode_phase, decode_status, fetch_err};
use super::slice::window_clauses;

const COLUMNS: &str = "key, domain, last_ran, selectors, https_status, ssl_status, spf_status, \
                       dkim_status, dmarc_status, dmarc_phase";

/// PostgreSQL implementation of DomainRepository.
pub struct PgDomainRepository {
    pool: PgPool,
}

impl PgDomainRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl DomainRepository for PgDomainRepository {
    async fn upsert_domains(&self, domains: &[Domain]) -> StorageResult<()> {
        if domains.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::TransactionError(e.to_string()))?;

        for domain in domains {
            sqlx::query(
                r#"
                INSERT INTO domains (
                    key, domain, last_ran, selectors, https_status, ssl_status,
                    spf_status, dkim_status, dmarc_status, dmarc_phase
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (key) DO UPDATE SET
                    domain = EXCLUDED.domain,
                    last_ran = EXCLUDED.last_ran,
                    selectors = EXCLUDED.selectors,
                    https_status = EXCLUDED.https_status,
                    ssl_status = EXCLUDED.ssl_status,
                    spf_status = EXCLUDED.spf_status,
                    dkim_status = EXCLUDED.dkim_status,
                    dmarc_status = EXCLUDED.dmarc_status,
                    dmarc_phase = EXCLUDED.dmarc_phase
                "#,
            )
            .bind(&domain.key)
            .bind(&domain.domain)
            .bind(domain.last_ran)
            .bind(&domain.selectors)
            .bind(domain.https_status.as_str())
            .bind(domain.ssl_status.as_str())
            .bind(domain.spf_status.as_str())
            .bind(domain.dkim_status.as_str())
            .bind(domain.dmarc_status.as_str())
            .bind(domain.dmarc_phase.as_str())
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::TransactionError(e.to_string()))?;

        Ok(())
    }

    async fn get_domain(&self, key: &str) -> StorageResult<Option<Domain>> {
        let row = sqlx::query_as::<_, DomainRow>(&format!(
            "SELECT {} FROM domains WHERE key = $1",
            COLUMNS
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        row.map(|r| {
            r.into_domain()
                .map_err(StorageError::SerializationError)
        })
        .transpose()
    }

    async fn find_domain(&self, fqdn: &str) -> StorageResult<Option<Domain>> {
        let row = sqlx::query_as::<_, DomainRow>(&format!(
            "SELECT {} FROM domains WHERE domain = $1",
            COLUMNS
        ))
        .bind(fqdn)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        row.map(|r| {
            r.into_domain()
                .map_err(StorageError::SerializationError)
        })
        .transpose()
    }

    async fn count_domains(&self) -> StorageResult<u64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM domains")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;
        Ok(count.0 as u64)
    }

    async fn claim_domain(&self, organization_key: &str, domain_key: &str) -> StorageResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::TransactionError(e.to_string()))?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO claims (organization_key, domain_key)
            VALUES ($1, $2)
            ON CONFLICT (organization_key, domain_key) DO NOTHING
            "#,
        )
        .bind(organization_key)
        .bind(domain_key)
        .execute(&mut *tx)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?
        .rows_affected();

        if inserted > 0 {
            sqlx::query("UPDATE organizations SET domain_count = domain_count + 1 WHERE key = $1")
                .bind(organization_key)
                .execute(&mut *tx)
                .await
                .map_err(|e| StorageError::QueryError(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::TransactionError(e.to_string()))?;

        Ok(())
    }

    async fn list_domains(
        &self,
        order: OrderSpec<DomainOrderField>,
        args: &PageArgs,
        viewer: &Viewer,
    ) -> ConnectionResult<Connection<Domain>> {
        let source = DomainsSource {
            pool: self.pool.clone(),
        };
        Paginator::new(&source)
            .for_viewer(viewer)
            .paginate(order, args)
            .await
    }

    async fn list_claimed_domains(
        &self,
        organization_key: &str,
        order: OrderSpec<DomainOrderField>,
        args: &PageArgs,
        viewer: &Viewer,
    ) -> ConnectionResult<Connection<Domain>> {
        let source = ClaimedDomainsSource {
            pool: self.pool.clone(),
            organization_key: organization_key.to_string(),
        };
        Paginator::new(&source)
            .for_viewer(viewer)
            .paginate(order, args)
            .await
    }
}

#[async_trait]
impl KeyFetcher for PgDomainRepository {
    type Value = Domain;

    async fn fetch_keys(&self, keys: &[String]) -> FetchResult<Vec<Domain>> {
        let rows = sqlx::query_as::<_, DomainRow>(&format!(
            "SELECT {} FROM domains WHERE key = ANY($1)",
            COLUMNS
        ))
        .bind(keys)
        .fetch_all(&self.pool)
        .await
        .map_err(fetch_err)?;

        rows.into_iter()
            .map(|r| r.into_domain().map_err(FetchError::Cursor))
            .collect()
    }
}

// =============================================================================
// Connection Sources
// =============================================================================

/// All registered domains, as a connection source.
struct DomainsSource {
    pool: PgPool,
}

#[async_trait]
impl ConnectionSource for DomainsSource {
    type Node = Domain;
    type Field = DomainOrderField;

    fn name(&self) -> &'static str {
        "Domain"
    }

    fn subject(&self) -> &'static str {
        "domains"
    }

    fn type_tag(&self) -> &'static str {
        "domains"
    }

    async fn total(&self) -> FetchResult<u64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM domains")
            .fetch_one(&self.pool)
            .await
            .map_err(fetch_err)?;
        Ok(count.0 as u64)
    }

    async fn slice(&self, slice: &Slice<DomainOrderField>) -> FetchResult<Vec<Domain>> {
        let window = window_clauses("domains", order_column(slice.order.field), "", slice, 1);

        let mut sql = format!("SELECT {} FROM domains", COLUMNS);
        if !window.conditions.is_empty() {
            sql.push_str(&format!(" WHERE {}", window.conditions.join(" AND ")));
        }
        sql.push_str(&format!(" {} LIMIT {}", window.order_by, window.limit));

        let mut query = sqlx::query_as::<_, DomainRow>(&sql);
        for key in &window.binds {
            query = query.bind(key);
        }

        let rows = query.fetch_all(&self.pool).await.map_err(fetch_err)?;
        rows.into_iter()
            .map(|r| r.into_domain().map_err(FetchError::Cursor))
            .collect()
    }
}

/// The domains claimed by one organization, as a connection source.
struct ClaimedDomainsSource {
    pool: PgPool,
    organization_key: String,
}

#[async_trait]
impl ConnectionSource for ClaimedDomainsSource {
    type Node = Domain;
    type Field = DomainOrderField;

    fn name(&self) -> &'static str {
        "Domain"
    }

    fn subject(&self) -> &'static str {
        "domains"
    }

    fn type_tag(&self) -> &'static str {
        "domains"
    }

    fn root(&self) -> Option<&str> {
        Some(&self.organization_key)
    }

    async fn total(&self) -> FetchResult<u64> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM claims WHERE organization_key = $1")
                .bind(&self.organization_key)
                .fetch_one(&self.pool)
                .await
                .map_err(fetch_err)?;
        Ok(count.0 as u64)
    }

    async fn slice(&self, slice: &Slice<DomainOrderField>) -> FetchResult<Vec<Domain>> {
        let window = window_clauses("domains", order_column(slice.order.field), "d.", slice, 2);

        let qualified = COLUMNS
            .split(", ")
            .map(|c| format!("d.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!(
            "SELECT {} FROM domains d JOIN claims c ON c.domain_key = d.key \
             WHERE c.organization_key = $1",
            qualified
        );
        for condition in &window.conditions {
            sql.push_str(&format!(" AND {}", condition));
        }
        sql.push_str(&format!(" {} LIMIT {}", window.order_by, window.limit));

        let mut query = sqlx::query_as::<_, DomainRow>(&sql).bind(&self.organization_key);
        for key in &window.binds {
            query = query.bind(key);
        }

        let rows = query.fetch_all(&self.pool).await.map_err(fetch_err)?;
        rows.into_iter()
            .map(|r| r.into_domain().map_err(FetchError::Cursor))
            .collect()
    }

    fn decorate(&self, nodes: &mut [Domain]) {
        for node in nodes {
            node.claimed_by = Some(self.organization_key.clone());
        }
    }
}

fn order_column(field: DomainOrderField) -> &'static str {
    match field {
        DomainOrderField::Domain => "domain",
        DomainOrderField::LastRan => "last_ran",
        DomainOrderField::HttpsStatus => "https_status",
        DomainOrderField::SslStatus => "ssl_status",
        DomainOrderField::SpfStatus => "spf_status",
        DomainOrderField::DkimStatus => "dkim_status",
        DomainOrderField::DmarcStatus => "dmarc_status",
    }
}

// =============================================================================
// Row mapping
// =============================================================================

#[derive(sqlx::FromRow)]
struct DomainRow {
    key: String,
    domain: String,
    last_ran: chrono::DateTime<chrono::Utc>,
    selectors: Vec<String>,
    https_status: String,
    ssl_status: String,
    spf_status: String,
    dkim_status: String,
    dmarc_status: String,
    dmarc_phase: String,
}

impl DomainRow {
    fn into_domain(self) -> Result<Domain, String> {
        Ok(Domain {
            https_status: decode_status(&self.https_status, "domains.https_status")?,
            ssl_status: decode_status(&self.ssl_status, "domains.ssl_status")?,
            spf_status: decode_status(&self.spf_status, "domains.spf_status")?,
            dkim_status: decode_status(&self.dkim_status, "domains.dkim_status")?,
            dmarc_status: decode_status(&self.dmarc_status, "domains.dmarc_status")?,
            dmarc_phase: decode_phase(&self.dmarc_phase)?,
            key: self.key,
            domain: self.domain,
            last_ran: self.last_ran,
            selectors: self.selectors,
            claimed_by: None,
        })
    }
}
