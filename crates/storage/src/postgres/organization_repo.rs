//! Organization repository implementation for PostgreSQL.

use async_trait::async_trait;
use sqlx::PgPool;

use tracker_core::error::{ConnectionResult, FetchResult, StorageError, StorageResult};
use tracker_core::models::{Organization, Viewer};
use tracker_core::ports::{
    Connection, ConnectionSource, KeyFetcher, OrderSpec, OrganizationOrderField,
    OrganizationRepository, PageArgs, Paginator, Slice,
};

use super::database::Database;
use super::helpers::fetch_err;
use super::slice::window_clauses;

const COLUMNS: &str = "key, slug, name, acronym, sector, verified, domain_count, created_at";

/// PostgreSQL implementation of OrganizationRepository.
pub struct PgOrganizationRepository {
    pool: PgPool,
}

impl PgOrganizationRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl OrganizationRepository for PgOrganizationRepository {
    async fn upsert_organizations(&self, orgs: &[Organization]) -> StorageResult<()> {
        if orgs.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::TransactionError(e.to_string()))?;

        for org in orgs {
            sqlx::query(
                r#"
                INSERT INTO organizations (
                    key, slug, name, acronym, sector, verified, domain_count, created_at
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (key) DO UPDATE SET
                    slug = EXCLUDED.slug,
                    name = EXCLUDED.name,
                    acronym = EXCLUDED.acronym,
                    sector = EXCLUDED.sector,
                    verified = EXCLUDED.verified
                "#,
            )
            .bind(&org.key)
            .bind(&org.slug)
            .bind(&org.name)
            .bind(&org.acronym)
            .bind(&org.sector)
            .bind(org.verified)
            .bind(org.domain_count as i32)
            .bind(org.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::TransactionError(e.to_string()))?;

        Ok(())
    }

    async fn get_organization(&self, key: &str) -> StorageResult<Option<Organization>> {
        let row = sqlx::query_as::<_, OrganizationRow>(&format!(
            "SELECT {} FROM organizations WHERE key = $1",
            COLUMNS
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(row.map(OrganizationRow::into_organization))
    }

    async fn find_organization_by_slug(&self, slug: &str) -> StorageResult<Option<Organization>> {
        let row = sqlx::query_as::<_, OrganizationRow>(&format!(
            "SELECT {} FROM organizations WHERE slug = $1",
            COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(row.map(OrganizationRow::into_organization))
    }

    async fn count_organizations(&self) -> StorageResult<u64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM organizations")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;
        Ok(count.0 as u64)
    }

    async fn list_organizations(
        &self,
        order: OrderSpec<OrganizationOrderField>,
        args: &PageArgs,
        viewer: &Viewer,
    ) -> ConnectionResult<Connection<Organization>> {
        let source = OrganizationsSource {
            pool: self.pool.clone(),
        };
        Paginator::new(&source)
            .for_viewer(viewer)
            .paginate(order, args)
            .await
    }
}

#[async_trait]
impl KeyFetcher for PgOrganizationRepository {
    type Value = Organization;

    async fn fetch_keys(&self, keys: &[String]) -> FetchResult<Vec<Organization>> {
        let rows = sqlx::query_as::<_, OrganizationRow>(&format!(
            "SELECT {} FROM organizations WHERE key = ANY($1)",
            COLUMNS
        ))
        .bind(keys)
        .fetch_all(&self.pool)
        .await
        .map_err(fetch_err)?;

        Ok(rows
            .into_iter()
            .map(OrganizationRow::into_organization)
            .collect())
    }
}

// =============================================================================
// Connection Source
// =============================================================================

/// All registered organizations, as a connection source.
struct OrganizationsSource {
    pool: PgPool,
}

#[async_trait]
impl ConnectionSource for OrganizationsSource {
    type Node = Organization;
    type Field = OrganizationOrderField;

    fn name(&self) -> &'static str {
        "Organization"
    }

    fn subject(&self) -> &'static str {
        "organizations"
    }

    fn type_tag(&self) -> &'static str {
        "organizations"
    }

    async fn total(&self) -> FetchResult<u64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM organizations")
            .fetch_one(&self.pool)
            .await
            .map_err(fetch_err)?;
        Ok(count.0 as u64)
    }

    async fn slice(&self, slice: &Slice<OrganizationOrderField>) -> FetchResult<Vec<Organization>> {
        let column = order_column(slice.order.field);
        let window = window_clauses("organizations", column, "", slice, 1);

        let mut sql = format!("SELECT {} FROM organizations", COLUMNS);
        if !window.conditions.is_empty() {
            sql.push_str(&format!(" WHERE {}", window.conditions.join(" AND ")));
        }
        sql.push_str(&format!(" {} LIMIT {}", window.order_by, window.limit));

        let mut query = sqlx::query_as::<_, OrganizationRow>(&sql);
        for key in &window.binds {
            query = query.bind(key);
        }

        let rows = query.fetch_all(&self.pool).await.map_err(fetch_err)?;
        Ok(rows
            .into_iter()
            .map(OrganizationRow::into_organization)
            .collect())
    }
}

fn order_column(field: OrganizationOrderField) -> &'static str {
    match field {
        OrganizationOrderField::Name => "name",
        OrganizationOrderField::Acronym => "acronym",
        OrganizationOrderField::Slug => "slug",
        OrganizationOrderField::Sector => "sector",
        OrganizationOrderField::DomainCount => "domain_count",
    }
}

// =============================================================================
// Row mapping
// =============================================================================

#[derive(sqlx::FromRow)]
struct OrganizationRow {
    key: String,
    slug: String,
    name: String,
    acronym: String,
    sector: String,
    verified: bool,
    domain_count: i32,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl OrganizationRow {
    fn into_organization(self) -> Organization {
        Organization {
            key: self.key,
            slug: self.slug,
            name: self.name,
            acronym: self.acronym,
            sector: self.sector,
            verified: self.verified,
            domain_count: self.domain_count.max(0) as u32,
            created_at: self.created_at,
        }
    }
}
