//! Scan-result repository implementation for PostgreSQL.

use async_trait::async_trait;
use sqlx::PgPool;

use tracker_core::error::{ConnectionResult, FetchError, FetchResult, StorageError, StorageResult};
use tracker_core::models::{Scan, ScanKind, Viewer};
use tracker_core::ports::{
    Connection, ConnectionSource, KeyFetcher, OrderSpec, PageArgs, Paginator, ScanOrderField,
    ScanRepository, Slice,
};

use super::database::Database;
use super::helpers::{decode_kind, decode_status, fetch_err};
use super::slice::window_clauses;

const COLUMNS: &str = "key, domain_key, kind, scanned_at, status, data";

/// PostgreSQL implementation of ScanRepository.
pub struct PgScanRepository {
    pool: PgPool,
}

impl PgScanRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl ScanRepository for PgScanRepository {
    async fn insert_scans(&self, scans: &[Scan]) -> StorageResult<()> {
        if scans.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::TransactionError(e.to_string()))?;

        for scan in scans {
            sqlx::query(
                r#"
                INSERT INTO scans (key, domain_key, kind, scanned_at, status, data)
                VALUES ($1, $2, $3, $4, $5, $6)
                ON CONFLICT (key) DO NOTHING
                "#,
            )
            .bind(&scan.key)
            .bind(&scan.domain_key)
            .bind(scan.kind.as_str())
            .bind(scan.scanned_at)
            .bind(scan.status.as_str())
            .bind(&scan.data)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::TransactionError(e.to_string()))?;

        Ok(())
    }

    async fn list_scans(
        &self,
        domain_key: &str,
        kind: Option<ScanKind>,
        order: OrderSpec<ScanOrderField>,
        args: &PageArgs,
        viewer: &Viewer,
    ) -> ConnectionResult<Connection<Scan>> {
        let source = DomainScansSource {
            pool: self.pool.clone(),
            domain_key: domain_key.to_string(),
            kind,
        };
        Paginator::new(&source)
            .for_viewer(viewer)
            .paginate(order, args)
            .await
    }
}

#[async_trait]
impl KeyFetcher for PgScanRepository {
    type Value = Scan;

    async fn fetch_keys(&self, keys: &[String]) -> FetchResult<Vec<Scan>> {
        let rows = sqlx::query_as::<_, ScanRow>(&format!(
            "SELECT {} FROM scans WHERE key = ANY($1)",
            COLUMNS
        ))
        .bind(keys)
        .fetch_all(&self.pool)
        .await
        .map_err(fetch_err)?;

        rows.into_iter()
            .map(|r| r.into_scan().map_err(FetchError::Cursor))
            .collect()
    }
}

// =============================================================================
// Connection Source
// =============================================================================

/// One domain's scan results, optionally filtered to one kind.
struct DomainScansSource {
    pool: PgPool,
    domain_key: String,
    kind: Option<ScanKind>,
}

#[async_trait]
impl ConnectionSource for DomainScansSource {
    type Node = Scan;
    type Field = ScanOrderField;

    fn name(&self) -> &'static str {
        match self.kind {
            Some(ScanKind::Https) => "HTTPS",
            Some(ScanKind::Ssl) => "SSL",
            Some(ScanKind::Dkim) => "DKIM",
            Some(ScanKind::Spf) => "SPF",
            Some(ScanKind::Dmarc) => "DMARC",
            None => "Scan",
        }
    }

    fn subject(&self) -> &'static str {
        match self.kind {
            Some(ScanKind::Https) => "HTTPS scans",
            Some(ScanKind::Ssl) => "SSL scans",
            Some(ScanKind::Dkim) => "DKIM scans",
            Some(ScanKind::Spf) => "SPF scans",
            Some(ScanKind::Dmarc) => "DMARC scans",
            None => "scans",
        }
    }

    fn type_tag(&self) -> &'static str {
        "scans"
    }

    fn root(&self) -> Option<&str> {
        Some(&self.domain_key)
    }

    async fn total(&self) -> FetchResult<u64> {
        let count: (i64,) = if let Some(kind) = self.kind {
            sqlx::query_as("SELECT COUNT(*) FROM scans WHERE domain_key = $1 AND kind = $2")
                .bind(&self.domain_key)
                .bind(kind.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(fetch_err)?
        } else {
            sqlx::query_as("SELECT COUNT(*) FROM scans WHERE domain_key = $1")
                .bind(&self.domain_key)
                .fetch_one(&self.pool)
                .await
                .map_err(fetch_err)?
        };
        Ok(count.0 as u64)
    }

    async fn slice(&self, slice: &Slice<ScanOrderField>) -> FetchResult<Vec<Scan>> {
        let ScanOrderField::ScannedAt = slice.order.field;
        let first_window_param = if self.kind.is_some() { 3 } else { 2 };
        let window = window_clauses("scans", "scanned_at", "", slice, first_window_param);

        let mut sql = format!("SELECT {} FROM scans WHERE domain_key = $1", COLUMNS);
        if self.kind.is_some() {
            sql.push_str(" AND kind = $2");
        }
        for condition in &window.conditions {
            sql.push_str(&format!(" AND {}", condition));
        }
        sql.push_str(&format!(" {} LIMIT {}", window.order_by, window.limit));

        let mut query = sqlx::query_as::<_, ScanRow>(&sql).bind(&self.domain_key);
        if let Some(kind) = self.kind {
            query = query.bind(kind.as_str());
        }
        for key in &window.binds {
            query = query.bind(key);
        }

        let rows = query.fetch_all(&self.pool).await.map_err(fetch_err)?;
        rows.into_iter()
            .map(|r| r.into_scan().map_err(FetchError::Cursor))
            .collect()
    }
}

// =============================================================================
// Row mapping
// =============================================================================

#[derive(sqlx::FromRow)]
struct ScanRow {
    key: String,
    domain_key: String,
    kind: String,
    scanned_at: chrono::DateTime<chrono::Utc>,
    status: String,
    data: serde_json::Value,
}

impl ScanRow {
    fn into_scan(self) -> Result<Scan, String> {
        Ok(Scan {
            kind: decode_kind(&self.kind)?,
            status: decode_status(&self.status, "scans.status")?,
            key: self.key,
            domain_key: self.domain_key,
            scanned_at: self.scanned_at,
            data: self.data,
        })
    }
}
