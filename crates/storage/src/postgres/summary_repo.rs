//! DMARC summary repository implementation for PostgreSQL.

use async_trait::async_trait;
use sqlx::PgPool;

use tracker_core::error::{ConnectionResult, FetchResult, StorageError, StorageResult};
use tracker_core::models::{CategoryTotals, DmarcSummary, Viewer};
use tracker_core::ports::{
    Connection, ConnectionSource, DmarcSummaryRepository, OrderSpec, PageArgs, Paginator, Slice,
    SummaryOrderField,
};

use super::database::Database;
use super::helpers::fetch_err;
use super::slice::window_clauses;

const COLUMNS: &str =
    "key, domain_key, period, total_messages, full_pass, pass_dkim_only, pass_spf_only, fail";

/// PostgreSQL implementation of DmarcSummaryRepository.
pub struct PgDmarcSummaryRepository {
    pool: PgPool,
}

impl PgDmarcSummaryRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl DmarcSummaryRepository for PgDmarcSummaryRepository {
    async fn upsert_summaries(&self, summaries: &[DmarcSummary]) -> StorageResult<()> {
        if summaries.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::TransactionError(e.to_string()))?;

        for summary in summaries {
            sqlx::query(
                r#"
                INSERT INTO dmarc_summaries (
                    key, domain_key, period, total_messages,
                    full_pass, pass_dkim_only, pass_spf_only, fail
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                ON CONFLICT (key) DO UPDATE SET
                    total_messages = EXCLUDED.total_messages,
                    full_pass = EXCLUDED.full_pass,
                    pass_dkim_only = EXCLUDED.pass_dkim_only,
                    pass_spf_only = EXCLUDED.pass_spf_only,
                    fail = EXCLUDED.fail
                "#,
            )
            .bind(&summary.key)
            .bind(&summary.domain_key)
            .bind(summary.period)
            .bind(summary.total_messages as i64)
            .bind(summary.categories.full_pass as i64)
            .bind(summary.categories.pass_dkim_only as i64)
            .bind(summary.categories.pass_spf_only as i64)
            .bind(summary.categories.fail as i64)
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::TransactionError(e.to_string()))?;

        Ok(())
    }

    async fn list_summaries(
        &self,
        domain_key: &str,
        order: OrderSpec<SummaryOrderField>,
        args: &PageArgs,
        viewer: &Viewer,
    ) -> ConnectionResult<Connection<DmarcSummary>> {
        let source = DomainSummariesSource {
            pool: self.pool.clone(),
            domain_key: domain_key.to_string(),
        };
        Paginator::new(&source)
            .for_viewer(viewer)
            .paginate(order, args)
            .await
    }
}

// =============================================================================
// Connection Source
// =============================================================================

/// One domain's monthly DMARC summaries.
struct DomainSummariesSource {
    pool: PgPool,
    domain_key: String,
}

#[async_trait]
impl ConnectionSource for DomainSummariesSource {
    type Node = DmarcSummary;
    type Field = SummaryOrderField;

    fn name(&self) -> &'static str {
        "DmarcSummary"
    }

    fn subject(&self) -> &'static str {
        "DMARC summaries"
    }

    fn type_tag(&self) -> &'static str {
        "dmarcSummaries"
    }

    fn root(&self) -> Option<&str> {
        Some(&self.domain_key)
    }

    async fn total(&self) -> FetchResult<u64> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM dmarc_summaries WHERE domain_key = $1")
                .bind(&self.domain_key)
                .fetch_one(&self.pool)
                .await
                .map_err(fetch_err)?;
        Ok(count.0 as u64)
    }

    async fn slice(&self, slice: &Slice<SummaryOrderField>) -> FetchResult<Vec<DmarcSummary>> {
        let SummaryOrderField::Period = slice.order.field;
        let window = window_clauses("dmarc_summaries", "period", "", slice, 2);

        let mut sql = format!(
            "SELECT {} FROM dmarc_summaries WHERE domain_key = $1",
            COLUMNS
        );
        for condition in &window.conditions {
            sql.push_str(&format!(" AND {}", condition));
        }
        sql.push_str(&format!(" {} LIMIT {}", window.order_by, window.limit));

        let mut query = sqlx::query_as::<_, SummaryRow>(&sql).bind(&self.domain_key);
        for key in &window.binds {
            query = query.bind(key);
        }

        let rows = query.fetch_all(&self.pool).await.map_err(fetch_err)?;
        Ok(rows.into_iter().map(SummaryRow::into_summary).collect())
    }
}

// =============================================================================
// Row mapping
// =============================================================================

#[derive(sqlx::FromRow)]
struct SummaryRow {
    key: String,
    domain_key: String,
    period: chrono::NaiveDate,
    total_messages: i64,
    full_pass: i64,
    pass_dkim_only: i64,
    pass_spf_only: i64,
    fail: i64,
}

impl SummaryRow {
    fn into_summary(self) -> DmarcSummary {
        DmarcSummary {
            key: self.key,
            domain_key: self.domain_key,
            period: self.period,
            total_messages: self.total_messages.max(0) as u64,
            categories: CategoryTotals {
                full_pass: self.full_pass.max(0) as u64,
                pass_dkim_only: self.pass_dkim_only.max(0) as u64,
                pass_spf_only: self.pass_spf_only.max(0) as u64,
                fail: self.fail.max(0) as u64,
            },
        }
    }
}
