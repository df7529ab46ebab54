use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};

use crate::error::{IdempotencyError, Result};
use crate::guard::IdempotencyGuard;
use crate::record::{IdempotencyRecord, SagaKey};

/// PostgreSQL-backed idempotency guard.
///
/// Each participant owns one table (see `migrations/`), named at
/// construction time. The insert-if-absent of `record_attempt` is a single
/// `INSERT .. ON CONFLICT DO NOTHING`, so the at-most-once guarantee holds
/// across processes, not just tasks.
#[derive(Clone)]
pub struct PostgresIdempotencyGuard {
    pool: PgPool,
    table: String,
}

impl PostgresIdempotencyGuard {
    /// Creates a guard over the given participant table.
    ///
    /// `table` must be one of the participant tables created by the
    /// migrations; it is interpolated into SQL and must never come from
    /// input.
    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        let table = table.into();
        debug_assert!(
            table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_'),
            "table name must be a plain SQL identifier"
        );
        Self { pool, table }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_record(row: PgRow) -> Result<IdempotencyRecord> {
        Ok(IdempotencyRecord {
            key: SagaKey::new(
                row.try_get::<String, _>("order_id")?,
                row.try_get::<String, _>("transaction_id")?,
            ),
            success: row.try_get("success")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl IdempotencyGuard for PostgresIdempotencyGuard {
    async fn exists(&self, key: &SagaKey) -> Result<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE order_id = $1 AND transaction_id = $2)",
            self.table
        );
        let exists: bool = sqlx::query_scalar(&sql)
            .bind(key.order_id.as_str())
            .bind(key.transaction_id.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn find(&self, key: &SagaKey) -> Result<Option<IdempotencyRecord>> {
        let sql = format!(
            "SELECT order_id, transaction_id, success, created_at, updated_at \
             FROM {} WHERE order_id = $1 AND transaction_id = $2",
            self.table
        );
        let row = sqlx::query(&sql)
            .bind(key.order_id.as_str())
            .bind(key.transaction_id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_record).transpose()
    }

    async fn record_attempt(&self, key: &SagaKey, success: bool) -> Result<IdempotencyRecord> {
        let sql = format!(
            "INSERT INTO {} (order_id, transaction_id, success) \
             VALUES ($1, $2, $3) \
             ON CONFLICT (order_id, transaction_id) DO NOTHING \
             RETURNING order_id, transaction_id, success, created_at, updated_at",
            self.table
        );
        let row = sqlx::query(&sql)
            .bind(key.order_id.as_str())
            .bind(key.transaction_id.as_str())
            .bind(success)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Self::row_to_record(row),
            None => Err(IdempotencyError::DuplicateAttempt(key.clone())),
        }
    }

    async fn mark_failed(&self, key: &SagaKey) -> Result<IdempotencyRecord> {
        let sql = format!(
            "INSERT INTO {} (order_id, transaction_id, success) \
             VALUES ($1, $2, FALSE) \
             ON CONFLICT (order_id, transaction_id) \
             DO UPDATE SET success = FALSE, updated_at = now() \
             RETURNING order_id, transaction_id, success, created_at, updated_at",
            self.table
        );
        let row = sqlx::query(&sql)
            .bind(key.order_id.as_str())
            .bind(key.transaction_id.as_str())
            .fetch_one(&self.pool)
            .await?;

        Self::row_to_record(row)
    }
}
