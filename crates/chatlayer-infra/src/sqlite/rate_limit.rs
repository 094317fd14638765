//! SQLite rate-limit repository implementation.
//!
//! One row per `(user_id, endpoint, period_start)` hour bucket. `increment`
//! is a single upsert statement so concurrent callers, including other
//! processes sharing the database file, never lose a count.

use chatlayer_core::clock::{SharedClock, system_clock};
use chatlayer_core::rate_limit::{bucket_start, retention_cutoff, usage_window_start};
use chatlayer_core::repository::rate_limit::RateLimitRepository;
use chatlayer_types::error::RepositoryError;
use chatlayer_types::rate_limit::RateLimitBucket;
use sqlx::Row;

use super::pool::DatabasePool;
use super::{format_datetime, map_sqlx_error, parse_datetime};

/// SQLite-backed implementation of `RateLimitRepository`.
pub struct SqliteRateLimitRepository {
    pool: DatabasePool,
    clock: SharedClock,
}

impl SqliteRateLimitRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self::with_clock(pool, system_clock())
    }

    pub fn with_clock(pool: DatabasePool, clock: SharedClock) -> Self {
        Self { pool, clock }
    }
}

struct BucketRow {
    user_id: String,
    endpoint: String,
    period_start: String,
    request_count: i64,
}

impl BucketRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            user_id: row.try_get("user_id")?,
            endpoint: row.try_get("endpoint")?,
            period_start: row.try_get("period_start")?,
            request_count: row.try_get("request_count")?,
        })
    }

    fn into_bucket(self) -> Result<RateLimitBucket, RepositoryError> {
        Ok(RateLimitBucket {
            user_id: self.user_id,
            endpoint: self.endpoint,
            period_start: parse_datetime(&self.period_start)?,
            request_count: self.request_count.max(0) as u64,
        })
    }
}

impl RateLimitRepository for SqliteRateLimitRepository {
    async fn current_usage(
        &self,
        user_id: &str,
        endpoint: &str,
        period_hours: u32,
    ) -> Result<u64, RepositoryError> {
        let since = usage_window_start(self.clock.now(), period_hours);

        let row = sqlx::query(
            r#"SELECT COALESCE(SUM(request_count), 0) AS usage
               FROM rate_limits
               WHERE user_id = ? AND endpoint = ? AND period_start >= ?"#,
        )
        .bind(user_id)
        .bind(endpoint)
        .bind(format_datetime(&since))
        .fetch_one(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        let usage: i64 = row.try_get("usage").map_err(map_sqlx_error)?;
        Ok(usage.max(0) as u64)
    }

    async fn increment(&self, user_id: &str, endpoint: &str) -> Result<(), RepositoryError> {
        let period_start = bucket_start(self.clock.now());

        sqlx::query(
            r#"INSERT INTO rate_limits (user_id, endpoint, period_start, request_count)
               VALUES (?, ?, ?, 1)
               ON CONFLICT (user_id, endpoint, period_start)
               DO UPDATE SET request_count = request_count + 1"#,
        )
        .bind(user_id)
        .bind(endpoint)
        .bind(format_datetime(&period_start))
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn clean_old_records(&self, retention_hours: u32) -> Result<u64, RepositoryError> {
        let cutoff = retention_cutoff(self.clock.now(), retention_hours);

        let result = sqlx::query("DELETE FROM rate_limits WHERE period_start < ?")
            .bind(format_datetime(&cutoff))
            .execute(&self.pool.writer)
            .await
            .map_err(map_sqlx_error)?;

        tracing::debug!(deleted = result.rows_affected(), cutoff = %cutoff, "Rate-limit cleanup ran");
        Ok(result.rows_affected())
    }

    async fn list_buckets(
        &self,
        user_id: &str,
        endpoint: &str,
    ) -> Result<Vec<RateLimitBucket>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT user_id, endpoint, period_start, request_count
               FROM rate_limits
               WHERE user_id = ? AND endpoint = ?
               ORDER BY period_start ASC"#,
        )
        .bind(user_id)
        .bind(endpoint)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|row| BucketRow::from_row(row).map_err(map_sqlx_error)?.into_bucket())
            .collect()
    }
}
