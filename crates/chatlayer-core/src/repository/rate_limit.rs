//! RateLimitRepository trait definition.

use chatlayer_types::error::RepositoryError;
use chatlayer_types::rate_limit::RateLimitBucket;

/// Default trailing window for `current_usage`.
pub const DEFAULT_PERIOD_HOURS: u32 = 1;

/// Default age after which buckets are purged.
pub const DEFAULT_RETENTION_HOURS: u32 = 24;

/// Hour-bucketed request counters per `(user_id, endpoint)`.
///
/// Bucket boundaries come from `crate::rate_limit`. Implementations must
/// make `increment` atomic: K concurrent increments raise the bucket by
/// exactly K.
pub trait RateLimitRepository: Send + Sync {
    /// Sum of `request_count` over buckets whose start lies within the last
    /// `period_hours` hours. Zero when nothing has been recorded.
    fn current_usage(
        &self,
        user_id: &str,
        endpoint: &str,
        period_hours: u32,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// Count one request in the current hour bucket, creating it on demand.
    fn increment(
        &self,
        user_id: &str,
        endpoint: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete buckets older than `retention_hours`, returning how many.
    fn clean_old_records(
        &self,
        retention_hours: u32,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// All buckets of one `(user_id, endpoint)`, oldest first.
    fn list_buckets(
        &self,
        user_id: &str,
        endpoint: &str,
    ) -> impl std::future::Future<Output = Result<Vec<RateLimitBucket>, RepositoryError>> + Send;
}
