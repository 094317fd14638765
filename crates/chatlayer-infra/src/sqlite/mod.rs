//! SQLite storage layer.
//!
//! Repository implementations backed by SQLite with WAL mode and split
//! read/write connection pools.

pub mod message;
pub mod pool;
pub mod rate_limit;

use chatlayer_types::error::RepositoryError;
use chrono::{DateTime, SecondsFormat, Utc};

pub use message::SqliteMessageRepository;
pub use pool::DatabasePool;
pub use rate_limit::SqliteRateLimitRepository;

/// Fixed-width RFC 3339 so lexical order in SQL equals time order.
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

pub(crate) fn map_sqlx_error(err: sqlx::Error) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepositoryError::Conflict(db.message().to_string())
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            RepositoryError::Connection(err.to_string())
        }
        _ => RepositoryError::Query(err.to_string()),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    #[test]
    fn test_datetime_text_order_matches_time_order() {
        let a = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
        let b = a + TimeDelta::microseconds(1);
        let c = a + TimeDelta::hours(1);
        assert!(format_datetime(&a) < format_datetime(&b));
        assert!(format_datetime(&b) < format_datetime(&c));
        assert_eq!(format_datetime(&a), "2026-01-01T09:00:00.000000Z");
    }

    #[test]
    fn test_datetime_roundtrip() {
        let dt = Utc.with_ymd_and_hms(2026, 7, 4, 12, 30, 15).unwrap() + TimeDelta::microseconds(42);
        assert_eq!(parse_datetime(&format_datetime(&dt)).unwrap(), dt);
        assert!(parse_datetime("not a date").is_err());
    }

    #[test]
    fn test_pool_timeout_maps_to_connection() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            RepositoryError::Connection(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            RepositoryError::Query(_)
        ));
    }
}
