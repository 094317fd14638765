use std::collections::BTreeMap;

use chatlayer_types::error::RepositoryError;
use chatlayer_types::rate_limit::RateLimitBucket;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::clock::{SharedClock, system_clock};
use crate::rate_limit::{bucket_start, retention_cutoff, usage_window_start};
use crate::repository::rate_limit::RateLimitRepository;

type Key = (String, String);

/// Hour buckets held in memory, keyed by `(user_id, endpoint)`.
pub struct InMemoryRateLimitRepository {
    buckets: DashMap<Key, BTreeMap<DateTime<Utc>, u64>>,
    clock: SharedClock,
}

impl InMemoryRateLimitRepository {
    pub fn new() -> Self {
        Self::with_clock(system_clock())
    }

    pub fn with_clock(clock: SharedClock) -> Self {
        Self {
            buckets: DashMap::new(),
            clock,
        }
    }
}

impl Default for InMemoryRateLimitRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn key(user_id: &str, endpoint: &str) -> Key {
    (user_id.to_string(), endpoint.to_string())
}

impl RateLimitRepository for InMemoryRateLimitRepository {
    async fn current_usage(
        &self,
        user_id: &str,
        endpoint: &str,
        period_hours: u32,
    ) -> Result<u64, RepositoryError> {
        let since = usage_window_start(self.clock.now(), period_hours);
        Ok(self
            .buckets
            .get(&key(user_id, endpoint))
            .map(|b| b.range(since..).map(|(_, count)| *count).sum())
            .unwrap_or(0))
    }

    async fn increment(&self, user_id: &str, endpoint: &str) -> Result<(), RepositoryError> {
        let period_start = bucket_start(self.clock.now());
        let mut entry = self.buckets.entry(key(user_id, endpoint)).or_default();
        *entry.entry(period_start).or_insert(0) += 1;
        Ok(())
    }

    async fn clean_old_records(&self, retention_hours: u32) -> Result<u64, RepositoryError> {
        let cutoff = retention_cutoff(self.clock.now(), retention_hours);
        let mut deleted = 0u64;
        self.buckets.retain(|_, buckets| {
            let before = buckets.len();
            buckets.retain(|period_start, _| *period_start >= cutoff);
            deleted += (before - buckets.len()) as u64;
            !buckets.is_empty()
        });
        Ok(deleted)
    }

    async fn list_buckets(
        &self,
        user_id: &str,
        endpoint: &str,
    ) -> Result<Vec<RateLimitBucket>, RepositoryError> {
        Ok(self
            .buckets
            .get(&key(user_id, endpoint))
            .map(|b| {
                b.iter()
                    .map(|(period_start, count)| RateLimitBucket {
                        user_id: user_id.to_string(),
                        endpoint: endpoint.to_string(),
                        period_start: *period_start,
                        request_count: *count,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}
