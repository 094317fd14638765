//! Periodic purge of expired rate-limit buckets while the server runs.

use std::sync::Arc;
use std::time::Duration;

use chatlayer_core::chat::service::ChatService;
use chatlayer_core::llm::provider::LlmProvider;
use chatlayer_core::repository::message::MessageRepository;
use chatlayer_core::repository::rate_limit::RateLimitRepository;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Run `clean_old_records(retention_hours)` every `every` until `cancel`
/// fires. The first pass runs immediately. Failures are logged and the
/// loop keeps going.
pub fn spawn_cleanup_task<M, R, L>(
    service: Arc<ChatService<M, R, L>>,
    every: Duration,
    retention_hours: u32,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    M: MessageRepository + 'static,
    R: RateLimitRepository + 'static,
    L: LlmProvider + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Rate-limit cleanup task stopped");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = service.clean_old_records(retention_hours).await {
                        tracing::warn!(error = %e, "Rate-limit cleanup failed");
                    }
                }
            }
        }
    })
}
