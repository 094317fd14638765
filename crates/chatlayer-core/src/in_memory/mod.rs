//! Single-process stores backed by `DashMap`.
//!
//! Each key's value is mutated under its shard lock through the entry API,
//! which gives the same per-key atomicity the SQLite stores get from single
//! statements. Guards are never held across an `.await`.

pub mod message;
pub mod rate_limit;

pub use message::InMemoryMessageRepository;
pub use rate_limit::InMemoryRateLimitRepository;
