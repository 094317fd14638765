//! Repository trait definitions.
//!
//! Traits use native async fn in traits (RPITIT, Rust 2024 edition) and are
//! implemented both in-process (`crate::in_memory`) and over SQLite in
//! chatlayer-infra.

pub mod message;
pub mod rate_limit;

pub use message::MessageRepository;
pub use rate_limit::RateLimitRepository;
