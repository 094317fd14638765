//! Shared domain types for chatlayer.
//!
//! Chat messages, rate-limit buckets, LLM request/response shapes,
//! configuration, and the error enums shared by every other crate.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
pub mod rate_limit;
