//! Infrastructure layer for chatlayer.
//!
//! Contains implementations of the traits defined in `chatlayer-core`:
//! SQLite storage for messages and rate-limit buckets, the Ollama LLM
//! client, and config file loading.

pub mod config;
pub mod llm;
pub mod sqlite;
