//! Business logic and repository trait definitions for chatlayer.
//!
//! This crate defines the "ports" (repository and LLM provider traits) that
//! the infrastructure layer implements, plus the `ChatService` orchestrator
//! and single-process in-memory stores. It depends only on `chatlayer-types`
//! -- never on `chatlayer-infra` or any database/IO crate.

pub mod chat;
pub mod clock;
pub mod in_memory;
pub mod llm;
pub mod rate_limit;
pub mod repository;
