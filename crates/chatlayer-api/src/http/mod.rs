//! HTTP/REST API layer for chatlayer.
//!
//! Axum-based REST API with API key authentication, per-caller rate
//! limiting, and the envelope response format.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
