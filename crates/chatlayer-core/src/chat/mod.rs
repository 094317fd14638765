//! Chat orchestration: admission, context assembly, and persistence of
//! each exchange.

pub mod context;
pub mod service;

pub use service::{ChatReply, ChatService, ChatSettings};
