//! CLI command definitions and dispatch for the `chatlayer` binary.

pub mod chat;
pub mod usage;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Rate-limited chat API in front of a local LLM runtime.
#[derive(Parser)]
#[command(name = "chatlayer", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug/trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server.
    Serve {
        /// Port to listen on (defaults to the configured port).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (defaults to the configured host).
        #[arg(long)]
        host: Option<String>,
    },

    /// List stored chats.
    #[command(alias = "ls")]
    Chats {
        #[arg(long, default_value_t = 0)]
        offset: u32,

        #[arg(long, default_value_t = 50)]
        limit: u32,
    },

    /// Print the messages of one chat.
    History {
        chat_id: String,

        #[arg(long, default_value_t = 0)]
        offset: u32,

        #[arg(long, default_value_t = 1000)]
        limit: u32,
    },

    /// Delete a chat and all its messages.
    #[command(alias = "rm")]
    Delete {
        chat_id: String,

        /// Skip the confirmation prompt.
        #[arg(short, long)]
        force: bool,
    },

    /// Show or replace a chat's system prompt.
    SystemPrompt {
        chat_id: String,

        /// New system prompt text.
        #[arg(long)]
        set: Option<String>,
    },

    /// Show a user's request count and hour buckets for one endpoint.
    Usage {
        /// User id (first 16 hex chars of the API key's SHA-256).
        user_id: String,

        #[arg(long, default_value = "chat")]
        endpoint: String,

        #[arg(long, default_value_t = 1)]
        hours: u32,
    },

    /// Purge rate-limit buckets older than the retention window.
    Cleanup {
        /// Retention in hours (defaults to the configured retention).
        #[arg(long)]
        retention_hours: Option<u32>,
    },

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}
