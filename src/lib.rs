//! CreditChat - credit-metered AI chat library
//!
//! Users hold several chats with an AI backend and pay per generation from
//! a credit balance: one credit for a text reply, two for an image. Images
//! can be published to a public gallery.
//!
//! # Architecture
//!
//! - `storage`: SQLite-backed chats, credit ledger and user directory
//! - `providers`: text (Ollama, OpenAI-compatible) and image backends
//! - `pipeline`: one credit-metered generation turn
//! - `gallery`: published image aggregation
//! - `server`: axum HTTP API around the pipeline
//! - `client`: optimistic client state and the API client
//! - `config`: configuration management and validation
//! - `error`: error types and result aliases
//! - `cli` / `commands`: command-line interface
//!
//! # Example
//!
//! ```no_run
//! use creditchat::cli::Cli;
//! use creditchat::Config;
//! use clap::Parser;
//!
//! fn main() -> anyhow::Result<()> {
//!     let cli = Cli::parse_from(["creditchat", "serve"]);
//!     let config = Config::load("config.yaml", &cli)?;
//!     config.validate()?;
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod gallery;
pub mod pipeline;
pub mod protocol;
pub mod providers;
pub mod server;
pub mod storage;
pub mod telemetry;

// Re-export commonly used types
pub use config::Config;
pub use error::{CreditChatError, ProviderError, Result, SubmitError};
pub use pipeline::{GenerationPipeline, GenerationResult};
pub use providers::GenerationMode;

#[cfg(test)]
pub mod test_utils;
