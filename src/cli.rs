//! Command-line interface definition for CreditChat
//!
//! This module defines the CLI structure using clap's derive API: the HTTP
//! server, operator commands standing in for the registration and purchase
//! collaborators, and an interactive chat client.

use clap::{Parser, Subcommand};

/// CreditChat - credit-metered AI chat and image generation
#[derive(Parser, Debug, Clone)]
#[command(name = "creditchat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Override the SQLite database path
    #[arg(long, env = "CREDITCHAT_DB")]
    pub storage_path: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for CreditChat
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Address to listen on (overrides server.bind)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Manage user accounts
    Users {
        /// User management subcommand
        #[command(subcommand)]
        command: UserCommand,
    },

    /// Manage credit balances
    Credits {
        /// Credit management subcommand
        #[command(subcommand)]
        command: CreditCommand,
    },

    /// Moderate gallery images
    Images {
        /// Image moderation subcommand
        #[command(subcommand)]
        command: ImageCommand,
    },

    /// Store a bearer token for the chat client
    Login {
        /// Token issued by `users add`
        #[arg(short, long)]
        token: String,
    },

    /// Forget the stored bearer token
    Logout,

    /// Start an interactive chat session against a running server
    Chat {
        /// Server base URL (overrides client.server_url)
        #[arg(short, long)]
        server: Option<String>,
    },
}

/// User management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum UserCommand {
    /// Register a user and print their bearer token
    Add {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Starting credit balance
        #[arg(short, long, default_value_t = 0)]
        credits: u32,
    },
}

/// Credit management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum CreditCommand {
    /// Add purchased credits to a user's balance
    Grant {
        /// User id
        #[arg(short, long)]
        user: String,

        /// Credits to add
        #[arg(short, long)]
        amount: u32,
    },
}

/// Gallery moderation subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ImageCommand {
    /// Show an image message in the public gallery
    Publish {
        /// Chat id
        #[arg(long)]
        chat: String,

        /// Zero-based message index within the chat
        #[arg(long)]
        index: usize,
    },

    /// Hide an image message from the public gallery
    Unpublish {
        /// Chat id
        #[arg(long)]
        chat: String,

        /// Zero-based message index within the chat
        #[arg(long)]
        index: usize,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
