//! Command-line interface definitions using clap
//!
//! This module defines the CLI structure for agora using clap's derive macros.

mod commands;

use clap::{Parser, Subcommand};

pub use commands::{CliError, run_cli_command};

/// Agora - a small social network backend
#[derive(Parser, Debug)]
#[command(name = "agora")]
#[command(version)]
#[command(about = "A small social network backend with a JSON API", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short = 'c', global = true, default_value = crate::config::DEFAULT_CONFIG_PATH)]
    pub config: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP server (default)
    Serve,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },

    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserCommands,
    },
}

/// Configuration management commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Generate example configuration file
    Generate {
        /// Output path (default: config.example.toml)
        output_path: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// User management commands
#[derive(Subcommand, Debug)]
pub enum UserCommands {
    /// List all users
    List,

    /// Set a new password for a user
    ResetPassword {
        /// Username of the account
        username: String,

        /// New password (if not provided, will prompt interactively)
        #[arg(long, conflicts_with = "stdin")]
        password: Option<String>,

        /// Read password from stdin (for scripting)
        #[arg(long)]
        stdin: bool,
    },
}
