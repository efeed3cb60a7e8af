//! CLI command definitions for fragconf
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod get;
pub mod set;

use clap::{Parser, Subcommand};
use get::GetArgs;
use set::SetArgs;
use std::path::PathBuf;

/// Per-service configuration fragments: resolve, edit, and merge
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration root directory (overrides FRAGCONF_ROOT)
    #[arg(short, long, global = true)]
    pub root: Option<PathBuf>,

    /// Catalog declaration file (overrides FRAGCONF_CATALOG)
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve configuration and print it
    Get(GetArgs),

    /// Set one key in a service section (validated against the schema)
    Set(SetArgs),

    /// Delete one key from a service section
    DeleteArg {
        service: String,
        section: String,
        key: String,
    },

    /// Delete a whole section from a service
    DeleteSection { service: String, section: String },

    /// Rebuild the merged snapshot from all fragments
    Refresh,

    /// Check fragments against the schema catalog
    Validate {
        /// Only this service (default: every cataloged service)
        service: Option<String>,
    },

    /// Refresh the snapshot whenever a fragment changes
    Watch,
}
