//! CLI command structure using clap

use clap::{Args, Parser, Subcommand};
use filelock_core::TimeoutSpec;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "filelock")]
#[command(version, about = "Advisory cross-process file locks", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML file with a [lock] table
    #[arg(long, global = true, env = "FILELOCK_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Lock file and mode, shared by every command
#[derive(Args, Debug, Clone)]
pub struct Target {
    /// Lock file (created if absent)
    pub path: PathBuf,

    /// Take a shared lock instead of an exclusive one
    #[arg(long)]
    pub shared: bool,
}

impl Target {
    pub fn exclusive(&self) -> bool {
        !self.shared
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Try once to take the lock; exit 2 if it is held elsewhere
    Try {
        #[command(flatten)]
        target: Target,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Take the lock and hold it
    Hold {
        #[command(flatten)]
        target: Target,

        /// How long to wait: `now`, `inf`, `<n>ms`, `<n>s` or milliseconds
        #[arg(long, default_value = "inf")]
        timeout: TimeoutSpec,

        /// Release after this many milliseconds instead of at end of input
        #[arg(long, value_name = "N")]
        hold_ms: Option<u64>,
    },

    /// Run a command while holding the lock
    #[command(trailing_var_arg = true)]
    Run {
        #[command(flatten)]
        target: Target,

        /// How long to wait: `now`, `inf`, `<n>ms`, `<n>s` or milliseconds
        #[arg(long, default_value = "inf")]
        timeout: TimeoutSpec,

        /// Command and arguments (after --)
        #[arg(required = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },

    /// Report whether the lock is available without keeping it
    Check {
        #[command(flatten)]
        target: Target,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
