use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "revkv",
    about = "revkv: a versioned key-value store with one-lane undo/redo",
    version
)]
pub struct Cli {
    /// Path to a revkv.toml config file (defaults to ./revkv.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the command API over HTTP
    Serve {
        /// Bind address (host:port)
        #[arg(long)]
        bind: Option<String>,

        /// Path to the versions JSONL store
        #[arg(long, conflicts_with = "memory")]
        store: Option<PathBuf>,

        /// Keep versions in memory only
        #[arg(long)]
        memory: bool,
    },

    /// Write a new version of a key
    Set {
        name: String,
        value: String,

        /// Path to the versions JSONL store
        #[arg(long)]
        store: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the current value of a key
    Get {
        name: String,

        /// Path to the versions JSONL store
        #[arg(long)]
        store: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record an explicit unset of a key
    Unset {
        name: String,

        /// Path to the versions JSONL store
        #[arg(long)]
        store: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Count keys whose current value equals VALUE
    #[command(name = "numequalto")]
    NumEqualTo {
        value: String,

        /// Path to the versions JSONL store
        #[arg(long)]
        store: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Step the lastly-changed key one version back
    Undo {
        /// Path to the versions JSONL store
        #[arg(long)]
        store: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Step the lastly-changed key one version forward
    Redo {
        /// Path to the versions JSONL store
        #[arg(long)]
        store: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete every version of every key
    End {
        /// Path to the versions JSONL store
        #[arg(long)]
        store: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the version chain of a key
    Log {
        name: String,

        /// Path to the versions JSONL store
        #[arg(long)]
        store: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Audit store invariants (one current version per key, one marker)
    Check {
        /// Path to the versions JSONL store
        #[arg(long)]
        store: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
