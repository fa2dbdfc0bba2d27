use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{AppConfig, StoreKind};

/// Browse and register for community events.
#[derive(Parser, Debug)]
#[command(name = "horizon-connect")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the events API (also: HORIZON_API_BASE)
    #[arg(long, global = true, value_name = "URL")]
    pub api_base: Option<String>,

    /// Event store to use: http or local (also: HORIZON_STORE)
    #[arg(long, global = true)]
    pub store: Option<StoreKind>,

    /// SQLite file for the local store (also: HORIZON_DB_PATH)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List events, optionally filtered
    List {
        /// Free-text search over title, location, description and tags
        #[arg(short, long)]
        query: Option<String>,

        /// Category chip: All, Today, This Week, Weekend or a tag
        #[arg(short, long)]
        category: Option<String>,

        /// Required tag; repeat to require several
        #[arg(short, long = "tag")]
        tags: Vec<String>,

        /// Fragment of the date label, e.g. "24 Aug"
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Show one event
    Show { id: String },
    /// Register for an event
    Register {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        phone: Option<String>,
    },
    /// List tags offered for filtering
    Tags,
    /// Show the effective configuration
    Config {
        /// Persist the global flags given on this invocation
        #[arg(long)]
        save: bool,
    },
}

impl Cli {
    /// Applies command-line overrides, the highest-priority layer.
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(base) = &self.api_base {
            config.api_base_url = base.trim().to_string();
        }
        if let Some(kind) = self.store {
            config.store = kind;
        }
        if let Some(path) = &self.db {
            config.database_path = Some(path.clone());
        }
    }
}
