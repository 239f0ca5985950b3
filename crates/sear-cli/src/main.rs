//! # Sear CLI
//!
//! Command-line interface for the Sear search engine.
//!
//! ## Commands
//!
//! - `sear index <file>` - Ingest JSON-lines documents into the database
//! - `sear query <query>` - Evaluate a query and print matching documents
//! - `sear remove <name>` - Remove a document by name
//! - `sear status` - Show database statistics
//!
//! ## Example Usage
//!
//! ```bash
//! # Ingest documents
//! sear index companies.jsonl
//!
//! # Boolean full-text search
//! sear query "apple and cap"
//!
//! # Property comparisons
//! sear query "price>100 -exchange=nyse"
//! ```

mod app;
mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Sear - Embedded full-text and property search
#[derive(Parser)]
#[command(name = "sear")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the database file (overrides the configuration)
    #[arg(short, long, global = true)]
    database: Option<PathBuf>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest documents from a JSON-lines file
    Index {
        /// File with one JSON object per line; `-` reads standard input
        file: PathBuf,
    },

    /// Evaluate a query and print matching documents
    Query {
        /// Query text (words, "literals", name<op>value, and/or/not, groups)
        query: String,

        /// Maximum number of results to show
        #[arg(short, long, default_value = "100")]
        limit: usize,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,
    },

    /// Remove a document by name
    Remove {
        /// Document name (case-insensitive)
        name: String,
    },

    /// Show database statistics
    Status,
}

#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = sear_core::Config::load_or_default(cli.config.as_deref())?;
    if let Some(database) = cli.database {
        config.database_path = database;
    }

    // Setup logging
    let log_level = if cli.quiet {
        "error".to_string()
    } else {
        match cli.verbose {
            0 => config.log_level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();

    // Execute command
    match cli.command {
        Commands::Index { file } => commands::index::run(config, &file),
        Commands::Query {
            query,
            limit,
            output,
        } => commands::query::run(config, &query, limit, output),
        Commands::Remove { name } => commands::remove::run(config, &name),
        Commands::Status => commands::status::run(config),
    }
}
