//! recordfs CLI
//!
//! Command-line tools for inspecting and debugging recordfs stores.
//!
//! Every command takes a JSON schema file describing the store's kinds.
//!
//! # Commands
//!
//! - `check` - Validate a schema and show what each kind compiles to
//! - `resolve` - Print the address for a key
//! - `classify` - Show which kind and key a path belongs to
//! - `list` - List the records of a kind
//! - `get` - Print one record
//! - `history` - List the versions of a record
//! - `watch` - Print record changes as they happen

mod commands;
mod schema;

use clap::{Parser, Subcommand};
use schema::CliError;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// recordfs command-line store tools.
#[derive(Parser)]
#[command(name = "recordfs")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the schema file
    #[arg(global = true, short, long)]
    schema: Option<PathBuf>,

    /// Path to the store root directory
    #[arg(global = true, short, long)]
    root: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the schema and show each kind's template, prefix and pattern
    Check {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print the address of a record
    Resolve {
        /// Kind name
        kind: String,

        /// Key properties as name=uuid
        key: Vec<String>,

        /// Resolve this version file of a versioned kind
        #[arg(long)]
        version: Option<u64>,

        /// Print the listing prefix instead of the record address
        #[arg(short, long)]
        listing: bool,
    },

    /// Show which kind and key each path belongs to
    Classify {
        /// Root-relative paths
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// List the records of a kind
    List {
        /// Kind name
        kind: String,

        /// Only records directly below this parent (name=uuid, repeatable)
        #[arg(short, long, num_args = 0..)]
        parent: Option<Vec<String>>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print one record
    Get {
        /// Kind name
        kind: String,

        /// Key properties as name=uuid
        key: Vec<String>,

        /// Read this version instead of the current one
        #[arg(long)]
        version: Option<u64>,
    },

    /// List the versions of a record
    History {
        /// Kind name
        kind: String,

        /// Key properties as name=uuid
        key: Vec<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print record changes as they happen
    Watch {
        /// Only report this kind
        #[arg(short, long)]
        kind: Option<String>,

        /// Stop after this many events
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Version = cli.command {
        println!("recordfs CLI v{}", env!("CARGO_PKG_VERSION"));
        println!("recordfs Core v{}", recordfs_core::VERSION);
        return Ok(());
    }

    let schema = cli.schema.ok_or(CliError::Missing("--schema"))?;
    let root = || cli.root.clone().ok_or(CliError::Missing("--root"));

    match cli.command {
        Commands::Check { format } => commands::check::run(&schema, &format)?,
        Commands::Resolve {
            kind,
            key,
            version,
            listing,
        } => commands::resolve::run(&schema, &kind, &key, version, listing)?,
        Commands::Classify { paths } => commands::classify::run(&schema, &paths)?,
        Commands::List {
            kind,
            parent,
            format,
        } => commands::list::run(&schema, &root()?, &kind, parent.as_deref(), &format)?,
        Commands::Get { kind, key, version } => {
            commands::get::run(&schema, &root()?, &kind, &key, version)?;
        }
        Commands::History { kind, key, format } => {
            commands::history::run(&schema, &root()?, &kind, &key, &format)?;
        }
        Commands::Watch { kind, limit } => {
            commands::watch::run(&schema, &root()?, kind.as_deref(), limit)?;
        }
        Commands::Version => {}
    }

    Ok(())
}
