//! Yana CLI
//!
//! Command-line tools for looking at what the Yana database layer leaves on
//! disk.
//!
//! # Commands
//!
//! - `inspect` - Display FileDB image statistics
//! - `dump` - Dump FileDB rows as JSON
//! - `last-modified show` - List the dirty-write guard's bookkeeping
//! - `last-modified clear` - Forget every last-modified entry

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Yana command-line database tools.
#[derive(Parser)]
#[command(name = "yana")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the FileDB image or last-modified file
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display FileDB image statistics
    Inspect {
        /// Show per-table row counts
        #[arg(short, long)]
        tables: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Dump FileDB rows as JSON
    Dump {
        /// Only dump this table
        #[arg(short, long)]
        table: Option<String>,

        /// Maximum number of rows per table
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Work with the last-modified map
    #[command(name = "last-modified", subcommand)]
    LastModified(LastModifiedCommands),

    /// Show version information
    Version,
}

#[derive(Subcommand)]
enum LastModifiedCommands {
    /// List entries
    Show {
        /// Only show this table
        #[arg(short, long)]
        table: Option<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Forget every entry
    Clear,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Inspect { tables, format } => {
            let path = cli.path.ok_or("Image path required for inspect")?;
            commands::inspect::run(&path, tables, &format)?;
        }
        Commands::Dump { table, limit } => {
            let path = cli.path.ok_or("Image path required for dump")?;
            commands::dump::run(&path, table.as_deref(), limit)?;
        }
        Commands::LastModified(LastModifiedCommands::Show { table, format }) => {
            let path = cli.path.ok_or("Last-modified file required for show")?;
            commands::last_modified::show(&path, table.as_deref(), &format)?;
        }
        Commands::LastModified(LastModifiedCommands::Clear) => {
            let path = cli.path.ok_or("Last-modified file required for clear")?;
            commands::last_modified::clear(&path)?;
        }
        Commands::Version => {
            println!("Yana CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
