//! blcatalog - Inspect and maintain the BeatLens catalog
//!
//! Usage:
//!   blcatalog list
//!   blcatalog show <id>
//!   blcatalog delete <id>
//!   blcatalog stats
//!   blcatalog export <path>     # .json or .blx, converts between formats

use anyhow::{Context, Result};
use beatlens_cli::output::{print_catalog, print_json};
use beatlens_cli::{init_logger, load_config};
use beatlens_core::BeatLens;
use beatlens_fp::SnapshotFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "blcatalog")]
#[command(about = "Inspect and maintain the song catalog", long_about = None)]
struct Args {
    /// Path to configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Snapshot to operate on (overrides [storage].index_path)
    #[arg(short, long, global = true)]
    index: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all songs with catalog statistics
    List,
    /// Show one song
    Show { id: u64 },
    /// Remove a song and its fingerprints
    Delete { id: u64 },
    /// Print catalog statistics
    Stats,
    /// Write the catalog to another snapshot file
    Export { path: PathBuf },
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);

    let config = load_config(args.config.as_deref(), args.index.as_deref())?;
    let mut service = BeatLens::open(config).context("Failed to open catalog")?;

    match args.command {
        Command::List => {
            print_catalog(&service.list_songs(), &service.stats());
        }
        Command::Show { id } => {
            print_json(&service.song(id)?);
        }
        Command::Delete { id } => {
            let song = service.delete_song(id)?;
            service.save().context("Failed to save catalog")?;
            print_json(&song);
        }
        Command::Stats => {
            print_json(&service.stats());
        }
        Command::Export { path } => {
            service
                .save_snapshot(&path, SnapshotFormat::Auto)
                .with_context(|| format!("Failed to export to {}", path.display()))?;
            print_json(&service.stats());
        }
    }

    Ok(())
}
