//! blmatch - Identify an audio clip against the BeatLens catalog
//!
//! Usage:
//!   blmatch <query.wav>
//!   blmatch --pcm <query.raw>        # 16-bit LE mono PCM at the configured rate
//!   blmatch --config <path> --index <snapshot> <query.wav>

use anyhow::{Context, Result};
use beatlens_cli::output::print_match_response;
use beatlens_cli::{init_logger, load_config};
use beatlens_core::BeatLens;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "blmatch")]
#[command(about = "Match an audio clip against the catalog", long_about = None)]
struct Args {
    /// Query audio file
    query: PathBuf,

    /// Treat the query as raw PCM instead of WAV
    #[arg(long)]
    pcm: bool,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<String>,

    /// Snapshot to match against (overrides [storage].index_path)
    #[arg(short, long)]
    index: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);

    run_blmatch(&args)
}

fn run_blmatch(args: &Args) -> Result<()> {
    if !args.query.exists() {
        anyhow::bail!("Query file not found: {}", args.query.display());
    }

    let config = load_config(args.config.as_deref(), args.index.as_deref())?;
    let index_path = PathBuf::from(&config.storage.index_path);
    if !index_path.exists() {
        anyhow::bail!(
            "Catalog snapshot not found: {} (index some songs with blindex first)",
            index_path.display()
        );
    }

    let load_start = std::time::Instant::now();
    let service = BeatLens::open(config).context("Failed to open catalog")?;
    log::info!(
        "Loaded catalog in {:.2}s",
        load_start.elapsed().as_secs_f64()
    );

    let bytes = std::fs::read(&args.query)
        .with_context(|| format!("Failed to read query: {}", args.query.display()))?;

    let match_start = std::time::Instant::now();
    let response = if args.pcm {
        service.match_pcm(&bytes)?
    } else {
        service.match_wav(&bytes)?
    };
    log::info!(
        "Matching completed in {:.2}s, found {} results",
        match_start.elapsed().as_secs_f64(),
        response.matches.len()
    );

    print_match_response(&args.query.display().to_string(), &response);

    Ok(())
}
