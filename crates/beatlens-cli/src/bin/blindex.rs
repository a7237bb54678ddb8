//! blindex - Index WAV files into the BeatLens catalog
//!
//! Usage:
//!   blindex <song.wav>...                         # Title taken from each file name
//!   blindex --title <t> --artist <a> <song.wav>   # Explicit metadata for one file
//!   blindex --config <path> --index <snapshot> <song.wav>...

use anyhow::{Context, Result};
use beatlens_cli::output::print_indexed;
use beatlens_cli::{init_logger, load_config};
use beatlens_core::audio::{decode_wav_file, AudioData};
use beatlens_core::BeatLens;
use clap::Parser;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "blindex")]
#[command(about = "Fingerprint WAV files and add them to the catalog", long_about = None)]
struct Args {
    /// WAV files to index
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Song title (single input only; defaults to the file name)
    #[arg(short, long)]
    title: Option<String>,

    /// Artist name (single input only)
    #[arg(short, long)]
    artist: Option<String>,

    /// Path to configuration file (TOML)
    #[arg(short, long)]
    config: Option<String>,

    /// Snapshot to update (overrides [storage].index_path)
    #[arg(short, long)]
    index: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);

    if args.inputs.len() > 1 && (args.title.is_some() || args.artist.is_some()) {
        anyhow::bail!("--title and --artist apply to a single input file");
    }

    run_blindex(&args)
}

fn run_blindex(args: &Args) -> Result<()> {
    let config = load_config(args.config.as_deref(), args.index.as_deref())?;
    let mut service = BeatLens::open(config).context("Failed to open catalog")?;
    let format = service.config().audio.pcm_format();

    // Decode in parallel, index in input order
    let start = std::time::Instant::now();
    let decoded: Vec<(&PathBuf, beatlens_core::Result<AudioData>)> = args
        .inputs
        .par_iter()
        .map(|path| (path, decode_wav_file(path, &format)))
        .collect();
    log::info!(
        "Decoded {} files in {:.2}s",
        decoded.len(),
        start.elapsed().as_secs_f64()
    );

    let mut songs = Vec::new();
    let mut failed = 0;
    for (path, audio) in decoded {
        let title = args.title.clone().unwrap_or_else(|| title_from_path(path));
        let result = audio.and_then(|audio| {
            service.index_song(&title, args.artist.as_deref(), &audio.samples)
        });

        match result {
            Ok(song) => songs.push(song),
            Err(e) => {
                log::warn!("Failed to index {}: {}", path.display(), e);
                eprintln!("Skipping {}: {}", path.display(), e);
                failed += 1;
            }
        }
    }

    if !songs.is_empty() {
        service.save().context("Failed to save catalog")?;
    }

    print_indexed(&songs, failed);

    if songs.is_empty() {
        anyhow::bail!("No files were indexed");
    }
    Ok(())
}

fn title_from_path(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Untitled")
        .to_string()
}
