//! Shared plumbing for the BeatLens command-line tools

pub mod output;

use anyhow::{Context, Result};
use beatlens_core::BeatLensConfig;
use std::path::Path;

/// Picked up from the working directory when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "beatlens.toml";

/// Default: no logs (clean JSON on stdout). Verbose: Info level.
pub fn init_logger(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Off
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

/// Load configuration from `config_path`, then `beatlens.toml`, then defaults
pub fn load_config(config_path: Option<&str>, index_path: Option<&str>) -> Result<BeatLensConfig> {
    let mut config = match config_path {
        Some(path) => BeatLensConfig::load(Path::new(path))
            .with_context(|| format!("Failed to load configuration: {}", path))?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            BeatLensConfig::load(Path::new(DEFAULT_CONFIG_PATH))
                .with_context(|| format!("Failed to load configuration: {}", DEFAULT_CONFIG_PATH))?
        }
        None => BeatLensConfig::default(),
    };

    if let Some(index_path) = index_path {
        config.storage.index_path = index_path.to_string();
    }

    log::info!("Index snapshot: {}", config.storage.index_path);
    Ok(config)
}
