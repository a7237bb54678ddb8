//! Error types for the fingerprinting core

use thiserror::Error;

/// Errors surfaced by the pipeline, the catalog, and snapshot persistence
#[derive(Debug, Error)]
pub enum BeatLensError {
    /// Invalid configuration, detected at construction time
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Input bytes that cannot be parsed as audio
    #[error("malformed audio: {0}")]
    Format(String),

    /// Input too short (or otherwise unusable) for fingerprinting
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("song {0} not found")]
    SongNotFound(u64),

    /// Snapshot could not be loaded or saved
    #[error("storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<beatlens_fp::FpError> for BeatLensError {
    fn from(err: beatlens_fp::FpError) -> Self {
        match err {
            beatlens_fp::FpError::Io(e) => BeatLensError::Io(e),
            other => BeatLensError::Storage(other.to_string()),
        }
    }
}

impl From<hound::Error> for BeatLensError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(e) => BeatLensError::Io(e),
            other => BeatLensError::Format(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, BeatLensError>;
