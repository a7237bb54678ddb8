//! Snapshot I/O errors

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FpError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("binary payload error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("invalid snapshot: magic bytes mismatch")]
    InvalidMagic,

    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u16),

    #[error("snapshot checksum mismatch (expected {expected:#018x}, got {actual:#018x})")]
    ChecksumMismatch { expected: u64, actual: u64 },

    #[error("snapshot payload truncated: header declares {declared} bytes, file holds {actual}")]
    TruncatedPayload { declared: u64, actual: u64 },

    #[error("snapshot header declares {declared} {what}, payload holds {actual}")]
    CountMismatch {
        what: &'static str,
        declared: u64,
        actual: u64,
    },

    #[error("cannot infer snapshot format from {0}")]
    UnknownFormat(PathBuf),
}

pub type Result<T> = std::result::Result<T, FpError>;
