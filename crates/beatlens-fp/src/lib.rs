//! BeatLens index snapshot format library

pub mod error;
pub mod format;
pub mod json_format;
pub mod reader;
pub mod writer;

pub use error::{FpError, Result};
pub use format::{
    EntryRecord, HashLayoutRecord, IndexSnapshot, SnapshotFormat, SnapshotHeader, SongRecord,
    MAGIC, VERSION,
};
pub use reader::SnapshotReader;
pub use writer::SnapshotWriter;

use std::path::Path;

pub(crate) const CHECKSUM: crc::Crc<u64> = crc::Crc::<u64>::new(&crc::CRC_64_ECMA_182);

/// Load a snapshot, choosing JSON or binary from `format` (or the extension for `Auto`)
pub fn load_snapshot(path: &Path, format: SnapshotFormat) -> Result<IndexSnapshot> {
    match format.resolve(path) {
        Some(SnapshotFormat::Json) => IndexSnapshot::load_json(path),
        Some(SnapshotFormat::Binary) => SnapshotReader::read_file(path),
        _ => Err(FpError::UnknownFormat(path.to_path_buf())),
    }
}

/// Save a snapshot, choosing JSON or binary from `format` (or the extension for `Auto`)
pub fn save_snapshot(path: &Path, format: SnapshotFormat, snapshot: &IndexSnapshot) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    match format.resolve(path) {
        Some(SnapshotFormat::Json) => snapshot.save_json(path),
        Some(SnapshotFormat::Binary) => SnapshotWriter::new().write_file(path, snapshot),
        _ => Err(FpError::UnknownFormat(path.to_path_buf())),
    }
}
