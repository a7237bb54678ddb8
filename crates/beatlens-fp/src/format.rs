//! Index snapshot structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Magic bytes for binary snapshots: "BLIX"
pub const MAGIC: [u8; 4] = [0x42, 0x4C, 0x49, 0x58];

/// Current binary format version
pub const VERSION: u16 = 1;

/// Current JSON format version
pub const JSON_VERSION: &str = "1.0";

/// Binary header size in bytes
pub const HEADER_SIZE: usize = 40;

/// Flag bit: payload is zstd-compressed
pub const FLAG_COMPRESSED: u16 = 0x1;

/// Binary snapshot header (40 bytes fixed size, little-endian)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotHeader {
    /// Magic bytes: "BLIX"
    pub magic: [u8; 4],
    /// Format version
    pub version: u16,
    /// Flags (bit 0: compressed)
    pub flags: u16,
    /// Bits per frequency field of the stored hashes
    pub freq_bits: u8,
    /// Bits of the time-delta field of the stored hashes
    pub time_bits: u8,
    /// Reserved
    pub reserved: u16,
    /// Number of songs
    pub num_songs: u32,
    /// Number of index entries
    pub num_entries: u64,
    /// Size of the stored payload (after compression, if any)
    pub payload_size: u64,
    /// CRC-64 of the stored payload
    pub checksum: u64,
}

impl SnapshotHeader {
    pub fn new(layout: HashLayoutRecord, num_songs: u32, num_entries: u64) -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            flags: 0,
            freq_bits: layout.freq_bits,
            time_bits: layout.time_bits,
            reserved: 0,
            num_songs,
            num_entries,
            payload_size: 0,
            checksum: 0,
        }
    }

    pub fn is_compressed(&self) -> bool {
        (self.flags & FLAG_COMPRESSED) != 0
    }

    pub fn set_compressed(&mut self, compressed: bool) {
        if compressed {
            self.flags |= FLAG_COMPRESSED;
        } else {
            self.flags &= !FLAG_COMPRESSED;
        }
    }

    pub fn layout(&self) -> HashLayoutRecord {
        HashLayoutRecord {
            freq_bits: self.freq_bits,
            time_bits: self.time_bits,
        }
    }
}

/// Field widths of the hashes stored in a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashLayoutRecord {
    pub freq_bits: u8,
    pub time_bits: u8,
}

/// One catalogued song
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongRecord {
    pub id: u64,
    pub title: String,
    pub artist: Option<String>,
    pub duration_seconds: f64,
    pub fingerprint_count: u32,
    pub indexed_at: DateTime<Utc>,
}

/// One fingerprint occurrence: (hash, song, anchor frame)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    pub hash: u64,
    pub song_id: u64,
    pub time_offset: u32,
}

/// Complete snapshot of a catalog and its fingerprint index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub layout: HashLayoutRecord,
    /// Id the catalog hands out next; ids of deleted songs stay retired
    #[serde(default)]
    pub next_song_id: u64,
    pub songs: Vec<SongRecord>,
    pub entries: Vec<EntryRecord>,
}

impl IndexSnapshot {
    /// Create an empty snapshot for the given hash layout
    pub fn new(layout: HashLayoutRecord) -> Self {
        Self {
            version: JSON_VERSION.to_string(),
            created_at: Utc::now(),
            layout,
            next_song_id: 1,
            songs: Vec::new(),
            entries: Vec::new(),
        }
    }
}

/// Binary payload following the header
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct SnapshotPayload {
    pub created_at: DateTime<Utc>,
    pub next_song_id: u64,
    pub songs: Vec<SongRecord>,
    pub entries: Vec<EntryRecord>,
}

/// On-disk snapshot format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotFormat {
    Json,
    Binary,
    Auto, // Decide from file extension
}

impl Default for SnapshotFormat {
    fn default() -> Self {
        SnapshotFormat::Auto
    }
}

impl SnapshotFormat {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Some(SnapshotFormat::Json),
            Some("blx") | Some("bin") => Some(SnapshotFormat::Binary),
            _ => None,
        }
    }

    /// Resolve `Auto` against a path
    pub fn resolve(self, path: &Path) -> Option<Self> {
        match self {
            SnapshotFormat::Auto => Self::from_path(path),
            other => Some(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            SnapshotFormat::from_path(Path::new("library.json")),
            Some(SnapshotFormat::Json)
        );
        assert_eq!(
            SnapshotFormat::from_path(Path::new("library.blx")),
            Some(SnapshotFormat::Binary)
        );
        assert_eq!(SnapshotFormat::from_path(Path::new("library.txt")), None);
        assert_eq!(
            SnapshotFormat::Json.resolve(Path::new("library.txt")),
            Some(SnapshotFormat::Json)
        );
    }

    #[test]
    fn test_compressed_flag() {
        let layout = HashLayoutRecord { freq_bits: 12, time_bits: 10 };
        let mut header = SnapshotHeader::new(layout, 1, 10);
        assert!(!header.is_compressed());
        header.set_compressed(true);
        assert!(header.is_compressed());
        header.set_compressed(false);
        assert_eq!(header.flags, 0);
        assert_eq!(header.layout(), layout);
    }
}
