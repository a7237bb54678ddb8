//! Snapshot persistence for the in-memory catalog and index
//!
//! The whole catalog is written as one `beatlens-fp` snapshot (JSON or the
//! compressed `.blx` binary format). Stored hashes are only meaningful under
//! the hash layout they were packed with, so loading refuses a snapshot
//! whose layout differs from the configured one.

use crate::catalog::{MemoryCatalog, Song, SongCatalog};
use crate::config::BeatLensConfig;
use crate::error::{BeatLensError, Result};
use crate::fingerprint::HashLayout;
use crate::index::{FingerprintStore, IndexRecord, MemoryIndex};
use crate::service::BeatLens;
use beatlens_fp::{EntryRecord, IndexSnapshot, SnapshotFormat, SongRecord};
use std::path::Path;

impl From<&Song> for SongRecord {
    fn from(song: &Song) -> Self {
        Self {
            id: song.id,
            title: song.title.clone(),
            artist: song.artist.clone(),
            duration_seconds: song.duration_seconds,
            fingerprint_count: song.fingerprint_count,
            indexed_at: song.indexed_at,
        }
    }
}

impl From<SongRecord> for Song {
    fn from(record: SongRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            artist: record.artist,
            duration_seconds: record.duration_seconds,
            fingerprint_count: record.fingerprint_count,
            indexed_at: record.indexed_at,
        }
    }
}

/// Capture a catalog and its index
pub fn to_snapshot(catalog: &MemoryCatalog, index: &MemoryIndex, layout: HashLayout) -> IndexSnapshot {
    let mut snapshot = IndexSnapshot::new(layout.into());
    snapshot.next_song_id = catalog.next_id();
    snapshot.songs = catalog.list().iter().map(SongRecord::from).collect();
    snapshot.entries = index
        .records()
        .into_iter()
        .map(|r| EntryRecord {
            hash: r.hash,
            song_id: r.song_id,
            time_offset: r.time_offset,
        })
        .collect();
    snapshot
}

/// Rebuild a catalog and index, refusing an incompatible hash layout
pub fn from_snapshot(snapshot: IndexSnapshot, expected: HashLayout) -> Result<(MemoryCatalog, MemoryIndex)> {
    let stored = HashLayout::from(snapshot.layout);
    if stored != expected {
        return Err(BeatLensError::Storage(format!(
            "snapshot hashes use {}/{} frequency/time bits but the configuration uses {}/{}; reindex the catalog",
            stored.freq_bits, stored.time_bits, expected.freq_bits, expected.time_bits
        )));
    }

    let mut catalog = MemoryCatalog::new();
    for record in snapshot.songs {
        catalog.restore(Song::from(record));
    }
    catalog.reserve_ids_below(snapshot.next_song_id);

    let index: MemoryIndex = snapshot
        .entries
        .into_iter()
        .map(|e| IndexRecord {
            hash: e.hash,
            song_id: e.song_id,
            time_offset: e.time_offset,
        })
        .collect();

    Ok((catalog, index))
}

impl BeatLens<MemoryCatalog, MemoryIndex> {
    /// Load the snapshot at `path` into a service
    pub fn load_snapshot(config: BeatLensConfig, path: &Path, format: SnapshotFormat) -> Result<Self> {
        let snapshot = beatlens_fp::load_snapshot(path, format)?;
        let (catalog, index) = from_snapshot(snapshot, config.fingerprint.layout())?;
        log::info!(
            "Loaded {} songs, {} fingerprints from {}",
            catalog.len(),
            index.len(),
            path.display()
        );
        Self::with_parts(config, catalog, index)
    }

    /// Write catalog and index to `path`
    pub fn save_snapshot(&self, path: &Path, format: SnapshotFormat) -> Result<()> {
        let snapshot = to_snapshot(self.catalog(), self.store(), self.config().fingerprint.layout());
        beatlens_fp::save_snapshot(path, format, &snapshot)?;
        log::info!(
            "Saved {} songs, {} fingerprints to {}",
            snapshot.songs.len(),
            snapshot.entries.len(),
            path.display()
        );
        Ok(())
    }

    /// Open the configured snapshot, or start empty when none exists yet
    pub fn open(config: BeatLensConfig) -> Result<Self> {
        let path = Path::new(&config.storage.index_path).to_path_buf();
        if path.exists() {
            let format = config.storage.format;
            Self::load_snapshot(config, &path, format)
        } else {
            log::debug!("No snapshot at {}, starting empty", path.display());
            Self::new(config)
        }
    }

    /// Write to the configured snapshot path
    pub fn save(&self) -> Result<()> {
        let storage = &self.config().storage;
        self.save_snapshot(Path::new(&storage.index_path), storage.format)
    }
}
