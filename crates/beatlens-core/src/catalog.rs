//! Song metadata catalog

use crate::error::{BeatLensError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// An indexed song
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: u64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    pub duration_seconds: f64,
    pub fingerprint_count: u32,
    pub indexed_at: DateTime<Utc>,
}

/// Metadata for a song about to be added; the catalog assigns the id
#[derive(Debug, Clone, PartialEq)]
pub struct NewSong {
    pub title: String,
    pub artist: Option<String>,
    pub duration_seconds: f64,
    pub fingerprint_count: u32,
    pub indexed_at: DateTime<Utc>,
}

/// Catalog summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub total_songs: usize,
    pub total_fingerprints: u64,
    /// Absent for an empty catalog
    pub average_fingerprints_per_song: Option<f64>,
}

impl CatalogStats {
    pub fn new(total_songs: usize, total_fingerprints: u64) -> Self {
        let average_fingerprints_per_song = if total_songs == 0 {
            None
        } else {
            Some(total_fingerprints as f64 / total_songs as f64)
        };

        Self {
            total_songs,
            total_fingerprints,
            average_fingerprints_per_song,
        }
    }
}

/// Song metadata storage
pub trait SongCatalog {
    fn add(&mut self, song: NewSong) -> Result<Song>;

    fn get(&self, id: u64) -> Option<Song>;

    /// All songs in ascending id order
    fn list(&self) -> Vec<Song>;

    /// Fails with `SongNotFound` for an unknown id
    fn remove(&mut self, id: u64) -> Result<Song>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory catalog; ids increase monotonically and are never reused
#[derive(Debug, Clone)]
pub struct MemoryCatalog {
    songs: BTreeMap<u64, Song>,
    next_id: u64,
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self {
            songs: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put back a previously stored song, keeping its id
    pub fn restore(&mut self, song: Song) {
        self.next_id = self.next_id.max(song.id + 1);
        self.songs.insert(song.id, song);
    }

    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Retire every id below `next_id`; never moves the counter backwards
    pub fn reserve_ids_below(&mut self, next_id: u64) {
        self.next_id = self.next_id.max(next_id);
    }
}

impl SongCatalog for MemoryCatalog {
    fn add(&mut self, song: NewSong) -> Result<Song> {
        let id = self.next_id;
        self.next_id += 1;

        let song = Song {
            id,
            title: song.title,
            artist: song.artist,
            duration_seconds: song.duration_seconds,
            fingerprint_count: song.fingerprint_count,
            indexed_at: song.indexed_at,
        };
        self.songs.insert(id, song.clone());
        Ok(song)
    }

    fn get(&self, id: u64) -> Option<Song> {
        self.songs.get(&id).cloned()
    }

    fn list(&self) -> Vec<Song> {
        self.songs.values().cloned().collect()
    }

    fn remove(&mut self, id: u64) -> Result<Song> {
        self.songs.remove(&id).ok_or(BeatLensError::SongNotFound(id))
    }

    fn len(&self) -> usize {
        self.songs.len()
    }
}
