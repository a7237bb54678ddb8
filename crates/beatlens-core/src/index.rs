//! Fingerprint index: the write side plus an in-memory reference store

use crate::error::Result;
use crate::matching::FingerprintLookup;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One occurrence of a hash in the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexEntry {
    pub song_id: u64,
    /// Anchor frame within the song
    pub time_offset: u32,
}

/// A hash occurrence as produced by indexing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexRecord {
    pub hash: u64,
    pub song_id: u64,
    pub time_offset: u32,
}

impl IndexRecord {
    pub fn entry(&self) -> IndexEntry {
        IndexEntry {
            song_id: self.song_id,
            time_offset: self.time_offset,
        }
    }
}

/// Population side of a fingerprint catalog
pub trait FingerprintStore {
    fn insert(&mut self, records: &[IndexRecord]) -> Result<()>;

    /// Drop every entry of a song, returning how many were removed
    fn remove_song(&mut self, song_id: u64) -> Result<usize>;

    /// Number of stored entries
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Hash-keyed inverted index held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    entries: HashMap<u64, Vec<IndexEntry>>,
    len: usize,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_hashes(&self) -> usize {
        self.entries.len()
    }

    /// Every entry, ordered by hash, song and offset
    pub fn records(&self) -> Vec<IndexRecord> {
        let mut records: Vec<IndexRecord> = self
            .entries
            .iter()
            .flat_map(|(&hash, entries)| {
                entries.iter().map(move |e| IndexRecord {
                    hash,
                    song_id: e.song_id,
                    time_offset: e.time_offset,
                })
            })
            .collect();
        records.sort_by_key(|r| (r.hash, r.song_id, r.time_offset));
        records
    }

    pub fn count_for_song(&self, song_id: u64) -> usize {
        self.entries
            .values()
            .flat_map(|entries| entries.iter())
            .filter(|e| e.song_id == song_id)
            .count()
    }
}

impl FingerprintStore for MemoryIndex {
    fn insert(&mut self, records: &[IndexRecord]) -> Result<()> {
        for record in records {
            self.entries
                .entry(record.hash)
                .or_default()
                .push(record.entry());
        }
        self.len += records.len();
        Ok(())
    }

    fn remove_song(&mut self, song_id: u64) -> Result<usize> {
        let mut removed = 0;
        self.entries.retain(|_, entries| {
            let before = entries.len();
            entries.retain(|e| e.song_id != song_id);
            removed += before - entries.len();
            !entries.is_empty()
        });
        self.len -= removed;
        Ok(removed)
    }

    fn len(&self) -> usize {
        self.len
    }
}

impl FingerprintLookup for MemoryIndex {
    fn lookup(&self, hash: u64) -> Vec<IndexEntry> {
        self.entries.get(&hash).cloned().unwrap_or_default()
    }
}

impl FromIterator<IndexRecord> for MemoryIndex {
    fn from_iter<I: IntoIterator<Item = IndexRecord>>(iter: I) -> Self {
        let mut index = MemoryIndex::new();
        for record in iter {
            index
                .entries
                .entry(record.hash)
                .or_default()
                .push(record.entry());
            index.len += 1;
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(hash: u64, song_id: u64, time_offset: u32) -> IndexRecord {
        IndexRecord {
            hash,
            song_id,
            time_offset,
        }
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut index = MemoryIndex::new();
        index
            .insert(&[record(1, 10, 5), record(1, 11, 7), record(2, 10, 9)])
            .unwrap();

        assert_eq!(index.len(), 3);
        assert_eq!(index.num_hashes(), 2);
        assert_eq!(
            index.lookup(1),
            vec![
                IndexEntry {
                    song_id: 10,
                    time_offset: 5
                },
                IndexEntry {
                    song_id: 11,
                    time_offset: 7
                },
            ]
        );
        assert!(index.lookup(99).is_empty());
    }

    #[test]
    fn test_remove_song() {
        let mut index: MemoryIndex = vec![record(1, 10, 5), record(1, 11, 7), record(2, 10, 9)]
            .into_iter()
            .collect();

        assert_eq!(index.remove_song(10).unwrap(), 2);
        assert_eq!(index.len(), 1);
        assert_eq!(index.num_hashes(), 1);
        assert!(index.lookup(2).is_empty());
        assert_eq!(index.count_for_song(11), 1);

        assert_eq!(index.remove_song(10).unwrap(), 0);
    }

    #[test]
    fn test_records_are_ordered() {
        let index: MemoryIndex = vec![record(5, 2, 1), record(1, 3, 4), record(5, 1, 8)]
            .into_iter()
            .collect();
        assert_eq!(
            index.records(),
            vec![record(1, 3, 4), record(5, 1, 8), record(5, 2, 1)]
        );
    }
}
