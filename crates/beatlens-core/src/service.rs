//! The BeatLens service: indexing, identification and catalog upkeep
//!
//! `BeatLens` owns one configured pipeline plus a song catalog and a
//! fingerprint store. Indexing runs audio through the pipeline and writes
//! the resulting hashes; matching runs a query through the same pipeline
//! and scores it against the store.

use crate::audio::{self, PcmFormat};
use crate::catalog::{CatalogStats, MemoryCatalog, NewSong, Song, SongCatalog};
use crate::config::BeatLensConfig;
use crate::error::{BeatLensError, Result};
use crate::fingerprint::{Fingerprint, FingerprintHasher};
use crate::index::{FingerprintStore, IndexRecord, MemoryIndex};
use crate::matching::{FingerprintLookup, MatchResult, Matcher};
use crate::peaks::PeakExtractor;
use crate::transform::SpectrogramBuilder;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Records handed to the store per insert call
pub const INSERT_BATCH_SIZE: usize = 5000;

/// Title used when a matched song is missing from the catalog
const UNKNOWN: &str = "Unknown";

/// A match with its catalog metadata attached
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentifiedMatch {
    #[serde(flatten)]
    pub result: MatchResult,
    pub title: String,
    pub artist: Option<String>,
}

/// Outcome of one identification query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResponse {
    /// Best match first
    pub matches: Vec<IdentifiedMatch>,
    pub query_fingerprints: usize,
    pub query_duration_seconds: f64,
}

impl MatchResponse {
    pub fn best(&self) -> Option<&IdentifiedMatch> {
        self.matches.first()
    }
}

pub struct BeatLens<C = MemoryCatalog, S = MemoryIndex> {
    config: BeatLensConfig,
    spectrogram: SpectrogramBuilder,
    peaks: PeakExtractor,
    hasher: FingerprintHasher,
    matcher: Matcher,
    catalog: C,
    store: S,
}

impl BeatLens {
    /// A service backed by an empty in-memory catalog and index
    pub fn new(config: BeatLensConfig) -> Result<Self> {
        Self::with_parts(config, MemoryCatalog::new(), MemoryIndex::new())
    }
}

impl<C, S> BeatLens<C, S>
where
    C: SongCatalog,
    S: FingerprintStore + FingerprintLookup,
{
    pub fn with_parts(config: BeatLensConfig, catalog: C, store: S) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            spectrogram: SpectrogramBuilder::from_config(&config)?,
            peaks: PeakExtractor::from_config(&config),
            hasher: FingerprintHasher::from_config(&config),
            matcher: Matcher::from_config(&config),
            config,
            catalog,
            store,
        })
    }

    pub fn config(&self) -> &BeatLensConfig {
        &self.config
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_parts(self) -> (C, S) {
        (self.catalog, self.store)
    }

    fn pcm_format(&self) -> PcmFormat {
        self.config.audio.pcm_format()
    }

    /// Run samples through spectrogram, peak and hash stages
    pub fn fingerprint_samples(&self, samples: &[f32]) -> Result<Vec<Fingerprint>> {
        let frame_size = self.spectrogram.frame_size();
        if samples.len() < frame_size {
            return Err(BeatLensError::InvalidInput(format!(
                "audio too short: need at least {} samples ({:.2}s), got {}",
                frame_size,
                self.pcm_format().duration_seconds(frame_size),
                samples.len()
            )));
        }

        let duration = self.pcm_format().duration_seconds(samples.len());
        let min_duration = self.config.audio.min_duration_seconds;
        if duration < min_duration {
            return Err(BeatLensError::InvalidInput(format!(
                "audio too short: {:.2}s, minimum is {:.2}s",
                duration, min_duration
            )));
        }

        let spectrogram = self.spectrogram.generate(samples)?;
        let peaks = self.peaks.extract(&spectrogram);
        Ok(self.hasher.generate(&peaks))
    }

    /// Fingerprint a song and add it to the catalog and store
    pub fn index_song(&mut self, title: &str, artist: Option<&str>, samples: &[f32]) -> Result<Song> {
        log::info!("Indexing song: {} - {}", title, artist.unwrap_or(UNKNOWN));

        let fingerprints = self.fingerprint_samples(samples)?;
        let duration_seconds = self.pcm_format().duration_seconds(samples.len());
        log::info!(
            "Generated {} fingerprints for \"{}\" ({:.1}s)",
            fingerprints.len(),
            title,
            duration_seconds
        );

        let song = self.catalog.add(NewSong {
            title: title.to_string(),
            artist: artist.map(str::to_string),
            duration_seconds,
            fingerprint_count: fingerprints.len() as u32,
            indexed_at: Utc::now(),
        })?;

        let records: Vec<IndexRecord> = fingerprints
            .iter()
            .map(|fp| IndexRecord {
                hash: fp.hash,
                song_id: song.id,
                time_offset: fp.anchor_time,
            })
            .collect();
        if let Err(err) = self.insert_batches(&records) {
            self.rollback(song.id);
            return Err(err);
        }

        log::info!(
            "Song indexed: id={}, fingerprints={}",
            song.id,
            fingerprints.len()
        );
        Ok(song)
    }

    fn insert_batches(&mut self, records: &[IndexRecord]) -> Result<()> {
        for batch in records.chunks(INSERT_BATCH_SIZE) {
            self.store.insert(batch)?;
        }
        Ok(())
    }

    /// Undo a partially indexed song
    fn rollback(&mut self, song_id: u64) {
        log::warn!("Indexing song {} failed, rolling back", song_id);
        if let Err(e) = self.store.remove_song(song_id) {
            log::warn!("Failed to remove fingerprints of song {}: {}", song_id, e);
        }
        if let Err(e) = self.catalog.remove(song_id) {
            log::warn!("Failed to remove song {} from catalog: {}", song_id, e);
        }
    }

    /// Decode a WAV buffer and index it
    pub fn index_wav(&mut self, title: &str, artist: Option<&str>, wav_bytes: &[u8]) -> Result<Song> {
        let audio = audio::decode_wav_bytes(wav_bytes, &self.pcm_format())?;
        self.index_song(title, artist, &audio.samples)
    }

    /// Identify normalized mono samples
    pub fn match_samples(&self, samples: &[f32]) -> Result<MatchResponse> {
        let fingerprints = self.fingerprint_samples(samples)?;
        let query_duration_seconds = self.pcm_format().duration_seconds(samples.len());
        log::info!(
            "Matching query: {:.2}s, {} fingerprints",
            query_duration_seconds,
            fingerprints.len()
        );

        if fingerprints.is_empty() {
            return Ok(MatchResponse {
                matches: Vec::new(),
                query_fingerprints: 0,
                query_duration_seconds,
            });
        }

        let matches = self
            .matcher
            .match_fingerprints(&fingerprints, &self.store)
            .into_iter()
            .map(|result| self.identify(result))
            .collect();

        Ok(MatchResponse {
            matches,
            query_fingerprints: fingerprints.len(),
            query_duration_seconds,
        })
    }

    /// Identify a WAV clip
    pub fn match_wav(&self, wav_bytes: &[u8]) -> Result<MatchResponse> {
        let audio = audio::decode_wav_bytes(wav_bytes, &self.pcm_format())?;
        self.match_samples(&audio.samples)
    }

    /// Identify raw 16-bit little-endian mono PCM at the configured rate
    pub fn match_pcm(&self, pcm_bytes: &[u8]) -> Result<MatchResponse> {
        self.match_samples(&audio::pcm::decode(pcm_bytes))
    }

    fn identify(&self, result: MatchResult) -> IdentifiedMatch {
        match self.catalog.get(result.song_id) {
            Some(song) => IdentifiedMatch {
                result,
                title: song.title,
                artist: song.artist,
            },
            None => IdentifiedMatch {
                result,
                title: UNKNOWN.to_string(),
                artist: Some(UNKNOWN.to_string()),
            },
        }
    }

    /// Remove a song and all of its fingerprints
    pub fn delete_song(&mut self, id: u64) -> Result<Song> {
        if self.catalog.get(id).is_none() {
            return Err(BeatLensError::SongNotFound(id));
        }
        let removed = self.store.remove_song(id)?;
        let song = self.catalog.remove(id)?;
        log::info!("Deleted song id={} ({} fingerprints)", id, removed);
        Ok(song)
    }

    pub fn list_songs(&self) -> Vec<Song> {
        self.catalog.list()
    }

    pub fn song(&self, id: u64) -> Result<Song> {
        self.catalog.get(id).ok_or(BeatLensError::SongNotFound(id))
    }

    pub fn stats(&self) -> CatalogStats {
        CatalogStats::new(self.catalog.len(), self.store.len() as u64)
    }
}
