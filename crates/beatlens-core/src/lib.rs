//! BeatLens Core - Constellation Audio Fingerprinting
//!
//! Audio is turned into a log-magnitude spectrogram, reduced to a sparse
//! constellation of spectral peaks, and peak pairs are hashed into 64-bit
//! fingerprints. Identification looks those hashes up in a catalog and
//! scores candidate songs by how consistently their hits line up in time.
//!
//! ```text
//! samples -> SpectrogramBuilder -> PeakExtractor -> FingerprintHasher
//!                                                        |
//!                      MatchResult <- Matcher <- FingerprintLookup
//! ```

pub mod audio;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod index;
pub mod matching;
pub mod peaks;
pub mod persistence;
pub mod service;
pub mod transform;

pub use audio::{AudioData, PcmFormat};
pub use catalog::{CatalogStats, MemoryCatalog, NewSong, Song, SongCatalog};
pub use config::BeatLensConfig;
pub use error::{BeatLensError, Result};
pub use fingerprint::{Fingerprint, FingerprintHasher, HashLayout};
pub use index::{FingerprintStore, IndexEntry, IndexRecord, MemoryIndex};
pub use matching::{FingerprintLookup, MatchResult, Matcher};
pub use peaks::{Peak, PeakExtractor};
pub use service::{BeatLens, IdentifiedMatch, MatchResponse};
pub use transform::{Spectrogram, SpectrogramBuilder};

use std::path::Path;

/// Generate fingerprints from a WAV file
///
/// Applies the same length checks as [`BeatLens::fingerprint_samples`].
pub fn generate_fingerprints(audio_path: &Path, config: &BeatLensConfig) -> Result<Vec<Fingerprint>> {
    let service = BeatLens::new(config.clone())?;

    // Decode into the configured rate, mono
    let audio_data = audio::decode_wav_file(audio_path, &config.audio.pcm_format())?;

    service.fingerprint_samples(&audio_data.samples)
}
