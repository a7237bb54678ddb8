//! Configuration parameters for the BeatLens pipeline
//!
//! Two tunings are provided as presets. `full_spectrum` (the default) covers
//! the whole band up to Nyquist with 12-bit frequency fields in the hash;
//! `legacy` reproduces the narrower 5-band / 10-bit tuning so catalogs
//! indexed with it stay queryable. Switching presets changes the hash layout
//! and therefore requires reindexing.

use crate::audio::PcmFormat;
use crate::error::{BeatLensError, Result};
use crate::fingerprint::HashLayout;
use beatlens_fp::SnapshotFormat;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Full pipeline configuration, one TOML table per stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatLensConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub spectrogram: SpectrogramConfig,
    #[serde(default)]
    pub peaks: PeakConfig,
    #[serde(default)]
    pub fingerprint: FingerprintConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Expected PCM format of decoded input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub channels: u16,
    /// Inputs shorter than this are rejected (0 disables the check)
    pub min_duration_seconds: f64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            bits_per_sample: 16,
            channels: 1,
            min_duration_seconds: 0.0,
        }
    }
}

impl AudioConfig {
    pub fn pcm_format(&self) -> PcmFormat {
        PcmFormat {
            sample_rate: self.sample_rate,
            bits_per_sample: self.bits_per_sample,
            channels: self.channels,
        }
    }
}

/// STFT framing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrogramConfig {
    /// FFT length, must be a power of two
    pub frame_size: usize,
    pub hop_size: usize,
}

impl Default for SpectrogramConfig {
    fn default() -> Self {
        Self {
            frame_size: 4096,
            hop_size: 2048,
        }
    }
}

/// Constellation extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakConfig {
    /// Ascending band boundaries in Hz
    pub frequency_bands: Vec<u32>,
    pub peaks_per_frame: usize,
    /// Radius of the local-maximum window, in frames and bins
    pub neighborhood_size: usize,
    /// Threshold as a fraction of the spectrogram's global maximum
    pub min_amplitude: f32,
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            frequency_bands: vec![0, 300, 600, 1200, 2400, 5000, 10000, 22050],
            peaks_per_frame: 8,
            neighborhood_size: 15,
            min_amplitude: 0.01,
        }
    }
}

/// Peak pairing and hash layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerprintConfig {
    /// Minimum frame gap between anchor and target
    pub target_zone_size: u32,
    /// Maximum targets per anchor
    pub fan_out: usize,
    /// Maximum frame gap between anchor and target
    pub max_time_delta: u32,
    pub freq_bits: u8,
    pub time_bits: u8,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            target_zone_size: 5,
            fan_out: 20,
            max_time_delta: 200,
            freq_bits: HashLayout::FULL_SPECTRUM.freq_bits,
            time_bits: HashLayout::FULL_SPECTRUM.time_bits,
        }
    }
}

impl FingerprintConfig {
    pub fn layout(&self) -> HashLayout {
        HashLayout {
            freq_bits: self.freq_bits,
            time_bits: self.time_bits,
        }
    }
}

/// Time-alignment scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Offset histogram bucket width, in frames
    pub offset_tolerance: u32,
    pub min_aligned_matches: u32,
    pub min_confidence: f64,
    /// Issue lookups on the rayon pool
    pub parallel_lookups: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            offset_tolerance: 3,
            min_aligned_matches: 3,
            min_confidence: 5.0,
            parallel_lookups: false,
        }
    }
}

/// Where the CLI keeps its catalog snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_index_path")]
    pub index_path: String,
    #[serde(default)]
    pub format: SnapshotFormat,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
            format: SnapshotFormat::default(),
        }
    }
}

fn default_index_path() -> String {
    "./beatlens-index.blx".to_string()
}

impl Default for BeatLensConfig {
    fn default() -> Self {
        Self::full_spectrum()
    }
}

impl BeatLensConfig {
    /// Full-spectrum tuning: 7 bands up to 22.05 kHz, 12-bit frequency fields
    pub fn full_spectrum() -> Self {
        Self {
            audio: AudioConfig::default(),
            spectrogram: SpectrogramConfig::default(),
            peaks: PeakConfig::default(),
            fingerprint: FingerprintConfig::default(),
            matching: MatchingConfig::default(),
            storage: StorageConfig::default(),
        }
    }

    /// Narrow tuning: 5 bands up to 5 kHz, 10-bit frequency fields
    pub fn legacy() -> Self {
        Self {
            peaks: PeakConfig {
                frequency_bands: vec![0, 300, 600, 1200, 2400, 5000],
                peaks_per_frame: 5,
                neighborhood_size: 20,
                min_amplitude: 0.01,
            },
            fingerprint: FingerprintConfig {
                fan_out: 15,
                freq_bits: HashLayout::LEGACY.freq_bits,
                time_bits: HashLayout::LEGACY.time_bits,
                ..FingerprintConfig::default()
            },
            matching: MatchingConfig {
                offset_tolerance: 2,
                ..MatchingConfig::default()
            },
            ..Self::full_spectrum()
        }
    }

    /// Load and validate configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: BeatLensConfig = toml::from_str(content)
            .map_err(|e| BeatLensError::Config(format!("failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Hz per FFT bin
    pub fn frequency_resolution(&self) -> f64 {
        self.audio.sample_rate as f64 / self.spectrogram.frame_size as f64
    }

    /// Seconds per spectrogram frame
    pub fn time_resolution(&self) -> f64 {
        self.spectrogram.hop_size as f64 / self.audio.sample_rate as f64
    }

    pub fn num_bins(&self) -> usize {
        self.spectrogram.frame_size / 2
    }

    /// Convert a frequency (Hz) to its FFT bin index
    pub fn frequency_to_bin(&self, hz: f64) -> usize {
        (hz / self.frequency_resolution()).round().max(0.0) as usize
    }

    /// Convert an FFT bin index to its frequency (Hz)
    pub fn bin_to_frequency(&self, bin: usize) -> f64 {
        bin as f64 * self.frequency_resolution()
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        self.audio.pcm_format().validate()?;
        if self.audio.min_duration_seconds < 0.0 || !self.audio.min_duration_seconds.is_finite() {
            return Err(config_error("min_duration_seconds must be a finite value >= 0"));
        }

        let frame_size = self.spectrogram.frame_size;
        if frame_size < 2 || !frame_size.is_power_of_two() {
            return Err(config_error(format!(
                "frame_size must be a power of 2, got {}",
                frame_size
            )));
        }
        if self.spectrogram.hop_size == 0 {
            return Err(config_error("hop_size must be > 0"));
        }

        let bands = &self.peaks.frequency_bands;
        if bands.len() < 2 {
            return Err(config_error("frequency_bands needs at least two boundaries"));
        }
        if bands.windows(2).any(|w| w[0] >= w[1]) {
            return Err(config_error("frequency_bands must be strictly ascending"));
        }
        if self.peaks.peaks_per_frame == 0 {
            return Err(config_error("peaks_per_frame must be > 0"));
        }
        if !(0.0..=1.0).contains(&self.peaks.min_amplitude) {
            return Err(config_error("min_amplitude must be within [0, 1]"));
        }

        let fp = &self.fingerprint;
        if fp.fan_out == 0 {
            return Err(config_error("fan_out must be > 0"));
        }
        if fp.target_zone_size > fp.max_time_delta {
            return Err(config_error("target_zone_size must be <= max_time_delta"));
        }

        let layout = fp.layout();
        layout.validate()?;
        let highest_band_bin = bands
            .last()
            .map(|&hz| self.frequency_to_bin(hz as f64))
            .unwrap_or(0);
        let highest_bin = highest_band_bin.min(self.num_bins()).saturating_sub(1);
        if highest_bin as u64 > layout.freq_mask() {
            return Err(config_error(format!(
                "freq_bits = {} cannot hold bin {} (needs {} bits)",
                layout.freq_bits,
                highest_bin,
                bits_needed(highest_bin as u64)
            )));
        }
        if fp.max_time_delta as u64 > layout.time_mask() {
            return Err(config_error(format!(
                "time_bits = {} cannot hold max_time_delta {}",
                layout.time_bits, fp.max_time_delta
            )));
        }

        if self.matching.offset_tolerance == 0 {
            return Err(config_error("offset_tolerance must be > 0"));
        }
        if !self.matching.min_confidence.is_finite() {
            return Err(config_error("min_confidence must be finite"));
        }

        Ok(())
    }
}

fn config_error(msg: impl Into<String>) -> BeatLensError {
    BeatLensError::Config(msg.into())
}

fn bits_needed(value: u64) -> u32 {
    64 - value.leading_zeros()
}
