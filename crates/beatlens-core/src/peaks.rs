//! Constellation extraction: banded local maxima of the spectrogram
//!
//! A cell is a peak when it clears the global threshold and no other cell in
//! its `(2r+1) x (2r+1)` neighborhood is as loud. Each frame keeps at most
//! `peaks_per_frame` of its candidates, loudest first.

use crate::config::{BeatLensConfig, PeakConfig};
use crate::transform::Spectrogram;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A constellation point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub frame_index: usize,
    pub frequency_bin: usize,
    pub magnitude: f32,
}

impl Peak {
    pub fn new(frame_index: usize, frequency_bin: usize, magnitude: f32) -> Self {
        Self {
            frame_index,
            frequency_bin,
            magnitude,
        }
    }
}

/// Banded peak picker
#[derive(Debug, Clone)]
pub struct PeakExtractor {
    /// `[start, end)` bin ranges, not yet clamped to the spectrogram
    bands: Vec<(usize, usize)>,
    peaks_per_frame: usize,
    neighborhood: usize,
    min_amplitude: f32,
}

impl PeakExtractor {
    pub fn new(config: &PeakConfig, sample_rate: u32, frame_size: usize) -> Self {
        let resolution = sample_rate as f64 / frame_size as f64;
        let edges: Vec<usize> = config
            .frequency_bands
            .iter()
            .map(|&hz| (hz as f64 / resolution).round() as usize)
            .collect();
        let bands = edges.windows(2).map(|w| (w[0], w[1])).collect();

        Self {
            bands,
            peaks_per_frame: config.peaks_per_frame,
            neighborhood: config.neighborhood_size,
            min_amplitude: config.min_amplitude,
        }
    }

    pub fn from_config(config: &BeatLensConfig) -> Self {
        Self::new(
            &config.peaks,
            config.audio.sample_rate,
            config.spectrogram.frame_size,
        )
    }

    /// Extract peaks in frame order
    pub fn extract(&self, spectrogram: &Spectrogram) -> Vec<Peak> {
        if spectrogram.is_empty() || spectrogram.num_bins == 0 {
            return Vec::new();
        }

        let global_max = spectrogram.global_max();
        if global_max <= 0.0 {
            log::debug!("Silent spectrogram, no peaks");
            return Vec::new();
        }
        let threshold = global_max * self.min_amplitude;

        let per_frame: Vec<Vec<Peak>> = (0..spectrogram.num_frames)
            .into_par_iter()
            .map(|frame| self.frame_peaks(spectrogram, frame, threshold))
            .collect();
        let peaks: Vec<Peak> = per_frame.into_iter().flatten().collect();

        log::debug!(
            "Extracted {} peaks from {} frames (threshold {:.4})",
            peaks.len(),
            spectrogram.num_frames,
            threshold
        );

        peaks
    }

    fn frame_peaks(&self, spectrogram: &Spectrogram, frame: usize, threshold: f32) -> Vec<Peak> {
        let row = &spectrogram.magnitudes[frame];
        let mut candidates = Vec::new();

        for &(start, end) in &self.bands {
            let end = end.min(spectrogram.num_bins);
            for bin in start..end {
                let magnitude = row[bin];
                if magnitude >= threshold && self.is_local_max(spectrogram, frame, bin) {
                    candidates.push(Peak::new(frame, bin, magnitude));
                }
            }
        }

        // Stable: equal magnitudes keep scan order
        candidates.sort_by(|a, b| {
            b.magnitude
                .partial_cmp(&a.magnitude)
                .unwrap_or(Ordering::Equal)
        });
        candidates.truncate(self.peaks_per_frame);
        candidates
    }

    fn is_local_max(&self, spectrogram: &Spectrogram, frame: usize, bin: usize) -> bool {
        let r = self.neighborhood;
        let value = spectrogram.magnitudes[frame][bin];

        let t_start = frame.saturating_sub(r);
        let t_end = (frame + r + 1).min(spectrogram.num_frames);
        let f_start = bin.saturating_sub(r);
        let f_end = (bin + r + 1).min(spectrogram.num_bins);

        for t in t_start..t_end {
            let row = &spectrogram.magnitudes[t];
            for f in f_start..f_end {
                if (t != frame || f != bin) && row[f] >= value {
                    return false;
                }
            }
        }
        true
    }
}
