//! Log-magnitude STFT spectrogram
//!
//! Frames are Hann-windowed and transformed with `rustfft`; each bin holds
//! `ln(1 + |X[k]|)`. The log keeps quiet passages (fades, song tails) within
//! reach of the global peak threshold, so a full song indexed in one pass
//! yields the same peaks in those regions as a short clip taken from them.
//!
//! No per-bin temporal normalization is applied: such a mean depends on the
//! length of the processed signal, which differs between indexing and query.

use crate::config::BeatLensConfig;
use crate::error::{BeatLensError, Result};
use rayon::prelude::*;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;

/// Spectrogram representation
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrogram {
    /// Log-magnitude values [time_frame][frequency_bin]
    pub magnitudes: Vec<Vec<f32>>,
    /// Number of time frames
    pub num_frames: usize,
    /// Number of frequency bins
    pub num_bins: usize,
}

impl Spectrogram {
    /// Wrap a precomputed magnitude matrix
    pub fn from_magnitudes(magnitudes: Vec<Vec<f32>>) -> Self {
        let num_frames = magnitudes.len();
        let num_bins = magnitudes.first().map_or(0, Vec::len);
        Self {
            magnitudes,
            num_frames,
            num_bins,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.num_frames == 0
    }

    /// Largest magnitude in the matrix (0 when empty)
    pub fn global_max(&self) -> f32 {
        self.magnitudes
            .iter()
            .flat_map(|frame| frame.iter().copied())
            .fold(0.0, f32::max)
    }
}

/// Framing + window + FFT + log compression
pub struct SpectrogramBuilder {
    frame_size: usize,
    hop_size: usize,
    sample_rate: u32,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
}

impl SpectrogramBuilder {
    pub fn new(frame_size: usize, hop_size: usize, sample_rate: u32) -> Result<Self> {
        if frame_size < 2 || !frame_size.is_power_of_two() {
            return Err(BeatLensError::Config(format!(
                "frame size must be a power of 2, got {}",
                frame_size
            )));
        }
        if hop_size == 0 {
            return Err(BeatLensError::Config("hop size must be > 0".to_string()));
        }

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(frame_size);

        Ok(Self {
            frame_size,
            hop_size,
            sample_rate,
            window: create_hann_window(frame_size),
            fft,
        })
    }

    pub fn from_config(config: &BeatLensConfig) -> Result<Self> {
        Self::new(
            config.spectrogram.frame_size,
            config.spectrogram.hop_size,
            config.audio.sample_rate,
        )
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    pub fn num_bins(&self) -> usize {
        self.frame_size / 2
    }

    /// Number of full frames that fit in `num_samples`
    pub fn num_frames(&self, num_samples: usize) -> usize {
        if num_samples < self.frame_size {
            0
        } else {
            (num_samples - self.frame_size) / self.hop_size + 1
        }
    }

    /// Start time of a frame, in seconds
    pub fn frame_to_seconds(&self, frame: usize) -> f64 {
        (frame * self.hop_size) as f64 / self.sample_rate as f64
    }

    /// Compute the log-magnitude spectrogram of normalized samples
    pub fn generate(&self, samples: &[f32]) -> Result<Spectrogram> {
        let num_frames = self.num_frames(samples.len());
        if num_frames == 0 {
            return Err(BeatLensError::InvalidInput(format!(
                "audio too short: need at least {} samples, got {}",
                self.frame_size,
                samples.len()
            )));
        }

        let magnitudes: Vec<Vec<f32>> = (0..num_frames)
            .into_par_iter()
            .map(|frame| self.frame_magnitudes(samples, frame * self.hop_size))
            .collect();

        log::debug!(
            "Generated spectrogram: {} frames x {} bins (log-magnitude)",
            num_frames,
            self.num_bins()
        );

        Ok(Spectrogram {
            magnitudes,
            num_frames,
            num_bins: self.num_bins(),
        })
    }

    fn frame_magnitudes(&self, samples: &[f32], start: usize) -> Vec<f32> {
        // Zero-pad past the end of the input
        let mut buffer: Vec<Complex<f32>> = (0..self.frame_size)
            .map(|i| {
                let value = samples.get(start + i).copied().unwrap_or(0.0);
                Complex::new(value * self.window[i], 0.0)
            })
            .collect();

        self.fft.process(&mut buffer);

        buffer[..self.num_bins()]
            .iter()
            .map(|c| c.norm().ln_1p())
            .collect()
    }
}

/// Create Hann window
fn create_hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let x = i as f32 / (size - 1) as f32;
            0.5 * (1.0 - (2.0 * PI * x).cos())
        })
        .collect()
}
