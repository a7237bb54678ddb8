//! Audio ingestion: raw PCM codec and WAV decoding
//!
//! The pipeline consumes normalized mono samples. Raw PCM must already be
//! 16-bit little-endian mono at the configured rate; WAV input is
//! downmixed and resampled as needed.

mod decoder;
pub mod pcm;
mod resample;

pub use decoder::{decode_wav_bytes, decode_wav_file, AudioData};
pub use resample::resample_to_target;

use crate::error::{BeatLensError, Result};

/// Expected format of raw PCM input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub channels: u16,
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            bits_per_sample: 16,
            channels: 1,
        }
    }
}

impl PcmFormat {
    /// Only 16-bit mono PCM is supported
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(BeatLensError::Config("sample_rate must be > 0".to_string()));
        }
        if self.bits_per_sample != 16 {
            return Err(BeatLensError::Config(format!(
                "unsupported bit depth {} (only 16-bit PCM)",
                self.bits_per_sample
            )));
        }
        if self.channels != 1 {
            return Err(BeatLensError::Config(format!(
                "unsupported channel count {} (only mono PCM)",
                self.channels
            )));
        }
        Ok(())
    }

    pub fn bytes_per_second(&self) -> usize {
        self.sample_rate as usize * pcm::BYTES_PER_SAMPLE * self.channels as usize
    }

    /// Duration of a sample count at this rate
    pub fn duration_seconds(&self, num_samples: usize) -> f64 {
        num_samples as f64 / self.sample_rate as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm_format_validation() {
        PcmFormat::default().validate().unwrap();

        let stereo = PcmFormat {
            channels: 2,
            ..PcmFormat::default()
        };
        assert!(matches!(stereo.validate(), Err(BeatLensError::Config(_))));

        let eight_bit = PcmFormat {
            bits_per_sample: 8,
            ..PcmFormat::default()
        };
        assert!(matches!(eight_bit.validate(), Err(BeatLensError::Config(_))));
    }

    #[test]
    fn test_duration() {
        let format = PcmFormat::default();
        assert_eq!(format.bytes_per_second(), 88200);
        assert!((format.duration_seconds(22050) - 0.5).abs() < 1e-12);
    }
}
