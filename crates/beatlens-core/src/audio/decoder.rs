//! WAV decoding into the pipeline's target PCM format

use super::{resample_to_target, PcmFormat};
use crate::error::{BeatLensError, Result};
use std::io::{Cursor, Read};
use std::path::Path;

/// Decoded audio data
#[derive(Debug, Clone)]
pub struct AudioData {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_ms: u32,
}

impl AudioData {
    /// Convert to mono by averaging channels
    pub fn to_mono(&self) -> Vec<f32> {
        if self.channels <= 1 {
            return self.samples.clone();
        }

        self.samples
            .chunks(self.channels as usize)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }

    /// Downmix and resample into the target format
    fn conform(mut self, target: &PcmFormat) -> Result<Self> {
        if self.sample_rate != target.sample_rate {
            log::debug!(
                "Resampling {} Hz -> {} Hz",
                self.sample_rate,
                target.sample_rate
            );
            let mono = self.to_mono();
            self.samples = resample_to_target(&mono, self.sample_rate, target.sample_rate)?;
            self.sample_rate = target.sample_rate;
            self.channels = 1;
        } else if self.channels > 1 {
            self.samples = self.to_mono();
            self.channels = 1;
        }
        Ok(self)
    }
}

/// Decode an in-memory WAV file into mono samples at the target rate
pub fn decode_wav_bytes(bytes: &[u8], target: &PcmFormat) -> Result<AudioData> {
    let reader = hound::WavReader::new(Cursor::new(bytes))
        .map_err(|e| BeatLensError::Format(format!("failed to parse WAV data: {}", e)))?;
    let audio = read_wav(reader).map_err(|e| match e {
        BeatLensError::Io(io) => BeatLensError::Format(format!("truncated WAV data: {}", io)),
        other => other,
    })?;
    audio.conform(target)
}

/// Decode a WAV file from disk into mono samples at the target rate
pub fn decode_wav_file(path: &Path, target: &PcmFormat) -> Result<AudioData> {
    if !path.exists() {
        return Err(BeatLensError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("audio file not found: {}", path.display()),
        )));
    }

    let reader = hound::WavReader::open(path)?;
    let audio = read_wav(reader)?;
    log::debug!(
        "Read {}: {:.2}s @ {} Hz, {} channel(s)",
        path.display(),
        audio.duration_seconds(),
        audio.sample_rate,
        audio.channels
    );
    audio.conform(target)
}

fn read_wav<R: Read>(mut reader: hound::WavReader<R>) -> Result<AudioData> {
    let spec = reader.spec();
    let sample_rate = spec.sample_rate;
    let channels = spec.channels.max(1);

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    let duration_ms = if sample_rate == 0 {
        0
    } else {
        (samples.len() as f64 / (sample_rate as f64 * channels as f64) * 1000.0) as u32
    };

    Ok(AudioData {
        samples,
        sample_rate,
        channels,
        duration_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(spec: hound::WavSpec, samples: &[i16]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample(s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_decode_mono_wav() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let bytes = wav_bytes(spec, &[0, 16384, -32768]);

        let audio = decode_wav_bytes(&bytes, &PcmFormat::default()).unwrap();
        assert_eq!(audio.channels, 1);
        assert_eq!(audio.sample_rate, 44100);
        assert_eq!(audio.samples, vec![0.0, 0.5, -1.0]);
    }

    #[test]
    fn test_decode_stereo_downmixes() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let bytes = wav_bytes(spec, &[16384, 0, -16384, -16384]);

        let audio = decode_wav_bytes(&bytes, &PcmFormat::default()).unwrap();
        assert_eq!(audio.channels, 1);
        assert_eq!(audio.samples, vec![0.25, -0.5]);
    }

    #[test]
    fn test_decode_resamples_to_target() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let bytes = wav_bytes(spec, &vec![0i16; 22050]);

        let audio = decode_wav_bytes(&bytes, &PcmFormat::default()).unwrap();
        assert_eq!(audio.sample_rate, 44100);
        assert_eq!(audio.samples.len(), 44100);
    }

    #[test]
    fn test_garbage_is_format_error() {
        let err = decode_wav_bytes(b"definitely not a RIFF file", &PcmFormat::default())
            .unwrap_err();
        assert!(matches!(err, BeatLensError::Format(_)));
    }
}
