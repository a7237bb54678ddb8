//! Band-limited sample-rate conversion with rubato

use crate::error::{BeatLensError, Result};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

/// Input frames fed to the resampler per call
const CHUNK_SIZE: usize = 1024;

fn sinc_parameters() -> SincInterpolationParameters {
    SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        oversampling_factor: 128,
        interpolation: SincInterpolationType::Linear,
        window: WindowFunction::BlackmanHarris2,
    }
}

/// Resample mono audio to the target rate.
///
/// Content above the lower Nyquist frequency is filtered out rather than
/// folded back. The output is aligned with the input (the filter delay is
/// trimmed) and holds `ceil(len * to_rate / from_rate)` samples.
pub fn resample_to_target(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }
    if from_rate == 0 || to_rate == 0 {
        return Err(BeatLensError::InvalidInput(format!(
            "cannot resample {} Hz -> {} Hz",
            from_rate, to_rate
        )));
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, sinc_parameters(), CHUNK_SIZE, 1)
        .map_err(resample_error)?;

    let expected =
        ((samples.len() as u64 * to_rate as u64 + from_rate as u64 - 1) / from_rate as u64) as usize;
    let delay = resampler.output_delay();
    let mut output = Vec::with_capacity(expected + delay + CHUNK_SIZE);

    for chunk in samples.chunks(CHUNK_SIZE) {
        let wave_in = [chunk];
        let frames = if chunk.len() == CHUNK_SIZE {
            resampler.process(&wave_in[..], None)
        } else {
            resampler.process_partial(Some(&wave_in[..]), None)
        }
        .map_err(resample_error)?;
        output.extend_from_slice(&frames[0]);
    }

    // Flush the filter tail
    while output.len() < expected + delay {
        let frames = resampler
            .process_partial::<&[f32]>(None, None)
            .map_err(resample_error)?;
        if frames[0].is_empty() {
            break;
        }
        output.extend_from_slice(&frames[0]);
    }

    output.drain(..delay.min(output.len()));
    output.truncate(expected);
    Ok(output)
}

fn resample_error(err: impl std::fmt::Display) -> BeatLensError {
    BeatLensError::InvalidInput(format!("resampling failed: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(freq: f32, rate: u32, seconds: f32) -> Vec<f32> {
        let n = (rate as f32 * seconds) as usize;
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f32 / rate as f32).sin())
            .collect()
    }

    /// RMS over the middle half, away from the filter edges
    fn middle_rms(samples: &[f32]) -> f32 {
        let quarter = samples.len() / 4;
        let middle = &samples[quarter..samples.len() - quarter];
        (middle.iter().map(|s| s * s).sum::<f32>() / middle.len() as f32).sqrt()
    }

    #[test]
    fn test_same_rate_is_identity() {
        let samples = vec![0.1, -0.2, 0.3];
        assert_eq!(resample_to_target(&samples, 44100, 44100).unwrap(), samples);
    }

    #[test]
    fn test_output_length_follows_ratio() {
        let samples = sine(440.0, 88200, 0.5);
        assert_eq!(resample_to_target(&samples, 88200, 44100).unwrap().len(), 22050);

        let samples = sine(440.0, 22050, 1.0);
        assert_eq!(resample_to_target(&samples, 22050, 44100).unwrap().len(), 44100);
    }

    #[test]
    fn test_in_band_tone_survives() {
        let out = resample_to_target(&sine(1000.0, 48000, 1.0), 48000, 44100).unwrap();
        assert_eq!(out.len(), 44100);
        assert!((middle_rms(&out) - std::f32::consts::FRAC_1_SQRT_2).abs() < 0.02);
    }

    #[test]
    fn test_out_of_band_tone_is_filtered() {
        // 30 kHz is above the 22.05 kHz Nyquist of the target rate
        let out = resample_to_target(&sine(30000.0, 96000, 1.0), 96000, 44100).unwrap();
        assert!(middle_rms(&out) < 0.01, "aliased energy survived");
    }
}
