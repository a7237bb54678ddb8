//! 16-bit PCM <-> normalized sample conversion

/// Bytes per encoded sample (16-bit)
pub const BYTES_PER_SAMPLE: usize = 2;

/// Decode little-endian signed 16-bit PCM into samples in [-1.0, 1.0).
///
/// A trailing odd byte is not a sample and is dropped.
pub fn decode(bytes: &[u8]) -> Vec<f32> {
    if bytes.len() % BYTES_PER_SAMPLE != 0 {
        log::trace!(
            "Dropping trailing partial sample ({} byte buffer)",
            bytes.len()
        );
    }

    bytes
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect()
}

/// Encode samples as little-endian signed 16-bit PCM.
///
/// Samples outside [-1.0, 1.0] saturate.
pub fn encode(samples: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(samples.len() * BYTES_PER_SAMPLE);
    for &sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * 32767.0).round() as i16;
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}
