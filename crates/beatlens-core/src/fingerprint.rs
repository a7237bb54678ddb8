//! Combinatorial peak pairing and hash packing
//!
//! Every peak anchors up to `fan_out` pairs with later peaks whose frame
//! gap falls inside the target zone. A pair packs into a 64-bit hash:
//!
//! ```text
//! | freq1 (B bits) | freq2 (B bits) | time_delta (T bits) |
//! ```
//!
//! The layout is part of the stored catalog: changing B or T invalidates
//! every previously indexed hash.

use crate::config::{BeatLensConfig, FingerprintConfig};
use crate::error::{BeatLensError, Result};
use crate::peaks::Peak;
use serde::{Deserialize, Serialize};

/// Bit widths of the packed hash fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HashLayout {
    pub freq_bits: u8,
    pub time_bits: u8,
}

impl HashLayout {
    /// 12-bit frequencies cover all 2048 bins of a 4096-point FFT
    pub const FULL_SPECTRUM: HashLayout = HashLayout {
        freq_bits: 12,
        time_bits: 10,
    };

    /// 10-bit frequencies, enough for bands up to 5 kHz
    pub const LEGACY: HashLayout = HashLayout {
        freq_bits: 10,
        time_bits: 10,
    };

    pub fn validate(&self) -> Result<()> {
        if self.freq_bits == 0 || self.time_bits == 0 {
            return Err(BeatLensError::Config(
                "hash layout fields need at least one bit".to_string(),
            ));
        }
        let total = 2 * self.freq_bits as u32 + self.time_bits as u32;
        if total > 64 {
            return Err(BeatLensError::Config(format!(
                "hash layout needs {} bits (2 x {} + {}), max 64",
                total, self.freq_bits, self.time_bits
            )));
        }
        Ok(())
    }

    pub fn freq_mask(&self) -> u64 {
        mask(self.freq_bits)
    }

    pub fn time_mask(&self) -> u64 {
        mask(self.time_bits)
    }

    /// Pack a peak pair; values wider than their field are masked
    pub fn pack(&self, freq1: u32, freq2: u32, time_delta: u32) -> u64 {
        let b = self.freq_bits as u32;
        let t = self.time_bits as u32;
        ((freq1 as u64 & self.freq_mask()) << (b + t))
            | ((freq2 as u64 & self.freq_mask()) << t)
            | (time_delta as u64 & self.time_mask())
    }

    /// Split a hash back into `(freq1, freq2, time_delta)`
    pub fn unpack(&self, hash: u64) -> (u32, u32, u32) {
        let b = self.freq_bits as u32;
        let t = self.time_bits as u32;
        let freq1 = (hash >> (b + t)) & self.freq_mask();
        let freq2 = (hash >> t) & self.freq_mask();
        let time_delta = hash & self.time_mask();
        (freq1 as u32, freq2 as u32, time_delta as u32)
    }
}

impl Default for HashLayout {
    fn default() -> Self {
        Self::FULL_SPECTRUM
    }
}

impl From<HashLayout> for beatlens_fp::HashLayoutRecord {
    fn from(layout: HashLayout) -> Self {
        Self {
            freq_bits: layout.freq_bits,
            time_bits: layout.time_bits,
        }
    }
}

impl From<beatlens_fp::HashLayoutRecord> for HashLayout {
    fn from(record: beatlens_fp::HashLayoutRecord) -> Self {
        Self {
            freq_bits: record.freq_bits,
            time_bits: record.time_bits,
        }
    }
}

fn mask(bits: u8) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// A hashed peak pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub hash: u64,
    /// Frame of the anchor peak
    pub anchor_time: u32,
    pub freq1: u32,
    pub freq2: u32,
    /// Frame gap between anchor and target
    pub time_delta: u32,
}

/// Fingerprint generator
#[derive(Debug, Clone)]
pub struct FingerprintHasher {
    target_zone_size: u32,
    fan_out: usize,
    max_time_delta: u32,
    layout: HashLayout,
}

impl FingerprintHasher {
    pub fn new(config: &FingerprintConfig) -> Self {
        Self {
            target_zone_size: config.target_zone_size,
            fan_out: config.fan_out,
            max_time_delta: config.max_time_delta,
            layout: config.layout(),
        }
    }

    pub fn from_config(config: &BeatLensConfig) -> Self {
        Self::new(&config.fingerprint)
    }

    pub fn layout(&self) -> HashLayout {
        self.layout
    }

    /// Pair peaks into fingerprints, anchors in frame order
    pub fn generate(&self, peaks: &[Peak]) -> Vec<Fingerprint> {
        if peaks.is_empty() {
            return Vec::new();
        }

        let mut sorted = peaks.to_vec();
        sorted.sort_by_key(|p| p.frame_index);

        let mut fingerprints = Vec::new();
        for (i, anchor) in sorted.iter().enumerate() {
            let mut emitted = 0;
            for target in &sorted[i + 1..] {
                if emitted >= self.fan_out {
                    break;
                }
                let dt = (target.frame_index - anchor.frame_index) as u32;
                if dt < self.target_zone_size {
                    continue;
                }
                if dt > self.max_time_delta {
                    break;
                }

                let freq1 = anchor.frequency_bin as u32;
                let freq2 = target.frequency_bin as u32;
                fingerprints.push(Fingerprint {
                    hash: self.layout.pack(freq1, freq2, dt),
                    anchor_time: anchor.frame_index as u32,
                    freq1,
                    freq2,
                    time_delta: dt,
                });

                emitted += 1;
            }
        }

        log::debug!(
            "Generated {} fingerprints from {} peaks",
            fingerprints.len(),
            peaks.len()
        );

        fingerprints
    }
}
