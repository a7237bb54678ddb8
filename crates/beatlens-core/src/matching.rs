//! Time-alignment matching
//!
//! Every query fingerprint is looked up in the catalog. A hit contributes
//! `entry.time_offset - query.anchor_time` to a per-song offset histogram;
//! a true match piles its hits into one narrow region of that histogram,
//! while chance collisions spread out.

use crate::config::{BeatLensConfig, MatchingConfig};
use crate::fingerprint::Fingerprint;
use crate::index::IndexEntry;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[cfg(test)]
mod tests;

/// Read side of a fingerprint catalog
///
/// An absent hash is an empty list, never an error. Closures of type
/// `Fn(u64) -> Vec<IndexEntry>` implement this directly.
pub trait FingerprintLookup: Send + Sync {
    fn lookup(&self, hash: u64) -> Vec<IndexEntry>;
}

impl<F> FingerprintLookup for F
where
    F: Fn(u64) -> Vec<IndexEntry> + Send + Sync,
{
    fn lookup(&self, hash: u64) -> Vec<IndexEntry> {
        self(hash)
    }
}

/// A scored candidate song
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub song_id: u64,
    /// Hits within two buckets of the best offset
    pub aligned_matches: u32,
    /// All hits for this song
    pub total_matches: u32,
    /// Where the query starts inside the song
    pub time_offset_seconds: f64,
    /// 0 to 100
    pub confidence: f64,
}

/// Bucketed offset counts, iterated in ascending offset order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetHistogram {
    buckets: BTreeMap<i64, u32>,
    total: u32,
}

impl OffsetHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, bucket: i64) {
        *self.buckets.entry(bucket).or_insert(0) += 1;
        self.total += 1;
    }

    /// Sum another histogram into this one
    pub fn merge(&mut self, other: OffsetHistogram) {
        for (bucket, count) in other.buckets {
            *self.buckets.entry(bucket).or_insert(0) += count;
        }
        self.total += other.total;
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    /// Highest-count bucket; ties go to the smallest offset
    pub fn best(&self) -> Option<(i64, u32)> {
        let mut best: Option<(i64, u32)> = None;
        for (&bucket, &count) in &self.buckets {
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((bucket, count));
            }
        }
        best
    }

    /// Sum of counts in buckets within `radius` of `center`
    pub fn count_near(&self, center: i64, radius: i64) -> u32 {
        self.buckets
            .range(center - radius..=center + radius)
            .map(|(_, &count)| count)
            .sum()
    }
}

type Candidates = BTreeMap<u64, OffsetHistogram>;

/// Offset-histogram matcher
#[derive(Debug, Clone)]
pub struct Matcher {
    offset_tolerance: i64,
    min_aligned_matches: u32,
    min_confidence: f64,
    parallel_lookups: bool,
    /// Seconds per frame
    time_resolution: f64,
}

impl Matcher {
    pub fn new(config: &MatchingConfig, time_resolution: f64) -> Self {
        Self {
            offset_tolerance: config.offset_tolerance.max(1) as i64,
            min_aligned_matches: config.min_aligned_matches,
            min_confidence: config.min_confidence,
            parallel_lookups: config.parallel_lookups,
            time_resolution,
        }
    }

    pub fn from_config(config: &BeatLensConfig) -> Self {
        Self::new(&config.matching, config.time_resolution())
    }

    /// Score the query against the catalog, best match first
    pub fn match_fingerprints<L>(&self, query: &[Fingerprint], lookup: &L) -> Vec<MatchResult>
    where
        L: FingerprintLookup + ?Sized,
    {
        if query.is_empty() {
            return Vec::new();
        }

        let candidates = if self.parallel_lookups {
            self.collect_parallel(query, lookup)
        } else {
            self.collect_sequential(query, lookup)
        };

        log::debug!(
            "{} query fingerprints hit {} candidate songs",
            query.len(),
            candidates.len()
        );

        let mut results: Vec<MatchResult> = candidates
            .iter()
            .filter_map(|(&song_id, histogram)| self.score(song_id, histogram, query.len()))
            .collect();

        // Stable: equal confidences stay in ascending song id
        results.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
        });
        results
    }

    fn bucket(&self, fingerprint: &Fingerprint, entry: &IndexEntry) -> i64 {
        let offset = entry.time_offset as i64 - fingerprint.anchor_time as i64;
        offset.div_euclid(self.offset_tolerance) * self.offset_tolerance
    }

    fn accumulate<L>(&self, candidates: &mut Candidates, fingerprint: &Fingerprint, lookup: &L)
    where
        L: FingerprintLookup + ?Sized,
    {
        for entry in lookup.lookup(fingerprint.hash) {
            candidates
                .entry(entry.song_id)
                .or_default()
                .add(self.bucket(fingerprint, &entry));
        }
    }

    fn collect_sequential<L>(&self, query: &[Fingerprint], lookup: &L) -> Candidates
    where
        L: FingerprintLookup + ?Sized,
    {
        let mut candidates = Candidates::new();
        for fingerprint in query {
            self.accumulate(&mut candidates, fingerprint, lookup);
        }
        candidates
    }

    fn collect_parallel<L>(&self, query: &[Fingerprint], lookup: &L) -> Candidates
    where
        L: FingerprintLookup + ?Sized,
    {
        query
            .par_iter()
            .fold(Candidates::new, |mut candidates, fingerprint| {
                self.accumulate(&mut candidates, fingerprint, lookup);
                candidates
            })
            .reduce(Candidates::new, merge_candidates)
    }

    fn score(&self, song_id: u64, histogram: &OffsetHistogram, query_count: usize) -> Option<MatchResult> {
        let (best, _) = histogram.best()?;
        let aligned = histogram.count_near(best, 2 * self.offset_tolerance);

        if aligned < self.min_aligned_matches {
            log::trace!(
                "Song {}: {} aligned (need {})",
                song_id,
                aligned,
                self.min_aligned_matches
            );
            return None;
        }

        let confidence = calculate_confidence(
            aligned,
            histogram.total(),
            query_count,
            histogram.num_buckets(),
        );
        if confidence < self.min_confidence {
            log::trace!("Song {}: confidence {:.2} too low", song_id, confidence);
            return None;
        }

        log::debug!(
            "Song {}: aligned {}/{}, best offset {}, confidence {:.2}",
            song_id,
            aligned,
            histogram.total(),
            best,
            confidence
        );

        Some(MatchResult {
            song_id,
            aligned_matches: aligned,
            total_matches: histogram.total(),
            time_offset_seconds: best as f64 * self.time_resolution,
            confidence,
        })
    }
}

fn merge_candidates(mut left: Candidates, right: Candidates) -> Candidates {
    for (song_id, histogram) in right {
        left.entry(song_id).or_default().merge(histogram);
    }
    left
}

/// Confidence in [0, 100] for a song's alignment
///
/// Rewards the aligned count, the share of the song's hits that align
/// (coherence), the share of the query that aligns (match rate), and a
/// histogram concentrated in few buckets.
pub fn calculate_confidence(
    aligned: u32,
    total: u32,
    query_count: usize,
    bucket_count: usize,
) -> f64 {
    let aligned_f = aligned as f64;
    let coherence = aligned_f / total.max(1) as f64;
    let match_rate = aligned_f / query_count.max(1) as f64;
    let sharpness = 1.0 / (bucket_count as f64).sqrt().max(1.0);

    let confidence =
        aligned_f * (0.5 + 0.3 * coherence + 0.2 * match_rate) * (1.0 + sharpness) / 2.0;
    confidence.clamp(0.0, 100.0)
}
