//! Tests for the offset-histogram matcher

use super::*;
use approx::assert_relative_eq;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

fn query_fp(hash: u64, anchor_time: u32) -> Fingerprint {
    Fingerprint {
        hash,
        anchor_time,
        freq1: 0,
        freq2: 0,
        time_delta: 0,
    }
}

fn entry(song_id: u64, time_offset: u32) -> IndexEntry {
    IndexEntry {
        song_id,
        time_offset,
    }
}

fn table_lookup(table: HashMap<u64, Vec<IndexEntry>>) -> impl Fn(u64) -> Vec<IndexEntry> + Send + Sync {
    move |hash| table.get(&hash).cloned().unwrap_or_default()
}

fn default_matcher() -> Matcher {
    Matcher::from_config(&BeatLensConfig::default())
}

/// 50 query fingerprints that all sit 100 frames later in song 7
fn shifted_scenario() -> (Vec<Fingerprint>, HashMap<u64, Vec<IndexEntry>>) {
    let query: Vec<Fingerprint> = (0..50).map(|i| query_fp(1000 + i, i as u32 * 4)).collect();
    let table = query
        .iter()
        .map(|fp| (fp.hash, vec![entry(7, fp.anchor_time + 100)]))
        .collect();
    (query, table)
}

#[test]
fn test_constant_offset_match() {
    let (query, table) = shifted_scenario();
    let results = default_matcher().match_fingerprints(&query, &table_lookup(table));

    assert_eq!(results.len(), 1);
    let top = &results[0];
    assert_eq!(top.song_id, 7);
    assert_eq!(top.aligned_matches, 50);
    assert_eq!(top.total_matches, 50);
    assert!(top.confidence > 5.0);
    // 100 floors to bucket 99 with a tolerance of 3
    assert_relative_eq!(top.time_offset_seconds, 99.0 * 2048.0 / 44100.0, epsilon = 1e-9);
    // One bucket, full coherence and match rate
    assert_relative_eq!(top.confidence, 50.0, epsilon = 1e-9);
}

#[test]
fn test_no_hits() {
    let (query, _) = shifted_scenario();
    let no_hits = |_: u64| -> Vec<IndexEntry> { Vec::new() };
    let results = default_matcher().match_fingerprints(&query, &no_hits);
    assert!(results.is_empty());
}

#[test]
fn test_empty_query_skips_lookups() {
    let calls = AtomicUsize::new(0);
    let lookup = |_: u64| {
        calls.fetch_add(1, AtomicOrdering::SeqCst);
        vec![entry(1, 0)]
    };

    let results = default_matcher().match_fingerprints(&[], &lookup);
    assert!(results.is_empty());
    assert_eq!(calls.load(AtomicOrdering::SeqCst), 0);
}

#[test]
fn test_one_lookup_per_query_fingerprint() {
    let calls = AtomicUsize::new(0);
    let lookup = |_: u64| -> Vec<IndexEntry> {
        calls.fetch_add(1, AtomicOrdering::SeqCst);
        Vec::new()
    };

    let query: Vec<Fingerprint> = (0..12).map(|i| query_fp(i, i as u32)).collect();
    default_matcher().match_fingerprints(&query, &lookup);
    assert_eq!(calls.load(AtomicOrdering::SeqCst), 12);
}

#[test]
fn test_below_min_aligned_dropped() {
    let query = vec![query_fp(1, 0), query_fp(2, 10)];
    let table = HashMap::from([(1, vec![entry(3, 50)]), (2, vec![entry(3, 60)])]);
    let results = default_matcher().match_fingerprints(&query, &table_lookup(table));
    assert!(results.is_empty());
}

#[test]
fn test_below_min_confidence_dropped() {
    let config = MatchingConfig {
        min_confidence: 60.0,
        ..MatchingConfig::default()
    };
    let matcher = Matcher::new(&config, 2048.0 / 44100.0);
    let (query, table) = shifted_scenario();
    assert!(matcher.match_fingerprints(&query, &table_lookup(table)).is_empty());
}

#[test]
fn test_negative_offset_floors() {
    // Query starts 10 frames before the song does: -10 floors to -12
    let query: Vec<Fingerprint> = (0..8).map(|i| query_fp(i, 10 + i as u32 * 20)).collect();
    let table = query
        .iter()
        .map(|fp| (fp.hash, vec![entry(2, fp.anchor_time - 10)]))
        .collect();

    let results = default_matcher().match_fingerprints(&query, &table_lookup(table));
    assert_eq!(results.len(), 1);
    assert_relative_eq!(
        results[0].time_offset_seconds,
        -12.0 * 2048.0 / 44100.0,
        epsilon = 1e-9
    );
}

#[test]
fn test_histogram_tie_prefers_smallest_offset() {
    let mut histogram = OffsetHistogram::new();
    for bucket in [30, 0, 30, 0, 30, 0] {
        histogram.add(bucket);
    }
    assert_eq!(histogram.best(), Some((0, 3)));
    assert_eq!(histogram.total(), 6);
    assert!(OffsetHistogram::new().best().is_none());
}

#[test]
fn test_aligned_counts_neighboring_buckets() {
    let mut query = Vec::new();
    let mut table: HashMap<u64, Vec<IndexEntry>> = HashMap::new();
    // (offset, hits): buckets 99, 102, 105 lie within 2 x 3 of 99; 108 does not
    let layout = [(99u32, 5u64), (102, 3), (105, 2), (108, 4)];
    let mut hash = 0;
    for (offset, hits) in layout {
        for _ in 0..hits {
            query.push(query_fp(hash, 0));
            table.insert(hash, vec![entry(4, offset)]);
            hash += 1;
        }
    }

    let results = default_matcher().match_fingerprints(&query, &table_lookup(table));
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].aligned_matches, 10);
    assert_eq!(results[0].total_matches, 14);
    assert!(results[0].aligned_matches <= results[0].total_matches);
}

#[test]
fn test_results_sorted_by_confidence() {
    let query: Vec<Fingerprint> = (0..40).map(|i| query_fp(i, i as u32)).collect();
    let table: HashMap<u64, Vec<IndexEntry>> = query
        .iter()
        .map(|fp| {
            let mut hits = vec![entry(9, fp.anchor_time + 30)];
            if fp.hash % 2 == 0 {
                hits.push(entry(3, fp.anchor_time + 60));
            }
            (fp.hash, hits)
        })
        .collect();

    let results = default_matcher().match_fingerprints(&query, &table_lookup(table));
    let ids: Vec<u64> = results.iter().map(|r| r.song_id).collect();
    assert_eq!(ids, vec![9, 3]);
    assert!(results[0].confidence >= results[1].confidence);
}

#[test]
fn test_equal_confidence_keeps_song_id_order() {
    let query: Vec<Fingerprint> = (0..10).map(|i| query_fp(i, i as u32)).collect();
    let table: HashMap<u64, Vec<IndexEntry>> = query
        .iter()
        .map(|fp| (fp.hash, vec![entry(20, fp.anchor_time), entry(5, fp.anchor_time)]))
        .collect();

    let results = default_matcher().match_fingerprints(&query, &table_lookup(table));
    let ids: Vec<u64> = results.iter().map(|r| r.song_id).collect();
    assert_eq!(ids, vec![5, 20]);
}

#[test]
fn test_parallel_matches_sequential() {
    let query: Vec<Fingerprint> = (0..500).map(|i| query_fp(i, (i * 7 % 400) as u32)).collect();
    let table: HashMap<u64, Vec<IndexEntry>> = query
        .iter()
        .map(|fp| {
            let mut hits = vec![entry(1, fp.anchor_time + 250)];
            // Noise scattered over other songs and offsets
            hits.push(entry(fp.hash % 5 + 2, (fp.hash * 37 % 900) as u32));
            if fp.hash % 3 == 0 {
                hits.push(entry(2, fp.anchor_time + 12));
            }
            (fp.hash, hits)
        })
        .collect();
    let lookup = table_lookup(table);

    let sequential = default_matcher().match_fingerprints(&query, &lookup);
    let parallel_config = MatchingConfig {
        parallel_lookups: true,
        ..MatchingConfig::default()
    };
    let parallel =
        Matcher::new(&parallel_config, 2048.0 / 44100.0).match_fingerprints(&query, &lookup);

    assert!(!sequential.is_empty());
    assert_eq!(sequential, parallel);
}

#[test]
fn test_histogram_merge_sums_counts() {
    let mut left = OffsetHistogram::new();
    left.add(0);
    left.add(3);
    let mut right = OffsetHistogram::new();
    right.add(3);
    right.add(9);

    left.merge(right);
    assert_eq!(left.total(), 4);
    assert_eq!(left.num_buckets(), 3);
    assert_eq!(left.best(), Some((3, 2)));
}

#[test]
fn test_confidence_bounds() {
    assert_eq!(calculate_confidence(0, 0, 0, 0), 0.0);
    assert_eq!(calculate_confidence(300, 300, 300, 1), 100.0);
    for aligned in [1u32, 3, 10, 57, 400] {
        for total in [aligned, aligned * 2, aligned * 10] {
            for query_count in [1usize, 50, 1000] {
                for buckets in [1usize, 4, 100] {
                    let c = calculate_confidence(aligned, total, query_count, buckets);
                    assert!((0.0..=100.0).contains(&c));
                }
            }
        }
    }
}

#[test]
fn test_confidence_formula() {
    // 20 aligned of 40 total, 100 queries, 4 buckets:
    // 20 * (0.5 + 0.15 + 0.04) * 1.5 / 2 = 10.35
    assert_relative_eq!(calculate_confidence(20, 40, 100, 4), 10.35, epsilon = 1e-9);
}
