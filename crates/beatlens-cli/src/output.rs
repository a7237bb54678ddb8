//! JSON output formatting

use beatlens_core::{CatalogStats, IdentifiedMatch, MatchResponse, Song};
use serde::Serialize;

#[derive(Serialize)]
struct MatchOutput<'a> {
    query_path: &'a str,
    detections: usize,
    query_fingerprints: usize,
    query_duration_seconds: f64,
    results: &'a [IdentifiedMatch],
}

#[derive(Serialize)]
struct IndexOutput<'a> {
    indexed: usize,
    failed: usize,
    songs: &'a [Song],
}

#[derive(Serialize)]
struct CatalogOutput<'a> {
    songs: &'a [Song],
    stats: &'a CatalogStats,
}

/// Print any serializable value as pretty JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing output: {}", e),
    }
}

/// Print a match response, best match first
pub fn print_match_response(query_path: &str, response: &MatchResponse) {
    if let Some(best) = response.best() {
        log::info!(
            "Best match: {} (song {}, confidence {:.1})",
            best.title,
            best.result.song_id,
            best.result.confidence
        );
    } else {
        log::info!("No match for {}", query_path);
    }

    print_json(&MatchOutput {
        query_path,
        detections: response.matches.len(),
        query_fingerprints: response.query_fingerprints,
        query_duration_seconds: response.query_duration_seconds,
        results: &response.matches,
    });
}

/// Print the songs added by one indexing run
pub fn print_indexed(songs: &[Song], failed: usize) {
    print_json(&IndexOutput {
        indexed: songs.len(),
        failed,
        songs,
    });
}

/// Print a catalog listing with its summary
pub fn print_catalog(songs: &[Song], stats: &CatalogStats) {
    print_json(&CatalogOutput { songs, stats });
}
