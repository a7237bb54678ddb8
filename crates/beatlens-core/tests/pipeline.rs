//! End-to-end indexing and identification over WAV input

use beatlens_core::{generate_fingerprints, BeatLens, BeatLensConfig, BeatLensError};
use std::f32::consts::PI;
use std::io::Cursor;

const SAMPLE_RATE: u32 = 44100;
const HOP: usize = 2048;

/// Tones stepping through a two-octave scale, order depending on `seed`
fn song(seconds: f32, seed: u32) -> Vec<i16> {
    let note_len = SAMPLE_RATE as usize / 5;
    let total = (SAMPLE_RATE as f32 * seconds) as usize;
    (0..total)
        .map(|i| {
            let note = (i / note_len) as u32;
            let step = (note * (5 + 2 * seed) + seed * 11) % 24;
            let freq = 196.0 * 2f32.powf(step as f32 / 12.0);
            let t = i as f32 / SAMPLE_RATE as f32;
            let value = 0.45 * (2.0 * PI * freq * t).sin()
                + 0.2 * (2.0 * PI * 3.0 * freq * t).sin()
                + 0.1 * (2.0 * PI * 5.0 * freq * t).sin();
            (value * 32767.0).round() as i16
        })
        .collect()
}

fn wav(samples: &[i16], channels: u16) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &s in samples {
            for _ in 0..channels {
                writer.write_sample(s).unwrap();
            }
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

fn library(config: BeatLensConfig) -> (BeatLens, Vec<Vec<i16>>) {
    let mut service = BeatLens::new(config).unwrap();
    let songs: Vec<Vec<i16>> = (0..3).map(|seed| song(12.0, seed)).collect();
    for (i, samples) in songs.iter().enumerate() {
        service
            .index_wav(&format!("Song {}", i + 1), Some("Synth"), &wav(samples, 1))
            .unwrap();
    }
    (service, songs)
}

#[test]
fn test_excerpt_identifies_its_song() {
    let (service, songs) = library(BeatLensConfig::default());
    assert_eq!(service.list_songs().len(), 3);

    let start_frame = 100;
    let start = start_frame * HOP;
    let excerpt = &songs[1][start..start + 5 * SAMPLE_RATE as usize];
    let response = service.match_wav(&wav(excerpt, 1)).unwrap();

    let best = response.best().expect("excerpt should be identified");
    assert_eq!(best.result.song_id, 2);
    assert_eq!(best.title, "Song 2");
    assert_eq!(best.artist.as_deref(), Some("Synth"));
    let expected_offset = (start_frame * HOP) as f64 / SAMPLE_RATE as f64;
    assert!((best.result.time_offset_seconds - expected_offset).abs() < 0.2);
    assert!(best.result.confidence > 5.0 && best.result.confidence <= 100.0);
    assert!((response.query_duration_seconds - 5.0).abs() < 1e-6);

    for pair in response.matches.windows(2) {
        assert!(pair[0].result.confidence >= pair[1].result.confidence);
    }
}

#[test]
fn test_stereo_query_is_downmixed() {
    let (service, songs) = library(BeatLensConfig::default());
    let start = 40 * HOP;
    let excerpt = &songs[0][start..start + 4 * SAMPLE_RATE as usize];

    // Identical channels downmix to the mono signal
    let response = service.match_wav(&wav(excerpt, 2)).unwrap();
    assert_eq!(response.best().map(|m| m.result.song_id), Some(1));
}

#[test]
fn test_legacy_preset_end_to_end() {
    let (service, songs) = library(BeatLensConfig::legacy());
    let start = 64 * HOP;
    let excerpt = &songs[2][start..start + 5 * SAMPLE_RATE as usize];

    let response = service.match_wav(&wav(excerpt, 1)).unwrap();
    assert_eq!(response.best().map(|m| m.result.song_id), Some(3));
}

#[test]
fn test_deleted_song_no_longer_matches() {
    let (mut service, songs) = library(BeatLensConfig::default());
    service.delete_song(2).unwrap();

    let start = 100 * HOP;
    let excerpt = &songs[1][start..start + 5 * SAMPLE_RATE as usize];
    let response = service.match_wav(&wav(excerpt, 1)).unwrap();
    assert!(response.matches.iter().all(|m| m.result.song_id != 2));
    assert_eq!(service.stats().total_songs, 2);
}

#[test]
fn test_generate_fingerprints_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    std::fs::write(&path, wav(&song(3.0, 0), 1)).unwrap();

    let config = BeatLensConfig::default();
    let fingerprints = generate_fingerprints(&path, &config).unwrap();
    assert!(!fingerprints.is_empty());
    for fp in &fingerprints {
        assert!(fp.time_delta >= config.fingerprint.target_zone_size);
        assert!(fp.time_delta <= config.fingerprint.max_time_delta);
    }

    let missing = generate_fingerprints(&dir.path().join("missing.wav"), &config);
    assert!(matches!(missing, Err(BeatLensError::Io(_))));
}

#[test]
fn test_generate_fingerprints_enforces_min_duration() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("short.wav");
    std::fs::write(&path, wav(&song(1.0, 0), 1)).unwrap();

    let mut config = BeatLensConfig::default();
    config.audio.min_duration_seconds = 2.0;
    assert!(matches!(
        generate_fingerprints(&path, &config),
        Err(BeatLensError::InvalidInput(_))
    ));

    config.audio.min_duration_seconds = 0.5;
    assert!(!generate_fingerprints(&path, &config).unwrap().is_empty());
}

#[test]
fn test_garbage_wav_is_format_error() {
    let (mut service, _) = library(BeatLensConfig::default());
    assert!(matches!(
        service.match_wav(b"RIFF but not really"),
        Err(BeatLensError::Format(_))
    ));
    assert!(matches!(
        service.index_wav("Broken", None, &[0u8; 16]),
        Err(BeatLensError::Format(_))
    ));
}
