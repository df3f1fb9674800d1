use std::time::Instant;

use chipforge_core::{
    NoiseSource, Track, TrackFile,
    fixtures::{demo_explosion, demo_instruments, demo_track},
    render_sfx, render_track,
};

fn budget_ms_from_env(key: &str, fallback: u128) -> u128 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u128>().ok())
        .unwrap_or(fallback)
}

fn long_track() -> Track {
    let mut file: TrackFile = demo_track();
    let sequence = file.sequence.clone();
    for _ in 0..7 {
        file.sequence.extend(sequence.iter().cloned());
    }
    Track::try_from(file).expect("demo track should validate")
}

#[test]
fn sfx_and_track_rendering_stay_within_budget() {
    let max_sfx_ms = budget_ms_from_env("CHIPFORGE_PERF_MAX_SFX_MS", 1_500);
    let max_track_ms = budget_ms_from_env("CHIPFORGE_PERF_MAX_TRACK_MS", 4_500);

    let sfx_start = Instant::now();
    for seed in 0..20 {
        let output = render_sfx(&demo_explosion(), 44_100, &mut NoiseSource::seeded(seed));
        assert!(!output.samples.is_empty(), "sfx buffer should not be empty");
    }
    let sfx_elapsed_ms = sfx_start.elapsed().as_millis();
    assert!(
        sfx_elapsed_ms <= max_sfx_ms,
        "sfx render regression: {}ms exceeded budget {}ms",
        sfx_elapsed_ms,
        max_sfx_ms
    );

    let track = long_track();
    let instruments = demo_instruments();
    let track_start = Instant::now();
    let output = render_track(&track, &instruments, 44_100, &mut NoiseSource::seeded(1));
    let track_elapsed_ms = track_start.elapsed().as_millis();
    assert!(!output.samples.is_empty(), "track buffer should not be empty");
    assert!(
        track_elapsed_ms <= max_track_ms,
        "track render regression: {}ms exceeded budget {}ms",
        track_elapsed_ms,
        max_track_ms
    );
}
