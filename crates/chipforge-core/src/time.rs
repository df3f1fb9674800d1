pub const DEFAULT_TICKS_PER_BEAT: u32 = 4;

/// Whole samples covering `seconds`, rounded to nearest.
#[must_use]
pub fn seconds_to_samples(seconds: f64, sample_rate: u32) -> usize {
    if seconds <= 0.0 || !seconds.is_finite() {
        return 0;
    }

    (seconds * f64::from(sample_rate)).round() as usize
}

#[must_use]
pub fn samples_to_seconds(samples: usize, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }

    samples as f64 / f64::from(sample_rate)
}

/// Ticks-per-beat with the tracker default applied to zero.
#[must_use]
pub fn effective_ticks_per_beat(ticks_per_beat: u32) -> u32 {
    if ticks_per_beat == 0 {
        DEFAULT_TICKS_PER_BEAT
    } else {
        ticks_per_beat
    }
}

/// Length of one sequencer tick in samples: `round(60 * rate / (tempo * ticks_per_beat))`.
#[must_use]
pub fn samples_per_tick(tempo: f64, ticks_per_beat: u32, sample_rate: u32) -> usize {
    if tempo <= 0.0 || !tempo.is_finite() {
        return 0;
    }

    let ticks_per_beat = f64::from(effective_ticks_per_beat(ticks_per_beat));
    (f64::from(sample_rate) * 60.0 / (tempo * ticks_per_beat)).round() as usize
}

#[must_use]
pub fn ticks_to_samples(ticks: usize, tempo: f64, ticks_per_beat: u32, sample_rate: u32) -> usize {
    ticks.saturating_mul(samples_per_tick(tempo, ticks_per_beat, sample_rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_shot_length_rounds_to_nearest_sample() {
        assert_eq!(seconds_to_samples(0.1, 44_100), 4_410);
        assert_eq!(seconds_to_samples(0.2, 44_100), 8_820);
        assert_eq!(seconds_to_samples(1.0 / 3.0, 48_000), 16_000);
        assert_eq!(seconds_to_samples(-1.0, 48_000), 0);
    }

    #[test]
    fn tick_length_follows_tempo() {
        assert_eq!(samples_per_tick(120.0, 4, 44_100), 5_513);
        assert_eq!(samples_per_tick(150.0, 6, 48_000), 3_200);
        assert_eq!(samples_per_tick(0.0, 4, 44_100), 0);
    }

    #[test]
    fn zero_ticks_per_beat_uses_default() {
        assert_eq!(
            samples_per_tick(120.0, 0, 44_100),
            samples_per_tick(120.0, DEFAULT_TICKS_PER_BEAT, 44_100)
        );
    }

    #[test]
    fn sample_second_round_trip_is_stable() {
        let samples = 19_200;
        let seconds = samples_to_seconds(samples, 48_000);
        assert_eq!(seconds_to_samples(seconds, 48_000), samples);
    }

    #[test]
    fn ticks_scale_linearly() {
        assert_eq!(ticks_to_samples(16, 120.0, 4, 44_100), 16 * 5_513);
    }
}
