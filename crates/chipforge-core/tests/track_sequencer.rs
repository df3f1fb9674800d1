use std::collections::BTreeMap;

use chipforge_core::{
    ChannelDef, DefinitionError, Envelope, InstrumentBank, InstrumentDef, NoiseSource, Note,
    Pattern, Track, Voice, Waveform,
    model::{EffectKind, NoteEffect, OscillatorDef},
    render_track,
    sequencer::{ChannelPhase, ChannelState},
    time::samples_per_tick,
    track_length,
};

fn instrument(waveform: &str) -> InstrumentDef {
    InstrumentDef {
        oscillator: OscillatorDef::new(waveform),
        envelope: Envelope::default(),
        ..InstrumentDef::default()
    }
}

fn bank(name: &str, waveform: &str) -> InstrumentBank {
    let mut bank = InstrumentBank::new();
    bank.insert(name.to_string(), instrument(waveform));
    bank
}

fn single_channel_track(rows: Vec<Note>, volume: f64) -> Track {
    let mut patterns = BTreeMap::new();
    patterns.insert(
        "main".to_string(),
        Pattern::new(rows.into_iter().map(|note| vec![note]).collect()),
    );
    Track::new(
        120.0,
        4,
        vec![ChannelDef::new("lead", "lead", volume)],
        patterns,
        vec!["main".to_string()],
    )
    .expect("track should validate")
}

fn rms(samples: &[f64]) -> f64 {
    (samples.iter().map(|sample| sample * sample).sum::<f64>() / samples.len() as f64).sqrt()
}

fn peak(samples: &[f64]) -> f64 {
    samples.iter().fold(0.0_f64, |peak, sample| peak.max(sample.abs()))
}

#[test]
fn buffer_length_is_ticks_times_tick_length() {
    let track = single_channel_track(
        vec![Note::on("C", 4), Note::Sustain, Note::Off, Note::Silence],
        1.0,
    );
    let output = render_track(&track, &bank("lead", "square"), 44_100, &mut NoiseSource::seeded(1));

    let expected = 4 * samples_per_tick(120.0, 4, 44_100);
    assert_eq!(expected, 4 * 5_513);
    assert_eq!(output.samples.len(), expected);
    assert_eq!(track_length(&track, 44_100), expected);
}

#[test]
fn note_off_silences_the_channel() {
    let track = single_channel_track(
        vec![Note::on("C", 4), Note::Sustain, Note::Off, Note::Sustain],
        1.0,
    );
    let output = render_track(&track, &bank("lead", "square"), 44_100, &mut NoiseSource::seeded(1));
    let tick = samples_per_tick(120.0, 4, 44_100);

    assert!(peak(&output.samples[..tick]) > 0.5, "note-on tick should sound");
    assert!(peak(&output.samples[tick..2 * tick]) > 0.5, "sustain tick should sound");
    assert!(
        peak(&output.samples[2 * tick..]) < 0.05,
        "nothing should sound after note-off"
    );
}

#[test]
fn missing_instrument_skips_the_note() {
    let track = single_channel_track(vec![Note::on("A", 4), Note::Sustain], 1.0);
    let output = render_track(
        &track,
        &InstrumentBank::new(),
        44_100,
        &mut NoiseSource::seeded(1),
    );

    assert_eq!(output.samples.len(), 2 * samples_per_tick(120.0, 4, 44_100));
    assert!(output.samples.iter().all(|sample| *sample == 0.0));
}

#[test]
fn velocity_effect_scales_channel_volume() {
    let loud = single_channel_track(vec![Note::on("A", 4)], 0.3);
    let soft = single_channel_track(
        vec![Note::On {
            name: "A".to_string(),
            octave: 4,
            effects: vec![NoteEffect {
                kind: EffectKind::Velocity,
                magnitude: 5,
            }],
        }],
        0.3,
    );
    let instruments = bank("lead", "sine");

    let loud = render_track(&loud, &instruments, 44_100, &mut NoiseSource::seeded(1));
    let soft = render_track(&soft, &instruments, 44_100, &mut NoiseSource::seeded(1));
    let ratio = rms(&soft.samples) / rms(&loud.samples);
    assert!((ratio - 5.0 / 15.0).abs() < 1e-6, "ratio was {ratio}");
}

#[test]
fn track_instruments_shadow_shared_ones() {
    let track = single_channel_track(vec![Note::on("A", 4)], 0.3)
        .with_instruments(bank("lead", "sine"));
    let shared = bank("lead", "square");

    let local = render_track(&track, &shared, 44_100, &mut NoiseSource::seeded(1));
    let plain = single_channel_track(vec![Note::on("A", 4)], 0.3);
    let sine_only = render_track(&plain, &bank("lead", "sine"), 44_100, &mut NoiseSource::seeded(1));

    assert_eq!(local.samples, sine_only.samples);
}

#[test]
fn sequence_repeats_patterns_in_order() {
    let mut patterns = BTreeMap::new();
    patterns.insert("a".to_string(), Pattern::new(vec![vec![Note::Silence]; 3]));
    patterns.insert("b".to_string(), Pattern::new(vec![vec![Note::Silence]; 5]));
    let track = Track::new(
        150.0,
        6,
        vec![ChannelDef::new("lead", "lead", 1.0)],
        patterns,
        vec!["a".to_string(), "b".to_string(), "a".to_string()],
    )
    .expect("track should validate");

    assert_eq!(track.total_ticks(), 11);
    assert_eq!(track_length(&track, 48_000), 11 * 3_200);
}

#[test]
fn unknown_pattern_is_a_construction_error() {
    let mut patterns = BTreeMap::new();
    patterns.insert("a".to_string(), Pattern::new(vec![vec![Note::Silence]]));
    let error = Track::new(
        120.0,
        4,
        vec![ChannelDef::new("lead", "lead", 1.0)],
        patterns,
        vec!["a".to_string(), "missing".to_string()],
    )
    .expect_err("unknown pattern should fail");

    assert!(matches!(error, DefinitionError::UnknownPattern(name) if name == "missing"));
}

#[test]
fn column_mismatch_is_a_construction_error() {
    let mut patterns = BTreeMap::new();
    patterns.insert(
        "a".to_string(),
        Pattern::new(vec![vec![Note::Silence, Note::Silence], vec![Note::Silence]]),
    );
    let error = Track::new(
        120.0,
        4,
        vec![
            ChannelDef::new("lead", "lead", 1.0),
            ChannelDef::new("bass", "bass", 1.0),
        ],
        patterns,
        vec!["a".to_string()],
    )
    .expect_err("short row should fail");

    assert!(matches!(
        error,
        DefinitionError::ColumnMismatch {
            row: 1,
            expected: 2,
            found: 1,
            ..
        }
    ));
}

#[test]
fn non_positive_tempo_is_rejected() {
    let error = Track::new(0.0, 4, Vec::new(), BTreeMap::new(), Vec::new())
        .expect_err("zero tempo should fail");
    assert!(matches!(error, DefinitionError::InvalidTempo(_)));
}

#[test]
fn channel_state_walks_idle_active_releasing_idle() {
    let mut state = ChannelState::default();
    assert_eq!(state.phase(), ChannelPhase::Idle);

    let voice = Voice::new(Waveform::Square, Envelope::default(), 440.0);
    state.note_on(voice, 3, 0.5);
    assert_eq!(state.phase(), ChannelPhase::Active);
    assert_eq!(state.note_on_tick(), 3);
    assert!(state.is_sounding());

    state.end_row();
    assert_eq!(state.phase(), ChannelPhase::Active, "active notes survive rows");

    state.note_off();
    assert_eq!(state.phase(), ChannelPhase::Releasing);
    assert!(!state.is_sounding());

    let mut window = vec![0.0; 64];
    state.render_tick(&mut window, 4, 44_100, &mut NoiseSource::seeded(1));
    assert!(window.iter().all(|sample| *sample == 0.0));

    state.end_row();
    assert_eq!(state.phase(), ChannelPhase::Idle);
}

#[test]
fn note_off_on_an_idle_channel_is_a_no_op() {
    let mut state = ChannelState::default();
    state.note_off();
    assert_eq!(state.phase(), ChannelPhase::Idle);
}

#[test]
fn sustain_continues_from_the_note_on_time() {
    let track = single_channel_track(vec![Note::on("A", 4), Note::Sustain], 0.3);
    let instruments = bank("lead", "sine");
    let output = render_track(&track, &instruments, 44_100, &mut NoiseSource::seeded(1));

    let continuous = single_channel_track(vec![Note::on("A", 4)], 0.3);
    let first = render_track(&continuous, &instruments, 44_100, &mut NoiseSource::seeded(1));
    let tick = samples_per_tick(120.0, 4, 44_100);

    assert_eq!(&output.samples[..tick], &first.samples[..]);
    assert!(peak(&output.samples[tick..]) > 0.2, "sustained tick should keep sounding");
}

#[test]
fn silence_leaves_an_active_voice_for_the_next_sustain() {
    let track = single_channel_track(vec![Note::on("C", 4), Note::Silence, Note::Sustain], 0.3);
    let output = render_track(&track, &bank("lead", "sine"), 44_100, &mut NoiseSource::seeded(1));
    let tick = samples_per_tick(120.0, 4, 44_100);

    assert!(peak(&output.samples[..tick]) > 0.2, "note-on tick should sound");
    assert!(
        peak(&output.samples[tick..2 * tick]) < 0.05,
        "silence tick should contribute nothing"
    );
    assert!(
        peak(&output.samples[2 * tick..]) > 0.2,
        "sustain after silence should keep the voice"
    );
}

#[test]
fn skipped_note_on_keeps_the_sounding_voice() {
    let mut state = ChannelState::default();
    let lead = instrument("sine");
    assert!(state.trigger(Some(&lead), 440.0, 0, 0.3, 44_100));

    assert!(!state.trigger(None, 493.88, 1, 1.0, 44_100));
    assert_eq!(state.phase(), ChannelPhase::Active);
    assert_eq!(state.note_on_tick(), 0, "timing still runs from the first note");
    assert!((state.gain() - 0.3).abs() < f64::EPSILON);

    let mut window = vec![0.0; 512];
    state.render_tick(&mut window, 2, 44_100, &mut NoiseSource::seeded(1));
    assert!(peak(&window) > 0.2, "the first voice should still sound");
}

#[test]
fn skipped_note_on_in_a_track_plays_through_like_sustain() {
    let mut patterns = BTreeMap::new();
    patterns.insert(
        "main".to_string(),
        Pattern::new(vec![
            vec![Note::on("A", 4), Note::Silence],
            vec![Note::Sustain, Note::on("B", 4)],
            vec![Note::Sustain, Note::Sustain],
        ]),
    );
    let track = Track::new(
        120.0,
        4,
        vec![
            ChannelDef::new("lead", "lead", 0.3),
            ChannelDef::new("ghost", "missing", 0.3),
        ],
        patterns,
        vec!["main".to_string()],
    )
    .expect("track should validate");

    let with_ghost = render_track(&track, &bank("lead", "sine"), 44_100, &mut NoiseSource::seeded(1));
    let lead_only = single_channel_track(vec![Note::on("A", 4), Note::Sustain, Note::Sustain], 0.3);
    let expected = render_track(&lead_only, &bank("lead", "sine"), 44_100, &mut NoiseSource::seeded(1));

    assert_eq!(with_ghost.samples, expected.samples);
}

#[test]
fn extreme_octaves_render_without_panicking() {
    for octave in [i32::MAX, i32::MIN] {
        let track = single_channel_track(vec![Note::on("B", octave), Note::Sustain], 0.5);
        let output = render_track(&track, &bank("lead", "square"), 44_100, &mut NoiseSource::seeded(1));

        assert_eq!(output.samples.len(), 2 * samples_per_tick(120.0, 4, 44_100));
        assert!(output.samples.iter().all(|sample| sample.is_finite()));
    }
}
