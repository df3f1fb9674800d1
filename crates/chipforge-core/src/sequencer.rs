//! Tick-by-tick tracker playback into a single pre-sized buffer.

use tracing::{debug, instrument, trace};

use crate::{
    mastering::{RenderOutput, master},
    model::{InstrumentBank, InstrumentDef, Note, Track},
    oscillator::NoiseSource,
    pitch::note_frequency,
    time::samples_per_tick,
    voice::Voice,
};

/// Hold length given to sequenced notes so the envelope never releases on its own mid-row.
pub const NOMINAL_HOLD_SECONDS: f64 = 10.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChannelPhase {
    #[default]
    Idle,
    Active,
    Releasing,
}

/// Playback state of one channel: `Idle -> Active -> Releasing -> Idle`.
#[derive(Debug, Clone, Default)]
pub struct ChannelState {
    phase: ChannelPhase,
    voice: Option<Voice>,
    note_on_tick: usize,
    gain: f64,
}

impl ChannelState {
    #[must_use]
    pub fn phase(&self) -> ChannelPhase {
        self.phase
    }

    #[must_use]
    pub fn note_on_tick(&self) -> usize {
        self.note_on_tick
    }

    #[must_use]
    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// Replaces whatever was playing with `voice`, starting at `tick`.
    pub fn note_on(&mut self, voice: Voice, tick: usize, gain: f64) {
        self.phase = ChannelPhase::Active;
        self.voice = Some(voice);
        self.note_on_tick = tick;
        self.gain = gain;
    }

    /// Starts `instrument` at `frequency`. Without an instrument the note is skipped and
    /// the channel keeps whatever it was doing. Returns whether a voice was started.
    pub fn trigger(
        &mut self,
        instrument: Option<&InstrumentDef>,
        frequency: f64,
        tick: usize,
        gain: f64,
        sample_rate: u32,
    ) -> bool {
        let Some(instrument) = instrument else {
            return false;
        };
        let voice = Voice::from_instrument(instrument, frequency, sample_rate);
        self.note_on(voice, tick, gain);
        true
    }

    pub fn note_off(&mut self) {
        if self.phase == ChannelPhase::Active {
            self.phase = ChannelPhase::Releasing;
        }
    }

    /// Closes the row: a releasing channel drops its voice and goes idle.
    pub fn end_row(&mut self) {
        if self.phase == ChannelPhase::Releasing {
            self.phase = ChannelPhase::Idle;
            self.voice = None;
        }
    }

    #[must_use]
    pub fn is_sounding(&self) -> bool {
        self.phase == ChannelPhase::Active && self.voice.is_some()
    }

    /// Adds one tick of the current voice into `out`, timed from the note-on tick.
    pub fn render_tick(
        &mut self,
        out: &mut [f64],
        tick: usize,
        sample_rate: u32,
        noise: &mut NoiseSource,
    ) {
        if !self.is_sounding() {
            return;
        }
        let first_sample = tick.saturating_sub(self.note_on_tick) * out.len();
        if let Some(voice) = self.voice.as_mut() {
            voice.render_into(
                out,
                first_sample,
                NOMINAL_HOLD_SECONDS,
                NOMINAL_HOLD_SECONDS,
                self.gain,
                sample_rate,
                noise,
            );
        }
    }
}

/// Exact buffer length a track renders to.
#[must_use]
pub fn track_length(track: &Track, sample_rate: u32) -> usize {
    track.total_ticks() * samples_per_tick(track.tempo(), track.ticks_per_beat(), sample_rate)
}

/// Plays the song sequence into one buffer, then masters it. Instruments are looked up in
/// the track first and `shared` second; notes with no instrument are skipped.
#[instrument(skip(track, shared, noise), fields(tempo = track.tempo(), channels = track.channels().len()))]
pub fn render_track(
    track: &Track,
    shared: &InstrumentBank,
    sample_rate: u32,
    noise: &mut NoiseSource,
) -> RenderOutput {
    let tick_samples = samples_per_tick(track.tempo(), track.ticks_per_beat(), sample_rate);
    let mut buffer = vec![0.0; track_length(track, sample_rate)];
    let mut channels = vec![ChannelState::default(); track.channels().len()];
    let mut tick = 0_usize;

    for pattern in track.song() {
        for row in pattern.rows() {
            let offset = tick * tick_samples;
            let window = &mut buffer[offset..offset + tick_samples];

            for ((note, state), channel) in row.iter().zip(&mut channels).zip(track.channels()) {
                match note {
                    Note::On { name, octave, .. } => {
                        let started = state.trigger(
                            track.resolve_instrument(&channel.instrument, shared),
                            note_frequency(name, *octave),
                            tick,
                            note.gain(channel.volume),
                            sample_rate,
                        );
                        if !started {
                            trace!(channel = %channel.name, instrument = %channel.instrument, "note skipped, instrument missing");
                        }
                        state.render_tick(window, tick, sample_rate, noise);
                    }
                    Note::Sustain => state.render_tick(window, tick, sample_rate, noise),
                    Note::Off => state.note_off(),
                    Note::Silence => {}
                }
            }

            for state in &mut channels {
                state.end_row();
            }
            tick += 1;
        }
    }

    let output = master(buffer, sample_rate);
    debug!(
        ticks = tick,
        samples = output.samples.len(),
        warnings = output.warnings.len(),
        "track render completed"
    );
    output
}
