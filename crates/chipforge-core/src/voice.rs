use std::f64::consts::TAU;

use crate::{
    envelope::Envelope,
    filter::{BiquadFilter, DEFAULT_CUTOFF_HZ},
    interpolate::{Curve, interpolate},
    model::{FilterDef, InstrumentDef, SfxVoiceDef, VibratoDef},
    oscillator::{NoiseSource, Waveform},
    pitch::semitone_ratio,
    time::seconds_to_samples,
};

/// Sweep between two values. `duration: None` spans the whole render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sweep {
    pub start: f64,
    pub end: f64,
    pub curve: Curve,
    pub duration: Option<f64>,
}

impl Sweep {
    #[must_use]
    pub fn new(start: f64, end: f64, curve: Curve) -> Self {
        Self {
            start,
            end,
            curve,
            duration: None,
        }
    }

    #[must_use]
    pub fn over(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    fn value_at(&self, elapsed: f64, span: f64) -> f64 {
        let length = self.duration.unwrap_or(span);
        let progress = if length > 0.0 { elapsed / length } else { 1.0 };
        interpolate(self.start, self.end, progress, self.curve)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vibrato {
    pub depth_semitones: f64,
    pub rate_hz: f64,
}

impl From<VibratoDef> for Vibrato {
    fn from(value: VibratoDef) -> Self {
        Self {
            depth_semitones: value.depth,
            rate_hz: value.rate,
        }
    }
}

/// One sounding line of audio: oscillator, envelope and optional filter, vibrato and sweeps.
///
/// Voices carry oscillator phase and filter history, so a voice belongs to exactly one note.
#[derive(Debug, Clone)]
pub struct Voice {
    waveform: Waveform,
    envelope: Envelope,
    frequency: f64,
    pitch_sweep: Option<Sweep>,
    vibrato: Option<Vibrato>,
    filter: Option<BiquadFilter>,
    cutoff_sweep: Option<Sweep>,
    phase: f64,
}

impl Voice {
    #[must_use]
    pub fn new(waveform: Waveform, envelope: Envelope, frequency: f64) -> Self {
        Self {
            waveform,
            envelope,
            frequency,
            pitch_sweep: None,
            vibrato: None,
            filter: None,
            cutoff_sweep: None,
            phase: 0.0,
        }
    }

    #[must_use]
    pub fn with_pitch_sweep(mut self, sweep: Sweep) -> Self {
        self.pitch_sweep = Some(sweep);
        self
    }

    #[must_use]
    pub fn with_vibrato(mut self, vibrato: Vibrato) -> Self {
        self.vibrato = Some(vibrato);
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: BiquadFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    #[must_use]
    pub fn with_cutoff_sweep(mut self, sweep: Sweep) -> Self {
        self.cutoff_sweep = Some(sweep);
        self
    }

    /// Builds the voice an instrument plays at `frequency`.
    #[must_use]
    pub fn from_instrument(instrument: &InstrumentDef, frequency: f64, sample_rate: u32) -> Self {
        let mut voice = Self::new(
            instrument.oscillator.waveform(),
            instrument.envelope,
            frequency,
        );

        if let Some(filter) = &instrument.filter {
            voice = voice.with_filter_def(filter, sample_rate);
        }
        if let Some(vibrato) = instrument.effects.vibrato {
            voice = voice.with_vibrato(vibrato.into());
        }
        if let Some(sweep) = instrument.effects.pitch_sweep {
            let target = frequency * semitone_ratio(sweep.semitones);
            voice = voice.with_pitch_sweep(
                Sweep::new(frequency, target, sweep.curve).over(sweep.duration),
            );
        }
        voice
    }

    /// Builds a one-shot voice. Pitch and cutoff sweeps span the whole effect.
    #[must_use]
    pub fn from_sfx_voice(definition: &SfxVoiceDef, sample_rate: u32) -> Self {
        let (start, end) = definition.pitch.resolved();
        let mut voice = Self::new(
            Waveform::from_name(&definition.waveform, definition.duty),
            definition.envelope,
            start,
        )
        .with_pitch_sweep(Sweep::new(start, end, definition.pitch.curve));

        if let Some(filter) = &definition.filter {
            voice = voice.with_filter_def(filter, sample_rate);
        }
        if let Some(vibrato) = definition.vibrato {
            voice = voice.with_vibrato(vibrato.into());
        }
        voice
    }

    fn with_filter_def(self, definition: &FilterDef, sample_rate: u32) -> Self {
        let initial = match definition.cutoff_start {
            Some(start) => start,
            None if definition.cutoff > 0.0 => definition.cutoff,
            None => DEFAULT_CUTOFF_HZ,
        };
        let filter = BiquadFilter::new(
            definition.kind,
            initial,
            definition.resonance,
            sample_rate,
        );

        let voice = self.with_filter(filter);
        match definition.cutoff_start {
            Some(start) => {
                let end = definition
                    .cutoff_end
                    .or((definition.cutoff > 0.0).then_some(definition.cutoff))
                    .unwrap_or(start);
                voice.with_cutoff_sweep(Sweep::new(start, end, definition.curve))
            }
            None => voice,
        }
    }

    #[must_use]
    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    #[must_use]
    pub fn filter(&self) -> Option<&BiquadFilter> {
        self.filter.as_ref()
    }

    /// Instantaneous frequency at `elapsed`, before vibrato. `span` sizes open-ended sweeps.
    #[must_use]
    pub fn frequency_at(&self, elapsed: f64, span: f64) -> f64 {
        match &self.pitch_sweep {
            Some(sweep) if sweep.start == 0.0 && sweep.end == 0.0 => self.frequency,
            Some(sweep) => sweep.value_at(elapsed, span),
            None => self.frequency,
        }
    }

    /// Adds `gain`-scaled samples into `out`, the first of which sits `first_sample`
    /// samples after note-on. The note is held for `hold` seconds and sweeps without an
    /// explicit duration stretch over `span` seconds.
    #[allow(clippy::too_many_arguments)]
    pub fn render_into(
        &mut self,
        out: &mut [f64],
        first_sample: usize,
        hold: f64,
        span: f64,
        gain: f64,
        sample_rate: u32,
        noise: &mut NoiseSource,
    ) {
        let rate = f64::from(sample_rate.max(1));
        for (offset, slot) in out.iter_mut().enumerate() {
            let elapsed = (first_sample + offset) as f64 / rate;

            let mut frequency = self.frequency_at(elapsed, span);
            if let Some(vibrato) = self.vibrato {
                let wobble = vibrato.depth_semitones * (TAU * vibrato.rate_hz * elapsed).sin();
                frequency *= semitone_ratio(wobble);
            }

            let mut sample = self.waveform.sample(self.phase, noise);
            self.phase += frequency / rate;
            self.phase -= self.phase.floor();

            if let Some(filter) = self.filter.as_mut() {
                if let Some(sweep) = &self.cutoff_sweep {
                    filter.set_cutoff(sweep.value_at(elapsed, span));
                }
                sample = filter.process(sample);
            }

            *slot += sample * self.envelope.level(elapsed, hold) * gain;
        }
    }
}

/// Renders a voice in isolation: `round(duration * sample_rate)` samples, released so the
/// envelope closes at the end of the buffer.
#[must_use]
pub fn render_voice(
    voice: &mut Voice,
    duration: f64,
    sample_rate: u32,
    noise: &mut NoiseSource,
) -> Vec<f64> {
    let mut samples = vec![0.0; seconds_to_samples(duration, sample_rate)];
    let release = voice.envelope.release;
    let hold = if release >= duration {
        duration
    } else {
        duration - release
    };

    voice.render_into(&mut samples, 0, hold, duration, 1.0, sample_rate, noise);
    samples
}
