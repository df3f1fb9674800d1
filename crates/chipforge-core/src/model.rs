use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    envelope::Envelope,
    filter::FilterKind,
    interpolate::Curve,
    notation::NotationError,
    oscillator::{DEFAULT_DUTY_CYCLE, Waveform},
    time::effective_ticks_per_beat,
};

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_PITCH_HZ: f64 = 440.0;
pub const DEFAULT_PITCH_SWEEP_SECONDS: f64 = 0.1;
pub const VELOCITY_FULL_SCALE: f64 = 15.0;

/// Errors raised while turning a definition into renderable values. Fatal for that one asset.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("duration must be positive, got {0}")]
    InvalidDuration(f64),
    #[error("tempo must be positive, got {0}")]
    InvalidTempo(f64),
    #[error("unsupported bit depth {0}; expected 8, 16 or 24")]
    UnsupportedBitDepth(u16),
    #[error("sample rate must be positive")]
    InvalidSampleRate,
    #[error("song sequence references unknown pattern `{0}`")]
    UnknownPattern(String),
    #[error("pattern `{pattern}` row {row} has {found} columns but the track declares {expected} channels")]
    ColumnMismatch {
        pattern: String,
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("pattern `{pattern}` has {rows} rows but declares only {ticks} ticks")]
    TooManyRows {
        pattern: String,
        rows: usize,
        ticks: usize,
    },
    #[error("pattern `{pattern}` row {row} column {column}: {source}")]
    NoteCell {
        pattern: String,
        row: usize,
        column: usize,
        #[source]
        source: NotationError,
    },
    #[error("unrecognized definition file name: {0}")]
    UnknownAssetKind(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OscillatorDef {
    pub waveform: String,
    pub duty: f64,
}

impl Default for OscillatorDef {
    fn default() -> Self {
        Self {
            waveform: "sine".to_string(),
            duty: DEFAULT_DUTY_CYCLE,
        }
    }
}

impl OscillatorDef {
    #[must_use]
    pub fn new(waveform: impl Into<String>) -> Self {
        Self {
            waveform: waveform.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn waveform(&self) -> Waveform {
        Waveform::from_name(&self.waveform, self.duty)
    }
}

/// Filter settings. `cutoff` of zero means unset; `cutoff_start` turns on a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FilterDef {
    pub kind: FilterKind,
    pub cutoff: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cutoff_start: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cutoff_end: Option<f64>,
    pub resonance: f64,
    pub curve: Curve,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VibratoDef {
    /// Depth in semitones.
    pub depth: f64,
    /// Rate in Hz.
    pub rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchSweepDef {
    pub semitones: f64,
    #[serde(default = "default_pitch_sweep_seconds")]
    pub duration: f64,
    #[serde(default)]
    pub curve: Curve,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct InstrumentEffects {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibrato: Option<VibratoDef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch_sweep: Option<PitchSweepDef>,
}

/// Named voice template used by track channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct InstrumentDef {
    pub oscillator: OscillatorDef,
    pub envelope: Envelope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterDef>,
    pub effects: InstrumentEffects,
}

pub type InstrumentBank = BTreeMap<String, InstrumentDef>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PitchDef {
    pub start: f64,
    pub end: f64,
    pub curve: Curve,
}

impl PitchDef {
    /// Start and end with the one-shot defaults applied: 440 Hz start, end follows start.
    #[must_use]
    pub fn resolved(&self) -> (f64, f64) {
        let start = if self.start == 0.0 {
            DEFAULT_PITCH_HZ
        } else {
            self.start
        };
        let end = if self.end == 0.0 { start } else { self.end };
        (start, end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SfxVoiceDef {
    pub waveform: String,
    pub duty: f64,
    pub envelope: Envelope,
    pub pitch: PitchDef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterDef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibrato: Option<VibratoDef>,
}

impl Default for SfxVoiceDef {
    fn default() -> Self {
        Self {
            waveform: "sine".to_string(),
            duty: DEFAULT_DUTY_CYCLE,
            envelope: Envelope::default(),
            pitch: PitchDef::default(),
            filter: None,
            vibrato: None,
        }
    }
}

/// One-shot sound effect: independent voices rendered over a fixed duration and summed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SfxDef {
    pub duration: f64,
    #[serde(default = "default_volume")]
    pub volume: f64,
    #[serde(default)]
    pub voices: Vec<SfxVoiceDef>,
}

impl SfxDef {
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.duration.is_finite() && self.duration > 0.0 {
            Ok(())
        } else {
            Err(DefinitionError::InvalidDuration(self.duration))
        }
    }

    /// Master volume with the default of 1 applied to non-positive values.
    #[must_use]
    pub fn effective_volume(&self) -> f64 {
        if self.volume > 0.0 { self.volume } else { 1.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDef {
    pub name: String,
    pub instrument: String,
    #[serde(default = "default_volume")]
    pub volume: f64,
}

impl ChannelDef {
    #[must_use]
    pub fn new(name: impl Into<String>, instrument: impl Into<String>, volume: f64) -> Self {
        Self {
            name: name.into(),
            instrument: instrument.into(),
            volume,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Velocity,
    SlideUp,
    SlideDown,
    Vibrato,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEffect {
    pub kind: EffectKind,
    pub magnitude: u8,
}

/// One pattern cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Note {
    On {
        name: String,
        octave: i32,
        effects: Vec<NoteEffect>,
    },
    Sustain,
    Silence,
    Off,
}

impl Note {
    #[must_use]
    pub fn on(name: impl Into<String>, octave: i32) -> Self {
        Self::On {
            name: name.into(),
            octave,
            effects: Vec::new(),
        }
    }

    /// Channel gain for a note-on: the velocity effect scales the channel volume by `magnitude / 15`.
    #[must_use]
    pub fn gain(&self, channel_volume: f64) -> f64 {
        let Self::On { effects, .. } = self else {
            return channel_volume;
        };

        effects
            .iter()
            .rev()
            .find(|effect| effect.kind == EffectKind::Velocity)
            .map_or(channel_volume, |effect| {
                channel_volume * f64::from(effect.magnitude) / VELOCITY_FULL_SCALE
            })
    }
}

/// Fixed-length grid of notes, one row per tick and one column per channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    rows: Vec<Vec<Note>>,
}

impl Pattern {
    #[must_use]
    pub fn new(rows: Vec<Vec<Note>>) -> Self {
        Self { rows }
    }

    /// Pads `rows` with sustain rows up to `ticks`. More rows than ticks is an error.
    pub fn with_ticks(
        name: &str,
        ticks: usize,
        mut rows: Vec<Vec<Note>>,
        channels: usize,
    ) -> Result<Self, DefinitionError> {
        if rows.len() > ticks {
            return Err(DefinitionError::TooManyRows {
                pattern: name.to_string(),
                rows: rows.len(),
                ticks,
            });
        }
        rows.resize_with(ticks, || vec![Note::Sustain; channels]);
        Ok(Self { rows })
    }

    #[must_use]
    pub fn ticks(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<Note>] {
        &self.rows
    }
}

/// A validated song: every sequence entry names a pattern and every row matches the channel count.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    tempo: f64,
    ticks_per_beat: u32,
    channels: Vec<ChannelDef>,
    patterns: BTreeMap<String, Pattern>,
    sequence: Vec<String>,
    instruments: InstrumentBank,
}

impl Track {
    pub fn new(
        tempo: f64,
        ticks_per_beat: u32,
        channels: Vec<ChannelDef>,
        patterns: BTreeMap<String, Pattern>,
        sequence: Vec<String>,
    ) -> Result<Self, DefinitionError> {
        if !tempo.is_finite() || tempo <= 0.0 {
            return Err(DefinitionError::InvalidTempo(tempo));
        }

        if !channels.is_empty() {
            for (name, pattern) in &patterns {
                if let Some((row, cells)) = pattern
                    .rows()
                    .iter()
                    .enumerate()
                    .find(|(_, cells)| cells.len() != channels.len())
                {
                    return Err(DefinitionError::ColumnMismatch {
                        pattern: name.clone(),
                        row,
                        expected: channels.len(),
                        found: cells.len(),
                    });
                }
            }
        }

        if let Some(missing) = sequence.iter().find(|name| !patterns.contains_key(*name)) {
            return Err(DefinitionError::UnknownPattern(missing.clone()));
        }

        Ok(Self {
            tempo,
            ticks_per_beat: effective_ticks_per_beat(ticks_per_beat),
            channels,
            patterns,
            sequence,
            instruments: InstrumentBank::new(),
        })
    }

    /// Attaches track-local instruments; these shadow shared ones of the same name.
    #[must_use]
    pub fn with_instruments(mut self, instruments: InstrumentBank) -> Self {
        self.instruments = instruments;
        self
    }

    #[must_use]
    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    #[must_use]
    pub fn ticks_per_beat(&self) -> u32 {
        self.ticks_per_beat
    }

    #[must_use]
    pub fn channels(&self) -> &[ChannelDef] {
        &self.channels
    }

    #[must_use]
    pub fn pattern(&self, name: &str) -> Option<&Pattern> {
        self.patterns.get(name)
    }

    #[must_use]
    pub fn sequence(&self) -> &[String] {
        &self.sequence
    }

    #[must_use]
    pub fn instruments(&self) -> &InstrumentBank {
        &self.instruments
    }

    /// Patterns in song order.
    pub fn song(&self) -> impl Iterator<Item = &Pattern> {
        self.sequence.iter().filter_map(|name| self.patterns.get(name))
    }

    #[must_use]
    pub fn total_ticks(&self) -> usize {
        self.song().map(Pattern::ticks).sum()
    }

    #[must_use]
    pub fn resolve_instrument<'a>(
        &'a self,
        name: &str,
        shared: &'a InstrumentBank,
    ) -> Option<&'a InstrumentDef> {
        self.instruments.get(name).or_else(|| shared.get(name))
    }
}

const fn default_volume() -> f64 {
    1.0
}

const fn default_pitch_sweep_seconds() -> f64 {
    DEFAULT_PITCH_SWEEP_SECONDS
}
