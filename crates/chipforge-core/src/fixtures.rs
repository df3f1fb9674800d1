use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::{
    definitions::{PatternFile, TrackFile, to_toml},
    envelope::Envelope,
    filter::FilterKind,
    interpolate::Curve,
    model::{
        ChannelDef, FilterDef, InstrumentBank, InstrumentDef, InstrumentEffects, OscillatorDef,
        PitchDef, PitchSweepDef, SfxDef, SfxVoiceDef, VibratoDef,
    },
};

/// Rising square-wave blip.
#[must_use]
pub fn demo_laser() -> SfxDef {
    SfxDef {
        duration: 0.2,
        volume: 1.0,
        voices: vec![SfxVoiceDef {
            waveform: "square".to_string(),
            envelope: Envelope::new(0.0, 0.08, 0.2, 0.12),
            pitch: PitchDef {
                start: 220.0,
                end: 660.0,
                curve: Curve::Exponential,
            },
            ..SfxVoiceDef::default()
        }],
    }
}

/// Noise burst through a closing lowpass, layered over a falling sine thump.
#[must_use]
pub fn demo_explosion() -> SfxDef {
    SfxDef {
        duration: 0.6,
        volume: 0.9,
        voices: vec![
            SfxVoiceDef {
                waveform: "noise".to_string(),
                envelope: Envelope::new(0.005, 0.2, 0.3, 0.3),
                filter: Some(FilterDef {
                    kind: FilterKind::Lowpass,
                    cutoff_start: Some(6_000.0),
                    cutoff_end: Some(300.0),
                    resonance: 0.2,
                    curve: Curve::Exponential,
                    ..FilterDef::default()
                }),
                ..SfxVoiceDef::default()
            },
            SfxVoiceDef {
                waveform: "sine".to_string(),
                envelope: Envelope::new(0.0, 0.3, 0.0, 0.1),
                pitch: PitchDef {
                    start: 160.0,
                    end: 40.0,
                    curve: Curve::Logarithmic,
                },
                ..SfxVoiceDef::default()
            },
        ],
    }
}

#[must_use]
pub fn demo_instruments() -> InstrumentBank {
    let mut bank = InstrumentBank::new();
    bank.insert(
        "pulse_lead".to_string(),
        InstrumentDef {
            oscillator: OscillatorDef {
                waveform: "pulse".to_string(),
                duty: 0.25,
            },
            envelope: Envelope::new(0.01, 0.1, 0.6, 0.1),
            filter: None,
            effects: InstrumentEffects {
                vibrato: Some(VibratoDef {
                    depth: 0.2,
                    rate: 5.5,
                }),
                pitch_sweep: None,
            },
        },
    );
    bank.insert(
        "tri_bass".to_string(),
        InstrumentDef {
            oscillator: OscillatorDef::new("triangle"),
            envelope: Envelope::new(0.005, 0.05, 0.8, 0.05),
            filter: Some(FilterDef {
                kind: FilterKind::Lowpass,
                cutoff: 1_200.0,
                resonance: 0.1,
                ..FilterDef::default()
            }),
            effects: InstrumentEffects {
                vibrato: None,
                pitch_sweep: Some(PitchSweepDef {
                    semitones: -1.0,
                    duration: 0.05,
                    curve: Curve::Linear,
                }),
            },
        },
    );
    bank
}

fn rows(cells: &[[&str; 2]]) -> Vec<Vec<String>> {
    cells
        .iter()
        .map(|row| row.iter().map(|cell| (*cell).to_string()).collect())
        .collect()
}

/// Two-channel loop: lead over bass, eight ticks per pattern.
#[must_use]
pub fn demo_track() -> TrackFile {
    let mut patterns = BTreeMap::new();
    patterns.insert(
        "intro".to_string(),
        PatternFile {
            ticks: Some(8),
            rows: rows(&[
                ["C-5 V0F", "C-3"],
                ["...", "..."],
                ["E-5 V0C", "==="],
                ["...", "---"],
                ["G-5", "G-2 V0A"],
                ["...", "..."],
                ["===", "..."],
                ["---", "==="],
            ]),
        },
    );
    patterns.insert(
        "turn".to_string(),
        PatternFile {
            ticks: Some(8),
            rows: rows(&[
                ["A-5 V0E", "F-2"],
                ["...", "..."],
                ["G-5 V0B U2", "..."],
                ["...", "==="],
                ["E-5", "G-2"],
                ["...", "..."],
                ["D-5 V08", "..."],
                ["===", "==="],
            ]),
        },
    );

    TrackFile {
        tempo: 132.0,
        ticks_per_beat: 4,
        channels: vec![
            ChannelDef::new("lead", "pulse_lead", 0.6),
            ChannelDef::new("bass", "tri_bass", 0.8),
        ],
        instruments: InstrumentBank::new(),
        patterns,
        sequence: vec![
            "intro".to_string(),
            "turn".to_string(),
            "intro".to_string(),
        ],
    }
}

/// Writes the demo definitions into `directory` and returns the written paths.
#[instrument(fields(directory = %directory.display()))]
pub fn write_demo_assets(directory: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(directory)
        .with_context(|| format!("failed to create demo directory: {}", directory.display()))?;

    let mut documents = vec![
        (directory.join("laser.sfx.toml"), to_toml(&demo_laser())?),
        (directory.join("explosion.sfx.toml"), to_toml(&demo_explosion())?),
        (directory.join("theme.track.toml"), to_toml(&demo_track())?),
    ];
    for (name, instrument) in demo_instruments() {
        documents.push((
            directory.join(format!("{name}.instrument.toml")),
            to_toml(&instrument)?,
        ));
    }

    let mut written = Vec::with_capacity(documents.len());
    for (path, content) in documents {
        fs::write(&path, content)
            .with_context(|| format!("failed to write demo asset: {}", path.display()))?;
        written.push(path);
    }

    info!(count = written.len(), "demo assets written");
    Ok(written)
}
