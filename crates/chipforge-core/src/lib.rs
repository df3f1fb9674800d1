pub mod config;
pub mod definitions;
pub mod diagnostics;
pub mod engine;
pub mod envelope;
pub mod filter;
pub mod fingerprint;
pub mod fixtures;
pub mod interpolate;
pub mod mastering;
pub mod model;
pub mod notation;
pub mod oscillator;
pub mod pitch;
pub mod preview;
pub mod sequencer;
pub mod sfx;
pub mod time;
pub mod voice;
pub mod wav;

pub use config::CompilerConfig;
pub use definitions::{AssetKind, DefinitionPath, TrackFile, load_sfx, load_track};
pub use diagnostics::{TelemetryGuard, init_tracing, init_tracing_from_config};
pub use engine::{BuildReport, CompiledAsset, Compiler, EngineError};
pub use envelope::Envelope;
pub use filter::{BiquadFilter, FilterKind};
pub use fingerprint::{RenderFingerprint, fingerprint};
pub use interpolate::{Curve, interpolate};
pub use mastering::{RenderOutput, RenderWarning, apply_safety_chain};
pub use model::{
    ChannelDef, DefinitionError, InstrumentBank, InstrumentDef, Note, Pattern, SfxDef,
    SfxVoiceDef, Track,
};
pub use oscillator::{NoiseSource, Waveform};
pub use sequencer::{render_track, track_length};
pub use sfx::render_sfx;
pub use voice::{Voice, render_voice};
pub use wav::{BitDepth, encode_wav, write_wav};
