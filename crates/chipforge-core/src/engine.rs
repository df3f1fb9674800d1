use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::{
    config::CompilerConfig,
    definitions::{
        AssetKind, DefinitionPath, load_instrument, load_sfx, load_track, scan_definitions,
    },
    mastering::{RenderOutput, RenderWarning},
    model::{DEFAULT_SAMPLE_RATE, DefinitionError, InstrumentBank, InstrumentDef},
    oscillator::NoiseSource,
    sequencer::render_track,
    sfx::render_sfx,
    wav::{BitDepth, write_wav},
};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid definition {path}: {source}")]
    Definition {
        path: PathBuf,
        #[source]
        source: DefinitionError,
    },
    #[error("{0} is not a renderable asset")]
    NotRenderable(PathBuf),
    #[error("invalid compiler settings: {0}")]
    Settings(#[from] DefinitionError),
    #[error("io error: {0}")]
    Io(String),
}

impl From<anyhow::Error> for EngineError {
    fn from(value: anyhow::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl EngineError {
    fn definition(path: &Path, source: DefinitionError) -> Self {
        Self::Definition {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompiledAsset {
    pub name: String,
    pub kind: AssetKind,
    pub source: PathBuf,
    pub output: PathBuf,
    pub sample_count: usize,
    pub warnings: Vec<RenderWarning>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildFailure {
    pub path: PathBuf,
    pub message: String,
}

impl BuildFailure {
    fn new(path: PathBuf, error: &EngineError) -> Self {
        Self {
            path,
            message: error.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BuildReport {
    pub compiled: Vec<CompiledAsset>,
    pub failures: Vec<BuildFailure>,
}

impl BuildReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Turns definition files into mastered WAV files.
#[derive(Debug, Clone)]
pub struct Compiler {
    sample_rate: u32,
    bit_depth: BitDepth,
    noise_seed: Option<u64>,
    output_dir: PathBuf,
    instruments: InstrumentBank,
}

impl Default for Compiler {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            bit_depth: BitDepth::Sixteen,
            noise_seed: None,
            output_dir: PathBuf::from("build"),
            instruments: InstrumentBank::new(),
        }
    }
}

impl Compiler {
    pub fn new(
        sample_rate: u32,
        bit_depth: u16,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self, EngineError> {
        if sample_rate == 0 {
            return Err(DefinitionError::InvalidSampleRate.into());
        }

        Ok(Self {
            sample_rate,
            bit_depth: BitDepth::try_from(bit_depth)?,
            output_dir: output_dir.into(),
            ..Self::default()
        })
    }

    pub fn from_config(config: &CompilerConfig) -> Result<Self, EngineError> {
        let compiler = Self::new(
            config.audio.sample_rate,
            config.audio.bit_depth,
            &config.paths.output_dir,
        )?;
        Ok(compiler.with_noise_seed(config.audio.noise_seed))
    }

    #[must_use]
    pub fn with_noise_seed(mut self, seed: Option<u64>) -> Self {
        self.noise_seed = seed;
        self
    }

    #[must_use]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[must_use]
    pub fn bit_depth(&self) -> BitDepth {
        self.bit_depth
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    #[must_use]
    pub fn instruments(&self) -> &InstrumentBank {
        &self.instruments
    }

    pub fn register_instrument(&mut self, name: impl Into<String>, instrument: InstrumentDef) {
        self.instruments.insert(name.into(), instrument);
    }

    /// Adds every `*.instrument.*` file under `directory` to the shared bank.
    #[instrument(skip(self), fields(directory = %directory.display()))]
    pub fn load_instruments(&mut self, directory: &Path) -> Result<usize, EngineError> {
        let mut loaded = 0;
        for (path, parsed) in scan_definitions(directory) {
            if parsed.kind != AssetKind::Instrument {
                continue;
            }
            let instrument =
                load_instrument(&path).map_err(|error| EngineError::definition(&path, error))?;
            self.instruments.insert(parsed.name, instrument);
            loaded += 1;
        }

        info!(loaded, "shared instruments registered");
        Ok(loaded)
    }

    fn noise(&self) -> NoiseSource {
        NoiseSource::from_optional_seed(self.noise_seed)
    }

    /// Loads and renders one SFX or track definition without writing anything.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn render_file(&self, path: &Path) -> Result<(DefinitionPath, RenderOutput), EngineError> {
        let parsed =
            DefinitionPath::parse(path).map_err(|error| EngineError::definition(path, error))?;

        let output = match parsed.kind {
            AssetKind::Sfx => {
                let definition =
                    load_sfx(path).map_err(|error| EngineError::definition(path, error))?;
                render_sfx(&definition, self.sample_rate, &mut self.noise())
            }
            AssetKind::Track => {
                let track =
                    load_track(path).map_err(|error| EngineError::definition(path, error))?;
                render_track(&track, &self.instruments, self.sample_rate, &mut self.noise())
            }
            AssetKind::Instrument => return Err(EngineError::NotRenderable(path.to_path_buf())),
        };

        for warning in &output.warnings {
            warn!(%warning, "render produced a warning");
        }
        Ok((parsed, output))
    }

    /// Renders `path` and writes `<output_dir>/<name>.wav`.
    #[instrument(skip(self), fields(path = %path.display(), output_dir = %self.output_dir.display()))]
    pub fn compile_file(&self, path: &Path) -> Result<CompiledAsset, EngineError> {
        let (parsed, output) = self.render_file(path)?;
        let output_path = self.output_dir.join(format!("{}.wav", parsed.name));
        write_wav(&output_path, &output.samples, self.sample_rate, self.bit_depth)?;

        info!(
            asset = %parsed.name,
            samples = output.samples.len(),
            "asset compiled"
        );
        Ok(CompiledAsset {
            name: parsed.name,
            kind: parsed.kind,
            source: path.to_path_buf(),
            output: output_path,
            sample_count: output.samples.len(),
            warnings: output.warnings,
        })
    }

    /// Compiles every SFX and track under `input_dir`. Instruments found there are loaded
    /// first. A failing instrument or asset is recorded and the build moves on.
    #[instrument(skip(self), fields(input_dir = %input_dir.display()))]
    pub fn build_directory(&mut self, input_dir: &Path) -> Result<BuildReport, EngineError> {
        if !input_dir.is_dir() {
            return Err(EngineError::Io(format!(
                "input path is not a directory: {}",
                input_dir.display()
            )));
        }

        let definitions = scan_definitions(input_dir);
        let mut report = BuildReport::default();

        let (instruments, assets): (Vec<_>, Vec<_>) = definitions
            .into_iter()
            .partition(|(_, parsed)| parsed.kind == AssetKind::Instrument);

        for (path, parsed) in instruments {
            match load_instrument(&path) {
                Ok(instrument) => {
                    self.instruments.insert(parsed.name, instrument);
                }
                Err(error) => {
                    let error = EngineError::definition(&path, error);
                    warn!(path = %path.display(), %error, "instrument failed to load");
                    report.failures.push(BuildFailure::new(path, &error));
                }
            }
        }

        for (path, _) in assets {
            match self.compile_file(&path) {
                Ok(asset) => report.compiled.push(asset),
                Err(error) => {
                    warn!(path = %path.display(), %error, "asset failed to compile");
                    report.failures.push(BuildFailure::new(path, &error));
                }
            }
        }

        info!(
            compiled = report.compiled.len(),
            failed = report.failures.len(),
            "build finished"
        );
        Ok(report)
    }
}
