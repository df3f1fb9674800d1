use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::DEFAULT_SAMPLE_RATE;

pub const CONFIG_FILE_NAME: &str = "chipforge.config.toml";
pub const CONFIG_PATH_ENV: &str = "CHIPFORGE_CONFIG_PATH";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CompilerConfig {
    pub audio: AudioConfig,
    pub paths: PathsConfig,
    pub diagnostics: DiagnosticsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub bit_depth: u16,
    pub noise_seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub logs_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub rust_log_filter: String,
    pub trace_file_prefix: String,
    pub console_logs: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            bit_depth: 16,
            noise_seed: None,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("assets"),
            output_dir: PathBuf::from("build"),
            logs_dir: PathBuf::from("logs"),
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            rust_log_filter: "info,chipforge_core=debug".to_string(),
            trace_file_prefix: "chipforge".to_string(),
            console_logs: true,
        }
    }
}

impl CompilerConfig {
    /// Loads the discovered config file; fails when none exists.
    pub fn load() -> Result<Self> {
        let config_path = discover_config_path().with_context(|| {
            format!("failed to locate {CONFIG_FILE_NAME}; looked in cwd and parent directory")
        })?;
        Self::from_path(&config_path)
    }

    pub fn from_path(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("failed to read config file {}", config_path.display()))?;

        let config: CompilerConfig = toml::from_str(&content).with_context(|| {
            format!("failed to parse config TOML from {}", config_path.display())
        })?;

        debug!(path = %config_path.display(), "config loaded");
        Ok(config)
    }

    /// Like [`CompilerConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default() -> Result<Self> {
        match discover_config_path() {
            Ok(path) => Self::from_path(&path),
            Err(_) => Ok(Self::default()),
        }
    }
}

fn discover_config_path() -> Result<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.is_file() {
            return Ok(path);
        }
    }

    let cwd = env::current_dir().context("failed to resolve current directory")?;
    let candidates = [
        cwd.join(CONFIG_FILE_NAME),
        cwd.join("..").join(CONFIG_FILE_NAME),
    ];

    candidates
        .into_iter()
        .find(|path| path.is_file())
        .ok_or_else(|| anyhow::anyhow!("{CONFIG_FILE_NAME} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: CompilerConfig = toml::from_str(
            r#"
            [audio]
            bit_depth = 24
            noise_seed = 9

            [paths]
            output_dir = "out"
            "#,
        )
        .expect("config should parse");

        assert_eq!(config.audio.bit_depth, 24);
        assert_eq!(config.audio.sample_rate, DEFAULT_SAMPLE_RATE);
        assert_eq!(config.audio.noise_seed, Some(9));
        assert_eq!(config.paths.output_dir, PathBuf::from("out"));
        assert_eq!(config.paths.input_dir, PathBuf::from("assets"));
        assert_eq!(config.diagnostics.trace_file_prefix, "chipforge");
        assert!(config.diagnostics.console_logs);
    }

    #[test]
    fn from_path_reads_a_file() {
        let temp = tempfile::tempdir().expect("tempdir should work");
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[audio]\nsample_rate = 22050\n").expect("config write should work");

        let config = CompilerConfig::from_path(&path).expect("config should load");
        assert_eq!(config.audio.sample_rate, 22_050);
    }
}
