use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::instrument;

use crate::wav::{BitDepth, WAV_HEADER_LEN, encode_wav};

const FINGERPRINT_SCHEMA_VERSION: u32 = 1;

/// Stable summary of a mastered buffer for golden-file comparisons.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderFingerprint {
    pub schema_version: u32,
    pub asset: String,
    pub sample_rate: u32,
    pub sample_count: usize,
    pub peak: f64,
    pub rms: f64,
    pub pcm_hash: String,
}

impl RenderFingerprint {
    /// Same audio, as far as 16-bit PCM can tell.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.sample_rate == other.sample_rate
            && self.sample_count == other.sample_count
            && self.pcm_hash == other.pcm_hash
    }
}

#[instrument(skip(samples), fields(samples = samples.len()))]
#[must_use]
pub fn fingerprint(asset: &str, samples: &[f64], sample_rate: u32) -> RenderFingerprint {
    let peak = samples
        .iter()
        .fold(0.0_f64, |peak, sample| peak.max(sample.abs()));
    let rms = if samples.is_empty() {
        0.0
    } else {
        (samples.iter().map(|sample| sample * sample).sum::<f64>() / samples.len() as f64).sqrt()
    };

    let encoded = encode_wav(samples, sample_rate, BitDepth::Sixteen);
    RenderFingerprint {
        schema_version: FINGERPRINT_SCHEMA_VERSION,
        asset: asset.to_string(),
        sample_rate,
        sample_count: samples.len(),
        peak,
        rms,
        pcm_hash: hash_hex(&encoded[WAV_HEADER_LEN..]),
    }
}

pub fn read_fingerprint(path: &Path) -> Result<RenderFingerprint> {
    let bytes = fs::read(path)
        .with_context(|| format!("failed to read fingerprint: {}", path.display()))?;
    let report: RenderFingerprint =
        serde_json::from_slice(&bytes).context("failed to parse fingerprint json")?;
    Ok(report)
}

pub fn write_fingerprint(path: &Path, report: &RenderFingerprint) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!("failed to create fingerprint directory: {}", parent.display())
        })?;
    }

    let json = serde_json::to_vec_pretty(report).context("failed to encode fingerprint json")?;
    fs::write(path, json)
        .with_context(|| format!("failed to write fingerprint: {}", path.display()))?;
    Ok(())
}

fn hash_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    format!("{digest:x}")
}
