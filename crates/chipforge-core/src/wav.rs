//! Mono PCM WAV encoding with a canonical 44-byte header.

use std::{fs, io::Write, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::model::DefinitionError;

pub const WAV_HEADER_LEN: usize = 44;
const PCM_FORMAT_TAG: u16 = 1;
const MONO: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum BitDepth {
    Eight,
    Sixteen,
    TwentyFour,
}

impl BitDepth {
    #[must_use]
    pub fn bits(self) -> u16 {
        match self {
            Self::Eight => 8,
            Self::Sixteen => 16,
            Self::TwentyFour => 24,
        }
    }

    #[must_use]
    pub fn bytes_per_sample(self) -> usize {
        usize::from(self.bits() / 8)
    }
}

impl TryFrom<u16> for BitDepth {
    type Error = DefinitionError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            8 => Ok(Self::Eight),
            16 => Ok(Self::Sixteen),
            24 => Ok(Self::TwentyFour),
            other => Err(DefinitionError::UnsupportedBitDepth(other)),
        }
    }
}

impl From<BitDepth> for u16 {
    fn from(value: BitDepth) -> Self {
        value.bits()
    }
}

/// File size for `samples` frames: `44 + samples * bytes_per_sample`.
#[must_use]
pub fn encoded_len(samples: usize, depth: BitDepth) -> usize {
    WAV_HEADER_LEN + samples * depth.bytes_per_sample()
}

/// Encodes samples (clamped to [-1, 1]) as a single-channel PCM WAV.
///
/// 8-bit is unsigned `(s + 1) / 2 * 255`, 16-bit is `s * 32767`, 24-bit is `s * 8388607`
/// little-endian; every quantization truncates toward zero.
#[must_use]
pub fn encode_wav(samples: &[f64], sample_rate: u32, depth: BitDepth) -> Vec<u8> {
    let bytes_per_sample = depth.bytes_per_sample();
    let data_len = samples.len() * bytes_per_sample;
    let mut bytes = Vec::with_capacity(WAV_HEADER_LEN + data_len);

    let data_len_u32 = u32::try_from(data_len).unwrap_or(u32::MAX);
    let block_align = depth.bits() / 8;

    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36_u32.saturating_add(data_len_u32)).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16_u32.to_le_bytes());
    bytes.extend_from_slice(&PCM_FORMAT_TAG.to_le_bytes());
    bytes.extend_from_slice(&MONO.to_le_bytes());
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&sample_rate.saturating_mul(u32::from(block_align)).to_le_bytes());
    bytes.extend_from_slice(&block_align.to_le_bytes());
    bytes.extend_from_slice(&depth.bits().to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len_u32.to_le_bytes());

    for sample in samples {
        let clamped = if sample.is_finite() {
            sample.clamp(-1.0, 1.0)
        } else {
            0.0
        };
        match depth {
            BitDepth::Eight => bytes.push(((clamped + 1.0) / 2.0 * 255.0) as u8),
            BitDepth::Sixteen => {
                bytes.extend_from_slice(&((clamped * 32_767.0) as i16).to_le_bytes());
            }
            BitDepth::TwentyFour => {
                let value = (clamped * 8_388_607.0) as i32;
                bytes.extend_from_slice(&value.to_le_bytes()[..3]);
            }
        }
    }

    bytes
}

/// Encodes and writes a WAV file atomically, creating parent directories as needed.
#[instrument(skip(samples), fields(path = %path.display(), samples = samples.len(), bits = depth.bits()))]
pub fn write_wav(path: &Path, samples: &[f64], sample_rate: u32, depth: BitDepth) -> Result<()> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create wav output directory: {}", parent.display()))?;

    let bytes = encode_wav(samples, sample_rate, depth);
    let mut temp_file =
        tempfile::NamedTempFile::new_in(parent).context("failed to create temp wav file")?;
    temp_file
        .write_all(&bytes)
        .context("failed to write temp wav file")?;
    temp_file
        .persist(path)
        .map_err(|error| anyhow::anyhow!(error.error))
        .with_context(|| format!("failed to persist wav file: {}", path.display()))?;

    info!(bytes = bytes.len(), "wav written");
    Ok(())
}
