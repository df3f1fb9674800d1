//! Read-back and downsampling helpers for waveform previews.

use std::path::Path;

use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WaveformPeaks {
    pub bucket_size: usize,
    pub peaks: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WavAnalysis {
    pub source_path: String,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub total_frames: usize,
    pub duration_seconds: f64,
    pub peaks: WaveformPeaks,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedWav {
    pub sample_rate: u32,
    pub bits_per_sample: u16,
    pub samples: Vec<f64>,
}

/// Absolute peak of each `bucket_size` chunk. A zero bucket size is treated as one.
#[must_use]
pub fn waveform_peaks(samples: &[f64], bucket_size: usize) -> WaveformPeaks {
    let bucket_size = bucket_size.max(1);
    let peaks = samples
        .chunks(bucket_size)
        .map(|chunk| chunk.iter().copied().map(f64::abs).fold(0.0_f64, f64::max))
        .collect();
    WaveformPeaks { bucket_size, peaks }
}

/// Reads an integer PCM WAV, mixes it to mono and normalizes into [-1, 1].
#[instrument(fields(path = %path.display()))]
pub fn read_wav_mono(path: &Path) -> Result<DecodedWav> {
    let mut reader = WavReader::open(path)
        .with_context(|| format!("failed to open wav file: {}", path.display()))?;
    let spec = reader.spec();
    if spec.sample_format != SampleFormat::Int {
        return Err(anyhow::anyhow!(
            "only integer PCM is supported: {}",
            path.display()
        ));
    }

    let channels = usize::from(spec.channels.max(1));
    let full_scale = f64::from(1_u32 << (spec.bits_per_sample - 1));
    let raw = reader
        .samples::<i32>()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("failed to decode wav samples: {}", path.display()))?;

    let samples: Vec<f64> = raw
        .chunks(channels)
        .map(|frame| {
            let sum: f64 = frame.iter().map(|value| f64::from(*value)).sum();
            (sum / channels as f64 / full_scale).clamp(-1.0, 1.0)
        })
        .collect();

    debug!(
        sample_rate = spec.sample_rate,
        frames = samples.len(),
        "wav decode complete"
    );
    Ok(DecodedWav {
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        samples,
    })
}

#[instrument(fields(path = %path.display(), bucket_size))]
pub fn analyze_wav(path: &Path, bucket_size: usize) -> Result<WavAnalysis> {
    if bucket_size == 0 {
        return Err(anyhow::anyhow!("bucket_size must be greater than zero"));
    }

    let decoded = read_wav_mono(path)?;
    let total_frames = decoded.samples.len();
    let duration_seconds = crate::time::samples_to_seconds(total_frames, decoded.sample_rate);

    Ok(WavAnalysis {
        source_path: path.display().to_string(),
        sample_rate: decoded.sample_rate,
        bits_per_sample: decoded.bits_per_sample,
        total_frames,
        duration_seconds,
        peaks: waveform_peaks(&decoded.samples, bucket_size),
    })
}
