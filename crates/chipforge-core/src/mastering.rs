//! Post-mix safety chain: sanitize, DC removal, brickwall limiting. Always run in that order.

use std::{f64::consts::TAU, fmt};

use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DC_BLOCK_CUTOFF_HZ: f64 = 10.0;
pub const LIMITER_RELEASE_MS: f64 = 50.0;

/// Limiter ceiling, -1 dBFS.
#[must_use]
pub fn limiter_threshold() -> f64 {
    10_f64.powf(-1.0 / 20.0)
}

/// Non-fatal anomaly found while mastering a buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderWarning {
    NonFiniteSamples { replaced: usize },
}

impl fmt::Display for RenderWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFiniteSamples { replaced } => {
                write!(f, "replaced {replaced} NaN/infinite samples with silence")
            }
        }
    }
}

/// A mastered buffer and whatever the safety chain had to repair.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderOutput {
    pub samples: Vec<f64>,
    pub warnings: Vec<RenderWarning>,
}

/// Runs the full chain in place and reports warnings.
pub fn apply_safety_chain(samples: &mut [f64], sample_rate: u32) -> Vec<RenderWarning> {
    let mut warnings = Vec::new();

    let replaced = sanitize(samples);
    if replaced > 0 {
        warn!(replaced, "non-finite samples replaced during mastering");
        warnings.push(RenderWarning::NonFiniteSamples { replaced });
    }

    remove_dc(samples, sample_rate);
    brickwall_limit(samples, sample_rate);
    warnings
}

/// Mastered copy of `samples` wrapped as render output.
#[must_use]
pub fn master(mut samples: Vec<f64>, sample_rate: u32) -> RenderOutput {
    let warnings = apply_safety_chain(&mut samples, sample_rate);
    RenderOutput { samples, warnings }
}

/// Zeroes NaN and infinite samples, returning how many were replaced.
pub fn sanitize(samples: &mut [f64]) -> usize {
    let mut replaced = 0;
    for sample in samples.iter_mut().filter(|sample| !sample.is_finite()) {
        *sample = 0.0;
        replaced += 1;
    }
    replaced
}

/// One-pole high-pass at 10 Hz: `y[n] = x[n] - x[n-1] + R * y[n-1]`.
pub fn remove_dc(samples: &mut [f64], sample_rate: u32) {
    let coefficient = 1.0 - TAU * DC_BLOCK_CUTOFF_HZ / f64::from(sample_rate.max(1));
    let mut previous_input = 0.0;
    let mut previous_output = 0.0;

    for sample in samples.iter_mut() {
        let input = *sample;
        let output = input - previous_input + coefficient * previous_output;
        previous_input = input;
        previous_output = output;
        *sample = output;
    }
}

/// Instant-attack limiter with linear 50 ms gain recovery. No sample leaves above -1 dBFS.
pub fn brickwall_limit(samples: &mut [f64], sample_rate: u32) {
    let threshold = limiter_threshold();
    let release_samples = (f64::from(sample_rate) * LIMITER_RELEASE_MS / 1_000.0).max(1.0);
    let recovery_step = 1.0 / release_samples;
    let mut gain = 1.0_f64;

    for sample in samples.iter_mut() {
        let magnitude = sample.abs();
        let reduced = magnitude * gain > threshold;
        if reduced {
            gain = threshold / magnitude;
        }

        *sample *= gain;

        if !reduced {
            gain = (gain + recovery_step).min(1.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_counts_and_zeroes_non_finite_samples() {
        let mut samples = vec![0.1, f64::NAN, f64::INFINITY, -0.2, f64::NEG_INFINITY];
        assert_eq!(sanitize(&mut samples), 3);
        assert_eq!(samples, vec![0.1, 0.0, 0.0, -0.2, 0.0]);
    }

    #[test]
    fn dc_offset_decays_away() {
        let mut samples = vec![0.5; 44_100];
        remove_dc(&mut samples, 44_100);
        let tail = samples[40_000..].iter().fold(0.0_f64, |peak, v| peak.max(v.abs()));
        assert!(tail < 0.01, "dc should decay, got {tail}");
    }

    #[test]
    fn limiter_never_exceeds_threshold() {
        let mut samples: Vec<f64> = (0..4_410)
            .map(|index| 3.0 * (index as f64 * 0.05).sin())
            .collect();
        brickwall_limit(&mut samples, 44_100);
        let threshold = limiter_threshold();
        assert!(samples.iter().all(|sample| sample.abs() <= threshold * (1.0 + 1e-12)));
    }

    #[test]
    fn limiter_gain_recovers_after_a_spike() {
        let mut samples = vec![0.0; 10_000];
        samples[0] = 4.0;
        samples[9_999] = 0.5;
        brickwall_limit(&mut samples, 44_100);
        assert!((samples[9_999] - 0.5).abs() < 1e-12, "gain should be back to unity");
    }

    #[test]
    fn quiet_material_is_untouched_by_the_limiter() {
        let mut samples = vec![0.3, -0.4, 0.5];
        brickwall_limit(&mut samples, 44_100);
        assert_eq!(samples, vec![0.3, -0.4, 0.5]);
    }

    #[test]
    fn chain_reports_sanitized_samples() {
        let mut samples = vec![0.0, f64::NAN, 0.0];
        let warnings = apply_safety_chain(&mut samples, 44_100);
        assert_eq!(warnings, vec![RenderWarning::NonFiniteSamples { replaced: 1 }]);
        assert!(samples.iter().all(|sample| sample.is_finite()));
    }
}
