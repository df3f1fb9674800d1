//! Two-pole resonant filter (RBJ cookbook biquad, transposed direct form II).

use std::f64::consts::{FRAC_1_SQRT_2, TAU};

use serde::{Deserialize, Serialize};

pub const DEFAULT_CUTOFF_HZ: f64 = 1_000.0;
const MIN_CUTOFF_HZ: f64 = 1.0;
const MAX_CUTOFF_RATIO: f64 = 0.49;
const RESONANCE_Q_SCALE: f64 = 10.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    #[default]
    Lowpass,
    Highpass,
    Bandpass,
}

/// Maps a 0..1 resonance amount onto a Q factor, 0 being Butterworth.
#[must_use]
pub fn resonance_to_q(resonance: f64) -> f64 {
    let resonance = if resonance.is_finite() {
        resonance.clamp(0.0, 1.0)
    } else {
        0.0
    };
    FRAC_1_SQRT_2 + RESONANCE_Q_SCALE * resonance
}

/// Biquad with its own two-sample history. One instance per voice; never share it.
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    kind: FilterKind,
    cutoff: f64,
    q: f64,
    sample_rate: f64,

    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,

    state1: f64,
    state2: f64,
}

impl BiquadFilter {
    #[must_use]
    pub fn new(kind: FilterKind, cutoff: f64, resonance: f64, sample_rate: u32) -> Self {
        let mut filter = Self {
            kind,
            cutoff,
            q: resonance_to_q(resonance),
            sample_rate: f64::from(sample_rate.max(1)),
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            state1: 0.0,
            state2: 0.0,
        };
        filter.set_cutoff(cutoff);
        filter
    }

    #[must_use]
    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    #[must_use]
    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    #[must_use]
    pub fn q(&self) -> f64 {
        self.q
    }

    /// Internal history, `(state1, state2)`.
    #[must_use]
    pub fn state(&self) -> (f64, f64) {
        (self.state1, self.state2)
    }

    /// Recomputes coefficients for `cutoff`. History is kept so sweeps stay continuous.
    pub fn set_cutoff(&mut self, cutoff: f64) {
        let nyquist_limit = self.sample_rate * MAX_CUTOFF_RATIO;
        self.cutoff = if cutoff.is_finite() {
            cutoff.clamp(MIN_CUTOFF_HZ, nyquist_limit.max(MIN_CUTOFF_HZ))
        } else {
            DEFAULT_CUTOFF_HZ.min(nyquist_limit)
        };
        self.update_coefficients();
    }

    pub fn reset(&mut self) {
        self.state1 = 0.0;
        self.state2 = 0.0;
    }

    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.b0 * input + self.state1;
        self.state1 = self.b1 * input - self.a1 * output + self.state2;
        self.state2 = self.b2 * input - self.a2 * output;
        output
    }

    fn update_coefficients(&mut self) {
        let omega = TAU * self.cutoff / self.sample_rate;
        let cos_omega = omega.cos();
        let alpha = omega.sin() / (2.0 * self.q);

        let (b0, b1, b2) = match self.kind {
            FilterKind::Lowpass => {
                let b1 = 1.0 - cos_omega;
                (b1 / 2.0, b1, b1 / 2.0)
            }
            FilterKind::Highpass => {
                let b0 = (1.0 + cos_omega) / 2.0;
                (b0, -(1.0 + cos_omega), b0)
            }
            FilterKind::Bandpass => (alpha, 0.0, -alpha),
        };
        let a0 = 1.0 + alpha;

        self.b0 = b0 / a0;
        self.b1 = b1 / a0;
        self.b2 = b2 / a0;
        self.a1 = (-2.0 * cos_omega) / a0;
        self.a2 = (1.0 - alpha) / a0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(filter: &mut BiquadFilter, input: impl Fn(usize) -> f64, samples: usize) -> Vec<f64> {
        (0..samples).map(|index| filter.process(input(index))).collect()
    }

    #[test]
    fn lowpass_passes_dc() {
        let mut filter = BiquadFilter::new(FilterKind::Lowpass, 5_000.0, 0.0, 44_100);
        let output = run(&mut filter, |_| 1.0, 2_000);
        let last = output.last().copied().unwrap_or_default();
        assert!((last - 1.0).abs() < 1e-3, "lowpass should pass DC, got {last}");
    }

    #[test]
    fn highpass_blocks_dc() {
        let mut filter = BiquadFilter::new(FilterKind::Highpass, 1_000.0, 0.0, 44_100);
        let output = run(&mut filter, |_| 1.0, 2_000);
        let last = output.last().copied().unwrap_or_default();
        assert!(last.abs() < 1e-3, "highpass should block DC, got {last}");
    }

    #[test]
    fn bandpass_rejects_both_extremes() {
        let mut filter = BiquadFilter::new(FilterKind::Bandpass, 2_000.0, 0.2, 44_100);
        let dc = run(&mut filter, |_| 1.0, 4_000);
        assert!(dc.last().copied().unwrap_or_default().abs() < 1e-3);

        filter.reset();
        let nyquist = run(&mut filter, |index| if index % 2 == 0 { 1.0 } else { -1.0 }, 4_000);
        let tail_peak = nyquist[3_000..].iter().fold(0.0_f64, |peak, v| peak.max(v.abs()));
        assert!(tail_peak < 0.05, "bandpass should reject nyquist, got {tail_peak}");
    }

    #[test]
    fn resonance_maps_to_q() {
        assert!((resonance_to_q(0.0) - FRAC_1_SQRT_2).abs() < 1e-12);
        assert!((resonance_to_q(1.0) - (FRAC_1_SQRT_2 + 10.0)).abs() < 1e-12);
        assert!((resonance_to_q(7.0) - resonance_to_q(1.0)).abs() < 1e-12);
    }

    #[test]
    fn reset_zeroes_history() {
        let mut filter = BiquadFilter::new(FilterKind::Lowpass, 800.0, 0.5, 44_100);
        run(&mut filter, |index| (index as f64 * 0.1).sin(), 100);
        assert_ne!(filter.state(), (0.0, 0.0));
        filter.reset();
        assert_eq!(filter.state(), (0.0, 0.0));
    }

    #[test]
    fn set_cutoff_keeps_history() {
        let mut filter = BiquadFilter::new(FilterKind::Lowpass, 800.0, 0.0, 44_100);
        run(&mut filter, |_| 0.5, 10);
        let before = filter.state();
        filter.set_cutoff(2_000.0);
        assert_eq!(filter.state(), before);
        assert!((filter.cutoff() - 2_000.0).abs() < 1e-12);
    }

    #[test]
    fn cutoff_is_clamped_below_nyquist() {
        let mut filter = BiquadFilter::new(FilterKind::Lowpass, 90_000.0, 1.0, 44_100);
        assert!(filter.cutoff() < 22_050.0);
        let output = run(&mut filter, |index| if index % 3 == 0 { 1.0 } else { -0.5 }, 100);
        assert!(output.iter().all(|sample| sample.is_finite()));

        filter.set_cutoff(f64::NAN);
        assert!((filter.cutoff() - DEFAULT_CUTOFF_HZ).abs() < 1e-12);
    }
}
