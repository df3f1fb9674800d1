use std::f64::consts::TAU;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub const DEFAULT_DUTY_CYCLE: f64 = 0.5;

/// Oscillator shape. Pulse carries its duty cycle, already normalized into (0, 1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Waveform {
    Sine,
    Square,
    Triangle,
    Sawtooth,
    Noise,
    Pulse { duty: f64 },
}

impl Waveform {
    /// Resolves a waveform by name. Unknown names fall back to sine.
    #[must_use]
    pub fn from_name(name: &str, duty: f64) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "square" => Self::Square,
            "triangle" => Self::Triangle,
            "sawtooth" | "saw" => Self::Sawtooth,
            "noise" => Self::Noise,
            "pulse" => Self::pulse(duty),
            _ => Self::Sine,
        }
    }

    #[must_use]
    pub fn pulse(duty: f64) -> Self {
        Self::Pulse {
            duty: normalize_duty(duty),
        }
    }

    /// Amplitude in [-1, 1] at `phase` in [0, 1). Only `Noise` draws from `noise`.
    pub fn sample(self, phase: f64, noise: &mut NoiseSource) -> f64 {
        match self {
            Self::Sine => (TAU * phase).sin(),
            Self::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Self::Triangle => 4.0 * (phase - 0.5).abs() - 1.0,
            Self::Sawtooth => 2.0 * phase - 1.0,
            Self::Noise => noise.next_sample(),
            Self::Pulse { duty } => {
                if phase < normalize_duty(duty) {
                    1.0
                } else {
                    -1.0
                }
            }
        }
    }
}

fn normalize_duty(duty: f64) -> f64 {
    if duty > 0.0 && duty < 1.0 {
        duty
    } else {
        DEFAULT_DUTY_CYCLE
    }
}

/// Random source behind the noise oscillator. Seed it to make renders reproducible.
#[derive(Debug, Clone)]
pub struct NoiseSource {
    rng: ChaCha8Rng,
}

impl NoiseSource {
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Picks a seeded source when `seed` is set, entropy otherwise.
    #[must_use]
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::seeded)
    }

    pub fn next_sample(&mut self) -> f64 {
        self.rng.gen_range(-1.0..=1.0)
    }
}
