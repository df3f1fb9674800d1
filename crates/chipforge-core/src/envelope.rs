use serde::{Deserialize, Serialize};

/// Linear attack/decay/sustain/release amplitude envelope. Times are seconds, sustain is a level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Envelope {
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            attack: 0.0,
            decay: 0.0,
            sustain: 1.0,
            release: 0.0,
        }
    }
}

impl Envelope {
    #[must_use]
    pub fn new(attack: f64, decay: f64, sustain: f64, release: f64) -> Self {
        Self {
            attack,
            decay,
            sustain,
            release,
        }
    }

    /// Amplitude multiplier at `elapsed` seconds for a note held for `hold` seconds.
    ///
    /// The release ramp starts from whatever level the held phase had reached at `hold`,
    /// so notes released mid-attack fade from their partial level rather than from sustain.
    #[must_use]
    pub fn level(&self, elapsed: f64, hold: f64) -> f64 {
        if elapsed < 0.0 {
            return 0.0;
        }
        if elapsed < hold {
            return self.held_level(elapsed);
        }
        if self.release <= 0.0 {
            return 0.0;
        }

        let released = elapsed - hold;
        if released >= self.release {
            return 0.0;
        }
        self.held_level(hold) * (1.0 - released / self.release)
    }

    fn held_level(&self, elapsed: f64) -> f64 {
        let sustain = self.sustain.clamp(0.0, 1.0);
        if elapsed < self.attack {
            return elapsed / self.attack;
        }

        let decay_elapsed = elapsed - self.attack.max(0.0);
        if decay_elapsed < self.decay {
            let progress = decay_elapsed / self.decay;
            return 1.0 - progress * (1.0 - sustain);
        }
        sustain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-10;

    #[test]
    fn attack_ramps_linearly() {
        let env = Envelope::new(0.1, 0.0, 1.0, 0.0);
        assert!((env.level(0.05, 1.0) - 0.5).abs() < EPSILON);
        assert!((env.level(0.1, 1.0) - 1.0).abs() < EPSILON);
    }

    #[test]
    fn zero_attack_starts_at_full_level() {
        let env = Envelope::new(0.0, 0.0, 0.6, 0.0);
        assert!((env.level(0.0, 1.0) - 0.6).abs() < EPSILON);
    }

    #[test]
    fn decay_ramps_toward_sustain() {
        let env = Envelope::new(0.0, 0.1, 0.5, 0.0);
        assert!((env.level(0.05, 1.0) - 0.75).abs() < EPSILON);
        assert!((env.level(0.5, 1.0) - 0.5).abs() < EPSILON);
    }

    #[test]
    fn negative_time_is_silent() {
        let env = Envelope::new(0.0, 0.0, 1.0, 0.2);
        assert!(env.level(-0.01, 1.0).abs() < EPSILON);
    }

    #[test]
    fn release_starts_from_level_at_note_off() {
        let env = Envelope::new(0.2, 0.1, 0.5, 0.1);
        let hold = 0.1;
        let at_release = env.level(hold - 1e-9, hold);
        assert!((at_release - 0.5).abs() < 1e-6, "mid-attack level should be 0.5");

        let mut previous = f64::MAX;
        for step in 0..=100 {
            let elapsed = hold + f64::from(step) * 0.001;
            let level = env.level(elapsed, hold);
            assert!(level <= 0.5 + EPSILON, "release exceeded note-off level");
            assert!(level <= previous + EPSILON, "release must not rise");
            previous = level;
        }
        assert!(env.level(hold + 0.1, hold).abs() < EPSILON);
    }

    #[test]
    fn zero_release_cuts_immediately() {
        let env = Envelope::new(0.0, 0.0, 1.0, 0.0);
        assert!(env.level(1.0, 1.0).abs() < EPSILON);
        assert!((env.level(0.999, 1.0) - 1.0).abs() < EPSILON);
    }
}
