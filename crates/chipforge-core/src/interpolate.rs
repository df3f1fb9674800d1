use serde::{Deserialize, Serialize};

/// Shape of a parameter sweep between two values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Curve {
    #[default]
    Linear,
    #[serde(alias = "exp")]
    Exponential,
    #[serde(alias = "log")]
    Logarithmic,
}

/// Value at progress `t` along `curve` from `start` to `end`. Exactly `start`/`end` at the ends.
#[must_use]
pub fn interpolate(start: f64, end: f64, t: f64, curve: Curve) -> f64 {
    if t <= 0.0 {
        return start;
    }
    if t >= 1.0 {
        return end;
    }

    match curve {
        Curve::Linear => lerp(start, end, t),
        Curve::Exponential => {
            if start <= 0.0 {
                end * t
            } else {
                start * (end / start).powf(t)
            }
        }
        Curve::Logarithmic => {
            let remapped = (9.0 * t).ln_1p() / 10_f64.ln();
            lerp(start, end, remapped)
        }
    }
}

fn lerp(start: f64, end: f64, t: f64) -> f64 {
    start + (end - start) * t
}
