// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Solver configuration owned by each [`Space`](crate::Space).

/// Default number of sequential-impulse passes per step.
pub const DEFAULT_ITERATIONS: usize = 10;

/// Default penetration allowed before position correction kicks in.
pub const DEFAULT_COLLISION_SLOP: f64 = 0.01;

/// Default fraction of penetration left uncorrected after one second.
///
/// `0.9^60`: at 60 Hz, 10% of the excess overlap is pushed out per step.
pub const DEFAULT_COLLISION_BIAS: f64 = 0.001_797_010_3;

/// Tunables read by [`Space::step`](crate::Space::step).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Settings {
    /// Gauss-Seidel passes over the arbiter list per step.
    pub iterations: usize,
    /// Penetration depth tolerated without position correction.
    pub collision_slop: f64,
    /// Fraction of excess penetration remaining after one second of
    /// correction; the per-step bias coefficient is `1 - collision_bias^dt`.
    pub collision_bias: f64,
    /// Applies bias impulses to push overlapping shapes apart.
    pub position_correction: bool,
    /// Clears force and torque accumulators after they are integrated.
    pub auto_clear_forces: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            collision_slop: DEFAULT_COLLISION_SLOP,
            collision_bias: DEFAULT_COLLISION_BIAS,
            position_correction: true,
            auto_clear_forces: true,
        }
    }
}

impl Settings {
    /// Position-bias coefficient for a step of length `dt`.
    ///
    /// Returns `0.0` when position correction is disabled.
    pub fn bias_coefficient(&self, dt: f64) -> f64 {
        if self.position_correction {
            1.0 - self.collision_bias.powf(dt)
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bias_corrects_a_tenth_per_frame_at_60hz() {
        let coef = Settings::default().bias_coefficient(1.0 / 60.0);
        assert!((coef - 0.1).abs() < 1e-9, "coef = {coef}");
    }

    #[test]
    fn disabled_correction_has_zero_bias() {
        let settings = Settings {
            position_correction: false,
            ..Settings::default()
        };
        assert_eq!(settings.bias_coefficient(1.0 / 60.0), 0.0);
    }
}
