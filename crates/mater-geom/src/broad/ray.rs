// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use crate::math::Vect;

/// Segment cast input: the ray runs from `p1` towards `p2` and is clipped at
/// `p1 + max_fraction * (p2 - p1)`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RayCastInput {
    /// Start point.
    pub p1: Vect,
    /// End point at fraction `1.0`.
    pub p2: Vect,
    /// Fraction of `p2 - p1` at which the ray currently stops.
    pub max_fraction: f64,
}

impl RayCastInput {
    /// Ray from `p1` to `p2` with `max_fraction = 1`.
    #[must_use]
    pub fn new(p1: Vect, p2: Vect) -> Self {
        Self {
            p1,
            p2,
            max_fraction: 1.0,
        }
    }

    /// Point along the ray at `fraction`.
    #[must_use]
    pub fn point_at(&self, fraction: f64) -> Vect {
        self.p1 + (self.p2 - self.p1).scale(fraction)
    }
}
