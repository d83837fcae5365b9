// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use crate::math::Vect;

/// Planar rotation stored as sine and cosine of the angle.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Rotation {
    s: f64,
    c: f64,
}

impl Rotation {
    /// Rotation by zero radians.
    pub const IDENTITY: Self = Self { s: 0.0, c: 1.0 };

    /// Creates a rotation from an angle in radians.
    #[must_use]
    pub fn from_angle(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self { s, c }
    }

    /// Angle in radians, in `(-π, π]`.
    #[must_use]
    pub fn angle(&self) -> f64 {
        self.s.atan2(self.c)
    }

    /// Sine of the angle.
    #[must_use]
    pub fn sin(&self) -> f64 {
        self.s
    }

    /// Cosine of the angle.
    #[must_use]
    pub fn cos(&self) -> f64 {
        self.c
    }

    /// Rotates `v` by this rotation.
    #[must_use]
    pub fn rotate(&self, v: Vect) -> Vect {
        Vect::new(v.x * self.c - v.y * self.s, v.x * self.s + v.y * self.c)
    }

    /// Rotates `v` by the inverse of this rotation.
    #[must_use]
    pub fn unrotate(&self, v: Vect) -> Vect {
        Vect::new(v.x * self.c + v.y * self.s, -v.x * self.s + v.y * self.c)
    }
}

impl Default for Rotation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Rigid 2D transform: rotation about the origin followed by translation.
///
/// `position` is the body's center of mass in world space; shapes store their
/// geometry in body-local coordinates and are placed with [`Transform::apply`].
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Transform {
    /// World-space translation.
    pub position: Vect,
    rotation: Rotation,
}

impl Transform {
    /// Identity transform (no translation, no rotation).
    #[must_use]
    pub const fn identity() -> Self {
        Self {
            position: Vect::ZERO,
            rotation: Rotation::IDENTITY,
        }
    }

    /// Creates a transform from a position and an angle in radians.
    #[must_use]
    pub fn new(position: Vect, angle: f64) -> Self {
        Self {
            position,
            rotation: Rotation::from_angle(angle),
        }
    }

    /// Rotation component.
    #[must_use]
    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Angle in radians.
    #[must_use]
    pub fn angle(&self) -> f64 {
        self.rotation.angle()
    }

    /// Replaces the rotation with one of `angle` radians.
    pub fn set_angle(&mut self, angle: f64) {
        self.rotation = Rotation::from_angle(angle);
    }

    /// Maps a body-local point into world space.
    #[must_use]
    pub fn apply(&self, local: Vect) -> Vect {
        self.rotation.rotate(local) + self.position
    }

    /// Maps a world-space point into body-local coordinates.
    #[must_use]
    pub fn apply_inverse(&self, world: Vect) -> Vect {
        self.rotation.unrotate(world - self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f64::consts::FRAC_PI_2;

    #[test]
    fn quarter_turn_maps_x_to_y() {
        let xf = Transform::new(Vect::new(1.0, 1.0), FRAC_PI_2);
        let p = xf.apply(Vect::UNIT_X);
        assert!((p.x - 1.0).abs() < 1e-12);
        assert!((p.y - 2.0).abs() < 1e-12);
        let back = xf.apply_inverse(p);
        assert!((back - Vect::UNIT_X).length() < 1e-12);
    }

    #[test]
    fn angle_round_trips_within_range() {
        let mut xf = Transform::identity();
        xf.set_angle(1.25);
        assert!((xf.angle() - 1.25).abs() < 1e-12);
    }
}
