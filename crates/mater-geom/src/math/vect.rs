// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use core::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

use crate::math::EPSILON;

/// 2D vector used for positions, velocities, forces and impulses.
///
/// * Components are world-space metres (or metres per second, newtons, ...)
///   depending on the calling context.
/// * Angular quantities are scalars in 2D; [`Vect::cross`] returns the z
///   component of the 3D cross product and [`Vect::perp`] is the 90° rotation
///   used to turn an angular velocity into a point velocity.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vect {
    /// Horizontal component.
    pub x: f64,
    /// Vertical component.
    pub y: f64,
}

impl Vect {
    /// The zero vector.
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Unit vector pointing along the positive X axis.
    pub const UNIT_X: Self = Self::new(1.0, 0.0);

    /// Unit vector pointing along the positive Y axis.
    pub const UNIT_Y: Self = Self::new(0.0, 1.0);

    /// Creates a vector from components.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns the components as an array.
    pub fn to_array(self) -> [f64; 2] {
        [self.x, self.y]
    }

    /// Scales the vector by a scalar.
    pub fn scale(self, scalar: f64) -> Self {
        Self::new(self.x * scalar, self.y * scalar)
    }

    /// Dot product with another vector.
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// Z component of the 3D cross product `self × other`.
    pub fn cross(self, other: Self) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Counter-clockwise perpendicular `(-y, x)`.
    pub fn perp(self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Complex multiplication: rotates `self` by the unit vector `rot`.
    ///
    /// Used to express a `(normal, tangent)` impulse pair in world space.
    pub fn rotate(self, rot: Self) -> Self {
        Self::new(self.x * rot.x - self.y * rot.y, self.x * rot.y + self.y * rot.x)
    }

    /// Component-wise minimum.
    pub fn min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y))
    }

    /// Component-wise maximum.
    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y))
    }

    /// Component-wise absolute value.
    pub fn abs(self) -> Self {
        Self::new(self.x.abs(), self.y.abs())
    }

    /// Vector length (magnitude).
    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Squared magnitude of the vector.
    pub fn length_squared(self) -> f64 {
        self.dot(self)
    }

    /// Distance between two points.
    pub fn distance(self, other: Self) -> f64 {
        (self - other).length()
    }

    /// Normalises the vector, returning the zero vector if length ≤ `EPSILON`.
    pub fn normalize(self) -> Self {
        let len = self.length();
        if len <= EPSILON {
            return Self::ZERO;
        }
        self.scale(1.0 / len)
    }

    /// Returns `true` when both components are finite.
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<[f64; 2]> for Vect {
    fn from(value: [f64; 2]) -> Self {
        Self::new(value[0], value[1])
    }
}

impl Add for Vect {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl AddAssign for Vect {
    fn add_assign(&mut self, other: Self) {
        self.x += other.x;
        self.y += other.y;
    }
}

impl Sub for Vect {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

impl SubAssign for Vect {
    fn sub_assign(&mut self, other: Self) {
        self.x -= other.x;
        self.y -= other.y;
    }
}

impl Mul<f64> for Vect {
    type Output = Self;
    fn mul(self, scalar: f64) -> Self {
        self.scale(scalar)
    }
}

impl Neg for Vect {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotate_by_unit_x_is_identity() {
        let v = Vect::new(3.0, -2.0);
        assert_eq!(v.rotate(Vect::UNIT_X), v);
    }

    #[test]
    fn perp_is_orthogonal_and_ccw() {
        let v = Vect::new(2.0, 1.0);
        assert_eq!(v.dot(v.perp()), 0.0);
        assert!(v.cross(v.perp()) > 0.0);
    }

    #[test]
    fn normalize_degenerate_is_zero() {
        assert_eq!(Vect::new(1e-12, 0.0).normalize(), Vect::ZERO);
    }
}
