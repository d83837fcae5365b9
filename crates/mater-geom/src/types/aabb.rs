// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use crate::broad::ray::RayCastInput;
use crate::math::{Vect, EPSILON};

/// Axis-aligned bounding box in world coordinates.
///
/// Invariants:
/// - `min` components are less than or equal to `max` components.
/// - Values are `f64` and represent meters in world space.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Aabb {
    min: Vect,
    max: Vect,
}

impl Aabb {
    /// Constructs an AABB from its minimum and maximum corners.
    ///
    /// # Panics
    /// Panics if any component of `min` is greater than its counterpart in `max`.
    #[must_use]
    pub fn new(min: Vect, max: Vect) -> Self {
        assert!(min.x <= max.x && min.y <= max.y, "invalid AABB: min > max");
        Self { min, max }
    }

    /// Constructs an AABB without checking corner order.
    ///
    /// Non-finite components pass through unchanged; see [`Aabb::is_finite`].
    #[must_use]
    pub const fn from_corners_unchecked(min: Vect, max: Vect) -> Self {
        Self { min, max }
    }

    /// Returns the minimum corner.
    #[must_use]
    pub fn min(&self) -> Vect {
        self.min
    }

    /// Returns the maximum corner.
    #[must_use]
    pub fn max(&self) -> Vect {
        self.max
    }

    /// Builds an AABB centered at `center` with half-extents `hx, hy`.
    #[must_use]
    pub fn from_center_half_extents(center: Vect, hx: f64, hy: f64) -> Self {
        let he = Vect::new(hx, hy);
        Self::new(center - he, center + he)
    }

    /// Builds the minimal AABB that contains all `points`.
    ///
    /// # Panics
    /// Panics if `points` is empty.
    #[must_use]
    pub fn from_points(points: &[Vect]) -> Self {
        assert!(!points.is_empty(), "from_points requires at least one point");
        let mut min = points[0];
        let mut max = points[0];
        for p in &points[1..] {
            min = min.min(*p);
            max = max.max(*p);
        }
        Self { min, max }
    }

    /// Center point of the box.
    #[must_use]
    pub fn center(&self) -> Vect {
        (self.min + self.max).scale(0.5)
    }

    /// `true` when every corner component is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// Half-extents of the box.
    #[must_use]
    pub fn extents(&self) -> Vect {
        (self.max - self.min).scale(0.5)
    }

    /// Perimeter of the box; the tree's insertion cost metric.
    #[must_use]
    pub fn perimeter(&self) -> f64 {
        2.0 * ((self.max.x - self.min.x) + (self.max.y - self.min.y))
    }

    /// Returns `true` if this AABB overlaps another (inclusive on faces).
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        // Inclusive to treat touching faces as overlap for broad-phase pairing.
        !(self.max.x < other.min.x
            || self.min.x > other.max.x
            || self.max.y < other.min.y
            || self.min.y > other.max.y)
    }

    /// Returns `true` if `other` lies entirely inside this box (inclusive).
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && other.max.x <= self.max.x
            && other.max.y <= self.max.y
    }

    /// Returns `true` if `point` lies inside this box (inclusive).
    #[must_use]
    pub fn contains_point(&self, point: Vect) -> bool {
        self.min.x <= point.x && point.x <= self.max.x && self.min.y <= point.y && point.y <= self.max.y
    }

    /// Returns the union of two AABBs.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Inflates the box by a uniform margin `m` in all directions.
    #[must_use]
    pub fn inflate(&self, m: f64) -> Self {
        let delta = Vect::new(m, m);
        Self {
            min: self.min - delta,
            max: self.max + delta,
        }
    }

    /// Stretches the box along `d`: the side facing the motion moves by `d`,
    /// the trailing side stays put.
    #[must_use]
    pub fn swept(&self, d: Vect) -> Self {
        let mut out = *self;
        if d.x < 0.0 {
            out.min.x += d.x;
        } else {
            out.max.x += d.x;
        }
        if d.y < 0.0 {
            out.min.y += d.y;
        } else {
            out.max.y += d.y;
        }
        out
    }

    /// Slab test of the segment `input.p1 → input.p2` against this box.
    ///
    /// Returns the entry fraction in `[0, input.max_fraction]` along the
    /// segment, or `None` when the segment misses. A start point inside the box
    /// reports fraction `0`.
    #[must_use]
    pub fn ray_cast(&self, input: &RayCastInput) -> Option<f64> {
        let p = input.p1;
        let d = input.p2 - input.p1;
        let mut tmin = f64::NEG_INFINITY;
        let mut tmax = f64::INFINITY;

        for (origin, dir, lo, hi) in [
            (p.x, d.x, self.min.x, self.max.x),
            (p.y, d.y, self.min.y, self.max.y),
        ] {
            if dir.abs() < EPSILON {
                // Parallel to this slab.
                if origin < lo || hi < origin {
                    return None;
                }
            } else {
                let inv = 1.0 / dir;
                let mut t1 = (lo - origin) * inv;
                let mut t2 = (hi - origin) * inv;
                if t1 > t2 {
                    core::mem::swap(&mut t1, &mut t2);
                }
                tmin = tmin.max(t1);
                tmax = tmax.min(t2);
                if tmin > tmax {
                    return None;
                }
            }
        }

        if tmax < 0.0 || input.max_fraction < tmin {
            return None;
        }
        Some(tmin.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> Aabb {
        Aabb::new(Vect::new(0.0, 0.0), Vect::new(1.0, 1.0))
    }

    #[test]
    fn touching_faces_overlap() {
        let a = unit_box();
        let b = Aabb::new(Vect::new(1.0, 0.0), Vect::new(2.0, 1.0));
        assert!(a.overlaps(&b));
        let c = Aabb::new(Vect::new(1.01, 0.0), Vect::new(2.0, 1.0));
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn swept_extends_only_leading_side() {
        let s = unit_box().swept(Vect::new(-2.0, 3.0));
        assert_eq!(s.min(), Vect::new(-2.0, 0.0));
        assert_eq!(s.max(), Vect::new(1.0, 4.0));
    }

    #[test]
    fn slab_ray_hits_at_entry_fraction() {
        let input = RayCastInput::new(Vect::new(-1.0, 0.5), Vect::new(3.0, 0.5));
        let t = unit_box().ray_cast(&input);
        assert_eq!(t, Some(0.25));
    }

    #[test]
    fn slab_ray_respects_max_fraction() {
        let mut input = RayCastInput::new(Vect::new(-1.0, 0.5), Vect::new(3.0, 0.5));
        input.max_fraction = 0.2;
        assert_eq!(unit_box().ray_cast(&input), None);
    }

    #[test]
    fn unchecked_corners_keep_nan() {
        let nan = Aabb::from_corners_unchecked(Vect::new(f64::NAN, 0.0), Vect::new(1.0, 1.0));
        assert!(!nan.is_finite());
        assert!(unit_box().is_finite());
    }

    #[test]
    fn ray_entry_point_lies_on_the_box() {
        let input = RayCastInput::new(Vect::new(-1.0, 0.5), Vect::new(3.0, 0.5));
        let t = unit_box().ray_cast(&input).expect("hit");
        let entry = input.point_at(t);
        assert!(unit_box().contains_point(entry));
        assert!(!unit_box().contains_point(input.point_at(t - 0.01)));
    }

    #[test]
    #[should_panic(expected = "invalid AABB")]
    fn inverted_box_panics() {
        let _ = Aabb::new(Vect::new(1.0, 0.0), Vect::new(0.0, 1.0));
    }
}
