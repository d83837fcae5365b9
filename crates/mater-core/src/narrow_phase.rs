// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Exact shape-vs-shape tests producing contact manifolds.
//!
//! The contact manager treats the narrow phase as a pure function of the two
//! shapes and their current transforms. Conventions for every point:
//! - `normal` is unit length and points from shape A towards shape B.
//! - `dist` is the signed separation along the normal; negative means overlap.
//! - `feature_id` names the geometric feature pair that produced the point so
//!   accumulated impulses can be matched across steps.

use mater_geom::{Transform, Vect};

use crate::shape::{Shape, ShapeKind};

/// One contact point of a manifold.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ManifoldPoint {
    /// World-space contact position.
    pub position: Vect,
    /// Unit normal from A to B.
    pub normal: Vect,
    /// Signed separation (negative when penetrating).
    pub dist: f64,
    /// Feature pair identifier, stable while the same features touch.
    pub feature_id: u64,
}

/// Produces contact manifolds for shape pairs.
///
/// An empty manifold means the shapes are separated. Unsupported pairs
/// should also return an empty manifold.
pub trait NarrowPhase {
    /// Contacts between `a` placed by `xf_a` and `b` placed by `xf_b`.
    fn collide(&self, a: &Shape, xf_a: &Transform, b: &Shape, xf_b: &Transform)
        -> Vec<ManifoldPoint>;
}

/// Circle–circle and circle–segment collision.
///
/// Segment–segment pairs never produce contacts.
#[derive(Debug, Copy, Clone, Default)]
pub struct BasicNarrowPhase;

impl NarrowPhase for BasicNarrowPhase {
    fn collide(
        &self,
        a: &Shape,
        xf_a: &Transform,
        b: &Shape,
        xf_b: &Transform,
    ) -> Vec<ManifoldPoint> {
        let point = match (a.kind, b.kind) {
            (
                ShapeKind::Circle {
                    radius: ra,
                    offset: oa,
                },
                ShapeKind::Circle {
                    radius: rb,
                    offset: ob,
                },
            ) => discs(xf_a.apply(oa), ra, xf_b.apply(ob), rb),
            (
                ShapeKind::Circle { radius, offset },
                ShapeKind::Segment {
                    a: sa,
                    b: sb,
                    radius: seg_radius,
                },
            ) => {
                let center = xf_a.apply(offset);
                let closest = closest_on_segment(center, xf_b.apply(sa), xf_b.apply(sb));
                discs(center, radius, closest, seg_radius)
            }
            (
                ShapeKind::Segment {
                    a: sa,
                    b: sb,
                    radius: seg_radius,
                },
                ShapeKind::Circle { radius, offset },
            ) => {
                let center = xf_b.apply(offset);
                let closest = closest_on_segment(center, xf_a.apply(sa), xf_a.apply(sb));
                discs(closest, seg_radius, center, radius)
            }
            (ShapeKind::Segment { .. }, ShapeKind::Segment { .. }) => None,
        };
        point.into_iter().collect()
    }
}

/// Contact between two discs, or `None` when they do not overlap.
fn discs(center_a: Vect, radius_a: f64, center_b: Vect, radius_b: f64) -> Option<ManifoldPoint> {
    let min_dist = radius_a + radius_b;
    let delta = center_b - center_a;
    let dist_sq = delta.length_squared();
    if dist_sq.is_nan() || dist_sq >= min_dist * min_dist {
        return None;
    }
    let dist = dist_sq.sqrt();
    // Coincident centres: any axis separates them.
    let normal = if dist > 0.0 {
        delta.scale(1.0 / dist)
    } else {
        Vect::UNIT_X
    };
    // Midway through the overlap region.
    let position = center_a + normal.scale(radius_a + 0.5 * (dist - min_dist));
    Some(ManifoldPoint {
        position,
        normal,
        dist: dist - min_dist,
        feature_id: 0,
    })
}

fn closest_on_segment(p: Vect, a: Vect, b: Vect) -> Vect {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= 0.0 {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab.scale(t)
}
