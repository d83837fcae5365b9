// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Persistent contact state for one shape pair and its impulse solver.
//!
//! Impulses are expressed in the contact frame `(n, t)` with `t = perp(n)`.
//! Body A receives `-j`, body B receives `+j`. Accumulated normal impulses are
//! clamped to be non-negative (contacts only push) and friction is clamped to
//! the Coulomb cone `|jt| <= μ jn`.

use mater_geom::Vect;

use crate::body::{Body, BodyId};
use crate::narrow_phase::ManifoldPoint;
use crate::shape::{Shape, ShapeId};

/// Slot index of an arbiter in the contact manager's arena.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArbiterId(pub(crate) usize);

/// One solved contact point.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Contact {
    position: Vect,
    normal: Vect,
    dist: f64,
    feature_id: u64,

    // Anchors relative to each body's centre of mass.
    r1: Vect,
    r2: Vect,
    n_mass: f64,
    t_mass: f64,
    bounce: f64,

    jn_acc: f64,
    jt_acc: f64,
    j_bias: f64,
    bias: f64,
}

impl Contact {
    fn from_point(point: &ManifoldPoint) -> Self {
        Self {
            position: point.position,
            normal: point.normal,
            dist: point.dist,
            feature_id: point.feature_id,
            r1: Vect::ZERO,
            r2: Vect::ZERO,
            n_mass: 0.0,
            t_mass: 0.0,
            bounce: 0.0,
            jn_acc: 0.0,
            jt_acc: 0.0,
            j_bias: 0.0,
            bias: 0.0,
        }
    }

    /// World-space contact position.
    pub fn position(&self) -> Vect {
        self.position
    }

    /// Unit normal from shape A to shape B.
    pub fn normal(&self) -> Vect {
        self.normal
    }

    /// Signed separation; negative while penetrating.
    pub fn dist(&self) -> f64 {
        self.dist
    }

    /// Feature pair identifier reported by the narrow phase.
    pub fn feature_id(&self) -> u64 {
        self.feature_id
    }

    /// Accumulated normal impulse.
    pub fn normal_impulse(&self) -> f64 {
        self.jn_acc
    }

    /// Accumulated friction impulse.
    pub fn tangent_impulse(&self) -> f64 {
        self.jt_acc
    }

    /// Accumulated position-bias impulse of the current step.
    pub fn bias_impulse(&self) -> f64 {
        self.j_bias
    }
}

/// Contact state between two shapes across steps.
///
/// Arbiters live in the contact manager's arena and form an intrusive doubly
/// linked list through `next`/`prev`.
#[derive(Debug, Clone, PartialEq)]
pub struct Arbiter {
    shape_a: ShapeId,
    shape_b: ShapeId,
    contacts: Vec<Contact>,
    restitution: f64,
    friction: f64,
    is_sensor: bool,
    pub(crate) next: Option<ArbiterId>,
    pub(crate) prev: Option<ArbiterId>,
}

impl Arbiter {
    pub(crate) fn new(id_a: ShapeId, a: &Shape, id_b: ShapeId, b: &Shape) -> Self {
        Self {
            shape_a: id_a,
            shape_b: id_b,
            contacts: Vec::new(),
            restitution: a.restitution * b.restitution,
            friction: a.friction * b.friction,
            is_sensor: a.is_sensor || b.is_sensor,
            next: None,
            prev: None,
        }
    }

    /// First shape of the pair.
    pub fn shape_a(&self) -> ShapeId {
        self.shape_a
    }

    /// Second shape of the pair.
    pub fn shape_b(&self) -> ShapeId {
        self.shape_b
    }

    /// Body owning shape A.
    pub fn body_a(&self) -> BodyId {
        self.shape_a.body
    }

    /// Body owning shape B.
    pub fn body_b(&self) -> BodyId {
        self.shape_b.body
    }

    /// Current manifold.
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Combined restitution.
    pub fn restitution(&self) -> f64 {
        self.restitution
    }

    /// Combined friction.
    pub fn friction(&self) -> f64 {
        self.friction
    }

    /// Whether either shape is a sensor. Sensor arbiters are never solved.
    pub fn is_sensor(&self) -> bool {
        self.is_sensor
    }

    /// Sum of the accumulated impulses applied to body B, in world space.
    pub fn total_impulse(&self) -> Vect {
        self.contacts.iter().fold(Vect::ZERO, |sum, c| {
            sum + c.normal.rotate(Vect::new(c.jn_acc, c.jt_acc))
        })
    }

    /// Replaces the manifold, carrying accumulated impulses over for points
    /// whose feature id persists.
    pub(crate) fn update(&mut self, points: &[ManifoldPoint]) {
        let contacts = points
            .iter()
            .map(|point| {
                let mut contact = Contact::from_point(point);
                if let Some(old) = self.contacts.iter().find(|c| c.feature_id == point.feature_id) {
                    contact.jn_acc = old.jn_acc;
                    contact.jt_acc = old.jt_acc;
                }
                contact
            })
            .collect();
        self.contacts = contacts;
    }

    /// Computes anchors, effective masses, bias and bounce targets.
    pub(crate) fn pre_step(&mut self, a: &Body, b: &Body, inv_dt: f64, slop: f64, bias_coef: f64) {
        let restitution = self.restitution;
        for con in &mut self.contacts {
            con.r1 = con.position - a.position();
            con.r2 = con.position - b.position();

            con.n_mass = 1.0 / k_scalar(a, b, con.r1, con.r2, con.normal);
            con.t_mass = 1.0 / k_scalar(a, b, con.r1, con.r2, con.normal.perp());

            con.bias = -bias_coef * inv_dt * (con.dist + slop).min(0.0);
            con.j_bias = 0.0;

            con.bounce = relative_velocity(a, b, con.r1, con.r2).dot(con.normal) * restitution;
        }
    }

    /// Re-applies last step's impulses scaled by `dt_coef`.
    pub(crate) fn apply_cached_impulse(&self, a: &mut Body, b: &mut Body, dt_coef: f64) {
        for con in &self.contacts {
            let j = con.normal.rotate(Vect::new(con.jn_acc, con.jt_acc));
            apply_impulses(a, b, con.r1, con.r2, j.scale(dt_coef));
        }
    }

    /// One Gauss-Seidel pass over this arbiter's contacts.
    pub(crate) fn apply_impulse(&mut self, a: &mut Body, b: &mut Body, position_correction: bool) {
        let friction = self.friction;
        for con in &mut self.contacts {
            let n = con.normal;
            let (r1, r2) = (con.r1, con.r2);

            if position_correction {
                let vbn = (b.bias_velocity_at(r2) - a.bias_velocity_at(r1)).dot(n);
                let jbn = (con.bias - vbn) * con.n_mass;
                let jbn_old = con.j_bias;
                con.j_bias = (jbn_old + jbn).max(0.0);
                apply_bias_impulses(a, b, r1, r2, n.scale(con.j_bias - jbn_old));
            }

            let vr = relative_velocity(a, b, r1, r2);
            let vrn = vr.dot(n);
            let vrt = vr.dot(n.perp());

            let jn = -(con.bounce + vrn) * con.n_mass;
            let jn_old = con.jn_acc;
            con.jn_acc = (jn_old + jn).max(0.0);

            let jt_max = friction * con.jn_acc;
            let jt = -vrt * con.t_mass;
            let jt_old = con.jt_acc;
            con.jt_acc = (jt_old + jt).max(-jt_max).min(jt_max);

            let j = n.rotate(Vect::new(con.jn_acc - jn_old, con.jt_acc - jt_old));
            apply_impulses(a, b, r1, r2, j);
        }
    }
}

fn relative_velocity(a: &Body, b: &Body, r1: Vect, r2: Vect) -> Vect {
    b.velocity_at(r2) - a.velocity_at(r1)
}

/// Inverse effective mass along `n`.
fn k_scalar(a: &Body, b: &Body, r1: Vect, r2: Vect, n: Vect) -> f64 {
    let rcn1 = r1.cross(n);
    let rcn2 = r2.cross(n);
    a.inv_mass() + b.inv_mass() + a.inv_inertia() * rcn1 * rcn1 + b.inv_inertia() * rcn2 * rcn2
}

fn apply_impulses(a: &mut Body, b: &mut Body, r1: Vect, r2: Vect, j: Vect) {
    a.apply_impulse(-j, r1);
    b.apply_impulse(j, r2);
}

fn apply_bias_impulses(a: &mut Body, b: &mut Body, r1: Vect, r2: Vect, j: Vect) {
    a.apply_bias_impulse(-j, r1);
    b.apply_bias_impulse(j, r2);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodySet;

    fn pair() -> (BodySet, BodyId, BodyId, Arbiter) {
        let mut bodies = BodySet::default();
        let a_shape = Shape::circle(0.5, Vect::ZERO).with_restitution(1.0);
        let b_shape = Shape::circle(0.5, Vect::ZERO).with_restitution(1.0);
        let a = bodies.insert(
            Body::new_dynamic(1.0, 1.0)
                .unwrap()
                .at(Vect::new(-0.45, 0.0), 0.0)
                .with_shape(a_shape.clone()),
        );
        let b = bodies.insert(
            Body::new_dynamic(1.0, 1.0)
                .unwrap()
                .at(Vect::new(0.45, 0.0), 0.0)
                .with_shape(b_shape.clone()),
        );
        let arb = Arbiter::new(
            ShapeId { body: a, index: 0 },
            &a_shape,
            ShapeId { body: b, index: 0 },
            &b_shape,
        );
        (bodies, a, b, arb)
    }

    fn point(feature_id: u64) -> ManifoldPoint {
        ManifoldPoint {
            position: Vect::ZERO,
            normal: Vect::UNIT_X,
            dist: -0.1,
            feature_id,
        }
    }

    #[test]
    fn materials_combine_multiplicatively() {
        let a = Shape::circle(1.0, Vect::ZERO).with_friction(0.5).with_restitution(0.5);
        let b = Shape::circle(1.0, Vect::ZERO).with_friction(0.4).with_sensor(true);
        let id = ShapeId {
            body: BodySet::default().insert(Body::new_static()),
            index: 0,
        };
        let arb = Arbiter::new(id, &a, id, &b);
        assert!((arb.friction() - 0.2).abs() < 1e-12);
        assert_eq!(arb.restitution(), 0.0);
        assert!(arb.is_sensor());
    }

    #[test]
    fn update_keeps_impulses_only_for_persisting_features() {
        let (_, _, _, mut arb) = pair();
        arb.update(&[point(1), point(2)]);
        arb.contacts[0].jn_acc = 3.0;
        arb.contacts[1].jn_acc = 4.0;

        arb.update(&[point(2), point(7)]);
        assert_eq!(arb.contacts()[0].normal_impulse(), 4.0);
        assert_eq!(arb.contacts()[1].normal_impulse(), 0.0);
    }

    #[test]
    fn approaching_elastic_pair_swaps_velocities() {
        let (mut bodies, a, b, mut arb) = pair();
        arb.update(&[point(0)]);
        {
            let (ba, bb) = bodies.pair_mut(a, b).unwrap();
            ba.velocity = Vect::new(1.0, 0.0);
            bb.velocity = Vect::new(-1.0, 0.0);
            arb.pre_step(ba, bb, 60.0, 0.01, 0.0);
            for _ in 0..10 {
                arb.apply_impulse(ba, bb, false);
            }
        }
        let va = bodies.get(a).unwrap().velocity;
        let vb = bodies.get(b).unwrap().velocity;
        assert!((va.x + 1.0).abs() < 1e-9, "va = {va:?}");
        assert!((vb.x - 1.0).abs() < 1e-9, "vb = {vb:?}");
        assert!((va + vb).length() < 1e-12);
        assert!(arb.contacts()[0].normal_impulse() > 0.0);
    }

    #[test]
    fn separating_pair_receives_no_impulse() {
        let (mut bodies, a, b, mut arb) = pair();
        arb.update(&[point(0)]);
        let (ba, bb) = bodies.pair_mut(a, b).unwrap();
        ba.velocity = Vect::new(-1.0, 0.0);
        bb.velocity = Vect::new(1.0, 0.0);
        arb.pre_step(ba, bb, 60.0, 0.01, 0.0);
        arb.apply_impulse(ba, bb, false);
        assert_eq!(ba.velocity, Vect::new(-1.0, 0.0));
        assert_eq!(arb.contacts()[0].normal_impulse(), 0.0);
    }

    #[test]
    fn bias_impulse_moves_only_bias_velocity() {
        let (mut bodies, a, b, mut arb) = pair();
        arb.update(&[point(0)]);
        let (ba, bb) = bodies.pair_mut(a, b).unwrap();
        arb.pre_step(ba, bb, 60.0, 0.01, 0.1);
        arb.apply_impulse(ba, bb, true);
        assert_eq!(ba.velocity, Vect::ZERO);
        assert!(ba.v_bias.x < 0.0);
        assert!(bb.v_bias.x > 0.0);
        assert!(arb.contacts()[0].bias_impulse() > 0.0);
    }

    #[test]
    fn cached_impulse_scales_with_dt_ratio() {
        let (mut bodies, a, b, mut arb) = pair();
        arb.update(&[point(0)]);
        arb.contacts[0].jn_acc = 2.0;
        let (ba, bb) = bodies.pair_mut(a, b).unwrap();
        arb.pre_step(ba, bb, 60.0, 0.01, 0.0);
        arb.apply_cached_impulse(ba, bb, 0.5);
        assert!((bb.velocity.x - 1.0).abs() < 1e-12);
        assert!((ba.velocity.x + 1.0).abs() < 1e-12);
    }
}
