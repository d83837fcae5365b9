// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use core::fmt;

use mater_geom::{BroadPhase, Transform, Vect};

use crate::shape::{Shape, ShapeId};
use crate::space::SpaceError;

/// Generational handle to a body owned by a [`Space`](crate::Space).
///
/// A removed body's slot may be reused, but the generation changes, so stale
/// ids resolve to [`SpaceError::UnknownBody`] instead of aliasing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BodyId {
    index: usize,
    generation: u32,
}

impl BodyId {
    /// Arena slot of the body.
    pub const fn index(self) -> usize {
        self.index
    }
}

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "body#{}v{}", self.index, self.generation)
    }
}

/// Whether the solver may move a body.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BodyKind {
    /// Infinite mass; never integrated.
    Static,
    /// Finite mass; integrated every step.
    Dynamic,
}

/// A rigid body: transform, velocities, accumulators and mass properties.
///
/// The body origin is its centre of mass.
#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    kind: BodyKind,
    transform: Transform,
    /// Linear velocity.
    pub velocity: Vect,
    /// Angular velocity in radians per second.
    pub angular_velocity: f64,
    /// Skip gravity during force integration.
    pub ignore_gravity: bool,
    force: Vect,
    torque: f64,
    mass: f64,
    inv_mass: f64,
    inertia: f64,
    inv_inertia: f64,
    // Position-correction velocities, zeroed after every step.
    pub(crate) v_bias: Vect,
    pub(crate) w_bias: f64,
    shapes: Vec<Shape>,
}

impl Body {
    /// Creates a dynamic body at the origin.
    ///
    /// `mass` and `inertia` must be finite and strictly positive.
    pub fn new_dynamic(mass: f64, inertia: f64) -> Result<Self, SpaceError> {
        if !(mass.is_finite() && mass > 0.0) {
            return Err(SpaceError::InvalidMass { mass });
        }
        if !(inertia.is_finite() && inertia > 0.0) {
            return Err(SpaceError::InvalidInertia { inertia });
        }
        Ok(Self::with_mass(BodyKind::Dynamic, mass, inertia))
    }

    /// Creates a static body at the origin.
    pub fn new_static() -> Self {
        Self::with_mass(BodyKind::Static, f64::INFINITY, f64::INFINITY)
    }

    fn with_mass(kind: BodyKind, mass: f64, inertia: f64) -> Self {
        let (inv_mass, inv_inertia) = match kind {
            BodyKind::Static => (0.0, 0.0),
            BodyKind::Dynamic => (1.0 / mass, 1.0 / inertia),
        };
        Self {
            kind,
            transform: Transform::identity(),
            velocity: Vect::ZERO,
            angular_velocity: 0.0,
            ignore_gravity: false,
            force: Vect::ZERO,
            torque: 0.0,
            mass,
            inv_mass,
            inertia,
            inv_inertia,
            v_bias: Vect::ZERO,
            w_bias: 0.0,
            shapes: Vec::new(),
        }
    }

    /// Builder-style position setter.
    pub fn at(mut self, position: Vect, angle: f64) -> Self {
        self.transform = Transform::new(position, angle);
        self
    }

    /// Builder-style shape attachment, for bodies not yet in a space.
    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shapes.push(shape);
        self
    }

    /// Static or dynamic.
    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    /// Shorthand for `kind() == BodyKind::Static`.
    pub fn is_static(&self) -> bool {
        self.kind == BodyKind::Static
    }

    /// Current transform.
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// Position of the centre of mass.
    pub fn position(&self) -> Vect {
        self.transform.position
    }

    /// Orientation in radians.
    pub fn angle(&self) -> f64 {
        self.transform.angle()
    }

    /// Teleports the body. Proxies catch up on the next step.
    pub fn set_position(&mut self, position: Vect) {
        self.transform.position = position;
    }

    /// Sets the orientation. Proxies catch up on the next step.
    pub fn set_angle(&mut self, angle: f64) {
        self.transform.set_angle(angle);
    }

    /// Mass (`inf` for static bodies).
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Inverse mass (`0` for static bodies).
    pub fn inv_mass(&self) -> f64 {
        self.inv_mass
    }

    /// Moment of inertia (`inf` for static bodies).
    pub fn inertia(&self) -> f64 {
        self.inertia
    }

    /// Inverse moment of inertia (`0` for static bodies).
    pub fn inv_inertia(&self) -> f64 {
        self.inv_inertia
    }

    /// Accumulated force.
    pub fn force(&self) -> Vect {
        self.force
    }

    /// Accumulated torque.
    pub fn torque(&self) -> f64 {
        self.torque
    }

    /// Adds a force through the centre of mass.
    pub fn apply_force(&mut self, force: Vect) {
        self.force += force;
    }

    /// Adds a force at a world-space point, producing torque about the centre.
    pub fn apply_force_at(&mut self, force: Vect, point: Vect) {
        self.force += force;
        self.torque += (point - self.transform.position).cross(force);
    }

    /// Adds a torque.
    pub fn apply_torque(&mut self, torque: f64) {
        self.torque += torque;
    }

    /// Zeroes the force and torque accumulators.
    pub fn clear_forces(&mut self) {
        self.force = Vect::ZERO;
        self.torque = 0.0;
    }

    /// Applies an instantaneous impulse at a world-space point.
    pub fn apply_impulse_at(&mut self, impulse: Vect, point: Vect) {
        let r = point - self.transform.position;
        self.apply_impulse(impulse, r);
    }

    /// Attached shapes.
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Kinetic energy `½mv² + ½Iω²` (zero for static bodies).
    pub fn kinetic_energy(&self) -> f64 {
        if self.is_static() {
            return 0.0;
        }
        0.5 * self.mass * self.velocity.length_squared()
            + 0.5 * self.inertia * self.angular_velocity * self.angular_velocity
    }

    /// Impulse `j` applied at offset `r` from the centre of mass.
    ///
    /// Static bodies stay at rest even when `j` is not finite.
    pub(crate) fn apply_impulse(&mut self, j: Vect, r: Vect) {
        if self.is_static() {
            return;
        }
        self.velocity += j.scale(self.inv_mass);
        self.angular_velocity += self.inv_inertia * r.cross(j);
    }

    pub(crate) fn apply_bias_impulse(&mut self, j: Vect, r: Vect) {
        if self.is_static() {
            return;
        }
        self.v_bias += j.scale(self.inv_mass);
        self.w_bias += self.inv_inertia * r.cross(j);
    }

    /// `v + ω × r`.
    pub(crate) fn velocity_at(&self, r: Vect) -> Vect {
        self.velocity + r.perp().scale(self.angular_velocity)
    }

    pub(crate) fn bias_velocity_at(&self, r: Vect) -> Vect {
        self.v_bias + r.perp().scale(self.w_bias)
    }

    /// `v += dt (F / m + g)`, `ω += dt τ / I`.
    pub(crate) fn integrate_forces(&mut self, gravity: Vect, dt: f64, clear: bool) {
        let mut accel = self.force.scale(self.inv_mass);
        if !self.ignore_gravity {
            accel += gravity;
        }
        self.velocity += accel.scale(dt);
        self.angular_velocity += dt * self.inv_inertia * self.torque;
        if clear {
            self.clear_forces();
        }
    }

    /// Moves the body by its real plus bias velocity, then drops the bias.
    pub(crate) fn integrate_velocity(&mut self, dt: f64) {
        self.transform.position += (self.velocity + self.v_bias).scale(dt);
        let angle = self.transform.angle() + dt * (self.angular_velocity + self.w_bias);
        self.transform.set_angle(angle);
        self.v_bias = Vect::ZERO;
        self.w_bias = 0.0;
    }

    pub(crate) fn push_shape(&mut self, shape: Shape) -> usize {
        self.shapes.push(shape);
        self.shapes.len() - 1
    }

    pub(crate) fn attach_shapes(&mut self, id: BodyId, broad_phase: &mut BroadPhase<ShapeId>) {
        let xf = self.transform;
        for (index, shape) in self.shapes.iter_mut().enumerate() {
            shape.attach(&xf, ShapeId { body: id, index }, broad_phase);
        }
    }

    pub(crate) fn attach_shape(&mut self, index: usize, id: BodyId, broad_phase: &mut BroadPhase<ShapeId>) {
        let xf = self.transform;
        if let Some(shape) = self.shapes.get_mut(index) {
            shape.attach(&xf, ShapeId { body: id, index }, broad_phase);
        }
    }

    pub(crate) fn detach_shapes(&mut self, broad_phase: &mut BroadPhase<ShapeId>) {
        for shape in &mut self.shapes {
            shape.detach(broad_phase);
        }
    }

    /// Refreshes every shape's AABB and proxy from the current transform.
    pub(crate) fn update_shapes(&mut self, broad_phase: &mut BroadPhase<ShapeId>) {
        let xf = self.transform;
        for shape in &mut self.shapes {
            shape.refresh(&xf, broad_phase);
        }
    }
}

/// Moment of inertia of a hollow disc with radii `inner` and `outer`, centred
/// at `offset` from the centre of mass. Use `inner = 0` for a solid disc.
pub fn moment_for_circle(mass: f64, inner: f64, outer: f64, offset: Vect) -> f64 {
    mass * (0.5 * (inner * inner + outer * outer) + offset.length_squared())
}

/// Moment of inertia of a thin rod from `a` to `b`.
pub fn moment_for_segment(mass: f64, a: Vect, b: Vect) -> f64 {
    let length = (b - a).length();
    let center = (a + b).scale(0.5);
    mass * (length * length / 12.0 + center.length_squared())
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    body: Option<Body>,
}

/// Generational arena of bodies. Iteration follows slot order.
#[derive(Debug, Clone, Default)]
pub(crate) struct BodySet {
    slots: Vec<Slot>,
    free: Vec<usize>,
    len: usize,
}

impl BodySet {
    pub(crate) fn insert(&mut self, body: Body) -> BodyId {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.body = Some(body);
            BodyId {
                index,
                generation: slot.generation,
            }
        } else {
            self.slots.push(Slot {
                generation: 0,
                body: Some(body),
            });
            BodyId {
                index: self.slots.len() - 1,
                generation: 0,
            }
        }
    }

    pub(crate) fn remove(&mut self, id: BodyId) -> Option<Body> {
        let slot = self.slots.get_mut(id.index)?;
        if slot.generation != id.generation {
            return None;
        }
        let body = slot.body.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        Some(body)
    }

    pub(crate) fn get(&self, id: BodyId) -> Option<&Body> {
        self.slots
            .get(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.body.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.slots
            .get_mut(id.index)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.body.as_mut())
    }

    /// Mutable access to two distinct bodies at once.
    pub(crate) fn pair_mut(&mut self, a: BodyId, b: BodyId) -> Option<(&mut Body, &mut Body)> {
        if a.index == b.index || self.get(a).is_none() || self.get(b).is_none() {
            return None;
        }
        let (lo, hi, swapped) = if a.index < b.index {
            (a.index, b.index, false)
        } else {
            (b.index, a.index, true)
        };
        let (head, tail) = self.slots.split_at_mut(hi);
        let first = head[lo].body.as_mut()?;
        let second = tail[0].body.as_mut()?;
        Some(if swapped { (second, first) } else { (first, second) })
    }

    pub(crate) fn shape(&self, id: ShapeId) -> Option<&Shape> {
        self.get(id.body).and_then(|body| body.shapes.get(id.index))
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (BodyId, &Body)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.body.as_ref().map(|body| {
                (
                    BodyId {
                        index,
                        generation: slot.generation,
                    },
                    body,
                )
            })
        })
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Body> + '_ {
        self.slots.iter_mut().filter_map(|slot| slot.body.as_mut())
    }
}
