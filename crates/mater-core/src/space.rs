// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use core::fmt;

use mater_geom::{Aabb, BroadPhase, NodeView, RayCastInput, Vect};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::arbiter::Arbiter;
use crate::body::{Body, BodyId, BodySet};
use crate::contact_manager::{ContactManager, OnCollision, ShouldCollide};
use crate::narrow_phase::{BasicNarrowPhase, NarrowPhase};
use crate::settings::Settings;
use crate::shape::{Shape, ShapeId};

/// Errors returned by [`Space`], body construction and shape validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpaceError {
    /// The id does not name a body currently in the space.
    #[error("unknown body: {0}")]
    UnknownBody(BodyId),
    /// Dynamic bodies need a finite, strictly positive mass.
    #[error("invalid mass for dynamic body: {mass}")]
    InvalidMass {
        /// Rejected value.
        mass: f64,
    },
    /// Dynamic bodies need a finite, strictly positive moment of inertia.
    #[error("invalid moment of inertia for dynamic body: {inertia}")]
    InvalidInertia {
        /// Rejected value.
        inertia: f64,
    },
    /// Shape radii must be finite and non-negative.
    #[error("invalid shape radius: {radius}")]
    InvalidRadius {
        /// Rejected value.
        radius: f64,
    },
    /// Shape offsets and endpoints must be finite.
    #[error("shape geometry has a non-finite point")]
    NonFiniteGeometry,
}

/// A simulation world: bodies, broad phase, contacts and solver settings.
///
/// [`Space::step`] runs one pass of the pipeline:
/// 1. broad-phase pair discovery and narrow-phase manifold refresh,
/// 2. force integration,
/// 3. arbiter pre-step,
/// 4. warm starting scaled by `dt / prev_dt`,
/// 5. `settings.iterations` sequential-impulse passes,
/// 6. position integration with the bias velocities.
pub struct Space {
    /// Stepping a disabled space is a no-op.
    pub enabled: bool,
    /// Acceleration applied to dynamic bodies that do not ignore gravity.
    pub gravity: Vect,
    /// Solver tunables.
    pub settings: Settings,
    bodies: BodySet,
    broad_phase: BroadPhase<ShapeId>,
    contacts: ContactManager,
    narrow_phase: Box<dyn NarrowPhase>,
    should_collide: Option<ShouldCollide>,
    on_collision: Option<OnCollision>,
    prev_dt: f64,
}

impl fmt::Debug for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Space")
            .field("enabled", &self.enabled)
            .field("gravity", &self.gravity)
            .field("settings", &self.settings)
            .field("bodies", &self.bodies.len())
            .field("proxies", &self.broad_phase.proxy_count())
            .field("arbiters", &self.contacts.len())
            .field("prev_dt", &self.prev_dt)
            .finish_non_exhaustive()
    }
}

impl Default for Space {
    fn default() -> Self {
        Self::new()
    }
}

impl Space {
    /// Creates an empty, enabled space with default settings and no gravity.
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    /// Creates an empty space with the given settings.
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            enabled: true,
            gravity: Vect::ZERO,
            settings,
            bodies: BodySet::default(),
            broad_phase: BroadPhase::new(),
            contacts: ContactManager::new(),
            narrow_phase: Box::new(BasicNarrowPhase),
            should_collide: None,
            on_collision: None,
            prev_dt: 0.0,
        }
    }

    /// Replaces the narrow phase.
    pub fn with_narrow_phase(mut self, narrow_phase: impl NarrowPhase + 'static) -> Self {
        self.narrow_phase = Box::new(narrow_phase);
        self
    }

    /// Warm-start scale for a step of `dt` following one of `prev_dt`.
    ///
    /// Zero when there is no previous step.
    pub fn warm_start_ratio(dt: f64, prev_dt: f64) -> f64 {
        if prev_dt == 0.0 {
            0.0
        } else {
            dt / prev_dt
        }
    }

    /// Length of the last executed step (`0` before the first).
    pub fn prev_dt(&self) -> f64 {
        self.prev_dt
    }

    /// Adds a body and creates broad-phase proxies for its shapes.
    pub fn add_body(&mut self, body: Body) -> BodyId {
        let id = self.bodies.insert(body);
        if let Some(body) = self.bodies.get_mut(id) {
            body.attach_shapes(id, &mut self.broad_phase);
            debug!(body = %id, kind = ?body.kind(), shapes = body.shapes().len(), "body added");
        }
        id
    }

    /// Removes a body, its proxies and every arbiter that touches it.
    ///
    /// The returned body keeps its state and shapes and can be re-added.
    pub fn remove_body(&mut self, id: BodyId) -> Result<Body, SpaceError> {
        let Some(mut body) = self.bodies.remove(id) else {
            warn!(body = %id, "remove_body: body not found");
            return Err(SpaceError::UnknownBody(id));
        };
        body.detach_shapes(&mut self.broad_phase);
        self.contacts.remove_body(id);
        debug!(body = %id, "body removed");
        Ok(body)
    }

    /// Attaches `shape` to a body already in the space.
    pub fn add_shape(&mut self, id: BodyId, shape: Shape) -> Result<ShapeId, SpaceError> {
        let body = self.bodies.get_mut(id).ok_or(SpaceError::UnknownBody(id))?;
        let index = body.push_shape(shape);
        body.attach_shape(index, id, &mut self.broad_phase);
        Ok(ShapeId { body: id, index })
    }

    /// Looks up a body.
    pub fn body(&self, id: BodyId) -> Result<&Body, SpaceError> {
        self.bodies.get(id).ok_or(SpaceError::UnknownBody(id))
    }

    /// Looks up a body for mutation.
    pub fn body_mut(&mut self, id: BodyId) -> Result<&mut Body, SpaceError> {
        self.bodies.get_mut(id).ok_or(SpaceError::UnknownBody(id))
    }

    /// Looks up a shape.
    pub fn shape(&self, id: ShapeId) -> Option<&Shape> {
        self.bodies.shape(id)
    }

    /// Bodies in slot order.
    pub fn bodies(&self) -> impl Iterator<Item = (BodyId, &Body)> + '_ {
        self.bodies.iter()
    }

    /// Number of bodies.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Live arbiters, newest first.
    pub fn arbiters(&self) -> impl Iterator<Item = &Arbiter> + '_ {
        self.contacts.iter()
    }

    /// The contact manager, for arbiter lookups.
    pub fn contacts(&self) -> &ContactManager {
        &self.contacts
    }

    /// Installs the pair filter consulted before an arbiter is created.
    pub fn set_should_collide<F>(&mut self, filter: F)
    where
        F: FnMut(&Shape, &Shape) -> bool + 'static,
    {
        self.should_collide = Some(Box::new(filter));
    }

    /// Installs the per-step arbiter notification.
    pub fn set_on_collision<F>(&mut self, callback: F)
    where
        F: FnMut(&Arbiter) + 'static,
    {
        self.on_collision = Some(Box::new(callback));
    }

    /// Visits shapes whose fat bounds overlap `aabb`; return `false` to stop.
    pub fn query_aabb<F>(&self, aabb: &Aabb, mut callback: F)
    where
        F: FnMut(ShapeId, &Shape) -> bool,
    {
        self.broad_phase.query(aabb, |proxy| {
            let id = *self.broad_phase.user_data(proxy);
            self.bodies.shape(id).is_none_or(|shape| callback(id, shape))
        });
    }

    /// Casts a segment against the shapes' fat bounds.
    ///
    /// The callback decides the exact hit and returns the new max fraction,
    /// `0` to stop, or a negative value to ignore the shape.
    pub fn ray_cast<F>(&self, input: &RayCastInput, mut callback: F)
    where
        F: FnMut(&RayCastInput, ShapeId, &Shape) -> f64,
    {
        self.broad_phase.ray_cast(input, |sub, proxy| {
            let id = *self.broad_phase.user_data(proxy);
            self.bodies
                .shape(id)
                .map_or(-1.0, |shape| callback(sub, id, shape))
        });
    }

    /// Live broad-phase tree nodes, for debug drawing.
    pub fn dynamic_tree_nodes(&self) -> Vec<NodeView> {
        self.broad_phase.tree().nodes().collect()
    }

    /// Advances the simulation by `dt`. No-op when `dt <= 0` or disabled.
    pub fn step(&mut self, dt: f64) {
        if !self.enabled || dt <= 0.0 {
            return;
        }
        let inv_dt = 1.0 / dt;

        self.contacts.find_new_contacts(
            &mut self.broad_phase,
            &self.bodies,
            self.should_collide.as_mut(),
        );
        self.contacts.collide(
            &self.bodies,
            &self.broad_phase,
            &*self.narrow_phase,
            self.on_collision.as_mut(),
        );

        let gravity = self.gravity;
        let clear = self.settings.auto_clear_forces;
        for body in self.bodies.iter_mut() {
            body.update_shapes(&mut self.broad_phase);
            if !body.is_static() {
                body.integrate_forces(gravity, dt, clear);
            }
        }

        let slop = self.settings.collision_slop;
        let bias_coef = self.settings.bias_coefficient(dt);
        self.contacts
            .for_each_solvable(&mut self.bodies, |arb, a, b| arb.pre_step(a, b, inv_dt, slop, bias_coef));

        let dt_coef = Self::warm_start_ratio(dt, self.prev_dt);
        self.contacts
            .for_each_solvable(&mut self.bodies, |arb, a, b| arb.apply_cached_impulse(a, b, dt_coef));

        let position_correction = self.settings.position_correction;
        for _ in 0..self.settings.iterations {
            self.contacts.for_each_solvable(&mut self.bodies, |arb, a, b| {
                arb.apply_impulse(a, b, position_correction);
            });
        }

        for body in self.bodies.iter_mut() {
            if body.is_static() {
                continue;
            }
            body.integrate_velocity(dt);
            body.update_shapes(&mut self.broad_phase);
        }

        self.prev_dt = dt;
        trace!(dt, bodies = self.bodies.len(), arbiters = self.contacts.len(), "step");
    }
}
