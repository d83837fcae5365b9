// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use core::fmt;

use mater_geom::{Aabb, BroadPhase, ProxyId, Transform, Vect};
use tracing::trace;

use crate::body::BodyId;
use crate::space::SpaceError;

/// Default Coulomb friction coefficient for new shapes.
pub const DEFAULT_FRICTION: f64 = 0.5;

/// Identifies a shape as `(owning body, index in the body's shape list)`.
///
/// This is the payload stored in broad-phase proxies. The derived ordering is
/// used to canonicalize shape pairs.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShapeId {
    /// Owning body.
    pub body: BodyId,
    /// Position in [`Body::shapes`](crate::Body::shapes).
    pub index: usize,
}

impl fmt::Display for ShapeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/shape#{}", self.body, self.index)
    }
}

/// Collision geometry in body-local coordinates.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", rename_all = "snake_case"))]
pub enum ShapeKind {
    /// Disc of `radius` centred at `offset`.
    Circle {
        /// Disc radius.
        radius: f64,
        /// Centre relative to the body origin.
        offset: Vect,
    },
    /// Capsule swept by a disc of `radius` along `a -> b`.
    Segment {
        /// First endpoint.
        a: Vect,
        /// Second endpoint.
        b: Vect,
        /// Thickness; `0.0` for an infinitely thin segment.
        radius: f64,
    },
}

impl ShapeKind {
    /// Checks radii and points.
    pub fn validate(&self) -> Result<(), SpaceError> {
        let (radius, points) = match *self {
            Self::Circle { radius, offset } => (radius, [offset, offset]),
            Self::Segment { a, b, radius } => (radius, [a, b]),
        };
        if !(radius.is_finite() && radius >= 0.0) {
            return Err(SpaceError::InvalidRadius { radius });
        }
        if !points.iter().all(|p| p.is_finite()) {
            return Err(SpaceError::NonFiniteGeometry);
        }
        Ok(())
    }
}

/// A collision shape attached to a body.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    /// Geometry.
    pub kind: ShapeKind,
    /// Coulomb friction coefficient, combined multiplicatively per pair.
    pub friction: f64,
    /// Restitution (bounciness), combined multiplicatively per pair.
    pub restitution: f64,
    /// Sensors report overlap but never receive impulses.
    pub is_sensor: bool,
    aabb: Aabb,
    proxy: Option<ProxyId>,
}

impl Shape {
    /// Creates a shape with default material and no sensor flag.
    pub fn new(kind: ShapeKind) -> Self {
        let mut shape = Self {
            kind,
            friction: DEFAULT_FRICTION,
            restitution: 0.0,
            is_sensor: false,
            aabb: Aabb::from_center_half_extents(Vect::ZERO, 0.0, 0.0),
            proxy: None,
        };
        shape.aabb = shape.compute_aabb(&Transform::identity());
        shape
    }

    /// Creates a shape after checking its geometry.
    ///
    /// Radii must be finite and non-negative; offsets and endpoints finite.
    /// [`Shape::new`] skips these checks.
    pub fn try_new(kind: ShapeKind) -> Result<Self, SpaceError> {
        kind.validate()?;
        Ok(Self::new(kind))
    }

    /// Circle of `radius` centred at `offset`.
    pub fn circle(radius: f64, offset: Vect) -> Self {
        Self::new(ShapeKind::Circle { radius, offset })
    }

    /// Segment from `a` to `b` with thickness `radius`.
    pub fn segment(a: Vect, b: Vect, radius: f64) -> Self {
        Self::new(ShapeKind::Segment { a, b, radius })
    }

    /// Sets the friction coefficient.
    pub fn with_friction(mut self, friction: f64) -> Self {
        self.friction = friction;
        self
    }

    /// Sets the restitution.
    pub fn with_restitution(mut self, restitution: f64) -> Self {
        self.restitution = restitution;
        self
    }

    /// Marks the shape as a sensor (or not).
    pub fn with_sensor(mut self, is_sensor: bool) -> Self {
        self.is_sensor = is_sensor;
        self
    }

    /// World AABB as of the last refresh.
    pub fn aabb(&self) -> Aabb {
        self.aabb
    }

    /// Broad-phase proxy, while the owning body is in a space.
    pub fn proxy(&self) -> Option<ProxyId> {
        self.proxy
    }

    /// Tight world-space bounds of the shape under `xf`.
    pub fn compute_aabb(&self, xf: &Transform) -> Aabb {
        match self.kind {
            ShapeKind::Circle { radius, offset } => {
                let center = xf.apply(offset);
                let r = Vect::new(radius, radius);
                Aabb::from_corners_unchecked(center - r, center + r)
            }
            ShapeKind::Segment { a, b, radius } => {
                let (a, b) = (xf.apply(a), xf.apply(b));
                Aabb::from_corners_unchecked(a.min(b), a.max(b)).inflate(radius)
            }
        }
    }

    pub(crate) fn attach(&mut self, xf: &Transform, id: ShapeId, broad_phase: &mut BroadPhase<ShapeId>) {
        self.aabb = self.compute_aabb(xf);
        self.proxy = Some(broad_phase.add_proxy(self.aabb, id));
    }

    pub(crate) fn detach(&mut self, broad_phase: &mut BroadPhase<ShapeId>) {
        if let Some(proxy) = self.proxy.take() {
            broad_phase.remove_proxy(proxy);
        }
    }

    /// Recomputes the cached AABB and moves the proxy by the observed
    /// displacement of the box centre.
    ///
    /// Non-finite bounds (a body that has gone NaN) leave the cache and the
    /// proxy at their last finite state.
    pub(crate) fn refresh(&mut self, xf: &Transform, broad_phase: &mut BroadPhase<ShapeId>) {
        let aabb = self.compute_aabb(xf);
        if !aabb.is_finite() {
            trace!(proxy = ?self.proxy, "non-finite shape bounds, proxy left in place");
            return;
        }
        let displacement = aabb.center() - self.aabb.center();
        self.aabb = aabb;
        if let Some(proxy) = self.proxy {
            broad_phase.move_proxy(proxy, aabb, displacement);
        }
    }
}
