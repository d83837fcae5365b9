// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! mater-core: 2D rigid-body dynamics on top of the mater-geom broad phase.
//!
//! A [`Space`] owns bodies, a [`BroadPhase`](mater_geom::BroadPhase) of shape
//! proxies, and a [`ContactManager`] of persistent [`Arbiter`]s. Each
//! [`Space::step`] discovers new pairs, refreshes manifolds through a
//! [`NarrowPhase`], integrates forces, and solves contacts with warm-started
//! sequential impulses plus a separate bias velocity for position correction.
//!
//! Everything is single-threaded and deterministic for identical inputs.
#![forbid(unsafe_code)]

mod arbiter;
mod body;
mod contact_manager;
mod narrow_phase;
mod settings;
mod shape;
mod space;

pub use arbiter::{Arbiter, ArbiterId, Contact};
pub use body::{moment_for_circle, moment_for_segment, Body, BodyId, BodyKind};
pub use contact_manager::{ContactManager, Iter as ArbiterIter, OnCollision, ShouldCollide};
pub use narrow_phase::{BasicNarrowPhase, ManifoldPoint, NarrowPhase};
pub use settings::{Settings, DEFAULT_COLLISION_BIAS, DEFAULT_COLLISION_SLOP, DEFAULT_ITERATIONS};
pub use shape::{Shape, ShapeId, ShapeKind, DEFAULT_FRICTION};
pub use space::{Space, SpaceError};
