// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![doc = r"Geometry primitives and broad phase for Mater.

This crate provides:
- A 2D vector type (`Vect`).
- Axis-aligned bounding boxes (`Aabb`) and rigid transforms (`Transform`).
- A dynamic AABB tree (`DynamicTree`) with fat proxies, AVL-style rotations,
  region queries and ray casts.
- A broad phase (`BroadPhase`) that buffers moved proxies and reports each
  overlapping proxy pair exactly once per update.

Design notes:
- Pair identity is canonicalized as `(min_id, max_id)` and pairs are emitted in
  ascending order, so identical inputs produce identical callback sequences.
- Overlap is inclusive on faces; touching boxes pair.
- Proxy ids are arena indices. Using an id that is not live is a programming
  error and panics.
"]

/// Tolerances and the 2D vector type.
pub mod math;
/// Foundational geometric types.
pub mod types;
/// Dynamic AABB tree and broad-phase pair management.
pub mod broad;

pub use broad::broad_phase::{BroadPhase, MoveEntry, Pair};
pub use broad::dynamic_tree::{DynamicTree, NodeView, ProxyId, TreeError};
pub use broad::ray::RayCastInput;
pub use math::Vect;
pub use types::aabb::Aabb;
pub use types::transform::{Rotation, Transform};
