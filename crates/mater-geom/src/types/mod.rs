// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Core geometry types used by the engine (transform, AABB).
//!
//! Determinism notes:
//! - Overlap semantics are inclusive on faces to avoid pair churn on contact
//!   boundaries.
//! - Rotations cache sine and cosine so repeated point transforms do not
//!   re-evaluate trigonometry.

#[doc = "Axis-aligned bounding boxes (world space)."]
pub mod aabb;
#[doc = "Rigid 2D transforms (position + rotation)."]
pub mod transform;
