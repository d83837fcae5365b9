// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Broad-phase spatial index and pair management.
//!
//! Determinism contract:
//! - Pair identity is canonicalized as `(min_id, max_id)`.
//! - Pairs reach the client sorted lexicographically by that tuple, each
//!   distinct pair exactly once per update.
//! - Overlap is inclusive on faces (touching AABBs are considered overlapping).
//!
//! The broad phase never persists pairs. It reports potentially new pairs for
//! proxies that moved since the last update; tracking subsequent overlap is the
//! client's job.

#[doc = "Pair buffering, deduplication and move tracking on top of the tree."]
pub mod broad_phase;
#[doc = "Self-balancing tree of fat AABB proxies."]
pub mod dynamic_tree;
#[doc = "Segment cast input shared by the tree and its clients."]
pub mod ray;
