// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Tolerances and the 2D vector used throughout the engine.
//!
//! All arithmetic is `f64`; no fused multiply-add is used explicitly so that a
//! given build produces identical results for identical inputs.

mod vect;

pub use vect::Vect;

/// Global epsilon used by math routines when detecting degenerate values.
pub const EPSILON: f64 = 1e-9;
