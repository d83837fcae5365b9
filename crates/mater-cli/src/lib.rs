// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Mater developer CLI.
//!
//! Builds demo scenes, loads and saves JSON scene files, steps a
//! [`mater_core::Space`] and prints the resulting body states as a table.

pub mod cli;
pub mod demos;
pub mod report;
pub mod scene;
