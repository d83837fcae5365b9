// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! CLI entry point for `mater`.

use anyhow::Result;
use mater_cli::cli::entrypoint;

fn main() -> Result<()> {
    entrypoint()
}
