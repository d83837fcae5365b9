// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Command-line surface of the `mater` binary.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use mater_core::Space;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::demos::Demo;
use crate::report::{body_table, summary_line, Summary};
use crate::scene::SceneFile;

/// Default step length: 60 Hz.
pub const DEFAULT_DT: f64 = 1.0 / 60.0;

/// Mater 2D physics developer CLI
#[derive(Parser)]
#[command(name = "mater")]
pub struct Cli {
    /// Selected subcommand.
    #[command(subcommand)]
    pub command: Commands,
}

/// Subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Simulate a built-in demo scene
    Demo {
        /// Demo to build
        #[arg(value_enum)]
        name: Demo,
        /// Write the initial scene to this JSON file
        #[arg(long)]
        save: Option<PathBuf>,
        /// Number of steps to run
        #[arg(long, default_value = "120")]
        steps: u32,
        /// Step length in seconds
        #[arg(long, default_value_t = DEFAULT_DT)]
        dt: f64,
    },
    /// Load a JSON scene and simulate it
    Run {
        /// Path to scene .json
        scene: PathBuf,
        /// Number of steps to run
        #[arg(long, default_value = "120")]
        steps: u32,
        /// Step length in seconds
        #[arg(long, default_value_t = DEFAULT_DT)]
        dt: f64,
        /// Write the final state to this JSON file
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

/// Installs the `RUST_LOG`-driven subscriber on stderr; defaults to `info`.
fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

fn simulate(space: &mut Space, steps: u32, dt: f64) -> Result<Summary> {
    if !(dt.is_finite() && dt > 0.0) {
        bail!("--dt must be a positive number of seconds, got {dt}");
    }
    for _ in 0..steps {
        space.step(dt);
    }
    Ok(Summary::collect(space, steps, dt))
}

fn print_report(space: &Space, summary: &Summary) -> Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "{}", body_table(space))?;
    writeln!(out, "{}", summary_line(summary))?;
    Ok(())
}

/// Parses arguments, runs the selected command and prints its report.
pub fn entrypoint() -> Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    match cli.command {
        Commands::Demo {
            name,
            save,
            steps,
            dt,
        } => {
            let scene = name.scene();
            if let Some(path) = save {
                scene.save(&path)?;
                info!(path = %path.display(), "scene saved");
            }
            let mut space = scene.build().context("failed to build demo scene")?;
            let summary = simulate(&mut space, steps, dt)?;
            print_report(&space, &summary)?;
        }
        Commands::Run {
            scene,
            steps,
            dt,
            out,
        } => {
            let file = SceneFile::load(&scene)?;
            let mut space = file
                .build()
                .with_context(|| format!("failed to build scene {}", scene.display()))?;
            info!(bodies = space.body_count(), "scene loaded");
            let summary = simulate(&mut space, steps, dt)?;
            if let Some(path) = out {
                SceneFile::capture(&space).save(&path)?;
                info!(path = %path.display(), "final state saved");
            }
            print_report(&space, &summary)?;
        }
    }
    Ok(())
}
