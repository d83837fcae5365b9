// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Tabular rendering of simulation state.

use comfy_table::presets::UTF8_FULL;
use comfy_table::{CellAlignment, Table};
use mater_core::{BodyKind, Space};

/// Aggregate numbers printed under the body table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    /// Steps executed.
    pub steps: u32,
    /// Simulated seconds.
    pub time: f64,
    /// Bodies in the space.
    pub bodies: usize,
    /// Live arbiters after the last step.
    pub arbiters: usize,
    /// Total kinetic energy of dynamic bodies.
    pub kinetic_energy: f64,
}

impl Summary {
    /// Collects the summary for `space` after `steps` steps of `dt`.
    pub fn collect(space: &Space, steps: u32, dt: f64) -> Self {
        Self {
            steps,
            time: f64::from(steps) * dt,
            bodies: space.body_count(),
            arbiters: space.arbiters().count(),
            kinetic_energy: space.bodies().map(|(_, b)| b.kinetic_energy()).sum(),
        }
    }
}

/// One row per body: id, kind, position, angle and velocities.
pub fn body_table(space: &Space) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec![
        "body", "kind", "x", "y", "angle", "vx", "vy", "w",
    ]);
    for (id, body) in space.bodies() {
        let kind = match body.kind() {
            BodyKind::Static => "static",
            BodyKind::Dynamic => "dynamic",
        };
        let p = body.position();
        let v = body.velocity;
        table.add_row(vec![
            id.to_string(),
            kind.to_owned(),
            format!("{:.3}", p.x),
            format!("{:.3}", p.y),
            format!("{:.3}", body.angle()),
            format!("{:.3}", v.x),
            format!("{:.3}", v.y),
            format!("{:.3}", body.angular_velocity),
        ]);
    }
    for index in 2..8 {
        if let Some(column) = table.column_mut(index) {
            column.set_cell_alignment(CellAlignment::Right);
        }
    }
    table
}

/// One-line summary.
pub fn summary_line(summary: &Summary) -> String {
    format!(
        "steps={} t={:.3}s bodies={} arbiters={} kinetic_energy={:.4}",
        summary.steps, summary.time, summary.bodies, summary.arbiters, summary.kinetic_energy
    )
}

#[cfg(test)]
mod tests {
    use mater_core::Body;

    use super::*;

    #[test]
    fn table_has_a_row_per_body() {
        let mut space = Space::new();
        space.add_body(Body::new_static());
        space.add_body(Body::new_dynamic(1.0, 1.0).expect("valid mass"));
        let rendered = body_table(&space).to_string();
        assert!(rendered.contains("static"));
        assert!(rendered.contains("dynamic"));
        assert_eq!(Summary::collect(&space, 0, 0.1).bodies, 2);
    }
}
