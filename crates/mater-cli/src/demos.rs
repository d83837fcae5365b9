// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Built-in demo scenes.

use clap::ValueEnum;
use mater_core::ShapeKind;
use mater_geom::Vect;

use crate::scene::{BodyDef, SceneFile, ShapeDef};

/// Standard gravity used by every demo.
pub const DEMO_GRAVITY: Vect = Vect::new(0.0, -9.81);

/// Named demo scenes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, ValueEnum)]
pub enum Demo {
    /// A grid of balls dropped into a V-shaped bin.
    Rain,
    /// Newton's cradle: a row of elastic balls struck from the left.
    Cradle,
    /// A triangle of balls resting on the ground between two walls.
    Pyramid,
}

impl Demo {
    /// Builds the scene.
    pub fn scene(self) -> SceneFile {
        match self {
            Self::Rain => rain(),
            Self::Cradle => cradle(),
            Self::Pyramid => pyramid(),
        }
    }
}

fn segment(a: Vect, b: Vect) -> ShapeDef {
    ShapeDef::new(ShapeKind::Segment { a, b, radius: 0.05 })
}

fn ball(radius: f64) -> ShapeDef {
    ShapeDef::new(ShapeKind::Circle {
        radius,
        offset: Vect::ZERO,
    })
}

fn rain() -> SceneFile {
    let bin = BodyDef::fixed(Vect::ZERO)
        .with_shape(segment(Vect::new(-6.0, 6.0), Vect::new(0.0, 0.0)))
        .with_shape(segment(Vect::new(0.0, 0.0), Vect::new(6.0, 6.0)));
    let mut bodies = vec![bin];
    for row in 0..4_u32 {
        for col in 0..6_u32 {
            // Odd rows are staggered so balls do not land in columns.
            let stagger = if row % 2 == 0 { 0.0 } else { 0.4 };
            let position = Vect::new(-2.5 + f64::from(col) + stagger, 8.0 + 1.1 * f64::from(row));
            bodies.push(BodyDef::dynamic(1.0, position).with_shape(ball(0.4)));
        }
    }
    SceneFile {
        gravity: DEMO_GRAVITY,
        bodies,
        ..SceneFile::default()
    }
}

fn cradle() -> SceneFile {
    let elastic = |radius| ShapeDef {
        restitution: 1.0,
        friction: 0.0,
        ..ball(radius)
    };
    let mut bodies = vec![BodyDef::fixed(Vect::ZERO)
        .with_shape(segment(Vect::new(-10.0, 0.0), Vect::new(10.0, 0.0)))];
    bodies.push(
        BodyDef::dynamic(1.0, Vect::new(-4.0, 0.55))
            .with_velocity(Vect::new(3.0, 0.0))
            .with_shape(elastic(0.5)),
    );
    for i in 0..4_u32 {
        let position = Vect::new(f64::from(i), 0.55);
        bodies.push(BodyDef::dynamic(1.0, position).with_shape(elastic(0.5)));
    }
    SceneFile {
        gravity: DEMO_GRAVITY,
        bodies,
        ..SceneFile::default()
    }
}

fn pyramid() -> SceneFile {
    let walls = BodyDef::fixed(Vect::ZERO)
        .with_shape(segment(Vect::new(-5.0, 0.0), Vect::new(5.0, 0.0)))
        .with_shape(segment(Vect::new(-5.0, 0.0), Vect::new(-5.0, 10.0)))
        .with_shape(segment(Vect::new(5.0, 0.0), Vect::new(5.0, 10.0)));
    let mut bodies = vec![walls];
    let radius = 0.5;
    let rows = 5_u32;
    for row in 0..rows {
        let count = rows - row;
        let y = radius + 0.05 + f64::from(row) * radius * 3.0_f64.sqrt();
        let left = -f64::from(count - 1) * radius;
        for i in 0..count {
            let x = left + f64::from(i) * 2.0 * radius;
            bodies.push(BodyDef::dynamic(1.0, Vect::new(x, y)).with_shape(ball(radius)));
        }
    }
    SceneFile {
        gravity: DEMO_GRAVITY,
        bodies,
        ..SceneFile::default()
    }
}
