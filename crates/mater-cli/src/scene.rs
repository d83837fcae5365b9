// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! JSON scene files: settings, gravity and body definitions.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use mater_core::{
    moment_for_circle, moment_for_segment, Body, BodyKind, Settings, Shape, ShapeKind, Space,
    DEFAULT_FRICTION,
};
use mater_geom::Vect;
use serde::{Deserialize, Serialize};

/// Current on-disk format version.
pub const SCENE_VERSION: u32 = 1;

/// A complete, serializable simulation setup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneFile {
    /// Format version; must equal [`SCENE_VERSION`].
    pub version: u32,
    /// Solver tunables. Missing fields take their defaults.
    #[serde(default)]
    pub settings: Settings,
    /// Gravity acceleration.
    #[serde(default)]
    pub gravity: Vect,
    /// Bodies in insertion order.
    #[serde(default)]
    pub bodies: Vec<BodyDef>,
}

/// One body and its shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyDef {
    /// Static or dynamic.
    pub kind: BodyKind,
    /// Centre of mass in world space.
    #[serde(default)]
    pub position: Vect,
    /// Rotation in radians.
    #[serde(default)]
    pub angle: f64,
    /// Linear velocity.
    #[serde(default)]
    pub velocity: Vect,
    /// Angular velocity.
    #[serde(default)]
    pub angular_velocity: f64,
    /// Required for dynamic bodies; ignored for static ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mass: Option<f64>,
    /// Moment of inertia. Derived from the shapes when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inertia: Option<f64>,
    /// Opt out of gravity.
    #[serde(default, skip_serializing_if = "is_false")]
    pub ignore_gravity: bool,
    /// Attached shapes.
    #[serde(default)]
    pub shapes: Vec<ShapeDef>,
}

/// A shape and its material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeDef {
    /// Geometry, tagged by `type`.
    #[serde(flatten)]
    pub kind: ShapeKind,
    /// Friction coefficient.
    #[serde(default = "default_friction")]
    pub friction: f64,
    /// Restitution.
    #[serde(default)]
    pub restitution: f64,
    /// Sensor flag.
    #[serde(default, skip_serializing_if = "is_false")]
    pub sensor: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn default_friction() -> f64 {
    DEFAULT_FRICTION
}

impl Default for SceneFile {
    fn default() -> Self {
        Self {
            version: SCENE_VERSION,
            settings: Settings::default(),
            gravity: Vect::ZERO,
            bodies: Vec::new(),
        }
    }
}

impl ShapeDef {
    /// Shape with default material.
    pub fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            friction: DEFAULT_FRICTION,
            restitution: 0.0,
            sensor: false,
        }
    }

    fn to_shape(&self) -> Result<Shape> {
        Ok(Shape::try_new(self.kind)?
            .with_friction(self.friction)
            .with_restitution(self.restitution)
            .with_sensor(self.sensor))
    }

    fn from_shape(shape: &Shape) -> Self {
        Self {
            kind: shape.kind,
            friction: shape.friction,
            restitution: shape.restitution,
            sensor: shape.is_sensor,
        }
    }

    /// Moment of inertia this shape contributes to a body of `mass`.
    fn moment(&self, mass: f64) -> f64 {
        match self.kind {
            ShapeKind::Circle { radius, offset } => moment_for_circle(mass, 0.0, radius, offset),
            ShapeKind::Segment { a, b, .. } => moment_for_segment(mass, a, b),
        }
    }
}

impl BodyDef {
    /// Static body at `position`.
    pub fn fixed(position: Vect) -> Self {
        Self {
            kind: BodyKind::Static,
            position,
            angle: 0.0,
            velocity: Vect::ZERO,
            angular_velocity: 0.0,
            mass: None,
            inertia: None,
            ignore_gravity: false,
            shapes: Vec::new(),
        }
    }

    /// Dynamic body of `mass` at `position`; inertia follows from the shapes.
    pub fn dynamic(mass: f64, position: Vect) -> Self {
        Self {
            kind: BodyKind::Dynamic,
            mass: Some(mass),
            ..Self::fixed(position)
        }
    }

    /// Builder-style shape attachment.
    #[must_use]
    pub fn with_shape(mut self, shape: ShapeDef) -> Self {
        self.shapes.push(shape);
        self
    }

    /// Builder-style velocity.
    #[must_use]
    pub fn with_velocity(mut self, velocity: Vect) -> Self {
        self.velocity = velocity;
        self
    }

    /// Instantiates the body (not yet added to a space).
    pub fn to_body(&self) -> Result<Body> {
        let mut body = match self.kind {
            BodyKind::Static => Body::new_static(),
            BodyKind::Dynamic => {
                let Some(mass) = self.mass else {
                    bail!("dynamic body at {:?} has no mass", self.position);
                };
                // Mass is split evenly between the shapes for the derived moment.
                let inertia = self.inertia.unwrap_or_else(|| {
                    let share = mass / self.shapes.len().max(1) as f64;
                    self.shapes.iter().map(|s| s.moment(share)).sum()
                });
                Body::new_dynamic(mass, inertia)?
            }
        };
        body = body.at(self.position, self.angle);
        body.velocity = self.velocity;
        body.angular_velocity = self.angular_velocity;
        body.ignore_gravity = self.ignore_gravity;
        for (j, def) in self.shapes.iter().enumerate() {
            let shape = def.to_shape().with_context(|| format!("invalid shape #{j}"))?;
            body = body.with_shape(shape);
        }
        Ok(body)
    }

    fn from_body(body: &Body) -> Self {
        let dynamic = !body.is_static();
        Self {
            kind: body.kind(),
            position: body.position(),
            angle: body.angle(),
            velocity: body.velocity,
            angular_velocity: body.angular_velocity,
            mass: dynamic.then(|| body.mass()),
            inertia: dynamic.then(|| body.inertia()),
            ignore_gravity: body.ignore_gravity,
            shapes: body.shapes().iter().map(ShapeDef::from_shape).collect(),
        }
    }
}

impl SceneFile {
    /// Reads and validates a scene from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to read scene {}", path.display()))?;
        let scene: Self = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to parse scene {}", path.display()))?;
        if scene.version != SCENE_VERSION {
            bail!(
                "unsupported scene version {} (expected {SCENE_VERSION})",
                scene.version
            );
        }
        Ok(scene)
    }

    /// Writes the scene as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let mut out = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut out, self).context("failed to encode scene")?;
        writeln!(out)?;
        out.flush()
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    /// Builds a fresh space holding every body of the scene.
    pub fn build(&self) -> Result<Space> {
        let mut space = Space::with_settings(self.settings);
        space.gravity = self.gravity;
        for (i, def) in self.bodies.iter().enumerate() {
            let body = def.to_body().with_context(|| format!("invalid body #{i}"))?;
            space.add_body(body);
        }
        Ok(space)
    }

    /// Captures the current state of `space`. Forces and contacts are not saved.
    pub fn capture(space: &Space) -> Self {
        Self {
            version: SCENE_VERSION,
            settings: space.settings,
            gravity: space.gravity,
            bodies: space.bodies().map(|(_, body)| BodyDef::from_body(body)).collect(),
        }
    }
}
