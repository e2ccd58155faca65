//! Drawable output and the post-step world snapshot.
//!
//! Rendering never touches the dynamics engine. After each step the driver
//! copies every body pose into a [`WorldSnapshot`]; entities build their
//! [`Renderable`]s from that copy.

use hashbrown::HashMap;
use nalgebra::Point3;
use sim_hydro::TriMesh;
use sim_types::{BodyId, DynamicsEngine, Pose};

use crate::error::Result;

/// Primitive topology of a renderable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderKind {
    /// Connected polyline through `points`.
    LineStrip,
    /// Independent segments between consecutive point pairs.
    Lines,
    /// Triangles indexed by `indices`, three per triangle.
    TriangleMesh,
}

/// Geometry to draw, in a model frame placed at `model`.
#[derive(Debug, Clone, PartialEq)]
pub struct Renderable {
    /// Topology.
    pub kind: RenderKind,
    /// Model-to-world transform.
    pub model: Pose,
    /// Points in the model frame.
    pub points: Vec<Point3<f64>>,
    /// Triangle indices (empty for lines).
    pub indices: Vec<usize>,
}

impl Renderable {
    /// Polyline.
    #[must_use]
    pub fn line_strip(model: Pose, points: Vec<Point3<f64>>) -> Self {
        Self {
            kind: RenderKind::LineStrip,
            model,
            points,
            indices: Vec::new(),
        }
    }

    /// Segment list.
    #[must_use]
    pub fn lines(model: Pose, points: Vec<Point3<f64>>) -> Self {
        Self {
            kind: RenderKind::Lines,
            model,
            points,
            indices: Vec::new(),
        }
    }

    /// Triangle mesh.
    #[must_use]
    pub fn mesh(model: Pose, mesh: &TriMesh) -> Self {
        Self {
            kind: RenderKind::TriangleMesh,
            model,
            points: mesh.vertices().to_vec(),
            indices: mesh.triangles().iter().flatten().copied().collect(),
        }
    }

    /// Points in world coordinates.
    pub fn world_points(&self) -> impl Iterator<Item = Point3<f64>> + '_ {
        self.points.iter().map(move |p| self.model.transform_point(p))
    }
}

/// Body poses captured after a step.
#[derive(Debug, Clone, Default)]
pub struct WorldSnapshot {
    time: f64,
    step: u64,
    poses: HashMap<BodyId, Pose>,
}

impl WorldSnapshot {
    /// Empty snapshot at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the poses of `bodies` from an engine.
    pub fn capture<E: DynamicsEngine + ?Sized>(
        engine: &E,
        bodies: impl IntoIterator<Item = BodyId>,
        time: f64,
        step: u64,
    ) -> Result<Self> {
        let mut poses = HashMap::new();
        for body in bodies {
            poses.insert(body, engine.transform(body)?);
        }
        Ok(Self { time, step, poses })
    }

    /// Record one pose.
    pub fn insert(&mut self, body: BodyId, pose: Pose) {
        self.poses.insert(body, pose);
    }

    /// Pose of a body, if captured.
    #[must_use]
    pub fn pose(&self, body: BodyId) -> Option<Pose> {
        self.poses.get(&body).copied()
    }

    /// Simulated time of the capture.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Step count at the capture.
    #[must_use]
    pub fn step(&self) -> u64 {
        self.step
    }

    /// Number of captured bodies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    /// Check if nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }
}
