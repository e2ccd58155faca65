//! Flexible cables as chains of rigid segments.
//!
//! A cable of length `L` and `N` segments becomes `N` cylinders of length
//! `L / N`, each with its local Z axis along the cable, joined at their
//! shared faces by bending links:
//!
//! ```text
//!  end1                                                      end2
//!   ●━━━━━━━━━━┓●┏━━━━━━━━━━┓●┏━━━━━━━━━━┓●┏━━━━━━━━━━━━●
//!   │ seg 0    │ │ seg 1    │ │ seg 2    │ │ seg N−1    │
//!   │  Even    │ │  Odd     │ │  Even    │ │            │
//!   ┗━━━━━━━━━━┛ ┗━━━━━━━━━━┛ ┗━━━━━━━━━━┛ ┗━━━━━━━━━━━━┛
//!      link 0 ──┘   link 1 ──┘   link 2 ──┘           (N − 1 links)
//! ```
//!
//! Segments alternate between the `Even` and `Odd` self-collision groups.
//! A self-colliding cable lets even segments touch even ones and odd touch
//! odd, which keeps neighbors (always of opposite parity) apart. Otherwise
//! no segment touches any cable segment.
//!
//! Each end may additionally be pinned to another body by a ball link.

use nalgebra::{Point3, Vector3};
use sim_hydro::{Geometry, Shape};
use sim_types::{
    BodyId, CollisionFilter, CollisionShape, ConstraintId, DynamicsEngine, LinkCompliance,
    LinkDesc, Pose, RigidBodyDesc,
};
use std::f64::consts::PI;
use std::sync::Arc;
use tracing::debug;

use crate::entity::{FluidBody, GeometryProvider, Render};
use crate::error::{EntityError, Result};
use crate::material::Material;
use crate::render::{Renderable, WorldSnapshot};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Curve endpoints farther than this from the cable ends are rejected.
const CURVE_END_TOLERANCE: f64 = 1e-9;

/// Self-collision parity of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SelfCollisionGroup {
    /// Even segment index.
    Even,
    /// Odd segment index.
    Odd,
}

impl SelfCollisionGroup {
    /// Group of the segment at `index`.
    #[must_use]
    pub const fn of_segment(index: usize) -> Self {
        if index % 2 == 0 { Self::Even } else { Self::Odd }
    }

    /// Collision filter for a segment of this group.
    #[must_use]
    pub const fn filter(self, self_collidable: bool) -> CollisionFilter {
        match (self_collidable, self) {
            (false, _) => CollisionFilter::cable(),
            (true, Self::Even) => CollisionFilter::cable_even(),
            (true, Self::Odd) => CollisionFilter::cable_odd(),
        }
    }
}

/// Construction parameters of a cable.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CableConfig {
    /// First end point.
    pub end1: Point3<f64>,
    /// Second end point.
    pub end2: Point3<f64>,
    /// Number of rigid segments.
    pub segments: usize,
    /// Cable diameter (m).
    pub diameter: f64,
    /// Bending rigidity `EI` (N·m²).
    pub stiffness: f64,
    /// Whether segments collide with other segments of the same cable.
    pub self_collidable: bool,
    /// Initial shape as a polyline from `end1` to `end2`; straight when
    /// absent.
    pub initial_curve: Option<Vec<Point3<f64>>>,
}

impl Default for CableConfig {
    fn default() -> Self {
        Self {
            end1: Point3::origin(),
            end2: Point3::new(1.0, 0.0, 0.0),
            segments: 10,
            diameter: 0.01,
            stiffness: 1.0,
            self_collidable: false,
            initial_curve: None,
        }
    }
}

impl CableConfig {
    /// Straight cable between two points.
    #[must_use]
    pub fn straight(
        end1: Point3<f64>,
        end2: Point3<f64>,
        segments: usize,
        diameter: f64,
        stiffness: f64,
    ) -> Self {
        Self {
            end1,
            end2,
            segments,
            diameter,
            stiffness,
            ..Self::default()
        }
    }

    /// Set self-collision.
    #[must_use]
    pub fn with_self_collision(mut self, self_collidable: bool) -> Self {
        self.self_collidable = self_collidable;
        self
    }

    /// Lay the cable out along a polyline.
    #[must_use]
    pub fn with_curve(mut self, points: Vec<Point3<f64>>) -> Self {
        self.initial_curve = Some(points);
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let finite = |p: &Point3<f64>| p.coords.iter().all(|x| x.is_finite());
        if self.segments == 0 {
            return Err(EntityError::invalid_cable("cable needs at least one segment"));
        }
        if !finite(&self.end1) || !finite(&self.end2) {
            return Err(EntityError::invalid_cable("cable ends must be finite"));
        }
        if self.end1 == self.end2 {
            return Err(EntityError::invalid_cable("cable ends coincide"));
        }
        if !(self.diameter.is_finite() && self.diameter > 0.0) {
            return Err(EntityError::invalid_cable(format!(
                "diameter must be positive, got {}",
                self.diameter
            )));
        }
        if !(self.stiffness.is_finite() && self.stiffness > 0.0) {
            return Err(EntityError::invalid_cable(format!(
                "stiffness must be positive, got {}",
                self.stiffness
            )));
        }
        if let Some(curve) = &self.initial_curve {
            let (Some(first), Some(last)) = (curve.first(), curve.last()) else {
                return Err(EntityError::invalid_cable("initial curve is empty"));
            };
            if curve.len() < 2 || !curve.iter().all(finite) {
                return Err(EntityError::invalid_cable(
                    "initial curve needs at least two finite points",
                ));
            }
            if (first - self.end1).norm() > CURVE_END_TOLERANCE
                || (last - self.end2).norm() > CURVE_END_TOLERANCE
            {
                return Err(EntityError::invalid_cable(
                    "initial curve must run from end1 to end2",
                ));
            }
        }
        Ok(())
    }

    /// Cable length along its initial shape.
    #[must_use]
    pub fn total_length(&self) -> f64 {
        self.path().windows(2).map(|w| (w[1] - w[0]).norm()).sum()
    }

    fn path(&self) -> Vec<Point3<f64>> {
        self.initial_curve
            .clone()
            .unwrap_or_else(|| vec![self.end1, self.end2])
    }
}

/// Point at arc length `s` along a polyline.
fn point_at(path: &[Point3<f64>], mut s: f64) -> Point3<f64> {
    for w in path.windows(2) {
        let len = (w[1] - w[0]).norm();
        if s <= len && len > 0.0 {
            return w[0] + (w[1] - w[0]) * (s / len);
        }
        s -= len;
    }
    path.last().copied().unwrap_or_else(Point3::origin)
}

/// One rigid segment of a cable in an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CableSegment {
    /// Position along the cable, from `end1`.
    pub index: usize,
    /// Engine handle.
    pub body: BodyId,
    /// Self-collision parity.
    pub group: SelfCollisionGroup,
}

/// A flexible cable.
#[derive(Debug, Clone)]
pub struct CableEntity {
    name: String,
    config: CableConfig,
    material: Arc<Material>,
    segment_geometry: Arc<Geometry>,
    segment_length: f64,
    segments: Vec<CableSegment>,
    links: Vec<ConstraintId>,
    first_attachment: Option<ConstraintId>,
    second_attachment: Option<ConstraintId>,
}

impl CableEntity {
    /// Create a cable that is not yet in any engine.
    ///
    /// # Errors
    ///
    /// Returns [`EntityError::InvalidCable`] for zero segments, coincident
    /// ends, a non-positive diameter or stiffness, or a malformed curve.
    pub fn new(
        name: impl Into<String>,
        config: CableConfig,
        material: Arc<Material>,
    ) -> Result<Self> {
        config.validate()?;
        let segment_length = config.total_length() / config.segments as f64;
        let segment_geometry = Geometry::new(Shape::cylinder(
            config.diameter / 2.0,
            segment_length / 2.0,
        ))?;
        Ok(Self {
            name: name.into(),
            config,
            material,
            segment_geometry: Arc::new(segment_geometry),
            segment_length,
            segments: Vec::new(),
            links: Vec::new(),
            first_attachment: None,
            second_attachment: None,
        })
    }

    /// Entity name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Construction parameters.
    #[must_use]
    pub fn config(&self) -> &CableConfig {
        &self.config
    }

    /// Cable material.
    #[must_use]
    pub fn material(&self) -> &Arc<Material> {
        &self.material
    }

    /// Geometry shared by every segment.
    #[must_use]
    pub fn segment_geometry(&self) -> &Geometry {
        &self.segment_geometry
    }

    /// Total cable length (m).
    #[must_use]
    pub fn total_length(&self) -> f64 {
        self.segment_length * self.config.segments as f64
    }

    /// Length of one segment (m).
    #[must_use]
    pub fn segment_length(&self) -> f64 {
        self.segment_length
    }

    /// Number of segments.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.config.segments
    }

    /// Volume of one segment (m³).
    #[must_use]
    pub fn part_volume(&self) -> f64 {
        let r = self.config.diameter / 2.0;
        PI * r * r * self.segment_length
    }

    /// Mass of one segment (kg).
    #[must_use]
    pub fn segment_mass(&self) -> f64 {
        self.part_volume() * self.material.density
    }

    /// Whether segments of this cable collide with each other.
    #[must_use]
    pub fn is_self_collidable(&self) -> bool {
        self.config.self_collidable
    }

    /// Segments in the engine, in order from `end1`.
    #[must_use]
    pub fn segments(&self) -> &[CableSegment] {
        &self.segments
    }

    /// Internal links, in order from `end1`.
    #[must_use]
    pub fn links(&self) -> &[ConstraintId] {
        &self.links
    }

    /// Check if the cable is in an engine.
    #[must_use]
    pub fn is_added(&self) -> bool {
        !self.segments.is_empty()
    }

    /// Compliance of the links between segments.
    #[must_use]
    pub fn link_compliance(&self) -> LinkCompliance {
        LinkCompliance::from_stiffness(self.config.stiffness, self.segment_length)
    }

    /// Initial segment poses, local Z along the cable.
    #[must_use]
    pub fn initial_poses(&self) -> Vec<Pose> {
        let path = self.config.path();
        let fallback = self.config.end2 - self.config.end1;
        (0..self.config.segments)
            .map(|i| {
                let a = point_at(&path, i as f64 * self.segment_length);
                let b = point_at(&path, (i + 1) as f64 * self.segment_length);
                let dir = if a == b { fallback } else { b - a };
                Pose::looking_along(nalgebra::center(&a, &b), &dir)
            })
            .collect()
    }

    /// Collision proxy: a capsule fitting inside the segment length.
    fn collision_shape(&self) -> CollisionShape {
        let radius = self.config.diameter / 2.0;
        CollisionShape::Capsule {
            half_length: (self.segment_length / 2.0 - radius).max(0.0),
            radius,
        }
    }

    /// Create every segment and the links between them.
    pub fn add_to_engine<E: DynamicsEngine + ?Sized>(&mut self, engine: &mut E) -> Result<()> {
        if self.is_added() {
            return Err(EntityError::AlreadyAdded(self.name.clone()));
        }
        let mass = self.segment_geometry.mass_properties(self.material.density);
        let shape = self.collision_shape();

        let mut segments = Vec::with_capacity(self.config.segments);
        for (index, pose) in self.initial_poses().into_iter().enumerate() {
            let group = SelfCollisionGroup::of_segment(index);
            let desc = RigidBodyDesc::new(shape.clone(), mass, pose)
                .with_filter(group.filter(self.config.self_collidable))
                .with_contact_material(self.material.friction, self.material.restitution);
            segments.push(CableSegment {
                index,
                body: engine.create_rigid_body(desc)?,
                group,
            });
        }

        let half = self.segment_length / 2.0;
        let compliance = self.link_compliance();
        let mut links = Vec::with_capacity(segments.len().saturating_sub(1));
        for pair in segments.windows(2) {
            let desc = LinkDesc::new(
                pair[0].body,
                Point3::new(0.0, 0.0, half),
                pair[1].body,
                Point3::new(0.0, 0.0, -half),
            )
            .with_compliance(compliance);
            links.push(engine.create_constraint(desc)?);
        }

        debug!(
            name = %self.name,
            segments = segments.len(),
            links = links.len(),
            length = self.total_length(),
            self_collidable = self.config.self_collidable,
            "added cable"
        );
        self.segments = segments;
        self.links = links;
        Ok(())
    }

    /// Segment at `end1`.
    pub fn first_end(&self) -> Result<BodyId> {
        self.segments
            .first()
            .map(|s| s.body)
            .ok_or_else(|| EntityError::not_added(&self.name))
    }

    /// Segment at `end2`.
    pub fn second_end(&self) -> Result<BodyId> {
        self.segments
            .last()
            .map(|s| s.body)
            .ok_or_else(|| EntityError::not_added(&self.name))
    }

    /// Pin `end1` to `anchor` in `body`'s frame.
    pub fn attach_first_end<E: DynamicsEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        body: BodyId,
        anchor: Point3<f64>,
    ) -> Result<ConstraintId> {
        if self.first_attachment.is_some() {
            return Err(EntityError::DuplicateAttachment {
                name: self.name.clone(),
                end: "first",
            });
        }
        let end = Point3::new(0.0, 0.0, -self.segment_length / 2.0);
        let id = engine.create_constraint(
            LinkDesc::new(self.first_end()?, end, body, anchor)
                .with_compliance(LinkCompliance::ball()),
        )?;
        self.first_attachment = Some(id);
        Ok(id)
    }

    /// Pin `end2` to `anchor` in `body`'s frame.
    pub fn attach_second_end<E: DynamicsEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        body: BodyId,
        anchor: Point3<f64>,
    ) -> Result<ConstraintId> {
        if self.second_attachment.is_some() {
            return Err(EntityError::DuplicateAttachment {
                name: self.name.clone(),
                end: "second",
            });
        }
        let end = Point3::new(0.0, 0.0, self.segment_length / 2.0);
        let id = engine.create_constraint(
            LinkDesc::new(self.second_end()?, end, body, anchor)
                .with_compliance(LinkCompliance::ball()),
        )?;
        self.second_attachment = Some(id);
        Ok(id)
    }

    /// External links at `(end1, end2)`.
    #[must_use]
    pub fn attachments(&self) -> (Option<ConstraintId>, Option<ConstraintId>) {
        (self.first_attachment, self.second_attachment)
    }

    /// Switch self-collision on or off for a cable already in an engine.
    pub fn set_self_collidable<E: DynamicsEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        self_collidable: bool,
    ) -> Result<()> {
        for segment in &self.segments {
            engine.set_collision_mask(segment.body, segment.group.filter(self_collidable))?;
        }
        self.config.self_collidable = self_collidable;
        Ok(())
    }

    /// Centerline through both ends and every joint, in world coordinates.
    ///
    /// Empty unless every segment is in the snapshot.
    #[must_use]
    pub fn centerline(&self, snapshot: &WorldSnapshot) -> Vec<Point3<f64>> {
        let half = self.segment_length / 2.0;
        let poses: Option<Vec<Pose>> = self.segments.iter().map(|s| snapshot.pose(s.body)).collect();
        let Some(poses) = poses else {
            return Vec::new();
        };
        let Some(first) = poses.first() else {
            return Vec::new();
        };
        std::iter::once(first.transform_point(&Point3::new(0.0, 0.0, -half)))
            .chain(
                poses
                    .iter()
                    .map(|p| p.transform_point(&Point3::new(0.0, 0.0, half))),
            )
            .collect()
    }

    /// Direction of the chord from `end1` to `end2`.
    #[must_use]
    pub fn chord(&self) -> Vector3<f64> {
        self.config.end2 - self.config.end1
    }
}

impl GeometryProvider for CableEntity {
    fn fluid_bodies(&self) -> Vec<FluidBody<'_>> {
        self.segments
            .iter()
            .map(|s| FluidBody {
                body: s.body,
                geometry: &self.segment_geometry,
                density: self.material.density,
            })
            .collect()
    }
}

impl Render for CableEntity {
    fn renderables<'a>(
        &'a self,
        snapshot: &'a WorldSnapshot,
    ) -> impl Iterator<Item = Renderable> + 'a {
        let mesh = self.segment_geometry.tessellate();
        let meshes = self
            .segments
            .iter()
            .filter_map(move |s| snapshot.pose(s.body).map(|pose| Renderable::mesh(pose, &mesh)));
        let centerline = std::iter::once_with(move || {
            let points = self.centerline(snapshot);
            (!points.is_empty()).then(|| Renderable::line_strip(Pose::identity(), points))
        })
        .flatten();
        meshes.chain(centerline)
    }
}
