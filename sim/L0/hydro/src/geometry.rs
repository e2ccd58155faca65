//! Body geometry as seen by the fluid model.
//!
//! A [`Geometry`] wraps a validated [`Shape`] with everything the per-step
//! load computation needs, computed once at construction:
//!
//! - volume and centroid
//! - local bounding box and bounding radius
//! - the equivalent inertia box (full side lengths along the principal axes
//!   of a uniform-density body), used for rotational drag
//! - the equivalent diameter used by the viscous terms
//! - a submersion model: closed form for spheres and ellipsoids, exact
//!   polyhedral clipping for boxes and meshes, and a fine inscribed
//!   polyhedral proxy for cylinders and capsules
//!
//! Shapes are expressed in the body frame. Cylinders and capsules are
//! aligned with local Z.

use hashbrown::HashMap;
use nalgebra::{Matrix3, Point3, Vector3};
use sim_types::{CollisionShape, MassProperties, Pose};
use std::f64::consts::PI;

use crate::error::{HydroError, Result};
use crate::fluid::FreeSurface;
use crate::submersion::{self, Submersion};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Sides of the polyhedral proxy used for cylinder and capsule submersion.
const PROXY_SEGMENTS: usize = 48;
/// Latitude bands per hemisphere of the capsule proxy.
const PROXY_STACKS: usize = 12;
/// Sides of render tessellations.
const RENDER_SEGMENTS: usize = 24;
/// Latitude bands per hemisphere of render tessellations.
const RENDER_STACKS: usize = 8;

/// Solid shape of a body, in its local frame.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Shape {
    /// Sphere centered at the origin.
    Sphere {
        /// Radius (m).
        radius: f64,
    },
    /// Box centered at the origin.
    Box {
        /// Half side lengths (m).
        half_extents: Vector3<f64>,
    },
    /// Cylinder along local Z, centered at the origin.
    Cylinder {
        /// Radius (m).
        radius: f64,
        /// Half length (m).
        half_length: f64,
    },
    /// Capsule along local Z: a cylinder of `half_length` with hemispherical
    /// caps.
    Capsule {
        /// Radius (m).
        radius: f64,
        /// Half length of the cylindrical part (m).
        half_length: f64,
    },
    /// Ellipsoid centered at the origin.
    Ellipsoid {
        /// Semi-axes along local X, Y and Z (m).
        radii: Vector3<f64>,
    },
    /// Closed triangle mesh.
    Mesh(TriMesh),
    /// Several shapes rigidly attached at local poses.
    Compound(Vec<CompoundPart>),
}

/// One part of a compound shape.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CompoundPart {
    /// Pose of the part in the compound's frame.
    pub pose: Pose,
    /// Part shape.
    pub shape: Shape,
}

impl CompoundPart {
    /// Create a compound part.
    #[must_use]
    pub fn new(pose: Pose, shape: Shape) -> Self {
        Self { pose, shape }
    }
}

impl Shape {
    /// Sphere shape.
    #[must_use]
    pub fn sphere(radius: f64) -> Self {
        Self::Sphere { radius }
    }

    /// Box shape from half extents.
    #[must_use]
    pub fn cuboid(half_extents: Vector3<f64>) -> Self {
        Self::Box { half_extents }
    }

    /// Cylinder along local Z.
    #[must_use]
    pub fn cylinder(radius: f64, half_length: f64) -> Self {
        Self::Cylinder {
            radius,
            half_length,
        }
    }

    /// Capsule along local Z.
    #[must_use]
    pub fn capsule(radius: f64, half_length: f64) -> Self {
        Self::Capsule {
            radius,
            half_length,
        }
    }

    /// Ellipsoid with the given semi-axes.
    #[must_use]
    pub fn ellipsoid(radii: Vector3<f64>) -> Self {
        Self::Ellipsoid { radii }
    }

    /// Validate dimensions recursively.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Sphere { radius } => positive("sphere radius", *radius),
            Self::Box { half_extents } => half_extents
                .iter()
                .try_for_each(|h| positive("box half extent", *h)),
            Self::Cylinder {
                radius,
                half_length,
            } => {
                positive("cylinder radius", *radius)?;
                positive("cylinder half length", *half_length)
            }
            Self::Capsule {
                radius,
                half_length,
            } => {
                positive("capsule radius", *radius)?;
                if half_length.is_finite() && *half_length >= 0.0 {
                    Ok(())
                } else {
                    Err(HydroError::invalid_geometry(format!(
                        "capsule half length must be non-negative, got {half_length}"
                    )))
                }
            }
            Self::Ellipsoid { radii } => radii
                .iter()
                .try_for_each(|r| positive("ellipsoid radius", *r)),
            // Meshes are validated when built
            Self::Mesh(_) => Ok(()),
            Self::Compound(parts) => {
                if parts.is_empty() {
                    return Err(HydroError::invalid_geometry("compound has no parts"));
                }
                for part in parts {
                    if !part.pose.is_finite() {
                        return Err(HydroError::invalid_geometry(
                            "compound part pose must be finite",
                        ));
                    }
                    part.shape.validate()?;
                }
                Ok(())
            }
        }
    }

    /// Half extents of the local bounding box of a primitive.
    fn primitive_half_extents(&self) -> Option<Vector3<f64>> {
        match self {
            Self::Sphere { radius } => Some(Vector3::repeat(*radius)),
            Self::Box { half_extents } => Some(*half_extents),
            Self::Cylinder {
                radius,
                half_length,
            } => Some(Vector3::new(*radius, *radius, *half_length)),
            Self::Capsule {
                radius,
                half_length,
            } => Some(Vector3::new(*radius, *radius, half_length + radius)),
            Self::Ellipsoid { radii } => Some(*radii),
            Self::Mesh(_) | Self::Compound(_) => None,
        }
    }
}

fn positive(what: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(HydroError::invalid_geometry(format!(
            "{what} must be positive, got {value}"
        )))
    }
}

/// Closed, consistently oriented triangle mesh with outward normals.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TriMesh {
    vertices: Vec<Point3<f64>>,
    triangles: Vec<[usize; 3]>,
}

impl TriMesh {
    /// Build a mesh, checking that it bounds a solid.
    ///
    /// Every directed edge must appear exactly once and be matched by its
    /// reverse. Inward-facing meshes are flipped.
    ///
    /// # Errors
    ///
    /// Returns [`HydroError::InvalidGeometry`] for out-of-range indices,
    /// degenerate triangles, open or inconsistently wound meshes,
    /// non-finite vertices and zero volume.
    pub fn new(vertices: Vec<Point3<f64>>, triangles: Vec<[usize; 3]>) -> Result<Self> {
        if vertices.len() < 4 || triangles.len() < 4 {
            return Err(HydroError::invalid_geometry(
                "mesh needs at least 4 vertices and 4 triangles",
            ));
        }
        if !vertices.iter().all(|v| v.coords.iter().all(|x| x.is_finite())) {
            return Err(HydroError::invalid_geometry("mesh vertices must be finite"));
        }

        let mut edges: HashMap<(usize, usize), u32> = HashMap::with_capacity(triangles.len() * 3);
        for (t, tri) in triangles.iter().enumerate() {
            if tri.iter().any(|&i| i >= vertices.len()) {
                return Err(HydroError::invalid_geometry(format!(
                    "triangle {t} references a missing vertex"
                )));
            }
            if tri[0] == tri[1] || tri[1] == tri[2] || tri[2] == tri[0] {
                return Err(HydroError::invalid_geometry(format!(
                    "triangle {t} repeats a vertex"
                )));
            }
            for k in 0..3 {
                *edges.entry((tri[k], tri[(k + 1) % 3])).or_insert(0) += 1;
            }
        }
        for (&(a, b), &count) in &edges {
            if count != 1 || edges.get(&(b, a)) != Some(&1) {
                return Err(HydroError::invalid_geometry(format!(
                    "edge ({a}, {b}) is open or inconsistently wound"
                )));
            }
        }

        let mut mesh = Self {
            vertices,
            triangles,
        };
        let volume = mesh.signed_volume();
        if !(volume.is_finite() && volume != 0.0) {
            return Err(HydroError::invalid_geometry("mesh encloses no volume"));
        }
        if volume < 0.0 {
            for tri in &mut mesh.triangles {
                tri.swap(1, 2);
            }
        }
        Ok(mesh)
    }

    /// Axis-aligned box centered at the origin.
    #[must_use]
    pub fn cuboid(half_extents: Vector3<f64>) -> Self {
        let vertices = (0..8_usize)
            .map(|i| {
                Point3::new(
                    if i & 1 == 0 { -half_extents.x } else { half_extents.x },
                    if i & 2 == 0 { -half_extents.y } else { half_extents.y },
                    if i & 4 == 0 { -half_extents.z } else { half_extents.z },
                )
            })
            .collect();

        let mut triangles = Vec::with_capacity(12);
        for k in 0..3 {
            let (u, v) = ((k + 1) % 3, (k + 2) % 3);
            for side in 0..2_usize {
                // Counter-clockwise about +k
                let q = [(0, 0), (1, 0), (1, 1), (0, 1)]
                    .map(|(bu, bv): (usize, usize)| (side << k) | (bu << u) | (bv << v));
                if side == 1 {
                    triangles.push([q[0], q[1], q[2]]);
                    triangles.push([q[0], q[2], q[3]]);
                } else {
                    triangles.push([q[0], q[2], q[1]]);
                    triangles.push([q[0], q[3], q[2]]);
                }
            }
        }
        Self {
            vertices,
            triangles,
        }
    }

    /// Surface of revolution about local Z.
    ///
    /// `profile` lists `(radius, z)` pairs from the bottom pole to the top
    /// pole. Both ends must lie on the axis and every interior point off it.
    ///
    /// # Errors
    ///
    /// Returns [`HydroError::InvalidGeometry`] for a malformed profile or
    /// fewer than 3 segments.
    pub fn lathe(profile: &[(f64, f64)], segments: usize) -> Result<Self> {
        if segments < 3 {
            return Err(HydroError::invalid_geometry("lathe needs at least 3 segments"));
        }
        let (Some(first), Some(last)) = (profile.first(), profile.last()) else {
            return Err(HydroError::invalid_geometry("lathe profile is empty"));
        };
        if profile.len() < 3 || first.0 != 0.0 || last.0 != 0.0 {
            return Err(HydroError::invalid_geometry(
                "lathe profile must start and end on the axis",
            ));
        }
        if profile[1..profile.len() - 1]
            .iter()
            .any(|(r, z)| !(r.is_finite() && *r > 0.0 && z.is_finite()))
        {
            return Err(HydroError::invalid_geometry(
                "interior lathe profile points must lie off the axis",
            ));
        }
        let mesh = Self::revolve(profile, segments);
        Self::new(mesh.vertices, mesh.triangles)
    }

    fn revolve(profile: &[(f64, f64)], segments: usize) -> Self {
        let mut vertices = Vec::new();
        let mut rings: Vec<Vec<usize>> = Vec::with_capacity(profile.len());
        for &(radius, z) in profile {
            let start = vertices.len();
            if radius == 0.0 {
                vertices.push(Point3::new(0.0, 0.0, z));
                rings.push(vec![start]);
            } else {
                vertices.extend((0..segments).map(|j| {
                    let a = std::f64::consts::TAU * j as f64 / segments as f64;
                    Point3::new(radius * a.cos(), radius * a.sin(), z)
                }));
                rings.push((start..start + segments).collect());
            }
        }

        let mut triangles = Vec::new();
        for band in rings.windows(2) {
            for j in 0..segments {
                let j1 = (j + 1) % segments;
                match (band[0].as_slice(), band[1].as_slice()) {
                    ([_], [_]) => {}
                    ([pole], ring) => triangles.push([*pole, ring[j1], ring[j]]),
                    (ring, [pole]) => triangles.push([ring[j], ring[j1], *pole]),
                    (lo, hi) => {
                        triangles.push([lo[j], lo[j1], hi[j1]]);
                        triangles.push([lo[j], hi[j1], hi[j]]);
                    }
                }
            }
        }
        Self {
            vertices,
            triangles,
        }
    }

    /// Vertices in the local frame.
    #[must_use]
    pub fn vertices(&self) -> &[Point3<f64>] {
        &self.vertices
    }

    /// Triangles as vertex index triples, counter-clockwise seen from
    /// outside.
    #[must_use]
    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// Signed enclosed volume (positive for outward winding).
    #[must_use]
    pub fn signed_volume(&self) -> f64 {
        self.triangles
            .iter()
            .map(|&[a, b, c]| {
                let (a, b, c) = (
                    self.vertices[a].coords,
                    self.vertices[b].coords,
                    self.vertices[c].coords,
                );
                a.dot(&b.cross(&c))
            })
            .sum::<f64>()
            / 6.0
    }

    /// Mass properties of the solid at uniform density.
    ///
    /// Sums the covariance of the signed tetrahedra spanned by the origin
    /// and each triangle, then shifts it to the center of mass.
    #[must_use]
    pub fn mass_properties(&self, density: f64) -> MassProperties {
        let canonical = Matrix3::new(2.0, 1.0, 1.0, 1.0, 2.0, 1.0, 1.0, 1.0, 2.0) / 120.0;
        let mut volume = 0.0;
        let mut first_moment = Vector3::zeros();
        let mut covariance = Matrix3::zeros();
        for &[a, b, c] in &self.triangles {
            let a = self.vertices[a].coords;
            let b = self.vertices[b].coords;
            let c = self.vertices[c].coords;
            let basis = Matrix3::from_columns(&[a, b, c]);
            let det = basis.determinant();
            volume += det / 6.0;
            first_moment += (a + b + c) * (det / 24.0);
            covariance += basis * canonical * basis.transpose() * det;
        }
        if volume <= 0.0 {
            return MassProperties::new(0.0, Vector3::zeros(), Matrix3::zeros());
        }
        let com = first_moment / volume;
        let covariance = covariance - com * com.transpose() * volume;
        let inertia = Matrix3::identity() * covariance.trace() - covariance;
        MassProperties::new(volume * density, com, inertia * density)
    }

    /// Area of the silhouette seen along `direction` (unit).
    ///
    /// Exact for convex meshes.
    #[must_use]
    pub fn projected_area(&self, direction: &Vector3<f64>) -> f64 {
        0.25 * self
            .triangles
            .iter()
            .map(|&[a, b, c]| {
                let (a, b, c) = (self.vertices[a], self.vertices[b], self.vertices[c]);
                direction.dot(&(b - a).cross(&(c - a))).abs()
            })
            .sum::<f64>()
    }

    /// Local bounding box as `(min, max)`.
    #[must_use]
    pub fn bounds(&self) -> (Point3<f64>, Point3<f64>) {
        bounds_of(self.vertices.iter().copied())
    }

    /// Copy with every vertex mapped through `pose`.
    #[must_use]
    pub fn transformed(&self, pose: &Pose) -> Self {
        Self {
            vertices: self.vertices.iter().map(|v| pose.transform_point(v)).collect(),
            triangles: self.triangles.clone(),
        }
    }

    /// Copy scaled per axis (all factors positive).
    #[must_use]
    fn scaled(&self, factors: &Vector3<f64>) -> Self {
        Self {
            vertices: self
                .vertices
                .iter()
                .map(|v| Point3::from(v.coords.component_mul(factors)))
                .collect(),
            triangles: self.triangles.clone(),
        }
    }

    /// Concatenate meshes into one vertex and index list.
    #[must_use]
    pub fn merged(meshes: impl IntoIterator<Item = Self>) -> Self {
        let mut out = Self {
            vertices: Vec::new(),
            triangles: Vec::new(),
        };
        for mesh in meshes {
            let offset = out.vertices.len();
            out.vertices.extend(mesh.vertices);
            out.triangles
                .extend(mesh.triangles.iter().map(|t| t.map(|i| i + offset)));
        }
        out
    }
}

fn bounds_of(points: impl Iterator<Item = Point3<f64>>) -> (Point3<f64>, Point3<f64>) {
    let mut min = Point3::from(Vector3::repeat(f64::INFINITY));
    let mut max = Point3::from(Vector3::repeat(f64::NEG_INFINITY));
    for p in points {
        min = min.inf(&p);
        max = max.sup(&p);
    }
    (min, max)
}

fn cylinder_profile(radius: f64, half_length: f64) -> Vec<(f64, f64)> {
    vec![
        (0.0, -half_length),
        (radius, -half_length),
        (radius, half_length),
        (0.0, half_length),
    ]
}

/// Capsule outline; a zero `half_length` yields a sphere.
fn capsule_profile(radius: f64, half_length: f64, stacks: usize) -> Vec<(f64, f64)> {
    let step = 0.5 * PI / stacks as f64;
    let mut profile = vec![(0.0, -half_length - radius)];
    for k in 1..=stacks {
        let phi = -0.5 * PI + k as f64 * step;
        profile.push((radius * phi.cos(), -half_length + radius * phi.sin()));
    }
    let first_top = usize::from(half_length == 0.0);
    for k in first_top..stacks {
        let phi = k as f64 * step;
        profile.push((radius * phi.cos(), half_length + radius * phi.sin()));
    }
    profile.push((0.0, half_length + radius));
    profile
}

/// Drag coefficients scaling the quadratic drag terms.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DragCoefficients {
    /// Translational drag coefficient `C_d`.
    pub translational: f64,
    /// Rotational drag coefficient `C_r`.
    pub rotational: f64,
}

impl Default for DragCoefficients {
    fn default() -> Self {
        Self {
            translational: 1.0,
            rotational: 1.0,
        }
    }
}

impl DragCoefficients {
    /// Create drag coefficients.
    #[must_use]
    pub const fn new(translational: f64, rotational: f64) -> Self {
        Self {
            translational,
            rotational,
        }
    }

    /// Typical high-Reynolds coefficients for a shape class.
    #[must_use]
    pub fn for_shape(shape: &Shape) -> Self {
        let translational = match shape {
            Shape::Sphere { .. } | Shape::Ellipsoid { .. } => 0.47,
            Shape::Box { .. } => 1.05,
            Shape::Capsule { .. } => 0.8,
            Shape::Cylinder { .. } | Shape::Mesh(_) | Shape::Compound(_) => 1.0,
        };
        Self {
            translational,
            rotational: 1.0,
        }
    }

    /// Validate that both coefficients are finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        if [self.translational, self.rotational]
            .iter()
            .all(|c| c.is_finite() && *c >= 0.0)
        {
            Ok(())
        } else {
            Err(HydroError::invalid_geometry(format!(
                "drag coefficients must be non-negative, got {self:?}"
            )))
        }
    }
}

/// How submerged volume is integrated for a geometry.
#[derive(Debug, Clone)]
enum SubmersionModel {
    Ellipsoid(Vector3<f64>),
    Polyhedron { mesh: TriMesh, scale: f64 },
    Compound(Vec<(Pose, Geometry)>),
}

/// Immutable body geometry with cached fluid-model quantities.
#[derive(Debug, Clone)]
pub struct Geometry {
    shape: Shape,
    drag: DragCoefficients,
    volume: f64,
    centroid: Point3<f64>,
    bounds: (Point3<f64>, Point3<f64>),
    bounding_radius: f64,
    principal_axes: Matrix3<f64>,
    inertia_box: Vector3<f64>,
    equivalent_diameter: f64,
    model: SubmersionModel,
}

impl Geometry {
    /// Build a geometry with the default drag coefficients of its shape.
    ///
    /// # Errors
    ///
    /// Returns [`HydroError::InvalidGeometry`] when any dimension is
    /// non-positive or a compound is empty.
    pub fn new(shape: Shape) -> Result<Self> {
        shape.validate()?;

        let model = match &shape {
            Shape::Sphere { radius } => SubmersionModel::Ellipsoid(Vector3::repeat(*radius)),
            Shape::Ellipsoid { radii } => SubmersionModel::Ellipsoid(*radii),
            Shape::Box { half_extents } => SubmersionModel::Polyhedron {
                mesh: TriMesh::cuboid(*half_extents),
                scale: 1.0,
            },
            Shape::Cylinder {
                radius,
                half_length,
            } => proxy_model(
                &cylinder_profile(*radius, *half_length),
                PI * radius * radius * 2.0 * half_length,
            ),
            Shape::Capsule {
                radius,
                half_length,
            } => proxy_model(
                &capsule_profile(*radius, *half_length, PROXY_STACKS),
                capsule_volume(*radius, *half_length),
            ),
            Shape::Mesh(mesh) => SubmersionModel::Polyhedron {
                mesh: mesh.clone(),
                scale: 1.0,
            },
            Shape::Compound(parts) => SubmersionModel::Compound(
                parts
                    .iter()
                    .map(|part| Ok((part.pose, Self::new(part.shape.clone())?)))
                    .collect::<Result<_>>()?,
            ),
        };

        let volume = match (&shape, &model) {
            (Shape::Sphere { radius }, _) => 4.0 / 3.0 * PI * radius.powi(3),
            (Shape::Ellipsoid { radii }, _) => 4.0 / 3.0 * PI * radii.x * radii.y * radii.z,
            (Shape::Box { half_extents }, _) => 8.0 * half_extents.product(),
            (
                Shape::Cylinder {
                    radius,
                    half_length,
                },
                _,
            ) => PI * radius * radius * 2.0 * half_length,
            (
                Shape::Capsule {
                    radius,
                    half_length,
                },
                _,
            ) => capsule_volume(*radius, *half_length),
            (Shape::Mesh(mesh), _) => mesh.signed_volume(),
            (_, SubmersionModel::Compound(parts)) => parts.iter().map(|(_, g)| g.volume).sum(),
            (Shape::Compound(_), _) => 0.0,
        };

        let bounds = match (&shape, &model) {
            (Shape::Mesh(mesh), _) => mesh.bounds(),
            (_, SubmersionModel::Compound(parts)) => bounds_of(parts.iter().flat_map(|(pose, g)| {
                let (lo, hi) = g.bounds;
                (0..8_usize).map(move |i| {
                    pose.transform_point(&Point3::new(
                        if i & 1 == 0 { lo.x } else { hi.x },
                        if i & 2 == 0 { lo.y } else { hi.y },
                        if i & 4 == 0 { lo.z } else { hi.z },
                    ))
                })
            })),
            _ => {
                let half = shape.primitive_half_extents().unwrap_or_else(Vector3::zeros);
                (Point3::from(-half), Point3::from(half))
            }
        };

        let bounding_radius = match (&shape, &model) {
            (Shape::Sphere { radius }, _) => *radius,
            (Shape::Ellipsoid { radii }, _) => radii.max(),
            (Shape::Box { half_extents }, _) => half_extents.norm(),
            (Shape::Cylinder { radius, half_length }, _) => radius.hypot(*half_length),
            (Shape::Capsule { radius, half_length }, _) => radius + half_length,
            (Shape::Mesh(mesh), _) => mesh
                .vertices()
                .iter()
                .map(|v| v.coords.norm())
                .fold(0.0, f64::max),
            (_, SubmersionModel::Compound(parts)) => parts
                .iter()
                .map(|(pose, g)| pose.position.coords.norm() + g.bounding_radius)
                .fold(0.0, f64::max),
            _ => 0.0,
        };

        let mut geometry = Self {
            drag: DragCoefficients::for_shape(&shape),
            shape,
            volume,
            centroid: Point3::origin(),
            bounds,
            bounding_radius,
            principal_axes: Matrix3::identity(),
            inertia_box: Vector3::zeros(),
            equivalent_diameter: 0.0,
            model,
        };

        let unit = geometry.mass_properties(1.0);
        geometry.centroid = Point3::from(unit.center_of_mass);
        let eigen = unit.inertia.symmetric_eigen();
        let i = eigen.eigenvalues;
        let side = |a: f64, b: f64, c: f64| (6.0 * (b + c - a) / volume).max(0.0).sqrt();
        geometry.inertia_box = Vector3::new(
            side(i.x, i.y, i.z),
            side(i.y, i.z, i.x),
            side(i.z, i.x, i.y),
        );
        geometry.principal_axes = eigen.eigenvectors;
        geometry.equivalent_diameter = match geometry.shape.primitive_half_extents() {
            Some(half) => 2.0 / 3.0 * half.sum(),
            None => geometry.inertia_box.sum() / 3.0,
        };

        if !geometry.volume.is_finite() || geometry.volume <= 0.0 {
            return Err(HydroError::invalid_geometry(format!(
                "geometry volume must be positive, got {}",
                geometry.volume
            )));
        }
        Ok(geometry)
    }

    /// Replace the drag coefficients.
    pub fn with_drag_coefficients(mut self, drag: DragCoefficients) -> Result<Self> {
        drag.validate()?;
        self.drag = drag;
        Ok(self)
    }

    /// The underlying shape.
    #[must_use]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Drag coefficients.
    #[must_use]
    pub fn drag_coefficients(&self) -> DragCoefficients {
        self.drag
    }

    /// Enclosed volume (m³).
    #[must_use]
    pub fn volume(&self) -> f64 {
        self.volume
    }

    /// Volume centroid in the local frame.
    #[must_use]
    pub fn centroid(&self) -> Point3<f64> {
        self.centroid
    }

    /// Local bounding box as `(min, max)`.
    #[must_use]
    pub fn bounds(&self) -> (Point3<f64>, Point3<f64>) {
        self.bounds
    }

    /// Half extents of the local bounding box.
    #[must_use]
    pub fn half_extents(&self) -> Vector3<f64> {
        (self.bounds.1 - self.bounds.0) * 0.5
    }

    /// Full size of the local bounding box.
    #[must_use]
    pub fn dimensions(&self) -> Vector3<f64> {
        self.bounds.1 - self.bounds.0
    }

    /// Radius of a sphere about the local origin containing the shape.
    #[must_use]
    pub fn bounding_radius(&self) -> f64 {
        self.bounding_radius
    }

    /// Diameter used by the viscous drag terms.
    #[must_use]
    pub fn equivalent_diameter(&self) -> f64 {
        self.equivalent_diameter
    }

    /// Full side lengths of the box with the same volume-normalized
    /// inertia, along [`Self::principal_axes`].
    #[must_use]
    pub fn inertia_box(&self) -> Vector3<f64> {
        self.inertia_box
    }

    /// Principal axes of inertia as columns, in the local frame.
    #[must_use]
    pub fn principal_axes(&self) -> Matrix3<f64> {
        self.principal_axes
    }

    /// Silhouette area normal to a local direction.
    ///
    /// Returns zero for a zero direction.
    #[must_use]
    pub fn projected_area(&self, direction: &Vector3<f64>) -> f64 {
        let Some(d) = direction.try_normalize(f64::EPSILON) else {
            return 0.0;
        };
        match &self.shape {
            Shape::Sphere { radius } => PI * radius * radius,
            Shape::Ellipsoid { radii } => {
                let (a, b, c) = (radii.x, radii.y, radii.z);
                PI * ((b * c * d.x).powi(2) + (a * c * d.y).powi(2) + (a * b * d.z).powi(2)).sqrt()
            }
            Shape::Box { half_extents } => {
                let s = half_extents * 2.0;
                d.x.abs() * s.y * s.z + d.y.abs() * s.x * s.z + d.z.abs() * s.x * s.y
            }
            Shape::Cylinder {
                radius,
                half_length,
            } => {
                let side = (1.0 - d.z * d.z).max(0.0).sqrt();
                PI * radius * radius * d.z.abs() + 2.0 * radius * 2.0 * half_length * side
            }
            Shape::Capsule {
                radius,
                half_length,
            } => {
                let side = (1.0 - d.z * d.z).max(0.0).sqrt();
                PI * radius * radius + 2.0 * radius * 2.0 * half_length * side
            }
            Shape::Mesh(mesh) => mesh.projected_area(&d),
            Shape::Compound(_) => match &self.model {
                SubmersionModel::Compound(parts) => parts
                    .iter()
                    .map(|(pose, g)| g.projected_area(&pose.inverse_transform_vector(&d)))
                    .sum(),
                _ => 0.0,
            },
        }
    }

    /// Rotational drag moment `K` about a local axis.
    ///
    /// For the equivalent inertia box with sides `b` and the axis expressed
    /// in the principal frame as `ω̂`, `K = Σ ω̂ᵢ² bᵢ (bⱼ⁴ + bₖ⁴) / 32`.
    /// Returns zero for a zero axis.
    #[must_use]
    pub fn rotational_drag_moment(&self, axis: &Vector3<f64>) -> f64 {
        let Some(axis) = axis.try_normalize(f64::EPSILON) else {
            return 0.0;
        };
        let w = self.principal_axes.transpose() * axis;
        let b = self.inertia_box;
        (0..3)
            .map(|i| {
                let (j, k) = ((i + 1) % 3, (i + 2) % 3);
                w[i] * w[i] * b[i] * (b[j].powi(4) + b[k].powi(4)) / 32.0
            })
            .sum()
    }

    /// Mass properties at uniform density, about the local frame.
    #[must_use]
    pub fn mass_properties(&self, density: f64) -> MassProperties {
        let mass = density * self.volume;
        match &self.shape {
            Shape::Sphere { radius } => MassProperties::sphere(mass, *radius),
            Shape::Box { half_extents } => MassProperties::box_shape(mass, *half_extents),
            Shape::Cylinder {
                radius,
                half_length,
            } => MassProperties::cylinder(mass, *radius, *half_length),
            Shape::Capsule {
                radius,
                half_length,
            } => MassProperties::capsule(mass, *radius, *half_length),
            Shape::Ellipsoid { radii } => MassProperties::ellipsoid(mass, *radii),
            Shape::Mesh(mesh) => mesh.mass_properties(density),
            Shape::Compound(_) => match &self.model {
                SubmersionModel::Compound(parts) => MassProperties::combine(
                    &parts
                        .iter()
                        .map(|(pose, g)| g.mass_properties(density).transformed(pose))
                        .collect::<Vec<_>>(),
                ),
                _ => MassProperties::new(0.0, Vector3::zeros(), Matrix3::zeros()),
            },
        }
    }

    /// Submerged volume and center of buoyancy for the body at `pose`.
    ///
    /// The center is in world coordinates.
    #[must_use]
    pub fn submerged(&self, pose: &Pose, surface: &FreeSurface) -> Submersion {
        match &self.model {
            SubmersionModel::Ellipsoid(radii) => submersion::ellipsoid(radii, pose, surface),
            SubmersionModel::Polyhedron { mesh, scale } => {
                submersion::polyhedron(mesh, *scale, pose, surface)
            }
            SubmersionModel::Compound(parts) => Submersion::sum(
                parts
                    .iter()
                    .map(|(part_pose, g)| g.submerged(&pose.compose(part_pose), surface)),
            ),
        }
    }

    /// Collision shape for the dynamics engine.
    #[must_use]
    pub fn collision_shape(&self) -> CollisionShape {
        shape_to_collision(&self.shape)
    }

    /// Triangle mesh for drawing, in the local frame.
    #[must_use]
    pub fn tessellate(&self) -> TriMesh {
        match &self.shape {
            Shape::Sphere { radius } => TriMesh::revolve(
                &capsule_profile(*radius, 0.0, RENDER_STACKS),
                RENDER_SEGMENTS,
            ),
            Shape::Ellipsoid { radii } => {
                TriMesh::revolve(&capsule_profile(1.0, 0.0, RENDER_STACKS), RENDER_SEGMENTS)
                    .scaled(radii)
            }
            Shape::Box { half_extents } => TriMesh::cuboid(*half_extents),
            Shape::Cylinder {
                radius,
                half_length,
            } => TriMesh::revolve(&cylinder_profile(*radius, *half_length), RENDER_SEGMENTS),
            Shape::Capsule {
                radius,
                half_length,
            } => TriMesh::revolve(
                &capsule_profile(*radius, *half_length, RENDER_STACKS),
                RENDER_SEGMENTS,
            ),
            Shape::Mesh(mesh) => mesh.clone(),
            Shape::Compound(_) => match &self.model {
                SubmersionModel::Compound(parts) => TriMesh::merged(
                    parts
                        .iter()
                        .map(|(pose, g)| g.tessellate().transformed(pose)),
                ),
                _ => TriMesh::merged(std::iter::empty()),
            },
        }
    }
}

fn capsule_volume(radius: f64, half_length: f64) -> f64 {
    PI * radius * radius * (2.0 * half_length + 4.0 / 3.0 * radius)
}

fn proxy_model(profile: &[(f64, f64)], analytic_volume: f64) -> SubmersionModel {
    let mesh = TriMesh::revolve(profile, PROXY_SEGMENTS);
    let proxy_volume = mesh.signed_volume();
    let scale = if proxy_volume > 0.0 {
        analytic_volume / proxy_volume
    } else {
        1.0
    };
    SubmersionModel::Polyhedron { mesh, scale }
}

fn shape_to_collision(shape: &Shape) -> CollisionShape {
    match shape {
        Shape::Sphere { radius } => CollisionShape::Sphere { radius: *radius },
        Shape::Box { half_extents } => CollisionShape::Box {
            half_extents: *half_extents,
        },
        Shape::Cylinder {
            radius,
            half_length,
        } => CollisionShape::Cylinder {
            half_length: *half_length,
            radius: *radius,
        },
        Shape::Capsule {
            radius,
            half_length,
        } => CollisionShape::Capsule {
            half_length: *half_length,
            radius: *radius,
        },
        Shape::Ellipsoid { radii } => CollisionShape::Ellipsoid { radii: *radii },
        Shape::Mesh(mesh) => CollisionShape::ConvexMesh {
            vertices: mesh.vertices().to_vec(),
        },
        Shape::Compound(parts) => CollisionShape::Compound(
            parts
                .iter()
                .map(|part| (part.pose, shape_to_collision(&part.shape)))
                .collect(),
        ),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;

    fn sorted(v: Vector3<f64>) -> Vec<f64> {
        let mut out: Vec<f64> = v.iter().copied().collect();
        out.sort_by(f64::total_cmp);
        out
    }

    #[test]
    fn test_primitive_volumes() {
        let sphere = Geometry::new(Shape::sphere(0.5)).unwrap();
        assert_relative_eq!(sphere.volume(), 4.0 / 3.0 * PI * 0.125, epsilon = 1e-12);

        let cuboid = Geometry::new(Shape::cuboid(Vector3::new(0.5, 1.0, 1.5))).unwrap();
        assert_relative_eq!(cuboid.volume(), 6.0, epsilon = 1e-12);

        let cylinder = Geometry::new(Shape::cylinder(0.2, 1.0)).unwrap();
        assert_relative_eq!(cylinder.volume(), PI * 0.04 * 2.0, epsilon = 1e-12);

        let capsule = Geometry::new(Shape::capsule(0.2, 1.0)).unwrap();
        assert_relative_eq!(capsule.volume(), capsule_volume(0.2, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn test_proxy_close_to_analytic() {
        let mesh = TriMesh::revolve(&cylinder_profile(1.0, 1.0), PROXY_SEGMENTS);
        let ratio = mesh.signed_volume() / (2.0 * PI);
        assert!(ratio < 1.0 && ratio > 0.99, "ratio {ratio}");
    }

    #[test]
    fn test_cuboid_mesh_matches_box() {
        let half = Vector3::new(0.5, 1.0, 1.5);
        let mesh = TriMesh::new(
            TriMesh::cuboid(half).vertices().to_vec(),
            TriMesh::cuboid(half).triangles().to_vec(),
        )
        .unwrap();
        assert_relative_eq!(mesh.signed_volume(), 6.0, epsilon = 1e-12);

        let from_mesh = mesh.mass_properties(2.0);
        let analytic = MassProperties::box_shape(12.0, half);
        assert_relative_eq!(from_mesh.mass, analytic.mass, epsilon = 1e-9);
        assert_relative_eq!(from_mesh.center_of_mass, Vector3::zeros(), epsilon = 1e-12);
        assert_relative_eq!(from_mesh.inertia, analytic.inertia, epsilon = 1e-9);
    }

    #[test]
    fn test_mesh_off_center_centroid() {
        let pose = Pose::from_position(Point3::new(1.0, 2.0, 3.0));
        let mesh = TriMesh::cuboid(Vector3::new(0.1, 0.2, 0.3)).transformed(&pose);
        let geometry = Geometry::new(Shape::Mesh(TriMesh::new(
            mesh.vertices().to_vec(),
            mesh.triangles().to_vec(),
        )
        .unwrap()))
        .unwrap();
        assert_relative_eq!(geometry.centroid(), Point3::new(1.0, 2.0, 3.0), epsilon = 1e-12);
        assert_relative_eq!(
            geometry.dimensions(),
            Vector3::new(0.2, 0.4, 0.6),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_inverted_mesh_is_flipped() {
        let cube = TriMesh::cuboid(Vector3::repeat(1.0));
        let inverted: Vec<[usize; 3]> = cube.triangles().iter().map(|t| [t[0], t[2], t[1]]).collect();
        let mesh = TriMesh::new(cube.vertices().to_vec(), inverted).unwrap();
        assert_relative_eq!(mesh.signed_volume(), 8.0, epsilon = 1e-12);
    }

    #[test]
    fn test_open_mesh_rejected() {
        let cube = TriMesh::cuboid(Vector3::repeat(1.0));
        let mut triangles = cube.triangles().to_vec();
        triangles.pop();
        assert!(TriMesh::new(cube.vertices().to_vec(), triangles).is_err());

        let mut bad = cube.triangles().to_vec();
        bad[0] = [0, 0, 1];
        assert!(TriMesh::new(cube.vertices().to_vec(), bad).is_err());

        let mut out_of_range = cube.triangles().to_vec();
        out_of_range[0][0] = 99;
        assert!(TriMesh::new(cube.vertices().to_vec(), out_of_range).is_err());
    }

    #[test]
    fn test_lathe_validation() {
        assert!(TriMesh::lathe(&cylinder_profile(1.0, 1.0), 2).is_err());
        assert!(TriMesh::lathe(&[(1.0, 0.0), (1.0, 1.0), (0.0, 1.0)], 8).is_err());
        assert!(TriMesh::lathe(&[(0.0, 0.0), (0.0, 0.5), (0.0, 1.0)], 8).is_err());
        let cone = TriMesh::lathe(&[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)], 64).unwrap();
        assert_relative_eq!(cone.signed_volume(), PI / 3.0, epsilon = 1e-2);
    }

    #[test]
    fn test_invalid_shapes() {
        assert!(Geometry::new(Shape::sphere(0.0)).is_err());
        assert!(Geometry::new(Shape::cylinder(0.1, -1.0)).is_err());
        assert!(Geometry::new(Shape::cuboid(Vector3::new(1.0, f64::NAN, 1.0))).is_err());
        assert!(Geometry::new(Shape::Compound(Vec::new())).is_err());
        assert!(Geometry::new(Shape::capsule(0.1, 0.0)).is_ok());
    }

    #[test]
    fn test_inertia_box_of_box_is_box() {
        let geometry = Geometry::new(Shape::cuboid(Vector3::new(0.5, 1.0, 1.5))).unwrap();
        let dims = sorted(geometry.inertia_box());
        assert_relative_eq!(dims[0], 1.0, epsilon = 1e-9);
        assert_relative_eq!(dims[1], 2.0, epsilon = 1e-9);
        assert_relative_eq!(dims[2], 3.0, epsilon = 1e-9);
        assert_relative_eq!(geometry.equivalent_diameter(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_equivalent_diameter() {
        let sphere = Geometry::new(Shape::sphere(0.3)).unwrap();
        assert_relative_eq!(sphere.equivalent_diameter(), 0.6, epsilon = 1e-12);
        let cylinder = Geometry::new(Shape::cylinder(0.1, 0.4)).unwrap();
        assert_relative_eq!(cylinder.equivalent_diameter(), 2.0 / 3.0 * 0.6, epsilon = 1e-12);
    }

    #[test]
    fn test_projected_area() {
        let sphere = Geometry::new(Shape::sphere(1.0)).unwrap();
        assert_relative_eq!(sphere.projected_area(&Vector3::new(1.0, 2.0, 3.0)), PI);
        assert_eq!(sphere.projected_area(&Vector3::zeros()), 0.0);

        let cuboid = Geometry::new(Shape::cuboid(Vector3::new(0.5, 1.0, 1.5))).unwrap();
        assert_relative_eq!(cuboid.projected_area(&Vector3::x()), 6.0, epsilon = 1e-12);
        assert_relative_eq!(cuboid.projected_area(&Vector3::z()), 2.0, epsilon = 1e-12);

        let cylinder = Geometry::new(Shape::cylinder(0.5, 1.0)).unwrap();
        assert_relative_eq!(cylinder.projected_area(&Vector3::z()), PI * 0.25, epsilon = 1e-12);
        assert_relative_eq!(cylinder.projected_area(&Vector3::x()), 2.0, epsilon = 1e-12);

        let ellipsoid = Geometry::new(Shape::ellipsoid(Vector3::new(1.0, 2.0, 3.0))).unwrap();
        assert_relative_eq!(ellipsoid.projected_area(&Vector3::z()), 2.0 * PI, epsilon = 1e-12);

        let mesh = Geometry::new(Shape::Mesh(TriMesh::cuboid(Vector3::new(0.5, 1.0, 1.5)))).unwrap();
        let d = Vector3::new(1.0, 1.0, 0.0);
        assert_relative_eq!(
            mesh.projected_area(&d),
            cuboid.projected_area(&d),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_rotational_drag_moment_isotropic_for_sphere() {
        let sphere = Geometry::new(Shape::sphere(0.5)).unwrap();
        let kx = sphere.rotational_drag_moment(&Vector3::x());
        let kd = sphere.rotational_drag_moment(&Vector3::new(1.0, -2.0, 0.5));
        assert!(kx > 0.0);
        assert_relative_eq!(kx, kd, epsilon = 1e-12);
        assert_eq!(sphere.rotational_drag_moment(&Vector3::zeros()), 0.0);
    }

    #[test]
    fn test_rotational_drag_moment_slender_body() {
        // Spinning a rod end over end resists far more than spinning it about its axis
        let rod = Geometry::new(Shape::cylinder(0.05, 1.0)).unwrap();
        assert!(rod.rotational_drag_moment(&Vector3::x()) > 100.0 * rod.rotational_drag_moment(&Vector3::z()));
    }

    #[test]
    fn test_compound() {
        let part = |x: f64| CompoundPart::new(Pose::from_position(Point3::new(x, 0.0, 0.0)), Shape::sphere(0.5));
        let geometry = Geometry::new(Shape::Compound(vec![part(-1.0), part(1.0)])).unwrap();
        assert_relative_eq!(geometry.volume(), 2.0 * 4.0 / 3.0 * PI * 0.125, epsilon = 1e-12);
        assert_relative_eq!(geometry.centroid(), Point3::origin(), epsilon = 1e-12);
        assert_relative_eq!(geometry.dimensions(), Vector3::new(3.0, 1.0, 1.0), epsilon = 1e-12);
        assert_relative_eq!(geometry.bounding_radius(), 1.5, epsilon = 1e-12);
        assert_relative_eq!(geometry.projected_area(&Vector3::z()), 2.0 * PI * 0.25, epsilon = 1e-12);

        let props = geometry.mass_properties(1000.0);
        assert_relative_eq!(props.mass, 1000.0 * geometry.volume(), epsilon = 1e-9);
        assert!(props.inertia[(1, 1)] > props.inertia[(0, 0)]);

        match geometry.collision_shape() {
            CollisionShape::Compound(parts) => assert_eq!(parts.len(), 2),
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn test_tessellations_are_closed() {
        let rotated = Pose::from_position_rotation(
            Point3::new(0.0, 0.0, 1.0),
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 0.3),
        );
        let shapes = [
            Shape::sphere(0.5),
            Shape::ellipsoid(Vector3::new(0.2, 0.3, 0.4)),
            Shape::cuboid(Vector3::repeat(0.5)),
            Shape::cylinder(0.1, 0.5),
            Shape::capsule(0.1, 0.5),
            Shape::Compound(vec![
                CompoundPart::new(Pose::identity(), Shape::sphere(0.2)),
                CompoundPart::new(rotated, Shape::capsule(0.1, 0.3)),
            ]),
        ];
        for shape in shapes {
            let geometry = Geometry::new(shape).unwrap();
            let mesh = geometry.tessellate();
            let checked = TriMesh::new(mesh.vertices().to_vec(), mesh.triangles().to_vec());
            assert!(checked.is_ok(), "{:?}", geometry.shape());
            let ratio = mesh.signed_volume() / geometry.volume();
            assert!(ratio > 0.9 && ratio <= 1.0 + 1e-9, "ratio {ratio}");
        }
    }
}
