//! Submerged volume and center of buoyancy.
//!
//! The liquid fills the half-space `n · (x − p0) <= 0` below the free
//! surface. Two integrators cover every shape:
//!
//! ```text
//! ellipsoid   x = D u maps the body to the unit sphere; the plane becomes
//!             m̂ · u <= s and the wet part is a spherical cap
//!                 V(s) = π (1 + s)² (2 − s) / 3
//!                 z̄(s) = −3 (1 − s)² / (4 (2 − s))      along m̂
//!
//! polyhedron  the solid is fanned into signed tetrahedra from a reference
//!             point; each is clipped by the plane in closed form
//!                 1 vertex wet   small tetrahedron at the wet vertex
//!                 2 vertices wet prism, split into 3 tetrahedra
//!                 3 vertices wet whole minus the dry corner
//! ```
//!
//! Both are continuous and monotone in the surface height, and exact when
//! the body is fully dry or fully wet.

use nalgebra::{Point3, Vector3};
use sim_types::Pose;

use crate::fluid::FreeSurface;
use crate::geometry::TriMesh;

/// Wetted part of a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Submersion {
    /// Submerged volume (m³).
    pub volume: f64,
    /// Center of buoyancy in world coordinates.
    ///
    /// When nothing is wet this is the lowest point of the body.
    pub center: Point3<f64>,
}

impl Submersion {
    /// Nothing wet; `lowest` is the body's lowest point.
    #[must_use]
    pub fn dry(lowest: Point3<f64>) -> Self {
        Self {
            volume: 0.0,
            center: lowest,
        }
    }

    /// Whether any volume is wet.
    #[must_use]
    pub fn is_submerged(&self) -> bool {
        self.volume > 0.0
    }

    /// Combine the wet parts of several bodies into one.
    ///
    /// An all-dry set keeps the first part's center.
    #[must_use]
    pub fn sum(parts: impl IntoIterator<Item = Self>) -> Self {
        let mut volume = 0.0;
        let mut moment = Vector3::zeros();
        let mut fallback: Option<Point3<f64>> = None;
        for part in parts {
            volume += part.volume;
            moment += part.center.coords * part.volume;
            fallback.get_or_insert(part.center);
        }
        if volume > 0.0 {
            Self {
                volume,
                center: Point3::from(moment / volume),
            }
        } else {
            Self::dry(fallback.unwrap_or_else(Point3::origin))
        }
    }
}

/// Closed-form submersion of an ellipsoid centered at the pose origin.
#[must_use]
pub fn ellipsoid(radii: &Vector3<f64>, pose: &Pose, surface: &FreeSurface) -> Submersion {
    let normal = pose.inverse_transform_vector(&surface.normal());
    let offset = normal.dot(&pose.inverse_transform_point(&surface.point()).coords);

    let m = normal.component_mul(radii);
    let m_norm = m.norm();
    if m_norm <= 0.0 {
        return Submersion::dry(pose.position);
    }
    let m_hat = m / m_norm;
    let s = (offset / m_norm).clamp(-1.0, 1.0);

    let full = 4.0 / 3.0 * std::f64::consts::PI * radii.product();
    let volume = full * (1.0 + s).powi(2) * (2.0 - s) / 4.0;
    let z_bar = -0.75 * (1.0 - s).powi(2) / (2.0 - s);
    let center = (m_hat * z_bar).component_mul(radii);

    Submersion {
        volume,
        center: pose.transform_point(&Point3::from(center)),
    }
}

/// Exact submersion of a closed mesh, volume multiplied by `scale`.
#[must_use]
pub fn polyhedron(mesh: &TriMesh, scale: f64, pose: &Pose, surface: &FreeSurface) -> Submersion {
    let normal = pose.inverse_transform_vector(&surface.normal());
    let offset = normal.dot(&pose.inverse_transform_point(&surface.point()).coords);
    let vertices = mesh.vertices();
    let height = |p: &Point3<f64>| normal.dot(&p.coords) - offset;

    let Some((lowest, low)) = vertices
        .iter()
        .map(|v| (v, height(v)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
    else {
        return Submersion::dry(pose.position);
    };
    let dry = Submersion::dry(pose.transform_point(lowest));
    if low >= 0.0 {
        return dry;
    }
    let fully_wet = vertices.iter().all(|v| height(v) <= 0.0);

    let reference = Point3::from(
        vertices
            .iter()
            .fold(Vector3::zeros(), |acc, v| acc + v.coords)
            / vertices.len() as f64,
    );
    let h_ref = height(&reference);

    let mut volume = 0.0;
    let mut moment = Vector3::zeros();
    for &[a, b, c] in mesh.triangles() {
        let points = [reference, vertices[a], vertices[b], vertices[c]];
        let signed = (points[1] - reference).dot(&(points[2] - reference).cross(&(points[3] - reference)));
        if signed == 0.0 {
            continue;
        }
        let (v, m) = if fully_wet {
            tetrahedron(&points)
        } else {
            let heights = [h_ref, height(&points[1]), height(&points[2]), height(&points[3])];
            clip_tetrahedron(&points, &heights)
        };
        let sign = signed.signum();
        volume += sign * v;
        moment += m * sign;
    }

    if volume <= 0.0 {
        return dry;
    }
    Submersion {
        volume: volume * scale,
        center: pose.transform_point(&Point3::from(moment / volume)),
    }
}

/// Unsigned volume and first moment of a tetrahedron.
fn tetrahedron(p: &[Point3<f64>; 4]) -> (f64, Vector3<f64>) {
    let volume = (p[1] - p[0]).dot(&(p[2] - p[0]).cross(&(p[3] - p[0]))).abs() / 6.0;
    let centroid = (p[0].coords + p[1].coords + p[2].coords + p[3].coords) * 0.25;
    (volume, centroid * volume)
}

/// Volume and first moment of the part of a tetrahedron with height `<= 0`.
fn clip_tetrahedron(p: &[Point3<f64>; 4], h: &[f64; 4]) -> (f64, Vector3<f64>) {
    let mut wet = [0_usize; 4];
    let mut dry = [0_usize; 4];
    let (mut n_wet, mut n_dry) = (0, 0);
    for i in 0..4 {
        if h[i] <= 0.0 {
            wet[n_wet] = i;
            n_wet += 1;
        } else {
            dry[n_dry] = i;
            n_dry += 1;
        }
    }

    // Point where edge (i, j) crosses the surface
    let cut = |i: usize, j: usize| p[i] + (p[j] - p[i]) * (h[i] / (h[i] - h[j]));

    match n_wet {
        0 => (0.0, Vector3::zeros()),
        1 => {
            let a = wet[0];
            tetrahedron(&[p[a], cut(a, dry[0]), cut(a, dry[1]), cut(a, dry[2])])
        }
        2 => {
            let (a, b) = (wet[0], wet[1]);
            let (c, d) = (dry[0], dry[1]);
            let (ac, ad, bc, bd) = (cut(a, c), cut(a, d), cut(b, c), cut(b, d));
            let parts = [
                tetrahedron(&[p[a], ac, ad, p[b]]),
                tetrahedron(&[ac, ad, p[b], bc]),
                tetrahedron(&[ad, p[b], bc, bd]),
            ];
            parts
                .iter()
                .fold((0.0, Vector3::zeros()), |(v, m), (pv, pm)| (v + pv, m + pm))
        }
        3 => {
            let a = dry[0];
            let (whole_v, whole_m) = tetrahedron(p);
            let (corner_v, corner_m) =
                tetrahedron(&[p[a], cut(a, wet[0]), cut(a, wet[1]), cut(a, wet[2])]);
            (whole_v - corner_v, whole_m - corner_m)
        }
        _ => tetrahedron(p),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::geometry::{CompoundPart, Geometry, Shape};
    use approx::assert_relative_eq;
    use nalgebra::UnitQuaternion;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

    fn at_height(z: f64) -> Pose {
        Pose::from_position(Point3::new(0.3, -0.2, z))
    }

    fn tilted(z: f64) -> Pose {
        Pose::from_position_rotation(
            Point3::new(0.0, 0.0, z),
            UnitQuaternion::from_euler_angles(0.4, -0.7, 0.2),
        )
    }

    fn all_shapes() -> Vec<Shape> {
        vec![
            Shape::sphere(0.5),
            Shape::ellipsoid(Vector3::new(0.3, 0.5, 0.8)),
            Shape::cuboid(Vector3::new(0.2, 0.4, 0.6)),
            Shape::cylinder(0.2, 0.6),
            Shape::capsule(0.2, 0.4),
            Shape::Mesh(TriMesh::cuboid(Vector3::new(0.5, 0.3, 0.2))),
            Shape::Compound(vec![
                CompoundPart::new(
                    Pose::from_position(Point3::new(0.0, 0.0, -0.3)),
                    Shape::sphere(0.3),
                ),
                CompoundPart::new(
                    Pose::from_position(Point3::new(0.0, 0.0, 0.4)),
                    Shape::cuboid(Vector3::repeat(0.2)),
                ),
            ]),
        ]
    }

    #[test]
    fn test_sphere_half_submerged() {
        let g = Geometry::new(Shape::sphere(0.5)).unwrap();
        let s = g.submerged(&at_height(0.0), &FreeSurface::horizontal(0.0));
        assert_relative_eq!(s.volume, g.volume() / 2.0, epsilon = 1e-12);
        assert_relative_eq!(s.center, Point3::new(0.3, -0.2, -3.0 * 0.5 / 8.0), epsilon = 1e-12);
    }

    #[test]
    fn test_fully_dry_and_fully_wet() {
        let surface = FreeSurface::horizontal(0.0);
        for shape in all_shapes() {
            let g = Geometry::new(shape).unwrap();
            let r = g.bounding_radius();

            let dry = g.submerged(&at_height(r + 0.1), &surface);
            assert_eq!(dry.volume, 0.0, "{:?}", g.shape());
            assert!(dry.center.coords.iter().all(|x| x.is_finite()));

            let pose = tilted(-r - 0.1);
            let wet = g.submerged(&pose, &surface);
            assert_relative_eq!(wet.volume, g.volume(), max_relative = 1e-9);
            assert_relative_eq!(
                wet.center,
                pose.transform_point(&g.centroid()),
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn test_box_half_submerged() {
        let g = Geometry::new(Shape::cuboid(Vector3::new(0.2, 0.4, 0.6))).unwrap();
        let s = g.submerged(&at_height(0.0), &FreeSurface::horizontal(0.0));
        assert_relative_eq!(s.volume, g.volume() / 2.0, epsilon = 1e-12);
        assert_relative_eq!(s.center.z, -0.3, epsilon = 1e-12);
        assert_relative_eq!(s.center.x, 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_box_on_edge() {
        // Cube rotated 45° about X, surface through the center
        let g = Geometry::new(Shape::cuboid(Vector3::repeat(0.5))).unwrap();
        let pose = Pose::from_position_rotation(
            Point3::origin(),
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), FRAC_PI_4),
        );
        let s = g.submerged(&pose, &FreeSurface::horizontal(0.0));
        assert_relative_eq!(s.volume, 0.5, epsilon = 1e-12);

        // Only the bottom edge wedge below z = -0.5·√2 + 0.1
        let depth = 0.1;
        let s = g.submerged(&pose, &FreeSurface::horizontal(-0.5 * 2.0_f64.sqrt() + depth));
        assert_relative_eq!(s.volume, depth * depth, epsilon = 1e-12);
    }

    #[test]
    fn test_box_resting_on_surface() {
        let g = Geometry::new(Shape::cuboid(Vector3::repeat(0.5))).unwrap();
        let s = g.submerged(&at_height(0.5), &FreeSurface::horizontal(0.0));
        assert_eq!(s.volume, 0.0);
        assert_relative_eq!(s.center.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_cylinder_proxy_half_submerged() {
        let g = Geometry::new(Shape::cylinder(0.1, 0.5)).unwrap();
        let upright = g.submerged(&Pose::identity(), &FreeSurface::horizontal(0.0));
        assert_relative_eq!(upright.volume, g.volume() / 2.0, epsilon = 1e-12);
        assert_relative_eq!(upright.center.z, -0.25, epsilon = 1e-9);

        let lying = Pose::from_position_rotation(
            Point3::origin(),
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), FRAC_PI_2),
        );
        let s = g.submerged(&lying, &FreeSurface::horizontal(0.0));
        assert_relative_eq!(s.volume, g.volume() / 2.0, max_relative = 1e-9);
        // Half disc centroid sits 4r/3π below the axis
        assert_relative_eq!(s.center.z, -4.0 * 0.1 / (3.0 * PI), max_relative = 1e-2);
    }

    #[test]
    fn test_mesh_matches_box() {
        let half = Vector3::new(0.2, 0.4, 0.6);
        let cuboid = Geometry::new(Shape::cuboid(half)).unwrap();
        let mesh = Geometry::new(Shape::Mesh(TriMesh::cuboid(half))).unwrap();
        let surface = FreeSurface::new(Vector3::new(0.1, 0.2, 1.0), Point3::new(0.0, 0.0, 0.1)).unwrap();
        let pose = tilted(0.05);
        let a = cuboid.submerged(&pose, &surface);
        let b = mesh.submerged(&pose, &surface);
        assert_relative_eq!(a.volume, b.volume, epsilon = 1e-12);
        assert_relative_eq!(a.center, b.center, epsilon = 1e-12);
    }

    #[test]
    fn test_sweep_monotone_and_continuous() {
        let surface = FreeSurface::horizontal(0.0);
        let steps = 400;
        for shape in all_shapes() {
            let g = Geometry::new(shape).unwrap();
            let r = g.bounding_radius() + 0.05;
            for pose_at in [at_height as fn(f64) -> Pose, tilted] {
                let mut last: Option<Submersion> = None;
                for i in 0..=steps {
                    // Body sinks from above the surface to below it
                    let z = r - 2.0 * r * f64::from(i) / f64::from(steps);
                    let dz = 2.0 * r / f64::from(steps);
                    let s = g.submerged(&pose_at(z), &surface);
                    assert!(s.volume >= 0.0 && s.volume <= g.volume() * (1.0 + 1e-9));
                    if let Some(prev) = last {
                        assert!(
                            s.volume >= prev.volume - 1e-12,
                            "{:?}: volume decreased at z = {z}",
                            g.shape()
                        );
                        // No cross-section exceeds the bounding disc
                        assert!(s.volume - prev.volume <= PI * r * r * dz * 1.01);
                        if prev.volume > 0.01 * g.volume() {
                            assert!(
                                (s.center - prev.center).norm() < 0.1 * r,
                                "{:?}: center jumped at z = {z}",
                                g.shape()
                            );
                        }
                    }
                    last = Some(s);
                }
            }
        }
    }

    #[test]
    fn test_sum() {
        let a = Submersion {
            volume: 1.0,
            center: Point3::new(0.0, 0.0, -1.0),
        };
        let b = Submersion {
            volume: 3.0,
            center: Point3::new(4.0, 0.0, -1.0),
        };
        let s = Submersion::sum([a, b]);
        assert_relative_eq!(s.volume, 4.0);
        assert_relative_eq!(s.center, Point3::new(3.0, 0.0, -1.0));

        let dry = Submersion::sum([Submersion::dry(Point3::new(1.0, 2.0, 3.0))]);
        assert!(!dry.is_submerged());
        assert_eq!(dry.center, Point3::new(1.0, 2.0, 3.0));
    }
}
