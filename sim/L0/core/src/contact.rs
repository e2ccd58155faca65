//! Contact detection and resolution.
//!
//! Each body is reduced to a swept sphere (a segment with a radius) or, for
//! planes, a half-space:
//!
//! | Shape | Proxy |
//! |-------|-------|
//! | Sphere | point + radius |
//! | Capsule | axis segment + radius |
//! | Cylinder | axis segment + radius (rounded ends) |
//! | Plane | half-space |
//! | others | bounding sphere about the body origin |
//!
//! Contacts are detected once per substep, projected with zero compliance
//! alongside the links, then corrected at velocity level for restitution and
//! dynamic friction.

use nalgebra::{Point3, Vector3};
use sim_types::CollisionShape;

use crate::body::Body;
use crate::link::{pair_mut, positional_correction, velocity_correction};

/// Collision proxy of a body in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Proxy {
    /// Segment from `start` to `end` swept by a sphere of `radius`.
    Swept {
        start: Point3<f64>,
        end: Point3<f64>,
        radius: f64,
    },
    /// Half-space `normal · x <= offset`.
    HalfSpace { normal: Vector3<f64>, offset: f64 },
}

impl Proxy {
    pub(crate) fn of(body: &Body) -> Self {
        let pose = body.pose();
        match &body.shape {
            CollisionShape::Sphere { radius } => Self::Swept {
                start: pose.position,
                end: pose.position,
                radius: *radius,
            },
            CollisionShape::Capsule {
                half_length,
                radius,
            }
            | CollisionShape::Cylinder {
                half_length,
                radius,
            } => Self::Swept {
                start: pose.transform_point(&Point3::new(0.0, 0.0, -half_length)),
                end: pose.transform_point(&Point3::new(0.0, 0.0, *half_length)),
                radius: *radius,
            },
            CollisionShape::Plane { normal, distance } => {
                let n = pose.transform_vector(normal);
                Self::HalfSpace {
                    normal: n,
                    offset: distance + n.dot(&pose.position.coords),
                }
            }
            other => Self::Swept {
                start: pose.position,
                end: pose.position,
                radius: other.bounding_radius(),
            },
        }
    }

    /// Cheap overlap rejection using enclosing spheres.
    pub(crate) fn may_touch(&self, other: &Self, margin: f64) -> bool {
        match (self, other) {
            (
                Self::Swept {
                    start: s1,
                    end: e1,
                    radius: r1,
                },
                Self::Swept {
                    start: s2,
                    end: e2,
                    radius: r2,
                },
            ) => {
                let c1 = nalgebra::center(s1, e1);
                let c2 = nalgebra::center(s2, e2);
                let b1 = r1 + 0.5 * (e1 - s1).norm();
                let b2 = r2 + 0.5 * (e2 - s2).norm();
                (c1 - c2).norm() <= b1 + b2 + margin
            }
            (Self::HalfSpace { .. }, Self::HalfSpace { .. }) => false,
            _ => true,
        }
    }
}

/// An active contact between two bodies.
#[derive(Debug, Clone)]
pub(crate) struct Contact {
    /// Index of the body pushed along `normal`.
    pub(crate) body_a: usize,
    /// Index of the other body.
    pub(crate) body_b: usize,
    /// Contact point on `a`, offset from its COM in its frame.
    anchor_a: Vector3<f64>,
    /// Contact point on `b`, offset from its COM in its frame.
    anchor_b: Vector3<f64>,
    /// Unit normal from `b` towards `a`.
    normal: Vector3<f64>,
    /// Normal relative velocity before projection.
    normal_velocity: f64,
    lambda_normal: f64,
}

impl Contact {
    fn new(
        bodies: &[Body],
        (body_a, pa): (usize, Point3<f64>),
        (body_b, pb): (usize, Point3<f64>),
        normal: Vector3<f64>,
    ) -> Self {
        let a = &bodies[body_a];
        let b = &bodies[body_b];
        let ra = pa - a.com;
        let rb = pb - b.com;
        let rel = a.velocity_at(&ra) - b.velocity_at(&rb);
        Self {
            body_a,
            body_b,
            anchor_a: a.rotation.inverse() * ra,
            anchor_b: b.rotation.inverse() * rb,
            normal,
            normal_velocity: normal.dot(&rel),
            lambda_normal: 0.0,
        }
    }

    /// Push the bodies apart along the contact normal.
    pub(crate) fn solve_position(&mut self, bodies: &mut [Body], tolerance: f64, h: f64) {
        let (a, b) = pair_mut(bodies, self.body_a, self.body_b);
        let ra = a.world_offset(&self.anchor_a);
        let rb = b.world_offset(&self.anchor_b);
        let depth = -((a.com + ra) - (b.com + rb)).dot(&self.normal);
        if depth <= tolerance {
            return;
        }
        let delta = -self.normal * depth;
        positional_correction(a, b, &ra, &rb, &delta, 0.0, &mut self.lambda_normal, h);
    }

    /// Apply restitution and dynamic friction.
    pub(crate) fn solve_velocity(&self, bodies: &mut [Body], rest_speed: f64, h: f64) {
        if self.lambda_normal == 0.0 {
            return;
        }
        let (a, b) = pair_mut(bodies, self.body_a, self.body_b);
        let ra = a.world_offset(&self.anchor_a);
        let rb = b.world_offset(&self.anchor_b);
        let n = self.normal;

        let rel = a.velocity_at(&ra) - b.velocity_at(&rb);
        let vn = n.dot(&rel);
        let vt = rel - n * vn;
        let vt_norm = vt.norm();
        if vt_norm > 0.0 {
            let mu = 0.5 * (a.friction + b.friction);
            let normal_force = self.lambda_normal.abs() / (h * h);
            let dv = -vt / vt_norm * (h * mu * normal_force).min(vt_norm);
            velocity_correction(a, b, &ra, &rb, &dv);
        }

        let rel = a.velocity_at(&ra) - b.velocity_at(&rb);
        let vn = n.dot(&rel);
        let e = if self.normal_velocity.abs() <= rest_speed {
            0.0
        } else {
            0.5 * (a.restitution + b.restitution)
        };
        let target = (-e * self.normal_velocity).max(0.0);
        if vn < target {
            velocity_correction(a, b, &ra, &rb, &(n * (target - vn)));
        }
    }
}

/// Generate contacts between two bodies, if any.
pub(crate) fn collide(bodies: &[Body], i: usize, j: usize, out: &mut Vec<Contact>) {
    let pi = Proxy::of(&bodies[i]);
    let pj = Proxy::of(&bodies[j]);
    match (pi, pj) {
        (
            Proxy::Swept {
                start: s1,
                end: e1,
                radius: r1,
            },
            Proxy::Swept {
                start: s2,
                end: e2,
                radius: r2,
            },
        ) => {
            let (c1, c2) = closest_points_segments(&s1, &e1, &s2, &e2);
            let d = c1 - c2;
            let dist = d.norm();
            if dist >= r1 + r2 {
                return;
            }
            let n = if dist > 1e-12 { d / dist } else { Vector3::z() };
            out.push(Contact::new(bodies, (i, c1 - n * r1), (j, c2 + n * r2), n));
        }
        (Proxy::Swept { start, end, radius }, Proxy::HalfSpace { normal, offset }) => {
            plane_contacts(bodies, (i, start, end, radius), (j, normal, offset), out);
        }
        (Proxy::HalfSpace { normal, offset }, Proxy::Swept { start, end, radius }) => {
            plane_contacts(bodies, (j, start, end, radius), (i, normal, offset), out);
        }
        (Proxy::HalfSpace { .. }, Proxy::HalfSpace { .. }) => {}
    }
}

fn plane_contacts(
    bodies: &[Body],
    (swept, start, end, radius): (usize, Point3<f64>, Point3<f64>, f64),
    (plane, normal, offset): (usize, Vector3<f64>, f64),
    out: &mut Vec<Contact>,
) {
    let count = if start == end { 1 } else { 2 };
    for p in [start, end].iter().take(count) {
        let height = normal.dot(&p.coords) - offset;
        if height < radius {
            out.push(Contact::new(
                bodies,
                (swept, p - normal * radius),
                (plane, p - normal * height),
                normal,
            ));
        }
    }
}

/// Closest points between segments `p1q1` and `p2q2`.
pub(crate) fn closest_points_segments(
    p1: &Point3<f64>,
    q1: &Point3<f64>,
    p2: &Point3<f64>,
    q2: &Point3<f64>,
) -> (Point3<f64>, Point3<f64>) {
    const EPS: f64 = 1e-12;
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.norm_squared();
    let e = d2.norm_squared();
    let f = d2.dot(&r);

    if a <= EPS && e <= EPS {
        return (*p1, *p2);
    }

    let (s, t) = if a <= EPS {
        (0.0, (f / e).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(&r);
        if e <= EPS {
            ((-c / a).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(&d2);
            let denom = a * e - b * b;
            let s = if denom > EPS {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let t = (b * s + f) / e;
            if t < 0.0 {
                ((-c / a).clamp(0.0, 1.0), 0.0)
            } else if t > 1.0 {
                (((b - c) / a).clamp(0.0, 1.0), 1.0)
            } else {
                (s, t)
            }
        }
    };

    (p1 + d1 * s, p2 + d2 * t)
}
