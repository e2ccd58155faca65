//! Collision shapes and collision filtering.
//!
//! Shapes are expressed in the body's local frame. Cylinders and capsules are
//! aligned with local Z and extend from `-half_length` to `+half_length`.
//!
//! # Filtering
//!
//! Two bodies may touch only if each one's `group` intersects the other's
//! `mask`:
//!
//! ```text
//! (a.group & b.mask) != 0 && (b.group & a.mask) != 0
//! ```
//!
//! Cable segments use dedicated bits so a cable can opt out of touching
//! itself, or touch itself only between segments of the same parity:
//!
//! ```text
//!   segment:   0     1     2     3     4
//!   group:    EVEN  ODD   EVEN  ODD   EVEN
//!   touches:   0-2-4 and 1-3, never neighbours
//! ```

use crate::Pose;
use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Collision geometry attached to a rigid body.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CollisionShape {
    /// Sphere with given radius.
    Sphere {
        /// Sphere radius in meters.
        radius: f64,
    },
    /// Infinite static half-space `normal · x <= distance`.
    Plane {
        /// Unit normal pointing out of the solid side.
        normal: Vector3<f64>,
        /// Distance from origin along the normal.
        distance: f64,
    },
    /// Box with half-extents.
    Box {
        /// Half-extents of the box in each axis.
        half_extents: Vector3<f64>,
    },
    /// Capsule (cylinder with hemispherical caps) along local Z.
    Capsule {
        /// Half-length of the cylindrical portion.
        half_length: f64,
        /// Radius of the capsule.
        radius: f64,
    },
    /// Cylinder along local Z.
    Cylinder {
        /// Half-length of the cylinder.
        half_length: f64,
        /// Radius of the cylinder.
        radius: f64,
    },
    /// Ellipsoid with radii along local X, Y and Z.
    Ellipsoid {
        /// Radii along each local axis.
        radii: Vector3<f64>,
    },
    /// Convex hull of a point set in local coordinates.
    ConvexMesh {
        /// Hull vertices.
        vertices: Vec<Point3<f64>>,
    },
    /// Several shapes rigidly attached at local poses.
    Compound(Vec<(Pose, CollisionShape)>),
}

impl CollisionShape {
    /// Sphere shape.
    #[must_use]
    pub fn sphere(radius: f64) -> Self {
        Self::Sphere { radius }
    }

    /// Box shape.
    #[must_use]
    pub fn box_shape(half_extents: Vector3<f64>) -> Self {
        Self::Box { half_extents }
    }

    /// Capsule shape.
    #[must_use]
    pub fn capsule(half_length: f64, radius: f64) -> Self {
        Self::Capsule {
            half_length,
            radius,
        }
    }

    /// Horizontal ground plane at height `z` (solid below).
    #[must_use]
    pub fn ground(z: f64) -> Self {
        Self::Plane {
            normal: Vector3::z(),
            distance: z,
        }
    }

    /// Radius of a sphere centered at the local origin that encloses the shape.
    ///
    /// Infinite for planes.
    #[must_use]
    pub fn bounding_radius(&self) -> f64 {
        match self {
            Self::Sphere { radius } => *radius,
            Self::Plane { .. } => f64::INFINITY,
            Self::Box { half_extents } => half_extents.norm(),
            Self::Capsule {
                half_length,
                radius,
            } => half_length + radius,
            Self::Cylinder {
                half_length,
                radius,
            } => half_length.hypot(*radius),
            Self::Ellipsoid { radii } => radii.max(),
            Self::ConvexMesh { vertices } => vertices
                .iter()
                .map(|v| v.coords.norm())
                .fold(0.0, f64::max),
            Self::Compound(parts) => parts
                .iter()
                .map(|(pose, shape)| pose.position.coords.norm() + shape.bounding_radius())
                .fold(0.0, f64::max),
        }
    }

    /// Check if the shape is an infinite plane.
    #[must_use]
    pub fn is_plane(&self) -> bool {
        matches!(self, Self::Plane { .. })
    }
}

/// Group/mask pair deciding which bodies may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CollisionFilter {
    /// Bits this body belongs to.
    pub group: u32,
    /// Bits this body accepts contacts from.
    pub mask: u32,
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self {
            group: Self::DEFAULT,
            mask: Self::ALL,
        }
    }
}

impl CollisionFilter {
    /// Ordinary bodies.
    pub const DEFAULT: u32 = 1;
    /// Segments of cables that never touch any cable segment.
    pub const CABLE: u32 = 1 << 1;
    /// Even segments of self-colliding cables.
    pub const CABLE_EVEN: u32 = 1 << 2;
    /// Odd segments of self-colliding cables.
    pub const CABLE_ODD: u32 = 1 << 3;
    /// Every cable bit.
    pub const CABLE_BITS: u32 = Self::CABLE | Self::CABLE_EVEN | Self::CABLE_ODD;
    /// Every bit.
    pub const ALL: u32 = u32::MAX;

    /// Create a filter.
    #[must_use]
    pub const fn new(group: u32, mask: u32) -> Self {
        Self { group, mask }
    }

    /// Filter that never produces contacts.
    #[must_use]
    pub const fn none() -> Self {
        Self { group: 0, mask: 0 }
    }

    /// Cable segment that touches non-cable bodies only.
    #[must_use]
    pub const fn cable() -> Self {
        Self {
            group: Self::CABLE,
            mask: Self::ALL & !Self::CABLE_BITS,
        }
    }

    /// Even segment of a self-colliding cable.
    #[must_use]
    pub const fn cable_even() -> Self {
        Self {
            group: Self::CABLE_EVEN,
            mask: Self::ALL & !(Self::CABLE | Self::CABLE_ODD),
        }
    }

    /// Odd segment of a self-colliding cable.
    #[must_use]
    pub const fn cable_odd() -> Self {
        Self {
            group: Self::CABLE_ODD,
            mask: Self::ALL & !(Self::CABLE | Self::CABLE_EVEN),
        }
    }

    /// Check whether two filtered bodies may touch.
    ///
    /// Symmetric: `a.can_collide(&b) == b.can_collide(&a)`.
    #[must_use]
    pub const fn can_collide(&self, other: &Self) -> bool {
        (self.group & other.mask) != 0 && (other.group & self.mask) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_collides_with_everything_filtered() {
        let d = CollisionFilter::default();
        assert!(d.can_collide(&d));
        assert!(d.can_collide(&CollisionFilter::cable()));
        assert!(d.can_collide(&CollisionFilter::cable_even()));
        assert!(d.can_collide(&CollisionFilter::cable_odd()));
        assert!(!d.can_collide(&CollisionFilter::none()));
    }

    #[test]
    fn test_cable_filters() {
        let plain = CollisionFilter::cable();
        let even = CollisionFilter::cable_even();
        let odd = CollisionFilter::cable_odd();

        assert!(!plain.can_collide(&plain));
        assert!(even.can_collide(&even));
        assert!(odd.can_collide(&odd));
        assert!(!even.can_collide(&odd));
        assert!(!odd.can_collide(&even));
        assert!(!plain.can_collide(&even));
    }

    #[test]
    fn test_bounding_radius() {
        assert_relative_eq!(CollisionShape::sphere(0.5).bounding_radius(), 0.5);
        assert_relative_eq!(CollisionShape::capsule(1.0, 0.25).bounding_radius(), 1.25);
        assert!(CollisionShape::ground(0.0).bounding_radius().is_infinite());

        let compound = CollisionShape::Compound(vec![(
            Pose::from_position(Point3::new(2.0, 0.0, 0.0)),
            CollisionShape::sphere(0.5),
        )]);
        assert_relative_eq!(compound.bounding_radius(), 2.5);
    }
}
