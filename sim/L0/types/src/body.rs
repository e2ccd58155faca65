//! Rigid body state types.
//!
//! Identifiers, pose, velocity and mass properties of rigid bodies in 6
//! degrees of freedom. Primitive mass properties use the same local frame
//! convention as the collision and fluid geometry: cylinders and capsules are
//! aligned with local Z, boxes and ellipsoids are given by half extents.

use nalgebra::{Matrix3, Point3, UnitQuaternion, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Unique identifier for a rigid body owned by a dynamics engine.
///
/// Ids are plain handles: copying one never copies or owns the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BodyId(pub u64);

impl BodyId {
    /// Create a new body ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl From<u64> for BodyId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for BodyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Body({})", self.0)
    }
}

/// Unique identifier for a link (constraint) owned by a dynamics engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConstraintId(pub u64);

impl ConstraintId {
    /// Create a new constraint ID.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConstraintId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Constraint({})", self.0)
    }
}

/// Position and orientation of a rigid body frame.
///
/// # Example
///
/// ```
/// use sim_types::Pose;
/// use nalgebra::Point3;
///
/// let pose = Pose::from_position(Point3::new(1.0, 2.0, 3.0));
/// let world = pose.transform_point(&Point3::new(1.0, 0.0, 0.0));
/// assert_eq!(world, Point3::new(2.0, 2.0, 3.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pose {
    /// Position in world coordinates.
    pub position: Point3<f64>,
    /// Orientation as a unit quaternion.
    pub rotation: UnitQuaternion<f64>,
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

impl Pose {
    /// Identity pose (origin, no rotation).
    #[must_use]
    pub fn identity() -> Self {
        Self {
            position: Point3::origin(),
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Pose from position only (identity rotation).
    #[must_use]
    pub fn from_position(position: Point3<f64>) -> Self {
        Self {
            position,
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Pose from position and rotation.
    #[must_use]
    pub const fn from_position_rotation(
        position: Point3<f64>,
        rotation: UnitQuaternion<f64>,
    ) -> Self {
        Self { position, rotation }
    }

    /// Pose whose local +Z axis points along `direction`.
    ///
    /// A zero direction yields the identity rotation.
    #[must_use]
    pub fn looking_along(position: Point3<f64>, direction: &Vector3<f64>) -> Self {
        let rotation = UnitQuaternion::rotation_between(&Vector3::z(), direction)
            .unwrap_or_else(|| {
                if direction.z < 0.0 {
                    // Antiparallel: any half turn about a horizontal axis
                    UnitQuaternion::from_axis_angle(&Vector3::x_axis(), std::f64::consts::PI)
                } else {
                    UnitQuaternion::identity()
                }
            });
        Self { position, rotation }
    }

    /// Transform a point from local to world coordinates.
    #[must_use]
    pub fn transform_point(&self, local: &Point3<f64>) -> Point3<f64> {
        self.position + self.rotation * local.coords
    }

    /// Transform a vector from local to world coordinates (rotation only).
    #[must_use]
    pub fn transform_vector(&self, local: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * local
    }

    /// Transform a point from world to local coordinates.
    #[must_use]
    pub fn inverse_transform_point(&self, world: &Point3<f64>) -> Point3<f64> {
        Point3::from(self.rotation.inverse() * (world - self.position))
    }

    /// Transform a vector from world to local coordinates.
    #[must_use]
    pub fn inverse_transform_vector(&self, world: &Vector3<f64>) -> Vector3<f64> {
        self.rotation.inverse() * world
    }

    /// Compose two poses: `self * other`.
    #[must_use]
    pub fn compose(&self, other: &Self) -> Self {
        Self {
            position: self.transform_point(&other.position),
            rotation: self.rotation * other.rotation,
        }
    }

    /// Inverse pose.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let inv_rotation = self.rotation.inverse();
        Self {
            position: Point3::from(-(inv_rotation * self.position.coords)),
            rotation: inv_rotation,
        }
    }

    /// Check if the pose contains `NaN` or `Inf` values.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.position.coords.iter().all(|x| x.is_finite())
            && self.rotation.coords.iter().all(|x| x.is_finite())
    }
}

/// Linear and angular velocity of a rigid body, in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Twist {
    /// Linear velocity (m/s).
    pub linear: Vector3<f64>,
    /// Angular velocity (rad/s).
    pub angular: Vector3<f64>,
}

impl Default for Twist {
    fn default() -> Self {
        Self::zero()
    }
}

impl Twist {
    /// Create a twist with specified linear and angular velocity.
    #[must_use]
    pub const fn new(linear: Vector3<f64>, angular: Vector3<f64>) -> Self {
        Self { linear, angular }
    }

    /// Zero twist (at rest).
    #[must_use]
    pub fn zero() -> Self {
        Self {
            linear: Vector3::zeros(),
            angular: Vector3::zeros(),
        }
    }

    /// Twist with linear velocity only.
    #[must_use]
    pub fn linear(v: Vector3<f64>) -> Self {
        Self {
            linear: v,
            angular: Vector3::zeros(),
        }
    }

    /// Twist with angular velocity only.
    #[must_use]
    pub fn angular(omega: Vector3<f64>) -> Self {
        Self {
            linear: Vector3::zeros(),
            angular: omega,
        }
    }

    /// Check if the twist contains `NaN` or `Inf` values.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.linear.iter().all(|x| x.is_finite()) && self.angular.iter().all(|x| x.is_finite())
    }
}

/// Complete kinematic state of a rigid body.
///
/// The pose is the body frame (the frame geometry is expressed in); the
/// twist's linear part is the velocity of that frame's origin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RigidBodyState {
    /// Position and orientation.
    pub pose: Pose,
    /// Linear and angular velocity.
    pub twist: Twist,
}

impl RigidBodyState {
    /// Create a state from pose and twist.
    #[must_use]
    pub const fn new(pose: Pose, twist: Twist) -> Self {
        Self { pose, twist }
    }

    /// State at rest at the given pose.
    #[must_use]
    pub fn at_rest(pose: Pose) -> Self {
        Self {
            pose,
            twist: Twist::zero(),
        }
    }

    /// Check if the state contains `NaN` or `Inf` values.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.pose.is_finite() && self.twist.is_finite()
    }
}

/// Mass properties of a rigid body.
///
/// Contains mass, center of mass offset, and inertia tensor.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MassProperties {
    /// Total mass in kg.
    pub mass: f64,
    /// Center of mass offset from body origin in local coordinates.
    pub center_of_mass: Vector3<f64>,
    /// Inertia tensor about center of mass in local coordinates (kg·m²).
    pub inertia: Matrix3<f64>,
}

impl MassProperties {
    /// Create mass properties with given values.
    #[must_use]
    pub const fn new(mass: f64, center_of_mass: Vector3<f64>, inertia: Matrix3<f64>) -> Self {
        Self {
            mass,
            center_of_mass,
            inertia,
        }
    }

    /// Static (immovable) body.
    #[must_use]
    pub fn fixed() -> Self {
        Self {
            mass: f64::INFINITY,
            center_of_mass: Vector3::zeros(),
            inertia: Matrix3::zeros(),
        }
    }

    /// Uniform solid sphere: `I = 2/5 m r²`.
    #[must_use]
    pub fn sphere(mass: f64, radius: f64) -> Self {
        let i = 0.4 * mass * radius * radius;
        Self::diagonal(mass, Vector3::new(i, i, i))
    }

    /// Uniform solid box.
    ///
    /// - Ixx = (1/12) * m * (y² + z²)
    /// - Iyy = (1/12) * m * (x² + z²)
    /// - Izz = (1/12) * m * (x² + y²)
    #[must_use]
    pub fn box_shape(mass: f64, half_extents: Vector3<f64>) -> Self {
        let x2 = 4.0 * half_extents.x * half_extents.x;
        let y2 = 4.0 * half_extents.y * half_extents.y;
        let z2 = 4.0 * half_extents.z * half_extents.z;
        Self::diagonal(
            mass,
            Vector3::new(
                mass * (y2 + z2) / 12.0,
                mass * (x2 + z2) / 12.0,
                mass * (x2 + y2) / 12.0,
            ),
        )
    }

    /// Uniform solid cylinder aligned with local Z.
    ///
    /// - Ixx = Iyy = (1/12) * m * (3r² + h²)
    /// - Izz = (1/2) * m * r²
    #[must_use]
    pub fn cylinder(mass: f64, radius: f64, half_height: f64) -> Self {
        let r2 = radius * radius;
        let h2 = 4.0 * half_height * half_height;
        let ixx = mass * (3.0 * r2 + h2) / 12.0;
        Self::diagonal(mass, Vector3::new(ixx, ixx, 0.5 * mass * r2))
    }

    /// Uniform solid capsule aligned with local Z.
    ///
    /// `half_length` is the half length of the cylindrical part. Mass is split
    /// between the cylinder and the two hemispherical caps by volume; each cap
    /// contributes `2/5 m r² + m (h² + 3hr/4)` about the transverse axes.
    #[must_use]
    pub fn capsule(mass: f64, radius: f64, half_length: f64) -> Self {
        let r = radius;
        let h = half_length;
        let v_cyl = std::f64::consts::PI * r * r * 2.0 * h;
        let v_caps = 4.0 / 3.0 * std::f64::consts::PI * r * r * r;
        let total = v_cyl + v_caps;
        if total <= 0.0 {
            return Self::diagonal(mass, Vector3::zeros());
        }
        let m_cyl = mass * v_cyl / total;
        let m_caps = mass * v_caps / total;

        let ixx = m_cyl * (3.0 * r * r + 4.0 * h * h) / 12.0
            + m_caps * (0.4 * r * r + h * h + 0.75 * h * r);
        let izz = 0.5 * m_cyl * r * r + 0.4 * m_caps * r * r;
        Self::diagonal(mass, Vector3::new(ixx, ixx, izz))
    }

    /// Uniform solid ellipsoid with the given semi-axes.
    ///
    /// Ixx = m (b² + c²) / 5 and cyclic.
    #[must_use]
    pub fn ellipsoid(mass: f64, semi_axes: Vector3<f64>) -> Self {
        let a2 = semi_axes.x * semi_axes.x;
        let b2 = semi_axes.y * semi_axes.y;
        let c2 = semi_axes.z * semi_axes.z;
        Self::diagonal(
            mass,
            Vector3::new(
                mass * (b2 + c2) / 5.0,
                mass * (a2 + c2) / 5.0,
                mass * (a2 + b2) / 5.0,
            ),
        )
    }

    fn diagonal(mass: f64, principal: Vector3<f64>) -> Self {
        Self {
            mass,
            center_of_mass: Vector3::zeros(),
            inertia: Matrix3::from_diagonal(&principal),
        }
    }

    /// Express these properties in a parent frame where this body's frame sits
    /// at `pose`.
    #[must_use]
    pub fn transformed(&self, pose: &Pose) -> Self {
        let rot = pose.rotation.to_rotation_matrix();
        Self {
            mass: self.mass,
            center_of_mass: pose.transform_point(&Point3::from(self.center_of_mass)).coords,
            inertia: rot.matrix() * self.inertia * rot.matrix().transpose(),
        }
    }

    /// Combine several bodies expressed in the same frame.
    ///
    /// Inertias are shifted to the combined center of mass with the parallel
    /// axis theorem. An empty or massless set yields zero properties.
    #[must_use]
    pub fn combine(parts: &[Self]) -> Self {
        let mass: f64 = parts.iter().map(|p| p.mass).sum();
        if mass <= 0.0 || !mass.is_finite() {
            return Self::diagonal(mass.max(0.0), Vector3::zeros());
        }

        let com = parts
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.center_of_mass * p.mass)
            / mass;

        let inertia = parts.iter().fold(Matrix3::zeros(), |acc, p| {
            let d = p.center_of_mass - com;
            let shift = (Matrix3::identity() * d.norm_squared() - d * d.transpose()) * p.mass;
            acc + p.inertia + shift
        });

        Self {
            mass,
            center_of_mass: com,
            inertia,
        }
    }

    /// Get the inverse mass (0 if mass is infinite/static).
    #[must_use]
    pub fn inverse_mass(&self) -> f64 {
        if self.is_static() { 0.0 } else { 1.0 / self.mass }
    }

    /// Inverse inertia rotated into world coordinates.
    ///
    /// Static bodies and singular tensors yield zero (no angular response).
    #[must_use]
    pub fn world_inverse_inertia(&self, rotation: &UnitQuaternion<f64>) -> Matrix3<f64> {
        if self.is_static() {
            return Matrix3::zeros();
        }
        let Some(local_inv) = self.inertia.try_inverse() else {
            return Matrix3::zeros();
        };
        let rot = rotation.to_rotation_matrix();
        rot.matrix() * local_inv * rot.matrix().transpose()
    }

    /// Check if this represents a static (immovable) body.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.mass <= 0.0 || self.mass.is_infinite()
    }

    /// Validate that the mass properties are physically valid.
    pub fn validate(&self) -> crate::Result<()> {
        if self.mass < 0.0 {
            return Err(crate::SimError::invalid_mass("mass cannot be negative"));
        }

        if !self.mass.is_finite() && self.mass != f64::INFINITY {
            return Err(crate::SimError::invalid_mass(
                "mass must be finite or infinity (static)",
            ));
        }

        if !self.center_of_mass.iter().all(|x| x.is_finite()) {
            return Err(crate::SimError::invalid_mass(
                "center of mass must be finite",
            ));
        }

        let eigenvalues = self.inertia.symmetric_eigenvalues();
        if eigenvalues.iter().any(|&e| e < -1e-10 || !e.is_finite()) {
            return Err(crate::SimError::invalid_mass(
                "inertia tensor must be positive semi-definite",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ids() {
        let id = BodyId::new(42);
        assert_eq!(id.raw(), 42);
        assert_eq!(id.to_string(), "Body(42)");
        assert_eq!(ConstraintId::new(3).to_string(), "Constraint(3)");

        let id2: BodyId = 42.into();
        assert_eq!(id, id2);
    }

    #[test]
    fn test_pose_inverse_compose() {
        let pose = Pose::from_position_rotation(
            Point3::new(1.0, 2.0, 3.0),
            UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3),
        );
        let composed = pose.compose(&pose.inverse());
        assert_relative_eq!(composed.position.coords, Vector3::zeros(), epsilon = 1e-10);

        let p = Point3::new(-0.3, 0.7, 2.0);
        let back = pose.inverse_transform_point(&pose.transform_point(&p));
        assert_relative_eq!(back, p, epsilon = 1e-12);
    }

    #[test]
    fn test_looking_along() {
        let dir = Vector3::new(1.0, 0.0, 0.0);
        let pose = Pose::looking_along(Point3::origin(), &dir);
        assert_relative_eq!(pose.transform_vector(&Vector3::z()), dir, epsilon = 1e-12);

        let down = Vector3::new(0.0, 0.0, -1.0);
        let pose = Pose::looking_along(Point3::origin(), &down);
        assert_relative_eq!(pose.transform_vector(&Vector3::z()), down, epsilon = 1e-12);

        let pose = Pose::looking_along(Point3::origin(), &Vector3::zeros());
        assert_eq!(pose.rotation, UnitQuaternion::identity());
    }

    #[test]
    fn test_mass_properties_primitives() {
        let sphere = MassProperties::sphere(1.0, 1.0);
        assert_relative_eq!(sphere.inertia[(2, 2)], 0.4, epsilon = 1e-12);

        let cube = MassProperties::box_shape(12.0, Vector3::new(0.5, 0.5, 0.5));
        assert_relative_eq!(cube.inertia[(0, 0)], 2.0, epsilon = 1e-12);

        // A sphere-shaped ellipsoid matches the sphere formula
        let ell = MassProperties::ellipsoid(1.0, Vector3::new(1.0, 1.0, 1.0));
        assert_relative_eq!(ell.inertia, sphere.inertia, epsilon = 1e-12);
    }

    #[test]
    fn test_capsule_limits() {
        // No cylindrical part: a sphere
        let cap = MassProperties::capsule(2.0, 0.5, 0.0);
        let sphere = MassProperties::sphere(2.0, 0.5);
        assert_relative_eq!(cap.inertia, sphere.inertia, epsilon = 1e-12);

        // Long capsule approaches a cylinder about its axis
        let cap = MassProperties::capsule(1.0, 0.01, 10.0);
        let cyl = MassProperties::cylinder(1.0, 0.01, 10.0);
        assert_relative_eq!(cap.inertia[(0, 0)], cyl.inertia[(0, 0)], max_relative = 1e-2);
    }

    #[test]
    fn test_combine_parallel_axis() {
        let a = MassProperties::sphere(1.0, 0.1)
            .transformed(&Pose::from_position(Point3::new(1.0, 0.0, 0.0)));
        let b = MassProperties::sphere(1.0, 0.1)
            .transformed(&Pose::from_position(Point3::new(-1.0, 0.0, 0.0)));
        let c = MassProperties::combine(&[a, b]);

        assert_relative_eq!(c.mass, 2.0);
        assert_relative_eq!(c.center_of_mass, Vector3::zeros(), epsilon = 1e-12);
        // Izz = 2 * (0.4 * 0.01) + 2 * 1
        assert_relative_eq!(c.inertia[(2, 2)], 2.008, epsilon = 1e-12);
        assert_relative_eq!(c.inertia[(0, 0)], 0.008, epsilon = 1e-12);
    }

    #[test]
    fn test_world_inverse_inertia() {
        let props = MassProperties::cylinder(1.0, 0.1, 1.0);
        let rot = UnitQuaternion::from_euler_angles(0.0, std::f64::consts::FRAC_PI_2, 0.0);
        let inv = props.world_inverse_inertia(&rot);
        // The symmetry axis now lies along world X
        assert_relative_eq!(inv[(0, 0)], 1.0 / props.inertia[(2, 2)], max_relative = 1e-9);

        assert_eq!(MassProperties::fixed().world_inverse_inertia(&rot), Matrix3::zeros());
        assert_eq!(MassProperties::fixed().inverse_mass(), 0.0);
    }

    #[test]
    fn test_mass_properties_validation() {
        assert!(MassProperties::sphere(1.0, 1.0).validate().is_ok());
        assert!(MassProperties::fixed().validate().is_ok());

        let negative = MassProperties::new(-1.0, Vector3::zeros(), Matrix3::identity());
        assert!(negative.validate().is_err());

        let nan_com = MassProperties::new(1.0, Vector3::new(f64::NAN, 0.0, 0.0), Matrix3::identity());
        assert!(nan_com.validate().is_err());
    }
}
