//! Rigid bodies stored by the world.
//!
//! Internally a body is tracked at its center of mass; the body frame pose
//! reported through the engine interface is reconstructed from the COM
//! position and the local COM offset.

use nalgebra::{Matrix3, Point3, UnitQuaternion, Vector3};
use sim_types::{
    BodyId, CollisionFilter, CollisionShape, MassProperties, Pose, RigidBodyDesc, Twist,
};

use crate::integrators::{apply_rotation_delta, integrate_angular_velocity, integrate_rotation};

/// A rigid body in the world.
#[derive(Debug, Clone)]
pub struct Body {
    /// Unique identifier.
    pub id: BodyId,
    /// Collision geometry in the body frame.
    pub shape: CollisionShape,
    /// Mass properties in the body frame.
    pub mass_props: MassProperties,
    /// Collision filter.
    pub filter: CollisionFilter,
    /// Coulomb friction coefficient.
    pub friction: f64,
    /// Coefficient of restitution.
    pub restitution: f64,
    pub(crate) com: Point3<f64>,
    pub(crate) rotation: UnitQuaternion<f64>,
    pub(crate) linear_velocity: Vector3<f64>,
    pub(crate) angular_velocity: Vector3<f64>,
    pub(crate) prev_com: Point3<f64>,
    pub(crate) prev_rotation: UnitQuaternion<f64>,
    pub(crate) accumulated_force: Vector3<f64>,
    pub(crate) accumulated_torque: Vector3<f64>,
    inverse_mass: f64,
}

impl Body {
    /// Create a body from a description.
    pub(crate) fn from_desc(id: BodyId, desc: RigidBodyDesc) -> Self {
        let com = desc
            .pose
            .transform_point(&Point3::from(desc.mass.center_of_mass));
        // Twist linear velocity is given at the COM
        Self {
            id,
            shape: desc.shape,
            mass_props: desc.mass,
            filter: desc.filter,
            friction: desc.friction,
            restitution: desc.restitution,
            com,
            rotation: desc.pose.rotation,
            linear_velocity: desc.twist.linear,
            angular_velocity: desc.twist.angular,
            prev_com: com,
            prev_rotation: desc.pose.rotation,
            accumulated_force: Vector3::zeros(),
            accumulated_torque: Vector3::zeros(),
            inverse_mass: desc.mass.inverse_mass(),
        }
    }

    /// Check if this body is static (immovable).
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.mass_props.is_static()
    }

    /// Inverse mass (zero for static bodies).
    #[must_use]
    pub fn inverse_mass(&self) -> f64 {
        self.inverse_mass
    }

    /// World pose of the body frame.
    #[must_use]
    pub fn pose(&self) -> Pose {
        let offset = self.rotation * self.mass_props.center_of_mass;
        Pose::from_position_rotation(self.com - offset, self.rotation)
    }

    /// Center of mass in world coordinates.
    #[must_use]
    pub fn center_of_mass(&self) -> Point3<f64> {
        self.com
    }

    /// COM velocity and angular velocity.
    #[must_use]
    pub fn twist(&self) -> Twist {
        Twist::new(self.linear_velocity, self.angular_velocity)
    }

    /// World-frame inverse inertia at the current orientation.
    #[must_use]
    pub fn inverse_inertia_world(&self) -> Matrix3<f64> {
        self.mass_props.world_inverse_inertia(&self.rotation)
    }

    /// World-frame inertia at the current orientation.
    #[must_use]
    pub fn inertia_world(&self) -> Matrix3<f64> {
        let rot = self.rotation.to_rotation_matrix();
        rot.matrix() * self.mass_props.inertia * rot.matrix().transpose()
    }

    /// Convert an anchor given in the body frame into an offset from the COM,
    /// still expressed in the body frame.
    #[must_use]
    pub(crate) fn local_from_com(&self, anchor: &Point3<f64>) -> Vector3<f64> {
        anchor.coords - self.mass_props.center_of_mass
    }

    /// World-frame offset from the COM of a point given relative to the COM.
    #[must_use]
    pub(crate) fn world_offset(&self, local_from_com: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * local_from_com
    }

    /// Generalized inverse mass for a correction along `n` at world offset `r`.
    ///
    /// `w = 1/m + (r × n)ᵀ I⁻¹ (r × n)`
    #[must_use]
    pub(crate) fn generalized_inverse_mass(&self, r: &Vector3<f64>, n: &Vector3<f64>) -> f64 {
        if self.is_static() {
            return 0.0;
        }
        let rn = r.cross(n);
        self.inverse_mass + rn.dot(&(self.inverse_inertia_world() * rn))
    }

    /// Angular-only generalized inverse mass about axis `n`.
    #[must_use]
    pub(crate) fn angular_inverse_mass(&self, n: &Vector3<f64>) -> f64 {
        if self.is_static() {
            return 0.0;
        }
        n.dot(&(self.inverse_inertia_world() * n))
    }

    /// Shift the pose by a positional impulse `p` acting at world offset `r`.
    pub(crate) fn apply_positional_impulse(&mut self, p: &Vector3<f64>, r: &Vector3<f64>) {
        if self.is_static() {
            return;
        }
        self.com += p * self.inverse_mass;
        let dphi = self.inverse_inertia_world() * r.cross(p);
        apply_rotation_delta(&mut self.rotation, &dphi);
    }

    /// Rotate by an angular positional impulse.
    pub(crate) fn apply_angular_impulse(&mut self, p: &Vector3<f64>) {
        if self.is_static() {
            return;
        }
        let dphi = self.inverse_inertia_world() * p;
        apply_rotation_delta(&mut self.rotation, &dphi);
    }

    /// Change velocities by an impulse `p` acting at world offset `r`.
    pub(crate) fn apply_velocity_impulse(&mut self, p: &Vector3<f64>, r: &Vector3<f64>) {
        if self.is_static() {
            return;
        }
        self.linear_velocity += p * self.inverse_mass;
        self.angular_velocity += self.inverse_inertia_world() * r.cross(p);
    }

    /// Change angular velocity by an angular impulse.
    pub(crate) fn apply_angular_velocity_impulse(&mut self, p: &Vector3<f64>) {
        if self.is_static() {
            return;
        }
        self.angular_velocity += self.inverse_inertia_world() * p;
    }

    /// Velocity of a point at world offset `r` from the COM.
    #[must_use]
    pub(crate) fn velocity_at(&self, r: &Vector3<f64>) -> Vector3<f64> {
        self.linear_velocity + self.angular_velocity.cross(r)
    }

    /// Predict the substep pose from accumulated loads and gravity.
    pub(crate) fn predict(&mut self, gravity: &Vector3<f64>, h: f64) {
        self.prev_com = self.com;
        self.prev_rotation = self.rotation;
        if self.is_static() {
            return;
        }

        self.linear_velocity += (gravity + self.accumulated_force * self.inverse_mass) * h;
        self.angular_velocity = integrate_angular_velocity(
            &self.angular_velocity,
            &self.accumulated_torque,
            &self.inertia_world(),
            &self.inverse_inertia_world(),
            h,
        );

        self.com += self.linear_velocity * h;
        integrate_rotation(&mut self.rotation, &self.angular_velocity, h);
    }

    /// Recover velocities from the projected pose.
    pub(crate) fn update_velocities(&mut self, h: f64) {
        if self.is_static() {
            return;
        }
        self.linear_velocity = crate::integrators::linear_velocity_between(&self.prev_com, &self.com, h);
        self.angular_velocity =
            crate::integrators::angular_velocity_between(&self.prev_rotation, &self.rotation, h);
    }

    /// Accumulate a force at a world point.
    pub(crate) fn add_force_at_point(&mut self, force: Vector3<f64>, point: Point3<f64>) {
        if self.is_static() {
            return;
        }
        self.accumulated_force += force;
        self.accumulated_torque += (point - self.com).cross(&force);
    }

    /// Accumulate a torque.
    pub(crate) fn add_torque(&mut self, torque: Vector3<f64>) {
        if self.is_static() {
            return;
        }
        self.accumulated_torque += torque;
    }

    /// Clear accumulated loads.
    pub(crate) fn clear_forces(&mut self) {
        self.accumulated_force = Vector3::zeros();
        self.accumulated_torque = Vector3::zeros();
    }

    /// Check if the state contains `NaN` or `Inf` values.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.com.coords.iter().all(|x| x.is_finite())
            && self.rotation.coords.iter().all(|x| x.is_finite())
            && self.linear_velocity.iter().all(|x| x.is_finite())
            && self.angular_velocity.iter().all(|x| x.is_finite())
    }
}
