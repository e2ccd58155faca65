//! The rigid-body dynamics engine interface.
//!
//! The hydrodynamics core does not integrate motion itself. It reads body
//! state through [`DynamicsEngine`], turns it into loads, hands the loads
//! back, and asks the engine to advance:
//!
//! ```text
//!  ┌─────────────┐  transform / velocity   ┌──────────────┐
//!  │  Dynamics   │ ──────────────────────▶ │    Fluid     │
//!  │   engine    │                         │    model     │
//!  │             │ ◀────────────────────── │              │
//!  └─────────────┘  apply_force / torque   └──────────────┘
//!        │ step(dt)
//!        ▼
//! ```
//!
//! Bodies and links are created from plain descriptions ([`RigidBodyDesc`],
//! [`LinkDesc`]) and referred to by copyable handles afterwards.

use crate::{
    BodyId, CollisionFilter, CollisionShape, ConstraintId, ExternalForce, MassProperties, Pose,
    Result, RigidBodyState, SimError, Twist,
};
use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A rigid-body dynamics engine.
///
/// Engines are shared read-only across worker threads while loads are
/// computed, hence the `Send + Sync` bound. Every query on an unknown body
/// returns [`SimError::InvalidBodyId`].
pub trait DynamicsEngine: Send + Sync {
    /// World pose of the body frame.
    fn transform(&self, body: BodyId) -> Result<Pose>;

    /// Linear velocity of the center of mass, in world coordinates.
    fn linear_velocity(&self, body: BodyId) -> Result<Vector3<f64>>;

    /// Angular velocity in world coordinates.
    fn angular_velocity(&self, body: BodyId) -> Result<Vector3<f64>>;

    /// Center of mass in world coordinates.
    fn center_of_mass(&self, body: BodyId) -> Result<Point3<f64>>;

    /// Kinematic state of the body frame.
    ///
    /// The linear velocity is transferred from the center of mass to the
    /// frame origin: `v_origin = v_com + ω × (origin − com)`.
    fn body_state(&self, body: BodyId) -> Result<RigidBodyState> {
        let pose = self.transform(body)?;
        let v_com = self.linear_velocity(body)?;
        let omega = self.angular_velocity(body)?;
        let com = self.center_of_mass(body)?;
        let linear = v_com + omega.cross(&(pose.position - com));
        Ok(RigidBodyState::new(pose, Twist::new(linear, omega)))
    }

    /// Accumulate a force acting at a world point for the next step.
    fn apply_force(&mut self, body: BodyId, force: Vector3<f64>, point: Point3<f64>) -> Result<()>;

    /// Accumulate a torque for the next step.
    fn apply_torque(&mut self, body: BodyId, torque: Vector3<f64>) -> Result<()>;

    /// Accumulate an [`ExternalForce`]. Loads without a point act at the
    /// center of mass.
    fn apply_external(&mut self, load: &ExternalForce) -> Result<()> {
        let point = match load.point {
            Some(p) => p,
            None => self.center_of_mass(load.body)?,
        };
        if load.force.norm_squared() > 0.0 {
            self.apply_force(load.body, load.force, point)?;
        }
        if load.torque.norm_squared() > 0.0 {
            self.apply_torque(load.body, load.torque)?;
        }
        Ok(())
    }

    /// Create a rigid body.
    fn create_rigid_body(&mut self, desc: RigidBodyDesc) -> Result<BodyId>;

    /// Create a link between two bodies.
    fn create_constraint(&mut self, desc: LinkDesc) -> Result<ConstraintId>;

    /// Replace the collision filter of a body.
    fn set_collision_mask(&mut self, body: BodyId, filter: CollisionFilter) -> Result<()>;

    /// Advance the simulation by `dt` seconds and clear accumulated loads.
    fn step(&mut self, dt: f64) -> Result<()>;
}

/// Description of a rigid body to create.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RigidBodyDesc {
    /// Collision geometry in the body frame.
    pub shape: CollisionShape,
    /// Mass properties in the body frame.
    pub mass: MassProperties,
    /// Initial pose of the body frame.
    pub pose: Pose,
    /// Initial velocity (linear part at the center of mass).
    pub twist: Twist,
    /// Collision filter.
    pub filter: CollisionFilter,
    /// Coulomb friction coefficient.
    pub friction: f64,
    /// Coefficient of restitution.
    pub restitution: f64,
}

impl RigidBodyDesc {
    /// Dynamic body at rest with default filtering and contact material.
    #[must_use]
    pub fn new(shape: CollisionShape, mass: MassProperties, pose: Pose) -> Self {
        Self {
            shape,
            mass,
            pose,
            twist: Twist::zero(),
            filter: CollisionFilter::default(),
            friction: 0.5,
            restitution: 0.0,
        }
    }

    /// Static body.
    #[must_use]
    pub fn fixed(shape: CollisionShape, pose: Pose) -> Self {
        Self::new(shape, MassProperties::fixed(), pose)
    }

    /// Set the initial velocity.
    #[must_use]
    pub fn with_twist(mut self, twist: Twist) -> Self {
        self.twist = twist;
        self
    }

    /// Set the collision filter.
    #[must_use]
    pub fn with_filter(mut self, filter: CollisionFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Set friction and restitution.
    #[must_use]
    pub fn with_contact_material(mut self, friction: f64, restitution: f64) -> Self {
        self.friction = friction;
        self.restitution = restitution;
        self
    }

    /// Validate the description.
    pub fn validate(&self) -> Result<()> {
        self.mass.validate()?;
        if !self.pose.is_finite() || !self.twist.is_finite() {
            return Err(SimError::invalid_config("initial body state must be finite"));
        }
        if !(self.friction.is_finite() && self.friction >= 0.0) {
            return Err(SimError::invalid_config("friction must be non-negative"));
        }
        if !(0.0..=1.0).contains(&self.restitution) {
            return Err(SimError::invalid_config("restitution must be in [0, 1]"));
        }
        Ok(())
    }
}

/// Compliance of a link, in XPBD units (inverse stiffness).
///
/// Zero compliance is a rigid constraint. `angular: None` leaves relative
/// rotation free (a ball joint).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinkCompliance {
    /// Positional compliance (m/N).
    pub linear: f64,
    /// Rotational compliance (rad/(N·m)), or `None` for free rotation.
    pub angular: Option<f64>,
    /// Damping of relative linear velocity at the anchors (1/s).
    pub linear_damping: f64,
    /// Damping of relative angular velocity (1/s).
    pub angular_damping: f64,
}

impl Default for LinkCompliance {
    fn default() -> Self {
        Self::rigid()
    }
}

impl LinkCompliance {
    /// Welded link.
    #[must_use]
    pub fn rigid() -> Self {
        Self {
            linear: 0.0,
            angular: Some(0.0),
            linear_damping: 0.0,
            angular_damping: 0.0,
        }
    }

    /// Rigid point link with free rotation.
    #[must_use]
    pub fn ball() -> Self {
        Self {
            angular: None,
            ..Self::rigid()
        }
    }

    /// Bending link between cable segments.
    ///
    /// `stiffness` is the bending rigidity `EI` (N·m²). Over a segment of
    /// length `L` the joint acts as an angular spring `k = EI / L`, so the
    /// angular compliance is `L / EI`. The anchor is inextensible.
    #[must_use]
    pub fn from_stiffness(stiffness: f64, segment_length: f64) -> Self {
        Self {
            linear: 0.0,
            angular: Some(segment_length / stiffness),
            linear_damping: 0.0,
            angular_damping: 1.0,
        }
    }

    /// Set the damping coefficients.
    #[must_use]
    pub fn with_damping(mut self, linear: f64, angular: f64) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    /// Validate the compliance values.
    pub fn validate(&self) -> Result<()> {
        let ok = |x: f64| x.is_finite() && x >= 0.0;
        if !ok(self.linear) || !self.angular.is_none_or(ok) {
            return Err(SimError::invalid_link("compliance must be finite and non-negative"));
        }
        if !ok(self.linear_damping) || !ok(self.angular_damping) {
            return Err(SimError::invalid_link("damping must be finite and non-negative"));
        }
        Ok(())
    }
}

/// Description of a link joining an anchor on each of two bodies.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LinkDesc {
    /// First body.
    pub body_a: BodyId,
    /// Second body.
    pub body_b: BodyId,
    /// Anchor in the first body's frame.
    pub anchor_a: Point3<f64>,
    /// Anchor in the second body's frame.
    pub anchor_b: Point3<f64>,
    /// Link compliance.
    pub compliance: LinkCompliance,
    /// Suppress contacts between the two linked bodies.
    pub disable_collision: bool,
}

impl LinkDesc {
    /// Link with the given anchors, rigid, with collisions between the linked
    /// bodies disabled.
    #[must_use]
    pub fn new(
        body_a: BodyId,
        anchor_a: Point3<f64>,
        body_b: BodyId,
        anchor_b: Point3<f64>,
    ) -> Self {
        Self {
            body_a,
            body_b,
            anchor_a,
            anchor_b,
            compliance: LinkCompliance::rigid(),
            disable_collision: true,
        }
    }

    /// Set the compliance.
    #[must_use]
    pub fn with_compliance(mut self, compliance: LinkCompliance) -> Self {
        self.compliance = compliance;
        self
    }

    /// Keep contacts between the linked bodies.
    #[must_use]
    pub fn with_collision(mut self) -> Self {
        self.disable_collision = false;
        self
    }

    /// Validate the description.
    pub fn validate(&self) -> Result<()> {
        if self.body_a == self.body_b {
            return Err(SimError::invalid_link(format!(
                "{} cannot be linked to itself",
                self.body_a
            )));
        }
        let finite = |p: &Point3<f64>| p.coords.iter().all(|x| x.is_finite());
        if !finite(&self.anchor_a) || !finite(&self.anchor_b) {
            return Err(SimError::invalid_link("anchors must be finite"));
        }
        self.compliance.validate()
    }
}
