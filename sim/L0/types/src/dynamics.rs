//! Forces and gravity.
//!
//! [`ExternalForce`] is the unit of work handed to a dynamics engine: a force
//! at a world point and/or a torque on one body. Fluid loads are expressed as
//! lists of these before they are applied.

use crate::BodyId;
use nalgebra::{Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An external load applied to a rigid body for one step.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExternalForce {
    /// The body to apply the load to.
    pub body: BodyId,
    /// Force vector in world coordinates (N).
    pub force: Vector3<f64>,
    /// Torque vector in world coordinates (N·m).
    pub torque: Vector3<f64>,
    /// Point of application in world coordinates.
    /// If None, the force acts at the center of mass.
    pub point: Option<Point3<f64>>,
}

impl ExternalForce {
    /// Force applied at the center of mass.
    #[must_use]
    pub fn at_com(body: BodyId, force: Vector3<f64>) -> Self {
        Self {
            body,
            force,
            torque: Vector3::zeros(),
            point: None,
        }
    }

    /// Pure torque.
    #[must_use]
    pub fn torque_only(body: BodyId, torque: Vector3<f64>) -> Self {
        Self {
            body,
            force: Vector3::zeros(),
            torque,
            point: None,
        }
    }

    /// Force applied at a world point.
    #[must_use]
    pub fn at_point(body: BodyId, force: Vector3<f64>, point: Point3<f64>) -> Self {
        Self {
            body,
            force,
            torque: Vector3::zeros(),
            point: Some(point),
        }
    }

    /// Check if this load has no effect.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.force.norm_squared() == 0.0 && self.torque.norm_squared() == 0.0
    }

    /// Check if the load contains `NaN` or `Inf` values.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.force.iter().all(|x| x.is_finite())
            && self.torque.iter().all(|x| x.is_finite())
            && self
                .point
                .is_none_or(|p| p.coords.iter().all(|x| x.is_finite()))
    }
}

/// Gravity configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Gravity {
    /// Acceleration due to gravity (m/s²).
    pub acceleration: Vector3<f64>,
}

impl Default for Gravity {
    fn default() -> Self {
        Self::earth()
    }
}

impl Gravity {
    /// Standard Earth gravity (9.81 m/s² in -Z direction).
    #[must_use]
    pub fn earth() -> Self {
        Self {
            acceleration: Vector3::new(0.0, 0.0, -9.81),
        }
    }

    /// Zero gravity.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            acceleration: Vector3::zeros(),
        }
    }

    /// Custom gravity vector.
    #[must_use]
    pub fn custom(acceleration: Vector3<f64>) -> Self {
        Self { acceleration }
    }

    /// Gravitational force on a mass.
    #[must_use]
    pub fn force_on_mass(&self, mass: f64) -> Vector3<f64> {
        self.acceleration * mass
    }

    /// Unit "down" direction, or `None` in zero gravity.
    #[must_use]
    pub fn direction(&self) -> Option<Vector3<f64>> {
        self.acceleration.try_normalize(f64::EPSILON)
    }
}
