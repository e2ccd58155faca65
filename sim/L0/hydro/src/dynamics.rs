//! Per-body hydrodynamic loads.
//!
//! [`FluidDynamicsEngine::compute_loads`] turns a body's geometry and motion
//! into the forces the liquid exerts on it:
//!
//! ```text
//! φ      = V_sub / V                                   submerged fraction
//! v_rel  = v_body − v_fluid(origin)
//! F_drag = −½ ρ C_d A(v̂) |v_rel| v_rel φ  −  3π μ d_eq v_rel φ
//! τ_drag = −½ ρ C_r K(ω̂) |ω| ω φ          −  π μ d_eq³ ω φ
//! F_buoy = −ρ V_sub g          at the center of buoyancy
//! F_wt   =  ρ_body V g         at the center of mass
//! ```
//!
//! `A` is the silhouette area normal to the flow and `K` the rotational drag
//! moment of the equivalent inertia box. Computation is pure and never fails:
//! a body that produces non-finite loads is logged and left to gravity.

use nalgebra::{Point3, Vector3};
use sim_types::{Gravity, Pose, RigidBodyState};
use std::f64::consts::PI;
use tracing::{trace, warn};

use crate::error::{HydroError, Result};
use crate::fluid::{FreeSurface, Liquid};
use crate::force_field::VelocityField;
use crate::geometry::Geometry;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Fluid model tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FluidDynamicsConfig {
    /// Relative speeds below this produce no drag (m/s).
    pub velocity_epsilon: f64,
    /// Angular speeds below this produce no drag torque (rad/s).
    pub angular_epsilon: f64,
    /// Include the Stokes (linear) drag terms.
    pub enable_viscous_drag: bool,
}

impl Default for FluidDynamicsConfig {
    fn default() -> Self {
        Self {
            velocity_epsilon: 1e-10,
            angular_epsilon: 1e-10,
            enable_viscous_drag: true,
        }
    }
}

impl FluidDynamicsConfig {
    /// Quadratic drag only.
    #[must_use]
    pub fn quadratic_only() -> Self {
        Self {
            enable_viscous_drag: false,
            ..Self::default()
        }
    }

    /// Validate the thresholds.
    pub fn validate(&self) -> Result<()> {
        if !(self.velocity_epsilon.is_finite() && self.velocity_epsilon >= 0.0) {
            return Err(HydroError::invalid_config(format!(
                "velocity epsilon must be non-negative, got {}",
                self.velocity_epsilon
            )));
        }
        if !(self.angular_epsilon.is_finite() && self.angular_epsilon >= 0.0) {
            return Err(HydroError::invalid_config(format!(
                "angular epsilon must be non-negative, got {}",
                self.angular_epsilon
            )));
        }
        Ok(())
    }
}

/// Everything about the liquid a body needs for one load computation.
#[derive(Clone, Copy)]
pub struct FluidContext<'a> {
    /// Liquid properties.
    pub liquid: &'a Liquid,
    /// Free surface.
    pub surface: &'a FreeSurface,
    /// Composite liquid velocity.
    pub flow: &'a dyn VelocityField,
    /// Gravity acting on bodies and liquid.
    pub gravity: Gravity,
}

impl<'a> FluidContext<'a> {
    /// Bundle a fluid context.
    #[must_use]
    pub fn new(
        liquid: &'a Liquid,
        surface: &'a FreeSurface,
        flow: &'a dyn VelocityField,
        gravity: Gravity,
    ) -> Self {
        Self {
            liquid,
            surface,
            flow,
            gravity,
        }
    }
}

impl std::fmt::Debug for FluidContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FluidContext")
            .field("liquid", self.liquid)
            .field("surface", self.surface)
            .field("gravity", &self.gravity)
            .finish_non_exhaustive()
    }
}

/// Loads on one body for one step, in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluidLoads {
    /// Submerged volume (m³).
    pub submerged_volume: f64,
    /// Submerged fraction of the total volume, in `[0, 1]`.
    pub submerged_fraction: f64,
    /// Center of buoyancy.
    pub center_of_buoyancy: Point3<f64>,
    /// Drag force, applied at the center of mass.
    pub drag_force: Vector3<f64>,
    /// Drag torque.
    pub drag_torque: Vector3<f64>,
    /// Buoyancy, applied at the center of buoyancy.
    pub buoyancy: Vector3<f64>,
    /// Weight, applied at the center of mass.
    pub weight: Vector3<f64>,
}

impl Default for FluidLoads {
    fn default() -> Self {
        Self {
            submerged_volume: 0.0,
            submerged_fraction: 0.0,
            center_of_buoyancy: Point3::origin(),
            drag_force: Vector3::zeros(),
            drag_torque: Vector3::zeros(),
            buoyancy: Vector3::zeros(),
            weight: Vector3::zeros(),
        }
    }
}

impl FluidLoads {
    /// Whether any part of the body is wet.
    #[must_use]
    pub fn is_submerged(&self) -> bool {
        self.submerged_volume > 0.0
    }

    /// Sum of drag, buoyancy and weight.
    #[must_use]
    pub fn net_force(&self) -> Vector3<f64> {
        self.drag_force + self.buoyancy + self.weight
    }

    /// Check if every quantity is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.submerged_volume.is_finite()
            && self.submerged_fraction.is_finite()
            && self.center_of_buoyancy.coords.iter().all(|x| x.is_finite())
            && [self.drag_force, self.drag_torque, self.buoyancy, self.weight]
                .iter()
                .all(|v| v.iter().all(|x| x.is_finite()))
    }
}

/// Computes buoyancy and drag for rigid bodies.
#[derive(Debug, Clone, Default)]
pub struct FluidDynamicsEngine {
    config: FluidDynamicsConfig,
}

impl FluidDynamicsEngine {
    /// Create an engine.
    pub fn new(config: FluidDynamicsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &FluidDynamicsConfig {
        &self.config
    }

    /// Loads on a body of uniform `material_density`.
    ///
    /// `state.twist.linear` is the velocity of the pose origin, where the
    /// flow is sampled.
    #[must_use]
    pub fn compute_loads(
        &self,
        geometry: &Geometry,
        material_density: f64,
        state: &RigidBodyState,
        fluid: &FluidContext<'_>,
    ) -> FluidLoads {
        let pose = &state.pose;
        let volume = geometry.volume();
        let weight = fluid.gravity.acceleration * (material_density * volume);

        let submersion = geometry.submerged(pose, fluid.surface);
        let fraction = (submersion.volume / volume).clamp(0.0, 1.0);
        let mut loads = FluidLoads {
            submerged_volume: submersion.volume,
            submerged_fraction: fraction,
            center_of_buoyancy: submersion.center,
            weight,
            ..FluidLoads::default()
        };

        if fraction > 0.0 {
            let v_fluid = fluid.flow.velocity_at(&pose.position);
            let v_rel = state.twist.linear - v_fluid;
            loads.buoyancy = -fluid.gravity.acceleration * (fluid.liquid.density * submersion.volume);
            loads.drag_force = self.drag_force(geometry, pose, &v_rel, fraction, fluid.liquid);
            loads.drag_torque =
                self.drag_torque(geometry, pose, &state.twist.angular, fraction, fluid.liquid);
        }

        if !loads.is_finite() {
            warn!(
                position = ?pose.position,
                submerged_volume = loads.submerged_volume,
                "non-finite fluid loads, applying weight only"
            );
            let weight = if weight.iter().all(|x| x.is_finite()) {
                weight
            } else {
                Vector3::zeros()
            };
            return FluidLoads {
                weight,
                center_of_buoyancy: Point3::origin(),
                ..FluidLoads::default()
            };
        }

        trace!(
            fraction,
            drag = ?loads.drag_force,
            buoyancy = ?loads.buoyancy,
            "fluid loads"
        );
        loads
    }

    /// Drag force for a relative velocity `v_rel` at submerged fraction
    /// `fraction`.
    #[must_use]
    pub fn drag_force(
        &self,
        geometry: &Geometry,
        pose: &Pose,
        v_rel: &Vector3<f64>,
        fraction: f64,
        liquid: &Liquid,
    ) -> Vector3<f64> {
        let speed = v_rel.norm();
        if speed <= self.config.velocity_epsilon || fraction <= 0.0 {
            return Vector3::zeros();
        }
        let local_dir = pose.inverse_transform_vector(&(v_rel / speed));
        let area = geometry.projected_area(&local_dir);
        let cd = geometry.drag_coefficients().translational;
        let mut force = v_rel * (-0.5 * liquid.density * cd * area * speed);
        if self.config.enable_viscous_drag && liquid.viscosity > 0.0 {
            force -= v_rel * (3.0 * PI * liquid.viscosity * geometry.equivalent_diameter());
        }
        force * fraction
    }

    /// Drag torque for angular velocity `omega` at submerged fraction
    /// `fraction`.
    #[must_use]
    pub fn drag_torque(
        &self,
        geometry: &Geometry,
        pose: &Pose,
        omega: &Vector3<f64>,
        fraction: f64,
        liquid: &Liquid,
    ) -> Vector3<f64> {
        let spin = omega.norm();
        if spin <= self.config.angular_epsilon || fraction <= 0.0 {
            return Vector3::zeros();
        }
        let local_axis = pose.inverse_transform_vector(&(omega / spin));
        let moment = geometry.rotational_drag_moment(&local_axis);
        let cr = geometry.drag_coefficients().rotational;
        let mut torque = omega * (-0.5 * liquid.density * cr * moment * spin);
        if self.config.enable_viscous_drag && liquid.viscosity > 0.0 {
            torque -= omega * (PI * liquid.viscosity * geometry.equivalent_diameter().powi(3));
        }
        torque * fraction
    }
}
