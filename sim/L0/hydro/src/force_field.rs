//! Analytic velocity fields that perturb the ambient liquid.
//!
//! A body never sees a single field: it samples a [`FlowField`], the vector
//! sum of a base current and every active [`ForceField`].
//!
//! # Jet model
//!
//! ```text
//!                 n
//!       outlet c ─┼──────────────▶ t (axial distance)
//!         ╱ r     │ ╲
//!        ╱        │   ╲   cone radius r_(t) = (t + 5r) / 5
//!       ╱         │     ╲
//!                 d  (radial distance from the axis)
//!
//! v(p) = exp(−50 d²/t²) · 10 r / (t + 5r) · vout · n     for t ≥ 0, d < r_(t)
//! ```
//!
//! The centerline speed decays as `1/(t + 5r)` and the profile is Gaussian
//! across the axis. Behind the outlet and outside the cone the jet is still.

use nalgebra::{Point3, Vector3};
use sim_types::Pose;

use crate::error::{HydroError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of sides of the drawn outlet circle.
const OUTLINE_SEGMENTS: usize = 12;

/// A pure, thread-safe velocity field.
pub trait VelocityField: Send + Sync {
    /// Liquid velocity at a world point.
    fn velocity_at(&self, p: &Point3<f64>) -> Vector3<f64>;
}

/// Plain parameters of a jet.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct JetConfig {
    /// Outlet center.
    pub outlet: Point3<f64>,
    /// Jet direction (normalized on construction).
    pub axis: Vector3<f64>,
    /// Outlet radius (m).
    pub radius: f64,
    /// Outlet speed (m/s).
    pub outlet_velocity: f64,
}

impl Default for JetConfig {
    fn default() -> Self {
        Self {
            outlet: Point3::origin(),
            axis: Vector3::z(),
            radius: 0.05,
            outlet_velocity: 1.0,
        }
    }
}

/// A turbulent round jet issuing from a circular outlet.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Jet {
    outlet: Point3<f64>,
    axis: Vector3<f64>,
    radius: f64,
    outlet_velocity: f64,
}

impl Jet {
    /// Create a jet.
    ///
    /// # Errors
    ///
    /// Rejects a zero or non-finite axis, a non-positive radius and a
    /// non-finite outlet velocity.
    pub fn new(
        outlet: Point3<f64>,
        axis: Vector3<f64>,
        radius: f64,
        outlet_velocity: f64,
    ) -> Result<Self> {
        if !outlet.coords.iter().all(|x| x.is_finite()) {
            return Err(HydroError::invalid_force_field("jet outlet must be finite"));
        }
        if !axis.iter().all(|x| x.is_finite()) {
            return Err(HydroError::invalid_force_field("jet axis must be finite"));
        }
        let axis = axis
            .try_normalize(f64::EPSILON)
            .ok_or_else(|| HydroError::invalid_force_field("jet axis must be non-zero"))?;
        if !(radius.is_finite() && radius > 0.0) {
            return Err(HydroError::invalid_force_field(format!(
                "jet radius must be positive, got {radius}"
            )));
        }
        if !outlet_velocity.is_finite() {
            return Err(HydroError::invalid_force_field(format!(
                "jet outlet velocity must be finite, got {outlet_velocity}"
            )));
        }
        Ok(Self {
            outlet,
            axis,
            radius,
            outlet_velocity,
        })
    }

    /// Create a jet from its configuration.
    pub fn from_config(config: &JetConfig) -> Result<Self> {
        Self::new(
            config.outlet,
            config.axis,
            config.radius,
            config.outlet_velocity,
        )
    }

    /// Current parameters as a configuration.
    #[must_use]
    pub fn config(&self) -> JetConfig {
        JetConfig {
            outlet: self.outlet,
            axis: self.axis,
            radius: self.radius,
            outlet_velocity: self.outlet_velocity,
        }
    }

    /// Outlet center.
    #[must_use]
    pub fn outlet(&self) -> Point3<f64> {
        self.outlet
    }

    /// Unit jet direction.
    #[must_use]
    pub fn axis(&self) -> Vector3<f64> {
        self.axis
    }

    /// Outlet radius.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Outlet speed.
    #[must_use]
    pub fn outlet_velocity(&self) -> f64 {
        self.outlet_velocity
    }

    /// Cone radius at axial distance `t` from the outlet.
    #[must_use]
    pub fn cone_radius(&self, t: f64) -> f64 {
        (t + 5.0 * self.radius) / 5.0
    }

    /// Model frame: origin at the outlet, local +Z along the axis.
    #[must_use]
    pub fn model_pose(&self) -> Pose {
        Pose::looking_along(self.outlet, &self.axis)
    }

    /// Outlet circle as a closed line strip in the model frame.
    ///
    /// The first point is repeated at the end.
    #[must_use]
    pub fn orifice_outline(&self) -> Vec<Point3<f64>> {
        (0..=OUTLINE_SEGMENTS)
            .map(|i| {
                let a = std::f64::consts::TAU * i as f64 / OUTLINE_SEGMENTS as f64;
                Point3::new(self.radius * a.cos(), self.radius * a.sin(), 0.0)
            })
            .collect()
    }

    /// Cone outline as line-list point pairs in the model frame.
    ///
    /// The axis line has length `vout`; each generator runs from the outlet
    /// circle to the cone circle at axial distance `vout`.
    #[must_use]
    pub fn cone_lines(&self) -> Vec<Point3<f64>> {
        let length = self.outlet_velocity;
        let scale = self.cone_radius(length) / self.radius;
        let mut points = Vec::with_capacity(2 * (OUTLINE_SEGMENTS + 1));
        points.push(Point3::origin());
        points.push(Point3::new(0.0, 0.0, length));
        for p in self.orifice_outline().iter().take(OUTLINE_SEGMENTS) {
            points.push(*p);
            points.push(Point3::new(p.x * scale, p.y * scale, length));
        }
        points
    }
}

impl VelocityField for Jet {
    fn velocity_at(&self, p: &Point3<f64>) -> Vector3<f64> {
        let cp = p - self.outlet;
        let t = cp.dot(&self.axis);
        if t < 0.0 {
            return Vector3::zeros();
        }
        let d = cp.cross(&self.axis).norm();
        if d >= self.cone_radius(t) {
            return Vector3::zeros();
        }
        if t == 0.0 {
            // Limit of the profile on the outlet plane
            return if d == 0.0 {
                self.axis * self.outlet_velocity
            } else {
                Vector3::zeros()
            };
        }
        let vmax = 10.0 * self.radius / (t + 5.0 * self.radius) * self.outlet_velocity;
        // On the axis the profile peaks, even where t * t underflows
        let falloff = if d == 0.0 {
            1.0
        } else {
            (-50.0 * (d / t).powi(2)).exp()
        };
        self.axis * (falloff * vmax)
    }
}

/// Spatially constant current.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UniformCurrent {
    /// Current velocity (m/s).
    pub velocity: Vector3<f64>,
}

impl UniformCurrent {
    /// Create a current.
    #[must_use]
    pub const fn new(velocity: Vector3<f64>) -> Self {
        Self { velocity }
    }
}

impl VelocityField for UniformCurrent {
    fn velocity_at(&self, _p: &Point3<f64>) -> Vector3<f64> {
        self.velocity
    }
}

/// Any force field that can live in a scene.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ForceField {
    /// Round jet.
    Jet(Jet),
    /// Uniform current.
    Current(UniformCurrent),
}

impl From<Jet> for ForceField {
    fn from(jet: Jet) -> Self {
        Self::Jet(jet)
    }
}

impl From<UniformCurrent> for ForceField {
    fn from(current: UniformCurrent) -> Self {
        Self::Current(current)
    }
}

impl VelocityField for ForceField {
    fn velocity_at(&self, p: &Point3<f64>) -> Vector3<f64> {
        match self {
            Self::Jet(jet) => jet.velocity_at(p),
            Self::Current(current) => current.velocity_at(p),
        }
    }
}

/// Composite liquid velocity: a base current plus borrowed force fields.
///
/// Rebuilt for every step from the fields present in the scene.
#[derive(Debug, Clone, Default)]
pub struct FlowField<'a> {
    /// Ambient current everywhere.
    pub base: Vector3<f64>,
    fields: Vec<&'a ForceField>,
}

impl<'a> FlowField<'a> {
    /// Flow with the given base current and no force fields.
    #[must_use]
    pub fn new(base: Vector3<f64>) -> Self {
        Self {
            base,
            fields: Vec::new(),
        }
    }

    /// Still liquid.
    #[must_use]
    pub fn still() -> Self {
        Self::new(Vector3::zeros())
    }

    /// Add a force field.
    #[must_use]
    pub fn with_field(mut self, field: &'a ForceField) -> Self {
        self.fields.push(field);
        self
    }

    /// Add a force field in place.
    pub fn push(&mut self, field: &'a ForceField) {
        self.fields.push(field);
    }

    /// Number of force fields.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

impl<'a> Extend<&'a ForceField> for FlowField<'a> {
    fn extend<I: IntoIterator<Item = &'a ForceField>>(&mut self, iter: I) {
        self.fields.extend(iter);
    }
}

impl VelocityField for FlowField<'_> {
    fn velocity_at(&self, p: &Point3<f64>) -> Vector3<f64> {
        self.fields
            .iter()
            .fold(self.base, |acc, field| acc + field.velocity_at(p))
    }
}
