//! Liquid properties and the free surface.

use nalgebra::{Point3, Vector3};

use crate::error::{HydroError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Physical properties of a liquid.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Liquid {
    /// Name for diagnostics.
    pub name: String,
    /// Density (kg/m³).
    pub density: f64,
    /// Dynamic viscosity (Pa·s). Zero for an inviscid liquid.
    pub viscosity: f64,
}

impl Default for Liquid {
    fn default() -> Self {
        Self::water()
    }
}

impl Liquid {
    /// Create a liquid, validating its properties.
    pub fn new(name: impl Into<String>, density: f64, viscosity: f64) -> Result<Self> {
        let liquid = Self {
            name: name.into(),
            density,
            viscosity,
        };
        liquid.validate()?;
        Ok(liquid)
    }

    /// Fresh water at 20 °C.
    #[must_use]
    pub fn water() -> Self {
        Self {
            name: "water".to_string(),
            density: 1000.0,
            viscosity: 1.0e-3,
        }
    }

    /// Sea water at 15 °C.
    #[must_use]
    pub fn sea_water() -> Self {
        Self {
            name: "sea water".to_string(),
            density: 1025.0,
            viscosity: 1.22e-3,
        }
    }

    /// Same liquid without viscous drag.
    #[must_use]
    pub fn inviscid(mut self) -> Self {
        self.viscosity = 0.0;
        self
    }

    /// Validate the properties.
    pub fn validate(&self) -> Result<()> {
        if !(self.density.is_finite() && self.density > 0.0) {
            return Err(HydroError::invalid_liquid(format!(
                "{}: density must be positive, got {}",
                self.name, self.density
            )));
        }
        if !(self.viscosity.is_finite() && self.viscosity >= 0.0) {
            return Err(HydroError::invalid_liquid(format!(
                "{}: viscosity must be non-negative, got {}",
                self.name, self.viscosity
            )));
        }
        Ok(())
    }
}

/// The liquid's free surface: a plane with the liquid on the side opposite
/// its normal.
///
/// A point `x` is submerged when `normal · (x − point) <= 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FreeSurface {
    normal: Vector3<f64>,
    point: Point3<f64>,
}

impl Default for FreeSurface {
    fn default() -> Self {
        Self::horizontal(0.0)
    }
}

impl FreeSurface {
    /// Create a surface through `point` with outward (upward) `normal`.
    pub fn new(normal: Vector3<f64>, point: Point3<f64>) -> Result<Self> {
        if !normal.iter().chain(point.coords.iter()).all(|x| x.is_finite()) {
            return Err(HydroError::invalid_surface("normal and point must be finite"));
        }
        let normal = normal
            .try_normalize(f64::EPSILON)
            .ok_or_else(|| HydroError::invalid_surface("normal must be non-zero"))?;
        Ok(Self { normal, point })
    }

    /// Horizontal surface at height `z`, liquid below.
    #[must_use]
    pub fn horizontal(z: f64) -> Self {
        Self {
            normal: Vector3::z(),
            point: Point3::new(0.0, 0.0, z),
        }
    }

    /// Unit normal pointing out of the liquid.
    #[must_use]
    pub fn normal(&self) -> Vector3<f64> {
        self.normal
    }

    /// A point on the surface.
    #[must_use]
    pub fn point(&self) -> Point3<f64> {
        self.point
    }

    /// Signed height of `p` above the surface (negative below).
    #[must_use]
    pub fn height_of(&self, p: &Point3<f64>) -> f64 {
        self.normal.dot(&(p - self.point))
    }

    /// Depth of `p` below the surface (negative above).
    #[must_use]
    pub fn depth_of(&self, p: &Point3<f64>) -> f64 {
        -self.height_of(p)
    }

    /// Same surface shifted along its normal by `dz`.
    #[must_use]
    pub fn raised(&self, dz: f64) -> Self {
        Self {
            normal: self.normal,
            point: self.point + self.normal * dz,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_liquid_validation() {
        assert!(Liquid::water().validate().is_ok());
        assert!(Liquid::sea_water().inviscid().validate().is_ok());
        assert!(Liquid::new("oil", -1.0, 0.1).is_err());
        assert!(Liquid::new("tar", 900.0, f64::NAN).is_err());
        assert_eq!(Liquid::new("oil", 900.0, 0.1).unwrap().density, 900.0);
    }

    #[test]
    fn test_surface_depth() {
        let s = FreeSurface::horizontal(2.0);
        assert_relative_eq!(s.depth_of(&Point3::new(5.0, -1.0, 0.5)), 1.5);
        assert_relative_eq!(s.height_of(&Point3::new(0.0, 0.0, 3.0)), 1.0);
        assert_relative_eq!(s.raised(1.0).depth_of(&Point3::new(0.0, 0.0, 3.0)), 0.0);
    }

    #[test]
    fn test_surface_normalizes() {
        let s = FreeSurface::new(Vector3::new(0.0, 0.0, 5.0), Point3::origin()).unwrap();
        assert_relative_eq!(s.normal(), Vector3::z());
        assert!(FreeSurface::new(Vector3::zeros(), Point3::origin()).is_err());
        assert!(FreeSurface::new(Vector3::z(), Point3::new(f64::NAN, 0.0, 0.0)).is_err());
    }
}
