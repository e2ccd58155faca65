//! Error types for the fluid model.

use thiserror::Error;

/// Errors raised when constructing fluid-model inputs.
///
/// All of these are construction-time rejections. Per-step load computation
/// never fails; degenerate inputs resolve to neutral loads instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HydroError {
    /// Degenerate or malformed geometry.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Force field parameters out of range.
    #[error("invalid force field: {0}")]
    InvalidForceField(String),

    /// Liquid properties out of range.
    #[error("invalid liquid: {0}")]
    InvalidLiquid(String),

    /// Free surface that does not define a plane.
    #[error("invalid free surface: {0}")]
    InvalidSurface(String),

    /// Fluid model configuration out of range.
    #[error("invalid fluid configuration: {0}")]
    InvalidConfig(String),
}

impl HydroError {
    /// Create an invalid geometry error.
    pub fn invalid_geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }

    /// Create an invalid force field error.
    pub fn invalid_force_field(msg: impl Into<String>) -> Self {
        Self::InvalidForceField(msg.into())
    }

    /// Create an invalid liquid error.
    pub fn invalid_liquid(msg: impl Into<String>) -> Self {
        Self::InvalidLiquid(msg.into())
    }

    /// Create an invalid surface error.
    pub fn invalid_surface(msg: impl Into<String>) -> Self {
        Self::InvalidSurface(msg.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

/// Result type for fluid-model construction.
pub type Result<T> = std::result::Result<T, HydroError>;
