//! Error types for scene entities.

use sim_hydro::HydroError;
use sim_types::SimError;
use thiserror::Error;

/// Errors raised while building or stepping a scene.
#[derive(Debug, Error)]
pub enum EntityError {
    /// Cable parameters that cannot describe a cable.
    #[error("invalid cable: {0}")]
    InvalidCable(String),

    /// Material properties out of range.
    #[error("invalid material: {0}")]
    InvalidMaterial(String),

    /// Material name not present in the registry.
    #[error("unknown material: {0}")]
    UnknownMaterial(String),

    /// Entity queried before it was added to an engine.
    #[error("entity '{0}' has not been added to the engine")]
    NotAdded(String),

    /// Entity added to an engine twice.
    #[error("entity '{0}' is already in the engine")]
    AlreadyAdded(String),

    /// Cable end attached twice.
    #[error("cable '{name}' {end} end is already attached")]
    DuplicateAttachment {
        /// Cable name.
        name: String,
        /// Which end.
        end: &'static str,
    },

    /// Unknown entity handle.
    #[error("invalid entity id: {0}")]
    InvalidEntityId(usize),

    /// Error reported by the dynamics engine.
    #[error(transparent)]
    Sim(#[from] SimError),

    /// Error reported by the fluid model.
    #[error(transparent)]
    Hydro(#[from] HydroError),
}

impl EntityError {
    /// Create an invalid cable error.
    pub fn invalid_cable(msg: impl Into<String>) -> Self {
        Self::InvalidCable(msg.into())
    }

    /// Create an invalid material error.
    pub fn invalid_material(msg: impl Into<String>) -> Self {
        Self::InvalidMaterial(msg.into())
    }

    /// Create a not-added error.
    pub fn not_added(name: impl Into<String>) -> Self {
        Self::NotAdded(name.into())
    }

    /// Check if this error came from the dynamics engine.
    #[must_use]
    pub fn is_engine_error(&self) -> bool {
        matches!(self, Self::Sim(_))
    }
}

/// Result type for scene operations.
pub type Result<T> = std::result::Result<T, EntityError>;
