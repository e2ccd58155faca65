//! Configuration types for simulation.
//!
//! Timestep, gravity, and the settings of the substepped position-based
//! solver used by the reference engine.

use crate::dynamics::Gravity;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Main configuration for a simulation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimulationConfig {
    /// Fixed timestep for physics integration (seconds).
    pub timestep: f64,
    /// Gravity configuration.
    pub gravity: Gravity,
    /// Solver configuration.
    pub solver: SolverConfig,
    /// Upper bound on fixed steps run by a single real-time advance.
    ///
    /// Keeps a slow frame from triggering an ever-growing catch-up backlog.
    pub max_steps_per_advance: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            timestep: 1.0 / 240.0,
            gravity: Gravity::earth(),
            solver: SolverConfig::default(),
            max_steps_per_advance: 64,
        }
    }
}

impl SimulationConfig {
    /// Create a new simulation config with the given timestep.
    #[must_use]
    pub fn with_timestep(timestep: f64) -> Self {
        Self {
            timestep,
            ..Default::default()
        }
    }

    /// Configuration for interactive simulation (60 Hz).
    #[must_use]
    pub fn realtime() -> Self {
        Self {
            timestep: 1.0 / 60.0,
            solver: SolverConfig {
                substeps: 20,
                ..SolverConfig::default()
            },
            ..Default::default()
        }
    }

    /// Configuration for stiff cables (1000 Hz, more substeps).
    #[must_use]
    pub fn high_fidelity() -> Self {
        Self {
            timestep: 1.0 / 1000.0,
            solver: SolverConfig::high_accuracy(),
            ..Default::default()
        }
    }

    /// Set the gravity.
    #[must_use]
    pub fn gravity(mut self, gravity: Gravity) -> Self {
        self.gravity = gravity;
        self
    }

    /// Disable gravity.
    #[must_use]
    pub fn zero_gravity(mut self) -> Self {
        self.gravity = Gravity::zero();
        self
    }

    /// Set the solver configuration.
    #[must_use]
    pub fn solver(mut self, solver: SolverConfig) -> Self {
        self.solver = solver;
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> crate::Result<()> {
        if !self.timestep.is_finite() || self.timestep <= 0.0 {
            return Err(crate::SimError::InvalidTimestep(self.timestep));
        }

        if self.timestep > 1.0 {
            return Err(crate::SimError::invalid_config(
                "timestep > 1 second is likely an error",
            ));
        }

        if !self.gravity.acceleration.iter().all(|x| x.is_finite()) {
            return Err(crate::SimError::invalid_config("gravity must be finite"));
        }

        if self.max_steps_per_advance == 0 {
            return Err(crate::SimError::invalid_config(
                "max_steps_per_advance must be at least 1",
            ));
        }

        self.solver.validate()
    }

    /// Get the frequency in Hz.
    #[must_use]
    pub fn frequency(&self) -> f64 {
        1.0 / self.timestep
    }
}

/// Configuration for the position-based solver.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverConfig {
    /// Substeps per step. Each substep predicts, projects and updates velocity.
    pub substeps: usize,
    /// Constraint projection passes per substep.
    pub position_iterations: usize,
    /// Whether contacts between collision shapes are resolved.
    pub enable_contacts: bool,
    /// Contact tolerance (penetration below this is ignored).
    pub contact_tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            substeps: 8,
            position_iterations: 1,
            enable_contacts: true,
            contact_tolerance: 1e-5,
        }
    }
}

impl SolverConfig {
    /// High-accuracy solver configuration.
    #[must_use]
    pub fn high_accuracy() -> Self {
        Self {
            substeps: 16,
            position_iterations: 2,
            ..Default::default()
        }
    }

    /// Fast solver configuration.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            substeps: 4,
            ..Default::default()
        }
    }

    /// Disable contact resolution.
    #[must_use]
    pub fn without_contacts(mut self) -> Self {
        self.enable_contacts = false;
        self
    }

    /// Validate the solver configuration.
    pub fn validate(&self) -> crate::Result<()> {
        if self.substeps == 0 {
            return Err(crate::SimError::invalid_config(
                "substeps must be at least 1",
            ));
        }

        if self.position_iterations == 0 {
            return Err(crate::SimError::invalid_config(
                "position_iterations must be at least 1",
            ));
        }

        if !self.contact_tolerance.is_finite() || self.contact_tolerance < 0.0 {
            return Err(crate::SimError::invalid_config(
                "contact_tolerance must be non-negative",
            ));
        }

        Ok(())
    }
}
