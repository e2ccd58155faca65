//! Core types for hydrodynamic rigid-body simulation.
//!
//! This crate provides the foundational types shared by the dynamics engine,
//! the fluid model, and the entity layer:
//!
//! - [`RigidBodyState`] - Position, orientation, velocity of rigid bodies
//! - [`MassProperties`] - Mass, center of mass, inertia tensor
//! - [`CollisionShape`] / [`CollisionFilter`] - Contact geometry and masking
//! - [`LinkDesc`] / [`LinkCompliance`] - Compliant links between bodies
//! - [`SimulationConfig`] - Timestep, gravity, solver settings
//! - [`DynamicsEngine`] - The interface a rigid-body engine exposes to the
//!   hydrodynamics core
//!
//! # Design Philosophy
//!
//! Apart from the [`DynamicsEngine`] seam, these types are **pure data**. They
//! are the common language between:
//!
//! - Dynamics engines (sim-core, external)
//! - The fluid model (sim-hydro)
//! - Entities that own geometry and apply loads (sim-entities)
//!
//! # Layer 0
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**.
//!
//! # Coordinate System
//!
//! - X: right
//! - Y: forward
//! - Z: up
//! - Right-handed
//!
//! # Example
//!
//! ```
//! use sim_types::{RigidBodyState, Pose, Twist};
//! use nalgebra::Point3;
//!
//! // Create a body at rest one meter below the origin
//! let state = RigidBodyState::new(
//!     Pose::from_position(Point3::new(0.0, 0.0, -1.0)),
//!     Twist::zero(),
//! );
//!
//! assert_eq!(state.pose.position.z, -1.0);
//! assert!(state.twist.linear.norm() < 1e-10);
//! ```

#![doc(html_root_url = "https://docs.rs/sim-types/0.7.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
    clippy::cast_precision_loss,       // usize to f64 is fine for counts
    clippy::missing_errors_doc,        // Error docs added where non-obvious
    clippy::must_use_candidate,
)]

mod body;
mod config;
mod dynamics;
mod engine;
mod error;
mod shape;

pub use body::{BodyId, ConstraintId, MassProperties, Pose, RigidBodyState, Twist};
pub use config::{SimulationConfig, SolverConfig};
pub use dynamics::{ExternalForce, Gravity};
pub use engine::{DynamicsEngine, LinkCompliance, LinkDesc, RigidBodyDesc};
pub use error::SimError;
pub use shape::{CollisionFilter, CollisionShape};

// Re-export math types for convenience
pub use nalgebra::{Matrix3, Point3, UnitQuaternion, Vector3};

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, SimError>;
