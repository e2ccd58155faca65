//! Integration tests for the hydrodynamic simulation crates.
//!
//! These tests drive full scenes through `HydroSimulation` on the reference
//! `sim_core::World` engine:
//! - Buoyancy equilibrium and terminal sinking speed
//! - Cable construction, links and self-collision masks
//! - Jets and currents acting on bodies
//! - Real-time advancing, determinism and error propagation

pub mod buoyancy;
pub mod cables;
pub mod driver;
pub mod flow;
