//! Buoyancy, hydrodynamic drag and ambient flow for rigid bodies.
//!
//! This crate computes what a liquid does to a rigid body. It owns no body
//! state: callers pass a [`Geometry`], a material density and the body's
//! [`RigidBodyState`](sim_types::RigidBodyState), and get back
//! [`FluidLoads`] to apply through their dynamics engine.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌────────────────────────────┐
//! │ ForceField   │   │ Liquid       │   │ Geometry                   │
//! │ Jet, Current │   │ FreeSurface  │   │ volume, inertia box,       │
//! └──────┬───────┘   └──────┬───────┘   │ projected area, submersion │
//!        │ FlowField         │           └─────────────┬──────────────┘
//!        └─────────┬─────────┘                         │
//!                  ▼                                   ▼
//!        ┌──────────────────────────────────────────────────────┐
//!        │ FluidDynamicsEngine::compute_loads                   │
//!        │   submersion → relative flow → drag, torque,         │
//!        │   buoyancy, weight                                   │
//!        └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**.
//!
//! # Quick Start
//!
//! ```
//! use sim_hydro::{
//!     FlowField, FluidContext, FluidDynamicsEngine, FreeSurface, Geometry, Liquid, Shape,
//! };
//! use sim_types::{Gravity, Pose, RigidBodyState};
//! use nalgebra::Point3;
//!
//! let geometry = Geometry::new(Shape::sphere(0.1)).unwrap();
//! let water = Liquid::water();
//! let surface = FreeSurface::horizontal(0.0);
//! let flow = FlowField::still();
//! let fluid = FluidContext::new(&water, &surface, &flow, Gravity::earth());
//!
//! let state = RigidBodyState::at_rest(Pose::from_position(Point3::new(0.0, 0.0, -1.0)));
//! let loads = FluidDynamicsEngine::default().compute_loads(&geometry, 500.0, &state, &fluid);
//!
//! // Half as dense as water: buoyancy is twice the weight
//! assert!((loads.buoyancy.z + 2.0 * loads.weight.z).abs() < 1e-9);
//! ```

#![doc(html_root_url = "https://docs.rs/sim-hydro/0.7.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::cast_precision_loss,
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::many_single_char_names,
    clippy::similar_names,
    clippy::float_cmp
)]

pub mod dynamics;
pub mod error;
pub mod fluid;
pub mod force_field;
pub mod geometry;
pub mod submersion;

pub use dynamics::{FluidContext, FluidDynamicsConfig, FluidDynamicsEngine, FluidLoads};
pub use error::{HydroError, Result};
pub use fluid::{FreeSurface, Liquid};
pub use force_field::{FlowField, ForceField, Jet, JetConfig, UniformCurrent, VelocityField};
pub use geometry::{CompoundPart, DragCoefficients, Geometry, Shape, TriMesh};
pub use submersion::Submersion;
