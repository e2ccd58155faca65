//! Underwater scenes: solids, tethers and flow sources in a liquid.
//!
//! Entities own geometry and material; a [`DynamicsEngine`](sim_types::DynamicsEngine)
//! owns their motion. [`HydroSimulation`] ties the two together with the
//! fluid model from [`sim_hydro`]:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      HydroSimulation                        │
//! │  engine, entities, liquid, fixed step, real-time advance    │
//! └───────┬──────────────────────┬──────────────────────┬───────┘
//!         │                      │                      │
//!         ▼                      ▼                      ▼
//! ┌───────────────┐     ┌────────────────┐     ┌────────────────┐
//! │ SolidEntity   │     │ CableEntity    │     │ ForceField-    │
//! │ one body      │     │ N segments,    │     │ Entity         │
//! │               │     │ N − 1 links    │     │ jet / current  │
//! └───────────────┘     └────────────────┘     └────────────────┘
//!         │ GeometryProvider     │                      │ flow
//!         └──────────┬───────────┘                      │
//!                    ▼                                  ▼
//!        weight, buoyancy, drag per body  ◀──── composite FlowField
//! ```
//!
//! Rendering reads only the [`WorldSnapshot`] taken after each step.
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**.
//!
//! # Quick Start
//!
//! ```
//! use sim_core::World;
//! use sim_entities::{HydroSimulation, Material, SolidEntity};
//! use sim_hydro::{Geometry, Shape};
//! use sim_types::{Pose, SimulationConfig};
//! use nalgebra::Point3;
//! use std::sync::Arc;
//!
//! let mut sim = HydroSimulation::new(World::default(), SimulationConfig::default()).unwrap();
//! let float = SolidEntity::new(
//!     "float",
//!     Geometry::new(Shape::sphere(0.1)).unwrap(),
//!     Arc::new(Material::polyethylene()),
//! );
//! sim.add_solid(float, Pose::from_position(Point3::new(0.0, 0.0, -0.5)))
//!     .unwrap();
//!
//! let report = sim.step().unwrap();
//! assert_eq!(report.submerged_bodies, 1);
//! ```

#![doc(html_root_url = "https://docs.rs/sim-entities/0.7.0")]
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

pub mod cable;
pub mod entity;
pub mod error;
pub mod material;
pub mod render;
pub mod simulation;
pub mod solid;

pub use cable::{CableConfig, CableEntity, CableSegment, SelfCollisionGroup};
pub use entity::{
    BodyLoad, Entity, FluidBody, ForceContributor, ForceFieldEntity, GeometryProvider, Render,
};
pub use error::{EntityError, Result};
pub use material::{Material, MaterialRegistry};
pub use render::{RenderKind, Renderable, WorldSnapshot};
pub use simulation::{CableEnd, Environment, EntityId, HydroSimulation, StepReport};
pub use solid::SolidEntity;
