//! Reference rigid-body engine.
//!
//! [`World`] implements [`sim_types::DynamicsEngine`] with a substepped
//! position-based solver (XPBD). It is small on purpose: enough to drive
//! tethered underwater bodies in tests and headless runs, and a template for
//! wiring an external engine behind the same trait.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          World                               │
//! │  Bodies, links, collision filters, time                     │
//! └─────────────────────────┬───────────────────────────────────┘
//!                           │ step(dt) = n × substep(h)
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  predict   v += h F/m, ω += h I⁻¹τ, integrate pose          │
//! │  project   links (point + orientation), contacts            │
//! │  recover   v, ω from pose change                            │
//! │  correct   link damping, restitution, friction              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Loads applied through the trait are held constant for the whole step and
//! cleared afterwards.
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**.
//!
//! # Quick Start
//!
//! ```
//! use sim_core::World;
//! use sim_types::{
//!     CollisionShape, DynamicsEngine, Gravity, MassProperties, Pose, RigidBodyDesc,
//! };
//! use nalgebra::Point3;
//!
//! let mut world = World::default().with_gravity(Gravity::earth());
//! let ball = world
//!     .create_rigid_body(RigidBodyDesc::new(
//!         CollisionShape::sphere(0.1),
//!         MassProperties::sphere(1.0, 0.1),
//!         Pose::from_position(Point3::new(0.0, 0.0, 1.0)),
//!     ))
//!     .unwrap();
//!
//! world.step(1.0 / 240.0).unwrap();
//! assert!(world.transform(ball).unwrap().position.z < 1.0);
//! ```

#![doc(html_root_url = "https://docs.rs/sim-core/0.7.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::cast_precision_loss,
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::many_single_char_names,
    clippy::similar_names
)]

mod body;
mod contact;
pub mod integrators;
mod link;
mod world;

pub use body::Body;
pub use link::Link;
pub use world::World;

pub use sim_types::{
    BodyId, CollisionFilter, CollisionShape, ConstraintId, DynamicsEngine, LinkCompliance,
    LinkDesc, MassProperties, Pose, RigidBodyDesc, SimError,
};
