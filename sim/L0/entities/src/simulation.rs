//! The step driver.
//!
//! [`HydroSimulation`] owns the dynamics engine, the scene and the liquid.
//! One fixed step runs:
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌─────────────┐   ┌────────────┐   ┌──────────┐
//! │ 1. flow from │──▶│ 2. loads per │──▶│ 3. apply in │──▶│ 4. engine  │──▶│ 5. world │
//! │ force fields │   │ body (rayon) │   │ entity order│   │  step(dt)  │   │ snapshot │
//! └──────────────┘   └──────────────┘   └─────────────┘   └────────────┘   └──────────┘
//! ```
//!
//! Loads are computed from a read-only view of the engine and applied in
//! entity then segment order, so two runs from the same scene produce the
//! same trajectory with or without the `parallel` feature.
//!
//! Weight is applied by the driver from [`SimulationConfig::gravity`]. Give
//! the engine zero gravity of its own.

use nalgebra::{Point3, Vector3};
use sim_hydro::{
    FlowField, FluidContext, FluidDynamicsConfig, FluidDynamicsEngine, FreeSurface, Liquid,
};
use sim_types::{BodyId, ConstraintId, DynamicsEngine, Pose, SimulationConfig};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::cable::CableEntity;
use crate::entity::{BodyLoad, Entity, FluidBody, ForceFieldEntity, GeometryProvider, Render};
use crate::error::{EntityError, Result};
use crate::render::{Renderable, WorldSnapshot};
use crate::solid::SolidEntity;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Liquid surrounding the scene.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Environment {
    /// Liquid properties.
    pub liquid: Liquid,
    /// Free surface.
    pub surface: FreeSurface,
    /// Base current everywhere (m/s).
    pub current: Vector3<f64>,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            liquid: Liquid::water(),
            surface: FreeSurface::horizontal(0.0),
            current: Vector3::zeros(),
        }
    }
}

impl Environment {
    /// Still liquid below a horizontal surface at height `z`.
    #[must_use]
    pub fn still(liquid: Liquid, z: f64) -> Self {
        Self {
            liquid,
            surface: FreeSurface::horizontal(z),
            current: Vector3::zeros(),
        }
    }

    /// Set the base current.
    #[must_use]
    pub fn with_current(mut self, current: Vector3<f64>) -> Self {
        self.current = current;
        self
    }
}

/// Handle of an entity in a [`HydroSimulation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub usize);

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Which end of a cable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CableEnd {
    /// The end at `end1`.
    First,
    /// The end at `end2`.
    Second,
}

/// Summary of one fixed step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    /// Simulated time after the step (s).
    pub time: f64,
    /// Step count after the step.
    pub step: u64,
    /// Bodies touching the liquid during the step.
    pub submerged_bodies: usize,
    /// Sum of submerged volumes (m³).
    pub total_submerged_volume: f64,
    /// Wall-clock time spent in the step.
    pub physics_time: Duration,
}

/// A scene of solids, cables and force fields in a liquid.
#[derive(Debug)]
pub struct HydroSimulation<E: DynamicsEngine> {
    engine: E,
    entities: Vec<Entity>,
    environment: Environment,
    fluid: FluidDynamicsEngine,
    config: SimulationConfig,
    running: bool,
    speed_factor: f64,
    accumulator: f64,
    time: f64,
    step_count: u64,
    last_physics_time: Duration,
    snapshot: WorldSnapshot,
}

impl<E: DynamicsEngine> HydroSimulation<E> {
    /// Create an empty scene in still fresh water, stopped.
    pub fn new(engine: E, config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            engine,
            entities: Vec::new(),
            environment: Environment::default(),
            fluid: FluidDynamicsEngine::default(),
            config,
            running: false,
            speed_factor: 1.0,
            accumulator: 0.0,
            time: 0.0,
            step_count: 0,
            last_physics_time: Duration::ZERO,
            snapshot: WorldSnapshot::new(),
        })
    }

    /// Replace the liquid.
    #[must_use]
    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Replace the fluid model settings.
    pub fn with_fluid_config(mut self, config: FluidDynamicsConfig) -> Result<Self> {
        self.fluid = FluidDynamicsEngine::new(config)?;
        Ok(self)
    }

    /// The dynamics engine.
    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Mutable access to the dynamics engine, for bodies outside the scene.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// The liquid.
    #[must_use]
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Mutable access to the liquid.
    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.environment
    }

    /// Step settings.
    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Add a solid to the engine at `pose` and to the scene.
    pub fn add_solid(&mut self, mut solid: SolidEntity, pose: Pose) -> Result<EntityId> {
        solid.add_to_engine(&mut self.engine, pose)?;
        Ok(self.push(solid.into()))
    }

    /// Add a cable to the engine and to the scene.
    pub fn add_cable(&mut self, mut cable: CableEntity) -> Result<EntityId> {
        cable.add_to_engine(&mut self.engine)?;
        Ok(self.push(cable.into()))
    }

    /// Add a force field to the scene.
    pub fn add_force_field(&mut self, field: ForceFieldEntity) -> EntityId {
        self.push(field.into())
    }

    fn push(&mut self, entity: Entity) -> EntityId {
        let id = EntityId(self.entities.len());
        debug!(%id, name = entity.name(), "entity added to scene");
        self.entities.push(entity);
        id
    }

    /// Pin one end of a scene cable to `anchor` in `body`'s frame.
    pub fn attach_cable(
        &mut self,
        cable: EntityId,
        end: CableEnd,
        body: BodyId,
        anchor: Point3<f64>,
    ) -> Result<ConstraintId> {
        let Some(Entity::Cable(c)) = self.entities.get_mut(cable.0) else {
            return Err(EntityError::InvalidEntityId(cable.0));
        };
        match end {
            CableEnd::First => c.attach_first_end(&mut self.engine, body, anchor),
            CableEnd::Second => c.attach_second_end(&mut self.engine, body, anchor),
        }
    }

    /// Switch self-collision of a scene cable.
    pub fn set_cable_self_collidable(&mut self, cable: EntityId, enabled: bool) -> Result<()> {
        let Some(Entity::Cable(c)) = self.entities.get_mut(cable.0) else {
            return Err(EntityError::InvalidEntityId(cable.0));
        };
        c.set_self_collidable(&mut self.engine, enabled)
    }

    /// Switch a scene force field on or off.
    pub fn set_field_enabled(&mut self, field: EntityId, enabled: bool) -> Result<()> {
        self.entities
            .get_mut(field.0)
            .and_then(Entity::as_force_field_mut)
            .map(|f| f.set_enabled(enabled))
            .ok_or(EntityError::InvalidEntityId(field.0))
    }

    /// An entity.
    pub fn entity(&self, id: EntityId) -> Result<&Entity> {
        self.entities
            .get(id.0)
            .ok_or(EntityError::InvalidEntityId(id.0))
    }

    /// Every entity in insertion order.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Start real-time advancing.
    pub fn start(&mut self) {
        self.running = true;
    }

    /// Stop real-time advancing. Pending real time is discarded.
    pub fn stop(&mut self) {
        self.running = false;
        self.accumulator = 0.0;
    }

    /// Whether [`advance`](Self::advance) runs steps.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Scale applied to real elapsed time. Non-positive or non-finite values
    /// reset it to 1.
    pub fn set_speed_factor(&mut self, factor: f64) {
        self.speed_factor = if factor.is_finite() && factor > 0.0 {
            factor
        } else {
            warn!(factor, "invalid speed factor, using 1.0");
            1.0
        };
    }

    /// Scale applied to real elapsed time.
    #[must_use]
    pub fn speed_factor(&self) -> f64 {
        self.speed_factor
    }

    /// Run as many fixed steps as `real_elapsed` (scaled by the speed
    /// factor) allows, returning how many ran.
    ///
    /// Leftover time carries to the next call. A backlog beyond
    /// [`SimulationConfig::max_steps_per_advance`] is dropped.
    pub fn advance(&mut self, real_elapsed: Duration) -> Result<usize> {
        if !self.running {
            return Ok(0);
        }
        let dt = self.config.timestep;
        self.accumulator += real_elapsed.as_secs_f64() * self.speed_factor;

        let mut steps = 0;
        while self.accumulator >= dt * (1.0 - 1e-9) {
            if steps == self.config.max_steps_per_advance {
                warn!(
                    backlog = self.accumulator,
                    steps, "simulation falling behind, dropping backlog"
                );
                self.accumulator = 0.0;
                break;
            }
            self.step()?;
            self.accumulator = (self.accumulator - dt).max(0.0);
            steps += 1;
        }
        Ok(steps)
    }

    /// Run one fixed step.
    pub fn step(&mut self) -> Result<StepReport> {
        let started = Instant::now();
        let dt = self.config.timestep;

        let mut flow = FlowField::new(self.environment.current);
        flow.extend(self.entities.iter().filter_map(Entity::active_field));
        let fluid = FluidContext::new(
            &self.environment.liquid,
            &self.environment.surface,
            &flow,
            self.config.gravity,
        );

        let work: Vec<FluidBody<'_>> = self
            .entities
            .iter()
            .flat_map(|e| e.fluid_bodies())
            .collect();
        let loads = compute_all(&work, &self.engine, &self.fluid, &fluid)?;

        let mut submerged_bodies = 0;
        let mut total_submerged_volume = 0.0;
        for load in &loads {
            if load.loads.is_submerged() {
                submerged_bodies += 1;
                total_submerged_volume += load.loads.submerged_volume;
            }
            load.apply(&mut self.engine)?;
        }

        self.engine.step(dt)?;
        self.time += dt;
        self.step_count += 1;

        let bodies = self.entities.iter().flat_map(Entity::bodies);
        self.snapshot = WorldSnapshot::capture(&self.engine, bodies, self.time, self.step_count)?;
        self.last_physics_time = started.elapsed();

        debug!(
            step = self.step_count,
            time = self.time,
            bodies = loads.len(),
            submerged_bodies,
            fields = flow.field_count(),
            "step"
        );
        Ok(StepReport {
            time: self.time,
            step: self.step_count,
            submerged_bodies,
            total_submerged_volume,
            physics_time: self.last_physics_time,
        })
    }

    /// Simulated time (s).
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Completed steps.
    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Wall-clock time of the last step.
    #[must_use]
    pub fn physics_time(&self) -> Duration {
        self.last_physics_time
    }

    /// Body poses after the last step.
    #[must_use]
    pub fn snapshot(&self) -> &WorldSnapshot {
        &self.snapshot
    }

    /// Take a snapshot now, without stepping.
    pub fn refresh_snapshot(&mut self) -> Result<&WorldSnapshot> {
        let bodies = self.entities.iter().flat_map(Entity::bodies);
        self.snapshot = WorldSnapshot::capture(&self.engine, bodies, self.time, self.step_count)?;
        Ok(&self.snapshot)
    }

    /// Drawables of every entity from the last snapshot.
    ///
    /// Lazy; call again for a fresh pass.
    pub fn renderables(&self) -> impl Iterator<Item = Renderable> + '_ {
        self.entities
            .iter()
            .flat_map(move |e| e.renderables(&self.snapshot))
    }
}

#[cfg(feature = "parallel")]
fn compute_all<E: DynamicsEngine + ?Sized>(
    work: &[FluidBody<'_>],
    engine: &E,
    fluid_engine: &FluidDynamicsEngine,
    fluid: &FluidContext<'_>,
) -> Result<Vec<BodyLoad>> {
    use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
    work.par_iter()
        .map(|b| b.compute_load(engine, fluid_engine, fluid))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn compute_all<E: DynamicsEngine + ?Sized>(
    work: &[FluidBody<'_>],
    engine: &E,
    fluid_engine: &FluidDynamicsEngine,
    fluid: &FluidContext<'_>,
) -> Result<Vec<BodyLoad>> {
    work.iter()
        .map(|b| b.compute_load(engine, fluid_engine, fluid))
        .collect()
}
