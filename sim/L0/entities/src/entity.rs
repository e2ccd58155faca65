//! Scene entities and the capabilities the step driver relies on.
//!
//! Entities are a closed set of variants. The driver never asks what an
//! entity is, only what it can do:
//!
//! ```text
//!                 GeometryProvider   ForceContributor   Render
//! Solid                  ✓                  ✓             ✓
//! Cable                  ✓                  ✓             ✓
//! ForceField             –                  –             ✓   (+ flow)
//! ```

use nalgebra::{Point3, Vector3};
use sim_hydro::{FluidContext, FluidDynamicsEngine, FluidLoads, ForceField, Geometry, Jet, UniformCurrent};
use sim_types::{BodyId, DynamicsEngine, Pose};
use tracing::trace;

use crate::cable::CableEntity;
use crate::error::Result;
use crate::render::{Renderable, WorldSnapshot};
use crate::solid::SolidEntity;

/// A body the liquid acts on.
#[derive(Debug, Clone, Copy)]
pub struct FluidBody<'a> {
    /// Engine handle.
    pub body: BodyId,
    /// Geometry in the body frame.
    pub geometry: &'a Geometry,
    /// Material density (kg/m³).
    pub density: f64,
}

impl FluidBody<'_> {
    /// Read the body's state and compute its fluid loads.
    pub fn compute_load<E: DynamicsEngine + ?Sized>(
        &self,
        engine: &E,
        fluid_engine: &FluidDynamicsEngine,
        fluid: &FluidContext<'_>,
    ) -> Result<BodyLoad> {
        let state = engine.body_state(self.body)?;
        let center_of_mass = engine.center_of_mass(self.body)?;
        let loads = fluid_engine.compute_loads(self.geometry, self.density, &state, fluid);
        Ok(BodyLoad {
            body: self.body,
            center_of_mass,
            loads,
        })
    }
}

/// Loads computed for one body, ready to apply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyLoad {
    /// Target body.
    pub body: BodyId,
    /// World center of mass at computation time.
    pub center_of_mass: Point3<f64>,
    /// Fluid loads and weight.
    pub loads: FluidLoads,
}

impl BodyLoad {
    /// Apply to the engine: weight at the center of mass, and when wet
    /// buoyancy at the center of buoyancy, drag at the center of mass and
    /// the drag torque.
    pub fn apply<E: DynamicsEngine + ?Sized>(&self, engine: &mut E) -> Result<()> {
        let l = &self.loads;
        engine.apply_force(self.body, l.weight, self.center_of_mass)?;
        if l.is_submerged() {
            engine.apply_force(self.body, l.buoyancy, l.center_of_buoyancy)?;
            engine.apply_force(self.body, l.drag_force, self.center_of_mass)?;
            engine.apply_torque(self.body, l.drag_torque)?;
        }
        trace!(body = %self.body, net = ?l.net_force(), "applied loads");
        Ok(())
    }
}

/// Something with bodies the liquid acts on.
pub trait GeometryProvider {
    /// Every body in the engine, with its geometry and density.
    fn fluid_bodies(&self) -> Vec<FluidBody<'_>>;
}

/// Something that produces per-step loads.
pub trait ForceContributor {
    /// Loads for every body, in a stable order.
    fn compute_loads<E: DynamicsEngine + ?Sized>(
        &self,
        engine: &E,
        fluid_engine: &FluidDynamicsEngine,
        fluid: &FluidContext<'_>,
    ) -> Result<Vec<BodyLoad>>;
}

impl<T: GeometryProvider> ForceContributor for T {
    fn compute_loads<E: DynamicsEngine + ?Sized>(
        &self,
        engine: &E,
        fluid_engine: &FluidDynamicsEngine,
        fluid: &FluidContext<'_>,
    ) -> Result<Vec<BodyLoad>> {
        self.fluid_bodies()
            .iter()
            .map(|b| b.compute_load(engine, fluid_engine, fluid))
            .collect()
    }
}

/// Something that can be drawn from a snapshot.
pub trait Render {
    /// Drawables at the snapshot's poses. Bodies missing from the snapshot
    /// are skipped.
    fn renderables<'a>(
        &'a self,
        snapshot: &'a WorldSnapshot,
    ) -> impl Iterator<Item = Renderable> + 'a;
}

impl Render for SolidEntity {
    fn renderables<'a>(
        &'a self,
        snapshot: &'a WorldSnapshot,
    ) -> impl Iterator<Item = Renderable> + 'a {
        self.body()
            .ok()
            .and_then(|body| snapshot.pose(body))
            .map(|pose| Renderable::mesh(pose, &self.geometry().tessellate()))
            .into_iter()
    }
}

/// A velocity field placed in the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct ForceFieldEntity {
    name: String,
    field: ForceField,
    enabled: bool,
}

impl ForceFieldEntity {
    /// Create an enabled force field.
    #[must_use]
    pub fn new(name: impl Into<String>, field: impl Into<ForceField>) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            enabled: true,
        }
    }

    /// Entity name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The field.
    #[must_use]
    pub fn field(&self) -> &ForceField {
        &self.field
    }

    /// Whether the field contributes to the flow.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Switch the field on or off.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

impl Render for ForceFieldEntity {
    fn renderables<'a>(
        &'a self,
        _snapshot: &'a WorldSnapshot,
    ) -> impl Iterator<Item = Renderable> + 'a {
        let drawn: Vec<Renderable> = match &self.field {
            ForceField::Jet(jet) => jet_renderables(jet),
            ForceField::Current(current) => current_renderables(current),
        };
        drawn.into_iter()
    }
}

fn jet_renderables(jet: &Jet) -> Vec<Renderable> {
    let model = jet.model_pose();
    vec![
        Renderable::line_strip(model, jet.orifice_outline()),
        Renderable::lines(model, jet.cone_lines()),
    ]
}

fn current_renderables(current: &UniformCurrent) -> Vec<Renderable> {
    if current.velocity == Vector3::zeros() {
        return Vec::new();
    }
    vec![Renderable::lines(
        Pose::identity(),
        vec![Point3::origin(), Point3::from(current.velocity)],
    )]
}

/// Anything that can live in a scene.
#[derive(Debug, Clone)]
pub enum Entity {
    /// Single rigid body.
    Solid(SolidEntity),
    /// Segmented cable.
    Cable(CableEntity),
    /// Flow source.
    ForceField(ForceFieldEntity),
}

impl Entity {
    /// Entity name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Solid(s) => s.name(),
            Self::Cable(c) => c.name(),
            Self::ForceField(f) => f.name(),
        }
    }

    /// The force field, when this entity is an enabled one.
    #[must_use]
    pub fn active_field(&self) -> Option<&ForceField> {
        match self {
            Self::ForceField(f) if f.is_enabled() => Some(f.field()),
            _ => None,
        }
    }

    /// Engine handles of every body.
    #[must_use]
    pub fn bodies(&self) -> Vec<BodyId> {
        self.fluid_bodies().iter().map(|b| b.body).collect()
    }

    /// As a solid.
    #[must_use]
    pub fn as_solid(&self) -> Option<&SolidEntity> {
        match self {
            Self::Solid(s) => Some(s),
            _ => None,
        }
    }

    /// As a cable.
    #[must_use]
    pub fn as_cable(&self) -> Option<&CableEntity> {
        match self {
            Self::Cable(c) => Some(c),
            _ => None,
        }
    }

    /// As a force field.
    #[must_use]
    pub fn as_force_field(&self) -> Option<&ForceFieldEntity> {
        match self {
            Self::ForceField(f) => Some(f),
            _ => None,
        }
    }

    /// As a mutable force field.
    pub fn as_force_field_mut(&mut self) -> Option<&mut ForceFieldEntity> {
        match self {
            Self::ForceField(f) => Some(f),
            _ => None,
        }
    }
}

impl From<SolidEntity> for Entity {
    fn from(solid: SolidEntity) -> Self {
        Self::Solid(solid)
    }
}

impl From<CableEntity> for Entity {
    fn from(cable: CableEntity) -> Self {
        Self::Cable(cable)
    }
}

impl From<ForceFieldEntity> for Entity {
    fn from(field: ForceFieldEntity) -> Self {
        Self::ForceField(field)
    }
}

impl GeometryProvider for Entity {
    fn fluid_bodies(&self) -> Vec<FluidBody<'_>> {
        match self {
            Self::Solid(s) => s.fluid_bodies(),
            Self::Cable(c) => c.fluid_bodies(),
            Self::ForceField(_) => Vec::new(),
        }
    }
}

impl Render for Entity {
    fn renderables<'a>(
        &'a self,
        snapshot: &'a WorldSnapshot,
    ) -> impl Iterator<Item = Renderable> + 'a {
        let drawn: Box<dyn Iterator<Item = Renderable> + 'a> = match self {
            Self::Solid(s) => Box::new(s.renderables(snapshot)),
            Self::Cable(c) => Box::new(c.renderables(snapshot)),
            Self::ForceField(f) => Box::new(f.renderables(snapshot)),
        };
        drawn
    }
}
