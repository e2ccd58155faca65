//! Single rigid bodies loaded by the liquid.

use nalgebra::Vector3;
use sim_hydro::{FluidContext, FluidDynamicsEngine, Geometry};
use sim_types::{BodyId, CollisionFilter, DynamicsEngine, Pose, RigidBodyDesc, Twist};
use std::sync::Arc;
use tracing::debug;

use crate::entity::{BodyLoad, FluidBody, GeometryProvider};
use crate::error::{EntityError, Result};
use crate::material::Material;

/// A rigid body of uniform material.
#[derive(Debug, Clone)]
pub struct SolidEntity {
    name: String,
    geometry: Arc<Geometry>,
    material: Arc<Material>,
    filter: CollisionFilter,
    body: Option<BodyId>,
}

impl SolidEntity {
    /// Create a solid that is not yet in any engine.
    #[must_use]
    pub fn new(name: impl Into<String>, geometry: Geometry, material: Arc<Material>) -> Self {
        Self {
            name: name.into(),
            geometry: Arc::new(geometry),
            material,
            filter: CollisionFilter::default(),
            body: None,
        }
    }

    /// Use a custom collision filter.
    #[must_use]
    pub fn with_collision_filter(mut self, filter: CollisionFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Create the rigid body at `pose`, at rest.
    pub fn add_to_engine<E: DynamicsEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        pose: Pose,
    ) -> Result<BodyId> {
        self.add_to_engine_moving(engine, pose, Twist::zero())
    }

    /// Create the rigid body at `pose` with an initial velocity.
    pub fn add_to_engine_moving<E: DynamicsEngine + ?Sized>(
        &mut self,
        engine: &mut E,
        pose: Pose,
        twist: Twist,
    ) -> Result<BodyId> {
        if self.body.is_some() {
            return Err(EntityError::AlreadyAdded(self.name.clone()));
        }
        let desc = RigidBodyDesc::new(
            self.geometry.collision_shape(),
            self.geometry.mass_properties(self.material.density),
            pose,
        )
        .with_twist(twist)
        .with_filter(self.filter)
        .with_contact_material(self.material.friction, self.material.restitution);
        let body = engine.create_rigid_body(desc)?;
        debug!(
            name = %self.name,
            %body,
            mass = self.mass(),
            material = %self.material.name,
            "added solid"
        );
        self.body = Some(body);
        Ok(body)
    }

    /// Entity name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Body geometry.
    #[must_use]
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Shared handle to the geometry.
    #[must_use]
    pub fn geometry_handle(&self) -> Arc<Geometry> {
        Arc::clone(&self.geometry)
    }

    /// Body material.
    #[must_use]
    pub fn material(&self) -> &Arc<Material> {
        &self.material
    }

    /// Engine handle.
    pub fn body(&self) -> Result<BodyId> {
        self.body.ok_or_else(|| EntityError::not_added(&self.name))
    }

    /// Check if the solid is in an engine.
    #[must_use]
    pub fn is_added(&self) -> bool {
        self.body.is_some()
    }

    /// Volume (m³).
    #[must_use]
    pub fn volume(&self) -> f64 {
        self.geometry.volume()
    }

    /// Size of the local bounding box.
    #[must_use]
    pub fn dimensions(&self) -> Vector3<f64> {
        self.geometry.dimensions()
    }

    /// Mass (kg).
    #[must_use]
    pub fn mass(&self) -> f64 {
        self.volume() * self.material.density
    }

    /// Fluid loads for this step. Read-only; safe to run concurrently.
    pub fn compute_loads<E: DynamicsEngine + ?Sized>(
        &self,
        engine: &E,
        fluid_engine: &FluidDynamicsEngine,
        fluid: &FluidContext<'_>,
    ) -> Result<BodyLoad> {
        FluidBody {
            body: self.body()?,
            geometry: &self.geometry,
            density: self.material.density,
        }
        .compute_load(engine, fluid_engine, fluid)
    }
}

impl GeometryProvider for SolidEntity {
    fn fluid_bodies(&self) -> Vec<FluidBody<'_>> {
        self.body
            .map(|body| FluidBody {
                body,
                geometry: &self.geometry,
                density: self.material.density,
            })
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;
    use sim_core::World;
    use sim_hydro::{FlowField, FreeSurface, Liquid, Shape};
    use sim_types::Gravity;

    fn ball() -> SolidEntity {
        SolidEntity::new(
            "ball",
            Geometry::new(Shape::sphere(0.1)).unwrap(),
            Arc::new(Material::new("half", 500.0).unwrap()),
        )
    }

    #[test]
    fn test_add_to_engine() {
        let mut world = World::default();
        let mut solid = ball();
        assert!(matches!(solid.body(), Err(EntityError::NotAdded(_))));

        let body = solid
            .add_to_engine(&mut world, Pose::from_position(Point3::new(0.0, 0.0, -1.0)))
            .unwrap();
        assert_eq!(solid.body().unwrap(), body);
        assert_relative_eq!(world.body(body).unwrap().mass_props.mass, solid.mass());
        assert!(matches!(
            solid.add_to_engine(&mut world, Pose::identity()),
            Err(EntityError::AlreadyAdded(_))
        ));
    }

    #[test]
    fn test_queries() {
        let solid = ball();
        assert_relative_eq!(solid.volume(), 4.0 / 3.0 * std::f64::consts::PI * 1e-3, epsilon = 1e-12);
        assert_relative_eq!(solid.dimensions(), Vector3::repeat(0.2), epsilon = 1e-12);
        assert!(solid.fluid_bodies().is_empty());
    }

    #[test]
    fn test_loads_applied() {
        let mut world = World::default();
        let mut solid = ball();
        let body = solid
            .add_to_engine(&mut world, Pose::from_position(Point3::new(0.0, 0.0, -1.0)))
            .unwrap();

        let liquid = Liquid::water();
        let surface = FreeSurface::horizontal(0.0);
        let flow = FlowField::still();
        let fluid = FluidContext::new(&liquid, &surface, &flow, Gravity::earth());
        let load = solid
            .compute_loads(&world, &FluidDynamicsEngine::default(), &fluid)
            .unwrap();
        assert_eq!(load.body, body);
        assert!(load.loads.is_submerged());
        // Net upward: half as dense as water
        assert_relative_eq!(
            load.loads.net_force().z,
            500.0 * solid.volume() * 9.81,
            max_relative = 1e-9
        );

        load.apply(&mut world).unwrap();
        world.step(1.0 / 240.0).unwrap();
        assert!(world.linear_velocity(body).unwrap().z > 0.0);
    }

    #[test]
    fn test_not_added_loads() {
        let world = World::default();
        let liquid = Liquid::water();
        let surface = FreeSurface::horizontal(0.0);
        let flow = FlowField::still();
        let fluid = FluidContext::new(&liquid, &surface, &flow, Gravity::earth());
        assert!(matches!(
            ball().compute_loads(&world, &FluidDynamicsEngine::default(), &fluid),
            Err(EntityError::NotAdded(_))
        ));
    }
}
