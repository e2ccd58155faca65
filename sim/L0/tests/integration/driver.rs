//! Real-time advancing, determinism, rendering and error propagation.

use nalgebra::{Point3, Vector3};
use sim_core::World;
use sim_entities::{
    BodyLoad, CableConfig, CableEntity, EntityError, FluidBody, ForceFieldEntity,
    HydroSimulation, Material, RenderKind, SolidEntity,
};
use sim_hydro::{
    FlowField, FluidContext, FluidDynamicsEngine, FreeSurface, Geometry, Jet, Liquid, Shape,
};
use sim_types::{BodyId, Gravity, Pose, SimError, SimulationConfig};
use std::sync::Arc;
use std::time::Duration;

/// Float, a tether and a jet.
fn scene() -> HydroSimulation<World> {
    let mut sim =
        HydroSimulation::new(World::default(), SimulationConfig::with_timestep(1.0 / 128.0))
            .unwrap();
    sim.add_solid(
        SolidEntity::new(
            "float",
            Geometry::new(Shape::capsule(0.05, 0.1)).unwrap(),
            Arc::new(Material::polyethylene()),
        ),
        Pose::looking_along(Point3::new(0.0, 0.0, -0.3), &Vector3::new(1.0, 0.0, 1.0)),
    )
    .unwrap();
    sim.add_cable(
        CableEntity::new(
            "tether",
            CableConfig::straight(
                Point3::new(0.0, 1.0, -1.0),
                Point3::new(1.0, 1.0, -1.5),
                6,
                0.02,
                0.5,
            )
            .with_self_collision(true),
            Arc::new(Material::rope()),
        )
        .unwrap(),
    )
    .unwrap();
    sim.add_force_field(ForceFieldEntity::new(
        "thruster",
        Jet::new(Point3::new(-1.0, 1.0, -1.2), Vector3::x(), 0.1, 1.5).unwrap(),
    ));
    sim
}

#[test]
fn identical_runs_are_identical() {
    let mut a = scene();
    let mut b = scene();
    for _ in 0..256 {
        let ra = a.step().unwrap();
        let rb = b.step().unwrap();
        assert_eq!(ra.submerged_bodies, rb.submerged_bodies);
        assert_eq!(ra.total_submerged_volume, rb.total_submerged_volume);
    }
    let bodies: Vec<BodyId> = a.entities().iter().flat_map(|e| e.bodies()).collect();
    assert_eq!(bodies.len(), 7);
    for body in bodies {
        assert_eq!(a.snapshot().pose(body), b.snapshot().pose(body));
    }
}

#[test]
fn advance_follows_real_time() {
    let mut sim = scene();
    assert_eq!(sim.advance(Duration::from_millis(500)).unwrap(), 0);

    sim.start();
    assert!(sim.is_running());
    // 1/128 s steps: 250 ms is 32 steps
    assert_eq!(sim.advance(Duration::from_millis(250)).unwrap(), 32);
    assert_eq!(sim.step_count(), 32);

    sim.set_speed_factor(0.5);
    assert_eq!(sim.advance(Duration::from_millis(125)).unwrap(), 8);

    sim.set_speed_factor(-1.0);
    assert_eq!(sim.speed_factor(), 1.0);

    sim.stop();
    assert_eq!(sim.advance(Duration::from_millis(500)).unwrap(), 0);
    assert_eq!(sim.step_count(), 40);
    assert_eq!(sim.snapshot().step(), 40);
}

#[test]
fn renderables_are_restartable() {
    let mut sim = scene();
    // Nothing captured yet: only the jet draws
    assert_eq!(sim.renderables().count(), 2);

    sim.step().unwrap();
    let first: Vec<_> = sim.renderables().collect();
    let second: Vec<_> = sim.renderables().collect();
    assert_eq!(first, second);
    // Float mesh, six segment meshes, centerline, jet outline and cone
    assert_eq!(first.len(), 10);
    let meshes = first
        .iter()
        .filter(|r| r.kind == RenderKind::TriangleMesh)
        .count();
    assert_eq!(meshes, 7);
}

#[test]
fn invalid_body_ids_propagate() {
    let world = World::default();
    let geometry = Geometry::new(Shape::sphere(0.1)).unwrap();
    let liquid = Liquid::water();
    let surface = FreeSurface::horizontal(0.0);
    let flow = FlowField::still();
    let fluid = FluidContext::new(&liquid, &surface, &flow, Gravity::earth());

    let ghost = FluidBody {
        body: BodyId::new(42),
        geometry: &geometry,
        density: 1000.0,
    };
    let result: Result<BodyLoad, EntityError> =
        ghost.compute_load(&world, &FluidDynamicsEngine::default(), &fluid);
    assert!(matches!(
        result,
        Err(EntityError::Sim(SimError::InvalidBodyId(42)))
    ));

    let mut sim = scene();
    assert!(matches!(
        sim.attach_cable(
            sim_entities::EntityId(1),
            sim_entities::CableEnd::First,
            BodyId::new(42),
            Point3::origin()
        ),
        Err(EntityError::Sim(SimError::InvalidBodyId(42)))
    ));
}
