//! Jets and currents acting on bodies through the driver.

use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};
use sim_core::World;
use sim_entities::{Environment, ForceFieldEntity, HydroSimulation, Material, SolidEntity};
use sim_hydro::{
    FlowField, ForceField, Geometry, Jet, JetConfig, Shape, UniformCurrent, VelocityField,
};
use sim_types::{DynamicsEngine, Pose, SimulationConfig};
use std::sync::Arc;

fn neutral_ball() -> SolidEntity {
    SolidEntity::new(
        "ball",
        Geometry::new(Shape::sphere(0.05)).unwrap(),
        Arc::new(Material::neutral()),
    )
}

fn jet() -> Jet {
    Jet::from_config(&JetConfig {
        outlet: Point3::new(0.0, 0.0, -2.0),
        axis: Vector3::x(),
        radius: 0.1,
        outlet_velocity: 3.0,
    })
    .unwrap()
}

fn simulation() -> HydroSimulation<World> {
    HydroSimulation::new(World::default(), SimulationConfig::default()).unwrap()
}

#[test]
fn jet_profile() {
    let jet = jet();
    // On the outlet center
    assert_relative_eq!(
        jet.velocity_at(&Point3::new(0.0, 0.0, -2.0)),
        Vector3::new(3.0, 0.0, 0.0)
    );
    // Behind the outlet
    assert_eq!(jet.velocity_at(&Point3::new(-0.1, 0.0, -2.0)), Vector3::zeros());
    // Centerline speed decays downstream
    let near = jet.velocity_at(&Point3::new(0.2, 0.0, -2.0)).x;
    let far = jet.velocity_at(&Point3::new(2.0, 0.0, -2.0)).x;
    assert!(near > far && far > 0.0);
    // Radial decay, zero outside the cone
    let on_axis = jet.velocity_at(&Point3::new(1.0, 0.0, -2.0)).x;
    let off_axis = jet.velocity_at(&Point3::new(1.0, 0.1, -2.0)).x;
    assert!(on_axis > off_axis && off_axis > 0.0);
    assert_eq!(jet.velocity_at(&Point3::new(1.0, 0.5, -2.0)), Vector3::zeros());
}

#[test]
fn flow_fields_superpose() {
    let jet: ForceField = jet().into();
    let current: ForceField = UniformCurrent::new(Vector3::new(0.0, 0.2, 0.0)).into();
    let flow = FlowField::new(Vector3::new(0.0, 0.0, 0.1))
        .with_field(&jet)
        .with_field(&current);
    let p = Point3::new(0.5, 0.0, -2.0);
    let expected = jet.velocity_at(&p) + Vector3::new(0.0, 0.2, 0.1);
    assert_relative_eq!(flow.velocity_at(&p), expected, epsilon = 1e-15);
}

#[test]
fn jet_pushes_body_along_its_axis() {
    let mut sim = simulation();
    let id = sim
        .add_solid(neutral_ball(), Pose::from_position(Point3::new(0.5, 0.0, -2.0)))
        .unwrap();
    let body = sim.entity(id).unwrap().bodies()[0];
    sim.add_force_field(ForceFieldEntity::new("thruster", jet()));

    for _ in 0..120 {
        sim.step().unwrap();
    }
    let v = sim.engine().linear_velocity(body).unwrap();
    assert!(v.x > 0.05, "downstream speed {}", v.x);
    assert!(v.y.abs() < 1e-9);
    assert!(v.z.abs() < 1e-6);
}

#[test]
fn body_behind_jet_is_untouched() {
    let mut sim = simulation();
    let id = sim
        .add_solid(neutral_ball(), Pose::from_position(Point3::new(-0.5, 0.0, -2.0)))
        .unwrap();
    let body = sim.entity(id).unwrap().bodies()[0];
    sim.add_force_field(ForceFieldEntity::new("thruster", jet()));

    for _ in 0..60 {
        sim.step().unwrap();
    }
    assert!(sim.engine().linear_velocity(body).unwrap().norm() < 1e-9);
}

#[test]
fn disabled_jet_contributes_nothing() {
    let mut sim = simulation();
    let id = sim
        .add_solid(neutral_ball(), Pose::from_position(Point3::new(0.5, 0.0, -2.0)))
        .unwrap();
    let body = sim.entity(id).unwrap().bodies()[0];
    let field = sim.add_force_field(ForceFieldEntity::new("thruster", jet()));
    sim.set_field_enabled(field, false).unwrap();

    for _ in 0..60 {
        sim.step().unwrap();
    }
    assert!(sim.engine().linear_velocity(body).unwrap().norm() < 1e-9);
}

#[test]
fn current_carries_body_to_its_speed() {
    let current = Vector3::new(0.3, 0.0, 0.0);
    let mut sim = simulation().with_environment(Environment::default().with_current(current));
    let id = sim
        .add_solid(neutral_ball(), Pose::from_position(Point3::new(0.0, 0.0, -2.0)))
        .unwrap();
    let body = sim.entity(id).unwrap().bodies()[0];

    for _ in 0..20 * 240 {
        sim.step().unwrap();
    }
    // Quadratic drag closes the gap slowly and never overshoots
    let v = sim.engine().linear_velocity(body).unwrap();
    assert!(v.x > 0.25 && v.x < 0.3 + 1e-9, "drift speed {}", v.x);
}
