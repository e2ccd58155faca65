//! Floating and sinking bodies.
//!
//! Weight, buoyancy and drag come from the driver; the engine itself runs
//! with zero gravity.

use approx::assert_relative_eq;
use nalgebra::Point3;
use sim_core::World;
use sim_entities::{HydroSimulation, Material, SolidEntity};
use sim_hydro::{Geometry, Shape};
use sim_types::{DynamicsEngine, Pose, SimulationConfig};
use std::sync::Arc;

const STEPS_PER_SECOND: usize = 240;

fn simulation() -> HydroSimulation<World> {
    HydroSimulation::new(
        World::default(),
        SimulationConfig::with_timestep(1.0 / STEPS_PER_SECOND as f64),
    )
    .unwrap()
}

fn sphere(radius: f64, material: Material) -> SolidEntity {
    SolidEntity::new(
        "sphere",
        Geometry::new(Shape::sphere(radius)).unwrap(),
        Arc::new(material),
    )
}

#[test]
fn half_density_sphere_floats_at_the_surface() {
    let mut sim = simulation();
    let id = sim
        .add_solid(
            sphere(0.1, Material::new("half", 500.0).unwrap()),
            Pose::from_position(Point3::new(0.0, 0.0, -0.15)),
        )
        .unwrap();
    let body = sim.entity(id).unwrap().bodies()[0];

    for _ in 0..19 * STEPS_PER_SECOND {
        sim.step().unwrap();
    }
    // Average over the last second to smooth the residual bobbing
    let mut mean_z = 0.0;
    for _ in 0..STEPS_PER_SECOND {
        sim.step().unwrap();
        mean_z += sim.snapshot().pose(body).unwrap().position.z;
    }
    mean_z /= STEPS_PER_SECOND as f64;

    // Half submerged: center on the surface
    assert!(mean_z.abs() < 0.01, "mean height {mean_z}");
    assert!(sim.engine().linear_velocity(body).unwrap().z.abs() < 0.1);
}

#[test]
fn sphere_dropped_from_above_settles_at_the_surface() {
    let mut sim = simulation();
    let id = sim
        .add_solid(
            sphere(0.1, Material::new("half", 500.0).unwrap()),
            Pose::from_position(Point3::new(0.0, 0.0, 0.5)),
        )
        .unwrap();
    let body = sim.entity(id).unwrap().bodies()[0];

    let mut lowest = f64::INFINITY;
    for _ in 0..29 * STEPS_PER_SECOND {
        sim.step().unwrap();
        lowest = lowest.min(sim.snapshot().pose(body).unwrap().position.z);
    }
    // Falls through the surface before buoyancy brings it back
    assert!(lowest < 0.0, "lowest height {lowest}");

    let mut mean_z = 0.0;
    for _ in 0..STEPS_PER_SECOND {
        sim.step().unwrap();
        let z = sim.snapshot().pose(body).unwrap().position.z;
        assert!(z.abs() < 0.05, "height {z}");
        mean_z += z;
    }
    mean_z /= STEPS_PER_SECOND as f64;
    assert!(mean_z.abs() < 0.01, "mean height {mean_z}");
}

#[test]
fn floating_sphere_rests_higher_when_lighter() {
    let mut heights = Vec::new();
    for density in [300.0, 700.0] {
        let mut sim = simulation();
        let id = sim
            .add_solid(
                sphere(0.1, Material::new("float", density).unwrap()),
                Pose::from_position(Point3::new(0.0, 0.0, -0.05)),
            )
            .unwrap();
        let body = sim.entity(id).unwrap().bodies()[0];
        for _ in 0..10 * STEPS_PER_SECOND {
            sim.step().unwrap();
        }
        heights.push(sim.snapshot().pose(body).unwrap().position.z);
    }
    assert!(heights[0] > 0.0);
    assert!(heights[1] < 0.0);
}

#[test]
fn steel_sphere_reaches_terminal_velocity() {
    let mut sim = simulation();
    let id = sim
        .add_solid(
            sphere(0.1, Material::steel()),
            Pose::from_position(Point3::new(0.0, 0.0, -1.0)),
        )
        .unwrap();
    let body = sim.entity(id).unwrap().bodies()[0];

    for _ in 0..5 * STEPS_PER_SECOND {
        sim.step().unwrap();
    }

    // (ρs − ρw) V g = ½ ρw Cd A v²
    let area = std::f64::consts::PI * 0.01;
    let volume = 4.0 / 3.0 * std::f64::consts::PI * 1e-3;
    let terminal = ((7850.0 - 1000.0) * volume * 9.81 / (0.5 * 1000.0 * 0.47 * area)).sqrt();
    let vz = sim.engine().linear_velocity(body).unwrap().z;
    assert_relative_eq!(-vz, terminal, max_relative = 0.01);
}

#[test]
fn dry_body_falls_freely() {
    let mut sim = simulation();
    let id = sim
        .add_solid(
            sphere(0.1, Material::aluminium()),
            Pose::from_position(Point3::new(0.0, 0.0, 10.0)),
        )
        .unwrap();
    let body = sim.entity(id).unwrap().bodies()[0];

    for _ in 0..STEPS_PER_SECOND / 2 {
        let report = sim.step().unwrap();
        assert_eq!(report.submerged_bodies, 0);
    }
    let vz = sim.engine().linear_velocity(body).unwrap().z;
    assert_relative_eq!(vz, -9.81 * 0.5, max_relative = 1e-6);
}
