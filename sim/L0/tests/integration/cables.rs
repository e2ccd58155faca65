//! Cables in a scene: layout, links, collision masks and sagging.

use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};
use sim_core::World;
use sim_entities::{CableConfig, CableEnd, CableEntity, EntityError, HydroSimulation, Material};
use sim_types::{CollisionShape, DynamicsEngine, Pose, RigidBodyDesc, SimulationConfig};
use std::sync::Arc;

fn tether(config: CableConfig) -> CableEntity {
    CableEntity::new("tether", config, Arc::new(Material::rope())).unwrap()
}

fn diagonal(segments: usize) -> CableConfig {
    CableConfig::straight(
        Point3::new(0.0, 0.0, -1.0),
        Point3::new(1.0, 2.0, -3.0),
        segments,
        0.02,
        2.0,
    )
}

#[test]
fn segments_cover_the_cable() {
    let mut sim = HydroSimulation::new(World::default(), SimulationConfig::default()).unwrap();
    let id = sim.add_cable(tether(diagonal(12))).unwrap();
    let snapshot = sim.refresh_snapshot().unwrap().clone();
    let cable = sim.entity(id).unwrap().as_cable().unwrap();

    let half = cable.segment_length() / 2.0;
    let total: f64 = cable
        .segments()
        .iter()
        .map(|s| {
            let pose = snapshot.pose(s.body).unwrap();
            let a = pose.transform_point(&Point3::new(0.0, 0.0, -half));
            let b = pose.transform_point(&Point3::new(0.0, 0.0, half));
            (b - a).norm()
        })
        .sum();
    // |(1, 2, -2)| = 3
    assert_relative_eq!(total, 3.0, epsilon = 1e-12);
    assert_eq!(cable.links().len(), 11);
    assert_eq!(sim.engine().link_count(), 11);

    let line = cable.centerline(&snapshot);
    assert_relative_eq!(line[0], Point3::new(0.0, 0.0, -1.0), epsilon = 1e-12);
    assert_relative_eq!(line[12], Point3::new(1.0, 2.0, -3.0), epsilon = 1e-12);
}

#[test]
fn invalid_cables_are_rejected() {
    let rope = Arc::new(Material::rope());
    let zero_segments = CableConfig {
        segments: 0,
        ..diagonal(4)
    };
    let zero_length = CableConfig {
        end2: Point3::new(0.0, 0.0, -1.0),
        ..diagonal(4)
    };
    for config in [zero_segments, zero_length] {
        assert!(matches!(
            CableEntity::new("bad", config, Arc::clone(&rope)),
            Err(EntityError::InvalidCable(_))
        ));
    }
}

#[test]
fn self_collision_masks() {
    let mut world = World::default();
    let mut plain = tether(diagonal(6));
    plain.add_to_engine(&mut world).unwrap();
    let mut coiled = tether(
        CableConfig::straight(
            Point3::new(0.0, 1.0, -1.0),
            Point3::new(2.0, 1.0, -1.0),
            6,
            0.02,
            2.0,
        )
        .with_self_collision(true),
    );
    coiled.add_to_engine(&mut world).unwrap();

    let p = |i: usize| plain.segments()[i].body;
    let c = |i: usize| coiled.segments()[i].body;
    for i in 0..6 {
        for j in 0..6 {
            if i != j {
                assert!(!world.can_collide(p(i), p(j)).unwrap());
            }
            // Plain cables never touch any cable segment
            assert!(!world.can_collide(p(i), c(j)).unwrap());
        }
    }
    for i in 0..6 {
        for j in (i + 1)..6 {
            let same_parity = (i + j) % 2 == 0;
            assert_eq!(world.can_collide(c(i), c(j)).unwrap(), same_parity);
        }
    }
}

#[test]
fn anchored_cable_sags() {
    let mut sim = HydroSimulation::new(World::default(), SimulationConfig::default()).unwrap();
    let anchor = sim
        .engine_mut()
        .create_rigid_body(RigidBodyDesc::fixed(
            CollisionShape::sphere(0.05),
            Pose::from_position(Point3::new(0.0, 0.0, -1.0)),
        ))
        .unwrap();
    let id = sim
        .add_cable(tether(CableConfig::straight(
            Point3::new(0.0, 0.0, -1.0),
            Point3::new(1.0, 0.0, -1.0),
            8,
            0.02,
            0.01,
        )))
        .unwrap();
    sim.attach_cable(id, CableEnd::First, anchor, Point3::origin())
        .unwrap();
    assert!(matches!(
        sim.attach_cable(id, CableEnd::First, anchor, Point3::origin()),
        Err(EntityError::DuplicateAttachment { .. })
    ));

    for _ in 0..480 {
        sim.step().unwrap();
    }
    let cable = sim.entity(id).unwrap().as_cable().unwrap();
    let line = cable.centerline(sim.snapshot());

    // Pinned end stays, free end sinks (rope is denser than water)
    assert_relative_eq!(line[0], Point3::new(0.0, 0.0, -1.0), epsilon = 5e-3);
    assert!(line[8].z < -1.01, "free end at {}", line[8].z);

    // Links hold the chain together
    for link in cable.links() {
        assert!(sim.engine().link_gap(*link).unwrap() < 1e-3);
    }
    for w in line.windows(2) {
        assert_relative_eq!((w[1] - w[0]).norm(), cable.segment_length(), max_relative = 2e-2);
    }
}

#[test]
fn cable_in_current_drifts_downstream() {
    let mut sim = HydroSimulation::new(
        World::default(),
        SimulationConfig::default().zero_gravity(),
    )
    .unwrap()
    .with_environment(
        sim_entities::Environment::default().with_current(Vector3::new(0.0, 0.5, 0.0)),
    );
    let id = sim
        .add_cable(tether(CableConfig::straight(
            Point3::new(0.0, 0.0, -1.0),
            Point3::new(1.0, 0.0, -1.0),
            4,
            0.02,
            1.0,
        )))
        .unwrap();
    for _ in 0..120 {
        sim.step().unwrap();
    }
    let cable = sim.entity(id).unwrap().as_cable().unwrap();
    for segment in cable.segments() {
        assert!(sim.engine().linear_velocity(segment.body).unwrap().y > 0.0);
    }
}
