//! Benchmarks for stepping linked capsule chains.
//!
//! Run with: `cargo bench -p sim-core`

#![allow(
    missing_docs,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::cast_precision_loss,
    clippy::cast_lossless
)]

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use nalgebra::{Point3, UnitQuaternion, Vector3};
use sim_core::World;
use sim_types::{
    CollisionFilter, CollisionShape, DynamicsEngine, Gravity, LinkCompliance, LinkDesc,
    MassProperties, Pose, RigidBodyDesc,
};

/// Horizontal chain of `n` capsules pinned at one end.
fn chain(n: usize) -> World {
    let mut world = World::default().with_gravity(Gravity::earth());
    let segment = 0.1;
    let radius = 0.01;
    let along_x = UnitQuaternion::rotation_between(&Vector3::z(), &Vector3::x())
        .unwrap_or_else(UnitQuaternion::identity);

    let pin = world
        .create_rigid_body(RigidBodyDesc::fixed(
            CollisionShape::sphere(radius),
            Pose::identity(),
        ))
        .unwrap();

    let mut previous = None;
    for i in 0..n {
        let centre = Point3::new(segment * (i as f64 + 0.5), 0.0, 0.0);
        let filter = if i % 2 == 0 {
            CollisionFilter::cable_even()
        } else {
            CollisionFilter::cable_odd()
        };
        let body = world
            .create_rigid_body(
                RigidBodyDesc::new(
                    CollisionShape::capsule(0.5 * segment - radius, radius),
                    MassProperties::cylinder(0.05, radius, 0.5 * segment),
                    Pose::from_position_rotation(centre, along_x),
                )
                .with_filter(filter),
            )
            .unwrap();

        let half = Point3::new(0.0, 0.0, 0.5 * segment);
        let link = match previous {
            None => LinkDesc::new(pin, Point3::origin(), body, Point3::from(-half.coords)),
            Some(prev) => LinkDesc::new(prev, half, body, Point3::from(-half.coords))
                .with_compliance(LinkCompliance::from_stiffness(0.5, segment)),
        };
        world.create_constraint(link).unwrap();
        previous = Some(body);
    }
    world
}

fn bench_chain_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_step");
    for &n in &[10, 50, 200] {
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            let mut world = chain(n);
            b.iter(|| world.step(1.0 / 240.0).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_chain_step);
criterion_main!(benches);
