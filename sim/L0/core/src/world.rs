//! Simulation world: bodies, links, and the substepped solver.

use hashbrown::{HashMap, HashSet};
use nalgebra::{Point3, Vector3};
use sim_types::{
    BodyId, CollisionFilter, CollisionShape, ConstraintId, DynamicsEngine, Gravity, LinkDesc,
    Pose, Result, RigidBodyDesc, SimError, SolverConfig,
};
use tracing::{debug, warn};

use crate::body::Body;
use crate::contact::{Contact, Proxy, collide};
use crate::link::Link;

/// Margin added to the broad-phase sphere test.
const BROAD_PHASE_MARGIN: f64 = 1e-3;

/// Rigid-body world implementing [`DynamicsEngine`].
///
/// Gravity is zero unless set with [`World::with_gravity`]; callers that
/// compute weight themselves leave it at zero.
#[derive(Debug, Clone)]
pub struct World {
    bodies: Vec<Body>,
    index: HashMap<BodyId, usize>,
    links: Vec<Link>,
    excluded: HashSet<(usize, usize)>,
    solver: SolverConfig,
    gravity: Gravity,
    time: f64,
    step_count: u64,
    next_constraint: u64,
    last_contact_pairs: Vec<(BodyId, BodyId)>,
}

impl Default for World {
    fn default() -> Self {
        Self::new(SolverConfig::default())
    }
}

impl World {
    /// Create an empty world.
    #[must_use]
    pub fn new(solver: SolverConfig) -> Self {
        Self {
            bodies: Vec::new(),
            index: HashMap::new(),
            links: Vec::new(),
            excluded: HashSet::new(),
            solver,
            gravity: Gravity::zero(),
            time: 0.0,
            step_count: 0,
            next_constraint: 0,
            last_contact_pairs: Vec::new(),
        }
    }

    /// Set gravity applied by the world to every dynamic body.
    #[must_use]
    pub fn with_gravity(mut self, gravity: Gravity) -> Self {
        self.gravity = gravity;
        self
    }

    /// Solver settings.
    #[must_use]
    pub fn solver(&self) -> &SolverConfig {
        &self.solver
    }

    /// Simulated time in seconds.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Number of completed steps.
    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Number of bodies.
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Number of links.
    #[must_use]
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Look up a body.
    pub fn body(&self, id: BodyId) -> Result<&Body> {
        self.body_index(id).map(|i| &self.bodies[i])
    }

    /// Iterate over bodies in creation order.
    pub fn bodies(&self) -> impl Iterator<Item = &Body> {
        self.bodies.iter()
    }

    /// Distance between the anchors of a link.
    pub fn link_gap(&self, id: ConstraintId) -> Result<f64> {
        self.links
            .iter()
            .find(|l| l.id == id)
            .map(|l| l.anchor_gap(&self.bodies))
            .ok_or(SimError::InvalidConstraintId(id.raw()))
    }

    /// Body pairs that touched during the last step, sorted by id.
    #[must_use]
    pub fn contact_pairs(&self) -> &[(BodyId, BodyId)] {
        &self.last_contact_pairs
    }

    /// Check whether two bodies are allowed to touch.
    pub fn can_collide(&self, a: BodyId, b: BodyId) -> Result<bool> {
        let i = self.body_index(a)?;
        let j = self.body_index(b)?;
        Ok(self.pair_allowed(i, j))
    }

    fn body_index(&self, id: BodyId) -> Result<usize> {
        self.index
            .get(&id)
            .copied()
            .ok_or(SimError::InvalidBodyId(id.raw()))
    }

    fn body_mut(&mut self, id: BodyId) -> Result<&mut Body> {
        let i = self.body_index(id)?;
        Ok(&mut self.bodies[i])
    }

    fn pair_allowed(&self, i: usize, j: usize) -> bool {
        let a = &self.bodies[i];
        let b = &self.bodies[j];
        i != j
            && !(a.is_static() && b.is_static())
            && a.filter.can_collide(&b.filter)
            && !self.excluded.contains(&(i.min(j), i.max(j)))
    }

    fn detect_contacts(&self) -> Vec<Contact> {
        let proxies: Vec<Proxy> = self.bodies.iter().map(Proxy::of).collect();
        let mut contacts = Vec::new();
        for i in 0..self.bodies.len() {
            for j in (i + 1)..self.bodies.len() {
                if self.pair_allowed(i, j) && proxies[i].may_touch(&proxies[j], BROAD_PHASE_MARGIN)
                {
                    collide(&self.bodies, i, j, &mut contacts);
                }
            }
        }
        contacts
    }

    fn substep(&mut self, h: f64, pairs: &mut Vec<(BodyId, BodyId)>) {
        let g = self.gravity.acceleration;
        for body in &mut self.bodies {
            body.predict(&g, h);
        }

        let mut contacts = if self.solver.enable_contacts {
            self.detect_contacts()
        } else {
            Vec::new()
        };

        for link in &mut self.links {
            link.reset_multipliers();
        }
        for _ in 0..self.solver.position_iterations {
            for link in &mut self.links {
                link.solve_position(&mut self.bodies, h);
            }
            for contact in &mut contacts {
                contact.solve_position(&mut self.bodies, self.solver.contact_tolerance, h);
            }
        }

        for body in &mut self.bodies {
            body.update_velocities(h);
        }

        for link in &self.links {
            link.solve_velocity(&mut self.bodies, h);
        }
        let rest_speed = 2.0 * h * g.norm() + 1e-6;
        for contact in &contacts {
            contact.solve_velocity(&mut self.bodies, rest_speed, h);
        }

        pairs.extend(
            contacts
                .iter()
                .map(|c| (self.bodies[c.body_a].id, self.bodies[c.body_b].id)),
        );
    }
}

impl DynamicsEngine for World {
    fn transform(&self, body: BodyId) -> Result<Pose> {
        self.body(body).map(Body::pose)
    }

    fn linear_velocity(&self, body: BodyId) -> Result<Vector3<f64>> {
        self.body(body).map(|b| b.linear_velocity)
    }

    fn angular_velocity(&self, body: BodyId) -> Result<Vector3<f64>> {
        self.body(body).map(|b| b.angular_velocity)
    }

    fn center_of_mass(&self, body: BodyId) -> Result<Point3<f64>> {
        self.body(body).map(Body::center_of_mass)
    }

    fn apply_force(&mut self, body: BodyId, force: Vector3<f64>, point: Point3<f64>) -> Result<()> {
        self.body_mut(body)?.add_force_at_point(force, point);
        Ok(())
    }

    fn apply_torque(&mut self, body: BodyId, torque: Vector3<f64>) -> Result<()> {
        self.body_mut(body)?.add_torque(torque);
        Ok(())
    }

    fn create_rigid_body(&mut self, desc: RigidBodyDesc) -> Result<BodyId> {
        desc.validate()?;
        if matches!(
            desc.shape,
            CollisionShape::Box { .. }
                | CollisionShape::Ellipsoid { .. }
                | CollisionShape::ConvexMesh { .. }
                | CollisionShape::Compound(_)
        ) {
            warn!(
                radius = desc.shape.bounding_radius(),
                "shape collides as its bounding sphere"
            );
        }

        let id = BodyId::new(self.bodies.len() as u64);
        self.index.insert(id, self.bodies.len());
        self.bodies.push(Body::from_desc(id, desc));
        debug!(%id, "created body");
        Ok(id)
    }

    fn create_constraint(&mut self, desc: LinkDesc) -> Result<ConstraintId> {
        desc.validate()?;
        let i = self.body_index(desc.body_a)?;
        let j = self.body_index(desc.body_b)?;

        let anchor_a = self.bodies[i].local_from_com(&desc.anchor_a);
        let anchor_b = self.bodies[j].local_from_com(&desc.anchor_b);
        let id = ConstraintId::new(self.next_constraint);
        self.next_constraint += 1;

        self.links.push(Link::new(
            id,
            (i, &self.bodies[i]),
            (j, &self.bodies[j]),
            anchor_a,
            anchor_b,
            desc.compliance,
        ));
        if desc.disable_collision {
            self.excluded.insert((i.min(j), i.max(j)));
        }
        debug!(%id, a = %desc.body_a, b = %desc.body_b, "created link");
        Ok(id)
    }

    fn set_collision_mask(&mut self, body: BodyId, filter: CollisionFilter) -> Result<()> {
        self.body_mut(body)?.filter = filter;
        Ok(())
    }

    fn step(&mut self, dt: f64) -> Result<()> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(SimError::InvalidTimestep(dt));
        }

        let h = dt / self.solver.substeps.max(1) as f64;
        let mut pairs = Vec::new();
        for _ in 0..self.solver.substeps.max(1) {
            self.substep(h, &mut pairs);
        }

        for body in &mut self.bodies {
            body.clear_forces();
        }
        for pair in &mut pairs {
            if pair.1 < pair.0 {
                *pair = (pair.1, pair.0);
            }
        }
        pairs.sort_unstable();
        pairs.dedup();
        self.last_contact_pairs = pairs;

        self.time += dt;
        self.step_count += 1;

        if let Some(body) = self.bodies.iter().find(|b| !b.is_finite()) {
            return Err(SimError::diverged(format!(
                "{} has non-finite state at t = {:.4}",
                body.id, self.time
            )));
        }
        Ok(())
    }
}
