//! Compliant links between bodies.
//!
//! Links are solved with XPBD. Each substep the Lagrange multipliers are reset
//! and every link projects two constraints:
//!
//! - **Point**: the world anchors coincide. Error `Δx = p_a − p_b`.
//! - **Orientation** (optional): the relative rotation stays at its value at
//!   creation. Error `q_err = q_a q_rest q_b⁻¹`, `Δφ = 2 vec(q_err)`.
//!
//! Both use the generalized inverse mass of each body along the correction
//! direction:
//!
//! ```text
//! w   = 1/m + (r × n)ᵀ I⁻¹ (r × n)        (point)
//! w   = nᵀ I⁻¹ n                           (orientation)
//! α̃   = α / h²
//! Δλ  = (−c − α̃ λ) / (w_a + w_b + α̃)
//! ```

use nalgebra::{UnitQuaternion, Vector3};
use sim_types::{ConstraintId, LinkCompliance};

use crate::body::Body;

const MIN_CORRECTION: f64 = 1e-12;

/// A link stored by the world.
#[derive(Debug, Clone)]
pub struct Link {
    /// Unique identifier.
    pub id: ConstraintId,
    /// Index of the first body.
    pub(crate) body_a: usize,
    /// Index of the second body.
    pub(crate) body_b: usize,
    /// Anchor offset from the first body's COM, in its frame.
    pub(crate) anchor_a: Vector3<f64>,
    /// Anchor offset from the second body's COM, in its frame.
    pub(crate) anchor_b: Vector3<f64>,
    /// Compliance and damping.
    pub compliance: LinkCompliance,
    /// `q_a⁻¹ q_b` at creation.
    pub(crate) rest_rotation: UnitQuaternion<f64>,
    lambda_position: f64,
    lambda_rotation: f64,
}

impl Link {
    pub(crate) fn new(
        id: ConstraintId,
        (body_a, a): (usize, &Body),
        (body_b, b): (usize, &Body),
        anchor_a: Vector3<f64>,
        anchor_b: Vector3<f64>,
        compliance: LinkCompliance,
    ) -> Self {
        Self {
            id,
            body_a,
            body_b,
            anchor_a,
            anchor_b,
            compliance,
            rest_rotation: a.rotation.inverse() * b.rotation,
            lambda_position: 0.0,
            lambda_rotation: 0.0,
        }
    }

    pub(crate) fn reset_multipliers(&mut self) {
        self.lambda_position = 0.0;
        self.lambda_rotation = 0.0;
    }

    /// World distance between the two anchors.
    #[must_use]
    pub fn anchor_gap(&self, bodies: &[Body]) -> f64 {
        let a = &bodies[self.body_a];
        let b = &bodies[self.body_b];
        let pa = a.com + a.world_offset(&self.anchor_a);
        let pb = b.com + b.world_offset(&self.anchor_b);
        (pa - pb).norm()
    }

    /// Project the link constraints on the current poses.
    pub(crate) fn solve_position(&mut self, bodies: &mut [Body], h: f64) {
        let (a, b) = pair_mut(bodies, self.body_a, self.body_b);

        let ra = a.world_offset(&self.anchor_a);
        let rb = b.world_offset(&self.anchor_b);
        let delta = (a.com + ra) - (b.com + rb);
        positional_correction(
            a,
            b,
            &ra,
            &rb,
            &delta,
            self.compliance.linear,
            &mut self.lambda_position,
            h,
        );

        if let Some(compliance) = self.compliance.angular {
            let q_err = (a.rotation * self.rest_rotation * b.rotation.inverse()).into_inner();
            let mut dphi = q_err.imag() * 2.0;
            if q_err.w < 0.0 {
                dphi = -dphi;
            }
            angular_correction(a, b, &dphi, compliance, &mut self.lambda_rotation, h);
        }
    }

    /// Damp relative motion at the anchors.
    pub(crate) fn solve_velocity(&self, bodies: &mut [Body], h: f64) {
        let (a, b) = pair_mut(bodies, self.body_a, self.body_b);

        if self.compliance.linear_damping > 0.0 {
            let ra = a.world_offset(&self.anchor_a);
            let rb = b.world_offset(&self.anchor_b);
            let dv = (b.velocity_at(&rb) - a.velocity_at(&ra))
                * (self.compliance.linear_damping * h).min(1.0);
            velocity_correction(a, b, &ra, &rb, &dv);
        }

        if self.compliance.angular_damping > 0.0 {
            let dw = (b.angular_velocity - a.angular_velocity)
                * (self.compliance.angular_damping * h).min(1.0);
            let norm = dw.norm();
            if norm > MIN_CORRECTION {
                let n = dw / norm;
                let w = a.angular_inverse_mass(&n) + b.angular_inverse_mass(&n);
                if w > 0.0 {
                    let p = n * (norm / w);
                    a.apply_angular_velocity_impulse(&p);
                    b.apply_angular_velocity_impulse(&-p);
                }
            }
        }
    }
}

/// Mutable references to two distinct bodies.
pub(crate) fn pair_mut(bodies: &mut [Body], i: usize, j: usize) -> (&mut Body, &mut Body) {
    debug_assert_ne!(i, j);
    if i < j {
        let (lo, hi) = bodies.split_at_mut(j);
        (&mut lo[i], &mut hi[0])
    } else {
        let (lo, hi) = bodies.split_at_mut(i);
        (&mut hi[0], &mut lo[j])
    }
}

/// Remove the positional error `delta = p_a − p_b` between two body points at
/// world offsets `ra`, `rb`. Returns the multiplier increment.
#[allow(clippy::too_many_arguments)]
pub(crate) fn positional_correction(
    a: &mut Body,
    b: &mut Body,
    ra: &Vector3<f64>,
    rb: &Vector3<f64>,
    delta: &Vector3<f64>,
    compliance: f64,
    lambda: &mut f64,
    h: f64,
) -> f64 {
    let c = delta.norm();
    if c < MIN_CORRECTION {
        return 0.0;
    }
    let n = delta / c;
    let w = a.generalized_inverse_mass(ra, &n) + b.generalized_inverse_mass(rb, &n);
    if w <= 0.0 {
        return 0.0;
    }

    let alpha_tilde = compliance / (h * h);
    let delta_lambda = alpha_tilde.mul_add(-*lambda, -c) / (w + alpha_tilde);
    *lambda += delta_lambda;

    let p = n * delta_lambda;
    a.apply_positional_impulse(&p, ra);
    b.apply_positional_impulse(&-p, rb);
    delta_lambda
}

/// Remove the rotational error `dphi` (excess rotation of `a` relative to `b`).
pub(crate) fn angular_correction(
    a: &mut Body,
    b: &mut Body,
    dphi: &Vector3<f64>,
    compliance: f64,
    lambda: &mut f64,
    h: f64,
) -> f64 {
    let theta = dphi.norm();
    if theta < MIN_CORRECTION {
        return 0.0;
    }
    let n = dphi / theta;
    let w = a.angular_inverse_mass(&n) + b.angular_inverse_mass(&n);
    if w <= 0.0 {
        return 0.0;
    }

    let alpha_tilde = compliance / (h * h);
    let delta_lambda = alpha_tilde.mul_add(-*lambda, -theta) / (w + alpha_tilde);
    *lambda += delta_lambda;

    let p = n * delta_lambda;
    a.apply_angular_impulse(&p);
    b.apply_angular_impulse(&-p);
    delta_lambda
}

/// Change the relative velocity of `a`'s point with respect to `b`'s point by
/// `dv`.
pub(crate) fn velocity_correction(
    a: &mut Body,
    b: &mut Body,
    ra: &Vector3<f64>,
    rb: &Vector3<f64>,
    dv: &Vector3<f64>,
) {
    let norm = dv.norm();
    if norm < MIN_CORRECTION {
        return;
    }
    let n = dv / norm;
    let w = a.generalized_inverse_mass(ra, &n) + b.generalized_inverse_mass(rb, &n);
    if w <= 0.0 {
        return;
    }
    let p = n * (norm / w);
    a.apply_velocity_impulse(&p, ra);
    b.apply_velocity_impulse(&-p, rb);
}
