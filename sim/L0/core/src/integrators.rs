//! Substep integration helpers.
//!
//! The world advances each substep with the position-based scheme:
//!
//! ```text
//! v  ← v + h · F/m
//! ω  ← ω + h · I⁻¹ (τ − ω × Iω)
//! x  ← x + h · v
//! q  ← normalize(q + h/2 · [ω, 0] q)
//!   ... project constraints on x, q ...
//! v  ← (x − x_prev) / h
//! ω  ← 2 · vec(q q_prev⁻¹) / h
//! ```

use nalgebra::{Matrix3, Point3, Quaternion, UnitQuaternion, Vector3};

/// Rotate `rotation` by the small world-frame rotation vector `delta`.
///
/// First-order update `q ← normalize(q + ½ [δ, 0] q)`. Exact for small
/// angles and cheap enough to call inside constraint projection.
pub fn apply_rotation_delta(rotation: &mut UnitQuaternion<f64>, delta: &Vector3<f64>) {
    if delta.norm_squared() == 0.0 {
        return;
    }
    let q = rotation.into_inner();
    let dq = Quaternion::from_parts(0.0, *delta) * q * 0.5;
    *rotation = UnitQuaternion::new_normalize(q + dq);
}

/// Integrate orientation over `h` with angular velocity `omega`.
pub fn integrate_rotation(rotation: &mut UnitQuaternion<f64>, omega: &Vector3<f64>, h: f64) {
    apply_rotation_delta(rotation, &(omega * h));
}

/// Angular velocity that takes `previous` to `current` over `h`.
#[must_use]
pub fn angular_velocity_between(
    previous: &UnitQuaternion<f64>,
    current: &UnitQuaternion<f64>,
    h: f64,
) -> Vector3<f64> {
    let dq = (current * previous.inverse()).into_inner();
    let omega = dq.imag() * (2.0 / h);
    if dq.w < 0.0 { -omega } else { omega }
}

/// Linear velocity that takes `previous` to `current` over `h`.
#[must_use]
pub fn linear_velocity_between(previous: &Point3<f64>, current: &Point3<f64>, h: f64) -> Vector3<f64> {
    (current - previous) / h
}

/// Angular velocity after one substep of free rotation under `torque`,
/// including the gyroscopic term.
#[must_use]
pub fn integrate_angular_velocity(
    omega: &Vector3<f64>,
    torque: &Vector3<f64>,
    inertia_world: &Matrix3<f64>,
    inverse_inertia_world: &Matrix3<f64>,
    h: f64,
) -> Vector3<f64> {
    let gyro = omega.cross(&(inertia_world * omega));
    omega + inverse_inertia_world * (torque - gyro) * h
}
