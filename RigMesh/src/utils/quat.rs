//! Quaternion helpers for orientations stored as xyz triples.
//!
//! Both text formats store only the x, y and z components of a unit
//! quaternion; w is recovered as `sqrt(max(0, 1 - x² - y² - z²))`.

use glam::{Quat, Vec3};

/// Build a unit quaternion from its stored xyz components.
///
/// A negative radicand comes from rounding drift in the text round trip and
/// is clamped to zero. In that case the xyz part alone has length above one,
/// so the result is renormalized to keep `x² + y² + z² + w² = 1`.
#[must_use]
pub fn quat_from_xyz(x: f32, y: f32, z: f32) -> Quat {
    let radicand = 1.0 - x * x - y * y - z * z;
    if radicand < 0.0 {
        tracing::trace!(radicand, "clamped quaternion w radicand");
        return Quat::from_xyzw(x, y, z, 0.0).normalize();
    }
    Quat::from_xyzw(x, y, z, radicand.sqrt())
}

/// Rotate `v` by the unit quaternion `q`.
#[inline]
#[must_use]
pub fn rotate(q: Quat, v: Vec3) -> Vec3 {
    q * v
}

/// Rotate `v` by the inverse of the unit quaternion `q`.
#[inline]
#[must_use]
pub fn inverse_rotate(q: Quat, v: Vec3) -> Vec3 {
    q.conjugate() * v
}
