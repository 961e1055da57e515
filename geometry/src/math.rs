// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared vector math helpers.
//!
//! Everything here operates on [`nalgebra`] points and vectors; the helpers
//! exist for the few places where plain `normalize()` or a naive projection
//! would propagate NaNs into downstream basis computations.

use nalgebra::{Point3, Vector3};

/// Lengths below this are treated as zero when normalizing.
pub const NORMALIZE_EPSILON: f64 = 1e-12;

/// Quantization grain for hashing point coordinates.
const POINT_KEY_GRAIN: f64 = 1e-9;

/// Normalize a vector, returning the zero vector when its length is below
/// [`NORMALIZE_EPSILON`]. Callers that need a usable axis must supply their
/// own fallback.
#[inline]
pub fn normalize_or_zero(v: Vector3<f64>) -> Vector3<f64> {
    let len = v.norm();
    if len < NORMALIZE_EPSILON {
        Vector3::zeros()
    } else {
        v / len
    }
}

/// Distance from `p` to the segment `a`-`b`.
///
/// The projection parameter is clamped to `[0, 1]`, so points beyond the
/// segment ends measure against the nearest endpoint. Degenerate segments
/// (squared length below [`NORMALIZE_EPSILON`]) measure against `a`.
#[inline]
pub fn perpendicular_distance(p: &Point3<f64>, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < NORMALIZE_EPSILON {
        return (p - a).norm();
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    let projected = a + ab * t;
    (p - projected).norm()
}

/// Build an orthonormal in-plane basis `(u, v)` for a plane with the given
/// normal.
///
/// The reference axis is `(0, 0, 1)` unless the normal is nearly vertical
/// (`|n.z| >= 0.9`), in which case `(1, 0, 0)` is used. A degenerate normal
/// falls back to the canonical Z axis, so a valid basis always comes back.
/// For `normal = +Z` the result is exactly `u = +X`, `v = +Y`.
pub fn plane_basis(normal: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let mut n = normalize_or_zero(*normal);
    if n == Vector3::zeros() {
        n = Vector3::z();
    }
    let reference = if n.z.abs() < 0.9 {
        Vector3::z()
    } else {
        Vector3::x()
    };
    // Project the reference into the plane: u = (n x ref) x n.
    let u = normalize_or_zero(n.cross(&reference).cross(&n));
    let v = normalize_or_zero(n.cross(&u));
    (u, v)
}

/// Canonical integer key for a point, for use in hash maps and sets.
///
/// Coordinates are quantized to a 1e-9 grain so that bit-level float noise
/// does not split logically identical points into distinct keys. Raw float
/// coordinates are never hashed.
#[inline]
pub fn point_key(p: &Point3<f64>) -> (i64, i64, i64) {
    (
        (p.x / POINT_KEY_GRAIN).round() as i64,
        (p.y / POINT_KEY_GRAIN).round() as i64,
        (p.z / POINT_KEY_GRAIN).round() as i64,
    )
}
