//! Vector Operations (Shared Implementation)
//!
//! Low-level 3-vector operations used by the viewpoint generators, the
//! adaptor camera logic and path interpolation.

use crate::{EPSILON, Vec3};

/// Component-wise sum.
#[inline]
pub fn add(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

/// Component-wise difference `a - b`.
#[inline]
pub fn sub(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// Scale a vector by a scalar.
#[inline]
pub fn scale(a: Vec3, s: f64) -> Vec3 {
    [a[0] * s, a[1] * s, a[2] * s]
}

/// Dot product.
#[inline]
pub fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Cross product.
#[inline]
pub fn cross(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// Euclidean length.
#[inline]
pub fn length(a: Vec3) -> f64 {
    dot(a, a).sqrt()
}

/// Squared distance between two 3D vectors.
#[inline]
pub fn distance_sq(a: Vec3, b: Vec3) -> f64 {
    let d = sub(a, b);
    dot(d, d)
}

/// Euclidean distance between two 3D vectors.
#[inline]
pub fn distance(a: Vec3, b: Vec3) -> f64 {
    distance_sq(a, b).sqrt()
}

/// Unit vector in the direction of `a`, or `None` for a zero vector.
#[inline]
pub fn normalize(a: Vec3) -> Option<Vec3> {
    let len = length(a);
    if len <= EPSILON {
        None
    } else {
        Some(scale(a, 1.0 / len))
    }
}

/// Linear interpolation `(1 - t) a + t b`.
#[inline]
pub fn lerp(a: Vec3, b: Vec3, t: f64) -> Vec3 {
    add(scale(a, 1.0 - t), scale(b, t))
}

/// True when all components differ by no more than [`EPSILON`].
#[inline]
pub fn approx_eq(a: Vec3, b: Vec3) -> bool {
    (0..3).all(|i| (a[i] - b[i]).abs() <= EPSILON)
}

/// Any unit vector perpendicular to `a`.
///
/// Picks the coordinate axis least aligned with `a` and crosses against it.
pub fn any_orthogonal(a: Vec3) -> Vec3 {
    let [x, y, z] = [a[0].abs(), a[1].abs(), a[2].abs()];
    let axis = if x <= y && x <= z {
        [1.0, 0.0, 0.0]
    } else if y <= z {
        [0.0, 1.0, 0.0]
    } else {
        [0.0, 0.0, 1.0]
    };
    normalize(cross(a, axis)).unwrap_or([1.0, 0.0, 0.0])
}
