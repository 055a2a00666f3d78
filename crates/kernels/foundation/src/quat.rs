//! Quaternion operations.
//!
//! Quaternions are stored as `[w, x, y, z]`. Camera orientations are unit
//! quaternions; every constructor here normalizes its output so callers
//! never need to.

use std::ops::{Mul, Neg};

use serde::{Deserialize, Serialize};

use crate::vector_ops::{any_orthogonal, cross, dot, normalize};
use crate::{EPSILON, Vec3};

/// Quaternion `w + xi + yj + zk`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat(pub [f64; 4]);

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    /// Identity rotation.
    pub const IDENTITY: Quat = Quat([1.0, 0.0, 0.0, 0.0]);

    /// Construct a quaternion: `Quat::new(w, x, y, z)`
    pub const fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Quat([w, x, y, z])
    }

    /// Scalar part.
    pub fn w(&self) -> f64 {
        self.0[0]
    }

    /// Vector part.
    pub fn vector(&self) -> Vec3 {
        [self.0[1], self.0[2], self.0[3]]
    }

    /// Rotation of `angle` radians about `axis`.
    ///
    /// A zero axis yields the identity.
    pub fn from_axis_angle(axis: Vec3, angle: f64) -> Self {
        match normalize(axis) {
            Some([x, y, z]) => {
                let half = angle * 0.5;
                let s = half.sin();
                Quat([half.cos(), x * s, y * s, z * s])
            }
            None => Self::IDENTITY,
        }
    }

    /// Shortest-arc rotation taking direction `from` onto direction `to`.
    ///
    /// Opposite directions rotate half a turn about an arbitrary
    /// perpendicular axis; a zero input yields the identity.
    pub fn rotation_between(from: Vec3, to: Vec3) -> Self {
        let (Some(a), Some(b)) = (normalize(from), normalize(to)) else {
            return Self::IDENTITY;
        };
        let d = dot(a, b);
        if d >= 1.0 - EPSILON {
            return Self::IDENTITY;
        }
        if d <= -1.0 + EPSILON {
            return Self::from_axis_angle(any_orthogonal(a), std::f64::consts::PI);
        }
        let [x, y, z] = cross(a, b);
        Quat([1.0 + d, x, y, z]).normalize()
    }

    /// Four-dimensional dot product.
    pub fn dot(&self, other: &Quat) -> f64 {
        self.0.iter().zip(other.0.iter()).map(|(a, b)| a * b).sum()
    }

    /// Quaternion norm (magnitude).
    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Unit quaternion in the same direction; the zero quaternion maps to identity.
    pub fn normalize(&self) -> Quat {
        let mag = self.norm();
        if mag <= EPSILON {
            return Self::IDENTITY;
        }
        let [w, x, y, z] = self.0;
        Quat([w / mag, x / mag, y / mag, z / mag])
    }

    /// Conjugate `w - xi - yj - zk`.
    pub fn conjugate(&self) -> Quat {
        let [w, x, y, z] = self.0;
        Quat([w, -x, -y, -z])
    }

    /// Multiplicative inverse; the zero quaternion maps to identity.
    pub fn inverse(&self) -> Quat {
        let n2 = self.dot(self);
        if n2 <= EPSILON {
            return Self::IDENTITY;
        }
        let [w, x, y, z] = self.conjugate().0;
        Quat([w / n2, x / n2, y / n2, z / n2])
    }

    /// `self` or `-self`, whichever lies in the same hemisphere as `reference`.
    pub fn aligned_with(&self, reference: &Quat) -> Quat {
        if self.dot(reference) < 0.0 { -*self } else { *self }
    }

    /// Rotate a vector by this quaternion.
    pub fn rotate(&self, v: Vec3) -> Vec3 {
        let [qw, qx, qy, qz] = self.0;
        let [vx, vy, vz] = v;

        let ix = qw * vx + qy * vz - qz * vy;
        let iy = qw * vy + qz * vx - qx * vz;
        let iz = qw * vz + qx * vy - qy * vx;
        let iw = -qx * vx - qy * vy - qz * vz;

        [
            ix * qw + iw * -qx + iy * -qz - iz * -qy,
            iy * qw + iw * -qy + iz * -qx - ix * -qz,
            iz * qw + iw * -qz + ix * -qy - iy * -qx,
        ]
    }

    /// Natural logarithm of a unit quaternion (pure quaternion result).
    pub fn ln(&self) -> Quat {
        let v = self.vector();
        let s = dot(v, v).sqrt();
        if s <= EPSILON {
            return Quat([0.0, 0.0, 0.0, 0.0]);
        }
        let theta = s.atan2(self.w());
        let k = theta / s;
        Quat([0.0, v[0] * k, v[1] * k, v[2] * k])
    }

    /// Exponential of a pure quaternion.
    pub fn exp(&self) -> Quat {
        let v = self.vector();
        let theta = dot(v, v).sqrt();
        if theta <= EPSILON {
            return Self::IDENTITY;
        }
        let k = theta.sin() / theta;
        Quat([theta.cos(), v[0] * k, v[1] * k, v[2] * k])
    }

    /// Spherical linear interpolation along the shortest arc.
    pub fn slerp(a: &Quat, b: &Quat, t: f64) -> Quat {
        Self::slerp_raw(a, &b.aligned_with(a), t)
    }

    /// Spherical linear interpolation without hemisphere correction.
    ///
    /// SQUAD relies on this variant for its inner blends.
    pub fn slerp_raw(a: &Quat, b: &Quat, t: f64) -> Quat {
        let d = a.dot(b).clamp(-1.0, 1.0);
        if d.abs() > 1.0 - 1e-6 {
            return Self::nlerp(a, b, t);
        }
        let theta = d.acos();
        let sin_theta = theta.sin();
        let wa = ((1.0 - t) * theta).sin() / sin_theta;
        let wb = (t * theta).sin() / sin_theta;
        let mut out = [0.0; 4];
        for (i, o) in out.iter_mut().enumerate() {
            *o = wa * a.0[i] + wb * b.0[i];
        }
        Quat(out).normalize()
    }

    fn nlerp(a: &Quat, b: &Quat, t: f64) -> Quat {
        let mut out = [0.0; 4];
        for (i, o) in out.iter_mut().enumerate() {
            *o = (1.0 - t) * a.0[i] + t * b.0[i];
        }
        Quat(out).normalize()
    }

    /// SQUAD control point for `cur` given its neighbours.
    pub fn squad_control(prev: &Quat, cur: &Quat, next: &Quat) -> Quat {
        let inv = cur.inverse();
        let a = (inv * *next).ln();
        let b = (inv * *prev).ln();
        let mut sum = [0.0; 4];
        for (i, s) in sum.iter_mut().enumerate() {
            *s = -(a.0[i] + b.0[i]) * 0.25;
        }
        (*cur * Quat(sum).exp()).normalize()
    }

    /// Spherical quadrangle interpolation between `q1` and `q2` with
    /// control points `a` and `b`.
    pub fn squad(q1: &Quat, q2: &Quat, a: &Quat, b: &Quat, t: f64) -> Quat {
        let outer = Self::slerp_raw(q1, q2, t);
        let inner = Self::slerp_raw(a, b, t);
        Self::slerp_raw(&outer, &inner, 2.0 * t * (1.0 - t))
    }
}

impl Mul for Quat {
    type Output = Quat;

    fn mul(self, b: Quat) -> Quat {
        let [aw, ax, ay, az] = self.0;
        let [bw, bx, by, bz] = b.0;
        Quat([
            aw * bw - ax * bx - ay * by - az * bz,
            aw * bx + ax * bw + ay * bz - az * by,
            aw * by - ax * bz + ay * bw + az * bx,
            aw * bz + ax * by - ay * bx + az * bw,
        ])
    }
}

impl Neg for Quat {
    type Output = Quat;

    fn neg(self) -> Quat {
        let [w, x, y, z] = self.0;
        Quat([-w, -x, -y, -z])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_ops::{approx_eq, length};
    use std::f64::consts::{FRAC_PI_2, PI};

    fn quat_approx(a: Quat, b: Quat) -> bool {
        (a.dot(&b).abs() - 1.0).abs() < 1e-9
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let q = Quat::from_axis_angle([0.0, 0.0, 1.0], FRAC_PI_2);
        assert!(approx_eq(q.rotate([1.0, 0.0, 0.0]), [0.0, 1.0, 0.0]));
    }

    #[test]
    fn test_rotation_between() {
        let cases = [
            ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 12.0, 0.0], [3.0, -4.0, 5.0]),
            ([0.0, 1.0, 0.0], [0.0, -2.0, 0.0]),
            ([1.0, 1.0, 1.0], [1.0, 1.0, 1.0]),
        ];
        for (from, to) in cases {
            let q = Quat::rotation_between(from, to);
            let r = q.rotate(normalize(from).unwrap());
            assert!(approx_eq(r, normalize(to).unwrap()), "{from:?} -> {to:?}");
        }
    }

    #[test]
    fn test_slerp_endpoints_and_midpoint() {
        let a = Quat::IDENTITY;
        let b = Quat::from_axis_angle([0.0, 1.0, 0.0], FRAC_PI_2);
        assert!(quat_approx(Quat::slerp(&a, &b, 0.0), a));
        assert!(quat_approx(Quat::slerp(&a, &b, 1.0), b));
        let mid = Quat::slerp(&a, &b, 0.5);
        assert!(quat_approx(mid, Quat::from_axis_angle([0.0, 1.0, 0.0], FRAC_PI_2 / 2.0)));
    }

    #[test]
    fn test_slerp_takes_short_arc() {
        let a = Quat::IDENTITY;
        let b = -Quat::from_axis_angle([1.0, 0.0, 0.0], 0.2);
        let mid = Quat::slerp(&a, &b, 0.5);
        assert!(quat_approx(mid, Quat::from_axis_angle([1.0, 0.0, 0.0], 0.1)));
    }

    #[test]
    fn test_ln_exp_inverse() {
        let q = Quat::from_axis_angle([1.0, 2.0, 3.0], 1.1);
        assert!(quat_approx(q.ln().exp(), q));
    }

    #[test]
    fn test_squad_endpoints() {
        let qs: Vec<Quat> = (0..4)
            .map(|i| Quat::from_axis_angle([0.0, 1.0, 0.0], i as f64 * PI / 6.0))
            .collect();
        let a = Quat::squad_control(&qs[0], &qs[1], &qs[2]);
        let b = Quat::squad_control(&qs[1], &qs[2], &qs[3]);
        assert!(quat_approx(Quat::squad(&qs[1], &qs[2], &a, &b, 0.0), qs[1]));
        assert!(quat_approx(Quat::squad(&qs[1], &qs[2], &a, &b, 1.0), qs[2]));
        let mid = Quat::squad(&qs[1], &qs[2], &a, &b, 0.5);
        assert!((mid.norm() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_rotation_preserves_length() {
        let q = Quat::from_axis_angle([0.3, -0.2, 0.9], 2.4);
        let v = [1.0, -7.0, 2.5];
        assert!((length(q.rotate(v)) - length(v)).abs() < 1e-9);
    }

    #[test]
    fn test_zero_inputs_yield_identity() {
        assert_eq!(Quat::from_axis_angle([0.0; 3], 1.0), Quat::IDENTITY);
        assert_eq!(Quat([0.0; 4]).normalize(), Quat::IDENTITY);
        assert_eq!(Quat::rotation_between([0.0; 3], [1.0, 0.0, 0.0]), Quat::IDENTITY);
    }
}
