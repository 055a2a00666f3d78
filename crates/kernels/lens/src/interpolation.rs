//! Camera path interpolation.
//!
//! Rotations are interpolated by a [`RotationInterpolator`] strategy,
//! radii by smoothstep and focus points linearly. Key rotations are stored
//! through [`KeyRotations::push`] so consecutive keys always lie in the
//! same hemisphere and interpolation never takes the long way round.

use serde::{Deserialize, Serialize};

use vantage_foundation::Quat;

/// Quaternion interpolation between two key rotations.
pub trait RotationInterpolator: Send + Sync {
    /// Keys needed after the segment end before the segment can be built.
    fn lookahead(&self) -> usize;

    /// Rotation at `t ∈ [0, 1]` between `q1` and `q2`.
    ///
    /// `q0` precedes `q1` and `q3` follows `q2`; at the ends of the key
    /// sequence callers pass the nearest existing key instead.
    fn interpolate(&self, q0: &Quat, q1: &Quat, q2: &Quat, q3: &Quat, t: f64) -> Quat;
}

/// Spherical linear interpolation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Slerp;

impl RotationInterpolator for Slerp {
    fn lookahead(&self) -> usize {
        0
    }

    fn interpolate(&self, _q0: &Quat, q1: &Quat, q2: &Quat, _q3: &Quat, t: f64) -> Quat {
        Quat::slerp(q1, q2, t)
    }
}

/// Spherical quadrangle interpolation (C¹ across keys).
#[derive(Debug, Clone, Copy, Default)]
pub struct Squad;

impl RotationInterpolator for Squad {
    fn lookahead(&self) -> usize {
        1
    }

    fn interpolate(&self, q0: &Quat, q1: &Quat, q2: &Quat, q3: &Quat, t: f64) -> Quat {
        let a = Quat::squad_control(q0, q1, q2);
        let b = Quat::squad_control(q1, q2, q3);
        Quat::squad(q1, q2, &a, &b, t)
    }
}

/// Interpolator selection in run documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InterpolatorKind {
    #[default]
    Slerp,
    Squad,
}

impl InterpolatorKind {
    pub fn build(self) -> Box<dyn RotationInterpolator> {
        match self {
            InterpolatorKind::Slerp => Box::new(Slerp),
            InterpolatorKind::Squad => Box::new(Squad),
        }
    }
}

/// Key rotations with hemisphere continuity.
#[derive(Debug, Clone, Default)]
pub struct KeyRotations {
    keys: Vec<Quat>,
}

impl KeyRotations {
    /// Store `q`, flipped to `-q` if it opposes the previous key.
    pub fn push(&mut self, q: Quat) -> Quat {
        let q = match self.keys.last() {
            Some(last) => q.aligned_with(last),
            None => q,
        };
        self.keys.push(q);
        q
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn get(&self, i: usize) -> Option<&Quat> {
        self.keys.get(i)
    }

    /// Key `i`, clamped to the stored range.
    pub fn clamped(&self, i: isize) -> Option<&Quat> {
        let last = self.keys.len().checked_sub(1)?;
        self.keys.get(i.clamp(0, last as isize) as usize)
    }

    pub fn as_slice(&self) -> &[Quat] {
        &self.keys
    }
}

/// Smoothstep blend `(b − a)·t²(3 − 2t) + a`.
pub fn smoothstep(a: f64, b: f64, t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    (b - a) * t * t * (3.0 - 2.0 * t) + a
}
