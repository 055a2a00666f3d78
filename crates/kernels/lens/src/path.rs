//! Key frames, path points and segment construction.
//!
//! A camera on the path is described by a radius and a rotation of the
//! base camera (sitting on `+y`, up `(0, 0, -1)`), plus an optional focus
//! point that replaces the origin as look-at target.

use vantage_foundation::vector_ops::{distance, lerp, sub};
use vantage_foundation::{ORIGIN, Quat, Vec3};
use vantage_runtime::viewpoint::{BASE_DIRECTION, BASE_UP};
use vantage_runtime::{Direction, Location};

use crate::interpolation::{KeyRotations, RotationInterpolator, smoothstep};

/// Samples used to estimate the arc length of a segment.
pub const ARC_LENGTH_SAMPLES: usize = 256;

/// Camera parameters at one point of the path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathPoint {
    pub radius: f64,
    pub rotation: Quat,
    pub focus: Option<Vec3>,
}

impl PathPoint {
    /// Camera position (the focus does not move the camera).
    pub fn position(&self) -> Vec3 {
        self.rotation.rotate([
            BASE_DIRECTION[0] * self.radius,
            BASE_DIRECTION[1] * self.radius,
            BASE_DIRECTION[2] * self.radius,
        ])
    }

    /// Location rendering this path point.
    ///
    /// With a focus point the up vector is turned by the rotation from the
    /// origin-facing view direction to the focused one.
    pub fn to_location(&self, direction: Direction) -> Location {
        let position = self.position();
        let up = self.rotation.rotate(BASE_UP);
        let (look_at, up) = match self.focus {
            Some(focus) => {
                let realign = Quat::rotation_between(sub(ORIGIN, position), sub(focus, position));
                (focus, realign.rotate(up))
            }
            None => (ORIGIN, up),
        };
        let mut location = Location::new(direction, position, up, look_at);
        location.rotation = self.rotation;
        location
    }
}

/// An evaluated, committed viewpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyFrame {
    /// Simulation step the key was evaluated on.
    pub step: u64,
    /// Index of the winning candidate location.
    pub location: usize,
    pub entropy: f64,
    pub point: PathPoint,
}

/// Path between key `start` and key `start + 1`.
pub struct SegmentCurve<'a> {
    keys: &'a [KeyFrame],
    rotations: &'a KeyRotations,
    interpolator: &'a dyn RotationInterpolator,
    start: usize,
}

impl<'a> SegmentCurve<'a> {
    /// Curve between `keys[start]` and `keys[start + 1]`; `None` when the
    /// end key is missing.
    pub fn new(
        keys: &'a [KeyFrame],
        rotations: &'a KeyRotations,
        interpolator: &'a dyn RotationInterpolator,
        start: usize,
    ) -> Option<Self> {
        if start + 1 >= keys.len() || start + 1 >= rotations.len() {
            return None;
        }
        Some(Self {
            keys,
            rotations,
            interpolator,
            start,
        })
    }

    /// Path point at `t ∈ [0, 1]`.
    pub fn at(&self, t: f64) -> PathPoint {
        let i = self.start as isize;
        let a = &self.keys[self.start];
        let b = &self.keys[self.start + 1];
        let rotation = match (
            self.rotations.clamped(i - 1),
            self.rotations.clamped(i),
            self.rotations.clamped(i + 1),
            self.rotations.clamped(i + 2),
        ) {
            (Some(q0), Some(q1), Some(q2), Some(q3)) => {
                self.interpolator.interpolate(q0, q1, q2, q3, t)
            }
            _ => a.point.rotation,
        };
        let focus = match (a.point.focus, b.point.focus) {
            (None, None) => None,
            (fa, fb) => Some(lerp(fa.unwrap_or(ORIGIN), fb.unwrap_or(ORIGIN), t)),
        };
        PathPoint {
            radius: smoothstep(a.point.radius, b.point.radius, t),
            rotation,
            focus,
        }
    }

    /// Length of the camera trajectory, summed over fixed samples.
    pub fn arc_length(&self) -> f64 {
        let mut previous = self.at(0.0).position();
        let mut length = 0.0;
        for k in 1..=ARC_LENGTH_SAMPLES {
            let p = self.at(k as f64 / ARC_LENGTH_SAMPLES as f64).position();
            length += distance(previous, p);
            previous = p;
        }
        length
    }
}

/// Frames rendered per cached step: `floor(l / (interval·delta)) + 1`.
pub fn frames_per_step(arc_length: f64, entropy_interval: u64, delta: f64) -> usize {
    let budget = entropy_interval as f64 * delta;
    if budget <= 0.0 || !arc_length.is_finite() {
        return 1;
    }
    (arc_length / budget).floor() as usize + 1
}

/// Interior points of a segment whose anchor and `cached` steps each get
/// `frames` frames; the anchor's key frame is already rendered.
pub fn interior_points(curve: &SegmentCurve<'_>, cached: usize, frames: usize) -> Vec<PathPoint> {
    let count = (frames * (cached + 1)).saturating_sub(1);
    (1..=count)
        .map(|j| curve.at(j as f64 / (count + 1) as f64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolation::{Slerp, Squad};
    use vantage_foundation::vector_ops::{approx_eq, dot, normalize};
    use vantage_runtime::viewpoint::orientation_for;

    fn key(step: u64, position: Vec3) -> KeyFrame {
        KeyFrame {
            step,
            location: 0,
            entropy: 1.0,
            point: PathPoint {
                radius: vantage_foundation::vector_ops::length(position),
                rotation: orientation_for(position),
                focus: None,
            },
        }
    }

    fn rotations(keys: &[KeyFrame]) -> KeyRotations {
        let mut r = KeyRotations::default();
        for k in keys {
            r.push(k.point.rotation);
        }
        r
    }

    #[test]
    fn test_point_reproduces_location() {
        let p = [3.0, -4.0, 12.0];
        let k = key(0, p);
        let loc = k.point.to_location(Direction::Uni);
        let facing = Location::facing_origin(Direction::Uni, p);
        assert!(approx_eq(
            loc.position.map(|v| (v * 1e9).round() / 1e9),
            p
        ));
        assert!(dot(loc.up_vector, facing.up_vector) > 1.0 - 1e-9);
        assert!(approx_eq(loc.look_at, ORIGIN));
    }

    #[test]
    fn test_focus_realigns_up() {
        let mut point = key(0, [0.0, 0.0, 10.0]).point;
        point.focus = Some([1.0, 0.0, 0.0]);
        let loc = point.to_location(Direction::Uni);
        let view = normalize(sub(loc.look_at, loc.position)).unwrap();
        assert!(dot(view, loc.up_vector).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_segment_has_zero_length() {
        let keys = [key(0, [0.0, 5.0, 5.0]), key(4, [0.0, 5.0, 5.0])];
        let rot = rotations(&keys);
        let curve = SegmentCurve::new(&keys, &rot, &Slerp, 0).unwrap();
        assert!(curve.arc_length() < 1e-9);
        assert_eq!(frames_per_step(curve.arc_length(), 4, 0.1), 1);
        assert_eq!(interior_points(&curve, 3, 1).len(), 3);
    }

    #[test]
    fn test_arc_length_of_quarter_circle() {
        let keys = [key(0, [0.0, 0.0, 10.0]), key(4, [10.0, 0.0, 0.0])];
        let rot = rotations(&keys);
        let curve = SegmentCurve::new(&keys, &rot, &Slerp, 0).unwrap();
        let expected = std::f64::consts::FRAC_PI_2 * 10.0;
        assert!((curve.arc_length() - expected).abs() < 1e-3);
        // 15.7 / (4 · 0.1) → 39 + 1
        assert_eq!(frames_per_step(curve.arc_length(), 4, 0.1), 40);
    }

    #[test]
    fn test_interior_point_count() {
        let keys = [key(0, [0.0, 0.0, 10.0]), key(4, [10.0, 0.0, 0.0])];
        let rot = rotations(&keys);
        let curve = SegmentCurve::new(&keys, &rot, &Squad, 0).unwrap();
        assert_eq!(interior_points(&curve, 3, 2).len(), 7);
        assert_eq!(interior_points(&curve, 0, 1).len(), 0);
        assert!(SegmentCurve::new(&keys, &rot, &Squad, 1).is_none());
    }

    #[test]
    fn test_radius_eases() {
        let keys = [key(0, [0.0, 0.0, 4.0]), key(4, [0.0, 0.0, 8.0])];
        let rot = rotations(&keys);
        let curve = SegmentCurve::new(&keys, &rot, &Slerp, 0).unwrap();
        assert!((curve.at(0.5).radius - 6.0).abs() < 1e-12);
        assert!(curve.at(0.1).radius - 4.0 < 0.4 * 0.1 * 4.0);
    }
}
