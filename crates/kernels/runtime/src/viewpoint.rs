//! Camera locations and viewpoint sets.
//!
//! A [`Viewpoint`] is an ordered, insertion-stable list of [`Location`]s.
//! Generators ([`cubic`], [`spherical`], [`polyhedron`]) populate one
//! procedurally; afterwards consumers treat it as an immutable snapshot.
//!
//! Every generated location looks toward the origin. Its orientation is
//! expressed as the rotation taking the base camera (sitting on `+y`,
//! up vector `(0, 0, -1)`) to the generated position, so that the same
//! quaternion drives both the location and camera path interpolation.

pub mod cubic;
pub mod polyhedron;
pub mod spherical;

pub use cubic::CubicGrid;
pub use polyhedron::{PolyhedronGrid, RegularPolyhedron};
pub use spherical::SphericalGrid;

use serde::{Deserialize, Serialize};

use vantage_foundation::vector_ops::approx_eq;
use vantage_foundation::{ORIGIN, Quat, Vec3};

use crate::error::{Error, Result};

/// Direction of the base camera before orientation.
pub const BASE_DIRECTION: Vec3 = [0.0, 1.0, 0.0];

/// Up vector of the base camera before orientation.
pub const BASE_UP: Vec3 = [0.0, 0.0, -1.0];

/// How a location is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    /// Render once toward `look_at`.
    #[default]
    Uni,
    /// Render a full cubemap and stitch it into a panorama.
    Omni,
    /// `Omni` when inside the scene bounds, `Uni` otherwise.
    Adaptive,
}

/// One camera location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    /// Identity within the owning viewpoint.
    pub index: usize,
    pub direction: Direction,
    pub position: Vec3,
    pub up_vector: Vec3,
    pub look_at: Vec3,
    /// Rotation from the base camera to this location.
    pub rotation: Quat,
}

impl Location {
    /// Marker for a location whose index is assigned on insertion.
    pub const UNASSIGNED: usize = usize::MAX;

    /// Location with an explicit up vector and no rotation.
    pub fn new(direction: Direction, position: Vec3, up_vector: Vec3, look_at: Vec3) -> Self {
        Self {
            index: Self::UNASSIGNED,
            direction,
            position,
            up_vector,
            look_at,
            rotation: Quat::IDENTITY,
        }
    }

    /// Location at `position` looking at the origin, oriented from the base camera.
    pub fn facing_origin(direction: Direction, position: Vec3) -> Self {
        let rotation = orientation_for(position);
        Self {
            index: Self::UNASSIGNED,
            direction,
            position,
            up_vector: rotation.rotate(BASE_UP),
            look_at: ORIGIN,
            rotation,
        }
    }

    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// Distance from the look-at point.
    pub fn radius(&self) -> f64 {
        vantage_foundation::vector_ops::distance(self.position, self.look_at)
    }

    /// True when the camera would sit on its own target.
    pub fn is_degenerate(&self) -> bool {
        approx_eq(self.position, self.look_at)
    }
}

/// Rotation from the base camera to a camera at `position`.
///
/// Aligns `+y` with the position, then pre-rotates about `y` by the
/// azimuth so the up vector stays level around the equator.
pub fn orientation_for(position: Vec3) -> Quat {
    let phi = position[0].atan2(position[2]);
    let q_phi = Quat::from_axis_angle(BASE_DIRECTION, phi);
    let q_theta = Quat::rotation_between(BASE_DIRECTION, position);
    (q_theta * q_phi).normalize()
}

/// Ordered set of locations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Viewpoint {
    locations: Vec<Location>,
}

impl Viewpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single location looking at `look_at`.
    pub fn single(direction: Direction, position: Vec3, up_vector: Vec3, look_at: Vec3) -> Self {
        Self {
            locations: vec![Location::new(direction, position, up_vector, look_at).with_index(0)],
        }
    }

    /// Append a location, assigning the next free index if unset.
    ///
    /// Returns the index the location was stored under.
    pub fn add(&mut self, mut location: Location) -> Result<usize> {
        if location.index == Location::UNASSIGNED {
            location.index = self.next_index();
        } else if self.locations.iter().any(|l| l.index == location.index) {
            return Err(Error::DuplicateIndex(location.index));
        }
        let index = location.index;
        self.locations.push(location);
        Ok(index)
    }

    fn next_index(&self) -> usize {
        self.locations
            .iter()
            .map(|l| l.index + 1)
            .max()
            .unwrap_or(0)
    }

    /// Location at position `i` in insertion order.
    pub fn at(&self, i: usize) -> Option<&Location> {
        self.locations.get(i)
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn clear(&mut self) {
        self.locations.clear();
    }
}

/// Procedural viewpoint generator, as named in run configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ViewpointGenerator {
    /// One fixed camera.
    #[serde(rename_all = "camelCase")]
    Single {
        position: Vec3,
        #[serde(default = "default_up")]
        up_vector: Vec3,
        #[serde(default)]
        look_at: Vec3,
    },
    Cubic(CubicGrid),
    Spherical(SphericalGrid),
    Polyhedron(PolyhedronGrid),
}

fn default_up() -> Vec3 {
    [0.0, 1.0, 0.0]
}

impl Default for ViewpointGenerator {
    fn default() -> Self {
        ViewpointGenerator::Polyhedron(PolyhedronGrid::default())
    }
}

impl ViewpointGenerator {
    /// Populate a viewpoint with every location rendered as `direction`.
    pub fn generate(&self, direction: Direction) -> Result<Viewpoint> {
        match self {
            ViewpointGenerator::Single {
                position,
                up_vector,
                look_at,
            } => Ok(Viewpoint::single(direction, *position, *up_vector, *look_at)),
            ViewpointGenerator::Cubic(grid) => grid.generate(direction),
            ViewpointGenerator::Spherical(grid) => grid.generate(direction),
            ViewpointGenerator::Polyhedron(grid) => grid.generate(direction),
        }
    }
}
