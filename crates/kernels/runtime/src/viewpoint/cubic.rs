//! Cubic lattice of camera locations.

use serde::{Deserialize, Serialize};

use super::{Direction, Location, Viewpoint};
use crate::error::{Error, Result};

/// Regular `nx × ny × nz` lattice spanning `[min_coord, max_coord]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CubicGrid {
    pub dims: [usize; 3],
    pub min_coord: [f64; 3],
    pub max_coord: [f64; 3],
}

impl Default for CubicGrid {
    fn default() -> Self {
        Self {
            dims: [1, 1, 1],
            min_coord: [-12.0; 3],
            max_coord: [12.0; 3],
        }
    }
}

impl CubicGrid {
    pub fn new(dims: [usize; 3]) -> Self {
        Self {
            dims,
            ..Self::default()
        }
    }

    /// World position of lattice node `ijk`.
    ///
    /// An axis with a single node sits at the midpoint of its range.
    pub fn node(&self, ijk: [usize; 3]) -> [f64; 3] {
        let mut p = [0.0; 3];
        for axis in 0..3 {
            let span = self.max_coord[axis] - self.min_coord[axis];
            p[axis] = if self.dims[axis] > 1 {
                self.min_coord[axis] + span * ijk[axis] as f64 / (self.dims[axis] - 1) as f64
            } else {
                self.min_coord[axis] + span * 0.5
            };
        }
        p
    }

    /// Generate locations in `i`-fastest order; index is `i + nx*(j + ny*k)`.
    pub fn generate(&self, direction: Direction) -> Result<Viewpoint> {
        if self.dims.contains(&0) {
            return Err(Error::InvalidConfig(format!(
                "cubic grid dims must be > 0, got {:?}",
                self.dims
            )));
        }
        let mut viewpoint = Viewpoint::new();
        for k in 0..self.dims[2] {
            for j in 0..self.dims[1] {
                for i in 0..self.dims[0] {
                    let p = self.node([i, j, k]);
                    viewpoint.add(Location::facing_origin(direction, p))?;
                }
            }
        }
        Ok(viewpoint)
    }
}
