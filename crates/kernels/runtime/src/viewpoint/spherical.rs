//! Latitude/longitude shells of camera locations.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::{Direction, Location, Viewpoint};
use crate::error::{Error, Result};

/// `layers` concentric shells, each sampled on a `theta × phi` grid.
///
/// Poles are emitted once per shell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SphericalGrid {
    /// `[layers, theta samples, phi samples]`.
    pub dims: [usize; 3],
    pub min_coord: [f64; 3],
    pub max_coord: [f64; 3],
}

impl Default for SphericalGrid {
    fn default() -> Self {
        Self {
            dims: [1, 5, 8],
            min_coord: [-12.0; 3],
            max_coord: [12.0; 3],
        }
    }
}

/// Spherical `(r, theta, phi)` to Cartesian, with `theta` measured from `+y`.
pub fn rtp_to_xyz(r: f64, theta: f64, phi: f64) -> [f64; 3] {
    [
        r * theta.sin() * phi.sin(),
        r * theta.cos(),
        r * theta.sin() * phi.cos(),
    ]
}

impl SphericalGrid {
    pub fn generate(&self, direction: Direction) -> Result<Viewpoint> {
        let [layers, n_theta, n_phi] = self.dims;
        if layers == 0 || n_theta == 0 || n_phi == 0 {
            return Err(Error::InvalidConfig(format!(
                "spherical grid dims must be > 0, got {:?}",
                self.dims
            )));
        }
        let extent = self.max_coord[0] - self.min_coord[0];
        let mut viewpoint = Viewpoint::new();
        for layer in 1..=layers {
            let r = layer as f64 * extent / (2.0 * layers as f64);
            for it in 0..n_theta {
                let theta = if n_theta > 1 {
                    PI * it as f64 / (n_theta - 1) as f64
                } else {
                    PI * 0.5
                };
                let at_pole = n_theta > 1 && (it == 0 || it == n_theta - 1);
                let samples = if at_pole { 1 } else { n_phi };
                for ip in 0..samples {
                    let phi = 2.0 * PI * ip as f64 / n_phi as f64;
                    let p = rtp_to_xyz(r, theta, phi);
                    viewpoint.add(Location::facing_origin(direction, p))?;
                }
            }
        }
        Ok(viewpoint)
    }
}
