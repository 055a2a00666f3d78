//! Synthetic heated-sphere simulation.
//!
//! A lattice of particles fills a sphere; a Gaussian hot spot orbits
//! around the y axis and, from `ignition_step` on, the whole body heats
//! up. Each rank owns the particles of one slab along `x`.

use std::f64::consts::TAU;

use vantage_foundation::Vec3;
use vantage_foundation::vector_ops::{distance_sq, length};

/// One particle of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub position: Vec3,
    pub temperature: f64,
}

/// Local particles of one rank at one step.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub step: u64,
    pub particles: Vec<Particle>,
}

impl Snapshot {
    /// Field values fed to the divergence gate.
    pub fn values(&self) -> Vec<f64> {
        self.particles.iter().map(|p| p.temperature).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatedSphere {
    /// Lattice points per axis.
    pub resolution: usize,
    pub radius: f64,
    /// Width of the hot spot.
    pub sigma: f64,
    /// Steps per hot spot orbit.
    pub period: u64,
    /// First step of the global heat-up.
    pub ignition_step: u64,
}

impl Default for HeatedSphere {
    fn default() -> Self {
        Self {
            resolution: 24,
            radius: 4.0,
            sigma: 1.0,
            period: 64,
            ignition_step: 20,
        }
    }
}

impl HeatedSphere {
    /// Lattice points inside the sphere owned by `rank` of `size`.
    pub fn partition(&self, rank: usize, size: usize) -> Vec<Vec3> {
        let n = self.resolution.max(2);
        let size = size.max(1);
        let step = 2.0 * self.radius / (n - 1) as f64;
        let mut out = Vec::new();
        for i in 0..n {
            let x = -self.radius + step * i as f64;
            let slab = ((i * size) / n).min(size - 1);
            if slab != rank {
                continue;
            }
            for j in 0..n {
                for k in 0..n {
                    let p = [
                        x,
                        -self.radius + step * j as f64,
                        -self.radius + step * k as f64,
                    ];
                    if length(p) <= self.radius {
                        out.push(p);
                    }
                }
            }
        }
        out
    }

    /// Centre of the hot spot at `step`.
    pub fn hot_spot(&self, step: u64) -> Vec3 {
        let angle = TAU * (step % self.period.max(1)) as f64 / self.period.max(1) as f64;
        let r = 0.6 * self.radius;
        [r * angle.cos(), 0.25 * self.radius, r * angle.sin()]
    }

    pub fn temperature(&self, position: Vec3, step: u64) -> f64 {
        let spot = self.hot_spot(step);
        let spot = (-distance_sq(position, spot) / (2.0 * self.sigma * self.sigma)).exp();
        let ambient = if step >= self.ignition_step { 1.0 } else { 0.0 };
        0.1 + spot + ambient
    }

    pub fn snapshot(&self, step: u64, positions: &[Vec3]) -> Snapshot {
        Snapshot {
            step,
            particles: positions
                .iter()
                .map(|&position| Particle {
                    position,
                    temperature: self.temperature(position, step),
                })
                .collect(),
        }
    }
}
