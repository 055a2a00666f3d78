//! Vantage Run - a synthetic in-situ run.
//!
//! Drives a vantage controller with a heated-sphere particle simulation
//! split across in-process ranks, rendered by a point-splat screen.

pub mod run;
pub mod simulation;
pub mod splat;

pub use run::{RunSummary, run_rank};
pub use simulation::{HeatedSphere, Particle, Snapshot};
pub use splat::{SplatScreen, heat_color, register_particles};
