//! Vantage Lens - adaptive visualization control.
//!
//! Lens decides *what* gets rendered on top of the runtime's
//! render/readback/composite loop:
//!
//! - [`camera_path`] - picks the highest-entropy candidate viewpoint at
//!   intervals and renders the cached steps in between along an
//!   interpolated camera path
//! - [`timestep`] - gates steps by the divergence of their field values,
//!   sampling stable stretches coarsely and changing ones in full
//! - [`adaptors`] - runtime adaptors driven by one or both controllers
//!
//! Scoring and interpolation are strategies injected at construction:
//! [`entropy::EntropyFunction`], [`divergence::Divergence`],
//! [`interpolation::RotationInterpolator`] and [`focus::FocusEstimator`].
//! Runs are described by a YAML document ([`config::VisRunConfig`]).

pub mod adaptors;
pub mod camera_path;
pub mod config;
pub mod divergence;
pub mod entropy;
pub mod error;
pub mod focus;
pub mod interpolation;
pub mod path;
pub mod report;
pub mod timestep;

pub use adaptors::{CameraPathAdaptor, CameraPathTimestepAdaptor, ControlledAdaptor, TimestepAdaptor};
pub use camera_path::{CameraPathConfig, CameraPathController, PathRenderer};
pub use config::{ControllerConfig, ViewpointConfig, VisRunConfig};
pub use error::{LensError, Result};
pub use timestep::{Pattern, TimestepConfig, TimestepController};
