//! Vantage Foundation
//!
//! Core primitives shared by every vantage crate: 3-vector helpers,
//! quaternion algebra for camera orientation, and the color+depth
//! [`FrameBuffer`] produced by every render call.

pub mod frame;
pub mod quat;
pub mod vector_ops;

pub use frame::{FrameBuffer, FrameError};
pub use quat::Quat;

/// A 3D vector or point in world coordinates.
pub type Vec3 = [f64; 3];

/// World-space origin.
pub const ORIGIN: Vec3 = [0.0, 0.0, 0.0];

/// Tolerance used when comparing floating point geometry.
pub const EPSILON: f64 = 1e-9;
