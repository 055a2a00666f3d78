//! Runtime errors for viewpoint rendering and output.
//!
//! # Error Categories
//!
//! - **Initialization errors**: [`Error::OutputDirectory`], [`Error::Compositor`],
//!   [`Error::InitializationAborted`]
//! - **Collective errors**: [`Error::Communication`]
//! - **Output errors**: [`Error::Io`], [`Error::Image`], [`Error::Csv`], [`Error::Serialization`]
//! - **Value errors**: [`Error::InvalidConfig`], [`Error::InvalidBuffer`], [`Error::DuplicateIndex`]
//!
//! Initialization errors are fatal for a run. Per-frame output errors are
//! logged by the adaptor and the frame is skipped.

use thiserror::Error;

use vantage_foundation::FrameError;

/// Runtime result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while rendering, compositing or writing frames.
#[derive(Debug, Error)]
pub enum Error {
    /// Filesystem failure while writing output.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image encoding failure.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// CSV table failure.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Manifest serialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The output directory tree could not be created.
    #[error("failed to create output directory {path}: {reason}")]
    OutputDirectory { path: String, reason: String },

    /// The image compositor failed to initialize or merge.
    #[error("compositor error: {0}")]
    Compositor(String),

    /// A peer rank failed to initialize; every rank aborts together.
    #[error("initialization aborted: {0}")]
    InitializationAborted(String),

    /// A collective operation failed (peer disconnected, malformed payload).
    #[error("communication error: {0}")]
    Communication(String),

    /// Configuration validation failure.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Frame buffer of the wrong shape.
    #[error("invalid frame buffer: {0}")]
    InvalidBuffer(#[from] FrameError),

    /// A location index already present in the viewpoint.
    #[error("duplicate location index {0}")]
    DuplicateIndex(usize),
}
