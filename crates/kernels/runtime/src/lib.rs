//! Vantage Runtime.
//!
//! This crate turns camera locations into globally composited images for
//! in-situ visualization. Every rank renders its own data partition; the
//! partial images are merged with a depth test and written by the root.
//!
//! # Architecture
//!
//! - [`viewpoint`] - [`Location`], [`Viewpoint`] and the grid generators
//! - [`scene`] - [`Camera`], [`Light`] and the injected [`Screen`] renderer
//! - [`spherical_buffer`] - cube-face to panorama stitching
//! - [`comm`] - [`Communicator`] collectives ([`SingleProcess`], [`LocalGroup`])
//! - [`compositor`] - sort-last [`DepthCompositor`]
//! - [`adaptor`] - the render/readback/composite/write loop ([`Adaptor`])
//! - [`image_sink`] - BMP output
//! - [`output`] - per-rank output directories
//! - [`timer`] - stamp timers and timing tables
//! - [`reductions`] - deterministic reductions for aggregated statistics
//! - [`error`] - error types
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use vantage_runtime::{Adaptor, AdaptorConfig, SingleProcess, ViewpointGenerator, Direction};
//!
//! let viewpoint = ViewpointGenerator::default().generate(Direction::Uni)?;
//! let mut adaptor = Adaptor::new(AdaptorConfig::default(), screen, viewpoint, Arc::new(SingleProcess));
//! adaptor.add_pipeline(|screen, step: &Step| screen.register(step));
//! adaptor.initialize()?;
//! for step in simulation {
//!     adaptor.exec(&step)?;
//! }
//! adaptor.finalize()?;
//! ```

pub mod adaptor;
pub mod comm;
pub mod compositor;
pub mod error;
pub mod image_sink;
pub mod output;
pub mod reductions;
pub mod scene;
pub mod spherical_buffer;
pub mod timer;
pub mod viewpoint;

pub use adaptor::{Adaptor, AdaptorConfig, RenderPipeline};
pub use comm::{Communicator, LocalGroup, LocalRank, SingleProcess};
pub use compositor::{DepthCompositor, ImageCompositor};
pub use error::{Error, Result};
pub use image_sink::{FileImageSink, ImageSink, Layers, MultiImageSink, NullImageSink};
pub use output::OutputDirectory;
pub use scene::{BoundingBox, Camera, Light, Projection, Screen};
pub use spherical_buffer::{CubeFace, SphericalBuffer};
pub use timer::{StampTimer, TimingTable};
pub use viewpoint::{Direction, Location, Viewpoint, ViewpointGenerator};
