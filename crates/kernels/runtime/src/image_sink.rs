//! Image Sink - rendered frame output abstraction
//!
//! The adaptor hands every finished frame to an [`ImageSink`]. Composited
//! frames are written by the root only; per-rank layer images (color,
//! depth, alpha of the partial render) are written by every rank into its
//! own directory.
//!
//! # Implementations
//!
//! - `FileImageSink` - BMP files plus a JSON manifest
//! - `NullImageSink` - discard output (for benchmarking render cost)
//! - `MultiImageSink` - fan out to several sinks

pub mod file;

pub use file::{FileImageSink, FrameManifest};

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use vantage_foundation::FrameBuffer;

use crate::error::Result;

/// Which per-rank layer images to write next to each frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Layers {
    pub color: bool,
    pub depth: bool,
    pub alpha: bool,
}

impl Layers {
    pub fn any(&self) -> bool {
        self.color || self.depth || self.alpha
    }
}

/// Destination for rendered frames.
///
/// # Lifecycle
///
/// 1. Create the sink for an output directory
/// 2. Call `write_frame()` / `write_layers()` per rendered frame
/// 3. Call `close()` once at the end of the run
pub trait ImageSink: Send {
    /// Write a frame under `name` (file stem, no extension).
    fn write_frame(&mut self, name: &str, frame: &FrameBuffer) -> Result<()>;

    /// Write the requested layer images of `frame`.
    fn write_layers(&mut self, name: &str, frame: &FrameBuffer, layers: Layers) -> Result<()>;

    /// Ensure buffered output is written.
    fn flush(&mut self) -> Result<()>;

    /// Finalize output. The sink must not be used afterwards.
    fn close(&mut self) -> Result<()>;

    /// Directory this sink writes into, if any.
    fn output_path(&self) -> Option<PathBuf> {
        None
    }
}

/// Null sink - discards all frames.
pub struct NullImageSink;

impl ImageSink for NullImageSink {
    fn write_frame(&mut self, _name: &str, _frame: &FrameBuffer) -> Result<()> {
        Ok(())
    }

    fn write_layers(&mut self, _name: &str, _frame: &FrameBuffer, _layers: Layers) -> Result<()> {
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Multi-sink - broadcast frames to several sinks.
#[derive(Default)]
pub struct MultiImageSink {
    sinks: Vec<Box<dyn ImageSink>>,
}

impl MultiImageSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sink(&mut self, sink: Box<dyn ImageSink>) {
        self.sinks.push(sink);
    }
}

impl ImageSink for MultiImageSink {
    fn write_frame(&mut self, name: &str, frame: &FrameBuffer) -> Result<()> {
        for sink in &mut self.sinks {
            sink.write_frame(name, frame)?;
        }
        Ok(())
    }

    fn write_layers(&mut self, name: &str, frame: &FrameBuffer, layers: Layers) -> Result<()> {
        for sink in &mut self.sinks {
            sink.write_layers(name, frame, layers)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        for sink in &mut self.sinks {
            sink.flush()?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        for sink in &mut self.sinks {
            sink.close()?;
        }
        Ok(())
    }

    fn output_path(&self) -> Option<PathBuf> {
        self.sinks.iter().find_map(|s| s.output_path())
    }
}
