//! File-based image sink (BMP format)
//!
//! Writes frames as BMP files and a manifest listing them on close.

use std::fs;
use std::path::PathBuf;

use image::{GrayImage, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::debug;

use vantage_foundation::FrameBuffer;

use super::{ImageSink, Layers};
use crate::error::{Error, Result};

/// Manifest describing the frames of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameManifest {
    /// Creation timestamp
    pub created_at: String,

    /// Number of frames written
    pub frame_count: usize,

    /// Written file names, in write order
    pub files: Vec<String>,
}

/// BMP image sink.
pub struct FileImageSink {
    dir: PathBuf,
    files: Vec<String>,
    is_closed: bool,
}

impl FileImageSink {
    /// Sink writing into `dir`, which is created if missing.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            files: Vec::new(),
            is_closed: false,
        })
    }

    fn check_not_closed(&self) -> Result<()> {
        if self.is_closed {
            Err(Error::Serialization("image sink already closed".to_string()))
        } else {
            Ok(())
        }
    }

    fn record(&mut self, file: String) {
        debug!(file = %file, "frame written");
        self.files.push(file);
    }

    /// Path a frame named `name` is written to.
    pub fn frame_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.bmp"))
    }
}

/// Row index in the top-down image for row `y` of a bottom-up frame.
fn flipped(frame: &FrameBuffer, y: u32) -> usize {
    frame.height() - 1 - y as usize
}

fn color_image(frame: &FrameBuffer) -> Result<RgbImage> {
    let (w, h) = dims(frame)?;
    Ok(RgbImage::from_fn(w, h, |x, y| {
        let [r, g, b, _] = frame.pixel(x as usize, flipped(frame, y));
        image::Rgb([r, g, b])
    }))
}

fn rgba_image(frame: &FrameBuffer) -> Result<RgbaImage> {
    let (w, h) = dims(frame)?;
    Ok(RgbaImage::from_fn(w, h, |x, y| {
        image::Rgba(frame.pixel(x as usize, flipped(frame, y)))
    }))
}

fn depth_image(frame: &FrameBuffer) -> Result<GrayImage> {
    let (w, h) = dims(frame)?;
    Ok(GrayImage::from_fn(w, h, |x, y| {
        let d = frame.depth_at(x as usize, flipped(frame, y)).clamp(0.0, 1.0);
        image::Luma([(d * 255.0).round() as u8])
    }))
}

fn alpha_image(frame: &FrameBuffer) -> Result<GrayImage> {
    let (w, h) = dims(frame)?;
    Ok(GrayImage::from_fn(w, h, |x, y| {
        image::Luma([frame.pixel(x as usize, flipped(frame, y))[3]])
    }))
}

fn dims(frame: &FrameBuffer) -> Result<(u32, u32)> {
    let w = u32::try_from(frame.width())
        .map_err(|_| Error::InvalidConfig("frame too wide".to_string()))?;
    let h = u32::try_from(frame.height())
        .map_err(|_| Error::InvalidConfig("frame too tall".to_string()))?;
    Ok((w, h))
}

impl ImageSink for FileImageSink {
    fn write_frame(&mut self, name: &str, frame: &FrameBuffer) -> Result<()> {
        self.check_not_closed()?;
        let path = self.frame_path(name);
        rgba_image(frame)?.save(&path)?;
        self.record(format!("{name}.bmp"));
        Ok(())
    }

    fn write_layers(&mut self, name: &str, frame: &FrameBuffer, layers: Layers) -> Result<()> {
        self.check_not_closed()?;
        if layers.color {
            let file = format!("{name}_color.bmp");
            color_image(frame)?.save(self.dir.join(&file))?;
            self.record(file);
        }
        if layers.depth {
            let file = format!("{name}_depth.bmp");
            depth_image(frame)?.save(self.dir.join(&file))?;
            self.record(file);
        }
        if layers.alpha {
            let file = format!("{name}_alpha.bmp");
            alpha_image(frame)?.save(self.dir.join(&file))?;
            self.record(file);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.check_not_closed()?;
        // File writes are synchronous, nothing to flush
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.is_closed {
            return Ok(());
        }
        let manifest = FrameManifest {
            created_at: chrono::Local::now().to_rfc3339(),
            frame_count: self.files.len(),
            files: self.files.clone(),
        };
        let json = serde_json::to_string_pretty(&manifest)
            .map_err(|e| Error::Serialization(e.to_string()))?;
        fs::write(self.dir.join("manifest.json"), json)?;
        self.is_closed = true;
        Ok(())
    }

    fn output_path(&self) -> Option<PathBuf> {
        Some(self.dir.clone())
    }
}
