//! Sort-last image compositing.
//!
//! Each rank renders its own partition; the compositor merges the partial
//! color+depth images into one frame that is complete only on the root.
//! `run` is a collective and must be called by every rank once per face.

use std::sync::Arc;

use tracing::debug;

use vantage_foundation::FrameBuffer;

use crate::comm::Communicator;
use crate::error::{Error, Result};

/// Cross-rank merge primitive.
pub trait ImageCompositor {
    /// Prepare for frames of `width × height`.
    fn initialize(&mut self, width: usize, height: usize, depth_test: bool) -> Result<()>;

    /// Merge `frame` across ranks in place; the root ends with the composite.
    fn run(&mut self, frame: &mut FrameBuffer) -> Result<()>;

    /// Release resources; the compositor may be initialized again afterwards.
    fn destroy(&mut self) -> Result<()>;
}

/// Gather-to-root compositor.
///
/// With the depth test enabled each pixel keeps the nearest sample; equal
/// depths keep the lower rank, so the result is independent of arrival
/// order. Without the depth test ranks are blended over each other in
/// rank order.
pub struct DepthCompositor {
    comm: Arc<dyn Communicator>,
    size: Option<(usize, usize)>,
    depth_test: bool,
}

impl DepthCompositor {
    pub fn new(comm: Arc<dyn Communicator>) -> Self {
        Self {
            comm,
            size: None,
            depth_test: true,
        }
    }
}

fn encode(frame: &FrameBuffer) -> Vec<u8> {
    let mut out = Vec::with_capacity(frame.color().len() + frame.depth().len() * 4);
    out.extend_from_slice(frame.color());
    for d in frame.depth() {
        out.extend_from_slice(&d.to_le_bytes());
    }
    out
}

fn decode(bytes: &[u8], width: usize, height: usize) -> Result<FrameBuffer> {
    let color_len = width * height * 4;
    if bytes.len() != color_len + width * height * 4 {
        return Err(Error::Compositor(format!(
            "partial image of {} bytes does not match {width}x{height}",
            bytes.len()
        )));
    }
    let depth = bytes[color_len..]
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    Ok(FrameBuffer::from_parts(
        width,
        height,
        bytes[..color_len].to_vec(),
        depth,
    )?)
}

/// Blend `src` over `dst` (straight alpha).
fn over(dst: &mut [u8], src: &[u8]) {
    let a = src[3] as f64 / 255.0;
    for c in 0..3 {
        dst[c] = (src[c] as f64 * a + dst[c] as f64 * (1.0 - a)).round() as u8;
    }
    dst[3] = (src[3] as f64 + dst[3] as f64 * (1.0 - a)).round().min(255.0) as u8;
}

/// Merge `partials` (rank order) into the first one.
pub fn merge(partials: Vec<FrameBuffer>, depth_test: bool) -> Option<FrameBuffer> {
    let mut iter = partials.into_iter();
    let mut out = iter.next()?;
    for partial in iter {
        for p in 0..out.len() {
            let src_depth = partial.depth()[p];
            let (x, y) = (p % out.width(), p / out.width());
            if depth_test {
                if src_depth < out.depth()[p] {
                    out.set_pixel(x, y, partial.pixel(x, y), src_depth);
                }
            } else {
                let mut rgba = out.pixel(x, y);
                over(&mut rgba, &partial.pixel(x, y));
                let depth = out.depth()[p].min(src_depth);
                out.set_pixel(x, y, rgba, depth);
            }
        }
    }
    Some(out)
}

impl ImageCompositor for DepthCompositor {
    fn initialize(&mut self, width: usize, height: usize, depth_test: bool) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::Compositor(format!(
                "cannot composite {width}x{height} images"
            )));
        }
        self.size = Some((width, height));
        self.depth_test = depth_test;
        debug!(width, height, depth_test, "compositor initialized");
        Ok(())
    }

    fn run(&mut self, frame: &mut FrameBuffer) -> Result<()> {
        let Some((width, height)) = self.size else {
            return Err(Error::Compositor("compositor not initialized".to_string()));
        };
        if frame.width() != width || frame.height() != height {
            return Err(Error::Compositor(format!(
                "frame is {}x{}, compositor expects {width}x{height}",
                frame.width(),
                frame.height()
            )));
        }
        if self.comm.size() == 1 {
            return Ok(());
        }
        if let Some(all) = self.comm.gather(encode(frame))? {
            let partials = all
                .iter()
                .map(|bytes| decode(bytes, width, height))
                .collect::<Result<Vec<_>>>()?;
            if let Some(merged) = merge(partials, self.depth_test) {
                *frame = merged;
            }
        }
        Ok(())
    }

    fn destroy(&mut self) -> Result<()> {
        self.size = None;
        Ok(())
    }
}
