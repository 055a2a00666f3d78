//! Color + depth frame buffers.
//!
//! A [`FrameBuffer`] is what a render call reads back: packed RGBA bytes and
//! one normalized window depth per pixel, where `1.0` marks background.
//! Buffers are owned by value and never shared between ranks except
//! through the compositor.

use thiserror::Error;

/// Frame buffer construction errors.
#[derive(Debug, Error, PartialEq)]
pub enum FrameError {
    /// Color buffer length does not match `4 * width * height`.
    #[error("color buffer holds {actual} bytes, expected {expected}")]
    ColorSize { expected: usize, actual: usize },
    /// Depth buffer length does not match `width * height`.
    #[error("depth buffer holds {actual} values, expected {expected}")]
    DepthSize { expected: usize, actual: usize },
    /// Requested region falls outside the buffer.
    #[error("region {x},{y} {width}x{height} exceeds buffer bounds")]
    Region {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
}

/// Depth value marking a pixel with no geometry.
pub const BACKGROUND_DEPTH: f32 = 1.0;

/// Read-back image: RGBA color and per-pixel depth.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    width: usize,
    height: usize,
    color: Vec<u8>,
    depth: Vec<f32>,
}

impl FrameBuffer {
    /// Transparent black buffer with every pixel at background depth.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            color: vec![0; width * height * 4],
            depth: vec![BACKGROUND_DEPTH; width * height],
        }
    }

    /// Opaque buffer of a single background color.
    pub fn background(width: usize, height: usize, rgb: [u8; 3]) -> Self {
        Self::filled(width, height, [rgb[0], rgb[1], rgb[2], 255], BACKGROUND_DEPTH)
    }

    /// Buffer with every pixel set to the same color and depth.
    pub fn filled(width: usize, height: usize, rgba: [u8; 4], depth: f32) -> Self {
        Self {
            width,
            height,
            color: rgba.repeat(width * height),
            depth: vec![depth; width * height],
        }
    }

    /// Wrap existing buffers, validating their lengths.
    pub fn from_parts(
        width: usize,
        height: usize,
        color: Vec<u8>,
        depth: Vec<f32>,
    ) -> Result<Self, FrameError> {
        let pixels = width * height;
        if color.len() != pixels * 4 {
            return Err(FrameError::ColorSize {
                expected: pixels * 4,
                actual: color.len(),
            });
        }
        if depth.len() != pixels {
            return Err(FrameError::DepthSize {
                expected: pixels,
                actual: depth.len(),
            });
        }
        Ok(Self {
            width,
            height,
            color,
            depth,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of pixels.
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Packed RGBA bytes, row-major from the bottom-left pixel.
    pub fn color(&self) -> &[u8] {
        &self.color
    }

    pub fn color_mut(&mut self) -> &mut [u8] {
        &mut self.color
    }

    /// Per-pixel normalized depth.
    pub fn depth(&self) -> &[f32] {
        &self.depth
    }

    pub fn depth_mut(&mut self) -> &mut [f32] {
        &mut self.depth
    }

    /// Consume into `(color, depth)`.
    pub fn into_parts(self) -> (Vec<u8>, Vec<f32>) {
        (self.color, self.depth)
    }

    /// RGBA value at column `x`, row `y`.
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 4] {
        let i = (y * self.width + x) * 4;
        [
            self.color[i],
            self.color[i + 1],
            self.color[i + 2],
            self.color[i + 3],
        ]
    }

    /// Write RGBA value and depth at column `x`, row `y`.
    pub fn set_pixel(&mut self, x: usize, y: usize, rgba: [u8; 4], depth: f32) {
        let p = y * self.width + x;
        self.color[p * 4..p * 4 + 4].copy_from_slice(&rgba);
        self.depth[p] = depth;
    }

    /// Depth at column `x`, row `y`.
    pub fn depth_at(&self, x: usize, y: usize) -> f32 {
        self.depth[y * self.width + x]
    }

    /// True when the pixel holds geometry (depth strictly below background).
    pub fn is_foreground(&self, index: usize) -> bool {
        self.depth[index] < BACKGROUND_DEPTH
    }

    /// Copy out a rectangular region.
    pub fn crop(
        &self,
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    ) -> Result<FrameBuffer, FrameError> {
        if x + width > self.width || y + height > self.height {
            return Err(FrameError::Region {
                x,
                y,
                width,
                height,
            });
        }
        let mut out = FrameBuffer::new(width, height);
        for row in 0..height {
            let src = (y + row) * self.width + x;
            let dst = row * width;
            out.color[dst * 4..(dst + width) * 4]
                .copy_from_slice(&self.color[src * 4..(src + width) * 4]);
            out.depth[dst..dst + width].copy_from_slice(&self.depth[src..src + width]);
        }
        Ok(out)
    }
}
