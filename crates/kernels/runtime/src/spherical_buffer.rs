//! Cubemap to equirectangular panorama stitching.
//!
//! Six square perspective renders (90° field of view, one per cube face)
//! are resampled into one `4w × 3h` latitude/longitude image. Row 0 of the
//! panorama looks straight down, matching the bottom-up row order of
//! [`FrameBuffer`].
//!
//! For each destination pixel the view direction is
//!
//! ```text
//! theta = pi * (1 - j / (H - 1))        phi = 2 pi * i / (W - 1)
//! d = (-sin(phi) sin(theta), cos(theta), -cos(phi) sin(theta))
//! ```
//!
//! The axis with the largest absolute component selects the face; the
//! direction is scaled so that component is `±1` and the two remaining
//! coordinates (projected onto the face camera's right and up vectors)
//! give the bilinear sample position. [`panorama_unproject`] inverts the
//! mapping for one pixel and its stitched depth.

use vantage_foundation::vector_ops::{add, cross, dot, scale};
use vantage_foundation::{FrameBuffer, Vec3};

use crate::error::{Error, Result};
use crate::scene::Camera;

/// Cube face, in the fixed order faces are rendered and composited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeFace {
    Right,
    Left,
    Top,
    Bottom,
    Front,
    Back,
}

impl CubeFace {
    pub const ALL: [CubeFace; 6] = [
        CubeFace::Right,
        CubeFace::Left,
        CubeFace::Top,
        CubeFace::Bottom,
        CubeFace::Front,
        CubeFace::Back,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            CubeFace::Right => "right",
            CubeFace::Left => "left",
            CubeFace::Top => "top",
            CubeFace::Bottom => "bottom",
            CubeFace::Front => "front",
            CubeFace::Back => "back",
        }
    }

    /// View direction of the face camera.
    pub fn direction(self) -> Vec3 {
        match self {
            CubeFace::Right => [1.0, 0.0, 0.0],
            CubeFace::Left => [-1.0, 0.0, 0.0],
            CubeFace::Top => [0.0, 1.0, 0.0],
            CubeFace::Bottom => [0.0, -1.0, 0.0],
            CubeFace::Front => [0.0, 0.0, 1.0],
            CubeFace::Back => [0.0, 0.0, -1.0],
        }
    }

    /// Up vector of the face camera.
    pub fn up_vector(self) -> Vec3 {
        match self {
            CubeFace::Top => [0.0, 0.0, 1.0],
            CubeFace::Bottom => [0.0, 0.0, -1.0],
            _ => [0.0, 1.0, 0.0],
        }
    }

    /// Right vector of the face camera (`direction × up`).
    pub fn right_vector(self) -> Vec3 {
        cross(self.direction(), self.up_vector())
    }

    /// Face hit by direction `d`, with `d` rescaled so its dominant component is ±1.
    pub fn for_direction(d: Vec3) -> (CubeFace, Vec3) {
        let abs = [d[0].abs(), d[1].abs(), d[2].abs()];
        let axis = if abs[0] >= abs[1] && abs[0] >= abs[2] {
            0
        } else if abs[1] >= abs[2] {
            1
        } else {
            2
        };
        let face = match (axis, d[axis] >= 0.0) {
            (0, true) => CubeFace::Right,
            (0, false) => CubeFace::Left,
            (1, true) => CubeFace::Top,
            (1, false) => CubeFace::Bottom,
            (_, true) => CubeFace::Front,
            (_, false) => CubeFace::Back,
        };
        let a = abs[axis];
        let unit = if a > 0.0 { scale(d, 1.0 / a) } else { d };
        (face, unit)
    }
}

/// Panorama view direction for destination pixel `(i, j)`.
pub fn panorama_direction(i: usize, j: usize, width: usize, height: usize) -> Vec3 {
    let v = if height > 1 {
        1.0 - j as f64 / (height - 1) as f64
    } else {
        0.5
    };
    let u = if width > 1 {
        i as f64 / (width - 1) as f64
    } else {
        0.5
    };
    let theta = v * std::f64::consts::PI;
    let phi = u * 2.0 * std::f64::consts::PI;
    [
        -phi.sin() * theta.sin(),
        theta.cos(),
        -phi.cos() * theta.sin(),
    ]
}

/// World point seen at panorama pixel `(i, j)` with stitched `depth`.
///
/// The faces were rendered from `camera.position` with the camera's near
/// and far planes; the depth is converted back to a distance along the
/// face axis. `None` for background depth.
pub fn panorama_unproject(
    camera: &Camera,
    i: usize,
    j: usize,
    depth: f64,
    width: usize,
    height: usize,
) -> Option<Vec3> {
    if width == 0 || height == 0 || !(0.0..1.0).contains(&depth) {
        return None;
    }
    let (near, far) = (camera.near, camera.far);
    let ndc = 2.0 * depth - 1.0;
    let axis_distance = 2.0 * far * near / ((far + near) - ndc * (far - near));
    let (_, unit) = CubeFace::for_direction(panorama_direction(i, j, width, height));
    Some(add(camera.position, scale(unit, axis_distance)))
}

/// Six face buffers awaiting stitching.
#[derive(Debug, Clone)]
pub struct SphericalBuffer {
    width: usize,
    height: usize,
    faces: [Option<FrameBuffer>; 6],
}

impl SphericalBuffer {
    /// Buffer for faces of `width × height` pixels.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            faces: Default::default(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn stitched_width(&self) -> usize {
        self.width * 4
    }

    pub fn stitched_height(&self) -> usize {
        self.height * 3
    }

    /// Store the render for one face.
    pub fn set_face(&mut self, face: CubeFace, buffer: FrameBuffer) -> Result<()> {
        if buffer.width() != self.width || buffer.height() != self.height {
            return Err(Error::InvalidConfig(format!(
                "{} face is {}x{}, expected {}x{}",
                face.name(),
                buffer.width(),
                buffer.height(),
                self.width,
                self.height
            )));
        }
        self.faces[face.index()] = Some(buffer);
        Ok(())
    }

    /// Resample all six faces into one panorama.
    pub fn stitch(&self) -> Result<FrameBuffer> {
        let mut faces: Vec<&FrameBuffer> = Vec::with_capacity(6);
        for face in CubeFace::ALL {
            match &self.faces[face.index()] {
                Some(buffer) => faces.push(buffer),
                None => {
                    return Err(Error::InvalidConfig(format!(
                        "missing {} face",
                        face.name()
                    )));
                }
            }
        }

        let sw = self.stitched_width();
        let sh = self.stitched_height();
        let mut out = FrameBuffer::new(sw, sh);
        for j in 0..sh {
            for i in 0..sw {
                let (face, d) = CubeFace::for_direction(panorama_direction(i, j, sw, sh));
                let (si, sj) = self.sample_position(face, d);
                let src = faces[face.index()];
                let mut rgba = [0u8; 4];
                for (c, value) in rgba.iter_mut().enumerate() {
                    *value = sample_u8(src, si, sj, c);
                }
                out.set_pixel(i, j, rgba, sample_depth(src, si, sj));
            }
        }
        Ok(out)
    }

    fn sample_position(&self, face: CubeFace, d: Vec3) -> (f64, f64) {
        let s = dot(d, face.right_vector()).clamp(-1.0, 1.0);
        let t = dot(d, face.up_vector()).clamp(-1.0, 1.0);
        let si = (s + 1.0) * 0.5 * (self.width.saturating_sub(1)) as f64;
        let sj = (t + 1.0) * 0.5 * (self.height.saturating_sub(1)) as f64;
        (si, sj)
    }
}

/// Bilinear neighbourhood: `(x0, y0, x1, y1, xratio, yratio)`.
fn neighbourhood(buffer: &FrameBuffer, x: f64, y: f64) -> (usize, usize, usize, usize, f64, f64) {
    let x0 = (x.floor() as usize).min(buffer.width().saturating_sub(1));
    let y0 = (y.floor() as usize).min(buffer.height().saturating_sub(1));
    let x1 = (x0 + 1).min(buffer.width().saturating_sub(1));
    let y1 = (y0 + 1).min(buffer.height().saturating_sub(1));
    (x0, y0, x1, y1, x - x0 as f64, y - y0 as f64)
}

fn bilinear(p00: f64, p10: f64, p01: f64, p11: f64, xr: f64, yr: f64) -> f64 {
    let bottom = p00 * (1.0 - xr) + p10 * xr;
    let top = p01 * (1.0 - xr) + p11 * xr;
    (bottom * (1.0 - yr) + top * yr).clamp(0.0, 1.0)
}

/// Bilinear sample of one 8-bit channel, blended in `[0, 1]`.
fn sample_u8(buffer: &FrameBuffer, x: f64, y: f64, channel: usize) -> u8 {
    let (x0, y0, x1, y1, xr, yr) = neighbourhood(buffer, x, y);
    let at = |px: usize, py: usize| buffer.pixel(px, py)[channel] as f64 / 255.0;
    let v = bilinear(at(x0, y0), at(x1, y0), at(x0, y1), at(x1, y1), xr, yr);
    (v * 255.0).round() as u8
}

fn sample_depth(buffer: &FrameBuffer, x: f64, y: f64) -> f32 {
    let (x0, y0, x1, y1, xr, yr) = neighbourhood(buffer, x, y);
    let at = |px: usize, py: usize| buffer.depth_at(px, py) as f64;
    bilinear(at(x0, y0), at(x1, y0), at(x0, y1), at(x1, y1), xr, yr) as f32
}
