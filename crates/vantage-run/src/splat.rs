//! Point-splat screen.
//!
//! Rasterizes registered particles as depth-tested squares with a simple
//! diffuse term from the light.

use nalgebra as na;

use vantage_foundation::FrameBuffer;
use vantage_foundation::vector_ops::{dot, normalize, sub};
use vantage_runtime::{BoundingBox, Camera, Light, Screen};

use crate::simulation::Snapshot;

/// Temperature mapped to the top of the color scale.
pub const MAX_TEMPERATURE: f64 = 2.0;

struct Splat {
    position: [f64; 3],
    color: [u8; 3],
}

/// Screen drawing particles as square splats.
pub struct SplatScreen {
    splats: Vec<Splat>,
    background: [u8; 3],
    /// Splat edge in pixels.
    pub point_size: usize,
}

impl Default for SplatScreen {
    fn default() -> Self {
        Self::new([0, 0, 0], 2)
    }
}

impl SplatScreen {
    pub fn new(background: [u8; 3], point_size: usize) -> Self {
        Self {
            splats: Vec::new(),
            background,
            point_size: point_size.max(1),
        }
    }

    pub fn add_point(&mut self, position: [f64; 3], color: [u8; 3]) {
        self.splats.push(Splat { position, color });
    }

    pub fn len(&self) -> usize {
        self.splats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.splats.is_empty()
    }
}

/// Blue to white to red.
pub fn heat_color(t: f64) -> [u8; 3] {
    let t = t.clamp(0.0, 1.0);
    let (r, g, b) = if t < 0.5 {
        let s = t * 2.0;
        (s, s, 1.0)
    } else {
        let s = (1.0 - t) * 2.0;
        (1.0, s, s)
    };
    [(r * 255.0) as u8, (g * 255.0) as u8, (b * 255.0) as u8]
}

/// Render pipeline registering every particle of a snapshot.
pub fn register_particles(screen: &mut SplatScreen, snapshot: &Snapshot) {
    for particle in &snapshot.particles {
        screen.add_point(
            particle.position,
            heat_color(particle.temperature / MAX_TEMPERATURE),
        );
    }
}

impl Screen for SplatScreen {
    fn clear(&mut self) {
        self.splats.clear();
    }

    fn object_bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.splats.iter().map(|s| &s.position))
    }

    fn background(&self) -> [u8; 3] {
        self.background
    }

    fn draw(&mut self, camera: &Camera, light: &Light, width: usize, height: usize) -> FrameBuffer {
        let mut frame = FrameBuffer::background(width, height, self.background);
        if width == 0 || height == 0 {
            return frame;
        }
        let clip_from_world =
            camera.projection_matrix(width as f64 / height as f64) * camera.view_matrix();
        let half = (self.point_size / 2) as isize;

        for splat in &self.splats {
            let [x, y, z] = splat.position;
            let clip = clip_from_world * na::Vector4::new(x, y, z, 1.0);
            if clip.w <= 0.0 {
                continue;
            }
            let ndc = clip.xyz() / clip.w;
            if !(-1.0..=1.0).contains(&ndc.z) {
                continue;
            }
            let depth = ((ndc.z + 1.0) * 0.5) as f32;
            let px = ((ndc.x + 1.0) * 0.5 * width as f64 - 0.5).round() as isize;
            let py = ((ndc.y + 1.0) * 0.5 * height as f64 - 0.5).round() as isize;

            let shade = match (
                normalize(splat.position),
                normalize(sub(light.position, splat.position)),
            ) {
                (Some(n), Some(l)) => 0.4 + 0.6 * dot(n, l).max(0.0),
                _ => 1.0,
            };
            let rgba = [
                (splat.color[0] as f64 * shade) as u8,
                (splat.color[1] as f64 * shade) as u8,
                (splat.color[2] as f64 * shade) as u8,
                255,
            ];

            for dy in -half..=half {
                for dx in -half..=half {
                    let (sx, sy) = (px + dx, py + dy);
                    if sx < 0 || sy < 0 || sx >= width as isize || sy >= height as isize {
                        continue;
                    }
                    let (sx, sy) = (sx as usize, sy as usize);
                    if depth < frame.depth_at(sx, sy) {
                        frame.set_pixel(sx, sy, rgba, depth);
                    }
                }
            }
        }
        frame
    }
}
