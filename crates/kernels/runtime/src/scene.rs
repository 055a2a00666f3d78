//! Camera, light and the injected rendering collaborator.
//!
//! The rasterizer is out of scope for vantage: hosts implement [`Screen`]
//! for their renderer. The adaptor owns the [`Camera`] and [`Light`] and
//! hands them to the screen for each draw.

use nalgebra as na;
use serde::{Deserialize, Serialize};

use vantage_foundation::vector_ops::{cross, dot, normalize, scale, sub};
use vantage_foundation::{FrameBuffer, Vec3};

use crate::spherical_buffer::panorama_unproject;

/// Perspective camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    pub position: Vec3,
    pub look_at: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees.
    pub fov_degrees: f64,
    /// Near clip distance.
    pub near: f64,
    /// Far clip distance.
    pub far: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 12.0],
            look_at: [0.0, 0.0, 0.0],
            up: [0.0, 1.0, 0.0],
            fov_degrees: 45.0,
            near: 1.0,
            far: 1000.0,
        }
    }
}

impl Camera {
    /// Unit view direction, or `-z` when position and target coincide.
    pub fn direction(&self) -> Vec3 {
        normalize(sub(self.look_at, self.position)).unwrap_or([0.0, 0.0, -1.0])
    }

    /// Up vector made orthogonal to the view direction.
    pub fn orthogonal_up(&self) -> Vec3 {
        let d = self.direction();
        let up = sub(self.up, scale(d, dot(self.up, d)));
        normalize(up).unwrap_or_else(|| vantage_foundation::vector_ops::any_orthogonal(d))
    }

    /// Right vector (`direction × up`).
    pub fn right(&self) -> Vec3 {
        cross(self.direction(), self.orthogonal_up())
    }

    /// World to eye transform.
    pub fn view_matrix(&self) -> na::Matrix4<f64> {
        let eye = na::Point3::from(self.position);
        let target = na::Point3::from(self.look_at);
        let up = na::Vector3::from(self.orthogonal_up());
        na::Matrix4::look_at_rh(&eye, &target, &up)
    }

    /// Eye to clip transform for an image of the given aspect ratio.
    pub fn projection_matrix(&self, aspect: f64) -> na::Matrix4<f64> {
        na::Perspective3::new(aspect, self.fov_degrees.to_radians(), self.near, self.far)
            .to_homogeneous()
    }

    /// World position of window pixel `(x, y)` at normalized depth `depth`.
    ///
    /// Window coordinates have their origin at the bottom-left pixel.
    pub fn unproject(&self, x: f64, y: f64, depth: f64, width: usize, height: usize) -> Option<Vec3> {
        if width == 0 || height == 0 {
            return None;
        }
        let aspect = width as f64 / height as f64;
        let clip_from_world = self.projection_matrix(aspect) * self.view_matrix();
        let world_from_clip = clip_from_world.try_inverse()?;
        let ndc = na::Vector4::new(
            2.0 * (x + 0.5) / width as f64 - 1.0,
            2.0 * (y + 0.5) / height as f64 - 1.0,
            2.0 * depth - 1.0,
            1.0,
        );
        let world = world_from_clip * ndc;
        if world.w.abs() <= f64::EPSILON {
            return None;
        }
        Some([world.x / world.w, world.y / world.w, world.z / world.w])
    }
}

/// How the pixels of a frame map back to world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    /// Rendered through the camera.
    Perspective(Camera),
    /// Equirectangular panorama stitched from cube faces taken at the
    /// camera position with its near and far planes.
    Panorama(Camera),
}

impl Projection {
    pub fn camera(&self) -> &Camera {
        match self {
            Projection::Perspective(camera) | Projection::Panorama(camera) => camera,
        }
    }

    /// World position of pixel `(x, y)` at normalized depth `depth`.
    pub fn unproject(&self, x: usize, y: usize, depth: f64, width: usize, height: usize) -> Option<Vec3> {
        match self {
            Projection::Perspective(camera) => {
                camera.unproject(x as f64, y as f64, depth, width, height)
            }
            Projection::Panorama(camera) => panorama_unproject(camera, x, y, depth, width, height),
        }
    }
}

/// Point light.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Light {
    pub position: Vec3,
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Inclusive containment test.
    pub fn contains(&self, p: Vec3) -> bool {
        (0..3).all(|i| self.min[i] <= p[i] && p[i] <= self.max[i])
    }

    /// Smallest box enclosing both.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        let mut out = *self;
        for i in 0..3 {
            out.min[i] = out.min[i].min(other.min[i]);
            out.max[i] = out.max[i].max(other.max[i]);
        }
        out
    }

    /// Box enclosing every point, or `None` when empty.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec3>) -> Option<BoundingBox> {
        points.into_iter().fold(None, |acc, p| {
            let b = BoundingBox::new(*p, *p);
            Some(acc.map_or(b, |a: BoundingBox| a.union(&b)))
        })
    }
}

/// Rendering collaborator: a scene of registered objects and a rasterizer.
///
/// Render pipelines register objects between [`Screen::clear`] calls; the
/// adaptor then calls [`Screen::draw`] once per camera it needs.
pub trait Screen {
    /// Drop every registered object.
    fn clear(&mut self);

    /// World-space bounds of the registered objects on this rank.
    fn object_bounds(&self) -> Option<BoundingBox>;

    /// Background color of the scene.
    fn background(&self) -> [u8; 3] {
        [0, 0, 0]
    }

    /// Rasterize the registered objects seen from `camera`.
    fn draw(&mut self, camera: &Camera, light: &Light, width: usize, height: usize) -> FrameBuffer;
}
