//! Frame readback and compositing adaptor.
//!
//! The [`Adaptor`] turns one [`Location`] plus the current scene into one
//! globally merged [`FrameBuffer`]:
//!
//! 1. **Prepare** - clear the screen and run every render pipeline on the
//!    step data so it registers its objects
//! 2. **Readback** - position the camera, draw the local partition and
//!    read back color + depth (six times for omnidirectional locations)
//! 3. **Composite** - merge the partial images of all ranks
//! 4. **Write** - the root writes the composite, every rank may write its
//!    partial layers
//!
//! Readback and compositing are collectives: every rank calls them with
//! the same locations in the same order.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use vantage_foundation::vector_ops::{add, sub};
use vantage_foundation::{FrameBuffer, Quat};

use crate::comm::Communicator;
use crate::compositor::{DepthCompositor, ImageCompositor};
use crate::error::{Error, Result};
use crate::image_sink::{FileImageSink, ImageSink, Layers, NullImageSink};
use crate::output::{DEFAULT_PREFIX, OutputDirectory};
use crate::scene::{Camera, Light, Screen};
use crate::spherical_buffer::{CubeFace, SphericalBuffer};
use crate::timer::TimingTable;
use crate::viewpoint::{Direction, Location, Viewpoint};

/// Timer for drawing the local partition.
pub const TIMER_RENDER: &str = "rend";
/// Timer for cross-rank compositing.
pub const TIMER_COMPOSITE: &str = "comp";
/// Timer for writing images.
pub const TIMER_SAVE: &str = "save";
/// Timer for running render pipelines.
pub const TIMER_PIPELINE: &str = "pipe";

/// Field of view used for cube faces.
pub const OMNI_FOV_DEGREES: f64 = 90.0;
/// Near clip distance used for cube faces.
pub const OMNI_NEAR: f64 = 0.1;

/// Adaptor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdaptorConfig {
    /// Width of one rendered image (one cube face for omni locations).
    pub width: usize,
    /// Height of one rendered image.
    pub height: usize,
    /// Base output directory.
    pub output_dir: PathBuf,
    /// File stem prefix of every written image.
    pub basename: String,
    /// Prefix of the per-rank sub-directories.
    pub prefix: String,
    pub depth_test: bool,
    /// Plain `exec` renders every n-th step.
    pub visualization_interval: u64,
    /// Partial layer images written per rank.
    pub layers: Layers,
    /// Write timing tables at finalize.
    pub timing: bool,
}

impl Default for AdaptorConfig {
    fn default() -> Self {
        Self {
            width: 512,
            height: 512,
            output_dir: PathBuf::from("output"),
            basename: "output".to_string(),
            prefix: DEFAULT_PREFIX.to_string(),
            depth_test: true,
            visualization_interval: 1,
            layers: Layers::default(),
            timing: true,
        }
    }
}

impl AdaptorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidConfig(format!(
                "image size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.visualization_interval == 0 {
            return Err(Error::InvalidConfig(
                "visualization_interval must be > 0".to_string(),
            ));
        }
        if self.basename.is_empty() {
            return Err(Error::InvalidConfig("basename must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Callback registering the objects of one step into the screen.
pub type RenderPipeline<S, D> = Box<dyn FnMut(&mut S, &D)>;

/// Render/readback/composite orchestration for one rank.
pub struct Adaptor<S: Screen, D> {
    config: AdaptorConfig,
    screen: S,
    pipelines: Vec<RenderPipeline<S, D>>,
    viewpoint: Viewpoint,
    comm: Arc<dyn Communicator>,
    compositor: Box<dyn ImageCompositor>,
    camera: Camera,
    light: Light,
    output: Option<OutputDirectory>,
    frame_sink: Box<dyn ImageSink>,
    layer_sink: Box<dyn ImageSink>,
    last_partial: Option<FrameBuffer>,
    timers: TimingTable,
    time_step: u64,
    initialized: bool,
}

impl<S: Screen, D> Adaptor<S, D> {
    /// Adaptor compositing through a [`DepthCompositor`] on `comm`.
    pub fn new(
        config: AdaptorConfig,
        screen: S,
        viewpoint: Viewpoint,
        comm: Arc<dyn Communicator>,
    ) -> Self {
        let compositor = Box::new(DepthCompositor::new(Arc::clone(&comm)));
        Self {
            config,
            screen,
            pipelines: Vec::new(),
            viewpoint,
            comm,
            compositor,
            camera: Camera::default(),
            light: Light::default(),
            output: None,
            frame_sink: Box::new(NullImageSink),
            layer_sink: Box::new(NullImageSink),
            last_partial: None,
            timers: TimingTable::with_timers(&[
                TIMER_RENDER,
                TIMER_COMPOSITE,
                TIMER_SAVE,
                TIMER_PIPELINE,
            ]),
            time_step: 0,
            initialized: false,
        }
    }

    /// Replace the merge primitive. Must be called before `initialize`.
    pub fn with_compositor(mut self, compositor: Box<dyn ImageCompositor>) -> Self {
        self.compositor = compositor;
        self
    }

    pub fn add_pipeline(&mut self, pipeline: impl FnMut(&mut S, &D) + 'static) {
        self.pipelines.push(Box::new(pipeline));
    }

    pub fn config(&self) -> &AdaptorConfig {
        &self.config
    }

    pub fn viewpoint(&self) -> &Viewpoint {
        &self.viewpoint
    }

    pub fn comm(&self) -> &Arc<dyn Communicator> {
        &self.comm
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
    }

    pub fn screen(&self) -> &S {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut S {
        &mut self.screen
    }

    pub fn timers(&self) -> &TimingTable {
        &self.timers
    }

    pub fn timers_mut(&mut self) -> &mut TimingTable {
        &mut self.timers
    }

    pub fn time_step(&self) -> u64 {
        self.time_step
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Output directories, once initialized.
    pub fn output(&self) -> Option<&OutputDirectory> {
        self.output.as_ref()
    }

    /// Collective: create the output tree, initialize the compositor and
    /// open the image sinks.
    ///
    /// A failure on any rank makes every rank return an error.
    pub fn initialize(&mut self) -> Result<()> {
        self.config.validate()?;

        let mut output = OutputDirectory::new(&self.config.output_dir, &self.config.prefix);
        output.create(self.comm.as_ref())?;

        let status = self.compositor.initialize(
            self.config.width,
            self.config.height,
            self.config.depth_test,
        );
        if let Err(e) = &status {
            error!(rank = self.comm.rank(), "compositor initialization failed: {e}");
        }
        if self.comm.all_reduce_any(status.is_err())? {
            return match status {
                Err(e) => Err(e),
                Ok(()) => Err(Error::InitializationAborted(
                    "a peer rank failed to initialize the compositor".to_string(),
                )),
            };
        }

        if self.comm.is_root() {
            self.frame_sink = Box::new(FileImageSink::new(output.base())?);
        }
        if self.config.layers.any() {
            if let Some(dir) = output.rank_dir() {
                self.layer_sink = Box::new(FileImageSink::new(dir)?);
            }
        }

        info!(
            rank = self.comm.rank(),
            locations = self.viewpoint.len(),
            width = self.config.width,
            height = self.config.height,
            "adaptor initialized"
        );
        self.output = Some(output);
        self.initialized = true;
        Ok(())
    }

    /// Clear the screen and register the objects of `data`.
    pub fn prepare(&mut self, data: &D) {
        self.timers.timer(TIMER_PIPELINE).start();
        self.screen.clear();
        for pipeline in self.pipelines.iter_mut() {
            pipeline(&mut self.screen, data);
        }
        self.timers.timer(TIMER_PIPELINE).stop();
    }

    /// Collective: resolve `Adaptive` against the scene bounds.
    ///
    /// A location is inside the scene when it is inside the bounds of any
    /// rank's partition, so every rank agrees on the result.
    pub fn resolve_direction(&self, location: &Location) -> Result<Direction> {
        match location.direction {
            Direction::Adaptive => {
                let inside = self.is_inside_local_bounds(location);
                if self.comm.all_reduce_any(inside)? {
                    Ok(Direction::Omni)
                } else {
                    Ok(Direction::Uni)
                }
            }
            direction => Ok(direction),
        }
    }

    fn is_inside_local_bounds(&self, location: &Location) -> bool {
        self.screen
            .object_bounds()
            .is_some_and(|b| b.contains(location.position))
    }

    /// Size of the image produced for `location`, judged on local bounds.
    pub fn output_image_size(&self, location: &Location) -> (usize, usize) {
        let omni = match location.direction {
            Direction::Uni => false,
            Direction::Omni => true,
            Direction::Adaptive => self.is_inside_local_bounds(location),
        };
        if omni {
            (self.config.width * 4, self.config.height * 3)
        } else {
            (self.config.width, self.config.height)
        }
    }

    /// Collective: render `location` with minimal camera roll.
    ///
    /// The up vector is the current one rotated by the rotation between the
    /// old and the new view direction.
    pub fn readback(&mut self, location: &Location) -> Result<FrameBuffer> {
        match self.resolve_direction(location)? {
            Direction::Omni => self.readback_omni(location),
            _ => Ok(self.readback_uni(location, false)),
        }
    }

    /// Collective: render `location` using its own up vector.
    pub fn readback_posed(&mut self, location: &Location) -> Result<FrameBuffer> {
        match self.resolve_direction(location)? {
            Direction::Omni => self.readback_omni(location),
            _ => Ok(self.readback_uni(location, true)),
        }
    }

    fn readback_uni(&mut self, location: &Location, posed: bool) -> FrameBuffer {
        let (width, height) = (self.config.width, self.config.height);
        self.last_partial = None;
        if location.is_degenerate() {
            debug!(index = location.index, "camera on its target, background frame");
            return FrameBuffer::background(width, height, self.screen.background());
        }

        let up = if posed {
            location.up_vector
        } else {
            let from = sub(self.camera.position, self.camera.look_at);
            let to = sub(location.position, location.look_at);
            Quat::rotation_between(from, to).rotate(self.camera.up)
        };
        self.camera.position = location.position;
        self.camera.look_at = location.look_at;
        self.camera.up = up;
        self.light.position = location.position;

        let mut frame = self.draw(width, height);
        if self.config.layers.any() {
            self.last_partial = Some(frame.clone());
        }
        self.composite(&mut frame);
        frame
    }

    fn readback_omni(&mut self, location: &Location) -> Result<FrameBuffer> {
        let saved = (self.camera, self.light);
        self.last_partial = None;
        let faces = self.capture_faces(location);
        (self.camera, self.light) = saved;
        let (composite, partial) = faces?;
        if let Some(partial) = partial {
            self.last_partial = Some(partial.stitch()?);
        }
        composite.stitch()
    }

    /// Composited faces, plus this rank's own faces when layers are written.
    fn capture_faces(
        &mut self,
        location: &Location,
    ) -> Result<(SphericalBuffer, Option<SphericalBuffer>)> {
        let (width, height) = (self.config.width, self.config.height);
        let mut sphere = SphericalBuffer::new(width, height);
        let mut partial = self
            .config
            .layers
            .any()
            .then(|| SphericalBuffer::new(width, height));
        self.camera.fov_degrees = OMNI_FOV_DEGREES;
        self.camera.near = OMNI_NEAR;
        self.camera.position = location.position;
        self.light.position = location.position;
        for face in CubeFace::ALL {
            self.camera.look_at = add(location.position, face.direction());
            self.camera.up = face.up_vector();
            let mut frame = self.draw(width, height);
            if let Some(partial) = partial.as_mut() {
                partial.set_face(face, frame.clone())?;
            }
            self.composite(&mut frame);
            sphere.set_face(face, frame)?;
        }
        Ok((sphere, partial))
    }

    fn draw(&mut self, width: usize, height: usize) -> FrameBuffer {
        self.timers.timer(TIMER_RENDER).start();
        let frame = self.screen.draw(&self.camera, &self.light, width, height);
        self.timers.timer(TIMER_RENDER).stop();
        frame
    }

    fn composite(&mut self, frame: &mut FrameBuffer) {
        self.timers.timer(TIMER_COMPOSITE).start();
        if let Err(e) = self.compositor.run(frame) {
            error!(rank = self.comm.rank(), "image compositing failed: {e}");
        }
        self.timers.timer(TIMER_COMPOSITE).stop();
    }

    /// `<basename>_<time:06>_<space:06>`
    pub fn image_name(&self, time: u64, space: usize) -> String {
        format!("{}_{:06}_{:06}", self.config.basename, time, space)
    }

    /// `<basename>_<time:06>_<sub:06>_<space:06>`
    pub fn path_image_name(&self, time: u64, sub: usize, space: usize) -> String {
        format!(
            "{}_{:06}_{:06}_{:06}",
            self.config.basename, time, sub, space
        )
    }

    /// Write the composite (root only) and this rank's partial layers.
    ///
    /// Write failures are logged and skipped.
    pub fn write_frame(&mut self, name: &str, frame: &FrameBuffer) {
        if !self.initialized {
            warn!(name, "adaptor not initialized, frame not written");
            return;
        }
        self.timers.timer(TIMER_SAVE).start();
        if self.comm.is_root() {
            if let Err(e) = self.frame_sink.write_frame(name, frame) {
                error!(name, "cannot write frame: {e}");
            }
        }
        if let Some(partial) = self.last_partial.take() {
            if let Err(e) = self
                .layer_sink
                .write_layers(name, &partial, self.config.layers)
            {
                error!(name, rank = self.comm.rank(), "cannot write layers: {e}");
            }
        }
        self.timers.timer(TIMER_SAVE).stop();
    }

    /// Close the current step: stamp every timer and advance the time step.
    pub fn end_step(&mut self) {
        self.timers.stamp_all();
        self.time_step += 1;
    }

    /// Plain visualization of one step: every location on visualization steps.
    pub fn exec(&mut self, data: &D) -> Result<()> {
        self.prepare(data);
        if self.time_step % self.config.visualization_interval == 0 {
            for i in 0..self.viewpoint.len() {
                let Some(location) = self.viewpoint.at(i).copied() else {
                    continue;
                };
                let frame = self.readback(&location)?;
                let name = self.image_name(self.time_step, location.index);
                self.write_frame(&name, &frame);
            }
        }
        self.end_step();
        Ok(())
    }

    /// Collective: write timing tables, tear down the compositor and close sinks.
    pub fn finalize(&mut self) -> Result<()> {
        if !self.initialized {
            return Ok(());
        }
        if self.config.timing {
            self.write_timings()?;
        }
        self.compositor.destroy()?;
        self.frame_sink.close()?;
        self.layer_sink.close()?;
        self.initialized = false;
        info!(rank = self.comm.rank(), steps = self.time_step, "adaptor finalized");
        Ok(())
    }

    fn write_timings(&mut self) -> Result<()> {
        let rank = self.comm.rank();
        let Some(output) = self.output.as_ref() else {
            return Ok(());
        };
        if let Some(dir) = output.rank_dir() {
            let path = dir.join(format!("vis_proc_time_{rank:04}.csv"));
            if let Err(e) = self.timers.write_csv(&path) {
                error!(path = %path.display(), "cannot write timing table: {e}");
            }
        }
        if let Some(table) = self.timers.aggregate(self.comm.as_ref())? {
            let path = output.base().join("vis_proc_time.csv");
            if let Err(e) = table.write_csv(&path) {
                error!(path = %path.display(), "cannot write timing table: {e}");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::{LocalGroup, SingleProcess};
    use crate::scene::BoundingBox;
    use vantage_foundation::vector_ops::{approx_eq, dot, normalize};

    /// Screen drawing one flat color wherever objects are registered.
    struct FlatScreen {
        color: [u8; 4],
        depth: f32,
        objects: usize,
        bounds: Option<BoundingBox>,
        cameras: Vec<Camera>,
    }

    impl FlatScreen {
        fn new(color: [u8; 4], depth: f32) -> Self {
            Self {
                color,
                depth,
                objects: 0,
                bounds: None,
                cameras: Vec::new(),
            }
        }
    }

    impl Screen for FlatScreen {
        fn clear(&mut self) {
            self.objects = 0;
        }

        fn object_bounds(&self) -> Option<BoundingBox> {
            self.bounds
        }

        fn draw(&mut self, camera: &Camera, _light: &Light, width: usize, height: usize) -> FrameBuffer {
            self.cameras.push(*camera);
            if self.objects == 0 {
                FrameBuffer::background(width, height, self.background())
            } else {
                FrameBuffer::filled(width, height, self.color, self.depth)
            }
        }
    }

    fn config(dir: &std::path::Path) -> AdaptorConfig {
        AdaptorConfig {
            width: 8,
            height: 6,
            output_dir: dir.to_path_buf(),
            ..AdaptorConfig::default()
        }
    }

    fn adaptor(dir: &std::path::Path, screen: FlatScreen) -> Adaptor<FlatScreen, usize> {
        let mut adaptor = Adaptor::new(
            config(dir),
            screen,
            Viewpoint::single(Direction::Uni, [0.0, 0.0, 10.0], [0.0, 1.0, 0.0], [0.0; 3]),
            Arc::new(SingleProcess),
        );
        adaptor.add_pipeline(|screen: &mut FlatScreen, objects: &usize| screen.objects += objects);
        adaptor
    }

    #[test]
    fn test_config_validation() {
        let mut cfg = AdaptorConfig::default();
        assert!(cfg.validate().is_ok());
        cfg.width = 0;
        assert!(cfg.validate().is_err());
        let cfg = AdaptorConfig {
            visualization_interval: 0,
            ..AdaptorConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_degenerate_location_is_background() {
        let tmp = tempfile::tempdir().unwrap();
        let mut adaptor = adaptor(tmp.path(), FlatScreen::new([255, 0, 0, 255], 0.5));
        adaptor.initialize().unwrap();
        adaptor.prepare(&1);
        let loc = Location::new(Direction::Uni, [1.0, 1.0, 1.0], [0.0, 1.0, 0.0], [1.0, 1.0, 1.0]);
        let frame = adaptor.readback(&loc).unwrap();
        assert!(adaptor.screen().cameras.is_empty());
        assert_eq!(frame.pixel(0, 0), [0, 0, 0, 255]);
        assert!(!frame.is_foreground(0));
    }

    #[test]
    fn test_uni_readback_minimizes_roll() {
        let tmp = tempfile::tempdir().unwrap();
        let mut adaptor = adaptor(tmp.path(), FlatScreen::new([255, 0, 0, 255], 0.5));
        adaptor.initialize().unwrap();
        adaptor.prepare(&1);
        // default camera sits on +z with +y up
        let loc = Location::new(Direction::Uni, [10.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0; 3]);
        let frame = adaptor.readback(&loc).unwrap();
        assert_eq!(frame.pixel(3, 3), [255, 0, 0, 255]);
        let camera = adaptor.camera();
        assert!(approx_eq(camera.position, [10.0, 0.0, 0.0]));
        // rotating about y keeps the up vector on y
        let up = normalize(camera.up).unwrap();
        assert!((dot(up, [0.0, 1.0, 0.0]) - 1.0).abs() < 1e-9);

        let posed = adaptor.readback_posed(&loc).unwrap();
        assert_eq!(posed.width(), 8);
        assert!(approx_eq(adaptor.camera().up, [0.0, 0.0, 1.0]));
    }

    #[test]
    fn test_omni_restores_camera() {
        let tmp = tempfile::tempdir().unwrap();
        let mut adaptor = adaptor(tmp.path(), FlatScreen::new([10, 20, 30, 255], 0.25));
        adaptor.initialize().unwrap();
        adaptor.prepare(&1);
        let before = *adaptor.camera();
        let loc = Location::facing_origin(Direction::Omni, [0.0, 3.0, 0.0]);
        assert_eq!(adaptor.output_image_size(&loc), (32, 18));
        let frame = adaptor.readback(&loc).unwrap();
        assert_eq!((frame.width(), frame.height()), (32, 18));
        assert_eq!(frame.pixel(5, 7), [10, 20, 30, 255]);
        assert_eq!(*adaptor.camera(), before);

        let cameras = &adaptor.screen().cameras;
        assert_eq!(cameras.len(), 6);
        assert!(cameras.iter().all(|c| c.fov_degrees == OMNI_FOV_DEGREES));
        assert!(approx_eq(cameras[0].look_at, [1.0, 3.0, 0.0]));
    }

    #[test]
    fn test_adaptive_follows_bounds() {
        let tmp = tempfile::tempdir().unwrap();
        let mut screen = FlatScreen::new([1, 2, 3, 255], 0.5);
        screen.bounds = Some(BoundingBox::new([-1.0; 3], [1.0; 3]));
        let mut adaptor = adaptor(tmp.path(), screen);
        adaptor.initialize().unwrap();
        let inside = Location::facing_origin(Direction::Adaptive, [0.0, 0.5, 0.0]);
        let outside = Location::facing_origin(Direction::Adaptive, [0.0, 5.0, 0.0]);
        assert_eq!(adaptor.resolve_direction(&inside).unwrap(), Direction::Omni);
        assert_eq!(adaptor.resolve_direction(&outside).unwrap(), Direction::Uni);
        assert_eq!(adaptor.output_image_size(&outside), (8, 6));
        assert_eq!(adaptor.readback(&inside).unwrap().width(), 32);
    }

    #[test]
    fn test_exec_writes_images_and_timings() {
        let tmp = tempfile::tempdir().unwrap();
        let mut adaptor = adaptor(tmp.path(), FlatScreen::new([200, 100, 0, 255], 0.5));
        adaptor.initialize().unwrap();
        for _ in 0..3 {
            adaptor.exec(&1).unwrap();
        }
        adaptor.finalize().unwrap();

        assert_eq!(adaptor.time_step(), 3);
        for t in 0..3 {
            assert!(tmp.path().join(format!("output_{t:06}_000000.bmp")).exists());
        }
        assert!(tmp.path().join("manifest.json").exists());
        assert!(tmp.path().join("Process0000/vis_proc_time_0000.csv").exists());
        let table = std::fs::read_to_string(tmp.path().join("vis_proc_time.csv")).unwrap();
        assert!(table.starts_with("rend (min),rend (max),rend (ave)"));
        assert_eq!(table.lines().count(), 4);
    }

    #[test]
    fn test_visualization_interval_and_layers() {
        let tmp = tempfile::tempdir().unwrap();
        let mut adaptor = adaptor(tmp.path(), FlatScreen::new([200, 100, 0, 255], 0.5));
        adaptor.config.visualization_interval = 2;
        adaptor.config.layers.depth = true;
        adaptor.initialize().unwrap();
        for _ in 0..3 {
            adaptor.exec(&1).unwrap();
        }
        adaptor.finalize().unwrap();
        assert!(tmp.path().join("output_000000_000000.bmp").exists());
        assert!(!tmp.path().join("output_000001_000000.bmp").exists());
        assert!(tmp.path().join("output_000002_000000.bmp").exists());
        assert!(tmp.path().join("Process0000/output_000002_000000_depth.bmp").exists());
    }

    #[test]
    fn test_omni_layers_are_stitched() {
        let tmp = tempfile::tempdir().unwrap();
        let mut adaptor = adaptor(tmp.path(), FlatScreen::new([200, 100, 0, 255], 0.5));
        adaptor.config.layers.color = true;
        adaptor.initialize().unwrap();
        adaptor.prepare(&1);
        let loc = Location::facing_origin(Direction::Omni, [0.0, 3.0, 0.0]);
        let frame = adaptor.readback(&loc).unwrap();
        let partial = adaptor.last_partial.clone().expect("omni partial kept");
        assert_eq!((partial.width(), partial.height()), (frame.width(), frame.height()));
        adaptor.write_frame("omni", &frame);
        assert!(adaptor.last_partial.is_none());
        assert!(tmp.path().join("Process0000/omni_color.bmp").exists());
    }

    #[test]
    fn test_image_names() {
        let tmp = tempfile::tempdir().unwrap();
        let adaptor = adaptor(tmp.path(), FlatScreen::new([0; 4], 0.5));
        assert_eq!(adaptor.image_name(12, 3), "output_000012_000003");
        assert_eq!(adaptor.path_image_name(12, 4, 3), "output_000012_000004_000003");
    }

    #[test]
    fn test_ranks_composite_nearest() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().to_path_buf();
        let frames = LocalGroup::run(3, |rank| {
            let r = rank.rank();
            let screen = FlatScreen::new([r as u8 * 50, 0, 0, 255], 0.9 - 0.1 * r as f32);
            let mut adaptor: Adaptor<FlatScreen, usize> = Adaptor::new(
                config(&base),
                screen,
                Viewpoint::single(Direction::Uni, [0.0, 0.0, 10.0], [0.0, 1.0, 0.0], [0.0; 3]),
                Arc::new(rank),
            );
            adaptor.add_pipeline(|s: &mut FlatScreen, n: &usize| s.objects += n);
            adaptor.initialize().unwrap();
            adaptor.exec(&1).unwrap();
            adaptor.finalize().unwrap();
            adaptor.comm().is_root()
        })
        .unwrap();
        assert_eq!(frames, vec![true, false, false]);

        let img = image::open(base.join("output_000000_000000.bmp")).unwrap().to_rgba8();
        // rank 2 is nearest
        assert_eq!(img.get_pixel(0, 0).0, [100, 0, 0, 255]);
        for r in 0..3 {
            assert!(base.join(format!("Process{r:04}")).is_dir());
        }
    }
}
