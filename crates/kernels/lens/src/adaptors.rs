//! Controlled adaptors.
//!
//! Each adaptor owns a runtime [`Adaptor`] and one or two controllers and
//! exposes the same lifecycle: `initialize`, `exec` once per simulation
//! step, `finalize` once at the end. Every call is a collective.

use tracing::{error, info};

use vantage_foundation::FrameBuffer;
use vantage_runtime::adaptor::{OMNI_FOV_DEGREES, OMNI_NEAR};
use vantage_runtime::{Adaptor, Camera, Direction, Location, Projection, Screen};

use crate::camera_path::{CameraPathConfig, CameraPathController, PathRenderer};
use crate::config::ControllerConfig;
use crate::error::Result;
use crate::report::write_divergence_table;
use crate::timestep::{TimestepConfig, TimestepController};

impl<S: Screen, D> PathRenderer<D> for Adaptor<S, D> {
    fn render_candidates(
        &mut self,
        _step: u64,
        data: &D,
        candidates: &[Location],
    ) -> vantage_runtime::Result<Vec<FrameBuffer>> {
        self.prepare(data);
        candidates
            .iter()
            .map(|location| self.readback_posed(location))
            .collect()
    }

    fn render_frame(
        &mut self,
        step: u64,
        sub: usize,
        data: &D,
        location: &Location,
    ) -> vantage_runtime::Result<()> {
        self.prepare(data);
        let frame = self.readback_posed(location)?;
        let name = self.path_image_name(step, sub, 0);
        self.write_frame(&name, &frame);
        Ok(())
    }

    fn projection_for(&self, location: &Location, frame: &FrameBuffer) -> Projection {
        let camera = Camera {
            position: location.position,
            look_at: location.look_at,
            up: location.up_vector,
            ..*self.camera()
        };
        // adaptive locations resolved to omni show up as stitched panoramas
        let (width, height) = (self.config().width, self.config().height);
        let panorama = (frame.width(), frame.height()) == (4 * width, 3 * height);
        if location.direction != Direction::Uni && panorama {
            Projection::Panorama(Camera {
                fov_degrees: OMNI_FOV_DEGREES,
                near: OMNI_NEAR,
                ..camera
            })
        } else {
            Projection::Perspective(camera)
        }
    }
}

/// Render `steps` from every location of the adaptor's viewpoint.
fn render_steps<S: Screen, D>(adaptor: &mut Adaptor<S, D>, steps: Vec<(u64, D)>) -> Result<()> {
    let locations = adaptor.viewpoint().locations().to_vec();
    for (time, data) in steps {
        adaptor.prepare(&data);
        for location in &locations {
            let frame = adaptor.readback(location)?;
            let name = adaptor.image_name(time, location.index);
            adaptor.write_frame(&name, &frame);
        }
    }
    Ok(())
}

/// Root: write the divergence table into the output base directory.
fn write_divergences<S: Screen, D>(adaptor: &Adaptor<S, D>, controller: &TimestepController<D>) {
    if !adaptor.comm().is_root() {
        return;
    }
    if let Some(output) = adaptor.output() {
        if let Err(e) = write_divergence_table(
            output.base(),
            controller.divergences(),
            controller.config().threshold,
        ) {
            error!("cannot write divergence table: {e}");
        }
    }
}

fn write_path_reports<S: Screen, D>(adaptor: &Adaptor<S, D>, controller: &CameraPathController<D>) {
    if let Some(output) = adaptor.output() {
        if let Err(e) = controller.write_reports(output.base()) {
            error!("cannot write camera path tables: {e}");
        }
    }
}

/// Entropy-driven camera path over the viewpoint's locations.
pub struct CameraPathAdaptor<S: Screen, D> {
    adaptor: Adaptor<S, D>,
    controller: CameraPathController<D>,
}

impl<S: Screen, D> CameraPathAdaptor<S, D> {
    pub fn new(adaptor: Adaptor<S, D>, config: CameraPathConfig) -> Result<Self> {
        let candidates = adaptor.viewpoint().locations().to_vec();
        let controller = CameraPathController::new(config, candidates, adaptor.comm().clone())?;
        Ok(Self {
            adaptor,
            controller,
        })
    }

    pub fn adaptor(&self) -> &Adaptor<S, D> {
        &self.adaptor
    }

    pub fn adaptor_mut(&mut self) -> &mut Adaptor<S, D> {
        &mut self.adaptor
    }

    pub fn controller(&self) -> &CameraPathController<D> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut CameraPathController<D> {
        &mut self.controller
    }

    pub fn initialize(&mut self) -> Result<()> {
        self.adaptor.initialize()?;
        if let Some(output) = self.adaptor.output() {
            self.controller.set_report_dir(output.base());
        }
        Ok(())
    }

    pub fn exec(&mut self, data: D) -> Result<()> {
        let step = self.adaptor.time_step();
        if self.controller.config().is_analysis_step(step) {
            self.controller.push(&mut self.adaptor, step, data)?;
        }
        self.adaptor.end_step();
        Ok(())
    }

    pub fn finalize(&mut self) -> Result<()> {
        self.controller.finish(&mut self.adaptor)?;
        self.adaptor.timers_mut().stamp_all();
        write_path_reports(&self.adaptor, &self.controller);
        self.adaptor.finalize()?;
        Ok(())
    }
}

/// Divergence-gated rendering of every viewpoint location.
pub struct TimestepAdaptor<S: Screen, D> {
    adaptor: Adaptor<S, D>,
    controller: TimestepController<D>,
}

impl<S: Screen, D> TimestepAdaptor<S, D> {
    pub fn new(adaptor: Adaptor<S, D>, config: TimestepConfig) -> Result<Self> {
        let controller = TimestepController::new(config, adaptor.comm().clone())?;
        Ok(Self {
            adaptor,
            controller,
        })
    }

    pub fn adaptor(&self) -> &Adaptor<S, D> {
        &self.adaptor
    }

    pub fn controller(&self) -> &TimestepController<D> {
        &self.controller
    }

    pub fn initialize(&mut self) -> Result<()> {
        Ok(self.adaptor.initialize()?)
    }

    /// One step with this rank's field values.
    pub fn exec(&mut self, data: D, values: Vec<f64>) -> Result<()> {
        let step = self.adaptor.time_step();
        let ready = self.controller.push(step, data, values)?;
        render_steps(&mut self.adaptor, ready)?;
        self.adaptor.end_step();
        Ok(())
    }

    pub fn finalize(&mut self) -> Result<()> {
        let leftover = self.controller.finish();
        render_steps(&mut self.adaptor, leftover)?;
        self.adaptor.timers_mut().stamp_all();
        write_divergences(&self.adaptor, &self.controller);
        info!(
            rendered = self.controller.rendered(),
            skipped = self.controller.skipped(),
            "timestep control finished"
        );
        self.adaptor.finalize()?;
        Ok(())
    }
}

/// Divergence gate feeding the camera path controller.
pub struct CameraPathTimestepAdaptor<S: Screen, D> {
    adaptor: Adaptor<S, D>,
    timestep: TimestepController<D>,
    camera_path: CameraPathController<D>,
}

impl<S: Screen, D> CameraPathTimestepAdaptor<S, D> {
    pub fn new(
        adaptor: Adaptor<S, D>,
        camera_path: CameraPathConfig,
        timestep: TimestepConfig,
    ) -> Result<Self> {
        let candidates = adaptor.viewpoint().locations().to_vec();
        let camera_path =
            CameraPathController::new(camera_path, candidates, adaptor.comm().clone())?;
        let timestep = TimestepController::new(timestep, adaptor.comm().clone())?;
        Ok(Self {
            adaptor,
            timestep,
            camera_path,
        })
    }

    pub fn adaptor(&self) -> &Adaptor<S, D> {
        &self.adaptor
    }

    pub fn timestep(&self) -> &TimestepController<D> {
        &self.timestep
    }

    pub fn camera_path(&self) -> &CameraPathController<D> {
        &self.camera_path
    }

    pub fn initialize(&mut self) -> Result<()> {
        self.adaptor.initialize()?;
        if let Some(output) = self.adaptor.output() {
            self.camera_path.set_report_dir(output.base());
        }
        Ok(())
    }

    pub fn exec(&mut self, data: D, values: Vec<f64>) -> Result<()> {
        let step = self.adaptor.time_step();
        for (time, data) in self.timestep.push(step, data, values)? {
            self.camera_path.push(&mut self.adaptor, time, data)?;
        }
        self.adaptor.end_step();
        Ok(())
    }

    pub fn finalize(&mut self) -> Result<()> {
        for (time, data) in self.timestep.finish() {
            self.camera_path.push(&mut self.adaptor, time, data)?;
        }
        self.camera_path.finish(&mut self.adaptor)?;
        self.adaptor.timers_mut().stamp_all();
        write_divergences(&self.adaptor, &self.timestep);
        write_path_reports(&self.adaptor, &self.camera_path);
        self.adaptor.finalize()?;
        Ok(())
    }
}

/// Adaptor selected by a run document.
pub enum ControlledAdaptor<S: Screen, D> {
    Plain(Adaptor<S, D>),
    CameraPath(CameraPathAdaptor<S, D>),
    Timestep(TimestepAdaptor<S, D>),
    CameraPathTimestep(CameraPathTimestepAdaptor<S, D>),
}

impl<S: Screen, D> ControlledAdaptor<S, D> {
    pub fn new(adaptor: Adaptor<S, D>, controller: &ControllerConfig) -> Result<Self> {
        Ok(match controller {
            ControllerConfig::Plain => ControlledAdaptor::Plain(adaptor),
            ControllerConfig::CameraPath(c) => {
                ControlledAdaptor::CameraPath(CameraPathAdaptor::new(adaptor, c.clone())?)
            }
            ControllerConfig::Timestep(c) => {
                ControlledAdaptor::Timestep(TimestepAdaptor::new(adaptor, c.clone())?)
            }
            ControllerConfig::CameraPathTimestep {
                camera_path,
                timestep,
            } => ControlledAdaptor::CameraPathTimestep(CameraPathTimestepAdaptor::new(
                adaptor,
                camera_path.clone(),
                timestep.clone(),
            )?),
        })
    }

    pub fn adaptor(&self) -> &Adaptor<S, D> {
        match self {
            ControlledAdaptor::Plain(a) => a,
            ControlledAdaptor::CameraPath(a) => a.adaptor(),
            ControlledAdaptor::Timestep(a) => a.adaptor(),
            ControlledAdaptor::CameraPathTimestep(a) => a.adaptor(),
        }
    }

    pub fn initialize(&mut self) -> Result<()> {
        match self {
            ControlledAdaptor::Plain(a) => Ok(a.initialize()?),
            ControlledAdaptor::CameraPath(a) => a.initialize(),
            ControlledAdaptor::Timestep(a) => a.initialize(),
            ControlledAdaptor::CameraPathTimestep(a) => a.initialize(),
        }
    }

    /// One simulation step; `values` feed the divergence gate when present.
    pub fn exec(&mut self, data: D, values: Vec<f64>) -> Result<()> {
        match self {
            ControlledAdaptor::Plain(a) => Ok(a.exec(&data)?),
            ControlledAdaptor::CameraPath(a) => a.exec(data),
            ControlledAdaptor::Timestep(a) => a.exec(data, values),
            ControlledAdaptor::CameraPathTimestep(a) => a.exec(data, values),
        }
    }

    pub fn finalize(&mut self) -> Result<()> {
        match self {
            ControlledAdaptor::Plain(a) => Ok(a.finalize()?),
            ControlledAdaptor::CameraPath(a) => a.finalize(),
            ControlledAdaptor::Timestep(a) => a.finalize(),
            ControlledAdaptor::CameraPathTimestep(a) => a.finalize(),
        }
    }
}
