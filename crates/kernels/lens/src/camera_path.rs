//! Entropy-driven camera path controller.
//!
//! Simulation steps arrive in order. Most are only cached; on entropy
//! steps every candidate location is rendered and scored, and the best
//! one becomes the next key frame. Once two consecutive keys (plus the
//! neighbours the interpolator needs) are known, the steps cached between
//! them are rendered along an interpolated camera path.
//!
//! # Processing model
//!
//! - **Arrival** records the step in the open segment.
//! - **Evaluation** renders all candidates, commits a key and closes the
//!   open segment. The evaluated step anchors the next segment.
//! - **Commit** builds the path of a closed segment once its keys are
//!   known and drains the segment against it. Nothing already cached is
//!   modified in place: the segment is moved out, paired with fresh path
//!   points and consumed.
//!
//! Every cached step is rendered at least once and never dropped. Frames of
//! one step carry a sub index; the key frame of an evaluated step is sub 0.
//!
//! # Zoom
//!
//! With `zoom_levels > 1` and a focus point, an evaluation also renders
//! `zoom_levels` cameras on the line from the winning candidate toward the
//! focus (level `k` at `k / zoom_levels` of the way). The highest-entropy
//! level, lowest level on ties, becomes the key position.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use vantage_foundation::vector_ops::{length, lerp};
use vantage_foundation::{FrameBuffer, Vec3};
use vantage_runtime::adaptor::OMNI_NEAR;
use vantage_runtime::reductions::max_indexed;
use vantage_runtime::viewpoint::orientation_for;
use vantage_runtime::{Camera, Communicator, Direction, Location, Projection, TimingTable};

use crate::entropy::{EntropyConfig, EntropyFunction};
use crate::error::{LensError, Result};
use crate::focus::{FocusConfig, FocusEstimator};
use crate::interpolation::{InterpolatorKind, KeyRotations, RotationInterpolator};
use crate::path::{KeyFrame, PathPoint, SegmentCurve, frames_per_step, interior_points};
use crate::report::{PathReport, write_entropy_table, write_zoom_entropy_table};

/// Timer of the zoom search, written as `zoom_proc_time.csv`.
pub const TIMER_ZOOM: &str = "zoom";

/// Camera path controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CameraPathConfig {
    /// Steps are analysed when `step % analysis_interval == 0`.
    pub analysis_interval: u64,
    /// Analysis steps between candidate evaluations.
    pub entropy_interval: u64,
    /// Camera travel budget per frame.
    pub delta: f64,
    /// Cached steps that force an evaluation; defaults to `entropy_interval`.
    pub cache_size: Option<usize>,
    /// Score margin a candidate needs over the current best to replace it.
    pub min_separation: f64,
    /// Direction used for path frames.
    pub direction: Direction,
    /// Cameras searched between a key candidate and its focus; 1 disables zoom.
    pub zoom_levels: usize,
    pub entropy: EntropyConfig,
    pub interpolator: InterpolatorKind,
    pub focus: FocusConfig,
}

impl Default for CameraPathConfig {
    fn default() -> Self {
        Self {
            analysis_interval: 1,
            entropy_interval: 4,
            delta: 0.1,
            cache_size: None,
            min_separation: 0.0,
            direction: Direction::Uni,
            zoom_levels: 1,
            entropy: EntropyConfig::default(),
            interpolator: InterpolatorKind::default(),
            focus: FocusConfig::default(),
        }
    }
}

impl CameraPathConfig {
    pub fn validate(&self) -> Result<()> {
        if self.analysis_interval == 0 {
            return Err(LensError::invalid("analysis_interval must be > 0"));
        }
        if self.entropy_interval == 0 {
            return Err(LensError::invalid("entropy_interval must be > 0"));
        }
        if self
            .analysis_interval
            .checked_mul(self.entropy_interval)
            .is_none()
        {
            return Err(LensError::invalid(format!(
                "analysis_interval * entropy_interval overflows ({} * {})",
                self.analysis_interval, self.entropy_interval
            )));
        }
        if self.zoom_levels == 0 {
            return Err(LensError::invalid("zoom_levels must be > 0"));
        }
        if !(self.delta.is_finite() && self.delta > 0.0) {
            return Err(LensError::invalid(format!(
                "delta must be positive, got {}",
                self.delta
            )));
        }
        if self.cache_size == Some(0) {
            return Err(LensError::invalid("cache_size must be > 0"));
        }
        if self.min_separation.is_nan() || self.min_separation < 0.0 {
            return Err(LensError::invalid("min_separation must be >= 0"));
        }
        if let FocusConfig::TileEntropy { frame_divs: 0 } = self.focus {
            return Err(LensError::invalid("frame_divs must be > 0"));
        }
        Ok(())
    }

    pub fn cache_size(&self) -> usize {
        self.cache_size
            .unwrap_or_else(|| self.entropy_interval.max(1) as usize)
    }

    pub fn is_analysis_step(&self, step: u64) -> bool {
        step % self.analysis_interval == 0
    }

    /// Steps between evaluations; saturates on configs `validate` rejects.
    pub fn entropy_period(&self) -> u64 {
        self.analysis_interval
            .saturating_mul(self.entropy_interval)
            .max(1)
    }

    pub fn is_entropy_step(&self, step: u64) -> bool {
        step % self.entropy_period() == 0
    }
}

/// Rendering collaborator of the controller.
///
/// All methods except `projection_for` are collectives.
pub trait PathRenderer<D> {
    /// Render `data` from every candidate. Root frames are composites.
    fn render_candidates(
        &mut self,
        step: u64,
        data: &D,
        candidates: &[Location],
    ) -> vantage_runtime::Result<Vec<FrameBuffer>>;

    /// Render `data` from `location` and write it as frame `sub` of `step`.
    fn render_frame(
        &mut self,
        step: u64,
        sub: usize,
        data: &D,
        location: &Location,
    ) -> vantage_runtime::Result<()>;

    /// Projection that produced `frame`, the candidate frame of `location`.
    fn projection_for(&self, location: &Location, _frame: &FrameBuffer) -> Projection {
        let camera = Camera {
            position: location.position,
            look_at: location.look_at,
            up: location.up_vector,
            ..Camera::default()
        };
        match location.direction {
            Direction::Omni => Projection::Panorama(Camera {
                near: OMNI_NEAR,
                ..camera
            }),
            _ => Projection::Perspective(camera),
        }
    }
}

/// One cached simulation step.
#[derive(Debug, Clone)]
pub struct CachedStep<D> {
    pub step: u64,
    pub data: D,
}

/// Steps between one key and the next.
struct Segment<D> {
    anchor: CachedStep<D>,
    steps: Vec<CachedStep<D>>,
    start_key: usize,
}

/// Index of the best score: strict improvement by more than `margin`,
/// first index wins ties.
pub fn select_best(scores: &[f64], margin: f64) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &score) in scores.iter().enumerate() {
        match best {
            Some(b) if score <= scores[b] + margin => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Entropy-based camera path controller for one rank.
pub struct CameraPathController<D> {
    config: CameraPathConfig,
    candidates: Vec<Location>,
    entropy: Box<dyn EntropyFunction>,
    interpolator: Box<dyn RotationInterpolator>,
    focus: Box<dyn FocusEstimator>,
    comm: Arc<dyn Communicator>,
    keys: Vec<KeyFrame>,
    rotations: KeyRotations,
    open: Option<Segment<D>>,
    closed: VecDeque<Segment<D>>,
    report: PathReport,
    report_dir: Option<PathBuf>,
    timers: TimingTable,
}

impl<D> CameraPathController<D> {
    /// Controller choosing among `candidates`, with strategies built from `config`.
    pub fn new(
        config: CameraPathConfig,
        candidates: Vec<Location>,
        comm: Arc<dyn Communicator>,
    ) -> Result<Self> {
        config.validate()?;
        if candidates.is_empty() {
            return Err(LensError::EmptyViewpoint);
        }
        let entropy = config.entropy.build()?;
        let interpolator = config.interpolator.build();
        let focus = config.focus.build();
        Ok(Self {
            config,
            candidates,
            entropy,
            interpolator,
            focus,
            comm,
            keys: Vec::new(),
            rotations: KeyRotations::default(),
            open: None,
            closed: VecDeque::new(),
            report: PathReport::default(),
            report_dir: None,
            timers: TimingTable::with_timers(&[TIMER_ZOOM]),
        })
    }

    pub fn with_entropy(mut self, entropy: Box<dyn EntropyFunction>) -> Self {
        self.entropy = entropy;
        self
    }

    pub fn with_interpolator(mut self, interpolator: Box<dyn RotationInterpolator>) -> Self {
        self.interpolator = interpolator;
        self
    }

    pub fn with_focus(mut self, focus: Box<dyn FocusEstimator>) -> Self {
        self.focus = focus;
        self
    }

    /// Directory receiving per-step entropy tables (root only).
    pub fn set_report_dir(&mut self, dir: impl Into<PathBuf>) {
        self.report_dir = Some(dir.into());
    }

    pub fn config(&self) -> &CameraPathConfig {
        &self.config
    }

    pub fn candidates(&self) -> &[Location] {
        &self.candidates
    }

    pub fn keys(&self) -> &[KeyFrame] {
        &self.keys
    }

    pub fn report(&self) -> &PathReport {
        &self.report
    }

    /// Zoom search timer, one stamp per evaluation.
    pub fn timers(&self) -> &TimingTable {
        &self.timers
    }

    /// Steps waiting in the open segment.
    pub fn cached(&self) -> usize {
        self.open.as_ref().map_or(0, |s| s.steps.len())
    }

    /// Closed segments waiting for their path.
    pub fn pending_segments(&self) -> usize {
        self.closed.len()
    }

    /// Handle the arrival of an analysis step.
    pub fn push(&mut self, renderer: &mut impl PathRenderer<D>, step: u64, data: D) -> Result<()> {
        let evaluate = match &self.open {
            None => true,
            Some(open) => {
                self.config.is_entropy_step(step) || open.steps.len() >= self.config.cache_size()
            }
        };
        if evaluate {
            return self.evaluate(renderer, step, data);
        }
        if let Some(open) = self.open.as_mut() {
            open.steps.push(CachedStep { step, data });
        }
        Ok(())
    }

    fn evaluate(&mut self, renderer: &mut impl PathRenderer<D>, step: u64, data: D) -> Result<()> {
        let started = Instant::now();
        let frames = renderer.render_candidates(step, &data, &self.candidates)?;

        let local: Vec<f64> = if self.comm.is_root() {
            frames.iter().map(|f| self.entropy.entropy(f)).collect()
        } else {
            Vec::new()
        };
        let scores = self.comm.broadcast_f64s(&local)?;
        if scores.len() != self.candidates.len() {
            return Err(vantage_runtime::Error::Communication(format!(
                "received {} scores for {} candidates",
                scores.len(),
                self.candidates.len()
            ))
            .into());
        }
        let best = select_best(&scores, self.config.min_separation).ok_or(LensError::EmptyViewpoint)?;
        let candidate = self.candidates[best];

        let focus = if self.comm.is_root() {
            frames.get(best).and_then(|frame| {
                let projection = renderer.projection_for(&candidate, frame);
                self.focus.estimate(frame, &projection, self.entropy.as_ref())
            })
        } else {
            None
        };
        let focus = self.share_focus(focus)?;

        let position = match focus {
            Some(at) if self.config.zoom_levels > 1 => {
                self.zoom(renderer, step, &data, candidate.position, at)?
            }
            _ => candidate.position,
        };
        self.timers.timer(TIMER_ZOOM).stamp();

        let rotation = self.rotations.push(orientation_for(position));
        let key = KeyFrame {
            step,
            location: best,
            entropy: scores[best],
            point: PathPoint {
                radius: length(position),
                rotation,
                focus,
            },
        };
        self.keys.push(key);
        let key_index = self.keys.len() - 1;

        if self.comm.is_root() {
            if let Some(dir) = &self.report_dir {
                if let Err(e) = write_entropy_table(dir, step, &scores) {
                    warn!(step, "cannot write entropy table: {e}");
                }
            }
        }
        self.report.record_key(step, key.entropy);
        self.report.record_calc_time(step, started.elapsed().as_secs_f64());
        info!(step, location = best, entropy = key.entropy, "key viewpoint selected");

        let location = key.point.to_location(self.config.direction);
        renderer.render_frame(step, 0, &data, &location)?;
        self.report.record_frame(step, location.position);

        if let Some(open) = self.open.take() {
            self.closed.push_back(open);
        }
        self.open = Some(Segment {
            anchor: CachedStep { step, data },
            steps: Vec::new(),
            start_key: key_index,
        });
        self.commit_ready(renderer, false)
    }

    /// Collective: render the zoom levels from `from` toward `at` and return
    /// the position of the best one.
    fn zoom(
        &mut self,
        renderer: &mut impl PathRenderer<D>,
        step: u64,
        data: &D,
        from: Vec3,
        at: Vec3,
    ) -> Result<Vec3> {
        let levels = self.config.zoom_levels;
        let positions: Vec<Vec3> = (0..levels)
            .map(|level| lerp(from, at, level as f64 / levels as f64))
            .collect();
        let locations: Vec<Location> = positions
            .iter()
            .map(|&p| {
                PathPoint {
                    radius: length(p),
                    rotation: orientation_for(p),
                    focus: Some(at),
                }
                .to_location(self.config.direction)
            })
            .collect();

        self.timers.timer(TIMER_ZOOM).start();
        let frames = renderer.render_candidates(step, data, &locations)?;
        let local: Vec<f64> = if self.comm.is_root() {
            frames.iter().map(|f| self.entropy.entropy(f)).collect()
        } else {
            Vec::new()
        };
        self.timers.timer(TIMER_ZOOM).stop();

        let entropies = self.comm.broadcast_f64s(&local)?;
        let best = max_indexed(&entropies).filter(|_| entropies.len() == levels);
        let Some(best) = best else {
            return Err(vantage_runtime::Error::Communication(format!(
                "received {} zoom entropies for {levels} levels",
                entropies.len()
            ))
            .into());
        };
        let (level, position) = (best.index, positions[best.index]);

        if self.comm.is_root() {
            if let Some(dir) = &self.report_dir {
                if let Err(e) = write_zoom_entropy_table(dir, step, &entropies) {
                    warn!(step, "cannot write zoom entropy table: {e}");
                }
            }
        }
        self.report.record_zoom(step, level, best.value);
        debug!(step, level, entropy = best.value, "zoom level selected");
        Ok(position)
    }

    fn share_focus(&self, focus: Option<Vec3>) -> Result<Option<Vec3>> {
        let payload = match focus {
            Some([x, y, z]) => vec![1.0, x, y, z],
            None => vec![0.0, 0.0, 0.0, 0.0],
        };
        let shared = self.comm.broadcast_f64s(&payload)?;
        Ok(match shared.as_slice() {
            [flag, x, y, z] if *flag > 0.5 => Some([*x, *y, *z]),
            _ => None,
        })
    }

    /// Drain closed segments whose keys are known; with `finishing`,
    /// missing neighbours are clamped to the last key.
    fn commit_ready(&mut self, renderer: &mut impl PathRenderer<D>, finishing: bool) -> Result<()> {
        while let Some(front) = self.closed.front() {
            let needed = front.start_key + 1 + self.interpolator.lookahead();
            if !finishing && needed >= self.keys.len() {
                break;
            }
            let Some(segment) = self.closed.pop_front() else {
                break;
            };
            self.drain(renderer, segment)?;
        }
        Ok(())
    }

    fn drain(&mut self, renderer: &mut impl PathRenderer<D>, segment: Segment<D>) -> Result<()> {
        let Some(curve) = SegmentCurve::new(
            &self.keys,
            &self.rotations,
            self.interpolator.as_ref(),
            segment.start_key,
        ) else {
            warn!(
                start_key = segment.start_key,
                "segment without end key, rendering at its anchor key"
            );
            return self.render_at_key(renderer, segment.start_key, segment.steps);
        };
        let arc_length = curve.arc_length();
        let frames = frames_per_step(arc_length, self.config.entropy_interval, self.config.delta);
        let points = interior_points(&curve, segment.steps.len(), frames);
        debug!(
            start_key = segment.start_key,
            cached = segment.steps.len(),
            arc_length,
            frames,
            points = points.len(),
            "drawing camera path"
        );

        let mut queue: VecDeque<CachedStep<D>> = VecDeque::with_capacity(segment.steps.len() + 1);
        queue.push_back(segment.anchor);
        queue.extend(segment.steps);

        // the anchor's key frame is already out
        let mut rendered = 1;
        for point in points {
            while rendered >= frames {
                queue.pop_front();
                rendered = 0;
            }
            let Some(front) = queue.front() else {
                break;
            };
            let location = point.to_location(self.config.direction);
            renderer.render_frame(front.step, rendered, &front.data, &location)?;
            self.report.record_frame(front.step, location.position);
            rendered += 1;
        }
        Ok(())
    }

    fn render_at_key(
        &mut self,
        renderer: &mut impl PathRenderer<D>,
        key: usize,
        steps: Vec<CachedStep<D>>,
    ) -> Result<()> {
        let Some(key) = self.keys.get(key).copied() else {
            return Ok(());
        };
        let location = key.point.to_location(self.config.direction);
        for cached in steps {
            renderer.render_frame(cached.step, 0, &cached.data, &location)?;
            self.report.record_frame(cached.step, location.position);
        }
        Ok(())
    }

    /// Final step: commit every closed segment and render the steps cached
    /// after the last key at that key's exact parameters.
    pub fn finish(&mut self, renderer: &mut impl PathRenderer<D>) -> Result<()> {
        self.commit_ready(renderer, true)?;
        if let Some(open) = self.open.take() {
            let trailing = open.steps.len();
            self.render_at_key(renderer, open.start_key, open.steps)?;
            debug!(trailing, "trailing steps rendered at final key");
        }
        info!(
            keys = self.keys.len(),
            steps = self.report.steps_rendered(),
            frames = self.report.frames_rendered(),
            "camera path finished"
        );
        Ok(())
    }

    /// Root: write the path tables into `dir`.
    pub fn write_reports(&self, dir: &std::path::Path) -> Result<()> {
        if self.comm.is_root() {
            self.report.write(dir, &self.candidates)?;
            if self.config.zoom_levels > 1 {
                self.timers.write_csv(&dir.join("zoom_proc_time.csv"))?;
            }
        }
        Ok(())
    }
}
