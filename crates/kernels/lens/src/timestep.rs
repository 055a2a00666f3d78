//! Divergence-driven timestep controller.
//!
//! Decides which simulation steps are rendered. Analysis steps are queued;
//! once the queue holds `validation_interval` steps the divergence between
//! the previous baseline and the newest step selects a catch-up pattern for
//! the whole queue:
//!
//! | Pattern | Condition                         | Rendered                           |
//! |---------|-----------------------------------|------------------------------------|
//! | A       | `D_prev < thr` and `D < thr`      | every `R`-th queued step           |
//! | B       | `D ≥ thr`                         | every queued step                  |
//! | C       | `D_prev ≥ thr` and `D < thr`      | first half in full, rest as A      |
//!
//! The controller never renders itself: [`TimestepController::push`]
//! returns the steps to render, in step order.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use vantage_runtime::Communicator;

use crate::divergence::{Divergence, GaussianKl};
use crate::error::{LensError, Result};

/// Timestep controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimestepConfig {
    /// Steps are considered when `step % analysis_interval == 0`.
    pub analysis_interval: u64,
    /// Queued steps per divergence evaluation (`L`).
    pub validation_interval: usize,
    /// Coarse sampling factor (`R`); 0 means `L`.
    pub granularity: usize,
    /// Divergence threshold.
    pub threshold: f64,
    /// Divergence reported for zero-variance mismatches; defaults to the threshold.
    pub max_divergence: Option<f64>,
}

impl Default for TimestepConfig {
    fn default() -> Self {
        Self {
            analysis_interval: 1,
            validation_interval: 4,
            granularity: 0,
            threshold: 0.5,
            max_divergence: None,
        }
    }
}

impl TimestepConfig {
    pub fn validate(&self) -> Result<()> {
        if self.analysis_interval == 0 {
            return Err(LensError::invalid("analysis_interval must be > 0"));
        }
        if self.validation_interval == 0 {
            return Err(LensError::invalid("validation_interval must be > 0"));
        }
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(LensError::invalid(format!(
                "threshold must be finite and >= 0, got {}",
                self.threshold
            )));
        }
        if let Some(max) = self.max_divergence {
            if max.is_nan() || max < 0.0 {
                return Err(LensError::invalid("max_divergence must be >= 0"));
            }
        }
        Ok(())
    }

    /// Coarse sampling factor `R`.
    pub fn sampling_factor(&self) -> usize {
        if self.granularity == 0 {
            self.validation_interval
        } else {
            self.granularity
        }
    }

    pub fn is_analysis_step(&self, step: u64) -> bool {
        step % self.analysis_interval == 0
    }

    /// Default divergence function for this configuration.
    pub fn divergence(&self) -> GaussianKl {
        GaussianKl::new(self.max_divergence.unwrap_or(self.threshold))
    }
}

/// Catch-up pattern applied to one validation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    /// Stable before and after: coarse sampling.
    Coarse,
    /// Divergence detected: everything.
    Full,
    /// Settling down: first half in full, then coarse.
    Transition,
}

impl Pattern {
    pub fn select(previous: f64, current: f64, threshold: f64) -> Pattern {
        if current >= threshold {
            Pattern::Full
        } else if previous < threshold {
            Pattern::Coarse
        } else {
            Pattern::Transition
        }
    }

    /// Which of `len` queued steps are rendered with sampling factor `r`.
    pub fn selection(self, len: usize, r: usize) -> Vec<bool> {
        let r = r.max(1);
        let full = match self {
            Pattern::Coarse => 0,
            Pattern::Full => len,
            Pattern::Transition => len / 2,
        };
        (0..len)
            .map(|i| i < full || (i - full + 1) % r == 0)
            .collect()
    }
}

struct Queued<D> {
    step: u64,
    data: D,
    values: Vec<f64>,
}

/// Divergence-driven timestep controller for one rank.
pub struct TimestepController<D> {
    config: TimestepConfig,
    divergence: Box<dyn Divergence>,
    comm: Arc<dyn Communicator>,
    queue: VecDeque<Queued<D>>,
    previous_values: Option<Vec<f64>>,
    previous_divergence: f64,
    divergences: Vec<(u64, f64)>,
    rendered: u64,
    skipped: u64,
}

impl<D> TimestepController<D> {
    pub fn new(config: TimestepConfig, comm: Arc<dyn Communicator>) -> Result<Self> {
        config.validate()?;
        let divergence = Box::new(config.divergence());
        Ok(Self {
            config,
            divergence,
            comm,
            queue: VecDeque::new(),
            previous_values: None,
            previous_divergence: 0.0,
            divergences: Vec::new(),
            rendered: 0,
            skipped: 0,
        })
    }

    pub fn with_divergence(mut self, divergence: Box<dyn Divergence>) -> Self {
        self.divergence = divergence;
        self
    }

    pub fn config(&self) -> &TimestepConfig {
        &self.config
    }

    /// Steps selected for rendering so far.
    pub fn rendered(&self) -> u64 {
        self.rendered
    }

    /// Steps dropped by cadence or coarse sampling so far.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Steps still queued.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// `(time, divergence)` of every validation window.
    pub fn divergences(&self) -> &[(u64, f64)] {
        &self.divergences
    }

    /// Collective: accept one step with this rank's field values.
    ///
    /// Returns the steps to render now, oldest first.
    pub fn push(&mut self, step: u64, data: D, values: Vec<f64>) -> Result<Vec<(u64, D)>> {
        if self.previous_values.is_none() && self.queue.is_empty() {
            self.previous_values = Some(values);
            self.previous_divergence = 0.0;
            self.rendered += 1;
            return Ok(vec![(step, data)]);
        }
        if !self.config.is_analysis_step(step) {
            self.skipped += 1;
            return Ok(Vec::new());
        }

        self.queue.push_back(Queued { step, data, values });
        if self.queue.len() < self.config.validation_interval {
            return Ok(Vec::new());
        }

        let current = match (self.previous_values.as_deref(), self.queue.back()) {
            (Some(previous), Some(back)) => self.divergence.divergence(previous, &back.values),
            _ => 0.0,
        };
        let current = self.comm.all_reduce_max(current)?;
        self.divergences.push((step, current));

        let pattern = Pattern::select(self.previous_divergence, current, self.config.threshold);
        let selection = pattern.selection(self.queue.len(), self.config.sampling_factor());
        debug!(step, divergence = current, ?pattern, "validation window");

        self.previous_values = self.queue.back().map(|q| q.values.clone());
        self.previous_divergence = current;

        let mut out = Vec::new();
        for (queued, render) in self.queue.drain(..).zip(selection) {
            if render {
                out.push((queued.step, queued.data));
            } else {
                self.skipped += 1;
            }
        }
        self.rendered += out.len() as u64;
        Ok(out)
    }

    /// Final step: every queued step is rendered.
    pub fn finish(&mut self) -> Vec<(u64, D)> {
        let out: Vec<(u64, D)> = self.queue.drain(..).map(|q| (q.step, q.data)).collect();
        self.rendered += out.len() as u64;
        out
    }
}
