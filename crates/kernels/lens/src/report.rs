//! CSV report tables.
//!
//! Tables are diagnostics only and never influence control decisions.
//! They are written by the root rank.

use std::path::Path;

use indexmap::IndexMap;
use serde::Serialize;

use vantage_foundation::Vec3;
use vantage_runtime::Location;

use crate::error::Result;

#[derive(Serialize)]
struct EntropyRow {
    #[serde(rename = "Index")]
    index: usize,
    #[serde(rename = "Entropy")]
    entropy: f64,
}

#[derive(Serialize)]
struct TimeEntropyRow {
    #[serde(rename = "Time")]
    time: u64,
    #[serde(rename = "Entropy")]
    entropy: f64,
}

#[derive(Serialize)]
struct TimePositionRow {
    #[serde(rename = "Time")]
    time: u64,
    #[serde(rename = "X")]
    x: f64,
    #[serde(rename = "Y")]
    y: f64,
    #[serde(rename = "Z")]
    z: f64,
}

#[derive(Serialize)]
struct TimeSecondsRow {
    #[serde(rename = "Time")]
    time: u64,
    #[serde(rename = "Seconds")]
    seconds: f64,
}

#[derive(Serialize)]
struct IndexPositionRow {
    #[serde(rename = "Index")]
    index: usize,
    #[serde(rename = "X")]
    x: f64,
    #[serde(rename = "Y")]
    y: f64,
    #[serde(rename = "Z")]
    z: f64,
}

#[derive(Serialize)]
struct FramesRow {
    #[serde(rename = "Time")]
    time: u64,
    #[serde(rename = "Frames")]
    frames: usize,
}

#[derive(Serialize)]
struct ZoomEntropyRow {
    #[serde(rename = "Zoomlevel")]
    level: usize,
    #[serde(rename = "Entropy")]
    entropy: f64,
}

#[derive(Serialize)]
struct ZoomLevelRow {
    #[serde(rename = "Time")]
    time: u64,
    #[serde(rename = "Zoomlevel")]
    level: usize,
    #[serde(rename = "Entropy")]
    entropy: f64,
}

#[derive(Serialize)]
struct DivergenceRow {
    #[serde(rename = "Time")]
    time: u64,
    #[serde(rename = "Divergence")]
    divergence: f64,
    #[serde(rename = "Threshold")]
    threshold: f64,
}

fn write_rows<R: Serialize>(path: &Path, rows: impl IntoIterator<Item = R>) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// `output_entropies_<step:06>.csv`: score of every candidate.
pub fn write_entropy_table(dir: &Path, step: u64, scores: &[f64]) -> Result<()> {
    write_rows(
        &dir.join(format!("output_entropies_{step:06}.csv")),
        scores.iter().enumerate().map(|(index, &entropy)| EntropyRow { index, entropy }),
    )
}

/// `output_zoom_entropies_<step:06>.csv`: score of every zoom level.
pub fn write_zoom_entropy_table(dir: &Path, step: u64, entropies: &[f64]) -> Result<()> {
    write_rows(
        &dir.join(format!("output_zoom_entropies_{step:06}.csv")),
        entropies
            .iter()
            .enumerate()
            .map(|(level, &entropy)| ZoomEntropyRow { level, entropy }),
    )
}

/// `output_divergences.csv`: divergence of every validation window.
pub fn write_divergence_table(dir: &Path, rows: &[(u64, f64)], threshold: f64) -> Result<()> {
    write_rows(
        &dir.join("output_divergences.csv"),
        rows.iter().map(|&(time, divergence)| DivergenceRow {
            time,
            divergence,
            threshold,
        }),
    )
}

/// Camera path bookkeeping of one run.
#[derive(Debug, Clone, Default)]
pub struct PathReport {
    keys: Vec<(u64, f64)>,
    positions: Vec<(u64, Vec3)>,
    calc_times: Vec<(u64, f64)>,
    zoom: Vec<(u64, usize, f64)>,
    frames: IndexMap<u64, usize>,
}

impl PathReport {
    pub fn record_key(&mut self, step: u64, entropy: f64) {
        self.keys.push((step, entropy));
    }

    pub fn record_calc_time(&mut self, step: u64, seconds: f64) {
        self.calc_times.push((step, seconds));
    }

    /// Zoom level chosen on `step` and its entropy.
    pub fn record_zoom(&mut self, step: u64, level: usize, entropy: f64) {
        self.zoom.push((step, level, entropy));
    }

    pub fn zoom_levels(&self) -> &[(u64, usize, f64)] {
        &self.zoom
    }

    /// One rendered frame of `step` from `position`.
    pub fn record_frame(&mut self, step: u64, position: Vec3) {
        self.positions.push((step, position));
        *self.frames.entry(step).or_insert(0) += 1;
    }

    /// Frames per step, in first-render order.
    pub fn frames(&self) -> &IndexMap<u64, usize> {
        &self.frames
    }

    pub fn steps_rendered(&self) -> usize {
        self.frames.len()
    }

    pub fn frames_rendered(&self) -> usize {
        self.frames.values().sum()
    }

    pub fn key_entropies(&self) -> &[(u64, f64)] {
        &self.keys
    }

    pub fn positions(&self) -> &[(u64, Vec3)] {
        &self.positions
    }

    /// Write every path table into `dir`.
    pub fn write(&self, dir: &Path, candidates: &[Location]) -> Result<()> {
        write_rows(
            &dir.join("output_path_entropies.csv"),
            self.keys
                .iter()
                .map(|&(time, entropy)| TimeEntropyRow { time, entropy }),
        )?;
        write_rows(
            &dir.join("output_path_positions.csv"),
            self.positions
                .iter()
                .map(|&(time, [x, y, z])| TimePositionRow { time, x, y, z }),
        )?;
        write_rows(
            &dir.join("output_path_calc_times.csv"),
            self.calc_times
                .iter()
                .map(|&(time, seconds)| TimeSecondsRow { time, seconds }),
        )?;
        write_rows(
            &dir.join("output_viewpoint_coords.csv"),
            candidates.iter().enumerate().map(|(index, l)| IndexPositionRow {
                index,
                x: l.position[0],
                y: l.position[1],
                z: l.position[2],
            }),
        )?;
        write_rows(
            &dir.join("output_num_images.csv"),
            self.frames
                .iter()
                .map(|(&time, &frames)| FramesRow { time, frames }),
        )?;
        if !self.zoom.is_empty() {
            write_rows(
                &dir.join("output_zoom_levels.csv"),
                self.zoom
                    .iter()
                    .map(|&(time, level, entropy)| ZoomLevelRow {
                        time,
                        level,
                        entropy,
                    }),
            )?;
        }
        Ok(())
    }
}
