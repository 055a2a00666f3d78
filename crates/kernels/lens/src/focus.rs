//! Focus point estimation for key frames.
//!
//! Estimators receive the composited key frame together with the
//! [`Projection`] it was rendered with, so tile centres of stitched
//! panoramas are mapped back through the equirectangular inverse rather
//! than a perspective camera.

use serde::{Deserialize, Serialize};

use vantage_foundation::{FrameBuffer, Vec3};
use vantage_runtime::Projection;

use crate::entropy::EntropyFunction;

/// Picks the world point a key camera should look at.
pub trait FocusEstimator: Send + Sync {
    /// Focus for the composited `frame` rendered through `projection`, or
    /// `None` to keep looking at the origin.
    fn estimate(
        &self,
        frame: &FrameBuffer,
        projection: &Projection,
        entropy: &dyn EntropyFunction,
    ) -> Option<Vec3>;
}

/// Always looks at the origin.
#[derive(Debug, Clone, Copy, Default)]
pub struct OriginFocus;

impl FocusEstimator for OriginFocus {
    fn estimate(&self, _: &FrameBuffer, _: &Projection, _: &dyn EntropyFunction) -> Option<Vec3> {
        None
    }
}

/// Focus on the centre of the highest-entropy tile.
#[derive(Debug, Clone, Copy)]
pub struct TileEntropyFocus {
    /// Tiles per image side.
    pub frame_divs: usize,
}

impl TileEntropyFocus {
    /// Tile `(tx, ty)` as `(x, y, width, height)`; edge tiles absorb the remainder.
    fn tile(&self, frame: &FrameBuffer, tx: usize, ty: usize) -> (usize, usize, usize, usize) {
        let divs = self.frame_divs.max(1);
        let (tw, th) = (frame.width() / divs, frame.height() / divs);
        let x = tx * tw;
        let y = ty * th;
        let w = if tx + 1 == divs { frame.width() - x } else { tw };
        let h = if ty + 1 == divs { frame.height() - y } else { th };
        (x, y, w, h)
    }
}

impl FocusEstimator for TileEntropyFocus {
    fn estimate(
        &self,
        frame: &FrameBuffer,
        projection: &Projection,
        entropy: &dyn EntropyFunction,
    ) -> Option<Vec3> {
        let divs = self.frame_divs.max(1);
        if frame.width() < divs || frame.height() < divs {
            return None;
        }

        let mut best: Option<((usize, usize, usize, usize), f64)> = None;
        for ty in 0..divs {
            for tx in 0..divs {
                let region = self.tile(frame, tx, ty);
                let Ok(tile) = frame.crop(region.0, region.1, region.2, region.3) else {
                    continue;
                };
                let score = entropy.entropy(&tile);
                if best.is_none_or(|(_, s)| score > s) {
                    best = Some((region, score));
                }
            }
        }
        let ((x, y, w, h), score) = best?;
        if score <= 0.0 {
            return None;
        }

        let (cx, cy) = (x + w / 2, y + h / 2);
        let mut depth = frame.depth_at(cx, cy);
        if !frame.is_foreground(cy * frame.width() + cx) {
            depth = (y..y + h)
                .flat_map(|py| (x..x + w).map(move |px| (px, py)))
                .map(|(px, py)| frame.depth_at(px, py))
                .filter(|&d| d < vantage_foundation::frame::BACKGROUND_DEPTH)
                .fold(None, |acc: Option<f32>, d| Some(acc.map_or(d, |a| a.min(d))))?;
        }
        projection.unproject(cx, cy, depth as f64, frame.width(), frame.height())
    }
}

/// Focus estimator selection in run documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FocusConfig {
    #[default]
    Origin,
    #[serde(rename_all = "camelCase")]
    TileEntropy { frame_divs: usize },
}

impl FocusConfig {
    pub fn build(self) -> Box<dyn FocusEstimator> {
        match self {
            FocusConfig::Origin => Box::new(OriginFocus),
            FocusConfig::TileEntropy { frame_divs } => Box::new(TileEntropyFocus { frame_divs }),
        }
    }
}
