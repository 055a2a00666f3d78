//! Image entropy functions.
//!
//! Each function scores a composited frame by the Shannon entropy (base 2)
//! of a 256-bin histogram built from its foreground pixels. Background
//! pixels (depth at or beyond 1) never contribute, so an empty frame
//! scores 0 and every score lies in `[0, 8]`.

use serde::{Deserialize, Serialize};

use vantage_foundation::FrameBuffer;

use crate::error::{LensError, Result};

/// Number of histogram bins.
pub const BINS: usize = 256;

/// Scores a frame; higher means more visible structure.
pub trait EntropyFunction: Send + Sync {
    fn entropy(&self, frame: &FrameBuffer) -> f64;
}

/// Shannon entropy (base 2) of a histogram. Empty histograms score 0.
pub fn shannon(histogram: &[u64]) -> f64 {
    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    histogram
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum()
}

fn foreground(frame: &FrameBuffer) -> impl Iterator<Item = usize> + '_ {
    (0..frame.len()).filter(|&i| frame.is_foreground(i))
}

fn srgb_to_linear(c: u8) -> f64 {
    let c = c as f64 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn lab_f(t: f64) -> f64 {
    if t > 0.008856 {
        t.cbrt()
    } else {
        7.787037 * t + 16.0 / 116.0
    }
}

/// CIE L* of an sRGB color, in `[0, 100]`.
pub fn lightness(rgb: [u8; 3]) -> f64 {
    let y = 0.212639 * srgb_to_linear(rgb[0])
        + 0.715169 * srgb_to_linear(rgb[1])
        + 0.072192 * srgb_to_linear(rgb[2]);
    116.0 * (lab_f(y) - 16.0 / 116.0)
}

fn bin(value: f64, range: f64) -> usize {
    ((value / range * BINS as f64).max(0.0) as usize).min(BINS - 1)
}

/// Entropy of perceptual lightness.
#[derive(Debug, Clone, Copy, Default)]
pub struct LightnessEntropy;

impl EntropyFunction for LightnessEntropy {
    fn entropy(&self, frame: &FrameBuffer) -> f64 {
        let mut histogram = [0u64; BINS];
        let color = frame.color();
        for i in foreground(frame) {
            let rgb = [color[i * 4], color[i * 4 + 1], color[i * 4 + 2]];
            histogram[bin(lightness(rgb), 100.0)] += 1;
        }
        shannon(&histogram)
    }
}

/// Mean of the R, G and B channel entropies.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColorEntropy;

impl EntropyFunction for ColorEntropy {
    fn entropy(&self, frame: &FrameBuffer) -> f64 {
        let mut histograms = [[0u64; BINS]; 3];
        let color = frame.color();
        for i in foreground(frame) {
            for (c, histogram) in histograms.iter_mut().enumerate() {
                histogram[color[i * 4 + c] as usize] += 1;
            }
        }
        histograms.iter().map(|h| shannon(h)).sum::<f64>() / 3.0
    }
}

/// Entropy of the depth buffer.
#[derive(Debug, Clone, Copy, Default)]
pub struct DepthEntropy;

impl EntropyFunction for DepthEntropy {
    fn entropy(&self, frame: &FrameBuffer) -> f64 {
        let mut histogram = [0u64; BINS];
        let depth = frame.depth();
        for i in foreground(frame) {
            histogram[bin(depth[i] as f64, 1.0)] += 1;
        }
        shannon(&histogram)
    }
}

/// Convex combination `p·first + (1 − p)·second`.
pub struct MixedEntropy {
    first: Box<dyn EntropyFunction>,
    second: Box<dyn EntropyFunction>,
    proportion: f64,
}

impl MixedEntropy {
    pub fn new(
        first: Box<dyn EntropyFunction>,
        second: Box<dyn EntropyFunction>,
        proportion: f64,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&proportion) {
            return Err(LensError::invalid(format!(
                "mixing proportion must be in [0, 1], got {proportion}"
            )));
        }
        Ok(Self {
            first,
            second,
            proportion,
        })
    }
}

impl EntropyFunction for MixedEntropy {
    fn entropy(&self, frame: &FrameBuffer) -> f64 {
        self.proportion * self.first.entropy(frame)
            + (1.0 - self.proportion) * self.second.entropy(frame)
    }
}

/// Entropy function selection in run documents.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EntropyConfig {
    #[default]
    Lightness,
    Color,
    Depth,
    Mixed {
        first: Box<EntropyConfig>,
        second: Box<EntropyConfig>,
        proportion: f64,
    },
}

impl EntropyConfig {
    pub fn build(&self) -> Result<Box<dyn EntropyFunction>> {
        Ok(match self {
            EntropyConfig::Lightness => Box::new(LightnessEntropy),
            EntropyConfig::Color => Box::new(ColorEntropy),
            EntropyConfig::Depth => Box::new(DepthEntropy),
            EntropyConfig::Mixed {
                first,
                second,
                proportion,
            } => Box::new(MixedEntropy::new(first.build()?, second.build()?, *proportion)?),
        })
    }
}
