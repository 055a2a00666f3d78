//! Statistical divergence between two field-value samples.

/// Distance between the value distributions of two steps.
pub trait Divergence: Send + Sync {
    /// Divergence of `current` from `previous`; never NaN.
    fn divergence(&self, previous: &[f64], current: &[f64]) -> f64;
}

/// Running mean and population variance (Welford).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OnlineStats {
    count: u64,
    mean: f64,
    m2: f64,
}

impl OnlineStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn variance(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            (self.m2 / self.count as f64).max(0.0)
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}

impl FromIterator<f64> for OnlineStats {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut stats = OnlineStats::default();
        for v in iter {
            stats.push(v);
        }
        stats
    }
}

/// Closed-form KL divergence between Gaussian fits of both samples.
///
/// When either sample has zero variance the divergence is 0 if both fits
/// are identical and `max` otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianKl {
    pub max: f64,
}

impl GaussianKl {
    pub fn new(max: f64) -> Self {
        Self { max }
    }
}

impl Divergence for GaussianKl {
    fn divergence(&self, previous: &[f64], current: &[f64]) -> f64 {
        let p0: OnlineStats = previous.iter().copied().collect();
        let p1: OnlineStats = current.iter().copied().collect();
        let (m0, s0) = (p0.mean(), p0.std_dev());
        let (m1, s1) = (p1.mean(), p1.std_dev());

        if s0 == 0.0 || s1 == 0.0 {
            return if m0 == m1 && s0 == s1 { 0.0 } else { self.max };
        }
        let d = (s1 / s0).ln() + (s0 * s0 + (m0 - m1) * (m0 - m1)) / (2.0 * s1 * s1) - 0.5;
        if d.is_finite() { d.max(0.0) } else { self.max }
    }
}
