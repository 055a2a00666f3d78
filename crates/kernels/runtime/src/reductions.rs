//! Deterministic reductions for cross-rank aggregation.
//!
//! Timing tables gathered from every rank and the entropies of the zoom
//! levels searched toward a focus point are reduced here. Candidate
//! selection applies its own replacement margin and does not use these.
//! Results must not depend on the order in which values arrive, so every
//! reduction follows a fixed binary tree where pairing is determined by
//! index:
//!
//! ```text
//! Values: [v0, v1, v2, v3, v4]
//!
//! Level 0: v0+v1  v2+v3  v4
//! Level 1: (v0+v1)+(v2+v3)  v4
//! Level 2: ((v0+v1)+(v2+v3))+v4
//! ```
//!
//! | Function | Notes |
//! |----------|-------|
//! | [`sum`] | Fixed-tree reduction |
//! | [`mean`] | Computed as sum/count |
//! | [`min_indexed`] | Lowest index wins ties |
//! | [`max_indexed`] | Lowest index wins ties |
//! | [`summarize`] | min / max / mean in one pass |

use std::cmp::Ordering;

/// Result of a min/max reduction that tracks the winning index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexedValue<T> {
    /// The index of the winning element
    pub index: usize,
    /// The value at that index
    pub value: T,
}

impl<T> IndexedValue<T> {
    pub fn new(index: usize, value: T) -> Self {
        Self { index, value }
    }
}

/// Deterministic tree reduction with a binary operation.
///
/// Returns `None` for an empty slice.
pub fn tree_reduce<T, F>(values: &[T], op: F) -> Option<T>
where
    T: Copy,
    F: Fn(T, T) -> T,
{
    let mut current: Vec<T> = values.to_vec();
    if current.is_empty() {
        return None;
    }
    let mut next: Vec<T> = Vec::with_capacity(current.len().div_ceil(2));
    while current.len() > 1 {
        next.clear();
        for pair in current.chunks(2) {
            match pair {
                [a, b] => next.push(op(*a, *b)),
                [a] => next.push(*a),
                _ => {}
            }
        }
        std::mem::swap(&mut current, &mut next);
    }
    current.first().copied()
}

/// Deterministic tree reduction that tracks the winning index.
///
/// `cmp(a, b) == Less` means `a` wins; ties go to the lower index.
pub fn tree_reduce_indexed<T, F>(values: &[T], cmp: F) -> Option<IndexedValue<T>>
where
    T: Copy,
    F: Fn(T, T) -> Ordering,
{
    let indexed: Vec<IndexedValue<T>> = values
        .iter()
        .enumerate()
        .map(|(i, &v)| IndexedValue::new(i, v))
        .collect();
    tree_reduce(&indexed, |a, b| match cmp(a.value, b.value) {
        Ordering::Less => a,
        Ordering::Greater => b,
        Ordering::Equal => {
            if a.index <= b.index {
                a
            } else {
                b
            }
        }
    })
}

/// Deterministic sum.
pub fn sum(values: &[f64]) -> f64 {
    tree_reduce(values, |a, b| a + b).unwrap_or(0.0)
}

/// Deterministic mean; `0.0` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    sum(values) / values.len() as f64
}

/// Minimum with index tracking.
pub fn min_indexed(values: &[f64]) -> Option<IndexedValue<f64>> {
    tree_reduce_indexed(values, |a, b| a.partial_cmp(&b).unwrap_or(Ordering::Equal))
}

/// Maximum with index tracking.
pub fn max_indexed(values: &[f64]) -> Option<IndexedValue<f64>> {
    tree_reduce_indexed(values, |a, b| b.partial_cmp(&a).unwrap_or(Ordering::Equal))
}

/// Minimum value, or `f64::INFINITY` if empty.
pub fn min(values: &[f64]) -> f64 {
    min_indexed(values).map_or(f64::INFINITY, |iv| iv.value)
}

/// Maximum value, or `f64::NEG_INFINITY` if empty.
pub fn max(values: &[f64]) -> f64 {
    max_indexed(values).map_or(f64::NEG_INFINITY, |iv| iv.value)
}

/// Min, max and mean of one column of samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

/// Summarize a set of samples; all zero when empty.
pub fn summarize(values: &[f64]) -> Summary {
    if values.is_empty() {
        return Summary {
            min: 0.0,
            max: 0.0,
            mean: 0.0,
        };
    }
    Summary {
        min: min(values),
        max: max(values),
        mean: mean(values),
    }
}
