//! Collective communication between cooperating ranks.
//!
//! Every rank owns one data partition and runs the same control flow.
//! Collectives must be entered by all ranks the same number of times in
//! the same order; a rank that skips one stalls every other rank.
//!
//! Implementations provide three primitives ([`Communicator::barrier`],
//! [`Communicator::gather`], [`Communicator::broadcast`]); the typed
//! helpers and all-reductions are built on top of them.

pub mod local;

pub use local::{LocalGroup, LocalRank};

use crate::error::{Error, Result};

/// Rank-to-rank collective operations.
pub trait Communicator: Send + Sync {
    /// This rank's id in `0..size`.
    fn rank(&self) -> usize;

    /// Number of cooperating ranks.
    fn size(&self) -> usize;

    /// Rank that holds composited images and writes shared output.
    fn root(&self) -> usize {
        0
    }

    fn is_root(&self) -> bool {
        self.rank() == self.root()
    }

    /// Block until every rank arrives.
    fn barrier(&self) -> Result<()>;

    /// Collect one payload per rank at the root, in rank order.
    ///
    /// Non-root ranks receive `None`.
    fn gather(&self, payload: Vec<u8>) -> Result<Option<Vec<Vec<u8>>>>;

    /// Distribute the root's payload to every rank.
    ///
    /// The payload passed by non-root ranks is ignored.
    fn broadcast(&self, payload: Vec<u8>) -> Result<Vec<u8>>;

    /// Gather `f64` slices at the root.
    fn gather_f64s(&self, values: &[f64]) -> Result<Option<Vec<Vec<f64>>>> {
        match self.gather(encode_f64s(values))? {
            Some(all) => all
                .iter()
                .map(|bytes| decode_f64s(bytes))
                .collect::<Result<Vec<_>>>()
                .map(Some),
            None => Ok(None),
        }
    }

    /// Broadcast the root's `f64` slice.
    fn broadcast_f64s(&self, values: &[f64]) -> Result<Vec<f64>> {
        decode_f64s(&self.broadcast(encode_f64s(values))?)
    }

    /// Maximum of `value` across all ranks, known on every rank.
    fn all_reduce_max(&self, value: f64) -> Result<f64> {
        let reduced = match self.gather_f64s(&[value])? {
            Some(all) => all
                .iter()
                .filter_map(|v| v.first().copied())
                .fold(f64::NEG_INFINITY, f64::max),
            None => 0.0,
        };
        Ok(self
            .broadcast_f64s(&[reduced])?
            .first()
            .copied()
            .unwrap_or(reduced))
    }

    /// True on every rank when any rank passes `true`.
    fn all_reduce_any(&self, flag: bool) -> Result<bool> {
        Ok(self.all_reduce_max(if flag { 1.0 } else { 0.0 })? > 0.0)
    }
}

/// Little-endian encoding of an `f64` slice.
pub fn encode_f64s(values: &[f64]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Inverse of [`encode_f64s`].
pub fn decode_f64s(bytes: &[u8]) -> Result<Vec<f64>> {
    if bytes.len() % 8 != 0 {
        return Err(Error::Communication(format!(
            "f64 payload of {} bytes is not a multiple of 8",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(8)
        .map(|c| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(c);
            f64::from_le_bytes(raw)
        })
        .collect())
}

/// Communicator for a single process: every collective is local.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleProcess;

impl Communicator for SingleProcess {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn barrier(&self) -> Result<()> {
        Ok(())
    }

    fn gather(&self, payload: Vec<u8>) -> Result<Option<Vec<Vec<u8>>>> {
        Ok(Some(vec![payload]))
    }

    fn broadcast(&self, payload: Vec<u8>) -> Result<Vec<u8>> {
        Ok(payload)
    }
}
