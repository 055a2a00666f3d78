//! Per-rank stamp timers and timing tables.
//!
//! A [`StampTimer`] accumulates elapsed time over any number of
//! start/stop intervals and records the total as one stamp per step. A
//! [`TimingTable`] groups the timers of one run and writes them as CSV,
//! either per rank or aggregated across ranks as min/max/mean columns.

use std::path::Path;
use std::time::Instant;

use indexmap::IndexMap;

use crate::comm::Communicator;
use crate::error::Result;
use crate::reductions::summarize;

/// Accumulating timer with one stamp per step.
#[derive(Debug, Clone, Default)]
pub struct StampTimer {
    stamps: Vec<f64>,
    pending: f64,
    started: Option<Instant>,
}

impl StampTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self) {
        self.started = Some(Instant::now());
    }

    /// Stop the running interval and add it to the pending total.
    ///
    /// Returns the interval in seconds; zero when not started.
    pub fn stop(&mut self) -> f64 {
        let elapsed = self
            .started
            .take()
            .map_or(0.0, |t| t.elapsed().as_secs_f64());
        self.pending += elapsed;
        elapsed
    }

    /// Record the pending total as a stamp and reset it.
    pub fn stamp(&mut self) {
        self.stamps.push(self.pending);
        self.pending = 0.0;
    }

    /// Record an explicit value as a stamp.
    pub fn stamp_value(&mut self, seconds: f64) {
        self.stamps.push(seconds);
    }

    pub fn stamps(&self) -> &[f64] {
        &self.stamps
    }

    pub fn last(&self) -> Option<f64> {
        self.stamps.last().copied()
    }
}

/// Ordered set of named timers.
#[derive(Debug, Clone, Default)]
pub struct TimingTable {
    timers: IndexMap<String, StampTimer>,
}

impl TimingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the given timers registered in order.
    pub fn with_timers(names: &[&str]) -> Self {
        let mut table = Self::new();
        for name in names {
            table.timer(name);
        }
        table
    }

    /// Timer by name, created on first use.
    pub fn timer(&mut self, name: &str) -> &mut StampTimer {
        self.timers.entry(name.to_string()).or_default()
    }

    pub fn get(&self, name: &str) -> Option<&StampTimer> {
        self.timers.get(name)
    }

    /// Stamp every timer.
    pub fn stamp_all(&mut self) {
        for timer in self.timers.values_mut() {
            timer.stamp();
        }
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Write one column per timer, one row per stamp.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(self.timers.keys())?;
        let rows = self.timers.values().map(|t| t.stamps.len()).max().unwrap_or(0);
        for row in 0..rows {
            writer.write_record(self.timers.values().map(|t| {
                t.stamps
                    .get(row)
                    .map(|v| v.to_string())
                    .unwrap_or_default()
            }))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Collective: min/max/mean of every stamp across ranks.
    ///
    /// Every rank must hold the same timers in the same order. The root
    /// receives a table with `<name> (min)`, `(max)` and `(ave)` columns;
    /// other ranks receive `None`.
    pub fn aggregate(&self, comm: &dyn Communicator) -> Result<Option<TimingTable>> {
        let mut out = TimingTable::new();
        for (name, timer) in &self.timers {
            let Some(per_rank) = comm.gather_f64s(&timer.stamps)? else {
                continue;
            };
            let rows = per_rank.iter().map(Vec::len).max().unwrap_or(0);
            for row in 0..rows {
                let samples: Vec<f64> =
                    per_rank.iter().filter_map(|s| s.get(row).copied()).collect();
                let summary = summarize(&samples);
                out.timer(&format!("{name} (min)")).stamp_value(summary.min);
                out.timer(&format!("{name} (max)")).stamp_value(summary.max);
                out.timer(&format!("{name} (ave)")).stamp_value(summary.mean);
            }
        }
        Ok(comm.is_root().then_some(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::{LocalGroup, SingleProcess};

    #[test]
    fn test_stamp_accumulates_intervals() {
        let mut t = StampTimer::new();
        t.start();
        let a = t.stop();
        t.start();
        let b = t.stop();
        t.stamp();
        assert!((t.last().unwrap() - (a + b)).abs() < 1e-12);
        t.stamp();
        assert_eq!(t.last(), Some(0.0));
    }

    #[test]
    fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = TimingTable::with_timers(&["rend", "comp"]);
        table.timer("rend").stamp_value(0.5);
        table.timer("comp").stamp_value(0.25);
        table.timer("rend").stamp_value(1.5);
        let path = dir.path().join("t.csv");
        table.write_csv(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "rend,comp\n0.5,0.25\n1.5,\n");
    }

    #[test]
    fn test_aggregate_single() {
        let mut table = TimingTable::new();
        table.timer("save").stamp_value(2.0);
        let agg = table.aggregate(&SingleProcess).unwrap().unwrap();
        assert_eq!(agg.get("save (ave)").unwrap().stamps(), &[2.0]);
    }

    #[test]
    fn test_aggregate_across_ranks() {
        let results = LocalGroup::run(2, |comm| {
            let mut table = TimingTable::new();
            table.timer("rend").stamp_value(1.0 + comm.rank() as f64);
            table.aggregate(&comm).unwrap()
        })
        .unwrap();
        let root = results[0].as_ref().unwrap();
        assert_eq!(root.get("rend (min)").unwrap().stamps(), &[1.0]);
        assert_eq!(root.get("rend (max)").unwrap().stamps(), &[2.0]);
        assert_eq!(root.get("rend (ave)").unwrap().stamps(), &[1.5]);
        assert!(results[1].is_none());
    }
}
