//! Output directory bootstrap.
//!
//! Layout: a base directory created by the root, then one sub-directory
//! per rank, `<base>/<prefix><rank:04>/`. Every step is a collective so all
//! ranks agree on failure and abort together.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::comm::Communicator;
use crate::error::{Error, Result};

/// Default per-rank directory prefix.
pub const DEFAULT_PREFIX: &str = "Process";

/// Base and per-rank output directories.
#[derive(Debug, Clone)]
pub struct OutputDirectory {
    base: PathBuf,
    prefix: String,
    rank_dir: Option<PathBuf>,
}

impl OutputDirectory {
    pub fn new(base: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            prefix: prefix.into(),
            rank_dir: None,
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// This rank's directory once created.
    pub fn rank_dir(&self) -> Option<&Path> {
        self.rank_dir.as_deref()
    }

    /// Name of the directory owned by `rank`.
    pub fn rank_dir_name(&self, rank: usize) -> String {
        format!("{}{:04}", self.prefix, rank)
    }

    /// Collective: create the base directory at the root, then one
    /// directory per rank.
    pub fn create(&mut self, comm: &dyn Communicator) -> Result<()> {
        let mut failure = None;
        if comm.is_root() {
            if let Err(e) = fs::create_dir_all(&self.base) {
                error!(path = %self.base.display(), "cannot create output directory: {e}");
                failure = Some(e.to_string());
            }
        }
        if comm.all_reduce_any(failure.is_some())? {
            return Err(Error::OutputDirectory {
                path: self.base.display().to_string(),
                reason: failure.unwrap_or_else(|| "root failed".to_string()),
            });
        }

        let dir = self.base.join(self.rank_dir_name(comm.rank()));
        let mut failure = None;
        if let Err(e) = fs::create_dir_all(&dir) {
            error!(path = %dir.display(), rank = comm.rank(), "cannot create rank directory: {e}");
            failure = Some(e.to_string());
        }
        if comm.all_reduce_any(failure.is_some())? {
            return Err(Error::OutputDirectory {
                path: dir.display().to_string(),
                reason: failure.unwrap_or_else(|| "peer rank failed".to_string()),
            });
        }
        info!(path = %dir.display(), "output directory ready");
        self.rank_dir = Some(dir);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::{LocalGroup, SingleProcess};

    #[test]
    fn test_create_single() {
        let tmp = tempfile::tempdir().unwrap();
        let mut out = OutputDirectory::new(tmp.path().join("run"), DEFAULT_PREFIX);
        out.create(&SingleProcess).unwrap();
        assert!(tmp.path().join("run/Process0000").is_dir());
        assert_eq!(out.rank_dir().unwrap(), tmp.path().join("run/Process0000"));
    }

    #[test]
    fn test_create_per_rank() {
        let tmp = tempfile::tempdir().unwrap();
        let base = tmp.path().join("out");
        LocalGroup::run(3, |comm| {
            let mut out = OutputDirectory::new(&base, "Rank");
            out.create(&comm).unwrap();
        })
        .unwrap();
        for r in 0..3 {
            assert!(base.join(format!("Rank{r:04}")).is_dir());
        }
    }

    #[test]
    fn test_failure_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        let mut out = OutputDirectory::new(blocker.join("nested"), DEFAULT_PREFIX);
        assert!(matches!(
            out.create(&SingleProcess),
            Err(Error::OutputDirectory { .. })
        ));
        assert!(out.rank_dir().is_none());
    }
}
