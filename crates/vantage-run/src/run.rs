//! One rank of a run.

use std::sync::Arc;

use tracing::{info, info_span};

use vantage_lens::{ControlledAdaptor, Result, VisRunConfig};
use vantage_runtime::{Adaptor, Communicator};

use crate::simulation::HeatedSphere;
use crate::splat::{SplatScreen, register_particles};

/// What one rank did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub rank: usize,
    pub particles: usize,
    pub steps: u64,
}

/// Collective: simulate `steps` steps of `sphere` on this rank and feed
/// them through the controller of `config`.
pub fn run_rank(
    config: &VisRunConfig,
    sphere: &HeatedSphere,
    steps: u64,
    comm: Arc<dyn Communicator>,
) -> Result<RunSummary> {
    let rank = comm.rank();
    let span = info_span!("rank", rank);
    let _enter = span.enter();

    let positions = sphere.partition(rank, comm.size());
    let viewpoint = config.viewpoint.build()?;
    let mut adaptor = Adaptor::new(
        config.adaptor.clone(),
        SplatScreen::default(),
        viewpoint,
        comm,
    );
    adaptor.add_pipeline(register_particles);

    let mut controlled = ControlledAdaptor::new(adaptor, &config.controller)?;
    controlled.initialize()?;
    info!(
        particles = positions.len(),
        controller = config.controller.name(),
        "rank ready"
    );

    for step in 0..steps {
        let snapshot = sphere.snapshot(step, &positions);
        let values = snapshot.values();
        controlled.exec(snapshot, values)?;
    }
    controlled.finalize()?;

    Ok(RunSummary {
        rank,
        particles: positions.len(),
        steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use vantage_lens::{CameraPathConfig, ControllerConfig};
    use vantage_runtime::{LocalGroup, SingleProcess};

    fn small_run(dir: &std::path::Path, controller: ControllerConfig) -> VisRunConfig {
        let mut config = VisRunConfig {
            controller,
            ..VisRunConfig::default()
        };
        config.adaptor.output_dir = dir.to_path_buf();
        config.adaptor.width = 24;
        config.adaptor.height = 24;
        config
    }

    fn small_sphere() -> HeatedSphere {
        HeatedSphere {
            resolution: 6,
            ..HeatedSphere::default()
        }
    }

    #[test]
    fn test_plain_run_output_tree() {
        let tmp = tempfile::tempdir().unwrap();
        let config = small_run(tmp.path(), ControllerConfig::Plain);
        let summary = run_rank(&config, &small_sphere(), 3, Arc::new(SingleProcess)).unwrap();
        assert_eq!(summary.rank, 0);
        assert_eq!(summary.steps, 3);
        assert!(summary.particles > 0);

        let locations = config.viewpoint.build().unwrap().len();
        for step in 0..3 {
            for space in 0..locations {
                let image = tmp.path().join(format!("output_{step:06}_{space:06}.bmp"));
                assert!(image.exists(), "{} missing", image.display());
            }
        }
        assert!(tmp.path().join("manifest.json").exists());
        assert!(tmp.path().join("vis_proc_time.csv").exists());
        assert!(tmp.path().join("Process0000/vis_proc_time_0000.csv").exists());
    }

    #[test]
    fn test_camera_path_run_writes_tables() {
        let tmp = tempfile::tempdir().unwrap();
        let config = small_run(
            tmp.path(),
            ControllerConfig::CameraPath(CameraPathConfig {
                entropy_interval: 2,
                delta: 100.0,
                ..CameraPathConfig::default()
            }),
        );
        let sphere = small_sphere();
        let summaries = LocalGroup::run(2, |rank| run_rank(&config, &sphere, 5, Arc::new(rank)))
            .unwrap();
        let total: usize = summaries.into_iter().map(|s| s.unwrap().particles).sum();
        assert_eq!(total, sphere.partition(0, 1).len());

        for name in [
            "output_entropies_000000.csv",
            "output_path_entropies.csv",
            "output_path_positions.csv",
            "output_num_images.csv",
            "Process0001/vis_proc_time_0001.csv",
        ] {
            assert!(tmp.path().join(name).exists(), "{name} missing");
        }
        assert!(!tmp.path().join("zoom_proc_time.csv").exists());
    }
}
