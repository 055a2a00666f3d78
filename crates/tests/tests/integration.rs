//! End-to-end runs over in-process ranks.
//!
//! Each test writes a run document, drives it through the controlled
//! adaptors and checks what the run left in its output directory.

use std::collections::BTreeSet;

use vantage_lens::ControllerConfig;
use vantage_tests::{
    COARSE, FINE, column, document, images, path_frames, read_table, run_octant, run_sphere,
};

fn no_values(_: u64, _: usize) -> Vec<f64> {
    Vec::new()
}

/// Four-value field that jumps by 5 at step 20.
fn shifting_field(step: u64, _rank: usize) -> Vec<f64> {
    let shift = if step >= 20 { 5.0 } else { 0.0 };
    [1.0, 2.0, 3.0, 4.0].iter().map(|v| v + shift).collect()
}

/// Plain control renders every location of every step, once, from the root.
#[test]
fn test_plain_run_writes_every_location() {
    let tmp = tempfile::tempdir().unwrap();
    let config = document(
        r#"
apiVersion: vantage/v1
kind: VisRun
adaptor:
  width: 24
  height: 16
viewpoint:
  generator:
    type: cubic
    dims: [2, 1, 1]
"#,
        tmp.path(),
    );
    let summaries = run_sphere(&config, 2, 3);
    assert_eq!(summaries.len(), 2);
    assert!(summaries.iter().all(|s| s.steps == 3 && s.particles > 0));

    let names = images(tmp.path());
    assert_eq!(
        names,
        vec![
            "output_000000_000000",
            "output_000000_000001",
            "output_000001_000000",
            "output_000001_000001",
            "output_000002_000000",
            "output_000002_000001",
        ]
    );
    assert!(tmp.path().join("manifest.json").exists());
    assert!(tmp.path().join("vis_proc_time.csv").exists());
    assert!(tmp.path().join("Process0000/vis_proc_time_0000.csv").exists());
    assert!(tmp.path().join("Process0001/vis_proc_time_0001.csv").exists());
}

/// Eight cameras on the corners of a cube; only one octant sees texture.
#[test]
fn test_lattice_entropy_selects_textured_octant() {
    let tmp = tempfile::tempdir().unwrap();
    let config = document(
        r#"
apiVersion: vantage/v1
kind: VisRun
adaptor:
  width: 16
  height: 16
viewpoint:
  generator:
    type: cubic
    dims: [2, 2, 2]
controller:
  type: cameraPath
  entropyInterval: 4
  delta: 100.0
"#,
        tmp.path(),
    );
    // +x, -y, +z is lattice index 1 + 2 * (0 + 2 * 1) = 5
    run_octant(&config, &[([true, false, true], FINE)], 2, 9, no_values);

    let scores = column(&tmp.path().join("output_entropies_000000.csv"), "Entropy");
    assert_eq!(scores.len(), 8);
    assert_eq!(first_best(&scores), 5);
    assert!(scores.iter().enumerate().all(|(i, s)| i == 5 || *s == 0.0));

    let keys = column(&tmp.path().join("output_path_entropies.csv"), "Time");
    assert_eq!(keys, vec![0.0, 4.0, 8.0]);

    // the key never moves, so every step gets exactly one frame
    let frames = path_frames(&images(tmp.path()));
    assert_eq!(frames.keys().copied().collect::<Vec<_>>(), (0..9).collect::<Vec<_>>());
    assert!(frames.values().all(|subs| subs == &vec![0]));
}

fn lattice_document(dir: &std::path::Path, min_separation: f64) -> vantage_lens::VisRunConfig {
    let mut config = document(
        r#"
apiVersion: vantage/v1
kind: VisRun
adaptor:
  width: 16
  height: 16
viewpoint:
  generator:
    type: cubic
    dims: [2, 2, 2]
controller:
  type: cameraPath
  entropyInterval: 4
  delta: 100.0
"#,
        dir,
    );
    if let ControllerConfig::CameraPath(path) = &mut config.controller {
        path.min_separation = min_separation;
    }
    config
}

/// Index of the first highest score.
fn first_best(scores: &[f64]) -> usize {
    scores
        .iter()
        .enumerate()
        .fold(0, |best, (i, s)| if *s > scores[best] { i } else { best })
}

// +x, -y, +z is lattice index 5 and -x, +y, +z is index 6
const OCTANT_5: [bool; 3] = [true, false, true];
const OCTANT_6: [bool; 3] = [false, true, true];

/// Two equally textured octants: the key is one of them, the first on the tie.
#[test]
fn test_two_textured_octants_tie_goes_to_first() {
    let tmp = tempfile::tempdir().unwrap();
    let config = lattice_document(tmp.path(), 1e-3);
    run_octant(&config, &[(OCTANT_5, FINE), (OCTANT_6, FINE)], 2, 5, no_values);

    let scores = column(&tmp.path().join("output_entropies_000000.csv"), "Entropy");
    assert!(scores[5] > 0.0);
    assert_eq!(scores[5], scores[6]);
    assert!(scores.iter().enumerate().all(|(i, s)| i == 5 || i == 6 || *s == 0.0));

    let keys = column(&tmp.path().join("output_path_entropies.csv"), "Entropy");
    assert_eq!(keys[0], scores[5]);
    let coords = tmp.path().join("output_viewpoint_coords.csv");
    let positions = column(&tmp.path().join("output_path_positions.csv"), "X");
    assert_eq!(positions[0].signum(), column(&coords, "X")[5].signum());
}

/// A clearly richer texture in the later octant wins over the earlier one.
#[test]
fn test_two_textured_octants_richer_wins() {
    let tmp = tempfile::tempdir().unwrap();
    let config = lattice_document(tmp.path(), 1e-3);
    run_octant(&config, &[(OCTANT_5, COARSE), (OCTANT_6, FINE)], 2, 5, no_values);

    let scores = column(&tmp.path().join("output_entropies_000000.csv"), "Entropy");
    assert!(scores[5] > 0.0);
    assert!(scores[6] > scores[5] + 1e-3);
    let best = first_best(&scores);
    assert!(best == 5 || best == 6);
    assert_eq!(best, 6);

    let keys = column(&tmp.path().join("output_path_entropies.csv"), "Entropy");
    assert_eq!(keys[0], scores[6]);
}

/// Every simulated step reaches the output, with contiguous sub indices.
#[test]
fn test_cache_drain_renders_every_step() {
    let tmp = tempfile::tempdir().unwrap();
    let config = document(
        r#"
apiVersion: vantage/v1
kind: VisRun
adaptor:
  width: 24
  height: 24
viewpoint:
  generator:
    type: polyhedron
    solid: icosahedron
controller:
  type: cameraPath
  entropyInterval: 4
  delta: 2.0
  interpolator: squad
"#,
        tmp.path(),
    );
    run_sphere(&config, 2, 13);

    let frames = path_frames(&images(tmp.path()));
    assert_eq!(frames.keys().copied().collect::<Vec<_>>(), (0..13).collect::<Vec<_>>());
    for (step, subs) in &frames {
        assert_eq!(subs, &(0..subs.len()).collect::<Vec<_>>(), "step {step}");
    }

    let counted = column(&tmp.path().join("output_num_images.csv"), "Frames");
    let written: usize = frames.values().map(Vec::len).sum();
    assert_eq!(counted.iter().sum::<f64>() as usize, written);
}

/// Interpolated cameras stay on the shell of the candidate locations.
#[test]
fn test_path_positions_stay_on_shell() {
    let tmp = tempfile::tempdir().unwrap();
    let config = document(
        r#"
apiVersion: vantage/v1
kind: VisRun
adaptor:
  width: 16
  height: 16
viewpoint:
  generator:
    type: polyhedron
    solid: octahedron
controller:
  type: cameraPath
  entropyInterval: 3
  delta: 1.0
"#,
        tmp.path(),
    );
    run_sphere(&config, 1, 10);

    let coords = tmp.path().join("output_viewpoint_coords.csv");
    let radius = {
        let (x, y, z) = (column(&coords, "X"), column(&coords, "Y"), column(&coords, "Z"));
        (x[0] * x[0] + y[0] * y[0] + z[0] * z[0]).sqrt()
    };

    let positions = tmp.path().join("output_path_positions.csv");
    let (_, rows) = read_table(&positions);
    assert!(!rows.is_empty());
    let (x, y, z) = (
        column(&positions, "X"),
        column(&positions, "Y"),
        column(&positions, "Z"),
    );
    for i in 0..x.len() {
        let r = (x[i] * x[i] + y[i] * y[i] + z[i] * z[i]).sqrt();
        assert!((r - radius).abs() < 1e-6 * radius, "frame {i} at radius {r}");
    }
}

/// A mean shift in the field switches the gate from coarse to full sampling.
#[test]
fn test_divergence_gate_catches_shift() {
    let tmp = tempfile::tempdir().unwrap();
    let config = document(
        r#"
apiVersion: vantage/v1
kind: VisRun
adaptor:
  width: 8
  height: 8
viewpoint:
  generator:
    type: single
    position: [0.0, 0.0, 20.0]
controller:
  type: timestep
  validationInterval: 4
  threshold: 0.5
"#,
        tmp.path(),
    );
    run_octant(&config, &[([true, true, true], FINE)], 2, 40, shifting_field);

    let rendered: Vec<u64> = images(tmp.path())
        .iter()
        .filter_map(|name| name.split('_').nth(1)?.parse().ok())
        .collect();
    assert_eq!(
        rendered,
        vec![0, 4, 8, 12, 16, 17, 18, 19, 20, 21, 22, 28, 32, 36, 37, 38, 39]
    );

    let table = tmp.path().join("output_divergences.csv");
    let times = column(&table, "Time");
    let divergences = column(&table, "Divergence");
    assert_eq!(times.len(), 9);
    for (time, d) in times.iter().zip(&divergences) {
        if *time == 20.0 {
            assert!((d - 10.0).abs() < 1e-9);
        } else {
            assert_eq!(*d, 0.0);
        }
    }
}

/// The combined controller hands exactly the gated steps to the camera path.
#[test]
fn test_gate_feeds_camera_path() {
    let tmp = tempfile::tempdir().unwrap();
    let config = document(
        r#"
apiVersion: vantage/v1
kind: VisRun
adaptor:
  width: 8
  height: 8
viewpoint:
  generator:
    type: cubic
    dims: [2, 2, 2]
controller:
  type: cameraPathTimestep
  cameraPath:
    entropyInterval: 4
    delta: 100.0
  timestep:
    validationInterval: 4
    threshold: 0.5
"#,
        tmp.path(),
    );
    run_octant(&config, &[([false, true, false], FINE)], 3, 40, shifting_field);

    let steps: BTreeSet<u64> = path_frames(&images(tmp.path())).into_keys().collect();
    let expected: BTreeSet<u64> = [0, 4, 8, 12, 16, 17, 18, 19, 20, 21, 22, 28, 32, 36, 37, 38, 39]
        .into_iter()
        .collect();
    assert_eq!(steps, expected);
    assert!(tmp.path().join("output_divergences.csv").exists());
    assert!(tmp.path().join("output_path_entropies.csv").exists());
}
