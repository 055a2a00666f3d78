//! Integration test harness for vantage.
//!
//! Runs whole visualization runs over in-process ranks and inspects what
//! they leave in the output directory: images, entropy and divergence
//! tables, path tables and timing tables.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use vantage_foundation::FrameBuffer;
use vantage_lens::{ControlledAdaptor, VisRunConfig};
use vantage_run::{HeatedSphere, RunSummary, run_rank};
use vantage_runtime::{Adaptor, BoundingBox, Camera, Communicator, LocalGroup, Light, Screen};

/// Parse a run document and point its output at `dir`.
///
/// # Panics
///
/// Panics if the document is invalid.
pub fn document(yaml: &str, dir: &Path) -> VisRunConfig {
    let mut config = VisRunConfig::from_yaml_str(yaml).expect("run document should parse");
    config.adaptor.output_dir = dir.to_path_buf();
    config
}

/// Run the heated sphere through `config` on `ranks` ranks.
///
/// # Panics
///
/// Panics if any rank fails.
pub fn run_sphere(config: &VisRunConfig, ranks: usize, steps: u64) -> Vec<RunSummary> {
    let sphere = HeatedSphere {
        resolution: 10,
        ..HeatedSphere::default()
    };
    LocalGroup::run(ranks, |rank| run_rank(config, &sphere, steps, Arc::new(rank)))
        .expect("ranks should join")
        .into_iter()
        .map(|r| r.expect("rank should succeed"))
        .collect()
}

/// Gray levels of a fully detailed octant texture.
pub const FINE: usize = 256;
/// Gray levels of a coarse octant texture.
pub const COARSE: usize = 8;

/// Textured octant: coordinate signs and the gray levels of its texture.
pub type Octant = ([bool; 3], usize);

/// Screen that draws a textured frame from cameras in the given octants
/// and a flat one from everywhere else.
pub struct OctantScreen {
    pub octants: Vec<Octant>,
    objects: usize,
}

impl OctantScreen {
    pub fn new(octants: &[Octant]) -> Self {
        Self {
            octants: octants.to_vec(),
            objects: 0,
        }
    }
}

impl Screen for OctantScreen {
    fn clear(&mut self) {
        self.objects = 0;
    }

    fn object_bounds(&self) -> Option<BoundingBox> {
        (self.objects > 0).then(|| BoundingBox::new([-1.0; 3], [1.0; 3]))
    }

    fn draw(&mut self, camera: &Camera, _light: &Light, width: usize, height: usize) -> FrameBuffer {
        let levels = self
            .octants
            .iter()
            .find(|(signs, _)| (0..3).all(|i| (camera.position[i] > 0.0) == signs[i]))
            .map(|&(_, levels)| levels.clamp(1, FINE));
        let Some(levels) = levels else {
            return FrameBuffer::filled(width, height, [90, 90, 90, 255], 0.5);
        };
        let band = FINE / levels;
        let mut frame = FrameBuffer::background(width, height, [0, 0, 0]);
        for y in 0..height {
            for x in 0..width {
                let v = ((x * 7 + y * 13) % FINE / band * band) as u8;
                frame.set_pixel(x, y, [v, 255 - v, v / 2, 255], 0.5);
            }
        }
        frame
    }
}

/// Run `steps` steps through `config` with an [`OctantScreen`] texturing
/// `octants`; `values` gives the field values of a step on a rank.
///
/// # Panics
///
/// Panics if any rank fails.
pub fn run_octant<F>(config: &VisRunConfig, octants: &[Octant], ranks: usize, steps: u64, values: F)
where
    F: Fn(u64, usize) -> Vec<f64> + Sync,
{
    let results = LocalGroup::run(ranks, |rank| -> vantage_lens::Result<()> {
        let viewpoint = config.viewpoint.build()?;
        let mut adaptor: Adaptor<OctantScreen, ()> = Adaptor::new(
            config.adaptor.clone(),
            OctantScreen::new(octants),
            viewpoint,
            Arc::new(rank),
        );
        adaptor.add_pipeline(|screen: &mut OctantScreen, _: &()| screen.objects += 1);
        let mut controlled = ControlledAdaptor::new(adaptor, &config.controller)?;
        controlled.initialize()?;
        let rank = controlled.adaptor().comm().rank();
        for step in 0..steps {
            controlled.exec((), values(step, rank))?;
        }
        controlled.finalize()
    })
    .expect("ranks should join");
    for result in results {
        result.expect("rank should succeed");
    }
}

/// Stems of every image in `dir`, sorted.
pub fn images(dir: &Path) -> Vec<String> {
    let mut out: Vec<String> = std::fs::read_dir(dir)
        .expect("output directory should exist")
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "bmp"))
        .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .collect();
    out.sort();
    out
}

/// Sub indices per step of camera path images `<basename>_<time>_<sub>_<space>`.
pub fn path_frames(images: &[String]) -> BTreeMap<u64, Vec<usize>> {
    let mut out: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
    for name in images {
        let fields: Vec<&str> = name.rsplitn(4, '_').collect();
        if let [_space, sub, time, _base] = fields.as_slice() {
            if let (Ok(time), Ok(sub)) = (time.parse(), sub.parse()) {
                out.entry(time).or_default().push(sub);
            }
        }
    }
    for subs in out.values_mut() {
        subs.sort_unstable();
    }
    out
}

/// Header and rows of a CSV table.
///
/// # Panics
///
/// Panics if the table is missing or malformed.
pub fn read_table(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path)
        .unwrap_or_else(|e| panic!("cannot open {}: {e}", path.display()));
    let header = reader
        .headers()
        .expect("table should have a header")
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|r| {
            r.expect("row should parse")
                .iter()
                .map(str::to_string)
                .collect()
        })
        .collect();
    (header, rows)
}

/// Numeric column `column` of a CSV table.
pub fn column(path: &Path, column: &str) -> Vec<f64> {
    let (header, rows) = read_table(path);
    let index = header
        .iter()
        .position(|h| h == column)
        .unwrap_or_else(|| panic!("no column {column} in {}", path.display()));
    rows.iter()
        .map(|row| row[index].parse().expect("numeric cell"))
        .collect()
}
