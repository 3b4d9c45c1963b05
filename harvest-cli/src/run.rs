//! Batch runner for `harvest-cli run`.
//!
//! Loads everything a [`RunConfig`] points at, drives a [`Harvester`] round
//! by round and writes the result files.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use harvest_core::Harvester;
use harvest_core::config::Config;
use harvest_core::data::{DataModule, wrap_data};
use harvest_core::io::{load_observations, load_seeds};
use harvest_core::mesh::Mesh;
use harvest_core::seed::{Judge, Seed, sow_prisms};
use harvest_core::survey::ObservationSet;
use tracing::{debug, info, warn};

use crate::config::{DataConfig, RunConfig, SeedsConfig};
use crate::output;

/// What a finished run produced.
#[derive(Debug)]
pub struct Summary {
    pub seeds: usize,
    pub accretions: usize,
    pub final_goal: f64,
    pub final_misfit: f64,
    pub files: Vec<PathBuf>,
}

fn open(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    Ok(BufReader::new(file))
}

/// Builds the data modules of one observation file.
fn load_data<'m>(data: &DataConfig, mesh: &'m dyn Mesh, cfg: &Config) -> Result<Vec<DataModule<'m>>> {
    let (points, columns) = load_observations(open(&data.file)?)
        .with_context(|| format!("reading observations from {}", data.file.display()))?;
    if columns.len() != data.components.len() {
        bail!(
            "{} has {} data columns but {} components are listed",
            data.file.display(),
            columns.len(),
            data.components.len()
        );
    }
    let observations = ObservationSet::from_points(points);
    let modules = wrap_data(
        mesh,
        &observations,
        data.components.iter().copied().zip(columns),
        cfg.norm,
        cfg.use_shape,
    )
    .with_context(|| format!("wrapping data from {}", data.file.display()))?;
    Ok(modules)
}

/// Sows the seeds listed in the seed file.
fn sow<'m>(seeds: &SeedsConfig, mesh: &'m dyn Mesh, cfg: &Config) -> Result<Vec<Seed<'m>>> {
    let (points, columns) = load_seeds(open(&seeds.file)?)
        .with_context(|| format!("reading seeds from {}", seeds.file.display()))?;
    if columns.len() != seeds.properties.len() {
        bail!(
            "{} has {} property columns but {} properties are listed",
            seeds.file.display(),
            columns.len(),
            seeds.properties.len()
        );
    }
    let props: BTreeMap<String, Vec<f64>> = seeds.properties.iter().cloned().zip(columns).collect();
    let judge = if cfg.compact { Judge::Compact } else { Judge::Standard };

    let sowing = sow_prisms(&points, &props, mesh, cfg.mu, cfg.delta, judge)?;
    if !sowing.duplicates.is_empty() {
        warn!(dropped = sowing.duplicates.len(), "some seeds shared a cell and were dropped");
    }
    Ok(sowing
        .seeds
        .into_iter()
        .map(|s| s.with_full_neighbors(seeds.full_neighbors))
        .collect())
}

/// Runs the inversion described by `cfg` and writes its result files.
pub fn run(cfg: &RunConfig) -> Result<Summary> {
    let mesh = cfg.mesh.build()?;
    info!(cells = mesh.size(), shape = ?mesh.shape(), "mesh ready");

    let mut dms = Vec::new();
    let mut sections = Vec::new();
    for (n, data) in cfg.data.iter().enumerate() {
        let modules = load_data(data, &mesh, &cfg.harvest)?;
        sections.extend(std::iter::repeat_n(n + 1, modules.len()));
        dms.extend(modules);
    }
    let mut seeds = sow(&cfg.seeds, &mesh, &cfg.harvest)?;
    let seed_count = seeds.len();

    let start = Instant::now();
    let mut harvester =
        Harvester::new(&mut dms, &mut seeds)?.with_max_rounds(cfg.harvest.max_rounds);
    while let Some(round) = harvester.step() {
        let (goal, misfit) = harvester.current();
        debug!(
            round = harvester.rounds(),
            accretions = round.len(),
            goal,
            misfit,
            "round finished"
        );
    }
    let result = harvester.result();
    info!(
        accretions = result.accretions(),
        final_goal = result.final_goal(),
        final_misfit = result.final_misfit(),
        elapsed = ?start.elapsed(),
        "harvest finished"
    );

    let files = output::write_all(&cfg.output.dir, &result, &dms, &sections)?;
    info!(dir = %cfg.output.dir.display(), files = files.len(), "results written");

    Ok(Summary {
        seeds: seed_count,
        accretions: result.accretions(),
        final_goal: result.final_goal(),
        final_misfit: result.final_misfit(),
        files,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvest_core::data::Component;
    use harvest_core::mesh::PrismMesh;
    use std::fmt::Write as _;
    use std::fs;

    /// Writes gz data of a two-cell body on a 2 x 2 x 2 mesh, a seed file
    /// and a run file into `dir`.
    fn scenario(dir: &Path, seeds: &str) -> PathBuf {
        let mesh = PrismMesh::new([0.0, 2.0, 0.0, 2.0, 0.0, 2.0], (2, 2, 2)).unwrap();
        let obs = ObservationSet::regular_grid([-1.0, 3.0, -1.0, 3.0], (5, 5), -1.0);
        let body = [(mesh.cell(0).unwrap(), 1.0), (mesh.cell(1).unwrap(), 1.0)];
        let gz = Component::Gz.synthetic(&obs.points, &body);

        let mut text = String::from("# x y z gz\n");
        for (p, v) in obs.points.iter().zip(&gz) {
            writeln!(text, "{} {} {} {v}", p.x, p.y, p.z).unwrap();
        }
        fs::write(dir.join("gz.txt"), text).unwrap();
        fs::write(dir.join("seeds.txt"), seeds).unwrap();

        let run = r#"
            [mesh]
            bounds = [0.0, 2.0, 0.0, 2.0, 0.0, 2.0]
            shape = [2, 2, 2]

            [[data]]
            file = "gz.txt"
            components = ["gz"]

            [seeds]
            file = "seeds.txt"
            properties = ["density"]

            [harvest]
            norm = 2

            [output]
            dir = "out"
        "#;
        let path = dir.join("run.toml");
        fs::write(&path, run).unwrap();
        path
    }

    #[test]
    fn run_recovers_the_body_and_writes_results() {
        let dir = tempfile::tempdir().unwrap();
        let path = scenario(dir.path(), "0.5 0.5 0.5 1\n");
        let cfg = RunConfig::load(&path).unwrap();

        let summary = run(&cfg).unwrap();
        assert_eq!(summary.seeds, 1);
        assert_eq!(summary.accretions, 1);
        assert!(summary.final_misfit.abs() < 1e-12);
        assert_eq!(summary.files.len(), 3);

        let out = dir.path().join("out");
        let estimate = fs::read_to_string(out.join("estimate_density.txt")).unwrap();
        let rows: Vec<_> = estimate.lines().filter(|l| !l.starts_with('#')).collect();
        assert_eq!(rows, vec!["0 1", "1 1"]);

        let history = fs::read_to_string(out.join("history.txt")).unwrap();
        assert_eq!(history.lines().count(), 3);

        let predicted = fs::read_to_string(out.join("predicted_gz_1.txt")).unwrap();
        assert_eq!(predicted.lines().count(), 26);
    }

    #[test]
    fn one_component_from_two_files_gets_two_prediction_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = scenario(dir.path(), "0.5 0.5 0.5 1\n");
        fs::copy(dir.path().join("gz.txt"), dir.path().join("gz_again.txt")).unwrap();
        let mut run_file = fs::read_to_string(&path).unwrap();
        run_file.push_str("\n[[data]]\nfile = \"gz_again.txt\"\ncomponents = [\"gz\"]\n");
        fs::write(&path, run_file).unwrap();
        let cfg = RunConfig::load(&path).unwrap();

        let summary = run(&cfg).unwrap();
        assert_eq!(summary.files.len(), 4);
        let out = dir.path().join("out");
        assert!(out.join("predicted_gz_1.txt").exists());
        assert!(out.join("predicted_gz_2.txt").exists());
        assert!(summary.final_misfit.abs() < 1e-12);
    }

    #[test]
    fn duplicate_seeds_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = scenario(dir.path(), "0.5 0.5 0.5 1\n0.6 0.4 0.5 1\n");
        let cfg = RunConfig::load(&path).unwrap();
        assert_eq!(run(&cfg).unwrap().seeds, 1);
    }

    #[test]
    fn seeds_outside_the_mesh_fail_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = scenario(dir.path(), "5 5 5 1\n");
        let cfg = RunConfig::load(&path).unwrap();
        assert!(run(&cfg).is_err());
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn property_columns_must_match_the_listed_properties() {
        let dir = tempfile::tempdir().unwrap();
        let path = scenario(dir.path(), "0.5 0.5 0.5 1 0.2\n");
        let cfg = RunConfig::load(&path).unwrap();
        let err = run(&cfg).unwrap_err();
        assert!(err.to_string().contains("property columns"));
    }
}
