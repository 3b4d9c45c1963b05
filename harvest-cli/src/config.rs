//! TOML run files.
//!
//! ```toml
//! [mesh]
//! bounds = [0.0, 1000.0, 0.0, 1000.0, 0.0, 500.0]   # x1 x2 y1 y2 z1 z2
//! shape = [5, 10, 10]                              # nz ny nx
//!
//! [[data]]
//! file = "gravity.txt"          # x y z gz gzz
//! components = ["gz", "gzz"]
//!
//! [seeds]
//! file = "seeds.txt"            # x y z density
//! properties = ["density"]
//!
//! [harvest]
//! norm = 2
//! mu = 0.1
//! delta = 0.0001
//!
//! [output]
//! dir = "results"
//! ```
//!
//! Relative paths are resolved against the directory holding the run file.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use harvest_core::config::Config;
use harvest_core::data::Component;
use harvest_core::mesh::PrismMesh;
use harvest_core::types::CellId;
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub mesh: MeshConfig,
    pub data: Vec<DataConfig>,
    pub seeds: SeedsConfig,
    #[serde(default)]
    pub harvest: Config,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MeshConfig {
    pub bounds: [f64; 6],
    /// `(nz, ny, nx)`
    pub shape: (usize, usize, usize),
    #[serde(default)]
    pub mask: Vec<CellId>,
}

/// One observation file and the component stored in each of its data columns.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
    pub file: PathBuf,
    pub components: Vec<Component>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SeedsConfig {
    pub file: PathBuf,
    /// Name of the property stored in each value column.
    pub properties: Vec<String>,
    /// Grow through edges and vertices too.
    #[serde(default)]
    pub full_neighbors: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("harvest-output"),
        }
    }
}

impl MeshConfig {
    pub fn build(&self) -> Result<PrismMesh> {
        let mut mesh = PrismMesh::new(self.bounds, self.shape).context("building the mesh")?;
        mesh.mask(self.mask.iter().copied());
        Ok(mesh)
    }
}

impl RunConfig {
    /// Reads and validates a run file, resolving its relative paths.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading run file {}", path.display()))?;
        let mut cfg: RunConfig = toml::from_str(&text)
            .with_context(|| format!("parsing run file {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        cfg.resolve_paths(base);
        cfg.validate()?;
        Ok(cfg)
    }

    fn resolve_paths(&mut self, base: &Path) {
        for data in &mut self.data {
            data.file = base.join(&data.file);
        }
        self.seeds.file = base.join(&self.seeds.file);
        self.output.dir = base.join(&self.output.dir);
    }

    /// Checks what serde cannot: at least one data file, no component
    /// listed twice for the same file, and at least one seed property.
    ///
    /// The same component may come from several files, e.g. surveys flown
    /// at different heights.
    pub fn validate(&self) -> Result<()> {
        if self.data.is_empty() {
            bail!("no [[data]] sections in the run file");
        }
        for data in &self.data {
            if data.components.is_empty() {
                bail!("{} lists no components", data.file.display());
            }
            let mut seen = BTreeSet::new();
            for component in &data.components {
                if !seen.insert(*component) {
                    bail!("{} lists component {component} more than once", data.file.display());
                }
            }
        }
        if self.seeds.properties.is_empty() {
            bail!("[seeds] lists no properties");
        }
        Ok(())
    }
}
