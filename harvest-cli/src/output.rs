//! Result files written after a run.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use harvest_core::HarvestResult;
use harvest_core::data::DataModule;
use harvest_core::estimate::SparseModel;

/// `cell value` rows, one per estimated cell.
pub fn write_estimate(out: &mut impl Write, model: &SparseModel) -> std::io::Result<()> {
    writeln!(out, "# cell value (mesh of {} cells)", model.size())?;
    for (cell, value) in model.iter() {
        writeln!(out, "{cell} {value}")?;
    }
    Ok(())
}

/// `x y z observed predicted` rows, one per observation point.
pub fn write_predicted(out: &mut impl Write, dm: &DataModule<'_>) -> std::io::Result<()> {
    writeln!(out, "# x y z observed predicted ({})", dm.component())?;
    for ((p, o), d) in dm.points().iter().zip(dm.observed()).zip(dm.predicted()) {
        writeln!(out, "{} {} {} {o} {d}", p.x, p.y, p.z)?;
    }
    Ok(())
}

/// `iteration goal misfit` rows; iteration 0 is the state before growth.
pub fn write_history(out: &mut impl Write, result: &HarvestResult) -> std::io::Result<()> {
    writeln!(out, "# iteration goal misfit")?;
    for (i, (goal, misfit)) in result.goals.iter().zip(&result.misfits).enumerate() {
        writeln!(out, "{i} {goal} {misfit}")?;
    }
    Ok(())
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    Ok(BufWriter::new(file))
}

/// Writes every result file into `dir` and returns their paths.
///
/// `sections[i]` is the 1-based `[[data]]` section `dms[i]` was read from,
/// so a component measured in several files gets one prediction file each.
pub fn write_all(
    dir: &Path,
    result: &HarvestResult,
    dms: &[DataModule<'_>],
    sections: &[usize],
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).with_context(|| format!("creating output directory {}", dir.display()))?;
    let mut written = Vec::new();

    for (prop, model) in &result.estimate {
        let path = dir.join(format!("estimate_{prop}.txt"));
        let mut out = create(&path)?;
        write_estimate(&mut out, model)
            .and_then(|()| out.flush())
            .with_context(|| format!("writing {}", path.display()))?;
        written.push(path);
    }
    for (dm, section) in dms.iter().zip(sections) {
        let path = dir.join(format!("predicted_{}_{section}.txt", dm.component()));
        let mut out = create(&path)?;
        write_predicted(&mut out, dm)
            .and_then(|()| out.flush())
            .with_context(|| format!("writing {}", path.display()))?;
        written.push(path);
    }
    let path = dir.join("history.txt");
    let mut out = create(&path)?;
    write_history(&mut out, result)
        .and_then(|()| out.flush())
        .with_context(|| format!("writing {}", path.display()))?;
    written.push(path);

    Ok(written)
}
