//! Synthetic surveys for `harvest-cli synth`.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use harvest_core::data::Component;
use harvest_core::mesh::Prism;
use harvest_core::survey::{ObservationSet, contaminate};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

/// Forward-models a single prism on a survey and writes an observation file.
#[derive(Args, Debug)]
pub struct SynthArgs {
    /// Prism bounds: x1 x2 y1 y2 z1 z2
    #[arg(long, num_args = 6, allow_negative_numbers = true, required = true)]
    pub prism: Vec<f64>,
    /// Density of the prism
    #[arg(long, default_value_t = 1000.0, allow_negative_numbers = true)]
    pub density: f64,
    /// Survey area: x1 x2 y1 y2
    #[arg(long, num_args = 4, allow_negative_numbers = true, required = true)]
    pub area: Vec<f64>,
    /// Height of the observation points (z points down)
    #[arg(long, default_value_t = -1.0, allow_negative_numbers = true)]
    pub height: f64,
    /// Number of randomly scattered points
    #[arg(long, default_value_t = 400)]
    pub points: usize,
    /// Use a regular nx by ny grid instead of random points
    #[arg(long, num_args = 2, value_names = ["NX", "NY"])]
    pub grid: Option<Vec<usize>>,
    /// Components to compute, one data column each
    #[arg(long, value_delimiter = ',', default_value = "gz")]
    pub components: Vec<Component>,
    /// Amplitude of the uniform noise added to every value
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,
    /// Random seed for the survey and the noise
    #[arg(long)]
    pub seed: Option<u64>,
    /// Output observation file
    #[arg(short, long)]
    pub output: PathBuf,
}

/// Survey points and one data column per requested component.
pub fn generate(args: &SynthArgs) -> Result<(ObservationSet, Vec<Vec<f64>>)> {
    let [x1, x2, y1, y2, z1, z2] = <[f64; 6]>::try_from(args.prism.as_slice())
        .context("--prism takes six values")?;
    let area = <[f64; 4]>::try_from(args.area.as_slice()).context("--area takes four values")?;
    if x1 >= x2 || y1 >= y2 || z1 >= z2 {
        bail!("prism bounds must be increasing along every axis");
    }
    let prism = Prism::new(x1, x2, y1, y2, z1, z2);

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let observations = match args.grid.as_deref() {
        Some(&[nx, ny]) => ObservationSet::regular_grid(area, (nx, ny), args.height),
        Some(_) => bail!("--grid takes two values"),
        None => ObservationSet::random_in_square(args.points, area, args.height, &mut rng),
    };

    let model = [(prism, args.density)];
    let columns = args
        .components
        .iter()
        .map(|c| {
            let mut data = c.synthetic(&observations.points, &model);
            contaminate(&mut data, args.noise, &mut rng);
            data
        })
        .collect();
    Ok((observations, columns))
}

pub fn synth(args: &SynthArgs) -> Result<()> {
    let (observations, columns) = generate(args)?;
    let file = File::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    let mut out = BufWriter::new(file);

    let names: Vec<_> = args.components.iter().map(|c| c.name()).collect();
    writeln!(out, "# x y z {}", names.join(" "))?;
    for (i, p) in observations.points.iter().enumerate() {
        write!(out, "{} {} {}", p.x, p.y, p.z)?;
        for column in &columns {
            write!(out, " {}", column[i])?;
        }
        writeln!(out)?;
    }
    out.flush()?;

    info!(
        points = observations.len(),
        components = ?names,
        file = %args.output.display(),
        "synthetic data written"
    );
    Ok(())
}
