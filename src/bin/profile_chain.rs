//! Correction Chain Profiler
//!
//! Builds a synthetic met-mast dataset and times the standard correction
//! chains over it:
//! - Source -> Density -> Turbulence
//! - Source -> Density -> 1D Power Deviation Matrix
//!
//! # Usage
//! ```bash
//! ./profile-chain --rows 500000 --seed 7
//! ./profile-chain --rows 1000 --json > diagnostics.json
//! ```

use std::collections::BTreeMap;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use rand::prelude::*;
use rand_distr::{Distribution, Normal, Weibull};
use tracing::info;

use pcwg_corrections::config::{self, CorrectionConfig};
use pcwg_corrections::{
    CorrectionChain, Dataset, DensityEquivalentWindSpeed, DeviationMatrix, MatrixDimension,
    PowerCurve, PowerDeviationMatrixCorrection, TurbulenceCorrection, TurbulencePowerCurve,
};

// ============================================================================
// Synthetic Site Constants
// ============================================================================

/// Weibull scale of hub wind speed (m/s)
const WEIBULL_SCALE: f64 = 8.5;
/// Weibull shape of hub wind speed
const WEIBULL_SHAPE: f64 = 2.0;
/// Mean hub air density (kg/m^3)
const MEAN_DENSITY: f64 = 1.20;
/// Mean hub turbulence intensity
const MEAN_TURBULENCE: f64 = 0.11;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "profile-chain")]
#[command(about = "Time PCWG correction chains over synthetic data")]
#[command(version)]
struct Args {
    /// Number of dataset rows
    #[arg(short, long, default_value = "100000")]
    rows: usize,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Print the diagnostics log as JSON on stdout
    #[arg(long)]
    json: bool,
}

// ============================================================================
// Synthetic Collaborators
// ============================================================================

/// Logistic power curve of a 2 MW turbine.
struct LogisticCurve {
    rated_power: f64,
    midpoint: f64,
    steepness: f64,
    cut_out: f64,
}

impl PowerCurve for LogisticCurve {
    fn power(&self, wind_speed: f64) -> f64 {
        if wind_speed >= self.cut_out || wind_speed <= 0.0 {
            return 0.0;
        }
        self.rated_power / (1.0 + (-self.steepness * (wind_speed - self.midpoint)).exp())
    }

    fn rated_power(&self) -> f64 {
        self.rated_power
    }
}

impl TurbulencePowerCurve for LogisticCurve {
    /// Flattens the knee: turbulence gains below the midpoint, loses above.
    fn turbulence_power(&self, wind_speed: f64, turbulence_intensity: f64) -> f64 {
        let spread = wind_speed * turbulence_intensity;
        let samples = [wind_speed - spread, wind_speed, wind_speed + spread];
        samples.iter().map(|&v| self.power(v)).sum::<f64>() / samples.len() as f64
    }
}

/// Turbulence-binned deviations with range counters.
struct TurbulenceMatrix {
    dimensions: Vec<MatrixDimension>,
    bin_width: f64,
    deviations: Vec<f64>,
    lookups: u64,
    below: u64,
    above: u64,
}

impl TurbulenceMatrix {
    fn new() -> Self {
        Self {
            dimensions: vec![MatrixDimension {
                parameter: "Hub Turbulence".to_string(),
                center_of_first_bin: 0.04,
                center_of_last_bin: 0.20,
            }],
            bin_width: 0.02,
            deviations: vec![0.015, 0.01, 0.005, 0.0, -0.005, -0.01, -0.015, -0.02, -0.025],
            lookups: 0,
            below: 0,
            above: 0,
        }
    }

    fn fraction(&self, count: u64) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            count as f64 / self.lookups as f64
        }
    }
}

impl DeviationMatrix for TurbulenceMatrix {
    fn dimensions(&self) -> &[MatrixDimension] {
        &self.dimensions
    }

    fn deviation(&mut self, parameters: &BTreeMap<String, f64>) -> f64 {
        self.lookups += 1;
        let dimension = &self.dimensions[0];
        let Some(&value) = parameters.get(&dimension.parameter) else {
            return 0.0;
        };
        let low_edge = dimension.center_of_first_bin - self.bin_width / 2.0;
        let high_edge = dimension.center_of_last_bin + self.bin_width / 2.0;
        if value < low_edge {
            self.below += 1;
            0.0
        } else if value > high_edge {
            self.above += 1;
            0.0
        } else {
            let bin = ((value - low_edge) / self.bin_width) as usize;
            self.deviations[bin.min(self.deviations.len() - 1)]
        }
    }

    fn reset_out_of_range_count(&mut self) {
        self.lookups = 0;
        self.below = 0;
        self.above = 0;
    }

    fn out_of_range_fraction(&self, _dimension: Option<&str>) -> f64 {
        self.fraction(self.below + self.above)
    }

    fn below_fraction(&self, _dimension: &str) -> f64 {
        self.fraction(self.below)
    }

    fn above_fraction(&self, _dimension: &str) -> f64 {
        self.fraction(self.above)
    }
}

// ============================================================================
// Synthetic Dataset
// ============================================================================

fn synthetic_dataset(rows: usize, rng: &mut StdRng, config: &CorrectionConfig) -> Result<Dataset> {
    let speed = Weibull::new(WEIBULL_SCALE, WEIBULL_SHAPE).context("invalid Weibull parameters")?;
    let density = Normal::new(MEAN_DENSITY, 0.03).context("invalid density distribution")?;
    let turbulence = Normal::new(MEAN_TURBULENCE, 0.04).context("invalid turbulence distribution")?;

    let mut ws = Vec::with_capacity(rows);
    let mut rho = Vec::with_capacity(rows);
    let mut ti = Vec::with_capacity(rows);
    for _ in 0..rows {
        ws.push(speed.sample(rng));
        rho.push(density.sample(rng));
        ti.push(turbulence.sample(rng).max(0.0));
    }

    let columns = &config.columns;
    let mut dataset = Dataset::with_rows(rows);
    dataset.insert_column(columns.hub_wind_speed.as_str(), ws)?;
    dataset.insert_column(columns.hub_density.as_str(), rho)?;
    dataset.insert_column(columns.hub_turbulence.as_str(), ti)?;
    Ok(dataset)
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    config::init(CorrectionConfig::load());
    let cfg = config::get();

    let seed = args.seed.unwrap_or_else(|| rand::thread_rng().gen());
    let mut rng = StdRng::seed_from_u64(seed);
    info!(rows = args.rows, seed, "Generating synthetic dataset");

    let started = Instant::now();
    let mut dataset = synthetic_dataset(args.rows, &mut rng, cfg)?;
    info!(elapsed_ms = started.elapsed().as_millis() as u64, "Dataset ready");

    let curve = LogisticCurve {
        rated_power: 2000.0,
        midpoint: 9.0,
        steepness: 0.9,
        cut_out: 25.0,
    };
    let mut matrix = TurbulenceMatrix::new();
    let parameter_columns = BTreeMap::from([(
        "Hub Turbulence".to_string(),
        cfg.columns.hub_turbulence.clone(),
    )]);

    let mut chain = CorrectionChain::new();

    let timer = Instant::now();
    let source = chain.source(cfg.columns.hub_wind_speed.as_str());
    chain.finalise_source(source, &mut dataset, Some(&curve))?;
    info!(elapsed_ms = timer.elapsed().as_millis() as u64, "Source finalised");

    let timer = Instant::now();
    let density = DensityEquivalentWindSpeed::apply(
        &mut chain,
        &mut dataset,
        source,
        cfg.density.reference_density,
        &cfg.columns.hub_density,
        Some(&curve),
    )?;
    info!(elapsed_ms = timer.elapsed().as_millis() as u64, "Density correction");

    let timer = Instant::now();
    TurbulenceCorrection::apply(
        &mut chain,
        &mut dataset,
        density.node,
        &cfg.columns.hub_turbulence,
        &curve,
    )?;
    info!(elapsed_ms = timer.elapsed().as_millis() as u64, "Turbulence correction");

    let timer = Instant::now();
    let pdm = PowerDeviationMatrixCorrection::apply(
        &mut chain,
        &mut dataset,
        density.node,
        &mut matrix,
        &parameter_columns,
        &curve,
    )?;
    info!(
        elapsed_ms = timer.elapsed().as_millis() as u64,
        out_of_range = pdm.report.out_of_range_fraction,
        "Deviation matrix correction"
    );

    info!(
        total_ms = started.elapsed().as_millis() as u64,
        columns = dataset.column_names().count(),
        "Profiling complete"
    );

    if args.json {
        println!("{}", chain.diagnostics().to_json()?);
    }

    Ok(())
}
