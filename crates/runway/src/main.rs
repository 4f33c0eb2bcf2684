mod logging;
mod report;

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use color_eyre::eyre::WrapErr;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use runway_core::analysis::{EnsembleReport, market_cagr_percentiles, summarize};
use runway_core::config::{SeedStrategy, SimulationConfig};
use runway_core::model::ReturnSampler;
use runway_core::optimization::calibrate_targets;
use runway_core::simulation::run_ensemble;

use crate::logging::init_logging;
use crate::report::{ReportFormat, preview, write_report};

#[derive(Parser, Debug)]
#[command(name = "runway")]
#[command(about = "Monte Carlo retirement withdrawal simulator with dynamic recalibration")]
struct Args {
    /// YAML configuration file; missing fields take their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Starting portfolio balance
    #[arg(long)]
    balance: Option<f64>,

    /// Horizon in years
    #[arg(long)]
    years: Option<usize>,

    /// Number of outer paths
    #[arg(long)]
    paths: Option<usize>,

    /// Paths per success-rate estimate in the yearly re-solve
    #[arg(long)]
    inner_paths: Option<usize>,

    /// Paths per success-rate estimate in the initial calibration
    #[arg(long)]
    calibration_paths: Option<usize>,

    /// Target success rate in percent
    #[arg(long)]
    target: Option<f64>,

    /// Re-solve below this success rate
    #[arg(long)]
    lower: Option<f64>,

    /// Re-solve above this success rate
    #[arg(long)]
    upper: Option<f64>,

    /// Minimum annual withdrawal
    #[arg(long)]
    floor: Option<f64>,

    /// Maximum annual withdrawal
    #[arg(long)]
    cap: Option<f64>,

    /// Nominal mean annual return (decimal)
    #[arg(long)]
    mean_return: Option<f64>,

    /// Annual volatility (decimal)
    #[arg(long)]
    volatility: Option<f64>,

    /// Annual inflation (decimal)
    #[arg(long)]
    inflation: Option<f64>,

    /// Annual fee (decimal)
    #[arg(long)]
    fee: Option<f64>,

    /// Base seed for a reproducible run
    #[arg(short, long)]
    seed: Option<u64>,

    /// Only print initial withdrawals for these target rates, e.g. 95,85,75
    #[arg(long, value_delimiter = ',')]
    targets: Vec<f64>,

    /// Only print CAGR percentiles of the market with no withdrawals
    #[arg(long)]
    market_only: bool,

    /// Write the full report here
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Report format (default: from the output extension, else json)
    #[arg(short, long, value_enum)]
    format: Option<ReportFormat>,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Log to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Args {
    fn apply_overrides(&self, config: &mut SimulationConfig) {
        let market = &mut config.market;
        set(&mut market.mean_return, self.mean_return);
        set(&mut market.volatility, self.volatility);
        set(&mut market.inflation, self.inflation);
        set(&mut market.fee, self.fee);

        set(&mut config.starting_balance, self.balance);
        set(&mut config.horizon_years, self.years);
        set(&mut config.outer_paths, self.paths);
        set(&mut config.inner_paths, self.inner_paths);
        set(&mut config.calibration_paths, self.calibration_paths);
        set(&mut config.target_success_rate, self.target);
        set(&mut config.lower_threshold, self.lower);
        set(&mut config.upper_threshold, self.upper);
        if self.floor.is_some() {
            config.withdrawal_floor = self.floor;
        }
        if self.cap.is_some() {
            config.withdrawal_cap = self.cap;
        }
        if let Some(seed) = self.seed {
            config.seed = SeedStrategy::Fixed(seed);
        }
    }
}

fn set<T: Copy>(field: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *field = value;
    }
}

fn load_config(path: Option<&Path>) -> color_eyre::Result<SimulationConfig> {
    let Some(path) = path else {
        return Ok(SimulationConfig::default());
    };
    let content = fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read config {}", path.display()))?;
    let config = serde_saphyr::from_str(&content)
        .wrap_err_with(|| format!("failed to parse config {}", path.display()))?;
    tracing::info!(path = %path.display(), "loaded configuration");
    Ok(config)
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    let _guard = init_logging(args.log_file.as_deref(), &args.log_level)?;

    let mut config = load_config(args.config.as_deref())?;
    args.apply_overrides(&mut config);
    config.validate()?;

    if args.market_only {
        return print_market(&config);
    }
    if !args.targets.is_empty() {
        return print_targets(&config, &args.targets);
    }

    let result = run_ensemble(&config)?;
    let min_completed = config.min_completed_paths();
    let summary = summarize(&result, min_completed)?;

    println!(
        "Initial withdrawal: ${:.2} ({:.2}% success{})",
        result.initial_withdrawal(),
        result.initial_calibration.success_rate,
        if result.initial_calibration.converged {
            ""
        } else {
            ", not converged"
        }
    );
    println!(
        "Paths: {}  surviving: {:.2}%  base seed: {}",
        summary.paths, summary.success_rate, result.base_seed
    );
    print!("\n{}", preview("CAGR percentiles (%)", &summary.cagr_percentiles, 10));
    print!(
        "\n{}",
        preview("Average withdrawal percentiles", &summary.withdrawal_percentiles, 10)
    );

    if let Some(path) = &args.output {
        let format = args
            .format
            .or_else(|| ReportFormat::from_path(path))
            .unwrap_or_default();
        let report = EnsembleReport::build(&result, min_completed)?;
        write_report(path, &report, format)?;
        println!("\nReport saved to '{}'", path.display());
    }

    tracing::info!("runway finished");
    Ok(())
}

fn print_market(config: &SimulationConfig) -> color_eyre::Result<()> {
    let sampler = ReturnSampler::new(&config.market)?;
    let mut rng = SmallRng::seed_from_u64(config.seed.base_seed());
    let table = market_cagr_percentiles(&sampler, config.horizon_years, config.outer_paths, &mut rng)?;

    print!(
        "{}",
        preview(
            &format!("{}-year market CAGR percentiles (%)", config.horizon_years),
            &table,
            table.rows.len(),
        )
    );
    Ok(())
}

fn print_targets(config: &SimulationConfig, targets: &[f64]) -> color_eyre::Result<()> {
    let sampler = ReturnSampler::new(&config.market)?;
    let mut rng = SmallRng::seed_from_u64(config.seed.base_seed());
    let results = calibrate_targets(
        &sampler,
        &mut rng,
        config.starting_balance,
        config.horizon_years,
        config.calibration_paths,
        targets,
        &config.initial_calibration,
    )?;

    for (target, result) in results {
        println!(
            "Target {target:>5.1}%: withdrawal ${:.2} (achieved {:.2}%, {} iterations{})",
            result.value,
            result.success_rate,
            result.iterations,
            if result.converged { "" } else { ", not converged" }
        );
    }
    Ok(())
}
