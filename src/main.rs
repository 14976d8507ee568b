//! Credit Hazard CLI
//!
//! Trains hazard curves on a historical flow table, forecasts a cohort from its
//! known actuals and writes the ratio-based output table.

use anyhow::{Context, Result};
use clap::Parser;
use credit_hazard::flows::load_flow_table;
use credit_hazard::output::{write_curves_csv, write_output_csv};
use credit_hazard::pipeline::{implied_origination, HazardPipeline, PipelineConfig};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "credit-hazard", version, about = "Train hazard curves and forecast a loan cohort")]
struct Args {
    /// Historical flow table used for training (CSV)
    #[arg(long)]
    training: PathBuf,

    /// Known actuals of the cohort to forecast (CSV)
    #[arg(long)]
    actuals: PathBuf,

    /// Origination amount for ratios (defaults to the cohort's earliest balance)
    #[arg(long)]
    origination: Option<f64>,

    /// Last month on book to forecast to
    #[arg(long)]
    max_age: Option<i32>,

    /// Centered smoothing window (1 disables smoothing)
    #[arg(long)]
    smoothing_window: Option<usize>,

    /// JSON pipeline configuration; flags above override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Forecast output table
    #[arg(long, default_value = "forecast_output.csv")]
    output: PathBuf,

    /// Optional hazard curve table
    #[arg(long)]
    curves_output: Option<PathBuf>,

    /// Print diagnostics as JSON instead of a text summary
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct RunReport<'a> {
    training: &'a credit_hazard::pipeline::TrainingDiagnostics,
    forecast: &'a credit_hazard::pipeline::ForecastDiagnostics,
    origination_amount: f64,
    max_age: i32,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_path(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(window) = args.smoothing_window {
        config.smoothing_window = window;
    }
    if let Some(max_age) = args.max_age {
        config.max_age = max_age;
    }
    let max_age = config.max_age;

    let training = load_flow_table(&args.training)
        .with_context(|| format!("loading training data {}", args.training.display()))?;
    let actuals = load_flow_table(&args.actuals)
        .with_context(|| format!("loading known actuals {}", args.actuals.display()))?;

    let origination_amount = match args.origination {
        Some(amount) => amount,
        None => implied_origination(&actuals).context("known actuals are empty")?,
    };

    let mut pipeline = HazardPipeline::new(config)?;
    let training_diagnostics = pipeline.train(&training).context("training failed")?;
    let (output, forecast_diagnostics) = pipeline
        .forecast(&actuals, origination_amount, max_age)
        .context("forecast failed")?;

    write_output_csv(&args.output, &output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    if let Some(path) = &args.curves_output {
        write_curves_csv(path, &training_diagnostics.hazard_curves)
            .with_context(|| format!("writing {}", path.display()))?;
    }

    if args.json {
        let report = RunReport {
            training: &training_diagnostics,
            forecast: &forecast_diagnostics,
            origination_amount,
            max_age,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let summary = &training_diagnostics.training_summary;
    println!("Credit Hazard v{}", env!("CARGO_PKG_VERSION"));
    println!("==================\n");
    println!("Training:");
    println!("  Segments processed: {}", summary.segments_processed);
    println!("  Max month trained:  {:?}", summary.max_age);
    println!("  Total volume:       ${:.2}", summary.total_volume);
    println!("  Warnings:           {}", training_diagnostics.validation_results.warnings.len());

    let fs = &forecast_diagnostics.forecast_summary;
    println!("\nForecast (origination ${:.2}, to month {}):", origination_amount, max_age);
    println!("  Actual months:          {}", fs.actual_months);
    println!("  Forecast months:        {}", fs.forecast_months);
    println!("  Starting balance ratio: {:.3}", fs.starting_balance_ratio);
    println!("  Final balance ratio:    {:.3}", fs.final_balance_ratio);
    println!("  Total payments ratio:   {:.3}", fs.total_payments_ratio);
    println!("  Total chargeoffs ratio: {:.3}", fs.total_chargeoffs_ratio);

    let curve_validation = &forecast_diagnostics.curve_validation;
    if let Some(stats) = &curve_validation.summary {
        println!("\nCurve validation:");
        println!("  Mean payment variance:   {:.4}", stats.mean_payment_variance);
        println!("  Mean chargeoff variance: {:.4}", stats.mean_chargeoff_variance);
        println!("  RMSE payment:            {:.4}", stats.rmse_payment);
        println!("  RMSE chargeoff:          {:.4}", stats.rmse_chargeoff);
    }
    for warning in &curve_validation.warnings {
        println!("  ! {}", warning);
    }

    println!("\n{:>5} {:>10} {:>10} {:>10} {:>10} {:>10} {:>9}",
        "Month", "BalRatio", "PayRatio", "COffRatio", "PayRate", "COffRate", "Flag");
    println!("{}", "-".repeat(72));
    for row in output.iter().take(24) {
        println!("{:>5} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>10.4} {:>9}",
            row.month_on_book,
            row.outstanding_balance_ratio,
            row.payments_ratio,
            row.chargeoffs_ratio,
            row.payment_hazard_rate,
            row.chargeoff_hazard_rate,
            row.forecast_flag.as_str(),
        );
    }
    if output.len() > 24 {
        println!("... ({} more months)", output.len() - 24);
    }

    println!("\nFull results written to: {}", args.output.display());
    Ok(())
}
