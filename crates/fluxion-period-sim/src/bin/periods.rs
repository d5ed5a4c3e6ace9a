// Copyright (c) 2025 SOLARE S.R.O.
//
// This file is part of FluxION.
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// (CC BY-NC-ND 4.0). You may use and share this file for non-commercial purposes only and you may not
// create derivatives. See <https://creativecommons.org/licenses/by-nc-nd/4.0/>.
//
// This software is provided "AS IS", without warranty of any kind.
//
// For commercial licensing, please contact: info@solare.cz

//! FluxION price period detection CLI

use anyhow::{Result, anyhow};
use chrono_tz::Tz;
use clap::Parser;
use fluxion_period_sim::cli::{
    Cli, Commands, InputArgs, JsonFormatter, OutputFormat, TableFormatter, load_prices_csv,
};
use fluxion_periods::{EngineConfig, PeriodCalculator};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Logs go to stderr so JSON output stays clean; respects RUST_LOG
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Detect(args) => {
            let mut calculator = build_calculator(&args.input)?;
            let timezone = calculator.config().timezone;
            let intervals = load_prices_csv(&args.input.prices)?;
            let result = calculator.calculate(intervals)?;

            match args.format {
                OutputFormat::Table => {
                    println!("{}", TableFormatter::format_periods(result, timezone));
                }
                OutputFormat::Json => println!("{}", JsonFormatter::format(result)?),
            }
        }
        Commands::Smooth(args) => {
            let mut calculator = build_calculator(&args.input)?;
            let timezone = calculator.config().timezone;
            let intervals = load_prices_csv(&args.input.prices)?;
            let result = calculator.calculate(intervals)?;

            match args.format {
                OutputFormat::Table => println!(
                    "{}",
                    TableFormatter::format_smoothed(&result.intervals, timezone)
                ),
                OutputFormat::Json => {
                    println!("{}", JsonFormatter::format_smoothed(&result.intervals)?);
                }
            }
        }
    }

    Ok(())
}

fn build_calculator(input: &InputArgs) -> Result<PeriodCalculator> {
    let mut config = match &input.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    };

    if let Some(name) = &input.timezone {
        config.timezone = name
            .parse::<Tz>()
            .map_err(|e| anyhow!("Invalid timezone '{name}': {e}"))?;
    }
    if input.no_smoothing {
        config.smoothing.enabled = false;
    }

    info!(
        timezone = %config.timezone,
        smoothing = config.smoothing.enabled,
        best_flex = config.best.flex,
        peak_flex = config.peak.flex,
        "Period engine configured"
    );

    Ok(PeriodCalculator::new(config)?)
}
