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

//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "fluxion-periods-cli")]
#[command(author, version, about = "FluxION price period detection CLI")]
#[command(
    long_about = "Detect best (cheap) and peak (expensive) price periods in a price series.\n\
    \nPrices are read from a CSV file with columns start,price[,level][,duration_minutes].\n\
    Engine settings come from an optional TOML file; unset values use built-in defaults.\n\
    \nExamples:\n  \
    fluxion-periods-cli detect --prices prices.csv\n  \
    fluxion-periods-cli detect --prices prices.csv --config periods.toml --format json\n  \
    fluxion-periods-cli smooth --prices prices.csv --timezone UTC"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect best and peak periods
    #[command(long_about = "Run smoothing, filtering, assembly and relaxation for both directions.\n\
        \nExamples:\n  \
        fluxion-periods-cli detect --prices prices.csv\n  \
        fluxion-periods-cli detect --prices prices.csv --no-smoothing --format json")]
    Detect(DetectArgs),

    /// Show which intervals outlier smoothing replaced
    #[command(long_about = "List intervals whose working price was replaced by outlier smoothing.\n\
        \nExamples:\n  \
        fluxion-periods-cli smooth --prices prices.csv\n  \
        fluxion-periods-cli smooth --prices prices.csv --format json")]
    Smooth(SmoothArgs),
}

/// Price source and engine configuration shared by all commands
#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Price CSV file
    #[arg(
        long,
        value_name = "PATH",
        help = "CSV file with start,price[,level][,duration_minutes]",
        long_help = "CSV price series. `start` is an RFC 3339 timestamp, `price` is in ct/kWh.\n\
          Optional `level` (very_cheap .. very_expensive) defaults to normal,\n\
          optional `duration_minutes` defaults to 15.\n\
          \nExample: --prices prices.csv"
    )]
    pub prices: PathBuf,

    /// Engine configuration (TOML)
    #[arg(long, value_name = "PATH", help = "TOML engine configuration")]
    pub config: Option<PathBuf>,

    /// Override the configured timezone
    #[arg(
        long,
        value_name = "TZ",
        help = "IANA timezone used for day boundaries (e.g. Europe/Prague)"
    )]
    pub timezone: Option<String>,

    /// Disable outlier smoothing
    #[arg(long, help = "Use raw prices for period detection")]
    pub no_smoothing: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DetectArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table, help = "How to display results")]
    pub format: OutputFormat,
}

#[derive(Args, Debug, Clone)]
pub struct SmoothArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table, help = "How to display results")]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_defaults() {
        let cli = Cli::try_parse_from(["fluxion-periods-cli", "detect", "--prices", "p.csv"]).unwrap();
        let Commands::Detect(args) = cli.command else {
            panic!("expected detect command");
        };
        assert_eq!(args.input.prices, PathBuf::from("p.csv"));
        assert!(args.input.config.is_none());
        assert!(args.input.timezone.is_none());
        assert!(!args.input.no_smoothing);
        assert_eq!(args.format, OutputFormat::Table);
    }

    #[test]
    fn test_detect_all_options() {
        let cli = Cli::try_parse_from([
            "fluxion-periods-cli",
            "detect",
            "--prices",
            "p.csv",
            "--config",
            "periods.toml",
            "--timezone",
            "UTC",
            "--no-smoothing",
            "--format",
            "json",
        ])
        .unwrap();
        let Commands::Detect(args) = cli.command else {
            panic!("expected detect command");
        };
        assert_eq!(args.input.config, Some(PathBuf::from("periods.toml")));
        assert_eq!(args.input.timezone.as_deref(), Some("UTC"));
        assert!(args.input.no_smoothing);
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_smooth_command() {
        let cli = Cli::try_parse_from(["fluxion-periods-cli", "smooth", "--prices", "p.csv"]).unwrap();
        let Commands::Smooth(args) = cli.command else {
            panic!("expected smooth command");
        };
        assert_eq!(args.format, OutputFormat::Table);

        let cli = Cli::try_parse_from([
            "fluxion-periods-cli",
            "smooth",
            "--prices",
            "p.csv",
            "--format",
            "json",
        ])
        .unwrap();
        let Commands::Smooth(args) = cli.command else {
            panic!("expected smooth command");
        };
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn test_prices_required() {
        assert!(Cli::try_parse_from(["fluxion-periods-cli", "detect"]).is_err());
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!(
            Cli::try_parse_from([
                "fluxion-periods-cli",
                "detect",
                "--prices",
                "p.csv",
                "--format",
                "xml",
            ])
            .is_err()
        );
    }
}
