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

//! Output formatters for detected periods.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use comfy_table::{Attribute, Cell, Color, Table, presets::UTF8_FULL};
use fluxion_period_types::{
    DirectionResult, PeriodDirection, PeriodSet, PriceInterval, RelaxationCombination,
    RelaxationOutcome,
};

/// Formatter for pretty tables
#[derive(Debug)]
pub struct TableFormatter;

/// Formatter for machine-readable output
#[derive(Debug)]
pub struct JsonFormatter;

fn local_time(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string()
}

fn bold(text: &str) -> Cell {
    Cell::new(text).add_attribute(Attribute::Bold)
}

fn describe_outcome(outcome: &RelaxationOutcome) -> String {
    match outcome {
        RelaxationOutcome::NoData => "no data".to_owned(),
        RelaxationOutcome::Baseline {
            found,
            target,
            target_met,
        } => {
            if *target_met {
                format!("baseline ({found}/{target})")
            } else {
                format!("baseline, short ({found}/{target})")
            }
        }
        RelaxationOutcome::Relaxed {
            attempt,
            combination,
            flex,
            found,
        } => {
            let filter = match combination {
                RelaxationCombination::OriginalFilter => "level filter",
                RelaxationCombination::AnyLevel => "any level",
            };
            format!(
                "relaxed #{attempt}, flex {:.0}%, {filter} ({found})",
                flex * 100.0
            )
        }
        RelaxationOutcome::Exhausted {
            best_found,
            best_attempt,
            target,
            attempts,
        } => format!(
            "exhausted after {attempts}, kept #{best_attempt} ({best_found}/{target})"
        ),
    }
}

impl TableFormatter {
    /// Format both directions: period tables followed by per-day outcomes
    pub fn format_periods(result: &PeriodSet, tz: Tz) -> String {
        let mut output = String::new();

        for direction in [PeriodDirection::Best, PeriodDirection::Peak] {
            let direction_result = result.direction(direction);
            output.push_str(&format!(
                "{} periods: {}\n",
                direction.as_str(),
                direction_result.periods.len()
            ));
            output.push_str(&Self::format_direction(direction_result, tz));
            output.push('\n');
        }

        output.push_str(&Self::format_days(result));
        output.push('\n');

        let smoothed = result.smoothed_intervals().count();
        output.push_str(&format!(
            "{} intervals over {} days, {} smoothed\n",
            result.intervals.len(),
            result.day_stats.len(),
            smoothed
        ));
        output
    }

    fn format_direction(result: &DirectionResult, tz: Tz) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec![
            bold("#"),
            bold("Start"),
            bold("End"),
            bold("Minutes"),
            bold("Avg\n(ct/kWh)"),
            bold("Min / Max"),
            bold("Volatility"),
            bold("vs Day\n(%)"),
            bold("Relaxed"),
        ]);

        for period in &result.periods {
            let summary = &period.summary;
            let relaxed = if period.relaxation_used {
                Cell::new(format!("level {}", period.relaxation_level)).fg(Color::Yellow)
            } else {
                Cell::new("-")
            };
            let diff = summary
                .diff_from_reference_pct
                .map_or_else(|| "-".to_owned(), |d| format!("{d:+.1}"));

            table.add_row(vec![
                Cell::new(format!("{}/{}", summary.period_index, summary.periods_in_day)),
                Cell::new(local_time(period.start, tz)),
                Cell::new(local_time(period.end, tz)),
                Cell::new(summary.duration_minutes),
                Cell::new(format!("{:.2}", summary.price_avg)),
                Cell::new(format!("{:.2} / {:.2}", summary.price_min, summary.price_max)),
                Cell::new(summary.volatility.as_str()),
                Cell::new(diff),
                relaxed,
            ]);
        }

        table.to_string()
    }

    fn format_days(result: &PeriodSet) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec![
            bold("Date"),
            bold("Min"),
            bold("Avg"),
            bold("Max"),
            bold("Best"),
            bold("Peak"),
        ]);

        for stats in &result.day_stats {
            let outcome_cell = |direction: PeriodDirection| {
                match result.direction(direction).outcome_for(stats.date) {
                    Some(outcome) if outcome.is_insufficient() => {
                        Cell::new(describe_outcome(&outcome)).fg(Color::Red)
                    }
                    Some(outcome) => Cell::new(describe_outcome(&outcome)),
                    None => Cell::new("-"),
                }
            };

            table.add_row(vec![
                Cell::new(stats.date),
                Cell::new(format!("{:.2}", stats.min)),
                Cell::new(format!("{:.2}", stats.mean)),
                Cell::new(format!("{:.2}", stats.max)),
                outcome_cell(PeriodDirection::Best),
                outcome_cell(PeriodDirection::Peak),
            ]);
        }

        table.to_string()
    }

    /// Format intervals replaced by outlier smoothing
    pub fn format_smoothed(intervals: &[PriceInterval], tz: Tz) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(vec![
            bold("Start"),
            bold("Reference\n(ct/kWh)"),
            bold("Working\n(ct/kWh)"),
            bold("Level"),
        ]);

        let mut count = 0;
        for interval in intervals.iter().filter(|i| i.smoothed) {
            count += 1;
            table.add_row(vec![
                Cell::new(local_time(interval.start, tz)),
                Cell::new(format!("{:.2}", interval.reference_price)),
                Cell::new(format!("{:.2}", interval.working_price)).fg(Color::Green),
                Cell::new(interval.level.as_str()),
            ]);
        }

        let mut output = table.to_string();
        output.push('\n');
        output.push_str(&format!(
            "{count} of {} intervals smoothed\n",
            intervals.len()
        ));
        output
    }
}

impl JsonFormatter {
    pub fn format(result: &PeriodSet) -> Result<String> {
        serde_json::to_string_pretty(result).context("Failed to serialize periods")
    }

    pub fn format_smoothed(intervals: &[PriceInterval]) -> Result<String> {
        let smoothed: Vec<&PriceInterval> = intervals.iter().filter(|i| i.smoothed).collect();
        serde_json::to_string_pretty(&smoothed).context("Failed to serialize intervals")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fluxion_period_types::PriceLevel;
    use fluxion_periods::{EngineConfig, calculate_periods};

    fn step_day() -> Vec<PriceInterval> {
        let base = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        [10.0, 10.0, 10.0, 10.0, 20.0, 20.0, 20.0, 20.0]
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                PriceInterval::new(
                    base + chrono::Duration::minutes(i as i64 * 15),
                    p,
                    PriceLevel::Normal,
                )
            })
            .collect()
    }

    fn result() -> PeriodSet {
        let mut config = EngineConfig {
            timezone: chrono_tz::UTC,
            ..EngineConfig::default()
        };
        config.best.target_period_count = 1;
        config.peak.target_period_count = 1;
        calculate_periods(step_day(), &config).unwrap()
    }

    #[test]
    fn test_table_lists_both_directions() {
        let output = TableFormatter::format_periods(&result(), chrono_tz::UTC);
        assert!(output.contains("best periods: 1"));
        assert!(output.contains("peak periods: 1"));
        assert!(output.contains("2025-03-01 00:00"));
        assert!(output.contains("2025-03-01 01:00"));
        assert!(output.contains("baseline (1/1)"));
        assert!(output.contains("8 intervals over 1 days, 0 smoothed"));
    }

    #[test]
    fn test_table_uses_local_time() {
        let output = TableFormatter::format_periods(&result(), chrono_tz::Europe::Prague);
        // UTC+1 in March before the DST switch
        assert!(output.contains("2025-03-01 01:00"));
        assert!(output.contains("2025-03-01 02:00"));
    }

    #[test]
    fn test_empty_result() {
        let output = TableFormatter::format_periods(&PeriodSet::empty(), chrono_tz::UTC);
        assert!(output.contains("best periods: 0"));
        assert!(output.contains("0 intervals over 0 days"));
    }

    #[test]
    fn test_json_round_trips() {
        let original = result();
        let json = JsonFormatter::format(&original).unwrap();
        let parsed: PeriodSet = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.best.periods.len(), original.best.periods.len());
        assert!(json.contains("\"state\": \"baseline\""));
    }

    #[test]
    fn test_smoothed_table() {
        let mut intervals = step_day();
        intervals[2].apply_smoothing(11.0);
        let output = TableFormatter::format_smoothed(&intervals, chrono_tz::UTC);
        assert!(output.contains("11.00"));
        assert!(output.contains("1 of 8 intervals smoothed"));

        let json = JsonFormatter::format_smoothed(&intervals).unwrap();
        let parsed: Vec<PriceInterval> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn test_describe_exhausted() {
        let text = describe_outcome(&RelaxationOutcome::Exhausted {
            best_found: 1,
            best_attempt: 3,
            target: 2,
            attempts: 11,
        });
        assert_eq!(text, "exhausted after 11, kept #3 (1/2)");
    }
}
