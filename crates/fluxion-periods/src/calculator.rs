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

//! Period calculation pipeline
//!
//! smoothing → day statistics → per-direction filter/assembly/relaxation → summaries

use fluxion_period_types::{PeriodDirection, PeriodSet, PriceInterval, ValidationResult};
use tracing::info;

use crate::cache::{PeriodCache, fingerprint};
use crate::config::EngineConfig;
use crate::day_stats::compute_all_day_stats;
use crate::error::{PeriodEngineResult, PeriodError};
use crate::relaxation::detect_direction;
use crate::smoothing::smooth_store;
use crate::store::IntervalStore;

/// Run the full pipeline on a validated store
pub fn compute_periods(mut store: IntervalStore, config: &EngineConfig) -> PeriodSet {
    if store.is_empty() {
        return PeriodSet::empty();
    }

    let smoothed = if config.smoothing.enabled {
        smooth_store(&mut store)
    } else {
        0
    };

    let day_stats = compute_all_day_stats(&store);
    let best = detect_direction(&store, &day_stats, &config.best);
    let peak = detect_direction(&store, &day_stats, &config.peak);

    info!(
        timezone = %store.timezone(),
        days = day_stats.len(),
        intervals = store.len(),
        smoothed,
        best_periods = best.periods.len(),
        peak_periods = peak.periods.len(),
        insufficient_best_days = best.insufficient_days().count(),
        insufficient_peak_days = peak.insufficient_days().count(),
        "Price periods calculated"
    );

    PeriodSet {
        best,
        peak,
        intervals: store.into_intervals(),
        day_stats: day_stats.into_values().collect(),
    }
}

/// Check the contract, clamp the configuration and compute without caching
pub fn calculate_periods(
    intervals: Vec<PriceInterval>,
    config: &EngineConfig,
) -> PeriodEngineResult<PeriodSet> {
    check_directions(config)?;
    let (config, _) = config.clone().validated();
    let store = IntervalStore::new(intervals, config.timezone)?;
    Ok(compute_periods(store, &config))
}

fn check_directions(config: &EngineConfig) -> PeriodEngineResult<()> {
    for (expected, criteria) in [
        (PeriodDirection::Best, &config.best),
        (PeriodDirection::Peak, &config.peak),
    ] {
        if criteria.direction != expected {
            return Err(PeriodError::DirectionMismatch {
                expected,
                found: criteria.direction,
            });
        }
    }
    Ok(())
}

/// Cached period calculator.
///
/// Owns the configuration and a single-slot cache; callers serialize access.
#[derive(Debug)]
pub struct PeriodCalculator {
    config: EngineConfig,
    validation: ValidationResult,
    cache: PeriodCache,
}

impl PeriodCalculator {
    /// Create a calculator; out-of-range settings are clamped and reported in
    /// [`Self::validation`].
    pub fn new(config: EngineConfig) -> PeriodEngineResult<Self> {
        check_directions(&config)?;
        let (config, validation) = config.validated();
        Ok(Self {
            config,
            validation,
            cache: PeriodCache::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Adjustments made to the last supplied configuration
    pub fn validation(&self) -> &ValidationResult {
        &self.validation
    }

    pub fn cache(&self) -> &PeriodCache {
        &self.cache
    }

    /// Compute periods, reusing the previous result when inputs and
    /// configuration are unchanged.
    pub fn calculate(&mut self, intervals: Vec<PriceInterval>) -> PeriodEngineResult<&PeriodSet> {
        let store = IntervalStore::new(intervals, self.config.timezone)?;
        let key = fingerprint(&store, &self.config)?;

        let config = &self.config;
        self.cache.get_or_compute(key, || Ok(compute_periods(store, config)))
    }

    /// Replace the configuration and drop the cached result
    pub fn update_config(&mut self, config: EngineConfig) -> PeriodEngineResult<&ValidationResult> {
        check_directions(&config)?;
        let (config, validation) = config.validated();
        self.config = config;
        self.validation = validation;
        self.cache.invalidate();
        Ok(&self.validation)
    }

    pub fn invalidate(&mut self) {
        self.cache.invalidate();
    }

    /// Working-price series of the last result
    pub fn smoothed_series(&self) -> Option<&[PriceInterval]> {
        self.cache.last().map(|set| set.intervals.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use fluxion_period_types::{FilterCriteria, PriceLevel};

    fn make_day(prices: &[f32]) -> Vec<PriceInterval> {
        let base = Utc.with_ymd_and_hms(2025, 6, 15, 0, 0, 0).unwrap();
        prices
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

    fn utc_config() -> EngineConfig {
        EngineConfig {
            timezone: chrono_tz::UTC,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_direction_mismatch_rejected() {
        let mut config = utc_config();
        config.best = FilterCriteria::peak();
        let err = PeriodCalculator::new(config).unwrap_err();
        assert_eq!(
            err,
            PeriodError::DirectionMismatch {
                expected: PeriodDirection::Best,
                found: PeriodDirection::Peak,
            }
        );
    }

    #[test]
    fn test_new_clamps_and_reports() {
        let mut config = utc_config();
        config.best.flex = 0.75;
        let calculator = PeriodCalculator::new(config).unwrap();
        assert!((calculator.config().best.flex - 0.5).abs() < 0.001);
        assert!(calculator.validation().has_warnings());
    }

    #[test]
    fn test_empty_input() {
        let mut calculator = PeriodCalculator::new(utc_config()).unwrap();
        let result = calculator.calculate(Vec::new()).unwrap();
        assert!(result.best.periods.is_empty());
        assert!(result.peak.periods.is_empty());
        assert!(result.intervals.is_empty());
    }

    #[test]
    fn test_cache_reuse_and_update_config() {
        let mut calculator = PeriodCalculator::new(utc_config()).unwrap();
        let day = make_day(&[10.0, 10.0, 10.0, 10.0, 20.0, 20.0, 20.0, 20.0]);

        calculator.calculate(day.clone()).unwrap();
        calculator.calculate(day.clone()).unwrap();
        assert_eq!(calculator.cache().hits(), 1);
        assert_eq!(calculator.cache().misses(), 1);

        let mut config = utc_config();
        config.smoothing.enabled = false;
        calculator.update_config(config).unwrap();
        assert!(calculator.smoothed_series().is_none());

        calculator.calculate(day).unwrap();
        assert_eq!(calculator.cache().misses(), 2);
        assert_eq!(calculator.smoothed_series().map(<[_]>::len), Some(8));
    }

    #[test]
    fn test_contract_violation_surfaces() {
        let mut calculator = PeriodCalculator::new(utc_config()).unwrap();
        let mut day = make_day(&[10.0, 20.0]);
        day.swap(0, 1);
        assert!(matches!(
            calculator.calculate(day),
            Err(PeriodError::UnorderedIntervals { .. })
        ));
    }

    #[test]
    fn test_calculate_periods_clamps_config() {
        let day = make_day(&[10.0, 10.0, 10.0, 10.0, 12.5, 12.5, 12.5, 12.5]);
        let mut config = utc_config();
        config.best.flex = 0.5;
        config.best.min_distance_from_mean = -50.0;

        // A negative distance would let the 12.5 ct intervals through
        let result = calculate_periods(day.clone(), &config).unwrap();
        let (clamped, _) = config.validated();
        let expected = calculate_periods(day, &clamped).unwrap();

        assert_eq!(result.best.periods.len(), 1);
        assert_eq!(result.best.periods[0].interval_count(), 4);
        assert_eq!(result, expected);
    }

    #[test]
    fn test_calculate_periods_without_cache() {
        let day = make_day(&[10.0, 10.0, 10.0, 10.0, 20.0, 20.0, 20.0, 20.0]);
        let result = calculate_periods(day, &utc_config()).unwrap();
        assert_eq!(result.day_stats.len(), 1);
        assert_eq!(result.intervals.len(), 8);
    }
}
