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

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::criteria::PeriodDirection;
use crate::interval::PriceInterval;

// ============= Day Statistics =============

/// Reference price statistics of one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayStats {
    pub date: NaiveDate,
    pub min: f32,
    pub max: f32,
    pub mean: f32,
    pub interval_count: usize,
}

impl DayStats {
    /// max - min
    pub fn spread(&self) -> f32 {
        self.max - self.min
    }

    /// Spread as percentage of the absolute mean, None for a near-zero mean
    pub fn spread_pct(&self) -> Option<f32> {
        if self.mean.abs() < 0.01 {
            None
        } else {
            Some(self.spread() / self.mean.abs() * 100.0)
        }
    }
}

// ============= Volatility =============

/// Coefficient of variation below which a period counts as calm
pub const VOLATILITY_MODERATE_CV: f32 = 0.15;
/// Coefficient of variation from which a period counts as high volatility
pub const VOLATILITY_HIGH_CV: f32 = 0.30;
/// Coefficient of variation from which a period counts as very high volatility
pub const VOLATILITY_VERY_HIGH_CV: f32 = 0.50;

/// Price volatility inside a period
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityLevel {
    #[default]
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl VolatilityLevel {
    /// Classify a coefficient of variation (std_dev / |avg|)
    pub fn from_cv(cv: f32) -> Self {
        if cv >= VOLATILITY_VERY_HIGH_CV {
            VolatilityLevel::VeryHigh
        } else if cv >= VOLATILITY_HIGH_CV {
            VolatilityLevel::High
        } else if cv >= VOLATILITY_MODERATE_CV {
            VolatilityLevel::Moderate
        } else {
            VolatilityLevel::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VolatilityLevel::Low => "low",
            VolatilityLevel::Moderate => "moderate",
            VolatilityLevel::High => "high",
            VolatilityLevel::VeryHigh => "very_high",
        }
    }
}

// ============= Period =============

/// Aggregates over a period's reference prices
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub duration_minutes: u32,
    pub price_avg: f32,
    pub price_min: f32,
    pub price_max: f32,
    /// price_max - price_min
    pub price_spread: f32,
    pub volatility: VolatilityLevel,
    /// Average vs. the start day's minimum (best) or maximum (peak), in percent
    pub diff_from_reference_pct: Option<f32>,
    /// 1-based position among the direction's periods starting on the same day
    pub period_index: usize,
    pub periods_in_day: usize,
}

/// A maximal run of accepted intervals, at least `min_period_length` long
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub direction: PeriodDirection,
    pub start: DateTime<Utc>,
    /// Exclusive end (end of the last interval)
    pub end: DateTime<Utc>,
    pub intervals: Vec<PriceInterval>,
    /// Statistics of every calendar day the period touches
    pub day_stats_by_date: BTreeMap<NaiveDate, DayStats>,
    pub relaxation_used: bool,
    /// Relaxation attempt that produced this period (0 = baseline)
    pub relaxation_level: u32,
    pub summary: PeriodSummary,
}

impl Period {
    pub fn duration_minutes(&self) -> u32 {
        self.intervals.iter().map(|i| i.duration_minutes).sum()
    }

    pub fn interval_count(&self) -> usize {
        self.intervals.len()
    }

    /// True when `instant` falls inside [start, end)
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }

    /// True when the period touches more than one calendar day
    pub fn spans_midnight(&self) -> bool {
        self.day_stats_by_date.len() > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volatility_thresholds() {
        assert_eq!(VolatilityLevel::from_cv(0.0), VolatilityLevel::Low);
        assert_eq!(VolatilityLevel::from_cv(0.149), VolatilityLevel::Low);
        assert_eq!(VolatilityLevel::from_cv(0.15), VolatilityLevel::Moderate);
        assert_eq!(VolatilityLevel::from_cv(0.35), VolatilityLevel::High);
        assert_eq!(VolatilityLevel::from_cv(0.8), VolatilityLevel::VeryHigh);
    }

    #[test]
    fn test_day_stats_spread() {
        let stats = DayStats {
            date: NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
            min: 10.0,
            max: 20.0,
            mean: 15.0,
            interval_count: 8,
        };
        assert!((stats.spread() - 10.0).abs() < 0.001);
        assert!((stats.spread_pct().unwrap() - 66.666).abs() < 0.01);
    }

    #[test]
    fn test_day_stats_spread_pct_near_zero_mean() {
        let stats = DayStats {
            date: NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
            min: -1.0,
            max: 1.0,
            mean: 0.0,
            interval_count: 2,
        };
        assert!(stats.spread_pct().is_none());
    }
}
