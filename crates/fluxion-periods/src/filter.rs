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

//! Candidate filter: decides per interval whether it may join a period.
//!
//! Three tests, all against the interval's own calendar day:
//!
//! 1. **Flex** - working price within `flex` of the daily extreme
//! 2. **Distance** - working price at least `min_distance_from_mean` percent
//!    away from the daily mean, on the right side
//! 3. **Level** - classification band allowed by the level filter
//!
//! Thresholds use `|reference|` so negative prices tighten towards the extreme
//! instead of flipping the comparison.

use chrono::NaiveDate;
use fluxion_period_types::{
    DayStats, FilterCriteria, FilterStats, PeriodDirection, PriceInterval,
    criteria::MAX_FLEX,
};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::store::IntervalStore;

/// Flex above which the distance requirement starts scaling down
pub const RECONCILIATION_FLEX_THRESHOLD: f32 = 0.20;
/// Lowest fraction of the configured distance that survives scaling
pub const RECONCILIATION_MIN_SCALE: f32 = 0.25;
const RECONCILIATION_SLOPE: f32 = 2.5;

/// First test an interval failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Flex,
    Distance,
    Level,
}

/// Clamp flex into [0, `MAX_FLEX`], warning when the cap applies
pub fn clamp_flex(flex: f32) -> f32 {
    if flex > MAX_FLEX {
        warn!(
            flex,
            max = MAX_FLEX,
            "Flex above maximum, clamping; detection above the cap is unreliable"
        );
        MAX_FLEX
    } else if flex.is_nan() {
        warn!("Flex is not a number, using 0");
        0.0
    } else if flex < 0.0 {
        warn!(flex, "Negative flex, clamping to 0");
        0.0
    } else {
        flex
    }
}

/// Distance requirement after reconciliation with a high flex.
///
/// A wide flex lets intervals far from the extreme in, and a fixed distance
/// requirement would then throw most of them out again. Above 20% flex the
/// distance shrinks linearly, but never below a quarter of the configured value.
pub fn effective_min_distance(flex: f32, min_distance_from_mean: f32) -> f32 {
    if flex <= RECONCILIATION_FLEX_THRESHOLD {
        return min_distance_from_mean;
    }
    let scale = (1.0 - (flex - RECONCILIATION_FLEX_THRESHOLD) * RECONCILIATION_SLOPE)
        .max(RECONCILIATION_MIN_SCALE);
    min_distance_from_mean * scale
}

/// Price limits derived from one day's statistics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayThresholds {
    pub direction: PeriodDirection,
    /// Flex limit around the daily extreme
    pub proximity_limit: f32,
    /// Distance limit around the daily mean
    pub distance_limit: f32,
}

impl DayThresholds {
    /// `flex` as a fraction, `min_distance` in percent (already reconciled)
    pub fn new(stats: &DayStats, direction: PeriodDirection, flex: f32, min_distance: f32) -> Self {
        let distance = stats.mean.abs() * min_distance / 100.0;
        match direction {
            PeriodDirection::Best => Self {
                direction,
                proximity_limit: stats.min + stats.min.abs() * flex,
                distance_limit: stats.mean - distance,
            },
            PeriodDirection::Peak => Self {
                direction,
                proximity_limit: stats.max - stats.max.abs() * flex,
                distance_limit: stats.mean + distance,
            },
        }
    }

    pub fn passes_flex(&self, price: f32) -> bool {
        match self.direction {
            PeriodDirection::Best => price <= self.proximity_limit,
            PeriodDirection::Peak => price >= self.proximity_limit,
        }
    }

    pub fn passes_distance(&self, price: f32) -> bool {
        match self.direction {
            PeriodDirection::Best => price <= self.distance_limit,
            PeriodDirection::Peak => price >= self.distance_limit,
        }
    }
}

/// Run the three tests on one interval. `None` means accepted.
pub fn check_interval(
    interval: &PriceInterval,
    thresholds: &DayThresholds,
    criteria: &FilterCriteria,
) -> Option<Rejection> {
    if !thresholds.passes_flex(interval.working_price) {
        Some(Rejection::Flex)
    } else if !thresholds.passes_distance(interval.working_price) {
        Some(Rejection::Distance)
    } else if !criteria.classification_filter.allows(interval.level) {
        Some(Rejection::Level)
    } else {
        None
    }
}

/// Evaluate every interval of the store.
///
/// Returns one accept flag per interval (store order) plus rejection counts.
pub fn evaluate(
    store: &IntervalStore,
    day_stats: &BTreeMap<NaiveDate, DayStats>,
    criteria: &FilterCriteria,
) -> (Vec<bool>, FilterStats) {
    let flex = clamp_flex(criteria.flex);
    let min_distance = effective_min_distance(flex, criteria.min_distance_from_mean);

    let thresholds: BTreeMap<NaiveDate, DayThresholds> = day_stats
        .iter()
        .map(|(date, stats)| {
            (
                *date,
                DayThresholds::new(stats, criteria.direction, flex, min_distance),
            )
        })
        .collect();

    let mut stats = FilterStats::default();
    let mut accepted = vec![false; store.len()];

    for (idx, interval) in store.intervals().iter().enumerate() {
        let Some(day) = thresholds.get(&store.date_of(idx)) else {
            continue;
        };
        stats.evaluated += 1;

        match check_interval(interval, day, criteria) {
            None => {
                stats.accepted += 1;
                accepted[idx] = true;
            }
            Some(Rejection::Flex) => stats.rejected_flex += 1,
            Some(Rejection::Distance) => stats.rejected_distance += 1,
            Some(Rejection::Level) => stats.rejected_level += 1,
        }
    }

    debug!(
        direction = %criteria.direction,
        flex,
        min_distance,
        evaluated = stats.evaluated,
        accepted = stats.accepted,
        rejected_flex = stats.rejected_flex,
        rejected_distance = stats.rejected_distance,
        rejected_level = stats.rejected_level,
        "Filter pass complete"
    );

    (accepted, stats)
}
