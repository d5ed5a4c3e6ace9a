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

use chrono::NaiveDate;
use fluxion_period_types::{DayStats, PriceInterval};
use std::collections::BTreeMap;

use crate::store::IntervalStore;

/// Reference price statistics for one day's intervals.
/// Returns None for an empty day.
pub fn compute_day_stats(date: NaiveDate, intervals: &[PriceInterval]) -> Option<DayStats> {
    if intervals.is_empty() {
        return None;
    }

    let prices = intervals.iter().map(|i| i.reference_price);
    let min = prices.clone().fold(f32::INFINITY, f32::min);
    let max = prices.clone().fold(f32::NEG_INFINITY, f32::max);
    let mean = prices.sum::<f32>() / intervals.len() as f32;

    // Float summation can nudge the mean just outside [min, max] on flat days
    let mean = mean.clamp(min, max);

    Some(DayStats {
        date,
        min,
        max,
        mean,
        interval_count: intervals.len(),
    })
}

/// Statistics for every day in the store
pub fn compute_all_day_stats(store: &IntervalStore) -> BTreeMap<NaiveDate, DayStats> {
    store
        .dates()
        .filter_map(|date| compute_day_stats(date, store.day(date)).map(|stats| (date, stats)))
        .collect()
}
