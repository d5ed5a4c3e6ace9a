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
use fluxion_period_types::{Period, PeriodDirection, PeriodSummary, VolatilityLevel};
use std::collections::BTreeMap;

use crate::store::IntervalStore;

/// Reference prices this close to zero give no meaningful percentage
const MIN_REFERENCE_MAGNITUDE: f32 = 0.01;

/// Price aggregates of one period, from reference prices.
///
/// `period_index` and `periods_in_day` are left at zero; they depend on the
/// other periods and are filled by [`annotate_periods`].
pub fn summarize(period: &Period, start_date: NaiveDate) -> PeriodSummary {
    if period.intervals.is_empty() {
        return PeriodSummary::default();
    }

    let prices: Vec<f32> = period.intervals.iter().map(|i| i.reference_price).collect();
    let count = prices.len() as f32;
    let avg = prices.iter().sum::<f32>() / count;
    let min = prices.iter().copied().fold(f32::INFINITY, f32::min);
    let max = prices.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    let variance = prices.iter().map(|p| (p - avg).powi(2)).sum::<f32>() / count;
    let std_dev = variance.sqrt();
    let cv = if avg.abs() > f32::EPSILON {
        std_dev / avg.abs()
    } else if std_dev > f32::EPSILON {
        f32::INFINITY
    } else {
        0.0
    };

    let diff_from_reference_pct = period.day_stats_by_date.get(&start_date).and_then(|stats| {
        let reference = match period.direction {
            PeriodDirection::Best => stats.min,
            PeriodDirection::Peak => stats.max,
        };
        (reference.abs() >= MIN_REFERENCE_MAGNITUDE)
            .then(|| (avg - reference) / reference.abs() * 100.0)
    });

    PeriodSummary {
        duration_minutes: period.duration_minutes(),
        price_avg: avg,
        price_min: min,
        price_max: max,
        price_spread: max - min,
        volatility: VolatilityLevel::from_cv(cv),
        diff_from_reference_pct,
        period_index: 0,
        periods_in_day: 0,
    }
}

/// Fill summaries of a direction's periods, including their position among
/// periods starting on the same local day. Periods must be sorted by start.
pub fn annotate_periods(periods: &mut [Period], store: &IntervalStore) {
    let start_dates: Vec<NaiveDate> = periods.iter().map(|p| store.local_date(p.start)).collect();

    let mut per_day: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for date in &start_dates {
        *per_day.entry(*date).or_default() += 1;
    }

    let mut seen: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for (period, date) in periods.iter_mut().zip(start_dates) {
        let index = seen.entry(date).or_default();
        *index += 1;

        let mut summary = summarize(period, date);
        summary.period_index = *index;
        summary.periods_in_day = per_day.get(&date).copied().unwrap_or(0);
        period.summary = summary;
    }
}
