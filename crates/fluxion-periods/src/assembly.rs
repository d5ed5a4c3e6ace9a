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
use fluxion_period_types::{DayStats, FilterCriteria, Period, PeriodSummary};
use std::collections::BTreeMap;
use tracing::debug;

use crate::store::IntervalStore;

/// Group consecutive accepted intervals into periods.
///
/// The scan runs across day boundaries. A rejected interval or a hole in the
/// data closes the current run; runs shorter than `min_period_length` are dropped.
pub fn assemble_periods(
    store: &IntervalStore,
    accepted: &[bool],
    day_stats: &BTreeMap<NaiveDate, DayStats>,
    criteria: &FilterCriteria,
) -> Vec<Period> {
    let intervals = store.intervals();
    let mut periods = Vec::new();
    let mut run: Vec<usize> = Vec::new();

    for (idx, interval) in intervals.iter().enumerate() {
        if !accepted.get(idx).copied().unwrap_or(false) {
            close_run(store, &mut run, day_stats, criteria, &mut periods);
            continue;
        }

        if let Some(&last) = run.last()
            && intervals[last].end() != interval.start
        {
            close_run(store, &mut run, day_stats, criteria, &mut periods);
        }
        run.push(idx);
    }
    close_run(store, &mut run, day_stats, criteria, &mut periods);

    periods
}

fn close_run(
    store: &IntervalStore,
    run: &mut Vec<usize>,
    day_stats: &BTreeMap<NaiveDate, DayStats>,
    criteria: &FilterCriteria,
    periods: &mut Vec<Period>,
) {
    let (Some(&first), Some(&last)) = (run.first(), run.last()) else {
        return;
    };

    let intervals = store.intervals();
    let duration: u32 = run.iter().map(|&i| intervals[i].duration_minutes).sum();

    if duration >= criteria.min_period_length {
        let touched: BTreeMap<NaiveDate, DayStats> = run
            .iter()
            .filter_map(|&i| {
                let date = store.date_of(i);
                day_stats.get(&date).map(|stats| (date, *stats))
            })
            .collect();

        periods.push(Period {
            direction: criteria.direction,
            start: intervals[first].start,
            end: intervals[last].end(),
            intervals: run.iter().map(|&i| intervals[i].clone()).collect(),
            day_stats_by_date: touched,
            relaxation_used: false,
            relaxation_level: 0,
            summary: PeriodSummary::default(),
        });
    } else {
        debug!(
            direction = %criteria.direction,
            start = %intervals[first].start,
            duration,
            min_period_length = criteria.min_period_length,
            "Discarding run shorter than minimum period length"
        );
    }

    run.clear();
}

/// Merge periods that overlap or touch into single periods.
///
/// Input order does not matter; output is sorted by start. A merged period keeps
/// the highest relaxation level of its parts.
pub fn merge_overlapping(mut periods: Vec<Period>) -> Vec<Period> {
    periods.sort_by_key(|p| p.start);

    let mut merged: Vec<Period> = Vec::with_capacity(periods.len());
    for period in periods {
        match merged.last_mut() {
            Some(current) if period.start <= current.end => absorb(current, period),
            _ => merged.push(period),
        }
    }
    merged
}

fn absorb(target: &mut Period, other: Period) {
    for interval in other.intervals {
        if !target.intervals.iter().any(|i| i.start == interval.start) {
            target.intervals.push(interval);
        }
    }
    target.intervals.sort_by_key(|i| i.start);

    target.end = target.end.max(other.end);
    target.day_stats_by_date.extend(other.day_stats_by_date);
    target.relaxation_used |= other.relaxation_used;
    target.relaxation_level = target.relaxation_level.max(other.relaxation_level);
}
