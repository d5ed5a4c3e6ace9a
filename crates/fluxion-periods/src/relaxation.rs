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

//! Relaxation controller
//!
//! Each calendar day walks its own state machine:
//!
//! ```text
//! Baseline ──(target met)──────────────────────────────► Baseline
//!    │
//!    └─► Attempt 1 ─► Attempt 2 ─► ... ─► Attempt N ──► Exhausted
//!           │             │                   │
//!           └─────────────┴───(target met)────┴───────► Relaxed
//! ```
//!
//! Attempt `k` raises flex by `k × relaxation_step` percentage points (capped at
//! `MAX_FLEX`) and tries the configured level filter first, then no level filter.
//! A pass over the whole series is shared between all days that need it; a day
//! only keeps the periods that start on it.

use chrono::NaiveDate;
use fluxion_period_types::{
    DayOutcome, DayStats, DirectionResult, FilterCriteria, FilterStats, LevelFilter, Period,
    RelaxationCombination, RelaxationOutcome, criteria::MAX_FLEX,
};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::assembly::{assemble_periods, merge_overlapping};
use crate::filter::{clamp_flex, evaluate};
use crate::store::IntervalStore;
use crate::summary::annotate_periods;

/// Periods and per-day counts of one filter pass
#[derive(Debug, Clone)]
struct Pass {
    periods: Vec<Period>,
    counts: BTreeMap<NaiveDate, usize>,
    stats: FilterStats,
}

impl Pass {
    fn run(
        store: &IntervalStore,
        day_stats: &BTreeMap<NaiveDate, DayStats>,
        criteria: &FilterCriteria,
    ) -> Self {
        let (accepted, stats) = evaluate(store, day_stats, criteria);
        let periods = assemble_periods(store, &accepted, day_stats, criteria);

        let mut counts = BTreeMap::new();
        for period in &periods {
            *counts.entry(store.local_date(period.start)).or_default() += 1;
        }

        Self {
            periods,
            counts,
            stats,
        }
    }

    fn count(&self, date: NaiveDate) -> usize {
        self.counts.get(&date).copied().unwrap_or(0)
    }

    /// Periods starting on `date`, marked with the relaxation that produced them
    fn periods_for(
        &self,
        store: &IntervalStore,
        date: NaiveDate,
        relaxation_used: bool,
        relaxation_level: u32,
    ) -> Vec<Period> {
        self.periods
            .iter()
            .filter(|p| store.local_date(p.start) == date)
            .cloned()
            .map(|mut p| {
                p.relaxation_used = relaxation_used;
                p.relaxation_level = relaxation_level;
                p
            })
            .collect()
    }
}

type PassKey = (u32, RelaxationCombination);

/// Lazily computed relaxation passes, shared between days
#[derive(Debug)]
struct PassCache<'a> {
    store: &'a IntervalStore,
    day_stats: &'a BTreeMap<NaiveDate, DayStats>,
    criteria: &'a FilterCriteria,
    passes: BTreeMap<PassKey, Pass>,
}

impl<'a> PassCache<'a> {
    fn new(
        store: &'a IntervalStore,
        day_stats: &'a BTreeMap<NaiveDate, DayStats>,
        criteria: &'a FilterCriteria,
    ) -> Self {
        Self {
            store,
            day_stats,
            criteria,
            passes: BTreeMap::new(),
        }
    }

    fn get(&mut self, attempt: u32, combination: RelaxationCombination, flex: f32) -> &Pass {
        let (store, day_stats) = (self.store, self.day_stats);
        let criteria = self.criteria;
        self.passes.entry((attempt, combination)).or_insert_with(|| {
            let relaxed = match combination {
                RelaxationCombination::OriginalFilter => criteria.with_flex(flex),
                RelaxationCombination::AnyLevel => criteria
                    .with_flex(flex)
                    .with_classification_filter(LevelFilter::Any),
            };
            Pass::run(store, day_stats, &relaxed)
        })
    }
}

/// Flex of relaxation attempt `attempt` (1-based)
pub fn relaxed_flex(base_flex: f32, attempt: u32, step: f32) -> f32 {
    (clamp_flex(base_flex) + attempt as f32 * step / 100.0).min(MAX_FLEX)
}

/// Parameter combinations tried within one attempt, in order
pub fn combinations(criteria: &FilterCriteria) -> &'static [RelaxationCombination] {
    if criteria.classification_filter.is_any() {
        &[RelaxationCombination::OriginalFilter]
    } else {
        &[
            RelaxationCombination::OriginalFilter,
            RelaxationCombination::AnyLevel,
        ]
    }
}

/// Detect one direction's periods for every day in the store
pub fn detect_direction(
    store: &IntervalStore,
    day_stats: &BTreeMap<NaiveDate, DayStats>,
    criteria: &FilterCriteria,
) -> DirectionResult {
    if store.is_empty() {
        return DirectionResult::empty(criteria.direction);
    }

    let baseline = Pass::run(store, day_stats, criteria);
    let mut relaxed_passes = PassCache::new(store, day_stats, criteria);

    let mut selected: Vec<Period> = Vec::new();
    let mut days: Vec<DayOutcome> = Vec::new();

    for date in store.dates() {
        let (outcome, periods) = if day_stats.contains_key(&date) {
            relax_day(store, date, criteria, &baseline, &mut relaxed_passes)
        } else {
            (RelaxationOutcome::NoData, Vec::new())
        };

        selected.extend(periods);
        days.push(DayOutcome { date, outcome });
    }

    let mut periods = merge_overlapping(selected);
    annotate_periods(&mut periods, store);
    recount_after_merge(&mut days, &periods, store, criteria);

    for day in days.iter().filter(|d| d.outcome.is_insufficient()) {
        warn!(
            direction = %criteria.direction,
            date = %day.date,
            found = day.outcome.periods_found(),
            target = criteria.target_period_count,
            "Target period count not reached"
        );
    }

    DirectionResult {
        direction: criteria.direction,
        periods,
        days,
        filter_stats: baseline.stats,
    }
}

/// A period that runs past midnight can absorb periods the next day selected
/// on its own. Outcomes are lowered to the periods that still start on each day.
fn recount_after_merge(
    days: &mut [DayOutcome],
    periods: &[Period],
    store: &IntervalStore,
    criteria: &FilterCriteria,
) {
    let mut counts: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for period in periods {
        *counts.entry(store.local_date(period.start)).or_default() += 1;
    }

    for day in days {
        let count = counts.get(&day.date).copied().unwrap_or(0);
        if count < day.outcome.periods_found() {
            debug!(
                direction = %criteria.direction,
                date = %day.date,
                selected = day.outcome.periods_found(),
                remaining = count,
                "Periods absorbed by a period from the previous day"
            );
            day.outcome = day.outcome.with_found(count, criteria.target_period_count);
        }
    }
}

fn relax_day(
    store: &IntervalStore,
    date: NaiveDate,
    criteria: &FilterCriteria,
    baseline: &Pass,
    relaxed_passes: &mut PassCache<'_>,
) -> (RelaxationOutcome, Vec<Period>) {
    let target = criteria.target_period_count;
    let found = baseline.count(date);

    if found >= target || !criteria.relaxation_enabled {
        let outcome = RelaxationOutcome::Baseline {
            found,
            target,
            target_met: found >= target,
        };
        return (outcome, baseline.periods_for(store, date, false, 0));
    }

    // Best (attempt, combination, count) so far; strict improvement keeps the least relaxed
    let mut best: (u32, Option<RelaxationCombination>, usize) = (0, None, found);
    let mut attempts = 0;
    let mut previous_flex = clamp_flex(criteria.flex);

    for attempt in 1..=criteria.max_relaxation_attempts {
        if attempt > 1 && previous_flex >= MAX_FLEX {
            break;
        }
        let flex = relaxed_flex(criteria.flex, attempt, criteria.relaxation_step);
        previous_flex = flex;
        attempts = attempt;

        for &combination in combinations(criteria) {
            let pass = relaxed_passes.get(attempt, combination, flex);
            let count = pass.count(date);

            debug!(
                direction = %criteria.direction,
                %date,
                attempt,
                ?combination,
                flex,
                count,
                target,
                "Relaxation attempt"
            );

            if count >= target {
                let outcome = RelaxationOutcome::Relaxed {
                    attempt,
                    combination,
                    flex,
                    found: count,
                };
                return (outcome, pass.periods_for(store, date, true, attempt));
            }
            if count > best.2 {
                best = (attempt, Some(combination), count);
            }
        }
    }

    let (best_attempt, best_combination, best_found) = best;
    let periods = match best_combination {
        Some(combination) => {
            let flex = relaxed_flex(criteria.flex, best_attempt, criteria.relaxation_step);
            relaxed_passes
                .get(best_attempt, combination, flex)
                .periods_for(store, date, true, best_attempt)
        }
        None => baseline.periods_for(store, date, true, 0),
    };

    let outcome = RelaxationOutcome::Exhausted {
        best_found,
        best_attempt,
        target,
        attempts,
    };
    (outcome, periods)
}
