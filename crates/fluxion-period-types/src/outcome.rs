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

//! Results of a period calculation

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::criteria::PeriodDirection;
use crate::interval::PriceInterval;
use crate::period::{DayStats, Period};

/// Parameter combination tried within one relaxation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelaxationCombination {
    /// Relaxed flex, configured level filter
    OriginalFilter,
    /// Relaxed flex, level filter disabled
    AnyLevel,
}

/// How the relaxation controller finished for one day and direction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RelaxationOutcome {
    /// No intervals for the day
    NoData,

    /// Original criteria were used. `target_met` is false when relaxation is
    /// disabled and the baseline fell short, or when a period running in from
    /// the previous day absorbed one of this day's periods.
    Baseline {
        found: usize,
        target: usize,
        target_met: bool,
    },

    /// A relaxation attempt reached the target
    Relaxed {
        attempt: u32,
        combination: RelaxationCombination,
        flex: f32,
        found: usize,
    },

    /// Every attempt fell short; the best result found is returned
    Exhausted {
        best_found: usize,
        /// Attempt the returned periods come from (0 = baseline)
        best_attempt: u32,
        target: usize,
        attempts: u32,
    },
}

impl RelaxationOutcome {
    /// Target period count was not reached
    pub fn is_insufficient(&self) -> bool {
        match self {
            RelaxationOutcome::Exhausted { .. } => true,
            RelaxationOutcome::Baseline { target_met, .. } => !target_met,
            RelaxationOutcome::NoData | RelaxationOutcome::Relaxed { .. } => false,
        }
    }

    pub fn relaxation_used(&self) -> bool {
        matches!(
            self,
            RelaxationOutcome::Relaxed { .. } | RelaxationOutcome::Exhausted { .. }
        )
    }

    pub fn periods_found(&self) -> usize {
        match self {
            RelaxationOutcome::NoData => 0,
            RelaxationOutcome::Baseline { found, .. } | RelaxationOutcome::Relaxed { found, .. } => {
                *found
            }
            RelaxationOutcome::Exhausted { best_found, .. } => *best_found,
        }
    }

    /// Same outcome with a lower period count.
    ///
    /// A `Relaxed` day that drops below `target` becomes `Exhausted` at the
    /// attempt that produced it.
    #[must_use]
    pub fn with_found(self, found: usize, target: usize) -> Self {
        match self {
            RelaxationOutcome::NoData => RelaxationOutcome::NoData,
            RelaxationOutcome::Baseline { .. } => RelaxationOutcome::Baseline {
                found,
                target,
                target_met: found >= target,
            },
            RelaxationOutcome::Relaxed {
                attempt,
                combination,
                flex,
                ..
            } => {
                if found >= target {
                    RelaxationOutcome::Relaxed {
                        attempt,
                        combination,
                        flex,
                        found,
                    }
                } else {
                    RelaxationOutcome::Exhausted {
                        best_found: found,
                        best_attempt: attempt,
                        target,
                        attempts: attempt,
                    }
                }
            }
            RelaxationOutcome::Exhausted {
                best_attempt,
                attempts,
                ..
            } => RelaxationOutcome::Exhausted {
                best_found: found,
                best_attempt,
                target,
                attempts,
            },
        }
    }
}

/// Relaxation outcome of one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayOutcome {
    pub date: NaiveDate,
    pub outcome: RelaxationOutcome,
}

/// Why intervals were rejected in a filter pass (first failing test counts)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterStats {
    pub evaluated: usize,
    pub accepted: usize,
    pub rejected_flex: usize,
    pub rejected_distance: usize,
    pub rejected_level: usize,
}

impl FilterStats {
    pub fn rejected(&self) -> usize {
        self.rejected_flex + self.rejected_distance + self.rejected_level
    }
}

/// Periods of one direction plus per-day diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionResult {
    pub direction: PeriodDirection,
    pub periods: Vec<Period>,
    pub days: Vec<DayOutcome>,
    /// Rejection counts of the baseline pass
    pub filter_stats: FilterStats,
}

impl DirectionResult {
    pub fn empty(direction: PeriodDirection) -> Self {
        Self {
            direction,
            periods: Vec::new(),
            days: Vec::new(),
            filter_stats: FilterStats::default(),
        }
    }

    pub fn outcome_for(&self, date: NaiveDate) -> Option<RelaxationOutcome> {
        self.days.iter().find(|d| d.date == date).map(|d| d.outcome)
    }

    /// Days where the target period count was not reached
    pub fn insufficient_days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days
            .iter()
            .filter(|d| d.outcome.is_insufficient())
            .map(|d| d.date)
    }
}

/// Full output of one period calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodSet {
    pub best: DirectionResult,
    pub peak: DirectionResult,
    /// Input intervals with working prices after smoothing
    pub intervals: Vec<PriceInterval>,
    pub day_stats: Vec<DayStats>,
}

impl PeriodSet {
    pub fn empty() -> Self {
        Self {
            best: DirectionResult::empty(PeriodDirection::Best),
            peak: DirectionResult::empty(PeriodDirection::Peak),
            intervals: Vec::new(),
            day_stats: Vec::new(),
        }
    }

    pub fn direction(&self, direction: PeriodDirection) -> &DirectionResult {
        match direction {
            PeriodDirection::Best => &self.best,
            PeriodDirection::Peak => &self.peak,
        }
    }

    /// Intervals whose working price was changed by smoothing
    pub fn smoothed_intervals(&self) -> impl Iterator<Item = &PriceInterval> + '_ {
        self.intervals.iter().filter(|i| i.smoothed)
    }
}
