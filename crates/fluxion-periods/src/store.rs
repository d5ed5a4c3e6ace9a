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

//! Chronological interval storage grouped by local calendar day

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use fluxion_period_types::PriceInterval;
use std::collections::BTreeMap;
use std::ops::Range;

use crate::error::{PeriodEngineResult, PeriodError};

/// Ordered intervals with a per-day index.
///
/// Calendar days are taken in the configured timezone, so a Prague day runs
/// from 23:00 UTC (22:00 in summer) to the next local midnight.
#[derive(Debug, Clone)]
pub struct IntervalStore {
    timezone: Tz,
    intervals: Vec<PriceInterval>,
    dates: Vec<NaiveDate>,
    days: BTreeMap<NaiveDate, Range<usize>>,
}

impl IntervalStore {
    /// Build the store, rejecting input that breaks the interval contract.
    ///
    /// Working prices are reset to reference prices so the pipeline always starts
    /// from the delivered data.
    pub fn new(mut intervals: Vec<PriceInterval>, timezone: Tz) -> PeriodEngineResult<Self> {
        let mut previous_end: Option<DateTime<Utc>> = None;
        for interval in &mut intervals {
            if interval.duration_minutes == 0 {
                return Err(PeriodError::ZeroDuration {
                    start: interval.start,
                });
            }
            if !interval.reference_price.is_finite() {
                return Err(PeriodError::NonFinitePrice {
                    start: interval.start,
                });
            }
            if let Some(previous_end) = previous_end
                && interval.start < previous_end
            {
                return Err(PeriodError::UnorderedIntervals {
                    start: interval.start,
                    previous_end,
                });
            }
            previous_end = Some(interval.end());
            interval.reset_working_price();
        }

        let dates: Vec<NaiveDate> = intervals
            .iter()
            .map(|i| i.start.with_timezone(&timezone).date_naive())
            .collect();

        // Sorted instants give non-decreasing local dates, so each day is one range
        let mut days: BTreeMap<NaiveDate, Range<usize>> = BTreeMap::new();
        for (idx, date) in dates.iter().enumerate() {
            days.entry(*date)
                .and_modify(|range| range.end = idx + 1)
                .or_insert(idx..idx + 1);
        }

        Ok(Self {
            timezone,
            intervals,
            dates,
            days,
        })
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn intervals(&self) -> &[PriceInterval] {
        &self.intervals
    }

    /// Local calendar date of the interval at `idx`
    pub fn date_of(&self, idx: usize) -> NaiveDate {
        self.dates[idx]
    }

    /// Local calendar date of an arbitrary instant
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.timezone).date_naive()
    }

    /// All dates with at least one interval, ascending
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.days.keys().copied()
    }

    pub fn day_range(&self, date: NaiveDate) -> Option<Range<usize>> {
        self.days.get(&date).cloned()
    }

    pub fn day(&self, date: NaiveDate) -> &[PriceInterval] {
        match self.day_range(date) {
            Some(range) => &self.intervals[range],
            None => &[],
        }
    }

    pub fn day_mut(&mut self, date: NaiveDate) -> &mut [PriceInterval] {
        match self.day_range(date) {
            Some(range) => &mut self.intervals[range],
            None => &mut [],
        }
    }

    pub fn into_intervals(self) -> Vec<PriceInterval> {
        self.intervals
    }
}
