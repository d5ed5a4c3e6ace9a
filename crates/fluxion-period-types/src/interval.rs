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

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default interval length of the day-ahead market (quarter-hour blocks)
pub const DEFAULT_INTERVAL_MINUTES: u32 = 15;

// ============= Price Level =============

/// Price level band assigned upstream by the price feed.
///
/// Ordered from cheapest to most expensive, so `at most Cheap` / `at least
/// Expensive` filters can be expressed with plain comparisons.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PriceLevel {
    #[serde(alias = "VERY_CHEAP")]
    VeryCheap,
    #[serde(alias = "CHEAP")]
    Cheap,
    #[default]
    #[serde(alias = "NORMAL")]
    Normal,
    #[serde(alias = "EXPENSIVE")]
    Expensive,
    #[serde(alias = "VERY_EXPENSIVE")]
    VeryExpensive,
}

impl PriceLevel {
    pub const ALL: [PriceLevel; 5] = [
        PriceLevel::VeryCheap,
        PriceLevel::Cheap,
        PriceLevel::Normal,
        PriceLevel::Expensive,
        PriceLevel::VeryExpensive,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PriceLevel::VeryCheap => "very_cheap",
            PriceLevel::Cheap => "cheap",
            PriceLevel::Normal => "normal",
            PriceLevel::Expensive => "expensive",
            PriceLevel::VeryExpensive => "very_expensive",
        }
    }
}

impl fmt::Display for PriceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown price level: {0}")]
pub struct UnknownPriceLevel(pub String);

impl FromStr for PriceLevel {
    type Err = UnknownPriceLevel;

    /// Accepts both `very_cheap` and feed-style `VERY_CHEAP` spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        PriceLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == normalized)
            .ok_or_else(|| UnknownPriceLevel(s.to_owned()))
    }
}

// ============= Price Interval =============

/// A single fixed-duration price interval.
///
/// `reference_price` is the price as delivered by the data layer and is what all
/// statistics and outputs are based on. `working_price` starts out equal to it and
/// may be overwritten once by outlier smoothing; it is only used to decide period
/// membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceInterval {
    /// Start of the interval
    pub start: DateTime<Utc>,

    /// Interval length (15 for the current day-ahead market)
    pub duration_minutes: u32,

    /// Price as delivered by the price feed
    pub reference_price: f32,

    /// Price used for period membership decisions
    pub working_price: f32,

    /// Classification band supplied by the price feed
    #[serde(default)]
    pub level: PriceLevel,

    /// True when outlier smoothing replaced `working_price`
    #[serde(default)]
    pub smoothed: bool,
}

impl PriceInterval {
    /// Quarter-hour interval whose working price equals its reference price
    pub fn new(start: DateTime<Utc>, reference_price: f32, level: PriceLevel) -> Self {
        Self {
            start,
            duration_minutes: DEFAULT_INTERVAL_MINUTES,
            reference_price,
            working_price: reference_price,
            level,
            smoothed: false,
        }
    }

    pub fn with_duration(mut self, duration_minutes: u32) -> Self {
        self.duration_minutes = duration_minutes;
        self
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.start + Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Overwrite the working price with a smoothed value
    pub fn apply_smoothing(&mut self, smoothed_price: f32) {
        self.working_price = smoothed_price;
        self.smoothed = true;
    }

    /// Drop any smoothing applied by a previous pass
    pub fn reset_working_price(&mut self) {
        self.working_price = self.reference_price;
        self.smoothed = false;
    }
}
