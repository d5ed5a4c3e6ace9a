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

//! Filter criteria for best/peak period detection
//!
//! A `FilterCriteria` describes one evaluation pass for one direction. The
//! relaxation controller never mutates a criteria instance; it derives new ones
//! with a wider flex or with the level filter disabled.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::interval::PriceLevel;
use crate::validation::ValidationResult;

/// Absolute upper bound for flex; above it detection degenerates into
/// whole-day acceptance
pub const MAX_FLEX: f32 = 0.50;

/// Upper bound for the minimum distance from the daily mean (percent)
pub const MAX_MIN_DISTANCE: f32 = 100.0;

/// Fixed relaxation step in percentage points
pub const DEFAULT_RELAXATION_STEP: f32 = 3.0;

// ============= Direction =============

/// Which end of the price distribution a period is looking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodDirection {
    /// Cheapest stretches of the day
    Best,
    /// Most expensive stretches of the day
    Peak,
}

impl PeriodDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            PeriodDirection::Best => "best",
            PeriodDirection::Peak => "peak",
        }
    }
}

impl fmt::Display for PeriodDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============= Level Filter =============

/// Allowed price levels for period membership
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "LevelFilterRepr")]
pub enum LevelFilter {
    /// Level is not considered
    #[default]
    Any,
    /// Interval level must be one of these
    AnyOf(BTreeSet<PriceLevel>),
}

impl LevelFilter {
    /// All levels up to and including `level` (typical best-price filter)
    pub fn at_most(level: PriceLevel) -> Self {
        LevelFilter::AnyOf(PriceLevel::ALL.into_iter().filter(|l| *l <= level).collect())
    }

    /// All levels from `level` upwards (typical peak-price filter)
    pub fn at_least(level: PriceLevel) -> Self {
        LevelFilter::AnyOf(PriceLevel::ALL.into_iter().filter(|l| *l >= level).collect())
    }

    pub fn allows(&self, level: PriceLevel) -> bool {
        match self {
            LevelFilter::Any => true,
            LevelFilter::AnyOf(levels) => levels.contains(&level),
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, LevelFilter::Any)
    }
}

impl fmt::Display for LevelFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelFilter::Any => f.write_str("any"),
            LevelFilter::AnyOf(levels) => {
                let names: Vec<&str> = levels.iter().map(|l| l.as_str()).collect();
                write!(f, "{}", names.join("|"))
            }
        }
    }
}

/// Accepted spellings of a level filter in configuration files
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum LevelFilterRepr {
    Any,
    AnyOf(BTreeSet<PriceLevel>),
    AtMost(PriceLevel),
    AtLeast(PriceLevel),
}

impl From<LevelFilterRepr> for LevelFilter {
    fn from(repr: LevelFilterRepr) -> Self {
        match repr {
            LevelFilterRepr::Any => LevelFilter::Any,
            LevelFilterRepr::AnyOf(levels) => LevelFilter::AnyOf(levels),
            LevelFilterRepr::AtMost(level) => LevelFilter::at_most(level),
            LevelFilterRepr::AtLeast(level) => LevelFilter::at_least(level),
        }
    }
}

// ============= Filter Criteria =============

/// One evaluation pass for one direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub direction: PeriodDirection,

    /// Tolerance around the daily extreme as a fraction (0.15 = 15%)
    pub flex: f32,

    /// Required distance from the daily mean in percent (5.0 = 5%)
    pub min_distance_from_mean: f32,

    /// Shortest period worth reporting, in minutes
    pub min_period_length: u32,

    /// Allowed price levels
    pub classification_filter: LevelFilter,

    /// Periods per day that relaxation tries to reach
    pub target_period_count: usize,

    pub relaxation_enabled: bool,

    pub max_relaxation_attempts: u32,

    /// Flex increment per relaxation attempt, in percentage points
    pub relaxation_step: f32,
}

impl FilterCriteria {
    /// Default settings for best price periods
    pub fn best() -> Self {
        Self {
            direction: PeriodDirection::Best,
            flex: 0.15,
            min_distance_from_mean: 5.0,
            min_period_length: 60,
            classification_filter: LevelFilter::Any,
            target_period_count: 2,
            relaxation_enabled: true,
            max_relaxation_attempts: 11,
            relaxation_step: DEFAULT_RELAXATION_STEP,
        }
    }

    /// Default settings for peak price periods
    pub fn peak() -> Self {
        Self {
            direction: PeriodDirection::Peak,
            flex: 0.20,
            min_distance_from_mean: 5.0,
            min_period_length: 30,
            classification_filter: LevelFilter::Any,
            target_period_count: 2,
            relaxation_enabled: true,
            max_relaxation_attempts: 11,
            relaxation_step: DEFAULT_RELAXATION_STEP,
        }
    }

    pub fn for_direction(direction: PeriodDirection) -> Self {
        match direction {
            PeriodDirection::Best => Self::best(),
            PeriodDirection::Peak => Self::peak(),
        }
    }

    /// Derived criteria with a different flex
    pub fn with_flex(&self, flex: f32) -> Self {
        Self {
            flex,
            ..self.clone()
        }
    }

    /// Derived criteria with a different level filter
    pub fn with_classification_filter(&self, classification_filter: LevelFilter) -> Self {
        Self {
            classification_filter,
            ..self.clone()
        }
    }

    /// Clamp out-of-range settings to their nearest valid bound.
    ///
    /// Every adjustment is recorded in the returned `ValidationResult`; nothing
    /// here rejects the criteria.
    pub fn validated(mut self) -> (Self, ValidationResult) {
        let mut result = ValidationResult::success();
        let defaults = Self::for_direction(self.direction);
        let prefix = self.direction.as_str();

        if !self.flex.is_finite() {
            result.add_warning(
                format!("{prefix}.flex"),
                format!("flex is not a number, using default {:.2}", defaults.flex),
            );
            self.flex = defaults.flex;
        } else if self.flex < 0.0 {
            result.add_warning(
                format!("{prefix}.flex"),
                format!("flex {:.2} is negative, clamped to 0.00", self.flex),
            );
            self.flex = 0.0;
        } else if self.flex > MAX_FLEX {
            result.add_warning(
                format!("{prefix}.flex"),
                format!(
                    "flex {:.2} exceeds maximum {MAX_FLEX:.2}, detection above the cap is unreliable",
                    self.flex
                ),
            );
            self.flex = MAX_FLEX;
        }

        if !self.min_distance_from_mean.is_finite() {
            result.add_warning(
                format!("{prefix}.min_distance_from_mean"),
                format!(
                    "min_distance_from_mean is not a number, using default {:.1}%",
                    defaults.min_distance_from_mean
                ),
            );
            self.min_distance_from_mean = defaults.min_distance_from_mean;
        } else if !(0.0..=MAX_MIN_DISTANCE).contains(&self.min_distance_from_mean) {
            let clamped = self.min_distance_from_mean.clamp(0.0, MAX_MIN_DISTANCE);
            result.add_warning(
                format!("{prefix}.min_distance_from_mean"),
                format!(
                    "min_distance_from_mean {:.1}% outside 0-100%, clamped to {clamped:.1}%",
                    self.min_distance_from_mean
                ),
            );
            self.min_distance_from_mean = clamped;
        }

        if let LevelFilter::AnyOf(levels) = &self.classification_filter
            && levels.is_empty()
        {
            result.add_warning(
                format!("{prefix}.classification_filter"),
                "empty level set would reject every interval, using 'any'",
            );
            self.classification_filter = LevelFilter::Any;
        }

        if self.relaxation_enabled
            && (!self.relaxation_step.is_finite() || self.relaxation_step <= 0.0)
        {
            result.add_warning(
                format!("{prefix}.relaxation_step"),
                format!(
                    "relaxation_step must be positive, using default {DEFAULT_RELAXATION_STEP:.1}"
                ),
            );
            self.relaxation_step = DEFAULT_RELAXATION_STEP;
        }

        (self, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter_at_most() {
        let filter = LevelFilter::at_most(PriceLevel::Cheap);
        assert!(filter.allows(PriceLevel::VeryCheap));
        assert!(filter.allows(PriceLevel::Cheap));
        assert!(!filter.allows(PriceLevel::Normal));
    }

    #[test]
    fn test_level_filter_at_least() {
        let filter = LevelFilter::at_least(PriceLevel::Expensive);
        assert!(!filter.allows(PriceLevel::Normal));
        assert!(filter.allows(PriceLevel::Expensive));
        assert!(filter.allows(PriceLevel::VeryExpensive));
    }

    #[test]
    fn test_level_filter_deserialize_forms() {
        let any: LevelFilter = serde_json::from_str("\"any\"").unwrap();
        assert!(any.is_any());

        let at_most: LevelFilter = serde_json::from_str(r#"{"at_most":"cheap"}"#).unwrap();
        assert_eq!(at_most, LevelFilter::at_most(PriceLevel::Cheap));

        let any_of: LevelFilter =
            serde_json::from_str(r#"{"any_of":["VERY_EXPENSIVE","expensive"]}"#).unwrap();
        assert_eq!(any_of, LevelFilter::at_least(PriceLevel::Expensive));
    }

    #[test]
    fn test_level_filter_serialized_form_reads_back() {
        let filter = LevelFilter::at_most(PriceLevel::Cheap);
        let json = serde_json::to_string(&filter).unwrap();
        let parsed: LevelFilter = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, filter);
    }

    #[test]
    fn test_validated_defaults_are_clean() {
        let (_, result) = FilterCriteria::best().validated();
        assert!(!result.has_warnings());
        let (_, result) = FilterCriteria::peak().validated();
        assert!(!result.has_warnings());
    }

    #[test]
    fn test_validated_clamps_flex_above_cap() {
        let (criteria, result) = FilterCriteria::best().with_flex(0.75).validated();
        assert!((criteria.flex - MAX_FLEX).abs() < f32::EPSILON);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].field, "best.flex");
    }

    #[test]
    fn test_validated_clamps_negative_values() {
        let mut criteria = FilterCriteria::peak().with_flex(-0.1);
        criteria.min_distance_from_mean = -3.0;
        let (criteria, result) = criteria.validated();

        assert!(criteria.flex.abs() < f32::EPSILON);
        assert!(criteria.min_distance_from_mean.abs() < f32::EPSILON);
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn test_validated_replaces_empty_level_set() {
        let criteria = FilterCriteria::best()
            .with_classification_filter(LevelFilter::AnyOf(BTreeSet::new()));
        let (criteria, result) = criteria.validated();
        assert!(criteria.classification_filter.is_any());
        assert!(result.has_warnings());
    }

    #[test]
    fn test_validated_fixes_non_positive_step() {
        let mut criteria = FilterCriteria::best();
        criteria.relaxation_step = 0.0;
        let (criteria, result) = criteria.validated();
        assert!((criteria.relaxation_step - DEFAULT_RELAXATION_STEP).abs() < f32::EPSILON);
        assert!(result.has_warnings());
    }
}
