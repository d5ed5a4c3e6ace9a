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

pub mod criteria;
pub mod interval;
pub mod outcome;
pub mod period;
pub mod validation;

// Re-export common types for convenience
pub use criteria::{FilterCriteria, LevelFilter, PeriodDirection};
pub use interval::{PriceInterval, PriceLevel};
pub use outcome::{
    DayOutcome, DirectionResult, FilterStats, PeriodSet, RelaxationCombination,
    RelaxationOutcome,
};
pub use period::{DayStats, Period, PeriodSummary, VolatilityLevel};
pub use validation::{ValidationIssue, ValidationResult};
