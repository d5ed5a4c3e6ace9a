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

use chrono::{DateTime, Utc};
use fluxion_period_types::PeriodDirection;
use thiserror::Error;

/// Contract violations of the period engine.
///
/// Expected runtime conditions (flat days, exhausted relaxation, empty input)
/// are reported as data, never through this type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PeriodError {
    #[error("Interval starting at {start} has zero duration")]
    ZeroDuration { start: DateTime<Utc> },

    #[error("Interval at {start} is not after the previous interval ending at {previous_end}")]
    UnorderedIntervals {
        start: DateTime<Utc>,
        previous_end: DateTime<Utc>,
    },

    #[error("Interval at {start} has a non-finite reference price")]
    NonFinitePrice { start: DateTime<Utc> },

    #[error("Criteria for {found} periods supplied in the {expected} slot")]
    DirectionMismatch {
        expected: PeriodDirection,
        found: PeriodDirection,
    },

    #[error("Failed to serialize configuration for fingerprint: {0}")]
    ConfigSerialization(String),
}

pub type PeriodEngineResult<T> = Result<T, PeriodError>;
