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

//! Best and peak price period detection.
//!
//! Turns a series of priced intervals into contiguous cheap ("best") and
//! expensive ("peak") periods per calendar day, with outlier smoothing,
//! per-day relaxation towards a target period count and a single-slot cache.

pub mod assembly;
pub mod cache;
pub mod calculator;
pub mod config;
pub mod day_stats;
pub mod error;
pub mod filter;
pub mod relaxation;
pub mod smoothing;
pub mod store;
pub mod summary;

pub use cache::{CacheEntry, Fingerprint, PeriodCache, fingerprint};
pub use calculator::{PeriodCalculator, calculate_periods, compute_periods};
pub use config::{EngineConfig, SmoothingConfig};
pub use error::{PeriodEngineResult, PeriodError};
pub use store::IntervalStore;

pub use fluxion_period_types::*;
