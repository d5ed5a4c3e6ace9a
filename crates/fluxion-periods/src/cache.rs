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

//! Single-slot result cache keyed by an input fingerprint.
//!
//! The fingerprint is a SHA-256 digest of:
//! - per day: the date, then `start|duration|reference_price|level` of each interval
//! - the serialized engine configuration
//!
//! Working prices are derived data and are not hashed.

use fluxion_period_types::PeriodSet;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use tracing::debug;

use crate::error::{PeriodEngineResult, PeriodError};
use crate::store::IntervalStore;

/// Hex-encoded SHA-256 of inputs and configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fingerprint the interval signature of every day plus the configuration
pub fn fingerprint(store: &IntervalStore, config: &impl Serialize) -> PeriodEngineResult<Fingerprint> {
    let mut hasher = Sha256::new();

    for date in store.dates() {
        hasher.update(date.to_string().as_bytes());
        for interval in store.day(date) {
            hasher.update(interval.start.timestamp().to_le_bytes());
            hasher.update(interval.duration_minutes.to_le_bytes());
            hasher.update(interval.reference_price.to_bits().to_le_bytes());
            hasher.update(interval.level.as_str().as_bytes());
        }
        hasher.update(b";");
    }

    let config_bytes =
        serde_json::to_vec(config).map_err(|e| PeriodError::ConfigSerialization(e.to_string()))?;
    hasher.update(&config_bytes);

    Ok(Fingerprint(format!("{:x}", hasher.finalize())))
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub fingerprint: Fingerprint,
    pub result: PeriodSet,
}

/// Holds the result of the most recent calculation.
///
/// Owned by the caller; a new fingerprint replaces the entry.
#[derive(Debug, Default)]
pub struct PeriodCache {
    entry: Option<CacheEntry>,
    hits: u64,
    misses: u64,
}

impl PeriodCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached result for `fingerprint`, computing it on a miss.
    ///
    /// A failed computation leaves the cache empty.
    pub fn get_or_compute<F>(
        &mut self,
        fingerprint: Fingerprint,
        compute: F,
    ) -> PeriodEngineResult<&PeriodSet>
    where
        F: FnOnce() -> PeriodEngineResult<PeriodSet>,
    {
        let entry = match self.entry.take() {
            Some(entry) if entry.fingerprint == fingerprint => {
                self.hits += 1;
                debug!(fingerprint = %fingerprint, "Period cache hit");
                entry
            }
            _ => {
                self.misses += 1;
                debug!(fingerprint = %fingerprint, "Period cache miss, recomputing");
                CacheEntry {
                    result: compute()?,
                    fingerprint,
                }
            }
        };

        Ok(&self.entry.insert(entry).result)
    }

    /// Most recent result, if any
    pub fn last(&self) -> Option<&PeriodSet> {
        self.entry.as_ref().map(|e| &e.result)
    }

    pub fn is_cached(&self, fingerprint: &Fingerprint) -> bool {
        self.entry
            .as_ref()
            .is_some_and(|e| &e.fingerprint == fingerprint)
    }

    pub fn invalidate(&mut self) {
        if self.entry.take().is_some() {
            debug!("Period cache invalidated");
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use fluxion_period_types::{PriceInterval, PriceLevel};
    use std::cell::Cell;

    fn make_store(prices: &[f32]) -> IntervalStore {
        let base = Utc.with_ymd_and_hms(2025, 6, 15, 0, 0, 0).unwrap();
        let intervals = prices
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                PriceInterval::new(
                    base + chrono::Duration::minutes(i as i64 * 15),
                    p,
                    PriceLevel::Normal,
                )
            })
            .collect();
        IntervalStore::new(intervals, chrono_tz::UTC).unwrap()
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let a = fingerprint(&make_store(&[1.0, 2.0, 3.0]), &"config").unwrap();
        let b = fingerprint(&make_store(&[1.0, 2.0, 3.0]), &"config").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_fingerprint_changes_with_price() {
        let a = fingerprint(&make_store(&[1.0, 2.0, 3.0]), &"config").unwrap();
        let b = fingerprint(&make_store(&[1.0, 2.0, 3.5]), &"config").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_changes_with_config() {
        let store = make_store(&[1.0, 2.0, 3.0]);
        let a = fingerprint(&store, &0.15_f32).unwrap();
        let b = fingerprint(&store, &0.20_f32).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_fingerprint_ignores_working_price() {
        let mut smoothed = make_store(&[1.0, 2.0, 3.0]);
        let date = smoothed.date_of(0);
        smoothed.day_mut(date)[1].apply_smoothing(9.0);

        let a = fingerprint(&make_store(&[1.0, 2.0, 3.0]), &"config").unwrap();
        let b = fingerprint(&smoothed, &"config").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_cache_hit_and_miss() {
        let mut cache = PeriodCache::new();
        let calls = Cell::new(0);
        let compute = || {
            calls.set(calls.get() + 1);
            Ok(PeriodSet::empty())
        };

        let fp = fingerprint(&make_store(&[1.0]), &"a").unwrap();
        cache.get_or_compute(fp.clone(), compute).unwrap();
        cache.get_or_compute(fp.clone(), compute).unwrap();
        assert_eq!(calls.get(), 1);
        assert!(cache.is_cached(&fp));

        let other = fingerprint(&make_store(&[2.0]), &"a").unwrap();
        cache.get_or_compute(other.clone(), compute).unwrap();
        assert_eq!(calls.get(), 2);
        assert!(!cache.is_cached(&fp));
        assert!(cache.is_cached(&other));
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 2);
    }

    #[test]
    fn test_invalidate_forces_recompute() {
        let mut cache = PeriodCache::new();
        let fp = fingerprint(&make_store(&[1.0]), &"a").unwrap();

        cache.get_or_compute(fp.clone(), || Ok(PeriodSet::empty())).unwrap();
        cache.invalidate();
        assert!(cache.last().is_none());
        assert!(!cache.is_cached(&fp));

        cache.get_or_compute(fp, || Ok(PeriodSet::empty())).unwrap();
        assert_eq!(cache.misses(), 2);
    }

    #[test]
    fn test_failed_compute_leaves_cache_empty() {
        let mut cache = PeriodCache::new();
        let fp = fingerprint(&make_store(&[1.0]), &"a").unwrap();
        let result = cache.get_or_compute(fp, || {
            Err(PeriodError::ConfigSerialization("boom".to_owned()))
        });
        assert!(result.is_err());
        assert!(cache.last().is_none());
    }
}
