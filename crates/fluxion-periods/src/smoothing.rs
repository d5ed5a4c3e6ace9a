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

//! Outlier smoothing of a day's price curve
//!
//! Isolated spikes make period detection brittle: a single 15-minute blip can
//! split an otherwise cheap stretch in two. Before filtering, every interval is
//! compared against a local linear trend fitted over its neighbours:
//!
//! - **Spike**: residual above `CONFIDENCE_LEVEL` standard deviations of the
//!   context, and disproportionate to how well the trend fits the neighbours
//!   (symmetry check). Replaced by the trend prediction.
//! - **Zigzag**: alternating local extremes whose amplitude dwarfs the local
//!   step size, even when no single point breaks the confidence bound.
//!   Replaced by the context median.
//!
//! Detection always reads the unsmoothed snapshot, so one replacement never
//! feeds into the next. Only `working_price` is written.

use fluxion_period_types::PriceInterval;
use tracing::debug;

use crate::store::IntervalStore;

/// Minimum neighbours required before an interval is evaluated
pub const MIN_CONTEXT_SIZE: usize = 3;
/// Neighbours taken on each side of the evaluated interval
pub const CONTEXT_RADIUS: usize = 3;
/// Residual bound in standard deviations (~95% two-sided)
pub const CONFIDENCE_LEVEL: f32 = 2.0;
/// How much larger than the neighbours' typical residual a spike must be
pub const SYMMETRY_THRESHOLD: f32 = 1.5;
/// Zigzag amplitude bound relative to the local step size
pub const RELATIVE_VOLATILITY_THRESHOLD: f32 = 2.0;

const VOLATILITY_RADIUS: usize = 4;
/// Deviations below this fraction of the day's mean magnitude are noise
const NOISE_FLOOR_RATIO: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmoothingReason {
    Spike,
    Zigzag,
}

/// A detected outlier and its replacement price
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outlier {
    pub index: usize,
    pub original: f32,
    pub replacement: f32,
    pub reason: SmoothingReason,
}

/// Least-squares line through (position, price) points
#[derive(Debug, Clone, Copy, PartialEq)]
struct LinearFit {
    intercept: f32,
    slope: f32,
}

impl LinearFit {
    fn fit(points: &[(f32, f32)]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }

        let n = points.len() as f32;
        let mean_x = points.iter().map(|(x, _)| x).sum::<f32>() / n;
        let mean_y = points.iter().map(|(_, y)| y).sum::<f32>() / n;

        let mut sxx = 0.0f32;
        let mut sxy = 0.0f32;
        for (x, y) in points {
            sxx += (x - mean_x) * (x - mean_x);
            sxy += (x - mean_x) * (y - mean_y);
        }

        if sxx.abs() < f32::EPSILON {
            return None;
        }

        let slope = sxy / sxx;
        Some(Self {
            intercept: mean_y - slope * mean_x,
            slope,
        })
    }

    fn predict(&self, x: f32) -> f32 {
        self.intercept + self.slope * x
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extreme {
    None,
    Max,
    Min,
}

fn local_extreme(prices: &[f32], i: usize) -> Extreme {
    if i == 0 || i + 1 >= prices.len() {
        return Extreme::None;
    }
    let (prev, cur, next) = (prices[i - 1], prices[i], prices[i + 1]);
    if cur > prev && cur > next {
        Extreme::Max
    } else if cur < prev && cur < next {
        Extreme::Min
    } else {
        Extreme::None
    }
}

/// Neighbour indices within `radius`, the center excluded
fn context_indices(len: usize, center: usize, radius: usize) -> Vec<usize> {
    let from = center.saturating_sub(radius);
    let to = (center + radius).min(len.saturating_sub(1));
    (from..=to).filter(|&j| j != center).collect()
}

fn population_std_dev(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
    variance.sqrt()
}

fn median(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Median absolute step around `center`, ignoring the two steps that touch it
fn local_volatility(prices: &[f32], center: usize, floor: f32) -> f32 {
    let from = center.saturating_sub(VOLATILITY_RADIUS);
    let to = (center + VOLATILITY_RADIUS).min(prices.len().saturating_sub(1));
    let steps: Vec<f32> = (from..to)
        .filter(|&k| k + 1 != center && k != center)
        .map(|k| (prices[k + 1] - prices[k]).abs())
        .collect();
    median(&steps).max(floor)
}

/// Detect spikes and zigzags in one day's price curve.
///
/// Pure function over the price slice; positions are slice indices.
pub fn detect_outliers(prices: &[f32]) -> Vec<Outlier> {
    let len = prices.len();
    if len <= MIN_CONTEXT_SIZE {
        return Vec::new();
    }

    let mean_magnitude = prices.iter().map(|p| p.abs()).sum::<f32>() / len as f32;
    let noise_floor = (mean_magnitude * NOISE_FLOOR_RATIO).max(f32::EPSILON);
    let extremes: Vec<Extreme> = (0..len).map(|i| local_extreme(prices, i)).collect();

    let mut outliers = Vec::new();

    for (i, &price) in prices.iter().enumerate() {
        let context = context_indices(len, i, CONTEXT_RADIUS);
        if context.len() < MIN_CONTEXT_SIZE {
            continue;
        }

        let points: Vec<(f32, f32)> = context.iter().map(|&j| (j as f32, prices[j])).collect();
        let context_prices: Vec<f32> = points.iter().map(|(_, y)| *y).collect();
        let Some(trend) = LinearFit::fit(&points) else {
            continue;
        };

        let predicted = trend.predict(i as f32);
        let residual = price - predicted;

        if residual.abs() > noise_floor
            && residual.abs() > CONFIDENCE_LEVEL * population_std_dev(&context_prices)
        {
            let mean_context_residual = points
                .iter()
                .map(|(x, y)| (y - trend.predict(*x)).abs())
                .sum::<f32>()
                / points.len() as f32;

            // A trend shift leaves the neighbours poorly fitted as well
            if residual.abs() > SYMMETRY_THRESHOLD * mean_context_residual {
                outliers.push(Outlier {
                    index: i,
                    original: price,
                    replacement: predicted,
                    reason: SmoothingReason::Spike,
                });
                continue;
            }
        }

        let extreme = extremes[i];
        if extreme == Extreme::None {
            continue;
        }

        let opposite = match extreme {
            Extreme::Max => Extreme::Min,
            Extreme::Min => Extreme::Max,
            Extreme::None => continue,
        };
        let alternating = (i > 0 && extremes[i - 1] == opposite)
            || (i + 1 < len && extremes[i + 1] == opposite);
        if !alternating {
            continue;
        }

        let amplitude = (price - prices[i - 1]).abs().min((price - prices[i + 1]).abs());
        let volatility = local_volatility(prices, i, noise_floor);
        if amplitude <= RELATIVE_VOLATILITY_THRESHOLD * volatility {
            continue;
        }

        // Only the points sticking out of the baseline are smoothed, not the
        // baseline points between them
        let baseline = median(&context_prices);
        let sticks_out = match extreme {
            Extreme::Max => price > baseline,
            Extreme::Min => price < baseline,
            Extreme::None => false,
        };
        if sticks_out {
            outliers.push(Outlier {
                index: i,
                original: price,
                replacement: baseline,
                reason: SmoothingReason::Zigzag,
            });
        }
    }

    outliers
}

/// Smooth one day's intervals in place. Returns the number of smoothed intervals.
pub fn smooth_day(intervals: &mut [PriceInterval]) -> usize {
    let snapshot: Vec<f32> = intervals.iter().map(|i| i.working_price).collect();
    let outliers = detect_outliers(&snapshot);

    for outlier in &outliers {
        let interval = &mut intervals[outlier.index];
        debug!(
            start = %interval.start,
            original = outlier.original,
            replacement = outlier.replacement,
            reason = ?outlier.reason,
            "Smoothed price outlier"
        );
        interval.apply_smoothing(outlier.replacement);
    }

    outliers.len()
}

/// Smooth every day in the store independently
pub fn smooth_store(store: &mut IntervalStore) -> usize {
    let dates: Vec<_> = store.dates().collect();
    dates
        .into_iter()
        .map(|date| smooth_day(store.day_mut(date)))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use fluxion_period_types::PriceLevel;

    fn make_day(prices: &[f32]) -> Vec<PriceInterval> {
        let base = Utc.with_ymd_and_hms(2025, 6, 15, 0, 0, 0).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, &price)| {
                PriceInterval::new(
                    base + chrono::Duration::minutes(i as i64 * 15),
                    price,
                    PriceLevel::Normal,
                )
            })
            .collect()
    }

    #[test]
    fn test_linear_fit() {
        let fit = LinearFit::fit(&[(0.0, 1.0), (1.0, 3.0), (2.0, 5.0)]).unwrap();
        assert!((fit.slope - 2.0).abs() < 0.001);
        assert!((fit.intercept - 1.0).abs() < 0.001);
        assert!((fit.predict(3.0) - 7.0).abs() < 0.001);
    }

    #[test]
    fn test_linear_fit_degenerate() {
        assert!(LinearFit::fit(&[(1.0, 1.0)]).is_none());
        assert!(LinearFit::fit(&[(1.0, 1.0), (1.0, 2.0)]).is_none());
    }

    #[test]
    fn test_isolated_spike_is_replaced() {
        let mut day = make_day(&[20.0, 21.0, 19.0, 20.0, 80.0, 20.0, 19.0, 21.0, 20.0]);
        let smoothed = smooth_day(&mut day);

        assert_eq!(smoothed, 1);
        assert!(day[4].smoothed);
        assert!((day[4].working_price - 20.0).abs() < 1.0);
        assert!((day[4].reference_price - 80.0).abs() < 0.001);
        assert!(day.iter().enumerate().all(|(i, d)| i == 4 || !d.smoothed));
    }

    #[test]
    fn test_negative_spike_is_replaced() {
        let mut day = make_day(&[30.0, 31.0, 30.0, 29.0, -40.0, 30.0, 31.0, 30.0]);
        smooth_day(&mut day);
        assert!(day[4].smoothed);
        assert!(day[4].working_price > 25.0);
    }

    #[test]
    fn test_step_change_is_kept() {
        let mut day = make_day(&[10.0, 10.0, 10.0, 10.0, 20.0, 20.0, 20.0, 20.0]);
        assert_eq!(smooth_day(&mut day), 0);
    }

    #[test]
    fn test_morning_ramp_is_kept() {
        let mut day = make_day(&[2.0, 2.1, 2.3, 2.8, 3.6, 4.5, 5.1, 5.4, 5.5, 5.5]);
        assert_eq!(smooth_day(&mut day), 0);
    }

    #[test]
    fn test_flat_day_is_untouched() {
        let mut day = make_day(&[15.0; 12]);
        assert_eq!(smooth_day(&mut day), 0);
    }

    #[test]
    fn test_insufficient_context_passes_through() {
        let mut day = make_day(&[20.0, 80.0, 20.0]);
        assert_eq!(smooth_day(&mut day), 0);
        assert!((day[1].working_price - 80.0).abs() < 0.001);
    }

    #[test]
    fn test_zigzag_cluster_is_smoothed() {
        let prices = [
            20.0, 20.2, 19.9, 20.1, 35.0, 20.2, 36.0, 20.1, 19.9, 20.0, 20.2,
        ];
        let outliers = detect_outliers(&prices);

        for index in [4, 6] {
            let outlier = outliers.iter().find(|o| o.index == index).unwrap();
            assert!(outlier.replacement < 25.0);
        }
        // The baseline point between the two spikes stays
        assert!(outliers.iter().all(|o| o.index != 5));
    }

    #[test]
    fn test_smooth_store_per_day() {
        let base = Utc.with_ymd_and_hms(2025, 6, 15, 21, 0, 0).unwrap();
        // Spike at 23:15, context is cut at midnight
        let prices = [
            20.0, 20.0, 20.0, 20.0, 20.0, 20.0, 20.0, 20.0, 20.0, 80.0, 20.0, 20.0, 20.0, 20.0,
        ];
        let intervals: Vec<PriceInterval> = prices
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
        let mut store = IntervalStore::new(intervals, chrono_tz::UTC).unwrap();

        let smoothed = smooth_store(&mut store);
        assert_eq!(smoothed, 1);
        assert!(store.intervals()[9].smoothed);
    }
}
