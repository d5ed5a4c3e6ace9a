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

//! CSV price series loader.
//!
//! Expected header: `start,price[,level][,duration_minutes]`

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fluxion_period_types::{PriceInterval, PriceLevel};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::debug;

const DEFAULT_DURATION_MINUTES: u32 = 15;

#[derive(Debug, Deserialize)]
struct PriceRecord {
    start: String,
    price: f32,
    #[serde(default)]
    level: Option<String>,
    #[serde(default)]
    duration_minutes: Option<u32>,
}

impl PriceRecord {
    fn into_interval(self, row: usize) -> Result<PriceInterval> {
        let start = DateTime::parse_from_rfc3339(self.start.trim())
            .with_context(|| format!("Row {row}: invalid start time '{}'", self.start))?
            .with_timezone(&Utc);

        let level = match self.level.as_deref().map(str::trim) {
            None | Some("") => PriceLevel::default(),
            Some(raw) => raw
                .parse::<PriceLevel>()
                .with_context(|| format!("Row {row}: invalid price level"))?,
        };

        Ok(PriceInterval::new(start, self.price, level)
            .with_duration(self.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES)))
    }
}

pub fn load_prices_csv(path: impl AsRef<Path>) -> Result<Vec<PriceInterval>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;
    let intervals = parse_prices_csv(file)
        .with_context(|| format!("Invalid price CSV: {}", path.display()))?;

    debug!(path = %path.display(), intervals = intervals.len(), "Loaded price series");
    Ok(intervals)
}

/// Parse a price series. Rows are returned in file order; ordering is
/// checked by the engine.
pub fn parse_prices_csv<R: Read>(reader: R) -> Result<Vec<PriceInterval>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    reader
        .deserialize::<PriceRecord>()
        .enumerate()
        .map(|(i, record)| {
            let row = i + 2;
            let record =
                record.with_context(|| format!("Row {row}: failed to deserialize record"))?;
            record.into_interval(row)
        })
        .collect()
}
