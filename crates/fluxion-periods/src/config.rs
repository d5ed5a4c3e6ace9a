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

use anyhow::{Context, Result};
use chrono_tz::Tz;
use fluxion_period_types::{FilterCriteria, LevelFilter, PeriodDirection, ValidationResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Engine configuration: both directions plus global switches.
///
/// Serialized form feeds the cache fingerprint, so every field that changes
/// results must live here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineConfig {
    pub timezone: Tz,
    pub smoothing: SmoothingConfig,
    pub best: FilterCriteria,
    pub peak: FilterCriteria,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmoothingConfig {
    #[serde(default = "default_smoothing_enabled")]
    pub enabled: bool,
}

/// File form of the configuration. Missing direction fields take that
/// direction's defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct EngineConfigFile {
    #[serde(default = "default_timezone")]
    timezone: Tz,
    #[serde(default)]
    smoothing: SmoothingConfig,
    #[serde(default)]
    best: DirectionSettings,
    #[serde(default)]
    peak: DirectionSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct DirectionSettings {
    flex: Option<f32>,
    min_distance_from_mean: Option<f32>,
    min_period_length: Option<u32>,
    classification_filter: Option<LevelFilter>,
    target_period_count: Option<usize>,
    relaxation_enabled: Option<bool>,
    max_relaxation_attempts: Option<u32>,
    relaxation_step: Option<f32>,
}

fn default_timezone() -> Tz {
    chrono_tz::Europe::Prague
}

fn default_smoothing_enabled() -> bool {
    true
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            enabled: default_smoothing_enabled(),
        }
    }
}

impl Default for EngineConfigFile {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            smoothing: SmoothingConfig::default(),
            best: DirectionSettings::default(),
            peak: DirectionSettings::default(),
        }
    }
}

impl DirectionSettings {
    fn into_criteria(self, direction: PeriodDirection) -> FilterCriteria {
        let defaults = FilterCriteria::for_direction(direction);
        FilterCriteria {
            direction,
            flex: self.flex.unwrap_or(defaults.flex),
            min_distance_from_mean: self
                .min_distance_from_mean
                .unwrap_or(defaults.min_distance_from_mean),
            min_period_length: self.min_period_length.unwrap_or(defaults.min_period_length),
            classification_filter: self
                .classification_filter
                .unwrap_or(defaults.classification_filter),
            target_period_count: self
                .target_period_count
                .unwrap_or(defaults.target_period_count),
            relaxation_enabled: self.relaxation_enabled.unwrap_or(defaults.relaxation_enabled),
            max_relaxation_attempts: self
                .max_relaxation_attempts
                .unwrap_or(defaults.max_relaxation_attempts),
            relaxation_step: self.relaxation_step.unwrap_or(defaults.relaxation_step),
        }
    }
}

impl From<EngineConfigFile> for EngineConfig {
    fn from(file: EngineConfigFile) -> Self {
        Self {
            timezone: file.timezone,
            smoothing: file.smoothing,
            best: file.best.into_criteria(PeriodDirection::Best),
            peak: file.peak.into_criteria(PeriodDirection::Peak),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfigFile::default().into()
    }
}

impl EngineConfig {
    /// Load from a TOML file and clamp out-of-range values
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid period config: {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: EngineConfigFile =
            toml::from_str(content).context("Failed to parse config TOML")?;
        let (config, _) = EngineConfig::from(file).validated();
        Ok(config)
    }

    pub fn criteria(&self, direction: PeriodDirection) -> &FilterCriteria {
        match direction {
            PeriodDirection::Best => &self.best,
            PeriodDirection::Peak => &self.peak,
        }
    }

    /// Clamp both directions, logging every adjustment
    pub fn validated(self) -> (Self, ValidationResult) {
        let (best, mut result) = self.best.validated();
        let (peak, peak_result) = self.peak.validated();
        result.merge(peak_result);

        for issue in &result.warnings {
            warn!(field = %issue.field, "{}", issue.message);
        }

        (
            Self {
                best,
                peak,
                ..self
            },
            result,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluxion_period_types::PriceLevel;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.timezone, chrono_tz::Europe::Prague);
        assert!(config.smoothing.enabled);
        assert_eq!(config.best, FilterCriteria::best());
        assert_eq!(config.peak, FilterCriteria::peak());
    }

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_full_toml() {
        let toml = r#"
timezone = "Europe/Berlin"

[smoothing]
enabled = false

[best]
flex = 0.10
min_distance_from_mean = 8.0
min_period_length = 45
classification_filter = { at_most = "cheap" }
target_period_count = 3
relaxation_enabled = true
max_relaxation_attempts = 5
relaxation_step = 2.0

[peak]
classification_filter = "any"
target_period_count = 1
"#;
        let config = EngineConfig::from_toml_str(toml).unwrap();

        assert_eq!(config.timezone, chrono_tz::Europe::Berlin);
        assert!(!config.smoothing.enabled);
        assert!((config.best.flex - 0.10).abs() < 0.001);
        assert_eq!(config.best.min_period_length, 45);
        assert_eq!(
            config.best.classification_filter,
            LevelFilter::at_most(PriceLevel::Cheap)
        );
        assert_eq!(config.best.max_relaxation_attempts, 5);
        assert_eq!(config.peak.direction, PeriodDirection::Peak);
        assert_eq!(config.peak.target_period_count, 1);
        // Unset peak fields fall back to peak defaults
        assert!((config.peak.flex - 0.20).abs() < 0.001);
        assert_eq!(config.peak.min_period_length, 30);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let toml = r"
[best]
flex = 0.9
min_distance_from_mean = -3.0
";
        let config = EngineConfig::from_toml_str(toml).unwrap();
        assert!((config.best.flex - 0.5).abs() < 0.001);
        assert!(config.best.min_distance_from_mean.abs() < 0.001);
    }

    #[test]
    fn test_validated_collects_warnings() {
        let mut config = EngineConfig::default();
        config.best.flex = 0.8;
        config.peak.flex = -0.1;

        let (config, result) = config.validated();
        assert!(result.has_warnings());
        assert_eq!(result.warnings.len(), 2);
        assert!(result.warnings.iter().any(|w| w.field == "best.flex"));
        assert!(result.warnings.iter().any(|w| w.field == "peak.flex"));
        assert!(config.peak.flex.abs() < 0.001);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = EngineConfig::from_toml_str("[best]\nflexx = 0.2\n").unwrap_err();
        assert!(format!("{err:#}").contains("flexx"));
    }

    #[test]
    fn test_unknown_timezone_rejected() {
        assert!(EngineConfig::from_toml_str("timezone = \"Mars/Olympus\"\n").is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timezone = \"UTC\"\n[peak]\nflex = 0.25").unwrap();

        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.timezone, chrono_tz::UTC);
        assert!((config.peak.flex - 0.25).abs() < 0.001);
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::from_file("/nonexistent/periods.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_serializes_for_fingerprint() {
        let json = serde_json::to_string(&EngineConfig::default()).unwrap();
        assert!(json.contains("Europe/Prague"));
        assert!(json.contains("\"best\""));
    }
}
