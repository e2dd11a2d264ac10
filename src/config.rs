//! Engine configuration
//!
//! Every tunable of the engines in one serde value. Missing JSON fields take their
//! defaults, so `{}` is a valid configuration.

use crate::budget::DEFAULT_CREDIT_CAP_KCAL;
use crate::confidence::ConfidenceWindow;
use crate::energy_density::EnergyDensityConstants;
use crate::error::ComputeError;
use crate::macro_budget::MacroPercentages;
use crate::maintenance::{FallbackSearch, WeightTrendConfig};
use chrono::{FixedOffset, Weekday};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SMOOTHING_ALPHA: f64 = 0.1;
pub const DEFAULT_INTAKE_WINDOW_DAYS: i64 = 28;
pub const DEFAULT_INTAKE_MIN_DAYS: usize = 14;
pub const DEFAULT_WEIGHT_WINDOW_DAYS: i64 = 28;
pub const DEFAULT_WEIGHT_MIN_DAYS: usize = 10;

const MAX_OFFSET_MINUTES: i32 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// EWMA smoothing factor, strictly between 0 and 1
    pub smoothing_alpha: f64,
    pub intake_window_days: i64,
    pub intake_min_days: usize,
    pub weight_window_days: i64,
    pub weight_min_days: usize,
    pub weight_trend: WeightTrendConfig,
    pub energy_density: EnergyDensityConstants,
    pub fallback: FallbackSearch,
    /// Largest daily budget adjustment from credit (kcal)
    pub credit_cap_kcal: f64,
    /// First day of the budget cycle
    pub first_weekday: Weekday,
    /// Deficit (negative) or surplus (positive) applied to maintenance (kcal/day)
    pub user_adjustment_kcal: Option<f64>,
    pub macro_percentages: Option<MacroPercentages>,
    /// Offset of the user's local day boundary from UTC
    pub utc_offset_minutes: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            smoothing_alpha: DEFAULT_SMOOTHING_ALPHA,
            intake_window_days: DEFAULT_INTAKE_WINDOW_DAYS,
            intake_min_days: DEFAULT_INTAKE_MIN_DAYS,
            weight_window_days: DEFAULT_WEIGHT_WINDOW_DAYS,
            weight_min_days: DEFAULT_WEIGHT_MIN_DAYS,
            weight_trend: WeightTrendConfig::default(),
            energy_density: EnergyDensityConstants::default(),
            fallback: FallbackSearch::default(),
            credit_cap_kcal: DEFAULT_CREDIT_CAP_KCAL,
            first_weekday: Weekday::Mon,
            user_adjustment_kcal: None,
            macro_percentages: None,
            utc_offset_minutes: 0,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(self).map_err(|e| ComputeError::EncodingError(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ComputeError> {
        if !(self.smoothing_alpha > 0.0 && self.smoothing_alpha < 1.0) {
            return Err(ComputeError::InvalidSmoothingAlpha(self.smoothing_alpha));
        }
        self.intake_window()?;
        self.weight_window()?;
        self.weight_trend.validate()?;
        self.energy_density.validate()?;
        self.fallback.validate()?;
        if !(self.credit_cap_kcal.is_finite() && self.credit_cap_kcal >= 0.0) {
            return Err(ComputeError::InvalidConfig(format!(
                "credit cap must be non-negative, got {}",
                self.credit_cap_kcal
            )));
        }
        if let Some(adjustment) = self.user_adjustment_kcal {
            if !adjustment.is_finite() {
                return Err(ComputeError::InvalidConfig(format!(
                    "user adjustment must be finite, got {}",
                    adjustment
                )));
            }
        }
        if let Some(percentages) = &self.macro_percentages {
            percentages.validate()?;
        }
        self.timezone()?;
        Ok(())
    }

    pub fn intake_window(&self) -> Result<ConfidenceWindow, ComputeError> {
        ConfidenceWindow::new(self.intake_window_days, self.intake_min_days)
    }

    pub fn weight_window(&self) -> Result<ConfidenceWindow, ComputeError> {
        ConfidenceWindow::new(self.weight_window_days, self.weight_min_days)
    }

    /// Fixed offset that defines the local calendar day
    pub fn timezone(&self) -> Result<FixedOffset, ComputeError> {
        if self.utc_offset_minutes.abs() >= MAX_OFFSET_MINUTES {
            return Err(ComputeError::InvalidConfig(format!(
                "UTC offset out of range: {} minutes",
                self.utc_offset_minutes
            )));
        }
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            ComputeError::InvalidConfig(format!(
                "UTC offset out of range: {} minutes",
                self.utc_offset_minutes
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.fallback.stages_days, vec![180, 365, 730]);
        assert_eq!(config.first_weekday, Weekday::Mon);
    }

    #[test]
    fn test_partial_json() {
        let json = r#"{
            "smoothing_alpha": 0.25,
            "first_weekday": "Sun",
            "user_adjustment_kcal": -500,
            "macro_percentages": {"protein": 30},
            "utc_offset_minutes": -300,
            "weight_trend": {"max_loss_per_week": 0.75}
        }"#;
        let config = EngineConfig::from_json(json).unwrap();

        assert_eq!(config.smoothing_alpha, 0.25);
        assert_eq!(config.first_weekday, Weekday::Sun);
        assert_eq!(config.user_adjustment_kcal, Some(-500.0));
        assert_eq!(config.macro_percentages.unwrap().protein, Some(30.0));
        assert_eq!(config.macro_percentages.unwrap().fat, None);
        assert_eq!(config.weight_trend.max_loss_per_week, 0.75);
        assert_eq!(config.weight_trend.max_gain_per_week, 0.5);
        assert_eq!(config.timezone().unwrap().local_minus_utc(), -300 * 60);
    }

    #[test]
    fn test_rejects_invalid_values() {
        for json in [
            r#"{"smoothing_alpha": 0}"#,
            r#"{"smoothing_alpha": 1.0}"#,
            r#"{"intake_window_days": 0}"#,
            r#"{"intake_window_days": 3651}"#,
            r#"{"weight_window_days": 9223372036854775807}"#,
            r#"{"weight_min_days": 0}"#,
            r#"{"credit_cap_kcal": -1}"#,
            r#"{"utc_offset_minutes": 1440}"#,
            r#"{"fallback": {"stages_days": []}}"#,
            r#"{"fallback": {"stages_days": [180, 365, 200000000]}}"#,
            r#"{"macro_percentages": {"protein": 60, "fat": 50}}"#,
        ] {
            assert!(EngineConfig::from_json(json).is_err(), "accepted {}", json);
        }
    }

    #[test]
    fn test_to_json_round_trip() {
        let config = EngineConfig {
            user_adjustment_kcal: Some(250.0),
            ..Default::default()
        };
        let json = config.to_json().unwrap();
        assert_eq!(EngineConfig::from_json(&json).unwrap(), config);
    }
}
