//! Maintenance (TDEE) estimation
//!
//! This module combines smoothed intake, a confidence-weighted weight trend and a
//! personalized energy density into a maintenance estimate:
//!
//! ```text
//! M             = BlendedIntake − BlendedSlope × ρ / 7
//! BlendedIntake = blend(EWMA(intake), fallback, calorie_confidence)
//! BlendedSlope  = blend(clamped_slope, 0, weight_confidence)
//! ```
//!
//! Each input blends toward its own neutral fallback, so good weight data with no
//! recent intake (or the reverse) still yields a usable estimate. When recent intake
//! is sparse, [`FallbackSearch`] looks for a personal estimate in wider history.

use crate::confidence::{ConfidenceWindow, MAX_WINDOW_DAYS};
use crate::energy_density::EnergyDensityConstants;
use crate::error::ComputeError;
use crate::intake::IntakeAnalytics;
use crate::timeseries::{days_after, days_before, days_between, weighted_slope, DailySeries};
use crate::types::{FallbackSource, MaintenanceSummary};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Per-day retention factor of the weight regression
pub const DEFAULT_REGRESSION_DECAY: f64 = 0.9;

/// Fastest plausible loss (kg/week)
pub const DEFAULT_MAX_LOSS_PER_WEEK: f64 = 1.0;

/// Fastest plausible gain (kg/week)
pub const DEFAULT_MAX_GAIN_PER_WEEK: f64 = 0.5;

/// Maintenance assumed when no personal history exists (kcal/day)
pub const DEFAULT_BASELINE_MAINTENANCE_KCAL: f64 = 2200.0;

/// Historical windows tried in order (days)
pub const DEFAULT_FALLBACK_STAGES: [i64; 3] = [180, 365, 730];

pub const DEFAULT_FALLBACK_MIN_WEIGHT_DAYS: usize = 5;
pub const DEFAULT_FALLBACK_MIN_INTAKE_DAYS: usize = 7;

/// Linear interpolation between a computed value and its fallback.
///
/// A missing value, or zero confidence, yields the fallback exactly.
pub fn blend(value: Option<f64>, fallback: f64, confidence: f64) -> f64 {
    let confidence = if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        0.0
    };
    match value {
        Some(v) if v.is_finite() && confidence > 0.0 => {
            v * confidence + fallback * (1.0 - confidence)
        }
        _ => fallback,
    }
}

/// Weight regression settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightTrendConfig {
    /// Weight of a point `n` days old is `decay^n`
    pub decay: f64,
    pub max_loss_per_week: f64,
    pub max_gain_per_week: f64,
}

impl Default for WeightTrendConfig {
    fn default() -> Self {
        Self {
            decay: DEFAULT_REGRESSION_DECAY,
            max_loss_per_week: DEFAULT_MAX_LOSS_PER_WEEK,
            max_gain_per_week: DEFAULT_MAX_GAIN_PER_WEEK,
        }
    }
}

impl WeightTrendConfig {
    pub fn validate(&self) -> Result<(), ComputeError> {
        if !(self.decay > 0.0 && self.decay <= 1.0) {
            return Err(ComputeError::InvalidConfig(format!(
                "regression decay must be in (0, 1], got {}",
                self.decay
            )));
        }
        if !(self.max_loss_per_week >= 0.0 && self.max_gain_per_week >= 0.0) {
            return Err(ComputeError::InvalidConfig(format!(
                "weight clamp bounds must be non-negative, got -{} / +{}",
                self.max_loss_per_week, self.max_gain_per_week
            )));
        }
        Ok(())
    }

    /// Clamp a weekly slope to the physiological range
    pub fn clamp(&self, slope_per_week: f64) -> f64 {
        slope_per_week.clamp(-self.max_loss_per_week, self.max_gain_per_week)
    }
}

/// Immutable maintenance estimate for one refresh cycle
#[derive(Debug, Clone, PartialEq)]
pub struct MaintenanceEstimator {
    intake: IntakeAnalytics,
    weight: DailySeries,
    body_fat: DailySeries,
    density: EnergyDensityConstants,
    weight_window: ConfidenceWindow,
    fallback_maintenance_kcal: f64,
    trend: WeightTrendConfig,
}

impl MaintenanceEstimator {
    pub fn new(
        intake: IntakeAnalytics,
        weight: DailySeries,
        body_fat: DailySeries,
        density: EnergyDensityConstants,
        weight_window: ConfidenceWindow,
        fallback_maintenance_kcal: f64,
        trend: WeightTrendConfig,
    ) -> Result<Self, ComputeError> {
        density.validate()?;
        trend.validate()?;
        if !(fallback_maintenance_kcal.is_finite() && fallback_maintenance_kcal > 0.0) {
            return Err(ComputeError::InvalidConfig(format!(
                "fallback maintenance must be positive, got {}",
                fallback_maintenance_kcal
            )));
        }
        Ok(Self {
            intake,
            weight,
            body_fat,
            density,
            weight_window,
            fallback_maintenance_kcal,
            trend,
        })
    }

    /// Same inputs, different intake fallback
    pub fn with_fallback_maintenance(mut self, fallback_maintenance_kcal: f64) -> Self {
        if fallback_maintenance_kcal.is_finite() && fallback_maintenance_kcal > 0.0 {
            self.fallback_maintenance_kcal = fallback_maintenance_kcal;
        }
        self
    }

    pub fn intake(&self) -> &IntakeAnalytics {
        &self.intake
    }

    pub fn weight(&self) -> &DailySeries {
        &self.weight
    }

    pub fn body_fat(&self) -> &DailySeries {
        &self.body_fat
    }

    pub fn density_constants(&self) -> EnergyDensityConstants {
        self.density
    }

    pub fn trend_config(&self) -> WeightTrendConfig {
        self.trend
    }

    pub fn weight_window(&self) -> ConfidenceWindow {
        self.weight_window
    }

    pub fn fallback_maintenance_kcal(&self) -> f64 {
        self.fallback_maintenance_kcal
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.intake.reference_date()
    }

    pub fn calorie_confidence(&self) -> f64 {
        self.intake.confidence()
    }

    pub fn weight_confidence(&self) -> f64 {
        self.weight_window.confidence(&self.weight, self.reference_date())
    }

    pub fn is_weight_valid(&self) -> bool {
        self.weight_window.is_valid(&self.weight, self.reference_date())
    }

    /// Unclamped regression slope in kg/week
    pub fn raw_weight_slope(&self) -> f64 {
        let reference = self.reference_date();
        let points: Vec<(f64, f64, f64)> = self
            .weight_window
            .restrict(&self.weight, reference)
            .iter()
            .map(|(day, weight)| {
                let days_ago = days_between(day, reference);
                let exponent = i32::try_from(days_ago).unwrap_or(i32::MAX);
                (-(days_ago as f64), weight, self.trend.decay.powi(exponent))
            })
            .collect();

        weighted_slope(&points) * 7.0
    }

    /// Regression slope clamped to the physiological range (kg/week)
    pub fn weight_slope(&self) -> f64 {
        self.trend.clamp(self.raw_weight_slope())
    }

    /// Most recent weight on or before the reference date
    pub fn current_weight(&self) -> Option<f64> {
        self.weight
            .range(NaiveDate::MIN, self.reference_date())
            .last()
            .map(|(_, w)| w)
    }

    /// Most recent body-fat fraction on or before the reference date
    pub fn current_body_fat(&self) -> Option<f64> {
        self.body_fat
            .range(NaiveDate::MIN, self.reference_date())
            .last()
            .map(|(_, bf)| bf)
    }

    /// kcal per kg of mass change
    pub fn energy_density(&self) -> f64 {
        self.density
            .energy_density(self.current_weight(), self.current_body_fat())
    }

    pub fn blended_intake(&self) -> f64 {
        blend(
            self.intake.smoothed_intake(),
            self.fallback_maintenance_kcal,
            self.calorie_confidence(),
        )
    }

    /// Clamped weekly slope blended toward "stable weight"
    pub fn blended_slope(&self) -> f64 {
        blend(Some(self.weight_slope()), 0.0, self.weight_confidence())
    }

    /// Maintenance estimate in kcal/day
    pub fn maintenance(&self) -> f64 {
        self.blended_intake() - self.blended_slope() * self.energy_density() / 7.0
    }

    /// True when the intake fallback still contributes to the estimate
    pub fn needs_fallback(&self) -> bool {
        self.calorie_confidence() < 1.0
    }

    pub fn summarize(&self, fallback_source: FallbackSource) -> MaintenanceSummary {
        MaintenanceSummary {
            maintenance: self.maintenance(),
            calorie_confidence: self.calorie_confidence(),
            weight_confidence: self.weight_confidence(),
            is_weight_valid: self.is_weight_valid(),
            raw_weight_slope: self.raw_weight_slope(),
            weight_slope: self.weight_slope(),
            energy_density: self.energy_density(),
            blended_intake: self.blended_intake(),
            blended_slope: self.blended_slope(),
            fallback_maintenance: self.fallback_maintenance_kcal,
            fallback_source,
        }
    }
}

/// Full history available for the fallback search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSeries {
    pub intake: DailySeries,
    pub weight: DailySeries,
    pub body_fat: DailySeries,
}

/// Outcome of the fallback search
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallbackEstimate {
    pub maintenance_kcal: f64,
    pub source: FallbackSource,
}

/// Progressive search over wider historical windows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackSearch {
    /// Window sizes in days, tried in order
    pub stages_days: Vec<i64>,
    pub min_weight_days: usize,
    pub min_intake_days: usize,
    pub baseline_maintenance_kcal: f64,
}

impl Default for FallbackSearch {
    fn default() -> Self {
        Self {
            stages_days: DEFAULT_FALLBACK_STAGES.to_vec(),
            min_weight_days: DEFAULT_FALLBACK_MIN_WEIGHT_DAYS,
            min_intake_days: DEFAULT_FALLBACK_MIN_INTAKE_DAYS,
            baseline_maintenance_kcal: DEFAULT_BASELINE_MAINTENANCE_KCAL,
        }
    }
}

impl FallbackSearch {
    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.stages_days.is_empty()
            || self
                .stages_days
                .iter()
                .any(|d| !(1..=MAX_WINDOW_DAYS).contains(d))
        {
            return Err(ComputeError::InvalidConfig(format!(
                "fallback stages must be non-empty and within 1..={} days, got {:?}",
                MAX_WINDOW_DAYS, self.stages_days
            )));
        }
        if self.min_weight_days == 0 || self.min_intake_days == 0 {
            return Err(ComputeError::InvalidConfig(
                "fallback minimum day counts must be positive".to_string(),
            ));
        }
        if !(self.baseline_maintenance_kcal.is_finite() && self.baseline_maintenance_kcal > 0.0) {
            return Err(ComputeError::InvalidConfig(format!(
                "baseline maintenance must be positive, got {}",
                self.baseline_maintenance_kcal
            )));
        }
        Ok(())
    }

    fn baseline(&self) -> FallbackEstimate {
        FallbackEstimate {
            maintenance_kcal: self.baseline_maintenance_kcal,
            source: FallbackSource::Baseline,
        }
    }

    /// Find a personal maintenance estimate in wider history.
    ///
    /// Smoothing, density and trend settings are taken from `primary`. The first
    /// stage with enough weight and intake days wins; otherwise the baseline is
    /// returned. Never fails.
    ///
    /// A qualifying stage is evaluated as of the day after its latest intake entry,
    /// with confidence windows sized to the entries it found.
    pub fn search(
        &self,
        history: &HistoricalSeries,
        primary: &MaintenanceEstimator,
    ) -> FallbackEstimate {
        let reference = primary.reference_date();

        for &stage_days in &self.stages_days {
            let start = days_before(reference, stage_days);
            let intake = history.intake.range(start, days_before(reference, 1));
            let stage_reference = intake
                .last()
                .map(|(day, _)| days_after(day, 1).min(reference))
                .unwrap_or(reference);
            let weight = history.weight.range(start, stage_reference);

            if weight.len() < self.min_weight_days || intake.len() < self.min_intake_days {
                debug!(
                    stage_days,
                    weight_days = weight.len(),
                    intake_days = intake.len(),
                    "fallback stage below minimums"
                );
                continue;
            }

            let body_fat = history.body_fat.range(start, stage_reference);
            match self.stage_estimator(stage_reference, intake, weight, body_fat, primary) {
                Ok(estimator) => {
                    let maintenance_kcal = estimator.maintenance();
                    debug!(
                        stage_days,
                        %stage_reference,
                        calorie_confidence = estimator.calorie_confidence(),
                        weight_confidence = estimator.weight_confidence(),
                        maintenance_kcal,
                        "historical fallback selected"
                    );
                    return FallbackEstimate {
                        maintenance_kcal,
                        source: FallbackSource::Historical {
                            window_days: stage_days,
                        },
                    };
                }
                Err(e) => {
                    debug!(stage_days, error = %e, "skipping fallback stage");
                }
            }
        }

        debug!(
            baseline = self.baseline_maintenance_kcal,
            "no historical stage qualified, using baseline"
        );
        self.baseline()
    }

    fn stage_estimator(
        &self,
        stage_reference: NaiveDate,
        intake: DailySeries,
        weight: DailySeries,
        body_fat: DailySeries,
        primary: &MaintenanceEstimator,
    ) -> Result<MaintenanceEstimator, ComputeError> {
        // Intake is anchored at its last entry, weight at the stage reference
        let intake_days = intake.span_days().max(1);
        let weight_days = weight
            .first()
            .map(|(day, _)| days_between(day, stage_reference))
            .unwrap_or(0)
            .max(1);
        let intake_window = ConfidenceWindow::new(intake_days, self.min_intake_days)?;
        let weight_window = ConfidenceWindow::new(weight_days, self.min_weight_days)?;

        let intake = IntakeAnalytics::new(
            DailySeries::new(),
            intake,
            primary.intake().smoothing_alpha(),
            intake_window,
            stage_reference,
        )?;

        MaintenanceEstimator::new(
            intake,
            weight,
            body_fat,
            primary.density_constants(),
            weight_window,
            self.baseline_maintenance_kcal,
            primary.trend_config(),
        )
    }
}
