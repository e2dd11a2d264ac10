//! Intake analytics
//!
//! Wraps a daily intake series (energy or a single macro-nutrient) and computes its
//! confidence, short- and long-term smoothed intake, and today's running total.

use crate::confidence::ConfidenceWindow;
use crate::error::ComputeError;
use crate::timeseries::{days_before, gap_aware_ewma, DailySeries};
use crate::types::IntakeSummary;
use chrono::NaiveDate;

/// Trailing days used for the short-term smoothed intake
pub const SHORT_TERM_DAYS: i64 = 7;

/// Immutable intake statistics for one refresh cycle.
///
/// `historical` is expected to hold completed days only; today's partial total lives
/// in `current_day`. The confidence window therefore ends at the last completed day.
#[derive(Debug, Clone, PartialEq)]
pub struct IntakeAnalytics {
    current_day: DailySeries,
    historical: DailySeries,
    smoothing_alpha: f64,
    window: ConfidenceWindow,
    reference_date: NaiveDate,
}

impl IntakeAnalytics {
    /// Create intake analytics. `smoothing_alpha` must lie strictly between 0 and 1.
    pub fn new(
        current_day: DailySeries,
        historical: DailySeries,
        smoothing_alpha: f64,
        window: ConfidenceWindow,
        reference_date: NaiveDate,
    ) -> Result<Self, ComputeError> {
        if !(smoothing_alpha > 0.0 && smoothing_alpha < 1.0) {
            return Err(ComputeError::InvalidSmoothingAlpha(smoothing_alpha));
        }
        Ok(Self {
            current_day,
            historical,
            smoothing_alpha,
            window,
            reference_date,
        })
    }

    pub fn current_day(&self) -> &DailySeries {
        &self.current_day
    }

    pub fn historical(&self) -> &DailySeries {
        &self.historical
    }

    pub fn smoothing_alpha(&self) -> f64 {
        self.smoothing_alpha
    }

    pub fn window(&self) -> ConfidenceWindow {
        self.window
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    /// Last completed day, where the confidence window is anchored
    pub fn window_end(&self) -> NaiveDate {
        days_before(self.reference_date, 1)
    }

    /// Historical entries inside the confidence window
    pub fn windowed(&self) -> DailySeries {
        self.window.restrict(&self.historical, self.window_end())
    }

    pub fn confidence(&self) -> f64 {
        self.window.confidence(&self.historical, self.window_end())
    }

    pub fn is_valid(&self) -> bool {
        self.window.is_valid(&self.historical, self.window_end())
    }

    /// Number of logged days inside the confidence window
    pub fn days_logged(&self) -> usize {
        self.windowed().len()
    }

    /// Long-term smoothed intake over the whole confidence window
    pub fn smoothed_intake(&self) -> Option<f64> {
        gap_aware_ewma(self.windowed().iter(), self.smoothing_alpha)
    }

    /// Smoothed intake over the last [`SHORT_TERM_DAYS`] days
    pub fn short_term_smoothed_intake(&self) -> Option<f64> {
        let recent = self.historical.trailing(self.reference_date, SHORT_TERM_DAYS);
        gap_aware_ewma(recent.iter(), self.smoothing_alpha)
    }

    /// Total logged so far today (0 when nothing is logged)
    pub fn today_total(&self) -> f64 {
        self.current_day.sum()
    }

    pub fn summarize(&self) -> IntakeSummary {
        IntakeSummary {
            confidence: self.confidence(),
            is_valid: self.is_valid(),
            smoothed_intake: self.smoothed_intake(),
            short_term_smoothed_intake: self.short_term_smoothed_intake(),
            today_total: self.today_total(),
            days_logged: self.days_logged(),
        }
    }
}
