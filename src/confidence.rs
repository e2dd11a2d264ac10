//! Confidence scoring for sparse daily series
//!
//! A [`ConfidenceWindow`] turns a daily series into a `[0, 1]` score expressing how
//! much the data in the trailing window should be trusted versus a neutral fallback.

use crate::error::ComputeError;
use crate::timeseries::DailySeries;
use chrono::NaiveDate;

/// Longest accepted window or search stage, in days (ten years)
pub const MAX_WINDOW_DAYS: i64 = 3650;

/// Immutable `(window_days, min_data_points)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfidenceWindow {
    window_days: i64,
    min_data_points: usize,
}

impl ConfidenceWindow {
    /// Create a window. Both values must be positive and the window at most
    /// [`MAX_WINDOW_DAYS`].
    pub fn new(window_days: i64, min_data_points: usize) -> Result<Self, ComputeError> {
        if !(1..=MAX_WINDOW_DAYS).contains(&window_days) || min_data_points == 0 {
            return Err(ComputeError::InvalidWindow {
                window_days,
                min_data_points,
            });
        }
        Ok(Self {
            window_days,
            min_data_points,
        })
    }

    pub fn window_days(&self) -> i64 {
        self.window_days
    }

    pub fn min_data_points(&self) -> usize {
        self.min_data_points
    }

    /// Restrict a series to this window ending at `reference`
    pub fn restrict(&self, series: &DailySeries, reference: NaiveDate) -> DailySeries {
        series.trailing(reference, self.window_days)
    }

    /// `min(1, points / min_data_points) × min(1, span_days / window_days)`
    pub fn confidence(&self, series: &DailySeries, reference: NaiveDate) -> f64 {
        let window = self.restrict(series, reference);
        if window.is_empty() {
            return 0.0;
        }

        let density = (window.len() as f64 / self.min_data_points as f64).min(1.0);
        let coverage = (window.span_days() as f64 / self.window_days as f64).min(1.0);

        density * coverage
    }

    /// Enough points, spread over at least half the window
    pub fn is_valid(&self, series: &DailySeries, reference: NaiveDate) -> bool {
        let window = self.restrict(series, reference);
        window.len() >= self.min_data_points
            && (window.span_days() as f64) >= self.window_days as f64 / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn series_days(reference: NaiveDate, days_ago: &[i64]) -> DailySeries {
        days_ago
            .iter()
            .map(|d| (reference - Duration::days(*d), 2000.0))
            .collect()
    }

    #[test]
    fn test_rejects_non_positive_window() {
        assert!(ConfidenceWindow::new(0, 5).is_err());
        assert!(ConfidenceWindow::new(14, 0).is_err());
        assert!(ConfidenceWindow::new(14, 5).is_ok());
    }

    #[test]
    fn test_rejects_oversized_window() {
        assert!(ConfidenceWindow::new(MAX_WINDOW_DAYS, 5).is_ok());
        assert!(ConfidenceWindow::new(MAX_WINDOW_DAYS + 1, 5).is_err());
        assert!(ConfidenceWindow::new(i64::MAX, 5).is_err());
    }

    #[test]
    fn test_empty_series_has_zero_confidence() {
        let window = ConfidenceWindow::new(14, 7).unwrap();
        let empty = DailySeries::new();
        assert_eq!(window.confidence(&empty, date(2024, 1, 15)), 0.0);
        assert!(!window.is_valid(&empty, date(2024, 1, 15)));
    }

    #[test]
    fn test_full_window_has_full_confidence() {
        let reference = date(2024, 1, 31);
        let window = ConfidenceWindow::new(14, 7).unwrap();
        let days: Vec<i64> = (0..=14).collect();
        let series = series_days(reference, &days);

        assert!((window.confidence(&series, reference) - 1.0).abs() < 1e-12);
        assert!(window.is_valid(&series, reference));
    }

    #[test]
    fn test_dense_but_narrow_is_penalized() {
        let reference = date(2024, 1, 31);
        let window = ConfidenceWindow::new(14, 7).unwrap();
        // 8 consecutive days: enough points, span of 7 days
        let days: Vec<i64> = (0..8).collect();
        let series = series_days(reference, &days);

        assert!((window.confidence(&series, reference) - 0.5).abs() < 1e-12);
        assert!(window.is_valid(&series, reference));
    }

    #[test]
    fn test_sparse_but_wide_is_penalized() {
        let reference = date(2024, 1, 31);
        let window = ConfidenceWindow::new(14, 8).unwrap();
        let series = series_days(reference, &[0, 7, 14]);

        // 3/8 points × full span
        assert!((window.confidence(&series, reference) - 3.0 / 8.0).abs() < 1e-12);
        assert!(!window.is_valid(&series, reference));
    }

    #[test]
    fn test_entries_outside_window_are_ignored() {
        let reference = date(2024, 1, 31);
        let window = ConfidenceWindow::new(7, 2).unwrap();
        let series = series_days(reference, &[30, 40, 50]);

        assert_eq!(window.confidence(&series, reference), 0.0);
    }
}
