//! Weekly calorie budget and credit
//!
//! The budget does not reset at midnight. Calories under (or over) the base budget on
//! each logged day of the current cycle accumulate as credit (or debt), which is
//! spread over the days left in the cycle:
//!
//! ```text
//! credit          = base_budget × days_logged − logged_intake
//! daily_adjustment = clamp(credit / days_remaining, ±cap)
//! budget          = base_budget + daily_adjustment
//! remaining       = budget − today_intake
//! ```
//!
//! Unlogged days are left out of both the day count and the intake sum.

use crate::error::ComputeError;
use crate::intake::IntakeAnalytics;
use crate::maintenance::MaintenanceEstimator;
use crate::timeseries::{
    days_before, days_between, next_weekday_after, previous_or_same_weekday, DailySeries,
};
use crate::types::BudgetSummary;
use chrono::{NaiveDate, Weekday};

/// Largest daily adjustment in either direction (kcal)
pub const DEFAULT_CREDIT_CAP_KCAL: f64 = 500.0;

/// Immutable weekly budget for one refresh cycle
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetEngine {
    intake: IntakeAnalytics,
    maintenance: MaintenanceEstimator,
    week_to_date: DailySeries,
    user_adjustment_kcal: Option<f64>,
    first_weekday: Weekday,
    reference_date: NaiveDate,
    credit_cap_kcal: f64,
}

impl BudgetEngine {
    pub fn new(
        intake: IntakeAnalytics,
        maintenance: MaintenanceEstimator,
        week_to_date: DailySeries,
        user_adjustment_kcal: Option<f64>,
        first_weekday: Weekday,
        reference_date: NaiveDate,
    ) -> Result<Self, ComputeError> {
        if let Some(adjustment) = user_adjustment_kcal {
            if !adjustment.is_finite() {
                return Err(ComputeError::InvalidConfig(format!(
                    "user adjustment must be finite, got {}",
                    adjustment
                )));
            }
        }
        Ok(Self {
            intake,
            maintenance,
            week_to_date,
            user_adjustment_kcal,
            first_weekday,
            reference_date,
            credit_cap_kcal: DEFAULT_CREDIT_CAP_KCAL,
        })
    }

    /// Override the daily adjustment cap
    pub fn with_credit_cap(mut self, credit_cap_kcal: f64) -> Result<Self, ComputeError> {
        if !(credit_cap_kcal.is_finite() && credit_cap_kcal >= 0.0) {
            return Err(ComputeError::InvalidConfig(format!(
                "credit cap must be non-negative, got {}",
                credit_cap_kcal
            )));
        }
        self.credit_cap_kcal = credit_cap_kcal;
        Ok(self)
    }

    pub fn maintenance_estimator(&self) -> &MaintenanceEstimator {
        &self.maintenance
    }

    pub fn intake(&self) -> &IntakeAnalytics {
        &self.intake
    }

    pub fn first_weekday(&self) -> Weekday {
        self.first_weekday
    }

    pub fn reference_date(&self) -> NaiveDate {
        self.reference_date
    }

    pub fn credit_cap_kcal(&self) -> f64 {
        self.credit_cap_kcal
    }

    /// Maintenance plus the user's adjustment
    pub fn base_budget(&self) -> f64 {
        self.maintenance.maintenance() + self.user_adjustment_kcal.unwrap_or(0.0)
    }

    /// First day of the current cycle
    pub fn cycle_start(&self) -> NaiveDate {
        previous_or_same_weekday(self.reference_date, self.first_weekday)
    }

    /// Fully elapsed days of the cycle, logged or not
    pub fn days_elapsed(&self) -> i64 {
        days_between(self.cycle_start(), self.reference_date)
    }

    /// Logged days from cycle start up to yesterday
    pub fn logged_days(&self) -> DailySeries {
        self.week_to_date
            .range(self.cycle_start(), days_before(self.reference_date, 1))
    }

    pub fn days_logged(&self) -> usize {
        self.logged_days().len()
    }

    pub fn logged_intake(&self) -> f64 {
        self.logged_days().sum()
    }

    /// Banked (positive) or owed (negative) kcal
    pub fn credit(&self) -> f64 {
        let logged = self.logged_days();
        if logged.is_empty() {
            return 0.0;
        }
        self.base_budget() * logged.len() as f64 - logged.sum()
    }

    /// Days left in the cycle including today, at least 1
    pub fn days_remaining(&self) -> i64 {
        let next_cycle = next_weekday_after(self.reference_date, self.first_weekday);
        days_between(self.reference_date, next_cycle).max(1)
    }

    pub fn daily_adjustment(&self) -> f64 {
        let raw = self.credit() / self.days_remaining() as f64;
        raw.clamp(-self.credit_cap_kcal, self.credit_cap_kcal)
    }

    /// Today's adjusted budget
    pub fn budget(&self) -> f64 {
        self.base_budget() + self.daily_adjustment()
    }

    pub fn today_intake(&self) -> f64 {
        self.intake.today_total()
    }

    pub fn remaining(&self) -> f64 {
        self.budget() - self.today_intake()
    }

    pub fn summarize(&self) -> BudgetSummary {
        let base_budget = self.base_budget();
        let daily_adjustment = self.daily_adjustment();
        let budget = base_budget + daily_adjustment;
        BudgetSummary {
            base_budget,
            credit: self.credit(),
            daily_adjustment,
            budget,
            remaining: budget - self.today_intake(),
            days_logged: self.days_logged(),
            logged_intake: self.logged_intake(),
            days_remaining: self.days_remaining(),
            cycle_start: self.cycle_start(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confidence::ConfidenceWindow;
    use crate::energy_density::EnergyDensityConstants;
    use crate::maintenance::{WeightTrendConfig, DEFAULT_BASELINE_MAINTENANCE_KCAL};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    // 2024-01-15 is a Monday; 2024-01-19 a Friday
    fn friday() -> NaiveDate {
        date(2024, 1, 19)
    }

    fn intake(reference: NaiveDate, today_kcal: Option<f64>) -> IntakeAnalytics {
        let current: DailySeries = today_kcal.map(|k| (reference, k)).into_iter().collect();
        IntakeAnalytics::new(
            current,
            DailySeries::new(),
            0.1,
            ConfidenceWindow::new(28, 14).unwrap(),
            reference,
        )
        .unwrap()
    }

    /// Estimator with no data: maintenance is exactly the baseline (2200)
    fn empty_maintenance(reference: NaiveDate) -> MaintenanceEstimator {
        MaintenanceEstimator::new(
            intake(reference, None),
            DailySeries::new(),
            DailySeries::new(),
            EnergyDensityConstants::default(),
            ConfidenceWindow::new(28, 10).unwrap(),
            DEFAULT_BASELINE_MAINTENANCE_KCAL,
            WeightTrendConfig::default(),
        )
        .unwrap()
    }

    fn engine(reference: NaiveDate, week: DailySeries, adjustment: Option<f64>) -> BudgetEngine {
        BudgetEngine::new(
            intake(reference, Some(800.0)),
            empty_maintenance(reference),
            week,
            adjustment,
            Weekday::Mon,
            reference,
        )
        .unwrap()
    }

    #[test]
    fn test_base_budget_includes_adjustment() {
        let e = engine(friday(), DailySeries::new(), Some(-200.0));
        assert_eq!(e.base_budget(), 2000.0);
    }

    #[test]
    fn test_no_logged_days_means_no_credit() {
        let e = engine(friday(), DailySeries::new(), None);
        assert_eq!(e.credit(), 0.0);
        assert_eq!(e.daily_adjustment(), 0.0);
        assert_eq!(e.budget(), 2200.0);
        assert_eq!(e.remaining(), 1400.0);
    }

    #[test]
    fn test_eating_exactly_budget_gives_zero_credit() {
        let week: DailySeries = (15..=18).map(|d| (date(2024, 1, d), 2000.0)).collect();
        let e = engine(friday(), week, Some(-200.0));
        assert!(e.credit().abs() < 1e-9);
        assert_eq!(e.days_logged(), 4);
    }

    #[test]
    fn test_under_eating_accumulates_credit() {
        let week: DailySeries = (15..=18).map(|d| (date(2024, 1, d), 1500.0)).collect();
        let e = engine(friday(), week, Some(-200.0));
        assert!((e.credit() - 2000.0).abs() < 1e-9);
    }

    #[test]
    fn test_unlogged_days_are_ignored() {
        let week: DailySeries = vec![(date(2024, 1, 15), 0.0), (date(2024, 1, 17), 0.0)]
            .into_iter()
            .collect();
        let e = engine(friday(), week, Some(-200.0));

        assert_eq!(e.days_elapsed(), 4);
        assert_eq!(e.days_logged(), 2);
        assert_eq!(e.credit(), 2000.0 * 2.0);
    }

    #[test]
    fn test_entries_outside_cycle_are_ignored() {
        let week: DailySeries = vec![
            (date(2024, 1, 14), 0.0), // previous cycle (Sunday)
            (date(2024, 1, 16), 2000.0),
            (date(2024, 1, 19), 0.0), // today, counted via intake analytics
        ]
        .into_iter()
        .collect();
        let e = engine(friday(), week, Some(-200.0));

        assert_eq!(e.days_logged(), 1);
        assert!(e.credit().abs() < 1e-9);
    }

    #[test]
    fn test_adjustment_is_clamped() {
        let surplus: DailySeries = (15..=18).map(|d| (date(2024, 1, d), 0.0)).collect();
        let e = engine(friday(), surplus, None);
        assert_eq!(e.days_remaining(), 3);
        assert_eq!(e.daily_adjustment(), DEFAULT_CREDIT_CAP_KCAL);
        assert_eq!(e.budget(), e.base_budget() + DEFAULT_CREDIT_CAP_KCAL);

        let debt: DailySeries = (15..=18).map(|d| (date(2024, 1, d), 5000.0)).collect();
        let e = engine(friday(), debt, None);
        assert_eq!(e.daily_adjustment(), -DEFAULT_CREDIT_CAP_KCAL);
    }

    #[test]
    fn test_adjustment_spreads_credit_over_remaining_days() {
        // 300 kcal under on two days, three days left
        let week: DailySeries = vec![(date(2024, 1, 15), 1700.0), (date(2024, 1, 16), 1700.0)]
            .into_iter()
            .collect();
        let e = engine(friday(), week, Some(-200.0));
        assert!((e.daily_adjustment() - 200.0).abs() < 1e-9);
        assert_eq!(e.budget(), e.base_budget() + e.daily_adjustment());
    }

    #[test]
    fn test_days_remaining_at_cycle_boundaries() {
        let monday = date(2024, 1, 15);
        let sunday = date(2024, 1, 21);
        assert_eq!(engine(monday, DailySeries::new(), None).days_remaining(), 7);
        assert_eq!(engine(sunday, DailySeries::new(), None).days_remaining(), 1);
        assert_eq!(engine(monday, DailySeries::new(), None).cycle_start(), monday);
        assert_eq!(engine(sunday, DailySeries::new(), None).cycle_start(), monday);
    }

    #[test]
    fn test_custom_credit_cap() {
        let surplus: DailySeries = (15..=18).map(|d| (date(2024, 1, d), 0.0)).collect();
        let e = engine(friday(), surplus, None).with_credit_cap(250.0).unwrap();
        assert_eq!(e.daily_adjustment(), 250.0);
        assert!(engine(friday(), DailySeries::new(), None)
            .with_credit_cap(-1.0)
            .is_err());
    }

    #[test]
    fn test_summary_matches_accessors() {
        let week: DailySeries = (15..=17).map(|d| (date(2024, 1, d), 1900.0)).collect();
        let e = engine(friday(), week, None);
        let summary = e.summarize();

        assert_eq!(summary.budget, summary.base_budget + summary.daily_adjustment);
        assert_eq!(summary.remaining, summary.budget - 800.0);
        assert_eq!(summary.credit, e.credit());
        assert_eq!(summary.days_logged, 3);
        assert_eq!(summary.cycle_start, date(2024, 1, 15));
    }
}
