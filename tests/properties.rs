//! Property-based invariant tests for the analytics and budget engines.
//!
//! 1. Constant intake smooths to that constant
//! 2. Weight regression recovers constant and linear trends
//! 3. Out-of-range slopes clamp exactly to the boundary
//! 4. Confidence is monotone in data and zero for an empty series
//! 5. Energy density rises with body fat
//! 6. Credit arithmetic: idempotence, linearity, unlogged days ignored
//! 7. Budget composition and adjustment cap
//! 8. Empty data yields the fallback maintenance exactly
//! 9. Gap-aware EWMA limits

use chrono::{Duration, NaiveDate, Weekday};
use proptest::prelude::*;
use synheart_energy::budget::BudgetEngine;
use synheart_energy::confidence::ConfidenceWindow;
use synheart_energy::energy_density::EnergyDensityConstants;
use synheart_energy::intake::IntakeAnalytics;
use synheart_energy::maintenance::{MaintenanceEstimator, WeightTrendConfig};
use synheart_energy::timeseries::{gap_aware_ewma, DailySeries};

// ── Fixtures ────────────────────────────────────────────────────────────

/// A Sunday, so a Monday cycle has six elapsed days
fn reference() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
}

fn days_ago(n: i64) -> NaiveDate {
    reference() - Duration::days(n)
}

fn intake_window() -> ConfidenceWindow {
    ConfidenceWindow::new(28, 14).unwrap()
}

fn weight_window() -> ConfidenceWindow {
    ConfidenceWindow::new(28, 10).unwrap()
}

fn intake(historical: DailySeries, alpha: f64) -> IntakeAnalytics {
    IntakeAnalytics::new(DailySeries::new(), historical, alpha, intake_window(), reference())
        .unwrap()
}

fn estimator(weight: DailySeries, fallback_kcal: f64) -> MaintenanceEstimator {
    MaintenanceEstimator::new(
        intake(DailySeries::new(), 0.1),
        weight,
        DailySeries::new(),
        EnergyDensityConstants::default(),
        weight_window(),
        fallback_kcal,
        WeightTrendConfig::default(),
    )
    .unwrap()
}

/// Budget whose base equals `base_kcal` exactly (no data, fallback only)
fn budget(base_kcal: f64, week_to_date: DailySeries) -> BudgetEngine {
    BudgetEngine::new(
        intake(DailySeries::new(), 0.1),
        estimator(DailySeries::new(), base_kcal),
        week_to_date,
        None,
        Weekday::Mon,
        reference(),
    )
    .unwrap()
}

fn linear_weights(start_kg: f64, slope_per_week: f64, days: i64) -> DailySeries {
    (0..days)
        .map(|n| (days_ago(n), start_kg - slope_per_week / 7.0 * n as f64))
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════
// 1-3. Smoothing and regression
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn constant_intake_smooths_to_constant(
        kcal in 500.0f64..5000.0,
        alpha in 0.01f64..0.99,
        days in 28i64..60,
    ) {
        let historical: DailySeries = (1..=days).map(|n| (days_ago(n), kcal)).collect();
        let smoothed = intake(historical, alpha).smoothed_intake().unwrap();
        prop_assert!((smoothed - kcal).abs() < 1e-6 * kcal);
    }

    #[test]
    fn constant_weight_has_zero_slope(weight in 40.0f64..180.0, days in 2i64..28) {
        let series: DailySeries = (0..days).map(|n| (days_ago(n), weight)).collect();
        prop_assert!(estimator(series, 2200.0).raw_weight_slope().abs() < 1e-6);
    }

    #[test]
    fn linear_trend_is_recovered(slope in -1.0f64..0.5, days in 3i64..28) {
        let est = estimator(linear_weights(80.0, slope, days), 2200.0);
        prop_assert!((est.raw_weight_slope() - slope).abs() < 1e-6);
        prop_assert!((est.weight_slope() - slope).abs() < 1e-6);
    }

    #[test]
    fn steep_trends_clamp_to_boundary(excess in 0.05f64..3.0, losing in any::<bool>()) {
        let slope = if losing { -1.0 - excess } else { 0.5 + excess };
        let est = estimator(linear_weights(90.0, slope, 21), 2200.0);

        let expected = if losing { -1.0 } else { 0.5 };
        prop_assert_eq!(est.weight_slope(), expected);
        prop_assert!(est.raw_weight_slope() != est.weight_slope());
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 4-5. Confidence and energy density
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn confidence_grows_with_data(
        offsets in prop::collection::btree_set(0i64..=28, 0..20),
        extra in 0i64..=28,
    ) {
        let window = intake_window();
        let series: DailySeries = offsets.iter().map(|n| (days_ago(*n), 2000.0)).collect();
        let mut larger = series.clone();
        larger.insert(days_ago(extra), 2000.0);

        let before = window.confidence(&series, reference());
        let after = window.confidence(&larger, reference());

        prop_assert!((0.0..=1.0).contains(&before));
        prop_assert!(after >= before);
        if series.is_empty() {
            prop_assert_eq!(before, 0.0);
        }
    }

    #[test]
    fn density_rises_with_body_fat(
        weight in 40.0f64..180.0,
        low in 0.02f64..0.45,
        delta in 0.01f64..0.5,
    ) {
        let constants = EnergyDensityConstants::default();
        let lean = constants.energy_density(Some(weight), Some(low));
        let fatter = constants.energy_density(Some(weight), Some(low + delta));
        prop_assert!(fatter > lean);
        prop_assert!(lean > constants.lean_kcal_per_kg && fatter < constants.fat_kcal_per_kg);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 6-8. Budget arithmetic
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn eating_at_base_budget_leaves_no_credit(base in 1200.0f64..4000.0, logged in 1i64..=6) {
        let week: DailySeries = (1..=logged).map(|n| (days_ago(n), base)).collect();
        prop_assert!(budget(base, week).credit().abs() < 1e-6);
    }

    #[test]
    fn credit_is_linear_in_deficit(
        base in 1200.0f64..4000.0,
        deficit in -800.0f64..800.0,
        logged in 1i64..=6,
    ) {
        let week: DailySeries = (1..=logged).map(|n| (days_ago(n), base - deficit)).collect();
        let credit = budget(base, week).credit();
        prop_assert!((credit - deficit * logged as f64).abs() < 1e-6);
    }

    #[test]
    fn unlogged_days_are_ignored(base in 1200.0f64..4000.0, logged in prop::collection::btree_set(1i64..=6, 1..=6)) {
        let week: DailySeries = logged.iter().map(|n| (days_ago(*n), 0.0)).collect();
        let engine = budget(base, week);
        prop_assert_eq!(engine.days_logged(), logged.len());
        prop_assert!((engine.credit() - base * logged.len() as f64).abs() < 1e-6);
    }

    #[test]
    fn budget_is_base_plus_capped_adjustment(
        base in 1200.0f64..4000.0,
        intakes in prop::collection::vec(0.0f64..6000.0, 0..=6),
    ) {
        let week: DailySeries = intakes
            .iter()
            .enumerate()
            .map(|(i, kcal)| (days_ago(i as i64 + 1), *kcal))
            .collect();
        let engine = budget(base, week);

        let adjustment = engine.daily_adjustment();
        prop_assert!(adjustment.abs() <= 500.0);
        prop_assert_eq!(engine.budget(), engine.base_budget() + adjustment);
        prop_assert!(engine.days_remaining() >= 1);

        let raw = engine.credit() / engine.days_remaining() as f64;
        if raw.abs() > 500.0 {
            prop_assert_eq!(adjustment, 500.0_f64.copysign(raw));
        }
    }

    #[test]
    fn empty_data_yields_fallback_exactly(fallback in 800.0f64..5000.0) {
        let est = estimator(DailySeries::new(), fallback);
        prop_assert_eq!(est.calorie_confidence(), 0.0);
        prop_assert_eq!(est.weight_confidence(), 0.0);
        prop_assert_eq!(est.maintenance(), fallback);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 9. Gap-aware EWMA
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn one_day_gap_is_standard_ewma(
        first in 0.0f64..5000.0,
        second in 0.0f64..5000.0,
        alpha in 0.01f64..0.99,
    ) {
        let points = vec![(days_ago(2), first), (days_ago(1), second)];
        let smoothed = gap_aware_ewma(points, alpha).unwrap();
        prop_assert_eq!(smoothed, alpha * second + (1.0 - alpha) * first);
    }

    #[test]
    fn long_gap_favours_later_point(
        first in 0.0f64..5000.0,
        second in 0.0f64..5000.0,
        alpha in 0.1f64..0.99,
    ) {
        let points = vec![(days_ago(31), first), (days_ago(1), second)];
        let smoothed = gap_aware_ewma(points, alpha).unwrap();
        // (1 - 0.1)^30 < 0.043
        prop_assert!((smoothed - second).abs() <= 0.043 * (first - second).abs() + 1e-9);
    }
}
