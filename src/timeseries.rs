//! Daily time-series utilities
//!
//! This module provides the numeric building blocks shared by every engine:
//! - Bucketing of dated samples into one value per calendar day
//! - Gap-aware exponential smoothing
//! - Weighted least-squares slope
//! - Calendar arithmetic (day floor/ceil, day distance, weekday navigation)

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How samples falling on the same calendar day are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Cumulative quantities (energy, grams)
    Sum,
    /// Discrete measurements (body mass, body-fat fraction)
    Mean,
}

/// One aggregated value per calendar day.
///
/// Keys are not required to be contiguous; missing days are meaningful and are
/// never filled in. Non-finite values are rejected on insert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DailySeries {
    values: BTreeMap<NaiveDate, f64>,
}

impl DailySeries {
    /// Create an empty series
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a series from values that are already one-per-day.
    ///
    /// Later entries for the same day replace earlier ones.
    pub fn from_daily_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        let mut series = Self::new();
        for (day, value) in values {
            series.insert(day, value);
        }
        series
    }

    /// Bucket timestamped samples into calendar days of `tz`.
    ///
    /// Non-finite samples are skipped before aggregation.
    pub fn from_samples<S, Tz, I>(samples: I, tz: &Tz, aggregation: Aggregation) -> Self
    where
        S: TimeZone,
        Tz: TimeZone,
        I: IntoIterator<Item = (DateTime<S>, f64)>,
    {
        let mut buckets: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
        for (timestamp, value) in samples {
            if !value.is_finite() {
                continue;
            }
            let day = floor_to_day(&timestamp, tz);
            let bucket = buckets.entry(day).or_insert((0.0, 0));
            bucket.0 += value;
            bucket.1 += 1;
        }

        let values = buckets
            .into_iter()
            .map(|(day, (sum, count))| {
                let value = match aggregation {
                    Aggregation::Sum => sum,
                    Aggregation::Mean => sum / count as f64,
                };
                (day, value)
            })
            .filter(|(_, value)| value.is_finite())
            .collect();

        Self { values }
    }

    /// Insert a value for a day. Returns false (and stores nothing) for non-finite values.
    pub fn insert(&mut self, day: NaiveDate, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        self.values.insert(day, value);
        true
    }

    pub fn get(&self, day: NaiveDate) -> Option<f64> {
        self.values.get(&day).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate entries in chronological order
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.values.iter().map(|(day, value)| (*day, *value))
    }

    pub fn first(&self) -> Option<(NaiveDate, f64)> {
        self.values.iter().next().map(|(d, v)| (*d, *v))
    }

    pub fn last(&self) -> Option<(NaiveDate, f64)> {
        self.values.iter().next_back().map(|(d, v)| (*d, *v))
    }

    /// Entries with `start <= day <= end`
    pub fn range(&self, start: NaiveDate, end: NaiveDate) -> DailySeries {
        if start > end {
            return Self::new();
        }
        Self {
            values: self
                .values
                .range(start..=end)
                .map(|(d, v)| (*d, *v))
                .collect(),
        }
    }

    /// Entries in the trailing window `[reference - window_days, reference]`
    pub fn trailing(&self, reference: NaiveDate, window_days: i64) -> DailySeries {
        self.range(days_before(reference, window_days), reference)
    }

    /// Day distance between the earliest and latest entry (0 when fewer than two)
    pub fn span_days(&self) -> i64 {
        match (self.first(), self.last()) {
            (Some((first, _)), Some((last, _))) => days_between(first, last),
            _ => 0,
        }
    }

    pub fn sum(&self) -> f64 {
        self.values.values().sum()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.sum() / self.values.len() as f64)
    }
}

impl FromIterator<(NaiveDate, f64)> for DailySeries {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, f64)>>(iter: I) -> Self {
        Self::from_daily_values(iter)
    }
}

/// Effective smoothing factor after `gap_days` calendar days.
///
/// Equivalent to applying the one-day decay `(1 - alpha)` once per elapsed day.
pub fn effective_alpha(alpha: f64, gap_days: i64) -> f64 {
    if gap_days <= 1 {
        return alpha;
    }
    let gap = i32::try_from(gap_days).unwrap_or(i32::MAX);
    1.0 - (1.0 - alpha).powi(gap)
}

/// Gap-aware exponential smoothing over chronologically sorted daily points.
///
/// Returns `None` for empty input. Only recorded days participate.
pub fn gap_aware_ewma<I>(points: I, alpha: f64) -> Option<f64>
where
    I: IntoIterator<Item = (NaiveDate, f64)>,
{
    let mut iter = points.into_iter();
    let (mut previous_day, mut smoothed) = iter.next()?;

    for (day, value) in iter {
        let a = effective_alpha(alpha, days_between(previous_day, day));
        smoothed = a * value + (1.0 - a) * smoothed;
        previous_day = day;
    }

    Some(smoothed)
}

/// Weighted least-squares slope of `y` over `x`.
///
/// Points are `(x, y, weight)`. Returns 0 with fewer than two points or when the
/// weighted variance of `x` is zero.
pub fn weighted_slope(points: &[(f64, f64, f64)]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    let total_weight: f64 = points.iter().map(|(_, _, w)| w).sum();
    if total_weight <= 0.0 {
        return 0.0;
    }

    let mean_x = points.iter().map(|(x, _, w)| w * x).sum::<f64>() / total_weight;
    let mean_y = points.iter().map(|(_, y, w)| w * y).sum::<f64>() / total_weight;

    // Moments normalized by total weight; decayed weights can be ~1e-30
    let mut covariance = 0.0;
    let mut variance = 0.0;
    for (x, y, w) in points {
        let dx = x - mean_x;
        covariance += w * dx * (y - mean_y) / total_weight;
        variance += w * dx * dx / total_weight;
    }

    if !variance.is_finite() || variance < 1e-12 {
        return 0.0;
    }

    covariance / variance
}

/// Calendar day containing `timestamp` in `tz`
pub fn floor_to_day<S: TimeZone, Tz: TimeZone>(timestamp: &DateTime<S>, tz: &Tz) -> NaiveDate {
    timestamp.with_timezone(tz).date_naive()
}

/// First calendar day starting at or after `timestamp` in `tz`
pub fn ceil_to_day<S: TimeZone, Tz: TimeZone>(timestamp: &DateTime<S>, tz: &Tz) -> NaiveDate {
    let local = timestamp.with_timezone(tz);
    let time = local.time();
    if time.num_seconds_from_midnight() == 0 && time.nanosecond() == 0 {
        local.date_naive()
    } else {
        days_after(local.date_naive(), 1)
    }
}

/// Signed number of calendar days from `from` to `to`
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Largest offset ever applied to a date; wider than the whole `NaiveDate` range
const MAX_DAY_OFFSET: i64 = 200_000_000;

/// `date` moved back by `days`, saturating at `NaiveDate::MIN`
pub fn days_before(date: NaiveDate, days: i64) -> NaiveDate {
    let days = days.clamp(0, MAX_DAY_OFFSET);
    date.checked_sub_signed(Duration::days(days)).unwrap_or(NaiveDate::MIN)
}

/// `date` moved forward by `days`, saturating at `NaiveDate::MAX`
pub fn days_after(date: NaiveDate, days: i64) -> NaiveDate {
    let days = days.clamp(0, MAX_DAY_OFFSET);
    date.checked_add_signed(Duration::days(days)).unwrap_or(NaiveDate::MAX)
}

/// Latest day on or before `date` that falls on `weekday`
pub fn previous_or_same_weekday(date: NaiveDate, weekday: Weekday) -> NaiveDate {
    let back = (date.weekday().num_days_from_monday() + 7 - weekday.num_days_from_monday()) % 7;
    days_before(date, back as i64)
}

/// Earliest day strictly after `date` that falls on `weekday`
pub fn next_weekday_after(date: NaiveDate, weekday: Weekday) -> NaiveDate {
    let ahead = (weekday.num_days_from_monday() + 7 - date.weekday().num_days_from_monday()) % 7;
    let ahead = if ahead == 0 { 7 } else { ahead };
    days_after(date, ahead as i64)
}
