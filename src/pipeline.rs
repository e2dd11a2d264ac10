//! Pipeline orchestration
//!
//! This module provides the public API for Synheart Energy.
//! It runs one refresh cycle from raw health records to an [`EnergySnapshot`].

use crate::budget::BudgetEngine;
use crate::config::EngineConfig;
use crate::error::ComputeError;
use crate::intake::IntakeAnalytics;
use crate::macro_budget::MacroBudgetEngine;
use crate::maintenance::{FallbackEstimate, HistoricalSeries, MaintenanceEstimator};
use crate::records::{HealthKind, HealthRecords};
use crate::timeseries::{days_before, DailySeries};
use crate::types::{EnergySnapshot, FallbackSource, MacroKind, SnapshotProducer, SNAPSHOT_VERSION};
use crate::{ENERGY_VERSION, PRODUCER_NAME};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;
use uuid::Uuid;

/// Compute an energy snapshot from raw health records.
///
/// # Arguments
/// * `records_json` - Health samples (JSON array, `{"samples": [...]}` or NDJSON)
/// * `config_json` - Optional [`EngineConfig`] JSON; defaults apply when `None`
/// * `reference_date` - The user's "today" as `YYYY-MM-DD`
///
/// # Returns
/// The snapshot as JSON
///
/// # Example
/// ```ignore
/// let snapshot_json = records_to_snapshot(
///     records_json,
///     None,
///     "2024-01-19".to_string(),
/// )?;
/// ```
pub fn records_to_snapshot(
    records_json: String,
    config_json: Option<String>,
    reference_date: String,
) -> Result<String, ComputeError> {
    let config = match config_json {
        Some(json) => EngineConfig::from_json(&json)?,
        None => EngineConfig::default(),
    };
    let reference_date = parse_reference_date(&reference_date)?;
    let records = HealthRecords::parse(&records_json)?;

    let snapshot = compute_snapshot(
        &records,
        &config,
        reference_date,
        new_producer(),
        Utc::now(),
    )?;
    encode_snapshot(&snapshot)
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_reference_date(date: &str) -> Result<NaiveDate, ComputeError> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|e| ComputeError::DateParseError(format!("{}: {}", date, e)))
}

fn new_producer() -> SnapshotProducer {
    SnapshotProducer {
        name: PRODUCER_NAME.to_string(),
        version: ENERGY_VERSION.to_string(),
        instance_id: Uuid::new_v4().to_string(),
    }
}

fn encode_snapshot(snapshot: &EnergySnapshot) -> Result<String, ComputeError> {
    snapshot
        .to_json()
        .map_err(|e| ComputeError::EncodingError(e.to_string()))
}

/// Run every engine for one reference date.
///
/// Pipeline stages:
/// 1. HealthRecords - Bucket samples into local calendar days
/// 2. IntakeAnalytics - Split completed days from today
/// 3. MaintenanceEstimator - Primary estimate over the trailing windows
/// 4. FallbackSearch - Personal fallback from wider history when intake is sparse
/// 5. BudgetEngine / MacroBudgetEngine - Weekly credit and macro targets
///
/// Samples dated after `reference_date` are ignored.
pub fn compute_snapshot(
    records: &HealthRecords,
    config: &EngineConfig,
    reference_date: NaiveDate,
    producer: SnapshotProducer,
    computed_at_utc: DateTime<Utc>,
) -> Result<EnergySnapshot, ComputeError> {
    config.validate()?;
    let tz = config.timezone()?;

    // Stage 1: daily series
    let energy = records.daily_series(HealthKind::DietaryEnergy, &tz);
    let weight = up_to(&records.daily_series(HealthKind::BodyMass, &tz), reference_date);
    let body_fat = up_to(
        &records.daily_series(HealthKind::BodyFatPercentage, &tz),
        reference_date,
    );
    debug!(
        %reference_date,
        samples = records.len(),
        energy_days = energy.len(),
        weight_days = weight.len(),
        body_fat_days = body_fat.len(),
        "bucketed health records"
    );

    // Stage 2: intake
    let intake = intake_analytics(&energy, config, reference_date)?;

    // Stage 3: primary estimate
    let primary = MaintenanceEstimator::new(
        intake.clone(),
        weight.clone(),
        body_fat.clone(),
        config.energy_density,
        config.weight_window()?,
        config.fallback.baseline_maintenance_kcal,
        config.weight_trend,
    )?;

    // Stage 4: fallback
    let fallback = if primary.needs_fallback() {
        let history = HistoricalSeries {
            intake: intake.historical().clone(),
            weight,
            body_fat,
        };
        config.fallback.search(&history, &primary)
    } else {
        debug!("intake window complete, skipping fallback search");
        FallbackEstimate {
            maintenance_kcal: config.fallback.baseline_maintenance_kcal,
            source: FallbackSource::Baseline,
        }
    };
    let estimator = primary.with_fallback_maintenance(fallback.maintenance_kcal);
    let maintenance = estimator.summarize(fallback.source);
    debug!(
        maintenance_kcal = maintenance.maintenance,
        calorie_confidence = maintenance.calorie_confidence,
        weight_confidence = maintenance.weight_confidence,
        "maintenance estimated"
    );

    // Stage 5: budgets
    let budget_engine = BudgetEngine::new(
        intake.clone(),
        estimator,
        intake.historical().clone(),
        config.user_adjustment_kcal,
        config.first_weekday,
        reference_date,
    )?
    .with_credit_cap(config.credit_cap_kcal)?;
    let budget = budget_engine.summarize();
    debug!(
        base_budget = budget.base_budget,
        credit = budget.credit,
        budget = budget.budget,
        "weekly budget computed"
    );

    let macro_intake = |kind: MacroKind| {
        let series = records.daily_series(HealthKind::from(kind), &tz);
        intake_analytics(&series, config, reference_date)
    };
    let macros = MacroBudgetEngine::new(
        Some(budget_engine),
        macro_intake(MacroKind::Protein)?,
        macro_intake(MacroKind::Carbohydrates)?,
        macro_intake(MacroKind::Fat)?,
        config.macro_percentages,
    )?
    .summarize();

    Ok(EnergySnapshot {
        snapshot_version: SNAPSHOT_VERSION.to_string(),
        producer,
        reference_date,
        computed_at_utc,
        intake: intake.summarize(),
        maintenance,
        budget,
        macros,
    })
}

/// Entries on or before `reference_date`
fn up_to(series: &DailySeries, reference_date: NaiveDate) -> DailySeries {
    series.range(NaiveDate::MIN, reference_date)
}

/// Today's entry goes to `current_day`, earlier days to `historical`
fn intake_analytics(
    series: &DailySeries,
    config: &EngineConfig,
    reference_date: NaiveDate,
) -> Result<IntakeAnalytics, ComputeError> {
    IntakeAnalytics::new(
        series.range(reference_date, reference_date),
        series.range(NaiveDate::MIN, days_before(reference_date, 1)),
        config.smoothing_alpha,
        config.intake_window()?,
        reference_date,
    )
}

/// Stateful processor that keeps the last-known-good snapshot.
///
/// A failed refresh leaves the previous snapshot in place, so presentation layers
/// can keep showing it.
pub struct EnergyProcessor {
    config: EngineConfig,
    producer: SnapshotProducer,
    last_snapshot: Option<EnergySnapshot>,
}

impl Default for EnergyProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl EnergyProcessor {
    /// Create a new processor with default settings
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            producer: new_producer(),
            last_snapshot: None,
        }
    }

    /// Create a processor with a validated configuration
    pub fn with_config(config: EngineConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self {
            config,
            producer: new_producer(),
            last_snapshot: None,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn last_snapshot(&self) -> Option<&EnergySnapshot> {
        self.last_snapshot.as_ref()
    }

    /// Refresh from already parsed records
    pub fn process_records(
        &mut self,
        records: &HealthRecords,
        reference_date: NaiveDate,
    ) -> Result<&EnergySnapshot, ComputeError> {
        let snapshot = compute_snapshot(
            records,
            &self.config,
            reference_date,
            self.producer.clone(),
            Utc::now(),
        )?;
        Ok(self.last_snapshot.insert(snapshot))
    }

    /// Refresh from raw records and return the snapshot JSON
    pub fn process(
        &mut self,
        records_json: &str,
        reference_date: NaiveDate,
    ) -> Result<String, ComputeError> {
        let records = HealthRecords::parse(records_json)?;
        let snapshot = self.process_records(&records, reference_date)?;
        encode_snapshot(snapshot)
    }

    /// Load the last snapshot from JSON
    pub fn load_snapshot(&mut self, json: &str) -> Result<(), ComputeError> {
        let snapshot =
            EnergySnapshot::from_json(json).map_err(|e| ComputeError::ParseError(e.to_string()))?;
        if snapshot.snapshot_version != SNAPSHOT_VERSION {
            return Err(ComputeError::ParseError(format!(
                "unsupported snapshot version {}",
                snapshot.snapshot_version
            )));
        }
        self.last_snapshot = Some(snapshot);
        Ok(())
    }

    /// Save the last snapshot to JSON
    pub fn save_snapshot(&self) -> Result<String, ComputeError> {
        let snapshot = self.last_snapshot.as_ref().ok_or_else(|| {
            ComputeError::EncodingError("no snapshot has been computed".to_string())
        })?;
        encode_snapshot(snapshot)
    }
}
