//! Core output types for the Synheart Energy pipeline
//!
//! This module defines the serializable summaries produced by each engine and the
//! complete [`EnergySnapshot`] handed to presentation layers and caches.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot format identifier
pub const SNAPSHOT_VERSION: &str = "energy.snapshot.v1";

/// Macro-nutrient identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacroKind {
    Protein,
    Carbohydrates,
    Fat,
}

impl MacroKind {
    pub const ALL: [MacroKind; 3] = [MacroKind::Protein, MacroKind::Carbohydrates, MacroKind::Fat];

    pub fn as_str(&self) -> &'static str {
        match self {
            MacroKind::Protein => "protein",
            MacroKind::Carbohydrates => "carbohydrates",
            MacroKind::Fat => "fat",
        }
    }

    /// Atwater factor
    pub fn kcal_per_gram(&self) -> f64 {
        match self {
            MacroKind::Protein => 4.0,
            MacroKind::Carbohydrates => 4.0,
            MacroKind::Fat => 9.0,
        }
    }
}

/// Where the intake fallback of the maintenance estimate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FallbackSource {
    /// Fixed baseline constant
    Baseline,
    /// Nested estimate over a wider historical window
    Historical { window_days: i64 },
}

/// Intake statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntakeSummary {
    /// Confidence in the trailing intake window (0-1)
    pub confidence: f64,
    pub is_valid: bool,
    /// Long-term gap-aware EWMA (kcal/day)
    pub smoothed_intake: Option<f64>,
    /// Short-term gap-aware EWMA (kcal/day)
    pub short_term_smoothed_intake: Option<f64>,
    /// Logged so far today (kcal)
    pub today_total: f64,
    /// Logged days in the trailing window
    pub days_logged: usize,
}

/// Maintenance estimate with its diagnostics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceSummary {
    /// Estimated maintenance (kcal/day)
    pub maintenance: f64,
    pub calorie_confidence: f64,
    pub weight_confidence: f64,
    pub is_weight_valid: bool,
    /// Regression slope before clamping (kg/week)
    pub raw_weight_slope: f64,
    /// Regression slope after clamping (kg/week)
    pub weight_slope: f64,
    /// kcal per kg of mass change
    pub energy_density: f64,
    pub blended_intake: f64,
    pub blended_slope: f64,
    /// Intake fallback used in blending (kcal/day)
    pub fallback_maintenance: f64,
    pub fallback_source: FallbackSource,
}

/// Weekly calorie budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetSummary {
    /// Maintenance plus user adjustment (kcal/day)
    pub base_budget: f64,
    /// Banked (positive) or owed (negative) kcal this cycle
    pub credit: f64,
    /// Credit spread over the remaining days, capped
    pub daily_adjustment: f64,
    /// Today's adjusted budget (kcal)
    pub budget: f64,
    /// Budget minus today's intake (kcal)
    pub remaining: f64,
    pub days_logged: usize,
    pub logged_intake: f64,
    pub days_remaining: i64,
    pub cycle_start: NaiveDate,
}

/// Per-macro daily budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroSummary {
    pub kind: MacroKind,
    /// Share of calories set by the user (0-100)
    pub percent: Option<f64>,
    /// Gram target
    pub budget: Option<f64>,
    /// Grams left today
    pub remaining: Option<f64>,
    /// Grams logged today
    pub today_total: f64,
}

/// Snapshot producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Complete output of one refresh cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergySnapshot {
    pub snapshot_version: String,
    pub producer: SnapshotProducer,
    pub reference_date: NaiveDate,
    pub computed_at_utc: DateTime<Utc>,
    pub intake: IntakeSummary,
    pub maintenance: MaintenanceSummary,
    pub budget: BudgetSummary,
    pub macros: Vec<MacroSummary>,
}

impl EnergySnapshot {
    /// Look up a macro summary by kind
    pub fn macro_summary(&self, kind: MacroKind) -> Option<&MacroSummary> {
        self.macros.iter().find(|m| m.kind == kind)
    }

    /// Load a snapshot from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize the snapshot to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
