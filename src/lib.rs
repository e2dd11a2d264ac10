//! Synheart Energy - On-device energy balance engine
//!
//! Energy turns logged food and body measurements into a maintenance (TDEE) estimate
//! and a flexible weekly calorie budget through a deterministic pipeline: daily
//! bucketing → intake smoothing → weight trend regression → confidence-blended
//! maintenance → weekly credit and macro budgets.
//!
//! ## Modules
//!
//! - **Analytics**: [`timeseries`], [`confidence`], [`intake`], [`energy_density`],
//!   [`maintenance`]
//! - **Budgets**: [`budget`], [`macro_budget`]
//! - **Integration**: [`records`] input schema, [`config`], [`pipeline`] and [`ffi`]

pub mod budget;
pub mod confidence;
pub mod config;
pub mod energy_density;
pub mod error;
pub mod intake;
pub mod macro_budget;
pub mod maintenance;
pub mod pipeline;
pub mod records;
pub mod timeseries;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use budget::BudgetEngine;
pub use confidence::ConfidenceWindow;
pub use config::EngineConfig;
pub use error::ComputeError;
pub use intake::IntakeAnalytics;
pub use macro_budget::{MacroBudgetEngine, MacroPercentages};
pub use maintenance::{FallbackSearch, MaintenanceEstimator};
pub use pipeline::{compute_snapshot, records_to_snapshot, EnergyProcessor};
pub use timeseries::DailySeries;
pub use types::EnergySnapshot;

// Schema exports
pub use records::{HealthKind, HealthRecords, HealthSample, SCHEMA_VERSION};

/// Library version embedded in every snapshot
pub const ENERGY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for snapshots
pub const PRODUCER_NAME: &str = "synheart-energy";
