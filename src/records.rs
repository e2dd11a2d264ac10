//! energy.health_sample.v1 schema
//!
//! Health records arrive as a flat list of timestamped samples, each tagged with a
//! [`HealthKind`]. This module parses them (JSON array, `{"samples": [...]}` or NDJSON),
//! validates individual samples and buckets them into one value per calendar day.

use crate::error::ComputeError;
use crate::timeseries::{Aggregation, DailySeries};
use crate::types::MacroKind;
use chrono::{DateTime, FixedOffset, TimeZone};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Current input schema version
pub const SCHEMA_VERSION: &str = "energy.health_sample.v1";

/// Closed set of health record kinds consumed by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthKind {
    /// Dietary energy (kcal)
    DietaryEnergy,
    /// Body mass (kg)
    BodyMass,
    /// Body-fat fraction (0-1; values above 1 are read as percent)
    BodyFatPercentage,
    /// Protein (g)
    Protein,
    /// Carbohydrates (g)
    Carbohydrates,
    /// Fat (g)
    Fat,
}

impl HealthKind {
    pub const ALL: [HealthKind; 6] = [
        HealthKind::DietaryEnergy,
        HealthKind::BodyMass,
        HealthKind::BodyFatPercentage,
        HealthKind::Protein,
        HealthKind::Carbohydrates,
        HealthKind::Fat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthKind::DietaryEnergy => "dietary_energy",
            HealthKind::BodyMass => "body_mass",
            HealthKind::BodyFatPercentage => "body_fat_percentage",
            HealthKind::Protein => "protein",
            HealthKind::Carbohydrates => "carbohydrates",
            HealthKind::Fat => "fat",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            HealthKind::DietaryEnergy => "kcal",
            HealthKind::BodyMass => "kg",
            HealthKind::BodyFatPercentage => "fraction",
            HealthKind::Protein | HealthKind::Carbohydrates | HealthKind::Fat => "g",
        }
    }

    /// Cumulative kinds are summed per day, measurements are averaged
    pub fn aggregation(&self) -> Aggregation {
        match self {
            HealthKind::DietaryEnergy
            | HealthKind::Protein
            | HealthKind::Carbohydrates
            | HealthKind::Fat => Aggregation::Sum,
            HealthKind::BodyMass | HealthKind::BodyFatPercentage => Aggregation::Mean,
        }
    }

    pub fn macro_kind(&self) -> Option<MacroKind> {
        match self {
            HealthKind::Protein => Some(MacroKind::Protein),
            HealthKind::Carbohydrates => Some(MacroKind::Carbohydrates),
            HealthKind::Fat => Some(MacroKind::Fat),
            HealthKind::DietaryEnergy | HealthKind::BodyMass | HealthKind::BodyFatPercentage => {
                None
            }
        }
    }
}

impl From<MacroKind> for HealthKind {
    fn from(kind: MacroKind) -> Self {
        match kind {
            MacroKind::Protein => HealthKind::Protein,
            MacroKind::Carbohydrates => HealthKind::Carbohydrates,
            MacroKind::Fat => HealthKind::Fat,
        }
    }
}

/// A single timestamped health sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSample {
    pub kind: HealthKind,
    /// Sample time with its UTC offset
    pub timestamp: DateTime<FixedOffset>,
    pub value: f64,
    /// Originating app or device, informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl HealthSample {
    pub fn new(kind: HealthKind, timestamp: DateTime<FixedOffset>, value: f64) -> Self {
        Self {
            kind,
            timestamp,
            value,
            source: None,
        }
    }

    /// Validate the sample value for its kind
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.value.is_finite() {
            return Err(ValidationError::NonFiniteValue {
                kind: self.kind.as_str().to_string(),
            });
        }
        match self.kind {
            HealthKind::BodyMass if self.value <= 0.0 => Err(ValidationError::OutOfRange {
                kind: self.kind.as_str().to_string(),
                value: self.value,
                min: 0.0,
                max: f64::INFINITY,
            }),
            HealthKind::BodyFatPercentage if !(0.0..=100.0).contains(&self.value) => {
                Err(ValidationError::OutOfRange {
                    kind: self.kind.as_str().to_string(),
                    value: self.value,
                    min: 0.0,
                    max: 100.0,
                })
            }
            _ if self.value < 0.0 => Err(ValidationError::NegativeValue {
                kind: self.kind.as_str().to_string(),
                value: self.value,
            }),
            _ => Ok(()),
        }
    }

    /// Value in the unit the engine works with
    pub fn normalized_value(&self) -> f64 {
        match self.kind {
            HealthKind::BodyFatPercentage if self.value > 1.0 => self.value / 100.0,
            _ => self.value,
        }
    }
}

/// Validation errors for health samples
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationError {
    #[error("Non-finite value for {kind}")]
    NonFiniteValue { kind: String },

    #[error("Negative value {value} for {kind}")]
    NegativeValue { kind: String, value: f64 },

    #[error("Value {value} for {kind} outside [{min}, {max}]")]
    OutOfRange {
        kind: String,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// Result of sample validation
#[derive(Debug)]
pub struct ValidationResult {
    pub index: usize,
    pub kind: HealthKind,
    pub error: ValidationError,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordsDocument {
    Array(Vec<HealthSample>),
    Wrapped { samples: Vec<HealthSample> },
}

/// A batch of health samples fetched for one refresh
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthRecords {
    samples: Vec<HealthSample>,
}

impl HealthRecords {
    pub fn new(samples: Vec<HealthSample>) -> Self {
        Self { samples }
    }

    pub fn push(&mut self, sample: HealthSample) {
        self.samples.push(sample);
    }

    pub fn samples(&self) -> &[HealthSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Parse a JSON array of samples or a `{"samples": [...]}` document
    pub fn parse_json(json: &str) -> Result<Self, ComputeError> {
        let document: RecordsDocument = serde_json::from_str(json)?;
        let samples = match document {
            RecordsDocument::Array(samples) => samples,
            RecordsDocument::Wrapped { samples } => samples,
        };
        Ok(Self { samples })
    }

    /// Parse NDJSON (one sample per line)
    pub fn parse_ndjson(ndjson: &str) -> Result<Self, ComputeError> {
        let mut samples = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<HealthSample>(trimmed) {
                Ok(sample) => samples.push(sample),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(Self { samples })
    }

    /// Parse either document form, falling back to NDJSON
    pub fn parse(input: &str) -> Result<Self, ComputeError> {
        Self::parse_json(input).or_else(|_| Self::parse_ndjson(input))
    }

    /// Samples that fail validation
    pub fn validate_samples(&self) -> Vec<ValidationResult> {
        self.samples
            .iter()
            .enumerate()
            .filter_map(|(index, sample)| {
                sample.validate().err().map(|error| ValidationResult {
                    index,
                    kind: sample.kind,
                    error,
                })
            })
            .collect()
    }

    /// Bucket valid samples of `kind` into calendar days of `tz`
    pub fn daily_series<Tz: TimeZone>(&self, kind: HealthKind, tz: &Tz) -> DailySeries {
        let mut dropped = 0usize;
        let samples: Vec<(DateTime<FixedOffset>, f64)> = self
            .samples
            .iter()
            .filter(|s| s.kind == kind)
            .filter(|s| {
                let ok = s.validate().is_ok();
                if !ok {
                    dropped += 1;
                }
                ok
            })
            .map(|s| (s.timestamp, s.normalized_value()))
            .collect();

        if dropped > 0 {
            warn!(kind = kind.as_str(), dropped, "dropped invalid health samples");
        }

        DailySeries::from_samples(samples, tz, kind.aggregation())
    }
}
