//! Error types for Synheart Energy

use thiserror::Error;

/// Errors that can occur during computation
///
/// The analytics engines themselves are total; these errors only surface while
/// parsing input, validating configuration, or encoding snapshots.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse health records: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Invalid smoothing alpha {0}: must be in (0, 1)")]
    InvalidSmoothingAlpha(f64),

    #[error("Invalid confidence window: window_days={window_days}, min_data_points={min_data_points}")]
    InvalidWindow {
        window_days: i64,
        min_data_points: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),
}
