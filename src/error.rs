//! Error type shared by the whole crate

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to read table: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown character: {0}")]
    UnknownCharacter(String),
    #[error("unknown baseline set: {0} (expected nih or meal-target)")]
    UnknownBaselines(String),
    #[error("no meal named '{0}' in this table")]
    UnknownMeal(String),
    #[error("meal '{0}' has no usable timestamp")]
    MissingTimestamp(String),
    #[error("could not parse timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("could not parse clock time: {0}")]
    InvalidClockTime(String),
    #[error("invalid time range: {start} is after {end}")]
    InvalidTimeRange { start: String, end: String },
    #[error("no glucose samples in the selected window")]
    EmptyWindow,
    #[error("cannot {action} while {stage}")]
    InvalidTransition {
        stage: crate::pipeline::Stage,
        action: &'static str,
    },
    #[error("table load failed: {0}")]
    LoadFailed(String),
    #[error("bad request: {0}")]
    BadRequest(String),
}

pub type Result<T> = std::result::Result<T, Error>;
