//! Error types for the scheduler and review store

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Rejected input. Raised before any computation or write takes place.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("quality must be between 0 and 5, got {0}")]
    QualityOutOfRange(i64),

    #[error("repetitions must not be negative, got {0}")]
    NegativeRepetitions(i64),

    #[error("interval days must not be negative, got {0}")]
    NegativeInterval(i64),

    #[error("ease factor must be a finite number >= 1.3, got {0}")]
    InvalidEaseFactor(f64),

    #[error("next review date out of range for an interval of {0} days")]
    IntervalOverflow(i64),

    #[error("repetition count {0} cannot be incremented")]
    RepetitionOverflow(i64),

    #[error("next review {next} must be after last review {last}")]
    ReviewOrder {
        last: chrono::DateTime<chrono::Utc>,
        next: chrono::DateTime<chrono::Utc>,
    },

    #[error("record for student '{found}' in an export for '{expected}'")]
    StudentMismatch { expected: String, found: String },

    #[error("malformed request: {0}")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database connection lock poisoned")]
    LockPoisoned,

    /// No review record for the requested student/concept pair
    #[error("Not found: {0}")]
    NotFound(String),
}
