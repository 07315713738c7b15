// Error types for the review library
//
// Binaries wrap these in anyhow; library callers can match on the variant.

use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReviewError {
    /// Rating text outside hard/medium/easy. Rejected before `rate` is reached.
    #[error("invalid rating '{0}' (expected hard, medium or easy)")]
    InvalidRating(String),

    #[error("flashcard not found: {0}")]
    CardNotFound(String),

    #[error("no review session in progress")]
    SessionNotActive,

    /// The next review would fall past the last representable date
    #[error("review date out of range: {0}")]
    DateOutOfRange(NaiveDate),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, ReviewError>;
