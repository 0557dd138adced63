//! Error types for the import pipeline.
//!
//! [`ImportError`] is fatal and aborts the run. [`RowError`] and
//! [`crate::row::MalformedRow`] describe a single row that was set aside;
//! they are logged and counted, never propagated out of the batch.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, ImportError>;

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// Missing or invalid configuration.
    #[error("Configuration error in {path}: {message}")]
    Config { path: PathBuf, message: String },

    /// The CSV source could not be retrieved.
    #[error("Failed to fetch {source_url}: {message}")]
    Fetch { source_url: String, message: String },

    /// The header record lacks one or more required columns.
    #[error("Unexpected header format, missing column(s): {}", missing.join(", "))]
    Header { missing: Vec<String> },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A uniqueness constraint fired where none was expected.
    #[error("Unexpected constraint violation: {0}")]
    Constraint(String),
}

/// Why a valid row did not make it into storage. Rows that fail
/// validation are described by [`crate::row::MalformedRow`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowError {
    #[error("duplicate UNIQUE_ID '{unique_id}' (first seen on line {first_line})")]
    Duplicate { unique_id: String, first_line: u64 },

    #[error("constraint violation: {constraint}")]
    ConstraintViolation { constraint: String },
}

/// Failure reported by a [`crate::store::CatalogStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("constraint '{constraint}' violated")]
    ConstraintViolation { constraint: String },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<StoreError> for ImportError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(e) => ImportError::Database(e),
            StoreError::ConstraintViolation { constraint } => ImportError::Constraint(constraint),
        }
    }
}
