use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{field} is required")]
    Validation { field: &'static str },

    #[error("No application at index {index} (table has {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Failed to access {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed CSV in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Row {row}: {message}")]
    Format { row: usize, message: String },

    #[error("Unknown status '{0}' (expected one of: Applied, Assessment, Phone Screen, Interview, Offer, Rejected, Withdrawn)")]
    UnknownStatus(String),
}

impl StoreError {
    /// Errors the user can fix by re-entering input.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StoreError::Validation { .. }
                | StoreError::IndexOutOfRange { .. }
                | StoreError::UnknownStatus(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
