use crate::validation::ValidationErrors;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("Record not found: {entity_type} with id {id}")]
    NotFound { entity_type: &'static str, id: i64 },

    #[error("Edit conflict: {entity_type} {id} was modified or deleted since version {version}")]
    EditConflict {
        entity_type: &'static str,
        id: i64,
        version: i32,
    },

    #[error("Operation '{operation}' timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(String),
}

impl CatalogError {
    /// Whether the caller can reasonably retry after re-reading state.
    ///
    /// Conflicts and timeouts are recoverable; storage failures and
    /// validation errors are not.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::EditConflict { .. } | Self::Timeout { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_edit_conflict(&self) -> bool {
        matches!(self, Self::EditConflict { .. })
    }
}

pub type Result<T> = std::result::Result<T, CatalogError>;
