use core_catalog::{CatalogError, ValidationErrors};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Core initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] core_runtime::Error),
}

impl CoreError {
    /// Conflicts and timeouts: the caller may re-fetch and try again.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Catalog(e) => e.is_recoverable(),
            _ => false,
        }
    }

    /// HTTP status an outer transport layer would report for this outcome.
    pub fn status_hint(&self) -> u16 {
        match self {
            Self::Catalog(CatalogError::Validation(_)) => 422,
            Self::Catalog(CatalogError::NotFound { .. }) => 404,
            Self::Catalog(CatalogError::EditConflict { .. }) => 409,
            Self::Catalog(CatalogError::Timeout { .. }) => 504,
            _ => 500,
        }
    }

    /// Field violations, when this is a validation failure.
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Catalog(CatalogError::Validation(errors)) => Some(errors),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for CoreError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Catalog(CatalogError::Validation(errors))
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
