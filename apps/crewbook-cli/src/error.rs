//! # CLI Error Type
//!
//! One error type for every command.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  crewbook.toml ── toml::de::Error ──┐                                  │
//! │  snapshot.json ── serde_json / io ──┤                                  │
//! │  crewbook-core ── CoreError ────────┼──► CliError ──► main: eprintln!  │
//! │  crewbook-db ──── DbError ──────────┘                 exit code 1      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crewbook_core::{CoreError, ValidationError};
use crewbook_db::DbError;
use thiserror::Error;

/// Result type alias for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid configuration after loading.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to read or parse the config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// A command line value could not be interpreted.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // =========================================================================
    // Input / Output
    // =========================================================================
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // =========================================================================
    // Domain & Storage
    // =========================================================================
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<ValidationError> for CliError {
    fn from(err: ValidationError) -> Self {
        CliError::Core(CoreError::Validation(err))
    }
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        CliError::ConfigLoadFailed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_wraps_core() {
        let err: CliError = ValidationError::Required {
            field: "orgId".to_string(),
        }
        .into();
        assert!(matches!(err, CliError::Core(CoreError::Validation(_))));
        assert_eq!(err.to_string(), "Validation error: orgId is required");
    }

    #[test]
    fn test_toml_error_is_config_failure() {
        let err: CliError = toml::from_str::<toml::Value>("[org").unwrap_err().into();
        assert!(matches!(err, CliError::ConfigLoadFailed(_)));
    }
}
