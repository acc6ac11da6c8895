//! # Error Types
//!
//! Structured error types for mix_core. Every failure is local to a single
//! user action: nothing here is fatal to the process, and the caller decides
//! whether to show, log, or retry.
//!
//! ## Example
//!
//! ```rust
//! use mix_core::errors::{CalcError, CalcResult};
//!
//! fn validate_quantity(quantity_kg: f64) -> CalcResult<()> {
//!     if quantity_kg <= 0.0 {
//!         return Err(CalcError::invalid_input(
//!             "target_quantity_kg",
//!             quantity_kg.to_string(),
//!             "Quantity must be positive",
//!         ));
//!     }
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for mix_core operations
pub type CalcResult<T> = Result<T, CalcError>;

/// Structured error type for calculation and persistence operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum CalcError {
    /// An input value is invalid (negative weight, blank name, etc.)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// A required field is missing
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// No authenticated user was supplied for an operation that records one
    #[error("No authenticated user for '{operation}'")]
    Unauthenticated { operation: String },

    /// Config, formula, or raw material not found
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    /// Calculation is undefined for the given inputs (e.g. zero base quantity)
    #[error("Calculation failed: {calculation_type} - {reason}")]
    CalculationFailed {
        calculation_type: String,
        reason: String,
    },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// JSON/TOML serialization or deserialization error
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Schema version mismatch on an exported config file
    #[error("Version mismatch: file version {file_version}, expected {expected_version}")]
    VersionMismatch {
        file_version: String,
        expected_version: String,
    },

    /// The persistence service could not be reached or answered non-2xx
    #[error("Transport error during {operation}: {reason}")]
    Transport {
        operation: String,
        status: Option<u16>,
        reason: String,
    },

    /// Generic internal error (should be rare)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CalcError {
    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a MissingField error
    pub fn missing_field(field: impl Into<String>) -> Self {
        CalcError::MissingField {
            field: field.into(),
        }
    }

    /// Create an Unauthenticated error
    pub fn unauthenticated(operation: impl Into<String>) -> Self {
        CalcError::Unauthenticated {
            operation: operation.into(),
        }
    }

    /// Create a NotFound error
    pub fn not_found(kind: impl Into<String>, id: impl ToString) -> Self {
        CalcError::NotFound {
            kind: kind.into(),
            id: id.to_string(),
        }
    }

    /// Create a CalculationFailed error
    pub fn calculation_failed(calculation_type: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::CalculationFailed {
            calculation_type: calculation_type.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a SerializationError
    pub fn serialization(reason: impl Into<String>) -> Self {
        CalcError::SerializationError {
            reason: reason.into(),
        }
    }

    /// Create a Transport error
    pub fn transport(operation: impl Into<String>, status: Option<u16>, reason: impl Into<String>) -> Self {
        CalcError::Transport {
            operation: operation.into(),
            status,
            reason: reason.into(),
        }
    }

    /// Check if the user can simply retry the action
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CalcError::Transport { .. } | CalcError::FileError { .. })
    }

    /// Check if this error was raised before any network call was made
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CalcError::InvalidInput { .. } | CalcError::MissingField { .. } | CalcError::Unauthenticated { .. }
        )
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            CalcError::InvalidInput { .. } => "INVALID_INPUT",
            CalcError::MissingField { .. } => "MISSING_FIELD",
            CalcError::Unauthenticated { .. } => "UNAUTHENTICATED",
            CalcError::NotFound { .. } => "NOT_FOUND",
            CalcError::CalculationFailed { .. } => "CALCULATION_FAILED",
            CalcError::FileError { .. } => "FILE_ERROR",
            CalcError::SerializationError { .. } => "SERIALIZATION_ERROR",
            CalcError::VersionMismatch { .. } => "VERSION_MISMATCH",
            CalcError::Transport { .. } => "TRANSPORT_ERROR",
            CalcError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

impl From<serde_json::Error> for CalcError {
    fn from(e: serde_json::Error) -> Self {
        CalcError::serialization(e.to_string())
    }
}
