//! Error types for vellum operations.
//!
//! Three families matter to callers: an entity that is not there, a table
//! backend that failed, and a request that breaks the store's contract.
//! Each variant carries a structured [`ErrorCode`] for programmatic handling.

use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for vellum operations.
pub type VellumResult<T> = Result<T, VellumError>;

/// Main error type for all vellum operations.
#[derive(Error, Debug)]
pub enum VellumError {
    /// Entity absent at the expected key (raised by update/delete).
    #[error("Entity not found: {message}")]
    NotFound {
        message: String,
        code: ErrorCode,
        entity_key: Option<String>,
    },

    /// Caller-contract violation.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        details: HashMap<String, String>,
        suggestion: Option<String>,
    },

    /// A uniqueness check performed by a service failed.
    #[error("Conflict: {message}")]
    Conflict { message: String, code: ErrorCode },

    /// Table backend operation failed.
    #[error("Storage error: {message}")]
    Storage {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Backend not compiled in or not known.
    #[error("Table backend not supported: {backend}")]
    UnsupportedBackend { backend: String },

    /// Stored data could not be interpreted.
    #[error("Parse error: {message}")]
    Parse { message: String, code: ErrorCode },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Entity (ENT_xxx)
    EntNotFound,
    EntDuplicate,

    // Validation (VAL_xxx)
    ValInvalidInput,
    ValReservedField,
    ValInvalidVersion,
    ValInvalidTransition,
    ValInvalidPageToken,

    // Storage (STO_xxx)
    StoConnectionFailed,
    StoOperationFailed,
    StoPartialDelete,

    // Parse (PARSE_xxx)
    ParseInvalidJson,
    ParseInvalidRecord,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::EntNotFound => "ENT_001",
            ErrorCode::EntDuplicate => "ENT_002",
            ErrorCode::ValInvalidInput => "VAL_001",
            ErrorCode::ValReservedField => "VAL_002",
            ErrorCode::ValInvalidVersion => "VAL_003",
            ErrorCode::ValInvalidTransition => "VAL_004",
            ErrorCode::ValInvalidPageToken => "VAL_005",
            ErrorCode::StoConnectionFailed => "STO_001",
            ErrorCode::StoOperationFailed => "STO_002",
            ErrorCode::StoPartialDelete => "STO_003",
            ErrorCode::ParseInvalidJson => "PARSE_001",
            ErrorCode::ParseInvalidRecord => "PARSE_002",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl VellumError {
    /// Create a not found error for an entity key such as `USER#abc`.
    pub fn not_found(entity_key: impl Into<String>) -> Self {
        let key = entity_key.into();
        Self::NotFound {
            message: format!("Entity '{}' not found", key),
            code: ErrorCode::EntNotFound,
            entity_key: Some(key),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
            suggestion: None,
        }
    }

    /// Create a validation error with a specific code.
    pub fn validation_with_code(message: impl Into<String>, code: ErrorCode) -> Self {
        Self::Validation {
            message: message.into(),
            code,
            details: HashMap::new(),
            suggestion: None,
        }
    }

    /// Create a validation error with suggestion.
    pub fn validation_with_suggestion(
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            details: HashMap::new(),
            suggestion: Some(suggestion.into()),
        }
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
            code: ErrorCode::EntDuplicate,
        }
    }

    /// Create a storage error without a source.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            code: ErrorCode::StoOperationFailed,
            source: None,
        }
    }

    /// Create a storage error wrapping the backend's own error.
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            code: ErrorCode::StoOperationFailed,
            source: Some(Box::new(source)),
        }
    }

    /// Some versions of an entity were deleted and some were not.
    pub fn partial_delete(message: impl Into<String>, source: VellumError) -> Self {
        Self::Storage {
            message: message.into(),
            code: ErrorCode::StoPartialDelete,
            source: Some(Box::new(source)),
        }
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            code: ErrorCode::StoConnectionFailed,
            source: None,
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: ErrorCode::ParseInvalidRecord,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { code, .. } => *code,
            Self::Validation { code, .. } => *code,
            Self::Conflict { code, .. } => *code,
            Self::Storage { code, .. } => *code,
            Self::Parse { code, .. } => *code,
            Self::Serialization(_) => ErrorCode::ParseInvalidJson,
            _ => ErrorCode::Internal,
        }
    }

    /// Whether this is the not-found family.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::NotFound { .. } => Some("Please check the entity kind and id"),
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            Self::Storage { .. } => Some("Please check your table backend settings"),
            Self::UnsupportedBackend { .. } => {
                Some("Enable the matching cargo feature on vellum-tables")
            }
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for VellumError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage {
            message: err.to_string(),
            code: ErrorCode::StoOperationFailed,
            source: Some(Box::new(err)),
        }
    }
}
