//! Error types for the core domain

use thiserror::Error;

/// Core error type for domain operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Invalid type property: {message}")]
    InvalidTypeProperty { message: String },

    #[error("Key conflict: {key}")]
    KeyConflict { key: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Not implemented: {feature}")]
    NotImplemented { feature: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

impl Error {
    /// Create a validation error with a formatted message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a type mismatch error for a value whose payload does not
    /// match the expected type tag
    pub fn type_mismatch<S1: Into<String>, S2: Into<String>>(expected: S1, actual: S2) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an invalid type property error
    pub fn invalid_type_property<S: Into<String>>(message: S) -> Self {
        Self::InvalidTypeProperty {
            message: message.into(),
        }
    }

    /// Create a key conflict error for a colliding field or model key
    pub fn key_conflict<S: Into<String>>(key: S) -> Self {
        Self::KeyConflict { key: key.into() }
    }

    /// Create a conflict error for a lost concurrent write race
    pub fn conflict<S: Into<String>>(message: S) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create a not found error for a specific entity type and ID
    pub fn not_found<S1: Into<String>, S2: Into<String>>(entity: S1, id: S2) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Create a not implemented error for a recognized but unsupported
    /// type/property combination
    pub fn not_implemented<S: Into<String>>(feature: S) -> Self {
        Self::NotImplemented {
            feature: feature.into(),
        }
    }

    /// Check if this error is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }

    /// Check if this error is a type mismatch
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Error::TypeMismatch { .. })
    }

    /// Check if this error is a key conflict
    pub fn is_key_conflict(&self) -> bool {
        matches!(self, Error::KeyConflict { .. })
    }

    /// Check if this error is a concurrent-write conflict
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }

    /// Check if this error is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Check if this error is a not implemented error
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Error::NotImplemented { .. })
    }

    /// Check if this error is recoverable (caller can retry with a fresh read)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }

    /// Get the error category for logging and metrics
    pub fn category(&self) -> &'static str {
        match self {
            Error::Validation { .. } => "validation",
            Error::TypeMismatch { .. } => "type_mismatch",
            Error::InvalidTypeProperty { .. } => "invalid_type_property",
            Error::KeyConflict { .. } => "key_conflict",
            Error::Conflict { .. } => "conflict",
            Error::NotFound { .. } => "not_found",
            Error::NotImplemented { .. } => "not_implemented",
            Error::Serialization(_) => "serialization",
            Error::Internal(_) => "internal",
        }
    }
}

/// Convenience result type for core operations
pub type Result<T> = std::result::Result<T, Error>;
