//! Error types for the tracker domain layer.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`DomainError`] - Validation and business logic errors
//! - [`StorageError`] - Database/repository errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Domain Errors
// =============================================================================

/// Validation and domain rule violations.
///
/// These errors surface to the caller immediately, before any partial
/// execution - a malformed cursor or unknown order field never reaches
/// storage.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Request cursor could not be decoded to a row offset.
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),

    /// Client named a sort field the entity does not support.
    #[error("unsupported order field: {0}")]
    InvalidOrderField(String),

    /// Generic validation error.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Database and repository errors.
///
/// These errors originate from storage operations like queries,
/// transactions, and data serialization. They propagate unchanged -
/// this layer performs no retries and adds no interpretation.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to establish database connection.
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    /// SQL query execution failed.
    #[error("Query execution error: {0}")]
    QueryError(String),

    /// Requested record was not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Database migration failed.
    #[error("Migration error: {0}")]
    MigrationError(String),

    /// Data serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    // Test critique: la chaîne de conversion d'erreurs fonctionne
    // Permet d'utiliser ? à travers les couches
    #[test]
    fn test_error_conversion_chain() {
        let storage_err = StorageError::QueryError("db failed".into());
        let domain_err: DomainError = storage_err.into();

        // Le message original est préservé
        assert!(domain_err.to_string().contains("db failed"));
    }

    // Les messages de validation sont déterministes (les clients matchent dessus)
    #[test]
    fn test_validation_messages_are_stable() {
        let err = DomainError::InvalidOrderField("severty".into());
        assert_eq!(err.to_string(), "unsupported order field: severty");

        let err = DomainError::InvalidCursor("abc".into());
        assert_eq!(err.to_string(), "invalid cursor: abc");
    }
}
