//! Error types for the tracker domain layer.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`ValidationError`] - Bad pagination input (arguments, cursors)
//! - [`FetchError`] - Internal query-execution failures at the source seam
//! - [`ConnectionError`] - What paginators and loaders surface to callers
//! - [`StorageError`] - Database/repository errors on the CRUD paths
//!
//! Validation errors are user-input problems: they are detected before any
//! query executes, logged as warnings, and surfaced verbatim. Fetch errors
//! are caught at the loader/paginator boundary, logged with their root cause,
//! and re-raised as the generic [`ConnectionError::Unavailable`] message that
//! never leaks the cause.

use thiserror::Error;

/// Maximum number of records a single connection page may request.
pub const MAX_PAGE_SIZE: u32 = 100;

// =============================================================================
// Argument Identification
// =============================================================================

/// Which of the two limit arguments a pagination error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgSet {
    First,
    Last,
}

impl std::fmt::Display for ArgSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArgSet::First => write!(f, "first"),
            ArgSet::Last => write!(f, "last"),
        }
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Pagination-input violations, detected before any query executes.
///
/// Each variant carries the display name of the connection it was raised on
/// so the surfaced message names the specific connection type. The message
/// templates here are the built-in English locale; localization happens in
/// an outer layer that keys off the variant and its parameters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// Both `first` and `last` were supplied.
    #[error(
        "Requesting both `first` and `last` to paginate the `{connection}` connection is not supported."
    )]
    BothLimitsSupplied { connection: String },

    /// Neither `first` nor `last` was supplied.
    #[error(
        "You must provide a `first` or `last` value to properly paginate the `{connection}` connection."
    )]
    NoLimitSupplied { connection: String },

    /// The supplied limit is not an integer number.
    #[error("`{arg}` on the `{connection}` connection must be a number, not `{type_name}`.")]
    LimitNotANumber {
        connection: String,
        arg: ArgSet,
        type_name: &'static str,
    },

    /// The supplied limit is negative.
    #[error("`{arg}` on the `{connection}` connection cannot be less than zero.")]
    LimitBelowZero { connection: String, arg: ArgSet },

    /// The supplied limit exceeds the maximum page size.
    #[error(
        "Requesting `{requested}` records on the `{connection}` connection exceeds the `{arg}` limit of `{max}` records."
    )]
    LimitAboveMaximum {
        connection: String,
        arg: ArgSet,
        requested: String,
        max: u32,
    },

    /// A supplied cursor is not validly encoded.
    #[error("The supplied cursor for the `{connection}` connection is not valid.")]
    MalformedCursor { connection: String },

    /// A supplied cursor belongs to a different connection type.
    #[error("A cursor of type `{found}` was supplied to the `{connection}` connection.")]
    CursorTypeMismatch { connection: String, found: String },
}

// =============================================================================
// Fetch Errors (internal seam)
// =============================================================================

/// Failure modes of the injected query-execution dependency.
///
/// The core treats the data source as opaque and only distinguishes a query
/// that was rejected outright from one whose result stream failed while
/// being consumed. Neither is ever surfaced to callers; see
/// [`ConnectionError::Unavailable`].
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The backing query was rejected before producing any rows.
    #[error("query rejected: {0}")]
    Query(String),

    /// The query succeeded but its result cursor failed during consumption.
    #[error("result cursor failed: {0}")]
    Cursor(String),
}

impl FetchError {
    /// Short kind tag for structured diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Query(_) => "query",
            FetchError::Cursor(_) => "cursor",
        }
    }
}

// =============================================================================
// Connection Errors (surfaced)
// =============================================================================

/// Errors returned by paginators and batch loaders.
#[derive(Debug, Clone, Error)]
pub enum ConnectionError {
    /// The caller supplied invalid pagination input.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The data source failed; the root cause was logged, not returned.
    #[error("Unable to load {subject}. Please try again.")]
    Unavailable { subject: String },
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Database and repository errors on the CRUD paths.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to establish database connection.
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    /// SQL query execution failed.
    #[error("Query execution error: {0}")]
    QueryError(String),

    /// Transaction commit/rollback failed.
    #[error("Transaction error: {0}")]
    TransactionError(String),

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

/// Result type for connection/loader operations.
pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// Result type for the query-execution seam.
pub type FetchResult<T> = Result<T, FetchError>;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arg_set_display() {
        assert_eq!(ArgSet::First.to_string(), "first");
        assert_eq!(ArgSet::Last.to_string(), "last");
    }

    // Test critique: les messages nomment la connexion concernée
    #[test]
    fn test_validation_messages_name_the_connection() {
        let err = ValidationError::LimitBelowZero {
            connection: "VerifiedDomain".into(),
            arg: ArgSet::First,
        };
        assert_eq!(
            err.to_string(),
            "`first` on the `VerifiedDomain` connection cannot be less than zero."
        );

        let err = ValidationError::LimitAboveMaximum {
            connection: "Domain".into(),
            arg: ArgSet::Last,
            requested: "1000".into(),
            max: MAX_PAGE_SIZE,
        };
        let msg = err.to_string();
        assert!(msg.contains("`1000`") && msg.contains("`100`") && msg.contains("`last`"));
    }

    #[test]
    fn test_unavailable_never_leaks_the_cause() {
        let cause = FetchError::Query("connection refused to 10.0.0.3:5432".into());
        let surfaced = ConnectionError::Unavailable {
            subject: "domains".into(),
        };
        assert_eq!(cause.kind(), "query");
        assert_eq!(
            surfaced.to_string(),
            "Unable to load domains. Please try again."
        );
        assert!(!surfaced.to_string().contains("10.0.0.3"));
    }
}
