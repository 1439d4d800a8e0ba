//! # AppError
//!
//! Centralized error handling for the Bookshelf ecosystem.
//! Maps domain-specific failures to actionable error types. Adapters raise
//! [`PersistenceError`] or [`AuthError`]; services convert them into
//! [`AppError`], which the HTTP layer turns into a status code.

use thiserror::Error;

/// The primary error type for all service operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Missing, malformed or expired bearer credential.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// Authenticated, but the caller does not own the resource.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource not found (e.g., User, Book, Favourite)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Uniqueness violation (duplicate email, catalog id already saved)
    #[error("conflict: {0}")]
    Conflict(String),

    /// Payload shape failure; one message per offending field.
    #[error("validation error: {}", .0.join(", "))]
    ValidationFailed(Vec<String>),

    /// Infrastructure failure (e.g., DB down, transaction aborted)
    #[error("store failure: {0}")]
    StoreFailure(String),
}

impl AppError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound(entity.to_string(), id.to_string())
    }

    /// Stable snake_case classification used in response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "unauthenticated",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(..) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::ValidationFailed(_) => "validation_failed",
            Self::StoreFailure(_) => "store_failure",
        }
    }
}

/// A specialized Result type for Bookshelf logic.
pub type Result<T> = std::result::Result<T, AppError>;

/// Errors raised by storage adapters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// The store could not be reached.
    #[error("store connection failed: {0}")]
    Connection(String),

    /// A query or mutation failed during execution.
    #[error("store query failed: {0}")]
    Query(String),

    /// A unique constraint rejected the write.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    /// A record the write depends on is gone.
    #[error("{entity} {id} does not exist")]
    Missing { entity: &'static str, id: String },

    /// The transaction was rolled back before commit.
    #[error("transaction aborted: {0}")]
    Aborted(String),
}

impl From<PersistenceError> for AppError {
    fn from(err: PersistenceError) -> Self {
        match err {
            PersistenceError::UniqueViolation(what) => Self::Conflict(what),
            PersistenceError::Missing { entity, id } => Self::NotFound(entity.to_string(), id),
            other => Self::StoreFailure(other.to_string()),
        }
    }
}

/// Errors raised while issuing or verifying credentials.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("authorization header is missing")]
    MissingCredential,

    #[error("authorization header is not a bearer credential")]
    MalformedCredential,

    #[error("credential has expired")]
    Expired,

    #[error("credential rejected: {0}")]
    Invalid(String),

    #[error("could not issue credential: {0}")]
    Issue(String),

    #[error("password hashing failed: {0}")]
    Hash(String),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Issue(_) | AuthError::Hash(_) => Self::StoreFailure(err.to_string()),
            _ => Self::Unauthenticated("Authentication failed!".to_string()),
        }
    }
}
