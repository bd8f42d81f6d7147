//! Error types for the resource registry.
//!
//! This module defines all error types used throughout the caserne crate.
//! Note that an absent session is only an error for operations that require
//! one (writes); list views treat it as an empty state and never see
//! [`Error::NoSession`].

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for registry operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Store Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// No record with the given identity exists in the table.
    #[error("no {table} record with id {id}")]
    RecordNotFound {
        /// Table that was queried.
        table: &'static str,
        /// Identity that was looked up.
        id: String,
    },

    /// A partial update carried no fields.
    #[error("partial update for {table} record {id} carries no fields")]
    EmptyPatch {
        /// Table that would have been written.
        table: &'static str,
        /// Identity that would have been updated.
        id: String,
    },

    // === Auth Errors ===
    /// The operation requires an authenticated session.
    #[error("no active session")]
    NoSession,

    /// Sign-in was rejected.
    #[error("invalid credentials for {email}")]
    InvalidCredentials {
        /// Email the sign-in was attempted with.
        email: String,
    },

    /// An account with this email already exists.
    #[error("an account already exists for {email}")]
    AccountExists {
        /// Email the sign-up was attempted with.
        email: String,
    },

    /// Sign-up input was rejected.
    #[error("invalid sign-up: {message}")]
    InvalidSignUp {
        /// Description of the rejection.
        message: String,
    },

    // === Card Errors ===
    /// A card operation was issued in the wrong state.
    #[error("card for record {id} is not in {expected} state")]
    InvalidCardState {
        /// Identity of the card's record.
        id: String,
        /// The state the operation requires.
        expected: &'static str,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for registry operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a record-not-found error.
    #[must_use]
    pub fn not_found(table: &'static str, id: impl Into<String>) -> Self {
        Self::RecordNotFound {
            table,
            id: id.into(),
        }
    }

    /// Create an empty-patch error.
    #[must_use]
    pub fn empty_patch(table: &'static str, id: impl Into<String>) -> Self {
        Self::EmptyPatch {
            table,
            id: id.into(),
        }
    }

    /// Check if this error means the caller is not authenticated.
    #[must_use]
    pub fn is_no_session(&self) -> bool {
        matches!(self, Self::NoSession)
    }

    /// Check if this error is a missing-record lookup.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RecordNotFound { .. })
    }
}
