//! Error types for botload
//!
//! This module provides error handling for the library, including:
//! - Domain-specific error types (Input, Extract, Database)
//! - The busy / cancelled task-control signals
//! - Context information (archive path, URL, user id)

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for botload operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for botload
///
/// This is the primary error type used throughout the library. Each variant includes
/// contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid user input (bad archive, missing password, empty link set)
    #[error("input error: {0}")]
    Input(#[from] InputError),

    /// The user already holds their execution slot; no queueing is done
    #[error("user {0} already has a task running")]
    Busy(i64),

    /// Task cancelled by the user at a checkpoint
    #[error("task cancelled by user")]
    Cancelled,

    /// The user is banned from running tasks
    #[error("user {0} is banned")]
    Banned(i64),

    /// Archive extraction error (wrong password, corruption, etc.)
    #[error("extraction error: {0}")]
    Extract(#[from] ExtractError),

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Scratch storage could not be allocated (temp dir creation, disk full)
    #[error("resource error: {0}")]
    Resource(String),

    /// External tool execution failed (ffmpeg)
    ///
    /// The tool's diagnostic output is passed through unredacted.
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Operation not supported (missing binary, unhandled format)
    #[error("not supported: {0}")]
    NotSupported(String),

    /// A session task (delivery or stream selection) was not found or expired
    #[error("task not found: {0}")]
    TaskNotFound(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error is the distinguishable wrong/missing-password signal,
    /// used by callers to re-prompt instead of reporting corruption.
    #[must_use]
    pub fn is_password_error(&self) -> bool {
        matches!(
            self,
            Error::Extract(ExtractError::WrongPassword { .. })
                | Error::Extract(ExtractError::PasswordRequired { .. })
        )
    }
}

/// Errors caused by the user's input; surfaced directly, never retried
#[derive(Debug, Error)]
pub enum InputError {
    /// The supplied text contained no parseable URLs
    #[error("no links found in input")]
    NoLinks,

    /// The file is not an archive type the codec handles
    #[error("unsupported archive type: {path}")]
    UnsupportedArchive {
        /// The offending file path
        path: PathBuf,
    },

    /// A streaming manifest could not be parsed
    #[error("invalid manifest at {url}: {reason}")]
    BadManifest {
        /// The manifest URL
        url: String,
        /// Parser diagnostic
        reason: String,
    },

    /// Variant index outside the resolved variant list
    #[error("variant index {index} out of range ({available} available)")]
    BadVariantIndex {
        /// The requested index
        index: usize,
        /// Number of variants in the selection task
        available: usize,
    },

    /// The task belongs to a different user
    #[error("task {task_id} is not owned by user {user_id}")]
    NotTaskOwner {
        /// The session task id
        task_id: String,
        /// The requesting user
        user_id: i64,
    },
}

/// Archive extraction errors
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The archive is password protected and no password was supplied
    #[error("archive {archive} is password protected")]
    PasswordRequired {
        /// The archive path
        archive: PathBuf,
    },

    /// The supplied password did not decrypt the archive
    #[error("wrong password for archive {archive}")]
    WrongPassword {
        /// The archive path
        archive: PathBuf,
    },

    /// Any other decode failure; the codec diagnostic is passed through verbatim
    #[error("failed to extract {archive}: {reason}")]
    Failed {
        /// The archive path
        archive: PathBuf,
        /// Underlying codec diagnostic
        reason: String,
    },
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// Record not found
    #[error("record not found: {0}")]
    NotFound(String),
}
