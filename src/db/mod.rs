//! Database layer for botload
//!
//! Handles SQLite persistence for users and registered temp resources.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] — Database lifecycle, schema migrations
//! - [`users`] — Per-user accounting (daily counters, ban flag)
//! - [`temp_paths`] — Temp-resource registry rows for the sweeper

use sqlx::{sqlite::SqlitePool, FromRow};

mod migrations;
mod temp_paths;
mod users;

/// User record from database
#[derive(Debug, Clone, FromRow)]
pub struct User {
    /// Platform user id
    pub id: i64,
    /// Whether the user is banned (0/1)
    pub banned: i64,
    /// Tasks run during the current UTC calendar day
    pub tasks_today: i64,
    /// Lifetime task count
    pub total_tasks: i64,
    /// Lifetime processed size in megabytes
    pub total_size_mb: f64,
    /// UTC calendar day (`YYYY-MM-DD`) the daily counter belongs to
    pub active_day: String,
    /// Unix timestamp when the user row was first created
    pub created_at: i64,
}

/// Registered temp resource awaiting sweep
#[derive(Debug, Clone, FromRow)]
pub struct TempPath {
    /// Unique database ID
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    /// Absolute filesystem path of the resource
    pub path: String,
    /// Unix timestamp after which the resource may be deleted
    pub expires_at: i64,
    /// Unix timestamp when the resource was registered
    pub created_at: i64,
}

/// Database handle for botload
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Close the connection pool, flushing WAL state
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
