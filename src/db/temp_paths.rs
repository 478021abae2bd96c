//! Temp-resource registry rows consumed by the sweeper.

use crate::error::DatabaseError;
use crate::types::UserId;
use crate::{Error, Result};
use std::path::Path;

use super::{Database, TempPath};

impl Database {
    /// Register a temp resource with an absolute expiry timestamp.
    ///
    /// Returns the row id. Registration happens before the first byte is
    /// written to the path, so a crash can never orphan the resource.
    pub async fn register_temp_path(
        &self,
        user_id: UserId,
        path: &Path,
        expires_at: i64,
    ) -> Result<i64> {
        let now = chrono::Utc::now().timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO temp_paths (user_id, path, expires_at, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(path.to_string_lossy().into_owned())
        .bind(expires_at)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to register temp path: {}",
                e
            )))
        })?;

        Ok(result.last_insert_rowid())
    }

    /// All registered resources whose expiry is at or before `now`
    pub async fn expired_temp_paths(&self, now: i64) -> Result<Vec<TempPath>> {
        let rows = sqlx::query_as::<_, TempPath>(
            r#"
            SELECT id, user_id, path, expires_at, created_at
            FROM temp_paths
            WHERE expires_at <= ?
            ORDER BY expires_at ASC
            "#,
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to query expired temp paths: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// Every registered resource regardless of expiry
    pub async fn all_temp_paths(&self) -> Result<Vec<TempPath>> {
        let rows = sqlx::query_as::<_, TempPath>(
            r#"
            SELECT id, user_id, path, expires_at, created_at
            FROM temp_paths
            ORDER BY id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list temp paths: {}",
                e
            )))
        })?;

        Ok(rows)
    }

    /// Delete registry rows by id after their paths have been removed
    pub async fn delete_temp_paths(&self, ids: &[i64]) -> Result<()> {
        for id in ids {
            sqlx::query("DELETE FROM temp_paths WHERE id = ?")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    Error::Database(DatabaseError::QueryFailed(format!(
                        "Failed to delete temp path row: {}",
                        e
                    )))
                })?;
        }

        Ok(())
    }
}
