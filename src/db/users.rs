//! Per-user accounting: daily counters, lifetime totals, ban flag.

use crate::error::DatabaseError;
use crate::types::UserId;
use crate::{Error, Result};

use super::{Database, User};

impl Database {
    /// Fetch a user row, creating it on first sight.
    ///
    /// The daily task counter is scoped to the UTC calendar day: when the
    /// stored `active_day` differs from today, the counter is reset before
    /// the row is returned.
    pub async fn get_or_create_user(&self, id: UserId) -> Result<User> {
        let today = chrono::Utc::now().format("%Y-%m-%d").to_string();
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO users (id, active_day, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(&today)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to create user: {}",
                e
            )))
        })?;

        // Roll the daily counter when the stored day is stale
        sqlx::query(
            r#"
            UPDATE users
            SET tasks_today = 0, active_day = ?
            WHERE id = ? AND active_day != ?
            "#,
        )
        .bind(&today)
        .bind(id)
        .bind(&today)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to reset daily counter: {}",
                e
            )))
        })?;

        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, banned, tasks_today, total_tasks, total_size_mb,
                   active_day, created_at
            FROM users
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get user: {}",
                e
            )))
        })?;

        Ok(user)
    }

    /// Whether the user is banned; unknown users are not banned
    pub async fn is_banned(&self, id: UserId) -> Result<bool> {
        let banned: Option<i64> = sqlx::query_scalar("SELECT banned FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to query ban flag: {}",
                    e
                )))
            })?;

        Ok(banned.unwrap_or(0) != 0)
    }

    /// Set or clear the ban flag; creates the user row if missing
    pub async fn set_banned(&self, id: UserId, banned: bool) -> Result<()> {
        self.get_or_create_user(id).await?;

        sqlx::query("UPDATE users SET banned = ? WHERE id = ?")
            .bind(i64::from(banned))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to set ban flag: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Record one completed task and the size it processed
    pub async fn record_task_stats(&self, id: UserId, size_mb: f64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET tasks_today = tasks_today + 1,
                total_tasks = total_tasks + 1,
                total_size_mb = total_size_mb + ?
            WHERE id = ?
            "#,
        )
        .bind(size_mb)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to record task stats: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Total and banned user counts
    pub async fn count_users(&self) -> Result<(i64, i64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to count users: {}",
                    e
                )))
            })?;

        let banned: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE banned != 0")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to count banned users: {}",
                    e
                )))
            })?;

        Ok((total, banned))
    }

    /// All known user ids, ascending
    pub async fn list_user_ids(&self) -> Result<Vec<UserId>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM users ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to list users: {}",
                    e
                )))
            })?;

        Ok(ids)
    }
}
