//! Temp-resource registry and TTL sweeper.
//!
//! Every path a task writes is registered with an expiry before the first
//! byte lands on disk. The [`Sweeper`] walks expired registrations on an
//! interval and removes both the path and its registry row, so crashed or
//! abandoned tasks can never leak disk space past one TTL window.

use crate::db::Database;
use crate::error::{Error, Result};
use crate::types::UserId;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Outcome of one sweep pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Registrations whose paths were removed (or already gone)
    pub removed: u64,
    /// Registrations whose paths could not be removed; retried next pass
    pub failed: u64,
}

/// Registry of temp resources backed by the persistent store
pub struct ResourceRegistry {
    db: Arc<Database>,
    temp_root: PathBuf,
    default_ttl: Duration,
}

impl ResourceRegistry {
    /// Create a registry rooted at `temp_root` with the given default TTL
    pub fn new(db: Arc<Database>, temp_root: PathBuf, default_ttl: Duration) -> Self {
        Self {
            db,
            temp_root,
            default_ttl,
        }
    }

    /// Register an existing path with the default TTL
    pub async fn register(&self, user: UserId, path: &Path) -> Result<i64> {
        let expires_at = chrono::Utc::now().timestamp() + self.default_ttl.as_secs() as i64;
        let id = self.db.register_temp_path(user, path, expires_at).await?;
        debug!(user_id = user, ?path, expires_at, "temp resource registered");
        Ok(id)
    }

    /// Create and register a fresh scratch directory for a task.
    ///
    /// The directory is registered before anything is written into it. Layout
    /// is `<temp_root>/<user>/<unique>` so one user's scratch trees never
    /// collide with another's.
    pub async fn create_scratch(&self, user: UserId) -> Result<PathBuf> {
        let unique = format!("{:016x}", rand::random::<u64>());
        let dir = self.temp_root.join(user.to_string()).join(unique);

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| Error::Resource(format!("failed to create scratch dir: {}", e)))?;
        self.register(user, &dir).await?;

        Ok(dir)
    }

    /// Remove every registration expired at `now` (unix seconds).
    ///
    /// A missing path counts as removed; a path that fails to delete keeps
    /// its row so the next pass retries it.
    pub async fn sweep(&self, now: i64) -> Result<SweepReport> {
        let expired = self.db.expired_temp_paths(now).await?;
        self.remove_batch(expired).await
    }

    /// Remove every registered resource regardless of expiry
    pub async fn sweep_all(&self) -> Result<SweepReport> {
        let all = self.db.all_temp_paths().await?;
        self.remove_batch(all).await
    }

    async fn remove_batch(&self, rows: Vec<crate::db::TempPath>) -> Result<SweepReport> {
        let mut report = SweepReport::default();
        let mut cleaned = Vec::new();

        for row in rows {
            match remove_path(Path::new(&row.path)).await {
                Ok(()) => {
                    debug!(user_id = row.user_id, path = %row.path, "temp resource removed");
                    cleaned.push(row.id);
                    report.removed += 1;
                }
                Err(e) => {
                    warn!(user_id = row.user_id, path = %row.path, error = %e,
                        "failed to remove temp resource, will retry");
                    report.failed += 1;
                }
            }
        }

        if !cleaned.is_empty() {
            self.db.delete_temp_paths(&cleaned).await?;
        }

        Ok(report)
    }
}

/// Remove a file or directory tree; a missing path is success
async fn remove_path(path: &Path) -> std::io::Result<()> {
    let meta = match tokio::fs::symlink_metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    if meta.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    }
}

/// Background task that sweeps expired temp resources on an interval
pub struct Sweeper {
    registry: Arc<ResourceRegistry>,
    interval: Duration,
    shutdown: CancellationToken,
}

impl Sweeper {
    /// Create a sweeper over `registry` firing every `interval`
    pub fn new(registry: Arc<ResourceRegistry>, interval: Duration, shutdown: CancellationToken) -> Self {
        Self {
            registry,
            interval,
            shutdown,
        }
    }

    /// Run until the shutdown token fires.
    ///
    /// Sweep errors are logged and the loop continues; a transient database
    /// failure must not kill the cleanup task.
    pub async fn run(self) {
        info!(interval_secs = self.interval.as_secs(), "sweeper started");
        let mut ticker = tokio::time::interval(self.interval);
        // First tick fires immediately; skip it so startup isn't a sweep storm
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("sweeper shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    let now = chrono::Utc::now().timestamp();
                    match self.registry.sweep(now).await {
                        Ok(report) if report.removed > 0 || report.failed > 0 => {
                            info!(removed = report.removed, failed = report.failed, "sweep pass done");
                        }
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "sweep pass failed"),
                    }
                }
            }
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn registry(ttl: Duration) -> (ResourceRegistry, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = Arc::new(Database::new(&dir.path().join("test.db")).await.unwrap());
        let registry = ResourceRegistry::new(db, dir.path().join("temp"), ttl);
        (registry, dir)
    }

    #[tokio::test]
    async fn scratch_dirs_are_registered_and_swept_after_ttl() {
        let (registry, _dir) = registry(Duration::from_secs(60)).await;

        let scratch = registry.create_scratch(1).await.unwrap();
        assert!(scratch.exists());
        tokio::fs::write(scratch.join("payload.bin"), b"data")
            .await
            .unwrap();

        // Before expiry nothing is touched
        let now = chrono::Utc::now().timestamp();
        let report = registry.sweep(now).await.unwrap();
        assert_eq!(report, SweepReport::default());
        assert!(scratch.exists());

        // Past expiry the tree and its row are removed
        let report = registry.sweep(now + 120).await.unwrap();
        assert_eq!(report.removed, 1);
        assert!(!scratch.exists());

        // A second pass finds nothing
        let report = registry.sweep(now + 120).await.unwrap();
        assert_eq!(report.removed, 0);
    }

    #[tokio::test]
    async fn missing_path_counts_as_removed() {
        let (registry, _dir) = registry(Duration::from_secs(0)).await;

        let scratch = registry.create_scratch(2).await.unwrap();
        tokio::fs::remove_dir_all(&scratch).await.unwrap();

        let now = chrono::Utc::now().timestamp();
        let report = registry.sweep(now).await.unwrap();
        assert_eq!(report.removed, 1);
        assert_eq!(report.failed, 0);
    }

    #[tokio::test]
    async fn sweep_all_ignores_expiry() {
        let (registry, _dir) = registry(Duration::from_secs(3600)).await;

        let a = registry.create_scratch(3).await.unwrap();
        let b = registry.create_scratch(3).await.unwrap();

        let report = registry.sweep_all().await.unwrap();
        assert_eq!(report.removed, 2);
        assert!(!a.exists());
        assert!(!b.exists());
    }

    #[tokio::test]
    async fn scratch_dirs_are_per_user() {
        let (registry, _dir) = registry(Duration::from_secs(60)).await;

        let a = registry.create_scratch(10).await.unwrap();
        let b = registry.create_scratch(11).await.unwrap();
        assert_ne!(a.parent(), b.parent());
    }
}
