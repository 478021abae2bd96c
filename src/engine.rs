//! Task engine orchestration.
//!
//! [`TaskEngine`] is the embedding bot's single entry point. Every
//! long-running operation follows the same shape: acquire the user's
//! execution slot, check the ban flag, allocate and register scratch
//! storage, run the pipeline with cancellation checkpoints, record the
//! user's accounting, and hand back a session task the bot can deliver
//! from. The slot is released on every exit path by the guard's drop.

use crate::config::Config;
use crate::coordinator::{SlotGuard, TaskCoordinator};
use crate::db::Database;
use crate::download::{self, HttpFetcher};
use crate::error::{Error, InputError, Result};
use crate::extraction::{ArchiveCodec, NativeCodec};
use crate::links;
use crate::media::{FfmpegTool, MediaTool};
use crate::progress::ProgressSink;
use crate::registry::{ResourceRegistry, SweepReport, Sweeper};
use crate::sessions::{DeliveryTask, LinkBatch, SessionStore, StreamSelectionTask};
use crate::stream;
use crate::types::{BatchReport, ExtractionResult, LinkMap, TaskId, UserId};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Result of a completed extraction task
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    /// The delivery task stored for the bot, with the file listing
    pub delivery: DeliveryTask,
    /// Stats and listing from the extraction pipeline
    pub result: ExtractionResult,
    /// Links found inside the extracted tree, deduplicated per category
    pub links: LinkMap,
}

/// Result of a completed batch download task
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Per-item success and failure counters plus downloaded paths
    pub report: BatchReport,
    /// One selection task per streaming manifest that resolved
    pub stream_tasks: Vec<StreamSelectionTask>,
}

/// Central orchestrator owning the database, coordinator, registry,
/// session store and tool seams
pub struct TaskEngine {
    config: Config,
    db: Arc<Database>,
    coordinator: Arc<TaskCoordinator>,
    registry: Arc<ResourceRegistry>,
    sessions: SessionStore,
    fetcher: HttpFetcher,
    codec: Arc<dyn ArchiveCodec>,
    media: Option<Arc<dyn MediaTool>>,
    shutdown: CancellationToken,
}

impl TaskEngine {
    /// Create an engine with the native codec and an auto-discovered ffmpeg.
    ///
    /// A missing ffmpeg is not an error; stream materialization and audio
    /// demux fail with [`Error::NotSupported`] until one is available.
    pub async fn new(config: Config) -> Result<Self> {
        let media: Option<Arc<dyn MediaTool>> = match &config.tools.ffmpeg_path {
            Some(path) => Some(Arc::new(FfmpegTool::new(path.clone()))),
            None => FfmpegTool::from_path().map(|t| Arc::new(t) as Arc<dyn MediaTool>),
        };

        if media.is_none() {
            warn!("ffmpeg not found, stream materialization disabled");
        }

        Self::with_tools(config, Arc::new(NativeCodec), media).await
    }

    /// Create an engine with explicit codec and media tool implementations
    pub async fn with_tools(
        config: Config,
        codec: Arc<dyn ArchiveCodec>,
        media: Option<Arc<dyn MediaTool>>,
    ) -> Result<Self> {
        let db = Arc::new(Database::new(&config.storage.db_path).await?);
        let registry = Arc::new(ResourceRegistry::new(
            Arc::clone(&db),
            config.storage.temp_dir.clone(),
            std::time::Duration::from_secs(
                config.storage.default_ttl_minutes.max(0) as u64 * 60,
            ),
        ));

        Ok(Self {
            fetcher: HttpFetcher::new(config.http.request_timeout())?,
            config,
            db,
            coordinator: Arc::new(TaskCoordinator::new()),
            registry,
            sessions: SessionStore::new(),
            codec,
            media,
            shutdown: CancellationToken::new(),
        })
    }

    /// Spawn the background sweeper; returns its join handle
    pub fn spawn_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let sweeper = Sweeper::new(
            Arc::clone(&self.registry),
            self.config.sweeper.interval(),
            self.shutdown.child_token(),
        );
        tokio::spawn(sweeper.run())
    }

    /// Signal background tasks to stop
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Scan `text` for links and build a batch the bot can offer back.
    ///
    /// Fails with [`InputError::NoLinks`] when the text carries no URLs.
    /// The caller stores the batch under its chat message key via
    /// [`Self::sessions`].
    pub fn register_links(&self, user: UserId, text: &str) -> Result<LinkBatch> {
        let links = links::classify_links(text);
        if links.is_empty() {
            return Err(Error::Input(InputError::NoLinks));
        }

        let total: usize = links.values().map(Vec::len).sum();
        info!(user_id = user, links = total, "link batch registered");

        Ok(LinkBatch {
            raw_content: text.to_string(),
            links,
        })
    }

    /// Extract an archive into fresh scratch storage.
    ///
    /// Single-flight per user; encrypted archives without a password fail
    /// with the re-promptable password signal before anything is written.
    /// On success the delivery task is stored and the user's accounting is
    /// updated with the archive size.
    pub async fn run_extraction(
        &self,
        user: UserId,
        archive: &Path,
        password: Option<&str>,
    ) -> Result<ExtractionOutcome> {
        let guard = self.begin(user).await?;

        // Whole-task-fatal input problems abort before any resource exists
        if password.is_none() && self.codec.probe_encrypted(archive).await? {
            return Err(Error::Extract(crate::error::ExtractError::PasswordRequired {
                archive: archive.to_path_buf(),
            }));
        }

        let scratch = self.registry.create_scratch(user).await?;
        guard.checkpoint()?;

        let result =
            crate::extraction::run_extraction(self.codec.as_ref(), archive, &scratch, password)
                .await?;
        guard.checkpoint()?;

        let links = links::scan_links_in_tree(&result.base_dir);

        let archive_name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "archive".to_string());

        let delivery = DeliveryTask {
            id: TaskId::generate(),
            owner: user,
            base_dir: result.base_dir.clone(),
            files: result.files.clone(),
            archive_name,
        };
        self.sessions.put_delivery(delivery.clone());

        self.record_size(user, file_size_mb(archive).await).await;

        info!(
            user_id = user,
            task_id = %delivery.id,
            files = result.stats.total_files,
            "extraction task complete"
        );

        Ok(ExtractionOutcome {
            delivery,
            result,
            links,
        })
    }

    /// Download every fetchable link of a batch into fresh scratch storage.
    ///
    /// Streaming manifests are resolved into selection tasks instead of
    /// being fetched; a manifest that fails to resolve is logged and
    /// skipped without touching the ok/fail counters.
    pub async fn run_link_batch(
        &self,
        user: UserId,
        links: &LinkMap,
        sink: &dyn ProgressSink,
    ) -> Result<BatchOutcome> {
        let guard = self.begin(user).await?;

        let scratch = self.registry.create_scratch(user).await?;
        guard.checkpoint()?;

        let report = download::run_batch(
            &self.fetcher,
            links,
            &scratch,
            guard.cancel_token(),
            sink,
            self.config.progress.min_interval(),
        )
        .await?;
        guard.checkpoint()?;

        let mut stream_tasks = Vec::new();
        for manifest_url in &report.manifests {
            guard.checkpoint()?;
            match stream::resolve_variants(&self.fetcher, manifest_url).await {
                Ok(variants) => {
                    let task = StreamSelectionTask {
                        id: TaskId::generate(),
                        owner: user,
                        manifest_url: manifest_url.clone(),
                        variants,
                        temp_dir: scratch.clone(),
                        base_name: stream::base_name_for(manifest_url),
                    };
                    self.sessions.put_stream_task(task.clone());
                    stream_tasks.push(task);
                }
                Err(e) => {
                    warn!(url = %manifest_url, error = %e, "manifest resolution failed, skipping");
                }
            }
        }

        let mut size_mb = 0.0;
        for file in &report.files {
            size_mb += file_size_mb(file).await;
        }
        self.record_size(user, size_mb).await;

        info!(
            user_id = user,
            ok = report.ok,
            fail = report.fail,
            stream_tasks = stream_tasks.len(),
            "batch download task complete"
        );

        Ok(BatchOutcome {
            report,
            stream_tasks,
        })
    }

    /// Materialize one variant of a pending stream selection task.
    ///
    /// Ownership and index are validated before the task is consumed, so a
    /// bad tap leaves the prompt usable. The first valid call takes the
    /// task; repeats fail with [`Error::TaskNotFound`].
    pub async fn materialize_variant(
        &self,
        user: UserId,
        task_id: &TaskId,
        index: usize,
    ) -> Result<PathBuf> {
        let task = self
            .sessions
            .stream_task(task_id)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;

        if task.owner != user {
            return Err(Error::Input(InputError::NotTaskOwner {
                task_id: task_id.to_string(),
                user_id: user,
            }));
        }
        if index >= task.variants.len() {
            return Err(Error::Input(InputError::BadVariantIndex {
                index,
                available: task.variants.len(),
            }));
        }

        let media = self.require_media()?;
        let guard = self.begin(user).await?;

        // Consume only after validation passed and the slot is held
        let task = self
            .sessions
            .take_stream_task(task_id)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        let variant = &task.variants[index];

        let dest = task
            .temp_dir
            .join(format!("{}_{}.mp4", task.base_name, variant.label));
        guard.checkpoint()?;
        media.remux_stream_copy(&variant.url, &dest).await?;

        self.record_size(user, file_size_mb(&dest).await).await;

        info!(
            user_id = user,
            task_id = %task.id,
            label = %variant.label,
            dest = ?dest,
            "stream variant materialized"
        );

        Ok(dest)
    }

    /// Extract the audio track of a downloaded video next to it.
    ///
    /// The output is registered for cleanup with the standard TTL.
    pub async fn demux_audio(&self, user: UserId, video: &Path) -> Result<PathBuf> {
        let media = self.require_media()?;
        let guard = self.begin(user).await?;

        let dest = video.with_extension("m4a");
        self.registry.register(user, &dest).await?;
        guard.checkpoint()?;
        media.demux_audio(video, &dest).await?;

        info!(user_id = user, video = ?video, dest = ?dest, "audio track extracted");
        Ok(dest)
    }

    /// Look up a delivery task, validating ownership.
    ///
    /// The task stays stored, so delivery can be retried until
    /// [`Self::take_delivery`] removes it.
    pub fn delivery(&self, user: UserId, task_id: &TaskId) -> Result<DeliveryTask> {
        let task = self
            .sessions
            .delivery(task_id)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        if task.owner != user {
            return Err(Error::Input(InputError::NotTaskOwner {
                task_id: task_id.to_string(),
                user_id: user,
            }));
        }
        Ok(task)
    }

    /// Remove a delivery task once its files are handed over, with the same
    /// ownership check as [`Self::delivery`]
    pub fn take_delivery(&self, user: UserId, task_id: &TaskId) -> Result<DeliveryTask> {
        self.delivery(user, task_id)?;
        self.sessions
            .remove_delivery(task_id)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))
    }

    /// Request cancellation of the user's running task
    pub fn cancel(&self, user: UserId) -> bool {
        self.coordinator.request_cancel(user)
    }

    /// Whether the user currently has a task running
    pub fn is_busy(&self, user: UserId) -> bool {
        self.coordinator.is_busy(user)
    }

    /// Run one sweep pass over expired temp resources now
    pub async fn sweep_now(&self) -> Result<SweepReport> {
        self.registry.sweep(chrono::Utc::now().timestamp()).await
    }

    /// Remove every registered temp resource regardless of expiry
    pub async fn sweep_all(&self) -> Result<SweepReport> {
        self.registry.sweep_all().await
    }

    /// The session store for pending link batches and tasks
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// The per-user task coordinator
    pub fn coordinator(&self) -> &Arc<TaskCoordinator> {
        &self.coordinator
    }

    /// The persistent store
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Acquire the slot and enforce the ban flag
    async fn begin(&self, user: UserId) -> Result<SlotGuard> {
        let guard = self.coordinator.try_begin(user)?;
        let record = self.db.get_or_create_user(user).await?;
        if record.banned != 0 {
            return Err(Error::Banned(user));
        }
        Ok(guard)
    }

    fn require_media(&self) -> Result<&Arc<dyn MediaTool>> {
        self.media
            .as_ref()
            .ok_or_else(|| Error::NotSupported("no media tool available (ffmpeg)".to_string()))
    }

    async fn record_size(&self, user: UserId, size_mb: f64) {
        // Accounting failures are logged, never surfaced to the task flow
        if let Err(e) = self.db.record_task_stats(user, size_mb).await {
            warn!(user_id = user, error = %e, "failed to record task stats");
        }
    }
}

async fn file_size_mb(path: &Path) -> f64 {
    match tokio::fs::metadata(path).await {
        Ok(meta) => meta.len() as f64 / (1024.0 * 1024.0),
        Err(_) => 0.0,
    }
}
