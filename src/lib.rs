//! # botload
//!
//! Multi-tenant background-task engine for chat bots.
//!
//! botload gives an embedding bot the heavy-lifting half of a file-delivery
//! workflow: per-user single-flight task execution with cooperative
//! cancellation, categorized link batch downloads, archive extraction with
//! password handling, HLS variant selection and stream-copy remux, and
//! TTL-based cleanup of everything it writes to disk.
//!
//! ## Example
//!
//! ```no_run
//! use botload::{Config, TaskEngine};
//!
//! #[tokio::main]
//! async fn main() -> botload::Result<()> {
//!     let engine = TaskEngine::new(Config::default()).await?;
//!     engine.spawn_sweeper();
//!
//!     let batch = engine.register_links(12345, "check https://example.com/a.mp4")?;
//!     println!("found {} link categories", batch.links.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

pub mod config;
pub mod coordinator;
pub mod db;
pub mod download;
pub mod drive;
pub mod engine;
pub mod error;
pub mod extraction;
pub mod links;
pub mod media;
pub mod progress;
pub mod registry;
pub mod sessions;
pub mod stream;
pub mod types;

pub use config::Config;
pub use coordinator::{SlotGuard, TaskCoordinator};
pub use db::Database;
pub use engine::{BatchOutcome, ExtractionOutcome, TaskEngine};
pub use error::{DatabaseError, Error, ExtractError, InputError, Result};
pub use extraction::{ArchiveCodec, NativeCodec};
pub use media::{FfmpegTool, MediaTool};
pub use progress::{NullSink, ProgressReporter, ProgressSink, ProgressUpdate};
pub use registry::{ResourceRegistry, SweepReport, Sweeper};
pub use sessions::{DeliveryTask, LinkBatch, SessionStore, StreamSelectionTask};
pub use types::{
    BatchReport, ExtractionResult, ExtractionStats, LinkCategory, LinkMap, StreamVariant, TaskId,
    UserId,
};
