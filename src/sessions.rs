//! Short-lived interactive session state.
//!
//! Between "here are your links" and "download them all", and between
//! "pick a quality" and the remux, the engine has to remember what it
//! offered. These tasks live in memory only; a restart simply invalidates
//! pending prompts, which is the correct behavior for stale chat buttons.

use crate::types::{LinkMap, StreamVariant, TaskId, UserId};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

/// Chat-scoped key for a link prompt: (chat id, message id)
pub type SessionKey = (i64, i64);

/// Parsed links remembered for a "download all" followup
#[derive(Debug, Clone)]
pub struct LinkBatch {
    /// The raw text the links were scanned from
    pub raw_content: String,
    /// The categorized links
    pub links: LinkMap,
}

impl LinkBatch {
    /// The links as a cleaned text block: unique, sorted, one per line
    #[must_use]
    pub fn cleaned_text(&self) -> String {
        let mut all: Vec<&str> = self
            .links
            .values()
            .flatten()
            .map(String::as_str)
            .collect();
        all.sort_unstable();
        all.dedup();
        all.join("\n")
    }
}

/// A finished extraction or batch waiting for the bot to deliver its files
#[derive(Debug, Clone)]
pub struct DeliveryTask {
    /// Task id handed to the bot
    pub id: TaskId,
    /// User the result belongs to
    pub owner: UserId,
    /// Root of the produced tree
    pub base_dir: PathBuf,
    /// Relative file paths under `base_dir`, in listing order
    pub files: Vec<String>,
    /// Display name of the source archive or batch
    pub archive_name: String,
}

/// A resolved manifest waiting for the user to pick a variant
#[derive(Debug, Clone)]
pub struct StreamSelectionTask {
    /// Task id handed to the bot
    pub id: TaskId,
    /// User the prompt belongs to
    pub owner: UserId,
    /// The manifest URL the variants came from
    pub manifest_url: String,
    /// Selectable variants, in manifest order
    pub variants: Vec<StreamVariant>,
    /// Scratch directory the remux output goes to
    pub temp_dir: PathBuf,
    /// Output base name derived from the manifest URL
    pub base_name: String,
}

/// In-memory store for all pending session tasks
#[derive(Default)]
pub struct SessionStore {
    link_batches: Mutex<HashMap<SessionKey, LinkBatch>>,
    deliveries: Mutex<HashMap<TaskId, DeliveryTask>>,
    stream_tasks: Mutex<HashMap<TaskId, StreamSelectionTask>>,
}

impl SessionStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember a link batch for the given chat message
    pub fn put_link_batch(&self, key: SessionKey, batch: LinkBatch) {
        lock(&self.link_batches).insert(key, batch);
    }

    /// Look up the link batch for a chat message
    pub fn link_batch(&self, key: SessionKey) -> Option<LinkBatch> {
        lock(&self.link_batches).get(&key).cloned()
    }

    /// Drop the link batch for a chat message
    pub fn remove_link_batch(&self, key: SessionKey) -> Option<LinkBatch> {
        lock(&self.link_batches).remove(&key)
    }

    /// Remember a delivery task
    pub fn put_delivery(&self, task: DeliveryTask) {
        lock(&self.deliveries).insert(task.id.clone(), task);
    }

    /// Look up a delivery task without consuming it
    pub fn delivery(&self, id: &TaskId) -> Option<DeliveryTask> {
        lock(&self.deliveries).get(id).cloned()
    }

    /// Drop a delivery task once its files are handed over
    pub fn remove_delivery(&self, id: &TaskId) -> Option<DeliveryTask> {
        lock(&self.deliveries).remove(id)
    }

    /// Remember a stream selection task
    pub fn put_stream_task(&self, task: StreamSelectionTask) {
        lock(&self.stream_tasks).insert(task.id.clone(), task);
    }

    /// Look up a stream selection task without consuming it
    pub fn stream_task(&self, id: &TaskId) -> Option<StreamSelectionTask> {
        lock(&self.stream_tasks).get(id).cloned()
    }

    /// Consume a stream selection task.
    ///
    /// Single-shot: the first materialization takes the task, so a double
    /// tap on the same chat button can't start two remuxes.
    pub fn take_stream_task(&self, id: &TaskId) -> Option<StreamSelectionTask> {
        lock(&self.stream_tasks).remove(id)
    }

    /// Number of pending stream selection tasks
    #[must_use]
    pub fn pending_stream_tasks(&self) -> usize {
        lock(&self.stream_tasks).len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        // Session maps hold plain data; a panicking holder can't corrupt them
        Err(poisoned) => poisoned.into_inner(),
    }
}
