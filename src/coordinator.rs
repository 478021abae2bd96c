//! Per-user single-flight task coordination.
//!
//! Each user owns at most one execution slot. A second request while the
//! slot is held fails fast with [`Error::Busy`] instead of queueing.
//! Cancellation is cooperative: requesting it trips the slot's
//! [`CancellationToken`], and the running task observes it at its next
//! checkpoint.

use crate::error::{Error, Result};
use crate::types::UserId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// State for one user's execution slot
struct Slot {
    held: bool,
    cancel: CancellationToken,
}

/// Tracks which users currently have a task running.
///
/// Slots are created lazily on first contact and never evicted; the map
/// grows with the distinct user population, which stays small in practice.
#[derive(Default)]
pub struct TaskCoordinator {
    slots: Mutex<HashMap<UserId, Slot>>,
}

impl TaskCoordinator {
    /// Create an empty coordinator
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to acquire the user's execution slot.
    ///
    /// Fails with [`Error::Busy`] when the user already has a running task.
    /// The returned guard releases the slot on drop, so every exit path
    /// (success, error, panic unwind) frees it.
    pub fn try_begin(self: &Arc<Self>, user: UserId) -> Result<SlotGuard> {
        let mut slots = self.lock_slots();
        let slot = slots.entry(user).or_insert_with(|| Slot {
            held: false,
            cancel: CancellationToken::new(),
        });

        if slot.held {
            tracing::debug!(user_id = user, "slot busy, rejecting task");
            return Err(Error::Busy(user));
        }

        slot.held = true;
        // Fresh token per task so a stale cancel request can't kill the next one
        slot.cancel = CancellationToken::new();
        let cancel = slot.cancel.clone();
        drop(slots);

        tracing::debug!(user_id = user, "slot acquired");
        Ok(SlotGuard {
            coordinator: Arc::clone(self),
            user,
            cancel,
        })
    }

    /// Request cancellation of the user's running task.
    ///
    /// Returns `true` if a task was running and has been signalled. The task
    /// keeps running until it reaches its next checkpoint.
    pub fn request_cancel(&self, user: UserId) -> bool {
        let slots = self.lock_slots();
        match slots.get(&user) {
            Some(slot) if slot.held => {
                slot.cancel.cancel();
                tracing::info!(user_id = user, "cancellation requested");
                true
            }
            _ => false,
        }
    }

    /// Whether the user currently holds their execution slot
    pub fn is_busy(&self, user: UserId) -> bool {
        self.lock_slots().get(&user).is_some_and(|s| s.held)
    }

    /// Number of slots ever created (slots are never evicted)
    pub fn slot_count(&self) -> usize {
        self.lock_slots().len()
    }

    fn release(&self, user: UserId) {
        let mut slots = self.lock_slots();
        if let Some(slot) = slots.get_mut(&user) {
            slot.held = false;
            // Replace the token so the released slot starts clean
            slot.cancel = CancellationToken::new();
        }
        tracing::debug!(user_id = user, "slot released");
    }

    fn lock_slots(&self) -> std::sync::MutexGuard<'_, HashMap<UserId, Slot>> {
        match self.slots.lock() {
            Ok(guard) => guard,
            // Slot state is a bool + token; a panicking holder can't corrupt it
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// RAII handle for one user's execution slot.
///
/// Dropping the guard releases the slot.
pub struct SlotGuard {
    coordinator: Arc<TaskCoordinator>,
    user: UserId,
    cancel: CancellationToken,
}

impl SlotGuard {
    /// The user this slot belongs to
    #[must_use]
    pub fn user(&self) -> UserId {
        self.user
    }

    /// Token observed by pipelines that take a cancellation signal directly
    #[must_use]
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Cooperative cancellation checkpoint.
    ///
    /// Returns [`Error::Cancelled`] once cancellation has been requested;
    /// call between pipeline stages and between batch items.
    pub fn checkpoint(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            tracing::info!(user_id = self.user, "task observed cancellation");
            return Err(Error::Cancelled);
        }
        Ok(())
    }
}

impl std::fmt::Debug for SlotGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotGuard")
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.coordinator.release(self.user);
    }
}
