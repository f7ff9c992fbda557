//! Persistence boundary for automations, schedules, and the execution log (§6).
//!
//! A narrow async trait an embedding application implements against whatever
//! backend it already has (file, SQLite, a remote sync service). The methods
//! are typed to the specific entities this crate persists rather than a
//! generic key/value pair, since each entity has its own idempotent-by-id
//! contract (§6: "Idempotent by id; implementations may add sync/outbox
//! semantics transparently").

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Automation, LogEntry};
use crate::schedule::ScheduleSpec;

/// Failure persisting or loading engine state.
///
/// Carries only a message: the concrete backend (file I/O, SQL, HTTP) knows
/// its own error type, and this crate has no business branching on it —
/// `StoreError` is always an opaque "ask the host" signal (§7).
#[derive(Debug, Error)]
#[error("store error: {message}")]
pub struct StoreError {
    message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Persistence boundary consumed by [`crate::repository::Repository`] and
/// [`crate::schedule::Scheduler`]. Schema, migration, and sync/outbox
/// semantics are the implementer's concern (§1 Non-goals).
#[async_trait]
pub trait Store: Send + Sync {
    /// Load every stored automation. Implementations should skip and log
    /// (not fail) individually corrupt records (§7 `ParseError`).
    async fn load_automations(&self) -> Result<Vec<Automation>, StoreError>;

    /// Insert or overwrite the automation with this id.
    async fn save_automation(&self, automation: &Automation) -> Result<(), StoreError>;

    /// Remove the automation with this id. Idempotent: deleting an unknown
    /// id is not an error.
    async fn delete_automation(&self, id: &str) -> Result<(), StoreError>;

    /// Load every stored `ScheduleSpec`, used by `Scheduler::resync_from_store`.
    async fn load_schedules(&self) -> Result<Vec<ScheduleSpec>, StoreError>;

    /// Overwrite the full set of stored schedules with `specs`.
    async fn persist_schedules(&self, specs: &[ScheduleSpec]) -> Result<(), StoreError>;

    /// Append one log entry.
    async fn append_log(&self, entry: &LogEntry) -> Result<(), StoreError>;

    /// Load up to `max` most recent log entries, newest first.
    async fn load_log(&self, max: usize) -> Result<Vec<LogEntry>, StoreError>;

    /// Clear the persisted log, e.g. from a developer-settings "clear
    /// automation logs" action.
    async fn clear_log(&self) -> Result<(), StoreError>;

    /// Drop all but the `keep` most recent log entries. Called by
    /// [`crate::repository::Repository`] after every append so the log ring
    /// stays bounded (§3 invariant: "Log ring is bounded (≤ 100 entries by
    /// default)"); a no-op if the stored log is already within `keep`.
    async fn trim_log(&self, keep: usize) -> Result<(), StoreError>;
}
