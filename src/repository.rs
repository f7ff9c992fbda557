//! Owns automation CRUD and the execution log; the only writer of either
//! through the [`Store`] boundary (§3, §6).
//!
//! Follows a "mutate, then fan out a broadcast notification" shape over a
//! single global channel — there is no per-subscriber routing to do.

use std::sync::Arc;

use chrono::Local;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::error::EngineError;
use crate::model::{Automation, LogEntry};
use crate::store::Store;

const LOG_RING_CAPACITY: usize = 500;
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A change a [`Repository`] mutation produced, broadcast to subscribers
/// (e.g. a UI list screen, or `Engine` invalidating a cached automation) once
/// the underlying [`Store`] write has succeeded (§6: never broadcast on a
/// failed write).
#[derive(Debug, Clone)]
pub enum RepositoryEvent {
    AutomationCreated(Automation),
    AutomationUpdated(Automation),
    AutomationDeleted(String),
    LogAppended(LogEntry),
    LogCleared,
}

/// CRUD surface over stored [`Automation`]s and the execution log, backed by
/// a [`Store`] implementation supplied by the host application.
///
/// Holds no automation state of its own beyond what it just wrote — callers
/// needing the full set call [`Repository::list_automations`], which always
/// reads through to the store. This keeps the repository honest about a
/// single source of truth, at the cost of a round trip per list; hosts that
/// need a hot in-memory view maintain it themselves by subscribing to
/// [`Repository::events`].
pub struct Repository {
    store: Arc<dyn Store>,
    events: broadcast::Sender<RepositoryEvent>,
    max_log_entries: usize,
}

/// Default log ring size (§6 "Safety caps": `max_log_entries = 100`),
/// used when a [`Repository`] is constructed without an explicit override.
const DEFAULT_MAX_LOG_ENTRIES: usize = 100;

impl Repository {
    pub fn new(store: Arc<dyn Store>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            events,
            max_log_entries: DEFAULT_MAX_LOG_ENTRIES,
        }
    }

    /// Override the log ring cap, e.g. from `EngineConfig::max_log_entries`.
    pub fn with_max_log_entries(mut self, max: usize) -> Self {
        self.max_log_entries = max;
        self
    }

    pub fn events(&self) -> broadcast::Receiver<RepositoryEvent> {
        self.events.subscribe()
    }

    pub async fn list_automations(&self) -> Result<Vec<Automation>, EngineError> {
        Ok(self.store.load_automations().await?)
    }

    /// Validate and persist a new automation, then notify subscribers.
    pub async fn create_automation(&self, automation: Automation) -> Result<Automation, EngineError> {
        automation.validate()?;
        self.store.save_automation(&automation).await?;
        info!(automation_id = %automation.id, "automation created");
        let _ = self.events.send(RepositoryEvent::AutomationCreated(automation.clone()));
        Ok(automation)
    }

    /// Validate and overwrite an existing automation, then notify subscribers.
    pub async fn update_automation(&self, automation: Automation) -> Result<Automation, EngineError> {
        automation.validate()?;
        self.store.save_automation(&automation).await?;
        info!(automation_id = %automation.id, "automation updated");
        let _ = self.events.send(RepositoryEvent::AutomationUpdated(automation.clone()));
        Ok(automation)
    }

    /// Delete by id. Idempotent: deleting an unknown id still broadcasts —
    /// a caller racing a delete against a stale list should converge either way.
    pub async fn delete_automation(&self, id: &str) -> Result<(), EngineError> {
        self.store.delete_automation(id).await?;
        info!(automation_id = %id, "automation deleted");
        let _ = self.events.send(RepositoryEvent::AutomationDeleted(id.to_string()));
        Ok(())
    }

    /// Record the outcome of an automation execution. Failures to persist the
    /// log entry are logged and swallowed (§7: the log is diagnostic, never
    /// load-bearing for evaluation correctness) rather than propagated, since
    /// callers are typically deep inside `Engine::execute_automation` and
    /// should not fail an otherwise-successful action run over a log write.
    pub async fn append_log(&self, entry: LogEntry) {
        if let Err(err) = self.store.append_log(&entry).await {
            warn!(error = %err, automation_id = %entry.automation_id, "failed to persist log entry");
        }
        if let Err(err) = self.store.trim_log(self.max_log_entries).await {
            warn!(error = %err, "failed to trim log ring to its configured cap");
        }
        let _ = self.events.send(RepositoryEvent::LogAppended(entry));
    }

    /// Most recent log entries, newest first, capped at the repository's ring size.
    pub async fn recent_log(&self, max: usize) -> Result<Vec<LogEntry>, EngineError> {
        Ok(self.store.load_log(max.min(LOG_RING_CAPACITY)).await?)
    }

    pub async fn clear_log(&self) -> Result<(), EngineError> {
        self.store.clear_log().await?;
        info!("automation log cleared");
        let _ = self.events.send(RepositoryEvent::LogCleared);
        Ok(())
    }
}

/// Convenience used by `Engine` when constructing a [`LogEntry`] from a
/// completed automation run; kept here rather than on `LogEntry` itself since
/// it's a repository-facing convention (the timestamp source), not a model invariant.
pub fn now_log_timestamp() -> chrono::DateTime<Local> {
    Local::now()
}
