//! Bridge to the OS-provided background wake-up API (§4.4).

use async_trait::async_trait;
use chrono::{DateTime, Local};

use super::spec::ScheduleSpec;

/// What kind of platform task a schedule should be mirrored as, decided by
/// [`super::bridge::SchedulerBridge`] from a `ScheduleSpec`'s kind.
#[derive(Debug, Clone, PartialEq)]
pub enum PlatformTask {
    /// Repeating background task. Most platforms enforce a minimum period
    /// (typically 15 minutes); the bridge clamps to it before calling
    /// `schedule_periodic`.
    Periodic { id: String, every: std::time::Duration },
    /// One-shot wake at an absolute instant — used for `OneShot` schedules and
    /// to re-arm `Daily`/`Weekly` schedules after each platform-driven wake.
    OneShot { id: String, at: DateTime<Local> },
}

/// Implementation-specific bridge to an OS background-task scheduler (iOS
/// `BGTaskScheduler`, Android `WorkManager`, or equivalent). The engine only
/// depends on this trait; the concrete implementation lives in the host
/// application.
#[async_trait]
pub trait PlatformScheduler: Send + Sync {
    /// Register (or replace) a platform task.
    async fn schedule(&self, task: PlatformTask);

    /// Cancel a previously scheduled task by id. Cancelling an unknown id is
    /// not an error.
    async fn cancel(&self, id: &str);

    /// Cancel every platform task this bridge has registered.
    async fn cancel_all(&self);

    /// The platform's minimum period for a repeating task (e.g. 15 minutes).
    /// `SchedulerBridge` clamps `ScheduleKind::Interval` periods to this floor.
    fn minimum_periodic_interval(&self) -> std::time::Duration;
}

/// A `PlatformScheduler` that records calls instead of touching any real OS
/// API, used by `SchedulerBridge`'s own tests and by host applications during
/// development.
#[derive(Default)]
pub struct NoopPlatformScheduler {
    calls: std::sync::Mutex<Vec<String>>,
}

impl NoopPlatformScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlatformScheduler for NoopPlatformScheduler {
    async fn schedule(&self, task: PlatformTask) {
        let label = match &task {
            PlatformTask::Periodic { id, .. } => format!("schedule:periodic:{id}"),
            PlatformTask::OneShot { id, .. } => format!("schedule:oneshot:{id}"),
        };
        self.calls.lock().unwrap().push(label);
    }

    async fn cancel(&self, id: &str) {
        self.calls.lock().unwrap().push(format!("cancel:{id}"));
    }

    async fn cancel_all(&self) {
        self.calls.lock().unwrap().push("cancel_all".to_string());
    }

    fn minimum_periodic_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(15 * 60)
    }
}

/// Decide the `PlatformTask` a `ScheduleSpec` maps to, per §4.4. Returns
/// `None` for `Daily`/`Weekly` specs with no computable next occurrence
/// (e.g. past `end_at`).
pub(super) fn task_for(spec: &ScheduleSpec, now: DateTime<Local>, minimum_periodic: std::time::Duration) -> Option<PlatformTask> {
    use super::spec::ScheduleKind;
    match &spec.kind {
        ScheduleKind::OneShot { run_at } => Some(PlatformTask::OneShot {
            id: spec.id.clone(),
            at: *run_at,
        }),
        ScheduleKind::Interval { every_secs } => {
            let every = std::time::Duration::from_secs(*every_secs).max(minimum_periodic);
            Some(PlatformTask::Periodic {
                id: spec.id.clone(),
                every,
            })
        }
        ScheduleKind::Daily { .. } | ScheduleKind::Weekly { .. } => {
            spec.first_occurrence_at_or_after(now).map(|occ| PlatformTask::OneShot {
                id: spec.id.clone(),
                at: occ.boundary,
            })
        }
    }
}
