//! Keeps [`Scheduler`] authoritative while mirroring a subset of schedules to
//! the platform's background executor (§4.4).

use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::store::{Store, StoreError};

use super::platform::{task_for, PlatformScheduler};
use super::scheduler::{ScheduledFire, Scheduler};
use super::spec::ScheduleSpec;

/// Bridges the in-app [`Scheduler`] to a [`PlatformScheduler`], re-arming
/// platform tasks on background/foreground transitions and persisting
/// schedule state through a [`Store`].
///
/// Owns the sole right to call `Scheduler::tick` (§5: "the bridge serialises
/// it by construction — it is the sole caller of `tick`"), via its internal
/// `RwLock`.
pub struct SchedulerBridge {
    scheduler: RwLock<Scheduler>,
    platform: Arc<dyn PlatformScheduler>,
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    platform_enabled: bool,
}

impl SchedulerBridge {
    pub fn new(
        scheduler: Scheduler,
        platform: Arc<dyn PlatformScheduler>,
        store: Arc<dyn Store>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            scheduler: RwLock::new(scheduler),
            platform,
            store,
            clock,
            platform_enabled: true,
        }
    }

    /// Disable platform mirroring (useful on platforms with no background
    /// executor, or in tests); the in-app `Scheduler` still runs.
    pub fn with_platform_enabled(mut self, enabled: bool) -> Self {
        self.platform_enabled = enabled;
        self
    }

    /// Load persisted schedules and rebuild the in-app heap. Call once at
    /// startup before `sync_to_platform`.
    pub async fn initialize(&self) -> Result<(), StoreError> {
        let specs = self.store.load_schedules().await?;
        let now = self.clock.now();
        self.scheduler.write().await.resync_from_store(specs, now);
        info!("scheduler bridge initialized from store");
        Ok(())
    }

    /// Subscribe to the underlying scheduler's fire stream.
    pub async fn fire_events(&self) -> tokio::sync::broadcast::Receiver<ScheduledFire> {
        self.scheduler.read().await.fire_events()
    }

    /// Register `spec` with the in-app scheduler, and with the platform
    /// scheduler if enabled and the spec is itself enabled.
    pub async fn register_schedule(&self, spec: ScheduleSpec) {
        let now = self.clock.now();
        let id = spec.id.clone();
        let enabled = spec.enabled;
        self.scheduler.write().await.register(spec, now);
        if self.platform_enabled && enabled {
            self.arm_platform_task(&id, now).await;
        }
        info!(schedule_id = %id, "schedule registered");
    }

    /// Symmetric with `register_schedule`.
    pub async fn unregister_schedule(&self, id: &str) -> Result<(), super::error::ScheduleError> {
        self.scheduler.write().await.unregister(id)?;
        self.platform.cancel(id).await;
        info!(schedule_id = %id, "schedule unregistered");
        Ok(())
    }

    async fn arm_platform_task(&self, id: &str, now: DateTime<Local>) {
        let scheduler = self.scheduler.read().await;
        let Some(spec) = scheduler.schedules().into_iter().find(|s| s.id == id) else {
            return;
        };
        drop(scheduler);
        if let Some(task) = task_for(&spec, now, self.platform.minimum_periodic_interval()) {
            self.platform.schedule(task).await;
        }
    }

    /// On backgrounding: cancel every platform task, then re-register
    /// enabled/active schedules.
    pub async fn sync_to_platform(&self) {
        if !self.platform_enabled {
            return;
        }
        self.platform.cancel_all().await;
        let now = self.clock.now();
        let specs: Vec<ScheduleSpec> = self
            .scheduler
            .read()
            .await
            .schedules()
            .into_iter()
            .filter(|s| s.is_active_at(now))
            .collect();
        for spec in specs {
            if let Some(task) = task_for(&spec, now, self.platform.minimum_periodic_interval()) {
                self.platform.schedule(task).await;
            }
        }
        debug!("scheduler state synced to platform");
    }

    /// On foregrounding: force one tick at the current time, returning
    /// whatever fires it produced. Callers are expected to dispatch each fire
    /// into `Engine::process_event`.
    pub async fn process_on_resume(&self) -> Vec<ScheduledFire> {
        let now = self.clock.now();
        let fires = self.scheduler.write().await.tick(now);
        let _ = self.persist().await;
        fires
    }

    /// Invoked from the platform wake callback: tick, persist, then re-arm
    /// daily/weekly platform tasks for their next occurrence.
    pub async fn on_platform_wake(&self) -> Vec<ScheduledFire> {
        let now = self.clock.now();
        let fires = self.scheduler.write().await.tick(now);
        let _ = self.persist().await;
        self.sync_to_platform().await;
        fires
    }

    /// Write the scheduler's current spec snapshot back through the `Store`.
    pub async fn persist(&self) -> Result<(), StoreError> {
        let snapshot = self.scheduler.read().await.persist_snapshot();
        self.store.persist_schedules(&snapshot).await
    }

    /// Run a tick at `now` without going through the clock — exposed for
    /// hosts that drive their own periodic timer loop.
    pub async fn tick(&self, now: DateTime<Local>) -> Vec<ScheduledFire> {
        self.scheduler.write().await.tick(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FakeClock;
    use crate::schedule::spec::ScheduleKind;
    use crate::schedule::platform::NoopPlatformScheduler;
    use crate::store::test_support::InMemoryStore;
    use chrono::TimeZone;

    fn local(y: i32, m: u32, d: u32, h: u32, mi: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, mi, 0).single().unwrap()
    }

    #[tokio::test]
    async fn register_then_resume_fires_a_due_interval_schedule() {
        let now = local(2026, 7, 27, 9, 0);
        let fake_clock = Arc::new(FakeClock::new(now));
        let clock: Arc<dyn Clock> = fake_clock.clone();
        let platform = Arc::new(NoopPlatformScheduler::new());
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::default());
        let bridge = SchedulerBridge::new(
            Scheduler::new(100, std::time::Duration::from_secs(300)),
            platform.clone(),
            store,
            clock,
        );

        let spec = ScheduleSpec::new("s1", ScheduleKind::Interval { every_secs: 60 }, "UTC")
            .unwrap()
            .with_start_at(now);
        bridge.register_schedule(spec).await;

        fake_clock.advance(chrono::Duration::seconds(90));

        let fires = bridge.process_on_resume().await;
        assert!(!fires.is_empty(), "expected at least one elapsed interval slot to fire");
        assert!(fires.iter().all(|f| f.schedule_id == "s1"));
        assert!(platform.calls().iter().any(|c| c.starts_with("schedule:periodic:s1")));
    }

    #[tokio::test]
    async fn sync_to_platform_cancels_then_rearms() {
        let now = local(2026, 7, 27, 9, 0);
        let clock: Arc<dyn Clock> = Arc::new(FakeClock::new(now));
        let platform = Arc::new(NoopPlatformScheduler::new());
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::default());
        let bridge = SchedulerBridge::new(
            Scheduler::new(100, std::time::Duration::from_secs(300)),
            platform.clone(),
            store,
            clock,
        );
        let spec = ScheduleSpec::new("s1", ScheduleKind::Daily { hour: 9, minute: 0 }, "UTC").unwrap();
        bridge.register_schedule(spec).await;
        bridge.sync_to_platform().await;

        let calls = platform.calls();
        assert!(calls.contains(&"cancel_all".to_string()));
        assert!(calls.iter().any(|c| c.starts_with("schedule:oneshot:s1")));
    }
}
