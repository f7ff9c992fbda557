//! Scheduler subsystem (§2 "Scheduler", §4.3/§4.4): deterministic wall-clock
//! recurrences, their evaluation, and the bridge to a platform background executor.

pub mod bridge;
pub mod error;
pub mod platform;
pub mod scheduler;
pub mod spec;

pub use bridge::SchedulerBridge;
pub use error::ScheduleError;
pub use platform::{NoopPlatformScheduler, PlatformScheduler, PlatformTask};
pub use scheduler::{ScheduledFire, Scheduler};
pub use spec::{CatchUpPolicy, DedupeStrategy, Occurrence, ScheduleKind, ScheduleSpec, MIN_INTERVAL_SECS};
