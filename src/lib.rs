//! Event-driven automation engine and deterministic scheduler for a
//! mesh-radio client.
//!
//! The two load-bearing subsystems are [`engine`] (trigger dispatch,
//! derived-event detection, condition evaluation, action execution) and
//! [`schedule`] (wall-clock recurrences and catch-up policy). Everything
//! else is the ambient stack those two subsystems are built on: a clock
//! abstraction, the data model, persistence/notification traits the host
//! application implements, and small supporting utilities.

pub mod clock;
pub mod config;
pub mod debug_recorder;
pub mod effectors;
pub mod engine;
pub mod error;
pub mod interpolate;
pub mod model;
pub mod repository;
pub mod schedule;
pub mod store;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::EngineConfig;
pub use debug_recorder::{DebugRecorder, EvaluationRecord, EvaluationSummary, SkipReason};
pub use engine::{Engine, NodeUpdate};
pub use error::{EngineError, ValidationError};
pub use interpolate::{InterpolationContext, VariableInterpolator};
pub use model::{Action, Automation, Condition, Event, EventKind, Position, Trigger};
pub use repository::{Repository, RepositoryEvent};
pub use schedule::{PlatformScheduler, ScheduleSpec, Scheduler, SchedulerBridge, ScheduledFire};
pub use store::{Store, StoreError};
