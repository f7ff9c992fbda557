//! Crate-level error types.
//!
//! Mirrors the error taxonomy in §7 of the design spec: local recovery
//! (skip / default / record-and-continue) is the rule everywhere except
//! persistence and editor-time validation, which surface an error to the
//! caller. [`EngineError`] composes the narrower per-module error enums via
//! `#[from]` so `?` converts them automatically.

use thiserror::Error;

use crate::schedule::ScheduleError;
use crate::store::StoreError;

/// Crate-level error type.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    /// A trigger/action/condition config failed validation at save time.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Persistence failed. The mutation is rolled back in memory.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A schedule registration or lookup failed.
    #[error("schedule error: {0}")]
    Schedule(#[from] ScheduleError),

    /// A JSON (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An internal invariant was violated; should not normally surface to a caller.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Malformed trigger/action/condition configuration.
///
/// Raised by constructors and by [`crate::model::Automation::validate`] at
/// editor/save time. Never constructed inside the engine's evaluation path —
/// by the time an `Automation` reaches the engine it is assumed valid.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("automation must have at least one action")]
    NoActions(),

    #[error("automation id must not be empty")]
    EmptyId(),

    #[error("interval schedule `every` must be at least {min_secs}s, got {actual_secs}s")]
    IntervalTooShort { min_secs: u64, actual_secs: u64 },

    #[error("weekly schedule must specify at least one day of week")]
    EmptyDaysOfWeek(),

    #[error("invalid time-of-day string `{0}`, expected HH:MM")]
    InvalidTimeOfDay(String),

    #[error("`{field}` must be non-negative, got {value}")]
    NegativeValue { field: &'static str, value: f64 },

    #[error("unknown IANA timezone identifier `{0}`")]
    UnknownTimezone(String),
}
