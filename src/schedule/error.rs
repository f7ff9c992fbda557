//! Errors surfaced by schedule registration and lookup.

use thiserror::Error;

use crate::error::ValidationError;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ScheduleError {
    #[error("schedule `{0}` not found")]
    NotFound(String),

    #[error("schedule `{0}` is already registered")]
    AlreadyExists(String),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}
