//! The [`Automation`] entity and its execution log shapes (§3).

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

use super::action::Action;
use super::condition::Condition;
use super::trigger::Trigger;

/// A user-defined rule: *when `trigger` and (optionally) `conditions` then `actions`*.
///
/// Created by an external editor; mutated only through
/// [`crate::repository::Repository`], which re-issues `updated` notifications
/// on every successful write; destroyed by deletion (total — no soft delete).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Automation {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub enabled: bool,
    pub trigger: Trigger,
    pub actions: Vec<Action>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    pub created_at: DateTime<Local>,
    pub last_triggered: Option<DateTime<Local>>,
    #[serde(default)]
    pub trigger_count: u64,
}

impl Automation {
    /// Construct a new, enabled automation with zero trigger history.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyId`] or [`ValidationError::NoActions`]
    /// if the caller passes an empty id or an empty action list.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        trigger: Trigger,
        actions: Vec<Action>,
        conditions: Vec<Condition>,
        now: DateTime<Local>,
    ) -> Result<Self, ValidationError> {
        let automation = Self {
            id: id.into(),
            name: name.into(),
            description: None,
            enabled: true,
            trigger,
            actions,
            conditions,
            created_at: now,
            last_triggered: None,
            trigger_count: 0,
        };
        automation.validate()?;
        Ok(automation)
    }

    /// Re-check the structural invariants every `Automation` must hold.
    ///
    /// Called at editor/save time — never inside the engine's evaluation
    /// path, where an `Automation` is assumed valid (§7).
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyId());
        }
        if self.actions.is_empty() {
            return Err(ValidationError::NoActions());
        }
        Ok(())
    }
}

/// The outcome of executing one [`Action`] inside an automation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub name: String,
    pub success: bool,
    pub error: Option<String>,
}

impl ActionResult {
    pub fn ok(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            success: true,
            error: None,
        }
    }

    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// One record of an automation execution attempt, appended to the
/// [`crate::repository::Repository`]'s bounded log ring (§3, §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub automation_id: String,
    pub name: String,
    pub timestamp: DateTime<Local>,
    pub success: bool,
    pub trigger_details: String,
    pub action_names: Vec<String>,
    pub action_results: Vec<ActionResult>,
    pub error_message: Option<String>,
}
