//! Bounded ring of rule-evaluation records, for developer-facing export (§4.7).

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::model::{Event, EventKind};

/// Why `should_trigger` declined to fire an automation (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    Disabled,
    TriggerTypeMismatch,
    Throttled,
    NodeFilterMismatch,
    BatteryThresholdNotMet,
    KeywordNotMatched,
    SignalThresholdNotMet,
    ChannelFilterMismatch,
    ConditionFailed,
}

/// One evaluation attempt, recorded whether or not it fired (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRecord {
    pub automation_id: String,
    pub name: String,
    pub enabled: bool,
    pub trigger_kind: String,
    pub event_kind: EventKind,
    pub timestamp: DateTime<Local>,
    pub triggered: bool,
    pub skip_reason: Option<SkipReason>,
    pub skip_details: Option<String>,
    /// The event this record was evaluated against, kept as a full snapshot
    /// rather than re-deriving individual fields from `skip_details`.
    pub event_snapshot: Event,
    pub condition_outcomes: Vec<(String, bool)>,
}

impl EvaluationRecord {
    pub fn triggered(
        automation_id: impl Into<String>,
        name: impl Into<String>,
        trigger_kind: &'static str,
        event: &Event,
        timestamp: DateTime<Local>,
    ) -> Self {
        Self {
            automation_id: automation_id.into(),
            name: name.into(),
            enabled: true,
            trigger_kind: trigger_kind.to_string(),
            event_kind: event.kind,
            timestamp,
            triggered: true,
            skip_reason: None,
            skip_details: None,
            event_snapshot: event.clone(),
            condition_outcomes: Vec::new(),
        }
    }

    pub fn skipped(
        automation_id: impl Into<String>,
        name: impl Into<String>,
        trigger_kind: &'static str,
        event: &Event,
        timestamp: DateTime<Local>,
        reason: SkipReason,
        details: impl Into<String>,
    ) -> Self {
        Self {
            automation_id: automation_id.into(),
            name: name.into(),
            enabled: !matches!(reason, SkipReason::Disabled),
            trigger_kind: trigger_kind.to_string(),
            event_kind: event.kind,
            timestamp,
            triggered: false,
            skip_reason: Some(reason),
            skip_details: Some(details.into()),
            event_snapshot: event.clone(),
            condition_outcomes: Vec::new(),
        }
    }

    pub fn with_condition_outcomes(mut self, outcomes: Vec<(String, bool)>) -> Self {
        self.condition_outcomes = outcomes;
        self
    }
}

/// Summary counts over the current ring contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub triggered: usize,
    pub skipped: usize,
}

/// Bounded, thread-safe ring of [`EvaluationRecord`]s (§4.7, §8 invariant on
/// boundedness). Lifecycle is independent of the [`crate::engine::Engine`]:
/// it may be cleared at any time without affecting evaluation.
pub struct DebugRecorder {
    ring: RwLock<VecDeque<EvaluationRecord>>,
    capacity: usize,
}

impl DebugRecorder {
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: RwLock::new(VecDeque::with_capacity(capacity.min(4096))),
            capacity,
        }
    }

    /// Push a record, dropping the oldest one if the ring is at capacity.
    pub async fn record(&self, record: EvaluationRecord) {
        let mut ring = self.ring.write().await;
        if ring.len() >= self.capacity {
            ring.pop_front();
        }
        ring.push_back(record);
    }

    /// Immutable snapshot of the current ring, oldest first.
    pub async fn snapshot(&self) -> Vec<EvaluationRecord> {
        self.ring.read().await.iter().cloned().collect()
    }

    pub async fn clear(&self) {
        self.ring.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.ring.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.ring.read().await.is_empty()
    }

    pub async fn summary(&self) -> EvaluationSummary {
        let ring = self.ring.read().await;
        let triggered = ring.iter().filter(|r| r.triggered).count();
        EvaluationSummary {
            triggered,
            skipped: ring.len() - triggered,
        }
    }

    /// Counts of skipped evaluations grouped by [`SkipReason`].
    pub async fn skip_breakdown(&self) -> Vec<(SkipReason, usize)> {
        use std::collections::BTreeMap;
        let ring = self.ring.read().await;
        let mut counts: BTreeMap<SkipReason, usize> = BTreeMap::new();
        for record in ring.iter() {
            if let Some(reason) = record.skip_reason {
                *counts.entry(reason).or_insert(0) += 1;
            }
        }
        counts.into_iter().collect()
    }
}

impl Ord for SkipReason {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (*self as u8).cmp(&(*other as u8))
    }
}
impl PartialOrd for SkipReason {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
