//! Per-node snapshot state the [`super::Engine`] derives transitions from (§3, §5).
//!
//! Ephemeral by design: lost on restart, rebuilt purely from subsequent node
//! updates. Historical replay must never mutate it outside of live updates.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Local};

use crate::model::Position;

/// Active/inactive classification of a node, derived from how long ago it was
/// last heard from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Active,
    Inactive,
}

/// `Active` iff `now - last_heard <= timeout`.
pub fn classify_presence(last_heard: DateTime<Local>, now: DateTime<Local>, timeout: Duration) -> Presence {
    if now - last_heard <= timeout {
        Presence::Active
    } else {
        Presence::Inactive
    }
}

/// Mutable per-node state owned exclusively by the `Engine`'s execution context.
#[derive(Default)]
pub(crate) struct EngineState {
    pub battery: HashMap<u32, u8>,
    pub position: HashMap<u32, Position>,
    pub last_heard: HashMap<u32, DateTime<Local>>,
    pub presence: HashMap<u32, Presence>,
    pub name: HashMap<u32, String>,
    /// Hysteresis latch for `BatteryLow`, keyed by `(node_num, automation_id)`
    /// since the crossing threshold is per-automation (§4.5, §9).
    pub fired_battery_low: HashSet<(u32, String)>,
    /// Throttle deadlines, keyed by `(automation_id, trigger_kind)` (§4.5 step 2a).
    pub last_trigger_times: HashMap<(String, &'static str), DateTime<Local>>,
}
