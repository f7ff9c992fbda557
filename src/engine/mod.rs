//! The rule evaluation pipeline (§4.5): derives events from node updates,
//! matches them against automations, evaluates throttle/filters/conditions,
//! and executes actions through the effector traits.

mod effector_set;
mod state;

pub use effector_set::Effectors;
pub use state::{classify_presence, Presence};

use std::sync::Arc;

use chrono::{DateTime, Local, Weekday};
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::debug_recorder::{DebugRecorder, EvaluationRecord, SkipReason};
use crate::error::EngineError;
use crate::interpolate::{InterpolationContext, VariableInterpolator};
use crate::model::action::*;
use crate::model::condition::Condition;
use crate::model::trigger::Trigger;
use crate::model::{Action, ActionResult, Automation, Event, EventKind, LogEntry, Position};
use crate::repository::{Repository, RepositoryEvent};
use crate::schedule::ScheduledFire;

use state::EngineState;

/// One observation of a node's radio/telemetry state, the entry point for
/// derived-event detection (§4.5 `process_node_update`).
#[derive(Debug, Clone)]
pub struct NodeUpdate {
    pub node_num: u32,
    pub name: Option<String>,
    pub battery: Option<u8>,
    pub position: Option<Position>,
    pub snr: Option<f32>,
}

impl NodeUpdate {
    pub fn new(node_num: u32) -> Self {
        Self {
            node_num,
            name: None,
            battery: None,
            position: None,
            snr: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_battery(mut self, level: u8) -> Self {
        self.battery = Some(level);
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_snr(mut self, snr: f32) -> Self {
        self.snr = Some(snr);
        self
    }
}

/// Why a condition or trigger-kind check failed, paired with a SkipReason for the debug ring.
struct Rejection(SkipReason, String);

/// Stateful event dispatcher: the engine holds no automations of its own
/// beyond a read cache kept in sync with the `Repository` (§4.5).
pub struct Engine {
    repository: Arc<Repository>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    effectors: Effectors,
    debug_recorder: Option<Arc<DebugRecorder>>,
    automations: RwLock<Vec<Automation>>,
    state: RwLock<EngineState>,
}

impl Engine {
    pub fn new(repository: Arc<Repository>, clock: Arc<dyn Clock>, config: EngineConfig, effectors: Effectors) -> Self {
        Self {
            repository,
            clock,
            config,
            effectors,
            debug_recorder: None,
            automations: RwLock::new(Vec::new()),
            state: RwLock::new(EngineState::default()),
        }
    }

    pub fn with_debug_recorder(mut self, recorder: Arc<DebugRecorder>) -> Self {
        self.debug_recorder = Some(recorder);
        self
    }

    /// Load the automation cache from the `Repository`. Call once at startup.
    pub async fn initialize(&self) -> Result<(), EngineError> {
        let automations = self.repository.list_automations().await?;
        *self.automations.write().await = automations;
        Ok(())
    }

    /// Re-pull the automation cache from the `Repository`.
    pub async fn sync_automations(&self) -> Result<(), EngineError> {
        self.initialize().await
    }

    /// Wire this up to `Repository::events()` so the cache tracks edits made
    /// through the repository without a full reload.
    pub async fn handle_repository_event(&self, event: RepositoryEvent) {
        match event {
            RepositoryEvent::AutomationCreated(automation) | RepositoryEvent::AutomationUpdated(automation) => {
                let mut automations = self.automations.write().await;
                if let Some(slot) = automations.iter_mut().find(|existing| existing.id == automation.id) {
                    *slot = automation;
                } else {
                    automations.push(automation);
                }
            }
            RepositoryEvent::AutomationDeleted(id) => {
                self.automations.write().await.retain(|a| a.id != id);
            }
            RepositoryEvent::LogAppended(_) | RepositoryEvent::LogCleared => {}
        }
    }

    /// Manually fire an automation regardless of its configured trigger,
    /// e.g. from a "run now" button in an editor.
    pub async fn trigger_manual(&self, automation_id: &str) -> bool {
        let now = self.clock.now();
        let automations = self.automations.read().await.clone();
        let Some(automation) = automations.iter().find(|a| a.id == automation_id && a.enabled) else {
            return false;
        };
        let event = Event::new(EventKind::Manual, now);
        self.evaluate_and_maybe_execute(automation, &event).await;
        true
    }

    /// Convert a scheduler fire into a `Scheduled` event and dispatch it
    /// through the normal candidate-selection path (§4.4, §4.5).
    pub async fn process_scheduled_fire(&self, fire: ScheduledFire) {
        let event = Event::new(EventKind::Scheduled, fire.scheduled_for).as_scheduled_fire(&fire);
        self.process_event(event).await;
    }

    /// Select `enabled` automations whose trigger kind (and, for `Scheduled`
    /// triggers, `schedule_id`) matches `event`, then evaluate each (§4.5 step 1).
    ///
    /// Every automation is considered here, including disabled ones and ones
    /// whose trigger kind doesn't match — each is recorded with its skip
    /// reason so the debug export can explain "why didn't this fire" rather
    /// than only ever showing candidates that already passed both gates.
    pub async fn process_event(&self, event: Event) {
        let now = self.clock.now();
        let automations = self.automations.read().await.clone();
        for automation in automations.iter() {
            let trigger_kind = automation.trigger.kind_name();
            if !automation.enabled {
                self.record_skip(automation, &event, trigger_kind, now, SkipReason::Disabled, "automation is disabled")
                    .await;
                continue;
            }
            if !automation.trigger.accepts_event_kind(event.kind) {
                self.record_skip(
                    automation,
                    &event,
                    trigger_kind,
                    now,
                    SkipReason::TriggerTypeMismatch,
                    format!("trigger {trigger_kind} does not accept event kind {:?}", event.kind),
                )
                .await;
                continue;
            }
            if let Some(schedule_id) = automation.trigger.schedule_id() {
                if event.schedule_id.as_deref() != Some(schedule_id) {
                    continue;
                }
            }
            self.evaluate_and_maybe_execute(automation, &event).await;
        }
    }

    /// Push a skip record through the debug recorder, if one is configured.
    async fn record_skip(
        &self,
        automation: &Automation,
        event: &Event,
        trigger_kind: &'static str,
        now: DateTime<Local>,
        reason: SkipReason,
        details: impl Into<String>,
    ) {
        if let Some(recorder) = &self.debug_recorder {
            recorder
                .record(EvaluationRecord::skipped(
                    &automation.id,
                    &automation.name,
                    trigger_kind,
                    event,
                    now,
                    reason,
                    details,
                ))
                .await;
        }
    }

    // -- Derived-event detection (§4.5 `process_node_update`) ---------------

    /// Update per-node snapshots and derive secondary events, in the fixed
    /// order required by §5: battery-crossing before battery-full,
    /// position/geofence next, signal, presence.
    pub async fn observe_node_update(&self, update: NodeUpdate) {
        let now = self.clock.now();
        if let Some(name) = &update.name {
            self.state.write().await.name.insert(update.node_num, name.clone());
        }
        let name = self.state.read().await.name.get(&update.node_num).cloned();

        if let Some(battery) = update.battery {
            self.handle_battery_update(update.node_num, name.as_deref(), battery, now).await;
        }
        if let Some(position) = update.position {
            self.handle_position_update(update.node_num, name.as_deref(), position, now).await;
        }
        if let Some(snr) = update.snr {
            self.handle_signal_update(update.node_num, name.as_deref(), snr, now).await;
        }
        self.handle_presence_update(update.node_num, name.as_deref(), now).await;
    }

    async fn handle_battery_update(&self, node_num: u32, node_name: Option<&str>, current: u8, now: DateTime<Local>) {
        let previous = self.state.write().await.battery.insert(node_num, current);

        // Battery-low crossing: per automation, since the threshold and the
        // hysteresis latch are both scoped to (node, automation) (§4.5, §9).
        let automations = self.automations.read().await.clone();
        for automation in automations.iter().filter(|a| a.enabled) {
            let Trigger::BatteryLow(cfg) = &automation.trigger else {
                continue;
            };
            if let Some(filter) = cfg.node_num {
                if filter != node_num {
                    continue;
                }
            }
            let threshold = cfg.battery_threshold;
            let key = (node_num, automation.id.clone());
            match previous {
                None => {
                    // First sighting: latch the flag silently, never fire.
                    if current <= threshold {
                        self.state.write().await.fired_battery_low.insert(key);
                    }
                }
                Some(prev) => {
                    let already_fired = self.state.read().await.fired_battery_low.contains(&key);
                    if prev > threshold && current <= threshold && !already_fired {
                        self.state.write().await.fired_battery_low.insert(key);
                        let event = Event::new(EventKind::BatteryLow, now)
                            .with_node(node_num, node_name.unwrap_or("Unknown"))
                            .with_battery(current);
                        self.evaluate_and_maybe_execute(automation, &event).await;
                    } else if current > threshold.saturating_add(self.config.battery_hysteresis_band) {
                        self.state.write().await.fired_battery_low.remove(&key);
                    }
                }
            }
        }

        // Battery-full: generic, dispatched through the normal candidate path.
        if let Some(prev) = previous {
            if prev < 100 && current == 100 {
                let event = Event::new(EventKind::BatteryFull, now)
                    .with_node(node_num, node_name.unwrap_or("Unknown"))
                    .with_battery(current);
                self.process_event(event).await;
            }
        }
    }

    async fn handle_position_update(&self, node_num: u32, node_name: Option<&str>, current: Position, now: DateTime<Local>) {
        let previous = self.state.write().await.position.insert(node_num, current);

        if let Some(prev) = previous {
            let automations = self.automations.read().await.clone();
            for automation in automations.iter().filter(|a| a.enabled) {
                match &automation.trigger {
                    Trigger::GeofenceEnter(cfg) => {
                        if cfg.node_num.is_some_and(|n| n != node_num) {
                            continue;
                        }
                        let was_inside = prev.is_within(&cfg.center, cfg.radius_m);
                        let is_inside = current.is_within(&cfg.center, cfg.radius_m);
                        if !was_inside && is_inside {
                            let event = Event::new(EventKind::GeofenceEnter, now)
                                .with_node(node_num, node_name.unwrap_or("Unknown"))
                                .with_position(current);
                            self.evaluate_and_maybe_execute(automation, &event).await;
                        }
                    }
                    Trigger::GeofenceExit(cfg) => {
                        if cfg.node_num.is_some_and(|n| n != node_num) {
                            continue;
                        }
                        let was_inside = prev.is_within(&cfg.center, cfg.radius_m);
                        let is_inside = current.is_within(&cfg.center, cfg.radius_m);
                        if was_inside && !is_inside {
                            let event = Event::new(EventKind::GeofenceExit, now)
                                .with_node(node_num, node_name.unwrap_or("Unknown"))
                                .with_position(current);
                            self.evaluate_and_maybe_execute(automation, &event).await;
                        }
                    }
                    _ => {}
                }
            }
        }

        let event = Event::new(EventKind::PositionChanged, now)
            .with_node(node_num, node_name.unwrap_or("Unknown"))
            .with_position(current);
        self.process_event(event).await;
    }

    async fn handle_signal_update(&self, node_num: u32, node_name: Option<&str>, snr: f32, now: DateTime<Local>) {
        // Emitted unconditionally; `should_trigger` applies the per-automation
        // threshold filter (§9 open question, resolved: keep unconditional).
        let event = Event::new(EventKind::SignalWeak, now)
            .with_node(node_num, node_name.unwrap_or("Unknown"))
            .with_snr(snr);
        self.process_event(event).await;
    }

    async fn handle_presence_update(&self, node_num: u32, node_name: Option<&str>, now: DateTime<Local>) {
        let timeout = chrono::Duration::from_std(self.config.presence_timeout).unwrap_or_else(|_| chrono::Duration::minutes(15));
        let previous = {
            let state = self.state.read().await;
            state.presence.get(&node_num).copied().unwrap_or_else(|| {
                state
                    .last_heard
                    .get(&node_num)
                    .map(|last_heard| classify_presence(*last_heard, now, timeout))
                    .unwrap_or(Presence::Inactive)
            })
        };
        {
            let mut state = self.state.write().await;
            state.last_heard.insert(node_num, now);
            state.presence.insert(node_num, Presence::Active);
        }
        if previous == Presence::Inactive {
            let event = Event::new(EventKind::NodeOnline, now).with_node(node_num, node_name.unwrap_or("Unknown"));
            self.process_event(event).await;
        }
    }

    /// Periodic sweep detecting nodes that have gone stale since their last
    /// update, emitting `NodeOffline` for each active->inactive transition.
    /// A node update itself can only ever observe the inactive->active edge
    /// (handled inline in `handle_presence_update`); the active->inactive edge
    /// is only observable by absence, hence this separate sweep, run by the
    /// host on a timer alongside `run_silent_node_check`.
    pub async fn run_presence_sweep(&self) {
        let now = self.clock.now();
        let timeout = chrono::Duration::from_std(self.config.presence_timeout).unwrap_or_else(|_| chrono::Duration::minutes(15));
        let stale: Vec<(u32, Option<String>)> = {
            let state = self.state.read().await;
            state
                .last_heard
                .iter()
                .filter(|(node, last_heard)| {
                    state.presence.get(node).copied() == Some(Presence::Active) && now - **last_heard >= timeout
                })
                .map(|(node, _)| (*node, state.name.get(node).cloned()))
                .collect()
        };
        for (node_num, name) in stale {
            self.state.write().await.presence.insert(node_num, Presence::Inactive);
            let event = Event::new(EventKind::NodeOffline, now).with_node(node_num, name.unwrap_or_else(|| "Unknown".to_string()));
            self.process_event(event).await;
        }
    }

    /// Every `silent_node_poll_interval`, for each `NodeSilent(minutes=m)`
    /// automation, check whichever node(s) it watches against its own `m`
    /// (§4.5 "Silent-node monitor"). Dispatched directly per automation since
    /// `m` is per-trigger-config, not re-checkable generically in `should_trigger`.
    pub async fn run_silent_node_check(&self) {
        let now = self.clock.now();
        let automations = self.automations.read().await.clone();
        for automation in automations.iter().filter(|a| a.enabled) {
            let Trigger::NodeSilent(cfg) = &automation.trigger else {
                continue;
            };
            let nodes: Vec<u32> = {
                let state = self.state.read().await;
                match cfg.node_num {
                    Some(node) => vec![node],
                    None => state.last_heard.keys().copied().collect(),
                }
            };
            for node_num in nodes {
                let last_heard = self.state.read().await.last_heard.get(&node_num).copied();
                let Some(last_heard) = last_heard else {
                    continue;
                };
                if now - last_heard >= chrono::Duration::minutes(cfg.minutes as i64) {
                    let name = self.state.read().await.name.get(&node_num).cloned();
                    let event =
                        Event::new(EventKind::NodeSilent, now).with_node(node_num, name.unwrap_or_else(|| "Unknown".to_string()));
                    self.evaluate_and_maybe_execute(automation, &event).await;
                }
            }
        }
    }

    // -- Evaluation (§4.5 `should_trigger`) ----------------------------------

    async fn evaluate_and_maybe_execute(&self, automation: &Automation, event: &Event) {
        let trigger_kind = automation.trigger.kind_name();
        let now = self.clock.now();
        match self.should_trigger(automation, event).await {
            Ok(condition_outcomes) => {
                debug!(automation_id = %automation.id, %trigger_kind, "automation triggered");
                if let Some(recorder) = &self.debug_recorder {
                    recorder
                        .record(
                            EvaluationRecord::triggered(&automation.id, &automation.name, trigger_kind, event, now)
                                .with_condition_outcomes(condition_outcomes),
                        )
                        .await;
                }
                self.execute_automation(automation, event).await;
            }
            Err(Rejection(reason, details)) => {
                self.record_skip(automation, event, trigger_kind, now, reason, details).await;
            }
        }
    }

    async fn should_trigger(&self, automation: &Automation, event: &Event) -> Result<Vec<(String, bool)>, Rejection> {
        let now = self.clock.now();
        let trigger_kind = automation.trigger.kind_name();

        // a. Throttle.
        let last_fired = self
            .state
            .read()
            .await
            .last_trigger_times
            .get(&(automation.id.clone(), trigger_kind))
            .copied();
        if let Some(last_fired) = last_fired {
            let interval = chrono::Duration::from_std(self.config.throttle_interval).unwrap_or_default();
            if now - last_fired < interval {
                return Err(Rejection(SkipReason::Throttled, format!("last fired at {last_fired}")));
            }
        }

        // b. Node filter.
        if let Some(filter_node) = automation.trigger.node_num_filter() {
            if Some(filter_node) != event.node_num {
                return Err(Rejection(
                    SkipReason::NodeFilterMismatch,
                    format!("expected node {filter_node}, event came from {:?}", event.node_num),
                ));
            }
        }

        // c. Trigger-kind filter.
        self.check_trigger_kind(&automation.trigger, event)?;

        // d. Conditions, in declaration order, evaluated against `evaluation_time`.
        let mut outcomes = Vec::with_capacity(automation.conditions.len());
        for condition in &automation.conditions {
            let (passed, details) = self.evaluate_condition(condition, event).await;
            outcomes.push((condition.kind_name().to_string(), passed));
            if !passed {
                return Err(Rejection(SkipReason::ConditionFailed, format!("{}: {details}", condition.kind_name())));
            }
        }

        Ok(outcomes)
    }

    fn check_trigger_kind(&self, trigger: &Trigger, event: &Event) -> Result<(), Rejection> {
        match trigger {
            Trigger::BatteryLow(cfg) => match event.battery_level {
                Some(level) if level <= cfg.battery_threshold => Ok(()),
                other => Err(Rejection(
                    SkipReason::BatteryThresholdNotMet,
                    format!("battery {other:?} does not meet threshold {}", cfg.battery_threshold),
                )),
            },
            Trigger::MessageContains(cfg) => match &event.message_text {
                Some(text) if text.to_lowercase().contains(&cfg.keyword.to_lowercase()) => Ok(()),
                other => Err(Rejection(
                    SkipReason::KeywordNotMatched,
                    format!("message {other:?} does not contain {:?}", cfg.keyword),
                )),
            },
            Trigger::SignalWeak(cfg) => match event.snr {
                Some(snr) if snr <= cfg.signal_threshold => Ok(()),
                other => Err(Rejection(
                    SkipReason::SignalThresholdNotMet,
                    format!("snr {other:?} does not meet threshold {}", cfg.signal_threshold),
                )),
            },
            Trigger::ChannelActivity(cfg) => match cfg.channel_index {
                Some(expected) if Some(expected) != event.channel_index => Err(Rejection(
                    SkipReason::ChannelFilterMismatch,
                    format!("expected channel {expected}, got {:?}", event.channel_index),
                )),
                _ => Ok(()),
            },
            Trigger::DetectionSensor(cfg) => {
                if let Some(filter) = &cfg.sensor_name_filter {
                    let matches = event
                        .sensor_name
                        .as_ref()
                        .is_some_and(|name| name.to_lowercase().contains(&filter.to_lowercase()));
                    if !matches {
                        return Err(Rejection(
                            SkipReason::NodeFilterMismatch,
                            format!("sensor name {:?} does not contain {filter:?}", event.sensor_name),
                        ));
                    }
                }
                if let Some(expected) = cfg.detected_state {
                    if event.sensor_detected != Some(expected) {
                        return Err(Rejection(
                            SkipReason::ChannelFilterMismatch,
                            format!("expected detected={expected}, got {:?}", event.sensor_detected),
                        ));
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn evaluate_condition(&self, condition: &Condition, event: &Event) -> (bool, String) {
        let eval_time = event.evaluation_time();
        match condition {
            Condition::TimeRange(cfg) => {
                let ok = time_in_range(eval_time, &cfg.time_start, &cfg.time_end);
                (ok, format!("{} in [{}, {})", eval_time.format("%H:%M"), cfg.time_start, cfg.time_end))
            }
            Condition::DayOfWeek(cfg) => {
                let weekday = weekday_index(eval_time.weekday());
                (cfg.days.contains(&weekday), format!("weekday {weekday} in {:?}", cfg.days))
            }
            Condition::BatteryAbove(cfg) => {
                let battery = self.resolve_battery(cfg.node_num, event).await;
                match battery {
                    Some(level) => (level > cfg.threshold, format!("{level} > {}", cfg.threshold)),
                    None => (true, "no battery reading on record, condition passes".to_string()),
                }
            }
            Condition::BatteryBelow(cfg) => {
                let battery = self.resolve_battery(cfg.node_num, event).await;
                match battery {
                    Some(level) => (level < cfg.threshold, format!("{level} < {}", cfg.threshold)),
                    None => (true, "no battery reading on record, condition passes".to_string()),
                }
            }
            Condition::NodeOnline(cfg) => {
                let Some(node_num) = cfg.node_num.or(event.node_num) else {
                    return (false, "no node to check presence for".to_string());
                };
                let presence = self.state.read().await.presence.get(&node_num).copied();
                (presence == Some(Presence::Active), format!("node {node_num} presence={presence:?}"))
            }
            Condition::NodeOffline(cfg) => {
                let Some(node_num) = cfg.node_num.or(event.node_num) else {
                    return (false, "no node to check presence for".to_string());
                };
                let presence = self.state.read().await.presence.get(&node_num).copied();
                (presence != Some(Presence::Active), format!("node {node_num} presence={presence:?}"))
            }
            Condition::WithinGeofence(cfg) => {
                let position = self.resolve_position(cfg.node_num, event).await;
                match position {
                    Some(pos) => {
                        let inside = pos.is_within(&cfg.center, cfg.radius_m);
                        (inside, format!("distance {:.1}m vs radius {}m", pos.haversine_meters(&cfg.center), cfg.radius_m))
                    }
                    None => (false, "no position on record".to_string()),
                }
            }
            Condition::OutsideGeofence(cfg) => {
                let position = self.resolve_position(cfg.node_num, event).await;
                match position {
                    Some(pos) => {
                        let outside = !pos.is_within(&cfg.center, cfg.radius_m);
                        (outside, format!("distance {:.1}m vs radius {}m", pos.haversine_meters(&cfg.center), cfg.radius_m))
                    }
                    None => (false, "no position on record".to_string()),
                }
            }
        }
    }

    async fn resolve_battery(&self, configured_node: Option<u32>, event: &Event) -> Option<u8> {
        match configured_node.or(event.node_num) {
            Some(node_num) => self.state.read().await.battery.get(&node_num).copied().or(event.battery_level),
            None => event.battery_level,
        }
    }

    async fn resolve_position(&self, configured_node: Option<u32>, event: &Event) -> Option<Position> {
        match configured_node.or(event.node_num) {
            Some(node_num) => self.state.read().await.position.get(&node_num).copied().or_else(|| event.position()),
            None => event.position(),
        }
    }

    // -- Execution (§4.5 `execute_automation`) -------------------------------

    async fn execute_automation(&self, automation: &Automation, event: &Event) {
        let now = self.clock.now();
        let trigger_kind = automation.trigger.kind_name();

        // Recorded before action execution so a slow/suspended action can't
        // widen the effective throttle window (§4.5 step 1).
        self.state
            .write()
            .await
            .last_trigger_times
            .insert((automation.id.clone(), trigger_kind), now);

        let ctx = InterpolationContext {
            event,
            trigger: Some(&automation.trigger),
            now,
        };

        let mut results = Vec::with_capacity(automation.actions.len());
        for action in &automation.actions {
            results.push(self.execute_action(action, event, &ctx).await);
        }

        let success = results.iter().all(|r| r.success);
        let error_message = if success {
            None
        } else {
            Some(
                results
                    .iter()
                    .filter(|r| !r.success)
                    .map(|r| format!("{}: {}", r.name, r.error.clone().unwrap_or_default()))
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        };

        let entry = LogEntry {
            automation_id: automation.id.clone(),
            name: automation.name.clone(),
            timestamp: now,
            success,
            trigger_details: trigger_kind.to_string(),
            action_names: automation.actions.iter().map(|a| a.kind_name().to_string()).collect(),
            action_results: results,
            error_message,
        };
        self.repository.append_log(entry).await;

        let mut updated = automation.clone();
        updated.trigger_count += 1;
        updated.last_triggered = Some(now);
        match self.repository.update_automation(updated.clone()).await {
            Ok(updated) => {
                let mut cache = self.automations.write().await;
                if let Some(slot) = cache.iter_mut().find(|a| a.id == updated.id) {
                    *slot = updated;
                }
            }
            Err(err) => {
                error!(automation_id = %automation.id, error = %err, "failed to persist trigger count/last_triggered update");
            }
        }
    }

    async fn execute_action(&self, action: &Action, event: &Event, ctx: &InterpolationContext<'_>) -> ActionResult {
        let name = action.kind_name();
        match action {
            Action::SendMessage(cfg) => {
                let Some(messenger) = &self.effectors.messenger else {
                    return ActionResult::failed(name, "messenger effector not configured");
                };
                let text = VariableInterpolator::render(&cfg.message_text, ctx);
                result_from(name, messenger.send_message(cfg.target_node, &text).await)
            }
            Action::SendToChannel(cfg) => {
                let Some(messenger) = &self.effectors.messenger else {
                    return ActionResult::failed(name, "messenger effector not configured");
                };
                let text = VariableInterpolator::render(&cfg.message_text, ctx);
                let want_ack = cfg.channel_index != 0;
                result_from(name, messenger.send_to_channel(cfg.channel_index, &text, want_ack).await)
            }
            Action::PlaySound(cfg) => {
                let Some(audio) = &self.effectors.audio else {
                    return ActionResult::failed(name, "audio player effector not configured");
                };
                result_from(name, audio.play_rtttl(&cfg.rtttl).await)
            }
            Action::Vibrate(_) => {
                let Some(haptics) = &self.effectors.haptics else {
                    return ActionResult::failed(name, "haptics effector not configured");
                };
                result_from(name, haptics.double_pulse().await)
            }
            Action::PushNotification(cfg) => {
                let Some(notifier) = &self.effectors.notifier else {
                    return ActionResult::failed(name, "notifier effector not configured");
                };
                let title = VariableInterpolator::render(&cfg.title, ctx);
                let body = VariableInterpolator::render(&cfg.body, ctx);
                let outcome = notifier.push_notification(&title, &body, cfg.sound.as_deref()).await;
                if outcome.is_ok() {
                    if let (Some(audio), Some(sound)) = (&self.effectors.audio, &cfg.sound) {
                        if let Err(err) = audio.play_named_sound(sound).await {
                            warn!(%err, "push notification sound failed to play");
                        }
                    }
                }
                result_from(name, outcome)
            }
            Action::TriggerWebhook(cfg) => {
                let Some(webhook) = &self.effectors.webhook else {
                    return ActionResult::failed(name, "webhook effector not configured");
                };
                if !webhook.is_active() {
                    return ActionResult::failed(name, "webhook service not active");
                }
                let payload = webhook_payload(cfg, event);
                result_from(name, webhook.trigger(payload).await)
            }
            Action::LogEvent(_) => ActionResult::ok(name),
            Action::UpdateWidget(cfg) => {
                if let Some(updater) = &self.effectors.widget {
                    if let Err(err) = updater.refresh(cfg.widget_id.as_deref()).await {
                        warn!(%err, "widget refresh failed; action still reported success");
                    }
                }
                // Per spec: always succeeds, the refresh itself is external.
                ActionResult::ok(name)
            }
            Action::TriggerShortcut(cfg) => {
                let Some(runner) = &self.effectors.shortcut else {
                    return ActionResult::failed(name, "shortcuts not supported on this platform");
                };
                let input_json = shortcut_input_json(event);
                result_from(name, runner.run(&cfg.shortcut_name, &input_json).await)
            }
            Action::GlyphPattern(cfg) => {
                let Some(glyph) = &self.effectors.glyph else {
                    return ActionResult::failed(name, "glyph effector not configured");
                };
                result_from(name, glyph.play_pattern(&cfg.pattern_name).await)
            }
        }
    }
}

fn result_from(name: &'static str, outcome: Result<(), crate::effectors::EffectorError>) -> ActionResult {
    match outcome {
        Ok(()) => ActionResult::ok(name),
        Err(err) => ActionResult::failed(name, err.to_string()),
    }
}

fn webhook_payload(cfg: &TriggerWebhookConfig, event: &Event) -> crate::effectors::WebhookPayload {
    let value2 = event
        .position()
        .map(|p| format!("{}, {}", p.latitude, p.longitude))
        .or_else(|| event.message_text.clone())
        .unwrap_or_default();
    crate::effectors::WebhookPayload {
        event_name: cfg.webhook_event_name.clone(),
        value1: event.node_name.clone().unwrap_or_else(|| "Unknown".to_string()),
        value2,
        value3: format!(
            "battery={} snr={} at={}",
            event.battery_level.map(|b| b.to_string()).unwrap_or_else(|| "?".to_string()),
            event.snr.map(|s| s.to_string()).unwrap_or_else(|| "?".to_string()),
            event.timestamp.to_rfc3339()
        ),
    }
}

fn shortcut_input_json(event: &Event) -> String {
    serde_json::json!({
        "nodeName": event.node_name,
        "nodeNum": event.node_num,
        "battery": event.battery_level,
        "message": event.message_text,
        "latitude": event.latitude,
        "longitude": event.longitude,
        "timestamp": event.timestamp.to_rfc3339(),
    })
    .to_string()
}

fn weekday_index(weekday: Weekday) -> u8 {
    // 0 = Sunday .. 6 = Saturday, matching DayOfWeekConfig's wire convention.
    weekday.num_days_from_sunday() as u8
}

fn parse_hhmm(s: &str) -> Option<chrono::NaiveTime> {
    chrono::NaiveTime::parse_from_str(s, "%H:%M").ok()
}

fn time_in_range(reference: DateTime<Local>, start: &str, end: &str) -> bool {
    let (Some(start), Some(end)) = (parse_hhmm(start), parse_hhmm(end)) else {
        warn!(start, end, "malformed TimeRange condition, treating as not-in-range");
        return false;
    };
    let t = reference.time();
    if start <= end {
        t >= start && t < end
    } else {
        t >= start || t < end
    }
}
