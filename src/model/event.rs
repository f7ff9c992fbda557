//! The [`Event`] value type and its [`EventKind`] discriminant (§3).

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use super::position::Position;

/// Discriminant shared between [`Event`]s and [`crate::model::Trigger`]s.
///
/// Candidate-automation selection in [`crate::engine::Engine::process_event`]
/// matches a trigger's kind against an event's kind; see
/// [`crate::model::Trigger::accepts_event_kind`] for the handful of trigger
/// kinds (`MessageContains`, `ChannelActivity`) that piggyback on a broader
/// event kind (`MessageReceived`) rather than requiring their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub enum EventKind {
    NodeOnline,
    NodeOffline,
    BatteryLow,
    BatteryFull,
    MessageReceived,
    PositionChanged,
    GeofenceEnter,
    GeofenceExit,
    NodeSilent,
    Scheduled,
    SignalWeak,
    ChannelActivity,
    DetectionSensor,
    Manual,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::NodeOnline => "nodeOnline",
            EventKind::NodeOffline => "nodeOffline",
            EventKind::BatteryLow => "batteryLow",
            EventKind::BatteryFull => "batteryFull",
            EventKind::MessageReceived => "messageReceived",
            EventKind::PositionChanged => "positionChanged",
            EventKind::GeofenceEnter => "geofenceEnter",
            EventKind::GeofenceExit => "geofenceExit",
            EventKind::NodeSilent => "nodeSilent",
            EventKind::Scheduled => "scheduled",
            EventKind::SignalWeak => "signalWeak",
            EventKind::ChannelActivity => "channelActivity",
            EventKind::DetectionSensor => "detectionSensor",
            EventKind::Manual => "manual",
        }
    }
}

/// A single occurrence dispatched into [`crate::engine::Engine::process_event`].
///
/// Carries the superset of fields any trigger kind might need; most fields
/// are `None`/absent for event kinds that don't produce them (e.g. a
/// `BatteryLow` event has no `message_text`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub node_num: Option<u32>,
    pub node_name: Option<String>,
    pub battery_level: Option<u8>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub message_text: Option<String>,
    pub channel_index: Option<u32>,
    pub snr: Option<f32>,
    pub sensor_name: Option<String>,
    pub sensor_detected: Option<bool>,
    pub timestamp: DateTime<Local>,

    // Scheduled-event fields (§3).
    pub schedule_id: Option<String>,
    pub slot_key: Option<String>,
    pub scheduled_for: Option<DateTime<Local>>,
    pub is_catch_up: bool,
}

impl Event {
    /// Construct a minimal event of the given kind at `timestamp`; all
    /// optional fields start unset.
    pub fn new(kind: EventKind, timestamp: DateTime<Local>) -> Self {
        Self {
            kind,
            node_num: None,
            node_name: None,
            battery_level: None,
            latitude: None,
            longitude: None,
            message_text: None,
            channel_index: None,
            snr: None,
            sensor_name: None,
            sensor_detected: None,
            timestamp,
            schedule_id: None,
            slot_key: None,
            scheduled_for: None,
            is_catch_up: false,
        }
    }

    /// The time conditions should evaluate against: `scheduled_for` if
    /// present (so a catch-up fire is judged at its intended slot), else
    /// `timestamp` (§4.5, testable property 7).
    pub fn evaluation_time(&self) -> DateTime<Local> {
        self.scheduled_for.unwrap_or(self.timestamp)
    }

    /// The event's reported position, if both coordinates are present.
    pub fn position(&self) -> Option<Position> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(Position::new(lat, lon)),
            _ => None,
        }
    }

    pub fn with_node(mut self, node_num: u32, node_name: impl Into<String>) -> Self {
        self.node_num = Some(node_num);
        self.node_name = Some(node_name.into());
        self
    }

    pub fn with_battery(mut self, level: u8) -> Self {
        self.battery_level = Some(level);
        self
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.latitude = Some(position.latitude);
        self.longitude = Some(position.longitude);
        self
    }

    pub fn with_message(mut self, text: impl Into<String>, channel_index: u32) -> Self {
        self.message_text = Some(text.into());
        self.channel_index = Some(channel_index);
        self
    }

    pub fn with_snr(mut self, snr: f32) -> Self {
        self.snr = Some(snr);
        self
    }

    pub fn with_sensor(mut self, name: impl Into<String>, detected: bool) -> Self {
        self.sensor_name = Some(name.into());
        self.sensor_detected = Some(detected);
        self
    }

    pub fn as_scheduled_fire(mut self, fire: &crate::schedule::ScheduledFire) -> Self {
        self.schedule_id = Some(fire.schedule_id.clone());
        self.slot_key = Some(fire.slot_key.clone());
        self.scheduled_for = Some(fire.scheduled_for);
        self.is_catch_up = fire.is_catch_up;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluation_time_prefers_scheduled_for() {
        let ts = Local::now();
        let scheduled = ts - chrono::Duration::hours(6);
        let mut event = Event::new(EventKind::Scheduled, ts);
        event.scheduled_for = Some(scheduled);
        assert_eq!(event.evaluation_time(), scheduled);
    }

    #[test]
    fn evaluation_time_falls_back_to_timestamp() {
        let ts = Local::now();
        let event = Event::new(EventKind::MessageReceived, ts);
        assert_eq!(event.evaluation_time(), ts);
    }

    #[test]
    fn position_requires_both_coordinates() {
        let ts = Local::now();
        let mut event = Event::new(EventKind::PositionChanged, ts);
        event.latitude = Some(1.0);
        assert!(event.position().is_none());
        event.longitude = Some(2.0);
        assert!(event.position().is_some());
    }
}
