//! Condition kinds, evaluated as a logical AND chain in declaration order (§4.5 step d).

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::position::Position;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeRangeConfig {
    /// "HH:MM" local wall time. `time_end < time_start` means the range
    /// crosses midnight (permitted per §4.5).
    pub time_start: String,
    pub time_end: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayOfWeekConfig {
    /// 0 = Sunday .. 6 = Saturday.
    pub days: HashSet<u8>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BatteryCompareConfig {
    pub node_num: Option<u32>,
    pub threshold: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct NodePresenceConfig {
    /// Node to check; `None` means "the node the triggering event came from".
    pub node_num: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeofenceConditionConfig {
    pub node_num: Option<u32>,
    pub center: Position,
    pub radius_m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "config", rename_all = "camelCase")]
#[non_exhaustive]
pub enum Condition {
    TimeRange(TimeRangeConfig),
    DayOfWeek(DayOfWeekConfig),
    BatteryAbove(BatteryCompareConfig),
    BatteryBelow(BatteryCompareConfig),
    NodeOnline(NodePresenceConfig),
    NodeOffline(NodePresenceConfig),
    WithinGeofence(GeofenceConditionConfig),
    OutsideGeofence(GeofenceConditionConfig),
}

impl Condition {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Condition::TimeRange(_) => "timeRange",
            Condition::DayOfWeek(_) => "dayOfWeek",
            Condition::BatteryAbove(_) => "batteryAbove",
            Condition::BatteryBelow(_) => "batteryBelow",
            Condition::NodeOnline(_) => "nodeOnline",
            Condition::NodeOffline(_) => "nodeOffline",
            Condition::WithinGeofence(_) => "withinGeofence",
            Condition::OutsideGeofence(_) => "outsideGeofence",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_range_json_round_trip_matches_schema() {
        let cond = Condition::TimeRange(TimeRangeConfig {
            time_start: "22:00".into(),
            time_end: "07:00".into(),
        });
        let json = serde_json::to_value(&cond).unwrap();
        assert_eq!(json["type"], "timeRange");
        assert_eq!(json["config"]["timeStart"], "22:00");
        assert_eq!(json["config"]["timeEnd"], "07:00");
        let back: Condition = serde_json::from_value(json).unwrap();
        assert_eq!(back, cond);
    }

    #[test]
    fn all_kinds_round_trip_through_json() {
        let conditions = vec![
            Condition::DayOfWeek(DayOfWeekConfig {
                days: HashSet::from([0, 6]),
            }),
            Condition::BatteryAbove(BatteryCompareConfig {
                node_num: None,
                threshold: 50,
            }),
            Condition::BatteryBelow(BatteryCompareConfig {
                node_num: Some(7),
                threshold: 20,
            }),
            Condition::NodeOnline(NodePresenceConfig::default()),
            Condition::NodeOffline(NodePresenceConfig::default()),
            Condition::WithinGeofence(GeofenceConditionConfig {
                node_num: None,
                center: Position::new(1.0, 2.0),
                radius_m: 100.0,
            }),
            Condition::OutsideGeofence(GeofenceConditionConfig {
                node_num: None,
                center: Position::new(1.0, 2.0),
                radius_m: 100.0,
            }),
        ];
        for cond in conditions {
            let json = serde_json::to_string(&cond).unwrap();
            let back: Condition = serde_json::from_str(&json).unwrap();
            assert_eq!(cond, back);
        }
    }
}
