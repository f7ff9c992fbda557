//! Action kinds, executed in declaration order inside one automation (§4.5, §6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageConfig {
    pub target_node: u32,
    pub message_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaySoundConfig {
    pub rtttl: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct VibrateConfig {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushNotificationConfig {
    pub title: String,
    pub body: String,
    pub sound: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerWebhookConfig {
    /// Name of the configured webhook integration (IFTTT-Maker-style event name).
    pub webhook_event_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LogEventConfig {
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWidgetConfig {
    pub widget_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendToChannelConfig {
    /// 0 = broadcast.
    pub channel_index: u32,
    pub message_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerShortcutConfig {
    pub shortcut_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlyphPatternConfig {
    pub pattern_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "config", rename_all = "camelCase")]
#[non_exhaustive]
pub enum Action {
    SendMessage(SendMessageConfig),
    PlaySound(PlaySoundConfig),
    Vibrate(VibrateConfig),
    PushNotification(PushNotificationConfig),
    TriggerWebhook(TriggerWebhookConfig),
    LogEvent(LogEventConfig),
    UpdateWidget(UpdateWidgetConfig),
    SendToChannel(SendToChannelConfig),
    TriggerShortcut(TriggerShortcutConfig),
    GlyphPattern(GlyphPatternConfig),
}

impl Action {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Action::SendMessage(_) => "sendMessage",
            Action::PlaySound(_) => "playSound",
            Action::Vibrate(_) => "vibrate",
            Action::PushNotification(_) => "pushNotification",
            Action::TriggerWebhook(_) => "triggerWebhook",
            Action::LogEvent(_) => "logEvent",
            Action::UpdateWidget(_) => "updateWidget",
            Action::SendToChannel(_) => "sendToChannel",
            Action::TriggerShortcut(_) => "triggerShortcut",
            Action::GlyphPattern(_) => "glyphPattern",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_notification_json_round_trip_matches_schema() {
        let action = Action::PushNotification(PushNotificationConfig {
            title: "Alert".into(),
            body: "Battery low on {{node.name}}".into(),
            sound: None,
        });
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "pushNotification");
        assert_eq!(json["config"]["title"], "Alert");
        let back: Action = serde_json::from_value(json).unwrap();
        assert_eq!(back, action);
    }

    #[test]
    fn all_kinds_round_trip_through_json() {
        let actions = vec![
            Action::SendMessage(SendMessageConfig {
                target_node: 1,
                message_text: "hi".into(),
            }),
            Action::PlaySound(PlaySoundConfig {
                rtttl: "beep:d=4,o=5,b=120:c".into(),
            }),
            Action::Vibrate(VibrateConfig::default()),
            Action::TriggerWebhook(TriggerWebhookConfig {
                webhook_event_name: "node_alert".into(),
            }),
            Action::LogEvent(LogEventConfig::default()),
            Action::UpdateWidget(UpdateWidgetConfig::default()),
            Action::SendToChannel(SendToChannelConfig {
                channel_index: 0,
                message_text: "broadcast".into(),
            }),
            Action::TriggerShortcut(TriggerShortcutConfig {
                shortcut_name: "Arrived Home".into(),
            }),
            Action::GlyphPattern(GlyphPatternConfig {
                pattern_name: "pulse".into(),
            }),
        ];
        for action in actions {
            let json = serde_json::to_string(&action).unwrap();
            let back: Action = serde_json::from_str(&json).unwrap();
            assert_eq!(action, back);
        }
    }
}
