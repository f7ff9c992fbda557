//! Side-effect interfaces the [`crate::engine::Engine`] executes actions
//! through (§1 Non-goals, §4.5 `execute_automation`, §6 ActionExecutor traits).
//!
//! Each trait is the engine's entire contract with one capability; concrete
//! implementations (radio messenger, OS notification center, audio stack,
//! HTTP client, glyph matrix, shortcut launcher) live in the host application.
//! One async trait per external capability, same shape as [`crate::store::Store`]
//! and [`crate::schedule::PlatformScheduler`].

use async_trait::async_trait;

/// Opaque failure from an effector call. The engine never branches on the
/// cause — a failure always becomes `ActionResult{success:false, error}` —
/// so this carries only a display message (§7).
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct EffectorError(pub String);

impl EffectorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Displays OS-level notifications (push notifications, prepared sounds).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn push_notification(&self, title: &str, body: &str, sound: Option<&str>) -> Result<(), EffectorError>;
}

/// Sends messages over the mesh transport.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Direct message to `target_node`.
    async fn send_message(&self, target_node: u32, text: &str) -> Result<(), EffectorError>;
    /// Message to a channel; `channel_index == 0` is broadcast.
    async fn send_to_channel(&self, channel_index: u32, text: &str, want_ack: bool) -> Result<(), EffectorError>;
}

/// Drives device haptics.
#[async_trait]
pub trait Haptics: Send + Sync {
    /// Two heavy pulses with a brief gap, per §4.5 `Vibrate`.
    async fn double_pulse(&self) -> Result<(), EffectorError>;
}

/// Plays audio, including RTTTL ringtone strings and ad hoc alert sounds.
#[async_trait]
pub trait AudioPlayer: Send + Sync {
    async fn play_rtttl(&self, rtttl: &str) -> Result<(), EffectorError>;
    async fn play_named_sound(&self, sound: &str) -> Result<(), EffectorError>;
}

/// A single key/value/context payload handed to [`Webhook::trigger`],
/// mirroring an IFTTT-Maker-style webhook body (§4.5 `TriggerWebhook`).
#[derive(Debug, Clone, PartialEq)]
pub struct WebhookPayload {
    pub event_name: String,
    pub value1: String,
    pub value2: String,
    pub value3: String,
}

/// Dispatches outbound webhook calls. `is_active` lets the engine short
/// circuit when no webhook integration is configured (§4.5: "require
/// external webhook service to be active").
#[async_trait]
pub trait Webhook: Send + Sync {
    fn is_active(&self) -> bool;
    async fn trigger(&self, payload: WebhookPayload) -> Result<(), EffectorError>;
}

/// Drives a device's glyph/LED matrix (e.g. Nothing Phone glyph interface).
#[async_trait]
pub trait Glyph: Send + Sync {
    /// Dispatch a named pattern. Implementations should fall back to a
    /// generic "triggered" pattern for unknown names (§4.5 `GlyphPattern`).
    async fn play_pattern(&self, pattern_name: &str) -> Result<(), EffectorError>;
}

/// Launches a platform shortcut (iOS Shortcuts-style). Host applications on
/// platforms without shortcut support simply don't register an implementation;
/// the engine treats an absent `ShortcutRunner` as `EffectorUnavailable`.
#[async_trait]
pub trait ShortcutRunner: Send + Sync {
    async fn run(&self, shortcut_name: &str, input_json: &str) -> Result<(), EffectorError>;
}

/// Refreshes a host-rendered home-screen/widget surface. Actual rendering is
/// external; the engine only needs to know the call succeeded (§4.5 `UpdateWidget`).
#[async_trait]
pub trait WidgetUpdater: Send + Sync {
    async fn refresh(&self, widget_id: Option<&str>) -> Result<(), EffectorError>;
}

#[cfg(test)]
pub(crate) mod test_doubles {
    use super::*;
    use std::sync::Mutex;

    /// Records every call it receives and always succeeds — used by engine
    /// tests to assert which effectors were invoked and with what arguments.
    #[derive(Default)]
    pub struct RecordingEffectors {
        pub calls: Mutex<Vec<String>>,
        pub webhook_active: std::sync::atomic::AtomicBool,
    }

    impl RecordingEffectors {
        pub fn new() -> Self {
            let effectors = Self::default();
            effectors.webhook_active.store(true, std::sync::atomic::Ordering::SeqCst);
            effectors
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn push(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }
    }

    #[async_trait]
    impl Notifier for RecordingEffectors {
        async fn push_notification(&self, title: &str, body: &str, _sound: Option<&str>) -> Result<(), EffectorError> {
            self.push(format!("notify:{title}:{body}"));
            Ok(())
        }
    }

    #[async_trait]
    impl Messenger for RecordingEffectors {
        async fn send_message(&self, target_node: u32, text: &str) -> Result<(), EffectorError> {
            self.push(format!("send:{target_node}:{text}"));
            Ok(())
        }

        async fn send_to_channel(&self, channel_index: u32, text: &str, want_ack: bool) -> Result<(), EffectorError> {
            self.push(format!("send_channel:{channel_index}:{text}:{want_ack}"));
            Ok(())
        }
    }

    #[async_trait]
    impl Haptics for RecordingEffectors {
        async fn double_pulse(&self) -> Result<(), EffectorError> {
            self.push("vibrate");
            Ok(())
        }
    }

    #[async_trait]
    impl AudioPlayer for RecordingEffectors {
        async fn play_rtttl(&self, rtttl: &str) -> Result<(), EffectorError> {
            self.push(format!("play_rtttl:{rtttl}"));
            Ok(())
        }

        async fn play_named_sound(&self, sound: &str) -> Result<(), EffectorError> {
            self.push(format!("play_named:{sound}"));
            Ok(())
        }
    }

    #[async_trait]
    impl Webhook for RecordingEffectors {
        fn is_active(&self) -> bool {
            self.webhook_active.load(std::sync::atomic::Ordering::SeqCst)
        }

        async fn trigger(&self, payload: WebhookPayload) -> Result<(), EffectorError> {
            self.push(format!("webhook:{}:{}", payload.event_name, payload.value1));
            Ok(())
        }
    }

    #[async_trait]
    impl Glyph for RecordingEffectors {
        async fn play_pattern(&self, pattern_name: &str) -> Result<(), EffectorError> {
            self.push(format!("glyph:{pattern_name}"));
            Ok(())
        }
    }

    #[async_trait]
    impl ShortcutRunner for RecordingEffectors {
        async fn run(&self, shortcut_name: &str, input_json: &str) -> Result<(), EffectorError> {
            self.push(format!("shortcut:{shortcut_name}:{input_json}"));
            Ok(())
        }
    }

    #[async_trait]
    impl WidgetUpdater for RecordingEffectors {
        async fn refresh(&self, widget_id: Option<&str>) -> Result<(), EffectorError> {
            self.push(format!("widget:{}", widget_id.unwrap_or("default")));
            Ok(())
        }
    }
}
