//! Bundles the optional effector trait objects the [`super::Engine`] dispatches
//! actions through. An absent effector is not an error at construction time —
//! it only surfaces as `ActionResult{success:false, "... not configured"}` the
//! first time an action that needs it runs (§7 `EffectorUnavailable`).

use std::sync::Arc;

use crate::effectors::{AudioPlayer, Glyph, Haptics, Messenger, Notifier, ShortcutRunner, Webhook, WidgetUpdater};

#[derive(Clone, Default)]
pub struct Effectors {
    pub(crate) messenger: Option<Arc<dyn Messenger>>,
    pub(crate) notifier: Option<Arc<dyn Notifier>>,
    pub(crate) haptics: Option<Arc<dyn Haptics>>,
    pub(crate) audio: Option<Arc<dyn AudioPlayer>>,
    pub(crate) webhook: Option<Arc<dyn Webhook>>,
    pub(crate) glyph: Option<Arc<dyn Glyph>>,
    pub(crate) shortcut: Option<Arc<dyn ShortcutRunner>>,
    pub(crate) widget: Option<Arc<dyn WidgetUpdater>>,
}

impl Effectors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messenger(mut self, messenger: Arc<dyn Messenger>) -> Self {
        self.messenger = Some(messenger);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn with_haptics(mut self, haptics: Arc<dyn Haptics>) -> Self {
        self.haptics = Some(haptics);
        self
    }

    pub fn with_audio(mut self, audio: Arc<dyn AudioPlayer>) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn with_webhook(mut self, webhook: Arc<dyn Webhook>) -> Self {
        self.webhook = Some(webhook);
        self
    }

    pub fn with_glyph(mut self, glyph: Arc<dyn Glyph>) -> Self {
        self.glyph = Some(glyph);
        self
    }

    pub fn with_shortcut(mut self, shortcut: Arc<dyn ShortcutRunner>) -> Self {
        self.shortcut = Some(shortcut);
        self
    }

    pub fn with_widget(mut self, widget: Arc<dyn WidgetUpdater>) -> Self {
        self.widget = Some(widget);
        self
    }
}
