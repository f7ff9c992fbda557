//! Safe substitution of `{{token}}` placeholders in action strings (§4.6).
//!
//! A small hand-rolled scanner rather than `regex`: the token grammar is
//! fixed (`{{`, a dotted identifier, `}}`) and known ahead of time, so a
//! linear scan is both simpler and cheaper than compiling a pattern per call.

use chrono::{DateTime, Local};

use crate::clock::Clock;
use crate::model::{Event, Trigger};

/// Everything [`VariableInterpolator`] needs to resolve a token: the event
/// that triggered evaluation, the trigger configuration (for trigger-scoped
/// tokens like `threshold`/`keyword`), and the current time.
pub struct InterpolationContext<'a> {
    pub event: &'a Event,
    pub trigger: Option<&'a Trigger>,
    pub now: DateTime<Local>,
}

impl<'a> InterpolationContext<'a> {
    pub fn new(event: &'a Event, trigger: Option<&'a Trigger>, clock: &dyn Clock) -> Self {
        Self {
            event,
            trigger,
            now: clock.now(),
        }
    }
}

/// Stateless `{{token}}` substitution engine (§4.6).
pub struct VariableInterpolator;

impl VariableInterpolator {
    /// Replace every recognised `{{token}}` in `template`; unknown tokens are
    /// preserved verbatim.
    pub fn render(template: &str, ctx: &InterpolationContext<'_>) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after_open = &rest[start + 2..];
            match after_open.find("}}") {
                Some(end) => {
                    let token = after_open[..end].trim();
                    match resolve_token(token, ctx) {
                        Some(value) => out.push_str(&value),
                        None => {
                            out.push_str("{{");
                            out.push_str(&after_open[..end]);
                            out.push_str("}}");
                        }
                    }
                    rest = &after_open[end + 2..];
                }
                None => {
                    // Unterminated `{{`: copy the rest verbatim and stop scanning.
                    out.push_str("{{");
                    out.push_str(after_open);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }

    /// Every `{{token}}` in `template` that does not resolve to a known token,
    /// without mutating the string. Used by the editor to flag typos before save.
    pub fn invalid_tokens(template: &str, ctx: &InterpolationContext<'_>) -> Vec<String> {
        let mut invalid = Vec::new();
        let mut rest = template;
        while let Some(start) = rest.find("{{") {
            let after_open = &rest[start + 2..];
            let Some(end) = after_open.find("}}") else {
                break;
            };
            let token = after_open[..end].trim();
            if resolve_token(token, ctx).is_none() {
                invalid.push(token.to_string());
            }
            rest = &after_open[end + 2..];
        }
        invalid
    }
}

fn resolve_token(token: &str, ctx: &InterpolationContext<'_>) -> Option<String> {
    let event = ctx.event;
    match token {
        "node.name" => Some(event.node_name.clone().unwrap_or_else(|| "Unknown".to_string())),
        "node.num" => Some(event.node_num.map(|n| format!("{n:x}")).unwrap_or_default()),
        "battery" => Some(
            event
                .battery_level
                .map(|level| format!("{level}%"))
                .unwrap_or_else(|| "?%".to_string()),
        ),
        "location" => Some(match event.position() {
            Some(pos) => format!("{}, {}", pos.latitude, pos.longitude),
            None => "Unknown".to_string(),
        }),
        "message" => Some(event.message_text.clone().unwrap_or_default()),
        "time" => Some(ctx.now.to_rfc3339()),
        "sensor.name" => Some(event.sensor_name.clone().unwrap_or_default()),
        "sensor.state" => Some(match event.sensor_detected {
            Some(true) => "detected".to_string(),
            Some(false) => "clear".to_string(),
            None => String::new(),
        }),
        "threshold" => trigger_threshold(ctx.trigger),
        "keyword" => trigger_keyword(ctx.trigger),
        "zone.radius" => trigger_zone_radius(ctx.trigger),
        "silent.duration" => trigger_silent_duration(ctx.trigger),
        "signal.threshold" => trigger_signal_threshold(ctx.trigger),
        "channel.name" => trigger_channel_name(ctx.trigger),
        _ => None,
    }
}

fn trigger_threshold(trigger: Option<&Trigger>) -> Option<String> {
    match trigger {
        Some(Trigger::BatteryLow(c)) => Some(c.battery_threshold.to_string()),
        _ => None,
    }
}

fn trigger_keyword(trigger: Option<&Trigger>) -> Option<String> {
    match trigger {
        Some(Trigger::MessageContains(c)) => Some(c.keyword.clone()),
        _ => None,
    }
}

fn trigger_zone_radius(trigger: Option<&Trigger>) -> Option<String> {
    match trigger {
        Some(Trigger::GeofenceEnter(c)) | Some(Trigger::GeofenceExit(c)) => Some(c.radius_m.to_string()),
        _ => None,
    }
}

fn trigger_silent_duration(trigger: Option<&Trigger>) -> Option<String> {
    match trigger {
        Some(Trigger::NodeSilent(c)) => Some(c.minutes.to_string()),
        _ => None,
    }
}

fn trigger_signal_threshold(trigger: Option<&Trigger>) -> Option<String> {
    match trigger {
        Some(Trigger::SignalWeak(c)) => Some(c.signal_threshold.to_string()),
        _ => None,
    }
}

fn trigger_channel_name(trigger: Option<&Trigger>) -> Option<String> {
    match trigger {
        Some(Trigger::ChannelActivity(c)) => Some(
            c.channel_index
                .map(|idx| format!("channel {idx}"))
                .unwrap_or_else(|| "any channel".to_string()),
        ),
        _ => None,
    }
}
