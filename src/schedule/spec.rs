//! [`ScheduleSpec`] — a recurrence plus its dedup/catch-up policy (§3, §4.2).

use std::collections::HashSet;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Datelike, Local, TimeZone, Timelike};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Minimum `every` for an [`ScheduleKind::Interval`] (§3: "Interval (Interval, ≥ 10 s)").
pub const MIN_INTERVAL_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ScheduleKind {
    OneShot { run_at: DateTime<Local> },
    Interval { every_secs: u64 },
    Daily { hour: u32, minute: u32 },
    Weekly { hour: u32, minute: u32, days_of_week: HashSet<u8> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CatchUpPolicy {
    None,
    LastOnly,
    AllWithinWindow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DedupeStrategy {
    BySlot,
    None,
}

/// A single registered recurrence (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSpec {
    pub id: String,
    pub kind: ScheduleKind,
    /// IANA timezone identifier (e.g. `"America/Chicago"`).
    pub tz: String,
    pub start_at: Option<DateTime<Local>>,
    pub end_at: Option<DateTime<Local>>,
    pub jitter_ms: u64,
    pub catch_up_policy: CatchUpPolicy,
    pub catch_up_window_secs: u64,
    pub max_catch_up_executions: u32,
    pub dedupe_strategy: DedupeStrategy,
    pub last_fired_slot_key: Option<String>,
    pub last_evaluated_at: Option<DateTime<Local>>,
    pub enabled: bool,
}

/// One computed occurrence of a [`ScheduleSpec`], before/after jitter.
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    /// The un-jittered scheduled boundary. Used for dedup, freshness checks,
    /// and the `ScheduledFire::scheduled_for` field.
    pub boundary: DateTime<Local>,
    /// `boundary` plus a clamped jitter offset. Used to order the scheduler's
    /// heap — this is when the fire is actually dispatched.
    pub fire_time: DateTime<Local>,
    pub slot_key: String,
    pub interval_count: Option<u64>,
}

impl ScheduleSpec {
    pub fn new(
        id: impl Into<String>,
        kind: ScheduleKind,
        tz: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let tz = tz.into();
        Tz::from_str(&tz).map_err(|_| ValidationError::UnknownTimezone(tz.clone()))?;
        if let ScheduleKind::Interval { every_secs } = &kind {
            if *every_secs < MIN_INTERVAL_SECS {
                return Err(ValidationError::IntervalTooShort {
                    min_secs: MIN_INTERVAL_SECS,
                    actual_secs: *every_secs,
                });
            }
        }
        if let ScheduleKind::Weekly { days_of_week, .. } = &kind {
            if days_of_week.is_empty() {
                return Err(ValidationError::EmptyDaysOfWeek());
            }
        }
        Ok(Self {
            id: id.into(),
            kind,
            tz,
            start_at: None,
            end_at: None,
            jitter_ms: 0,
            catch_up_policy: CatchUpPolicy::None,
            catch_up_window_secs: 3600,
            max_catch_up_executions: 20,
            dedupe_strategy: DedupeStrategy::BySlot,
            last_fired_slot_key: None,
            last_evaluated_at: None,
            enabled: true,
        })
    }

    pub fn with_start_at(mut self, at: DateTime<Local>) -> Self {
        self.start_at = Some(at);
        self
    }

    pub fn with_end_at(mut self, at: DateTime<Local>) -> Self {
        self.end_at = Some(at);
        self
    }

    pub fn with_jitter_ms(mut self, jitter_ms: u64) -> Self {
        self.jitter_ms = jitter_ms;
        self
    }

    pub fn with_catch_up(mut self, policy: CatchUpPolicy, window: Duration) -> Self {
        self.catch_up_policy = policy;
        self.catch_up_window_secs = window.as_secs();
        self
    }

    pub fn with_max_catch_up_executions(mut self, max: u32) -> Self {
        self.max_catch_up_executions = max;
        self
    }

    pub fn with_dedupe_strategy(mut self, strategy: DedupeStrategy) -> Self {
        self.dedupe_strategy = strategy;
        self
    }

    pub fn tz(&self) -> Tz {
        // Validated at construction; `new` is the only public constructor.
        Tz::from_str(&self.tz).unwrap_or(Tz::UTC)
    }

    /// Whether `at` satisfies `enabled` and the `[start_at, end_at]` window
    /// (unbounded ends treated as always-satisfied), and — for `OneShot` —
    /// the slot hasn't already fired (§4.2 "Active").
    pub fn is_active_at(&self, at: DateTime<Local>) -> bool {
        if !self.enabled {
            return false;
        }
        if let Some(start) = self.start_at {
            if at < start {
                return false;
            }
        }
        if let Some(end) = self.end_at {
            if at > end {
                return false;
            }
        }
        if matches!(self.kind, ScheduleKind::OneShot { .. }) && self.last_fired_slot_key.is_some() {
            return false;
        }
        true
    }

    /// Compute the next occurrence strictly after `reference`, honoring
    /// `end_at` (§4.3 "Next-occurrence computation"). Returns `None` if no
    /// future occurrence exists (either past `end_at`, or — for `OneShot` —
    /// already fired).
    pub fn next_occurrence_after(&self, reference: DateTime<Local>) -> Option<Occurrence> {
        let boundary = match &self.kind {
            ScheduleKind::OneShot { run_at } => {
                if self.last_fired_slot_key.is_some() {
                    return None;
                }
                *run_at
            }
            ScheduleKind::Interval { every_secs } => {
                let anchor = self.start_at.or(self.last_evaluated_at).unwrap_or(reference);
                let every = chrono::Duration::seconds(*every_secs as i64);
                let diff = reference - anchor;
                let k: i64 = if diff < chrono::Duration::zero() {
                    0
                } else {
                    diff.num_seconds() / (*every_secs as i64) + 1
                };
                let candidate = anchor + every * (k as i32);
                return self.finish_occurrence(candidate, Some(k.max(0) as u64));
            }
            ScheduleKind::Daily { hour, minute } => {
                let tz = self.tz();
                let reference_in_tz = reference.with_timezone(&tz);
                let today_slot = tz
                    .with_ymd_and_hms(
                        reference_in_tz.year(),
                        reference_in_tz.month(),
                        reference_in_tz.day(),
                        *hour,
                        *minute,
                        0,
                    )
                    .single()?;
                let slot_in_tz = if today_slot > reference_in_tz {
                    today_slot
                } else {
                    let tomorrow = reference_in_tz.date_naive().succ_opt()?;
                    tz.with_ymd_and_hms(
                        tomorrow.year(),
                        tomorrow.month(),
                        tomorrow.day(),
                        *hour,
                        *minute,
                        0,
                    )
                    .single()?
                };
                slot_in_tz.with_timezone(&Local)
            }
            ScheduleKind::Weekly { hour, minute, days_of_week } => {
                let tz = self.tz();
                let reference_in_tz = reference.with_timezone(&tz);
                let mut candidate_date = reference_in_tz.date_naive().succ_opt()?;
                let mut found = None;
                for _ in 0..7 {
                    let dow = candidate_date.weekday().num_days_from_sunday() as u8;
                    if days_of_week.contains(&dow) {
                        found = Some(candidate_date);
                        break;
                    }
                    candidate_date = candidate_date.succ_opt()?;
                }
                let date = found?;
                let slot_in_tz = tz
                    .with_ymd_and_hms(date.year(), date.month(), date.day(), *hour, *minute, 0)
                    .single()?;
                slot_in_tz.with_timezone(&Local)
            }
        };
        self.finish_occurrence(boundary, None)
    }

    /// Like [`ScheduleSpec::next_occurrence_after`] but inclusive of `reference`
    /// itself — used by the scheduler when (re)registering a schedule and when
    /// recovering from a stale catch-up gap, where an occurrence landing
    /// exactly on `reference` should still be considered "at or after" it
    /// rather than skipped.
    pub fn first_occurrence_at_or_after(&self, reference: DateTime<Local>) -> Option<Occurrence> {
        self.next_occurrence_after(reference - chrono::Duration::milliseconds(1))
    }

    fn finish_occurrence(&self, boundary: DateTime<Local>, interval_count: Option<u64>) -> Option<Occurrence> {
        if let Some(end) = self.end_at {
            if boundary > end {
                return None;
            }
        }
        let slot_key = self.slot_key_for(boundary, interval_count);
        let fire_time = self.apply_jitter(boundary);
        Some(Occurrence {
            boundary,
            fire_time,
            slot_key,
            interval_count,
        })
    }

    /// Add a non-negative random millisecond offset in `[0, jitter_ms)`,
    /// clamped so the slot never crosses into the next boundary period (§4.2).
    fn apply_jitter(&self, boundary: DateTime<Local>) -> DateTime<Local> {
        if self.jitter_ms == 0 {
            return boundary;
        }
        let period_ms = self.approximate_period_ms();
        let cap = period_ms.map(|p| self.jitter_ms.min(p.saturating_sub(1))).unwrap_or(self.jitter_ms);
        if cap == 0 {
            return boundary;
        }
        let offset = rand::Rng::gen_range(&mut rand::thread_rng(), 0..cap);
        boundary + chrono::Duration::milliseconds(offset as i64)
    }

    fn approximate_period_ms(&self) -> Option<u64> {
        match &self.kind {
            ScheduleKind::OneShot { .. } => None,
            ScheduleKind::Interval { every_secs } => Some(every_secs * 1000),
            ScheduleKind::Daily { .. } => Some(24 * 3600 * 1000),
            ScheduleKind::Weekly { .. } => Some(24 * 3600 * 1000),
        }
    }

    /// Slot key for a boundary instant (§4.2). The offset suffix on
    /// daily/weekly slots makes DST-shifted times distinguishable from their
    /// neighbors (testable property 6).
    pub fn slot_key_for(&self, boundary: DateTime<Local>, interval_count: Option<u64>) -> String {
        match &self.kind {
            ScheduleKind::OneShot { run_at } => format!("oneShot:{}", run_at.to_rfc3339()),
            ScheduleKind::Interval { .. } => {
                format!("interval:{}", interval_count.unwrap_or_default())
            }
            ScheduleKind::Daily { .. } => {
                let in_tz = boundary.with_timezone(&self.tz());
                format!(
                    "daily:{}T{:02}:{:02}{}",
                    in_tz.date_naive(),
                    in_tz.hour(),
                    in_tz.minute(),
                    in_tz.format("%:z")
                )
            }
            ScheduleKind::Weekly { .. } => {
                let in_tz = boundary.with_timezone(&self.tz());
                format!(
                    "weekly:{}T{:02}:{:02}{}",
                    in_tz.date_naive(),
                    in_tz.hour(),
                    in_tz.minute(),
                    in_tz.format("%:z")
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(y: i32, m: u32, d: u32, h: u32, mi: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, mi, 0).single().unwrap()
    }

    #[test]
    fn interval_rejects_too_short_period() {
        let err = ScheduleSpec::new(
            "s1",
            ScheduleKind::Interval { every_secs: 5 },
            "UTC",
        )
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::IntervalTooShort {
                min_secs: 10,
                actual_secs: 5
            }
        );
    }

    #[test]
    fn weekly_rejects_empty_days() {
        let err = ScheduleSpec::new(
            "s1",
            ScheduleKind::Weekly {
                hour: 9,
                minute: 0,
                days_of_week: HashSet::new(),
            },
            "UTC",
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::EmptyDaysOfWeek());
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let err = ScheduleSpec::new(
            "s1",
            ScheduleKind::Daily { hour: 9, minute: 0 },
            "Not/AZone",
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::UnknownTimezone(_)));
    }

    #[test]
    fn daily_next_occurrence_same_day_if_before_slot() {
        let spec = ScheduleSpec::new("s1", ScheduleKind::Daily { hour: 9, minute: 0 }, "UTC").unwrap();
        let reference = local(2026, 7, 27, 8, 0);
        let occ = spec.next_occurrence_after(reference).unwrap();
        assert_eq!(occ.boundary, local(2026, 7, 27, 9, 0));
    }

    #[test]
    fn daily_next_occurrence_rolls_to_tomorrow_if_after_slot() {
        let spec = ScheduleSpec::new("s1", ScheduleKind::Daily { hour: 9, minute: 0 }, "UTC").unwrap();
        let reference = local(2026, 7, 27, 14, 0);
        let occ = spec.next_occurrence_after(reference).unwrap();
        assert_eq!(occ.boundary, local(2026, 7, 28, 9, 0));
    }

    #[test]
    fn interval_k_counts_steps_from_anchor() {
        let spec = ScheduleSpec::new("s1", ScheduleKind::Interval { every_secs: 60 }, "UTC")
            .unwrap()
            .with_start_at(local(2026, 7, 27, 0, 0));
        let reference = local(2026, 7, 27, 0, 2); // 120s after anchor
        let occ = spec.next_occurrence_after(reference).unwrap();
        // 120/60 + 1 = 3rd step => boundary at +3min
        assert_eq!(occ.interval_count, Some(3));
        assert_eq!(occ.boundary, local(2026, 7, 27, 0, 3));
    }

    #[test]
    fn weekly_skips_to_day_after_reference_even_if_same_dow() {
        // 2026-07-27 is a Monday (dow=1). Schedule only fires on Monday.
        let mut days = HashSet::new();
        days.insert(1u8);
        let spec = ScheduleSpec::new(
            "s1",
            ScheduleKind::Weekly {
                hour: 9,
                minute: 0,
                days_of_week: days,
            },
            "UTC",
        )
        .unwrap();
        let reference = local(2026, 7, 27, 8, 0); // same Monday, before 9am
        let occ = spec.next_occurrence_after(reference).unwrap();
        // Spec: search starts the day AFTER reference, so this lands a week later.
        assert_eq!(occ.boundary, local(2026, 8, 3, 9, 0));
    }

    #[test]
    fn slot_key_includes_offset_suffix() {
        let spec = ScheduleSpec::new("s1", ScheduleKind::Daily { hour: 9, minute: 0 }, "UTC").unwrap();
        let key = spec.slot_key_for(local(2026, 7, 27, 9, 0), None);
        assert!(key.starts_with("daily:2026-07-27T09:00"));
        assert!(key.ends_with("+00:00"));
    }

    // Invariant 6: two daily slots straddling a DST transition get distinct
    // slot keys because the UTC offset suffix differs, even though the wall
    // clock reads "09:00" on both sides.
    #[test]
    fn slot_key_offset_suffix_differs_across_dst_boundary() {
        let spec = ScheduleSpec::new("s1", ScheduleKind::Daily { hour: 9, minute: 0 }, "America/New_York").unwrap();

        // US spring-forward in 2026 lands at 2026-03-08 07:00 UTC (2:00 AM
        // EST -> 3:00 AM EDT). Build the two instants in UTC so the test
        // doesn't depend on the host's local timezone.
        let before = chrono::Utc.with_ymd_and_hms(2026, 3, 7, 9, 0, 0).single().unwrap().with_timezone(&Local);
        let after = chrono::Utc.with_ymd_and_hms(2026, 3, 9, 9, 0, 0).single().unwrap().with_timezone(&Local);

        let key_before = spec.slot_key_for(before, None);
        let key_after = spec.slot_key_for(after, None);

        assert_ne!(key_before, key_after, "slot keys must differ across the DST boundary");
        assert!(key_before.ends_with("-05:00"), "pre-DST offset should be EST (-05:00), got {key_before}");
        assert!(key_after.ends_with("-04:00"), "post-DST offset should be EDT (-04:00), got {key_after}");
    }

    #[test]
    fn candidate_past_end_at_yields_no_occurrence() {
        let spec = ScheduleSpec::new("s1", ScheduleKind::Daily { hour: 9, minute: 0 }, "UTC")
            .unwrap()
            .with_end_at(local(2026, 7, 27, 0, 0));
        let reference = local(2026, 7, 27, 8, 0);
        assert!(spec.next_occurrence_after(reference).is_none());
    }

    #[test]
    fn one_shot_has_no_next_occurrence_once_fired() {
        let mut spec = ScheduleSpec::new(
            "s1",
            ScheduleKind::OneShot {
                run_at: local(2026, 7, 27, 9, 0),
            },
            "UTC",
        )
        .unwrap();
        assert!(spec.next_occurrence_after(local(2026, 7, 27, 0, 0)).is_some());
        spec.last_fired_slot_key = Some("oneShot:anything".into());
        assert!(spec.next_occurrence_after(local(2026, 7, 27, 0, 0)).is_none());
    }
}
