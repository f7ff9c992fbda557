//! Min-heap-ordered evaluator of [`ScheduleSpec`]s (§4.3).
//!
//! Fan-out to subscribers goes over a `tokio::sync::broadcast` channel, but
//! the heap itself is plain, synchronous, owned state: §5 requires `tick` to
//! be atomic and non-reentrant, so there is no internal locking here —
//! callers (chiefly [`crate::schedule::SchedulerBridge`]) own the single
//! right to call `tick` and serialise it themselves.

use std::collections::{BinaryHeap, HashMap};

use chrono::{DateTime, Local};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::error::ScheduleError;
use super::spec::{CatchUpPolicy, DedupeStrategy, Occurrence, ScheduleKind, ScheduleSpec};

/// Safety bound on how far a single schedule's catch-up walk may advance
/// within one `tick`, independent of `max_catch_up_executions` (which bounds
/// *emissions*, not occurrences considered). A defensive backstop against a
/// pathological tiny-interval schedule paired with a huge catch-up window.
const MAX_CATCH_UP_WALK: usize = 100_000;

/// One emission of a scheduled fire (§3).
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledFire {
    pub schedule_id: String,
    pub slot_key: String,
    pub scheduled_for: DateTime<Local>,
    pub is_catch_up: bool,
    pub interval_count: Option<u64>,
}

impl ScheduledFire {
    /// Convert into an [`crate::model::Event`] ready for [`crate::engine::Engine::process_event`].
    pub fn into_event(self) -> crate::model::Event {
        let mut event = crate::model::Event::new(crate::model::EventKind::Scheduled, self.scheduled_for);
        event.schedule_id = Some(self.schedule_id);
        event.slot_key = Some(self.slot_key);
        event.scheduled_for = Some(self.scheduled_for);
        event.is_catch_up = self.is_catch_up;
        event
    }
}

#[derive(Debug, Clone)]
struct HeapEntry {
    fire_time: DateTime<Local>,
    boundary: DateTime<Local>,
    slot_key: String,
    interval_count: Option<u64>,
    schedule_id: String,
    generation: u64,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.fire_time == other.fire_time && self.schedule_id == other.schedule_id
    }
}
impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    // `BinaryHeap` is a max-heap; reverse the comparison so the earliest
    // `fire_time` sorts as the "greatest" element and pops first.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .fire_time
            .cmp(&self.fire_time)
            .then_with(|| other.schedule_id.cmp(&self.schedule_id))
    }
}

impl HeapEntry {
    fn from_occurrence(schedule_id: &str, occ: &Occurrence, generation: u64) -> Self {
        Self {
            fire_time: occ.fire_time,
            boundary: occ.boundary,
            slot_key: occ.slot_key.clone(),
            interval_count: occ.interval_count,
            schedule_id: schedule_id.to_string(),
            generation,
        }
    }
}

/// Min-heap-ordered evaluator of [`ScheduleSpec`]s; emits [`ScheduledFire`]s on [`Scheduler::tick`].
pub struct Scheduler {
    specs: HashMap<String, ScheduleSpec>,
    heap: BinaryHeap<HeapEntry>,
    generations: HashMap<String, u64>,
    fire_tx: broadcast::Sender<ScheduledFire>,
    max_process_per_tick: usize,
    catch_up_freshness_window: chrono::Duration,
}

impl Scheduler {
    pub fn new(max_process_per_tick: usize, catch_up_freshness_window: std::time::Duration) -> Self {
        let (fire_tx, _rx) = broadcast::channel(256);
        Self {
            specs: HashMap::new(),
            heap: BinaryHeap::new(),
            generations: HashMap::new(),
            fire_tx,
            max_process_per_tick,
            catch_up_freshness_window: chrono::Duration::from_std(catch_up_freshness_window)
                .unwrap_or_else(|_| chrono::Duration::seconds(300)),
        }
    }

    /// Subscribe to the broadcast stream of fires. Emissions within one
    /// `tick` are delivered in non-decreasing `fire_time` order (§5).
    pub fn fire_events(&self) -> broadcast::Receiver<ScheduledFire> {
        self.fire_tx.subscribe()
    }

    /// Read-only snapshot of all registered specs, for inspection or persistence.
    pub fn schedules(&self) -> Vec<ScheduleSpec> {
        self.specs.values().cloned().collect()
    }

    /// Snapshot ready to hand to `Store::persist_schedules`.
    pub fn persist_snapshot(&self) -> Vec<ScheduleSpec> {
        self.schedules()
    }

    /// Register `spec`, replacing any existing entry with the same id. If
    /// enabled and active, computes the next occurrence and enqueues it.
    pub fn register(&mut self, spec: ScheduleSpec, now: DateTime<Local>) {
        let id = spec.id.clone();
        let generation = self.generations.entry(id.clone()).or_insert(0);
        *generation += 1;
        let generation = *generation;

        let should_enqueue = spec.enabled && spec.is_active_at(now);
        self.specs.insert(id.clone(), spec);

        if should_enqueue {
            // Borrow the just-inserted spec back out to compute its first occurrence.
            let spec_ref = self.specs.get(&id).expect("just inserted");
            if let Some(occ) = spec_ref.first_occurrence_at_or_after(now) {
                self.heap.push(HeapEntry::from_occurrence(&id, &occ, generation));
            }
        }
    }

    /// Remove a schedule and any pending heap entry for it.
    pub fn unregister(&mut self, id: &str) -> Result<(), ScheduleError> {
        if self.specs.remove(id).is_none() {
            return Err(ScheduleError::NotFound(id.to_string()));
        }
        // Bump generation so any pending heap entry becomes a stale tombstone.
        *self.generations.entry(id.to_string()).or_insert(0) += 1;
        Ok(())
    }

    /// Semantically `unregister` then `register`, preserving `last_fired_slot_key`
    /// and `last_evaluated_at` (§4.3).
    pub fn update(&mut self, mut spec: ScheduleSpec, now: DateTime<Local>) {
        if let Some(existing) = self.specs.get(&spec.id) {
            spec.last_fired_slot_key = existing.last_fired_slot_key.clone();
            spec.last_evaluated_at = existing.last_evaluated_at;
        }
        self.register(spec, now);
    }

    /// Reload all specs (e.g. after process restart) and rebuild the heap from scratch.
    pub fn resync_from_store(&mut self, specs: Vec<ScheduleSpec>, now: DateTime<Local>) {
        self.specs.clear();
        self.heap.clear();
        self.generations.clear();
        for spec in specs {
            self.register(spec, now);
        }
    }

    /// Drain every heap entry with `fire_time <= now`, up to
    /// `max_process_per_tick` entries, applying each schedule's catch-up
    /// policy (§4.3). Returns the fires produced, also broadcast on
    /// [`Scheduler::fire_events`] in the same (non-decreasing `fire_time`) order.
    pub fn tick(&mut self, now: DateTime<Local>) -> Vec<ScheduledFire> {
        let mut fires: Vec<ScheduledFire> = Vec::new();
        let mut iterations = 0usize;

        while iterations < self.max_process_per_tick {
            let Some(top) = self.heap.peek() else { break };
            if top.fire_time > now {
                break;
            }
            iterations += 1;
            let entry = self.heap.pop().expect("peeked Some above");

            let current_generation = self.generations.get(&entry.schedule_id).copied().unwrap_or(0);
            if entry.generation != current_generation {
                debug!(schedule_id = %entry.schedule_id, "skipping stale heap tombstone");
                continue;
            }
            let Some(mut spec) = self.specs.get(&entry.schedule_id).cloned() else {
                warn!(schedule_id = %entry.schedule_id, "heap entry referenced unknown schedule, skipping");
                continue;
            };
            if !spec.enabled {
                continue;
            }

            if matches!(spec.kind, ScheduleKind::OneShot { .. }) {
                self.process_one_shot(&mut spec, &entry, now, &mut fires);
            } else {
                self.process_recurring(&mut spec, &entry, now, &mut fires);
            }
            self.specs.insert(entry.schedule_id.clone(), spec);
        }

        if iterations >= self.max_process_per_tick {
            warn!(
                cap = self.max_process_per_tick,
                "scheduler tick hit its iteration cap; remaining entries deferred to the next tick"
            );
        }

        fires.sort_by_key(|f| f.scheduled_for);
        for fire in &fires {
            let _ = self.fire_tx.send(fire.clone());
        }
        fires
    }

    fn process_one_shot(
        &mut self,
        spec: &mut ScheduleSpec,
        entry: &HeapEntry,
        now: DateTime<Local>,
        fires: &mut Vec<ScheduledFire>,
    ) {
        if spec.is_active_at(now) && spec.last_fired_slot_key.is_none() {
            fires.push(ScheduledFire {
                schedule_id: entry.schedule_id.clone(),
                slot_key: entry.slot_key.clone(),
                scheduled_for: entry.boundary,
                is_catch_up: false,
                interval_count: None,
            });
            spec.last_fired_slot_key = Some(entry.slot_key.clone());
            spec.last_evaluated_at = Some(entry.boundary);
        }
        // Never re-enqueued, fired or not.
    }

    fn process_recurring(
        &mut self,
        spec: &mut ScheduleSpec,
        entry: &HeapEntry,
        now: DateTime<Local>,
        fires: &mut Vec<ScheduledFire>,
    ) {
        let generation = self.generations.get(&entry.schedule_id).copied().unwrap_or(0);
        let first_occ = Occurrence {
            boundary: entry.boundary,
            fire_time: entry.fire_time,
            slot_key: entry.slot_key.clone(),
            interval_count: entry.interval_count,
        };

        let next_to_enqueue = match spec.catch_up_policy {
            CatchUpPolicy::None => self.dispatch_none(spec, &first_occ, now, fires),
            CatchUpPolicy::LastOnly => self.dispatch_last_only(spec, &first_occ, now, fires),
            CatchUpPolicy::AllWithinWindow => self.dispatch_all_within_window(spec, &first_occ, now, fires),
        };

        if let Some(occ) = next_to_enqueue {
            self.heap.push(HeapEntry::from_occurrence(&entry.schedule_id, &occ, generation));
        }
    }

    fn dispatch_none(
        &self,
        spec: &mut ScheduleSpec,
        first_occ: &Occurrence,
        now: DateTime<Local>,
        fires: &mut Vec<ScheduledFire>,
    ) -> Option<Occurrence> {
        let is_fresh = (now - first_occ.boundary) <= self.catch_up_freshness_window;
        if is_fresh {
            if spec.is_active_at(now) && !dedupe_blocks(spec, &first_occ.slot_key) {
                emit(spec, &entry_schedule_id(spec), first_occ, false, fires);
            }
            spec.next_occurrence_after(first_occ.boundary)
        } else {
            match spec.first_occurrence_at_or_after(now) {
                Some(occ) => {
                    let still_fresh =
                        occ.boundary <= now && (now - occ.boundary) <= self.catch_up_freshness_window;
                    if still_fresh && spec.is_active_at(now) && !dedupe_blocks(spec, &occ.slot_key) {
                        emit(spec, &entry_schedule_id(spec), &occ, false, fires);
                        spec.next_occurrence_after(occ.boundary)
                    } else {
                        Some(occ)
                    }
                }
                None => None,
            }
        }
    }

    fn dispatch_last_only(
        &self,
        spec: &mut ScheduleSpec,
        first_occ: &Occurrence,
        now: DateTime<Local>,
        fires: &mut Vec<ScheduledFire>,
    ) -> Option<Occurrence> {
        let mut best: Option<Occurrence> = None;
        let mut cursor = first_occ.clone();
        let mut guard = 0usize;

        loop {
            guard += 1;
            if guard > MAX_CATCH_UP_WALK || cursor.boundary > now {
                break;
            }
            if spec.is_active_at(now) && !dedupe_blocks(spec, &cursor.slot_key) {
                best = Some(cursor.clone());
            }
            match spec.next_occurrence_after(cursor.boundary) {
                Some(next) => cursor = next,
                None => break,
            }
        }

        match best {
            Some(won) => {
                emit(spec, &entry_schedule_id(spec), &won, true, fires);
                spec.next_occurrence_after(won.boundary)
            }
            None => spec.first_occurrence_at_or_after(now),
        }
    }

    fn dispatch_all_within_window(
        &self,
        spec: &mut ScheduleSpec,
        first_occ: &Occurrence,
        now: DateTime<Local>,
        fires: &mut Vec<ScheduledFire>,
    ) -> Option<Occurrence> {
        let window_start = now - chrono::Duration::seconds(spec.catch_up_window_secs as i64);
        let mut cursor = first_occ.clone();
        let mut emitted = 0u32;
        let mut is_first = true;
        let mut guard = 0usize;

        loop {
            guard += 1;
            if guard > MAX_CATCH_UP_WALK {
                warn!(schedule_id = %spec.id, "catch-up walk hit internal safety bound");
                break;
            }
            if cursor.boundary > now {
                return Some(cursor);
            }
            if cursor.boundary >= window_start && emitted < spec.max_catch_up_executions {
                if spec.is_active_at(now) && !dedupe_blocks(spec, &cursor.slot_key) {
                    emit(spec, &entry_schedule_id(spec), &cursor, !is_first, fires);
                    emitted += 1;
                    is_first = false;
                }
            }
            match spec.next_occurrence_after(cursor.boundary) {
                Some(next) => cursor = next,
                None => return None,
            }
        }
        None
    }
}

fn already_fired(spec: &ScheduleSpec, slot_key: &str) -> bool {
    spec.last_fired_slot_key.as_deref() == Some(slot_key)
}

/// Whether `spec.dedupe_strategy` forbids re-firing `slot_key`. Under
/// `DedupeStrategy::None` a spec may re-fire the same slot across catch-up
/// walks; under `BySlot` the last-fired slot is a hard block (§3: "never
/// emits two `ScheduledFire`s with equal `slot_key`").
fn dedupe_blocks(spec: &ScheduleSpec, slot_key: &str) -> bool {
    spec.dedupe_strategy == DedupeStrategy::BySlot && already_fired(spec, slot_key)
}

fn entry_schedule_id(spec: &ScheduleSpec) -> String {
    spec.id.clone()
}

fn emit(
    spec: &mut ScheduleSpec,
    schedule_id: &str,
    occ: &Occurrence,
    is_catch_up: bool,
    fires: &mut Vec<ScheduledFire>,
) {
    fires.push(ScheduledFire {
        schedule_id: schedule_id.to_string(),
        slot_key: occ.slot_key.clone(),
        scheduled_for: occ.boundary,
        is_catch_up,
        interval_count: occ.interval_count,
    });
    spec.last_fired_slot_key = Some(occ.slot_key.clone());
    spec.last_evaluated_at = Some(occ.boundary);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration as StdDuration;

    fn local(y: i32, m: u32, d: u32, h: u32, mi: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, mi, 0).single().unwrap()
    }

    fn scheduler() -> Scheduler {
        Scheduler::new(100, StdDuration::from_secs(300))
    }

    #[test]
    fn one_shot_fires_once_and_is_not_reenqueued() {
        let mut sched = scheduler();
        let now = local(2026, 7, 27, 9, 0);
        let spec = ScheduleSpec::new(
            "once",
            ScheduleKind::OneShot { run_at: now },
            "UTC",
        )
        .unwrap();
        sched.register(spec, now - chrono::Duration::minutes(1));

        let fires = sched.tick(now);
        assert_eq!(fires.len(), 1);
        assert_eq!(fires[0].schedule_id, "once");

        let fires_again = sched.tick(now + chrono::Duration::hours(1));
        assert!(fires_again.is_empty());
    }

    #[test]
    fn scenario_s2_catch_up_none_after_time_jump_produces_zero_fires() {
        // Daily(09:00), CatchUpPolicy::None. App backgrounded 08:30, resumed 14:00 same day.
        let mut sched = scheduler();
        let register_time = local(2026, 7, 27, 8, 30);
        let spec = ScheduleSpec::new("daily-09", ScheduleKind::Daily { hour: 9, minute: 0 }, "UTC")
            .unwrap()
            .with_catch_up(CatchUpPolicy::None, StdDuration::from_secs(300));
        sched.register(spec, register_time);

        let resume_time = local(2026, 7, 27, 14, 0);
        let fires = sched.tick(resume_time);
        assert!(fires.is_empty(), "09:00 is stale by more than 5 minutes: {fires:?}");

        let specs = sched.schedules();
        let spec = &specs[0];
        // Next occurrence should be tomorrow at 09:00, not today.
        let next = spec.next_occurrence_after(resume_time).unwrap();
        assert_eq!(next.boundary, local(2026, 7, 28, 9, 0));
    }

    #[test]
    fn scenario_s3_catch_up_last_only_over_weekend() {
        // Daily(09:00) LastOnly; last fire Friday 09:00; app resumes Monday 10:00.
        let mut sched = scheduler();
        let friday_9am = local(2026, 7, 24, 9, 0); // Friday
        let mut spec = ScheduleSpec::new("daily-09", ScheduleKind::Daily { hour: 9, minute: 0 }, "UTC")
            .unwrap()
            .with_catch_up(CatchUpPolicy::LastOnly, StdDuration::from_secs(300));
        spec.last_fired_slot_key = Some(spec.slot_key_for(friday_9am, None));
        spec.last_evaluated_at = Some(friday_9am);
        sched.register(spec, friday_9am);

        let monday_10am = local(2026, 7, 27, 10, 0);
        let fires = sched.tick(monday_10am);

        assert_eq!(fires.len(), 1, "{fires:?}");
        assert!(fires[0].is_catch_up);
        assert_eq!(fires[0].scheduled_for, local(2026, 7, 27, 9, 0));

        let specs = sched.schedules();
        let next = specs[0].next_occurrence_after(local(2026, 7, 27, 9, 0)).unwrap();
        assert_eq!(next.boundary, local(2026, 7, 28, 9, 0));
    }

    #[test]
    fn dedupe_strategy_none_allows_refire_under_catch_up_none() {
        // Daily(09:00), CatchUpPolicy::None. The slot about to be popped was
        // already recorded as fired (simulating a spec re-registered without
        // the heap having advanced past it yet). BySlot must block it;
        // DedupeStrategy::None must let it fire again.
        let today_9am = local(2026, 7, 27, 9, 0);
        let register_time = today_9am - chrono::Duration::minutes(1);
        let tick_time = today_9am + chrono::Duration::minutes(1);

        let make_spec = |dedupe: DedupeStrategy| {
            let mut spec = ScheduleSpec::new("daily-09", ScheduleKind::Daily { hour: 9, minute: 0 }, "UTC")
                .unwrap()
                .with_catch_up(CatchUpPolicy::None, StdDuration::from_secs(300))
                .with_dedupe_strategy(dedupe);
            spec.last_fired_slot_key = Some(spec.slot_key_for(today_9am, None));
            spec
        };

        let mut by_slot = scheduler();
        by_slot.register(make_spec(DedupeStrategy::BySlot), register_time);
        assert!(
            by_slot.tick(tick_time).is_empty(),
            "BySlot must not re-fire a slot already recorded as fired"
        );

        let mut none_dedupe = scheduler();
        none_dedupe.register(make_spec(DedupeStrategy::None), register_time);
        let fires = none_dedupe.tick(tick_time);
        assert_eq!(
            fires.len(),
            1,
            "DedupeStrategy::None must allow re-firing a slot matching last_fired_slot_key"
        );
    }

    #[test]
    fn dedupe_strategy_none_allows_refire_under_catch_up_last_only() {
        // Daily(09:00), CatchUpPolicy::LastOnly. Same already-fired slot is
        // the only eligible "best" candidate within the walk.
        let today_9am = local(2026, 7, 27, 9, 0);
        let register_time = today_9am - chrono::Duration::minutes(1);
        let tick_time = today_9am + chrono::Duration::minutes(5);

        let make_spec = |dedupe: DedupeStrategy| {
            let mut spec = ScheduleSpec::new("daily-09", ScheduleKind::Daily { hour: 9, minute: 0 }, "UTC")
                .unwrap()
                .with_catch_up(CatchUpPolicy::LastOnly, StdDuration::from_secs(300))
                .with_dedupe_strategy(dedupe);
            spec.last_fired_slot_key = Some(spec.slot_key_for(today_9am, None));
            spec.last_evaluated_at = Some(today_9am);
            spec
        };

        let mut by_slot = scheduler();
        by_slot.register(make_spec(DedupeStrategy::BySlot), register_time);
        assert!(
            by_slot.tick(tick_time).is_empty(),
            "BySlot must not re-fire a slot already recorded as fired"
        );

        let mut none_dedupe = scheduler();
        none_dedupe.register(make_spec(DedupeStrategy::None), register_time);
        let fires = none_dedupe.tick(tick_time);
        assert_eq!(
            fires.len(),
            1,
            "DedupeStrategy::None must allow re-firing the same slot under LastOnly"
        );
        assert!(fires[0].is_catch_up);
    }

    #[test]
    fn dedup_by_slot_never_double_fires_a_slot_across_ticks() {
        let mut sched = scheduler();
        let start = local(2026, 7, 27, 0, 0);
        let spec = ScheduleSpec::new("interval-60", ScheduleKind::Interval { every_secs: 60 }, "UTC")
            .unwrap()
            .with_start_at(start);
        sched.register(spec, start);

        let mut seen = std::collections::HashSet::new();
        let mut t = start;
        for _ in 0..10 {
            t += chrono::Duration::seconds(30);
            for fire in sched.tick(t) {
                assert!(seen.insert(fire.slot_key.clone()), "duplicate slot_key {}", fire.slot_key);
            }
        }
        assert!(!seen.is_empty());
    }

    #[test]
    fn tick_emits_fires_in_nondecreasing_fire_time_order() {
        let mut sched = scheduler();
        let start = local(2026, 7, 27, 0, 0);
        for (id, every) in [("a", 60u64), ("b", 90), ("c", 45)] {
            let spec = ScheduleSpec::new(id, ScheduleKind::Interval { every_secs: every }, "UTC")
                .unwrap()
                .with_start_at(start);
            sched.register(spec, start);
        }
        let fires = sched.tick(start + chrono::Duration::minutes(10));
        for pair in fires.windows(2) {
            assert!(pair[0].scheduled_for <= pair[1].scheduled_for);
        }
    }

    #[test]
    fn all_within_window_caps_at_max_catch_up_executions() {
        let mut sched = scheduler();
        let start = local(2026, 7, 27, 0, 0);
        let spec = ScheduleSpec::new("interval-10s", ScheduleKind::Interval { every_secs: 10 }, "UTC")
            .unwrap()
            .with_start_at(start)
            .with_catch_up(CatchUpPolicy::AllWithinWindow, StdDuration::from_secs(3600))
            .with_max_catch_up_executions(3);
        sched.register(spec, start);

        // Jump far into the future without ticking in between: many 10s slots are missed.
        let later = start + chrono::Duration::minutes(30);
        let fires = sched.tick(later);
        assert_eq!(fires.len(), 3, "{fires:?}");
        assert!(!fires[0].is_catch_up, "first emission is not flagged catch-up");
        assert!(fires[1].is_catch_up && fires[2].is_catch_up);
    }

    #[test]
    fn unregister_removes_pending_heap_entry() {
        let mut sched = scheduler();
        let now = local(2026, 7, 27, 9, 0);
        let spec = ScheduleSpec::new("once", ScheduleKind::OneShot { run_at: now }, "UTC").unwrap();
        sched.register(spec, now - chrono::Duration::minutes(1));
        sched.unregister("once").unwrap();
        let fires = sched.tick(now);
        assert!(fires.is_empty());
    }

    #[test]
    fn unregister_unknown_id_errors() {
        let mut sched = scheduler();
        assert!(matches!(sched.unregister("missing"), Err(ScheduleError::NotFound(_))));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        // Invariant 1: no slot_key is ever emitted twice for a given schedule,
        // regardless of how ticks are spaced.
        proptest! {
            #[test]
            fn interval_schedule_never_repeats_a_slot_key(
                every_secs in 10u64..=120,
                tick_gaps in prop::collection::vec(1u64..=200, 1..30),
            ) {
                let mut sched = scheduler();
                let start = local(2026, 7, 27, 0, 0);
                let spec = ScheduleSpec::new("interval", ScheduleKind::Interval { every_secs }, "UTC")
                    .unwrap()
                    .with_start_at(start);
                sched.register(spec, start);

                let mut seen = std::collections::HashSet::new();
                let mut t = start;
                for gap in tick_gaps {
                    t += chrono::Duration::seconds(gap as i64);
                    for fire in sched.tick(t) {
                        prop_assert!(seen.insert(fire.slot_key.clone()), "duplicate slot_key {}", fire.slot_key);
                    }
                }
            }
        }

        // Invariant 2: within one tick, emitted fires are ordered by
        // non-decreasing scheduled_for regardless of registration order or
        // how many schedules with arbitrary intervals are mixed in.
        proptest! {
            #[test]
            fn tick_output_is_always_ordered_by_scheduled_for(
                intervals in prop::collection::vec(10u64..=300, 1..8),
                jump_secs in 1u64..=2000,
            ) {
                let mut sched = scheduler();
                let start = local(2026, 7, 27, 0, 0);
                for (i, every) in intervals.into_iter().enumerate() {
                    let spec = ScheduleSpec::new(format!("s{i}"), ScheduleKind::Interval { every_secs: every }, "UTC")
                        .unwrap()
                        .with_start_at(start);
                    sched.register(spec, start);
                }
                let fires = sched.tick(start + chrono::Duration::seconds(jump_secs as i64));
                for pair in fires.windows(2) {
                    prop_assert!(pair[0].scheduled_for <= pair[1].scheduled_for);
                }
            }
        }
    }
}
