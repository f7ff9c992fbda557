//! Abstract source of wall-clock time (§4.1).
//!
//! All time-dependent logic in this crate reads through [`Clock`] rather than
//! calling `Local::now()` directly, so that scheduler and engine behavior is
//! deterministic under test. Monotonic deadlines for throttling use the same
//! clock — there is deliberately no separate `Instant`-based timer, since a
//! `FakeClock` needs to drive both.

use std::sync::Mutex;

use chrono::{DateTime, Local};

/// Provides the current wall-clock time with a local timezone offset.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Local>;
}

/// The default [`Clock`], backed by the system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A [`Clock`] whose time is set explicitly, for deterministic tests.
///
/// Unlike [`SystemClock`], `now()` never changes on its own — call
/// [`FakeClock::advance`] or [`FakeClock::set`] to move it forward.
pub struct FakeClock {
    current: Mutex<DateTime<Local>>,
}

impl FakeClock {
    /// Construct a fake clock starting at `start`.
    pub fn new(start: DateTime<Local>) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: chrono::Duration) {
        let mut guard = self.current.lock().unwrap();
        *guard += delta;
    }

    /// Jump the clock to an explicit instant (may move it backward; used to
    /// simulate a device clock correction, not a normal code path).
    pub fn set(&self, at: DateTime<Local>) {
        *self.current.lock().unwrap() = at;
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Local> {
        *self.current.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_returns_plausible_time() {
        let clock = SystemClock;
        let now = clock.now();
        assert!(now.timestamp() > 1_700_000_000, "clock looks too old: {now}");
    }

    #[test]
    fn fake_clock_advances_by_delta() {
        let start = Local::now();
        let clock = FakeClock::new(start);
        clock.advance(chrono::Duration::seconds(30));
        assert_eq!(clock.now(), start + chrono::Duration::seconds(30));
    }

    #[test]
    fn fake_clock_set_overrides_current_time() {
        let clock = FakeClock::new(Local::now());
        let target = Local::now() + chrono::Duration::days(3);
        clock.set(target);
        assert_eq!(clock.now(), target);
    }
}
