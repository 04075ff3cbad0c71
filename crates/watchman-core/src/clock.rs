//! Wall-clock helpers: timestamp-based identifiers and display timestamps.
//!
//! Ids are the decimal Unix time in milliseconds at creation. Two ids drawn
//! within the same millisecond would collide, so [`IdClock`] hands out
//! strictly increasing values: `max(now_ms, last + 1)`.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Local, Utc};

/// Display format for log timestamps, e.g. `3:07:45 PM`.
pub const DISPLAY_TIME_FORMAT: &str = "%-I:%M:%S %p";

/// Monotonic source of timestamp-based identifiers.
#[derive(Debug, Default)]
pub struct IdClock {
    last: AtomicI64,
}

impl IdClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next identifier, strictly greater than any previously issued by this clock.
    pub fn next_id(&self) -> String {
        self.next_millis(Utc::now().timestamp_millis()).to_string()
    }

    /// Next identifier for which `taken` returns false.
    ///
    /// Ids restored from storage may sit ahead of the local clock, so callers
    /// that require uniqueness within a collection pass a membership check.
    pub fn next_id_excluding(&self, taken: impl Fn(&str) -> bool) -> String {
        loop {
            let id = self.next_id();
            if !taken(&id) {
                return id;
            }
        }
    }

    fn next_millis(&self, now_ms: i64) -> i64 {
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let next = now_ms.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }
}

/// Format an instant as local time for display.
pub fn display_time(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local)
        .format(DISPLAY_TIME_FORMAT)
        .to_string()
}

/// Current local time formatted for display.
pub fn display_now() -> String {
    display_time(Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_strictly_increase_within_same_millisecond() {
        let clock = IdClock::new();
        let a = clock.next_millis(1_000);
        let b = clock.next_millis(1_000);
        let c = clock.next_millis(999);
        assert_eq!(a, 1_000);
        assert_eq!(b, 1_001);
        assert_eq!(c, 1_002);
    }

    #[test]
    fn ids_follow_clock_when_it_moves_ahead() {
        let clock = IdClock::new();
        clock.next_millis(1_000);
        assert_eq!(clock.next_millis(5_000), 5_000);
    }

    #[test]
    fn rapid_ids_are_unique() {
        let clock = IdClock::new();
        let ids: HashSet<String> = (0..1_000).map(|_| clock.next_id()).collect();
        assert_eq!(ids.len(), 1_000);
    }

    #[test]
    fn excluding_skips_taken_ids() {
        let clock = IdClock::new();
        let first = clock.next_id();
        let blocked: i64 = first.parse::<i64>().unwrap() + 1;
        let blocked = blocked.to_string();
        let id = clock.next_id_excluding(|candidate| candidate == blocked);
        assert_ne!(id, blocked);
        assert_ne!(id, first);
    }

    #[test]
    fn display_time_has_meridiem() {
        let shown = display_now();
        assert!(shown.ends_with("AM") || shown.ends_with("PM"), "{shown}");
        assert_eq!(shown.matches(':').count(), 2);
    }
}
