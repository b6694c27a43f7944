//! Clock abstraction for time-derived state.
//!
//! Schedule status is a pure function of wall-clock time, so every
//! component that derives it takes an injected clock rather than calling
//! `Timestamp::now()` directly.

use std::sync::Mutex;

use chrono::Duration;

use super::Timestamp;

/// Source of the current instant.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> Timestamp;
}

/// Clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Manually driven clock for deterministic tests and simulations.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<Timestamp>,
}

impl ManualClock {
    /// Creates a clock frozen at the given instant.
    pub fn new(start: Timestamp) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    /// Moves the clock to an absolute instant.
    pub fn set(&self, to: Timestamp) {
        *self.lock() = to;
    }

    /// Advances the clock by the given duration.
    pub fn advance(&self, by: Duration) {
        let mut current = self.lock();
        *current = current.plus(by);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Timestamp> {
        // A poisoned clock still holds a valid instant.
        self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_returns_start() {
        let start = Timestamp::from_unix_secs(1_000);
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn manual_clock_advances_and_sets() {
        let clock = ManualClock::new(Timestamp::from_unix_secs(1_000));

        clock.advance(Duration::seconds(5));
        assert_eq!(clock.now().as_unix_secs(), 1_005);

        clock.set(Timestamp::from_unix_secs(42));
        assert_eq!(clock.now().as_unix_secs(), 42);
    }

    #[test]
    fn system_clock_is_close_to_now() {
        let before = Timestamp::now();
        let now = SystemClock.now();
        assert!(!now.is_before(&before));
    }
}
