//! Time source for the stream engine, injected so `batchTimeout` /
//! `streamTimeout` can be exercised in tests without real sleeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Production clock: milliseconds elapsed since construction. Connections
/// are short-lived relative to process uptime, so relative-to-start millis
/// are all the engine ever needs — it never compares against wall-clock
/// time from another connection.
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Deterministic clock for tests: each call advances by a fixed step and
/// returns the new value, simulating wall-clock time passing once per loop
/// iteration without an actual sleep.
pub struct FakeClock {
    current_ms: AtomicU64,
    step_ms: u64,
}

impl FakeClock {
    pub fn new(step_ms: u64) -> Self {
        Self { current_ms: AtomicU64::new(0), step_ms }
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        self.current_ms.fetch_add(self.step_ms, Ordering::SeqCst) + self.step_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fake_clock_advances_monotonically() {
        let clock = FakeClock::new(100);
        assert_eq!(clock.now_ms(), 100);
        assert_eq!(clock.now_ms(), 200);
        assert_eq!(clock.now_ms(), 300);
    }
}
