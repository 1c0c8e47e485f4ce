//! Time sources for mutation timestamps and stroke creation times.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

// Use web_time for WASM compatibility
#[cfg(target_arch = "wasm32")]
use web_time::{Instant, SystemTime, UNIX_EPOCH};
#[cfg(not(target_arch = "wasm32"))]
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// A monotonic millisecond clock.
///
/// The store and the rate limiter only ever compare readings from the same
/// clock, so the origin is arbitrary.
pub trait Clock: fmt::Debug {
    /// Current reading in milliseconds.
    fn now_ms(&self) -> f64;
}

/// Clock backed by the platform's monotonic timer.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Hand-driven clock for tests and replay.
///
/// Clones share the same reading, so a test can keep one handle and give
/// another to the store.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    /// Create a clock reading `start` milliseconds.
    pub fn new(start: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn now(&self) -> f64 {
        self.now.get()
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

/// Wall-clock milliseconds since the Unix epoch, used for stroke creation times.
pub fn epoch_millis() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared() {
        let clock = ManualClock::new(10.0);
        let handle = clock.clone();
        handle.advance(5.0);
        assert!((clock.now_ms() - 15.0).abs() < f64::EPSILON);
        clock.set(100.0);
        assert!((handle.now() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_system_clock_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }

    #[test]
    fn test_epoch_millis_positive() {
        assert!(epoch_millis() > 0.0);
    }
}
