//! Mutation gateway: sliding-window rate limiter with a circuit breaker.
//!
//! Every state change passes through [`MutationGateway::admit`]. Update
//! storms from a looping UI are absorbed here as silently dropped
//! mutations; the only trace is a warning in the log and the counters in
//! [`LimiterSnapshot`].
//!
//! Breaker states:
//! - Closed: mutations are counted in the sliding window and accepted.
//! - Open: the window overflowed (or an anomaly was flagged); everything is
//!   rejected until the cooldown deadline passes.

use crate::config::GatewayConfig;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::fmt;

/// How an accepted mutation is booked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MutationMode {
    /// Bump version and timestamp, record undo history.
    #[default]
    Tracked,
    /// Apply the change only. For high-frequency cosmetic updates.
    Silent,
}

/// What happened to a requested mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Accepted and applied.
    Applied,
    /// Deep-equal to current state; nothing to do.
    Unchanged,
    /// Rejected by the rate limiter or open breaker.
    Dropped,
    /// A scalar precondition did not hold.
    Rejected,
}

impl MutationOutcome {
    pub fn is_applied(self) -> bool {
        self == MutationOutcome::Applied
    }
}

/// Breaker state at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BreakerState {
    Closed,
    Open,
}

/// Debug view of the limiter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LimiterSnapshot {
    pub state: BreakerState,
    pub blocked_until: Option<f64>,
    pub remaining_cooldown_ms: f64,
    pub window_occupancy: usize,
    pub window_capacity: usize,
    pub accepted: u64,
    pub dropped: u64,
    pub trips: u64,
    pub enforced: bool,
}

impl LimiterSnapshot {
    pub fn is_open(&self) -> bool {
        self.state == BreakerState::Open
    }
}

/// Sliding-window counter with a cooldown deadline.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    window_ms: f64,
    max_mutations: usize,
    cooldown_ms: f64,
    window: VecDeque<f64>,
    blocked_until: Option<f64>,
    accepted: u64,
    dropped: u64,
    trips: u64,
}

impl RateLimiter {
    pub fn new(window_ms: f64, max_mutations: usize, cooldown_ms: f64) -> Self {
        Self {
            window_ms,
            max_mutations,
            cooldown_ms,
            window: VecDeque::with_capacity(max_mutations),
            blocked_until: None,
            accepted: 0,
            dropped: 0,
            trips: 0,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.window_ms, config.max_mutations, config.cooldown_ms)
    }

    /// Ask to perform `action` at `now_ms`. Returns whether it may proceed.
    pub fn attempt(&mut self, action: &str, now_ms: f64) -> bool {
        self.evict(now_ms);

        if let Some(until) = self.blocked_until {
            if now_ms < until {
                self.dropped = self.dropped.saturating_add(1);
                return false;
            }
            self.blocked_until = None;
            log::debug!("Mutation breaker closed at {:.1}ms", now_ms);
        }

        if self.window.len() >= self.max_mutations {
            self.blocked_until = Some(now_ms + self.cooldown_ms);
            self.trips = self.trips.saturating_add(1);
            self.dropped = self.dropped.saturating_add(1);
            log::warn!(
                "Mutation storm: {} updates within {}ms, blocking for {}ms (last action '{}')",
                self.window.len(),
                self.window_ms,
                self.cooldown_ms,
                action
            );
            return false;
        }

        self.window.push_back(now_ms);
        self.accepted = self.accepted.saturating_add(1);
        true
    }

    /// Count an accepted mutation without enforcing the window.
    pub fn record_unchecked(&mut self) {
        self.accepted = self.accepted.saturating_add(1);
    }

    /// Open the breaker for `cooldown_ms` regardless of window occupancy.
    pub fn trip(&mut self, now_ms: f64, cooldown_ms: f64, reason: &str) {
        let until = now_ms + cooldown_ms;
        self.blocked_until = Some(self.blocked_until.map_or(until, |current| current.max(until)));
        self.trips = self.trips.saturating_add(1);
        log::warn!("Mutation breaker opened for {}ms: {}", cooldown_ms, reason);
    }

    pub fn is_open(&self, now_ms: f64) -> bool {
        self.blocked_until.is_some_and(|until| now_ms < until)
    }

    pub fn snapshot(&self, now_ms: f64) -> LimiterSnapshot {
        let open = self.is_open(now_ms);
        LimiterSnapshot {
            state: if open { BreakerState::Open } else { BreakerState::Closed },
            blocked_until: self.blocked_until,
            remaining_cooldown_ms: self
                .blocked_until
                .map_or(0.0, |until| (until - now_ms).max(0.0)),
            window_occupancy: self
                .window
                .iter()
                .filter(|&&t| now_ms - t < self.window_ms)
                .count(),
            window_capacity: self.max_mutations,
            accepted: self.accepted,
            dropped: self.dropped,
            trips: self.trips,
            enforced: true,
        }
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.blocked_until = None;
        self.accepted = 0;
        self.dropped = 0;
        self.trips = 0;
    }

    fn evict(&mut self, now_ms: f64) {
        while self
            .window
            .front()
            .is_some_and(|&t| now_ms - t >= self.window_ms)
        {
            self.window.pop_front();
        }
    }
}

/// Flags call patterns that look like a render loop.
pub trait AnomalyDetector: fmt::Debug {
    /// Observe an attempted mutation. `Some(reason)` opens the breaker.
    fn observe(&mut self, action: &str, now_ms: f64) -> Option<String>;

    fn reset(&mut self) {}
}

/// Flags the same action repeating too often within a window.
#[derive(Debug, Clone)]
pub struct LoopDetector {
    threshold: usize,
    window_ms: f64,
    recent: HashMap<String, VecDeque<f64>>,
}

impl LoopDetector {
    pub fn new(threshold: usize, window_ms: f64) -> Self {
        Self {
            threshold: threshold.max(1),
            window_ms,
            recent: HashMap::new(),
        }
    }
}

impl AnomalyDetector for LoopDetector {
    fn observe(&mut self, action: &str, now_ms: f64) -> Option<String> {
        let window_ms = self.window_ms;
        let hits = self.recent.entry(action.to_string()).or_default();
        while hits.front().is_some_and(|&t| now_ms - t >= window_ms) {
            hits.pop_front();
        }
        hits.push_back(now_ms);

        if hits.len() < self.threshold {
            return None;
        }
        let count = hits.len();
        hits.clear();
        Some(format!(
            "'{}' repeated {} times within {}ms, likely an update loop",
            action, count, window_ms
        ))
    }

    fn reset(&mut self) {
        self.recent.clear();
    }
}

/// Single choke point for state mutations.
#[derive(Debug)]
pub struct MutationGateway {
    config: GatewayConfig,
    limiter: RateLimiter,
    detector: Option<Box<dyn AnomalyDetector>>,
}

impl Default for MutationGateway {
    fn default() -> Self {
        Self::new(GatewayConfig::default())
    }
}

impl MutationGateway {
    pub fn new(config: GatewayConfig) -> Self {
        let detector: Option<Box<dyn AnomalyDetector>> = if config.detect_loops {
            Some(Box::new(LoopDetector::new(config.loop_threshold, config.loop_window_ms)))
        } else {
            None
        };
        Self {
            limiter: RateLimiter::from_config(&config),
            config,
            detector,
        }
    }

    /// Replace the anomaly detector.
    pub fn set_detector(&mut self, detector: Option<Box<dyn AnomalyDetector>>) {
        self.detector = detector;
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Decide whether `action` may mutate state at `now_ms`.
    ///
    /// Silent mutations still count against the rate window but are not
    /// shown to the anomaly detector: a steady stream of cosmetic updates
    /// (dragging, hover) is expected, not a loop.
    pub fn admit(&mut self, action: &str, mode: MutationMode, now_ms: f64) -> bool {
        if mode == MutationMode::Tracked {
            self.observe(action, now_ms);
        }

        if !self.config.mode.is_enforced() {
            self.limiter.record_unchecked();
            return true;
        }

        let allowed = self.limiter.attempt(action, now_ms);
        if !allowed {
            log::debug!("Dropped mutation '{}' at {:.1}ms", action, now_ms);
        }
        allowed
    }

    fn observe(&mut self, action: &str, now_ms: f64) {
        let Some(detector) = self.detector.as_mut() else {
            return;
        };
        if let Some(reason) = detector.observe(action, now_ms) {
            self.limiter.trip(now_ms, self.config.anomaly_cooldown_ms, &reason);
        }
    }

    /// Open the breaker from outside, e.g. from a host-side loop detector.
    pub fn trip(&mut self, now_ms: f64, cooldown_ms: f64, reason: &str) {
        self.limiter.trip(now_ms, cooldown_ms, reason);
    }

    pub fn snapshot(&self, now_ms: f64) -> LimiterSnapshot {
        LimiterSnapshot {
            enforced: self.config.mode.is_enforced(),
            ..self.limiter.snapshot(now_ms)
        }
    }

    pub fn reset(&mut self) {
        self.limiter.reset();
        if let Some(detector) = self.detector.as_mut() {
            detector.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LimiterMode;

    fn gateway() -> MutationGateway {
        MutationGateway::new(GatewayConfig::default().with_loop_detection(false))
    }

    #[test]
    fn test_eleven_in_window_drops_one() {
        let mut gw = gateway();
        let results: Vec<bool> = (0..11).map(|i| gw.admit("setComponents", MutationMode::Tracked, f64::from(i) * 5.0)).collect();
        assert_eq!(results.iter().filter(|&&ok| ok).count(), 10);
        assert!(!results[10]);

        let snap = gw.snapshot(50.0);
        assert_eq!(snap.accepted, 10);
        assert_eq!(snap.dropped, 1);
        assert!(snap.is_open());
    }

    #[test]
    fn test_cooldown_blocks_then_recovers() {
        let mut gw = gateway();
        for i in 0..11 {
            gw.admit("a", MutationMode::Tracked, f64::from(i));
        }
        // Tripped at t=10, blocked until 260.
        assert!(!gw.admit("a", MutationMode::Tracked, 200.0));
        assert!(!gw.admit("a", MutationMode::Tracked, 259.0));
        assert!(gw.admit("a", MutationMode::Tracked, 260.0));

        let snap = gw.snapshot(260.0);
        assert_eq!(snap.dropped, 3);
        assert_eq!(snap.trips, 1);
        assert!(!snap.is_open());
    }

    #[test]
    fn test_window_slides() {
        let mut limiter = RateLimiter::new(100.0, 2, 250.0);
        assert!(limiter.attempt("a", 0.0));
        assert!(limiter.attempt("a", 50.0));
        // t=0 ages out exactly at the window edge.
        assert!(limiter.attempt("a", 100.0));
        assert!(!limiter.attempt("a", 120.0));
    }

    #[test]
    fn test_snapshot_occupancy() {
        let mut limiter = RateLimiter::new(100.0, 10, 250.0);
        limiter.attempt("a", 0.0);
        limiter.attempt("a", 60.0);
        assert_eq!(limiter.snapshot(70.0).window_occupancy, 2);
        assert_eq!(limiter.snapshot(120.0).window_occupancy, 1);
        assert!((limiter.snapshot(120.0).remaining_cooldown_ms).abs() < f64::EPSILON);
    }

    #[test]
    fn test_loop_detector_trips_breaker() {
        let config = GatewayConfig {
            loop_threshold: 5,
            loop_window_ms: 1000.0,
            anomaly_cooldown_ms: 2000.0,
            ..GatewayConfig::default().with_loop_detection(true)
        };
        let mut gw = MutationGateway::new(config);
        // Spaced out enough to never fill the rate window.
        for i in 0..4 {
            assert!(gw.admit("setSelectedComponent", MutationMode::Tracked, f64::from(i) * 50.0));
        }
        assert!(!gw.admit("setSelectedComponent", MutationMode::Tracked, 200.0));
        let snap = gw.snapshot(200.0);
        assert!(snap.is_open());
        assert!((snap.remaining_cooldown_ms - 2000.0).abs() < f64::EPSILON);
        // Other actions are blocked too while open.
        assert!(!gw.admit("setComponents", MutationMode::Tracked, 1500.0));
        assert!(gw.admit("setComponents", MutationMode::Tracked, 2200.0));
    }

    #[test]
    fn test_silent_mutations_skip_loop_detector() {
        let config = GatewayConfig {
            loop_threshold: 5,
            ..GatewayConfig::default().with_loop_detection(true)
        };
        let mut gw = MutationGateway::new(config);
        // One frame every 16ms stays under the rate window.
        for i in 0..60 {
            assert!(gw.admit("setComponents", MutationMode::Silent, f64::from(i) * 16.0));
        }
        let snap = gw.snapshot(960.0);
        assert_eq!(snap.trips, 0);
        assert_eq!(snap.accepted, 60);
    }

    #[test]
    fn test_loop_detector_per_action() {
        let mut detector = LoopDetector::new(3, 100.0);
        assert!(detector.observe("a", 0.0).is_none());
        assert!(detector.observe("b", 1.0).is_none());
        assert!(detector.observe("a", 2.0).is_none());
        assert!(detector.observe("b", 3.0).is_none());
        assert!(detector.observe("a", 4.0).is_some());
        // Old hits age out.
        assert!(detector.observe("b", 200.0).is_none());
    }

    #[test]
    fn test_disabled_mode_never_drops() {
        let mut gw = MutationGateway::new(
            GatewayConfig::default()
                .with_loop_detection(false)
                .with_mode(LimiterMode::Disabled),
        );
        assert!((0..50).all(|_| gw.admit("flood", MutationMode::Tracked, 0.0)));
        let snap = gw.snapshot(0.0);
        assert_eq!(snap.accepted, 50);
        assert_eq!(snap.dropped, 0);
        assert!(!snap.enforced);
    }

    #[test]
    fn test_external_trip_and_reset() {
        let mut gw = gateway();
        gw.trip(0.0, 500.0, "host flagged reentrant render");
        assert!(!gw.admit("a", MutationMode::Tracked, 100.0));
        gw.reset();
        assert!(gw.admit("a", MutationMode::Tracked, 100.0));
        assert_eq!(gw.snapshot(100.0).dropped, 0);
    }
}
