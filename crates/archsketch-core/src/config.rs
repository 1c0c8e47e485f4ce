//! Tunables for the gateway, history and drawing surface.
//!
//! Every struct deserializes with defaults for missing fields, so a host can
//! ship a partial JSON override.

use crate::geometry::OutlineOptions;
use crate::spatial::DEFAULT_INDEX_THRESHOLD;
use serde::{Deserialize, Serialize};

/// Default sliding window for the rate limiter.
pub const DEFAULT_WINDOW_MS: f64 = 100.0;
/// Mutations allowed inside one window.
pub const DEFAULT_MAX_MUTATIONS: usize = 10;
/// Breaker cooldown after the window overflows.
pub const DEFAULT_COOLDOWN_MS: f64 = 250.0;
/// Undo depth.
pub const DEFAULT_HISTORY_DEPTH: usize = 50;

/// When the rate limiter is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LimiterMode {
    /// Enforced in every build.
    #[default]
    Always,
    /// Enforced only when compiled with debug assertions.
    DebugOnly,
    /// Never enforced; counters still advance.
    Disabled,
}

impl LimiterMode {
    /// Whether rejections take effect in this build.
    pub fn is_enforced(self) -> bool {
        match self {
            LimiterMode::Always => true,
            LimiterMode::DebugOnly => cfg!(debug_assertions),
            LimiterMode::Disabled => false,
        }
    }
}

/// Rate limiter, circuit breaker and loop detector settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewayConfig {
    pub window_ms: f64,
    pub max_mutations: usize,
    pub cooldown_ms: f64,
    pub mode: LimiterMode,
    /// Install the repeated-action loop detector.
    pub detect_loops: bool,
    /// Same-action repeats within `loop_window_ms` that count as a loop.
    pub loop_threshold: usize,
    pub loop_window_ms: f64,
    /// Cooldown applied when the loop detector trips the breaker.
    pub anomaly_cooldown_ms: f64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            window_ms: DEFAULT_WINDOW_MS,
            max_mutations: DEFAULT_MAX_MUTATIONS,
            cooldown_ms: DEFAULT_COOLDOWN_MS,
            mode: LimiterMode::default(),
            detect_loops: cfg!(debug_assertions),
            loop_threshold: 25,
            loop_window_ms: 1000.0,
            anomaly_cooldown_ms: 1000.0,
        }
    }
}

impl GatewayConfig {
    pub fn with_window(mut self, window_ms: f64, max_mutations: usize) -> Self {
        self.window_ms = window_ms;
        self.max_mutations = max_mutations;
        self
    }

    pub fn with_cooldown(mut self, cooldown_ms: f64) -> Self {
        self.cooldown_ms = cooldown_ms;
        self
    }

    pub fn with_mode(mut self, mode: LimiterMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_loop_detection(mut self, enabled: bool) -> Self {
        self.detect_loops = enabled;
        self
    }
}

/// Temporal history settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryConfig {
    pub max_depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_HISTORY_DEPTH,
        }
    }
}

/// Store-wide configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub gateway: GatewayConfig,
    pub history: HistoryConfig,
}

impl StoreConfig {
    pub fn with_gateway(mut self, gateway: GatewayConfig) -> Self {
        self.gateway = gateway;
        self
    }

    pub fn with_history_depth(mut self, max_depth: usize) -> Self {
        self.history.max_depth = max_depth;
        self
    }
}

/// Drawing surface defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DrawingConfig {
    /// Stroke count at which the eraser switches to the spatial index.
    pub index_threshold: usize,
    /// Eraser diameter in canvas units.
    pub eraser_size: f64,
    pub default_color: String,
    pub default_size: f64,
    pub outline: OutlineOptions,
}

impl Default for DrawingConfig {
    fn default() -> Self {
        Self {
            index_threshold: DEFAULT_INDEX_THRESHOLD,
            eraser_size: 16.0,
            default_color: "#1e1e1e".to_string(),
            default_size: 4.0,
            outline: OutlineOptions::default(),
        }
    }
}
