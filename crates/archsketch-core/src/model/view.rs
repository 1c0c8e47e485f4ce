//! View preferences and the whitelisted subset that persists across sessions.

use crate::camera::Camera;
use serde::{Deserialize, Serialize};

/// Color theme for the editor chrome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

/// Grid spacing in canvas units.
pub const DEFAULT_GRID_SIZE: f64 = 20.0;

/// Per-session view preferences held in the canvas state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewPreferences {
    pub show_grid: bool,
    pub snap_to_grid: bool,
    pub grid_size: f64,
    pub show_minimap: bool,
    pub theme: Theme,
    /// Current pan/zoom. Not persisted.
    #[serde(skip)]
    pub camera: Camera,
}

impl Default for ViewPreferences {
    fn default() -> Self {
        Self {
            show_grid: true,
            snap_to_grid: false,
            grid_size: DEFAULT_GRID_SIZE,
            show_minimap: false,
            theme: Theme::default(),
            camera: Camera::default(),
        }
    }
}

impl ViewPreferences {
    /// Overlay persisted values, leaving session-only fields untouched.
    pub fn apply(&mut self, persisted: &PersistedPreferences) {
        self.show_grid = persisted.show_grid;
        self.snap_to_grid = persisted.snap_to_grid;
        self.grid_size = persisted.grid_size;
        self.show_minimap = persisted.show_minimap;
        self.theme = persisted.theme;
    }
}

/// The only part of the state written to the key-value blob store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedPreferences {
    pub show_grid: bool,
    pub snap_to_grid: bool,
    pub grid_size: f64,
    pub show_minimap: bool,
    pub theme: Theme,
}

impl Default for PersistedPreferences {
    fn default() -> Self {
        Self::from(&ViewPreferences::default())
    }
}

impl From<&ViewPreferences> for PersistedPreferences {
    fn from(view: &ViewPreferences) -> Self {
        Self {
            show_grid: view.show_grid,
            snap_to_grid: view.snap_to_grid,
            grid_size: view.grid_size,
            show_minimap: view.show_minimap,
            theme: view.theme,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Vec2;

    #[test]
    fn test_apply_keeps_camera() {
        let mut view = ViewPreferences::default();
        view.camera.pan(Vec2::new(40.0, 0.0));

        let persisted = PersistedPreferences {
            show_grid: false,
            theme: Theme::Dark,
            ..PersistedPreferences::default()
        };
        view.apply(&persisted);

        assert!(!view.show_grid);
        assert_eq!(view.theme, Theme::Dark);
        assert!((view.camera.offset.x - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_persisted_ignores_unknown_fields() {
        let persisted: PersistedPreferences =
            serde_json::from_str(r#"{"showGrid": false, "camera": {"zoom": 3}}"#).unwrap();
        assert!(!persisted.show_grid);
        assert!((persisted.grid_size - DEFAULT_GRID_SIZE).abs() < f64::EPSILON);
    }
}
