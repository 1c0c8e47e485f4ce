//! Drawing tools and their current settings.

use crate::config::DrawingConfig;
use crate::model::StrokeTool;
use serde::{Deserialize, Serialize};

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    #[default]
    Select,
    Pen,
    Highlighter,
    Eraser,
}

impl ToolKind {
    /// Whether pointer-down with this tool starts a stroke.
    pub fn is_drawing(self) -> bool {
        self.stroke_tool().is_some()
    }

    /// The stroke tool recorded on strokes drawn with this tool.
    pub fn stroke_tool(self) -> Option<StrokeTool> {
        match self {
            ToolKind::Pen => Some(StrokeTool::Pen),
            ToolKind::Highlighter => Some(StrokeTool::Highlighter),
            ToolKind::Select | ToolKind::Eraser => None,
        }
    }
}

/// Tool, color and sizes applied to the next gesture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSettings {
    pub tool: ToolKind,
    pub color: String,
    /// Brush diameter in canvas units.
    pub size: f64,
    /// Eraser diameter in canvas units.
    pub eraser_size: f64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self::from_config(&DrawingConfig::default())
    }
}

impl ToolSettings {
    pub fn from_config(config: &DrawingConfig) -> Self {
        Self {
            tool: ToolKind::default(),
            color: config.default_color.clone(),
            size: config.default_size,
            eraser_size: config.eraser_size,
        }
    }

    /// Highlighters lay down a wider, translucent band.
    pub fn effective_size(&self) -> f64 {
        match self.tool {
            ToolKind::Highlighter => self.size * 3.0,
            _ => self.size,
        }
    }
}
