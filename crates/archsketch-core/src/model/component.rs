//! Diagram entities: components, connections and info-cards.

use super::EntityId;
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A box on the architecture diagram (service, database, queue, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    pub id: EntityId,
    /// Type tag, e.g. `"database"` or `"api"`.
    #[serde(rename = "type")]
    pub kind: String,
    pub position: Point,
    pub size: Size,
    pub label: String,
    /// Free-form properties edited by the host UI.
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub group_id: Option<EntityId>,
    #[serde(default)]
    pub layer_id: Option<EntityId>,
    #[serde(default)]
    pub locked: bool,
}

impl Component {
    /// Default size for newly placed components.
    pub const DEFAULT_SIZE: Size = Size::new(160.0, 80.0);

    pub fn new(kind: impl Into<String>, label: impl Into<String>, position: Point) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            kind: kind.into(),
            position,
            size: Self::DEFAULT_SIZE,
            label: label.into(),
            properties: Map::new(),
            group_id: None,
            layer_id: None,
            locked: false,
        }
    }

    /// Builder-style id override, mostly for fixtures and imports.
    pub fn with_id(mut self, id: impl Into<EntityId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_size(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    /// Axis-aligned bounds in canvas coordinates.
    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }
}

/// How a connection is routed between its endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathStyle {
    /// Straight line.
    #[default]
    Direct,
    /// Smooth curve.
    Flowing,
    /// Right-angled elbows.
    Angular,
}

/// A directed edge between two components, referenced by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: EntityId,
    pub from: EntityId,
    pub to: EntityId,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub path_style: Option<PathStyle>,
}

impl Connection {
    pub fn new(from: impl Into<EntityId>, to: impl Into<EntityId>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            from: from.into(),
            to: to.into(),
            label: String::new(),
            kind: "default".to_string(),
            path_style: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<EntityId>) -> Self {
        self.id = id.into();
        self
    }

    /// Whether either end of this connection is `component_id`.
    pub fn touches(&self, component_id: &str) -> bool {
        self.from == component_id || self.to == component_id
    }
}

/// A free-floating annotation card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoCard {
    pub id: EntityId,
    pub position: Point,
    pub size: Size,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub color: Option<String>,
}

impl InfoCard {
    pub fn new(position: Point, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            position,
            size: Size::new(220.0, 120.0),
            title: title.into(),
            content: String::new(),
            color: None,
        }
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size)
    }
}
