//! Canvas entity definitions.

mod component;
mod stroke;
mod view;

pub use component::{Component, Connection, InfoCard, PathStyle};
pub use stroke::{Stroke, StrokePoint, StrokeTool};
pub use view::{DEFAULT_GRID_SIZE, PersistedPreferences, Theme, ViewPreferences};

/// Identifier for every canvas entity. Generated as a v4 UUID string, but
/// imported data may carry any string.
pub type EntityId = String;
