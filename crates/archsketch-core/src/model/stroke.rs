//! Free-hand stroke records.

use super::EntityId;
use crate::clock::epoch_millis;
use crate::geometry::{OutlineOptions, outline_to_path, stroke_outline};
use kurbo::{BezPath, Line, Point, Rect};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A sampled point with pen pressure in `[0, 1]`.
///
/// Serialized as `[x, y, pressure]`. Deserialization also accepts `[x, y]`
/// (pressure 0.5) and `{ "x", "y", "pressure"? }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "WirePoint", into = "[f64; 3]")]
pub struct StrokePoint {
    pub x: f64,
    pub y: f64,
    pub pressure: f64,
}

impl StrokePoint {
    /// Pressure assumed when the input device reports none.
    pub const DEFAULT_PRESSURE: f64 = 0.5;

    pub const fn new(x: f64, y: f64, pressure: f64) -> Self {
        Self { x, y, pressure }
    }

    pub fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

impl From<StrokePoint> for [f64; 3] {
    fn from(p: StrokePoint) -> Self {
        [p.x, p.y, p.pressure]
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WirePoint {
    Triple([f64; 3]),
    Pair([f64; 2]),
    Object {
        x: f64,
        y: f64,
        #[serde(default)]
        pressure: Option<f64>,
    },
}

impl From<WirePoint> for StrokePoint {
    fn from(wire: WirePoint) -> Self {
        match wire {
            WirePoint::Triple([x, y, pressure]) => Self::new(x, y, pressure),
            WirePoint::Pair([x, y]) => Self::new(x, y, Self::DEFAULT_PRESSURE),
            WirePoint::Object { x, y, pressure } => {
                Self::new(x, y, pressure.unwrap_or(Self::DEFAULT_PRESSURE))
            }
        }
    }
}

/// Which drawing tool produced a stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrokeTool {
    #[default]
    Pen,
    Highlighter,
}

/// A finalized free-hand stroke.
///
/// Strokes are immutable once handed to the store; they are only ever
/// replaced or removed wholesale by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    pub id: EntityId,
    pub points: Vec<StrokePoint>,
    pub color: String,
    /// Brush diameter in canvas units.
    #[serde(rename = "size")]
    pub width: f64,
    #[serde(default)]
    pub tool: StrokeTool,
    /// Creation time in milliseconds since the Unix epoch.
    #[serde(rename = "timestamp")]
    pub created_at: f64,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub z_index: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

fn default_visible() -> bool {
    true
}

impl Stroke {
    /// Create a stroke stamped with a fresh id and the current time.
    pub fn new(points: Vec<StrokePoint>, color: impl Into<String>, width: f64, tool: StrokeTool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            points,
            color: color.into(),
            width,
            tool,
            created_at: epoch_millis(),
            visible: true,
            z_index: 0,
            author: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<EntityId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_z_index(mut self, z_index: i64) -> Self {
        self.z_index = z_index;
        self
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Bounding box of the centerline (not inflated by width).
    pub fn bounds(&self) -> Rect {
        let mut iter = self.points.iter();
        let Some(first) = iter.next() else {
            return Rect::ZERO;
        };
        iter.fold(Rect::from_points(first.point(), first.point()), |acc, p| {
            acc.union_pt(p.point())
        })
    }

    /// Consecutive centerline segments. A single-point stroke yields one
    /// degenerate segment so it can still be indexed and hit.
    pub fn segments(&self) -> Vec<Line> {
        match self.points.as_slice() {
            [] => Vec::new(),
            [only] => vec![Line::new(only.point(), only.point())],
            points => points
                .windows(2)
                .map(|w| Line::new(w[0].point(), w[1].point()))
                .collect(),
        }
    }

    /// Outline polygon for rendering. Computed on demand, never stored.
    pub fn outline(&self, options: &OutlineOptions) -> Vec<Point> {
        let options = options.clone().with_size(self.width);
        stroke_outline(&self.points, &options)
    }

    /// Closed fill path for rendering.
    pub fn to_path(&self, options: &OutlineOptions) -> BezPath {
        outline_to_path(&self.outline(options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Stroke {
        Stroke::new(
            vec![
                StrokePoint::new(0.0, 0.0, 0.5),
                StrokePoint::new(10.0, 5.0, 0.6),
                StrokePoint::new(20.0, -5.0, 0.7),
            ],
            "#1e1e1e",
            4.0,
            StrokeTool::Pen,
        )
    }

    #[test]
    fn test_bounds() {
        let stroke = sample();
        assert_eq!(stroke.bounds(), Rect::new(0.0, -5.0, 20.0, 5.0));
        let empty = Stroke::new(Vec::new(), "#000", 2.0, StrokeTool::Pen);
        assert_eq!(empty.bounds(), Rect::ZERO);
    }

    #[test]
    fn test_segments() {
        let stroke = sample();
        assert_eq!(stroke.segments().len(), 2);

        let dot = Stroke::new(vec![StrokePoint::new(1.0, 1.0, 0.5)], "#000", 2.0, StrokeTool::Pen);
        let segs = dot.segments();
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].p0, segs[0].p1);
    }

    #[test]
    fn test_wire_names() {
        let stroke = sample().with_id("s1");
        let json = serde_json::to_value(&stroke).unwrap();
        assert_eq!(json["id"], "s1");
        assert_eq!(json["size"], 4.0);
        assert!(json["timestamp"].is_number());
        assert_eq!(json["points"][1], serde_json::json!([10.0, 5.0, 0.6]));
        assert_eq!(json["tool"], "pen");
        assert!(json.get("author").is_none());
    }

    #[test]
    fn test_point_accepts_alternate_shapes() {
        let pair: StrokePoint = serde_json::from_str("[3, 4]").unwrap();
        assert_eq!(pair, StrokePoint::new(3.0, 4.0, 0.5));

        let obj: StrokePoint = serde_json::from_str(r#"{"x": 1, "y": 2, "pressure": 0.9}"#).unwrap();
        assert_eq!(obj, StrokePoint::new(1.0, 2.0, 0.9));

        assert!(serde_json::from_str::<StrokePoint>(r#""nope""#).is_err());
    }

    #[test]
    fn test_outline_uses_stroke_width() {
        let stroke = sample();
        let outline = stroke.outline(&OutlineOptions::default());
        assert!(outline.len() > 4);
        assert!(!stroke.to_path(&OutlineOptions::default()).elements().is_empty());
    }
}
