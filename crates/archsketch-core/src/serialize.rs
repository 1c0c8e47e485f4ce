//! Strokes to and from JSON text.
//!
//! Decoding is forgiving: a malformed document yields no strokes, a
//! malformed element is dropped without affecting its neighbours, and a
//! malformed optional field is replaced by its default.

use crate::error::SerializationError;
use crate::model::Stroke;
use serde_json::Value;

/// Encode strokes as a JSON array. Returns `"[]"` if encoding fails.
pub fn encode_strokes(strokes: &[Stroke]) -> String {
    try_encode_strokes(strokes).unwrap_or_else(|err| {
        log::debug!("Failed to encode {} strokes: {}", strokes.len(), err);
        "[]".to_string()
    })
}

pub fn try_encode_strokes(strokes: &[Stroke]) -> Result<String, SerializationError> {
    Ok(serde_json::to_string(strokes)?)
}

/// Decode a JSON array of strokes, keeping only well-formed elements.
pub fn decode_strokes(json: &str) -> Vec<Stroke> {
    try_decode_strokes(json).unwrap_or_else(|err| {
        log::debug!("Ignoring stroke payload: {}", err);
        Vec::new()
    })
}

/// Like [`decode_strokes`], but reports a document-level failure.
/// Element-level failures are still dropped.
pub fn try_decode_strokes(json: &str) -> Result<Vec<Stroke>, SerializationError> {
    let document: Value = serde_json::from_str(json)?;
    let Value::Array(elements) = document else {
        return Err(SerializationError::NotAnArray(kind_of(&document)));
    };

    let total = elements.len();
    let strokes: Vec<Stroke> = elements
        .into_iter()
        .enumerate()
        .filter_map(|(i, element)| match decode_element(element) {
            Ok(stroke) => Some(stroke),
            Err(reason) => {
                log::debug!("Dropping stroke element {}: {}", i, reason);
                None
            }
        })
        .collect();
    if strokes.len() != total {
        log::debug!("Decoded {} of {} strokes", strokes.len(), total);
    }
    Ok(strokes)
}

fn decode_element(element: Value) -> Result<Stroke, String> {
    let mut fields = match element {
        Value::Object(fields) => fields,
        other => return Err(format!("expected an object, found {}", kind_of(&other))),
    };
    let required: [(&str, fn(&Value) -> bool); 5] = [
        ("id", Value::is_string),
        ("points", Value::is_array),
        ("color", Value::is_string),
        ("size", Value::is_number),
        ("timestamp", Value::is_number),
    ];
    for (name, check) in required {
        match fields.get(name) {
            Some(value) if check(value) => {}
            Some(value) => return Err(format!("field '{}' has type {}", name, kind_of(value))),
            None => return Err(format!("missing field '{}'", name)),
        }
    }
    // Optional fields of the wrong shape fall back to their defaults.
    let optional: [(&str, fn(&Value) -> bool); 4] = [
        ("tool", |v| matches!(v.as_str(), Some("pen" | "highlighter"))),
        ("visible", Value::is_boolean),
        ("zIndex", |v| v.as_i64().is_some()),
        ("author", |v| v.is_string() || v.is_null()),
    ];
    for (name, check) in optional {
        if fields.get(name).is_some_and(|value| !check(value)) {
            log::debug!("Ignoring malformed stroke field '{}'", name);
            fields.remove(name);
        }
    }
    serde_json::from_value(Value::Object(fields)).map_err(|e| e.to_string())
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{StrokePoint, StrokeTool};

    fn sample() -> Vec<Stroke> {
        vec![
            Stroke::new(
                vec![
                    StrokePoint::new(0.1, 0.2, 0.3),
                    StrokePoint::new(10.75, -3.5, 1.0),
                ],
                "#1e1e1e",
                4.0,
                StrokeTool::Pen,
            )
            .with_id("a")
            .with_z_index(3),
            Stroke::new(vec![StrokePoint::new(1.0 / 3.0, 2.0 / 3.0, 0.5)], "#ffd400", 12.0, StrokeTool::Highlighter)
                .with_id("b"),
        ]
    }

    #[test]
    fn test_round_trip_is_exact() {
        let strokes = sample();
        let decoded = decode_strokes(&encode_strokes(&strokes));
        assert_eq!(decoded, strokes);
    }

    #[test]
    fn test_invalid_documents() {
        assert!(decode_strokes("not json").is_empty());
        assert!(decode_strokes("{}").is_empty());
        assert!(decode_strokes("").is_empty());
        assert!(matches!(try_decode_strokes("{}"), Err(SerializationError::NotAnArray("object"))));
        assert!(matches!(try_decode_strokes("nope"), Err(SerializationError::Json(_))));
        assert_eq!(encode_strokes(&[]), "[]");
    }

    #[test]
    fn test_bad_elements_dropped() {
        let json = r##"[
            {"id": "ok", "points": [[0, 0, 0.5], [1, 1]], "color": "#000", "size": 2, "timestamp": 1},
            {"id": 7, "points": [], "color": "#000", "size": 2, "timestamp": 1},
            {"id": "no-size", "points": [], "color": "#000", "timestamp": 1},
            {"id": "bad-point", "points": [["x", 1]], "color": "#000", "size": 2, "timestamp": 1},
            {"id": "obj", "points": [{"x": 1, "y": 2}], "color": "#000", "size": 2, "timestamp": 1},
            42
        ]"##;
        let strokes = decode_strokes(json);
        let ids: Vec<&str> = strokes.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["ok", "obj"]);

        let ok = &strokes[0];
        assert!((ok.points[1].pressure - 0.5).abs() < f64::EPSILON);
        assert!(ok.visible);
        assert_eq!(ok.tool, StrokeTool::Pen);
    }

    #[test]
    fn test_bad_optional_fields_defaulted() {
        let json = r##"[
            {"id": "a", "points": [[0, 0]], "color": "#000", "size": 2, "timestamp": 1, "tool": "laser"},
            {"id": "b", "points": [[0, 0]], "color": "#000", "size": 2, "timestamp": 1, "visible": "yes"},
            {"id": "c", "points": [[0, 0]], "color": "#000", "size": 2, "timestamp": 1, "zIndex": "x"},
            {"id": "d", "points": [[0, 0]], "color": "#000", "size": 2, "timestamp": 1, "author": 5},
            {"id": "e", "points": [[0, 0]], "color": "#000", "size": 2, "timestamp": 1,
             "tool": "highlighter", "visible": false, "zIndex": 4, "author": "ana"}
        ]"##;
        let strokes = decode_strokes(json);
        let ids: Vec<&str> = strokes.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d", "e"]);

        for stroke in &strokes[..4] {
            assert_eq!(stroke.tool, StrokeTool::Pen);
            assert!(stroke.visible);
            assert_eq!(stroke.z_index, 0);
            assert!(stroke.author.is_none());
        }
        let e = &strokes[4];
        assert_eq!(e.tool, StrokeTool::Highlighter);
        assert!(!e.visible);
        assert_eq!(e.z_index, 4);
        assert_eq!(e.author.as_deref(), Some("ana"));
    }

    #[test]
    fn test_wire_field_names() {
        let json = encode_strokes(&sample()[..1]);
        let value: Value = serde_json::from_str(&json).unwrap();
        let first = &value[0];
        assert!(first["size"].is_number());
        assert!(first["timestamp"].is_number());
        assert_eq!(first["zIndex"], 3);
        assert_eq!(first["tool"], "pen");
        assert!(first.get("author").is_none());
    }
}
