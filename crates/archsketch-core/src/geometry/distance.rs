//! Point-to-stroke distance tests used by the eraser.

use crate::model::StrokePoint;
use kurbo::Point;

/// Distance from `point` to the segment `start..end`, projecting onto the
/// segment and clamping to its endpoints.
pub fn distance_to_segment(point: Point, start: Point, end: Point) -> f64 {
    let line_vec = end - start;
    let len_sq = line_vec.hypot2();
    if len_sq < f64::EPSILON {
        return point.distance(start);
    }
    let t = ((point - start).dot(line_vec) / len_sq).clamp(0.0, 1.0);
    point.distance(start + line_vec * t)
}

/// Minimum distance from `point` to the polyline through `points`.
///
/// `None` for an empty polyline.
pub fn distance_to_polyline(point: Point, points: &[StrokePoint]) -> Option<f64> {
    match points {
        [] => None,
        [only] => Some(point.distance(only.point())),
        _ => points
            .windows(2)
            .map(|w| distance_to_segment(point, w[0].point(), w[1].point()))
            .reduce(f64::min),
    }
}

/// Whether any segment of the polyline lies within `threshold` of `point`.
pub fn is_near_stroke(point: Point, points: &[StrokePoint], threshold: f64) -> bool {
    match points {
        [] => false,
        [only] => point.distance(only.point()) <= threshold,
        _ => points
            .windows(2)
            .any(|w| distance_to_segment(point, w[0].point(), w[1].point()) <= threshold),
    }
}
