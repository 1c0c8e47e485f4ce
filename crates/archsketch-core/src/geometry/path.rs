//! Outline polygons to drawable paths.

use kurbo::{BezPath, Point};

/// Closed curve through an outline polygon.
///
/// Each vertex becomes the control point of a quadratic segment ending at
/// the midpoint to the next vertex; the last vertex wraps to the first.
pub fn outline_to_path(outline: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    let Some(&first) = outline.first() else {
        return path;
    };

    path.move_to(first);
    for (i, &p) in outline.iter().enumerate() {
        let next = outline[(i + 1) % outline.len()];
        path.quad_to(p, p.midpoint(next));
    }
    path.close_path();
    path
}

/// SVG path data for an outline polygon; empty for an empty outline.
pub fn outline_to_svg(outline: &[Point]) -> String {
    if outline.is_empty() {
        return String::new();
    }
    outline_to_path(outline).to_svg()
}
