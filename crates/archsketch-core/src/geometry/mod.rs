//! Pure geometry: brush outlines, outline paths and distance tests.

mod distance;
mod outline;
mod path;

pub use distance::{distance_to_polyline, distance_to_segment, is_near_stroke};
pub use outline::{OutlineOptions, OutlineSample, outline_from_samples, stroke_outline, stroke_points};
pub use path::{outline_to_path, outline_to_svg};
