//! Pressure-sensitive brush outlines.
//!
//! Turns sampled `(x, y, pressure)` points into a closed polygon that
//! approximates a tapered, variable-width brush stroke. The computation is a
//! pure function of its inputs: identical samples and options give
//! bit-identical outlines.

use crate::model::StrokePoint;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Slightly more than π so round caps close without a hairline gap.
const FIXED_PI: f64 = PI + 0.0001;
/// How quickly simulated pressure follows velocity.
const RATE_OF_PRESSURE_CHANGE: f64 = 0.275;
/// Steps used to sweep round caps and sharp corners.
const CAP_STEPS: u32 = 13;
const END_CAP_STEPS: u32 = 29;

/// Brush tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutlineOptions {
    /// Base diameter.
    pub size: f64,
    /// How much pressure affects width, in `[-1, 1]`.
    pub thinning: f64,
    /// Minimum spacing between outline points, as a fraction of `size`.
    pub smoothing: f64,
    /// How far each sample is pulled toward the previous one, in `[0, 1]`.
    pub streamline: f64,
    /// Derive pressure from velocity instead of the recorded values.
    pub simulate_pressure: bool,
    pub cap_start: bool,
    pub cap_end: bool,
    /// Taper lengths in canvas units; 0 disables.
    pub taper_start: f64,
    pub taper_end: f64,
    /// Whether the stroke is complete (the last sample is kept as-is).
    pub last: bool,
}

impl Default for OutlineOptions {
    fn default() -> Self {
        Self {
            size: 8.0,
            thinning: 0.5,
            smoothing: 0.5,
            streamline: 0.5,
            simulate_pressure: true,
            cap_start: true,
            cap_end: true,
            taper_start: 0.0,
            taper_end: 0.0,
            last: true,
        }
    }
}

impl OutlineOptions {
    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn with_thinning(mut self, thinning: f64) -> Self {
        self.thinning = thinning;
        self
    }

    pub fn with_streamline(mut self, streamline: f64) -> Self {
        self.streamline = streamline;
        self
    }

    pub fn with_simulated_pressure(mut self, simulate: bool) -> Self {
        self.simulate_pressure = simulate;
        self
    }

    pub fn with_taper(mut self, start: f64, end: f64) -> Self {
        self.taper_start = start;
        self.taper_end = end;
        self
    }

    pub fn with_last(mut self, last: bool) -> Self {
        self.last = last;
        self
    }
}

/// A streamlined input sample annotated with direction and arc length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlineSample {
    pub point: Point,
    pub pressure: f64,
    /// Unit vector pointing back toward the previous sample.
    pub vector: Vec2,
    /// Distance from the previous sample.
    pub distance: f64,
    /// Arc length from the first sample.
    pub running_length: f64,
}

fn unit(v: Vec2) -> Vec2 {
    let len = v.hypot();
    if len > 0.0 { v / len } else { Vec2::ZERO }
}

fn perpendicular(v: Vec2) -> Vec2 {
    Vec2::new(v.y, -v.x)
}

fn rotate_around(p: Point, center: Point, angle: f64) -> Point {
    let (s, c) = angle.sin_cos();
    let d = p - center;
    Point::new(d.x * c - d.y * s + center.x, d.x * s + d.y * c + center.y)
}

fn lerp_vec(a: Vec2, b: Vec2, t: f64) -> Vec2 {
    a + (b - a) * t
}

fn stroke_radius(size: f64, thinning: f64, pressure: f64) -> f64 {
    size * (0.5 - thinning * (0.5 - pressure))
}

fn simulated_pressure(previous: f64, distance: f64, size: f64) -> f64 {
    let speed = (distance / size).min(1.0);
    let rest = (1.0 - speed).min(1.0);
    (previous + (rest - previous) * (speed * RATE_OF_PRESSURE_CHANGE)).min(1.0)
}

fn taper_start_ease(t: f64) -> f64 {
    t * (2.0 - t)
}

fn taper_end_ease(t: f64) -> f64 {
    let t = t - 1.0;
    t * t * t + 1.0
}

/// Streamline raw samples and annotate them for outline generation.
pub fn stroke_points(input: &[StrokePoint], options: &OutlineOptions) -> Vec<OutlineSample> {
    if input.is_empty() {
        return Vec::new();
    }

    let t = 0.15 + (1.0 - options.streamline) * 0.85;
    let mut pts: Vec<(Point, f64)> = input.iter().map(|p| (p.point(), p.pressure)).collect();

    // Two samples give too little to streamline against; subdivide.
    if pts.len() == 2 {
        let (first, pressure) = pts[0];
        let (last, last_pressure) = pts[1];
        pts.truncate(1);
        for i in 1..5 {
            let f = f64::from(i) / 4.0;
            pts.push((first.lerp(last, f), pressure + (last_pressure - pressure) * f));
        }
    }
    if pts.len() == 1 {
        let (only, pressure) = pts[0];
        pts.push((only + Vec2::new(1.0, 1.0), pressure));
    }

    let first_pressure = if pts[0].1 >= 0.0 { pts[0].1 } else { 0.25 };
    let mut samples = vec![OutlineSample {
        point: pts[0].0,
        pressure: first_pressure,
        vector: Vec2::new(1.0, 1.0),
        distance: 0.0,
        running_length: 0.0,
    }];

    let max = pts.len() - 1;
    let mut reached_minimum_length = false;
    let mut running_length = 0.0;
    let mut prev = samples[0];

    for (i, &(raw, raw_pressure)) in pts.iter().enumerate().skip(1) {
        let point = if options.last && i == max {
            raw
        } else {
            prev.point.lerp(raw, t)
        };
        if point == prev.point {
            continue;
        }

        let distance = point.distance(prev.point);
        running_length += distance;

        // Hold back the head of the stroke until it is at least one brush long.
        if i < max && !reached_minimum_length {
            if running_length < options.size {
                continue;
            }
            reached_minimum_length = true;
        }

        prev = OutlineSample {
            point,
            pressure: if raw_pressure >= 0.0 { raw_pressure } else { StrokePoint::DEFAULT_PRESSURE },
            vector: unit(prev.point - point),
            distance,
            running_length,
        };
        samples.push(prev);
    }

    samples[0].vector = samples.get(1).map_or(Vec2::ZERO, |s| s.vector);
    samples
}

/// Outline polygon for raw samples.
pub fn stroke_outline(input: &[StrokePoint], options: &OutlineOptions) -> Vec<Point> {
    outline_from_samples(&stroke_points(input, options), options)
}

/// Outline polygon for already-streamlined samples.
pub fn outline_from_samples(points: &[OutlineSample], options: &OutlineOptions) -> Vec<Point> {
    let size = options.size;
    let thinning = options.thinning;
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return Vec::new();
    };
    if size <= 0.0 {
        return Vec::new();
    }

    let len = points.len();
    let total_length = last.running_length;
    let taper_start = options.taper_start.max(0.0);
    let taper_end = options.taper_end.max(0.0);
    let min_distance = (size * options.smoothing).powi(2);

    let mut left: Vec<Point> = Vec::new();
    let mut right: Vec<Point> = Vec::new();

    let mut prev_pressure = points.iter().take(10).fold(first.pressure, |acc, curr| {
        let pressure = if options.simulate_pressure {
            simulated_pressure(acc, curr.distance, size)
        } else {
            curr.pressure
        };
        (acc + pressure) / 2.0
    });

    let mut radius = stroke_radius(size, thinning, last.pressure);
    let mut first_radius: Option<f64> = None;
    let mut prev_vector = first.vector;
    let mut pl = first.point;
    let mut pr = pl;
    let mut tl = pl;
    let mut tr = pr;
    let mut prev_was_sharp = false;

    for (i, sample) in points.iter().enumerate() {
        let is_last = i == len - 1;
        let mut pressure = sample.pressure;

        // Trailing jitter near the end of a stroke makes ugly caps.
        if !is_last && total_length - sample.running_length < 3.0 {
            continue;
        }

        if thinning != 0.0 {
            if options.simulate_pressure {
                pressure = simulated_pressure(prev_pressure, sample.distance, size);
            }
            radius = stroke_radius(size, thinning, pressure);
        } else {
            radius = size / 2.0;
        }
        if first_radius.is_none() {
            first_radius = Some(radius);
        }

        let ts = if sample.running_length < taper_start {
            taper_start_ease(sample.running_length / taper_start)
        } else {
            1.0
        };
        let remaining = total_length - sample.running_length;
        let te = if remaining < taper_end {
            taper_end_ease(remaining / taper_end)
        } else {
            1.0
        };
        radius = (radius * ts.min(te)).max(0.01);

        let vector = sample.vector;
        let next_vector = points.get(i + 1).map_or(vector, |n| n.vector);
        let next_dpr = if is_last { 1.0 } else { vector.dot(next_vector) };
        let prev_dpr = vector.dot(prev_vector);

        let is_sharp = prev_dpr < 0.0 && !prev_was_sharp;
        let next_is_sharp = next_dpr < 0.0;

        if is_sharp || next_is_sharp {
            // Sweep a half circle around hairpin turns.
            let offset = perpendicular(prev_vector) * radius;
            for step in 0..=CAP_STEPS {
                let t = f64::from(step) / f64::from(CAP_STEPS);
                tl = rotate_around(sample.point - offset, sample.point, FIXED_PI * t);
                left.push(tl);
                tr = rotate_around(sample.point + offset, sample.point, FIXED_PI * -t);
                right.push(tr);
            }
            pl = tl;
            pr = tr;
            if next_is_sharp {
                prev_was_sharp = true;
            }
            continue;
        }
        prev_was_sharp = false;

        if is_last {
            let offset = perpendicular(vector) * radius;
            left.push(sample.point - offset);
            right.push(sample.point + offset);
            continue;
        }

        let offset = perpendicular(lerp_vec(next_vector, vector, next_dpr)) * radius;

        tl = sample.point - offset;
        if i <= 1 || (pl - tl).hypot2() > min_distance {
            left.push(tl);
            pl = tl;
        }
        tr = sample.point + offset;
        if i <= 1 || (pr - tr).hypot2() > min_distance {
            right.push(tr);
            pr = tr;
        }

        prev_pressure = pressure;
        prev_vector = vector;
    }

    let first_point = first.point;
    let last_point = if len > 1 {
        last.point
    } else {
        first.point + Vec2::new(1.0, 1.0)
    };

    if len == 1 {
        if (taper_start == 0.0 && taper_end == 0.0) || options.last {
            return dot_outline(first_point, last_point, first_radius.unwrap_or(radius));
        }
        return Vec::new();
    }

    let mut start_cap: Vec<Point> = Vec::new();
    if taper_start > 0.0 {
        // tapered starts need no cap
    } else if options.cap_start {
        if let Some(&anchor) = right.first() {
            for step in 1..=CAP_STEPS {
                let t = f64::from(step) / f64::from(CAP_STEPS);
                start_cap.push(rotate_around(anchor, first_point, FIXED_PI * t));
            }
        }
    } else if let (Some(&l0), Some(&r0)) = (left.first(), right.first()) {
        let corners = l0 - r0;
        let a = corners * 0.5;
        let b = corners * 0.51;
        start_cap.extend([first_point - a, first_point - b, first_point + b, first_point + a]);
    }

    let mut end_cap: Vec<Point> = Vec::new();
    let direction = perpendicular(-last.vector);
    if taper_end > 0.0 {
        end_cap.push(last_point);
    } else if options.cap_end {
        let start = last_point + direction * radius;
        for step in 1..END_CAP_STEPS {
            let t = f64::from(step) / f64::from(END_CAP_STEPS);
            end_cap.push(rotate_around(start, last_point, FIXED_PI * 3.0 * t));
        }
    } else {
        end_cap.extend([
            last_point + direction * radius,
            last_point + direction * (radius * 0.99),
            last_point - direction * (radius * 0.99),
            last_point - direction * radius,
        ]);
    }

    let mut outline = left;
    outline.extend(end_cap);
    outline.extend(right.into_iter().rev());
    outline.extend(start_cap);
    outline
}

/// A round dot for single-sample strokes.
fn dot_outline(center: Point, toward: Point, radius: f64) -> Vec<Point> {
    let start = center + unit(perpendicular(center - toward)) * -radius;
    (1..=CAP_STEPS)
        .map(|step| {
            let t = f64::from(step) / f64::from(CAP_STEPS);
            rotate_around(start, center, FIXED_PI * 2.0 * t)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_samples(n: usize) -> Vec<StrokePoint> {
        (0..n)
            .map(|i| StrokePoint::new(i as f64 * 4.0, (i as f64 * 0.7).sin() * 6.0, 0.5))
            .collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(stroke_outline(&[], &OutlineOptions::default()).is_empty());
    }

    #[test]
    fn test_zero_size_is_empty() {
        let opts = OutlineOptions::default().with_size(0.0);
        assert!(stroke_outline(&line_samples(10), &opts).is_empty());
    }

    #[test]
    fn test_deterministic() {
        let samples = line_samples(40);
        let opts = OutlineOptions::default().with_taper(10.0, 10.0);
        let a = stroke_outline(&samples, &opts);
        let b = stroke_outline(&samples, &opts);
        assert_eq!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn test_single_point_is_dot() {
        let outline = stroke_outline(&[StrokePoint::new(5.0, 5.0, 0.5)], &OutlineOptions::default());
        assert!(!outline.is_empty());
        for p in &outline {
            assert!(p.distance(Point::new(5.0, 5.0)) < 8.0);
        }
    }

    #[test]
    fn test_two_points_are_subdivided() {
        let samples = stroke_points(
            &[StrokePoint::new(0.0, 0.0, 0.5), StrokePoint::new(100.0, 0.0, 0.5)],
            &OutlineOptions::default(),
        );
        assert!(samples.len() > 2);
        assert_eq!(samples.last().unwrap().point, Point::new(100.0, 0.0));
    }

    #[test]
    fn test_outline_surrounds_centerline() {
        let samples: Vec<StrokePoint> = (0..30)
            .map(|i| StrokePoint::new(i as f64 * 5.0, 0.0, 0.5))
            .collect();
        let opts = OutlineOptions::default()
            .with_size(10.0)
            .with_simulated_pressure(false)
            .with_thinning(0.0);
        let outline = stroke_outline(&samples, &opts);
        let max_y = outline.iter().map(|p| p.y).fold(f64::MIN, f64::max);
        let min_y = outline.iter().map(|p| p.y).fold(f64::MAX, f64::min);
        assert!((max_y - 5.0).abs() < 0.5, "max_y = {max_y}");
        assert!((min_y + 5.0).abs() < 0.5, "min_y = {min_y}");
        assert!(outline.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn test_pressure_changes_width() {
        let heavy: Vec<StrokePoint> = (0..30).map(|i| StrokePoint::new(i as f64 * 5.0, 0.0, 1.0)).collect();
        let light: Vec<StrokePoint> = (0..30).map(|i| StrokePoint::new(i as f64 * 5.0, 0.0, 0.1)).collect();
        let opts = OutlineOptions::default().with_simulated_pressure(false);
        let spread = |o: Vec<Point>| {
            let max = o.iter().map(|p| p.y).fold(f64::MIN, f64::max);
            let min = o.iter().map(|p| p.y).fold(f64::MAX, f64::min);
            max - min
        };
        assert!(spread(stroke_outline(&heavy, &opts)) > spread(stroke_outline(&light, &opts)));
    }

    #[test]
    fn test_hairpin_turn_stays_finite() {
        let mut samples: Vec<StrokePoint> = (0..20).map(|i| StrokePoint::new(i as f64 * 5.0, 0.0, 0.5)).collect();
        samples.extend((0..20).rev().map(|i| StrokePoint::new(i as f64 * 5.0, 0.5, 0.5)));
        let outline = stroke_outline(&samples, &OutlineOptions::default());
        assert!(!outline.is_empty());
        assert!(outline.iter().all(|p| p.is_finite()));
    }
}
