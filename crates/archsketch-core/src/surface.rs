//! The interactive drawing layer.
//!
//! Routes pointer and key events either into stroke capture or into the
//! eraser, and reports finished strokes and deletions to a [`DrawingHost`].

use crate::camera::{ScreenTransform, screen_to_canvas};
use crate::capture::{FrameScheduler, StrokeCapture};
use crate::config::DrawingConfig;
use crate::geometry::distance_to_polyline;
use crate::input::{KeyEvent, PointerEvent, PointerSample};
use crate::model::{EntityId, Stroke};
use crate::spatial::StrokeIndexCache;
use crate::tools::{ToolKind, ToolSettings};
use kurbo::Point;
use std::collections::HashMap;

/// Receiver of drawing results.
pub trait DrawingHost {
    fn on_stroke_complete(&mut self, stroke: Stroke);
    fn on_stroke_delete(&mut self, stroke_id: &str);
}

/// Pointer-driven drawing and erasing over a synced copy of the strokes.
pub struct DrawingSurface {
    config: DrawingConfig,
    settings: ToolSettings,
    capture: StrokeCapture,
    transform: Option<Box<dyn ScreenTransform>>,
    strokes: Vec<Stroke>,
    /// Stroke id to position in `strokes`.
    positions: HashMap<EntityId, usize>,
    index: StrokeIndexCache,
    next_z: i64,
    hovered: Option<EntityId>,
    erasing: bool,
}

impl std::fmt::Debug for DrawingSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawingSurface")
            .field("settings", &self.settings)
            .field("capture", &self.capture.phase())
            .field("strokes", &self.strokes.len())
            .field("indexed", &self.index.is_built())
            .field("hovered", &self.hovered)
            .finish()
    }
}

impl Default for DrawingSurface {
    fn default() -> Self {
        Self::new(DrawingConfig::default())
    }
}

impl DrawingSurface {
    pub fn new(config: DrawingConfig) -> Self {
        Self {
            settings: ToolSettings::from_config(&config),
            index: StrokeIndexCache::new(config.index_threshold),
            config,
            capture: StrokeCapture::new(),
            transform: None,
            strokes: Vec::new(),
            positions: HashMap::new(),
            next_z: 0,
            hovered: None,
            erasing: false,
        }
    }

    /// Install (or remove) the screen-to-canvas mapping.
    pub fn set_transform(&mut self, transform: Option<Box<dyn ScreenTransform>>) {
        self.transform = transform;
    }

    pub fn settings(&self) -> &ToolSettings {
        &self.settings
    }

    pub fn capture(&self) -> &StrokeCapture {
        &self.capture
    }

    pub fn config(&self) -> &DrawingConfig {
        &self.config
    }

    /// Switch tools. An in-progress stroke keeps the brush it started with.
    pub fn set_tool(&mut self, tool: ToolKind) {
        if tool != ToolKind::Eraser {
            self.hovered = None;
            self.erasing = false;
        }
        self.settings.tool = tool;
    }

    pub fn set_color(&mut self, color: impl Into<String>) {
        self.settings.color = color.into();
    }

    pub fn set_size(&mut self, size: f64) {
        if size.is_finite() && size > 0.0 {
            self.settings.size = size;
        }
    }

    pub fn set_eraser_size(&mut self, size: f64) {
        if size.is_finite() && size > 0.0 {
            self.settings.eraser_size = size;
        }
    }

    /// Replace the local copy of the stroke collection. New strokes are
    /// stacked above the highest z-index seen here.
    pub fn sync_strokes(&mut self, strokes: &[Stroke]) {
        self.strokes = strokes.to_vec();
        self.positions = self
            .strokes
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();
        self.next_z = strokes.iter().map(|s| s.z_index).max().map_or(0, |z| z + 1);
        if let Some(id) = &self.hovered {
            if !self.strokes.iter().any(|s| &s.id == id) {
                self.hovered = None;
            }
        }
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    /// Stroke currently under the eraser.
    pub fn hovered_stroke(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn is_index_built(&self) -> bool {
        self.index.is_built()
    }

    /// Commit samples queued since the last frame.
    pub fn flush_frame(&mut self) -> usize {
        self.capture.flush_frame()
    }

    pub fn handle_pointer(
        &mut self,
        event: PointerEvent,
        scheduler: &mut dyn FrameScheduler,
        host: &mut dyn DrawingHost,
    ) {
        match event {
            PointerEvent::Down(sample) => {
                let sample = self.to_canvas(sample);
                if self.settings.tool == ToolKind::Eraser {
                    if !sample.is_palm() {
                        self.erasing = true;
                        self.update_hover(sample.position);
                    }
                } else {
                    self.capture.begin(&sample, &self.settings);
                }
            }
            PointerEvent::Move(sample) => {
                let sample = self.to_canvas(sample);
                if self.capture.is_active() {
                    self.capture.push(&sample, scheduler);
                } else if self.settings.tool == ToolKind::Eraser {
                    self.update_hover(sample.position);
                }
            }
            PointerEvent::Up(sample) => {
                let sample = self.to_canvas(sample);
                if self.capture.is_active() {
                    if let Some(stroke) = self.capture.end(Some(&sample), scheduler) {
                        let stroke = stroke.with_z_index(self.next_z);
                        self.next_z += 1;
                        host.on_stroke_complete(stroke);
                    }
                } else if self.erasing {
                    self.erasing = false;
                    if let Some(id) = self.hovered.take() {
                        host.on_stroke_delete(&id);
                    }
                }
            }
            PointerEvent::Cancel => self.cancel(scheduler),
        }
    }

    pub fn handle_key(&mut self, event: &KeyEvent, scheduler: &mut dyn FrameScheduler) {
        if event.is_escape_press() {
            self.cancel(scheduler);
        }
    }

    /// Abort any stroke or erase gesture in progress.
    pub fn cancel(&mut self, scheduler: &mut dyn FrameScheduler) {
        self.capture.cancel(scheduler);
        self.erasing = false;
        self.hovered = None;
    }

    /// Nearest visible stroke within reach of the eraser at `point`.
    pub fn hit_test(&mut self, point: Point) -> Option<&Stroke> {
        let eraser_radius = self.settings.eraser_size / 2.0;
        let max_half_width = self
            .strokes
            .iter()
            .map(|s| s.width / 2.0)
            .fold(0.0_f64, f64::max);

        let positions: Vec<usize> = match self.index.refresh(&self.strokes, max_half_width) {
            Some(index) => index
                .query(point, eraser_radius)
                .into_iter()
                .filter_map(|id| self.positions.get(id).copied())
                .collect(),
            None => (0..self.strokes.len()).collect(),
        };

        // Ties go to the earlier stroke so both paths agree.
        let mut best: Option<(f64, usize)> = None;
        for i in positions {
            let Some(stroke) = self.strokes.get(i).filter(|s| s.visible) else {
                continue;
            };
            let Some(distance) = distance_to_polyline(point, &stroke.points) else {
                continue;
            };
            if distance <= eraser_radius + stroke.width / 2.0
                && best.is_none_or(|(d, j)| distance < d || (distance == d && i < j))
            {
                best = Some((distance, i));
            }
        }
        best.and_then(|(_, i)| self.strokes.get(i))
    }

    fn update_hover(&mut self, point: Point) {
        self.hovered = self.hit_test(point).map(|s| s.id.clone());
    }

    fn to_canvas(&self, mut sample: PointerSample) -> PointerSample {
        sample.position = screen_to_canvas(sample.position, self.transform.as_deref());
        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::capture::ManualScheduler;
    use crate::model::{StrokePoint, StrokeTool};

    #[derive(Default)]
    struct Recorder {
        completed: Vec<Stroke>,
        deleted: Vec<String>,
    }

    impl DrawingHost for Recorder {
        fn on_stroke_complete(&mut self, stroke: Stroke) {
            self.completed.push(stroke);
        }

        fn on_stroke_delete(&mut self, stroke_id: &str) {
            self.deleted.push(stroke_id.to_string());
        }
    }

    fn at(x: f64, y: f64) -> PointerSample {
        PointerSample::mouse(Point::new(x, y))
    }

    fn line(id: &str, from: (f64, f64), to: (f64, f64)) -> Stroke {
        Stroke::new(
            vec![
                StrokePoint::new(from.0, from.1, 0.5),
                StrokePoint::new(to.0, to.1, 0.5),
            ],
            "#000",
            2.0,
            StrokeTool::Pen,
        )
        .with_id(id)
    }

    #[test]
    fn test_pen_stroke_completes_once() {
        let mut surface = DrawingSurface::default();
        let mut frames = ManualScheduler::new();
        let mut host = Recorder::default();
        surface.set_tool(ToolKind::Pen);

        surface.handle_pointer(PointerEvent::Down(at(10.0, 10.0)), &mut frames, &mut host);
        surface.handle_pointer(PointerEvent::Move(at(15.0, 15.0)), &mut frames, &mut host);
        surface.handle_pointer(PointerEvent::Up(at(20.0, 20.0)), &mut frames, &mut host);

        assert_eq!(host.completed.len(), 1);
        let stroke = &host.completed[0];
        assert!(stroke.points.len() >= 2);
        assert_eq!(stroke.points[0].point(), Point::new(10.0, 10.0));
        assert!(frames.pending().is_empty());
    }

    #[test]
    fn test_eraser_deletes_once() {
        let mut surface = DrawingSurface::default();
        let mut frames = ManualScheduler::new();
        let mut host = Recorder::default();
        surface.sync_strokes(&[line("s1", (0.0, 0.0), (100.0, 0.0))]);
        surface.set_tool(ToolKind::Eraser);

        surface.handle_pointer(PointerEvent::Down(at(50.0, 1.0)), &mut frames, &mut host);
        assert_eq!(surface.hovered_stroke(), Some("s1"));
        surface.handle_pointer(PointerEvent::Move(at(51.0, 1.0)), &mut frames, &mut host);
        surface.handle_pointer(PointerEvent::Up(at(51.0, 1.0)), &mut frames, &mut host);
        surface.handle_pointer(PointerEvent::Up(at(51.0, 1.0)), &mut frames, &mut host);

        assert_eq!(host.deleted, vec!["s1".to_string()]);
        assert!(host.completed.is_empty());
    }

    #[test]
    fn test_eraser_miss() {
        let mut surface = DrawingSurface::default();
        let mut frames = ManualScheduler::new();
        let mut host = Recorder::default();
        surface.sync_strokes(&[line("s1", (0.0, 0.0), (100.0, 0.0))]);
        surface.set_tool(ToolKind::Eraser);

        // Reach is eraser 8 + half width 1
        surface.handle_pointer(PointerEvent::Down(at(50.0, 9.5)), &mut frames, &mut host);
        surface.handle_pointer(PointerEvent::Up(at(50.0, 9.5)), &mut frames, &mut host);
        assert!(host.deleted.is_empty());
    }

    #[test]
    fn test_hit_test_prefers_nearest() {
        let mut surface = DrawingSurface::default();
        surface.sync_strokes(&[
            line("far", (0.0, 6.0), (100.0, 6.0)),
            line("near", (0.0, 2.0), (100.0, 2.0)),
        ]);
        assert_eq!(surface.hit_test(Point::new(50.0, 0.0)).map(|s| s.id.as_str()), Some("near"));
    }

    #[test]
    fn test_indexed_hit_test_matches_linear_scan() {
        let strokes: Vec<Stroke> = (0..60)
            .map(|i| {
                let y = f64::from(i) * 20.0;
                line(&format!("s{i}"), (0.0, y), (100.0, y))
            })
            .collect();
        let mut surface = DrawingSurface::default();
        surface.sync_strokes(&strokes);

        let hit = surface.hit_test(Point::new(40.0, 203.0)).map(|s| s.id.clone());
        assert!(surface.is_index_built());
        assert_eq!(hit.as_deref(), Some("s10"));
        assert!(surface.hit_test(Point::new(40.0, 210.0)).is_none());
    }

    #[test]
    fn test_indexed_hit_test_follows_moved_stroke() {
        let mut strokes: Vec<Stroke> = (0..50)
            .map(|i| {
                let y = f64::from(i) * 20.0;
                line(&format!("s{i}"), (0.0, y), (100.0, y))
            })
            .collect();
        let mut surface = DrawingSurface::default();
        surface.sync_strokes(&strokes);
        assert_eq!(surface.hit_test(Point::new(50.0, 0.0)).map(|s| s.id.as_str()), Some("s0"));

        // Replaced under the same id with the same point count.
        strokes[0] = line("s0", (0.0, 5000.0), (100.0, 5000.0));
        surface.sync_strokes(&strokes);
        assert!(surface.is_index_built());
        assert_eq!(surface.hit_test(Point::new(50.0, 5000.0)).map(|s| s.id.as_str()), Some("s0"));
        assert!(surface.hit_test(Point::new(50.0, 0.0)).is_none());
    }

    #[test]
    fn test_invisible_strokes_not_erasable() {
        let mut hidden = line("h", (0.0, 0.0), (100.0, 0.0));
        hidden.visible = false;
        let mut surface = DrawingSurface::default();
        surface.sync_strokes(&[hidden]);
        assert!(surface.hit_test(Point::new(50.0, 0.0)).is_none());
    }

    #[test]
    fn test_escape_cancels_stroke() {
        let mut surface = DrawingSurface::default();
        let mut frames = ManualScheduler::new();
        let mut host = Recorder::default();
        surface.set_tool(ToolKind::Pen);

        surface.handle_pointer(PointerEvent::Down(at(0.0, 0.0)), &mut frames, &mut host);
        surface.handle_pointer(PointerEvent::Move(at(5.0, 5.0)), &mut frames, &mut host);
        surface.handle_key(&KeyEvent::Pressed("Escape".to_string()), &mut frames);
        surface.handle_pointer(PointerEvent::Up(at(10.0, 10.0)), &mut frames, &mut host);

        assert!(host.completed.is_empty());
        assert!(frames.pending().is_empty());
    }

    #[test]
    fn test_pointer_cancel() {
        let mut surface = DrawingSurface::default();
        let mut frames = ManualScheduler::new();
        let mut host = Recorder::default();
        surface.set_tool(ToolKind::Pen);

        surface.handle_pointer(PointerEvent::Down(at(0.0, 0.0)), &mut frames, &mut host);
        surface.handle_pointer(PointerEvent::Cancel, &mut frames, &mut host);
        surface.handle_pointer(PointerEvent::Up(at(10.0, 10.0)), &mut frames, &mut host);
        assert!(host.completed.is_empty());
    }

    #[test]
    fn test_z_index_stacks_above_synced() {
        let mut surface = DrawingSurface::default();
        let mut frames = ManualScheduler::new();
        let mut host = Recorder::default();
        surface.sync_strokes(&[line("a", (0.0, 0.0), (1.0, 1.0)).with_z_index(7)]);
        surface.set_tool(ToolKind::Pen);

        for _ in 0..2 {
            surface.handle_pointer(PointerEvent::Down(at(0.0, 0.0)), &mut frames, &mut host);
            surface.handle_pointer(PointerEvent::Up(at(9.0, 9.0)), &mut frames, &mut host);
        }
        let z: Vec<i64> = host.completed.iter().map(|s| s.z_index).collect();
        assert_eq!(z, vec![8, 9]);
    }

    #[test]
    fn test_transform_maps_to_canvas() {
        let mut surface = DrawingSurface::default();
        let mut frames = ManualScheduler::new();
        let mut host = Recorder::default();
        let mut camera = Camera::new();
        camera.zoom = 2.0;
        surface.set_transform(Some(Box::new(camera)));
        surface.set_tool(ToolKind::Pen);

        surface.handle_pointer(PointerEvent::Down(at(20.0, 40.0)), &mut frames, &mut host);
        surface.handle_pointer(PointerEvent::Up(at(40.0, 40.0)), &mut frames, &mut host);
        assert_eq!(host.completed[0].points[0].point(), Point::new(10.0, 20.0));
    }

    #[test]
    fn test_setters_ignore_invalid_sizes() {
        let mut surface = DrawingSurface::default();
        surface.set_size(6.0);
        surface.set_size(-1.0);
        surface.set_eraser_size(f64::NAN);
        surface.set_color("#ff0000");
        assert!((surface.settings().size - 6.0).abs() < f64::EPSILON);
        assert!((surface.settings().eraser_size - 16.0).abs() < f64::EPSILON);
        assert_eq!(surface.settings().color, "#ff0000");
    }
}
