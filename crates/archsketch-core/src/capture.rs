//! Free-hand stroke capture: pointer samples in, finalized strokes out.
//!
//! Move samples are queued and committed at most once per display frame.
//! The host owns the frame loop: it provides a [`FrameScheduler`] and calls
//! [`StrokeCapture::flush_frame`] from its frame callback.

use crate::geometry::{OutlineOptions, stroke_outline};
use crate::input::PointerSample;
use crate::model::{Stroke, StrokePoint, StrokeTool};
use crate::tools::ToolSettings;
use kurbo::Point;

/// Handle of a requested frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Source of display-frame callbacks (`requestAnimationFrame` in a browser).
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameHandle;
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// Scheduler that only records requests; the caller decides when frames fire.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    next: u64,
    pending: Vec<FrameHandle>,
    requested: usize,
    canceled: usize,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames requested and neither fired nor canceled.
    pub fn pending(&self) -> &[FrameHandle] {
        &self.pending
    }

    /// Total number of requests made.
    pub fn requested(&self) -> usize {
        self.requested
    }

    /// Total number of cancellations.
    pub fn canceled(&self) -> usize {
        self.canceled
    }

    /// Mark all pending frames as fired. Returns whether any were pending.
    pub fn fire(&mut self) -> bool {
        let any = !self.pending.is_empty();
        self.pending.clear();
        any
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) -> FrameHandle {
        self.next += 1;
        self.requested += 1;
        let handle = FrameHandle(self.next);
        self.pending.push(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if let Some(pos) = self.pending.iter().position(|h| *h == handle) {
            self.pending.remove(pos);
            self.canceled += 1;
        }
    }
}

/// Gesture lifecycle. `Finalizing` and `Canceled` only exist for the
/// duration of `end` and `cancel`; the capture always settles back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapturePhase {
    #[default]
    Idle,
    Active,
    Finalizing,
    Canceled,
}

#[derive(Debug, Clone)]
struct Brush {
    tool: StrokeTool,
    color: String,
    width: f64,
}

/// Accumulates one stroke at a time. Positions are canvas coordinates.
#[derive(Debug, Clone, Default)]
pub struct StrokeCapture {
    phase: CapturePhase,
    points: Vec<StrokePoint>,
    queued: Vec<StrokePoint>,
    pending_frame: Option<FrameHandle>,
    brush: Option<Brush>,
}

impl StrokeCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> CapturePhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == CapturePhase::Active
    }

    /// Whether a frame callback is outstanding.
    pub fn has_pending_frame(&self) -> bool {
        self.pending_frame.is_some()
    }

    /// Start a gesture. Returns false (and stays idle) for non-drawing tools,
    /// palm contacts, or while another gesture is active.
    pub fn begin(&mut self, sample: &PointerSample, settings: &ToolSettings) -> bool {
        if self.phase != CapturePhase::Idle {
            return false;
        }
        let Some(tool) = settings.tool.stroke_tool() else {
            return false;
        };
        if sample.is_palm() {
            log::debug!("Ignoring palm contact at {:?}", sample.position);
            return false;
        }

        self.points.clear();
        self.queued.clear();
        self.points.push(StrokePoint::new(
            sample.position.x,
            sample.position.y,
            sample.effective_pressure(),
        ));
        self.brush = Some(Brush {
            tool,
            color: settings.color.clone(),
            width: settings.effective_size(),
        });
        self.phase = CapturePhase::Active;
        true
    }

    /// Queue a move sample; requests a frame if none is pending.
    pub fn push(&mut self, sample: &PointerSample, scheduler: &mut dyn FrameScheduler) {
        if self.phase != CapturePhase::Active {
            return;
        }
        let point = self.constrained(sample);
        self.queued.push(point);
        if self.pending_frame.is_none() {
            self.pending_frame = Some(scheduler.request_frame());
        }
    }

    /// Commit queued samples in one append. Returns how many were added.
    pub fn flush_frame(&mut self) -> usize {
        self.pending_frame = None;
        let count = self.queued.len();
        self.points.append(&mut self.queued);
        count
    }

    /// Finish the gesture. The release point is appended when it differs
    /// from the last recorded one. Gestures with fewer than two points are
    /// discarded.
    pub fn end(
        &mut self,
        release: Option<&PointerSample>,
        scheduler: &mut dyn FrameScheduler,
    ) -> Option<Stroke> {
        if self.phase != CapturePhase::Active {
            return None;
        }
        if let Some(handle) = self.pending_frame.take() {
            scheduler.cancel_frame(handle);
        }
        self.flush_frame();

        if let Some(sample) = release {
            let point = self.constrained(sample);
            let moved = self
                .points
                .last()
                .is_none_or(|last| last.x != point.x || last.y != point.y);
            if moved {
                self.points.push(point);
            }
        }

        self.phase = CapturePhase::Finalizing;
        let points = std::mem::take(&mut self.points);
        let brush = self.brush.take();
        self.phase = CapturePhase::Idle;

        match brush {
            Some(brush) if points.len() >= 2 => {
                Some(Stroke::new(points, brush.color, brush.width, brush.tool))
            }
            _ => {
                log::debug!("Discarding gesture with {} point(s)", points.len());
                None
            }
        }
    }

    /// Abandon the gesture and any pending frame.
    pub fn cancel(&mut self, scheduler: &mut dyn FrameScheduler) {
        if let Some(handle) = self.pending_frame.take() {
            scheduler.cancel_frame(handle);
        }
        if self.phase == CapturePhase::Active {
            self.phase = CapturePhase::Canceled;
            log::debug!("Stroke capture canceled with {} point(s)", self.points.len());
        }
        self.points.clear();
        self.queued.clear();
        self.brush = None;
        self.phase = CapturePhase::Idle;
    }

    /// Points committed so far (queued samples appear after the next frame).
    pub fn live_points(&self) -> &[StrokePoint] {
        &self.points
    }

    /// Preview outline of the in-progress stroke.
    pub fn live_outline(&self, options: &OutlineOptions) -> Vec<Point> {
        let Some(brush) = &self.brush else {
            return Vec::new();
        };
        let options = options.clone().with_size(brush.width).with_last(false);
        stroke_outline(&self.points, &options)
    }

    /// With shift held, lock to the dominant axis measured from the first point.
    fn constrained(&self, sample: &PointerSample) -> StrokePoint {
        let pressure = sample.effective_pressure();
        let Point { x, y } = sample.position;
        match self.points.first() {
            Some(origin) if sample.modifiers.shift => {
                if (x - origin.x).abs() >= (y - origin.y).abs() {
                    StrokePoint::new(x, origin.y, pressure)
                } else {
                    StrokePoint::new(origin.x, y, pressure)
                }
            }
            _ => StrokePoint::new(x, y, pressure),
        }
    }
}
