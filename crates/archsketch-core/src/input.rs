//! Pointer and keyboard events as delivered by the host.

use crate::model::StrokePoint;
use kurbo::{Point, Size};
use serde::{Deserialize, Serialize};

/// Touch contacts wider or taller than this (in CSS pixels) are treated as
/// a resting palm and never start a stroke.
pub const PALM_CONTACT_SIZE: f64 = 40.0;

/// Kind of device that produced a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerKind {
    #[default]
    Mouse,
    Pen,
    Touch,
}

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const SHIFT: Self = Self {
        shift: true,
        ctrl: false,
        alt: false,
        meta: false,
    };
}

/// One pointer reading in screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerSample {
    pub position: Point,
    /// Reported pressure in `[0, 1]`; `None` when the device has none.
    pub pressure: Option<f64>,
    pub kind: PointerKind,
    /// Contact geometry; zero for mice and pens.
    pub contact: Size,
    pub modifiers: Modifiers,
}

impl PointerSample {
    pub fn mouse(position: Point) -> Self {
        Self {
            position,
            pressure: None,
            kind: PointerKind::Mouse,
            contact: Size::ZERO,
            modifiers: Modifiers::default(),
        }
    }

    pub fn pen(position: Point, pressure: f64) -> Self {
        Self {
            pressure: Some(pressure),
            kind: PointerKind::Pen,
            ..Self::mouse(position)
        }
    }

    pub fn touch(position: Point, contact: Size) -> Self {
        Self {
            kind: PointerKind::Touch,
            contact,
            ..Self::mouse(position)
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Whether this looks like a palm resting on a touch screen.
    pub fn is_palm(&self) -> bool {
        self.kind == PointerKind::Touch
            && (self.contact.width > PALM_CONTACT_SIZE || self.contact.height > PALM_CONTACT_SIZE)
    }

    /// Pressure to record; browsers report 0 for devices without a sensor.
    pub fn effective_pressure(&self) -> f64 {
        match self.pressure {
            Some(p) if p > 0.0 && p.is_finite() => p.min(1.0),
            _ => StrokePoint::DEFAULT_PRESSURE,
        }
    }
}

/// Pointer event for unified mouse/pen/touch handling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    Down(PointerSample),
    Move(PointerSample),
    Up(PointerSample),
    /// The platform aborted the gesture (`pointercancel`).
    Cancel,
}

/// Keyboard event type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyEvent {
    Pressed(String),
    Released(String),
}

impl KeyEvent {
    pub fn is_escape_press(&self) -> bool {
        matches!(self, KeyEvent::Pressed(key) if key == "Escape")
    }
}
