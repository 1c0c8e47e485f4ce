//! Pan/zoom view transform and screen-to-canvas mapping.

use crate::error::TransformError;
use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// Zoom bounds accepted by [`Camera::zoom_at`].
pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 8.0;

/// Something that maps screen (pointer) coordinates into canvas space.
///
/// Implementations may fail, e.g. while the hosting surface is detached or
/// the zoom has collapsed to zero.
pub trait ScreenTransform {
    fn to_canvas(&self, screen: Point) -> Result<Point, TransformError>;
}

/// Map a screen point to canvas coordinates.
///
/// Falls back to the raw coordinates when no transform is available or the
/// transform fails, so pointer handling never stalls.
pub fn screen_to_canvas(screen: Point, transform: Option<&dyn ScreenTransform>) -> Point {
    let Some(transform) = transform else {
        return screen;
    };
    match transform.to_canvas(screen) {
        Ok(point) => point,
        Err(err) => {
            log::debug!("screen_to_canvas falling back to raw coordinates: {}", err);
            screen
        }
    }
}

/// View transform for the canvas: `screen = canvas * zoom + offset`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Translation in screen pixels.
    pub offset: Vec2,
    pub zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            zoom: 1.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canvas to screen.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.zoom)
    }

    /// Screen to canvas. Exact inverse of [`Camera::transform`].
    pub fn inverse_transform(&self) -> Result<Affine, TransformError> {
        if !self.zoom.is_finite() || self.zoom.abs() < f64::EPSILON {
            return Err(TransformError::NotInvertible(self.zoom));
        }
        Ok(Affine::scale(1.0 / self.zoom) * Affine::translate(-self.offset))
    }

    /// Convert a screen point to canvas coordinates.
    pub fn screen_to_world(&self, screen_point: Point) -> Result<Point, TransformError> {
        let world = self.inverse_transform()? * screen_point;
        if world.is_finite() {
            Ok(world)
        } else {
            Err(TransformError::NonFinite)
        }
    }

    /// Convert a canvas point to screen coordinates.
    pub fn world_to_screen(&self, world_point: Point) -> Point {
        self.transform() * world_point
    }

    /// Pan by a delta in screen pixels.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
    }

    /// Zoom by `factor`, keeping `screen_point` fixed on screen.
    pub fn zoom_at(&mut self, screen_point: Point, factor: f64) {
        let Ok(anchor) = self.screen_to_world(screen_point) else {
            return;
        };
        let new_zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        if (new_zoom - self.zoom).abs() < f64::EPSILON {
            return;
        }
        self.zoom = new_zoom;
        let drift = self.world_to_screen(anchor);
        self.offset += screen_point - drift;
    }

    /// Frame `bounds` inside a viewport of `viewport` pixels.
    pub fn fit_to_bounds(&mut self, bounds: Rect, viewport: Size, padding: f64) {
        if bounds.is_zero_area() {
            *self = Self::default();
            return;
        }

        let usable = Size::new(
            (viewport.width - padding * 2.0).max(1.0),
            (viewport.height - padding * 2.0).max(1.0),
        );
        self.zoom = (usable.width / bounds.width())
            .min(usable.height / bounds.height())
            .clamp(MIN_ZOOM, MAX_ZOOM);

        let center = bounds.center();
        self.offset = Vec2::new(
            viewport.width / 2.0 - center.x * self.zoom,
            viewport.height / 2.0 - center.y * self.zoom,
        );
    }
}

impl ScreenTransform for Camera {
    fn to_canvas(&self, screen: Point) -> Result<Point, TransformError> {
        self.screen_to_world(screen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Detached;

    impl ScreenTransform for Detached {
        fn to_canvas(&self, _screen: Point) -> Result<Point, TransformError> {
            Err(TransformError::Unavailable("surface detached".to_string()))
        }
    }

    #[test]
    fn test_fallback_without_transform() {
        let p = screen_to_canvas(Point::new(12.5, -3.0), None);
        assert_eq!(p, Point::new(12.5, -3.0));
    }

    #[test]
    fn test_fallback_on_failing_transform() {
        let p = screen_to_canvas(Point::new(7.0, 8.0), Some(&Detached));
        assert_eq!(p, Point::new(7.0, 8.0));

        let collapsed = Camera {
            offset: Vec2::new(5.0, 5.0),
            zoom: 0.0,
        };
        let p = screen_to_canvas(Point::new(7.0, 8.0), Some(&collapsed));
        assert_eq!(p, Point::new(7.0, 8.0));
    }

    #[test]
    fn test_screen_to_world_with_offset_and_zoom() {
        let camera = Camera {
            offset: Vec2::new(50.0, 100.0),
            zoom: 2.0,
        };
        let world = camera.screen_to_world(Point::new(150.0, 300.0)).unwrap();
        assert!((world.x - 50.0).abs() < 1e-10);
        assert!((world.y - 100.0).abs() < 1e-10);
    }

    #[test]
    fn test_roundtrip_conversion() {
        let camera = Camera {
            offset: Vec2::new(30.0, -20.0),
            zoom: 1.5,
        };
        let original = Point::new(123.0, 456.0);
        let world = camera.screen_to_world(original).unwrap();
        let back = camera.world_to_screen(world);
        assert!((back.x - original.x).abs() < 1e-10);
        assert!((back.y - original.y).abs() < 1e-10);
    }

    #[test]
    fn test_zoom_at_keeps_anchor() {
        let mut camera = Camera::new();
        let anchor = Point::new(200.0, 100.0);
        let before = camera.screen_to_world(anchor).unwrap();
        camera.zoom_at(anchor, 2.0);
        let after = camera.screen_to_world(anchor).unwrap();
        assert!((before.x - after.x).abs() < 1e-9);
        assert!((before.y - after.y).abs() < 1e-9);
        assert!((camera.zoom - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zoom_clamp() {
        let mut camera = Camera::new();
        camera.zoom_at(Point::ZERO, 0.001);
        assert!((camera.zoom - MIN_ZOOM).abs() < f64::EPSILON);
        camera.zoom_at(Point::ZERO, 1000.0);
        assert!((camera.zoom - MAX_ZOOM).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fit_to_bounds_centers() {
        let mut camera = Camera::new();
        let bounds = Rect::new(0.0, 0.0, 100.0, 50.0);
        camera.fit_to_bounds(bounds, Size::new(400.0, 400.0), 0.0);
        let center = camera.world_to_screen(bounds.center());
        assert!((center.x - 200.0).abs() < 1e-9);
        assert!((center.y - 200.0).abs() < 1e-9);
    }
}
