//! Pan/zoom camera for the board viewport.

use kurbo::{Affine, Point, Rect, Size, Vec2};
use serde::{Deserialize, Serialize};

/// View transform for the canvas: pan offset plus zoom.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    /// Pan offset in screen pixels.
    pub pan: Vec2,
    /// Zoom factor (1.0 = 100%).
    pub zoom: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 1.0,
            min_zoom: 0.1,
            max_zoom: 8.0,
        }
    }
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// World -> screen transform.
    pub fn transform(&self) -> Affine {
        Affine::translate(self.pan) * Affine::scale(self.zoom)
    }

    /// Screen -> world transform.
    pub fn inverse_transform(&self) -> Affine {
        Affine::scale(1.0 / self.zoom) * Affine::translate(-self.pan)
    }

    pub fn screen_to_world(&self, screen: Point) -> Point {
        self.inverse_transform() * screen
    }

    pub fn world_to_screen(&self, world: Point) -> Point {
        self.transform() * world
    }

    pub fn pan_by(&mut self, delta: Vec2) {
        self.pan += delta;
    }

    /// Zoom keeping the given screen point fixed.
    pub fn zoom_at(&mut self, screen_anchor: Point, factor: f64) {
        let world_anchor = self.screen_to_world(screen_anchor);
        self.zoom = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        // Re-derive pan so the anchor maps back to the same screen point.
        self.pan = screen_anchor.to_vec2() - world_anchor.to_vec2() * self.zoom;
    }

    pub fn reset_zoom(&mut self) {
        self.zoom = 1.0;
    }

    /// Fit the camera so `bounds` fills the viewport with padding.
    pub fn fit_to_bounds(&mut self, bounds: Rect, viewport: Size, padding: f64) {
        if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
            return;
        }
        let scale_x = (viewport.width - padding * 2.0) / bounds.width();
        let scale_y = (viewport.height - padding * 2.0) / bounds.height();
        self.zoom = scale_x.min(scale_y).clamp(self.min_zoom, self.max_zoom);
        let center = bounds.center();
        self.pan = Vec2::new(
            viewport.width / 2.0 - center.x * self.zoom,
            viewport.height / 2.0 - center.y * self.zoom,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_transform() {
        let mut camera = Camera::new();
        camera.pan = Vec2::new(40.0, -20.0);
        camera.zoom = 2.0;
        let world = Point::new(123.0, 456.0);
        let screen = camera.world_to_screen(world);
        let back = camera.screen_to_world(screen);
        assert!((back.x - world.x).abs() < 1e-9);
        assert!((back.y - world.y).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_at_keeps_anchor_fixed() {
        let mut camera = Camera::new();
        let anchor = Point::new(200.0, 150.0);
        let world_before = camera.screen_to_world(anchor);
        camera.zoom_at(anchor, 1.5);
        let world_after = camera.screen_to_world(anchor);
        assert!((world_before.x - world_after.x).abs() < 1e-9);
        assert!((world_before.y - world_after.y).abs() < 1e-9);
    }

    #[test]
    fn test_zoom_clamped() {
        let mut camera = Camera::new();
        camera.zoom_at(Point::ZERO, 1000.0);
        assert!((camera.zoom - camera.max_zoom).abs() < 1e-9);
        camera.zoom_at(Point::ZERO, 1e-6);
        assert!((camera.zoom - camera.min_zoom).abs() < 1e-9);
    }

    #[test]
    fn test_fit_to_bounds_centers_content() {
        let mut camera = Camera::new();
        camera.fit_to_bounds(
            Rect::new(0.0, 0.0, 100.0, 100.0),
            Size::new(800.0, 600.0),
            50.0,
        );
        let center_screen = camera.world_to_screen(Point::new(50.0, 50.0));
        assert!((center_screen.x - 400.0).abs() < 1e-6);
        assert!((center_screen.y - 300.0).abs() < 1e-6);
    }
}
