//! Camera/viewport - pan and zoom transform between screen and world space
//!
//! Screen space is in pixels with the origin at the top-left corner of the
//! viewport. The camera position is the world point shown at the viewport
//! centre; zoom is screen pixels per world unit.

use glam::{Mat3, Mat4, Vec2, Vec3};

use crate::config::CameraConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: Vec2,
    zoom: f32,
    /// Viewport size in screen pixels
    viewport: Vec2,
    min_zoom: f32,
    max_zoom: f32,
}

impl Camera {
    pub fn new(viewport: Vec2, config: &CameraConfig) -> Self {
        let min_zoom = config.min_zoom.max(f32::MIN_POSITIVE);
        let max_zoom = config.max_zoom.max(min_zoom);
        Self {
            position: Vec2::ZERO,
            zoom: config.initial_zoom.clamp(min_zoom, max_zoom),
            viewport: viewport.max(Vec2::ONE),
            min_zoom,
            max_zoom,
        }
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn zoom_range(&self) -> (f32, f32) {
        (self.min_zoom, self.max_zoom)
    }

    pub fn set_position(&mut self, position: Vec2) {
        if position.is_finite() {
            self.position = position;
        }
    }

    /// Set zoom immediately, clamped to the configured range
    pub fn set_zoom(&mut self, zoom: f32) {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        }
    }

    pub fn set_viewport(&mut self, viewport: Vec2) {
        if viewport.is_finite() {
            self.viewport = viewport.max(Vec2::ONE);
        }
    }

    /// Move the view so content follows a pointer drag of `screen_delta` pixels
    pub fn pan(&mut self, screen_delta: Vec2) {
        if screen_delta.is_finite() {
            self.position -= screen_delta / self.zoom;
        }
    }

    /// Multiply zoom by `factor`, keeping the world point under `screen_point` fixed
    pub fn zoom_at(&mut self, screen_point: Vec2, factor: f32) {
        if !(factor.is_finite() && factor > 0.0) || !screen_point.is_finite() {
            return;
        }
        let anchor = self.screen_to_world(screen_point);
        self.zoom = (self.zoom * factor).clamp(self.min_zoom, self.max_zoom);
        self.position = anchor - (screen_point - self.viewport * 0.5) / self.zoom;
    }

    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        (screen - self.viewport * 0.5) / self.zoom + self.position
    }

    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        (world - self.position) * self.zoom + self.viewport * 0.5
    }

    /// 2D affine world -> screen transform
    pub fn view_matrix(&self) -> Mat3 {
        Mat3::from_translation(self.viewport * 0.5)
            * Mat3::from_scale(Vec2::splat(self.zoom))
            * Mat3::from_translation(-self.position)
    }

    /// World -> clip space transform for GPU backends (y up in clip space)
    pub fn projection_matrix(&self) -> Mat4 {
        let screen_to_clip = Mat4::from_translation(Vec3::new(-1.0, 1.0, 0.0))
            * Mat4::from_scale(Vec3::new(
                2.0 / self.viewport.x,
                -2.0 / self.viewport.y,
                1.0,
            ));
        let world_to_screen = Mat4::from_translation((self.viewport * 0.5).extend(0.0))
            * Mat4::from_scale(Vec3::new(self.zoom, self.zoom, 1.0))
            * Mat4::from_translation((-self.position).extend(0.0));
        screen_to_clip * world_to_screen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        Camera::new(Vec2::new(800.0, 600.0), &CameraConfig::default())
    }

    #[test]
    fn test_centre_maps_to_position() {
        let mut cam = camera();
        cam.set_position(Vec2::new(5.0, -3.0));
        assert_eq!(cam.screen_to_world(Vec2::new(400.0, 300.0)), Vec2::new(5.0, -3.0));
    }

    #[test]
    fn test_screen_world_roundtrip() {
        let mut cam = camera();
        cam.set_position(Vec2::new(2.0, 7.0));
        cam.set_zoom(2.5);
        let screen = Vec2::new(123.0, 456.0);
        let back = cam.world_to_screen(cam.screen_to_world(screen));
        assert!((back - screen).length() < 1e-3);
    }

    #[test]
    fn test_zoom_at_preserves_anchor() {
        let mut cam = camera();
        cam.set_position(Vec2::new(1.0, 1.0));
        let p = Vec2::new(650.0, 120.0);
        let before = cam.screen_to_world(p);

        cam.zoom_at(p, 1.7);
        let after = cam.screen_to_world(p);
        assert!((after - before).length() < 1e-4);
        assert!((cam.zoom() - 1.7).abs() < 1e-6);
    }

    #[test]
    fn test_zoom_is_clamped() {
        let mut cam = camera();
        let p = Vec2::new(10.0, 10.0);
        let before = cam.screen_to_world(p);
        cam.zoom_at(p, 1000.0);
        assert_eq!(cam.zoom(), 10.0);
        assert!((cam.screen_to_world(p) - before).length() < 1e-4);

        cam.zoom_at(p, 1e-6);
        assert_eq!(cam.zoom(), 0.1);

        cam.zoom_at(p, -1.0);
        assert_eq!(cam.zoom(), 0.1);
    }

    #[test]
    fn test_pan_moves_content_with_pointer() {
        let mut cam = camera();
        cam.set_zoom(2.0);
        let world = Vec2::new(3.0, 4.0);
        let screen = cam.world_to_screen(world);
        cam.pan(Vec2::new(20.0, -10.0));
        let moved = cam.world_to_screen(world);
        assert!((moved - (screen + Vec2::new(20.0, -10.0))).length() < 1e-4);
    }

    #[test]
    fn test_view_matrix_matches_world_to_screen() {
        let mut cam = camera();
        cam.set_position(Vec2::new(-4.0, 2.0));
        cam.set_zoom(3.0);
        let world = Vec2::new(1.5, -2.5);
        let via_matrix = cam.view_matrix().transform_point2(world);
        assert!((via_matrix - cam.world_to_screen(world)).length() < 1e-3);
    }

    #[test]
    fn test_projection_maps_viewport_corners() {
        let cam = camera();
        let top_left = cam.screen_to_world(Vec2::ZERO);
        let clip = cam.projection_matrix().project_point3(top_left.extend(0.0));
        assert!((clip.x - -1.0).abs() < 1e-5);
        assert!((clip.y - 1.0).abs() < 1e-5);

        let centre = cam.projection_matrix().project_point3(cam.position().extend(0.0));
        assert!(centre.truncate().length() < 1e-5);
    }
}
