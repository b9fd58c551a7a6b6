//! Viewport transform between image-pixel space and screen space.
//!
//! `screen = image * zoom + pan_offset`. Every consumer (rendering,
//! hit-testing, gesture handling) goes through this pair of mappings; nothing
//! else scales coordinates on its own.

use crate::constants::zoom as zoom_const;
use crate::geometry::{Point, Rect};

/// Errors from the viewport transform.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum ViewportError {
    /// Zoom is zero, negative, or not finite
    #[error("Degenerate viewport transform: zoom {zoom} must be a positive finite number")]
    DegenerateTransform { zoom: f32 },
}

/// Allowed zoom range and the multiplicative step for zoom in/out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLimits {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl ZoomLimits {
    /// Clamp a zoom value into range. Non-finite or non-positive values map to `min`.
    pub fn clamp(&self, zoom: f32) -> f32 {
        if !zoom.is_finite() || zoom <= 0.0 {
            return self.min;
        }
        zoom.clamp(self.min, self.max)
    }
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            min: zoom_const::MIN,
            max: zoom_const::MAX,
            step: zoom_const::STEP,
        }
    }
}

/// Represents pan/zoom transform state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub zoom: f32,
    pub pan_offset: Point,
}

impl Viewport {
    /// Create a viewport. A non-positive or non-finite zoom is replaced by the
    /// default minimum, so constructed viewports never degenerate.
    pub fn new(zoom: f32, pan_offset: Point) -> Self {
        let zoom = if zoom.is_finite() && zoom > 0.0 {
            zoom
        } else {
            zoom_const::MIN
        };
        Self { zoom, pan_offset }
    }

    /// Create an identity viewport (zoom=1, no pan).
    pub fn identity() -> Self {
        Self {
            zoom: 1.0,
            pan_offset: Point::ORIGIN,
        }
    }

    fn checked_zoom(&self) -> Result<f32, ViewportError> {
        if self.zoom.is_finite() && self.zoom > 0.0 {
            Ok(self.zoom)
        } else {
            Err(ViewportError::DegenerateTransform { zoom: self.zoom })
        }
    }

    /// Map an image-space point to screen space.
    pub fn image_to_screen(&self, p: Point) -> Result<Point, ViewportError> {
        let zoom = self.checked_zoom()?;
        Ok(Point::new(
            p.x * zoom + self.pan_offset.x,
            p.y * zoom + self.pan_offset.y,
        ))
    }

    /// Map a screen-space point to image space.
    pub fn screen_to_image(&self, p: Point) -> Result<Point, ViewportError> {
        let zoom = self.checked_zoom()?;
        Ok(Point::new(
            (p.x - self.pan_offset.x) / zoom,
            (p.y - self.pan_offset.y) / zoom,
        ))
    }

    /// Map an image-space rectangle to screen space.
    pub fn image_rect_to_screen(&self, rect: Rect) -> Result<Rect, ViewportError> {
        let zoom = self.checked_zoom()?;
        let origin = self.image_to_screen(Point::new(rect.x, rect.y))?;
        Ok(Rect::new(
            origin.x,
            origin.y,
            rect.width * zoom,
            rect.height * zoom,
        ))
    }

    /// Convert a length in screen pixels to image pixels.
    pub fn screen_len_to_image(&self, len: f32) -> Result<f32, ViewportError> {
        Ok(len / self.checked_zoom()?)
    }

    /// Calculate zoom-to-cursor transformation.
    ///
    /// Keeps the image point under `cursor` (screen space) fixed while the
    /// zoom changes to `new_zoom` (clamped to `limits`).
    pub fn zoom_to_cursor(&self, new_zoom: f32, cursor: Point, limits: &ZoomLimits) -> Viewport {
        let new_zoom = limits.clamp(new_zoom);
        let Ok(anchor) = self.screen_to_image(cursor) else {
            return Viewport::new(new_zoom, self.pan_offset);
        };

        Viewport {
            zoom: new_zoom,
            pan_offset: Point::new(cursor.x - anchor.x * new_zoom, cursor.y - anchor.y * new_zoom),
        }
    }

    /// Apply a pan delta (screen pixels) to the transform.
    pub fn pan_by(&self, dx: f32, dy: f32) -> Viewport {
        Viewport {
            zoom: self.zoom,
            pan_offset: self.pan_offset.offset(dx, dy),
        }
    }

    /// Zoom in by one step around `cursor`.
    pub fn zoom_in(&self, cursor: Point, limits: &ZoomLimits) -> Viewport {
        self.zoom_to_cursor(self.zoom * limits.step, cursor, limits)
    }

    /// Zoom out by one step around `cursor`.
    pub fn zoom_out(&self, cursor: Point, limits: &ZoomLimits) -> Viewport {
        self.zoom_to_cursor(self.zoom / limits.step, cursor, limits)
    }

    /// Largest zoom at which the whole image fits the container, centered.
    pub fn fit_to(image_size: (f32, f32), container_size: (f32, f32), limits: &ZoomLimits) -> Viewport {
        let (iw, ih) = image_size;
        let (cw, ch) = container_size;
        if iw <= 0.0 || ih <= 0.0 || cw <= 0.0 || ch <= 0.0 {
            return Viewport::identity();
        }
        let zoom = limits.clamp((cw / iw).min(ch / ih));
        Viewport {
            zoom,
            pan_offset: Point::new((cw - iw * zoom) / 2.0, (ch - ih * zoom) / 2.0),
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 0.001;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < EPSILON * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn test_identity_transform() {
        let v = Viewport::identity();
        let p = Point::new(12.5, -3.0);
        assert_eq!(v.image_to_screen(p).unwrap(), p);
        assert_eq!(v.screen_to_image(p).unwrap(), p);
    }

    #[test]
    fn test_image_to_screen_formula() {
        let v = Viewport::new(2.0, Point::new(100.0, 50.0));
        let s = v.image_to_screen(Point::new(50.0, 40.0)).unwrap();
        assert_eq!(s, Point::new(200.0, 130.0));
    }

    #[test]
    fn test_round_trip_many_viewports() {
        let zooms = [0.1, 0.37, 1.0, 2.0, 7.5, 20.0];
        let pans = [(0.0, 0.0), (100.0, 50.0), (-333.3, 12.25), (2048.0, -512.0)];
        let points = [(0.0, 0.0), (10.0, 10.0), (-5.5, 1024.0), (4096.0, 3000.5)];

        for &zoom in &zooms {
            for &(px, py) in &pans {
                let v = Viewport::new(zoom, Point::new(px, py));
                for &(x, y) in &points {
                    let p = Point::new(x, y);
                    let back = v.screen_to_image(v.image_to_screen(p).unwrap()).unwrap();
                    assert!(approx_eq(back.x, p.x), "x: {} vs {} at zoom {}", back.x, p.x, zoom);
                    assert!(approx_eq(back.y, p.y), "y: {} vs {} at zoom {}", back.y, p.y, zoom);

                    let fwd = v.image_to_screen(v.screen_to_image(p).unwrap()).unwrap();
                    assert!(approx_eq(fwd.x, p.x));
                    assert!(approx_eq(fwd.y, p.y));
                }
            }
        }
    }

    #[test]
    fn test_degenerate_zoom_is_reported() {
        let mut v = Viewport::identity();
        v.zoom = 0.0;
        assert_eq!(
            v.image_to_screen(Point::ORIGIN),
            Err(ViewportError::DegenerateTransform { zoom: 0.0 })
        );
        v.zoom = -1.0;
        assert!(v.screen_to_image(Point::ORIGIN).is_err());
    }

    #[test]
    fn test_new_replaces_only_bad_zoom() {
        assert_eq!(Viewport::new(0.0, Point::ORIGIN).zoom, zoom_const::MIN);
        assert_eq!(Viewport::new(-3.0, Point::ORIGIN).zoom, zoom_const::MIN);
        assert_eq!(Viewport::new(f32::NAN, Point::ORIGIN).zoom, zoom_const::MIN);
        assert_eq!(Viewport::new(f32::INFINITY, Point::ORIGIN).zoom, zoom_const::MIN);
        assert_eq!(Viewport::new(40.0, Point::ORIGIN).zoom, 40.0);
        assert_eq!(Viewport::new(0.05, Point::ORIGIN).zoom, 0.05);
    }

    #[test]
    fn test_zoom_to_cursor_preserves_cursor_point() {
        let v = Viewport::new(1.0, Point::new(50.0, 30.0));
        let cursor = Point::new(150.0, 120.0);
        let before = v.screen_to_image(cursor).unwrap();

        let zoomed = v.zoom_to_cursor(2.0, cursor, &ZoomLimits::default());
        let after = zoomed.screen_to_image(cursor).unwrap();

        assert_eq!(zoomed.zoom, 2.0);
        assert!(approx_eq(before.x, after.x));
        assert!(approx_eq(before.y, after.y));
    }

    #[test]
    fn test_zoom_in_with_max() {
        let limits = ZoomLimits {
            min: 0.2,
            max: 5.0,
            step: 1.5,
        };
        let v = Viewport::new(4.0, Point::ORIGIN);
        assert_eq!(v.zoom_in(Point::ORIGIN, &limits).zoom, 5.0);
    }

    #[test]
    fn test_zoom_out_with_min() {
        let limits = ZoomLimits {
            min: 0.2,
            max: 5.0,
            step: 1.5,
        };
        let v = Viewport::new(0.25, Point::ORIGIN);
        assert!(approx_eq(v.zoom_out(Point::ORIGIN, &limits).zoom, 0.2));
    }

    #[test]
    fn test_pan_preserves_zoom() {
        let v = Viewport::new(2.5, Point::ORIGIN).pan_by(100.0, 200.0);
        assert_eq!(v.zoom, 2.5);
        assert_eq!(v.pan_offset, Point::new(100.0, 200.0));
    }

    #[test]
    fn test_fit_to_centers_image() {
        let v = Viewport::fit_to((200.0, 100.0), (400.0, 400.0), &ZoomLimits::default());
        assert_eq!(v.zoom, 2.0);
        assert_eq!(v.pan_offset, Point::new(0.0, 100.0));
    }

    #[test]
    fn test_screen_len_to_image() {
        let v = Viewport::new(4.0, Point::new(3.0, 3.0));
        assert_eq!(v.screen_len_to_image(8.0).unwrap(), 2.0);
    }
}
