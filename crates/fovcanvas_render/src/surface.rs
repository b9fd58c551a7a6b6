//! Drawing surfaces.

use crate::{DisplayList, RenderError};

/// CSS-pixel size of the canvas container plus the device pixel ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceLayout {
    pub width: f32,
    pub height: f32,
    pub device_pixel_ratio: f32,
}

impl SurfaceLayout {
    pub fn new(width: f32, height: f32, device_pixel_ratio: f32) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
            device_pixel_ratio: if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
                device_pixel_ratio
            } else {
                1.0
            },
        }
    }

    /// Backing store resolution in device pixels (at least 1x1).
    pub fn backing_size(&self) -> (u32, u32) {
        let w = (self.width * self.device_pixel_ratio).round().max(1.0) as u32;
        let h = (self.height * self.device_pixel_ratio).round().max(1.0) as u32;
        (w, h)
    }
}

impl Default for SurfaceLayout {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0)
    }
}

/// A drawing target that replays display lists.
///
/// Presenting the same list twice must produce the same pixels.
pub trait Surface {
    /// Reallocate the backing store. Contents are undefined until the next
    /// `present`.
    fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError>;

    /// Current backing store size in device pixels.
    fn backing_size(&self) -> (u32, u32);

    /// Draw a display list. The list starts with its own `Clear`.
    fn present(&mut self, list: &DisplayList) -> Result<(), RenderError>;
}

/// Surface that keeps the most recent display list instead of drawing.
///
/// Hosts with their own canvas API replay `last()`; tests inspect it.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    size: (u32, u32),
    last: DisplayList,
    frames: u64,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last presented display list.
    pub fn last(&self) -> &DisplayList {
        &self.last
    }

    /// Number of `present` calls so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl Surface for RecordingSurface {
    fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.size = (width, height);
        Ok(())
    }

    fn backing_size(&self) -> (u32, u32) {
        self.size
    }

    fn present(&mut self, list: &DisplayList) -> Result<(), RenderError> {
        self.last = list.clone();
        self.frames += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backing_size_scales_with_dpr() {
        let layout = SurfaceLayout::new(400.0, 300.0, 2.0);
        assert_eq!(layout.backing_size(), (800, 600));
    }

    #[test]
    fn test_invalid_dpr_falls_back_to_one() {
        let layout = SurfaceLayout::new(10.0, 10.0, 0.0);
        assert_eq!(layout.device_pixel_ratio, 1.0);
        let layout = SurfaceLayout::new(10.0, 10.0, f32::NAN);
        assert_eq!(layout.device_pixel_ratio, 1.0);
    }

    #[test]
    fn test_zero_layout_has_minimum_backing() {
        assert_eq!(SurfaceLayout::new(0.0, 0.0, 1.0).backing_size(), (1, 1));
    }

    #[test]
    fn test_recording_surface_counts_frames() {
        let mut surface = RecordingSurface::new();
        surface.resize(8, 4).unwrap();
        surface.present(&DisplayList::new()).unwrap();
        surface.present(&DisplayList::new()).unwrap();
        assert_eq!(surface.frames(), 2);
        assert_eq!(surface.backing_size(), (8, 4));
    }
}
