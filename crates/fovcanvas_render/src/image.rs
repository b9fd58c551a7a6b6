use std::sync::Arc;

use crate::RenderError;

/// A handle to decoded image pixels.
///
/// ImageHandle is cheap to clone: the RGBA8 buffer is shared, so the same
/// image can sit in the preload cache and on the image layer at once.
#[derive(Clone, Debug)]
pub struct ImageHandle {
    /// The raw RGBA8 image data
    data: Arc<Vec<u8>>,
    /// Width in pixels
    width: u32,
    /// Height in pixels
    height: u32,
}

impl ImageHandle {
    /// Create a new image handle from RGBA8 data.
    ///
    /// Returns `RenderError::InvalidImage` if `data.len() != width * height * 4`.
    pub fn from_rgba8(data: Vec<u8>, width: u32, height: u32) -> Result<Self, RenderError> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected || width == 0 || height == 0 {
            return Err(RenderError::InvalidImage {
                width,
                height,
                len: data.len(),
            });
        }

        Ok(Self {
            data: Arc::new(data),
            width,
            height,
        })
    }

    /// Get the image data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get the image width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Get the image height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Image size as floats, the unit of the image-pixel coordinate space.
    pub fn size(&self) -> (f32, f32) {
        (self.width as f32, self.height as f32)
    }

    /// Whether two handles share the same pixel buffer.
    pub fn same_pixels(&self, other: &ImageHandle) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}
