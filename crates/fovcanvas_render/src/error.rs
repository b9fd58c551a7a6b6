//! Error types for the render layer.

/// Errors raised by surfaces and image handles.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Backing storage for a surface could not be allocated
    #[error("Failed to allocate a {width}x{height} surface")]
    SurfaceAllocation { width: u32, height: u32 },

    /// Pixel buffer does not match the declared dimensions
    #[error("Invalid image: {width}x{height} with {len} bytes of RGBA data")]
    InvalidImage { width: u32, height: u32, len: usize },

    /// Encoding the surface contents failed
    #[error("Failed to encode surface: {0}")]
    Encode(String),
}
