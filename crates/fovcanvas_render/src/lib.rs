//! Drawing surfaces and display lists for the fovcanvas annotation canvas.
//!
//! The editor describes each layer as a [`DisplayList`]; any [`Surface`]
//! can present it. [`RecordingSurface`] keeps the list for hosts that replay
//! it on a platform canvas, [`RasterSurface`] rasterizes it with tiny-skia.

mod color;
mod display_list;
mod error;
mod filter;
mod geometry;
mod image;
mod raster;
mod surface;

pub use color::Color;
pub use display_list::{DisplayList, DrawCommand, Glow, LayerTransform, StrokeStyle};
pub use error::RenderError;
pub use filter::{ColorFilter, DisplayMode, ImageFilters};
pub use geometry::{Corner, Point, Rect};
pub use image::ImageHandle;
pub use raster::RasterSurface;
pub use surface::{RecordingSurface, Surface, SurfaceLayout};
