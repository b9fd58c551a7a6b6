//! Geometry primitives, shared with the render crate.

pub use fovcanvas_render::{Corner, Point, Rect};
