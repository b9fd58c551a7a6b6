//! Draw commands for one layer.
//!
//! The editor builds a [`DisplayList`] per layer and per frame; a
//! [`Surface`](crate::Surface) replays it. Geometry inside commands is in
//! the coordinate space established by the most recent
//! [`DrawCommand::SetTransform`] (image-pixel space for both layers).

use crate::{Color, ColorFilter, ImageHandle, Point, Rect};

/// Uniform scale followed by a translation: `screen = p * scale + translate`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerTransform {
    pub scale: f32,
    pub translate: Point,
}

impl LayerTransform {
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            translate: Point::ORIGIN,
        }
    }

    /// Map a point through the transform.
    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            p.x * self.scale + self.translate.x,
            p.y * self.scale + self.translate.y,
        )
    }
}

impl Default for LayerTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// A soft halo drawn behind a stroke. `blur` is in device pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glow {
    pub color: Color,
    pub blur: f32,
}

/// Stroke styling. Widths and dash lengths are in the current transform's
/// units, so callers divide by zoom to keep them constant on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeStyle {
    pub color: Color,
    pub width: f32,
    pub dash: Option<[f32; 2]>,
    pub glow: Option<Glow>,
}

impl StrokeStyle {
    pub fn solid(color: Color, width: f32) -> Self {
        Self {
            color,
            width,
            dash: None,
            glow: None,
        }
    }

    pub fn dashed(mut self, on: f32, off: f32) -> Self {
        self.dash = Some([on, off]);
        self
    }

    pub fn glow(mut self, glow: Glow) -> Self {
        self.glow = Some(glow);
        self
    }
}

/// A single draw operation.
#[derive(Debug, Clone)]
pub enum DrawCommand {
    /// Clear the whole surface to transparent and reset transform and clip.
    Clear,
    /// Replace the current transform.
    SetTransform(LayerTransform),
    /// Restrict subsequent drawing to a rounded rectangle.
    ClipRoundedRect { rect: Rect, radius: f32 },
    /// Draw an image into `dest` through a color filter.
    DrawImage {
        image: ImageHandle,
        dest: Rect,
        filter: ColorFilter,
    },
    /// Placeholder shown when the image could not be loaded.
    ImageUnavailable { rect: Rect, message: String },
    /// Stroke a rectangle outline.
    StrokeRect { rect: Rect, style: StrokeStyle },
    /// Fill a rectangle.
    FillRect { rect: Rect, color: Color },
    /// A circular control handle.
    Handle {
        center: Point,
        radius: f32,
        fill: Color,
        stroke: StrokeStyle,
    },
}

/// An ordered list of draw commands for one layer.
#[derive(Debug, Clone, Default)]
pub struct DisplayList {
    commands: Vec<DrawCommand>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command.
    pub fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Iterate over `StrokeRect` commands.
    pub fn stroked_rects(&self) -> impl Iterator<Item = (&Rect, &StrokeStyle)> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::StrokeRect { rect, style } => Some((rect, style)),
            _ => None,
        })
    }

    /// Iterate over handle centers and radii.
    pub fn handles(&self) -> impl Iterator<Item = (Point, f32)> + '_ {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Handle { center, radius, .. } => Some((*center, *radius)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_transform_apply() {
        let t = LayerTransform {
            scale: 2.0,
            translate: Point::new(100.0, 50.0),
        };
        assert_eq!(t.apply(Point::new(10.0, 10.0)), Point::new(120.0, 70.0));
        assert_eq!(LayerTransform::identity().apply(Point::new(3.0, 4.0)), Point::new(3.0, 4.0));
    }

    #[test]
    fn test_display_list_filters() {
        let mut list = DisplayList::new();
        list.push(DrawCommand::Clear);
        list.push(DrawCommand::StrokeRect {
            rect: Rect::new(0.0, 0.0, 1.0, 1.0),
            style: StrokeStyle::solid(Color::WHITE, 1.0),
        });
        list.push(DrawCommand::Handle {
            center: Point::new(1.0, 1.0),
            radius: 3.0,
            fill: Color::WHITE,
            stroke: StrokeStyle::solid(Color::BLACK, 1.0),
        });
        assert_eq!(list.len(), 3);
        assert_eq!(list.stroked_rects().count(), 1);
        assert_eq!(list.handles().collect::<Vec<_>>(), vec![(Point::new(1.0, 1.0), 3.0)]);
    }
}
