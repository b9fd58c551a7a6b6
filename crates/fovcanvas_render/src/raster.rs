//! CPU raster surface backed by tiny-skia.
//!
//! Used for headless rendering (snapshots, tests) and as a reference for
//! hosts that replay display lists on their own canvas.

use tiny_skia::{
    FillRule, FilterQuality, IntSize, Mask, Paint, Path, PathBuilder, Pixmap, PixmapPaint,
    Stroke, StrokeDash, Transform,
};

use crate::{
    Color, ColorFilter, DisplayList, DrawCommand, ImageHandle, LayerTransform, Rect, RenderError,
    StrokeStyle, Surface,
};

/// Number of widening passes used to fake a blurred glow.
const GLOW_PASSES: u32 = 3;

/// A filtered copy of the source image, reused while image and filter are unchanged.
struct FilteredImage {
    source: ImageHandle,
    filter: ColorFilter,
    pixmap: Pixmap,
}

/// Surface that rasterizes display lists into an RGBA pixmap.
pub struct RasterSurface {
    pixmap: Pixmap,
    transform: LayerTransform,
    clip: Option<Mask>,
    filtered: Option<FilteredImage>,
}

impl RasterSurface {
    /// Create a surface with the given backing size.
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        Ok(Self {
            pixmap: allocate(width, height)?,
            transform: LayerTransform::identity(),
            clip: None,
            filtered: None,
        })
    }

    /// Premultiplied RGBA pixels.
    pub fn pixels(&self) -> &[u8] {
        self.pixmap.data()
    }

    /// Unpremultiplied RGBA value of one pixel, or None if out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let p = self.pixmap.pixel(x, y)?.demultiply();
        Some([p.red(), p.green(), p.blue(), p.alpha()])
    }

    /// Encode the current contents as PNG.
    pub fn encode_png(&self) -> Result<Vec<u8>, RenderError> {
        self.pixmap
            .encode_png()
            .map_err(|e| RenderError::Encode(e.to_string()))
    }

    /// Stack several same-sized layers bottom to top and encode the result as PNG.
    pub fn composite_png(layers: &[&RasterSurface]) -> Result<Vec<u8>, RenderError> {
        let (width, height) = layers
            .first()
            .map(|l| l.backing_size())
            .unwrap_or((1, 1));
        let mut out = allocate(width, height)?;
        for layer in layers {
            out.draw_pixmap(
                0,
                0,
                layer.pixmap.as_ref(),
                &PixmapPaint::default(),
                Transform::identity(),
                None,
            );
        }
        out.encode_png()
            .map_err(|e| RenderError::Encode(e.to_string()))
    }

    fn sk_transform(&self) -> Transform {
        let t = self.transform;
        Transform::from_row(t.scale, 0.0, 0.0, t.scale, t.translate.x, t.translate.y)
    }

    fn execute(&mut self, command: &DrawCommand) -> Result<(), RenderError> {
        match command {
            DrawCommand::Clear => {
                self.pixmap.fill(tiny_skia::Color::TRANSPARENT);
                self.transform = LayerTransform::identity();
                self.clip = None;
            }
            DrawCommand::SetTransform(t) => {
                self.transform = *t;
            }
            DrawCommand::ClipRoundedRect { rect, radius } => {
                let Some(path) = rounded_rect_path(*rect, *radius) else {
                    return Ok(());
                };
                let mut mask = Mask::new(self.pixmap.width(), self.pixmap.height()).ok_or(
                    RenderError::SurfaceAllocation {
                        width: self.pixmap.width(),
                        height: self.pixmap.height(),
                    },
                )?;
                mask.fill_path(&path, FillRule::Winding, true, self.sk_transform());
                self.clip = Some(mask);
            }
            DrawCommand::DrawImage {
                image,
                dest,
                filter,
            } => {
                self.draw_image(image, *dest, *filter)?;
            }
            DrawCommand::ImageUnavailable { rect, message } => {
                log::trace!("Drawing unavailable-image placeholder: {}", message);
                self.draw_placeholder(*rect);
            }
            DrawCommand::StrokeRect { rect, style } => {
                if let Some(rect) = sk_rect(*rect) {
                    let path = PathBuilder::from_rect(rect);
                    self.stroke(&path, style);
                }
            }
            DrawCommand::FillRect { rect, color } => {
                if let Some(rect) = sk_rect(*rect) {
                    let paint = paint(*color);
                    let transform = self.sk_transform();
                    self.pixmap
                        .fill_rect(rect, &paint, transform, self.clip.as_ref());
                }
            }
            DrawCommand::Handle {
                center,
                radius,
                fill,
                stroke,
            } => {
                if let Some(path) = PathBuilder::from_circle(center.x, center.y, *radius) {
                    let transform = self.sk_transform();
                    self.pixmap.fill_path(
                        &path,
                        &paint(*fill),
                        FillRule::Winding,
                        transform,
                        self.clip.as_ref(),
                    );
                    self.stroke(&path, stroke);
                }
            }
        }
        Ok(())
    }

    fn draw_image(
        &mut self,
        image: &ImageHandle,
        dest: Rect,
        filter: ColorFilter,
    ) -> Result<(), RenderError> {
        let reuse = self
            .filtered
            .as_ref()
            .is_some_and(|f| f.source.same_pixels(image) && f.filter == filter);
        if !reuse {
            let rgba = premultiply(filter.apply_rgba(image.data()));
            let size = IntSize::from_wh(image.width(), image.height()).ok_or(
                RenderError::InvalidImage {
                    width: image.width(),
                    height: image.height(),
                    len: image.data().len(),
                },
            )?;
            let pixmap = Pixmap::from_vec(rgba, size).ok_or(RenderError::InvalidImage {
                width: image.width(),
                height: image.height(),
                len: image.data().len(),
            })?;
            self.filtered = Some(FilteredImage {
                source: image.clone(),
                filter,
                pixmap,
            });
        }

        let Some(filtered) = self.filtered.as_ref() else {
            return Ok(());
        };
        let sx = dest.width / image.width() as f32;
        let sy = dest.height / image.height() as f32;
        let transform = self
            .sk_transform()
            .pre_translate(dest.x, dest.y)
            .pre_scale(sx, sy);
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        self.pixmap.draw_pixmap(
            0,
            0,
            filtered.pixmap.as_ref(),
            &paint,
            transform,
            self.clip.as_ref(),
        );
        Ok(())
    }

    fn draw_placeholder(&mut self, rect: Rect) {
        let Some(sk) = sk_rect(rect) else {
            return;
        };
        let transform = self.sk_transform();
        self.pixmap.fill_rect(
            sk,
            &paint(Color::rgb(0.12, 0.12, 0.14)),
            transform,
            self.clip.as_ref(),
        );

        let mut pb = PathBuilder::new();
        pb.move_to(rect.x, rect.y);
        pb.line_to(rect.right(), rect.bottom());
        pb.move_to(rect.right(), rect.y);
        pb.line_to(rect.x, rect.bottom());
        if let Some(cross) = pb.finish() {
            let width = 2.0 / self.transform.scale.max(f32::EPSILON);
            self.stroke(
                &cross,
                &StrokeStyle::solid(Color::rgb(0.85, 0.25, 0.25), width),
            );
        }
    }

    fn stroke(&mut self, path: &Path, style: &StrokeStyle) {
        let transform = self.sk_transform();

        if let Some(glow) = style.glow {
            // tiny-skia has no blur; approximate with widening translucent strokes.
            let spread = glow.blur / self.transform.scale.max(f32::EPSILON);
            for pass in 1..=GLOW_PASSES {
                let extra = spread * pass as f32 / GLOW_PASSES as f32;
                let stroke = Stroke {
                    width: style.width + extra,
                    ..Stroke::default()
                };
                let color = glow.color.with_alpha(glow.color.a / (GLOW_PASSES as f32 + 1.0));
                self.pixmap
                    .stroke_path(path, &paint(color), &stroke, transform, self.clip.as_ref());
            }
        }

        let mut stroke = Stroke {
            width: style.width,
            ..Stroke::default()
        };
        if let Some([on, off]) = style.dash {
            stroke.dash = StrokeDash::new(vec![on, off], 0.0);
        }
        self.pixmap.stroke_path(
            path,
            &paint(style.color),
            &stroke,
            transform,
            self.clip.as_ref(),
        );
    }
}

impl Surface for RasterSurface {
    fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        if (width, height) != self.backing_size() {
            self.pixmap = allocate(width, height)?;
            self.clip = None;
            log::debug!("Raster surface resized to {}x{}", width, height);
        }
        Ok(())
    }

    fn backing_size(&self) -> (u32, u32) {
        (self.pixmap.width(), self.pixmap.height())
    }

    fn present(&mut self, list: &DisplayList) -> Result<(), RenderError> {
        for command in list.commands() {
            self.execute(command)?;
        }
        Ok(())
    }
}

fn allocate(width: u32, height: u32) -> Result<Pixmap, RenderError> {
    Pixmap::new(width.max(1), height.max(1))
        .ok_or(RenderError::SurfaceAllocation { width, height })
}

fn paint(color: Color) -> Paint<'static> {
    let [r, g, b, a] = color.to_rgba8();
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;
    paint
}

fn sk_rect(rect: Rect) -> Option<tiny_skia::Rect> {
    let r = rect.normalized();
    tiny_skia::Rect::from_xywh(r.x, r.y, r.width, r.height)
}

fn rounded_rect_path(rect: Rect, radius: f32) -> Option<Path> {
    let r = rect.normalized();
    let radius = radius.max(0.0).min(r.width / 2.0).min(r.height / 2.0);
    if radius <= 0.0 {
        return Some(PathBuilder::from_rect(sk_rect(r)?));
    }
    let mut pb = PathBuilder::new();
    pb.move_to(r.x + radius, r.y);
    pb.line_to(r.right() - radius, r.y);
    pb.quad_to(r.right(), r.y, r.right(), r.y + radius);
    pb.line_to(r.right(), r.bottom() - radius);
    pb.quad_to(r.right(), r.bottom(), r.right() - radius, r.bottom());
    pb.line_to(r.x + radius, r.bottom());
    pb.quad_to(r.x, r.bottom(), r.x, r.bottom() - radius);
    pb.line_to(r.x, r.y + radius);
    pb.quad_to(r.x, r.y, r.x + radius, r.y);
    pb.close();
    pb.finish()
}

fn premultiply(mut rgba: Vec<u8>) -> Vec<u8> {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 255 {
            continue;
        }
        for c in &mut px[..3] {
            *c = ((*c as u16 * a + 127) / 255) as u8;
        }
    }
    rgba
}
