//! Render pipeline: turns editor state into display lists for the two
//! stacked surfaces.
//!
//! Both layers share one transform, `device = image * (zoom * dpr) + pan * dpr`,
//! so the overlay lines up with the image pixel for pixel. Overlay stroke
//! widths and handle radii are divided by zoom before drawing to keep a
//! constant on-screen size.

mod style;

pub use style::{BoxStyle, BoxVisualState, CanvasStyle};

use crate::constants::IMAGE_CORNER_RADIUS;
use crate::geometry::{Corner, Point, Rect};
use crate::interaction::BoxEditor;
use crate::render::{
    ColorFilter, DisplayList, DisplayMode, DrawCommand, Glow, ImageFilters, ImageHandle,
    LayerTransform, RenderError, StrokeStyle, Surface, SurfaceLayout,
};
use crate::scheduler::FramePlan;
use crate::viewport::{Viewport, ViewportError};

/// Width of handle outlines, screen pixels.
const HANDLE_STROKE_WIDTH: f32 = 1.5;

/// Width of the drawing preview, screen pixels.
const PREVIEW_STROKE_WIDTH: f32 = 1.5;

/// What the image layer shows.
#[derive(Debug, Clone, Default)]
pub enum ImageContent {
    #[default]
    Empty,
    Loading,
    Ready(ImageHandle),
    Failed(String),
}

impl ImageContent {
    pub fn image(&self) -> Option<&ImageHandle> {
        match self {
            ImageContent::Ready(image) => Some(image),
            _ => None,
        }
    }

    /// Image size in pixels, when known.
    pub fn size(&self) -> Option<(f32, f32)> {
        self.image().map(ImageHandle::size)
    }
}

/// Builds display lists for the image and overlay layers.
#[derive(Debug, Clone)]
pub struct CanvasRenderer {
    pub style: CanvasStyle,
    layout: SurfaceLayout,
    filter: ColorFilter,
}

impl CanvasRenderer {
    pub fn new(style: CanvasStyle) -> Self {
        Self {
            style,
            layout: SurfaceLayout::default(),
            filter: ColorFilter::default(),
        }
    }

    pub fn layout(&self) -> SurfaceLayout {
        self.layout
    }

    pub fn set_layout(&mut self, layout: SurfaceLayout) {
        self.layout = layout;
    }

    pub fn filter(&self) -> ColorFilter {
        self.filter
    }

    pub fn set_filters(&mut self, filters: ImageFilters) {
        self.filter.filters = filters;
    }

    pub fn set_display_mode(&mut self, mode: DisplayMode) {
        self.filter.mode = mode;
    }

    fn layer_transform(&self, viewport: &Viewport) -> LayerTransform {
        let dpr = self.layout.device_pixel_ratio;
        LayerTransform {
            scale: viewport.zoom * dpr,
            translate: Point::new(viewport.pan_offset.x * dpr, viewport.pan_offset.y * dpr),
        }
    }

    /// Image layer: the source image drawn once, clipped to a rounded
    /// rectangle and filtered; or a placeholder when loading failed.
    pub fn image_layer(&self, content: &ImageContent, viewport: &Viewport) -> DisplayList {
        let mut list = DisplayList::new();
        list.push(DrawCommand::Clear);

        match content {
            ImageContent::Ready(image) => {
                let Ok(corner_radius) = viewport.screen_len_to_image(IMAGE_CORNER_RADIUS) else {
                    log::warn!("Skipping image layer: degenerate zoom {}", viewport.zoom);
                    return list;
                };
                let (width, height) = image.size();
                let bounds = Rect::new(0.0, 0.0, width, height);
                list.push(DrawCommand::SetTransform(self.layer_transform(viewport)));
                list.push(DrawCommand::ClipRoundedRect {
                    rect: bounds,
                    radius: corner_radius,
                });
                list.push(DrawCommand::DrawImage {
                    image: image.clone(),
                    dest: bounds,
                    filter: self.filter,
                });
            }
            ImageContent::Failed(reason) => {
                log::debug!("Drawing unavailable placeholder: {}", reason);
                list.push(DrawCommand::SetTransform(LayerTransform {
                    scale: self.layout.device_pixel_ratio,
                    translate: Point::ORIGIN,
                }));
                list.push(DrawCommand::ImageUnavailable {
                    rect: Rect::new(0.0, 0.0, self.layout.width, self.layout.height),
                    message: self.style.unavailable_message.clone(),
                });
            }
            ImageContent::Empty | ImageContent::Loading => {}
        }
        list
    }

    /// Overlay layer: image frame, boxes by state, handles and the drawing preview.
    pub fn overlay_layer(&self, editor: &BoxEditor, image_size: Option<(f32, f32)>) -> DisplayList {
        match self.build_overlay(editor, image_size) {
            Ok(list) => list,
            Err(e) => {
                log::warn!("Skipping overlay: {}", e);
                let mut list = DisplayList::new();
                list.push(DrawCommand::Clear);
                list
            }
        }
    }

    fn build_overlay(
        &self,
        editor: &BoxEditor,
        image_size: Option<(f32, f32)>,
    ) -> Result<DisplayList, ViewportError> {
        let viewport = editor.viewport();
        let px = viewport.screen_len_to_image(1.0)?;
        let dpr = self.layout.device_pixel_ratio;
        let state = editor.state();
        let settings = editor.settings();

        let mut list = DisplayList::new();
        list.push(DrawCommand::Clear);
        list.push(DrawCommand::SetTransform(self.layer_transform(&viewport)));

        if let Some((width, height)) = image_size {
            list.push(DrawCommand::StrokeRect {
                rect: Rect::new(0.0, 0.0, width, height),
                style: StrokeStyle::solid(self.style.frame_color, self.style.frame_width * px),
            });
        }

        for b in editor.boxes().iter() {
            let visual = BoxVisualState::of(b, state);
            let box_style = self.style.for_state(visual);
            let mut stroke = StrokeStyle::solid(box_style.color, box_style.width * px);
            if let Some(blur) = box_style.glow {
                stroke = stroke.glow(Glow {
                    color: box_style.color.with_alpha(0.6),
                    blur: blur * dpr,
                });
            }
            let rect = b.rect.normalized();
            list.push(DrawCommand::StrokeRect {
                rect,
                style: stroke,
            });

            if !visual.is_active() {
                continue;
            }
            let hovered_corner = if state.hovered_box_id == Some(b.id) {
                editor.hovered_handle()
            } else {
                None
            };
            for corner in Corner::ALL {
                let fill = if hovered_corner == Some(corner) {
                    self.style.handle_hovered_fill
                } else {
                    self.style.handle_fill
                };
                list.push(DrawCommand::Handle {
                    center: rect.corner(corner),
                    radius: settings.handle_radius * px,
                    fill,
                    stroke: StrokeStyle::solid(self.style.handle_stroke, HANDLE_STROKE_WIDTH * px),
                });
            }
        }

        if let Some(preview) = editor.preview_rect() {
            let [on, off] = self.style.preview_dash;
            list.push(DrawCommand::StrokeRect {
                rect: preview.normalized(),
                style: StrokeStyle::solid(self.style.preview_color, PREVIEW_STROKE_WIDTH * px)
                    .dashed(on * px, off * px),
            });
        }
        Ok(list)
    }
}

impl Default for CanvasRenderer {
    fn default() -> Self {
        Self::new(CanvasStyle::default())
    }
}

/// The two stacked surfaces plus the renderer that feeds them.
pub struct Canvas<S> {
    renderer: CanvasRenderer,
    image_surface: S,
    overlay_surface: S,
}

impl<S: Surface> Canvas<S> {
    pub fn new(renderer: CanvasRenderer, image_surface: S, overlay_surface: S) -> Self {
        Self {
            renderer,
            image_surface,
            overlay_surface,
        }
    }

    pub fn renderer(&self) -> &CanvasRenderer {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut CanvasRenderer {
        &mut self.renderer
    }

    pub fn image_surface(&self) -> &S {
        &self.image_surface
    }

    pub fn overlay_surface(&self) -> &S {
        &self.overlay_surface
    }

    /// Resize both backing stores for a new container layout.
    pub fn apply_layout(&mut self, layout: SurfaceLayout) -> Result<(), RenderError> {
        let (width, height) = layout.backing_size();
        log::debug!(
            "Canvas layout {}x{} @{} -> {}x{} device px",
            layout.width,
            layout.height,
            layout.device_pixel_ratio,
            width,
            height
        );
        self.image_surface.resize(width, height)?;
        self.overlay_surface.resize(width, height)?;
        self.renderer.set_layout(layout);
        Ok(())
    }

    /// Execute one frame plan. Returns `true` when the image layer painted an image.
    pub fn draw(
        &mut self,
        plan: &FramePlan,
        content: &ImageContent,
        editor: &BoxEditor,
    ) -> Result<bool, RenderError> {
        if let Some(layout) = plan.resize {
            self.apply_layout(layout)?;
        }
        let mut painted = false;
        if plan.redraw_image {
            let list = self.renderer.image_layer(content, &editor.viewport());
            self.image_surface.present(&list)?;
            painted = list
                .commands()
                .iter()
                .any(|c| matches!(c, DrawCommand::DrawImage { .. }));
        }
        if plan.redraw_overlay {
            let list = self.renderer.overlay_layer(editor, content.size());
            self.overlay_surface.present(&list)?;
        }
        Ok(painted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interaction::{PointerButton, PointerEvent};
    use crate::model::AnnotationBox;
    use crate::render::RecordingSurface;

    fn image(width: u32, height: u32) -> ImageHandle {
        ImageHandle::from_rgba8(vec![128; (width * height * 4) as usize], width, height).unwrap()
    }

    fn editor_with_box() -> BoxEditor {
        let mut editor = BoxEditor::default();
        editor.set_viewport(Viewport::new(2.0, Point::new(100.0, 50.0)));
        editor.load_boxes(vec![
            AnnotationBox::new(1, Rect::new(10.0, 10.0, 40.0, 30.0)),
            AnnotationBox::new(2, Rect::new(100.0, 100.0, 20.0, 20.0)),
        ]);
        editor
    }

    #[test]
    fn test_image_layer_order() {
        let renderer = CanvasRenderer::default();
        let list = renderer.image_layer(
            &ImageContent::Ready(image(4, 2)),
            &Viewport::new(2.0, Point::new(10.0, 0.0)),
        );
        let commands = list.commands();
        assert!(matches!(commands[0], DrawCommand::Clear));
        assert!(matches!(commands[1], DrawCommand::SetTransform(t) if t.scale == 2.0));
        assert!(matches!(
            commands[2],
            DrawCommand::ClipRoundedRect { radius, .. } if radius == 4.0
        ));
        assert!(matches!(commands[3], DrawCommand::DrawImage { .. }));
        assert_eq!(commands.len(), 4);
    }

    #[test]
    fn test_failed_image_draws_placeholder() {
        let mut renderer = CanvasRenderer::default();
        renderer.set_layout(SurfaceLayout::new(300.0, 200.0, 2.0));
        let list = renderer.image_layer(&ImageContent::Failed("404".to_string()), &Viewport::identity());
        assert!(list.commands().iter().any(|c| matches!(
            c,
            DrawCommand::ImageUnavailable { rect, .. } if *rect == Rect::new(0.0, 0.0, 300.0, 200.0)
        )));
    }

    #[test]
    fn test_transform_includes_device_pixel_ratio() {
        let mut renderer = CanvasRenderer::default();
        renderer.set_layout(SurfaceLayout::new(100.0, 100.0, 2.0));
        let t = renderer.layer_transform(&Viewport::new(1.5, Point::new(10.0, 20.0)));
        assert_eq!(t.scale, 3.0);
        assert_eq!(t.translate, Point::new(20.0, 40.0));
    }

    #[test]
    fn test_overlay_hover_shows_handles_zoom_invariant() {
        let mut editor = editor_with_box();
        editor.handle(PointerEvent::Move {
            position: Point::new(200.0, 130.0),
        });

        let renderer = CanvasRenderer::default();
        let list = renderer.overlay_layer(&editor, Some((200.0, 200.0)));

        let handles: Vec<_> = list.handles().collect();
        assert_eq!(handles.len(), 4);
        assert!(handles.iter().all(|&(_, r)| r == editor.settings().handle_radius / 2.0));
        assert!(handles.iter().any(|&(c, _)| c == Point::new(50.0, 40.0)));

        let hovered_fill = list.commands().iter().find_map(|c| match c {
            DrawCommand::Handle { center, fill, .. } if *center == Point::new(50.0, 40.0) => Some(*fill),
            _ => None,
        });
        assert_eq!(hovered_fill, Some(renderer.style.handle_hovered_fill));
    }

    #[test]
    fn test_overlay_styles_follow_precedence() {
        let mut editor = editor_with_box();
        editor.handle(PointerEvent::Down {
            position: Point::new(160.0, 100.0),
            button: PointerButton::Primary,
        });
        editor.handle(PointerEvent::Up {
            position: Point::new(160.0, 100.0),
            button: PointerButton::Primary,
        });
        assert_eq!(editor.state().selected_box_id, Some(1));

        let renderer = CanvasRenderer::default();
        let list = renderer.overlay_layer(&editor, None);
        let strokes: Vec<_> = list.stroked_rects().collect();
        assert_eq!(strokes.len(), 2);

        let (_, selected) = strokes[0];
        assert_eq!(selected.color, renderer.style.selected.color);
        assert_eq!(selected.width, renderer.style.selected.width / 2.0);
        assert!(selected.glow.is_some());

        let (_, plain) = strokes[1];
        assert_eq!(plain.color, renderer.style.default.color);
        assert!(plain.glow.is_none());
    }

    #[test]
    fn test_preview_is_dashed_and_last() {
        let mut editor = BoxEditor::default();
        editor.handle(PointerEvent::Down {
            position: Point::new(50.0, 50.0),
            button: PointerButton::Primary,
        });
        editor.handle(PointerEvent::Move {
            position: Point::new(10.0, 20.0),
        });

        let list = CanvasRenderer::default().overlay_layer(&editor, None);
        match list.commands().last() {
            Some(DrawCommand::StrokeRect { rect, style }) => {
                assert_eq!(*rect, Rect::new(10.0, 20.0, 40.0, 30.0));
                assert!(style.dash.is_some());
            }
            other => panic!("expected preview stroke, got {:?}", other),
        }
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let editor = editor_with_box();
        let renderer = CanvasRenderer::default();
        let a = renderer.overlay_layer(&editor, Some((64.0, 64.0)));
        let b = renderer.overlay_layer(&editor, Some((64.0, 64.0)));
        assert_eq!(format!("{:?}", a), format!("{:?}", b));
    }

    #[test]
    fn test_canvas_draw_reports_painted_image() {
        let mut canvas = Canvas::new(
            CanvasRenderer::default(),
            RecordingSurface::new(),
            RecordingSurface::new(),
        );
        let editor = editor_with_box();
        let plan = FramePlan {
            redraw_image: true,
            redraw_overlay: true,
            resize: Some(SurfaceLayout::new(320.0, 240.0, 2.0)),
        };

        assert!(!canvas.draw(&plan, &ImageContent::Loading, &editor).unwrap());
        assert!(canvas.draw(&plan, &ImageContent::Ready(image(2, 2)), &editor).unwrap());
        assert_eq!(canvas.image_surface().backing_size(), (640, 480));
        assert_eq!(canvas.overlay_surface().frames(), 2);
    }
}
