//! Pointer-driven box editing.
//!
//! [`BoxEditor`] owns the box collection and editor state for one image and
//! turns pointer events into gestures:
//!
//! - `Idle -> Drawing -> Idle`: primary drag on empty canvas creates a box
//! - `Idle -> Dragging -> Idle`: primary drag on a box body moves it
//! - `Idle -> Resizing -> Idle`: primary drag on a corner handle resizes it
//! - `Idle -> Panning -> Idle`: middle drag (or primary drag in view mode)
//!
//! Every pointer position is mapped to image space through the viewport
//! before hit-testing, so hit radii are divided by zoom and stay constant on
//! screen.

use crate::constants::{HANDLE_HIT_RADIUS, HANDLE_RADIUS, MIN_BOX_SIZE};
use crate::geometry::{Corner, Point, Rect};
use crate::model::{AnnotationBox, BoxArena, BoxId, EditMode, EditorState};
use crate::viewport::{Viewport, ViewportError, ZoomLimits};

/// Pointer button of a down/up event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

/// Pointer input in screen (CSS pixel) coordinates relative to the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Down { position: Point, button: PointerButton },
    Move { position: Point },
    Up { position: Point, button: PointerButton },
    /// Pointer left the canvas
    Leave,
    /// Context menu requested (usually a secondary click)
    ContextMenu,
    /// Wheel scroll; negative `delta_y` zooms in
    Wheel { position: Point, delta_y: f32 },
}

/// Tunables for gestures and hit-testing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionSettings {
    /// Boxes narrower or shorter than this (image px) are discarded after drawing
    pub min_box_size: f32,
    /// Drawn handle radius (screen px)
    pub handle_radius: f32,
    /// Handle hit radius (screen px)
    pub handle_hit_radius: f32,
    pub zoom: ZoomLimits,
}

impl Default for InteractionSettings {
    fn default() -> Self {
        Self {
            min_box_size: MIN_BOX_SIZE,
            handle_radius: HANDLE_RADIUS,
            handle_hit_radius: HANDLE_HIT_RADIUS,
            zoom: ZoomLimits::default(),
        }
    }
}

/// What the pointer is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitTarget {
    Handle { id: BoxId, corner: Corner },
    Body(BoxId),
}

impl HitTarget {
    pub fn box_id(&self) -> BoxId {
        match *self {
            HitTarget::Handle { id, .. } | HitTarget::Body(id) => id,
        }
    }
}

/// Active gesture.
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    Idle,
    /// Drawing a new box. Points are in image space.
    Drawing { start: Point, current: Point },
    /// Moving a box. `grab` is the image point where the drag started.
    Dragging {
        id: BoxId,
        grab: Point,
        original: AnnotationBox,
    },
    /// Resizing a box around the corner opposite the grabbed one.
    Resizing {
        id: BoxId,
        anchor: Point,
        original: AnnotationBox,
    },
    /// Panning the viewport. `last` is in screen space.
    Panning { last: Point, button: PointerButton },
}

impl Gesture {
    /// Button whose release ends the gesture.
    pub fn button(&self) -> Option<PointerButton> {
        match self {
            Gesture::Idle => None,
            Gesture::Panning { button, .. } => Some(*button),
            Gesture::Drawing { .. } | Gesture::Dragging { .. } | Gesture::Resizing { .. } => {
                Some(PointerButton::Primary)
            }
        }
    }
}

/// Effects of one pointer event, for the caller to schedule redraws or
/// forward to the host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionResponse {
    /// Boxes, hover, selection or preview changed
    pub overlay_changed: bool,
    /// Zoom or pan changed
    pub viewport_changed: bool,
    /// A box was created by a completed draw gesture
    pub created: Option<BoxId>,
    /// Segmentation prompt placed (image space)
    pub segment_prompt: Option<Point>,
}

impl InteractionResponse {
    fn overlay() -> Self {
        Self {
            overlay_changed: true,
            ..Self::default()
        }
    }

    fn viewport() -> Self {
        Self {
            viewport_changed: true,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Box collection plus the gesture state machine operating on it.
#[derive(Debug, Clone)]
pub struct BoxEditor {
    boxes: BoxArena,
    state: EditorState,
    mode: EditMode,
    gesture: Gesture,
    hovered_handle: Option<Corner>,
    settings: InteractionSettings,
}

impl BoxEditor {
    pub fn new(mode: EditMode, settings: InteractionSettings) -> Self {
        Self {
            boxes: BoxArena::new(),
            state: EditorState::default(),
            mode,
            gesture: Gesture::Idle,
            hovered_handle: None,
            settings,
        }
    }

    pub fn boxes(&self) -> &BoxArena {
        &self.boxes
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn viewport(&self) -> Viewport {
        self.state.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.state.viewport = viewport;
    }

    pub fn settings(&self) -> &InteractionSettings {
        &self.settings
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    /// Corner handle under the pointer on the hovered box.
    pub fn hovered_handle(&self) -> Option<Corner> {
        self.hovered_handle
    }

    /// Switch edit mode. An active gesture is cancelled.
    pub fn set_mode(&mut self, mode: EditMode) -> bool {
        if mode == self.mode {
            return false;
        }
        self.cancel_gesture();
        log::debug!("Edit mode {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
        true
    }

    /// In-progress drawing rectangle, exactly as dragged (may have negative size).
    pub fn preview_rect(&self) -> Option<Rect> {
        match self.gesture {
            Gesture::Drawing { start, current } => Some(Rect::new(
                start.x,
                start.y,
                current.x - start.x,
                current.y - start.y,
            )),
            _ => None,
        }
    }

    /// Replace all boxes, e.g. after switching images. Resets selection, hover and gesture.
    pub fn load_boxes(&mut self, boxes: Vec<AnnotationBox>) {
        self.gesture = Gesture::Idle;
        self.hovered_handle = None;
        self.state.clear_selection();
        self.boxes.replace_all(boxes);
        log::debug!("Loaded {} boxes", self.boxes.len());
    }

    /// Clear unsaved flags after the host persisted the boxes.
    pub fn mark_saved(&mut self) {
        self.boxes.mark_all_saved();
    }

    /// Delete a box and every reference to it.
    pub fn delete_box(&mut self, id: BoxId) -> Option<AnnotationBox> {
        if matches!(
            self.gesture,
            Gesture::Dragging { id: g, .. } | Gesture::Resizing { id: g, .. } if g == id
        ) {
            self.gesture = Gesture::Idle;
        }
        let removed = self.boxes.remove(id)?;
        self.state.forget(id);
        if self.state.hovered_box_id.is_none() {
            self.hovered_handle = None;
        }
        log::debug!("Deleted box {}", id);
        Some(removed)
    }

    /// Select a box by id. Unknown ids leave the selection unchanged.
    pub fn select(&mut self, id: BoxId) -> bool {
        if !self.boxes.contains(id) {
            return false;
        }
        self.state.selected_box_id = Some(id);
        true
    }

    pub fn delete_selected(&mut self) -> Option<AnnotationBox> {
        let id = self.state.selected(&self.boxes)?.id;
        self.delete_box(id)
    }

    /// Hit-test a screen point. Handles win over bodies; within each class
    /// the topmost box wins.
    pub fn hit_test(&self, screen: Point) -> Result<Option<HitTarget>, ViewportError> {
        let p = self.state.viewport.screen_to_image(screen)?;
        let radius = self
            .state
            .viewport
            .screen_len_to_image(self.settings.handle_hit_radius)?;
        Ok(self.hit_test_image(p, radius))
    }

    fn hit_test_image(&self, p: Point, radius: f32) -> Option<HitTarget> {
        let handle = self.boxes.iter().rev().find_map(|b| {
            Corner::ALL
                .into_iter()
                .find(|&c| b.rect.corner(c).distance_to(p) <= radius)
                .map(|corner| HitTarget::Handle { id: b.id, corner })
        });
        handle.or_else(|| self.boxes.topmost_at(p).map(HitTarget::Body))
    }

    /// Feed one pointer event through the state machine.
    pub fn handle(&mut self, event: PointerEvent) -> InteractionResponse {
        let result = match event {
            PointerEvent::Down { position, button } => self.on_down(position, button),
            PointerEvent::Move { position } => self.on_move(position),
            PointerEvent::Up { position, button } => self.on_release(position, button),
            PointerEvent::Leave => self.on_leave(),
            PointerEvent::ContextMenu => Ok(self.cancel_gesture()),
            PointerEvent::Wheel { position, delta_y } => Ok(self.on_wheel(position, delta_y)),
        };
        result.unwrap_or_else(|e| {
            log::warn!("Ignoring pointer event {:?}: {}", event, e);
            InteractionResponse::default()
        })
    }

    fn on_down(
        &mut self,
        screen: Point,
        button: PointerButton,
    ) -> Result<InteractionResponse, ViewportError> {
        if self.gesture != Gesture::Idle {
            return Ok(InteractionResponse::default());
        }
        match button {
            PointerButton::Middle => {
                self.gesture = Gesture::Panning {
                    last: screen,
                    button: PointerButton::Middle,
                };
                return Ok(InteractionResponse::default());
            }
            PointerButton::Secondary => return Ok(InteractionResponse::default()),
            PointerButton::Primary => {}
        }

        let p = self.state.viewport.screen_to_image(screen)?;
        match self.mode {
            EditMode::View => {
                self.gesture = Gesture::Panning {
                    last: screen,
                    button: PointerButton::Primary,
                };
                Ok(InteractionResponse::default())
            }
            EditMode::Segment => {
                log::debug!("Segment prompt at ({:.1}, {:.1})", p.x, p.y);
                Ok(InteractionResponse {
                    segment_prompt: Some(p),
                    ..InteractionResponse::default()
                })
            }
            mode if mode.allows_box_edits() => {
                let target = self.hit_test(screen)?;
                Ok(self.begin_gesture(p, target))
            }
            _ => Ok(InteractionResponse::default()),
        }
    }

    fn begin_gesture(&mut self, p: Point, target: Option<HitTarget>) -> InteractionResponse {
        let Some(target) = target else {
            if self.mode == EditMode::Draw {
                log::debug!("Drawing started at ({:.1}, {:.1})", p.x, p.y);
                self.gesture = Gesture::Drawing {
                    start: p,
                    current: p,
                };
                self.state.selected_box_id = None;
            } else {
                self.state.selected_box_id = None;
                log::debug!("Click on empty canvas, selection cleared");
            }
            return InteractionResponse::overlay();
        };

        let id = target.box_id();
        let Some(original) = self.boxes.get(id).cloned() else {
            return InteractionResponse::default();
        };
        self.state.selected_box_id = Some(id);
        self.gesture = match target {
            HitTarget::Handle { corner, .. } => {
                log::debug!("Resize box {} from {:?}", id, corner);
                Gesture::Resizing {
                    id,
                    anchor: original.rect.corner(corner.opposite()),
                    original,
                }
            }
            HitTarget::Body(_) => {
                log::debug!("Drag box {}", id);
                Gesture::Dragging {
                    id,
                    grab: p,
                    original,
                }
            }
        };
        if let Some(b) = self.boxes.get_mut(id) {
            b.mark_modified();
        }
        InteractionResponse::overlay()
    }

    fn on_move(&mut self, screen: Point) -> Result<InteractionResponse, ViewportError> {
        if let Gesture::Panning { last, button } = self.gesture {
            self.state.viewport = self.state.viewport.pan_by(screen.x - last.x, screen.y - last.y);
            self.gesture = Gesture::Panning {
                last: screen,
                button,
            };
            return Ok(InteractionResponse::viewport());
        }

        let p = self.state.viewport.screen_to_image(screen)?;
        match &mut self.gesture {
            Gesture::Idle => {
                let target = self.hit_test(screen)?;
                Ok(self.update_hover(target))
            }
            Gesture::Drawing { current, .. } => {
                *current = p;
                Ok(InteractionResponse::overlay())
            }
            Gesture::Dragging { id, grab, original } => {
                let rect = original.rect.translated(p.x - grab.x, p.y - grab.y);
                let id = *id;
                Ok(self.apply_edit(id, rect))
            }
            Gesture::Resizing { id, anchor, .. } => {
                let rect = Rect::from_corners(*anchor, p);
                let id = *id;
                Ok(self.apply_edit(id, rect))
            }
            Gesture::Panning { .. } => Ok(InteractionResponse::default()),
        }
    }

    fn apply_edit(&mut self, id: BoxId, rect: Rect) -> InteractionResponse {
        let Some(b) = self.boxes.get_mut(id) else {
            self.gesture = Gesture::Idle;
            return InteractionResponse::default();
        };
        b.rect = rect;
        InteractionResponse::overlay()
    }

    fn update_hover(&mut self, target: Option<HitTarget>) -> InteractionResponse {
        let hovered = target.map(|t| t.box_id());
        let handle = match target {
            Some(HitTarget::Handle { corner, .. }) => Some(corner),
            _ => None,
        };
        if hovered == self.state.hovered_box_id && handle == self.hovered_handle {
            return InteractionResponse::default();
        }
        self.state.hovered_box_id = hovered;
        self.hovered_handle = handle;
        InteractionResponse::overlay()
    }

    /// Release of `button`. Only the button that started the gesture ends
    /// it; hover is then recomputed at the release position.
    fn on_release(
        &mut self,
        screen: Point,
        button: PointerButton,
    ) -> Result<InteractionResponse, ViewportError> {
        if self.gesture.button() != Some(button) {
            return Ok(InteractionResponse::default());
        }
        let mut response = self.on_up(Some(screen))?;
        let target = self.hit_test(screen)?;
        response.overlay_changed |= self.update_hover(target).overlay_changed;
        Ok(response)
    }

    fn on_up(&mut self, screen: Option<Point>) -> Result<InteractionResponse, ViewportError> {
        if let (Some(screen), Gesture::Drawing { current, .. }) = (screen, &mut self.gesture) {
            *current = self.state.viewport.screen_to_image(screen)?;
        }

        let gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);
        let response = match gesture {
            Gesture::Idle => InteractionResponse::default(),
            Gesture::Panning { .. } => InteractionResponse::default(),
            Gesture::Drawing { start, current } => self.commit_drawing(start, current),
            Gesture::Dragging { id, .. } | Gesture::Resizing { id, .. } => {
                if let Some(b) = self.boxes.get_mut(id) {
                    b.rect = b.rect.normalized();
                    log::debug!("Committed box {}: {:?}", id, b.rect);
                }
                InteractionResponse::overlay()
            }
        };
        Ok(response)
    }

    fn commit_drawing(&mut self, start: Point, current: Point) -> InteractionResponse {
        let rect = Rect::new(start.x, start.y, current.x - start.x, current.y - start.y).normalized();
        let min = self.settings.min_box_size;
        if rect.width < min || rect.height < min {
            log::debug!(
                "Discarding {:.1}x{:.1} box (minimum {:.1})",
                rect.width,
                rect.height,
                min
            );
            return InteractionResponse::overlay();
        }
        let id = self.boxes.create(rect);
        self.state.selected_box_id = Some(id);
        log::debug!("Created box {}: {:?}", id, rect);
        InteractionResponse {
            overlay_changed: true,
            created: Some(id),
            ..InteractionResponse::default()
        }
    }

    fn on_leave(&mut self) -> Result<InteractionResponse, ViewportError> {
        let mut response = self.on_up(None)?;
        if self.state.hovered_box_id.is_some() || self.hovered_handle.is_some() {
            self.state.hovered_box_id = None;
            self.hovered_handle = None;
            response.overlay_changed = true;
        }
        Ok(response)
    }

    fn on_wheel(&mut self, screen: Point, delta_y: f32) -> InteractionResponse {
        let limits = self.settings.zoom;
        let next = if delta_y < 0.0 {
            self.state.viewport.zoom_in(screen, &limits)
        } else if delta_y > 0.0 {
            self.state.viewport.zoom_out(screen, &limits)
        } else {
            return InteractionResponse::default();
        };
        if next == self.state.viewport {
            return InteractionResponse::default();
        }
        self.state.viewport = next;
        InteractionResponse::viewport()
    }

    /// Abort the active gesture. Drag and resize restore the box as it was.
    pub fn cancel_gesture(&mut self) -> InteractionResponse {
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Idle | Gesture::Panning { .. } => InteractionResponse::default(),
            Gesture::Drawing { .. } => {
                log::debug!("Drawing cancelled");
                InteractionResponse::overlay()
            }
            Gesture::Dragging { id, original, .. } | Gesture::Resizing { id, original, .. } => {
                log::debug!("Edit of box {} cancelled", id);
                if self.boxes.contains(id) {
                    self.boxes.insert(original);
                }
                InteractionResponse::overlay()
            }
        }
    }
}

impl Default for BoxEditor {
    fn default() -> Self {
        Self::new(EditMode::default(), InteractionSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor_at(zoom: f32, pan: Point) -> BoxEditor {
        let mut editor = BoxEditor::default();
        editor.set_viewport(Viewport::new(zoom, pan));
        editor
    }

    fn screen(editor: &BoxEditor, x: f32, y: f32) -> Point {
        editor.viewport().image_to_screen(Point::new(x, y)).unwrap()
    }

    fn drag(editor: &mut BoxEditor, from: Point, to: Point) -> InteractionResponse {
        editor.handle(PointerEvent::Down {
            position: from,
            button: PointerButton::Primary,
        });
        editor.handle(PointerEvent::Move { position: to });
        editor.handle(PointerEvent::Up {
            position: to,
            button: PointerButton::Primary,
        })
    }

    #[test]
    fn test_draw_creates_new_box() {
        let mut editor = editor_at(2.0, Point::new(100.0, 50.0));
        let from = screen(&editor, 10.0, 10.0);
        let to = screen(&editor, 50.0, 40.0);
        let response = drag(&mut editor, from, to);

        let id = response.created.unwrap();
        let b = editor.boxes().get(id).unwrap();
        assert_eq!(b.rect, Rect::new(10.0, 10.0, 40.0, 30.0));
        assert!(b.is_new);
        assert_eq!(editor.state().selected_box_id, Some(id));
        assert_eq!(*editor.gesture(), Gesture::Idle);
    }

    #[test]
    fn test_backward_draw_is_normalized() {
        let mut editor = editor_at(1.5, Point::new(-20.0, 7.0));
        let from = screen(&editor, 60.0, 50.0);
        let to = screen(&editor, 20.0, 15.0);

        editor.handle(PointerEvent::Down {
            position: from,
            button: PointerButton::Primary,
        });
        editor.handle(PointerEvent::Move { position: to });
        let preview = editor.preview_rect().unwrap();
        assert!(preview.width < 0.0 && preview.height < 0.0);

        let response = editor.handle(PointerEvent::Up {
            position: to,
            button: PointerButton::Primary,
        });
        let rect = editor.boxes().get(response.created.unwrap()).unwrap().rect;
        assert!(rect.width >= 0.0 && rect.height >= 0.0);
        assert!((rect.area() - preview.area()).abs() < 0.01);
        assert!((rect.x - 20.0).abs() < 0.01 && (rect.y - 15.0).abs() < 0.01);
    }

    #[test]
    fn test_tiny_box_is_discarded() {
        let mut editor = editor_at(1.0, Point::ORIGIN);
        let response = drag(&mut editor, Point::new(10.0, 10.0), Point::new(12.0, 40.0));
        assert_eq!(response.created, None);
        assert!(editor.boxes().is_empty());
    }

    #[test]
    fn test_hover_corner_prefers_handle() {
        let mut editor = editor_at(2.0, Point::new(100.0, 50.0));
        editor.load_boxes(vec![AnnotationBox::new(1, Rect::new(10.0, 10.0, 40.0, 30.0))]);

        let p = screen(&editor, 50.0, 40.0);
        assert_eq!(p, Point::new(200.0, 130.0));
        editor.handle(PointerEvent::Move { position: p });

        assert_eq!(editor.state().hovered_box_id, Some(1));
        assert_eq!(editor.hovered_handle(), Some(Corner::BottomRight));
        assert_eq!(
            editor.hit_test(p).unwrap(),
            Some(HitTarget::Handle {
                id: 1,
                corner: Corner::BottomRight
            })
        );
    }

    #[test]
    fn test_hit_radius_is_constant_on_screen() {
        let rect = Rect::new(10.0, 10.0, 40.0, 30.0);
        for zoom in [0.5, 1.0, 4.0] {
            let mut editor = editor_at(zoom, Point::new(3.0, 9.0));
            editor.load_boxes(vec![AnnotationBox::new(1, rect)]);
            let corner = screen(&editor, 50.0, 40.0);
            let near = corner.offset(HANDLE_HIT_RADIUS - 1.0, 0.0);
            let far = corner.offset(HANDLE_HIT_RADIUS + 1.0, 0.0);
            assert!(matches!(
                editor.hit_test(near).unwrap(),
                Some(HitTarget::Handle { .. })
            ));
            assert_eq!(editor.hit_test(far).unwrap(), None);
        }
    }

    #[test]
    fn test_drag_moves_box_and_marks_modified() {
        let mut editor = editor_at(1.0, Point::ORIGIN);
        editor.load_boxes(vec![AnnotationBox::new(1, Rect::new(0.0, 0.0, 40.0, 40.0))]);

        drag(&mut editor, Point::new(20.0, 20.0), Point::new(30.0, 25.0));
        let b = editor.boxes().get(1).unwrap();
        assert_eq!(b.rect, Rect::new(10.0, 5.0, 40.0, 40.0));
        assert!(b.is_modified);
    }

    #[test]
    fn test_grab_marks_modified_and_cancel_restores() {
        let mut editor = editor_at(1.0, Point::ORIGIN);
        editor.set_mode(EditMode::Edit);
        editor.load_boxes(vec![AnnotationBox::new(1, Rect::new(0.0, 0.0, 40.0, 40.0))]);

        let p = Point::new(20.0, 20.0);
        editor.handle(PointerEvent::Down {
            position: p,
            button: PointerButton::Primary,
        });
        assert_eq!(editor.state().selected_box_id, Some(1));
        assert!(editor.boxes().get(1).unwrap().is_modified);

        editor.handle(PointerEvent::ContextMenu);
        assert!(!editor.boxes().get(1).unwrap().is_modified);
        assert_eq!(editor.gesture(), &Gesture::Idle);
    }

    #[test]
    fn test_resize_past_anchor_normalizes() {
        let mut editor = editor_at(1.0, Point::ORIGIN);
        editor.load_boxes(vec![AnnotationBox::new(1, Rect::new(10.0, 10.0, 40.0, 30.0))]);

        drag(&mut editor, Point::new(50.0, 40.0), Point::new(0.0, 0.0));
        assert_eq!(editor.boxes().get(1).unwrap().rect, Rect::new(0.0, 0.0, 10.0, 10.0));
    }

    #[test]
    fn test_context_menu_restores_box() {
        let mut editor = editor_at(1.0, Point::ORIGIN);
        let original = AnnotationBox::new(1, Rect::new(0.0, 0.0, 40.0, 40.0));
        editor.load_boxes(vec![original.clone()]);

        editor.handle(PointerEvent::Down {
            position: Point::new(20.0, 20.0),
            button: PointerButton::Primary,
        });
        editor.handle(PointerEvent::Move {
            position: Point::new(80.0, 80.0),
        });
        editor.handle(PointerEvent::ContextMenu);

        assert_eq!(*editor.boxes().get(1).unwrap(), original);
        assert_eq!(*editor.gesture(), Gesture::Idle);
    }

    #[test]
    fn test_leave_commits_drawing() {
        let mut editor = editor_at(1.0, Point::ORIGIN);
        editor.handle(PointerEvent::Down {
            position: Point::new(0.0, 0.0),
            button: PointerButton::Primary,
        });
        editor.handle(PointerEvent::Move {
            position: Point::new(30.0, 30.0),
        });
        let response = editor.handle(PointerEvent::Leave);
        assert!(response.created.is_some());
        assert_eq!(editor.boxes().len(), 1);
    }

    #[test]
    fn test_view_mode_pans_and_never_draws() {
        let mut editor = editor_at(1.0, Point::ORIGIN);
        editor.set_mode(EditMode::View);
        let response = drag(&mut editor, Point::new(0.0, 0.0), Point::new(25.0, -5.0));
        assert!(editor.boxes().is_empty());
        assert_eq!(response.created, None);
        assert_eq!(editor.viewport().pan_offset, Point::new(25.0, -5.0));
    }

    #[test]
    fn test_segment_mode_emits_prompt() {
        let mut editor = editor_at(2.0, Point::new(10.0, 10.0));
        editor.set_mode(EditMode::Segment);
        let response = editor.handle(PointerEvent::Down {
            position: Point::new(30.0, 50.0),
            button: PointerButton::Primary,
        });
        assert_eq!(response.segment_prompt, Some(Point::new(10.0, 20.0)));
        assert_eq!(*editor.gesture(), Gesture::Idle);
    }

    #[test]
    fn test_edit_mode_empty_click_clears_selection() {
        let mut editor = editor_at(1.0, Point::ORIGIN);
        editor.set_mode(EditMode::Edit);
        editor.load_boxes(vec![AnnotationBox::new(1, Rect::new(0.0, 0.0, 40.0, 40.0))]);
        drag(&mut editor, Point::new(20.0, 20.0), Point::new(20.0, 20.0));
        assert_eq!(editor.state().selected_box_id, Some(1));

        drag(&mut editor, Point::new(100.0, 100.0), Point::new(150.0, 150.0));
        assert_eq!(editor.state().selected_box_id, None);
        assert_eq!(editor.boxes().len(), 1);
    }

    #[test]
    fn test_delete_selected_clears_references() {
        let mut editor = editor_at(1.0, Point::ORIGIN);
        editor.load_boxes(vec![AnnotationBox::new(1, Rect::new(0.0, 0.0, 40.0, 40.0))]);
        editor.handle(PointerEvent::Move {
            position: Point::new(20.0, 20.0),
        });
        drag(&mut editor, Point::new(20.0, 20.0), Point::new(20.0, 20.0));

        assert!(editor.delete_selected().is_some());
        assert_eq!(editor.state().selected_box_id, None);
        assert_eq!(editor.state().hovered_box_id, None);
        assert!(editor.delete_selected().is_none());
    }

    #[test]
    fn test_select_known_box_only() {
        let mut editor = editor_at(1.0, Point::ORIGIN);
        editor.load_boxes(vec![AnnotationBox::new(1, Rect::new(0.0, 0.0, 40.0, 40.0))]);
        assert!(!editor.select(7));
        assert_eq!(editor.state().selected_box_id, None);
        assert!(editor.select(1));
        assert_eq!(editor.state().selected_box_id, Some(1));
    }

    #[test]
    fn test_middle_drag_pans_in_draw_mode() {
        let mut editor = editor_at(1.0, Point::ORIGIN);
        editor.handle(PointerEvent::Down {
            position: Point::new(0.0, 0.0),
            button: PointerButton::Middle,
        });
        let response = editor.handle(PointerEvent::Move {
            position: Point::new(10.0, 20.0),
        });
        assert!(response.viewport_changed);
        editor.handle(PointerEvent::Up {
            position: Point::new(10.0, 20.0),
            button: PointerButton::Middle,
        });
        assert_eq!(editor.viewport().pan_offset, Point::new(10.0, 20.0));
        assert!(editor.boxes().is_empty());
    }

    #[test]
    fn test_only_starting_button_ends_gesture() {
        let mut editor = editor_at(1.0, Point::ORIGIN);
        editor.handle(PointerEvent::Down {
            position: Point::new(0.0, 0.0),
            button: PointerButton::Primary,
        });
        editor.handle(PointerEvent::Move {
            position: Point::new(30.0, 30.0),
        });
        for button in [PointerButton::Middle, PointerButton::Secondary] {
            let response = editor.handle(PointerEvent::Up {
                position: Point::new(30.0, 30.0),
                button,
            });
            assert!(response.is_empty());
        }
        assert!(matches!(editor.gesture(), Gesture::Drawing { .. }));
        assert!(editor.boxes().is_empty());

        let response = editor.handle(PointerEvent::Up {
            position: Point::new(30.0, 30.0),
            button: PointerButton::Primary,
        });
        assert!(response.created.is_some());

        editor.handle(PointerEvent::Down {
            position: Point::new(100.0, 100.0),
            button: PointerButton::Middle,
        });
        editor.handle(PointerEvent::Up {
            position: Point::new(100.0, 100.0),
            button: PointerButton::Primary,
        });
        assert_eq!(editor.gesture().button(), Some(PointerButton::Middle));
        editor.handle(PointerEvent::Up {
            position: Point::new(100.0, 100.0),
            button: PointerButton::Middle,
        });
        assert_eq!(*editor.gesture(), Gesture::Idle);
    }

    #[test]
    fn test_release_recomputes_hover() {
        let mut editor = editor_at(1.0, Point::ORIGIN);
        editor.load_boxes(vec![AnnotationBox::new(1, Rect::new(10.0, 10.0, 40.0, 30.0))]);

        let corner = Point::new(50.0, 40.0);
        editor.handle(PointerEvent::Move { position: corner });
        assert_eq!(editor.hovered_handle(), Some(Corner::BottomRight));

        let response = drag(&mut editor, corner, Point::new(80.0, 70.0));
        assert!(response.overlay_changed);
        assert_eq!(editor.boxes().get(1).unwrap().rect, Rect::new(10.0, 10.0, 70.0, 60.0));
        assert_eq!(editor.state().hovered_box_id, Some(1));
        assert_eq!(editor.hovered_handle(), Some(Corner::BottomRight));

        drag(&mut editor, Point::new(30.0, 30.0), Point::new(40.0, 30.0));
        assert_eq!(editor.boxes().get(1).unwrap().rect, Rect::new(20.0, 10.0, 70.0, 60.0));
        assert_eq!(editor.state().hovered_box_id, Some(1));
        assert_eq!(editor.hovered_handle(), None);
    }

    #[test]
    fn test_wheel_zoom_keeps_cursor_point() {
        let mut editor = editor_at(1.0, Point::ORIGIN);
        let cursor = Point::new(120.0, 80.0);
        let before = editor.viewport().screen_to_image(cursor).unwrap();
        let response = editor.handle(PointerEvent::Wheel {
            position: cursor,
            delta_y: -1.0,
        });
        assert!(response.viewport_changed);
        let after = editor.viewport().screen_to_image(cursor).unwrap();
        assert!((before.x - after.x).abs() < 0.001);
        assert!((before.y - after.y).abs() < 0.001);
    }

    #[test]
    fn test_degenerate_viewport_ignores_events() {
        let mut editor = BoxEditor::default();
        editor.set_viewport(Viewport {
            zoom: 0.0,
            pan_offset: Point::ORIGIN,
        });
        let response = drag(&mut editor, Point::new(0.0, 0.0), Point::new(50.0, 50.0));
        assert!(response.is_empty());
        assert!(editor.boxes().is_empty());
    }
}
