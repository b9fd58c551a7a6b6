//! One open annotation view: the editor, its canvas, the preloader and the
//! mask undo history, driven by the host's event loop.
//!
//! The host forwards pointer events and container resizes, calls
//! [`EditorSession::poll`] and [`EditorSession::frame`] once per animation
//! frame and drains the [`EventReceiver`](crate::events::EventReceiver) it
//! created the session with.

use crate::canvas::{Canvas, ImageContent};
use crate::config::EngineConfig;
use crate::events::{EditorEvent, EventSender};
use crate::interaction::{BoxEditor, InteractionResponse, PointerEvent};
use crate::mask::{MaskStore, MaskUndoHistory, UndoOutcome};
use crate::model::{AnnotationBox, EditMode, ImageId};
use crate::preload::{ImageDescriptor, ImageFetcher, Preloader};
use crate::render::{ImageHandle, RenderError, Surface, SurfaceLayout};
use crate::scheduler::FrameScheduler;
use crate::settings::{MemoryStorage, SettingsStorage, load_edit_mode, save_edit_mode};
use crate::viewport::Viewport;

/// Editor session over surfaces `S`, an image fetcher `F` and a mask store `M`.
pub struct EditorSession<S, F, M> {
    editor: BoxEditor,
    canvas: Canvas<S>,
    scheduler: FrameScheduler,
    preloader: Preloader<F>,
    history: MaskUndoHistory<M>,
    settings: Box<dyn SettingsStorage>,
    events: EventSender,
    container: SurfaceLayout,
    current_image: Option<ImageId>,
    content: ImageContent,
    canvas_ready_sent: bool,
    torn_down: bool,
}

impl<S: Surface, F: ImageFetcher, M: MaskStore> EditorSession<S, F, M> {
    pub fn new(
        config: &EngineConfig,
        canvas: Canvas<S>,
        fetcher: F,
        store: M,
        events: EventSender,
    ) -> Self {
        let prefs = &config.preferences;
        let editor = BoxEditor::new(EditMode::default(), config.interaction.to_settings());
        let container = canvas.renderer().layout();
        Self {
            editor,
            canvas,
            scheduler: FrameScheduler::new(),
            preloader: Preloader::with_options(fetcher, prefs.preload_kind, prefs.preload_buffer_size),
            history: MaskUndoHistory::with_capacity(store, events.clone(), prefs.max_undo_stack_size),
            settings: Box::new(MemoryStorage::new()),
            events,
            container,
            current_image: None,
            content: ImageContent::Empty,
            canvas_ready_sent: false,
            torn_down: false,
        }
    }

    /// Use `storage` for settings and restore the edit mode saved there.
    pub fn with_settings(mut self, storage: impl SettingsStorage + 'static) -> Self {
        let mode = load_edit_mode(&storage);
        self.settings = Box::new(storage);
        self.editor.set_mode(mode);
        log::debug!("Restored edit mode {}", mode.as_str());
        self
    }

    pub fn editor(&self) -> &BoxEditor {
        &self.editor
    }

    pub fn canvas(&self) -> &Canvas<S> {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut Canvas<S> {
        &mut self.canvas
    }

    pub fn history(&self) -> &MaskUndoHistory<M> {
        &self.history
    }

    pub fn preloader(&self) -> &Preloader<F> {
        &self.preloader
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn current_image(&self) -> Option<ImageId> {
        self.current_image
    }

    pub fn content(&self) -> &ImageContent {
        &self.content
    }

    pub fn mode(&self) -> EditMode {
        self.editor.mode()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Route a pointer event through the gesture state machine.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> InteractionResponse {
        if self.torn_down {
            return InteractionResponse::default();
        }
        let response = self.editor.handle(event);
        if response.viewport_changed {
            self.scheduler.mark_all();
        } else if response.overlay_changed {
            self.scheduler.mark_overlay();
        }
        response
    }

    /// Switch edit mode, persisting the choice.
    pub fn set_mode(&mut self, mode: EditMode) {
        if self.torn_down || !self.editor.set_mode(mode) {
            return;
        }
        if let Err(e) = save_edit_mode(self.settings.as_mut(), mode) {
            log::warn!("Failed to persist edit mode: {}", e);
        }
        log::debug!("Edit mode {}", mode.as_str());
        self.events.emit(EditorEvent::EditModeChanged(mode));
        self.scheduler.mark_overlay();
    }

    /// Replace the boxes of the current image.
    pub fn load_boxes(&mut self, boxes: Vec<AnnotationBox>) {
        if self.torn_down {
            return;
        }
        self.editor.load_boxes(boxes);
        self.scheduler.mark_overlay();
    }

    /// Boxes were persisted by the host.
    pub fn mark_saved(&mut self) {
        self.editor.mark_saved();
        self.scheduler.mark_overlay();
    }

    pub fn delete_selected(&mut self) -> Option<AnnotationBox> {
        if self.torn_down {
            return None;
        }
        let removed = self.editor.delete_selected();
        if removed.is_some() {
            self.scheduler.mark_overlay();
        }
        removed
    }

    /// Record a new container size. Applied on the next frame.
    pub fn resize(&mut self, layout: SurfaceLayout) {
        if self.torn_down {
            return;
        }
        self.container = layout;
        self.scheduler.request_resize(layout);
    }

    /// Fit the current image into the container.
    pub fn fit_to_container(&mut self) {
        let Some(size) = self.content.size() else {
            return;
        };
        let viewport = Viewport::fit_to(
            size,
            (self.container.width, self.container.height),
            &self.editor.settings().zoom,
        );
        self.editor.set_viewport(viewport);
        self.scheduler.mark_all();
    }

    /// Show `image` as image `id`.
    pub fn set_image(&mut self, id: ImageId, image: ImageHandle) {
        if self.torn_down {
            return;
        }
        log::info!("Image {} loaded ({}x{})", id, image.width(), image.height());
        self.events.emit(EditorEvent::ImageLoaded {
            image_id: id,
            width: image.width(),
            height: image.height(),
        });
        self.current_image = Some(id);
        self.content = ImageContent::Ready(image);
        self.canvas_ready_sent = false;
        self.fit_to_container();
    }

    /// Loading image `id` failed. Ignored unless it is the current image.
    pub fn image_failed(&mut self, id: ImageId, message: impl Into<String>) {
        if self.torn_down || self.current_image != Some(id) {
            return;
        }
        let message = message.into();
        log::warn!("Image {} failed to load: {}", id, message);
        self.events.emit(EditorEvent::ImageError {
            image_id: id,
            message: message.clone(),
        });
        self.content = ImageContent::Failed(message);
        self.canvas_ready_sent = false;
        self.scheduler.mark_image();
    }

    /// Move to `images[index]`. Shows the cached image at once when the
    /// preloader has it, otherwise starts loading it. Returns `true` when the
    /// image is already visible.
    pub fn navigate(&mut self, index: usize, images: &[ImageDescriptor]) -> bool {
        if self.torn_down {
            return false;
        }
        let Some(descriptor) = images.get(index) else {
            log::warn!("Navigation index {} out of range ({} images)", index, images.len());
            return false;
        };
        let id = descriptor.id;
        self.preloader.schedule(index, images);

        if let Some(image) = self.preloader.cached(id) {
            self.set_image(id, image);
            return true;
        }
        log::debug!("Image {} not cached, loading", id);
        self.current_image = Some(id);
        self.content = ImageContent::Loading;
        self.canvas_ready_sent = false;
        self.preloader.load(id);
        self.scheduler.mark_image();
        false
    }

    /// Apply finished loads. The current image is shown or marked failed.
    pub fn poll(&mut self) {
        if self.torn_down {
            return;
        }
        for completion in self.preloader.poll() {
            let waiting = self.current_image == Some(completion.id)
                && matches!(self.content, ImageContent::Loading);
            if !waiting {
                continue;
            }
            match completion.result {
                Ok(image) => self.set_image(completion.id, image),
                Err(e) => self.image_failed(completion.id, e.to_string()),
            }
        }
    }

    /// Draw whatever is dirty. Returns `true` when a frame was drawn.
    pub fn frame(&mut self) -> Result<bool, RenderError> {
        if self.torn_down {
            return Ok(false);
        }
        let Some(plan) = self.scheduler.begin_frame() else {
            return Ok(false);
        };
        let painted = self.canvas.draw(&plan, &self.content, &self.editor)?;
        if painted
            && !self.canvas_ready_sent
            && let Some(image_id) = self.current_image
        {
            self.canvas_ready_sent = true;
            self.events.emit(EditorEvent::ImageCanvasReady { image_id });
        }
        Ok(true)
    }

    /// Revert the newest mask action.
    pub async fn undo(&self) -> UndoOutcome {
        if self.torn_down {
            return UndoOutcome::Skipped;
        }
        self.history.undo().await
    }

    /// Release everything. Later calls are ignored.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.history.clear();
        self.preloader.teardown();
        self.content = ImageContent::Empty;
        self.current_image = None;
        log::info!("Editor session torn down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::CanvasRenderer;
    use crate::constants::EDIT_MODE_STORAGE_KEY;
    use crate::events::{EventReceiver, channel};
    use crate::geometry::{Point, Rect};
    use crate::interaction::PointerButton;
    use crate::mask::{FovMaskState, InMemoryMaskStore, Polygon, SaveMaskRequest};
    use crate::preload::{FetchError, LoadTicket};
    use crate::render::{DrawCommand, RecordingSurface};

    /// Completes every load immediately; ids in `failing` fail.
    #[derive(Default)]
    struct InstantFetcher {
        failing: Vec<ImageId>,
        started: Vec<ImageId>,
    }

    impl ImageFetcher for InstantFetcher {
        fn start(&mut self, ticket: LoadTicket) {
            self.started.push(ticket.id());
            let result = if self.failing.contains(&ticket.id()) {
                Err(FetchError::Transport("404".to_string()))
            } else {
                ImageHandle::from_rgba8(vec![200; 4 * 4 * 4], 4, 4)
                    .map_err(|e| FetchError::Decode(e.to_string()))
            };
            ticket.complete(result);
        }
    }

    type TestSession = EditorSession<RecordingSurface, InstantFetcher, InMemoryMaskStore>;

    fn session_with(fetcher: InstantFetcher) -> (TestSession, EventReceiver) {
        let (tx, rx) = channel();
        let canvas = Canvas::new(
            CanvasRenderer::default(),
            RecordingSurface::new(),
            RecordingSurface::new(),
        );
        let mut session = EditorSession::new(
            &EngineConfig::new(),
            canvas,
            fetcher,
            InMemoryMaskStore::new(),
            tx,
        );
        session.resize(SurfaceLayout::new(400.0, 400.0, 1.0));
        (session, rx)
    }

    fn session() -> (TestSession, EventReceiver) {
        session_with(InstantFetcher::default())
    }

    fn images(n: u64) -> Vec<ImageDescriptor> {
        (0..n)
            .map(|id| ImageDescriptor::new(id, format!("fov-{}.png", id)))
            .collect()
    }

    #[test]
    fn test_canvas_ready_once_after_first_paint() {
        let (mut session, rx) = session();
        let list = images(5);
        assert!(!session.navigate(2, &list));
        assert!(matches!(session.content(), ImageContent::Loading));

        session.poll();
        assert!(session.frame().unwrap());
        session.handle_pointer(PointerEvent::Wheel {
            position: Point::new(10.0, 10.0),
            delta_y: -1.0,
        });
        assert!(session.frame().unwrap());
        assert!(!session.frame().unwrap());

        assert_eq!(
            rx.drain(),
            vec![
                EditorEvent::ImageLoaded {
                    image_id: 2,
                    width: 4,
                    height: 4
                },
                EditorEvent::ImageCanvasReady { image_id: 2 },
            ]
        );
    }

    #[test]
    fn test_navigate_uses_preloaded_image() {
        let (mut session, rx) = session();
        let list = images(5);
        session.navigate(2, &list);
        session.poll();
        assert!(session.preloader().cached(3).is_some());

        assert!(session.navigate(3, &list));
        assert_eq!(session.current_image(), Some(3));
        assert!(session.content().image().is_some());
        let loaded: Vec<_> = rx
            .drain()
            .into_iter()
            .filter(|e| matches!(e, EditorEvent::ImageLoaded { .. }))
            .collect();
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn test_failed_image_draws_placeholder() {
        let (mut session, rx) = session_with(InstantFetcher {
            failing: vec![0],
            ..InstantFetcher::default()
        });
        session.navigate(0, &images(3));
        session.poll();
        session.frame().unwrap();

        assert!(matches!(session.content(), ImageContent::Failed(_)));
        let events = rx.drain();
        assert!(matches!(
            events.as_slice(),
            [EditorEvent::ImageError { image_id: 0, .. }]
        ));
        assert!(
            !session
                .canvas()
                .image_surface()
                .last()
                .commands()
                .iter()
                .any(|c| matches!(c, DrawCommand::DrawImage { .. }))
        );
    }

    #[test]
    fn test_fit_on_image_load() {
        let (mut session, _rx) = session();
        let image = ImageHandle::from_rgba8(vec![0; 200 * 100 * 4], 200, 100).unwrap();
        session.set_image(9, image);
        let viewport = session.editor().viewport();
        assert_eq!(viewport.zoom, 2.0);
        assert_eq!(viewport.pan_offset, Point::new(0.0, 100.0));
    }

    #[test]
    fn test_pointer_marks_overlay_only() {
        let (mut session, _rx) = session();
        session.frame().unwrap();
        session.handle_pointer(PointerEvent::Down {
            position: Point::new(10.0, 10.0),
            button: PointerButton::Primary,
        });
        session.handle_pointer(PointerEvent::Move {
            position: Point::new(60.0, 60.0),
        });
        let dirty = session.scheduler().dirty();
        assert!(dirty.overlay && !dirty.image);

        session.handle_pointer(PointerEvent::Up {
            position: Point::new(60.0, 60.0),
            button: PointerButton::Primary,
        });
        assert_eq!(session.editor().boxes().len(), 1);
    }

    #[test]
    fn test_mode_is_persisted_and_announced() {
        let (session, rx) = session();
        let mut storage = MemoryStorage::new();
        save_edit_mode(&mut storage, EditMode::Edit).unwrap();
        let mut session = session.with_settings(storage);
        assert_eq!(session.mode(), EditMode::Edit);

        session.set_mode(EditMode::Edit);
        session.set_mode(EditMode::View);
        assert_eq!(rx.drain(), vec![EditorEvent::EditModeChanged(EditMode::View)]);
        let stored = session.settings.get(EDIT_MODE_STORAGE_KEY).unwrap();
        assert_eq!(stored.as_deref(), Some("view"));
    }

    #[test]
    fn test_undo_through_session() {
        let (session, rx) = session();
        let request = SaveMaskRequest::new(
            Polygon::Single(vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0]]),
            0.8,
            2,
        );
        pollster::block_on(session.history().save_with_history(4, &request)).unwrap();
        assert!(session.history().store().peek(4).has_mask);

        let outcome = pollster::block_on(session.undo());
        assert_eq!(outcome, UndoOutcome::Restored { image_id: 4 });
        assert_eq!(session.history().store().peek(4), FovMaskState::empty());
        assert_eq!(rx.drain(), vec![EditorEvent::MaskRestored { image_id: 4 }]);
    }

    #[test]
    fn test_teardown_ignores_later_events() {
        let (mut session, rx) = session();
        session.navigate(1, &images(3));
        session.teardown();

        assert!(session.history().is_empty());
        assert!(session.preloader().is_torn_down());
        session.poll();
        session.load_boxes(vec![AnnotationBox::new(1, Rect::new(0.0, 0.0, 10.0, 10.0))]);
        assert!(session.handle_pointer(PointerEvent::Leave).is_empty());
        assert!(!session.frame().unwrap());
        assert_eq!(pollster::block_on(session.undo()), UndoOutcome::Skipped);
        assert!(rx.drain().is_empty());
    }
}
