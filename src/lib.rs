//! fovcanvas - annotation canvas engine for microscopy fields of view.
//!
//! Two stacked drawing layers (image and overlay) share one viewport
//! transform. Bounding boxes are drawn and edited through a pointer-event
//! state machine, mask operations are undoable against a remote store, and
//! neighbor images are preloaded in the background.

pub mod canvas;
pub mod config;
pub mod constants;
pub mod events;
pub mod geometry;
pub mod interaction;
pub mod logging;
pub mod mask;
pub mod model;
pub mod preload;
pub mod scheduler;
pub mod session;
pub mod settings;
pub mod viewport;

#[cfg(test)]
mod tests;

pub use fovcanvas_render as render;

pub use canvas::{Canvas, CanvasRenderer, CanvasStyle, ImageContent};
pub use config::{ConfigError, EngineConfig, LogLevel};
pub use events::{EditorEvent, EventReceiver, EventSender};
pub use interaction::{BoxEditor, InteractionResponse, PointerButton, PointerEvent};
pub use mask::{MaskStore, MaskStoreError, MaskUndoHistory, UndoOutcome};
pub use model::{AnnotationBox, BoxId, EditMode, ImageId};
pub use preload::{ImageFetcher, Preloader};
pub use scheduler::FrameScheduler;
pub use session::EditorSession;
pub use viewport::{Viewport, ViewportError};
