//! Data models for the annotation editor.

mod annotation;
mod arena;
mod editor;

pub use annotation::{AnnotationBox, BoxId};
pub use arena::BoxArena;
pub use editor::{EditMode, EditorState};

/// Backend identifier of an image (field of view).
pub type ImageId = u64;
