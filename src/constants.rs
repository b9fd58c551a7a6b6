//! Global constants for the annotation canvas engine

/// Maximum number of mask operations kept for undo.
pub const MAX_UNDO_STACK_SIZE: usize = 20;

/// IOU score used when restoring a mask whose snapshot has none.
pub const DEFAULT_RESTORE_IOU_SCORE: f64 = 0.9;

/// Prompt count sent when re-saving a restored mask.
pub const RESTORE_PROMPT_COUNT: u32 = 1;

/// Number of neighbor images preloaded in each direction.
pub const DEFAULT_PRELOAD_BUFFER_SIZE: usize = 2;

/// Boxes smaller than this (image pixels) after a draw gesture are discarded.
pub const MIN_BOX_SIZE: f32 = 4.0;

/// On-screen radius of a resize handle, in CSS pixels.
pub const HANDLE_RADIUS: f32 = 5.0;

/// On-screen hit radius of a resize handle, in CSS pixels.
pub const HANDLE_HIT_RADIUS: f32 = 9.0;

/// Corner radius of the image clip, in CSS pixels.
pub const IMAGE_CORNER_RADIUS: f32 = 8.0;

/// Zoom limits and step factor.
pub mod zoom {
    pub const MIN: f32 = 0.1;
    pub const MAX: f32 = 20.0;
    pub const STEP: f32 = 1.2;
}

/// Storage key of the persisted edit mode.
pub const EDIT_MODE_STORAGE_KEY: &str = "annotation-editor-mode";
