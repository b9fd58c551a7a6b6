//! Per-session editor state: viewport, selection and the active edit mode.

use serde::{Deserialize, Serialize};

use super::annotation::{AnnotationBox, BoxId};
use super::arena::BoxArena;
use crate::viewport::Viewport;

/// Tool mode of the annotation editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditMode {
    /// Pan and zoom only
    View,
    /// Draw new boxes, move and resize existing ones
    #[default]
    Draw,
    /// Move, resize and select existing boxes
    Edit,
    /// Place segmentation prompt points
    Segment,
}

impl EditMode {
    /// Stable name used for persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            EditMode::View => "view",
            EditMode::Draw => "draw",
            EditMode::Edit => "edit",
            EditMode::Segment => "segment",
        }
    }

    pub fn all() -> &'static [EditMode] {
        &[EditMode::View, EditMode::Draw, EditMode::Edit, EditMode::Segment]
    }

    /// Parse a persisted value. Anything outside the enumeration is `None`.
    pub fn parse(value: &str) -> Option<Self> {
        Self::all().iter().copied().find(|m| m.as_str() == value)
    }

    /// Whether existing boxes can be moved or resized in this mode.
    pub fn allows_box_edits(&self) -> bool {
        matches!(self, EditMode::Draw | EditMode::Edit)
    }
}

/// Viewport plus weak selection/hover references into a [`BoxArena`].
#[derive(Debug, Clone, Default)]
pub struct EditorState {
    pub viewport: Viewport,
    pub selected_box_id: Option<BoxId>,
    pub hovered_box_id: Option<BoxId>,
}

impl EditorState {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            selected_box_id: None,
            hovered_box_id: None,
        }
    }

    /// Selected box, if its id still resolves.
    pub fn selected<'a>(&self, boxes: &'a BoxArena) -> Option<&'a AnnotationBox> {
        boxes.resolve(self.selected_box_id)
    }

    /// Hovered box, if its id still resolves.
    pub fn hovered<'a>(&self, boxes: &'a BoxArena) -> Option<&'a AnnotationBox> {
        boxes.resolve(self.hovered_box_id)
    }

    /// Drop references to a box that is gone.
    pub fn forget(&mut self, id: BoxId) {
        if self.selected_box_id == Some(id) {
            self.selected_box_id = None;
        }
        if self.hovered_box_id == Some(id) {
            self.hovered_box_id = None;
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected_box_id = None;
        self.hovered_box_id = None;
    }
}
