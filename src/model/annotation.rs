//! Bounding-box annotations edited on the canvas.

use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};

/// Unique identifier for an annotation box.
pub type BoxId = u32;

/// An editable bounding box in image-pixel space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationBox {
    /// Unique identifier.
    pub id: BoxId,
    /// Geometry, always normalized once a gesture is committed.
    pub rect: Rect,
    /// Created in this session and not yet saved.
    #[serde(default)]
    pub is_new: bool,
    /// Moved or resized since it was last saved.
    #[serde(default)]
    pub is_modified: bool,
}

impl AnnotationBox {
    /// A box that already exists on the server.
    pub fn new(id: BoxId, rect: Rect) -> Self {
        Self {
            id,
            rect: rect.normalized(),
            is_new: false,
            is_modified: false,
        }
    }

    /// A box freshly created by a draw gesture.
    pub fn created(id: BoxId, rect: Rect) -> Self {
        Self {
            is_new: true,
            ..Self::new(id, rect)
        }
    }

    /// Flag the box as edited. New boxes stay new.
    pub fn mark_modified(&mut self) {
        if !self.is_new {
            self.is_modified = true;
        }
    }

    /// Whether the box has edits that are not saved yet.
    pub fn is_dirty(&self) -> bool {
        self.is_new || self.is_modified
    }

    pub fn contains(&self, p: Point) -> bool {
        self.rect.contains(p)
    }
}
