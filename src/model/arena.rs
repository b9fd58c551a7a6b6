//! Box storage with stable ids.
//!
//! Boxes live in a vector (draw order) with an id -> index map on the side.
//! Other state refers to boxes by [`BoxId`] only and resolves the id on each
//! access, so a removed box simply stops resolving.

use std::collections::HashMap;

use super::annotation::{AnnotationBox, BoxId};
use crate::geometry::{Point, Rect};

/// Ordered collection of annotation boxes addressed by id.
#[derive(Debug, Clone, Default)]
pub struct BoxArena {
    boxes: Vec<AnnotationBox>,
    index: HashMap<BoxId, usize>,
    next_id: BoxId,
}

impl BoxArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole collection, e.g. when switching images.
    pub fn replace_all(&mut self, boxes: Vec<AnnotationBox>) {
        self.boxes.clear();
        self.index.clear();
        self.next_id = 0;
        for b in boxes {
            self.insert(b);
        }
    }

    /// Insert a box with its own id. An existing box with the same id is replaced in place.
    pub fn insert(&mut self, b: AnnotationBox) -> BoxId {
        let id = b.id;
        if let Some(after) = id.checked_add(1) {
            self.next_id = self.next_id.max(after);
        }
        match self.index.get(&id) {
            Some(&idx) => self.boxes[idx] = b,
            None => {
                self.index.insert(id, self.boxes.len());
                self.boxes.push(b);
            }
        }
        id
    }

    /// Create a new box (flagged `is_new`) with a fresh id.
    pub fn create(&mut self, rect: Rect) -> BoxId {
        let id = self.fresh_id();
        self.insert(AnnotationBox::created(id, rect))
    }

    /// Next id not held by any box. Wraps around past `BoxId::MAX`.
    fn fresh_id(&mut self) -> BoxId {
        let mut id = self.next_id;
        while self.index.contains_key(&id) {
            id = id.wrapping_add(1);
        }
        self.next_id = id.wrapping_add(1);
        id
    }

    /// Remove a box, keeping the draw order of the rest.
    pub fn remove(&mut self, id: BoxId) -> Option<AnnotationBox> {
        let idx = self.index.remove(&id)?;
        let removed = self.boxes.remove(idx);
        for b in &self.boxes[idx..] {
            if let Some(slot) = self.index.get_mut(&b.id) {
                *slot -= 1;
            }
        }
        Some(removed)
    }

    pub fn get(&self, id: BoxId) -> Option<&AnnotationBox> {
        self.index.get(&id).map(|&idx| &self.boxes[idx])
    }

    pub fn get_mut(&mut self, id: BoxId) -> Option<&mut AnnotationBox> {
        self.index.get(&id).map(|&idx| &mut self.boxes[idx])
    }

    /// Resolve an optional weak reference.
    pub fn resolve(&self, id: Option<BoxId>) -> Option<&AnnotationBox> {
        id.and_then(|id| self.get(id))
    }

    pub fn contains(&self, id: BoxId) -> bool {
        self.index.contains_key(&id)
    }

    /// Boxes in draw order (bottom to top).
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &AnnotationBox> {
        self.boxes.iter()
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Topmost box whose body contains `p`.
    pub fn topmost_at(&self, p: Point) -> Option<BoxId> {
        self.boxes.iter().rev().find(|b| b.contains(p)).map(|b| b.id)
    }

    /// Clear the `is_new`/`is_modified` flags of every box.
    pub fn mark_all_saved(&mut self) {
        for b in &mut self.boxes {
            b.is_new = false;
            b.is_modified = false;
        }
    }

    /// Boxes with unsaved edits.
    pub fn dirty(&self) -> impl Iterator<Item = &AnnotationBox> {
        self.boxes.iter().filter(|b| b.is_dirty())
    }
}
