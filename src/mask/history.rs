//! Bounded undo history for mask save/delete operations.
//!
//! Actions are pushed only after their mutation succeeded. `undo` replays
//! the inverse of the newest action against the store and removes the action
//! only once the replay fully succeeded; a failed undo leaves the stack as it
//! was so the user can retry. A second `undo` while one is in flight is
//! rejected, never queued.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

use super::error::MaskStoreError;
use super::store::MaskStore;
use super::types::{FovMaskState, MaskUndoAction, MaskUndoKind, SaveMaskRequest};
use crate::constants::MAX_UNDO_STACK_SIZE;
use crate::events::{EditorEvent, EventSender};
use crate::model::ImageId;

/// Result of an [`MaskUndoHistory::undo`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum UndoOutcome {
    /// The newest action was reverted and removed
    Restored { image_id: ImageId },
    /// Nothing to undo, or an undo is already running
    Skipped,
    /// The store failed; the action is still on the stack
    Failed(MaskStoreError),
}

#[derive(Debug, Clone)]
struct Entry {
    seq: u64,
    action: MaskUndoAction,
}

/// Resets the in-flight flag when the undo future completes or is dropped.
struct UndoingGuard<'a>(&'a Cell<bool>);

impl Drop for UndoingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Undo stack for mask operations of one editor session.
pub struct MaskUndoHistory<S> {
    store: S,
    events: EventSender,
    entries: RefCell<VecDeque<Entry>>,
    next_seq: Cell<u64>,
    is_undoing: Cell<bool>,
    max_size: usize,
}

impl<S: MaskStore> MaskUndoHistory<S> {
    pub fn new(store: S, events: EventSender) -> Self {
        Self::with_capacity(store, events, MAX_UNDO_STACK_SIZE)
    }

    /// History keeping at most `max_size` actions (at least one).
    pub fn with_capacity(store: S, events: EventSender, max_size: usize) -> Self {
        Self {
            store,
            events,
            entries: RefCell::new(VecDeque::new()),
            next_seq: Cell::new(0),
            is_undoing: Cell::new(false),
            max_size: max_size.max(1),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetch the current mask of an image. Failures yield "no mask".
    pub async fn capture_state(&self, image_id: ImageId) -> FovMaskState {
        match self.store.get_mask(image_id).await {
            Ok(state) => state,
            Err(MaskStoreError::NotFound(_)) => {
                log::debug!("No mask for image {} to capture", image_id);
                FovMaskState::empty()
            }
            Err(e) => {
                log::warn!("Failed to capture mask of image {}: {}", image_id, e);
                FovMaskState::empty()
            }
        }
    }

    /// Record a save that already succeeded.
    pub fn push_save_action(&self, image_id: ImageId, previous_state: FovMaskState) {
        self.push(MaskUndoAction {
            kind: MaskUndoKind::Save,
            image_id,
            previous_state,
        });
    }

    /// Record a delete that already succeeded.
    pub fn push_delete_action(&self, image_id: ImageId, previous_state: FovMaskState) {
        self.push(MaskUndoAction {
            kind: MaskUndoKind::Delete,
            image_id,
            previous_state,
        });
    }

    fn push(&self, action: MaskUndoAction) {
        let seq = self.next_seq.get();
        self.next_seq.set(seq + 1);
        log::debug!(
            "Push undo {:?} for image {} (had mask: {})",
            action.kind,
            action.image_id,
            action.previous_state.has_mask
        );

        let mut entries = self.entries.borrow_mut();
        entries.push_back(Entry { seq, action });
        while entries.len() > self.max_size {
            if let Some(evicted) = entries.pop_front() {
                log::debug!("Undo stack full, evicted action {}", evicted.seq);
            }
        }
    }

    /// Save a mask and record the previous state for undo.
    pub async fn save_with_history(
        &self,
        image_id: ImageId,
        request: &SaveMaskRequest,
    ) -> Result<(), MaskStoreError> {
        let previous = self.capture_state(image_id).await;
        self.store.save_mask(image_id, request).await?;
        self.push_save_action(image_id, previous);
        Ok(())
    }

    /// Delete a mask and record the previous state for undo.
    pub async fn delete_with_history(&self, image_id: ImageId) -> Result<(), MaskStoreError> {
        let previous = self.capture_state(image_id).await;
        self.store.delete_mask(image_id).await?;
        self.push_delete_action(image_id, previous);
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        !self.is_undoing.get() && !self.entries.borrow().is_empty()
    }

    pub fn is_undoing(&self) -> bool {
        self.is_undoing.get()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Newest action, if any.
    pub fn last_action(&self) -> Option<MaskUndoAction> {
        self.entries.borrow().back().map(|e| e.action.clone())
    }

    /// Drop all actions.
    pub fn clear(&self) {
        let mut entries = self.entries.borrow_mut();
        if !entries.is_empty() {
            log::debug!("Clearing {} undo actions", entries.len());
        }
        entries.clear();
    }

    /// Revert the newest action.
    pub async fn undo(&self) -> UndoOutcome {
        if self.is_undoing.get() {
            log::debug!("Undo already in flight, ignoring");
            return UndoOutcome::Skipped;
        }
        let Some(entry) = self.entries.borrow().back().cloned() else {
            return UndoOutcome::Skipped;
        };

        self.is_undoing.set(true);
        let _guard = UndoingGuard(&self.is_undoing);

        let image_id = entry.action.image_id;
        match self.replay(&entry.action).await {
            Ok(()) => {
                self.entries.borrow_mut().retain(|e| e.seq != entry.seq);
                log::info!("Undid mask {:?} on image {}", entry.action.kind, image_id);
                self.events.emit(EditorEvent::MaskRestored { image_id });
                UndoOutcome::Restored { image_id }
            }
            Err(e) => {
                log::error!("Undo of mask {:?} on image {} failed: {}", entry.action.kind, image_id, e);
                self.events.emit(EditorEvent::Error {
                    message: "Failed to undo mask change".to_string(),
                    cause: e.to_string(),
                });
                UndoOutcome::Failed(e)
            }
        }
    }

    async fn replay(&self, action: &MaskUndoAction) -> Result<(), MaskStoreError> {
        let restore = SaveMaskRequest::restoring(&action.previous_state);
        if action.previous_state.has_mask && restore.is_none() {
            log::warn!(
                "Captured mask of image {} has no polygon, it cannot be re-saved",
                action.image_id
            );
        }

        if action.kind == MaskUndoKind::Delete {
            if let Some(request) = restore {
                self.store.save_mask(action.image_id, &request).await?;
            }
            return Ok(());
        }

        // Restored if the re-save fails after the delete went through.
        let current = match &restore {
            Some(_) => match self.store.get_mask(action.image_id).await {
                Ok(state) => Some(state),
                Err(MaskStoreError::NotFound(_)) => None,
                Err(e) => return Err(e),
            },
            None => None,
        };

        match self.store.delete_mask(action.image_id).await {
            Ok(()) | Err(MaskStoreError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        let Some(request) = restore else {
            return Ok(());
        };
        if let Err(e) = self.store.save_mask(action.image_id, &request).await {
            self.roll_back(action.image_id, current.as_ref()).await;
            return Err(e);
        }
        Ok(())
    }

    /// Put back the mask that was current before a failed undo of a save.
    async fn roll_back(&self, image_id: ImageId, current: Option<&FovMaskState>) {
        let Some(request) = current.and_then(SaveMaskRequest::restoring) else {
            return;
        };
        match self.store.save_mask(image_id, &request).await {
            Ok(()) => log::debug!("Rolled back mask of image {} after failed undo", image_id),
            Err(e) => log::error!("Failed to roll back mask of image {}: {}", image_id, e),
        }
    }
}
