//! Segmentation mask snapshots, the remote mask store and the undo history
//! for destructive mask operations.

mod error;
mod history;
mod store;
mod types;

pub use error::MaskStoreError;
pub use history::{MaskUndoHistory, UndoOutcome};
pub use store::{InMemoryMaskStore, MaskStore, StoreCall};
pub use types::{FovMaskState, MaskUndoAction, MaskUndoKind, Polygon, Ring, SaveMaskRequest};
