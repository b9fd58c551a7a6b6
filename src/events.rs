//! Editor notifications for the surrounding UI.
//!
//! Components hold an [`EventSender`] and emit [`EditorEvent`]s in the order
//! things happen; the host drains the [`EventReceiver`] once per tick. Each
//! event is delivered exactly once.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use crate::model::{EditMode, ImageId};

/// Something the host may want to react to.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// Image pixels are available
    ImageLoaded {
        image_id: ImageId,
        width: u32,
        height: u32,
    },
    /// The image surface painted the image for the first time
    ImageCanvasReady { image_id: ImageId },
    /// The image could not be loaded
    ImageError { image_id: ImageId, message: String },
    /// An undo restored the mask of this image; dependent views should refetch
    MaskRestored { image_id: ImageId },
    /// A user-visible failure, e.g. an undo that could not be applied
    Error { message: String, cause: String },
    /// The edit mode changed
    EditModeChanged(EditMode),
}

/// Create a connected sender/receiver pair.
pub fn channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::channel();
    (EventSender { tx }, EventReceiver { rx })
}

/// Sending half. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<EditorEvent>,
}

impl EventSender {
    /// Emit an event. Events sent after the receiver is gone are dropped.
    pub fn emit(&self, event: EditorEvent) {
        log::trace!("Event: {:?}", event);
        if self.tx.send(event).is_err() {
            log::trace!("Event receiver dropped, event discarded");
        }
    }
}

/// Receiving half, owned by the host.
#[derive(Debug)]
pub struct EventReceiver {
    rx: Receiver<EditorEvent>,
}

impl EventReceiver {
    /// Next pending event, if any.
    pub fn try_next(&self) -> Option<EditorEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// All pending events in firing order.
    pub fn drain(&self) -> Vec<EditorEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}
