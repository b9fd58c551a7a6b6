//! Shared types for background image loading.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;

use serde::{Deserialize, Serialize};

use crate::model::ImageId;
use crate::render::ImageHandle;

/// Supported image file extensions.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp", "tiff", "tif"];

/// Check if a filename has a supported image extension.
pub fn is_image_file(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| lower.rsplit_once('.').is_some_and(|(_, e)| e == *ext))
}

/// Rendition of an image served by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Original,
    #[default]
    Preview,
    Thumbnail,
}

impl ImageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageKind::Original => "original",
            ImageKind::Preview => "preview",
            ImageKind::Thumbnail => "thumbnail",
        }
    }
}

/// One entry of the navigation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    pub id: ImageId,
    #[serde(default)]
    pub name: String,
}

impl ImageDescriptor {
    pub fn new(id: ImageId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Errors while fetching or decoding an image.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Transport error: {0}")]
    Transport(String),
}

impl From<std::io::Error> for FetchError {
    fn from(e: std::io::Error) -> Self {
        FetchError::Io(e.to_string())
    }
}

impl From<image::ImageError> for FetchError {
    fn from(e: image::ImageError) -> Self {
        FetchError::Decode(e.to_string())
    }
}

/// Cooperative cancellation flag shared between the cache and a loader.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Whether both tokens belong to the same load.
    pub fn same_as(&self, other: &CancelToken) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// A finished load, as delivered to the preloader.
#[derive(Debug)]
pub struct LoadCompletion {
    pub id: ImageId,
    pub token: CancelToken,
    pub result: Result<ImageHandle, FetchError>,
}

/// One scheduled load handed to an [`ImageFetcher`](super::ImageFetcher).
///
/// The ticket is the only way to report the result, and it refuses to
/// deliver once the load was cancelled.
#[derive(Debug)]
pub struct LoadTicket {
    id: ImageId,
    kind: ImageKind,
    token: CancelToken,
    reply: Sender<LoadCompletion>,
}

impl LoadTicket {
    pub(crate) fn new(
        id: ImageId,
        kind: ImageKind,
        token: CancelToken,
        reply: Sender<LoadCompletion>,
    ) -> Self {
        Self {
            id,
            kind,
            token,
            reply,
        }
    }

    pub fn id(&self) -> ImageId {
        self.id
    }

    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Report the result. Returns `false` if the load was cancelled or the
    /// preloader is gone, in which case nothing is delivered.
    pub fn complete(self, result: Result<ImageHandle, FetchError>) -> bool {
        if self.token.is_cancelled() {
            log::trace!("Dropping result of cancelled load {}", self.id);
            return false;
        }
        self.reply
            .send(LoadCompletion {
                id: self.id,
                token: self.token,
                result,
            })
            .is_ok()
    }
}
