use crate::model::ImageId;

/// Errors reported by a remote mask store.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MaskStoreError {
    /// Transport failure (connection refused, aborted request, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// The image does not exist on the server
    #[error("Image {0} not found")]
    NotFound(ImageId),

    /// The server refused the request
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The response body could not be understood
    #[error("Invalid mask response: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for MaskStoreError {
    fn from(e: serde_json::Error) -> Self {
        MaskStoreError::Decode(e.to_string())
    }
}
