//! Background prefetch of neighbor images.

mod fetcher;
mod preloader;
mod types;

#[cfg(not(target_arch = "wasm32"))]
pub use fetcher::{DirectorySource, ThreadedFetcher};
pub use fetcher::{ImageEndpoint, ImageFetcher, ImageSource, decode_image};
pub use preloader::Preloader;
pub use types::{
    CancelToken, FetchError, IMAGE_EXTENSIONS, ImageDescriptor, ImageKind, LoadCompletion,
    LoadTicket, is_image_file,
};
