//! Image sources and fetchers.
//!
//! An [`ImageFetcher`] starts loads and reports them through their
//! [`LoadTicket`]. [`ThreadedFetcher`] reads bytes from an [`ImageSource`] and
//! decodes them on a background thread.

use super::types::{FetchError, ImageKind, LoadTicket};
use crate::model::ImageId;
use crate::render::ImageHandle;

/// Starts image loads on behalf of the preloader.
pub trait ImageFetcher {
    /// Begin loading `ticket.id()`. The result is reported through the ticket,
    /// from any thread.
    fn start(&mut self, ticket: LoadTicket);
}

/// Raw image bytes by id.
pub trait ImageSource: Send + 'static {
    fn read(&self, id: ImageId, kind: ImageKind) -> Result<Vec<u8>, FetchError>;
}

/// Decode encoded image bytes into an RGBA8 handle.
pub fn decode_image(bytes: &[u8]) -> Result<ImageHandle, FetchError> {
    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    ImageHandle::from_rgba8(rgba.into_raw(), width, height)
        .map_err(|e| FetchError::Decode(e.to_string()))
}

/// Builds backend image URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEndpoint {
    base_url: String,
    access_token: String,
}

impl ImageEndpoint {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    /// `{base}/images/{id}/{kind}?token={token}`
    pub fn url(&self, id: ImageId, kind: ImageKind) -> String {
        format!(
            "{}/images/{}/{}?token={}",
            self.base_url,
            id,
            kind.as_str(),
            self.access_token
        )
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use native::{DirectorySource, ThreadedFetcher};

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::path::{Path, PathBuf};
    use std::sync::mpsc::{self, Receiver, Sender};
    use std::thread::{self, JoinHandle};

    use super::{FetchError, ImageFetcher, ImageKind, ImageSource, LoadTicket, decode_image};
    use crate::model::ImageId;
    use crate::preload::types::{ImageDescriptor, is_image_file};

    /// Images in a local directory, addressed by their position in name order.
    ///
    /// Every kind maps to the same file.
    #[derive(Debug, Clone)]
    pub struct DirectorySource {
        files: Vec<PathBuf>,
    }

    impl DirectorySource {
        pub fn open(dir: &Path) -> Result<Self, FetchError> {
            let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file())
                .filter(|p| {
                    p.file_name()
                        .and_then(|n| n.to_str())
                        .is_some_and(is_image_file)
                })
                .collect();
            files.sort();
            log::info!("Found {} images in {:?}", files.len(), dir);
            Ok(Self { files })
        }

        /// Navigation list, in id order.
        pub fn list_descriptors(&self) -> Vec<ImageDescriptor> {
            self.files
                .iter()
                .enumerate()
                .map(|(i, path)| {
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    ImageDescriptor::new(i as ImageId, name)
                })
                .collect()
        }

        pub fn path(&self, id: ImageId) -> Option<&Path> {
            usize::try_from(id)
                .ok()
                .and_then(|i| self.files.get(i))
                .map(PathBuf::as_path)
        }
    }

    impl ImageSource for DirectorySource {
        fn read(&self, id: ImageId, _kind: ImageKind) -> Result<Vec<u8>, FetchError> {
            let path = self
                .path(id)
                .ok_or_else(|| FetchError::Io(format!("no image with id {}", id)))?;
            Ok(std::fs::read(path)?)
        }
    }

    enum ThreadMessage {
        Load(LoadTicket),
        Shutdown,
    }

    /// Loads images on a background thread.
    pub struct ThreadedFetcher {
        request_tx: Sender<ThreadMessage>,
        thread_handle: Option<JoinHandle<()>>,
    }

    impl ThreadedFetcher {
        pub fn spawn<S: ImageSource>(source: S) -> Result<Self, FetchError> {
            let (request_tx, request_rx) = mpsc::channel::<ThreadMessage>();
            let thread_handle = thread::Builder::new()
                .name("image-preloader".to_string())
                .spawn(move || {
                    log::debug!("Image preloader thread started");
                    Self::thread_loop(&source, request_rx);
                    log::debug!("Image preloader thread exiting");
                })?;

            Ok(Self {
                request_tx,
                thread_handle: Some(thread_handle),
            })
        }

        fn thread_loop<S: ImageSource>(source: &S, request_rx: Receiver<ThreadMessage>) {
            while let Ok(ThreadMessage::Load(ticket)) = request_rx.recv() {
                Self::load(source, ticket);
            }
        }

        fn load<S: ImageSource>(source: &S, ticket: LoadTicket) {
            if ticket.is_cancelled() {
                return;
            }
            let bytes = match source.read(ticket.id(), ticket.kind()) {
                Ok(bytes) => bytes,
                Err(e) => {
                    ticket.complete(Err(e));
                    return;
                }
            };
            if ticket.is_cancelled() {
                return;
            }
            log::debug!("Decoding image {} ({} bytes)", ticket.id(), bytes.len());
            let result = decode_image(&bytes);
            ticket.complete(result);
        }
    }

    impl ImageFetcher for ThreadedFetcher {
        fn start(&mut self, ticket: LoadTicket) {
            let id = ticket.id();
            if self.request_tx.send(ThreadMessage::Load(ticket)).is_err() {
                log::error!("Failed to queue load of image {}: preloader thread gone", id);
            }
        }
    }

    impl Drop for ThreadedFetcher {
        fn drop(&mut self) {
            let _ = self.request_tx.send(ThreadMessage::Shutdown);
            if let Some(handle) = self.thread_handle.take()
                && let Err(e) = handle.join()
            {
                log::warn!("Preloader thread panicked: {:?}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
        let mut out = std::io::Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_endpoint_url() {
        let endpoint = ImageEndpoint::new("https://lab.example/api/", "abc123");
        assert_eq!(
            endpoint.url(42, ImageKind::Thumbnail),
            "https://lab.example/api/images/42/thumbnail?token=abc123"
        );
    }

    #[test]
    fn test_decode_image() {
        let handle = decode_image(&png_bytes(3, 2)).unwrap();
        assert_eq!((handle.width(), handle.height()), (3, 2));
        assert_eq!(&handle.data()[..4], &[10, 20, 30, 255]);
        assert!(matches!(decode_image(b"not an image"), Err(FetchError::Decode(_))));
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn test_threaded_fetcher_with_directory() {
        use crate::preload::types::{CancelToken, LoadTicket};

        let dir = std::env::temp_dir().join(format!("fovcanvas-fetch-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("b.png"), png_bytes(4, 4)).unwrap();
        std::fs::write(dir.join("a.png"), png_bytes(2, 2)).unwrap();
        std::fs::write(dir.join("notes.txt"), b"skip").unwrap();

        let source = DirectorySource::open(&dir).unwrap();
        let names: Vec<_> = source.list_descriptors().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["a.png", "b.png"]);

        let (tx, rx) = std::sync::mpsc::channel();
        let mut fetcher = ThreadedFetcher::spawn(source).unwrap();
        let cancelled = CancelToken::new();
        cancelled.cancel();
        fetcher.start(LoadTicket::new(0, ImageKind::Preview, cancelled, tx.clone()));
        fetcher.start(LoadTicket::new(1, ImageKind::Preview, CancelToken::new(), tx));
        drop(fetcher);

        let results: Vec<_> = rx.try_iter().collect();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 1);
        assert_eq!(results[0].result.as_ref().unwrap().width(), 4);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
