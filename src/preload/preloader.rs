//! Neighbor image preloading.
//!
//! Given the current navigation index, the preloader keeps the next and
//! previous `buffer_size` images loading in the background, forward
//! neighbors first. Every id is loaded once per cache lifetime. Failed loads
//! are forgotten so the next scheduling pass retries them, and ids that
//! disappear from the navigation list are evicted with their loads
//! cancelled.

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{self, Receiver, Sender};

use super::fetcher::ImageFetcher;
use super::types::{CancelToken, ImageDescriptor, ImageKind, LoadCompletion, LoadTicket};
use crate::constants::DEFAULT_PRELOAD_BUFFER_SIZE;
use crate::model::ImageId;
use crate::render::ImageHandle;

#[derive(Debug)]
enum CacheEntry {
    InFlight(CancelToken),
    Loaded(ImageHandle),
}

/// Prefetch cache keyed by image id.
pub struct Preloader<F> {
    fetcher: F,
    kind: ImageKind,
    buffer_size: usize,
    cache: HashMap<ImageId, CacheEntry>,
    completion_tx: Sender<LoadCompletion>,
    completion_rx: Receiver<LoadCompletion>,
    torn_down: bool,
}

impl<F: ImageFetcher> Preloader<F> {
    pub fn new(fetcher: F) -> Self {
        Self::with_options(fetcher, ImageKind::default(), DEFAULT_PRELOAD_BUFFER_SIZE)
    }

    pub fn with_options(fetcher: F, kind: ImageKind, buffer_size: usize) -> Self {
        let (completion_tx, completion_rx) = mpsc::channel();
        Self {
            fetcher,
            kind,
            buffer_size,
            cache: HashMap::new(),
            completion_tx,
            completion_rx,
            torn_down: false,
        }
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Indices to preload around `current_index`: forward neighbors first,
    /// then backward, nearest first. No wraparound.
    pub fn neighbor_indices(&self, current_index: usize, len: usize) -> Vec<usize> {
        let forward = (1..=self.buffer_size)
            .map(|i| current_index + i)
            .take_while(|&i| i < len);
        let backward = (1..=self.buffer_size).map_while(|i| current_index.checked_sub(i));
        forward.chain(backward).collect()
    }

    /// Sync the cache with `images` and start loads for the neighbors of
    /// `current_index`. Returns the ids whose loads were started.
    pub fn schedule(&mut self, current_index: usize, images: &[ImageDescriptor]) -> Vec<ImageId> {
        if self.torn_down {
            return Vec::new();
        }
        self.retain_listed(images);
        if current_index >= images.len() {
            return Vec::new();
        }

        self.neighbor_indices(current_index, images.len())
            .into_iter()
            .filter_map(|i| {
                let id = images[i].id;
                self.load(id).then_some(id)
            })
            .collect()
    }

    /// Start loading `id` unless it is cached or already loading.
    pub fn load(&mut self, id: ImageId) -> bool {
        if self.torn_down || self.cache.contains_key(&id) {
            return false;
        }
        log::debug!("Preloading image {} ({})", id, self.kind.as_str());
        let token = CancelToken::new();
        self.cache.insert(id, CacheEntry::InFlight(token.clone()));
        self.fetcher
            .start(LoadTicket::new(id, self.kind, token, self.completion_tx.clone()));
        true
    }

    /// Evict every id that is not in `images`, cancelling its load.
    fn retain_listed(&mut self, images: &[ImageDescriptor]) {
        let listed: HashSet<ImageId> = images.iter().map(|d| d.id).collect();
        self.cache.retain(|id, entry| {
            if listed.contains(id) {
                return true;
            }
            if let CacheEntry::InFlight(token) = entry {
                token.cancel();
                log::debug!("Cancelled preload of image {}", id);
            } else {
                log::debug!("Evicted preloaded image {}", id);
            }
            false
        });
    }

    /// Apply finished loads. Returns the completions that belong to live
    /// cache entries, in arrival order.
    pub fn poll(&mut self) -> Vec<LoadCompletion> {
        if self.torn_down {
            return Vec::new();
        }
        let mut accepted = Vec::new();
        while let Ok(completion) = self.completion_rx.try_recv() {
            let live = matches!(
                self.cache.get(&completion.id),
                Some(CacheEntry::InFlight(token))
                    if token.same_as(&completion.token) && !token.is_cancelled()
            );
            if !live {
                log::trace!("Ignoring stale load of image {}", completion.id);
                continue;
            }
            match &completion.result {
                Ok(handle) => {
                    log::debug!(
                        "Preloaded image {} ({}x{})",
                        completion.id,
                        handle.width(),
                        handle.height()
                    );
                    self.cache
                        .insert(completion.id, CacheEntry::Loaded(handle.clone()));
                }
                Err(e) => {
                    log::warn!("Failed to preload image {}: {}", completion.id, e);
                    self.cache.remove(&completion.id);
                }
            }
            accepted.push(completion);
        }
        accepted
    }

    /// Loaded image, if available.
    pub fn cached(&self, id: ImageId) -> Option<ImageHandle> {
        match self.cache.get(&id) {
            Some(CacheEntry::Loaded(handle)) => Some(handle.clone()),
            _ => None,
        }
    }

    pub fn contains(&self, id: ImageId) -> bool {
        self.cache.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Cancel every load and empty the cache. Later calls do nothing.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        for entry in self.cache.values() {
            if let CacheEntry::InFlight(token) = entry {
                token.cancel();
            }
        }
        let count = self.cache.len();
        self.cache.clear();
        while self.completion_rx.try_recv().is_ok() {}
        log::info!("Preloader torn down ({} entries released)", count);
    }
}

impl<F> Drop for Preloader<F> {
    fn drop(&mut self) {
        for entry in self.cache.values() {
            if let CacheEntry::InFlight(token) = entry {
                token.cancel();
            }
        }
    }
}
