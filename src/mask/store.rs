//! Remote mask store interface and an in-memory implementation.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use super::error::MaskStoreError;
use super::types::{FovMaskState, Polygon, Ring, SaveMaskRequest};
use crate::model::ImageId;

/// Server-side mask persistence.
///
/// Futures are not required to be `Send`: the editor drives them on the UI
/// thread.
pub trait MaskStore {
    /// `GET mask(image_id)`
    fn get_mask(
        &self,
        image_id: ImageId,
    ) -> impl Future<Output = Result<FovMaskState, MaskStoreError>>;

    /// `DELETE mask(image_id)`
    fn delete_mask(&self, image_id: ImageId) -> impl Future<Output = Result<(), MaskStoreError>>;

    /// `PUT mask(image_id, request)`
    fn save_mask(
        &self,
        image_id: ImageId,
        request: &SaveMaskRequest,
    ) -> impl Future<Output = Result<(), MaskStoreError>>;
}

impl<S: MaskStore> MaskStore for &S {
    fn get_mask(
        &self,
        image_id: ImageId,
    ) -> impl Future<Output = Result<FovMaskState, MaskStoreError>> {
        (**self).get_mask(image_id)
    }

    fn delete_mask(&self, image_id: ImageId) -> impl Future<Output = Result<(), MaskStoreError>> {
        (**self).delete_mask(image_id)
    }

    fn save_mask(
        &self,
        image_id: ImageId,
        request: &SaveMaskRequest,
    ) -> impl Future<Output = Result<(), MaskStoreError>> {
        (**self).save_mask(image_id, request)
    }
}

/// Operation recorded by [`InMemoryMaskStore`].
#[derive(Debug, Clone, PartialEq)]
pub enum StoreCall {
    Get(ImageId),
    Delete(ImageId),
    Save(ImageId, SaveMaskRequest),
}

/// Mask store kept in memory.
///
/// Records every call and can be told to fail or to suspend upcoming calls,
/// which makes it usable as a local backend and as a test double.
#[derive(Debug, Default)]
pub struct InMemoryMaskStore {
    masks: RefCell<HashMap<ImageId, FovMaskState>>,
    calls: RefCell<Vec<StoreCall>>,
    failures: RefCell<Vec<MaskStoreError>>,
    save_failures: RefCell<Vec<MaskStoreError>>,
    suspend_next: Cell<bool>,
}

impl InMemoryMaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the stored state of an image directly.
    pub fn insert(&self, image_id: ImageId, state: FovMaskState) {
        self.masks.borrow_mut().insert(image_id, state);
    }

    /// Current state of an image without recording a call.
    pub fn peek(&self, image_id: ImageId) -> FovMaskState {
        self.masks
            .borrow()
            .get(&image_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Make the next call fail with `error`. Queued failures are used in order.
    pub fn fail_next(&self, error: MaskStoreError) {
        self.failures.borrow_mut().push(error);
    }

    /// Make the next `save_mask` call fail with `error`, after any queued
    /// call failure. Other calls are unaffected.
    pub fn fail_next_save(&self, error: MaskStoreError) {
        self.save_failures.borrow_mut().push(error);
    }

    /// Make the next call yield once before completing.
    pub fn suspend_next(&self) {
        self.suspend_next.set(true);
    }

    /// Calls received so far.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.borrow().clone()
    }

    async fn begin(&self, call: StoreCall) -> Result<(), MaskStoreError> {
        self.calls.borrow_mut().push(call);
        if self.suspend_next.replace(false) {
            YieldOnce::default().await;
        }
        let mut failures = self.failures.borrow_mut();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures.remove(0))
        }
    }
}

impl MaskStore for InMemoryMaskStore {
    async fn get_mask(&self, image_id: ImageId) -> Result<FovMaskState, MaskStoreError> {
        self.begin(StoreCall::Get(image_id)).await?;
        Ok(self.peek(image_id))
    }

    async fn delete_mask(&self, image_id: ImageId) -> Result<(), MaskStoreError> {
        self.begin(StoreCall::Delete(image_id)).await?;
        self.masks.borrow_mut().remove(&image_id);
        Ok(())
    }

    async fn save_mask(
        &self,
        image_id: ImageId,
        request: &SaveMaskRequest,
    ) -> Result<(), MaskStoreError> {
        self.begin(StoreCall::Save(image_id, request.clone())).await?;
        {
            let mut save_failures = self.save_failures.borrow_mut();
            if !save_failures.is_empty() {
                return Err(save_failures.remove(0));
            }
        }
        if request.polygons.first().is_none_or(|ring| ring.len() < 3) {
            return Err(MaskStoreError::Rejected {
                status: 422,
                message: "polygon needs at least three points".to_string(),
            });
        }
        let state = FovMaskState {
            has_mask: true,
            area_pixels: Some(polygon_area(&request.polygons).round() as u64),
            polygon: Some(Polygon::Multi(request.polygons.clone())),
            iou_score: Some(request.iou_score),
        };
        self.masks.borrow_mut().insert(image_id, state);
        Ok(())
    }
}

/// Outer ring area minus holes (shoelace formula).
fn polygon_area(rings: &[Ring]) -> f64 {
    let ring_area = |ring: &Ring| {
        let twice: f64 = ring
            .iter()
            .zip(ring.iter().cycle().skip(1))
            .map(|(a, b)| a[0] * b[1] - b[0] * a[1])
            .sum();
        twice.abs() / 2.0
    };
    let mut iter = rings.iter();
    let outer = iter.next().map(ring_area).unwrap_or(0.0);
    let holes: f64 = iter.map(ring_area).sum();
    (outer - holes).max(0.0)
}

/// Future that returns `Pending` once, waking itself, then completes.
#[derive(Debug, Default)]
struct YieldOnce {
    yielded: bool,
}

impl Future for YieldOnce {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }
}
