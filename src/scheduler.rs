//! Redraw scheduling with dirty flags.
//!
//! State changes only mark layers dirty; the host calls
//! [`FrameScheduler::begin_frame`] once per animation frame and redraws what
//! the returned [`FramePlan`] asks for. Any number of marks between two
//! frames collapse into one redraw.

use std::time::Duration;
use web_time::Instant;

use crate::render::SurfaceLayout;

/// Which layers need work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirtyFlags {
    pub image: bool,
    pub overlay: bool,
    pub layout: bool,
}

impl DirtyFlags {
    pub fn any(&self) -> bool {
        self.image || self.overlay || self.layout
    }
}

/// Work for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramePlan {
    pub redraw_image: bool,
    pub redraw_overlay: bool,
    /// New surface layout to apply before drawing
    pub resize: Option<SurfaceLayout>,
}

/// Coalesces redraw requests into frames.
#[derive(Debug)]
pub struct FrameScheduler {
    dirty: DirtyFlags,
    pending_layout: Option<SurfaceLayout>,
    /// Resize requests settle for this long before they are applied
    resize_debounce: Duration,
    last_resize: Option<Instant>,
    frame_count: u64,
    marks_since_frame: u32,
}

impl FrameScheduler {
    pub fn new() -> Self {
        Self {
            dirty: DirtyFlags::default(),
            pending_layout: None,
            resize_debounce: Duration::ZERO,
            last_resize: None,
            frame_count: 0,
            marks_since_frame: 0,
        }
    }

    /// Set the resize debounce delay.
    pub fn with_resize_debounce(mut self, delay: Duration) -> Self {
        self.resize_debounce = delay;
        self
    }

    pub fn mark_image(&mut self) {
        self.dirty.image = true;
        self.marks_since_frame += 1;
    }

    pub fn mark_overlay(&mut self) {
        self.dirty.overlay = true;
        self.marks_since_frame += 1;
    }

    /// Viewport changes move both layers.
    pub fn mark_all(&mut self) {
        self.dirty.image = true;
        self.dirty.overlay = true;
        self.marks_since_frame += 1;
    }

    /// Record a container resize. Only the latest layout is kept.
    pub fn request_resize(&mut self, layout: SurfaceLayout) {
        if self.pending_layout == Some(layout) {
            return;
        }
        log::trace!("Resize requested: {:?}", layout);
        self.pending_layout = Some(layout);
        self.last_resize = Some(Instant::now());
        self.dirty.layout = true;
        self.marks_since_frame += 1;
    }

    pub fn dirty(&self) -> DirtyFlags {
        self.dirty
    }

    pub fn needs_frame(&self) -> bool {
        self.dirty.any()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Take the pending work. Returns `None` when nothing is dirty.
    pub fn begin_frame(&mut self) -> Option<FramePlan> {
        if !self.needs_frame() {
            return None;
        }

        let resize_ready = self
            .last_resize
            .is_none_or(|t| t.elapsed() >= self.resize_debounce);
        let resize = if self.dirty.layout && resize_ready {
            self.dirty.layout = false;
            self.last_resize = None;
            self.pending_layout.take()
        } else {
            None
        };

        let plan = FramePlan {
            redraw_image: self.dirty.image || resize.is_some(),
            redraw_overlay: self.dirty.overlay || resize.is_some(),
            resize,
        };
        if !plan.redraw_image && !plan.redraw_overlay {
            return None;
        }

        log::trace!(
            "Frame {}: image={} overlay={} resize={} ({} marks)",
            self.frame_count,
            plan.redraw_image,
            plan.redraw_overlay,
            plan.resize.is_some(),
            self.marks_since_frame
        );
        self.dirty.image = false;
        self.dirty.overlay = false;
        self.marks_since_frame = 0;
        self.frame_count += 1;
        Some(plan)
    }
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new()
    }
}
