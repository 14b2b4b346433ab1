//! The state crossing the worker/consumer thread boundary.
//!
//! Exactly three things are shared: the latest frame, the latest
//! location, and the run/pause flags. Each lives behind its own lock,
//! held only long enough to copy or flip a value. Detector and tracker
//! state never appear here; the ingest worker owns those exclusively.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::pipeline::Frame;
use crate::tracking::Rect;

/// Guarded by the mutex the condition variable pairs with. The
/// generation counter distinguishes real publishes from spurious wakes.
#[derive(Default)]
struct LocationCell {
    point: Option<(f32, f32)>,
    generation: u64,
}

pub(crate) struct SharedState {
    running: AtomicBool,
    paused: AtomicBool,
    reset_request: AtomicBool,
    frame: Mutex<Option<Frame>>,
    location: Mutex<LocationCell>,
    location_cv: Condvar,
    pending_target: Mutex<Option<Rect>>,
}

// The cells hold plain copied data, so a peer that panicked mid-update
// cannot have left them torn; poisoning is ignored rather than spread.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            paused: AtomicBool::new(false),
            reset_request: AtomicBool::new(false),
            frame: Mutex::new(None),
            location: Mutex::new(LocationCell::default()),
            location_cv: Condvar::new(),
            pending_target: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn set_running(&self, value: bool) {
        self.running.store(value, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn set_paused(&self, value: bool) {
        self.paused.store(value, Ordering::Release);
    }

    pub fn request_reset(&self) {
        self.reset_request.store(true, Ordering::Release);
    }

    pub fn take_reset_request(&self) -> bool {
        self.reset_request.swap(false, Ordering::AcqRel)
    }

    pub fn set_pending_target(&self, bbox: Rect) {
        *lock(&self.pending_target) = Some(bbox);
    }

    pub fn take_pending_target(&self) -> Option<Rect> {
        lock(&self.pending_target).take()
    }

    pub fn publish_frame(&self, frame: Frame) {
        *lock(&self.frame) = Some(frame);
    }

    pub fn current_frame(&self) -> Option<Frame> {
        lock(&self.frame).clone()
    }

    pub fn clear_frame(&self) {
        *lock(&self.frame) = None;
    }

    /// Publish a cycle's location outcome. A fresh authoritative point
    /// bumps the generation and wakes waiters; `None` silently clears.
    /// Publishing while paused always clears, so a cycle that was already
    /// in flight when `pause` hit cannot resurrect a location.
    pub fn publish_location(&self, point: Option<(f32, f32)>) {
        let mut cell = lock(&self.location);
        match point {
            Some(p) if !self.is_paused() => {
                cell.point = Some(p);
                cell.generation = cell.generation.wrapping_add(1);
                self.location_cv.notify_all();
            }
            _ => cell.point = None,
        }
    }

    pub fn location(&self) -> Option<(f32, f32)> {
        lock(&self.location).point
    }

    /// Block until a new authoritative location is published, the runtime
    /// stops, or `timeout` elapses. Spurious wakes re-wait. Timeouts too
    /// large for `Instant` arithmetic saturate to a far-future deadline.
    pub fn wait_for_location(&self, timeout: Duration) -> Option<(f32, f32)> {
        const FAR_FUTURE: Duration = Duration::from_secs(365 * 24 * 3600);
        let now = Instant::now();
        let deadline = now.checked_add(timeout).unwrap_or(now + FAR_FUTURE);
        let mut cell = lock(&self.location);
        let start_generation = cell.generation;
        while cell.generation == start_generation {
            if !self.is_running() {
                return None;
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (guard, wait) = self
                .location_cv
                .wait_timeout(cell, deadline - now)
                .unwrap_or_else(PoisonError::into_inner);
            cell = guard;
            if wait.timed_out() && cell.generation == start_generation {
                return None;
            }
        }
        cell.point
    }

    /// Wake every waiter so it can observe a flag change.
    pub fn close(&self) {
        // Touch the lock first so a waiter between its generation check
        // and its wait cannot miss the wake.
        drop(lock(&self.location));
        self.location_cv.notify_all();
    }
}
