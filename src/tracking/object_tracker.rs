//! Health and performance accounting around a tracking backend.

use std::time::Instant;

use crate::error::{Error, Result};
use crate::pipeline::Frame;
use crate::tracking::backend::{TrackerBackend, TrackerKind};
use crate::tracking::rect::Rect;

/// Produces a fresh backend instance for every (re)initialization.
pub type BackendFactory = Box<dyn Fn() -> Box<dyn TrackerBackend> + Send>;

/// Running performance counters for a tracker instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackerStats {
    /// Incremental mean of per-update throughput, in frames per second.
    pub fps: f32,
    /// Updates performed since the last initialization.
    pub frames: u64,
    /// Updates in which the backend reported the target lost.
    pub failures: u64,
}

/// Wrapper around an opaque tracking capability.
///
/// Adds the two things the raw capability lacks: a health counter the
/// coordinator uses for drift hysteresis, and throughput statistics. The
/// backend instance is never reused across initializations; each
/// `initialize` builds a new one from the factory.
pub struct ObjectTracker {
    factory: BackendFactory,
    backend: Option<Box<dyn TrackerBackend>>,
    max_health: u32,
    health: u32,
    stats: TrackerStats,
}

impl ObjectTracker {
    pub fn new(kind: TrackerKind, search_margin: u32, max_health: u32) -> Self {
        Self::with_factory(Box::new(move || kind.build(search_margin)), max_health)
    }

    /// Build with a custom backend factory instead of a [`TrackerKind`].
    pub fn with_factory(factory: BackendFactory, max_health: u32) -> Self {
        Self {
            factory,
            backend: None,
            max_health,
            health: max_health,
            stats: TrackerStats::default(),
        }
    }

    /// Discard any prior backend, build a fresh one and seed it with the
    /// target. Restores health to maximum and zeroes the statistics.
    pub fn initialize(&mut self, frame: &Frame, bbox: Rect) -> Result<()> {
        self.backend = None;
        let mut backend = (self.factory)();
        backend.init(frame, bbox)?;
        self.backend = Some(backend);
        self.health = self.max_health;
        self.stats = TrackerStats::default();
        Ok(())
    }

    /// Ask the backend for the target's position in `frame`.
    ///
    /// `Ok(None)` means the backend lost the target; interpreting that is
    /// the coordinator's job. Erring here only happens when no
    /// initialization has been performed.
    pub fn update(&mut self, frame: &Frame) -> Result<Option<Rect>> {
        let backend = self.backend.as_mut().ok_or(Error::TrackerNotInitialized)?;

        let start = Instant::now();
        let result = backend.update(frame);
        let elapsed = start.elapsed().as_secs_f32();

        self.stats.frames += 1;
        let sample = 1.0 / elapsed.max(1e-6);
        self.stats.fps += (sample - self.stats.fps) / self.stats.frames as f32;
        if result.is_none() {
            self.stats.failures += 1;
        }
        Ok(result)
    }

    /// Knock one point off the health counter, saturating at zero.
    pub fn decrease_health(&mut self) {
        self.health = self.health.saturating_sub(1);
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn is_initialized(&self) -> bool {
        self.backend.is_some()
    }

    pub fn stats(&self) -> TrackerStats {
        self.stats
    }

    /// Drop the backend and restore the counters, as if freshly built.
    pub fn reset(&mut self) {
        self.backend = None;
        self.health = self.max_health;
        self.stats = TrackerStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn textured_frame(x: u32, y: u32) -> Frame {
        let mut img = GrayImage::new(120, 120);
        for dy in 0..30 {
            for dx in 0..30 {
                let v = (40 + (dx * 5 + dy * 3) % 180) as u8;
                img.put_pixel(x + dx, y + dy, Luma([v]));
            }
        }
        Frame::from(img)
    }

    #[test]
    fn test_update_before_initialize_errors() {
        let mut tracker = ObjectTracker::new(TrackerKind::SquaredDiff, 16, 5);
        let err = tracker.update(&textured_frame(10, 10)).unwrap_err();
        assert!(matches!(err, Error::TrackerNotInitialized));
    }

    #[test]
    fn test_initialize_restores_health_and_stats() {
        let mut tracker = ObjectTracker::new(TrackerKind::SquaredDiff, 16, 5);
        let frame = textured_frame(20, 20);
        tracker.initialize(&frame, Rect::new(20.0, 20.0, 30.0, 30.0)).unwrap();

        tracker.decrease_health();
        tracker.decrease_health();
        tracker.update(&frame).unwrap();
        assert_eq!(tracker.health(), 3);
        assert_eq!(tracker.stats().frames, 1);

        tracker.initialize(&frame, Rect::new(20.0, 20.0, 30.0, 30.0)).unwrap();
        assert_eq!(tracker.health(), 5);
        assert_eq!(tracker.stats().frames, 0);
    }

    #[test]
    fn test_health_saturates_at_zero() {
        let mut tracker = ObjectTracker::new(TrackerKind::SquaredDiff, 16, 2);
        tracker.decrease_health();
        tracker.decrease_health();
        tracker.decrease_health();
        assert_eq!(tracker.health(), 0);
    }

    #[test]
    fn test_failed_initialize_leaves_tracker_uninitialized() {
        let mut tracker = ObjectTracker::new(TrackerKind::SquaredDiff, 16, 5);
        let frame = textured_frame(20, 20);
        tracker.initialize(&frame, Rect::new(20.0, 20.0, 30.0, 30.0)).unwrap();

        let err = tracker
            .initialize(&frame, Rect::new(500.0, 500.0, 30.0, 30.0))
            .unwrap_err();
        assert!(matches!(err, Error::TrackerInit(_)));
        assert!(!tracker.is_initialized());
        assert!(matches!(tracker.update(&frame), Err(Error::TrackerNotInitialized)));
    }

    #[test]
    fn test_stats_track_updates_and_failures() {
        let mut tracker = ObjectTracker::new(TrackerKind::SquaredDiff, 16, 5);
        let frame = textured_frame(40, 40);
        tracker.initialize(&frame, Rect::new(40.0, 40.0, 30.0, 30.0)).unwrap();

        assert!(tracker.update(&frame).unwrap().is_some());
        // Target gone entirely; the backend must report a loss.
        assert!(tracker.update(&Frame::from(GrayImage::new(120, 120))).unwrap().is_none());

        let stats = tracker.stats();
        assert_eq!(stats.frames, 2);
        assert_eq!(stats.failures, 1);
        assert!(stats.fps > 0.0);
    }
}
