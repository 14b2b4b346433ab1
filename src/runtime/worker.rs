//! The ingest worker and its owning handle.
//!
//! One background thread owns the [`TrackingSystem`] outright and runs
//! the read/step/publish loop. The [`TrackingRuntime`] handle never
//! touches detector or tracker state directly; it communicates through
//! the flags and cells in [`SharedState`](super::shared::SharedState).

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{error, info, warn};

use crate::config::Profile;
use crate::error::{Error, Result};
use crate::pipeline::Frame;
use crate::tracking::{Rect, TrackingSystem};

use super::shared::SharedState;
use super::source::VideoSource;

const DEFAULT_PAUSE_IDLE: Duration = Duration::from_millis(100);
const STATS_EVERY: u64 = 100;

/// Handle to a running detect/track worker.
///
/// Cheap accessors return snapshots of the latest published frame and
/// location; control calls flip flags that the worker applies at its
/// next cycle. Dropping the handle stops the worker and joins it.
pub struct TrackingRuntime {
    shared: Arc<SharedState>,
    worker: Option<JoinHandle<Result<()>>>,
}

impl TrackingRuntime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Spawn the ingest worker over an existing system and source.
    pub fn spawn(system: TrackingSystem, source: impl VideoSource + 'static) -> Result<Self> {
        Self::spawn_boxed(system, Box::new(source), DEFAULT_PAUSE_IDLE)
    }

    fn spawn_boxed(
        system: TrackingSystem,
        source: Box<dyn VideoSource>,
        pause_idle: Duration,
    ) -> Result<Self> {
        let shared = Arc::new(SharedState::new());
        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name("camtrack-ingest".into())
            .spawn(move || ingest_loop(system, source, worker_shared, pause_idle))?;
        Ok(Self {
            shared,
            worker: Some(worker),
        })
    }

    /// Latest working-resolution frame, if any has been published yet.
    pub fn get_current_frame(&self) -> Option<Frame> {
        self.shared.current_frame()
    }

    /// Latest authoritative target center, or `None` when there is no
    /// verified target right now. Never a stale value.
    pub fn get_location(&self) -> Option<(f32, f32)> {
        self.shared.location()
    }

    /// Block until the next authoritative location is published. `None`
    /// on timeout or once the runtime has stopped.
    pub fn wait_for_location(&self, timeout: Duration) -> Option<(f32, f32)> {
        self.shared.wait_for_location(timeout)
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    pub fn is_paused(&self) -> bool {
        self.shared.is_paused()
    }

    /// Suspend automatic tracking. The published location clears at once
    /// and the worker discards all detect/track state, so resuming starts
    /// from a fresh baseline. Frames keep flowing for display.
    pub fn pause(&self) {
        self.shared.set_paused(true);
        self.shared.request_reset();
        self.shared.publish_location(None);
        info!("tracking paused");
    }

    /// Resume automatic tracking after [`pause`](Self::pause). The next
    /// ingested frame is treated as the first of a fresh session.
    pub fn resume(&self) {
        self.shared.set_paused(false);
        info!("tracking resumed");
    }

    /// Seed the tracker with an operator-chosen box, in working-resolution
    /// coordinates, bypassing motion detection. The worker applies the
    /// override on its next ingested frame and resumes tracking from it;
    /// a box the tracker rejects is logged and leaves the system paused.
    pub fn set_target(&self, bbox: Rect) {
        self.shared.set_paused(true);
        self.shared.publish_location(None);
        self.shared.set_pending_target(bbox);
        info!("target override requested: {bbox:?}");
    }

    /// Stop the worker and wait for it to exit, then clear the published
    /// outputs. Returns the worker's own outcome: `Ok` after a requested
    /// stop, [`Error::StreamEnded`] if the source ran dry first. Calling
    /// `stop` again after the worker is gone is a no-op `Ok`.
    pub fn stop(&mut self) -> Result<()> {
        self.shared.set_running(false);
        self.shared.close();
        let outcome = match self.worker.take() {
            None => Ok(()),
            Some(worker) => match worker.join() {
                Ok(result) => result,
                Err(_) => Err(Error::WorkerPanicked),
            },
        };
        // The worker has exited; nobody else writes these now.
        self.shared.publish_location(None);
        self.shared.clear_frame();
        self.shared.set_paused(false);
        outcome
    }
}

impl Drop for TrackingRuntime {
    fn drop(&mut self) {
        if self.worker.is_some() {
            match self.stop() {
                Ok(()) | Err(Error::StreamEnded) => {}
                Err(e) => warn!("ingest worker exit: {e}"),
            }
        }
    }
}

/// Assembles a [`TrackingRuntime`] from a [`Profile`] and a source.
pub struct RuntimeBuilder {
    profile: Profile,
    source: Option<Box<dyn VideoSource>>,
    pause_idle: Duration,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            profile: Profile::default(),
            source: None,
            pause_idle: DEFAULT_PAUSE_IDLE,
        }
    }

    pub fn profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    pub fn source(mut self, source: impl VideoSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// How long the worker sleeps between frames while paused.
    pub fn pause_idle(mut self, idle: Duration) -> Self {
        self.pause_idle = idle;
        self
    }

    pub fn spawn(self) -> Result<TrackingRuntime> {
        let source = self
            .source
            .ok_or_else(|| Error::InvalidInput("a video source is required".into()))?;
        let system = TrackingSystem::new(&self.profile);
        TrackingRuntime::spawn_boxed(system, source, self.pause_idle)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn ingest_loop(
    mut system: TrackingSystem,
    mut source: Box<dyn VideoSource>,
    shared: Arc<SharedState>,
    pause_idle: Duration,
) -> Result<()> {
    info!("ingest worker started");
    let mut frames: u64 = 0;

    while shared.is_running() {
        let Some(frame) = source.read() else {
            shared.set_running(false);
            shared.close();
            info!("video source ended after {frames} frames");
            return Err(Error::StreamEnded);
        };
        frames += 1;

        // A pause leaves a reset request behind; take it before the
        // override check so a stale request cannot wipe the freshly
        // seeded tracker on the following frame.
        let reset = shared.take_reset_request();
        if let Some(bbox) = shared.take_pending_target() {
            system.reset();
            match system.force_target(&frame, bbox) {
                Ok(()) => {
                    match system.preview(&frame) {
                        Ok(preview) => shared.publish_frame(preview),
                        Err(e) => warn!("preview failed: {e}"),
                    }
                    // Unpause before publishing, or the location would be
                    // treated as a paused-cycle straggler and dropped.
                    shared.set_paused(false);
                    shared.publish_location(Some(bbox.center()));
                    continue;
                }
                Err(e) => {
                    error!("target override rejected: {e}");
                }
            }
        } else if reset {
            system.reset();
        }

        if shared.is_paused() {
            match system.preview(&frame) {
                Ok(preview) => shared.publish_frame(preview),
                Err(e) => warn!("preview failed: {e}"),
            }
            thread::sleep(pause_idle);
            continue;
        }

        match system.step(&frame) {
            Ok(report) => {
                // Frame strictly before location, so a consumer woken by
                // the location signal sees a frame at least as new.
                shared.publish_frame(report.working);
                shared.publish_location(report.location);
                if report.cycle % STATS_EVERY == 0 {
                    let stats = system.tracker().stats();
                    info!(
                        "cycle {}: phase {:?}, tracker {:.1} fps, {} misses",
                        report.cycle,
                        report.phase,
                        stats.fps,
                        stats.failures
                    );
                }
            }
            Err(e) => error!("cycle failed: {e}"),
        }
    }

    info!("ingest worker stopped after {frames} frames");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::source::FrameSequence;
    use image::GrayImage;

    /// Produces blank frames forever, pacing the loop a little.
    struct EndlessBlank;

    impl VideoSource for EndlessBlank {
        fn read(&mut self) -> Option<Frame> {
            thread::sleep(Duration::from_millis(2));
            Some(Frame::Gray(GrayImage::new(64, 64)))
        }
    }

    fn small_profile() -> Profile {
        Profile {
            width: 64,
            height: 64,
            blur_sigma: 0.0,
            ..Profile::default()
        }
    }

    fn wait_until(mut done: impl FnMut() -> bool) -> bool {
        for _ in 0..200 {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_builder_requires_a_source() {
        let err = TrackingRuntime::builder().spawn().err().unwrap();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_stop_joins_cleanly_and_is_idempotent() {
        let mut runtime = TrackingRuntime::builder()
            .profile(small_profile())
            .source(EndlessBlank)
            .spawn()
            .unwrap();

        assert!(wait_until(|| runtime.get_current_frame().is_some()));
        assert!(runtime.stop().is_ok());
        assert!(!runtime.is_running());
        assert!(runtime.get_current_frame().is_none());
        assert!(runtime.stop().is_ok());
    }

    #[test]
    fn test_stream_end_surfaces_from_stop() {
        let frames = vec![Frame::Gray(GrayImage::new(64, 64)); 3];
        let mut runtime = TrackingRuntime::builder()
            .profile(small_profile())
            .source(FrameSequence::new(frames))
            .spawn()
            .unwrap();

        assert!(wait_until(|| !runtime.is_running()));
        assert!(matches!(runtime.stop(), Err(Error::StreamEnded)));
        assert!(runtime.stop().is_ok());
    }

    #[test]
    fn test_blank_stream_never_publishes_location() {
        let mut runtime = TrackingRuntime::builder()
            .profile(small_profile())
            .source(EndlessBlank)
            .spawn()
            .unwrap();

        assert!(runtime.wait_for_location(Duration::from_millis(100)).is_none());
        assert!(runtime.get_location().is_none());
        runtime.stop().unwrap();
    }

    #[test]
    fn test_pause_keeps_frames_flowing() {
        let mut runtime = TrackingRuntime::builder()
            .profile(small_profile())
            .source(EndlessBlank)
            .spawn()
            .unwrap();

        runtime.pause();
        assert!(runtime.is_paused());
        assert!(wait_until(|| runtime.get_current_frame().is_some()));
        assert!(runtime.get_location().is_none());
        runtime.resume();
        assert!(!runtime.is_paused());
        runtime.stop().unwrap();
    }
}
