//! The detect/track coordination engine.

use log::{debug, info, trace};

use crate::config::Profile;
use crate::error::Result;
use crate::pipeline::{Blur, Frame, Grayscale, Pipeline, Resize, run_pipeline};
use crate::tracking::motion::MotionDetector;
use crate::tracking::object_tracker::ObjectTracker;
use crate::tracking::phase::Phase;
use crate::tracking::rect::Rect;

/// Outcome of one detect/track cycle.
#[derive(Debug)]
pub struct CycleReport {
    /// 1-based index of the cycle since construction or reset.
    pub cycle: u64,
    /// Phase the system is left in after this cycle.
    pub phase: Phase,
    /// The motion detector's proposal for this cycle, if any.
    pub detection: Option<Rect>,
    /// The tracker's box for this cycle, if it ran and succeeded.
    pub track: Option<Rect>,
    /// Authoritative target center for motor control. `None` whenever the
    /// cycle could not verify a fresh position; consumers must treat that
    /// as "no target", never fall back to a stale value.
    pub location: Option<(f32, f32)>,
    /// Working-resolution copy of the input frame, aligned with the
    /// coordinate space of `track` and `location`. Suitable for display.
    pub working: Frame,
}

/// Owns the motion detector, the object tracker and the two
/// pre-processing pipelines, and reconciles their outputs one frame at a
/// time.
///
/// Each [`step`](TrackingSystem::step) runs exactly one cycle of the
/// state machine:
///
/// * `Detecting`: a motion proposal seeds the tracker and the system
///   switches to `Tracking`, adopting the proposal as the location.
/// * `Tracking`: the tracker's box is checked against an independent
///   fresh detection via IoU. Disagreement costs one health point;
///   exhausted health or a tracker-reported loss falls back to
///   `Detecting`. A cycle without any detection keeps following the
///   target but withholds the location until the detector corroborates
///   it again.
pub struct TrackingSystem {
    detector: MotionDetector,
    tracker: ObjectTracker,
    pre_detect: Pipeline,
    pre_track: Pipeline,
    iou_threshold: f32,
    phase: Phase,
    cycles: u64,
}

impl TrackingSystem {
    pub fn new(profile: &Profile) -> Self {
        let tracker = ObjectTracker::new(profile.tracker, profile.search_margin, profile.max_health);
        Self::with_tracker(profile, tracker)
    }

    /// Build with a caller-supplied tracker, for capabilities other than
    /// the built-in [`TrackerKind`](crate::tracking::TrackerKind)s.
    pub fn with_tracker(profile: &Profile, tracker: ObjectTracker) -> Self {
        let pre_track: Pipeline = vec![Box::new(Resize::new(profile.width, profile.height))];
        let pre_detect: Pipeline = vec![
            Box::new(Resize::new(profile.width, profile.height)),
            Box::new(Grayscale),
            Box::new(Blur::new(profile.blur_sigma)),
        ];
        Self {
            detector: MotionDetector::new(profile.detector.clone()),
            tracker,
            pre_detect,
            pre_track,
            iou_threshold: profile.iou_threshold,
            phase: Phase::Detecting,
            cycles: 0,
        }
    }

    /// Run one full detect/track cycle on a raw frame.
    ///
    /// Errors abort only this cycle; the system remains usable for the
    /// next frame.
    pub fn step(&mut self, frame: &Frame) -> Result<CycleReport> {
        self.cycles += 1;
        let cycle = self.cycles;

        let working = run_pipeline(&self.pre_track, frame.clone())?;
        let filtered = run_pipeline(&self.pre_detect, frame.clone())?;

        // The detector runs every cycle, tracking or not: it keeps the
        // baseline fresh and supplies the drift reference.
        let detection = self.detector.predict(&filtered)?;

        let mut track = None;
        let mut location = None;

        match self.phase {
            Phase::Tracking => match self.tracker.update(&working)? {
                None => {
                    debug!("cycle {cycle}: tracker lost the target, back to detection");
                    self.phase = Phase::Detecting;
                }
                Some(track_box) => {
                    track = Some(track_box);
                    if let Some(detect_box) = detection {
                        let iou = track_box.iou(&detect_box);
                        trace!("cycle {cycle}: iou {iou:.3}");
                        if iou < self.iou_threshold {
                            self.tracker.decrease_health();
                            if self.tracker.health() == 0 {
                                debug!("cycle {cycle}: health exhausted, back to detection");
                                self.phase = Phase::Detecting;
                            } else {
                                location = Some(track_box.center());
                            }
                        } else {
                            location = Some(track_box.center());
                        }
                    }
                    // With no detection to correct against, keep
                    // following but withhold the location until the
                    // detector corroborates the target again.
                }
            },
            Phase::Detecting => {
                if let Some(detect_box) = detection {
                    self.tracker.initialize(&working, detect_box)?;
                    self.phase = Phase::Tracking;
                    location = Some(detect_box.center());
                    debug!("cycle {cycle}: target acquired at {detect_box:?}");
                }
            }
        }

        Ok(CycleReport {
            cycle,
            phase: self.phase,
            detection,
            track,
            location,
            working,
        })
    }

    /// Seed the tracker with an operator-chosen box on `frame`, bypassing
    /// detection. The box is in working-resolution coordinates.
    pub fn force_target(&mut self, frame: &Frame, bbox: Rect) -> Result<()> {
        let working = run_pipeline(&self.pre_track, frame.clone())?;
        self.tracker.initialize(&working, bbox)?;
        self.phase = Phase::Tracking;
        info!("manual target override: {bbox:?}");
        Ok(())
    }

    /// Return to the freshly-constructed state: no baseline, no tracker
    /// instance, full health, `Detecting`.
    pub fn reset(&mut self) {
        self.detector.reset();
        self.tracker.reset();
        self.phase = Phase::Detecting;
        self.cycles = 0;
    }

    /// Working-resolution copy of a raw frame, without running a cycle.
    /// Used to keep a display stream alive while the system is paused.
    pub fn preview(&self, frame: &Frame) -> Result<Frame> {
        run_pipeline(&self.pre_track, frame.clone())
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn tracker(&self) -> &ObjectTracker {
        &self.tracker
    }

    pub fn detector(&self) -> &MotionDetector {
        &self.detector
    }
}
