//! Motion detection by differencing consecutive frames.

use image::{GrayImage, Luma};
use imageproc::contrast::{ThresholdType, threshold};
use imageproc::distance_transform::Norm;
use imageproc::map::map_colors2;
use imageproc::morphology::{dilate, open};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pipeline::{Frame, find_regions, foreground_area};
use crate::tracking::rect::Rect;

/// Tuning values for [`MotionDetector`].
///
/// Area bounds are absolute pixel counts in the working resolution;
/// profiles that change the resolution are expected to supply their own
/// bounds rather than rely on the defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Absolute pixel differences strictly above this count as motion.
    pub pixel_threshold: u8,
    /// Radius of the square structuring element used for morphological
    /// open and the following dilate.
    pub morph_radius: u8,
    /// A detection's bounding-box area must lie strictly above this.
    pub min_area: f32,
    /// A detection's bounding-box area must lie strictly below this.
    pub max_area: f32,
    /// Foreground pixel count at which the whole frame is treated as
    /// moving (camera pan); no detection is reported for such frames.
    pub global_motion_limit: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        // Tuned for the default 640x360 working resolution.
        Self {
            pixel_threshold: 10,
            morph_radius: 2,
            min_area: 150.0,
            max_area: 23_040.0,
            global_motion_limit: 172_800,
        }
    }
}

/// Proposes a single candidate bounding box of a moving region by
/// comparing each frame against the previously seen one.
///
/// The detector only accepts single-channel frames; feed it the
/// pre-detector pipeline output, not raw video.
pub struct MotionDetector {
    config: DetectorConfig,
    baseline: Option<GrayImage>,
    last_mask: Option<GrayImage>,
}

impl MotionDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            baseline: None,
            last_mask: None,
        }
    }

    /// Compare `frame` against the stored baseline and propose the most
    /// prominent moving region, if any.
    ///
    /// The frame always becomes the new baseline, whatever the outcome,
    /// so a single bad frame costs one cycle and nothing more. The first
    /// call after construction or [`reset`](Self::reset) never detects.
    pub fn predict(&mut self, frame: &Frame) -> Result<Option<Rect>> {
        let gray = frame.as_gray().ok_or_else(|| {
            Error::InvalidInput(format!(
                "motion detector expects a single-channel frame, got {} channels",
                frame.channels()
            ))
        })?;

        let Some(prev) = self.baseline.replace(gray.clone()) else {
            return Ok(None);
        };

        if prev.dimensions() != gray.dimensions() {
            return Err(Error::InvalidInput(format!(
                "frame size changed from {:?} to {:?}",
                prev.dimensions(),
                gray.dimensions()
            )));
        }

        let delta = map_colors2(&prev, gray, |p, q| Luma([p.0[0].abs_diff(q.0[0])]));
        let mask = threshold(&delta, self.config.pixel_threshold, ThresholdType::Binary);
        let mask = open(&mask, Norm::LInf, self.config.morph_radius);
        let mask = dilate(&mask, Norm::LInf, self.config.morph_radius);

        let moving = foreground_area(&mask);
        let regions = find_regions(&mask);
        self.last_mask = Some(mask);

        if moving >= self.config.global_motion_limit {
            debug!("global motion: {moving} foreground pixels, skipping detection");
            return Ok(None);
        }

        let mut best: Option<Rect> = None;
        for region in regions {
            if !region.is_valid() {
                continue;
            }
            let area = region.area();
            if area <= self.config.min_area || area >= self.config.max_area {
                continue;
            }
            if best.is_none_or(|b| area > b.area()) {
                best = Some(region);
            }
        }
        Ok(best)
    }

    /// Forget the baseline; the next `predict` behaves like a first call.
    pub fn reset(&mut self) {
        self.baseline = None;
        self.last_mask = None;
    }

    /// The post-morphology binary mask of the most recent comparison,
    /// kept for diagnostic display.
    pub fn last_mask(&self) -> Option<&GrayImage> {
        self.last_mask.as_ref()
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn canvas(value: u8) -> GrayImage {
        GrayImage::from_pixel(200, 200, Luma([value]))
    }

    fn fill(img: &mut GrayImage, x: u32, y: u32, w: u32, h: u32, value: u8) {
        for py in y..y + h {
            for px in x..x + w {
                img.put_pixel(px, py, Luma([value]));
            }
        }
    }

    fn test_config() -> DetectorConfig {
        DetectorConfig {
            pixel_threshold: 10,
            morph_radius: 2,
            min_area: 50.0,
            max_area: 20_000.0,
            global_motion_limit: 30_000,
        }
    }

    #[test]
    fn test_first_call_never_detects() {
        let mut det = MotionDetector::new(test_config());
        let mut frame = canvas(0);
        fill(&mut frame, 50, 50, 30, 30, 255);
        assert!(det.predict(&Frame::from(frame)).unwrap().is_none());
    }

    #[test]
    fn test_color_input_is_rejected() {
        let mut det = MotionDetector::new(test_config());
        let err = det.predict(&Frame::from(RgbImage::new(200, 200))).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_identical_frames_do_not_detect() {
        let mut det = MotionDetector::new(test_config());
        let mut frame = canvas(0);
        fill(&mut frame, 30, 30, 40, 40, 200);
        det.predict(&Frame::from(frame.clone())).unwrap();
        assert!(det.predict(&Frame::from(frame)).unwrap().is_none());
    }

    #[test]
    fn test_new_region_is_detected_with_area_in_bounds() {
        let config = test_config();
        let mut det = MotionDetector::new(config.clone());
        det.predict(&Frame::from(canvas(0))).unwrap();

        let mut moved = canvas(0);
        fill(&mut moved, 60, 70, 20, 20, 255);
        let bbox = det.predict(&Frame::from(moved)).unwrap().unwrap();

        assert!(bbox.area() > config.min_area);
        assert!(bbox.area() < config.max_area);
        // Dilation grows the box a little but the center stays put.
        let (cx, cy) = bbox.center();
        assert!((cx - 70.0).abs() <= 1.0);
        assert!((cy - 80.0).abs() <= 1.0);
        assert!(det.last_mask().is_some());
    }

    #[test]
    fn test_regions_outside_area_bounds_are_rejected() {
        let mut small_cfg = test_config();
        small_cfg.min_area = 1_000.0;
        let mut det = MotionDetector::new(small_cfg);
        det.predict(&Frame::from(canvas(0))).unwrap();
        let mut moved = canvas(0);
        fill(&mut moved, 60, 60, 20, 20, 255);
        // 24x24 after dilation, well under the raised minimum.
        assert!(det.predict(&Frame::from(moved)).unwrap().is_none());

        let mut large_cfg = test_config();
        large_cfg.max_area = 500.0;
        let mut det = MotionDetector::new(large_cfg);
        det.predict(&Frame::from(canvas(0))).unwrap();
        let mut moved = canvas(0);
        fill(&mut moved, 40, 40, 30, 30, 255);
        assert!(det.predict(&Frame::from(moved)).unwrap().is_none());
    }

    #[test]
    fn test_largest_region_wins() {
        let mut det = MotionDetector::new(test_config());
        det.predict(&Frame::from(canvas(0))).unwrap();

        let mut moved = canvas(0);
        fill(&mut moved, 20, 20, 10, 10, 255);
        fill(&mut moved, 120, 120, 16, 16, 255);
        let bbox = det.predict(&Frame::from(moved)).unwrap().unwrap();
        let (cx, cy) = bbox.center();
        assert!((cx - 128.0).abs() <= 1.0);
        assert!((cy - 128.0).abs() <= 1.0);
    }

    #[test]
    fn test_whole_frame_motion_is_ignored() {
        let mut cfg = test_config();
        cfg.max_area = 45_000.0;
        let mut det = MotionDetector::new(cfg);
        det.predict(&Frame::from(canvas(0))).unwrap();
        // Every pixel flips; only the global-motion guard can reject this.
        assert!(det.predict(&Frame::from(canvas(255))).unwrap().is_none());
    }

    #[test]
    fn test_dimension_change_errors_once_then_recovers() {
        let mut det = MotionDetector::new(test_config());
        det.predict(&Frame::from(GrayImage::new(200, 200))).unwrap();

        let err = det.predict(&Frame::from(GrayImage::new(100, 100))).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        // The mismatched frame became the new baseline.
        assert!(det.predict(&Frame::from(GrayImage::new(100, 100))).unwrap().is_none());
        let mut moved = GrayImage::new(100, 100);
        fill(&mut moved, 30, 30, 20, 20, 255);
        assert!(det.predict(&Frame::from(moved)).unwrap().is_some());
    }

    #[test]
    fn test_reset_clears_baseline() {
        let mut det = MotionDetector::new(test_config());
        det.predict(&Frame::from(canvas(0))).unwrap();
        det.reset();
        assert!(det.last_mask().is_none());

        let mut moved = canvas(0);
        fill(&mut moved, 60, 60, 20, 20, 255);
        // First frame after reset only seeds the baseline.
        assert!(det.predict(&Frame::from(moved)).unwrap().is_none());
    }
}
