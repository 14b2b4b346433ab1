//! Construction-time configuration for a tracking session.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::runtime::GimbalConfig;
use crate::tracking::{DetectorConfig, TrackerKind};

/// Everything a tracking session needs to know up front.
///
/// All values are read once at construction; nothing here is consulted
/// again while the ingest loop runs. Fields left out of a profile file
/// fall back to the defaults below.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// Working resolution every frame is scaled to before processing.
    pub width: u32,
    pub height: u32,
    /// Gaussian sigma applied ahead of frame differencing. Zero disables
    /// the blur stage.
    pub blur_sigma: f32,
    /// Which tracking capability to build.
    pub tracker: TrackerKind,
    /// How far, in pixels, the target may move between frames.
    pub search_margin: u32,
    /// Detector/tracker agreement below this IoU costs a health point.
    pub iou_threshold: f32,
    /// Consecutive disagreements tolerated before forcing re-detection.
    pub max_health: u32,
    pub detector: DetectorConfig,
    pub gimbal: GimbalConfig,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            blur_sigma: 1.5,
            tracker: TrackerKind::default(),
            search_margin: 32,
            iou_threshold: 0.4,
            max_health: 10,
            detector: DetectorConfig::default(),
            gimbal: GimbalConfig::default(),
        }
    }
}

impl Profile {
    /// Tuning for targets roughly 100 m out: less drift tolerance than
    /// the defaults.
    pub fn distance_100() -> Self {
        Self {
            max_health: 5,
            ..Self::default()
        }
    }

    /// Load a profile from a JSON file. Missing fields take defaults.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_is_consistent() {
        let profile = Profile::default();
        assert_eq!((profile.width, profile.height), (640, 360));
        // Area bounds assume the default working resolution.
        assert_eq!(profile.detector.max_area, (640 * 360) as f32 / 10.0);
        assert!(profile.iou_threshold > 0.0 && profile.iou_threshold < 1.0);
    }

    #[test]
    fn test_distance_profile_overrides() {
        let profile = Profile::distance_100();
        assert_eq!(profile.max_health, 5);
        // Only the health budget differs from the defaults.
        assert_eq!(profile.gimbal.dead_zone_x, GimbalConfig::default().dead_zone_x);
        assert_eq!(profile.iou_threshold, Profile::default().iou_threshold);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let profile: Profile =
            serde_json::from_str(r#"{"max_health": 4, "tracker": "normed_correlation"}"#).unwrap();
        assert_eq!(profile.max_health, 4);
        assert_eq!(profile.tracker, TrackerKind::NormedCorrelation);
        assert_eq!(profile.width, 640);
        assert_eq!(profile.detector.pixel_threshold, 10);
    }

    #[test]
    fn test_profile_round_trips_through_json() {
        let profile = Profile::distance_100();
        let json = serde_json::to_string(&profile).unwrap();
        let back: Profile = serde_json::from_str(&json).unwrap();
        assert_eq!(back.max_health, profile.max_health);
        assert_eq!(back.gimbal.dead_zone_y, profile.gimbal.dead_zone_y);
    }
}
