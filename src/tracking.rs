mod backend;
mod motion;
mod object_tracker;
mod phase;
mod rect;
mod system;

pub use backend::{TemplateTracker, TrackerBackend, TrackerKind};
pub use motion::{DetectorConfig, MotionDetector};
pub use object_tracker::{BackendFactory, ObjectTracker, TrackerStats};
pub use phase::Phase;
pub use rect::Rect;
pub use system::{CycleReport, TrackingSystem};
