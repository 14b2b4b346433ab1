//! Thread-safe runtime around the tracking system.
//!
//! A single ingest worker owns the [`TrackingSystem`](crate::tracking::TrackingSystem)
//! and publishes frame and location snapshots; everything else in this
//! module either controls the worker or consumes those snapshots.

mod commands;
mod gimbal;
mod publisher;
mod shared;
mod source;
mod worker;

pub use commands::{Command, parse_command, run_command_listener};
pub use gimbal::{GimbalConfig, GimbalFilter};
pub use publisher::{FramePublisher, LocationNotifier, annotate_box, annotate_point};
pub use source::{ChannelSource, FrameSequence, VideoSource};
pub use worker::{RuntimeBuilder, TrackingRuntime};
