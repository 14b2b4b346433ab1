//! Single-target detect/track coordination for a moving camera.
//!
//! A motion detector proposes a target, a template tracker follows it
//! frame to frame, and a coordinator arbitrates between the two with an
//! IoU drift check and a health counter. The winning target center is
//! published through a thread-safe runtime for gimbal consumers.
//!
//! ```no_run
//! use camtrack_rs::runtime::FrameSequence;
//! use camtrack_rs::{Profile, RuntimeBuilder};
//!
//! # fn main() -> camtrack_rs::Result<()> {
//! let frames = Vec::new(); // decoded elsewhere
//! let mut runtime = RuntimeBuilder::new()
//!     .profile(Profile::default())
//!     .source(FrameSequence::new(frames))
//!     .spawn()?;
//!
//! if let Some((x, y)) = runtime.wait_for_location(std::time::Duration::from_secs(1)) {
//!     println!("target at ({x:.0}, {y:.0})");
//! }
//! runtime.stop()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod runtime;
pub mod tracking;

pub use config::Profile;
pub use error::{Error, Result};
pub use pipeline::Frame;
pub use runtime::{RuntimeBuilder, TrackingRuntime};
pub use tracking::{CycleReport, Phase, Rect, TrackingSystem};
