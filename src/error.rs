//! Error types shared across the crate.

use thiserror::Error;

/// Errors produced by the detection, tracking and runtime layers.
#[derive(Debug, Error)]
pub enum Error {
    /// A frame did not satisfy a stage's input contract, for example a
    /// color frame handed to the grayscale-only motion detector or a
    /// mid-stream resolution change.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The object tracker was asked for a prediction before `initialize`.
    #[error("tracker update called before initialization")]
    TrackerNotInitialized,

    /// The underlying tracking capability could not be constructed or
    /// seeded with the given frame and box.
    #[error("tracker initialization failed: {0}")]
    TrackerInit(String),

    /// The video source is exhausted. Terminal for the ingest loop.
    #[error("video stream ended")]
    StreamEnded,

    /// An operator command that matches no known form. Never fatal.
    #[error("unknown command: {0:?}")]
    UnknownCommand(String),

    /// The ingest worker terminated by panicking.
    #[error("ingest worker panicked")]
    WorkerPanicked,

    #[error("profile error: {0}")]
    Profile(#[from] serde_json::Error),

    #[error("image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
