//! Pre-processing stages applied to frames before prediction.
//!
//! Each stage is an independent type implementing [`Transform`]; a
//! pipeline is an ordered list of boxed stages folded over a frame.

use image::imageops::{self, FilterType};

use crate::error::{Error, Result};
use crate::pipeline::frame::Frame;

/// A single frame-to-frame processing stage.
///
/// # Example
///
/// ```ignore
/// use camtrack_rs::pipeline::{Blur, Grayscale, Resize, Transform, run_pipeline};
///
/// let stages: Vec<Box<dyn Transform>> = vec![
///     Box::new(Resize::new(640, 360)),
///     Box::new(Grayscale),
///     Box::new(Blur::new(1.5)),
/// ];
/// let filtered = run_pipeline(&stages, frame)?;
/// ```
pub trait Transform: Send {
    /// Consume a frame and produce the transformed frame.
    fn apply(&self, frame: Frame) -> Result<Frame>;
}

/// An ordered chain of processing stages.
pub type Pipeline = Vec<Box<dyn Transform>>;

/// Fold a frame through every stage of a pipeline in order.
pub fn run_pipeline(stages: &Pipeline, frame: Frame) -> Result<Frame> {
    let mut out = frame;
    for stage in stages {
        out = stage.apply(out)?;
    }
    Ok(out)
}

/// Scale a frame to a fixed working resolution.
#[derive(Debug, Clone, Copy)]
pub struct Resize {
    width: u32,
    height: u32,
}

impl Resize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Transform for Resize {
    fn apply(&self, frame: Frame) -> Result<Frame> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidInput(format!(
                "resize target {}x{} is empty",
                self.width, self.height
            )));
        }
        if frame.dimensions() == (self.width, self.height) {
            return Ok(frame);
        }
        Ok(match frame {
            Frame::Color(img) => {
                Frame::Color(imageops::resize(&img, self.width, self.height, FilterType::Triangle))
            }
            Frame::Gray(img) => {
                Frame::Gray(imageops::resize(&img, self.width, self.height, FilterType::Triangle))
            }
        })
    }
}

/// Collapse a color frame to a single channel. Single-channel frames pass
/// through unchanged.
#[derive(Debug, Clone, Copy)]
pub struct Grayscale;

impl Transform for Grayscale {
    fn apply(&self, frame: Frame) -> Result<Frame> {
        Ok(match frame {
            Frame::Color(img) => Frame::Gray(imageops::grayscale(&img)),
            gray @ Frame::Gray(_) => gray,
        })
    }
}

/// Gaussian smoothing to suppress sensor noise ahead of frame differencing.
#[derive(Debug, Clone, Copy)]
pub struct Blur {
    sigma: f32,
}

impl Blur {
    pub fn new(sigma: f32) -> Self {
        Self { sigma }
    }
}

impl Transform for Blur {
    fn apply(&self, frame: Frame) -> Result<Frame> {
        if self.sigma <= 0.0 {
            return Ok(frame);
        }
        Ok(match frame {
            Frame::Color(img) => Frame::Color(imageops::blur(&img, self.sigma)),
            Frame::Gray(img) => Frame::Gray(imageops::blur(&img, self.sigma)),
        })
    }
}
