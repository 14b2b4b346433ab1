//! Frame value types and the mechanical image operations consumed by the
//! coordination engine: pre-processing stages and connected-region
//! extraction.

mod frame;
mod regions;
mod transform;

pub use frame::Frame;
pub use regions::{find_regions, foreground_area};
pub use transform::{Blur, Grayscale, Pipeline, Resize, Transform, run_pipeline};
