//! Consumers for the worker's published outputs: JPEG frame streaming
//! and gimbal correction lines.

use std::io::Write;
use std::time::Duration;

use image::codecs::jpeg::JpegEncoder;
use image::{Luma, Rgb};
use imageproc::drawing::{draw_cross_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect as PixelRect;
use log::debug;

use crate::error::Result;
use crate::pipeline::Frame;
use crate::tracking::Rect;

use super::gimbal::GimbalFilter;
use super::worker::TrackingRuntime;

/// Draw a hollow target box onto a display frame. Boxes that fall
/// entirely outside the frame are ignored.
pub fn annotate_box(frame: &mut Frame, bbox: Rect) {
    let Some((x, y, w, h)) = bbox.pixel_bounds(frame.width(), frame.height()) else {
        return;
    };
    let rect = PixelRect::at(x as i32, y as i32).of_size(w, h);
    match frame {
        Frame::Color(img) => draw_hollow_rect_mut(img, rect, Rgb([0, 255, 0])),
        Frame::Gray(img) => draw_hollow_rect_mut(img, rect, Luma([255])),
    }
}

/// Mark the target center with a small cross.
pub fn annotate_point(frame: &mut Frame, point: (f32, f32)) {
    let (x, y) = (point.0.round() as i32, point.1.round() as i32);
    match frame {
        Frame::Color(img) => draw_cross_mut(img, Rgb([0, 255, 0]), x, y),
        Frame::Gray(img) => draw_cross_mut(img, Luma([255]), x, y),
    }
}

/// JPEG-encodes published frames for a display consumer.
pub struct FramePublisher {
    quality: u8,
}

impl FramePublisher {
    pub fn new(quality: u8) -> Self {
        Self { quality }
    }

    /// Encode one frame into `writer`.
    pub fn publish<W: Write>(&self, frame: &Frame, writer: &mut W) -> Result<()> {
        let mut encoder = JpegEncoder::new_with_quality(&mut *writer, self.quality);
        match frame {
            Frame::Color(img) => encoder.encode_image(img)?,
            Frame::Gray(img) => encoder.encode_image(img)?,
        }
        Ok(())
    }

    /// Forward the latest frame to `writer` every `interval` until the
    /// runtime stops. Cycles without a published frame yet are skipped.
    pub fn run<W: Write>(
        &self,
        runtime: &TrackingRuntime,
        writer: &mut W,
        interval: Duration,
    ) -> Result<()> {
        while runtime.is_running() {
            if let Some(mut frame) = runtime.get_current_frame() {
                if let Some(point) = runtime.get_location() {
                    annotate_point(&mut frame, point);
                }
                self.publish(&frame, writer)?;
            }
            std::thread::sleep(interval);
        }
        Ok(())
    }
}

impl Default for FramePublisher {
    fn default() -> Self {
        Self::new(80)
    }
}

/// Blocks on the location signal and writes one `dx,dy` correction line
/// per authoritative location, smoothed and dead-zoned by the filter.
pub struct LocationNotifier {
    filter: GimbalFilter,
    wait_timeout: Duration,
}

impl LocationNotifier {
    pub fn new(filter: GimbalFilter) -> Self {
        Self {
            filter,
            wait_timeout: Duration::from_millis(500),
        }
    }

    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    pub fn run<W: Write>(&mut self, runtime: &TrackingRuntime, writer: &mut W) -> Result<()> {
        while runtime.is_running() {
            let Some(point) = runtime.wait_for_location(self.wait_timeout) else {
                // Target gone for a while: restart smoothing so the next
                // acquisition does not inherit a stale velocity estimate.
                self.filter.reset();
                continue;
            };
            match self.filter.correction(point) {
                Some((dx, dy)) => writeln!(writer, "{dx:.1},{dy:.1}")?,
                None => debug!("target inside dead zone"),
            }
        }
        Ok(())
    }
}
