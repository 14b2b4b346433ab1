//! Frame value type passed between the video source, the pre-processing
//! pipelines and the predictors.

use image::{GrayImage, RgbImage};

/// A single video frame, either full color or single-channel.
///
/// Pipeline stages take frames by value and return new frames; a caller
/// that needs both the raw and a filtered copy clones before filtering.
#[derive(Clone)]
pub enum Frame {
    Color(RgbImage),
    Gray(GrayImage),
}

impl Frame {
    #[inline]
    pub fn width(&self) -> u32 {
        match self {
            Frame::Color(img) => img.width(),
            Frame::Gray(img) => img.width(),
        }
    }

    #[inline]
    pub fn height(&self) -> u32 {
        match self {
            Frame::Color(img) => img.height(),
            Frame::Gray(img) => img.height(),
        }
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// Number of channels in the underlying buffer: 3 for color, 1 for gray.
    #[inline]
    pub fn channels(&self) -> u8 {
        match self {
            Frame::Color(_) => 3,
            Frame::Gray(_) => 1,
        }
    }

    #[inline]
    pub fn is_gray(&self) -> bool {
        matches!(self, Frame::Gray(_))
    }

    /// Borrow the single-channel buffer, if this frame is single-channel.
    pub fn as_gray(&self) -> Option<&GrayImage> {
        match self {
            Frame::Gray(img) => Some(img),
            Frame::Color(_) => None,
        }
    }

    /// Borrow the color buffer, if this frame is color.
    pub fn as_color(&self) -> Option<&RgbImage> {
        match self {
            Frame::Color(img) => Some(img),
            Frame::Gray(_) => None,
        }
    }

    /// A single-channel copy of this frame, converting if necessary.
    pub fn to_gray(&self) -> GrayImage {
        match self {
            Frame::Gray(img) => img.clone(),
            Frame::Color(img) => image::imageops::grayscale(img),
        }
    }
}

impl From<RgbImage> for Frame {
    fn from(img: RgbImage) -> Self {
        Frame::Color(img)
    }
}

impl From<GrayImage> for Frame {
    fn from(img: GrayImage) -> Self {
        Frame::Gray(img)
    }
}

// Pixel dumps are useless in logs; print geometry instead.
impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.is_gray() { "Gray" } else { "Color" };
        write!(f, "Frame::{}({}x{})", kind, self.width(), self.height())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_frame_geometry() {
        let frame = Frame::from(RgbImage::new(64, 48));
        assert_eq!(frame.dimensions(), (64, 48));
        assert_eq!(frame.channels(), 3);
        assert!(!frame.is_gray());
        assert!(frame.as_gray().is_none());
        assert!(frame.as_color().is_some());
    }

    #[test]
    fn test_to_gray_preserves_size() {
        let frame = Frame::from(RgbImage::new(32, 16));
        let gray = frame.to_gray();
        assert_eq!(gray.dimensions(), (32, 16));
    }

    #[test]
    fn test_to_gray_is_identity_on_gray() {
        let img = GrayImage::from_pixel(8, 8, Luma([7u8]));
        let frame = Frame::from(img.clone());
        assert_eq!(frame.to_gray().as_raw(), img.as_raw());
    }

    #[test]
    fn test_debug_prints_geometry() {
        let frame = Frame::from(GrayImage::new(10, 20));
        assert_eq!(format!("{:?}", frame), "Frame::Gray(10x20)");
    }
}
