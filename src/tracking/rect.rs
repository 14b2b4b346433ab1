/// Axis-aligned bounding box in pixel units of a specific frame resolution.
///
/// Stored as top-left corner plus size. Detection and tracking stages
/// exchange boxes in the working-resolution coordinate space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Top-left x coordinate
    pub x: f32,
    /// Top-left y coordinate
    pub y: f32,
    /// Width of the bounding box
    pub width: f32,
    /// Height of the bounding box
    pub height: f32,
}

impl Rect {
    /// Create a new Rect from top-left coordinates and dimensions.
    #[inline]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Get the center point of the bounding box.
    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Get the area of the bounding box.
    #[inline]
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Whether this box is usable as a detection or track location:
    /// finite coordinates and both sides wider than one pixel.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width > 1.0
            && self.height > 1.0
    }

    /// Grow the box by `margin` pixels on every side.
    #[inline]
    pub fn inflate(&self, margin: f32) -> Rect {
        Rect {
            x: self.x - margin,
            y: self.y - margin,
            width: self.width + 2.0 * margin,
            height: self.height + 2.0 * margin,
        }
    }

    /// Integer pixel bounds `(x, y, width, height)` of this box clipped to
    /// a `frame_width` x `frame_height` image, or `None` if nothing of the
    /// box lies inside the image.
    pub fn pixel_bounds(&self, frame_width: u32, frame_height: u32) -> Option<(u32, u32, u32, u32)> {
        if !(self.x.is_finite() && self.y.is_finite() && self.width > 0.0 && self.height > 0.0) {
            return None;
        }
        let x0 = self.x.max(0.0).floor() as u32;
        let y0 = self.y.max(0.0).floor() as u32;
        let x1 = (self.x + self.width).ceil().min(frame_width as f32).max(0.0) as u32;
        let y1 = (self.y + self.height).ceil().min(frame_height as f32).max(0.0) as u32;
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0, y0, x1 - x0, y1 - y0))
    }

    /// Calculate Intersection over Union (IoU) with another bounding box.
    ///
    /// The result is bounded to `[0, 1]`: disjoint boxes score 0, a box
    /// against itself scores 1.
    pub fn iou(&self, other: &Rect) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        let inter_width = (x2 - x1).max(0.0);
        let inter_height = (y2 - y1).max(0.0);
        let inter_area = inter_width * inter_height;

        let union_area = self.area() + other.area() - inter_area;

        if union_area > 0.0 {
            (inter_area / union_area).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}
