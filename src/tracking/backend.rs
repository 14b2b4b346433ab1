//! Pluggable single-object tracking capabilities.

use image::{GrayImage, Luma};
use image::imageops::crop_imm;
use imageproc::definitions::Image;
use imageproc::template_matching::{MatchTemplateMethod, match_template};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::pipeline::Frame;
use crate::tracking::rect::Rect;

/// A single-object visual tracker.
///
/// The coordinator treats implementations as opaque: seed with
/// [`init`](TrackerBackend::init), then ask for the target's new position
/// once per frame. Returning `None` from `update` means the tracker
/// believes it has lost the target; what to do about that is the
/// coordinator's decision, not the backend's.
pub trait TrackerBackend: Send {
    /// Seed the tracker with the target's appearance and position.
    fn init(&mut self, frame: &Frame, bbox: Rect) -> Result<()>;

    /// Locate the target in the next frame.
    fn update(&mut self, frame: &Frame) -> Option<Rect>;
}

/// Selects which tracking capability [`build`](TrackerKind::build) creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrackerKind {
    /// Template matching scored by sum of squared differences. Robust on
    /// low-texture scenes where normalized scores degenerate.
    #[default]
    SquaredDiff,
    /// Template matching scored by normalized cross-correlation.
    NormedCorrelation,
}

impl TrackerKind {
    /// Construct a fresh backend of this kind. `search_margin` is how far
    /// (in pixels) the target may move between consecutive frames.
    pub fn build(self, search_margin: u32) -> Box<dyn TrackerBackend> {
        match self {
            TrackerKind::SquaredDiff => Box::new(TemplateTracker::squared_diff(search_margin)),
            TrackerKind::NormedCorrelation => {
                Box::new(TemplateTracker::normed_correlation(search_margin))
            }
        }
    }
}

/// Largest tolerated root-mean-square pixel mismatch, as a fraction of
/// full scale, before a squared-difference match counts as lost.
const SQDIFF_MAX_MISMATCH: f32 = 0.25;

/// Smallest normalized correlation still accepted as a match.
const NCC_MIN_SIMILARITY: f32 = 0.5;

/// Local-search template tracker.
///
/// Keeps a grayscale crop of the target and, each frame, scans a window
/// around the last known position for the best match. On success the
/// template is refreshed from the matched location so gradual appearance
/// change does not starve it.
pub struct TemplateTracker {
    method: MatchTemplateMethod,
    search_margin: u32,
    template: Option<GrayImage>,
    last: Option<Rect>,
}

impl TemplateTracker {
    pub fn squared_diff(search_margin: u32) -> Self {
        Self::with_method(MatchTemplateMethod::SumOfSquaredErrors, search_margin)
    }

    pub fn normed_correlation(search_margin: u32) -> Self {
        Self::with_method(MatchTemplateMethod::CrossCorrelationNormalized, search_margin)
    }

    fn with_method(method: MatchTemplateMethod, search_margin: u32) -> Self {
        Self {
            method,
            search_margin,
            template: None,
            last: None,
        }
    }

    fn score_is_sqdiff(&self) -> bool {
        matches!(self.method, MatchTemplateMethod::SumOfSquaredErrors)
    }
}

impl TrackerBackend for TemplateTracker {
    fn init(&mut self, frame: &Frame, bbox: Rect) -> Result<()> {
        let gray = frame.to_gray();
        let (fw, fh) = gray.dimensions();
        let Some((x, y, w, h)) = bbox.pixel_bounds(fw, fh) else {
            return Err(Error::TrackerInit(format!(
                "target box {bbox:?} lies outside the {fw}x{fh} frame"
            )));
        };
        if w < 2 || h < 2 {
            return Err(Error::TrackerInit(format!(
                "target box {bbox:?} is too small to form a template"
            )));
        }
        self.template = Some(crop_imm(&gray, x, y, w, h).to_image());
        self.last = Some(Rect::new(x as f32, y as f32, w as f32, h as f32));
        Ok(())
    }

    fn update(&mut self, frame: &Frame) -> Option<Rect> {
        let template = self.template.as_ref()?;
        let last = self.last?;

        let gray = frame.to_gray();
        let (fw, fh) = gray.dimensions();
        let (sx, sy, sw, sh) = last.inflate(self.search_margin as f32).pixel_bounds(fw, fh)?;
        let (tw, th) = template.dimensions();
        if sw < tw || sh < th {
            return None;
        }

        let window = crop_imm(&gray, sx, sy, sw, sh).to_image();
        let scores = match_template(&window, template, self.method);
        let minimize = self.score_is_sqdiff();
        let (value, (mx, my)) = best_score(&scores, minimize)?;

        let accepted = if minimize {
            let rms = (value / (tw * th) as f32).sqrt() / 255.0;
            rms <= SQDIFF_MAX_MISMATCH
        } else {
            value >= NCC_MIN_SIMILARITY
        };
        if !accepted {
            return None;
        }

        let found = Rect::new((sx + mx) as f32, (sy + my) as f32, tw as f32, th as f32);
        self.template = Some(crop_imm(&gray, sx + mx, sy + my, tw, th).to_image());
        self.last = Some(found);
        Some(found)
    }
}

/// Best finite cell of a score map. Normalized methods divide by the
/// window energy and emit NaN over flat regions, so non-finite cells are
/// skipped rather than compared.
fn best_score(scores: &Image<Luma<f32>>, minimize: bool) -> Option<(f32, (u32, u32))> {
    let mut best: Option<(f32, (u32, u32))> = None;
    for (x, y, p) in scores.enumerate_pixels() {
        let v = p.0[0];
        if !v.is_finite() {
            continue;
        }
        let better = match best {
            None => true,
            Some((b, _)) => {
                if minimize {
                    v < b
                } else {
                    v > b
                }
            }
        };
        if better {
            best = Some((v, (x, y)));
        }
    }
    best
}
