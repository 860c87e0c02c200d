//! Structured layout input and the collaborator seams.
//!
//! Layout detection and text recognition are external model services. The
//! pipeline consumes them through the narrow traits defined here, keeping
//! the aggregation core independent of any specific model output format.

use image::RgbImage;

use crate::core::errors::PipelineResult;

/// A single detected text line, as produced by layout detection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutLine {
    /// Layout-assigned line identifier.
    pub id: String,
    /// Polygon string in `"x,y x,y ..."` form.
    pub points: String,
}

/// A layout-detected text region with its lines in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutRegion {
    /// Layout-assigned region identifier.
    pub id: String,
    /// Region type label, e.g. `paragraph`.
    pub kind: String,
    /// Lines in top-to-bottom layout order.
    pub lines: Vec<LayoutLine>,
}

/// The structured layout of one scanned page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutPage {
    /// Pixel dimensions declared by the layout document, if any.
    pub dimensions: Option<(u32, u32)>,
    /// Regions in layout order.
    pub regions: Vec<LayoutRegion>,
}

impl LayoutPage {
    /// Total number of lines across all regions.
    pub fn line_count(&self) -> usize {
        self.regions.iter().map(|r| r.lines.len()).sum()
    }
}

/// Seam for the layout-detection model service.
///
/// Implementations return the PAGE-XML the detection model emits; the
/// pipeline parses it into a [`LayoutPage`] with
/// [`crate::processors::page_xml::parse_page_xml`].
pub trait LayoutDetector {
    /// Runs layout detection on a scan image.
    fn detect_layout(&self, image: &RgbImage) -> PipelineResult<String>;
}

/// Text and confidence recognized for one cropped line image.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedLine {
    /// The recognized text.
    pub text: String,
    /// Recognition confidence in `[0.0, 1.0]`.
    pub confidence: f32,
}

/// Seam for the transformer OCR model service.
pub trait TextRecognizer {
    /// Recognizes a batch of cropped line images.
    ///
    /// The returned vector must have one entry per input crop, in order.
    fn recognize(&self, crops: &[RgbImage]) -> PipelineResult<Vec<RecognizedLine>>;
}
