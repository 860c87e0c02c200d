//! Typed records for the assembled scan document.
//!
//! These structs serialize to the persisted JSON shape consumed by the
//! review frontend and the report generator. Field names and ordering are
//! part of that contract and must not change.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::config::ConcatConfig;
use crate::core::errors::{PipelineError, PipelineResult};
use crate::domain::geometry::{CornerPoints, CropRect};
use crate::processors::concat::concatenate;

/// Pixel dimensions of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Metadata about one input scan.
///
/// Created once per input image and immutable after assembly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanInfo {
    /// Unique identifier of the scan.
    pub id: String,
    /// Path of the original input image.
    pub image_path: String,
    /// Path of the copy kept in local storage.
    pub local_path: String,
    /// Pixel dimensions of the scan.
    pub dimensions: Dimensions,
    /// When the scan was processed.
    pub processing_timestamp: DateTime<Utc>,
}

/// Aggregate bounding coordinates of a region.
///
/// The min/max values are the exact union of the line polygon extents;
/// `padding` records the configured region padding as metadata for
/// downstream renderers and is not applied to the union.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionCoordinates {
    /// Minimum x over all line polygon points.
    pub min_x: f32,
    /// Maximum x over all line polygon points.
    pub max_x: f32,
    /// Minimum y over all line polygon points.
    pub min_y: f32,
    /// Maximum y over all line polygon points.
    pub max_y: f32,
    /// `max_x - min_x`.
    pub width: f32,
    /// `max_y - min_y`.
    pub height: f32,
    /// Configured region padding, carried as metadata.
    pub padding: u32,
    /// Number of lines that contributed polygon points.
    pub total_lines: usize,
    /// The four corners of the bounding rectangle.
    pub bounding_box: CornerPoints,
}

/// Lightweight per-region statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionStatistics {
    /// Lines excluded from concatenation as empty or lone-hyphen noise.
    pub line_breaks_handled: usize,
    /// Best-effort count of hyphenated word continuations between lines.
    pub merged_words: usize,
    /// Total number of lines in the region, including excluded ones.
    pub total_lines: usize,
}

/// A named entity extracted by the external postprocessing collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedEntity {
    /// Entity kind: person, place, document or date.
    pub entity_type: String,
    /// The entity value.
    pub entity_value: String,
    /// Additional details about the entity.
    pub details: String,
}

/// Coordinates attached to one recognized line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineCoordinates {
    /// The original polygon string as received from layout detection.
    pub original: String,
    /// The padded crop rectangle. Zeroed when the polygon was empty.
    pub crop: CropRect,
}

/// Reference to the persisted crop image of one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CroppedImage {
    /// Deterministic crop filename.
    pub filename: String,
    /// Storage path of the saved crop, empty when no crop was saved.
    pub path: String,
}

/// A single detected text line within a region.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Line {
    /// Layout-assigned line identifier.
    pub id: String,
    /// Zero-based position within the owning region.
    pub index: usize,
    /// Recognized text.
    pub text: String,
    /// Recognition confidence in `[0.0, 1.0]`.
    pub confidence: f32,
    /// Original polygon and derived crop rectangle.
    pub coordinates: LineCoordinates,
    /// Reference to the persisted crop image.
    pub cropped_image: CroppedImage,
}

/// A layout-detected block of text composed of one or more lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    /// Layout-assigned region identifier.
    pub id: String,
    /// Region type label, e.g. `paragraph`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Zero-based position within the scan.
    pub index: usize,
    /// Ordered join of the included line texts.
    pub concatenated_text: String,
    /// Aggregate bounding coordinates.
    pub coordinates: RegionCoordinates,
    /// Per-region statistics.
    pub statistics: RegionStatistics,
    /// Lines in source layout order.
    pub lines: Vec<Line>,
    /// Error marker set when aggregation of this region failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Corrected text from the external postprocessing collaborator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corrected_text: Option<String>,
    /// Named entities from the external postprocessing collaborator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub named_entities: Option<Vec<NamedEntity>>,
    /// Correction confidence from the external postprocessing collaborator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

/// Crop rectangle of a saved line image expressed in scan coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRect {
    /// Left edge on the scan.
    pub min_x: u32,
    /// Right edge on the scan.
    pub max_x: u32,
    /// Top edge on the scan.
    pub min_y: u32,
    /// Bottom edge on the scan.
    pub max_y: u32,
    /// Rectangle width.
    pub width: u32,
    /// Rectangle height.
    pub height: u32,
}

impl From<CropRect> for ScanRect {
    fn from(rect: CropRect) -> Self {
        Self {
            min_x: rect.min_x,
            max_x: rect.max_x,
            min_y: rect.min_y,
            max_y: rect.max_y,
            width: rect.width,
            height: rect.height,
        }
    }
}

/// A denormalized index entry for one saved crop image.
///
/// Enables direct lookup by filename without traversing the region/line
/// tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CroppedImageRef {
    /// Crop filename.
    pub filename: String,
    /// Identifier of the owning region.
    pub region_id: String,
    /// Identifier of the owning line.
    pub line_id: String,
    /// Crop rectangle in scan pixel coordinates.
    pub coordinates_on_scan: ScanRect,
}

/// Totals over all regions of a document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DocumentSummary {
    /// Number of regions.
    pub total_regions: usize,
    /// Sum of `line_breaks_handled` over all regions.
    pub total_line_breaks_handled: usize,
    /// Sum of `merged_words` over all regions.
    pub total_merged_words: usize,
    /// `total_line_breaks_handled / total_regions`, zero for no regions.
    pub average_line_breaks_per_region: f64,
}

/// The final hierarchical scan document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Scan metadata.
    pub scan: ScanInfo,
    /// Regions in layout order.
    pub regions: Vec<Region>,
    /// Flat crop index in region-major, line-minor traversal order.
    pub cropped_images: Vec<CroppedImageRef>,
}

impl Document {
    /// Looks up a region by its identifier.
    pub fn region(&self, region_id: &str) -> Option<&Region> {
        self.regions.iter().find(|r| r.id == region_id)
    }

    /// Looks up a crop index entry by filename.
    pub fn crop_ref(&self, filename: &str) -> Option<&CroppedImageRef> {
        self.cropped_images.iter().find(|c| c.filename == filename)
    }

    /// Replaces the text of one line and recomputes the owning region's
    /// concatenated text and statistics.
    ///
    /// Coordinates and identifiers are never altered. Fails with
    /// [`PipelineError::UnknownRegion`] or [`PipelineError::UnknownLine`]
    /// when the ids do not resolve.
    pub fn set_line_text(
        &mut self,
        region_id: &str,
        line_id: &str,
        new_text: impl Into<String>,
        config: &ConcatConfig,
    ) -> PipelineResult<()> {
        let region = self
            .regions
            .iter_mut()
            .find(|r| r.id == region_id)
            .ok_or_else(|| PipelineError::UnknownRegion {
                region_id: region_id.to_string(),
            })?;
        let line = region
            .lines
            .iter_mut()
            .find(|l| l.id == line_id)
            .ok_or_else(|| PipelineError::UnknownLine {
                region_id: region_id.to_string(),
                line_id: line_id.to_string(),
            })?;
        line.text = new_text.into();

        let outcome = concatenate(region.lines.iter().map(|l| l.text.as_str()), config);
        region.concatenated_text = outcome.text;
        region.statistics.line_breaks_handled = outcome.line_breaks_handled;
        region.statistics.merged_words = outcome.merged_words;
        Ok(())
    }

    /// Computes the totals over all regions.
    pub fn summary(&self) -> DocumentSummary {
        let total_regions = self.regions.len();
        let total_line_breaks_handled = self
            .regions
            .iter()
            .map(|r| r.statistics.line_breaks_handled)
            .sum();
        let total_merged_words = self.regions.iter().map(|r| r.statistics.merged_words).sum();
        let average_line_breaks_per_region = if total_regions == 0 {
            0.0
        } else {
            total_line_breaks_handled as f64 / total_regions as f64
        };
        DocumentSummary {
            total_regions,
            total_line_breaks_handled,
            total_merged_words,
            average_line_breaks_per_region,
        }
    }
}
