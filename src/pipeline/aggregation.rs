//! Region aggregation.
//!
//! Turns a region's recognized lines into the aggregate bounding
//! rectangle, per-line crop rectangles, concatenated text and statistics
//! that end up in the result document.

use crate::core::config::PipelineConfig;
use crate::core::errors::PipelineResult;
use crate::domain::document::{RegionCoordinates, RegionStatistics};
use crate::domain::geometry::{parse_points_lenient, BoundingRect, CropRect, Point};
use crate::pipeline::LineInput;
use crate::processors::concat::concatenate;

/// The aggregate view of one region.
#[derive(Debug, Clone)]
pub struct RegionAggregate {
    /// Bounding coordinates over all line polygons.
    pub coordinates: RegionCoordinates,
    /// Ordered join of the included line texts.
    pub concatenated_text: String,
    /// Per-region statistics.
    pub statistics: RegionStatistics,
    /// One crop rectangle per line, zeroed for lines with empty polygons.
    pub crops: Vec<CropRect>,
}

/// Aggregates a region's lines.
///
/// The bounding rectangle is the min/max union of all polygon points
/// across all lines. A region with no points yields the all-zero
/// placeholder rectangle rather than an error, since upstream layout
/// detection occasionally produces empty regions; a single point yields a
/// valid zero-area rectangle. Lines whose polygon is empty contribute no
/// points but stay in the total line count and in text concatenation.
///
/// Fails only when a line polygon is present but malformed; callers
/// isolate that failure per region.
pub fn aggregate_region(
    region_id: &str,
    lines: &[LineInput],
    config: &PipelineConfig,
    image_width: u32,
    image_height: u32,
) -> PipelineResult<RegionAggregate> {
    let mut all_points: Vec<Point> = Vec::new();
    let mut crops = Vec::with_capacity(lines.len());
    let mut contributing_lines = 0;

    for line in lines {
        let points = parse_points_lenient(&line.points).map_err(|e| {
            crate::core::errors::PipelineError::region_aggregation(
                region_id,
                format!("line '{}' has a malformed polygon", line.id),
                e,
            )
        })?;
        if !points.is_empty() {
            contributing_lines += 1;
        }
        crops.push(
            CropRect::from_polygon(&points, &config.crop, image_width, image_height)
                .unwrap_or_default(),
        );
        all_points.extend(points);
    }

    let rect = BoundingRect::from_points(&all_points).unwrap_or_else(BoundingRect::zero);
    let coordinates = RegionCoordinates {
        min_x: rect.min_x,
        max_x: rect.max_x,
        min_y: rect.min_y,
        max_y: rect.max_y,
        width: rect.width(),
        height: rect.height(),
        padding: config.region_padding,
        total_lines: contributing_lines,
        bounding_box: rect.corners(),
    };

    let outcome = concatenate(lines.iter().map(|l| l.text.as_str()), &config.concat);
    let statistics = RegionStatistics {
        line_breaks_handled: outcome.line_breaks_handled,
        merged_words: outcome.merged_words,
        total_lines: lines.len(),
    };

    Ok(RegionAggregate {
        coordinates,
        concatenated_text: outcome.text,
        statistics,
        crops,
    })
}

/// The zeroed coordinates emitted for regions whose aggregation failed.
pub fn zeroed_coordinates(padding: u32) -> RegionCoordinates {
    let rect = BoundingRect::zero();
    RegionCoordinates {
        min_x: 0.0,
        max_x: 0.0,
        min_y: 0.0,
        max_y: 0.0,
        width: 0.0,
        height: 0.0,
        padding,
        total_lines: 0,
        bounding_box: rect.corners(),
    }
}
