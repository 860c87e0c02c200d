//! Result assembly.
//!
//! Composes scan metadata, region aggregates and crop references into the
//! final hierarchical document. Assembly is best-effort per region: a
//! failing region is emitted with an error marker and zeroed geometry so
//! the scan stays reviewable and the human reviewer can still recover it.

use tracing::{debug, warn};

use crate::core::config::PipelineConfig;
use crate::core::errors::{PipelineError, PipelineResult};
use crate::domain::document::{
    CroppedImage, CroppedImageRef, Document, Line, LineCoordinates, Region, RegionStatistics,
    ScanInfo,
};
use crate::pipeline::aggregation::{aggregate_region, zeroed_coordinates};
use crate::pipeline::RegionInput;

/// Builds the deterministic crop filename for a line.
///
/// `region_index` and `line_index` are zero-based positions in their
/// ordered sequences, not the layout-assigned identifiers. Downstream
/// consumers correlate indices to filenames through this exact format.
pub fn crop_filename(scan_id: &str, region_index: usize, line_index: usize) -> String {
    format!(
        "{}_region_{:03}_{:03}.jpg",
        scan_id, region_index, line_index
    )
}

/// Assembles the final document for one scan.
pub struct ResultAssembler<'a> {
    config: &'a PipelineConfig,
}

impl<'a> ResultAssembler<'a> {
    /// Creates an assembler with the given configuration.
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Composes scan metadata and region inputs into the document.
    ///
    /// Region order, line order within regions, and the region-major,
    /// line-minor order of `cropped_images` all preserve the traversal
    /// order of the input. Fails with [`PipelineError::EmptyLayout`] only
    /// when the configuration requires regions and none were provided;
    /// per-region aggregation failures are isolated.
    pub fn assemble(&self, scan: ScanInfo, regions: Vec<RegionInput>) -> PipelineResult<Document> {
        if regions.is_empty() && self.config.require_regions {
            return Err(PipelineError::EmptyLayout {
                scan_id: scan.id.clone(),
            });
        }

        let image_width = scan.dimensions.width;
        let image_height = scan.dimensions.height;
        let mut assembled_regions = Vec::with_capacity(regions.len());
        let mut cropped_images = Vec::new();

        for (region_index, region) in regions.into_iter().enumerate() {
            match aggregate_region(
                &region.id,
                &region.lines,
                self.config,
                image_width,
                image_height,
            ) {
                Ok(aggregate) => {
                    let mut lines = Vec::with_capacity(region.lines.len());
                    for (line_index, line) in region.lines.into_iter().enumerate() {
                        let crop = aggregate.crops[line_index];
                        let filename = crop_filename(&scan.id, region_index, line_index);

                        if line.crop_path.is_empty() {
                            if crop.width > 0 && crop.height > 0 {
                                // Recorded, not fatal: the reviewer can
                                // still correct the line from context.
                                warn!(
                                    "{}",
                                    PipelineError::MissingCropReference {
                                        region_id: region.id.clone(),
                                        line_id: line.id.clone(),
                                    }
                                );
                            }
                        } else {
                            cropped_images.push(CroppedImageRef {
                                filename: filename.clone(),
                                region_id: region.id.clone(),
                                line_id: line.id.clone(),
                                coordinates_on_scan: crop.into(),
                            });
                        }

                        lines.push(Line {
                            id: line.id,
                            index: line_index,
                            text: line.text,
                            confidence: line.confidence,
                            coordinates: LineCoordinates {
                                original: line.points,
                                crop,
                            },
                            cropped_image: CroppedImage {
                                filename,
                                path: line.crop_path,
                            },
                        });
                    }

                    assembled_regions.push(Region {
                        id: region.id,
                        kind: region.kind,
                        index: region_index,
                        concatenated_text: aggregate.concatenated_text,
                        coordinates: aggregate.coordinates,
                        statistics: aggregate.statistics,
                        lines,
                        error: None,
                        corrected_text: None,
                        named_entities: None,
                        confidence: None,
                    });
                }
                Err(e) => {
                    warn!("region {} emitted with error marker: {}", region.id, e);
                    assembled_regions.push(Region {
                        id: region.id,
                        kind: region.kind,
                        index: region_index,
                        concatenated_text: String::new(),
                        coordinates: zeroed_coordinates(self.config.region_padding),
                        statistics: RegionStatistics {
                            line_breaks_handled: 0,
                            merged_words: 0,
                            total_lines: region.lines.len(),
                        },
                        lines: Vec::new(),
                        error: Some(e.to_string()),
                        corrected_text: None,
                        named_entities: None,
                        confidence: None,
                    });
                }
            }
        }

        debug!(
            regions = assembled_regions.len(),
            crops = cropped_images.len(),
            "assembled document for scan {}",
            scan.id
        );

        Ok(Document {
            scan,
            regions: assembled_regions,
            cropped_images,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ConcatConfig;
    use crate::domain::document::Dimensions;
    use crate::pipeline::LineInput;
    use chrono::Utc;

    fn scan_info() -> ScanInfo {
        ScanInfo {
            id: "metric_book_007".to_string(),
            image_path: "/data/in/metric_book_007.jpg".to_string(),
            local_path: "local_storage/input_scans/metric_book_007.jpg".to_string(),
            dimensions: Dimensions {
                width: 1200,
                height: 1800,
            },
            processing_timestamp: Utc::now(),
        }
    }

    fn line(id: &str, points: &str, text: &str, crop_path: &str) -> LineInput {
        LineInput {
            id: id.to_string(),
            points: points.to_string(),
            text: text.to_string(),
            confidence: 0.9,
            crop_path: crop_path.to_string(),
        }
    }

    fn sample_regions() -> Vec<RegionInput> {
        vec![
            RegionInput {
                id: "r0".to_string(),
                kind: "paragraph".to_string(),
                lines: vec![
                    line("r0l0", "10,10 20,20", "Выдано", "/store/a.jpg"),
                    line("r0l1", "10,30 20,40", "свидетельство", "/store/b.jpg"),
                ],
            },
            RegionInput {
                id: "r1".to_string(),
                kind: "paragraph".to_string(),
                lines: vec![line("r1l0", "50,50 70,60", "о рождении", "/store/c.jpg")],
            },
        ]
    }

    #[test]
    fn test_crop_filename_format() {
        assert_eq!(
            crop_filename("scan_000", 0, 0),
            "scan_000_region_000_000.jpg"
        );
        assert_eq!(
            crop_filename("scan_000", 12, 3),
            "scan_000_region_012_003.jpg"
        );
    }

    #[test]
    fn test_assemble_preserves_order_and_indices() {
        let config = PipelineConfig::default();
        let document = ResultAssembler::new(&config)
            .assemble(scan_info(), sample_regions())
            .unwrap();

        assert_eq!(document.regions.len(), 2);
        assert_eq!(document.regions[0].index, 0);
        assert_eq!(document.regions[1].index, 1);
        assert_eq!(document.regions[0].lines[1].index, 1);

        // Region-major, line-minor traversal order with positional indices.
        let filenames: Vec<&str> = document
            .cropped_images
            .iter()
            .map(|c| c.filename.as_str())
            .collect();
        assert_eq!(
            filenames,
            vec![
                "metric_book_007_region_000_000.jpg",
                "metric_book_007_region_000_001.jpg",
                "metric_book_007_region_001_000.jpg",
            ]
        );
    }

    #[test]
    fn test_cropped_images_counts_only_saved_crops() {
        let config = PipelineConfig::default();
        let mut regions = sample_regions();
        regions[0].lines[1].crop_path = String::new();

        let document = ResultAssembler::new(&config)
            .assemble(scan_info(), regions)
            .unwrap();

        let with_path = document
            .regions
            .iter()
            .flat_map(|r| &r.lines)
            .filter(|l| !l.cropped_image.path.is_empty())
            .count();
        assert_eq!(document.cropped_images.len(), with_path);
        assert_eq!(document.cropped_images.len(), 2);
    }

    #[test]
    fn test_failed_region_is_isolated() {
        let config = PipelineConfig::default();
        let mut regions = sample_regions();
        regions[0].lines[0].points = "10,10 garbage".to_string();

        let document = ResultAssembler::new(&config)
            .assemble(scan_info(), regions)
            .unwrap();

        let failed = &document.regions[0];
        assert!(failed.error.is_some());
        assert_eq!(failed.concatenated_text, "");
        assert_eq!(failed.coordinates.min_x, 0.0);
        assert_eq!(failed.coordinates.width, 0.0);
        assert!(failed.lines.is_empty());
        assert_eq!(failed.statistics.total_lines, 2);

        // The healthy region is untouched.
        let healthy = &document.regions[1];
        assert!(healthy.error.is_none());
        assert_eq!(healthy.concatenated_text, "о рождении");
        assert_eq!(document.cropped_images.len(), 1);
    }

    #[test]
    fn test_empty_layout_aborts_only_when_required() {
        let mut config = PipelineConfig::default();
        let assembler = ResultAssembler::new(&config);
        assert!(assembler.assemble(scan_info(), Vec::new()).is_ok());

        config.require_regions = true;
        let assembler = ResultAssembler::new(&config);
        let err = assembler.assemble(scan_info(), Vec::new()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyLayout { .. }));
    }

    #[test]
    fn test_document_shape_field_names() {
        let config = PipelineConfig::default();
        let document = ResultAssembler::new(&config)
            .assemble(scan_info(), sample_regions())
            .unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&serde_json::to_string(&document).unwrap()).unwrap();

        assert!(value["scan"]["dimensions"]["width"].is_number());
        assert!(value["scan"]["processing_timestamp"].is_string());
        let region = &value["regions"][0];
        assert_eq!(region["type"], "paragraph");
        assert!(region["concatenated_text"].is_string());
        assert!(region["coordinates"]["bounding_box"]["top_left"]["x"].is_number());
        assert!(region["statistics"]["line_breaks_handled"].is_number());
        let line = &region["lines"][0];
        assert!(line["coordinates"]["original"].is_string());
        assert!(line["coordinates"]["crop"]["padding"].is_number());
        assert!(line["cropped_image"]["filename"].is_string());
        let crop_ref = &value["cropped_images"][0];
        assert!(crop_ref["region_id"].is_string());
        assert!(crop_ref["coordinates_on_scan"]["min_x"].is_number());
        // Error and entity fields stay absent in the baseline shape.
        assert!(region.get("error").is_none());
        assert!(region.get("named_entities").is_none());
    }

    #[test]
    fn test_set_line_text_recomputes_region() {
        let config = PipelineConfig::default();
        let mut document = ResultAssembler::new(&config)
            .assemble(scan_info(), sample_regions())
            .unwrap();

        document
            .set_line_text("r0", "r0l1", "-", &ConcatConfig::default())
            .unwrap();
        let region = document.region("r0").unwrap();
        assert_eq!(region.concatenated_text, "Выдано");
        assert_eq!(region.statistics.line_breaks_handled, 1);
        // Geometry is untouched by review edits.
        assert_eq!(region.coordinates.min_x, 10.0);

        let err = document
            .set_line_text("r9", "r0l1", "x", &ConcatConfig::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnknownRegion { .. }));
    }

    #[test]
    fn test_document_summary() {
        let config = PipelineConfig::default();
        let mut regions = sample_regions();
        regions[0].lines.push(line("r0l2", "10,50 20,60", "-", ""));

        let document = ResultAssembler::new(&config)
            .assemble(scan_info(), regions)
            .unwrap();
        let summary = document.summary();
        assert_eq!(summary.total_regions, 2);
        assert_eq!(summary.total_line_breaks_handled, 1);
        assert_eq!(summary.average_line_breaks_per_region, 0.5);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = PipelineConfig::default();
        let document = ResultAssembler::new(&config)
            .assemble(scan_info(), sample_regions())
            .unwrap();

        let serialized = serde_json::to_string_pretty(&document).unwrap();
        let restored: Document = serde_json::from_str(&serialized).unwrap();
        assert_eq!(restored.regions.len(), document.regions.len());
        assert_eq!(
            restored.regions[0].concatenated_text,
            document.regions[0].concatenated_text
        );
        assert_eq!(restored.cropped_images.len(), document.cropped_images.len());
    }
}
