//! Line-image cropping stage.
//!
//! Cuts the padded crop rectangle of every text line out of the scan
//! image. Cropping failures are tolerated per line and surface as `None`
//! entries, so one bad rectangle never blocks the rest of the scan.

use image::RgbImage;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::core::errors::{PipelineError, PipelineResult, ProcessingStage, SimpleError};
use crate::domain::geometry::CropRect;

/// Result of cropping one scan's line rectangles.
#[derive(Debug, Clone)]
pub struct CroppingOutcome {
    /// Successfully cropped line images (`None` for failed crops).
    pub crops: Vec<Option<RgbImage>>,
    /// Number of failed cropping operations.
    pub failed_crops: usize,
}

/// Crops all line rectangles from a scan image.
///
/// Uses parallel processing when the number of rectangles exceeds
/// `parallel_threshold`, sequential processing otherwise.
pub fn crop_lines(
    image: &RgbImage,
    rects: &[CropRect],
    parallel_threshold: usize,
) -> CroppingOutcome {
    if rects.is_empty() {
        return CroppingOutcome {
            crops: Vec::new(),
            failed_crops: 0,
        };
    }

    let use_parallel = rects.len() > parallel_threshold;
    debug!(
        lines = rects.len(),
        parallel = use_parallel,
        "cropping line rectangles"
    );

    let results: Vec<PipelineResult<RgbImage>> = if use_parallel {
        rects.par_iter().map(|rect| crop_rect(image, rect)).collect()
    } else {
        rects.iter().map(|rect| crop_rect(image, rect)).collect()
    };

    let mut failed_crops = 0;
    let crops = results
        .into_iter()
        .enumerate()
        .map(|(idx, result)| match result {
            Ok(crop) => Some(crop),
            Err(e) => {
                failed_crops += 1;
                warn!("failed to crop line {}: {}", idx, e);
                None
            }
        })
        .collect();

    CroppingOutcome {
        crops,
        failed_crops,
    }
}

/// Crops a single rectangle from the scan image.
fn crop_rect(image: &RgbImage, rect: &CropRect) -> PipelineResult<RgbImage> {
    if rect.width == 0 || rect.height == 0 {
        return Err(PipelineError::processing(
            ProcessingStage::Cropping,
            "zero-area crop rectangle",
            SimpleError::new(format!(
                "rectangle at ({}, {}) has size {}x{}",
                rect.min_x, rect.min_y, rect.width, rect.height
            )),
        ));
    }
    if rect.max_x > image.width() || rect.max_y > image.height() {
        return Err(PipelineError::processing(
            ProcessingStage::Cropping,
            "crop rectangle outside image bounds",
            SimpleError::new(format!(
                "rectangle extends to ({}, {}) but image is {}x{}",
                rect.max_x,
                rect.max_y,
                image.width(),
                image.height()
            )),
        ));
    }

    Ok(image::imageops::crop_imm(image, rect.min_x, rect.min_y, rect.width, rect.height).to_image())
}
