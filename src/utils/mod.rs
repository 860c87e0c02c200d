//! Utility functions for image handling.

use std::path::Path;

use image::{DynamicImage, RgbImage};

use crate::core::errors::{PipelineError, PipelineResult};

/// Converts a DynamicImage to an RgbImage.
pub fn dynamic_to_rgb(img: DynamicImage) -> RgbImage {
    img.to_rgb8()
}

/// Loads an image from a file path and converts it to RgbImage.
///
/// # Errors
///
/// Returns [`PipelineError::ImageLoad`] if the image cannot be read or
/// decoded.
pub fn load_image(path: &Path) -> PipelineResult<RgbImage> {
    let img = image::open(path).map_err(PipelineError::ImageLoad)?;
    Ok(dynamic_to_rgb(img))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_image_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        let image = RgbImage::from_pixel(8, 6, image::Rgb([10, 20, 30]));
        image.save(&path).unwrap();

        let loaded = load_image(&path).unwrap();
        assert_eq!(loaded.dimensions(), (8, 6));
        assert_eq!(loaded.get_pixel(0, 0), &image::Rgb([10, 20, 30]));
    }

    #[test]
    fn test_load_missing_image_fails() {
        assert!(load_image(Path::new("/nonexistent/scan.jpg")).is_err());
    }
}
