//! Local artifact storage.
//!
//! Stores input scans, cropped line images, intermediate layout XML and
//! final result documents under an injected base path. The pipeline holds
//! a `LocalStorage` value explicitly; nothing here is process-global, so
//! aggregation logic stays testable without filesystem side effects.

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::debug;

use crate::core::errors::{PipelineError, PipelineResult};
use crate::domain::document::Document;
use crate::pipeline::assembly::crop_filename;

/// Normalizes a scan identifier for filesystem use.
///
/// Spaces become underscores and the id is lowercased, matching the ids
/// the directory runner derives from file stems.
pub fn sanitize_scan_id(scan_id: &str) -> String {
    scan_id.replace(' ', "_").to_lowercase()
}

/// Local file storage for pipeline artifacts.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    input_scans: PathBuf,
    cropped_images: PathBuf,
    results: PathBuf,
    xml_intermediate: PathBuf,
}

impl LocalStorage {
    /// Creates the storage layout under the given base path.
    ///
    /// All subdirectories are created if missing.
    pub fn new(base_path: impl Into<PathBuf>) -> PipelineResult<Self> {
        let base_path = base_path.into();
        let storage = Self {
            input_scans: base_path.join("input_scans"),
            cropped_images: base_path.join("cropped_images"),
            results: base_path.join("results"),
            xml_intermediate: base_path.join("xml_intermediate"),
            base_path,
        };
        for dir in [
            &storage.input_scans,
            &storage.cropped_images,
            &storage.results,
            &storage.xml_intermediate,
        ] {
            fs::create_dir_all(dir)?;
        }
        Ok(storage)
    }

    /// The injected base path.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Copies an input scan into storage, returning the stored path.
    pub fn save_input_scan(&self, image_path: &Path, scan_id: &str) -> PipelineResult<PathBuf> {
        let destination = self.input_scan_path(scan_id);
        fs::copy(image_path, &destination)?;
        Ok(destination)
    }

    /// Path where the input scan for the given id is kept.
    pub fn input_scan_path(&self, scan_id: &str) -> PathBuf {
        self.input_scans.join(format!("{}.jpg", scan_id))
    }

    /// Saves a cropped line image, returning the stored path.
    ///
    /// The filename follows the positional-index crop naming convention.
    pub fn save_cropped_image(
        &self,
        image: &RgbImage,
        scan_id: &str,
        region_index: usize,
        line_index: usize,
    ) -> PipelineResult<PathBuf> {
        let destination = self
            .cropped_images
            .join(crop_filename(scan_id, region_index, line_index));
        image.save(&destination).map_err(PipelineError::ImageSave)?;
        Ok(destination)
    }

    /// Saves an intermediate XML artifact for one processing stage.
    pub fn save_xml_intermediate(
        &self,
        xml: &str,
        scan_id: &str,
        stage: &str,
    ) -> PipelineResult<PathBuf> {
        let destination = self
            .xml_intermediate
            .join(format!("{}_{}.xml", scan_id, stage));
        fs::write(&destination, xml)?;
        Ok(destination)
    }

    /// Loads an intermediate XML artifact, if present.
    pub fn load_xml_intermediate(
        &self,
        scan_id: &str,
        stage: &str,
    ) -> PipelineResult<Option<String>> {
        let source = self
            .xml_intermediate
            .join(format!("{}_{}.xml", scan_id, stage));
        if !source.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(source)?))
    }

    /// Persists the final result document as pretty-printed JSON.
    pub fn save_result(&self, document: &Document, scan_id: &str) -> PipelineResult<PathBuf> {
        let destination = self.results.join(format!("{}_result.json", scan_id));
        fs::write(&destination, serde_json::to_string_pretty(document)?)?;
        debug!("result for scan {} saved to {}", scan_id, destination.display());
        Ok(destination)
    }

    /// Loads a previously saved result document, if present.
    pub fn load_result(&self, scan_id: &str) -> PipelineResult<Option<Document>> {
        let source = self.results.join(format!("{}_result.json", scan_id));
        if !source.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(source)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Lists the scan ids with a stored input image.
    pub fn list_scans(&self) -> PipelineResult<Vec<String>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.input_scans)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("jpg") {
                if let Some(stem) = path.file_stem() {
                    ids.push(stem.to_string_lossy().into_owned());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Removes every stored artifact belonging to one scan.
    pub fn cleanup_scan(&self, scan_id: &str) -> PipelineResult<()> {
        let input = self.input_scan_path(scan_id);
        if input.exists() {
            fs::remove_file(input)?;
        }
        for dir in [&self.cropped_images, &self.xml_intermediate, &self.results] {
            let prefix = format!("{}_", scan_id);
            for entry in fs::read_dir(dir)? {
                let path = entry?.path();
                let matches = path
                    .file_name()
                    .map(|name| name.to_string_lossy().starts_with(&prefix))
                    .unwrap_or(false);
                if matches {
                    fs::remove_file(path)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::PipelineConfig;
    use crate::domain::document::{Dimensions, ScanInfo};
    use crate::pipeline::assembly::ResultAssembler;
    use chrono::Utc;

    fn storage() -> (tempfile::TempDir, LocalStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).unwrap();
        (dir, storage)
    }

    fn sample_document() -> Document {
        let scan = ScanInfo {
            id: "scan_000".to_string(),
            image_path: "in.jpg".to_string(),
            local_path: "local.jpg".to_string(),
            dimensions: Dimensions {
                width: 10,
                height: 10,
            },
            processing_timestamp: Utc::now(),
        };
        ResultAssembler::new(&PipelineConfig::default())
            .assemble(scan, Vec::new())
            .unwrap()
    }

    #[test]
    fn test_sanitize_scan_id() {
        assert_eq!(sanitize_scan_id("Metric Book 7"), "metric_book_7");
        assert_eq!(sanitize_scan_id("scan_000"), "scan_000");
    }

    #[test]
    fn test_creates_directory_layout() {
        let (dir, _storage) = storage();
        for sub in ["input_scans", "cropped_images", "results", "xml_intermediate"] {
            assert!(dir.path().join(sub).is_dir());
        }
    }

    #[test]
    fn test_result_roundtrip() {
        let (_dir, storage) = storage();
        let document = sample_document();
        storage.save_result(&document, "scan_000").unwrap();

        let restored = storage.load_result("scan_000").unwrap().unwrap();
        assert_eq!(restored.scan.id, "scan_000");
        assert!(storage.load_result("missing").unwrap().is_none());
    }

    #[test]
    fn test_xml_intermediate_roundtrip() {
        let (_dir, storage) = storage();
        storage
            .save_xml_intermediate("<PcGts/>", "scan_000", "layout")
            .unwrap();
        let restored = storage.load_xml_intermediate("scan_000", "layout").unwrap();
        assert_eq!(restored.as_deref(), Some("<PcGts/>"));
        assert!(storage
            .load_xml_intermediate("scan_000", "ocr")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_cropped_image_save_uses_crop_filename() {
        let (dir, storage) = storage();
        let image = RgbImage::from_pixel(4, 4, image::Rgb([128, 128, 128]));
        let path = storage
            .save_cropped_image(&image, "scan_000", 1, 2)
            .unwrap();
        assert_eq!(
            path,
            dir.path()
                .join("cropped_images")
                .join("scan_000_region_001_002.jpg")
        );
        assert!(path.is_file());
    }

    #[test]
    fn test_list_and_cleanup_scan() {
        let (_dir, storage) = storage();
        let image = RgbImage::from_pixel(4, 4, image::Rgb([0, 0, 0]));
        image.save(storage.input_scan_path("scan_000")).unwrap();
        storage
            .save_cropped_image(&image, "scan_000", 0, 0)
            .unwrap();
        storage.save_result(&sample_document(), "scan_000").unwrap();

        assert_eq!(storage.list_scans().unwrap(), vec!["scan_000".to_string()]);

        storage.cleanup_scan("scan_000").unwrap();
        assert!(storage.list_scans().unwrap().is_empty());
        assert!(storage.load_result("scan_000").unwrap().is_none());
    }
}
