//! Whole-scan orchestration.
//!
//! Drives one scan through layout detection, line cropping, recognition,
//! aggregation and assembly, persisting artifacts along the way, and runs
//! directories of scans with per-scan failure isolation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::core::config::{ConfigValidator, PipelineConfig};
use crate::core::errors::{PipelineError, PipelineResult};
use crate::core::stats::{PipelineStats, StatsManager};
use crate::domain::document::{Dimensions, Document, ScanInfo};
use crate::domain::geometry::{parse_points_lenient, CropRect};
use crate::domain::layout::{LayoutDetector, LayoutPage, TextRecognizer};
use crate::pipeline::assembly::ResultAssembler;
use crate::pipeline::cropping::crop_lines;
use crate::pipeline::{ErrorMetrics, LineInput, RegionInput};
use crate::processors::page_xml::parse_page_xml;
use crate::storage::{sanitize_scan_id, LocalStorage};
use crate::utils::load_image;

/// File extensions accepted as scan images by the directory runner.
const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "tiff", "tif"];

/// The digitization pipeline for registry scans.
///
/// Owns the collaborator seams (layout detection, text recognition,
/// storage) and the configuration. Each `process_scan` invocation is
/// self-contained; the pipeline can be shared across threads for
/// independent scans.
pub struct ScanPipeline {
    layout: Box<dyn LayoutDetector + Send + Sync>,
    recognizer: Box<dyn TextRecognizer + Send + Sync>,
    storage: LocalStorage,
    config: PipelineConfig,
    stats: StatsManager,
}

impl ScanPipeline {
    /// Creates a pipeline after validating the configuration.
    pub fn new(
        layout: Box<dyn LayoutDetector + Send + Sync>,
        recognizer: Box<dyn TextRecognizer + Send + Sync>,
        storage: LocalStorage,
        config: PipelineConfig,
    ) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Self {
            layout,
            recognizer,
            storage,
            config,
            stats: StatsManager::new(),
        })
    }

    /// Returns a snapshot of the execution statistics.
    pub fn stats(&self) -> PipelineStats {
        self.stats.get_stats()
    }

    /// Processes a single scan into its result document.
    ///
    /// The document is also persisted to storage. Per-line and per-region
    /// failures are isolated inside the document; an error return means
    /// the whole scan failed structurally.
    pub fn process_scan(&self, image_path: &Path, scan_id: &str) -> PipelineResult<Document> {
        let started = Instant::now();
        let result = self.process_scan_inner(image_path, scan_id);
        self.stats.record_scan(result.is_ok(), started.elapsed());
        if let Err(e) = &result {
            warn!("scan {} failed: {}", scan_id, e);
        }
        result
    }

    fn process_scan_inner(&self, image_path: &Path, scan_id: &str) -> PipelineResult<Document> {
        let scan_id = sanitize_scan_id(scan_id);
        info!("processing scan {}", scan_id);

        let image = load_image(image_path)?;
        let (image_width, image_height) = image.dimensions();
        let local_path = self.storage.save_input_scan(image_path, &scan_id)?;

        let layout_xml = self.layout.detect_layout(&image)?;
        self.storage
            .save_xml_intermediate(&layout_xml, &scan_id, "layout")?;
        let page = parse_page_xml(&layout_xml)?;
        if let Some((declared_width, declared_height)) = page.dimensions {
            if (declared_width, declared_height) != (image_width, image_height) {
                warn!(
                    "layout declares {}x{} but scan {} is {}x{}",
                    declared_width, declared_height, scan_id, image_width, image_height
                );
            }
        }
        debug!(
            regions = page.regions.len(),
            lines = page.line_count(),
            "layout detected for scan {}",
            scan_id
        );

        let mut metrics = ErrorMetrics {
            total_lines: page.line_count(),
            ..ErrorMetrics::default()
        };

        // Crop every line rectangle in flat traversal order. Lines with
        // empty or malformed polygons get a zeroed rectangle here and are
        // handled (or isolated) during aggregation.
        let rects: Vec<CropRect> = page
            .regions
            .iter()
            .flat_map(|region| region.lines.iter())
            .map(|line| {
                parse_points_lenient(&line.points)
                    .ok()
                    .and_then(|points| {
                        CropRect::from_polygon(&points, &self.config.crop, image_width, image_height)
                    })
                    .unwrap_or_default()
            })
            .collect();
        let cropping = crop_lines(&image, &rects, self.config.crop.parallel_threshold);
        metrics.failed_crops = cropping.failed_crops;

        let (crop_paths, recognized) =
            self.save_and_recognize(&page, cropping.crops, &scan_id, &mut metrics);

        let region_inputs = build_region_inputs(&page, &crop_paths, &recognized);

        let scan_info = ScanInfo {
            id: scan_id.clone(),
            image_path: image_path.display().to_string(),
            local_path: local_path.display().to_string(),
            dimensions: Dimensions {
                width: image_width,
                height: image_height,
            },
            processing_timestamp: Utc::now(),
        };

        let document = ResultAssembler::new(&self.config).assemble(scan_info, region_inputs)?;
        metrics.failed_regions = document.regions.iter().filter(|r| r.error.is_some()).count();
        if metrics.has_quality_issues() {
            warn!(
                "scan {} has quality issues: {} failed crops, {} failed recognitions, {} failed regions",
                scan_id, metrics.failed_crops, metrics.failed_recognitions, metrics.failed_regions
            );
        }

        self.storage.save_result(&document, &scan_id)?;
        info!(
            "scan {} done: {} regions, {} crops",
            scan_id,
            document.regions.len(),
            document.cropped_images.len()
        );
        Ok(document)
    }

    /// Saves the successful crops and runs recognition over them.
    ///
    /// Returns, per flat line index, the saved crop path (empty when no
    /// crop exists) and the recognized text with its confidence.
    fn save_and_recognize(
        &self,
        page: &LayoutPage,
        crops: Vec<Option<image::RgbImage>>,
        scan_id: &str,
        metrics: &mut ErrorMetrics,
    ) -> (Vec<String>, Vec<(String, f32)>) {
        let mut crop_paths = vec![String::new(); crops.len()];
        let mut batch_indices = Vec::new();

        let mut flat_index = 0;
        for (region_index, region) in page.regions.iter().enumerate() {
            for line_index in 0..region.lines.len() {
                if let Some(crop) = &crops[flat_index] {
                    match self
                        .storage
                        .save_cropped_image(crop, scan_id, region_index, line_index)
                    {
                        Ok(path) => crop_paths[flat_index] = path.display().to_string(),
                        Err(e) => warn!(
                            "failed to save crop for region {} line {}: {}",
                            region_index, line_index, e
                        ),
                    }
                    batch_indices.push(flat_index);
                }
                flat_index += 1;
            }
        }
        // The batch holds the `Some` crops in flat order, matching
        // `batch_indices` one to one.
        let batch: Vec<image::RgbImage> = crops.into_iter().flatten().collect();

        let mut recognized = vec![(String::new(), 0.0f32); crop_paths.len()];
        if !batch.is_empty() {
            match self.recognizer.recognize(&batch) {
                Ok(results) if results.len() == batch.len() => {
                    for (index, result) in batch_indices.iter().zip(results) {
                        recognized[*index] = (result.text, result.confidence);
                    }
                }
                Ok(results) => {
                    metrics.failed_recognitions += batch.len();
                    warn!(
                        "recognizer returned {} results for {} crops; discarding",
                        results.len(),
                        batch.len()
                    );
                }
                Err(e) => {
                    metrics.failed_recognitions += batch.len();
                    warn!("recognition failed for scan {}: {}", scan_id, e);
                }
            }
        }

        (crop_paths, recognized)
    }

    /// Processes every scan image found under `source`, writing one result
    /// JSON per scan into `destination`.
    ///
    /// Scan failures are isolated: a failing scan is logged and skipped,
    /// the rest of the directory still runs. Returns the ids of the scans
    /// that produced a result.
    pub fn process_directory(
        &self,
        source: &Path,
        destination: &Path,
    ) -> PipelineResult<Vec<String>> {
        let image_files = find_image_files(source)?;
        if image_files.is_empty() {
            warn!("no image files found in {}", source.display());
            return Ok(Vec::new());
        }
        fs::create_dir_all(destination)?;

        let mut processed = Vec::new();
        for (index, image_path) in image_files.iter().enumerate() {
            let stem = image_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "scan".to_string());
            let scan_id = sanitize_scan_id(&format!("{}_{:03}", stem, index));

            let result = self.process_scan(image_path, &scan_id).and_then(|document| {
                let out_path = destination.join(format!("{}_result.json", scan_id));
                fs::write(&out_path, serde_json::to_string_pretty(&document)?)?;
                Ok(out_path)
            });
            match result {
                Ok(out_path) => {
                    debug!("wrote {}", out_path.display());
                    processed.push(scan_id);
                }
                Err(e) => warn!("failed to process {}: {}", image_path.display(), e),
            }
        }
        Ok(processed)
    }
}

/// Recursively finds scan images under a directory, sorted by path.
pub fn find_image_files(dir: &Path) -> PipelineResult<Vec<PathBuf>> {
    if !dir.exists() {
        return Err(PipelineError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("source directory does not exist: {}", dir.display()),
        )));
    }

    fn walk(dir: &Path, found: &mut Vec<PathBuf>) -> std::io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                walk(&path, found)?;
            } else {
                let is_image = path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
                    .unwrap_or(false);
                if is_image {
                    found.push(path);
                }
            }
        }
        Ok(())
    }

    let mut found = Vec::new();
    walk(dir, &mut found)?;
    found.sort();
    Ok(found)
}

/// Pairs layout lines with their crop paths and recognition results.
fn build_region_inputs(
    page: &LayoutPage,
    crop_paths: &[String],
    recognized: &[(String, f32)],
) -> Vec<RegionInput> {
    let mut flat_index = 0;
    page.regions
        .iter()
        .map(|region| RegionInput {
            id: region.id.clone(),
            kind: region.kind.clone(),
            lines: region
                .lines
                .iter()
                .map(|line| {
                    let (text, confidence) = recognized[flat_index].clone();
                    let input = LineInput {
                        id: line.id.clone(),
                        points: line.points.clone(),
                        text,
                        confidence,
                        crop_path: crop_paths[flat_index].clone(),
                    };
                    flat_index += 1;
                    input
                })
                .collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::layout::RecognizedLine;
    use image::RgbImage;
    use std::sync::Mutex;

    /// Layout stub returning a fixed PAGE-XML document.
    struct FixedLayout(String);

    impl LayoutDetector for FixedLayout {
        fn detect_layout(&self, _image: &RgbImage) -> PipelineResult<String> {
            Ok(self.0.clone())
        }
    }

    /// Recognizer stub producing texts from a fixed list, in crop order.
    struct ScriptedRecognizer {
        texts: Mutex<Vec<String>>,
    }

    impl ScriptedRecognizer {
        fn new(texts: &[&str]) -> Self {
            Self {
                texts: Mutex::new(texts.iter().map(|t| t.to_string()).collect()),
            }
        }
    }

    impl TextRecognizer for ScriptedRecognizer {
        fn recognize(&self, crops: &[RgbImage]) -> PipelineResult<Vec<RecognizedLine>> {
            let mut texts = self.texts.lock().unwrap();
            Ok(crops
                .iter()
                .map(|_| RecognizedLine {
                    text: if texts.is_empty() {
                        String::new()
                    } else {
                        texts.remove(0)
                    },
                    confidence: 0.95,
                })
                .collect())
        }
    }

    const LAYOUT_XML: &str = r#"<PcGts>
  <Page imageWidth="120" imageHeight="90">
    <TextRegion id="r0" type="paragraph">
      <TextLine id="r0l0"><Coords points="10,10 60,10 60,25 10,25"/></TextLine>
      <TextLine id="r0l1"><Coords points="10,40 60,40 60,55 10,55"/></TextLine>
    </TextRegion>
  </Page>
</PcGts>"#;

    fn pipeline(layout_xml: &str, texts: &[&str], base: &Path) -> ScanPipeline {
        ScanPipeline::new(
            Box::new(FixedLayout(layout_xml.to_string())),
            Box::new(ScriptedRecognizer::new(texts)),
            LocalStorage::new(base).unwrap(),
            PipelineConfig::default(),
        )
        .unwrap()
    }

    fn write_scan_image(dir: &Path) -> PathBuf {
        let path = dir.join("page one.jpg");
        RgbImage::from_pixel(120, 90, image::Rgb([240, 240, 240]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn test_process_scan_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let scan_path = write_scan_image(dir.path());
        let pipeline = pipeline(LAYOUT_XML, &["Выдано", "свидетельство"], dir.path());

        let document = pipeline.process_scan(&scan_path, "Page One").unwrap();

        assert_eq!(document.scan.id, "page_one");
        assert_eq!(document.scan.dimensions.width, 120);
        assert_eq!(document.regions.len(), 1);
        let region = &document.regions[0];
        assert_eq!(region.kind, "paragraph");
        assert_eq!(region.concatenated_text, "Выдано\nсвидетельство");
        assert_eq!(region.lines.len(), 2);
        assert_eq!(region.lines[0].text, "Выдано");
        assert_eq!(region.lines[0].confidence, 0.95);

        // Crops were saved under the deterministic filenames and indexed.
        assert_eq!(document.cropped_images.len(), 2);
        assert_eq!(
            document.cropped_images[0].filename,
            "page_one_region_000_000.jpg"
        );
        assert!(Path::new(&region.lines[0].cropped_image.path).is_file());

        // The result document was persisted.
        let storage = LocalStorage::new(dir.path()).unwrap();
        assert!(storage.load_result("page_one").unwrap().is_some());
        assert!(storage
            .load_xml_intermediate("page_one", "layout")
            .unwrap()
            .is_some());

        let stats = pipeline.stats();
        assert_eq!(stats.total_processed, 1);
        assert_eq!(stats.successful_scans, 1);
    }

    #[test]
    fn test_process_scan_missing_image_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(LAYOUT_XML, &[], dir.path());
        let result = pipeline.process_scan(Path::new("/nonexistent.jpg"), "scan");
        assert!(result.is_err());
        assert_eq!(pipeline.stats().failed_scans, 1);
    }

    #[test]
    fn test_process_directory_isolates_failures() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        let destination = dir.path().join("dest");
        fs::create_dir_all(&source).unwrap();

        write_scan_image(&source);
        // A file with an image extension but undecodable content.
        fs::write(source.join("broken.jpg"), b"not an image").unwrap();

        let pipeline = pipeline(LAYOUT_XML, &["a", "b"], dir.path().join("store").as_path());
        let processed = pipeline.process_directory(&source, &destination).unwrap();

        assert_eq!(processed.len(), 1);
        assert!(destination
            .join(format!("{}_result.json", processed[0]))
            .is_file());
        let stats = pipeline.stats();
        assert_eq!(stats.total_processed, 2);
        assert_eq!(stats.failed_scans, 1);
    }

    #[test]
    fn test_find_image_files_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.jpg"), b"x").unwrap();
        fs::write(dir.path().join("a.PNG"), b"x").unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/c.tif"), b"x").unwrap();

        let files = find_image_files(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(files.len(), 3);
        assert!(names.contains(&"a.PNG".to_string()));
        assert!(!names.contains(&"notes.txt".to_string()));
    }

    #[test]
    fn test_find_image_files_missing_dir_is_error() {
        assert!(find_image_files(Path::new("/does/not/exist")).is_err());
    }

    #[test]
    fn test_recognizer_failure_leaves_lines_empty() {
        struct FailingRecognizer;
        impl TextRecognizer for FailingRecognizer {
            fn recognize(&self, _crops: &[RgbImage]) -> PipelineResult<Vec<RecognizedLine>> {
                Err(PipelineError::processing(
                    crate::core::errors::ProcessingStage::Recognition,
                    "model unavailable",
                    crate::core::errors::SimpleError::new("stub"),
                ))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let scan_path = write_scan_image(dir.path());
        let pipeline = ScanPipeline::new(
            Box::new(FixedLayout(LAYOUT_XML.to_string())),
            Box::new(FailingRecognizer),
            LocalStorage::new(dir.path()).unwrap(),
            PipelineConfig::default(),
        )
        .unwrap();

        // Recognition failure degrades to empty text, it does not abort.
        let document = pipeline.process_scan(&scan_path, "scan_000").unwrap();
        assert_eq!(document.regions[0].concatenated_text, "");
        assert_eq!(document.regions[0].statistics.line_breaks_handled, 2);
        assert_eq!(document.regions[0].lines[0].text, "");
    }
}
