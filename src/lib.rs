//! # Registry OCR
//!
//! A Rust library for digitizing scanned handwritten registry pages. It
//! turns layout-detection output (region and line polygons) plus per-line
//! OCR output (text and confidence) into a hierarchical
//! scan -> region -> line -> crop JSON document that a human reviewer can
//! correct and a report generator can consume.
//!
//! ## Features
//!
//! - Polygon-string parsing and bounding-rectangle aggregation
//! - Padded, image-clamped crop rectangles per text line
//! - Region-level text concatenation with noise-line filtering
//! - Deterministic crop filenames and a flat crop index
//! - Best-effort assembly: failing regions are isolated, not fatal
//! - Local storage of scans, crops, intermediate XML and result JSON
//! - Directory-level batch processing with per-scan failure isolation
//!
//! Model inference is out of scope: layout detection and text recognition
//! are reached through the [`domain::layout::LayoutDetector`] and
//! [`domain::layout::TextRecognizer`] seams.
//!
//! ## Modules
//!
//! * [`core`] - Error handling, configuration and statistics
//! * [`domain`] - Geometry, layout input and the assembled document
//! * [`processors`] - Text concatenation and PAGE-XML parsing
//! * [`pipeline`] - Aggregation, cropping, assembly and orchestration
//! * [`storage`] - Local artifact storage with an injected base path
//! * [`utils`] - Image loading helpers
//!
//! ## Quick Start
//!
//! Aggregating one region from recognized lines:
//!
//! ```rust
//! use registry_ocr::core::PipelineConfig;
//! use registry_ocr::pipeline::{aggregate_region, LineInput};
//!
//! # fn main() -> Result<(), registry_ocr::core::PipelineError> {
//! let lines = vec![LineInput {
//!     id: "l0".to_string(),
//!     points: "10,10 20,10 20,20 10,20".to_string(),
//!     text: "Выдано".to_string(),
//!     confidence: 0.998,
//!     crop_path: String::new(),
//! }];
//!
//! let aggregate = aggregate_region("r0", &lines, &PipelineConfig::default(), 1000, 1000)?;
//! assert_eq!(aggregate.concatenated_text, "Выдано");
//! assert_eq!(aggregate.coordinates.min_x, 10.0);
//! assert_eq!(aggregate.coordinates.max_x, 20.0);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod domain;
pub mod pipeline;
pub mod processors;
pub mod storage;
pub mod utils;

/// Prelude module for convenient imports.
///
/// Bring the essentials into scope with a single use statement:
///
/// ```rust
/// use registry_ocr::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::{PipelineConfig, PipelineError, PipelineResult};
    pub use crate::domain::{Document, LayoutDetector, LayoutPage, TextRecognizer};
    pub use crate::pipeline::{crop_filename, ResultAssembler, ScanPipeline};
    pub use crate::processors::parse_page_xml;
    pub use crate::storage::LocalStorage;
    pub use crate::utils::load_image;
}
