//! Error types for the digitization pipeline.
//!
//! This module defines the errors that can occur while turning layout and
//! recognition output into the final scan document, along with helper
//! constructors for attaching context to wrapped errors.

use thiserror::Error;

/// Enum representing different stages of scan processing.
///
/// Used to identify which stage of the pipeline an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProcessingStage {
    /// Error occurred while parsing layout input.
    LayoutParsing,
    /// Error occurred while cropping line images.
    Cropping,
    /// Error occurred while recognizing line text.
    Recognition,
    /// Error occurred while aggregating a region.
    Aggregation,
    /// Error occurred while assembling the result document.
    Assembly,
    /// Error occurred while persisting artifacts.
    Storage,
}

impl std::fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingStage::LayoutParsing => write!(f, "layout parsing"),
            ProcessingStage::Cropping => write!(f, "cropping"),
            ProcessingStage::Recognition => write!(f, "recognition"),
            ProcessingStage::Aggregation => write!(f, "aggregation"),
            ProcessingStage::Assembly => write!(f, "assembly"),
            ProcessingStage::Storage => write!(f, "storage"),
        }
    }
}

/// Enum representing the errors that can occur in the digitization pipeline.
///
/// Per-line and per-region failures are generally isolated by the callers
/// (the failing region is emitted with an error marker); only structural
/// failures abort processing of a whole scan.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A polygon token could not be parsed into an `x,y` pair.
    #[error("malformed coordinate token '{token}': {reason}")]
    MalformedCoordinate {
        /// The offending token (empty string for empty input).
        token: String,
        /// Why the token was rejected.
        reason: String,
    },

    /// Aggregating one region failed. Non-fatal to the scan.
    #[error("aggregation of region '{region_id}' failed: {context}")]
    RegionAggregation {
        /// Identifier of the failing region.
        region_id: String,
        /// Additional context about the failure.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A line was expected to have a saved crop but none was found.
    #[error("line '{line_id}' in region '{region_id}' has no saved crop")]
    MissingCropReference {
        /// Identifier of the owning region.
        region_id: String,
        /// Identifier of the line.
        line_id: String,
    },

    /// The layout contained no regions although regions were required.
    #[error("layout for scan '{scan_id}' contains no regions")]
    EmptyLayout {
        /// Identifier of the scan.
        scan_id: String,
    },

    /// A review edit referenced a region id not present in the document.
    #[error("unknown region id '{region_id}'")]
    UnknownRegion {
        /// The region id that was not found.
        region_id: String,
    },

    /// A review edit referenced a line id not present in its region.
    #[error("unknown line id '{line_id}' in region '{region_id}'")]
    UnknownLine {
        /// Identifier of the owning region.
        region_id: String,
        /// The line id that was not found.
        line_id: String,
    },

    /// Error occurred during processing.
    #[error("{stage} failed: {context}")]
    Processing {
        /// The stage of processing where the error occurred.
        stage: ProcessingStage,
        /// Additional context about the error.
        context: String,
        /// The underlying error that caused this error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Error occurred while loading an image.
    #[error("image load")]
    ImageLoad(#[source] image::ImageError),

    /// Error occurred while saving an image.
    #[error("image save")]
    ImageSave(#[source] image::ImageError),

    /// Error from the layout XML reader.
    #[error("layout xml: {message}")]
    Xml {
        /// A message describing the XML error.
        message: String,
    },

    /// Error serializing or deserializing the result document.
    #[error("result document")]
    Json(#[from] serde_json::Error),

    /// Error indicating a configuration problem.
    #[error("configuration: {message}")]
    Config {
        /// A message describing the configuration error.
        message: String,
    },

    /// IO error.
    #[error("io")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Creates a PipelineError for an unparsable coordinate token.
    pub fn malformed_coordinate(token: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedCoordinate {
            token: token.into(),
            reason: reason.into(),
        }
    }

    /// Wraps an error into a non-fatal per-region aggregation failure.
    pub fn region_aggregation(
        region_id: impl Into<String>,
        context: impl Into<String>,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::RegionAggregation {
            region_id: region_id.into(),
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates a PipelineError for a processing stage failure.
    pub fn processing(
        stage: ProcessingStage,
        context: impl Into<String>,
        error: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Processing {
            stage,
            context: context.into(),
            source: Box::new(error),
        }
    }

    /// Creates a PipelineError from a layout XML reader error.
    pub fn xml(error: impl std::fmt::Display) -> Self {
        Self::Xml {
            message: error.to_string(),
        }
    }

    /// Creates a PipelineError for configuration errors.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl From<image::ImageError> for PipelineError {
    fn from(error: image::ImageError) -> Self {
        Self::ImageLoad(error)
    }
}

impl From<crate::core::config::ConfigError> for PipelineError {
    fn from(error: crate::core::config::ConfigError) -> Self {
        Self::Config {
            message: error.to_string(),
        }
    }
}

/// A plain message error, used as the source of wrapped pipeline errors
/// when no richer error type is available.
#[derive(Debug)]
pub struct SimpleError {
    message: String,
}

impl SimpleError {
    /// Creates a new SimpleError with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SimpleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SimpleError {}

/// Convenient result alias for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
