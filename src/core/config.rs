//! Configuration for scan processing.
//!
//! Provides the serde-backed configuration structs for cropping, text
//! concatenation and assembly, together with a validation trait shared by
//! all of them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error indicating that a configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// A message describing the problem.
        message: String,
    },
}

/// A trait for validating configuration parameters.
///
/// Mirrors the lifecycle used throughout the pipeline: configs are built
/// (possibly from JSON), validated once, then treated as immutable.
pub trait ConfigValidator {
    /// Validates the configuration.
    fn validate(&self) -> Result<(), ConfigError>;

    /// Returns the default configuration.
    fn get_defaults() -> Self
    where
        Self: Sized;

    /// Validates that a usize value is greater than zero.
    fn validate_positive_usize(&self, value: usize, field_name: &str) -> Result<(), ConfigError> {
        if value == 0 {
            Err(ConfigError::InvalidConfig {
                message: format!("{} must be greater than 0, got {}", field_name, value),
            })
        } else {
            Ok(())
        }
    }

    /// Validates that a float value is within the given inclusive range.
    fn validate_f32_range(
        &self,
        value: f32,
        min: f32,
        max: f32,
        field_name: &str,
    ) -> Result<(), ConfigError> {
        if value < min || value > max {
            Err(ConfigError::InvalidConfig {
                message: format!(
                    "{} must be between {} and {}, got {}",
                    field_name, min, max, value
                ),
            })
        } else {
            Ok(())
        }
    }
}

fn default_crop_padding() -> u32 {
    5
}

fn default_percentile() -> f32 {
    10.0
}

fn default_parallel_threshold() -> usize {
    10
}

/// Configuration for per-line crop rectangles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CropConfig {
    /// Symmetric padding in pixels added around the tight polygon rectangle.
    #[serde(default = "default_crop_padding")]
    pub padding: u32,
    /// Use the percentile rectangle instead of the full min/max extent.
    ///
    /// The percentile rectangle trims polygon outliers (stray mask pixels
    /// from layout detection) by taking the p-th and (100-p)-th percentile
    /// of the coordinates before padding.
    #[serde(default)]
    pub use_percentile_rect: bool,
    /// Lower percentile used when `use_percentile_rect` is set.
    #[serde(default = "default_percentile")]
    pub percentile: f32,
    /// Number of lines above which cropping runs in parallel.
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            padding: default_crop_padding(),
            use_percentile_rect: false,
            percentile: default_percentile(),
            parallel_threshold: default_parallel_threshold(),
        }
    }
}

impl ConfigValidator for CropConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.validate_f32_range(self.percentile, 0.0, 50.0, "percentile")?;
        self.validate_positive_usize(self.parallel_threshold, "parallel_threshold")?;
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

fn default_delimiter() -> String {
    "\n".to_string()
}

/// Configuration for region-level text concatenation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcatConfig {
    /// Delimiter placed between included line texts.
    #[serde(default = "default_delimiter")]
    pub delimiter: String,
}

impl Default for ConcatConfig {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
        }
    }
}

impl ConfigValidator for ConcatConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        // Any delimiter is accepted, including the empty string.
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

fn default_region_padding() -> u32 {
    10
}

/// Top-level configuration for the digitization pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Per-line crop rectangle settings.
    #[serde(default)]
    pub crop: CropConfig,
    /// Text concatenation settings.
    #[serde(default)]
    pub concat: ConcatConfig,
    /// Padding value recorded in region coordinates.
    ///
    /// The region bounding rectangle itself is always the exact union of
    /// the line polygon extents; this value is carried as metadata for
    /// downstream renderers.
    #[serde(default = "default_region_padding")]
    pub region_padding: u32,
    /// Abort assembly with `EmptyLayout` when the layout has no regions.
    #[serde(default)]
    pub require_regions: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            crop: CropConfig::default(),
            concat: ConcatConfig::default(),
            region_padding: default_region_padding(),
            require_regions: false,
        }
    }
}

impl ConfigValidator for PipelineConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.crop.validate()?;
        self.concat.validate()?;
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(PipelineConfig::get_defaults().validate().is_ok());
    }

    #[test]
    fn test_default_values() {
        let config = PipelineConfig::get_defaults();
        assert_eq!(config.crop.padding, 5);
        assert_eq!(config.region_padding, 10);
        assert_eq!(config.concat.delimiter, "\n");
        assert!(!config.require_regions);
    }

    #[test]
    fn test_invalid_percentile_rejected() {
        let config = CropConfig {
            percentile: 75.0,
            ..CropConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_parallel_threshold_rejected() {
        let config = CropConfig {
            parallel_threshold: 0,
            ..CropConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = PipelineConfig::get_defaults();
        let serialized = serde_json::to_string(&config).unwrap();
        let deserialized: PipelineConfig = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized.crop.padding, config.crop.padding);
        assert_eq!(deserialized.concat.delimiter, config.concat.delimiter);
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config: PipelineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.crop.padding, 5);
        assert_eq!(config.concat.delimiter, "\n");
    }
}
