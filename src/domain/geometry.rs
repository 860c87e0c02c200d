//! Geometric primitives for scan coordinates.
//!
//! This module provides the polygon-string parser used for layout `Coords`
//! attributes, the axis-aligned bounding rectangle type, and the padded,
//! image-clamped crop rectangle computed for every text line.

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::core::config::CropConfig;
use crate::core::errors::{PipelineError, PipelineResult};

/// A 2D point in source-image pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X-coordinate of the point.
    pub x: f32,
    /// Y-coordinate of the point.
    pub y: f32,
}

impl Point {
    /// Creates a new point with the given coordinates.
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Parses a whitespace-separated list of `"x,y"` pairs into an ordered
/// sequence of points.
///
/// Fails with [`PipelineError::MalformedCoordinate`] if any token cannot be
/// split into exactly two numeric components, or if the input is empty.
/// Callers with optional coordinate fields should use
/// [`parse_points_lenient`] instead.
pub fn parse_points(input: &str) -> PipelineResult<Vec<Point>> {
    if input.trim().is_empty() {
        return Err(PipelineError::malformed_coordinate(
            "",
            "empty coordinate string",
        ));
    }
    parse_tokens(input)
}

/// Parses a polygon string, returning an empty sequence for empty input.
///
/// Malformed non-empty input still fails.
pub fn parse_points_lenient(input: &str) -> PipelineResult<Vec<Point>> {
    if input.trim().is_empty() {
        return Ok(Vec::new());
    }
    parse_tokens(input)
}

fn parse_tokens(input: &str) -> PipelineResult<Vec<Point>> {
    input
        .split_whitespace()
        .map(|token| {
            let mut parts = token.split(',');
            let (x, y) = match (parts.next(), parts.next(), parts.next()) {
                (Some(x), Some(y), None) => (x, y),
                _ => {
                    return Err(PipelineError::malformed_coordinate(
                        token,
                        "expected exactly two comma-separated components",
                    ));
                }
            };
            let x: f32 = x.parse().map_err(|_| {
                PipelineError::malformed_coordinate(token, "non-numeric x component")
            })?;
            let y: f32 = y.parse().map_err(|_| {
                PipelineError::malformed_coordinate(token, "non-numeric y component")
            })?;
            Ok(Point::new(x, y))
        })
        .collect()
}

/// Serializes points back into the `"x,y x,y ..."` wire form.
///
/// For canonical input this is the exact inverse of [`parse_points`].
pub fn format_points(points: &[Point]) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", p.x, p.y))
        .join(" ")
}

/// The four corner points of an axis-aligned bounding rectangle.
///
/// Downstream consumers render these directly without recomputing corners
/// from the min/max values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CornerPoints {
    /// Corner at (min_x, min_y).
    pub top_left: Point,
    /// Corner at (max_x, min_y).
    pub top_right: Point,
    /// Corner at (min_x, max_y).
    pub bottom_left: Point,
    /// Corner at (max_x, max_y).
    pub bottom_right: Point,
}

/// An axis-aligned bounding rectangle in source-image pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingRect {
    /// Minimum x over the covered points.
    pub min_x: f32,
    /// Maximum x over the covered points.
    pub max_x: f32,
    /// Minimum y over the covered points.
    pub min_y: f32,
    /// Maximum y over the covered points.
    pub max_y: f32,
}

impl BoundingRect {
    /// Computes the bounding rectangle of a set of points.
    ///
    /// Returns `None` for an empty set. A single point yields a zero-area
    /// rectangle, which is valid.
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Point>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut rect = Self {
            min_x: first.x,
            max_x: first.x,
            min_y: first.y,
            max_y: first.y,
        };
        for p in iter {
            rect.min_x = rect.min_x.min(p.x);
            rect.max_x = rect.max_x.max(p.x);
            rect.min_y = rect.min_y.min(p.y);
            rect.max_y = rect.max_y.max(p.y);
        }
        Some(rect)
    }

    /// Returns the all-zero placeholder rectangle.
    ///
    /// Emitted for regions with no polygon points, since upstream layout
    /// detection occasionally produces empty regions.
    pub fn zero() -> Self {
        Self {
            min_x: 0.0,
            max_x: 0.0,
            min_y: 0.0,
            max_y: 0.0,
        }
    }

    /// Width of the rectangle.
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    /// Height of the rectangle.
    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    /// The explicit four-corner structure of this rectangle.
    pub fn corners(&self) -> CornerPoints {
        CornerPoints {
            top_left: Point::new(self.min_x, self.min_y),
            top_right: Point::new(self.max_x, self.min_y),
            bottom_left: Point::new(self.min_x, self.max_y),
            bottom_right: Point::new(self.max_x, self.max_y),
        }
    }
}

/// A padded crop rectangle in scan pixel coordinates.
///
/// The rectangle fully contains its source polygon plus the configured
/// padding and is clipped to the scan bounds. Field order matches the
/// persisted document shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    /// Left edge after padding and clamping.
    pub min_x: u32,
    /// Right edge after padding and clamping.
    pub max_x: u32,
    /// Top edge after padding and clamping.
    pub min_y: u32,
    /// Bottom edge after padding and clamping.
    pub max_y: u32,
    /// `max_x - min_x`.
    pub width: u32,
    /// `max_y - min_y`.
    pub height: u32,
    /// The padding that was applied.
    pub padding: u32,
}

impl CropRect {
    /// Computes the crop rectangle for a line polygon.
    ///
    /// The tight polygon rectangle (or the percentile rectangle when
    /// enabled) is expanded symmetrically by `config.padding` and clamped
    /// to `[0, image_width] x [0, image_height]`. Returns `None` for an
    /// empty polygon.
    pub fn from_polygon(
        points: &[Point],
        config: &CropConfig,
        image_width: u32,
        image_height: u32,
    ) -> Option<Self> {
        if points.is_empty() {
            return None;
        }

        let (mut lo_x, mut hi_x, mut lo_y, mut hi_y) = if config.use_percentile_rect {
            let xs: Vec<f32> = points.iter().map(|p| p.x).collect();
            let ys: Vec<f32> = points.iter().map(|p| p.y).collect();
            let p = config.percentile;
            (
                percentile(&xs, p).ceil() as i64,
                percentile(&xs, 100.0 - p).floor() as i64,
                percentile(&ys, p).ceil() as i64,
                percentile(&ys, 100.0 - p).floor() as i64,
            )
        } else {
            let rect = BoundingRect::from_points(points)?;
            (
                rect.min_x.floor() as i64,
                rect.max_x.ceil() as i64,
                rect.min_y.floor() as i64,
                rect.max_y.ceil() as i64,
            )
        };

        // Very small polygons can invert the percentile rectangle; fall
        // back to the full extent in that case.
        if hi_x < lo_x || hi_y < lo_y {
            let rect = BoundingRect::from_points(points)?;
            lo_x = rect.min_x.floor() as i64;
            hi_x = rect.max_x.ceil() as i64;
            lo_y = rect.min_y.floor() as i64;
            hi_y = rect.max_y.ceil() as i64;
        }

        let padding = config.padding as i64;
        let min_x = (lo_x - padding).clamp(0, image_width as i64) as u32;
        let max_x = (hi_x + padding).clamp(0, image_width as i64) as u32;
        let min_y = (lo_y - padding).clamp(0, image_height as i64) as u32;
        let max_y = (hi_y + padding).clamp(0, image_height as i64) as u32;

        Some(Self {
            min_x,
            max_x,
            min_y,
            max_y,
            width: max_x.saturating_sub(min_x),
            height: max_y.saturating_sub(min_y),
            padding: config.padding,
        })
    }
}

/// Linearly interpolated percentile over a non-empty sample.
///
/// Matches the default interpolation of the original postprocessing tools.
fn percentile(values: &[f32], p: f32) -> f32 {
    debug_assert!(!values.is_empty());
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f32;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let weight = rank - lower as f32;
        sorted[lower] * (1.0 - weight) + sorted[upper] * weight
    }
}
