//! Domain types: geometry, layout input and the assembled document.

pub mod document;
pub mod geometry;
pub mod layout;

pub use document::{
    CroppedImage, CroppedImageRef, Dimensions, Document, DocumentSummary, Line, LineCoordinates,
    NamedEntity, Region, RegionCoordinates, RegionStatistics, ScanInfo, ScanRect,
};
pub use geometry::{
    format_points, parse_points, parse_points_lenient, BoundingRect, CornerPoints, CropRect, Point,
};
pub use layout::{LayoutDetector, LayoutLine, LayoutPage, LayoutRegion, RecognizedLine, TextRecognizer};
