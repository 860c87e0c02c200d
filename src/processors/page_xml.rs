//! PAGE-XML layout reader.
//!
//! Parses the XML emitted by the layout-detection model into the
//! structured [`LayoutPage`] the pipeline consumes. Only the elements the
//! pipeline needs are read: `Page` dimensions, `TextRegion`, `TextLine`
//! and line `Coords`. Namespace prefixes are ignored via local names.

use once_cell::sync::Lazy;
use quick_xml::events::BytesStart;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;

use crate::core::errors::{PipelineError, PipelineResult};
use crate::domain::layout::{LayoutLine, LayoutPage, LayoutRegion};

/// Matches the `structure {...type:paragraph;...}` annotation some layout
/// models place in the `custom` attribute instead of a `type` attribute.
static STRUCTURE_TYPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"structure\s*\{[^}]*type:([^;}]+)").unwrap());

/// Parses a PAGE-XML document into a [`LayoutPage`].
///
/// Region and line order follow document order, which is the top-to-bottom
/// order produced by layout detection. Lines without a `Coords` element
/// keep an empty polygon string.
pub fn parse_page_xml(xml: &str) -> PipelineResult<LayoutPage> {
    let mut reader = Reader::from_str(xml);
    let mut page = LayoutPage::default();
    let mut current_region: Option<LayoutRegion> = None;
    let mut current_line: Option<LayoutLine> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                open_element(&e, &mut page, &mut current_region, &mut current_line)?;
            }
            Ok(Event::Empty(e)) => {
                // Self-closing elements open and close in one event.
                open_element(&e, &mut page, &mut current_region, &mut current_line)?;
                close_element(
                    e.local_name().as_ref(),
                    &mut page,
                    &mut current_region,
                    &mut current_line,
                );
            }
            Ok(Event::End(e)) => {
                close_element(
                    e.local_name().as_ref(),
                    &mut page,
                    &mut current_region,
                    &mut current_line,
                );
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(PipelineError::xml(e)),
            _ => {}
        }
    }

    Ok(page)
}

fn open_element(
    e: &BytesStart<'_>,
    page: &mut LayoutPage,
    current_region: &mut Option<LayoutRegion>,
    current_line: &mut Option<LayoutLine>,
) -> PipelineResult<()> {
    match e.local_name().as_ref() {
        b"Page" => {
            let width = attr_value(e, b"imageWidth")?.and_then(|v| v.parse().ok());
            let height = attr_value(e, b"imageHeight")?.and_then(|v| v.parse().ok());
            if let (Some(width), Some(height)) = (width, height) {
                page.dimensions = Some((width, height));
            }
        }
        b"TextRegion" => {
            let id = attr_value(e, b"id")?.unwrap_or_default();
            let kind = region_type(e)?;
            *current_region = Some(LayoutRegion {
                id,
                kind,
                lines: Vec::new(),
            });
        }
        b"TextLine" => {
            let id = attr_value(e, b"id")?.unwrap_or_default();
            *current_line = Some(LayoutLine {
                id,
                points: String::new(),
            });
        }
        b"Coords" => {
            // Region outlines also carry Coords; only line-level polygons
            // are consumed here.
            if let Some(line) = current_line.as_mut() {
                if let Some(points) = attr_value(e, b"points")? {
                    line.points = points;
                }
            }
        }
        _ => {}
    }
    Ok(())
}

fn close_element(
    local_name: &[u8],
    page: &mut LayoutPage,
    current_region: &mut Option<LayoutRegion>,
    current_line: &mut Option<LayoutLine>,
) {
    match local_name {
        b"TextLine" => {
            if let (Some(region), Some(line)) = (current_region.as_mut(), current_line.take()) {
                region.lines.push(line);
            }
        }
        b"TextRegion" => {
            if let Some(region) = current_region.take() {
                page.regions.push(region);
            }
        }
        _ => {}
    }
}

/// Reads an attribute by local name, unescaping its value.
fn attr_value(element: &BytesStart<'_>, name: &[u8]) -> PipelineResult<Option<String>> {
    for attr in element.attributes() {
        let attr = attr.map_err(PipelineError::xml)?;
        if attr.key.local_name().as_ref() == name {
            let value = attr.unescape_value().map_err(PipelineError::xml)?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Resolves the region type label.
///
/// Prefers the `type` attribute, then the `structure {type:...}` custom
/// annotation; regions without either get an empty label.
fn region_type(element: &BytesStart<'_>) -> PipelineResult<String> {
    if let Some(kind) = attr_value(element, b"type")? {
        return Ok(kind);
    }
    if let Some(custom) = attr_value(element, b"custom")? {
        if let Some(captures) = STRUCTURE_TYPE_RE.captures(&custom) {
            return Ok(captures[1].trim().to_string());
        }
    }
    Ok(String::new())
}
