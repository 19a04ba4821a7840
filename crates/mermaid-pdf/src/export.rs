//! Export of normalized diagrams.
//!
//! This module provides the [`DocumentExporter`] trait that turns a
//! [`NormalizedDiagram`] into a downloadable file. It is the final stage of
//! the vector path.
//!
//! # Pipeline Position
//!
//! ```text
//! Diagram Source
//!     ↓ render
//! Rendered Tree (SVG)
//!     ↓ measure (this module)
//! Bounding Box
//!     ↓ normalize
//! Normalized Tree + Page Layout
//!     ↓ compose + export (this module)
//! PDF bytes
//! ```
//!
//! # Available Backends
//!
//! - [`PdfExporter`] - single-page PDF through `usvg` and `svg2pdf`
//! - [`SvgExporter`] - the composed page as SVG text

use std::sync::Arc;

use log::{debug, info, trace};
use svg::node::element::Rectangle;
use thiserror::Error;
use usvg::fontdb;

use mermaid_pdf_core::{
    color::Color,
    geometry::{Bounds, Point, Size},
    normalize::NormalizedDiagram,
    tree::{Element, SVG_NS, XLINK_NS},
};

use crate::config::ExportConfig;

/// Abstraction over export formats.
pub trait DocumentExporter: Send + Sync {
    /// MIME type of the produced bytes.
    fn content_type(&self) -> &'static str;

    /// File extension of the produced file, without the dot.
    fn extension(&self) -> &'static str;

    /// Exports a normalized diagram.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError`] if the composed page cannot be converted.
    fn export(&self, diagram: &NormalizedDiagram) -> Result<Vec<u8>, ExportError>;
}

/// Errors that can occur while measuring or exporting a diagram.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The vector renderer could not read the SVG.
    #[error("Failed to parse SVG for export: {0}")]
    Parse(#[from] usvg::Error),

    /// The PDF converter rejected the tree.
    #[error("PDF conversion failed: {0}")]
    Convert(String),

    #[error("Invalid export settings: {0}")]
    Settings(String),
}

/// Composes the export page: an outer `<svg>` of page size with an optional
/// background, and the diagram placed at the margin, sized to its bounding box.
///
/// Overflow stays visible so strokes extending past the measured box are not
/// clipped.
pub fn compose(diagram: &NormalizedDiagram, background: Option<&Color>) -> svg::Document {
    let page = diagram.page();
    let size = page.size();
    let bbox = page.content();
    let origin = page.content_origin();

    let mut document = svg::Document::new()
        .set("xmlns", SVG_NS)
        .set("xmlns:xlink", XLINK_NS)
        .set("width", size.width())
        .set("height", size.height())
        .set("viewBox", (0.0, 0.0, size.width(), size.height()));

    if let Some(background) = background {
        document = document.add(
            Rectangle::new()
                .set("x", 0)
                .set("y", 0)
                .set("width", size.width())
                .set("height", size.height())
                .set("fill", background),
        );
    }

    let mut content = diagram.root().clone();
    content.set_attribute("x", origin.x().to_string());
    content.set_attribute("y", origin.y().to_string());
    content.set_attribute("width", bbox.width().to_string());
    content.set_attribute("height", bbox.height().to_string());
    content.set_attribute("viewBox", view_box(bbox));
    content.set_attribute("overflow", "visible");
    content.remove_attribute("preserveAspectRatio");

    trace!(page:? = size, bbox:? = bbox; "Composed export page");
    document.add(content.to_svg_node())
}

fn view_box(bounds: Bounds) -> String {
    format!(
        "{} {} {} {}",
        bounds.min_x(),
        bounds.min_y(),
        bounds.width(),
        bounds.height()
    )
}

/// Parses the numbers of a `viewBox` attribute.
fn parse_view_box(value: &str) -> Option<Bounds> {
    let numbers: Vec<f32> = value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;
    match numbers.as_slice() {
        &[x, y, width, height] if width >= 0.0 && height >= 0.0 => Some(
            Bounds::new_from_top_left(Point::new(x, y), Size::new(width, height)),
        ),
        _ => None,
    }
}

/// Converts the composed page into a single-page PDF.
///
/// One SVG user unit becomes one PDF point. Text is drawn with the system
/// fonts plus any configured font directories.
#[derive(Clone)]
pub struct PdfExporter {
    fontdb: Arc<fontdb::Database>,
    background: Option<Color>,
}

impl std::fmt::Debug for PdfExporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfExporter")
            .field("font_faces", &self.fontdb.len())
            .field("background", &self.background)
            .finish()
    }
}

impl PdfExporter {
    /// Creates an exporter, loading fonts once.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Settings`] if the background color is invalid.
    pub fn new(config: &ExportConfig) -> Result<Self, ExportError> {
        let background = config.background_color().map_err(ExportError::Settings)?;

        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        for dir in config.font_dirs() {
            db.load_fonts_dir(dir);
        }
        debug!(faces = db.len(); "Loaded font faces");

        Ok(Self {
            fontdb: Arc::new(db),
            background,
        })
    }

    fn options(&self) -> usvg::Options<'static> {
        usvg::Options {
            fontdb: Arc::clone(&self.fontdb),
            ..usvg::Options::default()
        }
    }

    /// Measures the visible bounding box of a rendered diagram in its own
    /// user space.
    ///
    /// The root viewport is pinned to the `viewBox` size, so responsive
    /// widths (`width="100%"`) do not scale the result. Without a `viewBox`
    /// the document is measured as is. When nothing visible is found the
    /// `viewBox` itself is used.
    ///
    /// # Errors
    ///
    /// Returns [`ExportError::Parse`] if the document cannot be read.
    pub fn measure(&self, document: &roxmltree::Document<'_>) -> Result<Bounds, ExportError> {
        let mut root = Element::from_xml(document.root_element());
        let view_box = root.attribute("viewBox").and_then(parse_view_box);
        if let Some(view_box) = view_box {
            root.set_attribute("width", view_box.width().to_string());
            root.set_attribute("height", view_box.height().to_string());
        }

        let tree = usvg::Tree::from_str(&root.to_document_string(), &self.options())?;
        let rect = tree.root().abs_bounding_box();
        let measured = Bounds::new_from_top_left(
            Point::new(rect.x(), rect.y()),
            Size::new(rect.width(), rect.height()),
        );

        // Canvas coordinates start at the viewBox origin.
        let origin = view_box.map(Bounds::min_point).unwrap_or_default();
        let bbox = if measured.to_size().is_zero() {
            view_box.unwrap_or(measured)
        } else {
            measured.translate(origin)
        };

        debug!(
            x = bbox.min_x(),
            y = bbox.min_y(),
            width = bbox.width(),
            height = bbox.height();
            "Measured diagram bounding box"
        );
        Ok(bbox)
    }
}

impl DocumentExporter for PdfExporter {
    fn content_type(&self) -> &'static str {
        "application/pdf"
    }

    fn extension(&self) -> &'static str {
        "pdf"
    }

    fn export(&self, diagram: &NormalizedDiagram) -> Result<Vec<u8>, ExportError> {
        let page = compose(diagram, self.background.as_ref()).to_string();
        let tree = usvg::Tree::from_str(&page, &self.options())?;

        let pdf = svg2pdf::to_pdf(
            &tree,
            svg2pdf::ConversionOptions::default(),
            svg2pdf::PageOptions::default(),
        )
        .map_err(|err| ExportError::Convert(err.to_string()))?;

        info!(
            bytes = pdf.len(),
            orientation:% = diagram.page().orientation();
            "Exported PDF"
        );
        Ok(pdf)
    }
}

/// Writes the composed page as SVG text.
#[derive(Debug, Clone, Default)]
pub struct SvgExporter {
    background: Option<Color>,
}

impl SvgExporter {
    pub fn new(background: Option<Color>) -> Self {
        Self { background }
    }
}

impl DocumentExporter for SvgExporter {
    fn content_type(&self) -> &'static str {
        "image/svg+xml"
    }

    fn extension(&self) -> &'static str {
        "svg"
    }

    fn export(&self, diagram: &NormalizedDiagram) -> Result<Vec<u8>, ExportError> {
        Ok(compose(diagram, self.background.as_ref())
            .to_string()
            .into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;

    use mermaid_pdf_core::{normalize::Normalizer, tree::parse_document};

    use super::*;

    const BOXES: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="100%" viewBox="-8 -8 216 116" style="max-width: 216px">
        <rect x="0" y="0" width="200" height="100" fill="white" stroke="black" stroke-width="0"/>
    </svg>"#;

    fn exporter() -> PdfExporter {
        PdfExporter::new(&ExportConfig::default()).unwrap()
    }

    #[test]
    fn test_parse_view_box() {
        let bounds = parse_view_box("-8 -8 216,116").unwrap();
        assert_eq!(bounds.min_point(), Point::new(-8.0, -8.0));
        assert_eq!(bounds.to_size(), Size::new(216.0, 116.0));
        assert!(parse_view_box("0 0 10").is_none());
        assert!(parse_view_box("a b c d").is_none());
    }

    #[test]
    fn test_measure_returns_user_space_bounds() {
        let document = parse_document(BOXES).unwrap();
        let bbox = exporter().measure(&document).unwrap();

        assert_approx_eq!(f32, bbox.min_x(), 0.0, epsilon = 1e-3);
        assert_approx_eq!(f32, bbox.min_y(), 0.0, epsilon = 1e-3);
        assert_approx_eq!(f32, bbox.width(), 200.0, epsilon = 1e-3);
        assert_approx_eq!(f32, bbox.height(), 100.0, epsilon = 1e-3);
    }

    #[test]
    fn test_measure_empty_document_falls_back_to_view_box() {
        let document =
            parse_document(r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 50 30"/>"#)
                .unwrap();
        let bbox = exporter().measure(&document).unwrap();
        assert_eq!(bbox.to_size(), Size::new(50.0, 30.0));
    }

    #[test]
    fn test_compose_places_content_at_margin() {
        let document = parse_document(BOXES).unwrap();
        let bbox = Bounds::new_from_top_left(Point::default(), Size::new(200.0, 100.0));
        let diagram = Normalizer::default().normalize(&document, bbox).unwrap();

        let page = compose(&diagram, None).to_string();
        let parsed = parse_document(&page).unwrap();
        let root = parsed.root_element();
        assert_eq!(root.attribute("width"), Some("240"));
        assert_eq!(root.attribute("height"), Some("140"));

        let nested = root.first_element_child().unwrap();
        assert_eq!(nested.tag_name().name(), "svg");
        assert_eq!(nested.attribute("x"), Some("20"));
        assert_eq!(nested.attribute("y"), Some("20"));
        assert_eq!(nested.attribute("width"), Some("200"));
        assert_eq!(nested.attribute("viewBox"), Some("0 0 200 100"));
        assert_eq!(nested.attribute("overflow"), Some("visible"));
    }

    #[test]
    fn test_compose_background() {
        let document = parse_document(BOXES).unwrap();
        let diagram = Normalizer::default()
            .normalize(&document, Bounds::default())
            .unwrap();
        let background = Color::new("white").unwrap();

        let page = compose(&diagram, Some(&background)).to_string();
        let parsed = parse_document(&page).unwrap();
        let first = parsed.root_element().first_element_child().unwrap();
        assert_eq!(first.tag_name().name(), "rect");
        assert!(first.attribute("fill").is_some());
    }

    #[test]
    fn test_pdf_export() {
        let document = parse_document(BOXES).unwrap();
        let exporter = exporter();
        let bbox = exporter.measure(&document).unwrap();
        let diagram = Normalizer::default().normalize(&document, bbox).unwrap();

        let pdf = exporter.export(&diagram).unwrap();
        assert!(pdf.starts_with(b"%PDF"));
        assert_eq!(exporter.content_type(), "application/pdf");
    }

    #[test]
    fn test_svg_export_is_parseable() {
        let document = parse_document(BOXES).unwrap();
        let diagram = Normalizer::default()
            .normalize(&document, Bounds::default())
            .unwrap();

        let bytes = SvgExporter::default().export(&diagram).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(parse_document(&text).is_ok());
    }

    #[test]
    fn test_invalid_background_is_rejected() {
        let config: ExportConfig =
            serde_json::from_value(serde_json::json!({ "background_color": "nope" })).unwrap();
        assert!(matches!(
            PdfExporter::new(&config),
            Err(ExportError::Settings(_))
        ));
    }
}
