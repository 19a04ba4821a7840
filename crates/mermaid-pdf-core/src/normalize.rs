//! The SVG export normalizer.
//!
//! Vector-to-PDF converters render SVG without a browser: they do not lay out
//! HTML inside `<foreignObject>` and do not see styles a browser would compute
//! from the page. [`Normalizer::normalize`] produces a detached copy of a
//! rendered diagram that such a converter draws the same way a browser does:
//!
//! 1. Every `<foreignObject>` is replaced by a centered `<text>` carrying its
//!    text, position, font size, font family and color, or dropped when it
//!    holds only whitespace.
//! 2. Every other element gets its computed visual style written out as
//!    presentation attributes.
//!
//! The source document is never modified. Styles are resolved from it up front
//! into [`StyleSnapshots`] and looked up by the path of the element each copy
//! came from, so replacing or removing a node cannot shift the styles applied
//! to its siblings.

use log::{debug, trace};

use crate::{
    Error,
    color::Color,
    geometry::{Bounds, DEFAULT_PAGE_MARGIN, PageLayout},
    style::{ComputedStyle, Property, StyleSnapshots, parse_px},
    tree::{Element, Node, NodePath},
};

const RICH_TEXT_CONTAINER: &str = "foreignObject";
const STYLED_CHILDREN: [&str; 3] = ["div", "span", "p"];

/// Fallback box of a rich-text container without explicit geometry.
const DEFAULT_BOX: (f32, f32, f32, f32) = (0.0, 0.0, 100.0, 20.0);

/// Text style used for a rich-text label that has no styled HTML child.
#[derive(Debug, Clone, PartialEq)]
pub struct RichTextDefaults {
    font_size: f32,
    font_family: String,
    color: String,
}

impl RichTextDefaults {
    pub fn new(font_size: f32, font_family: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            font_size,
            font_family: font_family.into(),
            color: color.into(),
        }
    }

    pub fn font_size(&self) -> f32 {
        self.font_size
    }

    pub fn font_family(&self) -> &str {
        &self.font_family
    }

    pub fn color(&self) -> &str {
        &self.color
    }
}

impl Default for RichTextDefaults {
    fn default() -> Self {
        Self::new(14.0, "arial, sans-serif", "#333333")
    }
}

/// Result of normalizing a rendered diagram.
#[derive(Debug, Clone)]
pub struct NormalizedDiagram {
    root: Element,
    page: PageLayout,
    replaced: usize,
    removed: usize,
}

impl NormalizedDiagram {
    /// The normalized `<svg>` root.
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// The page the diagram is exported onto.
    pub fn page(&self) -> PageLayout {
        self.page
    }

    /// Number of rich-text containers replaced by text.
    pub fn replaced(&self) -> usize {
        self.replaced
    }

    /// Number of empty rich-text containers dropped.
    pub fn removed(&self) -> usize {
        self.removed
    }

    pub fn into_parts(self) -> (Element, PageLayout) {
        (self.root, self.page)
    }
}

/// Turns a browser-styled rendered diagram into a self-contained SVG tree.
///
/// # Examples
///
/// ```
/// # use mermaid_pdf_core::{geometry::{Bounds, Point, Size}, normalize::Normalizer, tree::parse_document};
/// let svg = r#"<svg xmlns="http://www.w3.org/2000/svg">
///     <foreignObject x="10" y="10" width="100" height="20">
///         <div xmlns="http://www.w3.org/1999/xhtml">Start</div>
///     </foreignObject>
/// </svg>"#;
/// let document = parse_document(svg).unwrap();
/// let bbox = Bounds::new_from_top_left(Point::new(0.0, 0.0), Size::new(120.0, 40.0));
///
/// let diagram = Normalizer::default().normalize(&document, bbox).unwrap();
///
/// assert_eq!(diagram.root().count_named("foreignObject"), 0);
/// assert_eq!(diagram.root().count_named("text"), 1);
/// assert_eq!(diagram.page().size(), Size::new(160.0, 80.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Normalizer {
    margin: f32,
    rich_text: RichTextDefaults,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_MARGIN)
    }
}

impl Normalizer {
    pub fn new(margin: f32) -> Self {
        Self {
            margin,
            rich_text: RichTextDefaults::default(),
        }
    }

    /// Sets the text style used for labels without a styled HTML child.
    pub fn with_rich_text_defaults(mut self, defaults: RichTextDefaults) -> Self {
        self.rich_text = defaults;
        self
    }

    pub fn margin(&self) -> f32 {
        self.margin
    }

    /// Normalizes `document`, whose visible content spans `bbox`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSvg`] if the document root is not an `<svg>` element.
    pub fn normalize(
        &self,
        document: &roxmltree::Document<'_>,
        bbox: Bounds,
    ) -> Result<NormalizedDiagram, Error> {
        let source = document.root_element();
        if !source.has_tag_name("svg") {
            return Err(Error::NotSvg(source.tag_name().name().to_string()));
        }

        let snapshots = StyleSnapshots::capture(document);
        let mut root = Element::from_xml(source);

        let mut pass = Pass {
            normalizer: self,
            snapshots: &snapshots,
            replaced: 0,
            removed: 0,
        };
        pass.visit(&mut root, &NodePath::root(), None);
        let (replaced, removed) = (pass.replaced, pass.removed);

        debug!(
            elements = snapshots.len(),
            replaced,
            removed;
            "Normalized rendered diagram"
        );

        Ok(NormalizedDiagram {
            root,
            page: PageLayout::fit(bbox, self.margin),
            replaced,
            removed,
        })
    }

    /// Builds the `<text>` that stands in for a rich-text container, or `None`
    /// if the container holds no visible text.
    fn replace_rich_text(
        &self,
        container: &Element,
        path: &NodePath,
        snapshots: &StyleSnapshots,
    ) -> Option<Element> {
        let content = container.text_content();
        let content = content.trim();
        if content.is_empty() {
            trace!(path:% = path; "Dropping empty rich-text container");
            return None;
        }

        let (default_x, default_y, default_width, default_height) = DEFAULT_BOX;
        let x = number_attribute(container, "x").unwrap_or(default_x);
        let y = number_attribute(container, "y").unwrap_or(default_y);
        let width = number_attribute(container, "width").unwrap_or(default_width);
        let height = number_attribute(container, "height").unwrap_or(default_height);

        let styled = container
            .find_descendant(|e| STYLED_CHILDREN.contains(&e.name()))
            .and_then(|(relative, _)| snapshots.get(&path.join(&relative)));

        let font_size = styled
            .and_then(ComputedStyle::font_size_px)
            .filter(|size| size.is_finite() && *size > 0.0)
            .unwrap_or(self.rich_text.font_size);
        let font_family = styled
            .map(|style| style.get(Property::FontFamily))
            .filter(|family| !family.trim().is_empty())
            .unwrap_or(&self.rich_text.font_family);
        let fill = styled
            .map(|style| style.get(Property::Color))
            .filter(|color| Color::is_valid(color))
            .unwrap_or(&self.rich_text.color);

        let mut text = Element::new("text");
        text.set_attribute("x", (x + width / 2.0).to_string());
        text.set_attribute("y", (y + height / 2.0 + font_size / 3.0).to_string());
        text.set_attribute("text-anchor", "middle");
        text.set_attribute("dominant-baseline", "middle");
        text.set_attribute("font-size", font_size.to_string());
        text.set_attribute("font-family", font_family);
        text.set_attribute("fill", fill);
        text.push_text(content);

        trace!(path:% = path, text = content; "Replaced rich-text container");
        Some(text)
    }
}

/// A single walk over the copied tree.
struct Pass<'a> {
    normalizer: &'a Normalizer,
    snapshots: &'a StyleSnapshots,
    replaced: usize,
    removed: usize,
}

impl Pass<'_> {
    fn visit(&mut self, element: &mut Element, path: &NodePath, parent: Option<&ComputedStyle>) {
        let Some(style) = self.snapshots.get(path) else {
            trace!(path:% = path; "No style snapshot, leaving element as is");
            return;
        };
        inline_style(element, style, parent);

        // Children are enumerated by their index in the source, independent of
        // what has already been replaced or removed.
        let mut index = 0;
        let mut children = Vec::new();
        for child in element.take_children() {
            let mut child = match child {
                Node::Element(child) => child,
                text => {
                    children.push(text);
                    continue;
                }
            };
            let child_path = path.child(index);
            index += 1;

            if child.has_name(RICH_TEXT_CONTAINER) {
                match self
                    .normalizer
                    .replace_rich_text(&child, &child_path, self.snapshots)
                {
                    Some(text) => {
                        self.replaced += 1;
                        children.push(Node::Element(text));
                    }
                    None => self.removed += 1,
                }
            } else {
                self.visit(&mut child, &child_path, Some(style));
                children.push(Node::Element(child));
            }
        }
        element.set_children(children);
    }
}

/// Writes the computed style of one element as presentation attributes.
///
/// `none`, `auto` and `normal` are only written when a standalone renderer
/// would otherwise arrive at a different value: from an attribute already on
/// the element, from the parent for inherited properties, or from the initial
/// value.
fn inline_style(element: &mut Element, style: &ComputedStyle, parent: Option<&ComputedStyle>) {
    strip_style_declarations(element);

    for property in Property::INLINED {
        let value = style.get(property);
        if matches!(value, "none" | "auto" | "normal") {
            let fallback = match element.attribute(property.name()) {
                Some(existing) => existing,
                None => match parent {
                    Some(parent) if property.is_inherited() => parent.get(property),
                    _ => property.initial_value(),
                },
            };
            if fallback.trim() == value {
                continue;
            }
        }
        element.set_attribute(property.name(), value);
    }

    for (name, value) in style.markers() {
        element.set_attribute(name.as_str(), value.as_str());
    }
}

/// Removes declarations of inlined properties from the `style` attribute, so
/// the written presentation attributes are the ones that take effect.
fn strip_style_declarations(element: &mut Element) {
    let Some(style) = element.attribute("style") else {
        return;
    };

    let kept: Vec<String> = simplecss::DeclarationTokenizer::from(style)
        .filter(|declaration| {
            Property::from_name(declaration.name)
                .is_none_or(|property| !Property::INLINED.contains(&property))
        })
        .map(|declaration| {
            let important = if declaration.important { " !important" } else { "" };
            format!("{}: {}{important}", declaration.name, declaration.value)
        })
        .collect();

    if kept.is_empty() {
        element.remove_attribute("style");
    } else {
        element.set_attribute("style", kept.join("; "));
    }
}

fn number_attribute(element: &Element, name: &str) -> Option<f32> {
    element
        .attribute(name)
        .and_then(parse_px)
        .filter(|value| value.is_finite())
}

#[cfg(test)]
mod tests {
    use float_cmp::assert_approx_eq;
    use proptest::prelude::*;

    use super::*;
    use crate::{
        geometry::{Orientation, Point, Size},
        tree::parse_document,
    };

    fn bbox(width: f32, height: f32) -> Bounds {
        Bounds::new_from_top_left(Point::default(), Size::new(width, height))
    }

    fn normalize(svg: &str) -> NormalizedDiagram {
        let document = parse_document(svg).unwrap();
        Normalizer::default()
            .normalize(&document, bbox(100.0, 50.0))
            .unwrap()
    }

    fn at(root: &Element, indices: &[usize]) -> Element {
        let path = indices
            .iter()
            .fold(NodePath::root(), |path, &index| path.child(index));
        root.element_at(&path).unwrap().clone()
    }

    fn number(element: &Element, name: &str) -> f32 {
        element.attribute(name).unwrap().parse().unwrap()
    }

    #[test]
    fn test_rejects_non_svg_root() {
        let document = parse_document("<html/>").unwrap();
        let err = Normalizer::default()
            .normalize(&document, bbox(1.0, 1.0))
            .unwrap_err();
        assert!(matches!(err, Error::NotSvg(name) if name == "html"));
    }

    #[test]
    fn test_rich_text_is_replaced_by_centered_text() {
        let diagram = normalize(
            r#"<svg xmlns="http://www.w3.org/2000/svg">
                <g><foreignObject x="10" y="10" width="100" height="20"><div xmlns="http://www.w3.org/1999/xhtml">T</div></foreignObject></g>
            </svg>"#,
        );
        let root = diagram.root();
        assert_eq!(root.count_named("foreignObject"), 0);
        assert_eq!(diagram.replaced(), 1);

        let text = at(root, &[0, 0]);
        assert_eq!(text.name(), "text");
        assert_eq!(text.text_content(), "T");
        assert_eq!(text.attribute("text-anchor"), Some("middle"));
        assert_eq!(text.attribute("dominant-baseline"), Some("middle"));

        // The div has no explicit size, so it computes to the initial 16px.
        assert_approx_eq!(f32, number(&text, "x"), 60.0);
        assert_approx_eq!(f32, number(&text, "y"), 20.0 + 16.0 / 3.0, epsilon = 1e-4);
        assert_approx_eq!(f32, number(&text, "font-size"), 16.0);
    }

    #[test]
    fn test_rich_text_without_styled_child_uses_defaults() {
        let diagram = normalize(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><foreignObject>Plain label</foreignObject></svg>"#,
        );
        let text = at(diagram.root(), &[0]);

        assert_approx_eq!(f32, number(&text, "x"), 50.0);
        assert_approx_eq!(f32, number(&text, "y"), 10.0 + 14.0 / 3.0, epsilon = 1e-4);
        assert_eq!(text.attribute("font-size"), Some("14"));
        assert_eq!(text.attribute("font-family"), Some("arial, sans-serif"));
        assert_eq!(text.attribute("fill"), Some("#333333"));
    }

    #[test]
    fn test_rich_text_takes_style_of_first_styled_child() {
        let diagram = normalize(
            r#"<svg xmlns="http://www.w3.org/2000/svg" id="d">
                <style>#d .nodeLabel { color: #131300; font-size: 12px; font-family: "trebuchet ms", verdana; }</style>
                <foreignObject width="80" height="24"><div xmlns="http://www.w3.org/1999/xhtml"><span class="nodeLabel">Decision</span></div></foreignObject>
            </svg>"#,
        );
        let text = at(diagram.root(), &[1]);

        // The outer div comes first; it does not match the rule, so nothing is inherited.
        assert_eq!(text.attribute("font-family"), Some("sans-serif"));
        assert_eq!(text.attribute("fill"), Some("black"));
        assert_eq!(text.text_content(), "Decision");
    }

    #[test]
    fn test_rich_text_style_inherited_from_container() {
        let diagram = normalize(
            r#"<svg xmlns="http://www.w3.org/2000/svg" id="d">
                <style>#d .label { color: #131300; font-size: 12px; font-family: "trebuchet ms", verdana; }</style>
                <g class="label"><foreignObject width="80" height="24"><div xmlns="http://www.w3.org/1999/xhtml"><span>Decision</span></div></foreignObject></g>
            </svg>"#,
        );
        let text = at(diagram.root(), &[1, 0]);

        assert_eq!(text.attribute("font-size"), Some("12"));
        assert_eq!(text.attribute("font-family"), Some(r#""trebuchet ms", verdana"#));
        assert_eq!(text.attribute("fill"), Some("#131300"));
        assert_approx_eq!(f32, number(&text, "y"), 12.0 + 4.0, epsilon = 1e-4);
    }

    #[test]
    fn test_invalid_label_color_falls_back() {
        let diagram = normalize(
            r#"<svg xmlns="http://www.w3.org/2000/svg">
                <foreignObject><div xmlns="http://www.w3.org/1999/xhtml" style="color: oops">x</div></foreignObject>
            </svg>"#,
        );
        assert_eq!(at(diagram.root(), &[0]).attribute("fill"), Some("#333333"));
    }

    #[test]
    fn test_empty_rich_text_is_removed() {
        let diagram = normalize(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><foreignObject><div xmlns="http://www.w3.org/1999/xhtml"> </div></foreignObject><rect/></svg>"#,
        );
        let root = diagram.root();
        assert_eq!(root.count_named("foreignObject"), 0);
        assert_eq!(root.count_named("text"), 0);
        assert_eq!(root.child_elements().count(), 1);
        assert_eq!(diagram.removed(), 1);
    }

    #[test]
    fn test_sibling_styles_survive_removal() {
        let diagram = normalize(
            r#"<svg xmlns="http://www.w3.org/2000/svg">
                <foreignObject/>
                <foreignObject><span xmlns="http://www.w3.org/1999/xhtml">kept</span></foreignObject>
                <rect fill="red"/>
                <circle style="fill: blue"/>
            </svg>"#,
        );
        let root = diagram.root();
        let names: Vec<_> = root.child_elements().map(Element::name).collect();
        assert_eq!(names, ["text", "rect", "circle"]);
        assert_eq!(at(root, &[1]).attribute("fill"), Some("red"));
        assert_eq!(at(root, &[2]).attribute("fill"), Some("blue"));
    }

    #[test]
    fn test_computed_styles_are_inlined() {
        let diagram = normalize(
            r#"<svg xmlns="http://www.w3.org/2000/svg" id="d">
                <style>#d .edge { stroke: #333333; stroke-width: 2px; stroke-dasharray: 3; fill: none; }</style>
                <path class="edge" marker-end="url(#arrow)" d="M0 0L10 10"/>
            </svg>"#,
        );
        let path = at(diagram.root(), &[1]);

        assert_eq!(path.attribute("stroke"), Some("#333333"));
        assert_eq!(path.attribute("stroke-width"), Some("2px"));
        assert_eq!(path.attribute("stroke-dasharray"), Some("3"));
        assert_eq!(path.attribute("fill"), Some("none"));
        assert_eq!(path.attribute("marker-end"), Some("url(#arrow)"));
        assert_eq!(path.attribute("opacity"), Some("1"));
    }

    #[test]
    fn test_none_is_skipped_when_it_is_already_in_effect() {
        let diagram = normalize(r#"<svg xmlns="http://www.w3.org/2000/svg"><rect/></svg>"#);
        let rect = at(diagram.root(), &[0]);

        assert_eq!(rect.attribute("stroke"), None);
        assert_eq!(rect.attribute("text-decoration"), None);
        assert_eq!(rect.attribute("dominant-baseline"), None);
        assert_eq!(rect.attribute("font-weight"), None);
        assert_eq!(rect.attribute("fill"), Some("black"));
    }

    #[test]
    fn test_none_is_written_when_it_overrides_an_inherited_value() {
        let diagram = normalize(
            r#"<svg xmlns="http://www.w3.org/2000/svg">
                <style>g { stroke: red; } rect { stroke: none; }</style>
                <g><rect stroke="blue"/></g>
            </svg>"#,
        );
        let root = diagram.root();
        assert_eq!(at(root, &[1]).attribute("stroke"), Some("red"));
        assert_eq!(at(root, &[1, 0]).attribute("stroke"), Some("none"));
    }

    #[test]
    fn test_normal_is_written_when_parent_is_bold() {
        let diagram = normalize(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><g font-weight="bold"><text style="font-weight: normal">a</text></g></svg>"#,
        );
        assert_eq!(
            at(diagram.root(), &[0, 0]).attribute("font-weight"),
            Some("normal")
        );
    }

    #[test]
    fn test_inlined_declarations_are_stripped_from_style_attribute() {
        let diagram = normalize(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><rect style="fill: var(--x); max-width: 200px"/><circle style="stroke: red"/></svg>"#,
        );
        let root = diagram.root();
        assert_eq!(at(root, &[0]).attribute("style"), Some("max-width: 200px"));
        assert_eq!(at(root, &[0]).attribute("fill"), Some("black"));
        assert_eq!(at(root, &[1]).attribute("style"), None);
        assert_eq!(at(root, &[1]).attribute("stroke"), Some("red"));
    }

    #[test]
    fn test_structure_is_kept_without_rich_text() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10"><defs><marker id="arrow"><path d="M0 0"/></marker></defs><g class="root"><rect x="1"/><text x="2">label</text></g></svg>"#;
        let document = parse_document(svg).unwrap();
        let original = Element::from_xml(document.root_element());
        let diagram = normalize(svg);

        fn same_shape(a: &Element, b: &Element) {
            assert_eq!(a.name(), b.name());
            for (name, value) in a.attributes() {
                assert_eq!(b.attribute(name), Some(value.as_str()), "{name}");
            }
            assert_eq!(a.child_elements().count(), b.child_elements().count());
            for (a, b) in a.child_elements().zip(b.child_elements()) {
                same_shape(a, b);
            }
        }
        same_shape(&original, diagram.root());
        assert_eq!(diagram.root().text_content(), original.text_content());
    }

    #[test]
    fn test_page_layout_uses_margin() {
        let document = parse_document(r#"<svg xmlns="http://www.w3.org/2000/svg"/>"#).unwrap();
        let diagram = Normalizer::new(10.0)
            .normalize(&document, bbox(300.0, 100.0))
            .unwrap();
        let (_, page) = diagram.into_parts();

        assert_eq!(page.size(), Size::new(320.0, 120.0));
        assert_eq!(page.orientation(), Orientation::Landscape);
    }

    #[test]
    fn test_custom_rich_text_defaults() {
        let document =
            parse_document(r#"<svg xmlns="http://www.w3.org/2000/svg"><foreignObject>a</foreignObject></svg>"#)
                .unwrap();
        let diagram = Normalizer::default()
            .with_rich_text_defaults(RichTextDefaults::new(10.0, "serif", "navy"))
            .normalize(&document, bbox(1.0, 1.0))
            .unwrap();
        let text = at(diagram.root(), &[0]);

        assert_eq!(text.attribute("font-family"), Some("serif"));
        assert_eq!(text.attribute("fill"), Some("navy"));
    }

    proptest! {
        #[test]
        fn whitespace_only_rich_text_is_always_removed(content in "[ \t\n]{0,12}") {
            let svg = format!(
                r#"<svg xmlns="http://www.w3.org/2000/svg"><g><foreignObject><div xmlns="http://www.w3.org/1999/xhtml">{content}</div></foreignObject></g></svg>"#
            );
            let diagram = normalize(&svg);
            prop_assert_eq!(diagram.root().count_named("foreignObject"), 0);
            prop_assert_eq!(diagram.root().count_named("text"), 0);
            prop_assert_eq!(diagram.removed(), 1);
        }

        #[test]
        fn label_is_centered_in_its_box(
            x in -500i32..500,
            y in -500i32..500,
            width in 1i32..400,
            height in 1i32..100,
        ) {
            let svg = format!(
                r#"<svg xmlns="http://www.w3.org/2000/svg"><foreignObject x="{x}" y="{y}" width="{width}" height="{height}">label</foreignObject></svg>"#
            );
            let text = at(normalize(&svg).root(), &[0]);
            let expected_x = x as f32 + width as f32 / 2.0;
            let expected_y = y as f32 + height as f32 / 2.0 + 14.0 / 3.0;

            prop_assert!((number(&text, "x") - expected_x).abs() < 1e-3);
            prop_assert!((number(&text, "y") - expected_y).abs() < 1e-3);
        }
    }
}
