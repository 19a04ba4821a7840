//! Computed-style resolution for rendered SVG documents.
//!
//! Diagram renderers style their output through an embedded `<style>` sheet,
//! `style` attributes and inheritance. A standalone vector renderer that only
//! reads presentation attributes would lose most of that, so the normalizer
//! needs the *computed* value of every property it inlines.
//!
//! [`StyleSnapshots::capture`] walks the read-only source document once and
//! records a [`ComputedStyle`] for every element, keyed by its [`NodePath`].
//!
//! # Cascade
//!
//! For each element, lowest priority first:
//!
//! 1. Presentation attributes (`fill="red"`)
//! 2. Matching style sheet rules, in specificity order
//! 3. Declarations of the `style` attribute
//! 4. `!important` declarations (sheet rules, then the `style` attribute)
//!
//! Properties without a specified value inherit from the parent when they are
//! inherited properties and fall back to their initial value otherwise.

use std::collections::{BTreeMap, HashMap};

use log::{debug, trace};

use crate::tree::NodePath;

/// Marker reference attributes. These are copied verbatim from the source
/// attributes rather than resolved through the cascade.
pub const MARKER_ATTRIBUTES: [&str; 3] = ["marker-start", "marker-end", "marker-mid"];

const ROOT_FONT_SIZE_PX: f32 = 16.0;

/// A style property tracked by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Property {
    Color,
    Fill,
    Stroke,
    StrokeWidth,
    FontFamily,
    FontSize,
    FontWeight,
    Opacity,
    TextAnchor,
    DominantBaseline,
    AlignmentBaseline,
    TextDecoration,
    StrokeDasharray,
}

impl Property {
    /// Every tracked property. `Color` comes first because `currentColor`
    /// in other properties resolves against it.
    pub const ALL: [Property; 13] = [
        Property::Color,
        Property::Fill,
        Property::Stroke,
        Property::StrokeWidth,
        Property::FontFamily,
        Property::FontSize,
        Property::FontWeight,
        Property::Opacity,
        Property::TextAnchor,
        Property::DominantBaseline,
        Property::AlignmentBaseline,
        Property::TextDecoration,
        Property::StrokeDasharray,
    ];

    /// Properties written onto normalized elements as presentation attributes.
    pub const INLINED: [Property; 12] = [
        Property::Fill,
        Property::Stroke,
        Property::StrokeWidth,
        Property::FontFamily,
        Property::FontSize,
        Property::FontWeight,
        Property::Opacity,
        Property::TextAnchor,
        Property::DominantBaseline,
        Property::AlignmentBaseline,
        Property::TextDecoration,
        Property::StrokeDasharray,
    ];

    /// Returns the CSS / presentation attribute name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::Fill => "fill",
            Self::Stroke => "stroke",
            Self::StrokeWidth => "stroke-width",
            Self::FontFamily => "font-family",
            Self::FontSize => "font-size",
            Self::FontWeight => "font-weight",
            Self::Opacity => "opacity",
            Self::TextAnchor => "text-anchor",
            Self::DominantBaseline => "dominant-baseline",
            Self::AlignmentBaseline => "alignment-baseline",
            Self::TextDecoration => "text-decoration",
            Self::StrokeDasharray => "stroke-dasharray",
        }
    }

    /// Looks a property up by its CSS name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|property| property.name() == name)
    }

    /// Returns `true` if an unspecified value is taken from the parent.
    pub fn is_inherited(self) -> bool {
        !matches!(
            self,
            Self::Opacity | Self::AlignmentBaseline | Self::TextDecoration
        )
    }

    /// Returns the value used when nothing is specified and nothing is inherited.
    pub fn initial_value(self) -> &'static str {
        match self {
            Self::Color | Self::Fill => "black",
            Self::Stroke | Self::TextDecoration | Self::StrokeDasharray => "none",
            Self::StrokeWidth => "1px",
            Self::FontFamily => "sans-serif",
            Self::FontSize => "16px",
            Self::FontWeight => "normal",
            Self::Opacity => "1",
            Self::TextAnchor => "start",
            Self::DominantBaseline | Self::AlignmentBaseline => "auto",
        }
    }
}

/// Resolved style of a single element.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
    values: BTreeMap<Property, String>,
    markers: Vec<(String, String)>,
}

impl ComputedStyle {
    /// The style of an element with nothing specified and no parent.
    pub fn initial() -> Self {
        let values = Property::ALL
            .into_iter()
            .map(|property| (property, property.initial_value().to_string()))
            .collect();
        Self {
            values,
            markers: Vec::new(),
        }
    }

    /// Returns the computed value of `property`.
    pub fn get(&self, property: Property) -> &str {
        self.values
            .get(&property)
            .map(String::as_str)
            .unwrap_or_else(|| property.initial_value())
    }

    /// Marker references declared on the source element.
    pub fn markers(&self) -> &[(String, String)] {
        &self.markers
    }

    /// Returns the computed font size in pixels, when it is absolute.
    pub fn font_size_px(&self) -> Option<f32> {
        parse_px(self.get(Property::FontSize))
    }
}

/// Computed styles of every element of a document, keyed by structural path.
#[derive(Debug, Default)]
pub struct StyleSnapshots {
    styles: HashMap<NodePath, ComputedStyle>,
}

impl StyleSnapshots {
    /// Resolves the computed style of every element in `document`.
    ///
    /// The document is only read; paths are relative to its root element.
    pub fn capture(document: &roxmltree::Document<'_>) -> Self {
        let sheet = collect_style_sheet(document);
        debug!(rules = sheet.rules.len(); "Collected style sheet rules");

        let mut snapshots = Self::default();
        snapshots.capture_node(document.root_element(), NodePath::root(), None, &sheet);
        snapshots
    }

    fn capture_node(
        &mut self,
        node: roxmltree::Node<'_, '_>,
        path: NodePath,
        parent: Option<&ComputedStyle>,
        sheet: &simplecss::StyleSheet<'_>,
    ) {
        let style = compute_style(node, parent, sheet);

        for (index, child) in node.children().filter(|n| n.is_element()).enumerate() {
            self.capture_node(child, path.child(index), Some(&style), sheet);
        }

        self.styles.insert(path, style);
    }

    /// Returns the snapshot of the element at `path`.
    pub fn get(&self, path: &NodePath) -> Option<&ComputedStyle> {
        self.styles.get(path)
    }

    /// Number of captured elements.
    pub fn len(&self) -> usize {
        self.styles.len()
    }

    /// Returns `true` if nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

fn collect_style_sheet<'a>(document: &'a roxmltree::Document<'_>) -> simplecss::StyleSheet<'a> {
    let mut sheet = simplecss::StyleSheet::new();

    for node in document.descendants().filter(|n| n.has_tag_name("style")) {
        match node.attribute("type") {
            Some("text/css") | None => {}
            Some(_) => continue,
        }

        if let Some(text) = node.text() {
            sheet.parse_more(text);
        }
    }

    sheet
}

/// Collects specified values in cascade order; later inserts win.
fn cascade(
    node: roxmltree::Node<'_, '_>,
    sheet: &simplecss::StyleSheet<'_>,
) -> BTreeMap<Property, String> {
    let mut specified = BTreeMap::new();
    let mut important = Vec::new();

    for property in Property::ALL {
        if let Some(value) = node.attribute(property.name()) {
            specified.insert(property, value.trim().to_string());
        }
    }

    let mut declare = |name: &str, value: &str, is_important: bool| {
        let Some(property) = Property::from_name(name) else {
            if name == "font" {
                trace!(value; "Ignoring font shorthand");
            }
            return;
        };
        if is_important {
            important.push((property, value.trim().to_string()));
        } else {
            specified.insert(property, value.trim().to_string());
        }
    };

    for rule in &sheet.rules {
        if rule.selector.matches(&SelectorTarget(node)) {
            for declaration in &rule.declarations {
                declare(declaration.name, declaration.value, declaration.important);
            }
        }
    }

    if let Some(style) = node.attribute("style") {
        for declaration in simplecss::DeclarationTokenizer::from(style) {
            declare(declaration.name, declaration.value, declaration.important);
        }
    }

    specified.extend(important);
    specified
}

fn compute_style(
    node: roxmltree::Node<'_, '_>,
    parent: Option<&ComputedStyle>,
    sheet: &simplecss::StyleSheet<'_>,
) -> ComputedStyle {
    let specified = cascade(node, sheet);
    let mut values: BTreeMap<Property, String> = BTreeMap::new();

    let inherited = |property: Property| {
        parent
            .map(|style| style.get(property).to_string())
            .unwrap_or_else(|| property.initial_value().to_string())
    };
    let unspecified = |property: Property| {
        if property.is_inherited() {
            inherited(property)
        } else {
            property.initial_value().to_string()
        }
    };

    for property in Property::ALL {
        let value = match specified.get(&property).map(String::as_str) {
            None | Some("unset") => unspecified(property),
            Some("inherit") => inherited(property),
            Some("initial") => property.initial_value().to_string(),
            Some(value) if value.starts_with("var(") => {
                trace!(property = property.name(), value; "Unresolved custom property");
                unspecified(property)
            }
            Some(value) if value.eq_ignore_ascii_case("currentcolor") => {
                if property == Property::Color {
                    inherited(property)
                } else {
                    values
                        .get(&Property::Color)
                        .cloned()
                        .unwrap_or_else(|| inherited(Property::Color))
                }
            }
            Some(value) => value.to_string(),
        };

        let value = if property == Property::FontSize {
            let parent_px = parent
                .and_then(ComputedStyle::font_size_px)
                .unwrap_or(ROOT_FONT_SIZE_PX);
            resolve_font_size(&value, parent_px)
        } else {
            value
        };

        values.insert(property, value);
    }

    let markers = MARKER_ATTRIBUTES
        .iter()
        .filter_map(|name| {
            node.attribute(*name)
                .map(|value| (name.to_string(), value.to_string()))
        })
        .collect();

    ComputedStyle { values, markers }
}

/// Converts a font size to absolute pixels, the way a browser reports it.
///
/// Keywords and unknown units are returned unchanged.
fn resolve_font_size(value: &str, parent_px: f32) -> String {
    let value = value.trim();
    let number = |text: &str| text.trim().parse::<f32>().ok();

    let px = if let Some(n) = value.strip_suffix("px") {
        number(n)
    } else if let Some(n) = value.strip_suffix("rem") {
        number(n).map(|n| n * ROOT_FONT_SIZE_PX)
    } else if let Some(n) = value.strip_suffix("em") {
        number(n).map(|n| n * parent_px)
    } else if let Some(n) = value.strip_suffix('%') {
        number(n).map(|n| n / 100.0 * parent_px)
    } else if let Some(n) = value.strip_suffix("pt") {
        number(n).map(|n| n * 4.0 / 3.0)
    } else {
        number(value)
    };

    match px {
        Some(px) => format!("{px}px"),
        None => value.to_string(),
    }
}

/// Parses `14px` or a bare `14` into pixels.
pub fn parse_px(value: &str) -> Option<f32> {
    let value = value.trim();
    value
        .strip_suffix("px")
        .unwrap_or(value)
        .trim()
        .parse()
        .ok()
}

/// A document node as seen by `simplecss` selector matching.
struct SelectorTarget<'a, 'input: 'a>(roxmltree::Node<'a, 'input>);

impl simplecss::Element for SelectorTarget<'_, '_> {
    fn parent_element(&self) -> Option<Self> {
        self.0.parent_element().map(SelectorTarget)
    }

    fn prev_sibling_element(&self) -> Option<Self> {
        self.0.prev_sibling_element().map(SelectorTarget)
    }

    fn has_local_name(&self, local_name: &str) -> bool {
        self.0.has_tag_name(local_name)
    }

    fn attribute_matches(&self, local_name: &str, operator: simplecss::AttributeOperator) -> bool {
        self.0
            .attribute(local_name)
            .is_some_and(|value| operator.matches(value))
    }

    fn pseudo_class_matches(&self, class: simplecss::PseudoClass) -> bool {
        // Hover, focus and link states do not exist in an exported diagram.
        matches!(class, simplecss::PseudoClass::FirstChild)
            && self.0.prev_sibling_element().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::parse_document;

    fn capture(svg: &str) -> StyleSnapshots {
        let doc = parse_document(svg).unwrap();
        StyleSnapshots::capture(&doc)
    }

    fn path(indices: &[usize]) -> NodePath {
        indices
            .iter()
            .fold(NodePath::root(), |path, &index| path.child(index))
    }

    #[test]
    fn test_property_names_round_trip() {
        for property in Property::ALL {
            assert_eq!(Property::from_name(property.name()), Some(property));
        }
        assert_eq!(Property::from_name("max-width"), None);
    }

    #[test]
    fn test_initial_style() {
        let snapshots = capture(r#"<svg xmlns="http://www.w3.org/2000/svg"/>"#);
        let root = snapshots.get(&NodePath::root()).unwrap();

        assert_eq!(root, &ComputedStyle::initial());
        assert_eq!(root.get(Property::Fill), "black");
        assert_eq!(root.get(Property::Stroke), "none");
        assert_eq!(root.font_size_px(), Some(16.0));
    }

    #[test]
    fn test_presentation_attribute_is_specified() {
        let snapshots = capture(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><rect fill="red" stroke-width="2"/></svg>"#,
        );
        let rect = snapshots.get(&path(&[0])).unwrap();
        assert_eq!(rect.get(Property::Fill), "red");
        assert_eq!(rect.get(Property::StrokeWidth), "2");
    }

    #[test]
    fn test_style_sheet_overrides_presentation_attribute() {
        let snapshots = capture(
            r#"<svg xmlns="http://www.w3.org/2000/svg" id="my-svg">
                <style>#my-svg .node rect { fill: #ECECFF; stroke: #9370DB; }</style>
                <g class="node default"><rect fill="red"/></g>
            </svg>"#,
        );
        let rect = snapshots.get(&path(&[1, 0])).unwrap();
        assert_eq!(rect.get(Property::Fill), "#ECECFF");
        assert_eq!(rect.get(Property::Stroke), "#9370DB");
    }

    #[test]
    fn test_style_attribute_overrides_sheet_and_important_wins() {
        let snapshots = capture(
            r#"<svg xmlns="http://www.w3.org/2000/svg">
                <style>rect { fill: blue; stroke: green !important; }</style>
                <rect style="fill: orange; stroke: black"/>
            </svg>"#,
        );
        let rect = snapshots.get(&path(&[1])).unwrap();
        assert_eq!(rect.get(Property::Fill), "orange");
        assert_eq!(rect.get(Property::Stroke), "green");
    }

    #[test]
    fn test_more_specific_rule_wins_regardless_of_order() {
        let snapshots = capture(
            r#"<svg xmlns="http://www.w3.org/2000/svg">
                <style>#a { fill: red; } rect { fill: blue; }</style>
                <rect id="a"/>
            </svg>"#,
        );
        assert_eq!(snapshots.get(&path(&[1])).unwrap().get(Property::Fill), "red");
    }

    #[test]
    fn test_inheritance() {
        let snapshots = capture(
            r##"<svg xmlns="http://www.w3.org/2000/svg" fill="#333" opacity="0.5" font-family="verdana">
                <g><text>label</text></g>
            </svg>"##,
        );
        let text = snapshots.get(&path(&[0, 0])).unwrap();
        assert_eq!(text.get(Property::Fill), "#333");
        assert_eq!(text.get(Property::FontFamily), "verdana");
        // Opacity is not inherited.
        assert_eq!(text.get(Property::Opacity), "1");
    }

    #[test]
    fn test_explicit_inherit_of_non_inherited_property() {
        let snapshots = capture(
            r#"<svg xmlns="http://www.w3.org/2000/svg" opacity="0.5"><g opacity="inherit"/></svg>"#,
        );
        assert_eq!(snapshots.get(&path(&[0])).unwrap().get(Property::Opacity), "0.5");
    }

    #[test]
    fn test_current_color() {
        let snapshots = capture(
            r#"<svg xmlns="http://www.w3.org/2000/svg" color="teal"><path stroke="currentColor"/></svg>"#,
        );
        assert_eq!(snapshots.get(&path(&[0])).unwrap().get(Property::Stroke), "teal");
    }

    #[test]
    fn test_unresolved_variable_falls_back_to_inherited_value() {
        let snapshots = capture(
            r#"<svg xmlns="http://www.w3.org/2000/svg" fill="navy"><rect style="fill: var(--main)"/></svg>"#,
        );
        assert_eq!(snapshots.get(&path(&[0])).unwrap().get(Property::Fill), "navy");
    }

    #[test]
    fn test_relative_font_sizes() {
        let snapshots = capture(
            r#"<svg xmlns="http://www.w3.org/2000/svg" style="font-size: 20px">
                <g font-size="1.5em"><text font-size="50%"/></g>
                <text font-size="12pt"/>
                <text font-size="14"/>
            </svg>"#,
        );
        assert_eq!(snapshots.get(&path(&[0])).unwrap().get(Property::FontSize), "30px");
        assert_eq!(snapshots.get(&path(&[0, 0])).unwrap().get(Property::FontSize), "15px");
        assert_eq!(snapshots.get(&path(&[1])).unwrap().get(Property::FontSize), "16px");
        assert_eq!(snapshots.get(&path(&[2])).unwrap().font_size_px(), Some(14.0));
    }

    #[test]
    fn test_html_content_inside_foreign_object() {
        let snapshots = capture(
            r#"<svg xmlns="http://www.w3.org/2000/svg" id="s">
                <style>#s .label { color: #333; font-family: "trebuchet ms", verdana; font-size: 14px; }</style>
                <foreignObject width="50" height="20">
                    <div xmlns="http://www.w3.org/1999/xhtml" class="label"><span>A</span></div>
                </foreignObject>
            </svg>"#,
        );
        let span = snapshots.get(&path(&[1, 0, 0])).unwrap();
        assert_eq!(span.get(Property::Color), "#333");
        assert_eq!(span.get(Property::FontFamily), r#""trebuchet ms", verdana"#);
        assert_eq!(span.font_size_px(), Some(14.0));
    }

    #[test]
    fn test_markers_are_recorded_from_attributes() {
        let snapshots = capture(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><path marker-end="url(#arrow)"/></svg>"#,
        );
        let path_style = snapshots.get(&path(&[0])).unwrap();
        assert_eq!(
            path_style.markers(),
            &[("marker-end".to_string(), "url(#arrow)".to_string())]
        );
    }

    #[test]
    fn test_every_element_is_captured() {
        let snapshots = capture(
            r#"<svg xmlns="http://www.w3.org/2000/svg"><g><rect/><circle/></g><text>t</text></svg>"#,
        );
        assert_eq!(snapshots.len(), 5);
        assert!(!snapshots.is_empty());
    }

    #[test]
    fn test_parse_px() {
        assert_eq!(parse_px("14px"), Some(14.0));
        assert_eq!(parse_px(" 12.5 "), Some(12.5));
        assert_eq!(parse_px("medium"), None);
    }
}
