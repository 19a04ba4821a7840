//! Owned SVG element tree.
//!
//! A rendered diagram is parsed into an immutable [`roxmltree::Document`]; the
//! normalizer works on a detached deep copy built from it. [`Element`] is that
//! copy: it owns its attributes and children, can be edited in place and is
//! serialized back to SVG text through the `svg` crate.
//!
//! Nodes are addressed by [`NodePath`], the sequence of *element* child indices
//! from the root. Text nodes do not take part in the numbering, so a path stays
//! the same between the source document and a fresh copy of it.

use std::fmt;

use svg::Node as _;

/// Namespace of SVG elements.
pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
/// Namespace of `xlink:*` attributes.
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Structural address of an element: indices of element children from the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath(Vec<usize>);

impl NodePath {
    /// The path of the root element.
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns the path of the `index`-th element child of this node.
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    /// Appends a path relative to this node.
    pub fn join(&self, relative: &NodePath) -> Self {
        let mut indices = self.0.clone();
        indices.extend_from_slice(&relative.0);
        Self(indices)
    }

    /// Returns the depth of the path (zero for the root).
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Returns the child indices that make up this path.
    pub fn indices(&self) -> &[usize] {
        &self.0
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/")?;
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "/")?;
            }
            write!(f, "{index}")?;
        }
        Ok(())
    }
}

/// A node of an owned SVG tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An owned SVG (or embedded HTML) element.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    /// Creates an element without attributes or children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Deep-copies an element of a parsed document, including all descendants.
    ///
    /// Comments and processing instructions are dropped. Attributes keep their
    /// source order; `xlink:` and `xml:` prefixes are restored for namespaced
    /// attributes.
    pub fn from_xml(node: roxmltree::Node<'_, '_>) -> Self {
        let mut element = Self::new(node.tag_name().name());

        for attr in node.attributes() {
            let name = match attr.namespace() {
                Some(XLINK_NS) => format!("xlink:{}", attr.name()),
                Some(XML_NS) => format!("xml:{}", attr.name()),
                _ => attr.name().to_string(),
            };
            element.attributes.push((name, attr.value().to_string()));
        }

        for child in node.children() {
            if child.is_element() {
                element.children.push(Node::Element(Self::from_xml(child)));
            } else if child.is_text() {
                if let Some(text) = child.text() {
                    element.children.push(Node::Text(text.to_string()));
                }
            }
        }

        element
    }

    /// Returns the local tag name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if the element has the given local tag name.
    pub fn has_name(&self, name: &str) -> bool {
        self.name == name
    }

    /// Returns the value of an attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, value)| value.as_str())
    }

    /// Returns all attributes in document order.
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    /// Sets an attribute, replacing an existing value in place.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(attr, _)| *attr == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    /// Removes an attribute, returning its previous value.
    pub fn remove_attribute(&mut self, name: &str) -> Option<String> {
        let index = self.attributes.iter().position(|(attr, _)| attr == name)?;
        Some(self.attributes.remove(index).1)
    }

    /// Returns the child nodes.
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Takes the child nodes out of this element, leaving it empty.
    pub fn take_children(&mut self) -> Vec<Node> {
        std::mem::take(&mut self.children)
    }

    /// Appends a child element.
    pub fn push_element(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    /// Appends a text node.
    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(Node::Text(text.into()));
    }

    /// Replaces all children.
    pub fn set_children(&mut self, children: Vec<Node>) {
        self.children = children;
    }

    /// Iterates over child elements, skipping text.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// Returns the element at `path`, relative to this element.
    pub fn element_at(&self, path: &NodePath) -> Option<&Element> {
        path.indices()
            .iter()
            .try_fold(self, |element, &index| element.child_elements().nth(index))
    }

    /// Concatenated text of all descendant text nodes, like DOM `textContent`.
    pub fn text_content(&self) -> String {
        let mut text = String::new();
        self.collect_text(&mut text);
        text
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Element(element) => element.collect_text(out),
                Node::Text(text) => out.push_str(text),
            }
        }
    }

    /// Finds the first descendant (depth-first, document order) matching `predicate`
    /// and returns it together with its path relative to this element.
    pub fn find_descendant(&self, predicate: impl Fn(&Element) -> bool) -> Option<(NodePath, &Element)> {
        self.find_descendant_from(&NodePath::root(), &predicate)
    }

    fn find_descendant_from<'a>(
        &'a self,
        path: &NodePath,
        predicate: &impl Fn(&Element) -> bool,
    ) -> Option<(NodePath, &'a Element)> {
        for (index, child) in self.child_elements().enumerate() {
            let child_path = path.child(index);
            if predicate(child) {
                return Some((child_path, child));
            }
            if let Some(found) = child.find_descendant_from(&child_path, predicate) {
                return Some(found);
            }
        }
        None
    }

    /// Counts this element and all descendant elements named `name`.
    pub fn count_named(&self, name: &str) -> usize {
        let own = usize::from(self.has_name(name));
        own + self
            .child_elements()
            .map(|child| child.count_named(name))
            .sum::<usize>()
    }

    /// Converts the tree into an `svg` crate element for serialization.
    pub fn to_svg_node(&self) -> svg::node::element::Element {
        let mut element = svg::node::element::Element::new(self.name.as_str());
        for (name, value) in &self.attributes {
            element.assign(name.as_str(), escape_attribute(value));
        }
        for child in &self.children {
            match child {
                Node::Element(child) => element.append(child.to_svg_node()),
                Node::Text(text) => element.append(svg::node::Text::new(text.as_str())),
            }
        }
        element
    }

    /// Serializes this element as a standalone SVG document.
    ///
    /// Namespace declarations are not part of the parsed attributes, so the
    /// SVG and XLink namespaces are declared on the root here.
    pub fn to_document_string(&self) -> String {
        let mut root = self.clone();
        root.set_attribute("xmlns", SVG_NS);
        root.set_attribute("xmlns:xlink", XLINK_NS);
        root.to_svg_node().to_string()
    }
}

/// Escapes markup characters in an attribute value.
///
/// The `svg` crate writes values verbatim and picks the quote character from
/// the value itself, so only `&`, `<` and a `"` that coexists with `'` need
/// escaping here.
fn escape_attribute(value: &str) -> String {
    let escaped = value.replace('&', "&amp;").replace('<', "&lt;");
    if escaped.contains('\'') && escaped.contains('"') {
        escaped.replace('"', "&quot;")
    } else {
        escaped
    }
}

/// Parses SVG text into a read-only document.
///
/// DTDs are allowed since some renderers emit an SVG doctype.
pub fn parse_document(text: &str) -> Result<roxmltree::Document<'_>, roxmltree::Error> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    roxmltree::Document::parse_with_options(text, options)
}
