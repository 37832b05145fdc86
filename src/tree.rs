//! Graphics tree model.
//!
//! A [`GraphicsNode`] mirrors the drawable hierarchy a charting library mounts: elements with
//! attributes, text runs, and children. Each node also carries a [`ComputedStyle`], the
//! resolved presentation values the renderer supplied when the tree was mounted (see
//! [`crate::theme::mount`]). A detached clone keeps the structure but not the computed
//! record, which is exactly what the style inliner has to restore.

use crate::constants;
use crate::error::ExportError;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Resolved presentation values keyed by CSS property name.
pub type ComputedStyle = BTreeMap<String, String>;

/// Element or text payload of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// An element with its tag name and ordered attributes
    Element {
        /// Tag name, prefixed for foreign namespaces
        tag: String,
        /// Attributes in document order
        attributes: Vec<(String, String)>,
    },
    /// Character data
    Text(String),
}

/// One node of a graphics tree.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsNode {
    /// Element or text payload
    pub kind: NodeKind,
    /// Resolved style, present only while the tree is mounted
    pub computed: ComputedStyle,
    /// Child nodes in paint order
    pub children: Vec<GraphicsNode>,
}

impl GraphicsNode {
    /// Creates an empty element.
    pub fn element(tag: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Element {
                tag: tag.into(),
                attributes: Vec::new(),
            },
            computed: ComputedStyle::new(),
            children: Vec::new(),
        }
    }

    /// Creates a text node.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Text(content.into()),
            computed: ComputedStyle::new(),
            children: Vec::new(),
        }
    }

    /// Builder: sets an attribute.
    pub fn with_attr(mut self, name: &str, value: impl ToString) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder: appends a child.
    pub fn with_child(mut self, child: GraphicsNode) -> Self {
        self.children.push(child);
        self
    }

    /// Builder: appends a text child.
    pub fn with_text(self, content: impl Into<String>) -> Self {
        self.with_child(GraphicsNode::text(content))
    }

    /// Tag name, or `None` for text nodes.
    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { tag, .. } => Some(tag),
            NodeKind::Text(_) => None,
        }
    }

    /// Whether this is an element with the given tag.
    pub fn is(&self, tag: &str) -> bool {
        self.tag() == Some(tag)
    }

    /// Attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        match &self.kind {
            NodeKind::Element { attributes, .. } => attributes
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    /// Attribute parsed as a plain number (a trailing `px` is accepted).
    pub fn number_attr(&self, name: &str) -> Option<f32> {
        parse_length(self.attr(name)?)
    }

    /// Sets or replaces an attribute. No-op on text nodes.
    pub fn set_attr(&mut self, name: &str, value: impl ToString) {
        if let NodeKind::Element { attributes, .. } = &mut self.kind {
            let value = value.to_string();
            match attributes.iter_mut().find(|(n, _)| n == name) {
                Some(slot) => slot.1 = value,
                None => attributes.push((name.to_string(), value)),
            }
        }
    }

    /// Removes an attribute, returning its old value.
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        match &mut self.kind {
            NodeKind::Element { attributes, .. } => {
                let idx = attributes.iter().position(|(n, _)| n == name)?;
                Some(attributes.remove(idx).1)
            }
            NodeKind::Text(_) => None,
        }
    }

    /// Attributes in document order (empty for text nodes).
    pub fn attributes(&self) -> &[(String, String)] {
        match &self.kind {
            NodeKind::Element { attributes, .. } => attributes,
            NodeKind::Text(_) => &[],
        }
    }

    /// Whether the `class` attribute contains the given token.
    pub fn has_class(&self, token: &str) -> bool {
        self.attr("class")
            .map(|c| c.split_whitespace().any(|t| t == token))
            .unwrap_or(false)
    }

    /// Link target of an `<image>` or `<use>`, checking `href` then `xlink:href`.
    pub fn href(&self) -> Option<&str> {
        self.attr("href").or_else(|| self.attr("xlink:href"))
    }

    /// Concatenated character data of this subtree.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match &self.kind {
            NodeKind::Text(t) => out.push_str(t),
            NodeKind::Element { .. } => {
                for child in &self.children {
                    child.collect_text(out);
                }
            }
        }
    }

    /// Inline `style` declarations as ordered (property, value) pairs.
    pub fn style_declarations(&self) -> Vec<(String, String)> {
        self.attr("style").map(parse_declarations).unwrap_or_default()
    }

    /// Sets one property inside the inline `style` attribute, keeping the others.
    pub fn set_style_property(&mut self, property: &str, value: &str) {
        let mut decls = self.style_declarations();
        match decls.iter_mut().find(|(p, _)| p == property) {
            Some(slot) => slot.1 = value.to_string(),
            None => decls.push((property.to_string(), value.to_string())),
        }
        let joined = decls
            .iter()
            .map(|(p, v)| format!("{}: {}", p, v))
            .collect::<Vec<_>>()
            .join("; ");
        self.set_attr("style", joined);
    }

    /// First node in pre-order (self included) matching the predicate.
    pub fn find(&self, pred: &dyn Fn(&GraphicsNode) -> bool) -> Option<&GraphicsNode> {
        if pred(self) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(pred))
    }

    /// All nodes in pre-order (self included) matching the predicate.
    pub fn find_all<'a>(&'a self, pred: &dyn Fn(&GraphicsNode) -> bool) -> Vec<&'a GraphicsNode> {
        let mut out = Vec::new();
        self.collect_matching(pred, &mut out);
        out
    }

    fn collect_matching<'a>(&'a self, pred: &dyn Fn(&GraphicsNode) -> bool, out: &mut Vec<&'a GraphicsNode>) {
        if pred(self) {
            out.push(self);
        }
        for child in &self.children {
            child.collect_matching(pred, out);
        }
    }

    /// Removes every descendant for which `keep` returns false. Returns how many were removed.
    pub fn retain_descendants(&mut self, keep: &dyn Fn(&GraphicsNode) -> bool) -> usize {
        let before = self.children.len();
        self.children.retain(|c| keep(c));
        let mut removed = before - self.children.len();
        for child in &mut self.children {
            removed += child.retain_descendants(keep);
        }
        removed
    }

    /// Applies `f` to this node and every descendant, pre-order.
    pub fn visit_mut(&mut self, f: &mut dyn FnMut(&mut GraphicsNode)) {
        f(self);
        for child in &mut self.children {
            child.visit_mut(f);
        }
    }

    /// Deep copy without any computed style: the copy no longer has a styling context.
    pub fn detached_clone(&self) -> GraphicsNode {
        GraphicsNode {
            kind: self.kind.clone(),
            computed: ComputedStyle::new(),
            children: self.children.iter().map(|c| c.detached_clone()).collect(),
        }
    }

    /// Parses SVG text into an unmounted tree.
    ///
    /// Whitespace-only text is dropped except inside text-bearing elements. Attributes in the
    /// XLink and XML namespaces keep their conventional prefixes.
    pub fn parse(svg: &str) -> Result<GraphicsNode, ExportError> {
        let opts = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let doc = roxmltree::Document::parse_with_options(svg, opts)?;
        Ok(convert(doc.root_element()))
    }

    /// Serializes this subtree as SVG markup (no XML declaration).
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        write_node(&mut out, self);
        out
    }
}

const TEXT_BEARING: &[&str] = &["text", "tspan", "textPath", "title", "desc", "style"];

fn convert(node: roxmltree::Node) -> GraphicsNode {
    let tag = node.tag_name().name().to_string();
    let mut out = GraphicsNode::element(tag.clone());
    for attr in node.attributes() {
        let name = match attr.namespace() {
            Some(constants::XLINK_NS) => format!("xlink:{}", attr.name()),
            Some("http://www.w3.org/XML/1998/namespace") => format!("xml:{}", attr.name()),
            _ => attr.name().to_string(),
        };
        out.set_attr(&name, attr.value());
    }
    let keeps_whitespace = TEXT_BEARING.contains(&tag.as_str());
    for child in node.children() {
        if child.is_element() {
            out.children.push(convert(child));
        } else if child.is_text() {
            let text = child.text().unwrap_or_default();
            if keeps_whitespace || !text.trim().is_empty() {
                out.children.push(GraphicsNode::text(text));
            }
        }
    }
    out
}

fn write_node(out: &mut String, node: &GraphicsNode) {
    match &node.kind {
        NodeKind::Text(t) => out.push_str(&escape_xml(t)),
        NodeKind::Element { tag, attributes } => {
            let _ = write!(out, "<{}", tag);
            for (name, value) in attributes {
                let _ = write!(out, " {}=\"{}\"", name, escape_xml(value));
            }
            if node.children.is_empty() {
                out.push_str("/>");
            } else {
                out.push('>');
                for child in &node.children {
                    write_node(out, child);
                }
                let _ = write!(out, "</{}>", tag);
            }
        }
    }
}

/// Serializes a root `<svg>` as a standalone document with XML declaration and namespaces.
pub fn serialize_document(root: &GraphicsNode) -> String {
    let mut root = root.clone();
    root.set_attr("xmlns", constants::SVG_NS);
    root.set_attr("xmlns:xlink", constants::XLINK_NS);
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    write_node(&mut out, &root);
    out.push('\n');
    out
}

pub(crate) fn escape_xml(input: &str) -> String {
    let mut s = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => s.push_str("&amp;"),
            '<' => s.push_str("&lt;"),
            '>' => s.push_str("&gt;"),
            '"' => s.push_str("&quot;"),
            '\'' => s.push_str("&apos;"),
            _ => s.push(ch),
        }
    }
    s
}

/// Splits a CSS declaration block (`"fill: red; stroke: blue"`) into pairs.
pub(crate) fn parse_declarations(block: &str) -> Vec<(String, String)> {
    block
        .split(';')
        .filter_map(|decl| {
            let (prop, value) = decl.split_once(':')?;
            let prop = prop.trim();
            let value = value.trim().trim_end_matches("!important").trim();
            if prop.is_empty() || value.is_empty() {
                None
            } else {
                Some((prop.to_ascii_lowercase(), value.to_string()))
            }
        })
        .collect()
}

/// Formats a coordinate with at most two decimals and no trailing zeros.
pub(crate) fn fmt_num(value: f32) -> String {
    let s = format!("{:.2}", value);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// Parses a unitless or `px` length.
pub(crate) fn parse_length(value: &str) -> Option<f32> {
    let v = value.trim();
    let v = v.strip_suffix("px").unwrap_or(v);
    v.trim().parse::<f32>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"<?xml version="1.0"?>
<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="400" height="300">
  <g class="plot main">
    <rect x="0" y="0" width="10" height="10" style="fill: red"/>
    <text x="5" y="5">A &amp; B</text>
    <image xlink:href="https://example.org/logo.png" width="4" height="4"/>
  </g>
</svg>"##;

    #[test]
    fn parse_keeps_structure_and_prefixes() {
        let root = GraphicsNode::parse(SAMPLE).unwrap();
        assert!(root.is("svg"));
        assert_eq!(root.number_attr("width"), Some(400.0));
        assert_eq!(root.children.len(), 1);

        let group = &root.children[0];
        assert!(group.has_class("plot"));
        assert!(group.has_class("main"));
        assert!(!group.has_class("mai"));
        assert_eq!(group.children.len(), 3);
        assert_eq!(group.children[1].text_content(), "A & B");
        assert_eq!(group.children[2].href(), Some("https://example.org/logo.png"));
    }

    #[test]
    fn serialize_round_trips_through_parser() {
        let root = GraphicsNode::parse(SAMPLE).unwrap();
        let doc = serialize_document(&root);
        assert!(doc.starts_with("<?xml"));
        assert!(doc.contains("xmlns=\"http://www.w3.org/2000/svg\""));
        assert!(doc.contains("xmlns:xlink=\"http://www.w3.org/1999/xlink\""));
        assert!(doc.contains("A &amp; B"));

        let reparsed = GraphicsNode::parse(&doc).unwrap();
        assert_eq!(reparsed.children[0].children[1].text_content(), "A & B");
    }

    #[test]
    fn style_property_is_merged() {
        let mut node = GraphicsNode::element("rect").with_attr("style", "fill: red; opacity: 0.5");
        node.set_style_property("fill", "blue");
        node.set_style_property("stroke", "black");
        assert_eq!(node.attr("style"), Some("fill: blue; opacity: 0.5; stroke: black"));
    }

    #[test]
    fn detached_clone_drops_computed_style() {
        let mut node = GraphicsNode::element("g").with_child(GraphicsNode::element("rect"));
        node.children[0].computed.insert("fill".into(), "red".into());
        let clone = node.detached_clone();
        assert_eq!(clone.children.len(), 1);
        assert!(clone.children[0].computed.is_empty());
    }

    #[test]
    fn numbers_are_compact() {
        assert_eq!(fmt_num(138.0), "138");
        assert_eq!(fmt_num(12.5), "12.5");
        assert_eq!(fmt_num(1.0 / 3.0), "0.33");
        assert_eq!(fmt_num(-0.001), "0");
    }

    #[test]
    fn retain_descendants_removes_nested_matches() {
        let mut root = GraphicsNode::parse(SAMPLE).unwrap();
        let removed = root.retain_descendants(&|n| !n.is("image"));
        assert_eq!(removed, 1);
        assert!(root.find(&|n| n.is("image")).is_none());
    }
}
