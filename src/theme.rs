//! Renderer-side style resolution.
//!
//! A live chart's look depends on a styling context (theme stylesheet, `<style>` blocks,
//! inherited values) that disappears once a copy is detached. [`mount`] plays the renderer's
//! part: it resolves every presentation property of every element and records the result in
//! [`GraphicsNode::computed`], the explicit style record the exporter later snapshots.

use crate::tree::{parse_declarations, ComputedStyle, GraphicsNode, NodeKind};

/// A presentation property the pipeline tracks.
#[derive(Debug, Clone, Copy)]
pub struct Property {
    /// CSS property name
    pub name: &'static str,
    /// Whether children inherit the parent's resolved value
    pub inherited: bool,
    /// Platform default; `None` when there is no portable default worth skipping
    pub initial: Option<&'static str>,
}

const fn prop(name: &'static str, inherited: bool, initial: Option<&'static str>) -> Property {
    Property {
        name,
        inherited,
        initial,
    }
}

/// Presentation properties resolved on mount and snapshotted on export.
pub const PROPERTIES: &[Property] = &[
    prop("fill", true, Some("black")),
    prop("fill-opacity", true, Some("1")),
    prop("stroke", true, Some("none")),
    prop("stroke-width", true, Some("1")),
    prop("stroke-dasharray", true, Some("none")),
    prop("stroke-opacity", true, Some("1")),
    prop("opacity", false, Some("1")),
    prop("font-family", true, None),
    prop("font-size", true, Some("16px")),
    prop("font-weight", true, Some("normal")),
    prop("font-style", true, Some("normal")),
    prop("text-anchor", true, Some("start")),
    prop("dominant-baseline", false, Some("auto")),
    prop("alignment-baseline", false, Some("auto")),
    prop("visibility", true, Some("visible")),
    prop("display", false, Some("inline")),
];

/// Looks up a tracked property by name.
pub fn property(name: &str) -> Option<&'static Property> {
    PROPERTIES.iter().find(|p| p.name == name)
}

/// Simple selector: `*`, `tag`, `.class`, or `tag.class`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    tag: Option<String>,
    class: Option<String>,
}

impl Selector {
    /// Parses a simple selector; compound or combinator selectors return `None`.
    pub fn parse(text: &str) -> Option<Selector> {
        let text = text.trim();
        if text.is_empty() || text.contains(|c: char| c.is_whitespace() || "#>+~:[".contains(c)) {
            return None;
        }
        if text == "*" {
            return Some(Selector { tag: None, class: None });
        }
        let (tag, class) = match text.split_once('.') {
            Some((tag, class)) if !class.contains('.') => (tag, Some(class)),
            Some(_) => return None,
            None => (text, None),
        };
        Some(Selector {
            tag: (!tag.is_empty()).then(|| tag.to_string()),
            class: class.map(str::to_string),
        })
    }

    /// Whether the selector matches the element.
    pub fn matches(&self, node: &GraphicsNode) -> bool {
        let Some(tag) = node.tag() else {
            return false;
        };
        self.tag.as_deref().map_or(true, |t| t == tag)
            && self.class.as_deref().map_or(true, |c| node.has_class(c))
    }
}

/// One stylesheet rule.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRule {
    /// Which elements the rule applies to
    pub selector: Selector,
    /// Declarations in source order
    pub declarations: Vec<(String, String)>,
}

/// An ordered stylesheet: later rules win over earlier ones.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Theme {
    /// Rules in cascade order
    pub rules: Vec<StyleRule>,
}

impl Theme {
    /// Parses a flat stylesheet of simple-selector rules. Unsupported selectors are skipped.
    pub fn parse_css(css: &str) -> Theme {
        let mut rules = Vec::new();
        for block in strip_comments(css).split('}') {
            let Some((selectors, body)) = block.split_once('{') else {
                continue;
            };
            let declarations = parse_declarations(body);
            for sel in selectors.split(',') {
                match Selector::parse(sel) {
                    Some(selector) => rules.push(StyleRule {
                        selector,
                        declarations: declarations.clone(),
                    }),
                    None => log::debug!("skipping unsupported selector {:?}", sel.trim()),
                }
            }
        }
        Theme { rules }
    }

    /// Collects every `<style>` block inside a tree into one theme.
    pub fn from_embedded_styles(root: &GraphicsNode) -> Theme {
        let css: String = root
            .find_all(&|n| n.is("style"))
            .into_iter()
            .map(|n| n.text_content())
            .collect::<Vec<_>>()
            .join("\n");
        Theme::parse_css(&css)
    }

    /// Appends another theme's rules after this one's.
    pub fn extend(&mut self, other: Theme) {
        self.rules.extend(other.rules);
    }
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

/// Resolves computed styles for every element of `root`.
///
/// Cascade, lowest to highest: inherited parent value or initial value, presentation
/// attribute, matching theme rules in order, inline `style`.
pub fn mount(root: &mut GraphicsNode, theme: &Theme) {
    let initial: ComputedStyle = PROPERTIES
        .iter()
        .filter_map(|p| p.initial.map(|v| (p.name.to_string(), v.to_string())))
        .collect();
    resolve(root, theme, &initial);
}

fn resolve(node: &mut GraphicsNode, theme: &Theme, parent: &ComputedStyle) {
    if let NodeKind::Text(_) = node.kind {
        return;
    }
    let mut computed = ComputedStyle::new();
    for p in PROPERTIES {
        let inherited = if p.inherited { parent.get(p.name) } else { None };
        if let Some(value) = inherited.cloned().or_else(|| p.initial.map(str::to_string)) {
            computed.insert(p.name.to_string(), value);
        }
    }
    for p in PROPERTIES {
        if let Some(value) = node.attr(p.name) {
            computed.insert(p.name.to_string(), value.to_string());
        }
    }
    for rule in theme.rules.iter().filter(|r| r.selector.matches(node)) {
        for (name, value) in &rule.declarations {
            if property(name).is_some() {
                computed.insert(name.clone(), value.clone());
            }
        }
    }
    for (name, value) in node.style_declarations() {
        if property(&name).is_some() {
            computed.insert(name, value);
        }
    }
    if parent.get("display").map(String::as_str) == Some("none") {
        computed.insert("display".into(), "none".into());
    }

    for child in &mut node.children {
        resolve(child, theme, &computed);
    }
    node.computed = computed;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_parsing() {
        assert!(Selector::parse("rect").is_some());
        assert!(Selector::parse(".bar").is_some());
        assert!(Selector::parse("path.line").is_some());
        assert!(Selector::parse("*").is_some());
        assert!(Selector::parse("g > rect").is_none());
        assert!(Selector::parse("#id").is_none());
        assert!(Selector::parse("a.b.c").is_none());
    }

    #[test]
    fn cascade_order_and_inheritance() {
        let mut root = GraphicsNode::element("g")
            .with_attr("class", "series")
            .with_attr("font-size", "12px")
            .with_child(
                GraphicsNode::element("rect")
                    .with_attr("class", "bar")
                    .with_attr("fill", "green"),
            )
            .with_child(
                GraphicsNode::element("path")
                    .with_attr("class", "bar")
                    .with_attr("style", "fill: none"),
            );
        let theme = Theme::parse_css(
            "/* theme */ .bar { fill: steelblue; stroke: #333 }\n.series { opacity: 0.8 }",
        );
        mount(&mut root, &theme);

        assert_eq!(root.computed["opacity"], "0.8");
        let rect = &root.children[0];
        assert_eq!(rect.computed["fill"], "steelblue");
        assert_eq!(rect.computed["stroke"], "#333");
        assert_eq!(rect.computed["font-size"], "12px");
        // opacity does not inherit
        assert_eq!(rect.computed["opacity"], "1");
        assert_eq!(root.children[1].computed["fill"], "none");
    }

    #[test]
    fn embedded_style_blocks_form_a_theme() {
        let root = GraphicsNode::element("svg").with_child(
            GraphicsNode::element("style").with_text(".axis text { fill: red } .tick { stroke: grey }"),
        );
        let theme = Theme::from_embedded_styles(&root);
        assert_eq!(theme.rules.len(), 1);
    }
}
