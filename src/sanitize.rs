//! Removal of everything a standalone document would have to load from the network.
//!
//! Network references can hide in four places: link attributes (`href`, `xlink:href`, `src`),
//! `url(...)` values in presentation attributes, inline `style` declarations and `<style>`
//! text (including `@import`). Raster sources that are not `data:` URIs are removed outright;
//! `url(...)` paint and style values fall back to `none`.

use crate::embed::{is_data_uri, is_network_url};
use crate::error::ExportError;
use crate::tree::{serialize_document, GraphicsNode, NodeKind};

const LINK_ATTRIBUTES: [&str; 3] = ["href", "xlink:href", "src"];

/// Strips network-dependent content in place. Returns how many nodes, attributes and CSS
/// references were removed or rewritten.
///
/// - `<image>` without a `data:` source and `<script>` are removed
/// - `<feImage>` is kept only for `data:` sources or local `#fragment` references
/// - `<use>` pointing at a network document is removed
/// - any other non-hyperlink element loses network link attributes
/// - network `url(...)` values become `none`, and network `@import` rules are dropped
pub fn strip_external_resources(root: &mut GraphicsNode) -> usize {
    let mut removed = root.retain_descendants(&|n| {
        if n.is("image") {
            n.href().map(is_data_uri).unwrap_or(false)
        } else if n.is("feImage") {
            n.href().map(|h| is_data_uri(h) || h.starts_with('#')).unwrap_or(false)
        } else if n.is("use") {
            !n.href().map(is_network_url).unwrap_or(false)
        } else {
            !n.is("script")
        }
    });
    root.visit_mut(&mut |node| removed += neutralize_node(node));
    removed
}

fn neutralize_node(node: &mut GraphicsNode) -> usize {
    if node.tag().is_none() {
        return 0;
    }
    let mut changes = 0;
    if !node.is("a") {
        let links: Vec<String> = node
            .attributes()
            .iter()
            .filter(|(name, value)| LINK_ATTRIBUTES.contains(&name.as_str()) && is_network_url(value))
            .map(|(name, _)| name.clone())
            .collect();
        for name in links {
            node.remove_attr(&name);
            changes += 1;
        }
    }
    let rewrites: Vec<(String, String)> = node
        .attributes()
        .iter()
        .filter_map(|(name, value)| neutralize_urls(value).map(|clean| (name.clone(), clean)))
        .collect();
    for (name, value) in rewrites {
        node.set_attr(&name, value);
        changes += 1;
    }
    if node.is("style") {
        for child in &mut node.children {
            if let NodeKind::Text(css) = &mut child.kind {
                let (clean, count) = sanitize_css(css);
                if count > 0 {
                    *css = clean;
                    changes += count;
                }
            }
        }
    }
    changes
}

/// Every network URL a renderer would have to fetch to draw the tree.
pub fn external_references(root: &GraphicsNode) -> Vec<String> {
    let mut found = Vec::new();
    for node in root.find_all(&|n| n.tag().is_some()) {
        for (name, value) in node.attributes() {
            if LINK_ATTRIBUTES.contains(&name.as_str()) && !node.is("a") && is_network_url(value) {
                found.push(value.clone());
            }
            found.extend(network_urls(value));
        }
        if node.is("style") {
            let css = node.text_content();
            found.extend(network_urls(&css));
            for statement in import_statements(&css) {
                if let Some(target) = import_target(statement).filter(|t| is_network_url(t)) {
                    found.push(target.to_string());
                }
            }
        }
    }
    found.dedup();
    found
}

/// Parses a standalone SVG (a logo, say), strips it and re-serializes it.
///
/// Fails if the markup does not parse or a network reference survives stripping.
pub fn sanitize_svg(svg: &str) -> Result<String, ExportError> {
    let mut root = GraphicsNode::parse(svg)?;
    let removed = strip_external_resources(&mut root);
    if removed > 0 {
        log::debug!("removed {} external references from embedded svg", removed);
    }
    if let Some(url) = external_references(&root).into_iter().next() {
        return Err(ExportError::ExternalReference(url));
    }
    Ok(serialize_document(&root))
}

pub(crate) fn css_urls(value: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut rest = value;
    while let Some(start) = rest.find("url(") {
        let after = &rest[start + 4..];
        let Some(end) = after.find(')') else {
            break;
        };
        out.push(unquote(&after[..end]));
        rest = &after[end + 1..];
    }
    out
}

fn network_urls(value: &str) -> impl Iterator<Item = String> + '_ {
    css_urls(value).into_iter().filter(|u| is_network_url(u)).map(str::to_string)
}

fn unquote(raw: &str) -> &str {
    raw.trim().trim_matches(|c| c == '"' || c == '\'')
}

/// Replaces every network `url(...)` in a CSS value with `none`. `None` when nothing changed.
fn neutralize_urls(value: &str) -> Option<String> {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    let mut changed = false;
    while let Some(start) = rest.find("url(") {
        let after = &rest[start + 4..];
        let Some(end) = after.find(')') else {
            break;
        };
        out.push_str(&rest[..start]);
        if is_network_url(unquote(&after[..end])) {
            out.push_str("none");
            changed = true;
        } else {
            out.push_str(&rest[start..start + 4 + end + 1]);
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    changed.then_some(out)
}

fn import_statements(css: &str) -> Vec<&str> {
    css.match_indices("@import")
        .map(|(start, _)| {
            let tail = &css[start..];
            &tail[..tail.find(';').map_or(tail.len(), |i| i + 1)]
        })
        .collect()
}

/// Target of an `@import` statement in either `url(...)` or quoted-string form.
fn import_target(statement: &str) -> Option<&str> {
    let body = statement
        .trim_start_matches("@import")
        .trim()
        .trim_end_matches(';')
        .trim();
    if let Some(url) = css_urls(body).into_iter().next() {
        return Some(url);
    }
    let quote = body.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    body[1..].split(quote).next()
}

/// Drops network `@import` rules and neutralizes remaining network `url(...)` references.
fn sanitize_css(css: &str) -> (String, usize) {
    let mut count = 0;
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("@import") {
        let tail = &rest[start..];
        let end = tail.find(';').map_or(tail.len(), |i| i + 1);
        let statement = &tail[..end];
        out.push_str(&rest[..start]);
        if import_target(statement).map_or(false, is_network_url) {
            count += 1;
        } else {
            out.push_str(statement);
        }
        rest = &tail[end..];
    }
    out.push_str(rest);

    let remaining = network_urls(&out).count();
    match neutralize_urls(&out) {
        Some(clean) => (clean, count + remaining),
        None => (out, count),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn styled(css: &str) -> GraphicsNode {
        GraphicsNode::element("svg")
            .with_child(GraphicsNode::element("style").with_text(css))
            .with_child(GraphicsNode::element("rect").with_attr("width", 10))
    }

    #[test]
    fn network_imports_are_dropped_from_style_text() {
        let mut root = styled(
            "@import url('https://fonts.googleapis.com/css?family=Roboto');\n\
             @import \"local.css\";\n\
             .bar { fill: steelblue }",
        );
        assert_eq!(external_references(&root).len(), 1);

        assert_eq!(strip_external_resources(&mut root), 1);
        let css = root.children[0].text_content();
        assert!(!css.contains("googleapis"));
        assert!(css.contains("@import \"local.css\";"));
        assert!(css.contains(".bar { fill: steelblue }"));
        assert!(external_references(&root).is_empty());
    }

    #[test]
    fn quoted_network_import_is_detected() {
        let root = styled("@import \"https://cdn.example.com/theme.css\";");
        assert_eq!(external_references(&root), vec!["https://cdn.example.com/theme.css"]);
    }

    #[test]
    fn font_face_sources_fall_back_to_none() {
        let mut root = styled("@font-face { font-family: Brand; src: url(https://cdn.example.com/brand.woff2); }");
        strip_external_resources(&mut root);
        let css = root.children[0].text_content();
        assert!(css.contains("src: none;"));
        assert!(external_references(&root).is_empty());
    }

    #[test]
    fn paint_and_style_urls_fall_back_to_none() {
        let mut root = GraphicsNode::element("svg").with_child(
            GraphicsNode::element("rect")
                .with_attr("fill", "url(https://tiles.example.org/p.svg#p)")
                .with_attr("style", "stroke: url('//cdn.example.com/s.svg#g'); opacity: 0.5")
                .with_attr("mask", "url(#local)"),
        );
        assert_eq!(strip_external_resources(&mut root), 2);
        let rect = &root.children[0];
        assert_eq!(rect.attr("fill"), Some("none"));
        assert_eq!(rect.attr("style"), Some("stroke: none; opacity: 0.5"));
        assert_eq!(rect.attr("mask"), Some("url(#local)"));
    }

    #[test]
    fn fe_image_follows_image_rules() {
        let mut root = GraphicsNode::element("svg").with_child(
            GraphicsNode::element("filter")
                .with_child(GraphicsNode::element("feImage").with_attr("href", "https://tiles.example.org/t.png"))
                .with_child(GraphicsNode::element("feImage").with_attr("href", "#shape"))
                .with_child(GraphicsNode::element("feImage").with_attr("href", "data:image/png;base64,AAAA")),
        );
        assert_eq!(strip_external_resources(&mut root), 1);
        assert_eq!(root.children[0].children.len(), 2);
    }

    #[test]
    fn scripts_and_stray_links_are_removed_but_hyperlinks_stay() {
        let mut root = GraphicsNode::element("svg")
            .with_child(GraphicsNode::element("script").with_attr("src", "https://cdn.example.com/x.js"))
            .with_child(GraphicsNode::element("linearGradient").with_attr("href", "https://example.com/g.svg#g"))
            .with_child(GraphicsNode::element("a").with_attr("href", "https://example.com"));
        strip_external_resources(&mut root);
        assert!(root.find(&|n| n.is("script")).is_none());
        assert_eq!(root.children[0].attr("href"), None);
        assert_eq!(root.children[1].attr("href"), Some("https://example.com"));
        assert!(external_references(&root).is_empty());
    }

    #[test]
    fn svg_markup_is_cleaned_and_reserialized() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="40" height="20">
  <style>@import url(https://fonts.example.com/a.css);</style>
  <image xlink:href="https://example.com/mark.png" width="20" height="20"/>
  <script>alert(1)</script>
  <circle cx="30" cy="10" r="8" fill="red"/>
</svg>"#;
        let clean = sanitize_svg(svg).unwrap();
        assert!(!clean.contains("https://"));
        assert!(!clean.contains("<script"));
        assert!(clean.contains("<circle"));
        assert!(GraphicsNode::parse(&clean).is_ok());
    }

    #[test]
    fn css_url_targets_are_unquoted() {
        assert_eq!(css_urls("fill: url('https://a.example/p.svg#p'); stroke: url(#g)"), vec!["https://a.example/p.svg#p", "#g"]);
    }
}
