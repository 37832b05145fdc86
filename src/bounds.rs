//! Geometry estimation on graphics trees.
//!
//! Just enough bounding-box arithmetic to find the canvas size of a live chart and the
//! vertical band its built-in legend occupies. Text extents are approximated from the font
//! size; paths use their control points, which over-approximates curves.

use crate::constants;
use crate::tree::{parse_length, GraphicsNode};
use std::str::FromStr;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Left edge
    pub min_x: f32,
    /// Top edge
    pub min_y: f32,
    /// Right edge
    pub max_x: f32,
    /// Bottom edge
    pub max_y: f32,
}

impl Bounds {
    fn point(x: f32, y: f32) -> Self {
        Self { min_x: x, min_y: y, max_x: x, max_y: y }
    }

    fn include(&mut self, x: f32, y: f32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    fn union(self, other: Bounds) -> Bounds {
        Bounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Height of the box.
    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }
}

/// Canvas size declared by a root `<svg>`: `width`/`height`, then the `viewBox`, then the
/// extent of its drawn content.
pub fn canvas_size(root: &GraphicsNode) -> (f32, f32) {
    let view_box = root.attr("viewBox").and_then(parse_view_box);
    let content = || subtree_bounds(root);
    let width = root
        .number_attr("width")
        .or(view_box.map(|v| v[2]))
        .or_else(|| content().map(|b| b.max_x.max(0.0)))
        .unwrap_or(0.0);
    let height = root
        .number_attr("height")
        .or(view_box.map(|v| v[3]))
        .or_else(|| content().map(|b| b.max_y.max(0.0)))
        .unwrap_or(0.0);
    (width, height)
}

pub(crate) fn parse_view_box(value: &str) -> Option<[f32; 4]> {
    let nums: Vec<f32> = value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;
    match nums.as_slice() {
        [x, y, w, h] => Some([*x, *y, *w, *h]),
        _ => None,
    }
}

/// Maps the root's `viewBox` user space onto its pixel canvas; identity without a usable
/// `viewBox`. Aspect ratio is not preserved, matching how composed documents scale content.
pub fn view_box_transform(root: &GraphicsNode) -> svgtypes::Transform {
    match root.attr("viewBox").and_then(parse_view_box) {
        Some([x, y, w, h]) if w > 0.0 && h > 0.0 => {
            let (width, height) = canvas_size(root);
            let (sx, sy) = (f64::from(width / w), f64::from(height / h));
            svgtypes::Transform::new(sx, 0.0, 0.0, sy, -f64::from(x) * sx, -f64::from(y) * sy)
        }
        _ => svgtypes::Transform::default(),
    }
}

/// Bounds of everything drawn under `node`, in the coordinate space of `node`'s parent.
pub fn subtree_bounds(node: &GraphicsNode) -> Option<Bounds> {
    bounds_in(node, svgtypes::Transform::default())
}

fn bounds_in(node: &GraphicsNode, parent: svgtypes::Transform) -> Option<Bounds> {
    node.tag()?;
    if node.attr("display") == Some("none") || node.computed.get("display").map(String::as_str) == Some("none") {
        return None;
    }
    let ts = match node.attr("transform").map(svgtypes::Transform::from_str) {
        Some(Ok(local)) => multiply(parent, local),
        _ => parent,
    };
    let own = own_points(node).and_then(|points| {
        let mut it = points.into_iter().map(|(x, y)| apply(ts, x, y));
        let (x, y) = it.next()?;
        let mut b = Bounds::point(x, y);
        for (x, y) in it {
            b.include(x, y);
        }
        Some(b)
    });
    node.children
        .iter()
        .filter_map(|c| bounds_in(c, ts))
        .fold(own, |acc, b| Some(acc.map_or(b, |a| a.union(b))))
}

fn num(node: &GraphicsNode, name: &str) -> f32 {
    node.number_attr(name).unwrap_or(0.0)
}

fn own_points(node: &GraphicsNode) -> Option<Vec<(f32, f32)>> {
    let tag = node.tag()?;
    let points = match tag {
        "rect" | "image" | "foreignObject" | "use" => {
            let (x, y) = (num(node, "x"), num(node, "y"));
            let (w, h) = (num(node, "width"), num(node, "height"));
            vec![(x, y), (x + w, y + h)]
        }
        "circle" => {
            let (cx, cy, r) = (num(node, "cx"), num(node, "cy"), num(node, "r"));
            vec![(cx - r, cy - r), (cx + r, cy + r)]
        }
        "ellipse" => {
            let (cx, cy) = (num(node, "cx"), num(node, "cy"));
            let (rx, ry) = (num(node, "rx"), num(node, "ry"));
            vec![(cx - rx, cy - ry), (cx + rx, cy + ry)]
        }
        "line" => vec![
            (num(node, "x1"), num(node, "y1")),
            (num(node, "x2"), num(node, "y2")),
        ],
        "polyline" | "polygon" => {
            let values: Vec<f32> = node
                .attr("points")
                .unwrap_or_default()
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter_map(|s| s.parse().ok())
                .collect();
            values.chunks_exact(2).map(|p| (p[0], p[1])).collect()
        }
        "path" => path_points(node.attr("d").unwrap_or_default()),
        "text" => {
            let size = node
                .attr("font-size")
                .or_else(|| node.computed.get("font-size").map(String::as_str))
                .and_then(parse_length)
                .unwrap_or(16.0);
            let (x, y) = (num(node, "x"), num(node, "y"));
            let width = node.text_content().chars().count() as f32 * size * 0.55;
            vec![(x, y - size * 0.8), (x + width, y + size * 0.2)]
        }
        _ => return None,
    };
    (!points.is_empty()).then_some(points)
}

fn path_points(d: &str) -> Vec<(f32, f32)> {
    use svgtypes::SimplePathSegment as Seg;
    let mut points = Vec::new();
    for seg in svgtypes::SimplifyingPathParser::from(d) {
        match seg {
            Ok(Seg::MoveTo { x, y }) | Ok(Seg::LineTo { x, y }) => points.push((x, y)),
            Ok(Seg::Quadratic { x1, y1, x, y }) => points.extend([(x1, y1), (x, y)]),
            Ok(Seg::CurveTo { x1, y1, x2, y2, x, y }) => points.extend([(x1, y1), (x2, y2), (x, y)]),
            Ok(Seg::ClosePath) => {}
            Err(_) => break,
        }
    }
    points.into_iter().map(|(x, y)| (x as f32, y as f32)).collect()
}

fn multiply(p: svgtypes::Transform, c: svgtypes::Transform) -> svgtypes::Transform {
    svgtypes::Transform::new(
        p.a * c.a + p.c * c.b,
        p.b * c.a + p.d * c.b,
        p.a * c.c + p.c * c.d,
        p.b * c.c + p.d * c.d,
        p.a * c.e + p.c * c.f + p.e,
        p.b * c.e + p.d * c.f + p.f,
    )
}

fn apply(ts: svgtypes::Transform, x: f32, y: f32) -> (f32, f32) {
    let (x, y) = (f64::from(x), f64::from(y));
    (
        (ts.a * x + ts.c * y + ts.e) as f32,
        (ts.b * x + ts.d * y + ts.f) as f32,
    )
}

/// Vertical space at the bottom of the canvas already taken by the chart's own legend.
///
/// Built-in legends are elements carrying the [`constants::BUILT_IN_LEGEND_CLASS`] class
/// token. Legend bounds are mapped through the root's `viewBox` so they are compared in
/// pixels. Only legends whose top edge lies in the lower half of the canvas count as footer
/// space; the result is `content_height - top of the highest such legend`, clamped to
/// `0..=content_height`.
pub fn reserved_footer_height(root: &GraphicsNode, content_height: f32) -> f32 {
    let mut top: Option<f32> = None;
    collect_legend_tops(root, view_box_transform(root), &mut |b| {
        if b.min_y >= content_height / 2.0 {
            top = Some(top.map_or(b.min_y, |t| t.min(b.min_y)));
        } else {
            log::debug!("built-in legend at y={} is not in the footer band", b.min_y);
        }
    });
    top.map(|t| (content_height - t).clamp(0.0, content_height))
        .unwrap_or(0.0)
}

fn collect_legend_tops(node: &GraphicsNode, parent: svgtypes::Transform, found: &mut dyn FnMut(Bounds)) {
    if node.tag().is_none() {
        return;
    }
    if is_built_in_legend(node) {
        if let Some(b) = bounds_in(node, parent) {
            found(b);
        }
        return;
    }
    let ts = match node.attr("transform").map(svgtypes::Transform::from_str) {
        Some(Ok(local)) => multiply(parent, local),
        _ => parent,
    };
    for child in &node.children {
        collect_legend_tops(child, ts, found);
    }
}

/// Whether the node is a legend drawn by the charting library itself.
pub fn is_built_in_legend(node: &GraphicsNode) -> bool {
    node.has_class(constants::BUILT_IN_LEGEND_CLASS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart_with_legend(legend_y: f32) -> GraphicsNode {
        GraphicsNode::parse(&format!(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="600" height="400">
  <g class="plot"><rect x="40" y="20" width="520" height="300"/></g>
  <g class="legend" transform="translate(100,{legend_y})">
    <rect x="0" y="0" width="12" height="12"/>
    <text x="18" y="10" font-size="12">Baseline</text>
  </g>
</svg>"##
        ))
        .unwrap()
    }

    #[test]
    fn canvas_size_prefers_explicit_dimensions() {
        let root = chart_with_legend(360.0);
        assert_eq!(canvas_size(&root), (600.0, 400.0));

        let view_box_only = GraphicsNode::element("svg").with_attr("viewBox", "0 0 320 240");
        assert_eq!(canvas_size(&view_box_only), (320.0, 240.0));

        let bare = GraphicsNode::element("svg")
            .with_child(GraphicsNode::element("rect").with_attr("width", 50).with_attr("height", 70));
        assert_eq!(canvas_size(&bare), (50.0, 70.0));
    }

    #[test]
    fn transformed_group_bounds() {
        let group = GraphicsNode::element("g")
            .with_attr("transform", "translate(10,20) scale(2)")
            .with_child(
                GraphicsNode::element("rect")
                    .with_attr("x", 1)
                    .with_attr("y", 1)
                    .with_attr("width", 5)
                    .with_attr("height", 5),
            );
        let b = subtree_bounds(&group).unwrap();
        assert_eq!((b.min_x, b.min_y, b.max_x, b.max_y), (12.0, 22.0, 22.0, 32.0));
    }

    #[test]
    fn path_bounds_use_absolute_points() {
        let path = GraphicsNode::element("path").with_attr("d", "M10 10 l20 0 v30 Z");
        let b = subtree_bounds(&path).unwrap();
        assert_eq!((b.min_x, b.min_y, b.max_x, b.max_y), (10.0, 10.0, 30.0, 40.0));
    }

    #[test]
    fn reserved_space_is_measured_from_legend_top() {
        let root = chart_with_legend(360.0);
        // text top is 10 - 0.8 * 12 = 0.4 above the group's origin, below the rect's top at 0
        let reserved = reserved_footer_height(&root, 400.0);
        assert!((reserved - 40.0).abs() < 1e-3, "reserved = {}", reserved);
    }

    #[test]
    fn reserved_space_is_in_pixels_for_scaled_view_box() {
        let root = GraphicsNode::element("svg")
            .with_attr("width", 300)
            .with_attr("height", 200)
            .with_attr("viewBox", "0 0 600 400")
            .with_child(
                GraphicsNode::element("g")
                    .with_attr("class", "legend")
                    .with_attr("transform", "translate(100,360)")
                    .with_child(GraphicsNode::element("rect").with_attr("width", 12).with_attr("height", 12)),
            );
        assert_eq!(reserved_footer_height(&root, 200.0), 20.0);
    }

    #[test]
    fn view_box_origin_is_shifted_out() {
        let root = GraphicsNode::element("svg")
            .with_attr("width", 100)
            .with_attr("height", 100)
            .with_attr("viewBox", "-50 -50 200 200");
        assert_eq!(apply(view_box_transform(&root), -50.0, 150.0), (0.0, 100.0));
        let unscaled = GraphicsNode::element("svg").with_attr("width", 100);
        assert_eq!(view_box_transform(&unscaled), svgtypes::Transform::default());
    }

    #[test]
    fn legend_in_upper_half_reserves_nothing() {
        let root = chart_with_legend(10.0);
        assert_eq!(reserved_footer_height(&root, 400.0), 0.0);
        let no_legend = GraphicsNode::element("svg");
        assert_eq!(reserved_footer_height(&no_legend, 400.0), 0.0);
    }
}
