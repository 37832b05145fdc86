//! Legend layout: stable greedy row packing and centred rendering.
//!
//! Rows and items keep input order; the packer never reorders for a tighter fit because the
//! order of legend entries carries meaning.

use crate::constants;
use crate::text_metrics::TextMeasurer;
use crate::tree::{fmt_num, GraphicsNode};
use crate::types::{FontSpec, GradientLegend, LegendItem, MarkerShape};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Geometry and typography of the discrete legend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegendStyle {
    /// Marker side length
    pub icon_size: f32,
    /// Gap between marker and label
    pub icon_text_gap: f32,
    /// Gap between items on one row
    pub item_gap: f32,
    /// Height of one row
    pub row_height: f32,
    /// Gap between rows
    pub row_gap: f32,
    /// Stroke width of line markers
    pub line_marker_stroke: f32,
    /// Label font
    pub font: FontSpec,
    /// Label colour
    pub text_color: String,
}

impl Default for LegendStyle {
    fn default() -> Self {
        Self {
            icon_size: constants::ICON_SIZE,
            icon_text_gap: constants::ICON_TEXT_GAP,
            item_gap: constants::ITEM_GAP,
            row_height: constants::ROW_HEIGHT,
            row_gap: constants::ROW_GAP,
            line_marker_stroke: constants::LINE_MARKER_STROKE,
            font: FontSpec::new(constants::LEGEND_FONT_SIZE),
            text_color: constants::TEXT_COLOR.to_string(),
        }
    }
}

/// A legend item with its measured width.
#[derive(Debug, Clone, PartialEq)]
pub struct SizedItem {
    /// The caller's item
    pub item: LegendItem,
    /// Marker + gap + label width
    pub width: f32,
}

/// One packed legend row.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutRow {
    /// Items in input order
    pub items: Vec<SizedItem>,
    /// Sum of item widths plus inter-item gaps
    pub width: f32,
}

/// Width of one item: marker, marker-to-label gap, and the measured label.
pub fn item_width<M: TextMeasurer + ?Sized>(measurer: &M, item: &LegendItem, style: &LegendStyle) -> f32 {
    style.icon_size + style.icon_text_gap + measurer.measure_width(&item.label, &style.font)
}

/// Packs precomputed widths into rows, returning the index range of each row.
///
/// An item starts a new row when appending it (plus one gap) would exceed `max_row_width`
/// and the current row is not empty, so an overlong item still gets a row of its own.
pub fn pack_widths(widths: &[f32], gap: f32, max_row_width: f32) -> Vec<Range<usize>> {
    let mut rows = Vec::new();
    let mut start = 0;
    let mut row_width = 0.0_f32;
    for (i, &w) in widths.iter().enumerate() {
        let non_empty = i > start;
        let candidate = if non_empty { row_width + gap + w } else { w };
        if candidate > max_row_width && non_empty {
            rows.push(start..i);
            start = i;
            row_width = w;
        } else {
            row_width = candidate;
        }
    }
    if start < widths.len() {
        rows.push(start..widths.len());
    }
    rows
}

/// Measures and packs legend items into rows no wider than `max_row_width`.
pub fn pack_legend<M: TextMeasurer + ?Sized>(
    measurer: &M,
    items: &[LegendItem],
    max_row_width: f32,
    style: &LegendStyle,
) -> Vec<LayoutRow> {
    let widths: Vec<f32> = items.iter().map(|i| item_width(measurer, i, style)).collect();
    pack_widths(&widths, style.item_gap, max_row_width)
        .into_iter()
        .map(|range| {
            let items: Vec<SizedItem> = range
                .map(|i| SizedItem {
                    item: items[i].clone(),
                    width: widths[i],
                })
                .collect();
            let width = row_width(&items, style.item_gap);
            LayoutRow { items, width }
        })
        .collect()
}

fn row_width(items: &[SizedItem], gap: f32) -> f32 {
    let sum: f32 = items.iter().map(|i| i.width).sum();
    sum + gap * items.len().saturating_sub(1) as f32
}

/// Total height of the packed rows; zero for no rows.
pub fn legend_height(rows: &[LayoutRow], style: &LegendStyle) -> f32 {
    if rows.is_empty() {
        return 0.0;
    }
    let n = rows.len() as f32;
    n * style.row_height + (n - 1.0) * style.row_gap
}

/// Left edge of a row centred within the legend area.
///
/// An overlong row would start left of the area; it is pinned to the area's left edge.
pub fn row_start_x(row: &LayoutRow, legend_area_width: f32) -> f32 {
    ((legend_area_width - row.width) / 2.0).max(0.0)
}

/// Draws the rows as a `<g>`, each row centred independently, starting at `start_y`.
pub fn render_legend(rows: &[LayoutRow], legend_area_width: f32, start_y: f32, style: &LegendStyle) -> GraphicsNode {
    let mut group = GraphicsNode::element("g").with_attr("class", "export-legend");
    for (r, row) in rows.iter().enumerate() {
        let top = start_y + r as f32 * (style.row_height + style.row_gap);
        let center_y = top + style.row_height / 2.0;
        let mut x = row_start_x(row, legend_area_width);
        for sized in &row.items {
            group.children.push(marker(&sized.item, x, center_y, style));
            group.children.push(
                GraphicsNode::element("text")
                    .with_attr("x", fmt_num(x + style.icon_size + style.icon_text_gap))
                    .with_attr("y", fmt_num(center_y))
                    .with_attr("dominant-baseline", "middle")
                    .with_attr("font-family", &style.font.family)
                    .with_attr("font-size", fmt_num(style.font.size))
                    .with_attr("fill", &style.text_color)
                    .with_text(sized.item.label.clone()),
            );
            x += sized.width + style.item_gap;
        }
    }
    group
}

fn marker(item: &LegendItem, x: f32, center_y: f32, style: &LegendStyle) -> GraphicsNode {
    match item.shape {
        MarkerShape::Rect => GraphicsNode::element("rect")
            .with_attr("x", fmt_num(x))
            .with_attr("y", fmt_num(center_y - style.icon_size / 2.0))
            .with_attr("width", fmt_num(style.icon_size))
            .with_attr("height", fmt_num(style.icon_size))
            .with_attr("rx", 2)
            .with_attr("fill", &item.color),
        MarkerShape::Line => GraphicsNode::element("line")
            .with_attr("x1", fmt_num(x))
            .with_attr("y1", fmt_num(center_y))
            .with_attr("x2", fmt_num(x + style.icon_size))
            .with_attr("y2", fmt_num(center_y))
            .with_attr("stroke", &item.color)
            .with_attr("stroke-width", fmt_num(style.line_marker_stroke))
            .with_attr("stroke-linecap", "round"),
    }
}

/// Height taken by a gradient legend, including its title and end labels.
pub fn gradient_legend_height(legend: &GradientLegend) -> f32 {
    let title = if legend.title.is_some() {
        constants::GRADIENT_LABEL_SPACE
    } else {
        0.0
    };
    title + constants::GRADIENT_HEIGHT + constants::GRADIENT_LABEL_SPACE
}

/// Draws a fixed-size gradient bar with its top-left corner at (`x`, `y`).
pub fn render_gradient_legend(legend: &GradientLegend, x: f32, y: f32, style: &LegendStyle) -> GraphicsNode {
    const GRADIENT_ID: &str = "export-gradient";

    let mut gradient = GraphicsNode::element("linearGradient")
        .with_attr("id", GRADIENT_ID)
        .with_attr("x1", 0)
        .with_attr("y1", 0)
        .with_attr("x2", 1)
        .with_attr("y2", 0);
    for stop in &legend.stops {
        gradient.children.push(
            GraphicsNode::element("stop")
                .with_attr("offset", format!("{}%", fmt_num(stop.offset.clamp(0.0, 1.0) * 100.0)))
                .with_attr("stop-color", &stop.color),
        );
    }

    let label = |text: &str, lx: f32, ly: f32, anchor: &str| {
        GraphicsNode::element("text")
            .with_attr("x", fmt_num(lx))
            .with_attr("y", fmt_num(ly))
            .with_attr("text-anchor", anchor)
            .with_attr("dominant-baseline", "middle")
            .with_attr("font-family", &style.font.family)
            .with_attr("font-size", fmt_num(style.font.size))
            .with_attr("fill", &style.text_color)
            .with_text(text)
    };

    let mut group = GraphicsNode::element("g")
        .with_attr("class", "export-gradient-legend")
        .with_child(GraphicsNode::element("defs").with_child(gradient));
    let mut bar_y = y;
    if let Some(title) = &legend.title {
        group
            .children
            .push(label(title, x, y + constants::GRADIENT_LABEL_SPACE / 2.0, "start"));
        bar_y += constants::GRADIENT_LABEL_SPACE;
    }
    group.children.push(
        GraphicsNode::element("rect")
            .with_attr("x", fmt_num(x))
            .with_attr("y", fmt_num(bar_y))
            .with_attr("width", fmt_num(constants::GRADIENT_WIDTH))
            .with_attr("height", fmt_num(constants::GRADIENT_HEIGHT))
            .with_attr("fill", format!("url(#{})", GRADIENT_ID)),
    );
    let labels_y = bar_y + constants::GRADIENT_HEIGHT + constants::GRADIENT_LABEL_SPACE / 2.0;
    group.children.push(label(&legend.min_label, x, labels_y, "start"));
    group
        .children
        .push(label(&legend.max_label, x + constants::GRADIENT_WIDTH, labels_y, "end"));
    group
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GradientStop;
    use proptest::prelude::*;

    /// Every label measures 82px, so every item is exactly 100px wide.
    struct Fixed;

    impl TextMeasurer for Fixed {
        fn measure_width(&self, _text: &str, _font: &FontSpec) -> f32 {
            82.0
        }
    }

    fn items(n: usize) -> Vec<LegendItem> {
        (0..n)
            .map(|i| LegendItem::new("#336699", format!("Series {}", i), MarkerShape::Rect))
            .collect()
    }

    #[test]
    fn five_hundred_pixel_items_in_three_hundred() {
        let style = LegendStyle::default();
        assert_eq!(style.item_gap, 24.0);
        let rows = pack_legend(&Fixed, &items(5), 300.0, &style);
        assert!((2..=3).contains(&rows.len()));
        assert_eq!(rows.len(), 3);
        for row in &rows {
            assert!(row.width <= 300.0);
        }
        assert_eq!(rows[0].width, 224.0);
        assert_eq!(rows[2].items.len(), 1);
        let labels: Vec<_> = rows
            .iter()
            .flat_map(|r| r.items.iter().map(|i| i.item.label.clone()))
            .collect();
        assert_eq!(labels, items(5).into_iter().map(|i| i.label).collect::<Vec<_>>());
    }

    #[test]
    fn no_items_no_rows_no_height() {
        let style = LegendStyle::default();
        let rows = pack_legend(&Fixed, &[], 300.0, &style);
        assert!(rows.is_empty());
        assert_eq!(legend_height(&rows, &style), 0.0);
        assert!(render_legend(&rows, 300.0, 0.0, &style).children.is_empty());
    }

    #[test]
    fn overlong_item_gets_dedicated_row() {
        assert_eq!(pack_widths(&[50.0, 400.0, 50.0], 10.0, 300.0), vec![0..1, 1..2, 2..3]);
        assert_eq!(pack_widths(&[400.0], 10.0, 300.0), vec![0..1]);
    }

    #[test]
    fn rows_are_centred_independently() {
        let style = LegendStyle::default();
        let rows = pack_legend(&Fixed, &items(3), 300.0, &style);
        let group = render_legend(&rows, 500.0, 40.0, &style);

        // first marker of row 0 and row 1
        let markers: Vec<_> = group.children.iter().filter(|n| n.is("rect")).collect();
        assert_eq!(markers[0].number_attr("x"), Some((500.0 - 224.0) / 2.0));
        assert_eq!(markers[2].number_attr("x"), Some((500.0 - 100.0) / 2.0));
        // row 1 sits one row plus one gap lower
        let y0 = markers[0].number_attr("y").unwrap();
        let y1 = markers[2].number_attr("y").unwrap();
        assert_eq!(y1 - y0, style.row_height + style.row_gap);
    }

    #[test]
    fn line_markers_are_strokes() {
        let style = LegendStyle::default();
        let items = vec![LegendItem::new("#e00", "Trend", MarkerShape::Line)];
        let rows = pack_legend(&Fixed, &items, 300.0, &style);
        let group = render_legend(&rows, 300.0, 0.0, &style);
        let line = &group.children[0];
        assert!(line.is("line"));
        assert_eq!(line.attr("stroke"), Some("#e00"));
        assert_eq!(line.attr("y1"), line.attr("y2"));
        assert_eq!(group.children[1].text_content(), "Trend");
    }

    #[test]
    fn gradient_legend_has_fixed_size() {
        let legend = GradientLegend {
            title: Some("Change in income".into()),
            stops: vec![
                GradientStop { offset: 0.0, color: "#b2182b".into() },
                GradientStop { offset: 1.0, color: "#2166ac".into() },
            ],
            min_label: "-£500".into(),
            max_label: "+£500".into(),
        };
        let node = render_gradient_legend(&legend, 10.0, 20.0, &LegendStyle::default());
        let bar = node.find(&|n| n.is("rect")).unwrap();
        assert_eq!(bar.number_attr("width"), Some(constants::GRADIENT_WIDTH));
        assert_eq!(bar.number_attr("y"), Some(20.0 + constants::GRADIENT_LABEL_SPACE));
        assert_eq!(node.find_all(&|n| n.is("stop")).len(), 2);
        assert_eq!(
            gradient_legend_height(&legend),
            2.0 * constants::GRADIENT_LABEL_SPACE + constants::GRADIENT_HEIGHT
        );
    }

    proptest! {
        #[test]
        fn packed_rows_respect_bound(
            widths in proptest::collection::vec(1.0f32..250.0, 0..30),
            gap in 0.0f32..30.0,
            max in 50.0f32..600.0,
        ) {
            let rows = pack_widths(&widths, gap, max);
            let mut next = 0;
            for range in &rows {
                prop_assert_eq!(range.start, next);
                next = range.end;
                let slice = &widths[range.clone()];
                let total: f32 = slice.iter().sum::<f32>() + gap * (slice.len() as f32 - 1.0);
                prop_assert!(total <= max + 1e-3 || (slice.len() == 1 && slice[0] > max));
            }
            prop_assert_eq!(next, widths.len());
        }
    }
}
