use super::{locate_graphics_tree, text_node, DocumentLayout, Exporter, FooterLegend};
use crate::constants::{self, REGION_CARD_PADDING};
use crate::download::DownloadSink;
use crate::embed::ImageEmbedder;
use crate::error::ExportError;
use crate::text_metrics::{self, TextMeasurer};
use crate::tree::{fmt_num, GraphicsNode};
use crate::types::{ExportedDocument, MapExportOptions, RegionCard};

/// Pan/zoom state of a map layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomTransform {
    /// Horizontal pan
    pub x: f32,
    /// Vertical pan
    pub y: f32,
    /// Scale factor
    pub k: f32,
}

impl ZoomTransform {
    /// No pan, unit scale.
    pub const IDENTITY: ZoomTransform = ZoomTransform { x: 0.0, y: 0.0, k: 1.0 };

    /// `transform` attribute value for this state.
    pub fn to_attribute(&self) -> String {
        format!("translate({},{}) scale({})", fmt_num(self.x), fmt_num(self.y), fmt_num(self.k))
    }
}

impl Default for ZoomTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Sets every element carrying `class` back to the identity zoom. Returns how many were reset.
///
/// Only the given tree is touched, so an interactive map keeps its current view while its
/// exported copy shows the full extent.
pub fn reset_zoom(root: &mut GraphicsNode, class: &str) -> usize {
    let mut reset = 0;
    let identity = ZoomTransform::IDENTITY.to_attribute();
    root.visit_mut(&mut |node| {
        if node.has_class(class) {
            node.set_attr("transform", &identity);
            reset += 1;
        }
    });
    reset
}

impl<M: TextMeasurer, E: ImageEmbedder, S: DownloadSink> Exporter<M, E, S> {
    /// Exports a map and hands it to the download sink. Returns `false` when nothing was
    /// delivered.
    pub async fn export_map(&self, tree: Option<&GraphicsNode>, filename: &str, options: &MapExportOptions) -> bool {
        log::debug!("exporting map as {}", filename);
        let result = self.build_map_document(tree, filename, options).await;
        self.deliver(result).await
    }

    /// Builds the standalone document for a map without delivering it.
    ///
    /// The zoom layer is reset on the copy, the footer carries a gradient legend instead of
    /// discrete items, and the selected region (if any) is drawn as a card at the top-right
    /// of the map.
    pub async fn build_map_document(
        &self,
        tree: Option<&GraphicsNode>,
        filename: &str,
        options: &MapExportOptions,
    ) -> Result<ExportedDocument, ExportError> {
        let live = locate_graphics_tree(tree).ok_or(ExportError::MissingSource)?;
        let zoom_class = options
            .zoom_layer_class
            .as_deref()
            .unwrap_or(constants::ZOOM_LAYER_CLASS);
        let card = options.region_card();
        self.compose(
            live,
            filename,
            &options.base,
            options.gradient.as_ref().map(FooterLegend::Gradient),
            |clone| {
                let reset = reset_zoom(clone, zoom_class);
                if reset == 0 {
                    log::debug!("no .{} layer found in map", zoom_class);
                }
            },
            |layout| card.as_ref().map(|card| self.render_region_card(card, layout)),
        )
        .await
    }

    fn render_region_card(&self, card: &RegionCard, layout: &DocumentLayout) -> GraphicsNode {
        let style = &self.config.legend;
        let body_font = &style.font;
        let heading_font = body_font.clone().with_weight(600);
        let line_height = body_font.size * self.config.line_height_multiplier;
        let inner_width = constants::REGION_CARD_WIDTH - 2.0 * REGION_CARD_PADDING;

        let heading = text_metrics::wrap(&self.measurer, &card.name, inner_width, &heading_font);
        let lines = heading.len() + card.rows.len();
        let height = 2.0 * REGION_CARD_PADDING + lines as f32 * line_height;
        let x = (layout.width - constants::REGION_CARD_OFFSET - constants::REGION_CARD_WIDTH).max(0.0);
        let y = layout.header_height + constants::REGION_CARD_OFFSET;

        let mut group = GraphicsNode::element("g").with_attr("class", "export-region-card").with_child(
            GraphicsNode::element("rect")
                .with_attr("x", fmt_num(x))
                .with_attr("y", fmt_num(y))
                .with_attr("width", fmt_num(constants::REGION_CARD_WIDTH))
                .with_attr("height", fmt_num(height))
                .with_attr("rx", 4)
                .with_attr("fill", &self.config.background_color)
                .with_attr("fill-opacity", 0.95)
                .with_attr("stroke", "#d0d0d0"),
        );

        // baselines sit at three quarters of each line box
        let baseline = |i: usize| y + REGION_CARD_PADDING + (i as f32 + 0.75) * line_height;
        for (i, line) in heading.iter().enumerate() {
            group.children.push(text_node(
                line,
                x + REGION_CARD_PADDING,
                baseline(i),
                &heading_font,
                &self.config.title_color,
            ));
        }
        for (i, row) in card.rows.iter().enumerate() {
            let y = baseline(heading.len() + i);
            group.children.push(text_node(&row.label, x + REGION_CARD_PADDING, y, body_font, &style.text_color));
            group.children.push(
                text_node(
                    &row.value,
                    x + constants::REGION_CARD_WIDTH - REGION_CARD_PADDING,
                    y,
                    body_font,
                    &self.config.title_color,
                )
                .with_attr("text-anchor", "end"),
            );
        }
        group
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_attribute() {
        assert_eq!(ZoomTransform::default().to_attribute(), "translate(0,0) scale(1)");
        let zoomed = ZoomTransform { x: -120.5, y: 40.0, k: 2.25 };
        assert_eq!(zoomed.to_attribute(), "translate(-120.5,40) scale(2.25)");
    }

    #[test]
    fn reset_only_touches_zoom_layers() {
        let mut root = GraphicsNode::element("svg")
            .with_child(
                GraphicsNode::element("g")
                    .with_attr("class", "zoom-layer")
                    .with_attr("transform", "translate(-300,-120) scale(3)"),
            )
            .with_child(GraphicsNode::element("g").with_attr("transform", "translate(5,5)"));
        assert_eq!(reset_zoom(&mut root, "zoom-layer"), 1);
        assert_eq!(root.children[0].attr("transform"), Some("translate(0,0) scale(1)"));
        assert_eq!(root.children[1].attr("transform"), Some("translate(5,5)"));
    }
}
