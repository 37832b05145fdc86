//! Export orchestration: compose a live chart and caller metadata into one standalone SVG.
//!
//! The pipeline, per call:
//! - locate the live `<svg>` and take a detached clone of it
//! - snapshot resolved styles onto the clone, then strip anything that would need the network
//! - measure header, content and footer (text metrics + legend packing)
//! - embed the logo, the one asynchronous step
//! - position title, description, content, legend and logo, serialize, and deliver
//!
//! Nothing is shared between calls; every export clones its own tree.

mod chart;
mod map;

pub use crate::sanitize::{external_references, strip_external_resources};
pub use map::{reset_zoom, ZoomTransform};

use crate::bounds::{self, is_built_in_legend};
use crate::constants;
use crate::download::DownloadSink;
use crate::embed::{is_data_uri, ImageEmbedder};
use crate::error::ExportError;
use crate::inline::inline_styles;
use crate::legend::{self, LayoutRow, LegendStyle};
use crate::text_metrics::{self, TextMeasurer};
use crate::tree::{fmt_num, serialize_document, GraphicsNode};
use crate::types::{ExportOptions, ExportedDocument, FontSpec, GradientLegend, LegendItem, LogoOptions};
use serde::{Deserialize, Serialize};

/// Layout tunables for composed documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Title font
    pub title_font: FontSpec,
    /// Title colour
    pub title_color: String,
    /// Description font
    pub description_font: FontSpec,
    /// Description colour
    pub text_color: String,
    /// Line height multiplier for wrapped description lines
    pub line_height_multiplier: f32,
    /// Outer padding (left, right, top)
    pub padding: f32,
    /// Gap between header and content
    pub header_gap: f32,
    /// Padding above and below the footer contents
    pub footer_padding: f32,
    /// Gap between legend area and logo
    pub logo_gap: f32,
    /// Opaque background fill
    pub background_color: String,
    /// Discrete legend geometry and typography
    pub legend: LegendStyle,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            title_font: FontSpec::new(constants::TITLE_FONT_SIZE).with_weight(constants::TITLE_FONT_WEIGHT),
            title_color: constants::TITLE_COLOR.to_string(),
            description_font: FontSpec::new(constants::DESCRIPTION_FONT_SIZE),
            text_color: constants::TEXT_COLOR.to_string(),
            line_height_multiplier: constants::LINE_HEIGHT_MULTIPLIER,
            padding: constants::PADDING,
            header_gap: constants::HEADER_GAP,
            footer_padding: constants::FOOTER_PADDING,
            logo_gap: constants::LOGO_GAP,
            background_color: constants::BACKGROUND_COLOR.to_string(),
            legend: LegendStyle::default(),
        }
    }
}

/// Vertical and horizontal geometry of one composed document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DocumentLayout {
    /// Canvas width, equal to the live chart's width
    pub width: f32,
    /// Title + description block, including its gap to the content
    pub header_height: f32,
    /// Height of the live chart
    pub content_height: f32,
    /// Footer space the live chart already reserved for its own legend
    pub reserved_footer: f32,
    /// Footer space the export needs
    pub footer_required: f32,
    /// Final canvas height
    pub total_height: f32,
}

/// Footer height for a legend block and a logo block side by side; zero when both are absent.
pub fn footer_height(legend_height: f32, logo_height: f32, footer_padding: f32) -> f32 {
    let inner = legend_height.max(logo_height);
    if inner <= 0.0 {
        0.0
    } else {
        inner + 2.0 * footer_padding
    }
}

/// Canvas height: only the footer's excess over the already-reserved band is added.
pub fn final_height(header: f32, content: f32, footer_required: f32, reserved: f32) -> f32 {
    header + content + (footer_required - reserved).max(0.0)
}

/// First `<svg>` at or below the handle.
pub fn locate_graphics_tree(handle: Option<&GraphicsNode>) -> Option<&GraphicsNode> {
    handle?.find(&|n| n.is("svg"))
}

/// What the footer draws next to the logo.
pub(crate) enum FooterLegend<'a> {
    /// Packed discrete items
    Items(&'a [LegendItem]),
    /// Fixed-size gradient bar
    Gradient(&'a GradientLegend),
}

enum DrawnLegend<'a> {
    Rows(Vec<LayoutRow>),
    Gradient(&'a GradientLegend),
}

/// Export context: one text measurer, one image embedder, one download sink and a layout
/// configuration. Holding these explicitly keeps concurrent chart instances independent.
pub struct Exporter<M, E, S> {
    measurer: M,
    embedder: E,
    sink: S,
    config: ExportConfig,
}

impl<M: TextMeasurer, E: ImageEmbedder, S: DownloadSink> Exporter<M, E, S> {
    /// Creates an exporter with the default layout configuration.
    pub fn new(measurer: M, embedder: E, sink: S) -> Self {
        Self {
            measurer,
            embedder,
            sink,
            config: ExportConfig::default(),
        }
    }

    /// Replaces the layout configuration.
    pub fn with_config(mut self, config: ExportConfig) -> Self {
        self.config = config;
        self
    }

    /// Active layout configuration.
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// The download sink, e.g. to inspect collected documents.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The text measurer shared by every layout step.
    pub fn measurer(&self) -> &M {
        &self.measurer
    }

    async fn deliver(&self, result: Result<ExportedDocument, ExportError>) -> bool {
        let doc = match result {
            Ok(doc) => doc,
            Err(e) => {
                log::error!("export failed: {}", e);
                return false;
            }
        };
        match self.sink.deliver(&doc).await {
            Ok(()) => {
                log::info!("exported {} ({}x{})", doc.filename, doc.width, doc.height);
                true
            }
            Err(e) => {
                log::error!("failed to deliver {}: {}", doc.filename, e);
                false
            }
        }
    }

    async fn resolve_logo(&self, logo: &LogoOptions) -> Option<String> {
        match self.embedder.embed(&logo.url).await {
            Ok(uri) if is_data_uri(&uri) => Some(uri),
            Ok(_) => {
                log::warn!("embedder returned a non-inline reference for {}; exporting without logo", logo.url);
                None
            }
            Err(e) => {
                log::warn!("failed to embed logo {}: {}; exporting without logo", logo.url, e);
                None
            }
        }
    }

    /// Header height and nodes: optional title, wrapped description, trailing gap.
    fn header(&self, options: &ExportOptions, width: f32) -> (f32, Vec<GraphicsNode>) {
        let c = &self.config;
        let title = options.title.as_deref().map(str::trim).filter(|t| !t.is_empty());
        let description = options.description.as_deref().unwrap_or_default();
        let text_width = (width - 2.0 * c.padding).max(0.0);
        let lines = text_metrics::wrap(&self.measurer, description, text_width, &c.description_font);
        if title.is_none() && lines.is_empty() {
            return (0.0, Vec::new());
        }

        let mut nodes = Vec::new();
        let mut y = c.padding;
        if let Some(title) = title {
            y += c.title_font.size;
            nodes.push(
                text_node(title, c.padding, y, &c.title_font, &c.title_color).with_attr("class", "export-title"),
            );
        }
        let line_height = c.description_font.size * c.line_height_multiplier;
        for (i, line) in lines.iter().enumerate() {
            let baseline = y + (i as f32 + 1.0) * line_height;
            nodes.push(
                text_node(line, c.padding, baseline, &c.description_font, &c.text_color)
                    .with_attr("class", "export-description"),
            );
        }
        y += lines.len() as f32 * line_height;
        (y + c.header_gap, nodes)
    }

    /// Shared composition for both variants.
    ///
    /// `adjust_clone` runs after the style snapshot and before measurement; `overlay` may add
    /// one node drawn above everything else.
    pub(crate) async fn compose(
        &self,
        live: &GraphicsNode,
        filename: &str,
        options: &ExportOptions,
        legend: Option<FooterLegend<'_>>,
        adjust_clone: impl FnOnce(&mut GraphicsNode),
        overlay: impl FnOnce(&DocumentLayout) -> Option<GraphicsNode>,
    ) -> Result<ExportedDocument, ExportError> {
        let c = &self.config;

        // Snapshot first: the lock-step walk needs both trees still identical.
        let mut clone = live.detached_clone();
        let inlined = inline_styles(&mut clone, live);
        let stripped = strip_external_resources(&mut clone);
        log::debug!("inlined {} declarations, removed {} external references", inlined, stripped);
        adjust_clone(&mut clone);

        let (width, content_height) = bounds::canvas_size(live);
        let draws_legend = match &legend {
            Some(FooterLegend::Items(items)) => !items.is_empty(),
            Some(FooterLegend::Gradient(_)) => true,
            None => false,
        };
        let reserved = if draws_legend {
            let reserved = bounds::reserved_footer_height(live, content_height);
            clone.retain_descendants(&|n| !is_built_in_legend(n));
            reserved
        } else {
            0.0
        };

        let logo = match &options.logo {
            Some(logo) => self.resolve_logo(logo).await.map(|uri| (logo, uri)),
            None => None,
        };

        let (header_height, header_nodes) = self.header(options, width);

        let logo_block = logo
            .as_ref()
            .map(|(l, _)| (l.width + 2.0 * l.padding, l.height + 2.0 * l.padding));
        let logo_reserve = logo_block.map_or(0.0, |(w, _)| w + c.logo_gap);
        let legend_area_width = (width - 2.0 * c.padding - logo_reserve).max(0.0);

        let (drawn, legend_h) = match legend {
            Some(FooterLegend::Items(items)) if !items.is_empty() => {
                let rows = legend::pack_legend(&self.measurer, items, legend_area_width, &c.legend);
                let h = legend::legend_height(&rows, &c.legend);
                (Some(DrawnLegend::Rows(rows)), h)
            }
            Some(FooterLegend::Gradient(g)) => (Some(DrawnLegend::Gradient(g)), legend::gradient_legend_height(g)),
            _ => (None, 0.0),
        };
        let logo_h = logo_block.map_or(0.0, |(_, h)| h);
        let footer_required = footer_height(legend_h, logo_h, c.footer_padding);
        let total_height = final_height(header_height, content_height, footer_required, reserved);
        let layout = DocumentLayout {
            width,
            header_height,
            content_height,
            reserved_footer: reserved,
            footer_required,
            total_height,
        };
        log::debug!("document layout {:?}", layout);

        // The clone's root element becomes the document root; its children become content.
        let content_children = std::mem::take(&mut clone.children);
        let mut root = clone;
        for attr in ["x", "y"] {
            root.remove_attr(attr);
        }
        root.set_attr("width", fmt_num(width));
        root.set_attr("height", fmt_num(total_height));
        root.set_attr("viewBox", format!("0 0 {} {}", fmt_num(width), fmt_num(total_height)));

        root.children.push(
            GraphicsNode::element("rect")
                .with_attr("x", 0)
                .with_attr("y", 0)
                .with_attr("width", fmt_num(width))
                .with_attr("height", fmt_num(total_height))
                .with_attr("fill", &c.background_color),
        );
        root.children.extend(header_nodes);
        let mut content = GraphicsNode::element("g")
            .with_attr("class", "export-content")
            .with_attr("transform", content_transform(live, width, content_height, header_height));
        content.children = content_children;
        root.children.push(content);

        let footer_top = header_height + content_height - reserved;
        let band = footer_required.max(reserved);
        let inner_h = legend_h.max(logo_h);
        let inner_top = footer_top + (band - inner_h) / 2.0;

        match drawn {
            Some(DrawnLegend::Rows(rows)) => {
                let start_y = inner_top + (inner_h - legend_h) / 2.0;
                let mut group = legend::render_legend(&rows, legend_area_width, start_y, &c.legend);
                group.set_attr("transform", format!("translate({},0)", fmt_num(c.padding)));
                root.children.push(group);
            }
            Some(DrawnLegend::Gradient(g)) => {
                let x = c.padding + ((legend_area_width - constants::GRADIENT_WIDTH) / 2.0).max(0.0);
                let y = inner_top + (inner_h - legend_h) / 2.0;
                root.children.push(legend::render_gradient_legend(g, x, y, &c.legend));
            }
            None => {}
        }

        if let Some((l, uri)) = &logo {
            let x = width - c.padding - l.padding - l.width;
            let y = inner_top + (inner_h - logo_h) / 2.0 + l.padding;
            root.children.push(
                GraphicsNode::element("image")
                    .with_attr("class", "export-logo")
                    .with_attr("x", fmt_num(x))
                    .with_attr("y", fmt_num(y))
                    .with_attr("width", fmt_num(l.width))
                    .with_attr("height", fmt_num(l.height))
                    .with_attr("preserveAspectRatio", "xMidYMid meet")
                    .with_attr("href", uri)
                    .with_attr("xlink:href", uri),
            );
        }

        if let Some(node) = overlay(&layout) {
            root.children.push(node);
        }

        if let Some(url) = external_references(&root).into_iter().next() {
            return Err(ExportError::ExternalReference(url));
        }
        let contents = serialize_document(&root);
        roxmltree::Document::parse(&contents).map_err(|e| ExportError::Serialization(e.to_string()))?;
        Ok(ExportedDocument::new(filename, contents, width, total_height))
    }
}

/// Transform placing the live content under the header, mapping its `viewBox` (if any) onto
/// its pixel size.
fn content_transform(live: &GraphicsNode, width: f32, height: f32, header: f32) -> String {
    let shift = format!("translate(0,{})", fmt_num(header));
    match live.attr("viewBox").and_then(bounds::parse_view_box) {
        Some([x, y, w, h])
            if w > 0.0
                && h > 0.0
                && (x != 0.0 || y != 0.0 || (w - width).abs() > 0.01 || (h - height).abs() > 0.01) =>
        {
            format!(
                "{} scale({},{}) translate({},{})",
                shift,
                width / w,
                height / h,
                fmt_num(-x),
                fmt_num(-y)
            )
        }
        _ => shift,
    }
}

pub(crate) fn text_node(content: &str, x: f32, y: f32, font: &FontSpec, color: &str) -> GraphicsNode {
    let mut node = GraphicsNode::element("text")
        .with_attr("x", fmt_num(x))
        .with_attr("y", fmt_num(y))
        .with_attr("font-family", &font.family)
        .with_attr("font-size", fmt_num(font.size))
        .with_attr("fill", color);
    if font.weight != 400 {
        node.set_attr("font-weight", font.weight);
    }
    if font.italic {
        node.set_attr("font-style", "italic");
    }
    node.with_text(content)
}
