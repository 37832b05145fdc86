//! Core data types for the snapshot export pipeline.
//!
//! This module defines the caller-facing configuration (legend items, logo, export options),
//! the font description used by text measurement, and the finished export artifact.

use crate::constants;
use serde::{Deserialize, Serialize};

/// Marker drawn in front of a legend label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerShape {
    /// Small filled square, used for category and area series
    #[default]
    Rect,
    /// Short horizontal stroke, used for trend and line series
    Line,
}

/// One named, coloured legend entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegendItem {
    /// Marker colour (any CSS colour string)
    pub color: String,
    /// Label drawn next to the marker
    pub label: String,
    /// Marker shape
    #[serde(default, alias = "shapeKind")]
    pub shape: MarkerShape,
}

impl LegendItem {
    /// Creates a new legend item.
    pub fn new(color: impl Into<String>, label: impl Into<String>, shape: MarkerShape) -> Self {
        Self {
            color: color.into(),
            label: label.into(),
            shape,
        }
    }
}

/// Font description used for measurement and for the emitted text attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    /// CSS font-family list, e.g. `"Roboto, sans-serif"`
    pub family: String,
    /// Font size in pixels
    pub size: f32,
    /// Numeric font weight (400 = normal, 700 = bold)
    #[serde(default = "default_weight")]
    pub weight: u16,
    /// Italic flag
    #[serde(default)]
    pub italic: bool,
}

fn default_weight() -> u16 {
    400
}

impl FontSpec {
    /// Creates a regular-weight font in the export's family.
    pub fn new(size: f32) -> Self {
        Self {
            family: constants::FONT_FAMILY.to_string(),
            size,
            weight: 400,
            italic: false,
        }
    }

    /// Returns a copy with the given weight.
    pub fn with_weight(mut self, weight: u16) -> Self {
        self.weight = weight;
        self
    }

    /// Whether the weight renders as bold.
    pub fn is_bold(&self) -> bool {
        self.weight >= 600
    }

    /// CSS `font` shorthand, e.g. `"italic 600 13px Roboto, sans-serif"`.
    pub fn to_css(&self) -> String {
        let style = if self.italic { "italic " } else { "" };
        format!("{}{} {}px {}", style, self.weight, self.size, self.family)
    }
}

/// Logo placed at the right end of the footer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogoOptions {
    /// Image location: `http(s)://`, `file://`, a local path, or an existing `data:` URI
    pub url: String,
    /// Rendered width in pixels
    pub width: f32,
    /// Rendered height in pixels
    pub height: f32,
    /// Extra space kept clear around the logo
    #[serde(default)]
    pub padding: f32,
}

/// Per-call export configuration supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportOptions {
    /// Optional title drawn at the top
    #[serde(default)]
    pub title: Option<String>,
    /// Optional description wrapped under the title
    #[serde(default)]
    pub description: Option<String>,
    /// Legend entries in presentation order
    #[serde(default)]
    pub legend_items: Vec<LegendItem>,
    /// Optional logo
    #[serde(default)]
    pub logo: Option<LogoOptions>,
    /// Free-form state captured from the dashboard (the map variant reads a selected region from it)
    #[serde(default)]
    pub auxiliary_snapshot: Option<serde_json::Value>,
}

/// One colour stop of a gradient legend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    /// Position along the bar, 0.0..=1.0
    pub offset: f32,
    /// Stop colour
    pub color: String,
}

/// Continuous colour scale legend used by map exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradientLegend {
    /// Optional caption drawn above the bar
    #[serde(default)]
    pub title: Option<String>,
    /// Colour stops, in offset order
    pub stops: Vec<GradientStop>,
    /// Label under the left end of the bar
    pub min_label: String,
    /// Label under the right end of the bar
    pub max_label: String,
}

/// A label/value line on the region info card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRow {
    /// Row caption
    pub label: String,
    /// Row value, already formatted
    pub value: String,
}

/// Info card describing the currently selected map region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionCard {
    /// Region name, drawn as the card heading
    pub name: String,
    /// Detail rows under the heading
    #[serde(default)]
    pub rows: Vec<RegionRow>,
}

/// Map-variant options: the shared options plus the map-only footer and overlay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapExportOptions {
    /// Shared title/description/logo options (legend items are ignored by maps)
    #[serde(flatten)]
    pub base: ExportOptions,
    /// Gradient legend drawn in the footer
    #[serde(default)]
    pub gradient: Option<GradientLegend>,
    /// Selected region card; falls back to `base.auxiliary_snapshot` when absent
    #[serde(default)]
    pub selected_region: Option<RegionCard>,
    /// Class token of the pan/zoom layer, defaults to [`constants::ZOOM_LAYER_CLASS`]
    #[serde(default)]
    pub zoom_layer_class: Option<String>,
}

impl MapExportOptions {
    /// The region card to overlay, if any.
    ///
    /// An explicit `selected_region` wins; otherwise the auxiliary snapshot is decoded as a
    /// [`RegionCard`]. A snapshot of another shape is ignored.
    pub fn region_card(&self) -> Option<RegionCard> {
        if let Some(card) = &self.selected_region {
            return Some(card.clone());
        }
        let snapshot = self.base.auxiliary_snapshot.as_ref()?;
        match serde_json::from_value::<RegionCard>(snapshot.clone()) {
            Ok(card) => Some(card),
            Err(e) => {
                log::debug!("auxiliary snapshot is not a region card: {}", e);
                None
            }
        }
    }
}

/// The finished standalone document.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedDocument {
    /// Suggested filename, always ending in `.svg`
    pub filename: String,
    /// Serialized SVG text
    pub contents: String,
    /// Canvas width in pixels
    pub width: f32,
    /// Canvas height in pixels
    pub height: f32,
}

impl ExportedDocument {
    /// Creates a document, appending `.svg` to the filename unless already present.
    pub fn new(filename: &str, contents: String, width: f32, height: f32) -> Self {
        let filename = if filename.to_ascii_lowercase().ends_with(".svg") {
            filename.to_string()
        } else {
            format!("{}.svg", filename)
        };
        Self {
            filename,
            contents,
            width,
            height,
        }
    }

    /// MIME type of the contents.
    pub fn mime_type(&self) -> &'static str {
        "image/svg+xml"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legend_item_accepts_shape_kind_alias() {
        let item: LegendItem =
            serde_json::from_str(r##"{"color":"#f00","label":"Baseline","shapeKind":"line"}"##).unwrap();
        assert_eq!(item.shape, MarkerShape::Line);

        let item: LegendItem = serde_json::from_str(r##"{"color":"#f00","label":"Reform"}"##).unwrap();
        assert_eq!(item.shape, MarkerShape::Rect);
    }

    #[test]
    fn filename_gets_single_svg_suffix() {
        assert_eq!(ExportedDocument::new("chart", String::new(), 1.0, 1.0).filename, "chart.svg");
        assert_eq!(ExportedDocument::new("chart.svg", String::new(), 1.0, 1.0).filename, "chart.svg");
    }

    #[test]
    fn region_card_falls_back_to_auxiliary_snapshot() {
        let mut options = MapExportOptions::default();
        assert!(options.region_card().is_none());

        options.base.auxiliary_snapshot = Some(serde_json::json!({
            "name": "Glasgow",
            "rows": [{"label": "Average gain", "value": "£120"}]
        }));
        let card = options.region_card().expect("snapshot should decode");
        assert_eq!(card.name, "Glasgow");
        assert_eq!(card.rows.len(), 1);

        options.base.auxiliary_snapshot = Some(serde_json::json!({"zoom": 3}));
        assert!(options.region_card().is_none());
    }

    #[test]
    fn font_css_shorthand() {
        let font = FontSpec::new(13.0).with_weight(600);
        assert!(font.is_bold());
        assert_eq!(font.to_css(), format!("600 13px {}", constants::FONT_FAMILY));
    }
}
