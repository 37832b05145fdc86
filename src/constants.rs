//! Shared export-wide constants.
//! Centralizes tweakable values used by text measurement, legend layout and document composition.

// Typography
/// Font family stack used for every piece of text the export draws itself.
pub const FONT_FAMILY: &str = "Roboto, Helvetica, Arial, sans-serif";
/// Title font size in pixels.
pub const TITLE_FONT_SIZE: f32 = 16.0;
/// Title font weight.
pub const TITLE_FONT_WEIGHT: u16 = 600;
/// Description font size in pixels.
pub const DESCRIPTION_FONT_SIZE: f32 = 13.0;
/// Legend label font size in pixels.
pub const LEGEND_FONT_SIZE: f32 = 12.0;
/// Line height multiplier applied to wrapped description lines.
pub const LINE_HEIGHT_MULTIPLIER: f32 = 1.4;

// Document frame
/// Outer padding (left, right and top) around the composed document.
pub const PADDING: f32 = 16.0;
/// Vertical gap between the header block and the chart content.
pub const HEADER_GAP: f32 = 12.0;
/// Padding above and below the footer contents.
pub const FOOTER_PADDING: f32 = 16.0;
/// Horizontal gap between the legend area and the logo.
pub const LOGO_GAP: f32 = 24.0;
/// Background fill of the exported document.
pub const BACKGROUND_COLOR: &str = "#ffffff";
/// Colour of title text.
pub const TITLE_COLOR: &str = "#1a1a1a";
/// Colour of description and legend text.
pub const TEXT_COLOR: &str = "#4a4a4a";

// Legend geometry
/// Side length of a legend marker.
pub const ICON_SIZE: f32 = 12.0;
/// Gap between a legend marker and its label.
pub const ICON_TEXT_GAP: f32 = 6.0;
/// Horizontal gap between two legend items on one row.
pub const ITEM_GAP: f32 = 24.0;
/// Height of one legend row.
pub const ROW_HEIGHT: f32 = 18.0;
/// Vertical gap between legend rows.
pub const ROW_GAP: f32 = 6.0;
/// Stroke width of a line-style legend marker.
pub const LINE_MARKER_STROKE: f32 = 2.5;

// Map variant
/// Fixed width of the gradient legend bar.
pub const GRADIENT_WIDTH: f32 = 200.0;
/// Fixed height of the gradient legend bar.
pub const GRADIENT_HEIGHT: f32 = 12.0;
/// Space taken by the gradient title and the min/max labels.
pub const GRADIENT_LABEL_SPACE: f32 = 18.0;
/// Width of the selected-region info card.
pub const REGION_CARD_WIDTH: f32 = 180.0;
/// Offset of the info card from the content's top-right corner.
pub const REGION_CARD_OFFSET: f32 = 10.0;
/// Inner padding of the info card.
pub const REGION_CARD_PADDING: f32 = 8.0;
/// Class token marking a pan/zoom layer inside a map tree.
pub const ZOOM_LAYER_CLASS: &str = "zoom-layer";

// Built-in chart furniture
/// Class token identifying a legend drawn by the charting library itself.
pub const BUILT_IN_LEGEND_CLASS: &str = "legend";

// Namespaces
/// Core SVG namespace.
pub const SVG_NS: &str = "http://www.w3.org/2000/svg";
/// XLink namespace used by `xlink:href`.
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
