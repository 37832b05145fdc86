//! JavaScript entry points for browser builds.

use crate::download::BrowserDownload;
use crate::embed::CanvasEmbedder;
use crate::export::Exporter;
use crate::text_metrics::CanvasMeasurer;
use crate::theme::{mount, Theme};
use crate::tree::GraphicsNode;
use crate::types::{ExportOptions, MapExportOptions};
use wasm_bindgen::prelude::*;

fn mounted(svg: &str, css: &str) -> Result<GraphicsNode, JsValue> {
    let mut root = GraphicsNode::parse(svg).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let mut theme = Theme::parse_css(css);
    theme.extend(Theme::from_embedded_styles(&root));
    mount(&mut root, &theme);
    Ok(root)
}

fn browser_exporter() -> Result<Exporter<CanvasMeasurer, CanvasEmbedder, BrowserDownload>, JsValue> {
    let measurer = CanvasMeasurer::new().map_err(|e| JsValue::from_str(&e))?;
    Ok(Exporter::new(measurer, CanvasEmbedder, BrowserDownload))
}

/// Exports serialized chart markup, styled by `css`, and offers it as a download.
///
/// `options` is the JSON form of [`ExportOptions`]. Resolves to whether a file was offered.
#[wasm_bindgen(js_name = exportChart)]
pub async fn export_chart(markup: String, css: String, filename: String, options: String) -> Result<bool, JsValue> {
    let options: ExportOptions = serde_json::from_str(&options).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let root = mounted(&markup, &css)?;
    let exporter = browser_exporter()?;
    Ok(exporter.export_chart(Some(&root), &filename, &options).await)
}

/// Map counterpart of [`export_chart`]; `options` is the JSON form of [`MapExportOptions`].
#[wasm_bindgen(js_name = exportMap)]
pub async fn export_map(markup: String, css: String, filename: String, options: String) -> Result<bool, JsValue> {
    let options: MapExportOptions = serde_json::from_str(&options).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let root = mounted(&markup, &css)?;
    let exporter = browser_exporter()?;
    Ok(exporter.export_map(Some(&root), &filename, &options).await)
}
